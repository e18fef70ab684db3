use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{error, info, instrument};

use crate::model::appointment::{
    Appointment, AppointmentPatch, AppointmentStatus, AppointmentUpdate, NewAppointment,
};
use crate::repository::file_store::{
    decode_records, from_record, merge_partial, record_id, to_record, FileStore, Record,
    CREATED_AT_FIELD,
};
use crate::repository::repository_error::RepositoryResult;

pub const APPOINTMENTS_COLLECTION: &str = "appointments";

pub const DELETED_NAME: &str = "[Account Deleted]";
pub const DELETED_PHONE: &str = "[Deleted]";

#[async_trait]
pub trait AppointmentRepository: Send + Sync {
    async fn create(&self, appointment: NewAppointment) -> RepositoryResult<Appointment>;
    async fn find_by_id(&self, id: &str) -> RepositoryResult<Option<Appointment>>;
    async fn list(&self) -> RepositoryResult<Vec<Appointment>>;
    async fn update(&self, id: &str, changes: AppointmentUpdate) -> RepositoryResult<Option<Appointment>>;
    async fn remove(&self, id: &str) -> RepositoryResult<bool>;
    /// Apply `patch` to every listed id that exists. Returns how many matched.
    async fn bulk_update(&self, ids: &[String], patch: &AppointmentPatch) -> RepositoryResult<usize>;
    /// Drop appointments created before `cutoff`. Returns how many were removed.
    async fn prune_created_before(&self, cutoff: DateTime<Utc>) -> RepositoryResult<usize>;
    /// Cancel and scrub contact details of every appointment booked by
    /// `user_id` or under `email` (case-insensitive).
    async fn anonymize_owned_by(&self, user_id: &str, email: &str) -> RepositoryResult<usize>;
}

pub struct AppointmentRepositoryImpl {
    store: Arc<FileStore>,
}

impl AppointmentRepositoryImpl {
    pub fn new(store: Arc<FileStore>) -> Self {
        AppointmentRepositoryImpl { store }
    }
}

fn str_field<'a>(record: &'a Record, field: &str) -> Option<&'a str> {
    record.get(field).and_then(Value::as_str)
}

fn created_at(record: &Record) -> Option<DateTime<Utc>> {
    str_field(record, CREATED_AT_FIELD)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

#[async_trait]
impl AppointmentRepository for AppointmentRepositoryImpl {
    #[instrument(skip(self, appointment), fields(department = %appointment.department))]
    async fn create(&self, appointment: NewAppointment) -> RepositoryResult<Appointment> {
        match self.store.create(APPOINTMENTS_COLLECTION, to_record(&appointment)?).await {
            Ok(record) => {
                let appointment: Appointment = from_record(record)?;
                info!(appointment_id = %appointment.id, "Appointment stored");
                Ok(appointment)
            }
            Err(e) => {
                error!("Failed to create appointment: {}", e);
                Err(e)
            }
        }
    }

    async fn find_by_id(&self, id: &str) -> RepositoryResult<Option<Appointment>> {
        self.store
            .get_by_id(APPOINTMENTS_COLLECTION, id)
            .await
            .map(from_record)
            .transpose()
    }

    async fn list(&self) -> RepositoryResult<Vec<Appointment>> {
        let records = self.store.list_all(APPOINTMENTS_COLLECTION).await;
        Ok(decode_records(APPOINTMENTS_COLLECTION, records))
    }

    #[instrument(skip(self, changes))]
    async fn update(&self, id: &str, changes: AppointmentUpdate) -> RepositoryResult<Option<Appointment>> {
        let updated = self
            .store
            .update(APPOINTMENTS_COLLECTION, id, to_record(&changes)?)
            .await?;
        updated.map(from_record).transpose()
    }

    #[instrument(skip(self))]
    async fn remove(&self, id: &str) -> RepositoryResult<bool> {
        self.store.remove(APPOINTMENTS_COLLECTION, id).await
    }

    #[instrument(skip(self, ids, patch), fields(requested = ids.len()))]
    async fn bulk_update(&self, ids: &[String], patch: &AppointmentPatch) -> RepositoryResult<usize> {
        let changes = to_record(patch)?;
        let wanted: HashSet<&str> = ids.iter().map(String::as_str).collect();
        let updated = self
            .store
            .modify(APPOINTMENTS_COLLECTION, |records| {
                let mut updated = 0;
                for record in records.iter_mut() {
                    if record_id(record).is_some_and(|id| wanted.contains(id)) {
                        merge_partial(record, changes.clone());
                        updated += 1;
                    }
                }
                updated
            })
            .await?;
        info!(updated, "Bulk update finished");
        Ok(updated)
    }

    #[instrument(skip(self), fields(cutoff = %cutoff))]
    async fn prune_created_before(&self, cutoff: DateTime<Utc>) -> RepositoryResult<usize> {
        let removed = self
            .store
            .modify(APPOINTMENTS_COLLECTION, |records| {
                let before = records.len();
                // undated records are kept
                records.retain(|record| created_at(record).map_or(true, |at| at >= cutoff));
                before - records.len()
            })
            .await?;
        info!(removed, "Old appointments pruned");
        Ok(removed)
    }

    #[instrument(skip(self, email))]
    async fn anonymize_owned_by(&self, user_id: &str, email: &str) -> RepositoryResult<usize> {
        let email_lower = email.to_lowercase();
        let anonymized = self
            .store
            .modify(APPOINTMENTS_COLLECTION, |records| {
                let mut anonymized = 0;
                for record in records.iter_mut() {
                    let patient_email = str_field(record, "patientEmail").unwrap_or_default().to_string();
                    let by_id = str_field(record, "userId") == Some(user_id);
                    let by_email = patient_email.to_lowercase() == email_lower;
                    if !(by_id || by_email) {
                        continue;
                    }
                    let mut scrubbed = Record::new();
                    scrubbed.insert("status".to_string(), AppointmentStatus::Cancelled.as_str().into());
                    scrubbed.insert("patientName".to_string(), DELETED_NAME.into());
                    scrubbed.insert("patientEmail".to_string(), format!("deleted_{}", patient_email).into());
                    scrubbed.insert("patientPhone".to_string(), DELETED_PHONE.into());
                    scrubbed.insert("deleted".to_string(), true.into());
                    merge_partial(record, scrubbed);
                    anonymized += 1;
                }
                anonymized
            })
            .await?;
        info!(anonymized, "Appointments of deleted account anonymized");
        Ok(anonymized)
    }
}
