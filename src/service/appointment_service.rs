use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tracing::{error, info, instrument, warn};

use crate::model::appointment::{
    Appointment, AppointmentFilter, AppointmentPatch, AppointmentStatus, AppointmentUpdate,
    BookingReceipt, BookingRequest, Department, NewAppointment, Page, PageRequest,
    MAX_MESSAGE_CHARS,
};
use crate::model::principal::Principal;
use crate::repository::appointment_repo::AppointmentRepository;
use crate::util::error::ServiceError;
use crate::util::notifier::{Notification, NotificationDispatcher, NotificationEvent};

pub const ADMIN_CANCEL_REASON: &str = "Cancelled by admin";
pub const PATIENT_CANCEL_REASON: &str = "Cancelled by patient";
pub const STATUS_CANCEL_REASON: &str = "Cancelled by administrator";
pub const DEFAULT_PRUNE_DAYS: u32 = 90;

#[async_trait]
pub trait AppointmentService: Send + Sync {
    async fn book(&self, request: BookingRequest, principal: &Principal) -> Result<BookingReceipt, ServiceError>;
    async fn get(&self, id: &str, principal: &Principal) -> Result<Appointment, ServiceError>;
    async fn list_mine(&self, principal: &Principal) -> Result<Vec<Appointment>, ServiceError>;
    async fn list_all(&self, principal: &Principal, filter: AppointmentFilter, page: PageRequest) -> Result<Page<Appointment>, ServiceError>;
    async fn set_status(&self, id: &str, status: &str, notes: Option<String>, principal: &Principal) -> Result<Appointment, ServiceError>;
    async fn cancel(&self, id: &str, reason: Option<String>, principal: &Principal) -> Result<Appointment, ServiceError>;
    async fn delete(&self, id: &str, principal: &Principal) -> Result<bool, ServiceError>;
    async fn search(&self, query: &str) -> Result<Vec<Appointment>, ServiceError>;
    async fn bulk_update(&self, ids: Vec<String>, patch: AppointmentPatch) -> Result<usize, ServiceError>;
    async fn prune_older_than(&self, days: u32) -> Result<usize, ServiceError>;
}

pub struct AppointmentServiceImpl {
    pub repo: Arc<dyn AppointmentRepository>,
    pub dispatcher: Arc<NotificationDispatcher>,
}

impl AppointmentServiceImpl {
    pub fn new(repo: Arc<dyn AppointmentRepository>, dispatcher: Arc<NotificationDispatcher>) -> Self {
        Self { repo, dispatcher }
    }

    async fn find(&self, id: &str) -> Result<Appointment, ServiceError> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Appointment not found".to_string()))
    }

    fn notify(&self, event: NotificationEvent, appointment: &Appointment) {
        self.dispatcher.dispatch(Notification::new(event, appointment));
    }
}

fn newest_first(appointments: &mut [Appointment]) {
    appointments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

fn validate_booking(request: BookingRequest) -> Result<(String, String, String, Department, String), ServiceError> {
    let name = request.patient_name.trim().to_string();
    let email = request.patient_email.trim().to_string();
    let phone = request.patient_phone.trim().to_string();
    if name.is_empty() || email.is_empty() || phone.is_empty() || request.department.trim().is_empty() {
        return Err(ServiceError::Validation("Please provide all required fields".to_string()));
    }
    let department: Department = request.department.parse().map_err(ServiceError::Validation)?;
    let message = request.message.unwrap_or_default();
    if message.chars().count() > MAX_MESSAGE_CHARS {
        return Err(ServiceError::Validation(format!(
            "Message cannot exceed {} characters",
            MAX_MESSAGE_CHARS
        )));
    }
    let message = message.trim().to_string();
    Ok((name, email, phone, department, message))
}

#[async_trait]
impl AppointmentService for AppointmentServiceImpl {
    #[instrument(skip(self, request, principal), fields(department = %request.department))]
    async fn book(&self, request: BookingRequest, principal: &Principal) -> Result<BookingReceipt, ServiceError> {
        info!("Booking appointment");
        let (patient_name, patient_email, patient_phone, department, message) = validate_booking(request)?;

        let appointment = self
            .repo
            .create(NewAppointment {
                patient_name,
                patient_email,
                patient_phone,
                department,
                message,
                status: AppointmentStatus::Pending,
                user_id: principal.user().map(|user| user.id.clone()),
            })
            .await
            .map_err(|e| {
                error!("Failed to store appointment: {}", e);
                ServiceError::from(e)
            })?;

        let reference = appointment.reference_code();
        info!(appointment_id = %appointment.id, reference = %reference, "Appointment booked");
        self.notify(NotificationEvent::PendingReceived, &appointment);
        Ok(BookingReceipt { appointment, reference })
    }

    async fn get(&self, id: &str, principal: &Principal) -> Result<Appointment, ServiceError> {
        let appointment = self.find(id).await?;
        let allowed = principal.is_admin()
            || principal.user().is_some_and(|user| appointment.is_owned_by(user));
        if !allowed {
            warn!(appointment_id = %id, "Access to appointment denied");
            return Err(ServiceError::Forbidden("Not authorized to view this appointment".to_string()));
        }
        Ok(appointment)
    }

    async fn list_mine(&self, principal: &Principal) -> Result<Vec<Appointment>, ServiceError> {
        let user = principal.require_user()?;
        let mut mine: Vec<Appointment> = self
            .repo
            .list()
            .await?
            .into_iter()
            .filter(|appointment| appointment.is_owned_by(user))
            .collect();
        newest_first(&mut mine);
        Ok(mine)
    }

    async fn list_all(&self, principal: &Principal, filter: AppointmentFilter, page: PageRequest) -> Result<Page<Appointment>, ServiceError> {
        principal.require_admin()?;
        let mut matching: Vec<Appointment> = self
            .repo
            .list()
            .await?
            .into_iter()
            .filter(|appointment| filter.matches(appointment))
            .collect();
        newest_first(&mut matching);
        Ok(Page::slice(matching, page))
    }

    #[instrument(skip(self, notes, principal))]
    async fn set_status(&self, id: &str, status: &str, notes: Option<String>, principal: &Principal) -> Result<Appointment, ServiceError> {
        let actor = principal.require_admin()?;
        let status: AppointmentStatus = status.parse().map_err(ServiceError::Validation)?;
        let previous = self.find(id).await?;

        let mut changes = AppointmentUpdate {
            status: Some(status),
            notes: notes.clone(),
            updated_by: Some(actor.id.clone()),
            updated_by_name: Some(actor.name.clone()),
            ..Default::default()
        };
        let entering_cancelled = status == AppointmentStatus::Cancelled && previous.status != status;
        let reason = notes
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| STATUS_CANCEL_REASON.to_string());
        if entering_cancelled {
            changes.cancelled_by = Some(actor.id.clone());
            changes.cancelled_by_name = Some(actor.name.clone());
            changes.cancellation_reason = Some(reason.clone());
        }

        let updated = self
            .repo
            .update(id, changes)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Appointment not found".to_string()))?;
        info!(from = %previous.status, to = %status, "Appointment status updated");

        if previous.status != status {
            match status {
                AppointmentStatus::Confirmed => self.notify(NotificationEvent::Confirmed, &updated),
                AppointmentStatus::Cancelled => self.notify(NotificationEvent::Cancelled { reason }, &updated),
                _ => {}
            }
        }
        Ok(updated)
    }

    #[instrument(skip(self, reason, principal))]
    async fn cancel(&self, id: &str, reason: Option<String>, principal: &Principal) -> Result<Appointment, ServiceError> {
        let appointment = self.find(id).await?;
        let actor = match principal.user() {
            Some(user) if principal.is_admin() || appointment.is_owned_by(user) => user,
            _ => {
                warn!(appointment_id = %id, "Cancellation denied");
                return Err(ServiceError::Forbidden("Not authorized to cancel this appointment".to_string()));
            }
        };
        if appointment.status == AppointmentStatus::Cancelled {
            warn!("Appointment already cancelled");
            return Err(ServiceError::AlreadyCancelled);
        }
        let default_reason = if principal.is_admin() { ADMIN_CANCEL_REASON } else { PATIENT_CANCEL_REASON };
        let reason = reason
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| default_reason.to_string());

        let updated = self
            .repo
            .update(
                id,
                AppointmentUpdate {
                    status: Some(AppointmentStatus::Cancelled),
                    cancelled_by: Some(actor.id.clone()),
                    cancelled_by_name: Some(actor.name.clone()),
                    cancellation_reason: Some(reason.clone()),
                    ..Default::default()
                },
            )
            .await?
            .ok_or_else(|| ServiceError::NotFound("Appointment not found".to_string()))?;
        info!(cancelled_by = %actor.id, "Appointment cancelled");
        self.notify(NotificationEvent::Cancelled { reason }, &updated);
        Ok(updated)
    }

    #[instrument(skip(self, principal))]
    async fn delete(&self, id: &str, principal: &Principal) -> Result<bool, ServiceError> {
        principal.require_admin()?;
        self.find(id).await?;
        let removed = self.repo.remove(id).await?;
        info!(removed, "Appointment deleted");
        Ok(removed)
    }

    async fn search(&self, query: &str) -> Result<Vec<Appointment>, ServiceError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ServiceError::Validation("Search query is required".to_string()));
        }
        Ok(self
            .repo
            .list()
            .await?
            .into_iter()
            .filter(|appointment| appointment.matches_query(query))
            .collect())
    }

    #[instrument(skip(self, ids, patch), fields(requested = ids.len()))]
    async fn bulk_update(&self, ids: Vec<String>, patch: AppointmentPatch) -> Result<usize, ServiceError> {
        if ids.is_empty() {
            return Err(ServiceError::Validation("No appointment ids given".to_string()));
        }
        if patch.is_empty() {
            return Err(ServiceError::Validation("Nothing to update".to_string()));
        }
        Ok(self.repo.bulk_update(&ids, &patch).await?)
    }

    #[instrument(skip(self))]
    async fn prune_older_than(&self, days: u32) -> Result<usize, ServiceError> {
        let cutoff = Utc::now() - Duration::days(i64::from(days));
        Ok(self.repo.prune_created_before(cutoff).await?)
    }
}
