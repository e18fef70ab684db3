use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Local, Months};
use tracing::{debug, instrument};

use crate::model::appointment::{Appointment, AppointmentStatus};
use crate::model::principal::Principal;
use crate::model::stats::{AppointmentStats, TodayCounts, TotalCounts};
use crate::model::user::Role;
use crate::repository::appointment_repo::AppointmentRepository;
use crate::repository::user_repo::UserRepository;
use crate::util::error::ServiceError;

pub const DEFAULT_RECENT_LIMIT: usize = 10;
pub const MONTHS_WINDOW: u32 = 6;

#[async_trait]
pub trait StatsService: Send + Sync {
    async fn stats(&self, principal: &Principal, recent_limit: usize) -> Result<AppointmentStats, ServiceError>;
}

pub struct StatsServiceImpl {
    pub appointment_repo: Arc<dyn AppointmentRepository>,
    pub user_repo: Arc<dyn UserRepository>,
}

impl StatsServiceImpl {
    pub fn new(appointment_repo: Arc<dyn AppointmentRepository>, user_repo: Arc<dyn UserRepository>) -> Self {
        Self { appointment_repo, user_repo }
    }
}

#[async_trait]
impl StatsService for StatsServiceImpl {
    #[instrument(skip(self, principal))]
    async fn stats(&self, principal: &Principal, recent_limit: usize) -> Result<AppointmentStats, ServiceError> {
        principal.require_admin()?;
        let appointments = self.appointment_repo.list().await?;
        let registered_patients = self
            .user_repo
            .list()
            .await?
            .iter()
            .filter(|user| user.role == Role::Patient && user.is_active)
            .count();
        debug!(appointments = appointments.len(), registered_patients, "Computing appointment stats");
        Ok(compute_stats(&appointments, registered_patients, Local::now(), recent_limit))
    }
}

/// Aggregate `appointments` as seen at `now`. Calendar days and month labels
/// use server-local time.
pub fn compute_stats(
    appointments: &[Appointment],
    registered_patients: usize,
    now: DateTime<Local>,
    recent_limit: usize,
) -> AppointmentStats {
    let today = now.date_naive();
    let window_start = now.checked_sub_months(Months::new(MONTHS_WINDOW)).unwrap_or(now);

    let mut by_status: BTreeMap<String, usize> = AppointmentStatus::ALL
        .iter()
        .map(|status| (status.as_str().to_string(), 0))
        .collect();
    let mut by_department = BTreeMap::new();
    let mut by_month = BTreeMap::new();
    let mut patients = HashSet::new();
    let mut today_counts = TodayCounts::default();

    for appointment in appointments {
        let created = appointment.created_at.with_timezone(&Local);
        *by_status.entry(appointment.status.as_str().to_string()).or_insert(0) += 1;
        *by_department.entry(appointment.department.as_str().to_string()).or_insert(0) += 1;
        patients.insert(appointment.patient_email.as_str());

        if created.date_naive() == today {
            today_counts.appointments += 1;
            if appointment.status == AppointmentStatus::Pending {
                today_counts.pending += 1;
            }
        }
        if created >= window_start {
            *by_month.entry(created.format("%b %Y").to_string()).or_insert(0) += 1;
        }
    }

    let mut recent = appointments.to_vec();
    recent.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    recent.truncate(recent_limit);

    AppointmentStats {
        total: TotalCounts {
            appointments: appointments.len(),
            patients: patients.len(),
            registered_patients,
        },
        today: today_counts,
        by_status,
        by_department,
        by_month,
        recent,
    }
}
