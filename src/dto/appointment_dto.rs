use serde::Deserialize;
use validator::Validate;

use crate::model::appointment::{
    AppointmentFilter, AppointmentPatch, BookingRequest, PageRequest,
};
use crate::service::appointment_service::DEFAULT_PRUNE_DAYS;
use crate::service::stats_service::DEFAULT_RECENT_LIMIT;

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BookAppointmentRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "Name is required"))]
    pub patient_name: String,
    #[serde(default)]
    #[validate(email(message = "Please provide a valid email"))]
    pub patient_email: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Phone number is required"))]
    pub patient_phone: String,
    #[serde(default)]
    pub department: String,
    #[validate(length(max = 500, message = "Message cannot exceed 500 characters"))]
    pub message: Option<String>,
}

impl From<BookAppointmentRequest> for BookingRequest {
    fn from(req: BookAppointmentRequest) -> Self {
        BookingRequest {
            patient_name: req.patient_name,
            patient_email: req.patient_email,
            patient_phone: req.patient_phone,
            department: req.department,
            message: req.message,
        }
    }
}

/// Query string of the admin listing. Unknown status/department values are
/// rejected by the handler.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListAppointmentsQuery {
    pub status: Option<String>,
    pub department: Option<String>,
    pub page: Option<usize>,
    pub limit: Option<usize>,
}

impl ListAppointmentsQuery {
    pub fn filter(&self) -> Result<AppointmentFilter, String> {
        Ok(AppointmentFilter {
            status: self.status.as_deref().map(str::parse).transpose()?,
            department: self.department.as_deref().map(str::parse).transpose()?,
        })
    }

    pub fn page(&self) -> PageRequest {
        let default = PageRequest::default();
        PageRequest {
            page: self.page.unwrap_or(default.page),
            limit: self.limit.unwrap_or(default.limit),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateStatusRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "Status is required"))]
    pub status: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CancelRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct BulkUpdateRequest {
    #[validate(length(min = 1, message = "No appointment ids given"))]
    pub ids: Vec<String>,
    #[serde(default)]
    pub changes: AppointmentPatch,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PruneQuery {
    pub days: Option<u32>,
}

impl PruneQuery {
    pub fn days(&self) -> u32 {
        self.days.unwrap_or(DEFAULT_PRUNE_DAYS)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatsQuery {
    pub recent: Option<usize>,
}

impl StatsQuery {
    pub fn recent(&self) -> usize {
        self.recent.unwrap_or(DEFAULT_RECENT_LIMIT)
    }
}
