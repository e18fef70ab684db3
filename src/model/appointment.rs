use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::model::principal::AuthenticatedUser;

pub const REFERENCE_PREFIX: &str = "APPT";
pub const MAX_MESSAGE_CHARS: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl AppointmentStatus {
    pub const ALL: [AppointmentStatus; 4] = [
        AppointmentStatus::Pending,
        AppointmentStatus::Confirmed,
        AppointmentStatus::Cancelled,
        AppointmentStatus::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppointmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AppointmentStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s.trim())
            .ok_or_else(|| {
                "Invalid status. Must be: pending, confirmed, cancelled, or completed".to_string()
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Department {
    Cardiology,
    Orthopedics,
    Pediatrics,
    Emergency,
    Maternity,
    General,
}

impl Department {
    pub const ALL: [Department; 6] = [
        Department::Cardiology,
        Department::Orthopedics,
        Department::Pediatrics,
        Department::Emergency,
        Department::Maternity,
        Department::General,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Department::Cardiology => "cardiology",
            Department::Orthopedics => "orthopedics",
            Department::Pediatrics => "pediatrics",
            Department::Emergency => "emergency",
            Department::Maternity => "maternity",
            Department::General => "general",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Department::Cardiology => "Cardiology",
            Department::Orthopedics => "Orthopedics",
            Department::Pediatrics => "Pediatrics",
            Department::Emergency => "Emergency",
            Department::Maternity => "Maternity",
            Department::General => "General Medicine",
        }
    }
}

impl fmt::Display for Department {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Department {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Department::ALL
            .into_iter()
            .find(|department| department.as_str() == s.trim())
            .ok_or_else(|| "Please select a valid department".to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: String,
    pub patient_name: String,
    pub patient_email: String,
    pub patient_phone: String,
    pub department: Department,
    #[serde(default)]
    pub message: String,
    pub status: AppointmentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancelled_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancelled_by_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancellation_reason: Option<String>,
    /// Set when the owning account was deleted and contact details anonymized.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub deleted: bool,
}

impl Appointment {
    /// Case-insensitive substring match on name, email, phone, department and id.
    pub fn matches_query(&self, query: &str) -> bool {
        let needle = query.to_lowercase();
        [
            self.patient_name.as_str(),
            self.patient_email.as_str(),
            self.patient_phone.as_str(),
            self.department.as_str(),
            self.id.as_str(),
        ]
        .iter()
        .any(|field| field.to_lowercase().contains(&needle))
    }

    pub fn reference_code(&self) -> String {
        reference_code(&self.id)
    }

    /// Owned by `user` through the booking user id or the patient email
    /// (case-insensitive).
    pub fn is_owned_by(&self, user: &AuthenticatedUser) -> bool {
        self.user_id.as_deref() == Some(user.id.as_str())
            || self.patient_email.to_lowercase() == user.email.to_lowercase()
    }
}

/// `APPT` followed by the uppercased last (up to) eight characters of `id`.
pub fn reference_code(id: &str) -> String {
    let chars: Vec<char> = id.chars().collect();
    let tail: String = chars[chars.len().saturating_sub(8)..].iter().collect();
    format!("{}{}", REFERENCE_PREFIX, tail.to_uppercase())
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAppointment {
    pub patient_name: String,
    pub patient_email: String,
    pub patient_phone: String,
    pub department: Department,
    pub message: String,
    pub status: AppointmentStatus,
    pub user_id: Option<String>,
}

/// Partial write onto a stored appointment. `None` fields are left untouched.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<AppointmentStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_by_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancelled_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancelled_by_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancellation_reason: Option<String>,
}

/// Booking input before validation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    #[serde(default)]
    pub patient_name: String,
    #[serde(default)]
    pub patient_email: String,
    #[serde(default)]
    pub patient_phone: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub message: Option<String>,
}

/// Fields a bulk update may overwrite.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<AppointmentStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<Department>,
}

impl AppointmentPatch {
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.notes.is_none() && self.department.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppointmentFilter {
    pub status: Option<AppointmentStatus>,
    pub department: Option<Department>,
}

impl AppointmentFilter {
    pub fn matches(&self, appointment: &Appointment) -> bool {
        self.status.map_or(true, |status| appointment.status == status)
            && self
                .department
                .map_or(true, |department| appointment.department == department)
    }
}

/// 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: usize,
    pub limit: usize,
}

impl Default for PageRequest {
    fn default() -> Self {
        PageRequest { page: 1, limit: 10 }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub count: usize,
    pub total: usize,
    pub pages: usize,
    pub page: usize,
    pub limit: usize,
}

impl<T> Page<T> {
    /// Slice `all` into the requested page. Pages past the end are empty.
    pub fn slice(all: Vec<T>, request: PageRequest) -> Self {
        let page = request.page.max(1);
        let limit = request.limit.max(1);
        let total = all.len();
        let items: Vec<T> = all
            .into_iter()
            .skip((page - 1).saturating_mul(limit))
            .take(limit)
            .collect();
        Page {
            count: items.len(),
            items,
            total,
            pages: total.div_ceil(limit),
            page,
            limit,
        }
    }
}

/// A booked appointment together with its display reference.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingReceipt {
    pub appointment: Appointment,
    pub reference: String,
}
