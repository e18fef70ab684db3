use std::collections::BTreeMap;

use serde::Serialize;

use crate::model::appointment::Appointment;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TotalCounts {
    pub appointments: usize,
    /// Distinct patient emails across all appointments.
    pub patients: usize,
    /// Active accounts with the patient role.
    pub registered_patients: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TodayCounts {
    pub appointments: usize,
    pub pending: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentStats {
    pub total: TotalCounts,
    pub today: TodayCounts,
    pub by_status: BTreeMap<String, usize>,
    pub by_department: BTreeMap<String, usize>,
    /// Keyed by labels such as `Jan 2024`.
    pub by_month: BTreeMap<String, usize>,
    pub recent: Vec<Appointment>,
}
