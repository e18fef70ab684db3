pub mod appointment_service;
pub mod auth_service;
pub mod health_tip_service;
pub mod stats_service;
