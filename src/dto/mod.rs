pub mod appointment_dto;
pub mod auth_dto;
pub mod health_tip_dto;
