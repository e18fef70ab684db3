pub mod appointment_router;
pub mod auth_router;
pub mod health_tip_router;
pub mod user_router;
