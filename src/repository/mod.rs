pub mod repository_error;
pub mod file_store;
pub mod user_repo;
pub mod appointment_repo;
pub mod health_tip_repo;
