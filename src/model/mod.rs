pub mod appointment;
pub mod health_tip;
pub mod principal;
pub mod stats;
pub mod user;
