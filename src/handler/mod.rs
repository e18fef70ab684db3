use validator::Validate;

use crate::util::error::HandlerError;

pub mod appointment_handler;
pub mod auth_handler;
pub mod health_tip_handler;
pub mod user_handler;

pub(crate) fn validate_payload<T: Validate>(payload: &T) -> Result<(), HandlerError> {
    payload
        .validate()
        .map_err(|e| HandlerError::validation("Validation error", Some(e.to_string())))
}
