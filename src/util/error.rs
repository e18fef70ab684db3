use axum::{response::{IntoResponse, Response}, http::StatusCode};
use serde::Serialize;
use thiserror::Error;

use crate::repository::repository_error::RepositoryError;

#[derive(Debug, Serialize)]
pub enum HandlerErrorKind {
    NotFound,
    Validation,
    Internal,
    Unauthorized,
    Forbidden,
    Conflict,
    BadRequest,
}

impl std::fmt::Display for HandlerErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            HandlerErrorKind::NotFound => "NotFound",
            HandlerErrorKind::Validation => "Validation",
            HandlerErrorKind::Internal => "Internal",
            HandlerErrorKind::Unauthorized => "Unauthorized",
            HandlerErrorKind::Forbidden => "Forbidden",
            HandlerErrorKind::Conflict => "Conflict",
            HandlerErrorKind::BadRequest => "BadRequest",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Serialize)]
pub struct HandlerError {
    pub error: HandlerErrorKind,
    pub message: String,
    pub details: Option<String>,
}

impl HandlerError {
    pub fn new(error: HandlerErrorKind, message: impl Into<String>) -> Self {
        HandlerError { error, message: message.into(), details: None }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        HandlerError::new(HandlerErrorKind::BadRequest, message)
    }

    pub fn validation(message: impl Into<String>, details: Option<String>) -> Self {
        HandlerError { error: HandlerErrorKind::Validation, message: message.into(), details }
    }
}

impl std::fmt::Display for HandlerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

impl std::error::Error for HandlerError {}

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        let status = match self.error {
            HandlerErrorKind::NotFound => StatusCode::NOT_FOUND,
            HandlerErrorKind::Validation | HandlerErrorKind::BadRequest => StatusCode::BAD_REQUEST,
            HandlerErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            HandlerErrorKind::Forbidden => StatusCode::FORBIDDEN,
            HandlerErrorKind::Conflict => StatusCode::CONFLICT,
            HandlerErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = axum::Json(serde_json::json!({
            "success": false,
            "error": self.error,
            "message": self.message,
            "details": self.details,
        }));
        (status, body).into_response()
    }
}

/// Stable error category exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    Validation,
    Unauthenticated,
    Forbidden,
    NotFound,
    Conflict,
    Storage,
    Internal,
}

#[derive(Debug, Clone, Error)]
pub enum ServiceError {
    #[error("Validation Error: {0}")]
    Validation(String),
    #[error("Password does not meet requirements: {}", .0.join(", "))]
    WeakPassword(Vec<String>),
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Not Found: {0}")]
    NotFound(String),
    #[error("User already exists with this email")]
    DuplicateEmail,
    #[error("Email is already in use by another account")]
    EmailInUse,
    #[error("Appointment is already cancelled")]
    AlreadyCancelled,
    #[error("Cannot delete the last admin account")]
    LastAdminProtected,
    #[error("Storage Error: {0}")]
    Storage(String),
    #[error("Internal Error: {0}")]
    Internal(String),
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::Validation(_) | ServiceError::WeakPassword(_) => ErrorKind::Validation,
            ServiceError::Unauthenticated(_) | ServiceError::InvalidCredentials => ErrorKind::Unauthenticated,
            ServiceError::Forbidden(_) => ErrorKind::Forbidden,
            ServiceError::NotFound(_) => ErrorKind::NotFound,
            ServiceError::DuplicateEmail
            | ServiceError::EmailInUse
            | ServiceError::AlreadyCancelled
            | ServiceError::LastAdminProtected => ErrorKind::Conflict,
            ServiceError::Storage(_) => ErrorKind::Storage,
            ServiceError::Internal(_) => ErrorKind::Internal,
        }
    }
}

impl From<RepositoryError> for ServiceError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(msg) => ServiceError::NotFound(msg),
            RepositoryError::ValidationError(msg) => ServiceError::Validation(msg),
            RepositoryError::IoError(msg) => ServiceError::Storage(msg),
            RepositoryError::SerializationError(msg) => ServiceError::Storage(msg),
        }
    }
}

impl From<ServiceError> for HandlerError {
    fn from(err: ServiceError) -> Self {
        let error = match err.kind() {
            ErrorKind::Validation => HandlerErrorKind::Validation,
            ErrorKind::Unauthenticated => HandlerErrorKind::Unauthorized,
            ErrorKind::Forbidden => HandlerErrorKind::Forbidden,
            ErrorKind::NotFound => HandlerErrorKind::NotFound,
            ErrorKind::Conflict => HandlerErrorKind::Conflict,
            ErrorKind::Storage | ErrorKind::Internal => HandlerErrorKind::Internal,
        };
        let details = match &err {
            ServiceError::WeakPassword(problems) => Some(problems.join("; ")),
            _ => None,
        };
        let message = match &err {
            ServiceError::Validation(msg)
            | ServiceError::Unauthenticated(msg)
            | ServiceError::Forbidden(msg)
            | ServiceError::NotFound(msg) => msg.clone(),
            ServiceError::Storage(_) | ServiceError::Internal(_) => "Server error".to_string(),
            other => other.to_string(),
        };
        HandlerError { error, message, details }
    }
}
