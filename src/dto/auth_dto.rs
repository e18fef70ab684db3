use serde::Deserialize;
use validator::Validate;

use crate::service::auth_service::Registration;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterRequest {
    #[serde(default)]
    #[validate(length(max = 100))]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    #[validate(length(max = 30))]
    pub phone: String,
    #[serde(default)]
    #[validate(length(max = 128))]
    pub password: String,
}

impl From<RegisterRequest> for Registration {
    fn from(req: RegisterRequest) -> Self {
        Registration { name: req.name, email: req.email, phone: req.phone, password: req.password }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Please provide email and password"))]
    #[serde(default)]
    pub email: String,
    #[validate(length(min = 1, message = "Please provide email and password"))]
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "Current password is required"))]
    #[serde(default)]
    pub current_password: String,
    #[validate(length(min = 1, message = "New password is required"))]
    #[serde(default)]
    pub new_password: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEmailRequest {
    #[validate(email(message = "Invalid email format"))]
    #[serde(default)]
    pub new_email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 30))]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct DeleteAccountRequest {
    #[validate(length(min = 1, message = "Password is required"))]
    #[serde(default)]
    pub password: String,
}
