use axum::{extract::{Path, State}, http::StatusCode, response::IntoResponse, Extension, Json};
use serde_json::json;
use std::sync::Arc;

use crate::dto::auth_dto::{
    ChangeEmailRequest, ChangePasswordRequest, DeleteAccountRequest, LoginRequest,
    RegisterRequest, UpdateProfileRequest,
};
use crate::handler::validate_payload;
use crate::model::principal::Principal;
use crate::service::auth_service::AuthService;
use crate::util::error::HandlerError;

// Register
pub async fn register_handler(
    State(service): State<Arc<dyn AuthService>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    validate_payload(&payload)?;
    let res = service.register(payload.into()).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Registration successful",
            "token": res.token,
            "expiresIn": res.expires_in,
            "user": res.user,
        })),
    ))
}

// Login
pub async fn login_handler(
    State(service): State<Arc<dyn AuthService>>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    validate_payload(&payload)?;
    let res = service.login(&payload.email, &payload.password).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Login successful",
        "token": res.token,
        "expiresIn": res.expires_in,
        "user": res.user,
    })))
}

pub async fn me_handler(
    State(service): State<Arc<dyn AuthService>>,
    Extension(principal): Extension<Principal>,
) -> Result<impl IntoResponse, HandlerError> {
    let user = service.me(&principal).await?;
    Ok(Json(json!({ "success": true, "user": user })))
}

pub async fn change_password_handler(
    State(service): State<Arc<dyn AuthService>>,
    Extension(principal): Extension<Principal>,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    validate_payload(&payload)?;
    service
        .change_password(&principal, &payload.current_password, &payload.new_password)
        .await?;
    Ok(Json(json!({ "success": true, "message": "Password changed successfully" })))
}

// Admin only
pub async fn change_email_handler(
    State(service): State<Arc<dyn AuthService>>,
    Extension(principal): Extension<Principal>,
    Json(payload): Json<ChangeEmailRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    validate_payload(&payload)?;
    let user = service.change_email(&principal, &payload.new_email, &payload.password).await?;
    Ok(Json(json!({ "success": true, "message": "Email changed successfully", "user": user })))
}

pub async fn update_profile_handler(
    State(service): State<Arc<dyn AuthService>>,
    Extension(principal): Extension<Principal>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    validate_payload(&payload)?;
    let user = service.update_profile(&principal, payload.name, payload.phone).await?;
    Ok(Json(json!({ "success": true, "message": "Profile updated successfully", "user": user })))
}

pub async fn delete_account_handler(
    State(service): State<Arc<dyn AuthService>>,
    Extension(principal): Extension<Principal>,
    Json(payload): Json<DeleteAccountRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    validate_payload(&payload)?;
    service.delete_account(&principal, &payload.password).await?;
    Ok(Json(json!({ "success": true, "message": "Account deleted successfully" })))
}

// Admin only
pub async fn login_history_handler(
    State(service): State<Arc<dyn AuthService>>,
    Extension(principal): Extension<Principal>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, HandlerError> {
    let history = service.login_history(&principal, &user_id).await?;
    Ok(Json(json!({ "success": true, "loginHistory": history })))
}
