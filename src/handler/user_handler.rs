use axum::{extract::{Path, State}, response::IntoResponse, Extension, Json};
use serde_json::json;
use std::sync::Arc;

use crate::model::principal::Principal;
use crate::service::auth_service::AuthService;
use crate::util::error::HandlerError;

// Admin only
pub async fn list_users_handler(
    State(service): State<Arc<dyn AuthService>>,
    Extension(principal): Extension<Principal>,
) -> Result<impl IntoResponse, HandlerError> {
    let users = service.list_users(&principal).await?;
    Ok(Json(json!({ "success": true, "count": users.len(), "users": users })))
}

// Admin only
pub async fn get_user_handler(
    State(service): State<Arc<dyn AuthService>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, HandlerError> {
    let user = service.get_user(&principal, &id).await?;
    Ok(Json(json!({ "success": true, "user": user })))
}
