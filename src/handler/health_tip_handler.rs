use axum::{extract::{Path, State}, http::StatusCode, response::IntoResponse, Extension, Json};
use serde_json::json;
use std::sync::Arc;

use crate::dto::health_tip_dto::{CreateHealthTipRequest, UpdateHealthTipRequest};
use crate::handler::validate_payload;
use crate::model::principal::Principal;
use crate::service::health_tip_service::HealthTipService;
use crate::util::error::HandlerError;

// Public
pub async fn random_tip_handler(
    State(service): State<Arc<dyn HealthTipService>>,
) -> Result<impl IntoResponse, HandlerError> {
    let tip = service.random_tip().await?;
    Ok(Json(json!({ "success": true, "tip": tip })))
}

pub async fn list_tips_handler(
    State(service): State<Arc<dyn HealthTipService>>,
    Extension(principal): Extension<Principal>,
) -> Result<impl IntoResponse, HandlerError> {
    let tips = service.list(&principal).await?;
    Ok(Json(json!({ "success": true, "count": tips.len(), "tips": tips })))
}

pub async fn create_tip_handler(
    State(service): State<Arc<dyn HealthTipService>>,
    Extension(principal): Extension<Principal>,
    Json(payload): Json<CreateHealthTipRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    validate_payload(&payload)?;
    let tip = service.create(&principal, payload.into()).await?;
    Ok((StatusCode::CREATED, Json(json!({ "success": true, "tip": tip }))))
}

pub async fn update_tip_handler(
    State(service): State<Arc<dyn HealthTipService>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateHealthTipRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    validate_payload(&payload)?;
    let tip = service.update(&principal, &id, payload.into()).await?;
    Ok(Json(json!({ "success": true, "tip": tip })))
}

pub async fn delete_tip_handler(
    State(service): State<Arc<dyn HealthTipService>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, HandlerError> {
    service.delete(&principal, &id).await?;
    Ok(Json(json!({ "success": true, "message": "Health tip deleted successfully" })))
}
