use axum::{body::Bytes, extract::{Path, Query, State}, http::StatusCode, response::IntoResponse, Extension, Json};
use serde_json::json;
use std::sync::Arc;

use crate::dto::appointment_dto::{
    BookAppointmentRequest, BulkUpdateRequest, CancelRequest, ListAppointmentsQuery, PruneQuery,
    SearchQuery, StatsQuery, UpdateStatusRequest,
};
use crate::handler::validate_payload;
use crate::model::principal::Principal;
use crate::service::appointment_service::AppointmentService;
use crate::service::stats_service::StatsService;
use crate::util::error::HandlerError;

pub struct AppointmentState {
    pub appointments: Arc<dyn AppointmentService>,
    pub stats: Arc<dyn StatsService>,
}

// Public: anyone can book
pub async fn book_appointment_handler(
    State(state): State<Arc<AppointmentState>>,
    Extension(principal): Extension<Principal>,
    Json(payload): Json<BookAppointmentRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    validate_payload(&payload)?;
    let receipt = state.appointments.book(payload.into(), &principal).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Appointment request submitted successfully! We will contact you shortly.",
            "reference": receipt.reference,
            "appointment": receipt.appointment,
        })),
    ))
}

pub async fn my_appointments_handler(
    State(state): State<Arc<AppointmentState>>,
    Extension(principal): Extension<Principal>,
) -> Result<impl IntoResponse, HandlerError> {
    let appointments = state.appointments.list_mine(&principal).await?;
    Ok(Json(json!({ "success": true, "count": appointments.len(), "appointments": appointments })))
}

// Admin only
pub async fn list_appointments_handler(
    State(state): State<Arc<AppointmentState>>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<ListAppointmentsQuery>,
) -> Result<impl IntoResponse, HandlerError> {
    let filter = query.filter().map_err(HandlerError::bad_request)?;
    let page = state.appointments.list_all(&principal, filter, query.page()).await?;
    Ok(Json(json!({
        "success": true,
        "count": page.count,
        "total": page.total,
        "pages": page.pages,
        "currentPage": page.page,
        "limit": page.limit,
        "appointments": page.items,
    })))
}

pub async fn get_appointment_handler(
    State(state): State<Arc<AppointmentState>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, HandlerError> {
    let appointment = state.appointments.get(&id, &principal).await?;
    Ok(Json(json!({ "success": true, "appointment": appointment })))
}

// Admin only
pub async fn update_status_handler(
    State(state): State<Arc<AppointmentState>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    validate_payload(&payload)?;
    let appointment = state
        .appointments
        .set_status(&id, &payload.status, payload.notes, &principal)
        .await?;
    Ok(Json(json!({
        "success": true,
        "message": format!("Appointment status updated to {}", appointment.status),
        "appointment": appointment,
    })))
}

pub async fn cancel_appointment_handler(
    State(state): State<Arc<AppointmentState>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<impl IntoResponse, HandlerError> {
    // the body is optional
    let payload: CancelRequest = if body.is_empty() {
        CancelRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| HandlerError::bad_request(format!("Invalid body: {}", e)))?
    };
    let reason = payload.reason;
    let appointment = state.appointments.cancel(&id, reason, &principal).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Appointment cancelled successfully",
        "appointment": appointment,
    })))
}

// Admin only
pub async fn delete_appointment_handler(
    State(state): State<Arc<AppointmentState>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, HandlerError> {
    state.appointments.delete(&id, &principal).await?;
    Ok(Json(json!({ "success": true, "message": "Appointment deleted successfully" })))
}

// Admin only
pub async fn stats_handler(
    State(state): State<Arc<AppointmentState>>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<StatsQuery>,
) -> Result<impl IntoResponse, HandlerError> {
    let stats = state.stats.stats(&principal, query.recent()).await?;
    Ok(Json(json!({ "success": true, "stats": stats })))
}

// Admin only
pub async fn search_handler(
    State(state): State<Arc<AppointmentState>>,
    Query(query): Query<SearchQuery>,
) -> Result<impl IntoResponse, HandlerError> {
    let appointments = state.appointments.search(&query.q).await?;
    Ok(Json(json!({ "success": true, "count": appointments.len(), "appointments": appointments })))
}

// Admin only
pub async fn bulk_update_handler(
    State(state): State<Arc<AppointmentState>>,
    Json(payload): Json<BulkUpdateRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    validate_payload(&payload)?;
    let updated = state.appointments.bulk_update(payload.ids, payload.changes).await?;
    Ok(Json(json!({ "success": true, "updated": updated })))
}

// Admin only
pub async fn prune_handler(
    State(state): State<Arc<AppointmentState>>,
    Query(query): Query<PruneQuery>,
) -> Result<impl IntoResponse, HandlerError> {
    let removed = state.appointments.prune_older_than(query.days()).await?;
    Ok(Json(json!({ "success": true, "removed": removed })))
}
