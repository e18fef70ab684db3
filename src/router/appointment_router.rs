use axum::{Router, routing::{delete, get, post, put}, middleware};
use std::sync::Arc;

use crate::handler::appointment_handler::{
    book_appointment_handler,
    bulk_update_handler,
    cancel_appointment_handler,
    delete_appointment_handler,
    get_appointment_handler,
    list_appointments_handler,
    my_appointments_handler,
    prune_handler,
    search_handler,
    stats_handler,
    update_status_handler,
    AppointmentState,
};
use crate::middlewares::auth_middleware::admin_auth;

pub fn appointment_router(state: Arc<AppointmentState>) -> Router {
    // Booking is public, ownership is checked by the service for the rest
    let public = Router::new()
        .route("/appointments", post(book_appointment_handler))
        .route("/appointments/my", get(my_appointments_handler))
        .route("/appointments/{id}", get(get_appointment_handler))
        .route("/appointments/{id}/cancel", put(cancel_appointment_handler));

    let admin = Router::new()
        .route("/appointments", get(list_appointments_handler))
        .route("/appointments/stats", get(stats_handler))
        .route("/appointments/search", get(search_handler))
        .route("/appointments/bulk", put(bulk_update_handler))
        .route("/appointments/prune", delete(prune_handler))
        .route("/appointments/{id}/status", put(update_status_handler))
        .route("/appointments/{id}", delete(delete_appointment_handler))
        .route_layer(middleware::from_fn(admin_auth));

    public
        .merge(admin)
        .with_state(state)
}
