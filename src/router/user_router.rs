use axum::{Router, routing::get, middleware};
use std::sync::Arc;

use crate::handler::user_handler::{get_user_handler, list_users_handler};
use crate::middlewares::auth_middleware::admin_auth;
use crate::service::auth_service::AuthService;

pub fn user_router(service: Arc<dyn AuthService>) -> Router {
    Router::new()
        .route("/users", get(list_users_handler))
        .route("/users/{id}", get(get_user_handler))
        .route_layer(middleware::from_fn(admin_auth))
        .with_state(service)
}
