use axum::{Router, routing::{delete, get, post, put}, middleware};
use std::sync::Arc;

use crate::handler::auth_handler::{
    change_email_handler,
    change_password_handler,
    delete_account_handler,
    login_handler,
    login_history_handler,
    me_handler,
    register_handler,
    update_profile_handler,
};
use crate::middlewares::auth_middleware::admin_auth;
use crate::service::auth_service::AuthService;

pub fn auth_router(service: Arc<dyn AuthService>) -> Router {
    // Public and self-service routes, the service rejects anonymous callers
    let public = Router::new()
        .route("/auth/register", post(register_handler))
        .route("/auth/login", post(login_handler))
        .route("/auth/me", get(me_handler))
        .route("/auth/change-password", post(change_password_handler))
        .route("/auth/update-profile", put(update_profile_handler))
        .route("/auth/delete-account", delete(delete_account_handler));

    let admin = Router::new()
        .route("/auth/change-email", post(change_email_handler))
        .route("/auth/login-history/{user_id}", get(login_history_handler))
        .route_layer(middleware::from_fn(admin_auth));

    public
        .merge(admin)
        .with_state(service)
}
