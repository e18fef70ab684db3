use axum::{Router, routing::{get, put}, middleware};
use std::sync::Arc;

use crate::handler::health_tip_handler::{
    create_tip_handler,
    delete_tip_handler,
    list_tips_handler,
    random_tip_handler,
    update_tip_handler,
};
use crate::middlewares::auth_middleware::admin_auth;
use crate::service::health_tip_service::HealthTipService;

pub fn health_tip_router(service: Arc<dyn HealthTipService>) -> Router {
    let public = Router::new()
        .route("/healthtips/random", get(random_tip_handler));

    let admin = Router::new()
        .route("/healthtips", get(list_tips_handler).post(create_tip_handler))
        .route("/healthtips/{id}", put(update_tip_handler).delete(delete_tip_handler))
        .route_layer(middleware::from_fn(admin_auth));

    public
        .merge(admin)
        .with_state(service)
}
