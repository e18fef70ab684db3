use axum::{body::Body, extract::State, http::Request, middleware::Next, response::Response};
use std::sync::Arc;
use tracing::debug;

use crate::model::principal::Principal;
use crate::service::auth_service::AuthService;
use crate::util::error::{HandlerError, HandlerErrorKind};
use crate::util::jwt::JwtTokenUtils;

pub struct AuthState {
    pub jwt_utils: Arc<dyn JwtTokenUtils>,
    pub auth_service: Arc<dyn AuthService>,
}

/// Attach a [`Principal`] to every request. A missing or bad token never
/// rejects the request, it just leaves the caller anonymous.
pub async fn resolve_principal(
    State(state): State<Arc<AuthState>>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let token = req
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|header| state.jwt_utils.extract_token_from_header(header).ok());

    let principal = state.auth_service.authenticate(token.as_deref()).await;
    if let Some(user) = principal.user() {
        debug!(user_id = %user.id, role = %user.role, "Request authenticated");
    }
    req.extensions_mut().insert(principal);
    next.run(req).await
}

/// Gate for admin-only routes: 401 for anonymous callers, 403 for non-admins.
pub async fn admin_auth(req: Request<Body>, next: Next) -> Result<Response, HandlerError> {
    let principal = req.extensions().get::<Principal>().cloned().unwrap_or_default();
    match principal {
        Principal::Anonymous => Err(HandlerError::new(
            HandlerErrorKind::Unauthorized,
            "Please login to access this resource",
        )),
        ref p if !p.is_admin() => Err(HandlerError::new(HandlerErrorKind::Forbidden, "Admin access required")),
        _ => Ok(next.run(req).await),
    }
}
