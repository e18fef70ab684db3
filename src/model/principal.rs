use serde::Serialize;

use crate::model::user::{Role, User};
use crate::util::error::ServiceError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthenticatedUser {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: Role,
}

impl From<&User> for AuthenticatedUser {
    fn from(user: &User) -> Self {
        AuthenticatedUser {
            id: user.id.clone(),
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role,
        }
    }
}

/// The identity an operation runs as. Resolved once per request and passed
/// explicitly to every service call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Principal {
    #[default]
    Anonymous,
    Authenticated(AuthenticatedUser),
}

impl Principal {
    pub fn user(&self) -> Option<&AuthenticatedUser> {
        match self {
            Principal::Authenticated(user) => Some(user),
            Principal::Anonymous => None,
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Principal::Authenticated(user) if user.role == Role::Admin)
    }

    pub fn require_user(&self) -> Result<&AuthenticatedUser, ServiceError> {
        self.user()
            .ok_or_else(|| ServiceError::Unauthenticated("Please login to access this resource".to_string()))
    }

    /// Anyone who is not an authenticated admin, anonymous callers included,
    /// gets `Forbidden`.
    pub fn require_admin(&self) -> Result<&AuthenticatedUser, ServiceError> {
        match self {
            Principal::Authenticated(user) if user.role == Role::Admin => Ok(user),
            _ => Err(ServiceError::Forbidden("Admin access required".to_string())),
        }
    }
}
