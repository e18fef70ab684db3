use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use tracing::{error, info, instrument, warn};
use validator::ValidateEmail;

use crate::config::DeletionMode;
use crate::model::principal::{AuthenticatedUser, Principal};
use crate::model::user::{LoginHistory, NewUser, Role, User, UserProfile, UserUpdate};
use crate::repository::appointment_repo::AppointmentRepository;
use crate::repository::user_repo::UserRepository;
use crate::util::error::ServiceError;
use crate::util::jwt::JwtTokenUtils;
use crate::util::password::{PasswordUtils, PasswordUtilsImpl};

#[derive(Debug, Clone)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub user: UserProfile,
    pub token: String,
    pub expires_in: i64,
}

#[async_trait]
pub trait AuthService: Send + Sync {
    async fn register(&self, registration: Registration) -> Result<AuthResponse, ServiceError>;
    async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, ServiceError>;
    /// Resolve a bearer token to a principal. Never fails: anything short of a
    /// valid token for an active user yields [`Principal::Anonymous`].
    async fn authenticate(&self, token: Option<&str>) -> Principal;
    async fn me(&self, principal: &Principal) -> Result<UserProfile, ServiceError>;
    async fn change_password(&self, principal: &Principal, current_password: &str, new_password: &str) -> Result<(), ServiceError>;
    async fn change_email(&self, principal: &Principal, new_email: &str, password: &str) -> Result<UserProfile, ServiceError>;
    async fn update_profile(&self, principal: &Principal, name: Option<String>, phone: Option<String>) -> Result<UserProfile, ServiceError>;
    async fn delete_account(&self, principal: &Principal, password: &str) -> Result<(), ServiceError>;
    async fn login_history(&self, principal: &Principal, user_id: &str) -> Result<LoginHistory, ServiceError>;
    async fn list_users(&self, principal: &Principal) -> Result<Vec<UserProfile>, ServiceError>;
    async fn get_user(&self, principal: &Principal, user_id: &str) -> Result<UserProfile, ServiceError>;
    /// Create an admin account unless one with this email already exists.
    /// Returns whether a user was created.
    async fn ensure_admin(&self, name: &str, email: &str, phone: &str, password: &str) -> Result<bool, ServiceError>;
}

pub struct AuthServiceImpl {
    pub user_repo: Arc<dyn UserRepository>,
    pub appointment_repo: Arc<dyn AppointmentRepository>,
    pub jwt_utils: Arc<dyn JwtTokenUtils>,
    pub expires_in: i64,
    pub deletion_mode: DeletionMode,
}

impl AuthServiceImpl {
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        appointment_repo: Arc<dyn AppointmentRepository>,
        jwt_utils: Arc<dyn JwtTokenUtils>,
        expires_in: i64,
        deletion_mode: DeletionMode,
    ) -> Self {
        Self { user_repo, appointment_repo, jwt_utils, expires_in, deletion_mode }
    }

    fn issue(&self, user: &User) -> Result<AuthResponse, ServiceError> {
        let token = self
            .jwt_utils
            .generate_token(&user.id, &user.email, user.role.as_str())
            .map_err(|e| ServiceError::Internal(format!("JWT error: {}", e)))?;
        Ok(AuthResponse {
            user: UserProfile::from(user),
            token,
            expires_in: self.expires_in,
        })
    }

    async fn current_user(&self, principal: &Principal) -> Result<User, ServiceError> {
        let identity = principal.require_user()?;
        self.user_repo
            .find_by_id(&identity.id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))
    }

    async fn insert_user(&self, name: &str, email: &str, phone: &str, password: &str, role: Role) -> Result<User, ServiceError> {
        let password_hash = hash_password(password.to_string()).await?;
        let user = self
            .user_repo
            .insert(NewUser {
                name: name.to_string(),
                email: email.to_string(),
                phone: phone.to_string(),
                password_hash,
                role,
                is_active: true,
                last_login: None,
            })
            .await?;
        Ok(user)
    }
}

/// Argon2 is CPU bound, keep it off the async workers.
async fn hash_password(password: String) -> Result<String, ServiceError> {
    tokio::task::spawn_blocking(move || PasswordUtilsImpl::hash_password(&password))
        .await
        .map_err(|e| ServiceError::Internal(format!("Hashing task failed: {}", e)))?
        .map_err(|e| ServiceError::Internal(format!("Password hash error: {}", e)))
}

async fn verify_password(password: &str, hash: &str) -> Result<bool, ServiceError> {
    let (password, hash) = (password.to_string(), hash.to_string());
    tokio::task::spawn_blocking(move || PasswordUtilsImpl::verify_password(&password, &hash))
        .await
        .map_err(|e| ServiceError::Internal(format!("Verification task failed: {}", e)))?
        .map_err(|e| ServiceError::Internal(format!("Password verify error: {}", e)))
}

fn required(value: &str, field: &str) -> Result<String, ServiceError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ServiceError::Validation(format!("{} is required", field)));
    }
    Ok(value.to_string())
}

#[async_trait]
impl AuthService for AuthServiceImpl {
    #[instrument(skip(self, registration), fields(email = %registration.email))]
    async fn register(&self, registration: Registration) -> Result<AuthResponse, ServiceError> {
        info!("Registering new user");
        let name = required(&registration.name, "Name")?;
        let email = required(&registration.email, "Email")?;
        let phone = required(&registration.phone, "Phone")?;
        if registration.password.is_empty() {
            return Err(ServiceError::Validation("Password is required".to_string()));
        }

        if self.user_repo.find_by_email(&email).await?.is_some() {
            warn!("Registration rejected, email already registered");
            return Err(ServiceError::DuplicateEmail);
        }

        let user = self
            .insert_user(&name, &email, &phone, &registration.password, Role::Patient)
            .await?;
        info!(user_id = %user.id, "User registered successfully");
        self.issue(&user)
    }

    #[instrument(skip(self, password), fields(email = %email))]
    async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, ServiceError> {
        info!("User login attempt");
        let user = match self.user_repo.find_by_email(email).await? {
            Some(user) if user.is_active => user,
            _ => {
                warn!("No active user for login");
                return Err(ServiceError::InvalidCredentials);
            }
        };
        if !verify_password(password, &user.password_hash).await? {
            warn!(user_id = %user.id, "Invalid password");
            return Err(ServiceError::InvalidCredentials);
        }

        let stamped = self
            .user_repo
            .update(&user.id, UserUpdate { last_login: Some(Utc::now()), ..Default::default() })
            .await?
            .unwrap_or(user);
        info!(user_id = %stamped.id, "User logged in successfully");
        self.issue(&stamped)
    }

    async fn authenticate(&self, token: Option<&str>) -> Principal {
        let Some(token) = token else {
            return Principal::Anonymous;
        };
        let claims = match self.jwt_utils.validate_token(token) {
            Ok(claims) => claims,
            Err(e) => {
                warn!("Ignoring invalid token: {}", e);
                return Principal::Anonymous;
            }
        };
        match self.user_repo.find_by_id(&claims.sub).await {
            Ok(Some(user)) if user.is_active => Principal::Authenticated(AuthenticatedUser::from(&user)),
            Ok(_) => {
                warn!(user_id = %claims.sub, "Token refers to a missing or inactive user");
                Principal::Anonymous
            }
            Err(e) => {
                error!("Failed to resolve token user: {}", e);
                Principal::Anonymous
            }
        }
    }

    async fn me(&self, principal: &Principal) -> Result<UserProfile, ServiceError> {
        let user = self.current_user(principal).await?;
        Ok(UserProfile::from(&user))
    }

    #[instrument(skip(self, principal, current_password, new_password))]
    async fn change_password(&self, principal: &Principal, current_password: &str, new_password: &str) -> Result<(), ServiceError> {
        let user = self.current_user(principal).await?;
        if !verify_password(current_password, &user.password_hash).await? {
            warn!(user_id = %user.id, "Password change rejected, current password incorrect");
            return Err(ServiceError::InvalidCredentials);
        }
        PasswordUtilsImpl::validate_password_strength(new_password).map_err(ServiceError::WeakPassword)?;

        let password_hash = hash_password(new_password.to_string()).await?;
        self.user_repo
            .update(
                &user.id,
                UserUpdate {
                    password_hash: Some(password_hash),
                    password_changed_at: Some(Utc::now()),
                    ..Default::default()
                },
            )
            .await?
            .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))?;
        info!(user_id = %user.id, "Password changed successfully");
        Ok(())
    }

    #[instrument(skip(self, principal, password), fields(new_email = %new_email))]
    async fn change_email(&self, principal: &Principal, new_email: &str, password: &str) -> Result<UserProfile, ServiceError> {
        principal.require_admin()?;
        let new_email = new_email.trim();
        if !new_email.to_string().validate_email() {
            return Err(ServiceError::Validation("Invalid email format".to_string()));
        }
        if self.user_repo.find_by_email(new_email).await?.is_some() {
            return Err(ServiceError::EmailInUse);
        }

        let user = self.current_user(principal).await?;
        if !verify_password(password, &user.password_hash).await? {
            warn!(user_id = %user.id, "Email change rejected, password incorrect");
            return Err(ServiceError::InvalidCredentials);
        }

        let updated = self
            .user_repo
            .update(
                &user.id,
                UserUpdate {
                    email: Some(new_email.to_string()),
                    old_email: Some(user.email.clone()),
                    email_changed_at: Some(Utc::now()),
                    ..Default::default()
                },
            )
            .await?
            .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))?;
        info!(user_id = %updated.id, "Email changed successfully");
        Ok(UserProfile::from(&updated))
    }

    #[instrument(skip(self, principal))]
    async fn update_profile(&self, principal: &Principal, name: Option<String>, phone: Option<String>) -> Result<UserProfile, ServiceError> {
        let user = self.current_user(principal).await?;
        let name = name.map(|n| required(&n, "Name")).transpose()?;
        let phone = phone.map(|p| required(&p, "Phone")).transpose()?;

        let updated = self
            .user_repo
            .update(&user.id, UserUpdate { name, phone, ..Default::default() })
            .await?
            .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))?;
        info!(user_id = %updated.id, "Profile updated");
        Ok(UserProfile::from(&updated))
    }

    #[instrument(skip(self, principal, password))]
    async fn delete_account(&self, principal: &Principal, password: &str) -> Result<(), ServiceError> {
        let user = self.current_user(principal).await?;
        if !verify_password(password, &user.password_hash).await? {
            warn!(user_id = %user.id, "Account deletion rejected, password incorrect");
            return Err(ServiceError::InvalidCredentials);
        }
        if user.role == Role::Admin && self.user_repo.count_active_admins().await? <= 1 {
            warn!(user_id = %user.id, "Refusing to delete the last active admin");
            return Err(ServiceError::LastAdminProtected);
        }

        // bookings first; a failure here leaves the account untouched
        let anonymized = self.appointment_repo.anonymize_owned_by(&user.id, &user.email).await?;

        match self.deletion_mode {
            DeletionMode::Soft => {
                self.user_repo
                    .update(
                        &user.id,
                        UserUpdate {
                            is_active: Some(false),
                            deleted_at: Some(Utc::now()),
                            email: Some(format!("deleted_{}_{}", user.id, user.email)),
                            ..Default::default()
                        },
                    )
                    .await?;
            }
            DeletionMode::Hard => {
                self.user_repo.remove(&user.id).await?;
            }
        }
        info!(user_id = %user.id, anonymized, mode = ?self.deletion_mode, "Account deleted");
        Ok(())
    }

    async fn login_history(&self, principal: &Principal, user_id: &str) -> Result<LoginHistory, ServiceError> {
        principal.require_admin()?;
        let user = self
            .user_repo
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))?;
        Ok(LoginHistory::from(&user))
    }

    async fn list_users(&self, principal: &Principal) -> Result<Vec<UserProfile>, ServiceError> {
        principal.require_admin()?;
        Ok(self.user_repo.list().await?.iter().map(UserProfile::from).collect())
    }

    async fn get_user(&self, principal: &Principal, user_id: &str) -> Result<UserProfile, ServiceError> {
        principal.require_admin()?;
        self.user_repo
            .find_by_id(user_id)
            .await?
            .map(|user| UserProfile::from(&user))
            .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))
    }

    #[instrument(skip(self, name, phone, password), fields(email = %email))]
    async fn ensure_admin(&self, name: &str, email: &str, phone: &str, password: &str) -> Result<bool, ServiceError> {
        if self.user_repo.find_by_email(email).await?.is_some() {
            info!("Admin user already exists");
            return Ok(false);
        }
        let admin = self.insert_user(name, email, phone, password, Role::Admin).await?;
        info!(user_id = %admin.id, "Admin user created");
        Ok(true)
    }
}
