#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::TempDir;

use healthcare_plus_backend::config::{DeletionMode, JwtConfig};
use healthcare_plus_backend::model::appointment::{Appointment, BookingRequest};
use healthcare_plus_backend::model::principal::{AuthenticatedUser, Principal};
use healthcare_plus_backend::model::user::Role;
use healthcare_plus_backend::repository::appointment_repo::{AppointmentRepository, AppointmentRepositoryImpl};
use healthcare_plus_backend::repository::file_store::{FileStore, WriteMode};
use healthcare_plus_backend::repository::user_repo::{UserRepository, UserRepositoryImpl};
use healthcare_plus_backend::service::appointment_service::{AppointmentService, AppointmentServiceImpl};
use healthcare_plus_backend::service::auth_service::{AuthService, AuthServiceImpl, Registration};
use healthcare_plus_backend::util::jwt::{JwtTokenUtils, JwtTokenUtilsImpl};
use healthcare_plus_backend::util::notifier::{Notification, NotificationDispatcher, NotificationError, Notifier};

/// Captures every notification instead of sending it.
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn events(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|n| n.event.as_str().to_string())
            .collect()
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NotificationError> {
        self.sent.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

/// Always fails, to check that delivery errors stay out of the caller's result.
pub struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    async fn notify(&self, _notification: &Notification) -> Result<(), NotificationError> {
        Err(NotificationError::DeliveryFailed("smtp down".to_string()))
    }
}

pub struct TestContext {
    pub dir: TempDir,
    pub store: Arc<FileStore>,
    pub notifier: Arc<RecordingNotifier>,
    pub dispatcher: Arc<NotificationDispatcher>,
    pub user_repo: Arc<dyn UserRepository>,
    pub appointment_repo: Arc<dyn AppointmentRepository>,
    pub jwt_utils: Arc<dyn JwtTokenUtils>,
    pub auth: Arc<dyn AuthService>,
    pub appointments: Arc<dyn AppointmentService>,
}

pub async fn setup() -> TestContext {
    setup_with(DeletionMode::Soft, WriteMode::LastWriterWins).await
}

pub async fn setup_with(deletion_mode: DeletionMode, write_mode: WriteMode) -> TestContext {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = Arc::new(FileStore::new(dir.path(), write_mode));
    store
        .init(&["users", "appointments", "healthtips"])
        .await
        .expect("init store");

    let user_repo: Arc<dyn UserRepository> = Arc::new(UserRepositoryImpl::new(store.clone()));
    let appointment_repo: Arc<dyn AppointmentRepository> = Arc::new(AppointmentRepositoryImpl::new(store.clone()));

    let jwt = JwtTokenUtilsImpl::new(JwtConfig::default());
    let expires_in = jwt.expires_in();
    let jwt_utils: Arc<dyn JwtTokenUtils> = Arc::new(jwt);

    let notifier = Arc::new(RecordingNotifier::default());
    let dispatcher = Arc::new(NotificationDispatcher::new(notifier.clone()));
    dispatcher.init();

    let auth: Arc<dyn AuthService> = Arc::new(AuthServiceImpl::new(
        user_repo.clone(),
        appointment_repo.clone(),
        jwt_utils.clone(),
        expires_in,
        deletion_mode,
    ));
    let appointments: Arc<dyn AppointmentService> =
        Arc::new(AppointmentServiceImpl::new(appointment_repo.clone(), dispatcher.clone()));

    TestContext {
        dir,
        store,
        notifier,
        dispatcher,
        user_repo,
        appointment_repo,
        jwt_utils,
        auth,
        appointments,
    }
}

pub fn admin_principal() -> Principal {
    Principal::Authenticated(AuthenticatedUser {
        id: "admin-1".to_string(),
        email: "admin@hospital.test".to_string(),
        name: "Admin".to_string(),
        role: Role::Admin,
    })
}

pub fn patient_principal(id: &str, email: &str) -> Principal {
    Principal::Authenticated(AuthenticatedUser {
        id: id.to_string(),
        email: email.to_string(),
        name: "Patient".to_string(),
        role: Role::Patient,
    })
}

pub fn booking(name: &str, email: &str, department: &str) -> BookingRequest {
    BookingRequest {
        patient_name: name.to_string(),
        patient_email: email.to_string(),
        patient_phone: "555".to_string(),
        department: department.to_string(),
        message: None,
    }
}

pub async fn book(ctx: &TestContext, email: &str) -> Appointment {
    ctx.appointments
        .book(booking("Jane Doe", email, "general"), &Principal::Anonymous)
        .await
        .expect("booking")
        .appointment
}

pub fn registration(name: &str, email: &str, password: &str) -> Registration {
    Registration {
        name: name.to_string(),
        email: email.to_string(),
        phone: "555-0100".to_string(),
        password: password.to_string(),
    }
}

/// Register a user and resolve its principal through the issued token.
pub async fn register_principal(ctx: &TestContext, email: &str, password: &str) -> Principal {
    let response = ctx
        .auth
        .register(registration("Test User", email, password))
        .await
        .expect("register");
    ctx.auth.authenticate(Some(&response.token)).await
}
