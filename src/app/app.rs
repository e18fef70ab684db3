use axum::{Router, routing::get, middleware};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::config::{AdminUserConfig, AppConfig, EmailConfig, JwtConfig};
use crate::handler::appointment_handler::AppointmentState;
use crate::middlewares::auth_middleware::{resolve_principal, AuthState};
use crate::repository::appointment_repo::{AppointmentRepositoryImpl, APPOINTMENTS_COLLECTION};
use crate::repository::file_store::FileStore;
use crate::repository::health_tip_repo::{HealthTipRepositoryImpl, HEALTH_TIPS_COLLECTION};
use crate::repository::repository_error::RepositoryResult;
use crate::repository::user_repo::{UserRepositoryImpl, USERS_COLLECTION};
use crate::router::appointment_router::appointment_router;
use crate::router::auth_router::auth_router;
use crate::router::health_tip_router::health_tip_router;
use crate::router::user_router::user_router;
use crate::service::appointment_service::{AppointmentService, AppointmentServiceImpl};
use crate::service::auth_service::{AuthService, AuthServiceImpl};
use crate::service::health_tip_service::{HealthTipService, HealthTipServiceImpl};
use crate::service::stats_service::{StatsService, StatsServiceImpl};
use crate::util::email::SmtpEmailService;
use crate::util::jwt::{JwtTokenUtils, JwtTokenUtilsImpl};
use crate::util::notifier::{LogNotifier, NotificationDispatcher, Notifier};

/// Every service of the backend, wired over one file store.
pub struct Services {
    pub auth: Arc<dyn AuthService>,
    pub appointments: Arc<dyn AppointmentService>,
    pub stats: Arc<dyn StatsService>,
    pub health_tips: Arc<dyn HealthTipService>,
    pub jwt_utils: Arc<dyn JwtTokenUtils>,
    pub dispatcher: Arc<NotificationDispatcher>,
}

impl Services {
    /// Create the data files if needed and start the notification dispatcher.
    pub async fn build(config: &AppConfig, jwt_config: JwtConfig, notifier: Arc<dyn Notifier>) -> RepositoryResult<Self> {
        let store = Arc::new(FileStore::new(config.data_dir.clone(), config.write_mode));
        store
            .init(&[USERS_COLLECTION, APPOINTMENTS_COLLECTION, HEALTH_TIPS_COLLECTION])
            .await?;

        let user_repo = Arc::new(UserRepositoryImpl::new(store.clone()));
        let appointment_repo = Arc::new(AppointmentRepositoryImpl::new(store.clone()));
        let health_tip_repo = Arc::new(HealthTipRepositoryImpl::new(store));

        let jwt = JwtTokenUtilsImpl::new(jwt_config);
        let expires_in = jwt.expires_in();
        let jwt_utils: Arc<dyn JwtTokenUtils> = Arc::new(jwt);

        let dispatcher = Arc::new(NotificationDispatcher::new(notifier));
        dispatcher.init();

        let auth = Arc::new(AuthServiceImpl::new(
            user_repo.clone(),
            appointment_repo.clone(),
            jwt_utils.clone(),
            expires_in,
            config.deletion_mode,
        ));
        let appointments = Arc::new(AppointmentServiceImpl::new(appointment_repo.clone(), dispatcher.clone()));
        let stats = Arc::new(StatsServiceImpl::new(appointment_repo, user_repo));
        let health_tips = Arc::new(HealthTipServiceImpl::new(health_tip_repo));

        Ok(Services { auth, appointments, stats, health_tips, jwt_utils, dispatcher })
    }

    /// The full HTTP surface, `/api` routes plus `/health`.
    pub fn router(&self) -> Router {
        let auth_state = Arc::new(AuthState {
            jwt_utils: self.jwt_utils.clone(),
            auth_service: self.auth.clone(),
        });
        let appointment_state = Arc::new(AppointmentState {
            appointments: self.appointments.clone(),
            stats: self.stats.clone(),
        });

        let api = Router::new()
            .merge(auth_router(self.auth.clone()))
            .merge(user_router(self.auth.clone()))
            .merge(appointment_router(appointment_state))
            .merge(health_tip_router(self.health_tips.clone()));

        Router::new()
            .nest("/api", api)
            .route("/health", get(|| async { "OK" }))
            .layer(middleware::from_fn_with_state(auth_state, resolve_principal))
    }

    /// Seed default health tips and the first admin account.
    pub async fn seed(&self, admin: Option<AdminUserConfig>) {
        match self.health_tips.seed_defaults().await {
            Ok(0) => {}
            Ok(seeded) => info!("Seeded {} default health tips", seeded),
            Err(e) => error!("Failed to seed health tips: {}", e),
        }

        let Some(admin) = admin else {
            return;
        };
        match self
            .auth
            .ensure_admin(&admin.name, &admin.email, &admin.phone, &admin.password)
            .await
        {
            Ok(true) => info!("First admin user created."),
            Ok(false) => info!("Admin user already exists, skipping creation."),
            Err(e) => error!("Failed to create admin user: {}", e),
        }
    }
}

pub struct App {
    config: AppConfig,
    services: Services,
}

impl App {
    pub async fn new() -> Self {
        let config = AppConfig::from_env().expect("App config error");
        let jwt_config = JwtConfig::from_env().expect("JWT config error");

        let notifier: Arc<dyn Notifier> = match EmailConfig::from_env() {
            Ok(email_config) => match SmtpEmailService::new(email_config) {
                Ok(service) => Arc::new(service),
                Err(e) => {
                    warn!("SMTP transport unavailable, notifications are logged only: {}", e);
                    Arc::new(LogNotifier)
                }
            },
            Err(e) => {
                warn!("Email config not loaded, notifications are logged only: {}", e);
                Arc::new(LogNotifier)
            }
        };

        let services = Services::build(&config, jwt_config, notifier)
            .await
            .expect("Failed to initialise data store");

        let admin = match AdminUserConfig::from_env() {
            Ok(c) => Some(c),
            Err(e) => {
                warn!("Admin user config not loaded: {}", e);
                None
            }
        };
        services.seed(admin).await;

        App { config, services }
    }

    pub async fn start(self) {
        let addr: SocketAddr = self.config.bind_address().parse().expect("Invalid host");
        info!("🚀 Server running at http://{}", addr);
        let listener = tokio::net::TcpListener::bind(addr).await.expect("Failed to bind address");
        let dispatcher = self.services.dispatcher.clone();
        axum::serve(listener, self.services.router())
            .with_graceful_shutdown(shutdown_signal())
            .await
            .expect("Failed to start server");
        dispatcher.shutdown().await;
        info!("Server stopped");
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
}
