//! Appointment notifications.
//!
//! Lifecycle transitions hand a [`Notification`] to the
//! [`NotificationDispatcher`], which delivers it on a background task through
//! whatever [`Notifier`] it was built with. Delivery failures are logged and
//! never reach the operation that triggered them.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::model::appointment::Appointment;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationEvent {
    /// A booking was stored with status `pending`.
    PendingReceived,
    Confirmed,
    Cancelled { reason: String },
}

impl NotificationEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationEvent::PendingReceived => "pending_received",
            NotificationEvent::Confirmed => "confirmed",
            NotificationEvent::Cancelled { .. } => "cancelled",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub event: NotificationEvent,
    pub appointment: Appointment,
    pub reference: String,
}

impl Notification {
    pub fn new(event: NotificationEvent, appointment: &Appointment) -> Self {
        Notification {
            event,
            reference: appointment.reference_code(),
            appointment: appointment.clone(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("Delivery failed: {0}")]
    DeliveryFailed(String),
    #[error("Could not render notification: {0}")]
    RenderFailed(String),
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &Notification) -> Result<(), NotificationError>;
}

/// Writes notifications to the log instead of sending them. Used when no
/// SMTP server is configured.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NotificationError> {
        info!(
            event = notification.event.as_str(),
            reference = %notification.reference,
            to = %notification.appointment.patient_email,
            "Email notification (transport not configured)"
        );
        Ok(())
    }
}

pub struct NotificationDispatcher {
    notifier: Arc<dyn Notifier>,
    tasks: Mutex<JoinSet<()>>,
    running: AtomicBool,
}

impl NotificationDispatcher {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        NotificationDispatcher {
            notifier,
            tasks: Mutex::new(JoinSet::new()),
            running: AtomicBool::new(false),
        }
    }

    /// Start accepting notifications.
    pub fn init(&self) {
        self.running.store(true, Ordering::SeqCst);
        info!("Notification dispatcher started");
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Schedule delivery and return immediately. Must be called from within a
    /// tokio runtime. Notifications sent before `init` or after `shutdown` are
    /// dropped with a warning.
    pub fn dispatch(&self, notification: Notification) {
        if !self.is_running() {
            warn!(
                event = notification.event.as_str(),
                reference = %notification.reference,
                "Notification dropped, dispatcher is not running"
            );
            return;
        }

        let notifier = Arc::clone(&self.notifier);
        let mut tasks = self.tasks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        while tasks.try_join_next().is_some() {}
        tasks.spawn(async move {
            match notifier.notify(&notification).await {
                Ok(()) => debug!(
                    event = notification.event.as_str(),
                    reference = %notification.reference,
                    "Notification delivered"
                ),
                Err(e) => error!(
                    event = notification.event.as_str(),
                    reference = %notification.reference,
                    "Notification failed: {}",
                    e
                ),
            }
        });
    }

    /// Wait for every delivery scheduled so far.
    pub async fn flush(&self) {
        loop {
            let mut pending = {
                let mut tasks = self.tasks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                std::mem::take(&mut *tasks)
            };
            if pending.is_empty() {
                return;
            }
            while let Some(result) = pending.join_next().await {
                if let Err(e) = result {
                    error!("Notification task panicked: {}", e);
                }
            }
        }
    }

    /// Stop accepting notifications and drain the ones in flight.
    pub async fn shutdown(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.flush().await;
        info!("Notification dispatcher stopped");
    }
}
