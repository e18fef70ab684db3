use crate::config::{EmailConfig, ConfigError};
use crate::model::appointment::Appointment;
use crate::util::notifier::{Notification, NotificationError, NotificationEvent, Notifier};
use async_trait::async_trait;
use chrono::Local;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{header::ContentType, Mailbox},
    transport::smtp::{
        authentication::Credentials,
        client::{Tls, TlsParameters},
    },
};
use tracing::{error, info, instrument};

/// Email service errors
#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    #[error("Configuration error: {0}")]
    ConfigError(String),
    
    #[error("SMTP error: {0}")]
    SmtpError(String),
    
    #[error("Message building error: {0}")]
    MessageError(String),
    
    #[error("Address error: {0}")]
    AddressError(String),
    
}

impl From<ConfigError> for EmailError {
    fn from(err: ConfigError) -> Self {
        EmailError::ConfigError(err.to_string())
    }
}

/// Email message builder
#[derive(Debug, Clone)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub text_body: Option<String>,
    pub html_body: Option<String>,
}

impl EmailMessage {
    pub fn new(to: String, subject: String) -> Self {
        Self {
            to,
            subject,
            text_body: None,
            html_body: None,
        }
    }

    pub fn with_text_body(mut self, body: String) -> Self {
        self.text_body = Some(body);
        self
    }

    pub fn with_html_body(mut self, body: String) -> Self {
        self.html_body = Some(body);
        self
    }
}

/// SMTP email service implementation
pub struct SmtpEmailService {
    pub config: EmailConfig,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpEmailService {
    /// Create a new SMTP email service
    #[instrument(skip(config), fields(host = %config.smtp_host, port = config.smtp_port))]
    pub fn new(config: EmailConfig) -> Result<Self, EmailError> {
        info!("Initializing SMTP email service");
        
        config.validate().map_err(EmailError::from)?;

        let mut transport_builder = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.smtp_host)
            .port(config.smtp_port)
            .timeout(Some(std::time::Duration::from_secs(config.connection_timeout_secs)));

        // Configure TLS settings
        if config.use_tls {
            let tls_parameters = TlsParameters::new(config.smtp_host.clone())
                .map_err(|e| EmailError::ConfigError(format!("TLS configuration error: {}", e)))?;
            
            if config.use_starttls {
                transport_builder = transport_builder.tls(Tls::Required(tls_parameters));
            } else {
                transport_builder = transport_builder.tls(Tls::Wrapper(tls_parameters));
            }
        } else {
            transport_builder = transport_builder.tls(Tls::None);
        }

        // Configure authentication if credentials are provided
        if !config.smtp_username.is_empty() && !config.smtp_password.is_empty() {
            let credentials = Credentials::new(
                config.smtp_username.clone(),
                config.smtp_password.clone(),
            );
            transport_builder = transport_builder.credentials(credentials);
        }

        let transport = transport_builder.build();

        info!("SMTP email service initialized successfully");
        Ok(Self { config, transport })
    }

    /// Send an email message
    #[instrument(skip(self, message), fields(to = %message.to, subject = %message.subject))]
    pub async fn send_email(&self, message: EmailMessage) -> Result<(), EmailError> {
        info!("Sending email to: {}", message.to);
        
        self.validate_email_address(&message.to)?;
        
        let email_message = self.build_message(message)?;
        
        self.transport
            .send(email_message)
            .await
            .map_err(|e| {
                error!("Failed to send email: {}", e);
                EmailError::SmtpError(format!("Failed to send email: {}", e))
            })?;

        info!("Email sent successfully");
        Ok(())
    }

    /// Render and send the email for an appointment notification.
    #[instrument(skip(self, notification), fields(event = notification.event.as_str(), reference = %notification.reference))]
    pub async fn send_appointment_email(&self, notification: &Notification) -> Result<(), EmailError> {
        let message = render_appointment_email(notification, &self.config.contact_phone, &self.config.app_url);
        self.send_email(message).await
    }

    /// Build a lettre Message from EmailMessage
    fn build_message(&self, email_message: EmailMessage) -> Result<Message, EmailError> {
        let from_mailbox: Mailbox = format!("{} <{}>", self.config.from_name, self.config.from_email)
            .parse()
            .map_err(|e| EmailError::AddressError(format!("Invalid from address: {}", e)))?;

        let to_mailbox: Mailbox = email_message.to
            .parse()
            .map_err(|e| EmailError::AddressError(format!("Invalid to address: {}", e)))?;

        let message_builder = Message::builder()
            .from(from_mailbox)
            .to(to_mailbox)
            .subject(&email_message.subject);

        match (email_message.text_body, email_message.html_body) {
            (Some(text), Some(html)) => {
                // Multipart message with both text and HTML
                let message = message_builder
                    .multipart(
                        lettre::message::MultiPart::alternative()
                            .singlepart(
                                lettre::message::SinglePart::builder()
                                    .header(ContentType::TEXT_PLAIN)
                                    .body(text),
                            )
                            .singlepart(
                                lettre::message::SinglePart::builder()
                                    .header(ContentType::TEXT_HTML)
                                    .body(html),
                            ),
                    )
                    .map_err(|e| EmailError::MessageError(format!("Failed to build multipart message: {}", e)))?;
                return Ok(message);
            }
            (Some(text), None) => {
                // Text-only message
                let message = message_builder
                    .body(text)
                    .map_err(|e| EmailError::MessageError(format!("Failed to build text message: {}", e)))?;
                return Ok(message);
            }
            (None, Some(html)) => {
                // HTML-only message
                let message = message_builder
                    .singlepart(
                        lettre::message::SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html),
                    )
                    .map_err(|e| EmailError::MessageError(format!("Failed to build HTML message: {}", e)))?;
                return Ok(message);
            }
            (None, None) => {
                Err(EmailError::MessageError("No message body provided".to_string()))
            }
        }
    }

    /// Validate email address format
    fn validate_email_address(&self, email: &str) -> Result<(), EmailError> {
        if email.is_empty() {
            return Err(EmailError::AddressError("Email address cannot be empty".to_string()));
        }

        if !email.contains('@') {
            return Err(EmailError::AddressError("Invalid email format".to_string()));
        }

        // Basic email validation
        let parts: Vec<&str> = email.split('@').collect();
        if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
            return Err(EmailError::AddressError("Invalid email format".to_string()));
        }

        Ok(())
    }
}


#[async_trait]
impl Notifier for SmtpEmailService {
    async fn notify(&self, notification: &Notification) -> Result<(), NotificationError> {
        self.send_appointment_email(notification).await.map_err(|e| match e {
            EmailError::SmtpError(msg) => NotificationError::DeliveryFailed(msg),
            other => NotificationError::RenderFailed(other.to_string()),
        })
    }
}

/// Build the patient-facing message for `notification`.
pub fn render_appointment_email(notification: &Notification, contact_phone: &str, app_url: &str) -> EmailMessage {
    let appointment = &notification.appointment;
    let reference = &notification.reference;
    let (subject, text_body, html_body) = match &notification.event {
        NotificationEvent::PendingReceived => (
            format!("Appointment Request Received - Healthcare Plus (Ref: {})", reference),
            pending_text(appointment, reference, contact_phone),
            pending_html(appointment, reference, contact_phone),
        ),
        NotificationEvent::Confirmed => (
            format!("Appointment Confirmed - Healthcare Plus (Ref: {})", reference),
            confirmed_text(appointment, reference, contact_phone, app_url),
            confirmed_html(appointment, reference, contact_phone, app_url),
        ),
        NotificationEvent::Cancelled { reason } => (
            format!("Appointment Cancelled - Healthcare Plus (Ref: {})", reference),
            cancelled_text(appointment, reference, reason, contact_phone, app_url),
            cancelled_html(appointment, reference, reason, contact_phone, app_url),
        ),
    };
    EmailMessage::new(appointment.patient_email.clone(), subject)
        .with_text_body(text_body)
        .with_html_body(html_body)
}

fn booked_date(appointment: &Appointment) -> String {
    appointment.created_at.with_timezone(&Local).format("%A, %B %-d, %Y").to_string()
}

fn booked_time(appointment: &Appointment) -> String {
    appointment.created_at.with_timezone(&Local).format("%I:%M %p").to_string()
}

fn pending_text(appointment: &Appointment, reference: &str, contact_phone: &str) -> String {
    let message = if appointment.message.is_empty() {
        String::new()
    } else {
        format!("Message: {}\n", appointment.message)
    };
    format!(
        r#"Dear {name},

Thank you for choosing Healthcare Plus. Your appointment request has been RECEIVED and is pending confirmation.

Reference: {reference}
Department: {department}
Date: {date}
Time: {time}
{message}
Our team will review your request and contact you within 24 hours to confirm your appointment time.
You can view the status of your appointment anytime by logging into your account.

Healthcare Plus Hospital
Phone: {contact_phone}"#,
        name = appointment.patient_name,
        department = appointment.department.display_name(),
        date = booked_date(appointment),
        time = booked_time(appointment),
    )
}

fn pending_html(appointment: &Appointment, reference: &str, contact_phone: &str) -> String {
    let message = if appointment.message.is_empty() {
        String::new()
    } else {
        format!(
            "<p><strong>Message:</strong> {}</p>",
            html_escape::encode_text(&appointment.message)
        )
    };
    wrap_html(
        "Appointment Request Received",
        "#0D6986",
        &format!(
            r#"<p>Dear <strong>{name}</strong>,</p>
        <p>Thank you for choosing Healthcare Plus. Your appointment request has been <strong>RECEIVED</strong> and is pending confirmation.</p>
        <div class="details">
            <p><strong>Reference:</strong> {reference}</p>
            <p><strong>Department:</strong> {department}</p>
            <p><strong>Date:</strong> {date}</p>
            <p><strong>Time:</strong> {time}</p>
            {message}
        </div>
        <p>Our team will review your request and contact you within <strong>24 hours</strong> to confirm your appointment time.</p>"#,
            name = html_escape::encode_text(&appointment.patient_name),
            reference = html_escape::encode_text(reference),
            department = appointment.department.display_name(),
            date = booked_date(appointment),
            time = booked_time(appointment),
        ),
        contact_phone,
    )
}

fn confirmed_text(appointment: &Appointment, reference: &str, contact_phone: &str, app_url: &str) -> String {
    let notes = appointment
        .notes
        .as_deref()
        .filter(|notes| !notes.is_empty())
        .map(|notes| format!("Notes: {}\n", notes))
        .unwrap_or_default();
    format!(
        r#"Dear {name},

Your appointment has been CONFIRMED.

Reference: {reference}
Department: {department}
Date: {date}
Time: {time}
Status: Confirmed
{notes}
Please arrive 15 minutes before your scheduled time and bring your ID and insurance card.
If you need to reschedule, please call us at least 24 hours in advance.

For emergencies call {contact_phone} immediately.

{app_url}"#,
        name = appointment.patient_name,
        department = appointment.department.display_name(),
        date = booked_date(appointment),
        time = booked_time(appointment),
    )
}

fn confirmed_html(appointment: &Appointment, reference: &str, contact_phone: &str, app_url: &str) -> String {
    let notes = appointment
        .notes
        .as_deref()
        .filter(|notes| !notes.is_empty())
        .map(|notes| format!("<p><strong>Notes:</strong> {}</p>", html_escape::encode_text(notes)))
        .unwrap_or_default();
    wrap_html(
        "Appointment Confirmed",
        "#4CAF50",
        &format!(
            r#"<p>Dear <strong>{name}</strong>,</p>
        <p>Your appointment has been <strong>CONFIRMED</strong>.</p>
        <div class="details">
            <p><strong>Reference:</strong> {reference}</p>
            <p><strong>Department:</strong> {department}</p>
            <p><strong>Date:</strong> {date}</p>
            <p><strong>Time:</strong> {time}</p>
            <p><strong>Status:</strong> Confirmed</p>
            {notes}
        </div>
        <ul>
            <li>Please arrive <strong>15 minutes</strong> before your scheduled time</li>
            <li>Bring your ID and insurance card</li>
            <li>Bring any relevant medical records or test results</li>
            <li>If you need to reschedule, please call us at least 24 hours in advance</li>
        </ul>
        <p><a href="{app_url}" class="button">Visit Our Website</a></p>"#,
            name = html_escape::encode_text(&appointment.patient_name),
            reference = html_escape::encode_text(reference),
            department = appointment.department.display_name(),
            date = booked_date(appointment),
            time = booked_time(appointment),
            app_url = html_escape::encode_double_quoted_attribute(app_url),
        ),
        contact_phone,
    )
}

fn cancelled_text(appointment: &Appointment, reference: &str, reason: &str, contact_phone: &str, app_url: &str) -> String {
    format!(
        r#"Dear {name},

Your appointment has been CANCELLED.

Reference: {reference}
Department: {department}
Reason: {reason}
Cancelled by: {cancelled_by}

If you did not request this cancellation or if this is a mistake, please contact us immediately.
To book a new appointment, please visit {app_url} or call us at {contact_phone}."#,
        name = appointment.patient_name,
        department = appointment.department.display_name(),
        reason = if reason.is_empty() { "No reason provided" } else { reason },
        cancelled_by = appointment.cancelled_by_name.as_deref().unwrap_or("System"),
    )
}

fn cancelled_html(appointment: &Appointment, reference: &str, reason: &str, contact_phone: &str, app_url: &str) -> String {
    wrap_html(
        "Appointment Cancelled",
        "#dc3545",
        &format!(
            r#"<p>Dear <strong>{name}</strong>,</p>
        <p>Your appointment has been <strong>CANCELLED</strong>.</p>
        <div class="details">
            <p><strong>Reference:</strong> {reference}</p>
            <p><strong>Department:</strong> {department}</p>
            <p><strong>Reason:</strong> {reason}</p>
            <p><strong>Cancelled by:</strong> {cancelled_by}</p>
        </div>
        <p>If you did not request this cancellation or if this is a mistake, please contact us immediately.</p>
        <p><a href="{app_url}" class="button">Book New Appointment</a></p>"#,
            name = html_escape::encode_text(&appointment.patient_name),
            reference = html_escape::encode_text(reference),
            department = appointment.department.display_name(),
            reason = html_escape::encode_text(if reason.is_empty() { "No reason provided" } else { reason }),
            cancelled_by = html_escape::encode_text(appointment.cancelled_by_name.as_deref().unwrap_or("System")),
            app_url = html_escape::encode_double_quoted_attribute(app_url),
        ),
        contact_phone,
    )
}

fn wrap_html(title: &str, accent: &str, body: &str, contact_phone: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <style>
        body {{
            font-family: Arial, sans-serif;
            line-height: 1.6;
            color: #333;
            max-width: 600px;
            margin: 0 auto;
            padding: 20px;
        }}
        .header {{
            background-color: #0D6986;
            color: #ffffff;
            padding: 20px;
            text-align: center;
            border-radius: 8px 8px 0 0;
        }}
        .content {{
            background-color: #ffffff;
            padding: 30px;
            border: 1px solid #dee2e6;
        }}
        .details {{
            background-color: #f8f9fa;
            padding: 15px;
            border-radius: 4px;
            margin: 20px 0;
        }}
        .button {{
            display: inline-block;
            padding: 12px 24px;
            background-color: #0D6986;
            color: #ffffff;
            text-decoration: none;
            border-radius: 4px;
        }}
        .footer {{
            background-color: #f8f9fa;
            padding: 15px;
            text-align: center;
            font-size: 12px;
            color: #6c757d;
            border-radius: 0 0 8px 8px;
        }}
    </style>
</head>
<body>
    <div class="header">
        <h1>Healthcare Plus</h1>
    </div>
    <div class="content">
        <h2 style="color: {accent};">{title}</h2>
        {body}
    </div>
    <div class="footer">
        <p>Healthcare Plus Hospital</p>
        <p>Phone: {contact_phone}</p>
        <p>This is an automated message, please do not reply to this email.</p>
    </div>
</body>
</html>"#,
        contact_phone = html_escape::encode_text(contact_phone),
    )
}
