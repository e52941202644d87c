use std::sync::Arc;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};

use crate::config::{Config, SmtpCredentials};
use crate::errors::AppError;

/// A send-ready message handed to the transport.
#[derive(Debug, Clone)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// Outcome of a transport submission.
#[derive(Debug, Clone)]
pub struct SendReceipt {
    /// Provider message id; absent for simulated sends.
    pub message_id: Option<String>,
    /// True when no real transport was contacted.
    pub simulated: bool,
}

/// Narrow contract over the outbound mail transport.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> Result<SendReceipt, AppError>;
}

/// Real SMTP transport via lettre.
#[derive(Clone)]
pub struct SmtpMailer {
    credentials: SmtpCredentials,
}

impl SmtpMailer {
    pub fn new(credentials: SmtpCredentials) -> Self {
        Self { credentials }
    }

    fn send_blocking(&self, email: &OutgoingEmail) -> Result<SendReceipt, AppError> {
        let creds = Credentials::new(
            self.credentials.username.clone(),
            self.credentials.password.clone(),
        );

        let transport = SmtpTransport::relay(&self.credentials.host)
            .map_err(|e| AppError::Transport(format!("SMTP relay error: {}", e)))?
            .port(self.credentials.port)
            .credentials(creds)
            .build();

        let message = Message::builder()
            .from(
                self.credentials
                    .from_address
                    .parse()
                    .map_err(|e| AppError::Transport(format!("Invalid from address: {}", e)))?,
            )
            .to(email
                .to
                .parse()
                .map_err(|e| AppError::Transport(format!("Invalid to address: {}", e)))?)
            .subject(&email.subject)
            .header(ContentType::TEXT_HTML)
            .body(email.html.clone())
            .map_err(|e| AppError::Transport(format!("Failed to build email: {}", e)))?;

        let response = transport
            .send(&message)
            .map_err(|e| AppError::Transport(format!("SMTP send failed: {}", e)))?;

        let message_id = response
            .message()
            .next()
            .map(|line| line.to_string())
            .filter(|line| !line.is_empty());

        tracing::info!("✓ Email sent to {}", email.to);
        Ok(SendReceipt {
            message_id,
            simulated: false,
        })
    }
}

#[async_trait]
impl MailTransport for SmtpMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<SendReceipt, AppError> {
        // lettre's sync SMTP transport blocks; keep it off the async worker.
        let mailer = self.clone();
        let email = email.clone();
        tokio::task::spawn_blocking(move || mailer.send_blocking(&email))
            .await
            .map_err(|e| AppError::Transport(format!("SMTP task panicked: {}", e)))?
    }
}

/// Transport that records sends without contacting a mail server.
///
/// Used when no SMTP credentials are configured or the test environment
/// flag is set; every receipt is clearly flagged as simulated.
#[derive(Debug, Default)]
pub struct SimulatedMailer;

#[async_trait]
impl MailTransport for SimulatedMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<SendReceipt, AppError> {
        tracing::info!(
            "[SIMULATED EMAIL] Would send \"{}\" to {}",
            email.subject,
            email.to
        );
        Ok(SendReceipt {
            message_id: None,
            simulated: true,
        })
    }
}

/// Pick the transport for the current configuration.
pub fn build_transport(config: &Config) -> Arc<dyn MailTransport> {
    if config.simulate_sends() {
        Arc::new(SimulatedMailer)
    } else {
        // simulate_sends() is false only when credentials are present.
        match config.smtp.clone() {
            Some(credentials) => Arc::new(SmtpMailer::new(credentials)),
            None => Arc::new(SimulatedMailer),
        }
    }
}
