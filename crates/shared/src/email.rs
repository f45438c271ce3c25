//! Email service for sending expense notifications.
//!
//! Uses `lettre` for SMTP transport.

use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor, message::header::ContentType,
    transport::smtp::authentication::Credentials,
};
use thiserror::Error;

use crate::config::EmailConfig;

/// Email service errors.
#[derive(Debug, Error)]
pub enum EmailError {
    /// Failed to build email message.
    #[error("Failed to build email: {0}")]
    BuildError(String),
    /// Failed to send email.
    #[error("Failed to send email: {0}")]
    SendError(String),
    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),
}

/// A rendered notification email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailContent {
    /// Subject line.
    pub subject: String,
    /// Plain-text body.
    pub body: String,
}

/// Email service for sending transactional emails.
#[derive(Debug, Clone)]
pub struct EmailService {
    config: EmailConfig,
}

impl EmailService {
    /// Creates a new email service.
    #[must_use]
    pub const fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    /// Returns true when SMTP delivery is switched on.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Creates an SMTP transport.
    fn create_transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>, EmailError> {
        let creds = Credentials::new(
            self.config.smtp_username.clone(),
            self.config.smtp_password.clone(),
        );

        Ok(
            AsyncSmtpTransport::<Tokio1Executor>::relay(&self.config.smtp_host)
                .map_err(|e| EmailError::SendError(e.to_string()))?
                .port(self.config.smtp_port)
                .credentials(creds)
                .build(),
        )
    }

    fn expense_link(&self, expense_id: &str) -> String {
        format!("{}/expenses/{expense_id}", self.config.frontend_url)
    }

    /// Renders the email asking an approver to review a pending expense.
    #[must_use]
    pub fn approval_request(
        &self,
        to_name: &str,
        expense_id: &str,
        title: &str,
        amount: &str,
        submitter_name: &str,
    ) -> EmailContent {
        let link = self.expense_link(expense_id);
        EmailContent {
            subject: format!("Approval needed: {title} ({amount})"),
            body: format!(
                r"Hi {to_name},

{submitter_name} submitted an expense that needs your approval.

Title:  {title}
Amount: {amount}

Review it here: {link}

The Expensa Team"
            ),
        }
    }

    /// Renders the email telling a submitter their expense was decided.
    #[must_use]
    pub fn decision(
        &self,
        to_name: &str,
        expense_id: &str,
        title: &str,
        outcome: &str,
        reason: Option<&str>,
    ) -> EmailContent {
        let link = self.expense_link(expense_id);
        let reason_line = reason
            .map(|r| format!("\nReason: {r}\n"))
            .unwrap_or_default();
        EmailContent {
            subject: format!("Your expense \"{title}\" was {outcome}"),
            body: format!(
                r"Hi {to_name},

Your expense {title} was {outcome}.
{reason_line}
Details: {link}

The Expensa Team"
            ),
        }
    }

    /// Sends a rendered email.
    ///
    /// # Errors
    ///
    /// Returns an error if the email cannot be sent.
    pub async fn send(&self, to_email: &str, content: &EmailContent) -> Result<(), EmailError> {
        self.send_email(to_email, &content.subject, &content.body)
            .await
    }

    /// Sends a generic email.
    ///
    /// # Errors
    ///
    /// Returns an error if the email cannot be sent.
    pub async fn send_email(
        &self,
        to_email: &str,
        subject: &str,
        body: &str,
    ) -> Result<(), EmailError> {
        let from = format!("{} <{}>", self.config.from_name, self.config.from_email);

        let email = Message::builder()
            .from(
                from.parse()
                    .map_err(|e| EmailError::InvalidAddress(format!("{e}")))?,
            )
            .to(to_email
                .parse()
                .map_err(|e| EmailError::InvalidAddress(format!("{e}")))?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| EmailError::BuildError(e.to_string()))?;

        let transport = self.create_transport()?;
        transport
            .send(email)
            .await
            .map_err(|e| EmailError::SendError(e.to_string()))?;

        Ok(())
    }
}
