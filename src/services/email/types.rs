// Email service types
// Shared message, payload, and error shapes for the email module

use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EmailError {
    #[error("Failed to send email: {0}")]
    SendError(String),

    #[error("Template rendering error: {0}")]
    TemplateError(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Service unavailable")]
    ServiceUnavailable,

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Generic email message structure that can be sent
#[derive(Debug, Clone, Serialize)]
pub struct EmailMessage {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub html: String,
    pub text: Option<String>,
    pub reply_to: Option<String>,
}

impl EmailMessage {
    pub fn new(from: String, to: Vec<String>, subject: String, html: String) -> Self {
        Self {
            from,
            to,
            subject,
            html,
            text: None,
            reply_to: None,
        }
    }

    pub fn with_text(mut self, text: String) -> Self {
        self.text = Some(text);
        self
    }

    pub fn with_reply_to(mut self, reply_to: String) -> Self {
        self.reply_to = Some(reply_to);
        self
    }
}

/// Trait that all email builders must implement
pub trait EmailBuilder {
    fn build(&self) -> Result<EmailMessage, EmailError>;
}

/// Data for the email verification link template
#[derive(Serialize)]
pub struct VerificationLinkEmailData {
    pub verify_url: String,
    pub user_name: String,
    pub app_name: String,
    pub app_url: String,
    pub support_email: String,
    pub expiry_hours: u32,
}

/// Data for the password reset email template
#[derive(Serialize)]
pub struct PasswordResetEmailData {
    pub reset_url: String,
    pub user_name: String,
    pub app_name: String,
    pub app_url: String,
    pub support_email: String,
    pub expiry_minutes: u32,
}

/// Data for the password change notification template
#[derive(Serialize)]
pub struct PasswordChangedEmailData {
    pub user_name: String,
    pub timestamp: String,
    pub app_name: String,
    pub app_url: String,
    pub support_email: String,
}

/// Data for the overdue dues reminder template
#[derive(Serialize)]
pub struct OverdueReminderEmailData {
    pub user_name: String,
    pub dues_name: String,
    pub amount: String,
    pub due_date: String,
    pub pay_url: String,
    pub app_name: String,
    pub support_email: String,
}

/// Resend API specific email format. Optional fields are omitted from the
/// JSON payload when `None`.
#[derive(Debug, Serialize)]
pub struct ResendEmailPayload {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub html: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,
}

impl From<EmailMessage> for ResendEmailPayload {
    fn from(message: EmailMessage) -> Self {
        Self {
            from: message.from,
            to: message.to,
            subject: message.subject,
            html: message.html,
            text: message.text,
            reply_to: message.reply_to,
        }
    }
}
