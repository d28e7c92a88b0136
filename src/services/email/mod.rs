// Email service module
// Orchestrates builders and the sender. Templates are compiled once at
// service construction and shared behind an Arc.

pub mod builders;
pub mod sender;
pub mod types;

use self::types::EmailBuilder;
use crate::app_config::EmailConfig;
use anyhow::Result;
use builders::{
    OverdueReminderEmailBuilder, PasswordChangedEmailBuilder, PasswordResetEmailBuilder,
    VerificationLinkEmailBuilder,
};
use chrono::NaiveDate;
use handlebars::Handlebars;
use sender::EmailSender;
use std::sync::Arc;
use tracing::{info, instrument};

#[derive(Clone)]
pub struct EmailService {
    sender: EmailSender,
    config: EmailConfig,
    templates: Arc<Handlebars<'static>>,
    verification_ttl_hours: u32,
    reset_ttl_minutes: u32,
}

impl EmailService {
    pub fn new(config: EmailConfig) -> Result<Self> {
        let tokens = &crate::app_config::config().tokens;
        Self::with_ttls(
            config,
            (tokens.email_verification_ttl / 3600) as u32,
            (tokens.password_reset_ttl / 60) as u32,
        )
    }

    pub fn with_ttls(
        config: EmailConfig,
        verification_ttl_hours: u32,
        reset_ttl_minutes: u32,
    ) -> Result<Self> {
        let mut templates = Handlebars::new();
        Self::register_templates(&mut templates)?;

        let sender =
            EmailSender::new_resend(config.resend_api_key.clone(), config.resend_api_url.clone())
                .with_max_retries(3)
                .with_retry_delay(std::time::Duration::from_secs(1));

        Ok(Self {
            sender,
            config,
            templates: Arc::new(templates),
            verification_ttl_hours,
            reset_ttl_minutes,
        })
    }

    fn register_templates(templates: &mut Handlebars) -> Result<(), types::EmailError> {
        let pairs = [
            (
                "email_verification",
                include_str!("../../../templates/email/email_verification.html"),
            ),
            (
                "password_reset",
                include_str!("../../../templates/email/password_reset.html"),
            ),
            (
                "password_changed",
                include_str!("../../../templates/email/password_changed.html"),
            ),
            (
                "overdue_reminder",
                include_str!("../../../templates/email/overdue_reminder.html"),
            ),
        ];

        for (name, template) in pairs {
            templates
                .register_template_string(name, template)
                .map_err(|e| types::EmailError::TemplateError(e.to_string()))?;
        }

        Ok(())
    }

    /// Send the account invitation with an email verification link
    #[instrument(skip(self, token))]
    pub async fn send_verification_email(
        &self,
        to_email: &str,
        user_name: &str,
        token: &str,
    ) -> Result<(), types::EmailError> {
        info!("Sending verification email to {}", to_email);

        let builder = VerificationLinkEmailBuilder::new(
            to_email,
            user_name,
            token,
            self.verification_ttl_hours,
            &self.config,
            &self.templates,
        );

        let message = builder.build()?;
        self.sender.send_with_retry(message).await
    }

    /// Send password reset email with secure token
    #[instrument(skip(self, reset_token))]
    pub async fn send_password_reset_email(
        &self,
        to_email: &str,
        user_name: &str,
        reset_token: &str,
    ) -> Result<(), types::EmailError> {
        info!("Sending password reset email to {}", to_email);

        let builder = PasswordResetEmailBuilder::new(
            to_email,
            user_name,
            reset_token,
            self.reset_ttl_minutes,
            &self.config,
            &self.templates,
        );

        let message = builder.build()?;
        self.sender.send_with_retry(message).await
    }

    /// Send password change security notification
    #[instrument(skip(self))]
    pub async fn send_password_change_notification(
        &self,
        to_email: &str,
        user_name: &str,
    ) -> Result<(), types::EmailError> {
        info!("Sending password change notification to {}", to_email);

        let timestamp = chrono::Utc::now().format("%Y-%m-%d %H:%M UTC").to_string();
        let builder = PasswordChangedEmailBuilder::new(
            to_email,
            user_name,
            &timestamp,
            &self.config,
            &self.templates,
        );

        let message = builder.build()?;
        // Security notifications go out once, without retry
        self.sender.send(message).await
    }

    /// Send an overdue dues reminder
    #[instrument(skip(self))]
    pub async fn send_overdue_reminder(
        &self,
        to_email: &str,
        user_name: &str,
        dues_name: &str,
        amount: i64,
        due_date: NaiveDate,
    ) -> Result<(), types::EmailError> {
        info!("Sending overdue reminder to {}", to_email);

        let builder = OverdueReminderEmailBuilder::new(
            to_email,
            user_name,
            dues_name,
            amount,
            due_date,
            &self.config,
            &self.templates,
        );

        let message = builder.build()?;
        self.sender.send_with_retry(message).await
    }

    pub async fn health_check(&self) -> Result<(), EmailError> {
        self.sender.health_check().await
    }
}

pub use types::{EmailError, EmailMessage};

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_config() -> EmailConfig {
        EmailConfig {
            resend_api_key: "test_key".to_string(),
            resend_api_url: "https://api.resend.com/emails".to_string(),
            from_email: "noreply@komplekin.id".to_string(),
            from_name: "KomplekIn".to_string(),
            support_email: "support@komplekin.id".to_string(),
            frontend_url: "https://app.komplekin.id".to_string(),
        }
    }

    fn create_test_service() -> EmailService {
        EmailService::with_ttls(create_test_config(), 24, 60).unwrap()
    }

    #[test]
    fn test_email_service_creation() {
        let service = EmailService::with_ttls(create_test_config(), 24, 60);
        assert!(service.is_ok());
    }

    #[test]
    fn test_verification_email_renders() {
        let service = create_test_service();
        let builder = VerificationLinkEmailBuilder::new(
            "warga@example.com",
            "Budi",
            "tok_abc123",
            24,
            &service.config,
            &service.templates,
        );

        let message = builder.build().unwrap();
        assert!(message.html.contains("tok_abc123"));
        assert!(message
            .text
            .as_ref()
            .unwrap()
            .contains("verify-email?token=tok_abc123"));
    }

    #[test]
    fn test_reset_email_embeds_token_link() {
        let service = create_test_service();
        let builder = PasswordResetEmailBuilder::new(
            "warga@example.com",
            "Budi",
            "tok_reset",
            60,
            &service.config,
            &service.templates,
        );

        let message = builder.build().unwrap();
        assert!(message.html.contains("reset-password?token=tok_reset"));
    }

    #[test]
    fn test_overdue_reminder_renders_amount() {
        let service = create_test_service();
        let builder = OverdueReminderEmailBuilder::new(
            "warga@example.com",
            "Budi",
            "Iuran Keamanan",
            120_000,
            NaiveDate::from_ymd_opt(2025, 6, 5).unwrap(),
            &service.config,
            &service.templates,
        );

        let message = builder.build().unwrap();
        assert!(message.html.contains("Rp120.000"));
        assert!(message.html.contains("Iuran Keamanan"));
    }
}
