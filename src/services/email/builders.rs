// Email builders
// Each builder knows how to construct one email kind from its template.

use super::types::{
    EmailBuilder, EmailError, EmailMessage, OverdueReminderEmailData, PasswordChangedEmailData,
    PasswordResetEmailData, VerificationLinkEmailData,
};
use crate::app_config::EmailConfig;
use chrono::NaiveDate;
use handlebars::Handlebars;
use tracing::instrument;

fn sender_line(config: &EmailConfig) -> String {
    format!("{} <{}>", config.from_name, config.from_email)
}

/// Rupiah display without fractional units
pub fn format_rupiah(amount: i64) -> String {
    let digits = amount.abs().to_string();
    let mut grouped = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }
    if amount < 0 {
        format!("-Rp{}", grouped)
    } else {
        format!("Rp{}", grouped)
    }
}

/// Builder for email verification links sent to new residents
pub struct VerificationLinkEmailBuilder<'a> {
    to_email: &'a str,
    user_name: &'a str,
    token: &'a str,
    expiry_hours: u32,
    config: &'a EmailConfig,
    templates: &'a Handlebars<'a>,
}

impl<'a> VerificationLinkEmailBuilder<'a> {
    pub fn new(
        to_email: &'a str,
        user_name: &'a str,
        token: &'a str,
        expiry_hours: u32,
        config: &'a EmailConfig,
        templates: &'a Handlebars<'a>,
    ) -> Self {
        Self {
            to_email,
            user_name,
            token,
            expiry_hours,
            config,
            templates,
        }
    }
}

impl<'a> EmailBuilder for VerificationLinkEmailBuilder<'a> {
    #[instrument(skip(self))]
    fn build(&self) -> Result<EmailMessage, EmailError> {
        let verify_url = format!(
            "{}/verify-email?token={}",
            self.config.frontend_url, self.token
        );

        let data = VerificationLinkEmailData {
            verify_url: verify_url.clone(),
            user_name: self.user_name.to_string(),
            app_name: self.config.from_name.clone(),
            app_url: self.config.frontend_url.clone(),
            support_email: self.config.support_email.clone(),
            expiry_hours: self.expiry_hours,
        };

        let html = self
            .templates
            .render("email_verification", &data)
            .map_err(|e| EmailError::TemplateError(e.to_string()))?;

        let text = format!(
            "Hi {},\n\n\
            Welcome to {}! Please confirm your email address by opening the link below:\n\n\
            {}\n\n\
            The link expires in {} hours.\n\n\
            Best regards,\n\
            The {} Team",
            self.user_name, self.config.from_name, verify_url, self.expiry_hours,
            self.config.from_name
        );

        Ok(EmailMessage::new(
            sender_line(self.config),
            vec![self.to_email.to_string()],
            format!("Confirm your {} account", self.config.from_name),
            html,
        )
        .with_text(text))
    }
}

/// Builder for password reset emails
pub struct PasswordResetEmailBuilder<'a> {
    to_email: &'a str,
    user_name: &'a str,
    reset_token: &'a str,
    expiry_minutes: u32,
    config: &'a EmailConfig,
    templates: &'a Handlebars<'a>,
}

impl<'a> PasswordResetEmailBuilder<'a> {
    pub fn new(
        to_email: &'a str,
        user_name: &'a str,
        reset_token: &'a str,
        expiry_minutes: u32,
        config: &'a EmailConfig,
        templates: &'a Handlebars<'a>,
    ) -> Self {
        Self {
            to_email,
            user_name,
            reset_token,
            expiry_minutes,
            config,
            templates,
        }
    }
}

impl<'a> EmailBuilder for PasswordResetEmailBuilder<'a> {
    #[instrument(skip(self))]
    fn build(&self) -> Result<EmailMessage, EmailError> {
        let reset_url = format!(
            "{}/reset-password?token={}",
            self.config.frontend_url, self.reset_token
        );

        let data = PasswordResetEmailData {
            reset_url: reset_url.clone(),
            user_name: self.user_name.to_string(),
            app_name: self.config.from_name.clone(),
            app_url: self.config.frontend_url.clone(),
            support_email: self.config.support_email.clone(),
            expiry_minutes: self.expiry_minutes,
        };

        let html = self
            .templates
            .render("password_reset", &data)
            .map_err(|e| EmailError::TemplateError(e.to_string()))?;

        let text = format!(
            "Hi {},\n\n\
            We received a request to reset your password. Click the link below to set a new password:\n\n\
            {}\n\n\
            This link will expire in {} minutes and can only be used once.\n\n\
            If you didn't request this, please ignore this email. Your password won't be changed.\n\n\
            Best regards,\n\
            The {} Team",
            self.user_name, reset_url, self.expiry_minutes, self.config.from_name
        );

        Ok(EmailMessage::new(
            sender_line(self.config),
            vec![self.to_email.to_string()],
            format!("Password Reset Request - {}", self.config.from_name),
            html,
        )
        .with_text(text))
    }
}

/// Builder for the password changed security notice
pub struct PasswordChangedEmailBuilder<'a> {
    to_email: &'a str,
    user_name: &'a str,
    timestamp: &'a str,
    config: &'a EmailConfig,
    templates: &'a Handlebars<'a>,
}

impl<'a> PasswordChangedEmailBuilder<'a> {
    pub fn new(
        to_email: &'a str,
        user_name: &'a str,
        timestamp: &'a str,
        config: &'a EmailConfig,
        templates: &'a Handlebars<'a>,
    ) -> Self {
        Self {
            to_email,
            user_name,
            timestamp,
            config,
            templates,
        }
    }
}

impl<'a> EmailBuilder for PasswordChangedEmailBuilder<'a> {
    #[instrument(skip(self))]
    fn build(&self) -> Result<EmailMessage, EmailError> {
        let data = PasswordChangedEmailData {
            user_name: self.user_name.to_string(),
            timestamp: self.timestamp.to_string(),
            app_name: self.config.from_name.clone(),
            app_url: self.config.frontend_url.clone(),
            support_email: self.config.support_email.clone(),
        };

        let html = self
            .templates
            .render("password_changed", &data)
            .map_err(|e| EmailError::TemplateError(e.to_string()))?;

        let text = format!(
            "Hi {},\n\n\
            Your {} password was changed at {}.\n\n\
            If this was you, no further action is needed.\n\
            If you did not change your password, contact {} immediately.\n\n\
            Best regards,\n\
            The {} Team",
            self.user_name,
            self.config.from_name,
            self.timestamp,
            self.config.support_email,
            self.config.from_name
        );

        Ok(EmailMessage::new(
            sender_line(self.config),
            vec![self.to_email.to_string()],
            format!("Your {} password was changed", self.config.from_name),
            html,
        )
        .with_text(text))
    }
}

/// Builder for overdue dues reminders
pub struct OverdueReminderEmailBuilder<'a> {
    to_email: &'a str,
    user_name: &'a str,
    dues_name: &'a str,
    amount: i64,
    due_date: NaiveDate,
    config: &'a EmailConfig,
    templates: &'a Handlebars<'a>,
}

impl<'a> OverdueReminderEmailBuilder<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        to_email: &'a str,
        user_name: &'a str,
        dues_name: &'a str,
        amount: i64,
        due_date: NaiveDate,
        config: &'a EmailConfig,
        templates: &'a Handlebars<'a>,
    ) -> Self {
        Self {
            to_email,
            user_name,
            dues_name,
            amount,
            due_date,
            config,
            templates,
        }
    }
}

impl<'a> EmailBuilder for OverdueReminderEmailBuilder<'a> {
    #[instrument(skip(self))]
    fn build(&self) -> Result<EmailMessage, EmailError> {
        let pay_url = format!("{}/invoices", self.config.frontend_url);
        let amount = format_rupiah(self.amount);
        let due_date = self.due_date.format("%-d %B %Y").to_string();

        let data = OverdueReminderEmailData {
            user_name: self.user_name.to_string(),
            dues_name: self.dues_name.to_string(),
            amount: amount.clone(),
            due_date: due_date.clone(),
            pay_url: pay_url.clone(),
            app_name: self.config.from_name.clone(),
            support_email: self.config.support_email.clone(),
        };

        let html = self
            .templates
            .render("overdue_reminder", &data)
            .map_err(|e| EmailError::TemplateError(e.to_string()))?;

        let text = format!(
            "Hi {},\n\n\
            Your payment of {} for \"{}\" was due on {} and is still outstanding.\n\n\
            You can settle it here: {}\n\n\
            If you have already paid, please upload your receipt so the admin can verify it.\n\n\
            Best regards,\n\
            The {} Team",
            self.user_name, amount, self.dues_name, due_date, pay_url, self.config.from_name
        );

        Ok(EmailMessage::new(
            sender_line(self.config),
            vec![self.to_email.to_string()],
            format!("Payment reminder: {} is overdue", self.dues_name),
            html,
        )
        .with_text(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rupiah_grouping() {
        assert_eq!(format_rupiah(0), "Rp0");
        assert_eq!(format_rupiah(500), "Rp500");
        assert_eq!(format_rupiah(120_000), "Rp120.000");
        assert_eq!(format_rupiah(1_250_000), "Rp1.250.000");
    }
}
