// Email sender
// Delivers messages to the Resend HTTP API with bounded retry.

use super::types::{EmailError, EmailMessage, ResendEmailPayload};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, instrument, warn};

#[derive(Clone)]
pub struct EmailSender {
    client: Arc<Client>,
    api_key: String,
    api_url: String,
    max_retries: u32,
    retry_delay: Duration,
}

impl EmailSender {
    pub fn new_resend(api_key: String, api_url: String) -> Self {
        Self {
            client: Arc::new(Client::new()),
            api_key,
            api_url,
            max_retries: 3,
            retry_delay: Duration::from_secs(1),
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Send an email message
    #[instrument(skip(self, message), fields(to = ?message.to, subject = %message.subject))]
    pub async fn send(&self, message: EmailMessage) -> Result<(), EmailError> {
        let payload: ResendEmailPayload = message.into();

        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await;

        match response {
            Ok(res) if res.status().is_success() => {
                info!("Email sent successfully");
                Ok(())
            }
            Ok(res) => {
                let status = res.status();
                let error_text = res
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown error".to_string());

                error!(
                    "Failed to send email. Status: {}, Error: {}",
                    status, error_text
                );

                if status.as_u16() == 429 {
                    Err(EmailError::RateLimitExceeded)
                } else if status.is_server_error() {
                    Err(EmailError::ServiceUnavailable)
                } else {
                    Err(EmailError::SendError(format!(
                        "Email send failed with status {}: {}",
                        status, error_text
                    )))
                }
            }
            Err(e) => {
                error!("Network error while sending email: {:?}", e);
                Err(EmailError::SendError(format!("Network error: {}", e)))
            }
        }
    }

    /// Send an email with automatic retry on failure. Rate-limit responses
    /// are never retried.
    #[instrument(skip(self, message), fields(to = ?message.to, subject = %message.subject))]
    pub async fn send_with_retry(&self, message: EmailMessage) -> Result<(), EmailError> {
        let mut last_error = None;

        for attempt in 1..=self.max_retries {
            match self.send(message.clone()).await {
                Ok(()) => return Ok(()),
                Err(EmailError::RateLimitExceeded) => {
                    warn!("Rate limit hit, not retrying");
                    return Err(EmailError::RateLimitExceeded);
                }
                Err(e) => {
                    warn!("Email send attempt {} failed: {:?}", attempt, e);
                    last_error = Some(e);

                    if attempt < self.max_retries {
                        // Exponential backoff, capped, with jitter
                        let max_delay = Duration::from_secs(60);
                        let exp = (2_u32).checked_pow(attempt - 1).unwrap_or(u32::MAX);
                        let base_delay = self.retry_delay.checked_mul(exp).unwrap_or(max_delay);
                        let base_delay = base_delay.min(max_delay);

                        use rand::rngs::StdRng;
                        use rand::{Rng, SeedableRng};
                        let mut rng = StdRng::from_entropy();
                        let jitter_millis =
                            rng.gen_range(0..=(base_delay.as_millis() / 4) as u64);
                        let delay = base_delay + Duration::from_millis(jitter_millis);

                        info!("Retrying in {:?}", delay);
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            EmailError::SendError("Failed after maximum retry attempts".to_string())
        }))
    }

    /// Health check against the provider API
    pub async fn health_check(&self) -> Result<(), EmailError> {
        let response = self
            .client
            .get(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await;

        match response {
            Ok(res) if res.status().as_u16() == 401 => {
                Err(EmailError::ConfigError("Invalid API key".to_string()))
            }
            Ok(_) => Ok(()),
            Err(_e) => Err(EmailError::ServiceUnavailable),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_message_builder() {
        let message = EmailMessage::new(
            "noreply@komplekin.id".to_string(),
            vec!["warga@example.com".to_string()],
            "Test Subject".to_string(),
            "<h1>Test</h1>".to_string(),
        )
        .with_text("Test".to_string())
        .with_reply_to("support@komplekin.id".to_string());

        assert_eq!(message.from, "noreply@komplekin.id");
        assert_eq!(message.to, vec!["warga@example.com"]);
        assert_eq!(message.text, Some("Test".to_string()));
        assert_eq!(message.reply_to, Some("support@komplekin.id".to_string()));
    }

    #[test]
    fn test_resend_payload_omits_empty_optionals() {
        let message = EmailMessage::new(
            "noreply@komplekin.id".to_string(),
            vec!["warga@example.com".to_string()],
            "Test Subject".to_string(),
            "<h1>Test</h1>".to_string(),
        );

        let payload: ResendEmailPayload = message.into();
        let json = serde_json::to_value(&payload).unwrap();
        assert!(json.get("text").is_none());
        assert!(json.get("reply_to").is_none());
    }

    #[test]
    fn test_backoff_is_capped() {
        let sender = EmailSender::new_resend(
            "test_key".to_string(),
            "https://api.resend.com/emails".to_string(),
        )
        .with_retry_delay(Duration::from_secs(2));

        let max_delay = Duration::from_secs(60);
        let exp = (2_u32).checked_pow(49).unwrap_or(u32::MAX);
        let delay = sender.retry_delay.checked_mul(exp).unwrap_or(max_delay);
        assert_eq!(delay.min(max_delay), max_delay);
    }
}
