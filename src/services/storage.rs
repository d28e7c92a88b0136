// Object storage client
// Thin HTTP client for the hosted bucket API that keeps payment receipts.
// Uploads happen before any invoice row is touched, so a failed upload
// aborts the payment without leaving partial state.

use reqwest::Client;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage request failed: {0}")]
    Request(String),

    #[error("Storage API returned status {0}: {1}")]
    Api(u16, String),
}

pub struct StorageService {
    client: Client,
    api_url: String,
    api_key: String,
    bucket: String,
    public_url: String,
}

impl StorageService {
    pub fn new() -> Self {
        let config = &crate::app_config::config().storage;
        Self::with_config(
            config.api_url.clone(),
            config.api_key.clone(),
            config.bucket.clone(),
            config.public_url.clone(),
        )
    }

    pub fn with_config(
        api_url: String,
        api_key: String,
        bucket: String,
        public_url: String,
    ) -> Self {
        Self {
            client: Client::new(),
            api_url,
            api_key,
            bucket,
            public_url,
        }
    }

    /// Public URL an object will be served from once uploaded
    pub fn object_url(&self, path: &str) -> String {
        format!(
            "{}/{}/{}",
            self.public_url.trim_end_matches('/'),
            self.bucket,
            path.trim_start_matches('/')
        )
    }

    /// Upload an object and return its public URL
    #[tracing::instrument(skip(self, bytes), fields(path = %path, size = bytes.len()))]
    pub async fn upload(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StorageError> {
        let url = format!(
            "{}/object/{}/{}",
            self.api_url.trim_end_matches('/'),
            self.bucket,
            path.trim_start_matches('/')
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", content_type)
            .body(bytes)
            .send()
            .await
            .map_err(|e| StorageError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = status.as_u16(), "Receipt upload failed");
            return Err(StorageError::Api(status.as_u16(), body));
        }

        Ok(self.object_url(path))
    }
}

impl From<StorageError> for crate::utils::ApiError {
    fn from(err: StorageError) -> Self {
        crate::utils::ApiError::Storage(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_service() -> StorageService {
        StorageService::with_config(
            "http://localhost:9000".to_string(),
            "test-key".to_string(),
            "receipts".to_string(),
            "https://cdn.komplekin.id/public".to_string(),
        )
    }

    #[test]
    fn test_object_url_shape() {
        let service = test_service();
        assert_eq!(
            service.object_url("2025/06/abc.jpg"),
            "https://cdn.komplekin.id/public/receipts/2025/06/abc.jpg"
        );
    }

    #[test]
    fn test_object_url_normalizes_slashes() {
        let service = test_service();
        assert_eq!(
            service.object_url("/2025/06/abc.jpg"),
            "https://cdn.komplekin.id/public/receipts/2025/06/abc.jpg"
        );
    }
}
