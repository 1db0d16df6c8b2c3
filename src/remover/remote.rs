//! remove.bg compatible HTTP API

use super::BackgroundRemover;
use crate::{
    config::RemoteApiConfig,
    error::{Result, SplicerError},
};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{
    multipart::{Form, Part},
    Client,
};
use std::time::Duration;
use tracing::{error, info, instrument};

/// Forwards uploads to a remove.bg compatible endpoint
#[derive(Debug, Clone)]
pub struct RemoteApiRemover {
    client: Client,
    config: RemoteApiConfig,
}

impl RemoteApiRemover {
    /// Create a remover with its own HTTP client
    ///
    /// A missing API key is not an error here; requests fail individually instead.
    ///
    /// # Errors
    /// - Failed to create HTTP client
    pub fn new(config: RemoteApiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SplicerError::network_error("Failed to create HTTP client", e))?;
        Ok(Self { client, config })
    }

    fn form(&self, image: Bytes) -> Form {
        let part = Part::bytes(image.to_vec()).file_name("image.png");
        Form::new()
            .part("image_file", part)
            .text("size", self.config.size.clone())
    }
}

#[async_trait]
impl BackgroundRemover for RemoteApiRemover {
    fn name(&self) -> &'static str {
        "remote-api"
    }

    #[instrument(skip_all, fields(bytes = image.len(), endpoint = %self.config.endpoint))]
    async fn remove_background(&self, image: Bytes) -> Result<Bytes> {
        let api_key = self.config.usable_api_key().ok_or_else(|| {
            SplicerError::invalid_config("Server configuration error: Missing API Key")
        })?;

        let response = self
            .client
            .post(&self.config.endpoint)
            .header("X-Api-Key", api_key)
            .multipart(self.form(image))
            .send()
            .await
            .map_err(|e| SplicerError::network_error("Remove.bg request", e))?;

        let status = response.status();
        if !status.is_success() {
            // Body is diagnostic only; a read failure must not mask the status
            let body = response.text().await.unwrap_or_default();
            error!(status = status.as_u16(), body = %body, "Remove.bg API returned an error");
            return Err(SplicerError::upstream(
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown Status"),
            ));
        }

        let result = response
            .bytes()
            .await
            .map_err(|e| SplicerError::network_error("Reading remove.bg response", e))?;
        info!(result_bytes = result.len(), "Remove.bg request succeeded");
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PLACEHOLDER_API_KEY;

    #[tokio::test]
    async fn test_placeholder_key_fails_before_any_request() {
        // Unroutable endpoint: reaching the network would surface a network error instead
        let config = RemoteApiConfig {
            api_key: Some(PLACEHOLDER_API_KEY.to_string()),
            endpoint: "http://127.0.0.1:9/removebg".to_string(),
            ..RemoteApiConfig::default()
        };
        let remover = RemoteApiRemover::new(config).unwrap();

        let err = remover
            .remove_background(Bytes::from_static(b"png"))
            .await
            .unwrap_err();
        assert_eq!(err.category(), "configuration");
        assert!(err.to_string().contains("Missing API Key"));
    }
}
