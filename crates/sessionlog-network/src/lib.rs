//! Snapshot upload to the remote collector.

use async_trait::async_trait;
use reqwest::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use sessionlog_types::{config::ServerConfig, Result, SessionLogError};
use tracing::debug;

#[async_trait]
pub trait SnapshotUploader: Send + Sync {
    /// Posts one serialized snapshot. Any non-2xx status is an error.
    async fn upload(&self, body: String) -> Result<()>;
}

/// Plain JSON POST with an optional static auth header.
#[derive(Clone)]
pub struct HttpUploader {
    client: reqwest::Client,
    url: String,
    auth_header: Option<(HeaderName, HeaderValue)>,
}

impl HttpUploader {
    pub fn new(server: &ServerConfig) -> Result<Self> {
        let url = server.url().ok_or_else(|| {
            SessionLogError::Configuration("server.url is required to upload snapshots".into())
        })?;

        let auth_header = server
            .auth_header()
            .map(|(name, value)| {
                let name = HeaderName::from_bytes(name.as_bytes()).map_err(|err| {
                    SessionLogError::Configuration(format!("invalid api key header name: {err}"))
                })?;
                let value = HeaderValue::from_str(value).map_err(|err| {
                    SessionLogError::Configuration(format!("invalid api key value: {err}"))
                })?;
                Ok::<_, SessionLogError>((name, value))
            })
            .transpose()?;

        let client = reqwest::Client::builder()
            .build()
            .map_err(|err| network_error(format!("failed to build http client: {err}")))?;

        Ok(Self {
            client,
            url: url.to_owned(),
            auth_header,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl SnapshotUploader for HttpUploader {
    async fn upload(&self, body: String) -> Result<()> {
        let mut request = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, "application/json")
            .body(body);
        if let Some((name, value)) = &self.auth_header {
            request = request.header(name.clone(), value.clone());
        }

        let response = request
            .send()
            .await
            .map_err(|err| network_error(format!("request to {} failed: {err}", self.url)))?;

        let status = response.status();
        if status.is_success() {
            debug!("Collector accepted snapshot ({})", status);
            return Ok(());
        }

        let text = response.text().await.unwrap_or_default();
        Err(network_error(format!(
            "collector responded {}: {}",
            status.as_u16(),
            text
        )))
    }
}

pub fn network_error(message: impl Into<String>) -> SessionLogError {
    SessionLogError::Network(message.into())
}
