use std::{future::Future, time::Duration};

use anyhow::{bail, Context, Result};
use reqwest::Client;

use crate::config::BackendConfig;

use super::snapshot::SyncPayload;

/// Upstream sink for accumulated session metrics.
pub trait SyncBackend: Send + Sync + 'static {
    fn push(&self, payload: &SyncPayload) -> impl Future<Output = Result<()>> + Send;

    /// Disabled backends are skipped without counting as a failure.
    fn is_enabled(&self) -> bool {
        true
    }
}

/// Posts payloads as JSON to a fixed endpoint.
pub struct HttpBackend {
    http: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpBackend {
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let endpoint = endpoint.into();
        if endpoint.trim().is_empty() {
            bail!("backend endpoint cannot be empty");
        }

        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            http,
            endpoint,
            api_key,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl SyncBackend for HttpBackend {
    async fn push(&self, payload: &SyncPayload) -> Result<()> {
        let mut request = self.http.post(&self.endpoint).json(payload);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("failed to reach {}", self.endpoint))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("backend rejected sync with {status}: {body}");
        }
        Ok(())
    }
}

/// Stand-in used when no endpoint is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledBackend;

impl SyncBackend for DisabledBackend {
    async fn push(&self, _payload: &SyncPayload) -> Result<()> {
        Ok(())
    }

    fn is_enabled(&self) -> bool {
        false
    }
}

/// Either backend, chosen from configuration at startup.
pub enum ConfiguredBackend {
    Http(HttpBackend),
    Disabled(DisabledBackend),
}

impl ConfiguredBackend {
    pub fn from_config(config: &BackendConfig) -> Result<Self> {
        match config.endpoint.as_deref() {
            Some(endpoint) if !endpoint.trim().is_empty() => Ok(Self::Http(HttpBackend::new(
                endpoint,
                config.api_key.clone(),
                Duration::from_secs(config.timeout_secs),
            )?)),
            _ => Ok(Self::Disabled(DisabledBackend)),
        }
    }
}

impl SyncBackend for ConfiguredBackend {
    async fn push(&self, payload: &SyncPayload) -> Result<()> {
        match self {
            Self::Http(backend) => backend.push(payload).await,
            Self::Disabled(backend) => backend.push(payload).await,
        }
    }

    fn is_enabled(&self) -> bool {
        match self {
            Self::Http(backend) => backend.is_enabled(),
            Self::Disabled(backend) => backend.is_enabled(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_endpoint_disables_sync() {
        let config = BackendConfig {
            endpoint: None,
            api_key: None,
            timeout_secs: 10,
        };
        let backend = ConfiguredBackend::from_config(&config).unwrap();
        assert!(!backend.is_enabled());
    }

    #[test]
    fn configured_endpoint_builds_http_backend() {
        let config = BackendConfig {
            endpoint: Some("http://127.0.0.1:9/api/focus".into()),
            api_key: Some("token".into()),
            timeout_secs: 1,
        };
        match ConfiguredBackend::from_config(&config).unwrap() {
            ConfiguredBackend::Http(http) => assert_eq!(http.endpoint(), "http://127.0.0.1:9/api/focus"),
            ConfiguredBackend::Disabled(_) => panic!("expected http backend"),
        }
    }

    #[test]
    fn blank_endpoint_is_rejected() {
        assert!(HttpBackend::new("  ", None, Duration::from_secs(1)).is_err());
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_an_error() {
        let backend = HttpBackend::new("http://127.0.0.1:9/sync", None, Duration::from_millis(500)).unwrap();
        let payload = SyncPayload {
            module_id: "1".into(),
            section_id: None,
            session_time_sec: 1.0,
            focused_time_sec: 1.0,
            unfocused_time_sec: 0.0,
        };
        assert!(backend.push(&payload).await.is_err());
    }
}
