//! HTTP client abstraction for testability

use async_trait::async_trait;

use crate::config::{BasicAuth, ProbeConfig, ProbeMethod};

use std::time::Duration;

/// Timeout for webhook and lookup requests, which are not latency probes
const DELIVERY_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP response from a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

/// A single probe request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeRequest {
    pub method: ProbeMethod,
    pub url: String,
    pub auth: Option<BasicAuth>,
}

/// Transport failures of a probe, split by phase
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("connect timed out")]
    ConnectTimeout,

    #[error("read timed out")]
    ReadTimeout,

    #[error("{0}")]
    Other(String),
}

/// Abstraction over HTTP client for dependency injection
#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait HttpClient: Send + Sync {
    /// Issue a probe request using the probe timeouts
    async fn probe(&self, request: &ProbeRequest) -> Result<HttpResponse, TransportError>;

    /// Send a GET request to the given URL
    async fn get(&self, url: &str) -> crate::Result<HttpResponse>;

    /// Send a POST request with a JSON body
    async fn post_json(&self, url: &str, body: &serde_json::Value) -> crate::Result<HttpResponse>;
}

/// Production HTTP client using reqwest
pub struct ReqwestHttpClient {
    probe_client: reqwest::Client,
    client: reqwest::Client,
    /// Hard bound on one probe, body included. reqwest's read timeout
    /// restarts on every chunk, so a trickling body never trips it.
    probe_limit: Duration,
}

impl ReqwestHttpClient {
    pub fn new(probe: &ProbeConfig) -> crate::Result<Self> {
        let probe_client = reqwest::Client::builder()
            .connect_timeout(probe.connect_timeout)
            .read_timeout(probe.read_timeout)
            .user_agent(probe.user_agent.as_str())
            .build()
            .map_err(|e| crate::WatchpostError::Http(format!("Building probe client: {}", e)))?;

        let client = reqwest::Client::builder()
            .timeout(DELIVERY_TIMEOUT)
            .user_agent(probe.user_agent.as_str())
            .build()
            .map_err(|e| crate::WatchpostError::Http(format!("Building client: {}", e)))?;

        Ok(Self {
            probe_client,
            client,
            probe_limit: probe.connect_timeout.saturating_add(probe.read_timeout),
        })
    }

    async fn send_probe(&self, request: &ProbeRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = match request.method {
            ProbeMethod::Get => self.probe_client.get(&request.url),
            ProbeMethod::Post => self.probe_client.post(&request.url),
        };
        if let Some(auth) = &request.auth {
            builder = builder.basic_auth(&auth.user, Some(&auth.pass));
        }

        let response = builder.send().await.map_err(|e| transport_error(&e))?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| transport_error(&e))?;
        Ok(HttpResponse { status, body })
    }
}

/// The part of a URL that is safe to log: scheme, host and port.
///
/// Webhook paths and lookup query strings carry secrets.
pub fn loggable_url(url: &str) -> String {
    match reqwest::Url::parse(url) {
        Ok(parsed) => parsed.origin().ascii_serialization(),
        Err(_) => "<invalid url>".to_string(),
    }
}

fn transport_error(e: &reqwest::Error) -> TransportError {
    if e.is_timeout() && e.is_connect() {
        TransportError::ConnectTimeout
    } else if e.is_timeout() {
        TransportError::ReadTimeout
    } else {
        TransportError::Other(e.to_string())
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn probe(&self, request: &ProbeRequest) -> Result<HttpResponse, TransportError> {
        tracing::debug!("Probe {:?} {}", request.method, request.url);
        let response = tokio::time::timeout(self.probe_limit, self.send_probe(request))
            .await
            .unwrap_or_else(|_| {
                tracing::debug!(
                    "Probe {} exceeded {:?}, treating as read timeout",
                    request.url,
                    self.probe_limit
                );
                Err(TransportError::ReadTimeout)
            })?;

        tracing::debug!(
            "Probe {} -> {} ({} bytes)",
            request.url,
            response.status,
            response.body.len()
        );
        Ok(response)
    }

    async fn get(&self, url: &str) -> crate::Result<HttpResponse> {
        let target = loggable_url(url);
        tracing::debug!("GET {}", target);
        let response = self.client.get(url).send().await.map_err(|e| {
            crate::WatchpostError::Http(format!("GET {} failed: {}", target, e.without_url()))
        })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| {
                crate::WatchpostError::Http(format!("Reading response body: {}", e.without_url()))
            })?;

        tracing::debug!("GET {} -> {} ({} bytes)", target, status, body.len());
        Ok(HttpResponse { status, body })
    }

    async fn post_json(&self, url: &str, body: &serde_json::Value) -> crate::Result<HttpResponse> {
        let target = loggable_url(url);
        tracing::debug!("POST {}", target);
        let response = self.client.post(url).json(body).send().await.map_err(|e| {
            crate::WatchpostError::Http(format!("POST {} failed: {}", target, e.without_url()))
        })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| {
                crate::WatchpostError::Http(format!("Reading response body: {}", e.without_url()))
            })?;

        tracing::debug!("POST {} -> {} ({} bytes)", target, status, body.len());
        Ok(HttpResponse { status, body })
    }
}
