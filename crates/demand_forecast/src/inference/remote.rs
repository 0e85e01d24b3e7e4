//! Predictions delegated to the managed inference endpoint.

use core::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use tracing::debug;
use url::Url;

use super::Forecaster;
use crate::ForecastError;

/// Request/response channel to a named endpoint.
#[async_trait]
pub trait EndpointTransport: Send + Sync {
    /// Sends a JSON body to `endpoint` and returns the raw response body.
    async fn invoke(&self, endpoint: &str, body: Vec<u8>) -> Result<Bytes, ForecastError>;
}

/// Invokes endpoints at `{base}/endpoints/{endpoint}/invocations` over HTTPS.
///
/// Requests are sent unsigned; deployments put a signing proxy in front of
/// the runtime API.
#[derive(Debug, Clone)]
pub struct HttpEndpointTransport {
    client: Client,
    base_url: String,
}

impl HttpEndpointTransport {
    pub fn new(base_url: &str) -> Result<Self, ForecastError> {
        Url::parse(base_url).map_err(|_| ForecastError::InvalidUri(base_url.to_string()))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| ForecastError::transient("failed to create HTTP client", e))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn invocation_url(&self, endpoint: &str) -> Result<Url, ForecastError> {
        let raw = format!("{}/endpoints/{endpoint}/invocations", self.base_url);
        Url::parse(&raw).map_err(|_| ForecastError::InvalidUri(raw))
    }
}

#[async_trait]
impl EndpointTransport for HttpEndpointTransport {
    async fn invoke(&self, endpoint: &str, body: Vec<u8>) -> Result<Bytes, ForecastError> {
        let url = self.invocation_url(endpoint)?;
        debug!(%url, bytes = body.len(), "Invoking endpoint");

        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| ForecastError::transient(format!("failed to reach endpoint {endpoint}"), e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ForecastError::transient(
                format!("endpoint {endpoint} returned {status}"),
                text,
            ));
        }

        response
            .bytes()
            .await
            .map_err(|e| ForecastError::transient(format!("failed to read response from {endpoint}"), e))
    }
}

/// Forwards payloads verbatim to one endpoint and returns its JSON response.
#[derive(Debug, Clone)]
pub struct RemoteForecaster<T> {
    endpoint: String,
    transport: T,
}

impl<T: EndpointTransport> RemoteForecaster<T> {
    #[must_use]
    pub fn new(endpoint: &str, transport: T) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            transport,
        }
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl<T: EndpointTransport> Forecaster for RemoteForecaster<T> {
    async fn predict(&self, payload: &Value) -> Result<Value, ForecastError> {
        let body = serde_json::to_vec(payload).map_err(|e| ForecastError::InvalidPayload(e.to_string()))?;
        let response = self.transport.invoke(&self.endpoint, body).await?;
        serde_json::from_slice(&response).map_err(|e| {
            ForecastError::transient(format!("endpoint {} returned a non-JSON response", self.endpoint), e)
        })
    }
}
