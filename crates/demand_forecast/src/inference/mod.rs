//! Dual-mode demand forecast client.
//!
//! The mode is chosen once, when the client is built; switching modes means
//! building a new client.

use async_trait::async_trait;
use config::InferenceMode;
use serde_json::Value;
use tracing::info;

mod local;
mod payload;
mod remote;

pub use local::LocalForecaster;
pub use payload::instances_to_rows;
pub use remote::{EndpointTransport, HttpEndpointTransport, RemoteForecaster};

use crate::{AppContext, ForecastError};

/// Anything that turns a prediction payload into a prediction response.
#[async_trait]
pub trait Forecaster: Send + Sync {
    async fn predict(&self, payload: &Value) -> Result<Value, ForecastError>;
}

/// The forecaster selected by the configured inference mode.
#[derive(Debug)]
pub enum ForecastClient {
    Remote(RemoteForecaster<HttpEndpointTransport>),
    Local(LocalForecaster),
}

impl ForecastClient {
    /// Builds the client for `ctx.settings.inference_mode`.
    ///
    /// Local mode loads the latest registered model here and fails if there
    /// is none.
    pub async fn from_context(ctx: &AppContext) -> Result<Self, ForecastError> {
        let settings = &ctx.settings;
        let client = match settings.inference_mode {
            InferenceMode::Remote => {
                let transport = HttpEndpointTransport::new(&settings.forecast_endpoint_url)?;
                Self::Remote(RemoteForecaster::new(&settings.forecast_endpoint_name, transport))
            }
            InferenceMode::Local => Self::Local(LocalForecaster::from_registry(&ctx.registry, &ctx.stores).await?),
        };
        info!(mode = ?client.mode(), target = client.target(), "Forecast client ready");
        Ok(client)
    }

    /// Endpoint name in remote mode, artifact URI in local mode.
    #[must_use]
    pub fn target(&self) -> &str {
        match self {
            Self::Remote(remote) => remote.endpoint(),
            Self::Local(local) => local.artifact_uri(),
        }
    }

    #[must_use]
    pub const fn mode(&self) -> InferenceMode {
        match self {
            Self::Remote(_) => InferenceMode::Remote,
            Self::Local(_) => InferenceMode::Local,
        }
    }
}

#[async_trait]
impl Forecaster for ForecastClient {
    async fn predict(&self, payload: &Value) -> Result<Value, ForecastError> {
        match self {
            Self::Remote(remote) => remote.predict(payload).await,
            Self::Local(local) => local.predict(payload).await,
        }
    }
}
