//! Error taxonomy surfaced by the pipeline and the inference client.

use database::RegistryError;
use ml_model::ModelError;
use sales_structs::ValidationError;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Broad category of a [`ForecastError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed input; never retried.
    Validation,
    /// Missing upstream state such as curated data or a registered model.
    NotFound,
    /// Storage or remote endpoint failure; the caller decides whether to retry.
    Transient,
    /// Training or artifact loading failed.
    Model,
}

#[derive(Debug, thiserror::Error)]
pub enum ForecastError {
    #[error("invalid sales data")]
    Validation(#[from] ValidationError),

    #[error("invalid artifact URI `{0}`")]
    InvalidUri(String),

    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{context}")]
    Transient {
        context: String,
        #[source]
        source: BoxError,
    },

    #[error("invalid curated partition {path}")]
    InvalidPartition {
        path: String,
        #[source]
        source: ValidationError,
    },

    #[error(transparent)]
    Config(config::ConfigError),

    #[error("model failure")]
    Model(#[from] ModelError),
}

impl ForecastError {
    pub fn transient(context: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Transient {
            context: context.into(),
            source: source.into(),
        }
    }

    pub fn partition(path: impl Into<String>, source: ValidationError) -> Self {
        Self::InvalidPartition {
            path: path.into(),
            source,
        }
    }

    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_)
            | Self::InvalidUri(_)
            | Self::InvalidPayload(_)
            | Self::InvalidPartition { .. }
            | Self::Config(_) => ErrorKind::Validation,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Transient { .. } => ErrorKind::Transient,
            Self::Model(_) => ErrorKind::Model,
        }
    }
}

impl From<RegistryError> for ForecastError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::InvalidUri(uri) => Self::InvalidUri(uri),
            RegistryError::Storage(object_store::Error::NotFound { path, .. }) => {
                Self::NotFound(format!("object {path} not found"))
            }
            other => Self::transient("registry or storage call failed", other),
        }
    }
}

impl From<config::ConfigError> for ForecastError {
    fn from(err: config::ConfigError) -> Self {
        use config::ConfigError;

        match err {
            ConfigError::Invalid { .. } | ConfigError::Missing { .. } | ConfigError::Discovery { .. } => {
                Self::Config(err)
            }
            other => Self::transient("failed to open storage", other),
        }
    }
}

impl From<object_store::Error> for ForecastError {
    fn from(err: object_store::Error) -> Self {
        RegistryError::Storage(err).into()
    }
}
