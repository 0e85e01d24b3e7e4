//! Runtime settings shared by every crate of the forecasting workspace.
//!
//! Settings are resolved once at process start and passed around by
//! reference. Each field is looked up in a fixed order: explicit override,
//! process environment, discovered stack outputs, derived default.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;
use tracing::debug;

mod store;

pub use store::{StoreFactory, StoreKey};

/// Model type tag used for demand forecasting artifacts.
pub const DEMAND_FORECAST: &str = "demand_forecast";

/// Default location of the CDK outputs file used for discovery.
const DEFAULT_STACK_OUTPUTS: &str = "cdk-outputs.json";

/// Errors raised while resolving settings or building storage clients.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}")]
    Invalid { key: &'static str, value: String },

    #[error("{key} must be set")]
    Missing { key: &'static str },

    #[error("failed to read stack outputs from {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed stack outputs in {path}")]
    Discovery {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to build {scheme} store for bucket {bucket}")]
    Store {
        scheme: StorageScheme,
        bucket: String,
        #[source]
        source: object_store::Error,
    },
}

/// Source of environment variables.
///
/// The process environment is the usual implementation; tests pass a map.
pub trait EnvSource {
    fn var(&self, key: &str) -> Option<String>;
}

/// Reads variables from the process environment, ignoring empty values.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok().filter(|v| !v.is_empty())
    }
}

impl EnvSource for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).filter(|v| !v.is_empty()).cloned()
    }
}

/// Backend used for object storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageScheme {
    S3,
    File,
    Memory,
}

impl StorageScheme {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::S3 => "s3",
            Self::File => "file",
            Self::Memory => "memory",
        }
    }
}

impl fmt::Display for StorageScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageScheme {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "s3" => Ok(Self::S3),
            "file" => Ok(Self::File),
            "memory" => Ok(Self::Memory),
            _ => Err(ConfigError::Invalid {
                key: "MERLIN_STORAGE_SCHEME",
                value: s.to_string(),
            }),
        }
    }
}

/// Where registry records are persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryBackend {
    ObjectStore,
    Postgres,
}

impl FromStr for RegistryBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "object_store" | "objectstore" | "s3" => Ok(Self::ObjectStore),
            "postgres" | "postgresql" => Ok(Self::Postgres),
            _ => Err(ConfigError::Invalid {
                key: "MERLIN_REGISTRY_BACKEND",
                value: s.to_string(),
            }),
        }
    }
}

/// How the inference client serves predictions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InferenceMode {
    /// Delegate to the managed prediction endpoint.
    Remote,
    /// Load the latest registered artifact and predict in-process.
    Local,
}

impl InferenceMode {
    /// Anything other than `local` selects the remote endpoint.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("local") {
            Self::Local
        } else {
            Self::Remote
        }
    }
}

/// Values exported by the deployed infrastructure stacks.
///
/// Mirrors the document written by `cdk deploy --outputs-file`:
/// `{ "<stack name>": { "<output key>": "<value>" } }`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct StackOutputs(HashMap<String, HashMap<String, String>>);

impl StackOutputs {
    /// Loads stack outputs from `path`. A missing file yields no outputs.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No stack outputs file, skipping discovery");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        serde_json::from_str(&raw).map_err(|source| ConfigError::Discovery {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Looks up a single output of a stack.
    #[must_use]
    pub fn get(&self, stack: &str, key: &str) -> Option<String> {
        self.0.get(stack)?.get(key).cloned()
    }
}

/// Explicit values that beat every other settings layer (usually CLI flags).
#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
    pub env: Option<String>,
    pub region: Option<String>,
    pub landing_bucket: Option<String>,
    pub curated_bucket: Option<String>,
    pub runs_table: Option<String>,
    pub storage_scheme: Option<StorageScheme>,
    pub local_store_root: Option<PathBuf>,
    pub registry_backend: Option<RegistryBackend>,
    pub inference_mode: Option<InferenceMode>,
    pub forecast_endpoint_name: Option<String>,
}

/// Resolved application settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Deployment environment (dev/demo/prod/test).
    pub env: String,
    pub region: String,
    /// Bucket receiving raw seller payloads.
    pub landing_bucket: String,
    /// Bucket holding curated partitions and model artifacts.
    pub curated_bucket: String,
    /// Name of the registry collection (object prefix or table label).
    pub runs_table: String,
    pub storage_scheme: StorageScheme,
    /// Root directory for `file://` buckets.
    pub local_store_root: PathBuf,
    pub registry_backend: RegistryBackend,
    pub database_url: Option<String>,
    pub inference_mode: InferenceMode,
    pub forecast_endpoint_name: String,
    pub forecast_endpoint_url: String,
}

impl Settings {
    /// Loads settings from the process environment, `.env` and the stack
    /// outputs file.
    pub fn load(overrides: &SettingsOverrides) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let outputs_path = ProcessEnv
            .var("MERLIN_STACK_OUTPUTS")
            .map_or_else(|| PathBuf::from(DEFAULT_STACK_OUTPUTS), PathBuf::from);
        let outputs = StackOutputs::load(&outputs_path)?;

        Self::resolve(overrides, &ProcessEnv, &outputs)
    }

    /// Resolves settings from explicit layers.
    pub fn resolve(
        overrides: &SettingsOverrides,
        env: &impl EnvSource,
        outputs: &StackOutputs,
    ) -> Result<Self, ConfigError> {
        let env_name = overrides
            .env
            .clone()
            .or_else(|| env.var("MERLIN_ENV"))
            .unwrap_or_else(|| "dev".to_string());
        let region = overrides
            .region
            .clone()
            .or_else(|| env.var("AWS_REGION"))
            .unwrap_or_else(|| "us-east-1".to_string());

        let prefix = format!("merlin-{env_name}");
        let stack = format!("MerlinDataPlatformStack-{env_name}");
        let layered = |explicit: &Option<String>, var: &str, output: &str, default: String| {
            explicit
                .clone()
                .or_else(|| env.var(var))
                .or_else(|| outputs.get(&stack, output))
                .unwrap_or(default)
        };

        let landing_bucket = layered(
            &overrides.landing_bucket,
            "MERLIN_DATA_LAKE_BUCKET",
            "LandingBucketOutput",
            format!("{prefix}-landing"),
        );
        let curated_bucket = layered(
            &overrides.curated_bucket,
            "MERLIN_CURATED_BUCKET",
            "CuratedBucketOutput",
            format!("{prefix}-curated"),
        );
        let runs_table = layered(
            &overrides.runs_table,
            "MERLIN_RUNS_TABLE",
            "RunsTableOutput",
            format!("{prefix}-runs"),
        );

        let storage_scheme = match overrides.storage_scheme {
            Some(scheme) => scheme,
            None => env
                .var("MERLIN_STORAGE_SCHEME")
                .map_or(Ok(StorageScheme::S3), |v| v.parse())?,
        };
        let registry_backend = match overrides.registry_backend {
            Some(backend) => backend,
            None => env
                .var("MERLIN_REGISTRY_BACKEND")
                .map_or(Ok(RegistryBackend::ObjectStore), |v| v.parse())?,
        };
        let database_url = env.var("DATABASE_URL");
        if registry_backend == RegistryBackend::Postgres && database_url.is_none() {
            return Err(ConfigError::Missing { key: "DATABASE_URL" });
        }

        let local_store_root = overrides
            .local_store_root
            .clone()
            .or_else(|| env.var("MERLIN_LOCAL_STORE_ROOT").map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from("./data/buckets"));
        let inference_mode = overrides.inference_mode.unwrap_or_else(|| {
            env.var("MERLIN_INFERENCE_MODE")
                .map_or(InferenceMode::Remote, |v| InferenceMode::parse(&v))
        });
        let forecast_endpoint_name = overrides
            .forecast_endpoint_name
            .clone()
            .or_else(|| env.var("FORECAST_ENDPOINT_NAME"))
            .unwrap_or_else(|| format!("{prefix}-demand-forecast"));
        let forecast_endpoint_url = env
            .var("FORECAST_ENDPOINT_URL")
            .unwrap_or_else(|| format!("https://runtime.sagemaker.{region}.amazonaws.com"));

        Ok(Self {
            env: env_name,
            region,
            landing_bucket,
            curated_bucket,
            runs_table,
            storage_scheme,
            local_store_root,
            registry_backend,
            database_url,
            inference_mode,
            forecast_endpoint_name,
            forecast_endpoint_url,
        })
    }

    /// URI of `key` inside the curated bucket.
    #[must_use]
    pub fn curated_uri(&self, key: &str) -> String {
        format!("{}://{}/{key}", self.storage_scheme, self.curated_bucket)
    }

    /// Environment-scoped prefix under which demand forecast artifacts live.
    #[must_use]
    pub fn artifact_prefix(&self) -> String {
        format!("models/{}/{DEMAND_FORECAST}", self.env)
    }
}
