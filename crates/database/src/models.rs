//! Registry record types.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Metadata of one registered model. Written once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ModelMetadata {
    #[sqlx(rename = "run_id")]
    pub model_id: Uuid,
    pub model_type: String,
    pub artifact_uri: String,
    #[sqlx(json)]
    pub metrics: BTreeMap<String, f64>,
    pub created_at: DateTime<Utc>,
}

/// Record columns a backend can filter on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordField {
    ModelType,
}

impl RecordField {
    #[must_use]
    pub const fn column(self) -> &'static str {
        match self {
            Self::ModelType => "model_type",
        }
    }

    #[must_use]
    pub fn value_of(self, record: &ModelMetadata) -> &str {
        match self {
            Self::ModelType => &record.model_type,
        }
    }
}

/// A metric as reported by a caller, before filtering.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricValue {
    Number(f64),
    Text(String),
    Flag(bool),
    Null,
}

impl MetricValue {
    /// The value as a finite float. Strings are parsed; booleans and nulls
    /// have no numeric value.
    #[must_use]
    pub fn as_finite(&self) -> Option<f64> {
        let value = match self {
            Self::Number(v) => *v,
            Self::Text(s) => s.trim().parse().ok()?,
            Self::Flag(_) | Self::Null => return None,
        };
        value.is_finite().then_some(value)
    }
}

impl std::fmt::Display for MetricValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(v) => write!(f, "{v}"),
            Self::Text(s) => write!(f, "{s:?}"),
            Self::Flag(b) => write!(f, "{b}"),
            Self::Null => f.write_str("null"),
        }
    }
}

impl From<f64> for MetricValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<f32> for MetricValue {
    fn from(value: f32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<i32> for MetricValue {
    fn from(value: i32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<bool> for MetricValue {
    fn from(value: bool) -> Self {
        Self::Flag(value)
    }
}

impl From<&str> for MetricValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for MetricValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<serde_json::Value> for MetricValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Number(n) => n.as_f64().map_or(Self::Null, Self::Number),
            serde_json::Value::String(s) => Self::Text(s),
            serde_json::Value::Bool(b) => Self::Flag(b),
            other @ (serde_json::Value::Array(_) | serde_json::Value::Object(_)) => Self::Text(other.to_string()),
            serde_json::Value::Null => Self::Null,
        }
    }
}
