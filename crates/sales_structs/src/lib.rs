//! Common structs for seller sales data shared across crates.

mod curated;
mod record;

pub use curated::*;
pub use record::*;

/// Errors raised when sales data does not match the expected schema.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("missing required field `{field}`")]
    Missing { field: &'static str },

    #[error("field `{field}` out of range: {value}")]
    OutOfRange { field: &'static str, value: f64 },

    #[error("record {index}")]
    Record {
        index: usize,
        #[source]
        source: Box<ValidationError>,
    },

    #[error("malformed record {index}")]
    Malformed {
        index: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("empty payload")]
    EmptyPayload,

    #[error("payload is not valid JSON")]
    Json(#[source] serde_json::Error),

    #[error("payload must be a JSON array of sales records")]
    NotAList,
}

impl ValidationError {
    /// Attaches the position of the offending record.
    #[must_use]
    pub fn at(self, index: usize) -> Self {
        Self::Record {
            index,
            source: Box::new(self),
        }
    }
}
