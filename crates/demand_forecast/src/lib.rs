//! Demand forecasting for seller sales data.
//!
//! Curated sales partitions feed an offline training job that uploads and
//! registers a boosted-tree model; the inference client serves predictions
//! either from the managed endpoint or from the latest registered artifact.

pub mod commands;
mod context;
mod error;
pub mod inference;
pub mod pipeline;

pub use context::AppContext;
pub use error::{ErrorKind, ForecastError};
