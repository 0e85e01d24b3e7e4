//! CLI command implementations.

pub mod curate;
pub mod generate;
pub mod ingest;
pub mod load;
pub mod predict;
pub mod train;
