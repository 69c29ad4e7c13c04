//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - dataset descriptors and dashboard views (`DatasetId`, `DatasetSpec`, `View`)
//! - raw and normalized rows (`RawRecord`, `NormalizedRow`)
//! - aggregation outputs (`AggregatedSnapshot`, `TrendSeries`)

pub mod datasets;
pub mod types;

pub use datasets::*;
pub use types::*;
