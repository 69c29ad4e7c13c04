//! Input/output helpers.
//!
//! - row normalization and coercion (`ingest`)
//! - CSV exports of aggregated tables (`export`)

pub mod export;
pub mod ingest;

pub use export::*;
pub use ingest::*;
