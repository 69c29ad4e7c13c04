//! Terminal plots for text output.

pub mod ascii;

pub use ascii::*;
