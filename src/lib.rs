//! `satudata-dash` library crate.
//!
//! The binary (`satudata`) is a thin wrapper around this library so that:
//!
//! - the fetch/validate/normalize/aggregate pipeline is testable without spawning processes
//! - the same pipeline feeds both the text commands and the terminal dashboard

pub mod app;
pub mod cli;
pub mod config;
pub mod data;
pub mod debug;
pub mod domain;
pub mod error;
pub mod io;
pub mod logging;
pub mod plot;
pub mod report;
pub mod tui;
