//! Command-line parsing for the Satu Data population dashboards.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the pipeline code.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::domain::View;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "satudata", version, about = "Garut population statistics dashboards (Satu Data API)")]
pub struct Cli {
    /// TOML settings file (overrides SATUDATA_CONFIG).
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Launch the combined terminal dashboard.
    ///
    /// All four datasets are loaded up front; any failure aborts the dashboard.
    Dashboard,
    /// Category totals of one view for a single year.
    Snapshot(SnapshotArgs),
    /// Category totals of one view across all years.
    Trend(TrendArgs),
    /// List the years available in a view, most recent first.
    Years(ViewArg),
    /// Fetch, validate and normalize every dataset and report row counts.
    Check,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Args, Clone)]
pub struct ViewArg {
    /// Dashboard view (religion, subdistrict-gender, marital-status, occupation, blood-type).
    #[arg(value_enum)]
    pub view: View,
}

/// Options shared by `snapshot` and `trend`.
#[derive(Debug, Args, Clone)]
pub struct ReportArgs {
    /// Group by these fields instead of the view's panels (repeatable).
    #[arg(long = "by", value_name = "FIELD")]
    pub group_by: Vec<String>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Export the primary table to CSV.
    #[arg(long, value_name = "CSV")]
    pub export: Option<PathBuf>,

    /// On a data error, write the raw payload to a debug bundle.
    #[arg(long)]
    pub dump_raw: bool,

    /// Bar and plot width (columns).
    #[arg(long, default_value_t = 50)]
    pub width: usize,

    /// Categories shown in trend tables.
    #[arg(long, default_value_t = 10)]
    pub top: usize,
}

#[derive(Debug, Args, Clone)]
pub struct SnapshotArgs {
    #[command(flatten)]
    pub view: ViewArg,

    /// Year to show (defaults to the most recent).
    #[arg(short, long)]
    pub year: Option<i64>,

    #[command(flatten)]
    pub report: ReportArgs,
}

#[derive(Debug, Args, Clone)]
pub struct TrendArgs {
    #[command(flatten)]
    pub view: ViewArg,

    /// Also render an ASCII line plot.
    #[arg(long)]
    pub plot: bool,

    /// Plot height (rows).
    #[arg(long, default_value_t = 15)]
    pub height: usize,

    #[command(flatten)]
    pub report: ReportArgs,
}
