//! Command dispatch for the `satudata` binary.
//!
//! `src/main.rs` only maps the returned `AppError` to an exit code. Everything
//! else starts here: argument parsing, settings, logging, then one handler
//! per subcommand.

use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use serde_json::Value;

use crate::cli::{Command, OutputFormat, ReportArgs, SnapshotArgs, TrendArgs, ViewArg};
use crate::config::Settings;
use crate::data::Fetcher;
use crate::domain::{NormalizedTable, View};
use crate::error::{AppError, PipelineError};
use crate::logging::{LogTarget, init_logging};
use crate::report::{RAW_PREVIEW_CHARS, ViewReport, build_view_report, format_diagnostic};

pub mod pipeline;

/// Entry point for the `satudata` binary.
pub fn run() -> Result<(), AppError> {
    // We want `satudata` and `satudata --config x.toml` to behave like
    // `satudata dashboard ...`.
    //
    // Clap requires a subcommand name, so we do a small, explicit rewrite of the
    // argv list before parsing.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    let settings = Settings::load(cli.config.as_deref())?;

    let target = match cli.command {
        Command::Dashboard => LogTarget::File { dir: &settings.log_dir },
        _ => LogTarget::Stderr,
    };
    let _guard = init_logging(target);
    tracing::debug!(?settings, "settings loaded");

    let fetcher = Fetcher::from_settings(&settings)?;

    match cli.command {
        Command::Dashboard => crate::tui::run(&settings, fetcher),
        Command::Snapshot(args) => handle_snapshot(&fetcher, &settings, args),
        Command::Trend(args) => handle_trend(&fetcher, &settings, args),
        Command::Years(ViewArg { view }) => handle_years(&fetcher, &settings, view),
        Command::Check => handle_check(&fetcher, &settings),
    }
}

fn handle_snapshot(fetcher: &Fetcher, settings: &Settings, args: SnapshotArgs) -> Result<(), AppError> {
    let view = args.view.view;
    let Some((_, table)) = load_for_report(fetcher, settings, view, &args.report)? else {
        println!("{}", unavailable_message(view));
        return Ok(());
    };

    let report = build_report(view, &table, args.year, &args.report.group_by)?;

    match args.report.format {
        OutputFormat::Text => print!(
            "{}",
            crate::report::format_view_report(&report, args.report.width, args.report.top)
        ),
        OutputFormat::Json => println!("{}", to_json(&report)?),
    }

    if let Some(path) = &args.report.export {
        match report.primary() {
            Some(panel) => {
                crate::io::export::write_snapshot_csv(path, &panel.snapshot)?;
                tracing::info!(path = %path.display(), "snapshot exported");
            }
            None => tracing::warn!("no rows to export"),
        }
    }
    Ok(())
}

fn handle_trend(fetcher: &Fetcher, settings: &Settings, args: TrendArgs) -> Result<(), AppError> {
    let view = args.view.view;
    let Some((_, table)) = load_for_report(fetcher, settings, view, &args.report)? else {
        println!("{}", unavailable_message(view));
        return Ok(());
    };

    let report = build_report(view, &table, None, &args.report.group_by)?;
    let trend = &report.trend;

    match args.report.format {
        OutputFormat::Text => {
            println!("=== {} ({}) ===", view.title(), report.dataset);
            if trend.is_empty() {
                println!("Tidak ada data yang tersedia.");
            } else {
                print!("{}", crate::report::format_trend_table(trend, args.report.top));
                if args.plot {
                    println!();
                    print!(
                        "{}",
                        crate::plot::render_trend_plot(trend, args.report.top, args.report.width, args.height)
                    );
                }
            }
        }
        OutputFormat::Json => println!("{}", to_json(trend)?),
    }

    if let Some(path) = &args.report.export {
        crate::io::export::write_trend_csv(path, trend)?;
        tracing::info!(path = %path.display(), "trend exported");
    }
    Ok(())
}

fn handle_years(fetcher: &Fetcher, settings: &Settings, view: View) -> Result<(), AppError> {
    let loaded = pipeline::load_view(fetcher, view, settings).map_err(|e| pipeline_failure(e, false))?;
    let Some((_, table)) = loaded else {
        println!("{}", unavailable_message(view));
        return Ok(());
    };
    for year in crate::report::available_years(&table.rows) {
        println!("{year}");
    }
    Ok(())
}

fn handle_check(fetcher: &Fetcher, settings: &Settings) -> Result<(), AppError> {
    let dash = pipeline::load_all(fetcher, settings).map_err(|e| pipeline_failure(e, false))?;

    println!("{:<28} {:>8} {:>8} {:>10} {:>8}  tahun", "dataset", "rows", "kept", "incomplete", "invalid");
    let mut first_failure = None;
    for d in &dash.datasets {
        match &d.table {
            Ok(table) => println!("{}", check_line(d.id.display_name(), table)),
            Err(e) => {
                println!("{:<28} {e}", d.id.display_name());
                first_failure.get_or_insert_with(|| e.clone());
            }
        }
    }

    match &dash.derived {
        Ok(pipeline::Derived::Ready { source, table, .. }) => {
            let label = format!("Kecamatan ({})", source.display_name());
            println!("{}", check_line(&label, table));
        }
        Ok(pipeline::Derived::Unavailable) => println!("{}", unavailable_message(View::SubdistrictGender)),
        Err(e) => println!("{:<28} {e}", View::SubdistrictGender.title()),
    }

    // Every tab is listed before the first dataset failure sets the exit code.
    match first_failure {
        Some(err) => Err(pipeline_failure(err, false)),
        None => Ok(()),
    }
}

fn check_line(label: &str, table: &NormalizedTable) -> String {
    format!(
        "{:<28} {:>8} {:>8} {:>10} {:>8}  {}",
        label,
        table.rows_read,
        table.rows.len(),
        table.dropped_incomplete,
        table.dropped_invalid,
        crate::report::format_years(&crate::report::available_years(&table.rows)),
    )
}

fn load_for_report(
    fetcher: &Fetcher,
    settings: &Settings,
    view: View,
    args: &ReportArgs,
) -> Result<Option<(Arc<Value>, NormalizedTable)>, AppError> {
    pipeline::load_view(fetcher, view, settings).map_err(|e| pipeline_failure(e, args.dump_raw))
}

/// Report with an optional custom grouping; unknown fields are a usage error.
fn build_report(
    view: View,
    table: &NormalizedTable,
    year: Option<i64>,
    group_by: &[String],
) -> Result<ViewReport, AppError> {
    if let Some(unknown) = group_by.iter().find(|f| !table.has_field(f)) {
        return Err(AppError::new(
            2,
            format!("Unknown field '{unknown}' for --by (available: {}).", table.fields.join(", ")),
        ));
    }
    let custom = (!group_by.is_empty()).then_some(group_by);
    Ok(build_view_report(view, table, year, custom))
}

/// Convert a pipeline failure into the diagnostic `AppError`, writing the
/// debug bundle first when asked to.
pub(crate) fn pipeline_failure(err: PipelineError, dump_raw: bool) -> AppError {
    let mut message = format_diagnostic(&err, RAW_PREVIEW_CHARS);
    if dump_raw {
        match crate::debug::write_error_bundle(Path::new(crate::debug::DEFAULT_DEBUG_DIR), &err) {
            Ok(path) => message.push_str(&format!("Debug bundle: {}\n", path.display())),
            Err(e) => message.push_str(&format!("{e}\n")),
        }
    }
    AppError::new(4, message.trim_end().to_string())
}

fn unavailable_message(view: View) -> String {
    format!("{}: data tidak tersedia.", view.title())
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, AppError> {
    serde_json::to_string_pretty(value).map_err(|e| AppError::new(4, format!("Failed to serialize JSON: {e}")))
}

/// Rewrite argv so `satudata` defaults to `satudata dashboard`.
///
/// Rules:
/// - `satudata`                      -> `satudata dashboard`
/// - `satudata --config x ...`       -> `satudata dashboard --config x ...`
/// - `satudata --help/--version/-h`  -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("dashboard".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(arg1.as_str(), "-h" | "--help" | "-V" | "--version" | "help");
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(arg1.as_str(), "dashboard" | "snapshot" | "trend" | "years" | "check");
    if is_subcommand {
        return argv;
    }

    if arg1.starts_with('-') {
        argv.insert(1, "dashboard".to_string());
        return argv;
    }

    argv
}
