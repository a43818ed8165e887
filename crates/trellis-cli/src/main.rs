//! Trellis CLI entry point.

use std::{process, str::FromStr};

use clap::Parser;
use log::{LevelFilter, debug, error, info, warn};

use trellis_cli::{
    Args,
    error_adapter::{Reportable, diagnostic_reportables, to_reportables},
};

fn render(reporter: &miette::GraphicalReportHandler, reportable: &Reportable<'_>) -> String {
    let mut writer = String::new();
    reporter
        .render_report(&mut writer, reportable)
        .expect("Writing to String buffer is infallible");
    writer
}

fn main() {
    miette::set_panic_hook();

    let args = Args::parse();

    let log_level = LevelFilter::from_str(&args.log_level).unwrap_or_else(|_| {
        eprintln!(
            "Invalid log level: {}. Using 'warn' instead.",
            args.log_level
        );
        LevelFilter::Warn
    });

    env_logger::Builder::from_env(env_logger::Env::default())
        .filter_level(log_level)
        .init();

    info!(log_level:?; "Starting Trellis");
    debug!(args:?; "Parsed arguments");

    let reporter = miette::GraphicalReportHandler::new();
    let report = match trellis_cli::run(&args) {
        Ok(report) => report,
        Err(err) => {
            for reportable in to_reportables(&err) {
                error!("{}", render(&reporter, &reportable));
            }
            process::exit(1);
        }
    };

    let reportables = diagnostic_reportables(report.diagnostics(), report.source());
    for (diag, reportable) in report.diagnostics().iter().zip(&reportables) {
        let rendered = render(&reporter, reportable);
        if diag.severity().is_error() {
            error!("{rendered}");
        } else {
            warn!("{rendered}");
        }
    }

    if args.strict && report.has_errors() {
        error!(diagnostics = report.diagnostics().len(); "Stream produced errors");
        process::exit(1);
    }

    info!(elements = report.elements(); "Completed successfully");
}
