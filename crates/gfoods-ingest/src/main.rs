//! gFoods Ingest - synonym column scraper

use clap::Parser;
use colored::Colorize;
use gfoods_common::logging::{init_logging, LogConfig, LogLevel};
use gfoods_ingest::pipeline::RunReport;
use gfoods_ingest::{run_job, Cli};
use std::process;
use tracing::{error, info};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // .env may carry GFOODS_CONTACT and LOG_* settings
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };
    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("gfoods-ingest")
        .filter_directives("hyper=warn,reqwest=warn")
        .build();

    // Environment variables take precedence over flags
    let log_config = log_config.clone().merge_env().unwrap_or(log_config);
    // Held until exit so file output is flushed
    let log_guard = match init_logging(&log_config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Warning: logging disabled: {}", e);
            None
        },
    };

    let config = cli.source.into_config();
    info!(
        source = %config.source,
        input = %config.input.display(),
        output = %config.output_path().display(),
        in_place = config.in_place(),
        "Starting job"
    );

    match run_job(&config).await {
        Ok(report) => print_summary(&report),
        Err(e) => {
            error!(error = %e, "Job failed");
            eprintln!("{} {}", "Error:".red(), e);
            drop(log_guard);
            process::exit(1);
        },
    }
}

fn print_summary(report: &RunReport) {
    let failed = if report.failed() > 0 {
        report.failed().to_string().yellow()
    } else {
        report.failed().to_string().normal()
    };

    println!(
        "{} [{}] {} processed, {} resolved, {} without synonyms, {} failed, {} skipped",
        "✓".green(),
        report.source,
        report.processed(),
        report.resolved(),
        report.not_found(),
        failed,
        report.skipped
    );
    println!("  wrote {}", report.output.display());
}
