use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use sheetbridge_core::config::{FileConfig, load_default_file_config};
use sheetbridge_core::download::{CONNECT_TIMEOUT_SECS, DEFAULT_ARCHIVE_PREFIX, READ_TIMEOUT_SECS};
use sheetbridge_core::exit::{ProcessExit, determine_exit_outcome};
use sheetbridge_core::harvest::{archive, prepare};
use sheetbridge_core::terminal::{
    default_log_level, init_tracing, is_dumb_terminal, no_color_env_requested,
    should_use_progress,
};
use sheetbridge_core::{ArchiveStatus, HarvestRequest, HttpClient};
use tracing::{info, warn};

/// Extract records from an xlsx sheet and archive their linked resources.
#[derive(Parser, Debug)]
#[command(name = "xlsx-harvest")]
#[command(
    author,
    version,
    about = "Extract records from an xlsx sheet and archive their linked resources"
)]
struct Args {
    /// Workbook whose active sheet lists the records
    #[arg(short, long)]
    input: PathBuf,

    /// Archive directory; the info file is written next to it
    #[arg(short, long)]
    output: PathBuf,

    /// Archive file name prefix (default: crmm)
    #[arg(long)]
    prefix: Option<String>,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();
    match run(&args).await {
        Ok(exit) => exit.into(),
        Err(err) => {
            eprintln!("Error: {err:#}");
            ProcessExit::Failure.into()
        }
    }
}

async fn run(args: &Args) -> Result<ProcessExit> {
    let config = load_default_file_config()?;
    let level = default_log_level(args.verbose, args.quiet, config.verbosity);
    init_tracing(level, args.verbose > 0 || args.quiet, no_color_env_requested());

    let mut request = HarvestRequest::new(&args.input, &args.output);
    request.prefix = resolve_prefix(args.prefix.as_deref(), &config);

    let plan = prepare(&request)
        .with_context(|| format!("Failed to extract records from '{}'", args.input.display()))?;
    info!(
        records = plan.records.len(),
        info = %plan.info_path.display(),
        "info file written"
    );

    let client = HttpClient::with_timeouts(
        config.connect_timeout_secs.unwrap_or(CONNECT_TIMEOUT_SECS),
        config.read_timeout_secs.unwrap_or(READ_TIMEOUT_SECS),
    )
    .context("Failed to create HTTP client")?;

    let progress = should_use_progress(
        std::io::stderr().is_terminal(),
        args.quiet,
        is_dumb_terminal(),
    )
    .then(|| archive_progress_bar(plan.records.len()));

    let report = archive(&request, &plan, &client, |record, kind, status| {
        if let Some(bar) = &progress {
            bar.set_message(format!("{kind} {}", record.filenum()));
            bar.inc(1);
        }
        if let ArchiveStatus::Failed { detail } = status {
            let line = format!("line {}: {kind} {} failed: {detail}", record.line(), record.filenum());
            match &progress {
                Some(bar) => bar.println(line),
                None => warn!("{line}"),
            }
        }
    })
    .await;

    if let Some(bar) = progress {
        bar.finish_and_clear();
    }

    info!(
        downloaded = report.downloaded,
        skipped = report.skipped,
        failed = report.failed(),
        "harvest complete"
    );
    if !args.quiet {
        eprintln!(
            "{} downloaded, {} already present, {} failed",
            report.downloaded,
            report.skipped,
            report.failed()
        );
    }

    Ok(determine_exit_outcome(report.completed(), report.failed()))
}

fn resolve_prefix(flag: Option<&str>, config: &FileConfig) -> String {
    flag.or(config.archive_prefix.as_deref())
        .unwrap_or(DEFAULT_ARCHIVE_PREFIX)
        .to_string()
}

fn archive_progress_bar(records: usize) -> ProgressBar {
    let bar = ProgressBar::new(records as u64 * 2);
    let style = ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] [{bar:30.cyan/blue}] {pos}/{len} {msg}",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar());
    bar.set_style(style.progress_chars("=> "));
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}
