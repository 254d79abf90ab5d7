use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use sheetbridge_core::config::load_default_file_config;
use sheetbridge_core::exit::ProcessExit;
use sheetbridge_core::terminal::{default_log_level, init_tracing, no_color_env_requested};
use sheetbridge_core::{ConversionRequest, OutputMethod, Schema, convert_file};
use tracing::{debug, info};

/// Convert a JSON document of column lists into an xlsx workbook.
#[derive(Parser, Debug)]
#[command(name = "json2xlsx")]
#[command(author, version, about = "Convert a JSON document of column lists into xlsx")]
struct Args {
    /// JSON document to convert
    #[arg(short, long)]
    input: PathBuf,

    /// Output path; its extension is replaced by `_<method>.xlsx`
    #[arg(short, long)]
    output: PathBuf,

    /// Output layout: one wide sheet (compact) or one sheet per group (full)
    #[arg(short, long, default_value_t = OutputMethod::Compact)]
    method: OutputMethod,

    /// Schema JSON file (defaults to the built-in catalogue)
    #[arg(long)]
    schema: Option<PathBuf>,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(&args) {
        Ok(()) => ProcessExit::Success.into(),
        Err(err) => {
            eprintln!("Error: {err:#}");
            ProcessExit::Failure.into()
        }
    }
}

fn run(args: &Args) -> Result<()> {
    let config = load_default_file_config()?;
    let level = default_log_level(args.verbose, args.quiet, config.verbosity);
    init_tracing(level, args.verbose > 0 || args.quiet, no_color_env_requested());

    let schema = match args.schema.as_ref().or(config.schema_file.as_ref()) {
        Some(path) => {
            debug!(path = %path.display(), "loading schema");
            Schema::from_json_file(path)
                .with_context(|| format!("Failed to load schema '{}'", path.display()))?
        }
        None => Schema::catalogue(),
    };

    let request = ConversionRequest {
        input: args.input.clone(),
        output: args.output.clone(),
        method: args.method,
    };
    let outcome = convert_file(&request, &schema)
        .with_context(|| format!("Failed to convert '{}'", args.input.display()))?;

    info!(
        output = %outcome.output.display(),
        sheets = outcome.sheets,
        rows = outcome.data_rows,
        overwritten = outcome.overwritten,
        "conversion complete"
    );
    if !args.quiet {
        println!("{}", outcome.output.display());
    }
    Ok(())
}
