//! Terminal detection and tracing setup shared by the binaries.

use tracing_subscriber::EnvFilter;

use crate::config::VerbositySetting;

/// True when `NO_COLOR` is set to a non-empty value.
#[must_use]
pub fn no_color_env_requested() -> bool {
    std::env::var_os("NO_COLOR").is_some_and(|value| !value.is_empty())
}

/// True when `TERM=dumb`.
#[must_use]
pub fn is_dumb_terminal() -> bool {
    std::env::var("TERM")
        .map(|value| value.eq_ignore_ascii_case("dumb"))
        .unwrap_or(false)
}

/// Whether to draw a progress bar.
#[must_use]
pub fn should_use_progress(stderr_is_terminal: bool, quiet: bool, dumb_terminal: bool) -> bool {
    stderr_is_terminal && !quiet && !dumb_terminal
}

/// Resolves the default log level.
///
/// `-q` beats `-v`; flags beat the config file; the fallback is `info`.
#[must_use]
pub fn default_log_level(
    verbose: u8,
    quiet: bool,
    configured: Option<VerbositySetting>,
) -> &'static str {
    if quiet {
        return "error";
    }
    match verbose {
        0 => match configured {
            Some(VerbositySetting::Quiet) => "error",
            Some(VerbositySetting::Verbose) => "debug",
            Some(VerbositySetting::Debug) => "trace",
            Some(VerbositySetting::Default) | None => "info",
        },
        1 => "debug",
        _ => "trace",
    }
}

/// Installs the global subscriber writing to stderr.
///
/// `RUST_LOG` overrides `default_level` unless `force_cli_level` is set.
pub fn init_tracing(default_level: &str, force_cli_level: bool, no_color: bool) {
    let filter = if force_cli_level {
        EnvFilter::new(default_level)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
    };
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_ansi(!no_color)
        .with_env_filter(filter)
        .try_init();
}
