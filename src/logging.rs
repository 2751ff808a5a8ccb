//! Diagnostic logging on stderr.
//!
//! Stdout belongs to check results, so every log line goes to stderr.  The filter is chosen in
//! this order: `FEATCHECK_LOG`, `RUST_LOG`, `-v` flags, `log_level` from the config, and finally
//! warnings only.  Config files are read after logging starts, so the filter sits behind a
//! reload handle that [`apply_config`] can swap.

use std::{io::IsTerminal, sync::OnceLock};
use tracing_subscriber::{EnvFilter, Registry, reload};

use crate::{cli::CliArgs, config::Config};

const LOG_ENV_VAR: &str = "FEATCHECK_LOG";

static FILTER_HANDLE: OnceLock<reload::Handle<EnvFilter, Registry>> = OnceLock::new();

/// Filter used when no environment variable sets one.
fn verbosity_filter(verbose: u8) -> EnvFilter {
    EnvFilter::new(match verbose {
        0 => "warn",
        1 => "info",
        2 => "info,featcheck=debug",
        _ => "trace",
    })
}

fn env_filter() -> Option<EnvFilter> {
    EnvFilter::try_from_env(LOG_ENV_VAR)
        .or_else(|_| EnvFilter::try_from_default_env())
        .ok()
}

/// Install the global subscriber.
///
/// Without `-v` output is bare `LEVEL message` lines, so a warning reads like part of the
/// normal output.  With `-v` each line also carries a timestamp and the module it came from.
///
/// # Panics
///
/// If a global subscriber is already installed.
pub(crate) fn init(args: &CliArgs) {
    use tracing_subscriber::{fmt, prelude::*};

    let filter = env_filter().unwrap_or_else(|| verbosity_filter(args.verbose));
    let (filter, handle) = reload::Layer::new(filter);
    let _ = FILTER_HANDLE.set(handle);

    let ansi = std::io::stderr().is_terminal();
    let terse = (args.verbose == 0).then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(ansi)
            .with_target(false)
            .without_time()
    });
    let detailed = (args.verbose > 0).then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(ansi)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(terse)
        .with(detailed)
        .init();
}

/// Switch to the config file's `log_level`, unless an env var or `-v` already chose the filter.
pub(crate) fn apply_config(config: &Config, args: &CliArgs) {
    let Some(log_level) = config.log_level.as_deref() else {
        return;
    };

    if args.verbose > 0 || env_filter().is_some() {
        tracing::debug!("Ignoring config log_level {log_level:?}; overridden by -v or environment");
        return;
    }

    let filter = match EnvFilter::try_new(log_level) {
        Ok(filter) => filter,
        Err(e) => {
            tracing::warn!("Invalid log_level in config file: {}: {}", log_level, e);
            return;
        }
    };

    if let Some(handle) = FILTER_HANDLE.get() {
        if let Err(e) = handle.reload(filter) {
            tracing::warn!("Failed to apply log_level from config: {}", e);
        }
    }
}

/// Route logs through the test harness's captured output, once per test binary.
///
/// Defaults to DEBUG, overridable with `FEATCHECK_LOG` or `RUST_LOG`.
#[cfg(test)]
pub(crate) fn init_test_logging() {
    static INIT: OnceLock<()> = OnceLock::new();

    INIT.get_or_init(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(env_filter().unwrap_or_else(|| EnvFilter::new("debug")))
            .with_test_writer()
            .try_init();
    });
}

