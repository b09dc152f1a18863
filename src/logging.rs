//! File logging setup
//!
//! The terminal belongs to the TUI, so log output goes to a daily rolling
//! file in the XDG data directory (`~/.local/share/memview/logs/` on Linux).

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Environment variable consulted when no `--log-level` is given
pub const LOG_ENV_VAR: &str = "MEMVIEW_LOG";

/// Filter used when nothing else is configured
const DEFAULT_FILTER: &str = "warn";

/// Log file name prefix inside the logs directory
const LOG_FILE_PREFIX: &str = "memview.log";

/// Default logs directory, `None` without a home directory
pub fn default_log_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "memview").map(|dirs| dirs.data_dir().join("logs"))
}

/// Builds the filter with precedence: explicit level > `MEMVIEW_LOG` > "warn"
pub fn build_env_filter(log_level: Option<&str>) -> EnvFilter {
    if let Some(level) = log_level {
        if let Ok(filter) = EnvFilter::try_new(level) {
            return filter;
        }
    }
    if let Ok(env_level) = std::env::var(LOG_ENV_VAR) {
        if let Ok(filter) = EnvFilter::try_new(&env_level) {
            return filter;
        }
    }
    EnvFilter::new(DEFAULT_FILTER)
}

/// Installs the global subscriber writing into `dir`
///
/// Returns the guard that flushes buffered lines when dropped, or `None` if
/// the directory cannot be created. Keep the guard alive for the whole run.
pub fn init_in(dir: &Path, log_level: Option<&str>) -> Option<WorkerGuard> {
    std::fs::create_dir_all(dir).ok()?;

    let file_appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let subscriber = tracing_subscriber::registry()
        .with(build_env_filter(log_level))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true),
        );

    // A subscriber may already be installed (tests); the guard still matters
    let _ = tracing::subscriber::set_global_default(subscriber);

    Some(guard)
}

/// Installs the global subscriber in the default logs directory
pub fn init(log_level: Option<&str>) -> Option<WorkerGuard> {
    let dir = default_log_dir()?;
    init_in(&dir, log_level)
}
