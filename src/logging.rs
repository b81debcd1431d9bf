//! Log sink setup for the binary.
//!
//! Records go to a daily file (`foldersort.log.YYYY-MM-DD`) in the log
//! directory. Warnings and errors are also echoed to stderr.

use std::io;
use std::path::Path;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Installs the global subscriber.
///
/// `default_level` is used unless `RUST_LOG` is set. With `verbose`, the
/// level is raised to debug and echoed to stderr as well. Keep the returned guard alive until
/// exit so buffered records are flushed.
pub fn init_logging(log_dir: &Path, default_level: &str, verbose: bool) -> io::Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)?;

    let env_filter = EnvFilter::builder()
        .with_default_directive(default_filter(default_level, verbose).into())
        .from_env_lossy();

    let file_appender = tracing_appender::rolling::daily(log_dir, "foldersort.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let console_level = if verbose { Level::DEBUG } else { Level::WARN };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_ansi(false).with_writer(non_blocking))
        .with(
            fmt::layer()
                .with_writer(io::stderr)
                .with_target(false)
                .with_filter(LevelFilter::from_level(console_level)),
        )
        .init();

    Ok(guard)
}

/// Level used when `RUST_LOG` is unset. Unknown names fall back to info.
fn default_filter(default_level: &str, verbose: bool) -> LevelFilter {
    let configured = default_level
        .parse::<LevelFilter>()
        .unwrap_or(LevelFilter::INFO);
    if verbose {
        configured.max(LevelFilter::DEBUG)
    } else {
        configured
    }
}
