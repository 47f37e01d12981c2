//! Logging configuration for fwrelease.
//!
//! All diagnostics, including the soft warnings emitted while walking board
//! directories, go to stderr so that stdout stays free for `--dry-run` and
//! `--json` output.

use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// How much of a release run is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// `-q`: only fatal problems such as a failed rollback.
    Quiet,
    /// Inserted entries, skipped boards and the final summary.
    #[default]
    Normal,
    /// `-v`: also staging, file selection and bootloader resolution.
    Verbose,
    /// `-vv`: every board directory and glob match.
    Trace,
}

impl Verbosity {
    /// Most detailed level this verbosity lets through.
    #[must_use]
    pub fn to_level_filter(&self) -> Level {
        match self {
            Self::Quiet => Level::ERROR,
            Self::Normal => Level::INFO,
            Self::Verbose => Level::DEBUG,
            Self::Trace => Level::TRACE,
        }
    }

    /// Filter directive scoped to this crate, used when `RUST_LOG` is unset.
    #[must_use]
    pub fn filter_directive(&self) -> String {
        format!("fwrelease={}", self.to_level_filter())
    }
}

/// Install the stderr subscriber for `make-release`.
///
/// `RUST_LOG` wins over the command-line verbosity. A second call is a no-op.
///
/// ```no_run
/// use fwrelease::{init_logging, logging::Verbosity};
///
/// init_logging(Verbosity::Verbose);
/// ```
pub fn init_logging(verbosity: Verbosity) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.filter_directive()));

    let subscriber = tracing_subscriber::registry().with(env_filter).with(
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false),
    );

    let _ = subscriber.try_init();
}

/// Route warnings from library code into the test harness output.
#[cfg(test)]
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("warn")
        .with_test_writer()
        .try_init();
}
