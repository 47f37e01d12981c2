//! Command-line interface for the `make-release` binary.

use std::path::PathBuf;

use clap::builder::NonEmptyStringValueParser;
use clap::Parser;

use crate::config::Config;
use crate::error::Result;
use crate::logging::Verbosity;
use crate::release::ReleaseMode;

/// make-release - Add a firmware release to releases.xml
///
/// Scans `<version>/` (or `beta/<version>/`) for board directories and adds a
/// `<firmwarerelease>` or `<firmwarebeta>` entry for each one to the manifest.
#[derive(Debug, Parser)]
#[command(name = "make-release")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Version string, e.g. 0.9.0
    #[arg(
        id = "release_version",
        value_name = "VERSION",
        value_parser = NonEmptyStringValueParser::new()
    )]
    pub version: String,

    /// Insert as <firmwarebeta> from beta/<version>/
    #[arg(long, conflicts_with = "promote_beta")]
    pub beta: bool,

    /// Promote beta/<version>/ to <version>/ and replace its beta entries
    #[arg(long)]
    pub promote_beta: bool,

    /// Print the updated manifest instead of writing it
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Print a JSON summary of the run
    #[arg(long, conflicts_with = "dry_run")]
    pub json: bool,

    /// Path to a configuration file (default: ./release.toml)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Firmware root directory
    #[arg(long, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Manifest path, relative to the firmware root
    #[arg(long, value_name = "FILE")]
    pub manifest: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long)]
    pub quiet: bool,
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> Verbosity {
        if self.quiet {
            Verbosity::Quiet
        } else {
            match self.verbose {
                0 => Verbosity::Normal,
                1 => Verbosity::Verbose,
                _ => Verbosity::Trace,
            }
        }
    }

    /// The selected release mode.
    ///
    /// # Errors
    ///
    /// Returns an error if both mode flags are set.
    pub fn mode(&self) -> Result<ReleaseMode> {
        ReleaseMode::from_flags(self.beta, self.promote_beta)
    }

    /// Apply `--root` and `--manifest` on top of the loaded configuration.
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(root) = &self.root {
            config.release.root.clone_from(root);
        }
        if let Some(manifest) = &self.manifest {
            config.release.manifest.clone_from(manifest);
        }
    }
}
