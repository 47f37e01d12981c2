//! `fwrelease` - Firmware release bookkeeping
//!
//! This library maintains a `releases.xml` manifest: it scans on-disk
//! firmware drops, adds release and beta entries per board, and promotes
//! beta drops to releases.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod boards;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod manifest;
pub mod release;
pub mod updater;
pub mod xml;

pub use config::Config;
pub use error::{Error, Result};
pub use logging::init_logging;
pub use manifest::{EntryKind, FirmwareEntry, Manifest};
pub use release::{ReleaseMode, ReleasePlan};
pub use updater::{ReleaseSummary, Updater};
