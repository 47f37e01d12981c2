//! Board directories on disk.
//!
//! A firmware drop is laid out as `<scan dir>/<board dir>/`, one directory per
//! hardware target, each holding one `.hex` image and one `_init.dat` file.

use std::fs;
use std::path::{Path, PathBuf};

use glob::Pattern;
use tracing::trace;

use crate::error::{Error, Result};

/// On-disk directory name to canonical manifest board name.
pub const BOARD_DIRECTORIES: [(&str, &str); 3] = [
    ("blefriend", "BLEFRIEND"),
    ("blefriend32", "BLEFRIEND32"),
    ("blespifriend", "BLESPIFRIEND"),
];

/// Firmware image pattern.
pub const HEX_PATTERN: &str = "*.hex";

/// Initialization data pattern.
pub const INIT_PATTERN: &str = "*_init.dat";

/// Look up the canonical board name for a directory name.
#[must_use]
pub fn canonical_board_name(dir_name: &str) -> Option<&'static str> {
    BOARD_DIRECTORIES
        .iter()
        .find(|(dir, _)| *dir == dir_name)
        .map(|(_, board)| *board)
}

/// A subdirectory of the scan directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardDir {
    /// Directory name, used verbatim in download URLs.
    pub name: String,
    /// Full path.
    pub path: PathBuf,
}

/// List the immediate subdirectories of `scan_dir`, sorted by name.
///
/// # Errors
///
/// Returns an error if the directory cannot be read.
pub fn board_directories(scan_dir: &Path) -> Result<Vec<BoardDir>> {
    let mut dirs = Vec::new();
    for entry in fs::read_dir(scan_dir)? {
        let entry = entry?;
        if !entry.path().is_dir() {
            continue;
        }
        dirs.push(BoardDir {
            name: entry.file_name().to_string_lossy().into_owned(),
            path: entry.path(),
        });
    }
    dirs.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(dirs)
}

/// The two files published for one board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirmwareFiles {
    /// The firmware image.
    pub hex: PathBuf,
    /// The initialization data.
    pub init: PathBuf,
}

impl FirmwareFiles {
    /// File name of the firmware image.
    #[must_use]
    pub fn hex_name(&self) -> String {
        file_name(&self.hex)
    }

    /// File name of the initialization data.
    #[must_use]
    pub fn init_name(&self) -> String {
        file_name(&self.init)
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Pick the firmware image and init data in a board directory.
///
/// Signature images (any `.hex` whose name contains "signature", ignoring
/// case) are not candidates.
///
/// # Errors
///
/// Returns [`Error::FileCount`] unless each pattern matches exactly one file.
pub fn select_files(dir: &Path) -> Result<FirmwareFiles> {
    Ok(FirmwareFiles {
        hex: pick_single(dir, HEX_PATTERN, true)?,
        init: pick_single(dir, INIT_PATTERN, false)?,
    })
}

fn pick_single(dir: &Path, pattern: &'static str, exclude_signature: bool) -> Result<PathBuf> {
    let matcher = Pattern::new(pattern)?;
    let mut matches = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.path().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if !matcher.matches(&name) {
            continue;
        }
        if exclude_signature && name.to_lowercase().contains("signature") {
            trace!("Ignoring signature file {name}");
            continue;
        }
        matches.push(entry.path());
    }

    match <[PathBuf; 1]>::try_from(matches) {
        Ok([single]) => Ok(single),
        Err(found) => Err(Error::FileCount {
            pattern,
            dir: dir.to_path_buf(),
            found: found.len(),
        }),
    }
}
