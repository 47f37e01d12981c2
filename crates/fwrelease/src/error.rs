//! Error types for fwrelease.
//!
//! Every fatal condition of a release run maps to one variant here. Soft
//! conditions (unknown board directories, duplicate versions, missing beta
//! entries during promotion) are not errors; they are logged and recorded in
//! the run summary instead.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for fwrelease operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Usage Errors ===
    /// `--beta` and `--promote-beta` were both requested.
    #[error("--beta and --promote-beta are mutually exclusive")]
    ConflictingModes,

    /// The version argument is unusable.
    #[error("invalid version '{version}': {reason}")]
    InvalidVersion {
        /// The rejected version string.
        version: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    // === Precondition Errors ===
    /// The firmware directory to scan does not exist.
    #[error("firmware directory '{}' not found", path.display())]
    ScanDirMissing {
        /// The directory that was expected.
        path: PathBuf,
    },

    /// The promotion target already exists.
    #[error("refusing to promote: target directory '{}' already exists", path.display())]
    TargetExists {
        /// The directory that would have been overwritten.
        path: PathBuf,
    },

    /// The manifest file does not exist.
    #[error("releases.xml not found at {}", path.display())]
    ManifestNotFound {
        /// Where the manifest was looked for.
        path: PathBuf,
    },

    /// A known board directory has no matching `<board>` element.
    #[error("board '{board}' not present in releases.xml")]
    BoardMissing {
        /// Canonical board name.
        board: String,
    },

    /// A board element has no `<firmware>` section.
    #[error("board '{board}' lacks <firmware> section")]
    FirmwareSectionMissing {
        /// Canonical board name.
        board: String,
    },

    /// A board directory did not hold exactly one file for a pattern.
    #[error("expected exactly one file matching '{pattern}' in {}, found {found}", dir.display())]
    FileCount {
        /// The glob pattern that was applied.
        pattern: &'static str,
        /// The board directory that was searched.
        dir: PathBuf,
        /// How many files matched.
        found: usize,
    },

    // === Manifest Errors ===
    /// The manifest could not be parsed.
    #[error("malformed XML at byte {position}: {message}")]
    XmlParse {
        /// Byte offset into the document.
        position: usize,
        /// Parser message.
        message: String,
    },

    /// A file name pattern could not be compiled.
    #[error("invalid file pattern: {0}")]
    Glob(#[from] glob::PatternError),

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Renaming the beta tree into place failed.
    #[error("failed to move {} to {}: {source}", from.display(), to.display())]
    DirectoryMove {
        /// Source directory.
        from: PathBuf,
        /// Destination directory.
        to: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The staged manifest could not replace the original.
    #[error("failed to write {}: {source}", path.display())]
    Persist {
        /// The manifest path.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },
}

/// A specialized Result type for fwrelease operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a board-missing error.
    #[must_use]
    pub fn board_missing(board: impl Into<String>) -> Self {
        Self::BoardMissing {
            board: board.into(),
        }
    }

    /// Create a firmware-section-missing error.
    #[must_use]
    pub fn firmware_section_missing(board: impl Into<String>) -> Self {
        Self::FirmwareSectionMissing {
            board: board.into(),
        }
    }

    /// Create an XML parse error.
    #[must_use]
    pub fn xml(position: usize, message: impl Into<String>) -> Self {
        Self::XmlParse {
            position,
            message: message.into(),
        }
    }

    /// Check if this error was raised before any I/O took place.
    #[must_use]
    pub fn is_usage_error(&self) -> bool {
        matches!(self, Self::ConflictingModes | Self::InvalidVersion { .. })
    }
}
