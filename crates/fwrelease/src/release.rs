//! Release mode and directory resolution.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::{Error, Result};
use crate::manifest::EntryKind;

/// Directory holding beta drops, relative to the firmware root.
pub const BETA_DIR: &str = "beta";

/// How a run treats the firmware drop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReleaseMode {
    /// Publish `<version>/` as `<firmwarerelease>` entries.
    #[default]
    Release,
    /// Publish `beta/<version>/` as `<firmwarebeta>` entries.
    Beta,
    /// Turn the `beta/<version>/` drop into a release and move it to `<version>/`.
    PromoteBeta,
}

impl ReleaseMode {
    /// Combine the mutually exclusive CLI flags.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConflictingModes`] if both flags are set.
    pub fn from_flags(beta: bool, promote_beta: bool) -> Result<Self> {
        match (beta, promote_beta) {
            (true, true) => Err(Error::ConflictingModes),
            (true, false) => Ok(Self::Beta),
            (false, true) => Ok(Self::PromoteBeta),
            (false, false) => Ok(Self::Release),
        }
    }

    /// Kind of entry this mode inserts.
    #[must_use]
    pub fn entry_kind(self) -> EntryKind {
        match self {
            Self::Beta => EntryKind::Beta,
            Self::Release | Self::PromoteBeta => EntryKind::Release,
        }
    }
}

/// Resolved directories and naming for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleasePlan {
    /// Version being published.
    pub version: String,
    /// Selected mode.
    pub mode: ReleaseMode,
    /// Directory whose board subdirectories are scanned.
    pub scan_dir: PathBuf,
    /// Where the scan directory moves to when promoting.
    pub target_dir: Option<PathBuf>,
}

impl ReleasePlan {
    /// Compute the directories for a run without touching the filesystem.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidVersion`] if the version is empty or would
    /// escape the firmware root.
    pub fn new(root: &Path, version: &str, mode: ReleaseMode) -> Result<Self> {
        validate_version(version)?;

        let release_dir = root.join(version);
        let beta_dir = root.join(BETA_DIR).join(version);
        let (scan_dir, target_dir) = match mode {
            ReleaseMode::Release => (release_dir, None),
            ReleaseMode::Beta => (beta_dir, None),
            ReleaseMode::PromoteBeta => (beta_dir, Some(release_dir)),
        };

        Ok(Self {
            version: version.to_string(),
            mode,
            scan_dir,
            target_dir,
        })
    }

    /// Compute the directories and check that they are usable.
    ///
    /// # Errors
    ///
    /// Returns an error if the version is invalid, the scan directory is
    /// missing, or the promotion target already exists.
    pub fn resolve(root: &Path, version: &str, mode: ReleaseMode) -> Result<Self> {
        let plan = Self::new(root, version, mode)?;
        plan.check()?;
        Ok(plan)
    }

    /// Check the filesystem preconditions.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ScanDirMissing`] or [`Error::TargetExists`].
    pub fn check(&self) -> Result<()> {
        if !self.scan_dir.is_dir() {
            return Err(Error::ScanDirMissing {
                path: self.scan_dir.clone(),
            });
        }
        if let Some(target) = &self.target_dir {
            if target.exists() {
                return Err(Error::TargetExists {
                    path: target.clone(),
                });
            }
        }
        Ok(())
    }

    /// Path segment between the base URL and the board directory.
    #[must_use]
    pub fn url_prefix(&self) -> String {
        match self.mode {
            ReleaseMode::Beta => format!("{BETA_DIR}/{}", self.version),
            ReleaseMode::Release | ReleaseMode::PromoteBeta => self.version.clone(),
        }
    }

    /// Public download URL of a file in a board directory.
    #[must_use]
    pub fn download_url(&self, base_url: &str, board_dir: &str, file_name: &str) -> String {
        format!(
            "{}/{}/{board_dir}/{file_name}",
            base_url.trim_end_matches('/'),
            self.url_prefix()
        )
    }
}

fn validate_version(version: &str) -> Result<()> {
    let reason = if version.trim().is_empty() {
        "version must not be empty"
    } else if version.contains(['/', '\\']) {
        "version must not contain path separators"
    } else if version == "." || version == ".." {
        "version must not be a relative directory"
    } else {
        return Ok(());
    };
    Err(Error::InvalidVersion {
        version: version.to_string(),
        reason,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const BASE: &str = "https://example.com/raw/master";

    #[test]
    fn test_mode_from_flags() {
        assert_eq!(ReleaseMode::from_flags(false, false).unwrap(), ReleaseMode::Release);
        assert_eq!(ReleaseMode::from_flags(true, false).unwrap(), ReleaseMode::Beta);
        assert_eq!(
            ReleaseMode::from_flags(false, true).unwrap(),
            ReleaseMode::PromoteBeta
        );
        assert!(matches!(
            ReleaseMode::from_flags(true, true),
            Err(Error::ConflictingModes)
        ));
    }

    #[test]
    fn test_mode_entry_kind() {
        assert_eq!(ReleaseMode::Release.entry_kind(), EntryKind::Release);
        assert_eq!(ReleaseMode::Beta.entry_kind(), EntryKind::Beta);
        assert_eq!(ReleaseMode::PromoteBeta.entry_kind(), EntryKind::Release);
    }

    #[test]
    fn test_plan_directories() {
        let root = Path::new("/fw");

        let plan = ReleasePlan::new(root, "1.0.0", ReleaseMode::Release).unwrap();
        assert_eq!(plan.scan_dir, PathBuf::from("/fw/1.0.0"));
        assert_eq!(plan.target_dir, None);

        let plan = ReleasePlan::new(root, "1.0.0", ReleaseMode::Beta).unwrap();
        assert_eq!(plan.scan_dir, PathBuf::from("/fw/beta/1.0.0"));
        assert_eq!(plan.target_dir, None);

        let plan = ReleasePlan::new(root, "1.0.0", ReleaseMode::PromoteBeta).unwrap();
        assert_eq!(plan.scan_dir, PathBuf::from("/fw/beta/1.0.0"));
        assert_eq!(plan.target_dir, Some(PathBuf::from("/fw/1.0.0")));
    }

    #[test]
    fn test_invalid_versions() {
        for version in ["", "  ", "../1.0", "a\\b", ".", ".."] {
            let err = ReleasePlan::new(Path::new("."), version, ReleaseMode::Release).unwrap_err();
            assert!(err.is_usage_error(), "accepted {version:?}");
        }
    }

    #[test]
    fn test_download_urls() {
        let plan = ReleasePlan::new(Path::new("."), "1.0.0", ReleaseMode::Release).unwrap();
        assert_eq!(
            plan.download_url(BASE, "blefriend32", "ble_fw.hex"),
            "https://example.com/raw/master/1.0.0/blefriend32/ble_fw.hex"
        );

        let plan = ReleasePlan::new(Path::new("."), "0.9.0", ReleaseMode::Beta).unwrap();
        assert_eq!(
            plan.download_url(&format!("{BASE}/"), "blefriend", "fw_init.dat"),
            "https://example.com/raw/master/beta/0.9.0/blefriend/fw_init.dat"
        );

        let plan = ReleasePlan::new(Path::new("."), "0.9.0", ReleaseMode::PromoteBeta).unwrap();
        assert_eq!(plan.url_prefix(), "0.9.0");
    }

    #[test]
    fn test_resolve_missing_scan_dir() {
        let tmp = TempDir::new().unwrap();
        let err = ReleasePlan::resolve(tmp.path(), "1.0.0", ReleaseMode::Release).unwrap_err();
        assert!(matches!(err, Error::ScanDirMissing { .. }));
    }

    #[test]
    fn test_resolve_promote_refuses_existing_target() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join("beta/0.9.0")).unwrap();
        std::fs::create_dir(tmp.path().join("0.9.0")).unwrap();

        let err = ReleasePlan::resolve(tmp.path(), "0.9.0", ReleaseMode::PromoteBeta).unwrap_err();
        assert!(matches!(err, Error::TargetExists { .. }));
    }

    #[test]
    fn test_resolve_promote_ok() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join("beta/0.9.0")).unwrap();

        let plan = ReleasePlan::resolve(tmp.path(), "0.9.0", ReleaseMode::PromoteBeta).unwrap();
        assert_eq!(plan.target_dir, Some(tmp.path().join("0.9.0")));
    }
}
