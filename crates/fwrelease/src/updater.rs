//! The release run: scan boards, update the manifest, commit.
//!
//! [`Updater::apply`] does all of the work in memory. [`Updater::commit`]
//! performs the only writes: the staged manifest replaces `releases.xml` and,
//! when promoting, the beta tree is renamed into place. The manifest is
//! staged before the move and the move is rolled back if the manifest
//! cannot be committed, so the two never disagree on disk.

use std::fs;
use std::path::PathBuf;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::boards::{board_directories, canonical_board_name, select_files};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::manifest::{FirmwareEntry, InsertOutcome, Manifest};
use crate::release::{ReleaseMode, ReleasePlan};

/// What a run did, for logging and `--json` output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReleaseSummary {
    /// Version that was processed.
    pub version: String,
    /// Mode of the run.
    pub mode: ReleaseMode,
    /// Entries added to the manifest, in insertion order.
    pub inserted: Vec<InsertedEntry>,
    /// Boards skipped because the version was already present.
    pub duplicates: Vec<String>,
    /// Directory names that are not known boards.
    pub unknown_directories: Vec<String>,
    /// Beta entries removed during promotion.
    pub removed_betas: Vec<RemovedBetaEntries>,
    /// Boards where promotion found no beta entry to remove.
    pub missing_betas: Vec<String>,
    /// The directory move performed by promotion.
    pub moved: Option<DirectoryMove>,
    /// Whether anything was written.
    pub committed: bool,
}

/// One entry added to a board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InsertedEntry {
    /// Canonical board name.
    pub board: String,
    /// The entry as written.
    pub entry: FirmwareEntry,
}

/// Beta entries removed from one board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemovedBetaEntries {
    /// Canonical board name.
    pub board: String,
    /// How many were removed.
    pub count: usize,
}

/// Source and destination of a promotion move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectoryMove {
    /// The beta directory.
    pub from: PathBuf,
    /// The release directory.
    pub to: PathBuf,
}

/// Runs one release against a manifest.
#[derive(Debug)]
pub struct Updater<'a> {
    config: &'a Config,
    plan: &'a ReleasePlan,
}

impl<'a> Updater<'a> {
    /// Create an updater for a resolved plan.
    #[must_use]
    pub fn new(config: &'a Config, plan: &'a ReleasePlan) -> Self {
        Self { config, plan }
    }

    /// Apply and commit.
    ///
    /// # Errors
    ///
    /// Returns the first fatal error; nothing is written in that case.
    pub fn run(&self) -> Result<ReleaseSummary> {
        let (manifest, mut summary) = self.apply()?;
        self.commit(&manifest, &mut summary)?;
        Ok(summary)
    }

    /// Load the manifest and apply every board in the scan directory.
    ///
    /// # Errors
    ///
    /// Returns an error for a missing manifest, a board element that does
    /// not exist, a board without a `<firmware>` section, or a board
    /// directory without exactly one firmware image and init file.
    pub fn apply(&self) -> Result<(Manifest, ReleaseSummary)> {
        let plan = self.plan;
        let mut manifest = Manifest::load(&self.config.manifest_path())?;
        let mut summary = ReleaseSummary {
            version: plan.version.clone(),
            mode: plan.mode,
            ..ReleaseSummary::default()
        };

        for board_dir in board_directories(&plan.scan_dir)? {
            let Some(board_name) = canonical_board_name(&board_dir.name) else {
                warn!("Unknown board dir '{}', skipping", board_dir.name);
                summary.unknown_directories.push(board_dir.name);
                continue;
            };
            debug!("Processing {} from {}", board_name, board_dir.path.display());

            let mut board = manifest.board_mut(board_name)?;
            let mut min_bootloader = board.min_bootloader();

            if plan.mode == ReleaseMode::PromoteBeta {
                let removed = board.remove_betas(&plan.version)?;
                if removed.count == 0 {
                    warn!(
                        "No beta entry for {} found on {}, promoting anyway",
                        plan.version, board_name
                    );
                    summary.missing_betas.push(board_name.to_string());
                } else {
                    summary.removed_betas.push(RemovedBetaEntries {
                        board: board_name.to_string(),
                        count: removed.count,
                    });
                }
                if let Some(from_beta) = removed.min_bootloader {
                    min_bootloader = from_beta;
                }
            }

            let files = select_files(&board_dir.path)?;
            let base_url = self.config.base_url();
            let entry = FirmwareEntry {
                kind: plan.mode.entry_kind(),
                version: plan.version.clone(),
                hexfile: plan.download_url(base_url, &board_dir.name, &files.hex_name()),
                initfile: plan.download_url(base_url, &board_dir.name, &files.init_name()),
                minbootloader: min_bootloader,
            };

            match board.insert_entry(&entry)? {
                InsertOutcome::Inserted => {
                    info!(
                        "Added {} {} to {} (minbootloader {})",
                        entry.kind.tag(),
                        entry.version,
                        board_name,
                        entry.minbootloader
                    );
                    summary.inserted.push(InsertedEntry {
                        board: board_name.to_string(),
                        entry,
                    });
                }
                InsertOutcome::Duplicate => {
                    warn!("Skipping {} ({} already present)", board_name, entry.version);
                    summary.duplicates.push(board_name.to_string());
                }
            }
        }

        Ok((manifest, summary))
    }

    /// Write the manifest and, when promoting, move the beta tree.
    ///
    /// # Errors
    ///
    /// Returns an error if staging the manifest, moving the directory or
    /// replacing the manifest fails. A failed replace undoes the move.
    pub fn commit(&self, manifest: &Manifest, summary: &mut ReleaseSummary) -> Result<()> {
        let path = self.config.manifest_path();
        let staged = manifest.stage(&path)?;

        let Some(target) = &self.plan.target_dir else {
            Manifest::commit(staged, &path)?;
            info!("Wrote {}", path.display());
            summary.committed = true;
            return Ok(());
        };

        let source = &self.plan.scan_dir;
        // Re-checked here: rename() would silently replace an empty directory
        if target.exists() {
            return Err(Error::TargetExists {
                path: target.clone(),
            });
        }
        fs::rename(source, target).map_err(|err| Error::DirectoryMove {
            from: source.clone(),
            to: target.clone(),
            source: err,
        })?;

        if let Err(err) = Manifest::commit(staged, &path) {
            if let Err(undo) = fs::rename(target, source) {
                error!(
                    "Could not move {} back to {}: {}",
                    target.display(),
                    source.display(),
                    undo
                );
            }
            return Err(err);
        }

        info!("Moved {} to {}", source.display(), target.display());
        info!("Wrote {}", path.display());
        summary.moved = Some(DirectoryMove {
            from: source.clone(),
            to: target.clone(),
        });
        summary.committed = true;
        Ok(())
    }
}

impl ReleaseSummary {
    /// Number of entries added.
    #[must_use]
    pub fn inserted_count(&self) -> usize {
        self.inserted.len()
    }

    /// Log a one-line summary of the run.
    pub fn log(&self) {
        info!(
            "{} {}: {} added, {} already present, {} unknown directories",
            match self.mode {
                ReleaseMode::Release => "Release",
                ReleaseMode::Beta => "Beta",
                ReleaseMode::PromoteBeta => "Promotion of",
            },
            self.version,
            self.inserted_count(),
            self.duplicates.len(),
            self.unknown_directories.len()
        );
    }
}
