//! The `releases.xml` manifest.
//!
//! A manifest holds one `<board name="...">` per hardware target. Each board
//! has a `<bootloader>` section and a `<firmware>` section; the latter lists
//! `<firmwarerelease>` and `<firmwarebeta>` entries, newest first.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::Path;

use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{Error, Result};
use crate::xml::{self, Document, Element};

/// Returned when neither the bootloader nor any entry declares a minimum.
pub const DEFAULT_MIN_BOOTLOADER: &str = "0.0";

const BOARD_TAG: &str = "board";
const FIRMWARE_TAG: &str = "firmware";
const BOOTLOADER_RELEASE_PATH: &str = "bootloader/bootloaderrelease";

/// Which kind of firmware entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// `<firmwarerelease>`
    Release,
    /// `<firmwarebeta>`
    Beta,
}

impl EntryKind {
    /// XML tag name for this kind.
    #[must_use]
    pub fn tag(self) -> &'static str {
        match self {
            Self::Release => "firmwarerelease",
            Self::Beta => "firmwarebeta",
        }
    }

    /// Kind for a tag name, if it is a firmware entry tag.
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "firmwarerelease" => Some(Self::Release),
            "firmwarebeta" => Some(Self::Beta),
            _ => None,
        }
    }
}

/// One release entry as written to the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FirmwareEntry {
    /// Release or beta.
    pub kind: EntryKind,
    /// Version string, e.g. `0.9.0`.
    pub version: String,
    /// Public URL of the `.hex` image.
    pub hexfile: String,
    /// Public URL of the `_init.dat` file.
    pub initfile: String,
    /// Lowest bootloader version this firmware supports.
    pub minbootloader: String,
}

impl FirmwareEntry {
    /// Build the XML element. Attribute order is fixed.
    #[must_use]
    pub fn to_element(&self) -> Element {
        Element::new(self.kind.tag())
            .with_attr("version", &self.version)
            .with_attr("hexfile", &self.hexfile)
            .with_attr("initfile", &self.initfile)
            .with_attr("minbootloader", &self.minbootloader)
    }

    /// Read an entry back from an element; missing attributes become empty.
    #[must_use]
    pub fn from_element(element: &Element) -> Option<Self> {
        let kind = EntryKind::from_tag(&element.name)?;
        let get = |key: &str| element.attr(key).unwrap_or_default().to_string();
        Some(Self {
            kind,
            version: get("version"),
            hexfile: get("hexfile"),
            initfile: get("initfile"),
            minbootloader: get("minbootloader"),
        })
    }
}

/// Result of trying to add an entry to a board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The entry is now first in the firmware list.
    Inserted,
    /// An entry of the same kind and version already existed.
    Duplicate,
}

/// Beta entries taken out of a board during promotion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemovedBetas {
    /// How many `<firmwarebeta>` elements were removed.
    pub count: usize,
    /// First non-empty `minbootloader` among them.
    pub min_bootloader: Option<String>,
}

/// An in-memory manifest document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    document: Document,
}

impl Manifest {
    /// Parse a manifest from XML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the XML is malformed.
    pub fn parse(xml: &str) -> Result<Self> {
        Ok(Self {
            document: xml::parse(xml)?,
        })
    }

    /// Load a manifest from disk.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ManifestNotFound`] when the file is absent, or a parse
    /// or I/O error otherwise.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|err| match err.kind() {
            ErrorKind::NotFound => Error::ManifestNotFound {
                path: path.to_path_buf(),
            },
            _ => Error::Io(err),
        })?;
        debug!("Loaded manifest from {}", path.display());
        Self::parse(&content)
    }

    /// Serialize with two-space indentation and a trailing newline.
    #[must_use]
    pub fn to_xml(&self) -> String {
        xml::write(&self.document)
    }

    /// Find a board element by exact name.
    #[must_use]
    pub fn board(&self, name: &str) -> Option<&Element> {
        self.document
            .root
            .descendants()
            .into_iter()
            .find(|e| is_board(e, name))
    }

    /// Mutable view of a board.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BoardMissing`] if no board has that name.
    pub fn board_mut(&mut self, name: &str) -> Result<Board<'_>> {
        self.document
            .root
            .find_descendant_mut(&|e: &Element| is_board(e, name))
            .map(|element| Board { element })
            .ok_or_else(|| Error::board_missing(name))
    }

    /// Firmware entries of a board in document order.
    #[must_use]
    pub fn entries(&self, board: &str) -> Vec<FirmwareEntry> {
        self.board(board)
            .and_then(|b| b.child(FIRMWARE_TAG))
            .map(|fw| fw.elements().filter_map(FirmwareEntry::from_element).collect())
            .unwrap_or_default()
    }

    /// Write the serialized manifest to a temporary file next to `path`.
    ///
    /// The temporary file takes over the permissions of `path` when it
    /// exists. Nothing at `path` changes until [`Manifest::commit`].
    ///
    /// # Errors
    ///
    /// Returns an error if the temporary file cannot be created or written.
    pub fn stage(&self, path: &Path) -> Result<NamedTempFile> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut staged = NamedTempFile::new_in(dir)?;
        staged.write_all(self.to_xml().as_bytes())?;
        staged.as_file().sync_all()?;
        if let Ok(meta) = fs::metadata(path) {
            staged.as_file().set_permissions(meta.permissions())?;
        }
        debug!("Staged manifest at {}", staged.path().display());
        Ok(staged)
    }

    /// Atomically replace `path` with a staged manifest.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Persist`] if the rename fails.
    pub fn commit(staged: NamedTempFile, path: &Path) -> Result<()> {
        staged
            .persist(path)
            .map(|_| ())
            .map_err(|err| Error::Persist {
                path: path.to_path_buf(),
                source: err.error,
            })
    }

    /// Stage and commit in one step.
    ///
    /// # Errors
    ///
    /// Returns an error if staging or committing fails.
    pub fn save(&self, path: &Path) -> Result<()> {
        let staged = self.stage(path)?;
        Self::commit(staged, path)
    }
}

fn is_board(element: &Element, name: &str) -> bool {
    element.name == BOARD_TAG && element.attr("name") == Some(name)
}

/// Mutable view of one `<board>` element.
#[derive(Debug)]
pub struct Board<'a> {
    element: &'a mut Element,
}

impl Board<'_> {
    /// Canonical board name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.element.attr("name").unwrap_or_default()
    }

    /// Resolve the minimum bootloader for a new entry on this board.
    ///
    /// Prefers the declared bootloader release version, then the first
    /// firmware entry with a non-empty `minbootloader`, then
    /// [`DEFAULT_MIN_BOOTLOADER`].
    #[must_use]
    pub fn min_bootloader(&self) -> String {
        if let Some(version) = self
            .element
            .find(BOOTLOADER_RELEASE_PATH)
            .and_then(|boot| boot.attr("version"))
            .filter(|v| !v.is_empty())
        {
            return version.to_string();
        }

        self.element
            .child(FIRMWARE_TAG)
            .into_iter()
            .flat_map(|fw| fw.elements())
            .filter(|e| EntryKind::from_tag(&e.name).is_some())
            .find_map(|e| e.attr("minbootloader").filter(|v| !v.is_empty()))
            .unwrap_or(DEFAULT_MIN_BOOTLOADER)
            .to_string()
    }

    fn firmware_mut(&mut self) -> Result<&mut Element> {
        let name = self.name().to_string();
        self.element
            .child_mut(FIRMWARE_TAG)
            .ok_or_else(|| Error::firmware_section_missing(name))
    }

    /// Whether an entry of this kind and version already exists.
    #[must_use]
    pub fn has_entry(&self, kind: EntryKind, version: &str) -> bool {
        self.element
            .child(FIRMWARE_TAG)
            .is_some_and(|fw| fw.elements().any(|e| matches_entry(e, kind, version)))
    }

    /// Insert an entry at the head of the firmware list unless it exists.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FirmwareSectionMissing`] if the board has no
    /// `<firmware>` element.
    pub fn insert_entry(&mut self, entry: &FirmwareEntry) -> Result<InsertOutcome> {
        if self.has_entry(entry.kind, &entry.version) {
            return Ok(InsertOutcome::Duplicate);
        }
        self.firmware_mut()?.prepend_element(entry.to_element());
        Ok(InsertOutcome::Inserted)
    }

    /// Remove every `<firmwarebeta>` with the given version.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FirmwareSectionMissing`] if the board has no
    /// `<firmware>` element.
    pub fn remove_betas(&mut self, version: &str) -> Result<RemovedBetas> {
        let firmware = self.firmware_mut()?;
        let removed = firmware.remove_elements(|e| matches_entry(e, EntryKind::Beta, version));
        let min_bootloader = removed
            .iter()
            .find_map(|e| e.attr("minbootloader").filter(|v| !v.is_empty()))
            .map(str::to_string);
        Ok(RemovedBetas {
            count: removed.len(),
            min_bootloader,
        })
    }
}

fn matches_entry(element: &Element, kind: EntryKind, version: &str) -> bool {
    element.name == kind.tag() && element.attr("version") == Some(version)
}
