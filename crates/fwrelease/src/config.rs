//! Configuration management for fwrelease.
//!
//! Configuration is layered with figment: built-in defaults, then the user
//! config file, then the repository's `release.toml` (or the file passed with
//! `--config`), then `FWRELEASE_` environment variables.

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default configuration file name in the user config directory.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Per-user config directory name.
const CONFIG_DIR_NAME: &str = "fwrelease";

/// Repository-local configuration file name.
pub const REPO_CONFIG_FILE_NAME: &str = "release.toml";

/// Public location the firmware files are served from.
pub const DEFAULT_BASE_URL: &str =
    "https://github.com/adafruit/Adafruit_BluefruitLE_Firmware/raw/master";

/// Manifest file name, relative to the firmware root.
pub const DEFAULT_MANIFEST: &str = "releases.xml";

/// Application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Release bookkeeping settings.
    pub release: ReleaseConfig,
}

/// Where firmware lives and how it is published.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReleaseConfig {
    /// URL prefix for generated `hexfile`/`initfile` attributes.
    pub base_url: String,
    /// Path to the manifest. Relative paths resolve against `root`.
    pub manifest: PathBuf,
    /// Directory holding `<version>/` and `beta/<version>/` trees.
    pub root: PathBuf,
}

impl Default for ReleaseConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            manifest: PathBuf::from(DEFAULT_MANIFEST),
            root: PathBuf::from("."),
        }
    }
}

impl Config {
    /// Load configuration from all sources, with an optional repository
    /// config path.
    ///
    /// When `config_path` is `None`, `release.toml` in the working directory
    /// is used if it exists.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading, parsing or validation fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let repo_file = config_path.unwrap_or_else(|| PathBuf::from(REPO_CONFIG_FILE_NAME));

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(Self::default_config_path()))
            .merge(Toml::file(&repo_file))
            .merge(Env::prefixed("FWRELEASE_").split("__"));

        let mut config: Config = figment.extract()?;
        config.validate()?;
        config.normalize();
        Ok(config)
    }

    /// Get the per-user configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(CONFIG_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        let url = self.release.base_url.trim();
        if url.is_empty() {
            return Err(Error::ConfigValidation {
                message: "base_url must not be empty".to_string(),
            });
        }
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(Error::ConfigValidation {
                message: format!("base_url must be an http(s) URL: {url}"),
            });
        }
        if self.release.manifest.as_os_str().is_empty() {
            return Err(Error::ConfigValidation {
                message: "manifest path must not be empty".to_string(),
            });
        }
        Ok(())
    }

    fn normalize(&mut self) {
        let trimmed = self.release.base_url.trim().trim_end_matches('/');
        self.release.base_url = trimmed.to_string();
    }

    /// Base URL without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.release.base_url.trim_end_matches('/')
    }

    /// Firmware root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.release.root
    }

    /// Manifest path, resolved against the firmware root.
    #[must_use]
    pub fn manifest_path(&self) -> PathBuf {
        if self.release.manifest.is_absolute() {
            self.release.manifest.clone()
        } else {
            self.release.root.join(&self.release.manifest)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.release.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.release.manifest, PathBuf::from("releases.xml"));
        assert_eq!(config.release.root, PathBuf::from("."));
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_empty_base_url() {
        let mut config = Config::default();
        config.release.base_url = "  ".to_string();

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("base_url"));
    }

    #[test]
    fn test_validate_non_http_base_url() {
        let mut config = Config::default();
        config.release.base_url = "ftp://example.com/fw".to_string();

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("http(s)"));
    }

    #[test]
    fn test_validate_empty_manifest() {
        let mut config = Config::default();
        config.release.manifest = PathBuf::new();

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let mut config = Config::default();
        config.release.base_url = "https://example.com/fw/".to_string();

        assert_eq!(config.base_url(), "https://example.com/fw");
    }

    #[test]
    fn test_manifest_path_relative_to_root() {
        let mut config = Config::default();
        config.release.root = PathBuf::from("/srv/firmware");

        assert_eq!(
            config.manifest_path(),
            PathBuf::from("/srv/firmware/releases.xml")
        );
    }

    #[test]
    fn test_manifest_path_absolute() {
        let mut config = Config::default();
        config.release.root = PathBuf::from("/srv/firmware");
        config.release.manifest = PathBuf::from("/etc/releases.xml");

        assert_eq!(config.manifest_path(), PathBuf::from("/etc/releases.xml"));
    }

    #[test]
    fn test_default_config_path() {
        let path = Config::default_config_path();
        assert!(path.to_string_lossy().contains("fwrelease"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }

    #[test]
    fn test_load_from_toml_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let file = dir.path().join("release.toml");
        std::fs::write(
            &file,
            "[release]\nbase_url = \"https://mirror.example.com/fw/\"\nroot = \"/data\"\n",
        )
        .unwrap();

        let config = Config::load_from(Some(file)).unwrap();
        assert_eq!(config.release.base_url, "https://mirror.example.com/fw");
        assert_eq!(config.release.root, PathBuf::from("/data"));
        assert_eq!(config.release.manifest, PathBuf::from("releases.xml"));
    }

    #[test]
    fn test_load_from_invalid_toml_value() {
        let dir = tempfile::TempDir::new().unwrap();
        let file = dir.path().join("release.toml");
        std::fs::write(&file, "[release]\nbase_url = \"file:///tmp\"\n").unwrap();

        let result = Config::load_from(Some(file));
        assert!(matches!(result, Err(Error::ConfigValidation { .. })));
    }

    #[test]
    fn test_config_serialize() {
        let json = serde_json::to_string(&Config::default()).unwrap();
        assert!(json.contains("base_url"));
        assert!(json.contains("releases.xml"));
    }
}
