//! TOML persistence for the settings document.
//!
//! Reads and writes [`SettingsDocument`] at the platform-appropriate
//! location:
//!
//! - Windows:  `%APPDATA%\Cask\settings.toml`
//! - Linux:    `$XDG_CONFIG_HOME/cask/settings.toml` or `~/.config/cask/settings.toml`
//! - macOS:    `~/Library/Application Support/Cask/settings.toml`
//!
//! A missing file is not an error: it loads as
//! [`SettingsDocument::default`], which carries the built-in feature
//! catalog, so first-run behavior needs no special casing upstream. Every
//! save rewrites the whole document.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::domain::document::SettingsDocument;

/// Error type for settings document persistence.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing settings at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse settings document: {0}")]
    Parse(#[from] toml::de::Error),

    /// The document could not be serialized to TOML.
    #[error("failed to serialize settings document: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Reads and writes the settings document at a given path.
///
/// The settings service only sees this trait; tests substitute a mock to
/// observe exactly when persistence happens.
#[cfg_attr(test, mockall::automock)]
pub trait DocumentCodec {
    /// Loads the document at `path`, or the default document if the file
    /// does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::Io`] for file-system errors other than
    /// "not found", and [`DocumentError::Parse`] if the TOML is malformed.
    fn load(&self, path: &Path) -> Result<SettingsDocument, DocumentError>;

    /// Serializes the whole document to `path`, overwriting it.
    ///
    /// Creates the parent directory if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::Io`] for file-system failures or
    /// [`DocumentError::Serialize`] if serialization fails.
    fn save(&self, document: &SettingsDocument, path: &Path) -> Result<(), DocumentError>;
}

/// Production codec: TOML via `serde`.
#[derive(Debug, Default, Clone)]
pub struct TomlDocumentCodec;

impl DocumentCodec for TomlDocumentCodec {
    fn load(&self, path: &Path) -> Result<SettingsDocument, DocumentError> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let document: SettingsDocument = toml::from_str(&content)?;
                Ok(document)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(SettingsDocument::default()),
            Err(e) => Err(DocumentError::Io {
                path: path.to_path_buf(),
                source: e,
            }),
        }
    }

    fn save(&self, document: &SettingsDocument, path: &Path) -> Result<(), DocumentError> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).map_err(|source| DocumentError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
        }

        let content = toml::to_string_pretty(document)?;
        std::fs::write(path, content).map_err(|source| DocumentError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Resolves the full path to the settings file,
/// `<platform config dir>/settings.toml`.
///
/// # Errors
///
/// Returns [`DocumentError::NoPlatformConfigDir`] when the platform config
/// base directory cannot be determined from the environment.
pub fn settings_file_path() -> Result<PathBuf, DocumentError> {
    let dir = platform_config_dir().ok_or(DocumentError::NoPlatformConfigDir)?;
    Ok(dir.join("settings.toml"))
}

/// Resolves the Cask config directory for the current platform.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        // %APPDATA% e.g. C:\Users\<user>\AppData\Roaming
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("Cask"))
    }

    #[cfg(target_os = "linux")]
    {
        // XDG_CONFIG_HOME or ~/.config
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("cask"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("Cask")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}
