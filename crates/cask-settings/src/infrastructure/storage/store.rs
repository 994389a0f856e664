//! Load-once cache around the settings document.

use std::path::{Path, PathBuf};

use super::document::{DocumentCodec, DocumentError};
use crate::domain::document::SettingsDocument;

/// Owns the in-memory settings document for the lifetime of one settings
/// service.
///
/// The document is read from disk at most once; afterwards every operation
/// works against the cached copy and [`SettingsStore::persist`] rewrites
/// the file wholesale. The store is constructed with its service and
/// dropped with it; there is no process-global document.
pub struct SettingsStore<C> {
    codec: C,
    path: PathBuf,
    document: Option<SettingsDocument>,
}

impl<C: DocumentCodec> SettingsStore<C> {
    pub fn new(codec: C, path: PathBuf) -> Self {
        Self {
            codec,
            path,
            document: None,
        }
    }

    /// The backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the cached document, loading it on first access.
    pub fn document(&mut self) -> Result<&SettingsDocument, DocumentError> {
        self.load_if_needed().map(|document| &*document)
    }

    /// Mutable variant of [`SettingsStore::document`].
    pub fn document_mut(&mut self) -> Result<&mut SettingsDocument, DocumentError> {
        self.load_if_needed()
    }

    /// Serializes the cached document back to the configured path.
    ///
    /// Callers persist only after mutating, so the document is always
    /// loaded by the time this runs; an unloaded store has nothing to
    /// write and returns `Ok`.
    pub fn persist(&self) -> Result<(), DocumentError> {
        match &self.document {
            Some(document) => self.codec.save(document, &self.path),
            None => Ok(()),
        }
    }

    fn load_if_needed(&mut self) -> Result<&mut SettingsDocument, DocumentError> {
        if self.document.is_none() {
            self.document = Some(self.codec.load(&self.path)?);
        }
        // Filled in just above; the fallback never runs.
        Ok(self.document.get_or_insert_with(SettingsDocument::default))
    }
}
