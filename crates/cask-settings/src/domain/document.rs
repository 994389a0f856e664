//! The settings document and its three collections.
//!
//! One document holds everything Cask persists between invocations: the
//! configured package sources, the feature-flag catalog, and per-source API
//! keys. The document is mutated in place and rewritten to disk wholesale on
//! every change; there is no partial persistence.
//!
//! # Key comparison rules
//!
//! Source ids and feature names are machine identifiers and compare ASCII
//! case-insensitively: `MyFeed` and `myfeed` address the same entry. API key
//! sources additionally ignore trailing `/` characters *on lookup only*, so
//! `https://feed.example.com/` and `https://feed.example.com` name the same
//! feed. Writing an API key matches the stored source without trimming;
//! that asymmetry is part of the service contract and is kept here.

use serde::{Deserialize, Serialize};

use super::feature::{default_catalog, FeatureEntry};

/// Returns `true` when two configuration keys refer to the same entry.
pub fn keys_equal(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

/// Strips trailing `/` characters from an API key source before lookup.
pub fn normalize_source_key(key: &str) -> &str {
    key.trim_end_matches('/')
}

/// A package source: a named repository endpoint with optional credentials.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceEntry {
    /// Unique name of the source (case-insensitive key).
    pub id: String,
    /// Feed URL or local path.
    pub value: String,
    /// Disabled sources stay in the document but are skipped by consumers.
    #[serde(default)]
    pub disabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Encrypted at rest; never plaintext on disk.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

/// An API key paired with the source it authenticates against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiKeyEntry {
    /// Feed URL this key belongs to.
    pub source: String,
    /// Encrypted at rest; never plaintext on disk.
    pub key: String,
}

/// Top-level settings document persisted to `settings.toml`.
///
/// All three collections are ordered and serde-default so a hand-edited
/// document with a collection removed still parses (as empty).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingsDocument {
    #[serde(default)]
    pub sources: Vec<SourceEntry>,
    #[serde(default)]
    pub features: Vec<FeatureEntry>,
    #[serde(default)]
    pub api_keys: Vec<ApiKeyEntry>,
}

impl Default for SettingsDocument {
    /// A fresh document: no sources, no API keys, the built-in feature
    /// catalog at its default values.
    fn default() -> Self {
        Self {
            sources: Vec::new(),
            features: default_catalog(),
            api_keys: Vec::new(),
        }
    }
}

impl SettingsDocument {
    /// Finds a source by id, case-insensitively.
    pub fn find_source(&self, id: &str) -> Option<&SourceEntry> {
        self.sources.iter().find(|s| keys_equal(&s.id, id))
    }

    /// Mutable variant of [`SettingsDocument::find_source`].
    pub fn find_source_mut(&mut self, id: &str) -> Option<&mut SourceEntry> {
        self.sources.iter_mut().find(|s| keys_equal(&s.id, id))
    }

    /// Removes and returns the source with the given id, if present.
    ///
    /// Document order of the remaining sources is preserved.
    pub fn take_source(&mut self, id: &str) -> Option<SourceEntry> {
        let index = self.sources.iter().position(|s| keys_equal(&s.id, id))?;
        Some(self.sources.remove(index))
    }

    /// Finds a feature flag by name, case-insensitively.
    pub fn find_feature_mut(&mut self, name: &str) -> Option<&mut FeatureEntry> {
        self.features.iter_mut().find(|f| keys_equal(&f.name, name))
    }

    /// Finds an API key whose source matches after trailing-`/`
    /// normalization of both sides.
    pub fn find_api_key_normalized(&self, source: &str) -> Option<&ApiKeyEntry> {
        let wanted = normalize_source_key(source);
        self.api_keys
            .iter()
            .find(|k| keys_equal(normalize_source_key(&k.source), wanted))
    }

    /// Finds an API key whose stored source matches `source` apart from
    /// letter case. No trailing-separator trimming here; writes match the
    /// source string as given.
    pub fn find_api_key_exact_mut(&mut self, source: &str) -> Option<&mut ApiKeyEntry> {
        self.api_keys.iter_mut().find(|k| keys_equal(&k.source, source))
    }
}
