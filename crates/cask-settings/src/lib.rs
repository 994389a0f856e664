//! # cask-settings
//!
//! Persisted-settings core for the Cask package manager: package *sources*,
//! *feature flags*, and *API keys*, all stored in one TOML document.
//!
//! Everything that reads, mutates, or persists that document goes through
//! [`SettingsService`]. The service loads the document lazily (at most once
//! per instance), applies idempotent mutations, rewrites the whole file on
//! every change, and runs credential fields through a [`SecretCipher`]
//! before they ever reach disk.
//!
//! # Module tree
//!
//! - **`domain`** – the document model: source entries, the tri-state
//!   feature-flag machine, API key entries. Pure logic, no I/O.
//!
//! - **`application`** – the [`SettingsService`] operations plus the
//!   request/result types exchanged with the surrounding CLI.
//!
//! - **`infrastructure`** – TOML persistence at the platform config
//!   location and AES-256-GCM encryption of secret fields.

pub mod application;
pub mod domain;
pub mod infrastructure;

// Re-export the most-used types at the crate root so callers can write
// `cask_settings::SettingsService` instead of spelling out the module path.
pub use application::requests::{AddSourceRequest, RevealedApiKey, SetApiKeyRequest, SourceView};
pub use application::settings_service::{SettingsError, SettingsService};
pub use domain::document::{ApiKeyEntry, SettingsDocument, SourceEntry};
pub use domain::feature::{FeatureEntry, FeatureState, FeatureToggle};
pub use infrastructure::secrets::{AesGcmCipher, CryptoError, PlaintextCipher, SecretCipher};
pub use infrastructure::storage::{
    settings_file_path, DocumentCodec, DocumentError, SettingsStore, TomlDocumentCodec,
};
