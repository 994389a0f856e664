//! Storage infrastructure: settings document persistence.
//!
//! Two pieces:
//!
//! - **`document`** – reads and writes the TOML settings document at the
//!   platform-appropriate location, and defines the [`DocumentCodec`] seam
//!   the rest of the crate depends on.
//! - **`store`** – the load-once cache that owns the in-memory document for
//!   the lifetime of one settings service.
//!
//! The service sees persistence only through the [`DocumentCodec`] trait,
//! so the file format could change without touching any other part of the
//! crate.

pub mod document;
pub mod store;

pub use document::{settings_file_path, DocumentCodec, DocumentError, TomlDocumentCodec};
pub use store::SettingsStore;
