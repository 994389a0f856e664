//! The settings service: every read and mutation of the persisted settings
//! document goes through here.
//!
//! # Operation shape
//!
//! Each operation runs the same sequence: lazily load the document (at most
//! once per service instance), look up the affected entry, mutate it in
//! memory only when the request actually changes something, persist the
//! whole document, then report the outcome. A persistence failure
//! propagates before any success is reported.
//!
//! User-level no-ops (adding a duplicate source, disabling a source that
//! is already disabled, writing an API key identical to the stored one)
//! are not errors. They are reported at warn level and leave the document
//! untouched, so repeating a command is always safe.

use std::path::PathBuf;

use thiserror::Error;
use tracing::{info, warn};

use crate::domain::document::{ApiKeyEntry, SourceEntry};
use crate::domain::feature::FeatureToggle;
use crate::infrastructure::secrets::{CryptoError, SecretCipher};
use crate::infrastructure::storage::{
    settings_file_path, DocumentCodec, DocumentError, SettingsStore, TomlDocumentCodec,
};

use super::requests::{AddSourceRequest, RevealedApiKey, SetApiKeyRequest, SourceView};

/// Shared warning for every no-op mutation path.
const NO_CHANGE: &str = "nothing to change; settings already match";

/// Error type for settings service operations.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings persistence failed: {0}")]
    Store(#[from] DocumentError),

    #[error("secret handling failed: {0}")]
    Secret(#[from] CryptoError),
}

/// The settings core: sources, feature flags, and API keys over one
/// lazily-loaded document.
///
/// One instance handles one operation at a time to completion; the
/// document materializes on the first operation and is cached for the
/// instance's lifetime. Single-writer access to the backing file is
/// assumed.
pub struct SettingsService<C: DocumentCodec, S: SecretCipher> {
    store: SettingsStore<C>,
    cipher: S,
}

impl<S: SecretCipher> SettingsService<TomlDocumentCodec, S> {
    /// Opens the service over the platform-default settings file.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Store`] when the platform config directory
    /// cannot be determined.
    pub fn open_default(cipher: S) -> Result<Self, SettingsError> {
        let path = settings_file_path()?;
        Ok(Self::new(TomlDocumentCodec, cipher, path))
    }
}

impl<C: DocumentCodec, S: SecretCipher> SettingsService<C, S> {
    /// Creates a service over the document at `path`.
    pub fn new(codec: C, cipher: S, path: PathBuf) -> Self {
        Self {
            store: SettingsStore::new(codec, path),
            cipher,
        }
    }

    /// Announces that a change would have been made, without making one.
    ///
    /// Backs the CLI's dry-run mode.
    pub fn noop(&self) {
        info!("would have made a change to the configuration");
    }

    // ── Source operations ─────────────────────────────────────────────────────

    /// Lists all configured sources in document order.
    ///
    /// With `verbose` set, each source is additionally reported at info
    /// level for human consumption. The projected list is returned either
    /// way; [`SourceView::authenticated`] is `true` when no password is
    /// stored.
    pub fn list_sources(&mut self, verbose: bool) -> Result<Vec<SourceView>, SettingsError> {
        let document = self.store.document()?;
        let mut views = Vec::with_capacity(document.sources.len());
        for source in &document.sources {
            if verbose {
                info!(
                    "{}{} - {}",
                    source.id,
                    if source.disabled { " [disabled]" } else { "" },
                    source.value
                );
            }
            views.push(SourceView {
                id: source.id.clone(),
                value: source.value.clone(),
                disabled: source.disabled,
                authenticated: source
                    .password
                    .as_deref()
                    .map_or(true, |p| p.trim().is_empty()),
            });
        }
        Ok(views)
    }

    /// Registers a new source.
    ///
    /// Adding a name that already exists (case-insensitively) is a guarded
    /// no-op: the existing entry is never overwritten, and the caller is
    /// told to remove it first.
    pub fn add_source(&mut self, request: &AddSourceRequest) -> Result<(), SettingsError> {
        if self.store.document()?.find_source(&request.name).is_some() {
            warn!(
                "no changes made; remove source {} before re-adding it",
                request.name
            );
            return Ok(());
        }

        // Blank passwords are stored as absent, so the projected
        // `authenticated` flag stays true for credential-less sources.
        let password = match request.password.as_deref() {
            Some(plain) if !plain.trim().is_empty() => Some(self.cipher.encrypt(plain)?),
            _ => None,
        };

        let document = self.store.document_mut()?;
        document.sources.push(SourceEntry {
            id: request.name.clone(),
            value: request.value.clone(),
            disabled: false,
            username: request.username.clone(),
            password,
        });

        self.store.persist()?;
        info!("added source {} -> {}", request.name, request.value);
        Ok(())
    }

    /// Removes a source by name. Removing a name that is not configured is
    /// a no-op, not an error.
    pub fn remove_source(&mut self, name: &str) -> Result<(), SettingsError> {
        let document = self.store.document_mut()?;
        match document.take_source(name) {
            Some(removed) => {
                self.store.persist()?;
                info!("removed source {}", removed.id);
            }
            None => warn!("{NO_CHANGE}"),
        }
        Ok(())
    }

    /// Marks a source disabled. Idempotent.
    pub fn disable_source(&mut self, name: &str) -> Result<(), SettingsError> {
        self.set_source_disabled(name, true)
    }

    /// Clears a source's disabled mark. Idempotent.
    pub fn enable_source(&mut self, name: &str) -> Result<(), SettingsError> {
        self.set_source_disabled(name, false)
    }

    /// Flips a source's disabled flag only when it differs from `disabled`;
    /// already-in-state and not-found both report "nothing to change".
    fn set_source_disabled(&mut self, name: &str, disabled: bool) -> Result<(), SettingsError> {
        let document = self.store.document_mut()?;
        match document.find_source_mut(name) {
            Some(source) if source.disabled != disabled => {
                source.disabled = disabled;
                let id = source.id.clone();
                self.store.persist()?;
                info!(
                    "{} source {}",
                    if disabled { "disabled" } else { "enabled" },
                    id
                );
            }
            _ => warn!("{NO_CHANGE}"),
        }
        Ok(())
    }

    // ── Feature operations ────────────────────────────────────────────────────

    /// Reports every feature flag with its effective state, in document
    /// order. Exists purely for human consumption.
    pub fn list_features(&mut self) -> Result<(), SettingsError> {
        let document = self.store.document()?;
        for feature in &document.features {
            info!(
                "{} - {}",
                feature.name,
                if feature.state.is_enabled() {
                    "[enabled]"
                } else {
                    "[disabled]"
                }
            );
        }
        Ok(())
    }

    /// Enables a feature flag, recording the choice as explicit.
    pub fn enable_feature(&mut self, name: &str) -> Result<(), SettingsError> {
        self.toggle_feature(name, true)
    }

    /// Disables a feature flag, recording the choice as explicit.
    pub fn disable_feature(&mut self, name: &str) -> Result<(), SettingsError> {
        self.toggle_feature(name, false)
    }

    /// Drives one feature through the tri-state machine.
    ///
    /// The first explicit toggle persists even when the effective value
    /// does not change: it flips the explicit flag. Only a feature already
    /// explicitly at the target value skips the write.
    fn toggle_feature(&mut self, name: &str, target: bool) -> Result<(), SettingsError> {
        let action = if target { "enabled" } else { "disabled" };
        let document = self.store.document_mut()?;
        let Some(feature) = document.find_feature_mut(name) else {
            warn!("{NO_CHANGE}");
            return Ok(());
        };

        match feature.state.toggle(target) {
            FeatureToggle::Unchanged => {
                warn!("{NO_CHANGE}");
                Ok(())
            }
            FeatureToggle::Overrode(next) => {
                warn!(
                    "{} was {} by default; recording an explicit value",
                    feature.name, action
                );
                feature.state = next;
                let feature_name = feature.name.clone();
                self.store.persist()?;
                info!("{} feature {}", action, feature_name);
                Ok(())
            }
            FeatureToggle::Switched(next) => {
                feature.state = next;
                let feature_name = feature.name.clone();
                self.store.persist()?;
                info!("{} feature {}", action, feature_name);
                Ok(())
            }
        }
    }

    // ── API key operations ────────────────────────────────────────────────────

    /// Looks up API keys and hands each decrypted match to `on_key`.
    ///
    /// With a non-empty `source` filter, the single matching entry
    /// (trailing `/` ignored on both sides) is decrypted, passed to the
    /// callback, and returned. With no filter, every stored key is
    /// decrypted and passed to the callback in document order while the
    /// direct return value stays `None`; the callback fires per entry so
    /// callers can stream output before the full set is known.
    pub fn get_api_key<F>(
        &mut self,
        source: Option<&str>,
        mut on_key: F,
    ) -> Result<Option<String>, SettingsError>
    where
        F: FnMut(RevealedApiKey),
    {
        let filter = source.map(str::trim).filter(|s| !s.is_empty());
        let document = self.store.document()?;

        match filter {
            Some(wanted) => {
                let Some(entry) = document.find_api_key_normalized(wanted) else {
                    return Ok(None);
                };
                let key = self.cipher.decrypt(&entry.key)?;
                on_key(RevealedApiKey {
                    source: entry.source.clone(),
                    key: key.clone(),
                });
                Ok(Some(key))
            }
            None => {
                for entry in &document.api_keys {
                    let key = self.cipher.decrypt(&entry.key)?;
                    on_key(RevealedApiKey {
                        source: entry.source.clone(),
                        key,
                    });
                }
                Ok(None)
            }
        }
    }

    /// Stores or replaces the API key for a source.
    ///
    /// The stored key is decrypted and compared first; writing the same key
    /// twice is a no-op. Lookup here matches the stored source without
    /// trailing-`/` normalization, unlike [`SettingsService::get_api_key`].
    pub fn set_api_key(&mut self, request: &SetApiKeyRequest) -> Result<(), SettingsError> {
        let document = self.store.document_mut()?;
        match document.find_api_key_exact_mut(&request.source) {
            None => {
                let encrypted = self.cipher.encrypt(&request.key)?;
                document.api_keys.push(ApiKeyEntry {
                    source: request.source.clone(),
                    key: encrypted,
                });
                self.store.persist()?;
                info!("added API key for {}", request.source);
            }
            Some(entry) => {
                if self.cipher.decrypt(&entry.key)? == request.key {
                    warn!("{NO_CHANGE}");
                } else {
                    entry.key = self.cipher.encrypt(&request.key)?;
                    self.store.persist()?;
                    info!("updated API key for {}", request.source);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::domain::document::SettingsDocument;
    use crate::domain::feature::{FeatureEntry, FeatureState};
    use crate::infrastructure::secrets::PlaintextCipher;
    use crate::infrastructure::storage::document::MockDocumentCodec;

    fn doc_path() -> PathBuf {
        PathBuf::from("/tmp/cask-tests/settings.toml")
    }

    /// A codec whose single load yields `document` and which must be saved
    /// exactly `saves` times.
    fn codec_with(document: SettingsDocument, saves: usize) -> MockDocumentCodec {
        let mut codec = MockDocumentCodec::new();
        codec
            .expect_load()
            .times(1)
            .return_once(move |_| Ok(document));
        codec.expect_save().times(saves).returning(|_, _| Ok(()));
        codec
    }

    fn service_over(
        document: SettingsDocument,
        saves: usize,
    ) -> SettingsService<MockDocumentCodec, PlaintextCipher> {
        SettingsService::new(codec_with(document, saves), PlaintextCipher, doc_path())
    }

    fn doc_with_source(id: &str, disabled: bool) -> SettingsDocument {
        let mut document = SettingsDocument::default();
        document.sources.push(SourceEntry {
            id: id.to_string(),
            value: "https://feed.example.com/".to_string(),
            disabled,
            username: None,
            password: None,
        });
        document
    }

    fn doc_with_feature(name: &str, state: FeatureState) -> SettingsDocument {
        SettingsDocument {
            sources: Vec::new(),
            features: vec![FeatureEntry {
                name: name.to_string(),
                state,
            }],
            api_keys: Vec::new(),
        }
    }

    fn doc_with_api_key(source: &str, key: &str) -> SettingsDocument {
        let mut document = SettingsDocument::default();
        document.api_keys.push(ApiKeyEntry {
            source: source.to_string(),
            key: key.to_string(),
        });
        document
    }

    fn add_request(name: &str, password: Option<&str>) -> AddSourceRequest {
        AddSourceRequest {
            name: name.to_string(),
            value: "https://feed.example.com/".to_string(),
            username: None,
            password: password.map(str::to_string),
        }
    }

    // ── Source operations ─────────────────────────────────────────────────────

    #[test]
    fn test_add_source_appends_and_persists() {
        let mut codec = MockDocumentCodec::new();
        codec
            .expect_load()
            .times(1)
            .returning(|_| Ok(SettingsDocument::default()));
        codec
            .expect_save()
            .times(1)
            .withf(|document, _| {
                document.sources.len() == 1
                    && document.sources[0].id == "myfeed"
                    && !document.sources[0].disabled
                    && document.sources[0].password.is_none()
            })
            .returning(|_, _| Ok(()));
        let mut service = SettingsService::new(codec, PlaintextCipher, doc_path());

        service
            .add_source(&add_request("myfeed", None))
            .expect("add");
    }

    #[test]
    fn test_add_source_with_duplicate_name_is_a_no_op() {
        // Case differs; the entry still counts as present.
        let mut service = service_over(doc_with_source("MyFeed", false), 0);

        service
            .add_source(&add_request("myfeed", None))
            .expect("duplicate add must not error");
    }

    #[test]
    fn test_add_source_stores_blank_password_as_absent() {
        let mut codec = MockDocumentCodec::new();
        codec
            .expect_load()
            .times(1)
            .returning(|_| Ok(SettingsDocument::default()));
        codec
            .expect_save()
            .times(1)
            .withf(|document, _| document.sources[0].password.is_none())
            .returning(|_, _| Ok(()));
        let mut service = SettingsService::new(codec, PlaintextCipher, doc_path());

        service
            .add_source(&add_request("myfeed", Some("   ")))
            .expect("add");
    }

    #[test]
    fn test_remove_source_persists_once_and_missing_is_a_no_op() {
        let mut service = service_over(doc_with_source("myfeed", false), 1);

        service.remove_source("MYFEED").expect("remove");
        service.remove_source("myfeed").expect("second remove");
    }

    #[test]
    fn test_disable_source_twice_persists_only_once() {
        let mut service = service_over(doc_with_source("myfeed", false), 1);

        service.disable_source("myfeed").expect("first disable");
        service.disable_source("myfeed").expect("second disable");
    }

    #[test]
    fn test_enable_source_on_enabled_source_writes_nothing() {
        let mut service = service_over(doc_with_source("myfeed", false), 0);

        service.enable_source("myfeed").expect("enable");
    }

    #[test]
    fn test_enable_source_on_disabled_source_persists() {
        let mut codec = MockDocumentCodec::new();
        codec
            .expect_load()
            .times(1)
            .returning(|_| Ok(doc_with_source("myfeed", true)));
        codec
            .expect_save()
            .times(1)
            .withf(|document, _| !document.sources[0].disabled)
            .returning(|_, _| Ok(()));
        let mut service = SettingsService::new(codec, PlaintextCipher, doc_path());

        service.enable_source("myfeed").expect("enable");
    }

    #[test]
    fn test_disable_unknown_source_is_a_no_op() {
        let mut service = service_over(SettingsDocument::default(), 0);

        service.disable_source("ghost").expect("disable");
    }

    #[test]
    fn test_list_sources_projects_authenticated_from_password_absence() {
        let mut document = doc_with_source("open", false);
        document.sources.push(SourceEntry {
            id: "locked".to_string(),
            value: "https://private.example.com/".to_string(),
            disabled: true,
            username: Some("svc".to_string()),
            password: Some("secret".to_string()),
        });
        let mut service = service_over(document, 0);

        let views = service.list_sources(false).expect("list");

        assert_eq!(views.len(), 2);
        assert!(views[0].authenticated);
        assert!(!views[1].authenticated);
        assert!(views[1].disabled);
    }

    #[test]
    fn test_list_sources_loads_the_document_only_once() {
        let mut service = service_over(doc_with_source("myfeed", false), 0);

        service.list_sources(true).expect("first list");
        service.list_sources(false).expect("second list");
    }

    // ── Feature operations ────────────────────────────────────────────────────

    #[test]
    fn test_enable_feature_disabled_by_default_persists_explicit_enable() {
        let mut codec = MockDocumentCodec::new();
        codec
            .expect_load()
            .times(1)
            .returning(|_| Ok(doc_with_feature("allow-prerelease", FeatureState::DefaultDisabled)));
        codec
            .expect_save()
            .times(1)
            .withf(|document, _| document.features[0].state == FeatureState::ExplicitEnabled)
            .returning(|_, _| Ok(()));
        let mut service = SettingsService::new(codec, PlaintextCipher, doc_path());

        service.enable_feature("allow-prerelease").expect("enable");
    }

    #[test]
    fn test_enable_feature_enabled_by_default_still_persists() {
        // The effective value is unchanged; the explicit flag still flips.
        let mut codec = MockDocumentCodec::new();
        codec
            .expect_load()
            .times(1)
            .returning(|_| Ok(doc_with_feature("verify-checksums", FeatureState::DefaultEnabled)));
        codec
            .expect_save()
            .times(1)
            .withf(|document, _| document.features[0].state == FeatureState::ExplicitEnabled)
            .returning(|_, _| Ok(()));
        let mut service = SettingsService::new(codec, PlaintextCipher, doc_path());

        service.enable_feature("verify-checksums").expect("enable");
    }

    #[test]
    fn test_enable_feature_already_explicitly_enabled_is_a_pure_no_op() {
        let mut service = service_over(
            doc_with_feature("verify-checksums", FeatureState::ExplicitEnabled),
            0,
        );

        service.enable_feature("VERIFY-CHECKSUMS").expect("enable");
    }

    #[test]
    fn test_disable_feature_disabled_by_default_records_the_override() {
        let mut codec = MockDocumentCodec::new();
        codec
            .expect_load()
            .times(1)
            .returning(|_| Ok(doc_with_feature("usage-telemetry", FeatureState::DefaultDisabled)));
        codec
            .expect_save()
            .times(1)
            .withf(|document, _| document.features[0].state == FeatureState::ExplicitDisabled)
            .returning(|_, _| Ok(()));
        let mut service = SettingsService::new(codec, PlaintextCipher, doc_path());

        service.disable_feature("usage-telemetry").expect("disable");
    }

    #[test]
    fn test_toggle_unknown_feature_is_a_no_op() {
        // The catalog is fixed; toggling never creates entries.
        let mut service = service_over(SettingsDocument::default(), 0);

        service.enable_feature("no-such-feature").expect("enable");
        service.disable_feature("no-such-feature").expect("disable");
    }

    // ── API key operations ────────────────────────────────────────────────────

    #[test]
    fn test_get_api_key_matches_regardless_of_trailing_slash() {
        let mut service = service_over(doc_with_api_key("https://push.example.com/", "k-123"), 0);

        let mut seen = Vec::new();
        let direct = service
            .get_api_key(Some("https://push.example.com"), |hit| seen.push(hit))
            .expect("get");

        assert_eq!(direct.as_deref(), Some("k-123"));
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].source, "https://push.example.com/");
        assert_eq!(seen[0].key, "k-123");
    }

    #[test]
    fn test_get_api_key_without_filter_streams_all_and_returns_none() {
        let mut document = doc_with_api_key("https://a.example.com", "key-a");
        document.api_keys.push(ApiKeyEntry {
            source: "https://b.example.com".to_string(),
            key: "key-b".to_string(),
        });
        let mut service = service_over(document, 0);

        let mut seen = Vec::new();
        let direct = service
            .get_api_key(None, |hit| seen.push(hit.key))
            .expect("get");

        assert_eq!(direct, None);
        assert_eq!(seen, vec!["key-a", "key-b"]);
    }

    #[test]
    fn test_get_api_key_blank_filter_behaves_like_no_filter() {
        let mut service = service_over(doc_with_api_key("https://a.example.com", "key-a"), 0);

        let mut calls = 0;
        let direct = service
            .get_api_key(Some("   "), |_| calls += 1)
            .expect("get");

        assert_eq!(direct, None);
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_get_api_key_with_unmatched_filter_returns_none_without_callback() {
        let mut service = service_over(doc_with_api_key("https://a.example.com", "key-a"), 0);

        let mut calls = 0;
        let direct = service
            .get_api_key(Some("https://other.example.com"), |_| calls += 1)
            .expect("get");

        assert_eq!(direct, None);
        assert_eq!(calls, 0);
    }

    #[test]
    fn test_set_api_key_adds_then_treats_identical_rewrite_as_no_op() {
        let mut service = service_over(SettingsDocument::default(), 1);
        let request = SetApiKeyRequest {
            source: "https://push.example.com".to_string(),
            key: "k-123".to_string(),
        };

        service.set_api_key(&request).expect("first set");
        // Identical value: decrypt-and-compare suppresses the second write.
        service.set_api_key(&request).expect("second set");
    }

    #[test]
    fn test_set_api_key_overwrites_when_the_value_differs() {
        let mut codec = MockDocumentCodec::new();
        codec
            .expect_load()
            .times(1)
            .returning(|_| Ok(doc_with_api_key("https://push.example.com", "old")));
        codec
            .expect_save()
            .times(1)
            .withf(|document, _| document.api_keys[0].key == "new")
            .returning(|_, _| Ok(()));
        let mut service = SettingsService::new(codec, PlaintextCipher, doc_path());

        service
            .set_api_key(&SetApiKeyRequest {
                source: "https://push.example.com".to_string(),
                key: "new".to_string(),
            })
            .expect("set");
    }

    #[test]
    fn test_set_api_key_does_not_normalize_trailing_slash() {
        // The slash variant is a distinct key for writes; both entries end
        // up stored.
        let mut codec = MockDocumentCodec::new();
        codec
            .expect_load()
            .times(1)
            .returning(|_| Ok(doc_with_api_key("https://push.example.com/", "k-123")));
        codec
            .expect_save()
            .times(1)
            .withf(|document, _| document.api_keys.len() == 2)
            .returning(|_, _| Ok(()));
        let mut service = SettingsService::new(codec, PlaintextCipher, doc_path());

        service
            .set_api_key(&SetApiKeyRequest {
                source: "https://push.example.com".to_string(),
                key: "k-123".to_string(),
            })
            .expect("set");
    }

    // ── Failure propagation ───────────────────────────────────────────────────

    #[test]
    fn test_persist_failure_surfaces_before_success_is_reported() {
        let mut codec = MockDocumentCodec::new();
        codec
            .expect_load()
            .times(1)
            .returning(|_| Ok(SettingsDocument::default()));
        codec.expect_save().times(1).returning(|_, path| {
            Err(DocumentError::Io {
                path: path.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
            })
        });
        let mut service = SettingsService::new(codec, PlaintextCipher, doc_path());

        let result = service.add_source(&add_request("myfeed", None));

        assert!(matches!(result, Err(SettingsError::Store(_))));
    }

    #[test]
    fn test_load_failure_propagates_from_any_operation() {
        let mut codec = MockDocumentCodec::new();
        codec.expect_load().returning(|path| {
            Err(DocumentError::Io {
                path: path.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
            })
        });
        let mut service = SettingsService::new(codec, PlaintextCipher, doc_path());

        assert!(service.list_sources(false).is_err());
        assert!(service.list_features().is_err());
    }
}
