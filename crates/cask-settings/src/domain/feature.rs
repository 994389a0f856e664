//! Feature flags and their tri-state lifecycle.
//!
//! A feature's effective value is a plain boolean, but the document also
//! records *where that value came from*: the built-in default, or an
//! explicit user action. The pair is modeled as [`FeatureState`] so only
//! the meaningful combinations exist in memory; on disk it remains the
//! `enabled` / `set_explicitly` field pair.
//!
//! # The explicit flag (for beginners)
//!
//! `cask feature enable allow-prerelease` on a feature that is *already*
//! enabled by default is not a no-op: it records that the user chose the
//! value. From then on the flag is pinned, and a future Cask release that
//! ships a different default leaves it alone. Only a feature that is both
//! at its target value *and* explicitly set skips the write.

use serde::{Deserialize, Serialize};

/// The four reachable states of a feature flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureState {
    /// Enabled because the built-in default says so.
    DefaultEnabled,
    /// Disabled because the built-in default says so.
    DefaultDisabled,
    /// Enabled by a user action.
    ExplicitEnabled,
    /// Disabled by a user action.
    ExplicitDisabled,
}

/// Outcome of applying an enable/disable action to a [`FeatureState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureToggle {
    /// Already explicitly at the target value; nothing to write.
    Unchanged,
    /// The effective value already matched, but only by default. The write
    /// still fires: it records the explicit choice.
    Overrode(FeatureState),
    /// The effective value flipped.
    Switched(FeatureState),
}

impl FeatureState {
    /// Reconstructs a state from the persisted flag pair.
    pub fn from_flags(enabled: bool, set_explicitly: bool) -> Self {
        match (enabled, set_explicitly) {
            (true, false) => FeatureState::DefaultEnabled,
            (false, false) => FeatureState::DefaultDisabled,
            (true, true) => FeatureState::ExplicitEnabled,
            (false, true) => FeatureState::ExplicitDisabled,
        }
    }

    /// The effective boolean value.
    pub fn is_enabled(self) -> bool {
        matches!(
            self,
            FeatureState::DefaultEnabled | FeatureState::ExplicitEnabled
        )
    }

    /// Whether the value was chosen by a user action.
    pub fn is_explicit(self) -> bool {
        matches!(
            self,
            FeatureState::ExplicitEnabled | FeatureState::ExplicitDisabled
        )
    }

    /// Applies an enable (`target == true`) or disable action.
    ///
    /// The only way into an explicit state is through this call; there is
    /// no transition back to a default state and no terminal state, so a
    /// feature stays re-toggleable forever.
    pub fn toggle(self, target: bool) -> FeatureToggle {
        let next = if target {
            FeatureState::ExplicitEnabled
        } else {
            FeatureState::ExplicitDisabled
        };
        match (self.is_enabled() == target, self.is_explicit()) {
            (true, true) => FeatureToggle::Unchanged,
            (true, false) => FeatureToggle::Overrode(next),
            (false, _) => FeatureToggle::Switched(next),
        }
    }
}

/// A named feature flag in the settings document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawFeatureEntry", into = "RawFeatureEntry")]
pub struct FeatureEntry {
    /// Unique name of the feature (case-insensitive key).
    pub name: String,
    pub state: FeatureState,
}

/// On-disk form of a feature entry: the flag pair, not the enum.
#[derive(Serialize, Deserialize)]
struct RawFeatureEntry {
    name: String,
    enabled: bool,
    #[serde(default)]
    set_explicitly: bool,
}

impl From<RawFeatureEntry> for FeatureEntry {
    fn from(raw: RawFeatureEntry) -> Self {
        Self {
            name: raw.name,
            state: FeatureState::from_flags(raw.enabled, raw.set_explicitly),
        }
    }
}

impl From<FeatureEntry> for RawFeatureEntry {
    fn from(entry: FeatureEntry) -> Self {
        Self {
            name: entry.name,
            enabled: entry.state.is_enabled(),
            set_explicitly: entry.state.is_explicit(),
        }
    }
}

/// The built-in feature catalog written into a fresh document.
///
/// The settings service only ever mutates these entries; it never adds or
/// removes feature entries at runtime.
pub fn default_catalog() -> Vec<FeatureEntry> {
    [
        ("verify-checksums", FeatureState::DefaultEnabled),
        ("auto-prune-cache", FeatureState::DefaultEnabled),
        ("allow-prerelease", FeatureState::DefaultDisabled),
        ("usage-telemetry", FeatureState::DefaultDisabled),
    ]
    .into_iter()
    .map(|(name, state)| FeatureEntry {
        name: name.to_string(),
        state,
    })
    .collect()
}
