//! Request and result types exchanged with the surrounding CLI.
//!
//! Plain data carriers: the argument parser builds the requests, the
//! service returns the projections. Nothing here touches disk or crypto.

/// Parameters for registering a new package source.
#[derive(Debug, Clone)]
pub struct AddSourceRequest {
    /// Unique name for the source.
    pub name: String,
    /// Feed URL or local path.
    pub value: String,
    pub username: Option<String>,
    /// Plaintext; the service encrypts it before it reaches the document.
    pub password: Option<String>,
}

/// Parameters for storing or replacing an API key.
#[derive(Debug, Clone)]
pub struct SetApiKeyRequest {
    /// Feed URL the key authenticates against.
    pub source: String,
    /// Plaintext; the service encrypts it before it reaches the document.
    pub key: String,
}

/// Read-only projection of a source for listing output. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceView {
    pub id: String,
    pub value: String,
    pub disabled: bool,
    /// `true` when no password is stored for this source. Reports the
    /// *absence* of a credential, not that one was verified.
    pub authenticated: bool,
}

/// A decrypted API key handed to the caller's per-entry callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevealedApiKey {
    /// The source exactly as stored in the document.
    pub source: String,
    /// The decrypted key.
    pub key: String,
}
