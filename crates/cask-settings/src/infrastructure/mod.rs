//! Infrastructure layer: file-system persistence and secret encryption.
//!
//! Contains the adapters between the settings core and the outside world:
//! the TOML document codec with its platform path resolution, the
//! load-once document store, and the AES-GCM secret cipher.

pub mod secrets;
pub mod storage;
