//! `coffre-vault` — Vault unlock-state machine and entry codec for COFFRE.
//!
//! Sits between the API client (which moves opaque envelopes to and from
//! the server) and the GUI (which renders decrypted entries). Owns the
//! lock/unlock lifecycle, the per-salt key cache, the decrypted-entry
//! cache, and the password-rotation protocol. Plaintext secrets never
//! leave this crate except as values returned to the caller.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::arithmetic_side_effects))]

pub mod error;

pub mod entries;
pub mod rotation;
pub mod session;
pub mod store;

pub use entries::{decrypt_entry, encrypt_entry, EntryPlaintext, DEFAULT_TITLE};
pub use error::VaultError;
pub use rotation::{rotate_password, RotationFailure, RotationReport, RotationStage};
pub use session::{Vault, VaultStatus};
pub use store::{EntryId, EntryStore, SaltProvider, StoredEntry};
