//! Collaborator seams for the server-side salt and entry storage.
//!
//! The vault core performs no network I/O of its own. The application's
//! API client implements these traits; tests use in-memory fakes.

use crate::error::VaultError;
use serde::{Deserialize, Serialize};

/// Server-assigned entry identifier.
pub type EntryId = i64;

/// An entry as persisted server-side: an ID plus the opaque envelope
/// wire string (`{"iv":…,"ciphertext":…,"salt":…}`).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoredEntry {
    /// Server-assigned ID.
    pub id: EntryId,
    /// Envelope wire JSON. Opaque to the server.
    pub encrypted_data: String,
}

/// Supplies the key-derivation salt the server holds for this user.
pub trait SaltProvider {
    /// Fetch the current vault salt (base64).
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Store`] when the salt cannot be retrieved.
    fn vault_salt(&self) -> Result<String, VaultError>;

    /// Register a (new) master password with the server and receive the
    /// freshly issued salt (base64). Called during initial setup and on
    /// password rotation.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Store`] when the server rejects the change.
    fn setup_vault(&mut self, master_password: &str) -> Result<String, VaultError>;
}

/// Persists encrypted envelopes. The plaintext never crosses this seam.
pub trait EntryStore {
    /// List every stored entry.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Store`] when the listing fails.
    fn list_entries(&self) -> Result<Vec<StoredEntry>, VaultError>;

    /// Create a new entry from its envelope wire string.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Store`] when the entry cannot be created.
    fn create_entry(&mut self, encrypted_data: &str) -> Result<EntryId, VaultError>;

    /// Replace the envelope of an existing entry.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Store`] when the entry cannot be updated.
    fn update_entry(&mut self, id: EntryId, encrypted_data: &str) -> Result<(), VaultError>;
}
