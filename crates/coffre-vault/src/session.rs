//! Lock/unlock state machine and the vault service facade.
//!
//! One [`Vault`] exists per process, constructed by the application's
//! composition root and passed by reference to collaborators (the source
//! of truth for "is the vault open", replacing any notion of a global
//! singleton).
//!
//! Locking is a display-level restriction, not a memory wipe: per-salt
//! derived keys and the last unlock credentials are retained across lock
//! cycles so that re-unlocking with the same salt is instant and so that
//! racing callers can be recovered with one automatic re-unlock attempt.
//! Callers wanting the stricter model call
//! [`Vault::forget_master_password`].

use std::collections::HashMap;

use coffre_crypto_core::{kdf, CryptoError, EncryptedEnvelope, Fingerprint, Salt, SecretKey};
use tracing::{debug, warn};
use zeroize::Zeroizing;

use crate::entries::{self, EntryPlaintext};
use crate::error::VaultError;
use crate::store::SaltProvider;

/// Whether cryptographic operations are currently permitted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VaultStatus {
    /// No active key; encrypt/decrypt require re-unlock.
    Locked,
    /// An active key is installed and operations are permitted.
    Unlocked,
}

/// Credentials retained for automatic re-unlock and legacy-salt
/// re-derivation. Holding the plaintext password in memory is a
/// deliberate convenience/security tradeoff inherited from the product's
/// unlock flow; see [`Vault::forget_master_password`].
struct UnlockParams {
    password: Zeroizing<String>,
    salt: Salt,
}

/// The vault: unlock state, per-salt key cache, and decrypted-entry cache.
pub struct Vault {
    status: VaultStatus,
    active_salt: Option<Salt>,
    key_cache: HashMap<Salt, SecretKey>,
    entry_cache: HashMap<Fingerprint, EntryPlaintext>,
    last_unlock: Option<UnlockParams>,
    derivations: u64,
}

impl Default for Vault {
    fn default() -> Self {
        Self::new()
    }
}

impl Vault {
    /// Create a locked vault with empty caches.
    #[must_use]
    pub fn new() -> Self {
        Self {
            status: VaultStatus::Locked,
            active_salt: None,
            key_cache: HashMap::new(),
            entry_cache: HashMap::new(),
            last_unlock: None,
            derivations: 0,
        }
    }

    // -----------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------

    /// Unlock with a master password and the server's base64 salt.
    ///
    /// If a key for this salt is already cached (a previous unlock this
    /// process), derivation is skipped and the cached key becomes active.
    /// A skipped derivation means the password was never checked, so the
    /// cache-hit path leaves the retained credentials untouched; only a
    /// successful derivation records them. On any failure the vault
    /// stays `Locked`.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Crypto`] for an empty password, a malformed
    /// salt, or a derivation failure.
    pub fn unlock(&mut self, master_password: &str, salt_base64: &str) -> Result<(), VaultError> {
        let salt = Salt::from_base64(salt_base64).inspect_err(|e| {
            warn!("unlock rejected: {e}");
        })?;
        self.unlock_with_salt(master_password, salt)
    }

    /// Unlock by fetching the salt from the server-side collaborator.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Store`] when the salt cannot be fetched, or
    /// any error [`unlock`](Self::unlock) can produce.
    pub fn unlock_with_provider<P: SaltProvider>(
        &mut self,
        provider: &P,
        master_password: &str,
    ) -> Result<(), VaultError> {
        let salt = provider.vault_salt()?;
        self.unlock(master_password, &salt)
    }

    fn unlock_with_salt(&mut self, master_password: &str, salt: Salt) -> Result<(), VaultError> {
        if self.key_cache.contains_key(&salt) {
            debug!("unlock: key served from per-salt cache");
        } else {
            let key = kdf::derive(master_password, &salt).inspect_err(|e| {
                warn!("unlock rejected: {e}");
            })?;
            self.derivations = self.derivations.saturating_add(1);
            self.key_cache.insert(salt.clone(), key);
            debug!("unlock: derived new vault key");
            // Only a password that actually produced a key is retained.
            // An unverified cache-hit password must not displace it.
            self.last_unlock = Some(UnlockParams {
                password: Zeroizing::new(master_password.to_owned()),
                salt: salt.clone(),
            });
        }

        self.active_salt = Some(salt);
        self.status = VaultStatus::Unlocked;
        Ok(())
    }

    /// Lock the vault: drop the active key selection and the decrypted
    /// cache. Cached per-salt keys and retained credentials survive.
    pub fn lock(&mut self) {
        self.status = VaultStatus::Locked;
        self.active_salt = None;
        self.entry_cache.clear();
        debug!("vault locked");
    }

    /// Whether cryptographic operations are currently permitted.
    #[must_use]
    pub fn is_unlocked(&self) -> bool {
        self.status == VaultStatus::Unlocked
            && self
                .active_salt
                .as_ref()
                .is_some_and(|s| self.key_cache.contains_key(s))
    }

    /// Drop the retained master password.
    ///
    /// Disables automatic re-unlock and legacy-salt re-derivation: a
    /// subsequent lock can only be undone by prompting the user again,
    /// and envelopes from unknown salts fail with
    /// [`VaultError::SaltMismatch`]. The stricter model for callers that
    /// reject silent retry; cached keys stay usable until they drop.
    pub fn forget_master_password(&mut self) {
        self.last_unlock = None;
        debug!("retained master password dropped");
    }

    /// Check a master password against the active key.
    ///
    /// Runs the full derivation under the active salt and compares the
    /// result to the cached key in constant time. Used to gate
    /// destructive flows (password rotation) on proof of the current
    /// password rather than on mere unlock state.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Locked`] when no key is active, and
    /// [`CryptoError::AuthenticationFailed`] (wrapped) when the password
    /// does not match.
    pub fn verify_master_password(&mut self, master_password: &str) -> Result<(), VaultError> {
        let salt = self.active_salt.clone().ok_or(VaultError::Locked)?;
        let candidate = kdf::derive(master_password, &salt)?;
        self.derivations = self.derivations.saturating_add(1);
        let cached = self.key_cache.get(&salt).ok_or(VaultError::Locked)?;
        if candidate.ct_eq(cached) {
            Ok(())
        } else {
            warn!("master password verification failed");
            Err(VaultError::Crypto(CryptoError::AuthenticationFailed))
        }
    }

    // -----------------------------------------------------------------
    // Entry operations
    // -----------------------------------------------------------------

    /// Encrypt an entry under the active key.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Locked`] if the vault is locked and the
    /// one-shot automatic re-unlock fails; [`VaultError::Crypto`] for
    /// codec failures.
    pub fn encrypt_entry(
        &mut self,
        entry: &EntryPlaintext,
    ) -> Result<EncryptedEnvelope, VaultError> {
        self.ensure_unlocked()?;
        let salt = self.active_salt.clone().ok_or(VaultError::Locked)?;
        let key = self.key_cache.get(&salt).ok_or(VaultError::Locked)?;
        Ok(entries::encrypt_entry(key, entry, &salt)?)
    }

    /// Decrypt an envelope, consulting the read-through cache first.
    ///
    /// A cache hit (same ciphertext fingerprint) is served without any
    /// state check — including while locked. On a miss the vault must be
    /// unlocked (with the same one-shot auto-re-unlock as encryption),
    /// and an envelope sealed under a different salt than the active one
    /// is decrypted with the cached or re-derived key for *its* salt.
    ///
    /// # Errors
    ///
    /// - [`VaultError::Locked`] when locked and auto-re-unlock fails
    /// - [`VaultError::SaltMismatch`] when the envelope's salt has no
    ///   cached key and no password is retained to derive one
    /// - [`VaultError::Crypto`] for authentication or payload failures
    pub fn decrypt_entry(
        &mut self,
        envelope: &EncryptedEnvelope,
    ) -> Result<EntryPlaintext, VaultError> {
        let fingerprint = envelope.fingerprint();
        if let Some(hit) = self.entry_cache.get(&fingerprint) {
            return Ok(hit.clone());
        }

        self.ensure_unlocked()?;
        let entry = {
            let key = self.key_for_salt(&envelope.salt)?;
            entries::decrypt_entry(key, envelope)?
        };
        self.entry_cache.insert(fingerprint, entry.clone());
        Ok(entry)
    }

    /// Drop every cached decrypted entry. The per-salt key cache is
    /// unaffected.
    pub fn clear_entry_cache(&mut self) {
        self.entry_cache.clear();
    }

    // -----------------------------------------------------------------
    // Introspection
    // -----------------------------------------------------------------

    /// Current lock status.
    #[must_use]
    pub const fn status(&self) -> VaultStatus {
        self.status
    }

    /// The salt of the active key, when unlocked.
    #[must_use]
    pub const fn active_salt(&self) -> Option<&Salt> {
        self.active_salt.as_ref()
    }

    /// How many PBKDF2 derivations this vault has performed. Cache hits
    /// do not increment it — the observable guarantee that re-unlocking
    /// with a known salt reuses the key byte-for-byte.
    #[must_use]
    pub const fn derivation_count(&self) -> u64 {
        self.derivations
    }

    // -----------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------

    /// Require `Unlocked`, attempting one automatic re-unlock from the
    /// retained credentials. Best-effort recovery for callers racing a
    /// lock transition — not a security boundary.
    fn ensure_unlocked(&mut self) -> Result<(), VaultError> {
        if self.is_unlocked() {
            return Ok(());
        }
        let Some(params) = self.last_unlock.as_ref() else {
            return Err(VaultError::Locked);
        };
        let password = params.password.clone();
        let salt = params.salt.clone();
        warn!("operation on locked vault; attempting automatic re-unlock");
        self.unlock_with_salt(&password, salt)
            .map_err(|_| VaultError::Locked)
    }

    /// Fetch the key for `salt`, deriving and caching it from the
    /// retained password when the envelope predates the active salt.
    fn key_for_salt(&mut self, salt: &Salt) -> Result<&SecretKey, VaultError> {
        if !self.key_cache.contains_key(salt) {
            let password = self
                .last_unlock
                .as_ref()
                .map(|p| p.password.clone())
                .ok_or(VaultError::SaltMismatch)?;
            debug!("envelope salt differs from active salt; deriving key for it");
            let key = kdf::derive(&password, salt)?;
            self.derivations = self.derivations.saturating_add(1);
            self.key_cache.insert(salt.clone(), key);
        }
        self.key_cache.get(salt).ok_or(VaultError::SaltMismatch)
    }
}

impl std::fmt::Debug for Vault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vault")
            .field("status", &self.status)
            .field("cached_keys", &self.key_cache.len())
            .field("cached_entries", &self.entry_cache.len())
            .field("derivations", &self.derivations)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
