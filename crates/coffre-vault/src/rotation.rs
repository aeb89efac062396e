//! Master-password rotation: re-encrypt every entry under a fresh salt.
//!
//! Rotation is deliberately non-transactional. One corrupted or legacy
//! entry must never hold the rest of the vault hostage, so failures are
//! collected per entry and the caller receives a report instead of an
//! all-or-nothing error. Entries already persisted under the new key are
//! not rolled back when a later one fails.

use tracing::{debug, warn};

use coffre_crypto_core::EncryptedEnvelope;

use crate::entries::EntryPlaintext;
use crate::error::VaultError;
use crate::session::Vault;
use crate::store::{EntryId, EntryStore, SaltProvider};

/// Where in the rotation pipeline an entry failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RotationStage {
    /// The stored envelope could not be parsed or decrypted.
    Decrypt,
    /// Re-encryption under the new key failed.
    Reencrypt,
    /// The store rejected the updated envelope.
    Persist,
}

/// A single entry that could not be rotated.
#[derive(Debug)]
pub struct RotationFailure {
    /// The affected entry.
    pub id: EntryId,
    /// The pipeline stage that failed.
    pub stage: RotationStage,
    /// Human-readable failure description.
    pub reason: String,
}

/// Outcome of a rotation run: which entries now live under the new key,
/// and which were left behind (still readable via the old salt's key,
/// thanks to self-describing envelopes).
#[derive(Debug, Default)]
pub struct RotationReport {
    /// Entries re-encrypted and persisted under the new key.
    pub rotated: Vec<EntryId>,
    /// Entries skipped, with the stage and reason.
    pub failed: Vec<RotationFailure>,
}

impl RotationReport {
    /// Whether every entry was rotated.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Rotate the master password.
///
/// Protocol:
/// 1. Verify `current_password` against the active key — fatal on
///    mismatch, before anything is touched.
/// 2. Decrypt every stored entry under the current vault state
///    (per-entry failures collected, never aborting the batch).
/// 3. Register the new password with the server, which issues salt S2.
/// 4. Lock, then unlock with `(new_password, S2)` — fatal on failure,
///    since nothing has been persisted yet.
/// 5. Re-encrypt each successfully-decrypted entry under the new key and
///    persist it; per-entry failures collected, already-persisted
///    entries stand.
///
/// # Errors
///
/// Returns an error only for whole-batch failures: a wrong current
/// password, the listing call, the server password change, or the
/// re-unlock with the new credentials.
pub fn rotate_password<P, S>(
    vault: &mut Vault,
    provider: &mut P,
    store: &mut S,
    current_password: &str,
    new_password: &str,
) -> Result<RotationReport, VaultError>
where
    P: SaltProvider,
    S: EntryStore,
{
    vault.verify_master_password(current_password)?;

    let stored = store.list_entries()?;
    debug!(entries = stored.len(), "starting password rotation");

    let mut report = RotationReport::default();
    let mut decrypted: Vec<(EntryId, EntryPlaintext)> = Vec::with_capacity(stored.len());
    for entry in &stored {
        let result = EncryptedEnvelope::from_wire(&entry.encrypted_data)
            .map_err(VaultError::from)
            .and_then(|envelope| vault.decrypt_entry(&envelope));
        match result {
            Ok(plaintext) => decrypted.push((entry.id, plaintext)),
            Err(e) => {
                warn!(id = entry.id, "entry skipped during rotation: {e}");
                report.failed.push(RotationFailure {
                    id: entry.id,
                    stage: RotationStage::Decrypt,
                    reason: e.to_string(),
                });
            }
        }
    }

    // The server accepts the password change and issues the new salt.
    let new_salt = provider.setup_vault(new_password)?;

    // Swap the active key. The old salt's key stays cached, so any entry
    // that failed above remains readable after rotation.
    vault.lock();
    vault.unlock(new_password, &new_salt)?;

    for (id, plaintext) in &decrypted {
        let envelope = match vault.encrypt_entry(plaintext) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(id, "re-encryption failed: {e}");
                report.failed.push(RotationFailure {
                    id: *id,
                    stage: RotationStage::Reencrypt,
                    reason: e.to_string(),
                });
                continue;
            }
        };
        let wire = match envelope.to_wire() {
            Ok(wire) => wire,
            Err(e) => {
                report.failed.push(RotationFailure {
                    id: *id,
                    stage: RotationStage::Reencrypt,
                    reason: e.to_string(),
                });
                continue;
            }
        };
        match store.update_entry(*id, &wire) {
            Ok(()) => report.rotated.push(*id),
            Err(e) => {
                warn!(id, "persisting rotated entry failed: {e}");
                report.failed.push(RotationFailure {
                    id: *id,
                    stage: RotationStage::Persist,
                    reason: e.to_string(),
                });
            }
        }
    }

    debug!(
        rotated = report.rotated.len(),
        failed = report.failed.len(),
        "password rotation finished"
    );
    Ok(report)
}
