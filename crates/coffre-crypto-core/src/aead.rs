//! AES-256-GCM sealing and opening of entry payloads.
//!
//! No associated data is used — the server stores envelopes as opaque
//! strings with no authenticated context, and that shape is fixed by the
//! existing ciphertext in the field.

use crate::error::CryptoError;
use crate::kdf::Salt;
use crate::memory::{SecretBuffer, SecretKey};
use crate::envelope::{EncryptedEnvelope, IV_LEN};
use rand::rngs::OsRng;
use rand::RngCore;
use ring::aead;
use zeroize::Zeroize;

/// AES-256-GCM authentication tag length in bytes (128 bits).
pub const TAG_LEN: usize = 16;

fn gcm_key(key: &SecretKey) -> Result<aead::LessSafeKey, CryptoError> {
    let unbound = aead::UnboundKey::new(&aead::AES_256_GCM, key.expose())
        .map_err(|_| CryptoError::Encryption("failed to create AES-256-GCM key".into()))?;
    Ok(aead::LessSafeKey::new(unbound))
}

/// Encrypt `plaintext` under `key` with a fresh random 96-bit IV.
///
/// The returned envelope records `salt` — the salt `key` was derived
/// under — so the right key can be re-derived at decryption time even
/// after a password rotation.
///
/// # Errors
///
/// Returns [`CryptoError::Encryption`] if key setup or the seal itself
/// fails.
pub fn seal(
    key: &SecretKey,
    plaintext: &[u8],
    salt: &Salt,
) -> Result<EncryptedEnvelope, CryptoError> {
    let sealing_key = gcm_key(key)?;

    let mut iv = [0u8; IV_LEN];
    OsRng.fill_bytes(&mut iv);
    let nonce = aead::Nonce::assume_unique_for_key(iv);

    // Encrypt in place; the tag is appended to the buffer.
    let mut in_out = plaintext.to_vec();
    if sealing_key
        .seal_in_place_append_tag(nonce, aead::Aad::empty(), &mut in_out)
        .is_err()
    {
        in_out.zeroize();
        return Err(CryptoError::Encryption("AES-256-GCM seal failed".into()));
    }

    Ok(EncryptedEnvelope {
        iv,
        ciphertext: in_out,
        salt: salt.clone(),
    })
}

/// Decrypt and authenticate an envelope.
///
/// # Errors
///
/// - [`CryptoError::InvalidEncoding`] if the ciphertext is shorter than a
///   GCM tag (structurally impossible to have been produced by [`seal`])
/// - [`CryptoError::AuthenticationFailed`] if the tag check fails — wrong
///   key or corrupted data
pub fn open(key: &SecretKey, envelope: &EncryptedEnvelope) -> Result<SecretBuffer, CryptoError> {
    if envelope.ciphertext.len() < TAG_LEN {
        return Err(CryptoError::InvalidEncoding(format!(
            "ciphertext too short: {} bytes (tag alone is {TAG_LEN})",
            envelope.ciphertext.len()
        )));
    }

    let opening_key = gcm_key(key)?;
    let nonce = aead::Nonce::assume_unique_for_key(envelope.iv);

    let mut in_out = envelope.ciphertext.clone();
    let plaintext = opening_key
        .open_in_place(nonce, aead::Aad::empty(), &mut in_out)
        .map_err(|_| CryptoError::AuthenticationFailed)?;

    let buffer = SecretBuffer::new(plaintext);
    in_out.zeroize();
    Ok(buffer)
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
