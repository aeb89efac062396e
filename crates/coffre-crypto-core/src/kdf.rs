//! PBKDF2-HMAC-SHA256 key derivation from the master password.
//!
//! The iteration count and hash are a compatibility contract with every
//! envelope the server already stores: changing either invalidates all
//! existing ciphertext unless entries are migrated first.

use crate::error::CryptoError;
use crate::memory::{SecretKey, KEY_LEN};
use data_encoding::BASE64;
use std::fmt;
use zeroize::Zeroize;

/// PBKDF2 iteration count. Part of the wire-compatibility contract.
pub const PBKDF2_ITERATIONS: u32 = 100_000;

/// Salt length in bytes (128 bits), fixed by the server.
pub const SALT_LEN: usize = 16;

// ---------------------------------------------------------------------------
// Salt
// ---------------------------------------------------------------------------

/// A server-issued key-derivation salt.
///
/// One salt corresponds to exactly one key under a given master password;
/// the server issues a fresh salt on every password rotation. Canonical
/// boundary representation is base64 text. Not secret — it travels in
/// every envelope.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Salt([u8; SALT_LEN]);

impl Salt {
    /// Build a salt from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::KeyDerivation`] unless `bytes` is exactly
    /// 16 bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let arr: [u8; SALT_LEN] = bytes.try_into().map_err(|_| {
            CryptoError::KeyDerivation(format!(
                "salt must be {SALT_LEN} bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self(arr))
    }

    /// Decode a salt from its canonical base64 form.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::KeyDerivation`] when `text` is empty, not
    /// valid base64, or does not decode to 16 bytes.
    pub fn from_base64(text: &str) -> Result<Self, CryptoError> {
        if text.is_empty() {
            return Err(CryptoError::KeyDerivation("salt is empty".into()));
        }
        let bytes = BASE64
            .decode(text.as_bytes())
            .map_err(|e| CryptoError::KeyDerivation(format!("salt is not valid base64: {e}")))?;
        Self::from_bytes(&bytes)
    }

    /// The raw salt bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; SALT_LEN] {
        &self.0
    }

    /// Canonical base64 form, as exchanged with the server.
    #[must_use]
    pub fn to_base64(&self) -> String {
        BASE64.encode(&self.0)
    }
}

impl fmt::Debug for Salt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Salt").field(&self.to_base64()).finish()
    }
}

// ---------------------------------------------------------------------------
// Derivation
// ---------------------------------------------------------------------------

/// Derive the 256-bit vault key from a master password and salt.
///
/// Deterministic: the same `(password, salt)` pair always yields the same
/// key, which is what lets previously-encrypted entries be decrypted
/// later. CPU-bound and synchronous; no I/O.
///
/// # Errors
///
/// Returns [`CryptoError::KeyDerivation`] when the password is empty.
pub fn derive(master_password: &str, salt: &Salt) -> Result<SecretKey, CryptoError> {
    if master_password.is_empty() {
        return Err(CryptoError::KeyDerivation(
            "master password is empty".into(),
        ));
    }

    let mut output = [0u8; KEY_LEN];
    pbkdf2::pbkdf2_hmac::<sha2::Sha256>(
        master_password.as_bytes(),
        salt.as_bytes(),
        PBKDF2_ITERATIONS,
        &mut output,
    );

    let key = SecretKey::from_bytes(output);
    output.zeroize();
    Ok(key)
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
