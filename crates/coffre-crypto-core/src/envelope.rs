//! Portable encrypted-entry envelope and its JSON wire format.
//!
//! An envelope is self-describing: it carries the salt its key was derived
//! under, so entries encrypted before a password rotation remain readable
//! alongside entries encrypted after it. The server stores the wire form as
//! an opaque string; only this client ever interprets it.

use crate::error::CryptoError;
use crate::kdf::Salt;
use data_encoding::BASE64;
use serde::{Deserialize, Serialize};
use std::fmt;

/// AES-256-GCM IV length in bytes (96 bits).
pub const IV_LEN: usize = 12;

// ---------------------------------------------------------------------------
// Fingerprint
// ---------------------------------------------------------------------------

/// Stable identifier for an envelope, derived from its ciphertext bytes.
///
/// Used as the decrypted-entry cache key: editing an entry changes its
/// ciphertext and therefore its fingerprint, so a stale cache slot can
/// never be served for updated content.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    /// Hex form, for logging and diagnostics.
    #[must_use]
    pub fn to_hex(&self) -> String {
        data_encoding::HEXLOWER.encode(&self.0)
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // First 8 hex chars are plenty for log correlation.
        let hex = self.to_hex();
        write!(f, "Fingerprint({})", hex.get(..8).unwrap_or(&hex))
    }
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// An encrypted entry as exchanged with the server.
///
/// `ciphertext` carries the 16-byte GCM tag appended, matching what the
/// server has stored since the first client release.
#[derive(Clone, Debug)]
pub struct EncryptedEnvelope {
    /// Random 96-bit IV, unique per encryption call.
    pub iv: [u8; IV_LEN],
    /// AES-256-GCM ciphertext with the authentication tag appended.
    pub ciphertext: Vec<u8>,
    /// The salt the encryption key was derived under.
    pub salt: Salt,
}

/// Boundary representation: `{"iv": base64, "ciphertext": base64, "salt": base64}`.
#[derive(Serialize, Deserialize)]
struct WireEnvelope {
    iv: String,
    ciphertext: String,
    salt: String,
}

impl EncryptedEnvelope {
    /// Serialize to the JSON wire format the server stores.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::Encryption`] if JSON serialization fails
    /// (not expected for string fields; kept as a typed error rather than
    /// a panic path).
    pub fn to_wire(&self) -> Result<String, CryptoError> {
        let wire = WireEnvelope {
            iv: BASE64.encode(&self.iv),
            ciphertext: BASE64.encode(&self.ciphertext),
            salt: self.salt.to_base64(),
        };
        serde_json::to_string(&wire)
            .map_err(|e| CryptoError::Encryption(format!("envelope serialization failed: {e}")))
    }

    /// Parse an envelope from its JSON wire format.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidEncoding`] when the text is not valid
    /// JSON, a field is not valid base64, or the IV does not decode to
    /// exactly 12 bytes.
    pub fn from_wire(text: &str) -> Result<Self, CryptoError> {
        let wire: WireEnvelope = serde_json::from_str(text)
            .map_err(|e| CryptoError::InvalidEncoding(format!("invalid envelope JSON: {e}")))?;

        let iv_bytes = BASE64
            .decode(wire.iv.as_bytes())
            .map_err(|e| CryptoError::InvalidEncoding(format!("iv is not valid base64: {e}")))?;
        let iv: [u8; IV_LEN] = iv_bytes.as_slice().try_into().map_err(|_| {
            CryptoError::InvalidEncoding(format!(
                "iv must be {IV_LEN} bytes, got {}",
                iv_bytes.len()
            ))
        })?;

        let ciphertext = BASE64.decode(wire.ciphertext.as_bytes()).map_err(|e| {
            CryptoError::InvalidEncoding(format!("ciphertext is not valid base64: {e}"))
        })?;

        let salt = Salt::from_base64(&wire.salt)
            .map_err(|e| CryptoError::InvalidEncoding(format!("bad envelope salt: {e}")))?;

        Ok(Self {
            iv,
            ciphertext,
            salt,
        })
    }

    /// BLAKE3 fingerprint of the ciphertext bytes.
    #[must_use]
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint(blake3::hash(&self.ciphertext).into())
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
