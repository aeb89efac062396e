//! Entry plaintext model and the envelope codec policy.
//!
//! An entry is a credential record: title, username, password, plus
//! optional URL, notes, and category. The codec is deliberately lenient
//! about missing fields — an entry must never become unreadable (or
//! unsaveable) because the title was left blank. Legacy entries created
//! before title validation existed still decrypt and display.

use coffre_crypto_core::{aead, CryptoError, EncryptedEnvelope, Salt, SecretKey};
use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::Zeroizing;

/// Substituted for an absent or empty title on both encrypt and decrypt.
pub const DEFAULT_TITLE: &str = "Untitled Entry";

// ---------------------------------------------------------------------------
// Plaintext model
// ---------------------------------------------------------------------------

/// A decrypted vault entry.
///
/// Serialized to JSON in declared field order as the canonical byte
/// encoding before sealing. Empty optional fields are omitted from the
/// payload and restored as defaults on decrypt, so
/// `decrypt(encrypt(x)) == normalize(x)`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryPlaintext {
    /// Display name. Never empty after normalization.
    #[serde(default)]
    pub title: String,
    /// Account username or email.
    #[serde(default)]
    pub username: String,
    /// The stored secret.
    #[serde(default)]
    pub password: String,
    /// Website address, if any.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub url: String,
    /// Free-form notes.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub notes: String,
    /// Category display name.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub category: String,
    /// Server-side category ID.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<i64>,
}

impl EntryPlaintext {
    /// Minimal constructor for the required fields.
    #[must_use]
    pub fn new(title: &str, username: &str, password: &str) -> Self {
        Self {
            title: title.to_owned(),
            username: username.to_owned(),
            password: password.to_owned(),
            url: String::new(),
            notes: String::new(),
            category: String::new(),
            category_id: None,
        }
    }

    /// Apply the missing-field policy: an empty title becomes
    /// [`DEFAULT_TITLE`]. Username and password already default to the
    /// empty string through serde.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        if self.title.is_empty() {
            self.title = DEFAULT_TITLE.to_owned();
        }
        self
    }
}

impl fmt::Debug for EntryPlaintext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Password and notes are masked; the rest is display metadata.
        f.debug_struct("EntryPlaintext")
            .field("title", &self.title)
            .field("username", &self.username)
            .field("password", &"***")
            .field("url", &self.url)
            .field("category", &self.category)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Codec
// ---------------------------------------------------------------------------

/// Serialize and seal an entry under `key`, recording `salt` in the
/// envelope.
///
/// Missing-field policy: empty title is replaced by [`DEFAULT_TITLE`]
/// before sealing; absent username/password serialize as empty strings.
/// Encryption never fails on field content alone.
///
/// # Errors
///
/// Returns [`CryptoError::Encryption`] if serialization or the AES-GCM
/// seal fails.
pub fn encrypt_entry(
    key: &SecretKey,
    entry: &EntryPlaintext,
    salt: &Salt,
) -> Result<EncryptedEnvelope, CryptoError> {
    let normalized = entry.clone().normalized();
    let payload = Zeroizing::new(
        serde_json::to_vec(&normalized)
            .map_err(|e| CryptoError::Encryption(format!("entry serialization failed: {e}")))?,
    );
    aead::seal(key, &payload, salt)
}

/// Open an envelope and parse the entry payload.
///
/// # Errors
///
/// - [`CryptoError::AuthenticationFailed`] on tag mismatch (wrong key or
///   corrupted data)
/// - [`CryptoError::MalformedPayload`] when the plaintext is not valid
///   JSON, not a JSON object, or has fields of the wrong type
pub fn decrypt_entry(
    key: &SecretKey,
    envelope: &EncryptedEnvelope,
) -> Result<EntryPlaintext, CryptoError> {
    let payload = aead::open(key, envelope)?;

    let value: serde_json::Value = serde_json::from_slice(payload.expose())
        .map_err(|e| CryptoError::MalformedPayload(format!("payload is not valid JSON: {e}")))?;
    if !value.is_object() {
        return Err(CryptoError::MalformedPayload(
            "payload is not a JSON object".into(),
        ));
    }

    let entry: EntryPlaintext = serde_json::from_value(value)
        .map_err(|e| CryptoError::MalformedPayload(format!("unexpected payload shape: {e}")))?;

    // Legacy entries may predate title validation; keep them viewable.
    Ok(entry.normalized())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
