//! Cryptographic error types for `coffre-crypto-core`.

use thiserror::Error;

/// Errors produced by cryptographic operations.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Key derivation failed (empty password, malformed or wrong-length salt).
    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    /// Symmetric encryption failure (AES-256-GCM seal or key setup).
    #[error("encryption error: {0}")]
    Encryption(String),

    /// Envelope bytes are not validly encoded (bad JSON, bad base64, wrong IV length).
    #[error("invalid envelope encoding: {0}")]
    InvalidEncoding(String),

    /// Authentication tag verification failed — wrong password or corrupted data.
    ///
    /// This is the expected failure mode for stale keys and tampered
    /// ciphertext. It must never be conflated with a format error.
    #[error("decryption failed: wrong password or corrupted data")]
    AuthenticationFailed,

    /// Decryption succeeded but the plaintext is not a valid entry payload
    /// (not JSON, or not a JSON object).
    #[error("malformed entry payload: {0}")]
    MalformedPayload(String),

    /// Secure memory failure (CSPRNG, allocation).
    #[error("secure memory error: {0}")]
    SecureMemory(String),
}
