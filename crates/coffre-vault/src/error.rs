//! Vault error types for `coffre-vault`.

use coffre_crypto_core::CryptoError;
use thiserror::Error;

/// Errors produced by vault operations.
#[derive(Debug, Error)]
pub enum VaultError {
    /// Cryptographic operation failed (delegated from crypto-core).
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// Operation requires an unlocked vault and automatic re-unlock was
    /// not possible (no retained credentials, or they no longer work).
    #[error("vault is locked")]
    Locked,

    /// An envelope references a salt for which no key exists and no
    /// password is retained to derive one.
    #[error("no key available for the salt this entry was encrypted under")]
    SaltMismatch,

    /// The entry store or salt provider collaborator failed.
    #[error("store error: {0}")]
    Store(String),
}
