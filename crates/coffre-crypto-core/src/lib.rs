//! `coffre-crypto-core` — Pure cryptographic primitives for COFFRE.
//!
//! This crate is the audit target: zero network, zero async, zero GUI
//! dependencies. It implements the client-side vault cryptography —
//! PBKDF2-HMAC-SHA256 key derivation, AES-256-GCM entry sealing, and the
//! portable envelope format the server stores — and nothing else.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::arithmetic_side_effects))]

pub mod error;
pub mod memory;

pub mod kdf;
pub mod aead;
pub mod envelope;

pub use aead::{open, seal, TAG_LEN};
pub use envelope::{EncryptedEnvelope, Fingerprint, IV_LEN};
pub use error::CryptoError;
pub use kdf::{derive, Salt, PBKDF2_ITERATIONS, SALT_LEN};
pub use memory::{SecretBuffer, SecretKey, KEY_LEN};
