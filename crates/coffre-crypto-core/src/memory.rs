//! Secure memory containers for key material and decrypted payloads.
//!
//! This module provides:
//! - [`SecretKey`] — fixed 32-byte container for a derived vault key
//! - [`SecretBuffer`] — variable-length container for decrypted plaintext
//!
//! Both zero their contents on drop, mask `Debug`/`Display` output, and
//! `mlock` their backing storage on Unix (soft fallback when the lock
//! quota is exhausted).

use crate::error::CryptoError;
use rand::rngs::OsRng;
use rand::RngCore;
use secrecy::{ExposeSecret, SecretSlice};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Length of a derived vault key in bytes (AES-256).
pub const KEY_LEN: usize = 32;

// ---------------------------------------------------------------------------
// Memory locking guard
// ---------------------------------------------------------------------------

/// RAII guard that `munlock`s a memory region on drop.
///
/// `mlock` failure is a soft fallback: the region stays unlocked and a
/// one-time warning is emitted, but secret handling continues — the
/// zeroize-on-drop guarantee does not depend on `mlock`.
struct LockedRegion {
    ptr: *const u8,
    len: usize,
    locked: bool,
}

// SAFETY: the pointer is only passed to mlock/munlock system calls, which
// are thread-safe. The pointed-to bytes are owned by the enclosing
// SecretKey/SecretBuffer and never read through this guard.
unsafe impl Send for LockedRegion {}
unsafe impl Sync for LockedRegion {}

impl LockedRegion {
    fn noop() -> Self {
        Self {
            ptr: std::ptr::null(),
            len: 0,
            locked: false,
        }
    }

    fn try_lock(ptr: *const u8, len: usize) -> Self {
        let locked = platform::try_mlock(ptr, len);
        if !locked && len > 0 {
            static WARNED: std::sync::Once = std::sync::Once::new();
            WARNED.call_once(|| {
                eprintln!(
                    "[coffre-crypto-core] WARNING: mlock failed — \
                     key material may be swapped to disk"
                );
            });
        }
        Self { ptr, len, locked }
    }
}

impl Drop for LockedRegion {
    fn drop(&mut self) {
        if self.locked {
            platform::try_munlock(self.ptr, self.len);
        }
    }
}

// ---------------------------------------------------------------------------
// SecretKey — fixed 32 bytes
// ---------------------------------------------------------------------------

/// A 256-bit derived vault key.
///
/// Owned by exactly one vault state at a time. Callers borrow the raw
/// bytes via [`expose`](Self::expose) for the duration of a single
/// cryptographic call and must not retain the copy. Not `Clone` — a key
/// that must live in two places is a design error.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SecretKey {
    bytes: [u8; KEY_LEN],
    // Managed manually via Drop; a stale munlock is a harmless no-op.
    #[zeroize(skip)]
    lock: LockedRegion,
}

impl SecretKey {
    /// Wrap raw key bytes. The array is moved in; no copy remains with
    /// the caller.
    ///
    /// **Note on `mlock`:** the memory region is locked at the address
    /// `bytes` occupies here. If the value is subsequently moved (into a
    /// cache map, returned from a function), the `LockedRegion` still
    /// references the original address. This is acceptable because
    /// `mlock` is best-effort: `munlock` on a stale address is a safe
    /// no-op, and the zeroize-on-drop guarantee is independent of
    /// `mlock` status.
    #[must_use]
    pub fn from_bytes(data: [u8; KEY_LEN]) -> Self {
        // Two-phase init so the mlock targets the final resting address
        // of `bytes` rather than the caller's stack slot.
        let mut key = Self {
            bytes: data,
            lock: LockedRegion::noop(),
        };
        key.lock = LockedRegion::try_lock(key.bytes.as_ptr(), KEY_LEN);
        key
    }

    /// Generate a random key from the OS CSPRNG.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::SecureMemory`] if the CSPRNG fails.
    pub fn random() -> Result<Self, CryptoError> {
        let mut bytes = [0u8; KEY_LEN];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| CryptoError::SecureMemory(format!("CSPRNG fill failed: {e}")))?;
        Ok(Self::from_bytes(bytes))
    }

    /// Borrow the raw key bytes for a single cryptographic operation.
    #[must_use]
    pub const fn expose(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }

    /// Constant-time equality check against another key.
    #[must_use]
    pub fn ct_eq(&self, other: &Self) -> bool {
        ring::constant_time::verify_slices_are_equal(&self.bytes, &other.bytes).is_ok()
    }

    /// Overwrite the key material with zeros. Idempotent; the key is
    /// useless afterwards and should be dropped.
    pub fn clear(&mut self) {
        self.bytes.zeroize();
    }

    /// Whether [`clear`](Self::clear) has wiped this key (or it was all
    /// zeros to begin with).
    #[must_use]
    pub fn is_cleared(&self) -> bool {
        self.bytes.iter().all(|&b| b == 0)
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey(***)")
    }
}

impl fmt::Display for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey(***)")
    }
}

// ---------------------------------------------------------------------------
// SecretBuffer — variable length
// ---------------------------------------------------------------------------

/// Variable-length container for decrypted plaintext bytes.
///
/// Backed by [`SecretSlice`] from the `secrecy` crate: zeroized on drop,
/// masked in `Debug`, `mlock`'d on allocation.
pub struct SecretBuffer {
    inner: SecretSlice<u8>,
    _lock: LockedRegion,
}

impl SecretBuffer {
    /// Copy `data` into a new locked allocation. The caller should
    /// zeroize its own copy afterwards.
    #[must_use]
    pub fn new(data: &[u8]) -> Self {
        let inner: SecretSlice<u8> = data.to_vec().into();
        let exposed = inner.expose_secret();
        let lock = LockedRegion::try_lock(exposed.as_ptr(), exposed.len());
        Self { inner, _lock: lock }
    }

    /// Borrow the plaintext bytes. Keep the exposure short-lived.
    #[must_use]
    pub fn expose(&self) -> &[u8] {
        self.inner.expose_secret()
    }

    /// Number of bytes held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.expose_secret().len()
    }

    /// Whether the buffer is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for SecretBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretBuffer(***)")
    }
}

impl fmt::Display for SecretBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretBuffer(***)")
    }
}

// ---------------------------------------------------------------------------
// Platform bindings
// ---------------------------------------------------------------------------

#[cfg(unix)]
mod platform {
    pub(super) fn try_mlock(ptr: *const u8, len: usize) -> bool {
        if len == 0 {
            return true;
        }
        // SAFETY: mlock accepts any valid pointer/length pair; an invalid
        // range yields ENOMEM, which we report as "not locked".
        unsafe { libc::mlock(ptr.cast(), len) == 0 }
    }

    pub(super) fn try_munlock(ptr: *const u8, len: usize) {
        if len == 0 {
            return;
        }
        // SAFETY: munlock failure is non-critical.
        unsafe {
            libc::munlock(ptr.cast(), len);
        }
    }
}

#[cfg(not(unix))]
mod platform {
    pub(super) fn try_mlock(_ptr: *const u8, _len: usize) -> bool {
        false
    }

    pub(super) fn try_munlock(_ptr: *const u8, _len: usize) {}
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_key_roundtrips_bytes() {
        let key = SecretKey::from_bytes([0xAB; KEY_LEN]);
        assert_eq!(key.expose(), &[0xAB; KEY_LEN]);
    }

    #[test]
    fn secret_key_clear_is_idempotent() {
        let mut key = SecretKey::from_bytes([0xCD; KEY_LEN]);
        assert!(!key.is_cleared());
        key.clear();
        assert!(key.is_cleared());
        key.clear();
        assert!(key.is_cleared());
        assert_eq!(key.expose(), &[0u8; KEY_LEN]);
    }

    #[test]
    fn secret_key_random_produces_distinct_keys() {
        let a = SecretKey::random().expect("CSPRNG should succeed");
        let b = SecretKey::random().expect("CSPRNG should succeed");
        assert_ne!(a.expose(), b.expose());
        assert!(!a.is_cleared());
    }

    #[test]
    fn secret_key_ct_eq_compares_material() {
        let a = SecretKey::from_bytes([0x11; KEY_LEN]);
        let b = SecretKey::from_bytes([0x11; KEY_LEN]);
        let mut c = [0x11; KEY_LEN];
        c[KEY_LEN - 1] = 0x12;
        let c = SecretKey::from_bytes(c);
        assert!(a.ct_eq(&b));
        assert!(!a.ct_eq(&c));
    }

    #[test]
    fn secret_key_debug_is_masked() {
        let key = SecretKey::from_bytes([0xFF; KEY_LEN]);
        assert_eq!(format!("{key:?}"), "SecretKey(***)");
        assert_eq!(format!("{key}"), "SecretKey(***)");
    }

    #[test]
    fn secret_buffer_stores_and_exposes_content() {
        let buf = SecretBuffer::new(b"decrypted entry payload");
        assert_eq!(buf.expose(), b"decrypted entry payload");
        assert_eq!(buf.len(), 23);
        assert!(!buf.is_empty());
    }

    #[test]
    fn secret_buffer_empty() {
        let buf = SecretBuffer::new(b"");
        assert!(buf.is_empty());
        assert_eq!(buf.len(), 0);
    }

    #[test]
    fn secret_buffer_debug_is_masked() {
        let buf = SecretBuffer::new(b"hunter2");
        let debug = format!("{buf:?}");
        assert_eq!(debug, "SecretBuffer(***)");
        assert!(!debug.contains("hunter2"));
    }
}
