#![allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]

//! Integration tests for the vault lock/unlock lifecycle — key caching,
//! automatic re-unlock, multi-salt coexistence, and the decrypted-entry
//! cache.

use coffre_crypto_core::{kdf, Salt};
use coffre_vault::{
    entries, EntryPlaintext, SaltProvider, Vault, VaultError, VaultStatus, DEFAULT_TITLE,
};

/// 16 zero bytes, base64.
const ZERO_SALT: &str = "AAAAAAAAAAAAAAAAAAAAAA==";
/// "bbbbbbbbbbbbbbbb", base64.
const OTHER_SALT: &str = "YmJiYmJiYmJiYmJiYmJiYg==";

struct FixedSaltProvider(String);

impl SaltProvider for FixedSaltProvider {
    fn vault_salt(&self) -> Result<String, VaultError> {
        Ok(self.0.clone())
    }

    fn setup_vault(&mut self, _master_password: &str) -> Result<String, VaultError> {
        Ok(self.0.clone())
    }
}

#[test]
fn scenario_zero_salt_correct_horse() {
    let mut vault = Vault::new();
    vault
        .unlock("correct horse", ZERO_SALT)
        .expect("unlock should succeed");

    let envelope = vault
        .encrypt_entry(&EntryPlaintext::new("Bank", "u", "p"))
        .expect("encrypt should succeed");
    assert_eq!(envelope.salt.to_base64(), ZERO_SALT);

    let decrypted = vault.decrypt_entry(&envelope).expect("decrypt should succeed");
    assert_eq!(decrypted.title, "Bank");
    assert_eq!(decrypted.username, "u");
    assert_eq!(decrypted.password, "p");
    assert_eq!(decrypted.url, "");
    assert_eq!(decrypted.notes, "");
    assert_eq!(decrypted.category, "");
    assert_eq!(decrypted.category_id, None);
}

#[test]
fn scenario_missing_title_defaults_to_untitled() {
    let mut vault = Vault::new();
    vault
        .unlock("correct horse", ZERO_SALT)
        .expect("unlock should succeed");

    let envelope = vault
        .encrypt_entry(&EntryPlaintext::new("", "u", "p"))
        .expect("encrypt should succeed");
    let decrypted = vault.decrypt_entry(&envelope).expect("decrypt should succeed");
    assert_eq!(decrypted.title, DEFAULT_TITLE);
}

#[test]
fn unlock_via_salt_provider() {
    let provider = FixedSaltProvider(ZERO_SALT.to_owned());
    let mut vault = Vault::new();
    vault
        .unlock_with_provider(&provider, "correct horse")
        .expect("unlock should succeed");
    assert!(vault.is_unlocked());
    assert_eq!(
        vault.active_salt().map(Salt::to_base64),
        Some(ZERO_SALT.to_owned())
    );
}

#[test]
fn locked_operations_recover_through_retained_credentials() {
    let mut vault = Vault::new();
    vault
        .unlock("master password", ZERO_SALT)
        .expect("unlock should succeed");
    let envelope = vault
        .encrypt_entry(&EntryPlaintext::new("Bank", "u", "p"))
        .expect("encrypt should succeed");
    assert_eq!(vault.derivation_count(), 1);

    vault.lock();
    assert_eq!(vault.status(), VaultStatus::Locked);

    // Both operations auto-re-unlock from the retained credentials; the
    // key comes from the per-salt cache, so no new derivation happens.
    let decrypted = vault.decrypt_entry(&envelope).expect("auto-recovery should work");
    assert_eq!(decrypted.title, "Bank");
    assert!(vault.is_unlocked());
    assert_eq!(vault.derivation_count(), 1);

    vault.lock();
    vault
        .encrypt_entry(&EntryPlaintext::new("Mail", "m", "x"))
        .expect("auto-recovery should work");
    assert_eq!(vault.derivation_count(), 1);
}

#[test]
fn second_decrypt_is_served_from_the_entry_cache() {
    let mut vault = Vault::new();
    vault
        .unlock("master password", ZERO_SALT)
        .expect("unlock should succeed");
    let envelope = vault
        .encrypt_entry(&EntryPlaintext::new("Bank", "u", "p"))
        .expect("encrypt should succeed");

    let first = vault.decrypt_entry(&envelope).expect("decrypt should succeed");

    // Even with the retained password gone and the key still cached, the
    // cache hit short-circuits the whole pipeline.
    vault.forget_master_password();
    let second = vault.decrypt_entry(&envelope).expect("cache hit should succeed");
    assert_eq!(first, second);
}

#[test]
fn lock_clears_the_entry_cache() {
    let mut vault = Vault::new();
    vault
        .unlock("master password", ZERO_SALT)
        .expect("unlock should succeed");
    let envelope = vault
        .encrypt_entry(&EntryPlaintext::new("Bank", "u", "p"))
        .expect("encrypt should succeed");
    vault.decrypt_entry(&envelope).expect("decrypt should succeed");

    vault.lock();
    vault.forget_master_password();

    // Cache was cleared on lock and recovery is disabled, so the miss
    // surfaces the locked state.
    let err = vault.decrypt_entry(&envelope).expect_err("should be locked");
    assert!(matches!(err, VaultError::Locked));
}

#[test]
fn envelope_from_older_salt_decrypts_after_rotation_style_reunlock() {
    let mut vault = Vault::new();
    vault
        .unlock("master password", ZERO_SALT)
        .expect("unlock should succeed");
    let old_envelope = vault
        .encrypt_entry(&EntryPlaintext::new("Bank", "u", "p"))
        .expect("encrypt should succeed");
    assert_eq!(vault.derivation_count(), 1);

    // New salt becomes active (the password-rotation transition).
    vault.lock();
    vault
        .unlock("new master password", OTHER_SALT)
        .expect("unlock should succeed");
    assert_eq!(vault.derivation_count(), 2);

    // The old envelope names its salt; its key is still in the cache.
    let decrypted = vault
        .decrypt_entry(&old_envelope)
        .expect("old-salt decrypt should succeed");
    assert_eq!(decrypted.title, "Bank");
    assert_eq!(vault.derivation_count(), 2);
}

#[test]
fn envelope_from_unknown_salt_rederives_with_retained_password() {
    let password = "master password";
    let foreign_salt = Salt::from_bytes(b"cccccccccccccccc").expect("16 bytes");

    // An envelope produced elsewhere (another device) under the same
    // password but a salt this vault has never unlocked with.
    let foreign_key = kdf::derive(password, &foreign_salt).expect("derive should succeed");
    let envelope = entries::encrypt_entry(
        &foreign_key,
        &EntryPlaintext::new("Roaming", "u", "p"),
        &foreign_salt,
    )
    .expect("encrypt should succeed");

    let mut vault = Vault::new();
    vault.unlock(password, ZERO_SALT).expect("unlock should succeed");
    assert_eq!(vault.derivation_count(), 1);

    let decrypted = vault.decrypt_entry(&envelope).expect("decrypt should succeed");
    assert_eq!(decrypted.title, "Roaming");
    assert_eq!(vault.derivation_count(), 2);
}

#[test]
fn cache_hit_unlock_with_wrong_password_keeps_the_verified_credentials() {
    let password = "right password";
    let mut vault = Vault::new();
    vault.unlock(password, ZERO_SALT).expect("unlock should succeed");
    assert_eq!(vault.derivation_count(), 1);

    // Re-unlocking a cached salt skips derivation, so this wrong
    // password is never checked. It must not displace the credentials
    // that were actually verified.
    vault.lock();
    vault
        .unlock("wrong password", ZERO_SALT)
        .expect("cache-hit unlock should succeed");
    assert_eq!(vault.derivation_count(), 1);

    // An envelope under a salt this vault has never seen forces a
    // re-derivation from the retained password; it only opens if the
    // verified password was kept.
    let foreign_salt = Salt::from_bytes(b"eeeeeeeeeeeeeeee").expect("16 bytes");
    let foreign_key = kdf::derive(password, &foreign_salt).expect("derive should succeed");
    let envelope = entries::encrypt_entry(
        &foreign_key,
        &EntryPlaintext::new("Legacy", "u", "p"),
        &foreign_salt,
    )
    .expect("encrypt should succeed");

    let decrypted = vault.decrypt_entry(&envelope).expect("decrypt should succeed");
    assert_eq!(decrypted.title, "Legacy");
}

#[test]
fn unknown_salt_without_retained_password_is_a_salt_mismatch() {
    let foreign_salt = Salt::from_bytes(b"dddddddddddddddd").expect("16 bytes");
    let foreign_key = kdf::derive("whatever", &foreign_salt).expect("derive should succeed");
    let envelope = entries::encrypt_entry(
        &foreign_key,
        &EntryPlaintext::new("Roaming", "u", "p"),
        &foreign_salt,
    )
    .expect("encrypt should succeed");

    let mut vault = Vault::new();
    vault
        .unlock("master password", ZERO_SALT)
        .expect("unlock should succeed");
    vault.forget_master_password();

    let err = vault.decrypt_entry(&envelope).expect_err("should fail");
    assert!(matches!(err, VaultError::SaltMismatch));
}

#[test]
fn wrong_key_surfaces_authentication_failure_through_the_facade() {
    let mut vault_a = Vault::new();
    vault_a
        .unlock("password one", ZERO_SALT)
        .expect("unlock should succeed");
    let envelope = vault_a
        .encrypt_entry(&EntryPlaintext::new("Bank", "u", "p"))
        .expect("encrypt should succeed");

    // Same salt, different password — the derived key differs, so the
    // GCM tag check must fail loudly instead of yielding garbage.
    let mut vault_b = Vault::new();
    vault_b
        .unlock("password two", ZERO_SALT)
        .expect("unlock should succeed");
    let err = vault_b.decrypt_entry(&envelope).expect_err("should fail");
    assert!(matches!(
        err,
        VaultError::Crypto(coffre_crypto_core::CryptoError::AuthenticationFailed)
    ));
}
