//! # Crypto Module
//!
//! Deterministic field-level encryption for queryable database columns.
//!
//! - **Key Derivation**: PBKDF2-HMAC-SHA-256, 100 000 iterations, 64 bytes of
//!   output split into a 32-byte AES key and a 32-byte MAC key
//! - **IV**: `HMAC-SHA256(mac_key, plaintext)` truncated to 16 bytes, so the
//!   same plaintext always gets the same IV
//! - **Cipher**: AES-256-CTR over the plaintext with that IV
//! - **Storage form**: `base64(iv || ciphertext)`
//!
//! Determinism is the point: equality filters such as "find the membership
//! where user = X" work server-side without decrypting every row. The scheme
//! leaks equality of plaintexts and nothing else, which is acceptable for
//! identifiers that are already used as lookup keys.
//!
//! Decryption fails open: a value that cannot be decoded is logged and
//! returned unchanged, so a key rollover or a legacy plaintext row degrades
//! to garbage output rather than a cascading outage.

use aes::cipher::{KeyIvInit, StreamCipher};
use aes::Aes256;
use base64::{engine::general_purpose, Engine as _};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type Aes256Ctr = ctr::Ctr128BE<Aes256>;
type HmacSha256 = Hmac<Sha256>;

/// Module-level salt for key derivation. Changing it invalidates every
/// encrypted column, so the version lives in the constant itself.
const KDF_SALT: &[u8] = b"auth_deterministic_encryption_salt_v1";
const KDF_ITERATIONS: u32 = 100_000;
const IV_LEN: usize = 16;

/// Cryptographic operation failure.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("invalid base64 payload: {0}")]
    Decode(#[from] base64::DecodeError),
    #[error("encrypted payload shorter than the IV")]
    TooShort,
    #[error("decrypted bytes are not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Deterministic AES-256-CTR encryption with PBKDF2-derived keys.
///
/// For a fixed password, `encrypt` is a pure function of its input:
/// identical plaintexts produce identical ciphertexts.
pub struct DeterministicEncryption {
    aes_key: [u8; 32],
    mac_key: [u8; 32],
}

impl DeterministicEncryption {
    /// Derive the cipher and MAC keys from a password.
    pub fn new(password: &str) -> Self {
        let mut derived = [0u8; 64];
        pbkdf2::pbkdf2_hmac::<Sha256>(password.as_bytes(), KDF_SALT, KDF_ITERATIONS, &mut derived);

        let mut aes_key = [0u8; 32];
        let mut mac_key = [0u8; 32];
        aes_key.copy_from_slice(&derived[..32]);
        mac_key.copy_from_slice(&derived[32..]);

        Self { aes_key, mac_key }
    }

    /// Encrypt a plaintext. Deterministic: same input, same output.
    pub fn encrypt(&self, plaintext: &str) -> String {
        let data = plaintext.as_bytes();

        // HMAC of the plaintext is the IV, which is what makes the scheme
        // deterministic and therefore queryable.
        let mut mac =
            HmacSha256::new_from_slice(&self.mac_key).expect("HMAC accepts any key length");
        mac.update(data);
        let digest = mac.finalize().into_bytes();

        let mut iv = [0u8; IV_LEN];
        iv.copy_from_slice(&digest[..IV_LEN]);

        let mut buf = data.to_vec();
        let mut cipher = Aes256Ctr::new(&self.aes_key.into(), &iv.into());
        cipher.apply_keystream(&mut buf);

        let mut payload = iv.to_vec();
        payload.extend_from_slice(&buf);
        general_purpose::STANDARD.encode(payload)
    }

    /// Decrypt a value produced by [`encrypt`](Self::encrypt).
    pub fn decrypt(&self, encrypted: &str) -> Result<String, CryptoError> {
        let payload = general_purpose::STANDARD.decode(encrypted)?;
        if payload.len() < IV_LEN {
            return Err(CryptoError::TooShort);
        }

        let (iv_bytes, ciphertext) = payload.split_at(IV_LEN);
        let mut iv = [0u8; IV_LEN];
        iv.copy_from_slice(iv_bytes);

        let mut buf = ciphertext.to_vec();
        let mut cipher = Aes256Ctr::new(&self.aes_key.into(), &iv.into());
        cipher.apply_keystream(&mut buf);

        Ok(String::from_utf8(buf)?)
    }
}

/// Encryption wrapper applied to sensitive columns at the store boundary.
///
/// When encryption is disabled by configuration both directions are the
/// identity function, so the rest of the crate never branches on the switch.
pub struct FieldCipher {
    inner: Option<DeterministicEncryption>,
}

impl FieldCipher {
    pub fn new(enabled: bool, key: &str) -> Self {
        let inner = if enabled && !key.is_empty() {
            Some(DeterministicEncryption::new(key))
        } else {
            None
        };
        Self { inner }
    }

    /// Identity cipher, used when `ENABLE_ENCRYPTION` is off.
    pub fn disabled() -> Self {
        Self { inner: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }

    /// Encrypt a field value for storage.
    pub fn encrypt_field(&self, value: &str) -> String {
        match &self.inner {
            Some(enc) if !value.is_empty() => enc.encrypt(value),
            _ => value.to_string(),
        }
    }

    /// Decrypt a stored field value. Fails open: undecodable input is logged
    /// and returned unchanged.
    pub fn decrypt_field(&self, value: &str) -> String {
        match &self.inner {
            Some(enc) if !value.is_empty() => match enc.decrypt(value) {
                Ok(plain) => plain,
                Err(err) => {
                    tracing::error!("field decryption failed: {}", err);
                    value.to_string()
                }
            },
            _ => value.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encryption_is_deterministic() {
        let enc = DeterministicEncryption::new("test-password");
        assert_eq!(enc.encrypt("john"), enc.encrypt("john"));
    }

    #[test]
    fn round_trip() {
        let enc = DeterministicEncryption::new("test-password");
        let ciphertext = enc.encrypt("some confidential value");
        assert_ne!(ciphertext, "some confidential value");
        assert_eq!(enc.decrypt(&ciphertext).unwrap(), "some confidential value");
    }

    #[test]
    fn distinct_plaintexts_differ() {
        let enc = DeterministicEncryption::new("test-password");
        assert_ne!(enc.encrypt("john"), enc.encrypt("jane"));
    }

    #[test]
    fn distinct_keys_differ() {
        let a = DeterministicEncryption::new("password-a");
        let b = DeterministicEncryption::new("password-b");
        assert_ne!(a.encrypt("john"), b.encrypt("john"));
    }

    #[test]
    fn decrypt_rejects_truncated_payload() {
        let enc = DeterministicEncryption::new("test-password");
        let short = general_purpose::STANDARD.encode([1u8, 2, 3]);
        assert!(matches!(enc.decrypt(&short), Err(CryptoError::TooShort)));
    }

    #[test]
    fn disabled_cipher_is_identity() {
        let cipher = FieldCipher::disabled();
        assert_eq!(cipher.encrypt_field("john"), "john");
        assert_eq!(cipher.decrypt_field("john"), "john");
    }

    #[test]
    fn enabled_cipher_round_trips_fields() {
        let cipher = FieldCipher::new(true, "test-password");
        let stored = cipher.encrypt_field("john");
        assert_ne!(stored, "john");
        assert_eq!(cipher.decrypt_field(&stored), "john");
    }

    #[test]
    fn decrypt_field_fails_open_on_garbage() {
        let cipher = FieldCipher::new(true, "test-password");
        // Not valid base64: the stored value comes back unchanged.
        assert_eq!(cipher.decrypt_field("not%%base64"), "not%%base64");
    }
}
