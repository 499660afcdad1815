//! Authenticated encryption of table and package blobs.
//!
//! Every blob AmazeDB writes (table files and export packages) is sealed with
//! AES-256-GCM under a per-database key.
//!
//! ## Blob Layout
//!
//! ```text
//! | nonce (12) | ciphertext (n) | tag (16) |
//! ```
//!
//! A fresh random nonce is drawn for every encryption, so encrypting the same
//! plaintext twice yields different blobs. Decryption verifies the tag before
//! returning anything: a wrong key, a truncated blob, or a single flipped byte
//! all surface as [`CoreError::DecryptionFailed`].

use crate::error::{CoreError, CoreResult};
use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rand::Rng;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Key length in bytes.
pub const KEY_SIZE: usize = 32;
/// Nonce prefix length in bytes.
pub const NONCE_SIZE: usize = 12;
/// Authentication tag length in bytes.
pub const TAG_SIZE: usize = 16;

/// A 256-bit database or export key. Wiped from memory on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct EncryptionKey {
    bytes: [u8; KEY_SIZE],
}

impl EncryptionKey {
    /// Draws a fresh key from the thread RNG.
    #[must_use]
    pub fn generate() -> Self {
        Self {
            bytes: rand::thread_rng().gen(),
        }
    }

    /// Wraps raw key material.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidKeySize`] unless `bytes` is exactly
    /// [`KEY_SIZE`] long.
    pub fn from_bytes(bytes: &[u8]) -> CoreResult<Self> {
        <[u8; KEY_SIZE]>::try_from(bytes)
            .map(|bytes| Self { bytes })
            .map_err(|_| CoreError::invalid_key_size(bytes.len(), KEY_SIZE))
    }

    /// Parses the base64 form stored in `metadata.json` and handed out by
    /// exports.
    pub fn from_base64(encoded: &str) -> CoreResult<Self> {
        let raw = Zeroizing::new(
            STANDARD
                .decode(encoded.trim())
                .map_err(|e| CoreError::invalid_format(format!("malformed key: {e}")))?,
        );
        Self::from_bytes(&raw)
    }

    /// Base64 form of the key. Secret; keep it out of logs.
    #[must_use]
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.bytes)
    }

    /// Raw key material.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl std::fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("EncryptionKey([REDACTED])")
    }
}

/// Seals and opens blobs under one [`EncryptionKey`].
pub struct Cipher {
    aead: Aes256Gcm,
}

impl Cipher {
    /// Builds a cipher for `key`.
    #[must_use]
    pub fn new(key: &EncryptionKey) -> Self {
        Self {
            aead: Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes())),
        }
    }

    /// Seals `plaintext` under a fresh random nonce.
    ///
    /// # Errors
    ///
    /// Only fails if the plaintext exceeds the AES-GCM message size limit.
    pub fn encrypt(&self, plaintext: &[u8]) -> CoreResult<Vec<u8>> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let sealed = self
            .aead
            .encrypt(&nonce, plaintext)
            .map_err(|_| CoreError::encryption_failed("plaintext too large"))?;

        let mut blob = nonce.to_vec();
        blob.extend_from_slice(&sealed);
        Ok(blob)
    }

    /// Opens a blob produced by [`encrypt`](Self::encrypt).
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::DecryptionFailed`] if the blob is truncated, was
    /// sealed under another key, or fails authentication. No plaintext is
    /// returned in any of those cases.
    pub fn decrypt(&self, blob: &[u8]) -> CoreResult<Vec<u8>> {
        if blob.len() < NONCE_SIZE + TAG_SIZE {
            return Err(CoreError::decryption_failed(format!(
                "blob of {} bytes is shorter than nonce and tag",
                blob.len()
            )));
        }

        let (nonce, sealed) = blob.split_at(NONCE_SIZE);
        self.aead
            .decrypt(Nonce::from_slice(nonce), sealed)
            .map_err(|_| CoreError::decryption_failed("authentication failed"))
    }
}

impl std::fmt::Debug for Cipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Cipher(AES-256-GCM)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_keys_differ() {
        assert_ne!(
            EncryptionKey::generate().as_bytes(),
            EncryptionKey::generate().as_bytes()
        );
    }

    #[test]
    fn key_wrong_size() {
        assert!(matches!(
            EncryptionKey::from_bytes(&[0u8; 16]),
            Err(CoreError::InvalidKeySize {
                expected: 32,
                actual: 16
            })
        ));
        assert!(EncryptionKey::from_bytes(&[0u8; 64]).is_err());
    }

    #[test]
    fn key_survives_base64() {
        let original = EncryptionKey::generate();
        let parsed = EncryptionKey::from_base64(&original.to_base64()).unwrap();
        assert_eq!(parsed.as_bytes(), original.as_bytes());
    }

    #[test]
    fn key_base64_rejects_garbage() {
        assert!(matches!(
            EncryptionKey::from_base64("not base64!!"),
            Err(CoreError::InvalidFormat { .. })
        ));
        // Valid base64, wrong length
        assert!(matches!(
            EncryptionKey::from_base64("AAAA"),
            Err(CoreError::InvalidKeySize { .. })
        ));
    }

    #[test]
    fn debug_redacts_key() {
        let secret = EncryptionKey::generate();
        assert_eq!(format!("{secret:?}"), "EncryptionKey([REDACTED])");
    }

    #[test]
    fn sealed_table_opens() {
        let cipher = Cipher::new(&EncryptionKey::generate());

        let table = br#"[{"name":"a"}]"#;
        let blob = cipher.encrypt(table).unwrap();
        assert_eq!(blob.len(), NONCE_SIZE + table.len() + TAG_SIZE);
        assert_eq!(cipher.decrypt(&blob).unwrap(), table);
    }

    #[test]
    fn nonce_is_fresh_per_blob() {
        let cipher = Cipher::new(&EncryptionKey::generate());
        let first = cipher.encrypt(b"same").unwrap();
        let second = cipher.encrypt(b"same").unwrap();
        assert_ne!(first[..NONCE_SIZE], second[..NONCE_SIZE]);
    }

    #[test]
    fn other_key_cannot_open() {
        let sealed = Cipher::new(&EncryptionKey::generate())
            .encrypt(b"secret")
            .unwrap();
        let result = Cipher::new(&EncryptionKey::generate()).decrypt(&sealed);
        assert!(matches!(result, Err(CoreError::DecryptionFailed { .. })));
    }

    #[test]
    fn decrypt_tampered_byte_fails() {
        let cipher = Cipher::new(&EncryptionKey::generate());
        let sealed = cipher.encrypt(b"data").unwrap();

        for i in 0..sealed.len() {
            let mut tampered = sealed.clone();
            tampered[i] ^= 0x01;
            assert!(
                matches!(
                    cipher.decrypt(&tampered),
                    Err(CoreError::DecryptionFailed { .. })
                ),
                "byte {i} flipped but blob still decrypted"
            );
        }
    }

    #[test]
    fn truncated_blob_rejected() {
        let cipher = Cipher::new(&EncryptionKey::generate());
        assert!(matches!(
            cipher.decrypt(&[0u8; 10]),
            Err(CoreError::DecryptionFailed { .. })
        ));
    }

    #[test]
    fn empty_plaintext() {
        let cipher = Cipher::new(&EncryptionKey::generate());
        let sealed = cipher.encrypt(b"").unwrap();
        assert!(cipher.decrypt(&sealed).unwrap().is_empty());
    }
}
