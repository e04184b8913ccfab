//! Client-side sealing of archived payloads.
//!
//! Sealed layout: 12-byte random nonce followed by the ChaCha20-Poly1305
//! ciphertext (which carries its 16-byte tag).

use chacha20poly1305::{
    ChaCha20Poly1305, Key, KeyInit, Nonce,
    aead::{Aead, OsRng, rand_core::RngCore},
};
use thiserror::Error;

use crate::config::ARCHIVE_KEY_LEN;

const NONCE_LEN: usize = 12;

#[derive(Debug, Error)]
pub enum CipherError {
    #[error("encryption failed")]
    Seal,

    #[cfg(test)]
    #[error("decryption failed")]
    Open,
}

/// Symmetric cipher for archive payloads.
#[derive(Clone)]
pub struct ArchiveCipher {
    cipher: ChaCha20Poly1305,
}

impl ArchiveCipher {
    pub fn new(key: &[u8; ARCHIVE_KEY_LEN]) -> Self {
        Self {
            cipher: ChaCha20Poly1305::new(Key::from_slice(key)),
        }
    }

    pub fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>, CipherError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext)
            .map_err(|_| CipherError::Seal)?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        sealed.extend_from_slice(&nonce_bytes);
        sealed.extend_from_slice(&ciphertext);
        Ok(sealed)
    }

    #[cfg(test)]
    pub fn open(&self, sealed: &[u8]) -> Result<Vec<u8>, CipherError> {
        if sealed.len() < NONCE_LEN {
            return Err(CipherError::Open);
        }
        let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_LEN);
        self.cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|_| CipherError::Open)
    }
}

impl std::fmt::Debug for ArchiveCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveCipher").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seal_then_open() {
        let cipher = ArchiveCipher::new(&[7u8; ARCHIVE_KEY_LEN]);
        let sealed = cipher.seal(b"kind: Deployment").unwrap();

        assert_eq!(sealed.len(), NONCE_LEN + b"kind: Deployment".len() + 16);
        assert_ne!(&sealed[NONCE_LEN..], b"kind: Deployment");
        assert_eq!(cipher.open(&sealed).unwrap(), b"kind: Deployment");
    }

    #[test]
    fn test_nonce_is_fresh_per_seal() {
        let cipher = ArchiveCipher::new(&[7u8; ARCHIVE_KEY_LEN]);
        let a = cipher.seal(b"same").unwrap();
        let b = cipher.seal(b"same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_wrong_key_fails_to_open() {
        let sealed = ArchiveCipher::new(&[1u8; ARCHIVE_KEY_LEN])
            .seal(b"payload")
            .unwrap();
        let other = ArchiveCipher::new(&[2u8; ARCHIVE_KEY_LEN]);
        assert!(other.open(&sealed).is_err());
        assert!(other.open(b"short").is_err());
    }
}
