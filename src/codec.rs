// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later
//
// At-rest sealing of real webhook URLs.
//
// Sealed blob (base64 of):
//   [12 bytes: AES-256-GCM nonce]
//   [16 bytes: GCM authentication tag]
//   [N bytes:  ciphertext of the UTF-8 URL]
//
// Nonces come from the OS RNG on every call; there is no counter, so
// uniqueness rests on 96 bits of randomness per key.

use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aead::{AeadInPlace, KeyInit};
use aes_gcm::Aes256Gcm;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rand::RngCore;
use sha2::{Digest, Sha256};

/// AES-GCM nonce size (bytes).
pub const NONCE_LEN: usize = 12;
/// GCM authentication tag size (bytes).
pub const TAG_LEN: usize = 16;
/// Minimum sealed length: nonce + tag.
pub const OVERHEAD: usize = NONCE_LEN + TAG_LEN;

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("sealed blob is not valid base64")]
    InvalidEncoding,

    #[error("sealed blob too short: need at least {min} bytes, got {got}")]
    MessageTooShort { min: usize, got: usize },

    #[error("encryption failed")]
    EncryptionFailed,

    #[error("decryption failed: authentication failure or data corruption")]
    DecryptionFailed,

    #[error("decrypted payload is not UTF-8")]
    InvalidUtf8,
}

/// 32-byte sealing key. Debug output never shows the key bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct SealingKey([u8; 32]);

impl SealingKey {
    /// Derive the key as SHA-256 of the configured secret.
    pub fn derive(secret: &str) -> Self {
        let mut key = [0u8; 32];
        key.copy_from_slice(&Sha256::digest(secret.as_bytes()));
        Self(key)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    fn cipher(&self) -> Aes256Gcm {
        Aes256Gcm::new(GenericArray::from_slice(&self.0))
    }
}

impl std::fmt::Debug for SealingKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SealingKey(<redacted>)")
    }
}

/// Seal a plaintext under `key`, returning the base64 blob.
pub fn seal(plaintext: &str, key: &SealingKey) -> Result<String, CodecError> {
    let mut nonce_bytes = [0u8; NONCE_LEN];
    rand::rngs::OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = GenericArray::from_slice(&nonce_bytes);

    let mut buffer = plaintext.as_bytes().to_vec();
    let tag = key
        .cipher()
        .encrypt_in_place_detached(nonce, b"", &mut buffer)
        .map_err(|_| CodecError::EncryptionFailed)?;

    let mut wire = Vec::with_capacity(OVERHEAD + buffer.len());
    wire.extend_from_slice(&nonce_bytes);
    wire.extend_from_slice(&tag);
    wire.extend_from_slice(&buffer);

    Ok(BASE64.encode(wire))
}

/// Open a base64 blob produced by [`seal`].
///
/// Fails on malformed input or when the tag does not verify; no partial
/// plaintext is ever returned.
pub fn open(blob: &str, key: &SealingKey) -> Result<String, CodecError> {
    let wire = BASE64
        .decode(blob.trim())
        .map_err(|_| CodecError::InvalidEncoding)?;

    if wire.len() < OVERHEAD {
        return Err(CodecError::MessageTooShort {
            min: OVERHEAD,
            got: wire.len(),
        });
    }

    let nonce = GenericArray::from_slice(&wire[..NONCE_LEN]);
    let tag = GenericArray::from_slice(&wire[NONCE_LEN..OVERHEAD]);
    let mut buffer = wire[OVERHEAD..].to_vec();

    key.cipher()
        .decrypt_in_place_detached(nonce, b"", &mut buffer, tag)
        .map_err(|_| CodecError::DecryptionFailed)?;

    String::from_utf8(buffer).map_err(|_| CodecError::InvalidUtf8)
}
