//! Symmetric encryption: AES-256-CBC with per-call random IV.
//!
//! Used to wrap payloads too large for a single RSA block. Every call to
//! [`encrypt`] draws a fresh 16-byte IV from the secure RNG - the IV is
//! never derived from the key or the plaintext, and never reused across
//! calls with the same key. The IV travels alongside the ciphertext in the
//! returned [`EncryptedPayload`].
//!
//! On the wire both fields are hex strings. Peer implementations have
//! historically emitted base64 for either field, so [`decrypt`] accepts
//! each field independently in hex or base64.
//!
//! ```rust
//! use msg_crypto::{keygen, symmetric};
//!
//! let key = keygen::generate_aes_key()?;
//! let payload = symmetric::encrypt(b"attachment bytes", &key)?;
//! let plaintext = symmetric::decrypt(&payload.ciphertext, &key, &payload.iv)?;
//! assert_eq!(plaintext, b"attachment bytes");
//! # Ok::<(), msg_crypto::error::CryptoError>(())
//! ```

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use log::debug;
use openssl::symm::Cipher;
use serde::{Deserialize, Serialize};

use crate::error::{CryptoError, DecryptionReason, Result};
use crate::keygen::SymmetricKey;

/// AES-CBC initialization vector size in bytes.
pub const AES_CBC_IV_SIZE: usize = 16;

/// A symmetric ciphertext and the IV it was produced with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncryptedPayload {
    /// Hex-encoded 16-byte initialization vector.
    pub iv: String,
    /// Hex-encoded AES-256-CBC ciphertext.
    pub ciphertext: String,
}

/// Encrypt a plaintext of arbitrary length under an AES-256 key.
///
/// Applies AES-256-CBC with PKCS#7 padding and a fresh random IV.
///
/// # Errors
/// Returns [`CryptoError::KeyGeneration`] if the RNG or the cipher
/// primitive itself fails (fatal, not retried).
pub fn encrypt(plaintext: &[u8], key: &SymmetricKey) -> Result<EncryptedPayload> {
    let mut iv = [0u8; AES_CBC_IV_SIZE];
    openssl::rand::rand_bytes(&mut iv)
        .map_err(|e| CryptoError::key_generation(format!("RNG failed: {}", e)))?;

    let ciphertext = openssl::symm::encrypt(
        Cipher::aes_256_cbc(),
        key.expose_bytes(),
        Some(&iv),
        plaintext,
    )
    .map_err(|e| CryptoError::key_generation(format!("AES-256-CBC encryption failed: {}", e)))?;

    Ok(EncryptedPayload {
        iv: hex::encode(iv),
        ciphertext: hex::encode(ciphertext),
    })
}

/// Decrypt an AES-256-CBC ciphertext.
///
/// `ciphertext` and `iv` are each accepted as hex or base64, decoded
/// independently (hex tried first).
///
/// # Errors
/// - [`CryptoError::Decryption`] with [`DecryptionReason::CorruptData`] if
///   either field fails to decode or the IV is not 16 bytes.
/// - [`CryptoError::Integrity`] if padding is invalid after decryption -
///   typically a wrong key or a corrupted ciphertext/IV pair.
pub fn decrypt(ciphertext: &str, key: &SymmetricKey, iv: &str) -> Result<Vec<u8>> {
    let iv_bytes = decode_field(iv, Some(AES_CBC_IV_SIZE))
        .ok_or(CryptoError::decryption(DecryptionReason::CorruptData))?;
    let ciphertext_bytes = decode_field(ciphertext, None)
        .ok_or(CryptoError::decryption(DecryptionReason::CorruptData))?;

    openssl::symm::decrypt(
        Cipher::aes_256_cbc(),
        key.expose_bytes(),
        Some(&iv_bytes),
        &ciphertext_bytes,
    )
    .map_err(|_| {
        debug!("AES-CBC finalization failed: invalid padding");
        CryptoError::Integrity
    })
}

/// Decode a wire field as hex, falling back to base64.
///
/// When `expected_len` is given, a decode that yields a different length is
/// treated as the wrong encoding and the other one is tried.
fn decode_field(value: &str, expected_len: Option<usize>) -> Option<Vec<u8>> {
    let fits = |bytes: &[u8]| expected_len.map_or(true, |len| bytes.len() == len);

    if let Ok(bytes) = hex::decode(value) {
        if fits(&bytes) {
            return Some(bytes);
        }
    }
    match STANDARD.decode(value) {
        Ok(bytes) if fits(&bytes) => Some(bytes),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keygen;

    #[test]
    fn test_roundtrip() {
        let key = keygen::generate_aes_key().unwrap();
        let payload = encrypt(b"top secret data", &key).unwrap();
        let plaintext = decrypt(&payload.ciphertext, &key, &payload.iv).unwrap();
        assert_eq!(plaintext, b"top secret data");
    }

    #[test]
    fn test_roundtrip_empty_and_long() {
        let key = keygen::generate_aes_key().unwrap();
        for plaintext in [&b""[..], &[0x42u8; 4096][..]] {
            let payload = encrypt(plaintext, &key).unwrap();
            assert_eq!(decrypt(&payload.ciphertext, &key, &payload.iv).unwrap(), plaintext);
        }
    }

    #[test]
    fn test_iv_fresh_per_call() {
        let key = keygen::generate_aes_key().unwrap();
        let a = encrypt(b"same plaintext", &key).unwrap();
        let b = encrypt(b"same plaintext", &key).unwrap();
        assert_ne!(a.iv, b.iv);
        assert_ne!(a.ciphertext, b.ciphertext);
    }

    #[test]
    fn test_base64_fields_accepted() {
        let key = keygen::generate_aes_key().unwrap();
        let payload = encrypt(b"cross-client message", &key).unwrap();

        // Re-encode both fields the way the other client implementation does
        let iv_b64 = STANDARD.encode(hex::decode(&payload.iv).unwrap());
        let ct_b64 = STANDARD.encode(hex::decode(&payload.ciphertext).unwrap());

        let plaintext = decrypt(&ct_b64, &key, &iv_b64).unwrap();
        assert_eq!(plaintext, b"cross-client message");
    }

    #[test]
    fn test_wrong_key_is_integrity_error() {
        let key = keygen::generate_aes_key().unwrap();
        let other = keygen::generate_aes_key().unwrap();
        let payload = encrypt(b"for the right key only", &key).unwrap();
        // A wrong key almost always trips the padding check; in the rare
        // case the padding happens to validate, the output is still garbage.
        match decrypt(&payload.ciphertext, &other, &payload.iv) {
            Err(err) => assert!(matches!(err, CryptoError::Integrity)),
            Ok(garbage) => assert_ne!(garbage, b"for the right key only"),
        }
    }

    #[test]
    fn test_undecodable_fields_are_corrupt_data() {
        let key = keygen::generate_aes_key().unwrap();
        let payload = encrypt(b"data", &key).unwrap();

        let err = decrypt("!!not-an-encoding!!", &key, &payload.iv).unwrap_err();
        assert!(matches!(
            err,
            CryptoError::Decryption {
                reason: DecryptionReason::CorruptData
            }
        ));

        // IV of the wrong length under every decoding
        let err = decrypt(&payload.ciphertext, &key, "aabb").unwrap_err();
        assert!(matches!(
            err,
            CryptoError::Decryption {
                reason: DecryptionReason::CorruptData
            }
        ));
    }

    #[test]
    fn test_payload_serde_roundtrip() {
        let key = keygen::generate_aes_key().unwrap();
        let payload = encrypt(b"wire format", &key).unwrap();
        let json = serde_json::to_string(&payload).unwrap();
        let back: EncryptedPayload = serde_json::from_str(&json).unwrap();
        assert_eq!(decrypt(&back.ciphertext, &key, &back.iv).unwrap(), b"wire format");
    }
}
