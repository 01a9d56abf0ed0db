//! Asymmetric encryption: RSA for small payloads.
//!
//! Encrypts message bodies and wrapped AES keys for a single recipient.
//! The wire format is RSA OAEP-SHA1, base64-encoded. One RSA block per
//! call: a 2048-bit key carries at most 214 bytes of plaintext
//! (modulus minus the 42-byte OAEP overhead); larger input is rejected up
//! front rather than silently truncated.
//!
//! Decryption tries OAEP first and falls back to PKCS#1 v1.5. Peer
//! implementations have historically disagreed on the padding scheme, and
//! trying both preserves interoperability without a protocol version field
//! on the wire.
//!
//! ```rust
//! use msg_crypto::{asymmetric, keygen};
//!
//! let recipient = keygen::generate_keypair()?;
//! let ciphertext = asymmetric::encrypt(b"hello", &recipient.public_key)?;
//! let plaintext = asymmetric::decrypt(&ciphertext, &recipient.private_key)?;
//! assert_eq!(plaintext, b"hello");
//! # Ok::<(), msg_crypto::error::CryptoError>(())
//! ```

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use log::debug;
use openssl::pkey::PKey;
use openssl::rsa::Padding;

use crate::error::{CryptoError, DecryptionReason, Result};

/// OAEP-SHA1 padding overhead in bytes: 2 x hash_len + 2.
pub const OAEP_OVERHEAD: usize = 42;

/// Maximum plaintext length one OAEP-padded block can carry for a key with
/// the given modulus size in bytes. For a 2048-bit key: 214.
#[must_use]
pub const fn max_plaintext_len(modulus_bytes: usize) -> usize {
    modulus_bytes - OAEP_OVERHEAD
}

/// Encrypt a small plaintext for a recipient's public key.
///
/// Applies RSA OAEP-SHA1 and returns the ciphertext base64-encoded.
///
/// # Errors
/// - [`CryptoError::InvalidKeyFormat`] if the public key does not parse.
/// - [`CryptoError::PlaintextTooLarge`] if the plaintext exceeds the
///   modulus-derived maximum. The primitive is not attempted in that case.
pub fn encrypt(plaintext: &[u8], public_key_pem: &str) -> Result<String> {
    let pkey = PKey::public_key_from_pem(public_key_pem.as_bytes())
        .map_err(|e| CryptoError::invalid_key_format(format!("public key: {}", e)))?;
    let rsa = pkey
        .rsa()
        .map_err(|e| CryptoError::invalid_key_format(format!("not an RSA public key: {}", e)))?;

    let max = max_plaintext_len(rsa.size() as usize);
    if plaintext.len() > max {
        return Err(CryptoError::PlaintextTooLarge {
            len: plaintext.len(),
            max,
        });
    }

    let mut ciphertext = vec![0u8; rsa.size() as usize];
    let len = rsa
        .public_encrypt(plaintext, &mut ciphertext, Padding::PKCS1_OAEP)
        .map_err(|e| CryptoError::key_generation(format!("RSA encryption failed: {}", e)))?;
    ciphertext.truncate(len);

    Ok(STANDARD.encode(ciphertext))
}

/// Decrypt a base64 RSA ciphertext with the recipient's private key.
///
/// Attempts OAEP-SHA1 first; on failure retries with PKCS#1 v1.5 before
/// giving up.
///
/// # Errors
/// - [`CryptoError::InvalidKeyFormat`] if the private key does not parse.
/// - [`CryptoError::Decryption`] tagged with a best-effort sub-reason:
///   [`DecryptionReason::CorruptData`] when the base64 decoding itself
///   fails, [`DecryptionReason::BadPadding`] when the decoded ciphertext
///   is not one modulus-sized block, [`DecryptionReason::WrongKey`] when a
///   well-formed block fails both padding schemes or the fallback output
///   fails the expected-format check. The sub-reason is inferred, not
///   guaranteed; treat it as diagnostics only.
pub fn decrypt(ciphertext_b64: &str, private_key_pem: &str) -> Result<Vec<u8>> {
    let ciphertext = STANDARD
        .decode(ciphertext_b64)
        .map_err(|_| CryptoError::decryption(DecryptionReason::CorruptData))?;

    let pkey = crate::keygen::parse_private_key(private_key_pem)?;
    let rsa = pkey
        .rsa()
        .map_err(|e| CryptoError::invalid_key_format(format!("not an RSA private key: {}", e)))?;

    if ciphertext.len() != rsa.size() as usize {
        return Err(CryptoError::decryption(DecryptionReason::BadPadding));
    }

    let mut plaintext = vec![0u8; rsa.size() as usize];
    match rsa.private_decrypt(&ciphertext, &mut plaintext, Padding::PKCS1_OAEP) {
        Ok(len) => {
            plaintext.truncate(len);
            return Ok(plaintext);
        }
        Err(e) => debug!("OAEP decryption failed ({}), retrying with PKCS#1 v1.5", e),
    }

    match rsa.private_decrypt(&ciphertext, &mut plaintext, Padding::PKCS1) {
        Ok(len) => {
            plaintext.truncate(len);
            // PKCS#1 v1.5 unpadding can accept garbage for a wrong key;
            // message bodies in this protocol are UTF-8, so a non-UTF-8
            // result here means the block was never meant for this key.
            if std::str::from_utf8(&plaintext).is_err() {
                return Err(CryptoError::decryption(DecryptionReason::WrongKey));
            }
            Ok(plaintext)
        }
        Err(_) => Err(CryptoError::decryption(DecryptionReason::WrongKey)),
    }
}
