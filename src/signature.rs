//! Detached SHA-256 signatures with multi-encoding verification.
//!
//! [`create`] signs the exact byte sequence it is given (RSA PKCS#1 v1.5
//! over a SHA-256 digest) and emits base64, the canonical encoding. No
//! randomization is added at this layer.
//!
//! [`verify`] is deliberately more tolerant than [`create`]: historical
//! producers emitted signatures in hex as well as base64, through more than
//! one library implementation, and the wire protocol carries no format tag.
//! Verification therefore runs an ordered cascade of decode-and-verify
//! strategies and returns the result of the first strategy that both
//! decodes the signature and completes a verification call. The cascade is
//! format detection, not voting.
//!
//! `verify` never panics and never returns an error: its outcome feeds
//! directly into trust decisions, and an exception path out of it would be
//! a bypass. Internal failures degrade to `false`. Callers that know the
//! exact encoding and want hard failures instead of guessing use
//! [`verify_strict`].
//!
//! ```rust
//! use msg_crypto::{keygen, signature};
//!
//! let keypair = keygen::generate_keypair()?;
//! let sig = signature::create(b"hello", &keypair.private_key)?;
//! assert!(signature::verify(b"hello", &sig, &keypair.public_key));
//! assert!(!signature::verify(b"tampered", &sig, &keypair.public_key));
//! # Ok::<(), msg_crypto::error::CryptoError>(())
//! ```

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use log::{debug, warn};
use openssl::hash::MessageDigest;
use openssl::pkey::{PKey, Public};
use openssl::rsa::Padding;
use openssl::sign::{Signer, Verifier};

use crate::error::{CryptoError, DecryptionReason, Result};

/// Wire encoding of a detached signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureEncoding {
    /// Lowercase or uppercase hex.
    Hex,
    /// Standard base64 with padding.
    Base64,
}

impl SignatureEncoding {
    fn decode(self, signature: &str) -> Option<Vec<u8>> {
        match self {
            Self::Hex => hex::decode(signature).ok(),
            Self::Base64 => STANDARD.decode(signature).ok(),
        }
    }

    const fn label(self) -> &'static str {
        match self {
            Self::Hex => "hex",
            Self::Base64 => "base64",
        }
    }
}

/// Verification back-end for one cascade strategy.
///
/// The two back-ends are independent code paths on purpose: a producer
/// whose signatures one back-end rejects outright may still be understood
/// by the other, mirroring the heterogeneous producer libraries observed
/// in the field.
#[derive(Debug, Clone, Copy)]
enum Backend {
    /// High-level EVP verification (digest-then-verify).
    Evp,
    /// Raw RSA public decrypt of the signature block, compared against the
    /// expected `DigestInfo` structure.
    RawRsa,
}

impl Backend {
    const fn label(self) -> &'static str {
        match self {
            Self::Evp => "evp",
            Self::RawRsa => "raw-rsa",
        }
    }
}

/// The decode-and-verify cascade, ordered to match observed producer
/// behavior: earliest-specified format first.
const STRATEGIES: [(SignatureEncoding, Backend); 4] = [
    (SignatureEncoding::Hex, Backend::Evp),
    (SignatureEncoding::Base64, Backend::Evp),
    (SignatureEncoding::Base64, Backend::RawRsa),
    (SignatureEncoding::Hex, Backend::RawRsa),
];

/// DER prefix of the PKCS#1 `DigestInfo` structure for SHA-256.
const SHA256_DIGEST_INFO_PREFIX: [u8; 19] = [
    0x30, 0x31, 0x30, 0x0d, 0x06, 0x09, 0x60, 0x86, 0x48, 0x01, 0x65, 0x03, 0x04, 0x02, 0x01,
    0x05, 0x00, 0x04, 0x20,
];

/// Sign `data` with the private key, returning the signature base64-encoded.
///
/// Computes SHA-256 over `data` and signs with RSA PKCS#1 v1.5. The scheme
/// is deterministic: signing the same data with the same key yields the
/// same signature.
///
/// # Errors
/// [`CryptoError::InvalidKeyFormat`] if the private key does not parse;
/// [`CryptoError::KeyGeneration`] if the signing primitive fails.
pub fn create(data: &[u8], private_key_pem: &str) -> Result<String> {
    let pkey = crate::keygen::parse_private_key(private_key_pem)?;
    let mut signer = Signer::new(MessageDigest::sha256(), &pkey)
        .map_err(|e| CryptoError::key_generation(format!("signer init failed: {}", e)))?;
    signer
        .update(data)
        .map_err(|e| CryptoError::key_generation(format!("signer update failed: {}", e)))?;
    let signature = signer
        .sign_to_vec()
        .map_err(|e| CryptoError::key_generation(format!("signing failed: {}", e)))?;
    Ok(STANDARD.encode(signature))
}

/// Verify a detached signature over `data`. Never panics, never errors.
///
/// Strategies are attempted in order:
///
/// 1. hex, primary (EVP) back-end
/// 2. base64, primary back-end
/// 3. base64, secondary (raw RSA) back-end
/// 4. hex, secondary back-end
///
/// A strategy whose decode fails is skipped. The first strategy whose
/// verification call completes decides the result - `true` or `false` as
/// the back-end reported it. If no strategy completes, the result is
/// `false`.
#[must_use]
pub fn verify(data: &[u8], signature: &str, public_key_pem: &str) -> bool {
    let pkey = match PKey::public_key_from_pem(public_key_pem.as_bytes()) {
        Ok(pkey) => pkey,
        Err(e) => {
            warn!("signature verification degraded to false: bad public key: {}", e);
            return false;
        }
    };

    for (encoding, backend) in STRATEGIES {
        let sig_bytes = match encoding.decode(signature) {
            Some(bytes) => bytes,
            None => continue,
        };
        match run_backend(backend, &pkey, data, &sig_bytes) {
            Ok(valid) => {
                debug!(
                    "signature verification completed via {}/{}: {}",
                    encoding.label(),
                    backend.label(),
                    valid
                );
                return valid;
            }
            Err(e) => {
                debug!(
                    "signature strategy {}/{} did not complete: {}",
                    encoding.label(),
                    backend.label(),
                    e
                );
            }
        }
    }

    warn!("signature verification degraded to false: no strategy completed");
    false
}

/// Verify a signature whose encoding the caller knows.
///
/// Unlike [`verify`] this does not guess: an undecodable signature or an
/// unparseable key is a hard error. A verification call that completes
/// (including one the back-end rejects internally) yields `Ok(bool)`.
///
/// # Errors
/// [`CryptoError::Decryption`] with [`DecryptionReason::CorruptData`] if
/// the signature does not decode under `encoding`;
/// [`CryptoError::InvalidKeyFormat`] if the public key does not parse.
pub fn verify_strict(
    data: &[u8],
    signature: &str,
    public_key_pem: &str,
    encoding: SignatureEncoding,
) -> Result<bool> {
    let sig_bytes = encoding
        .decode(signature)
        .ok_or(CryptoError::decryption(DecryptionReason::CorruptData))?;
    let pkey = PKey::public_key_from_pem(public_key_pem.as_bytes())
        .map_err(|e| CryptoError::invalid_key_format(format!("public key: {}", e)))?;
    Ok(run_backend(Backend::Evp, &pkey, data, &sig_bytes).unwrap_or(false))
}

/// SHA-256 digest of `data`, hex-encoded.
///
/// Used for message fingerprints in logs and delivery receipts.
pub fn sha256_hex(data: &[u8]) -> Result<String> {
    let digest = openssl::hash::hash(MessageDigest::sha256(), data)
        .map_err(|e| CryptoError::key_generation(format!("SHA-256 digest failed: {}", e)))?;
    Ok(hex::encode(digest))
}

fn run_backend(
    backend: Backend,
    pkey: &PKey<Public>,
    data: &[u8],
    signature: &[u8],
) -> std::result::Result<bool, openssl::error::ErrorStack> {
    match backend {
        Backend::Evp => {
            let mut verifier = Verifier::new(MessageDigest::sha256(), pkey)?;
            verifier.update(data)?;
            verifier.verify(signature)
        }
        Backend::RawRsa => verify_raw_rsa(pkey, data, signature),
    }
}

/// Recover the signature block with a raw RSA public decrypt and compare it
/// against the expected `DigestInfo || digest` bytes in constant time.
fn verify_raw_rsa(
    pkey: &PKey<Public>,
    data: &[u8],
    signature: &[u8],
) -> std::result::Result<bool, openssl::error::ErrorStack> {
    let rsa = pkey.rsa()?;
    let mut recovered = vec![0u8; rsa.size() as usize];
    let len = rsa.public_decrypt(signature, &mut recovered, Padding::PKCS1)?;
    recovered.truncate(len);

    let digest = openssl::hash::hash(MessageDigest::sha256(), data)?;
    let mut expected = SHA256_DIGEST_INFO_PREFIX.to_vec();
    expected.extend_from_slice(&digest);

    if recovered.len() != expected.len() {
        return Ok(false);
    }
    Ok(openssl::memcmp::eq(&recovered, &expected))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keygen;

    #[test]
    fn test_sign_verify_roundtrip() {
        let keypair = keygen::generate_keypair().unwrap();
        let sig = create(b"hello", &keypair.private_key).unwrap();
        assert!(verify(b"hello", &sig, &keypair.public_key));
    }

    #[test]
    fn test_signing_is_deterministic() {
        let keypair = keygen::generate_keypair().unwrap();
        let a = create(b"same data", &keypair.private_key).unwrap();
        let b = create(b"same data", &keypair.private_key).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_wrong_key_rejected() {
        let alice = keygen::generate_keypair().unwrap();
        let bob = keygen::generate_keypair().unwrap();
        let sig = create(b"hello", &alice.private_key).unwrap();
        assert!(verify(b"hello", &sig, &alice.public_key));
        assert!(!verify(b"hello", &sig, &bob.public_key));
    }

    #[test]
    fn test_tampered_data_rejected() {
        let keypair = keygen::generate_keypair().unwrap();
        let sig = create(b"original", &keypair.private_key).unwrap();
        assert!(!verify(b"modified", &sig, &keypair.public_key));
    }

    #[test]
    fn test_flipped_signature_byte_rejected() {
        let keypair = keygen::generate_keypair().unwrap();
        let sig = create(b"payload", &keypair.private_key).unwrap();
        let mut raw = STANDARD.decode(&sig).unwrap();
        raw[10] ^= 0x01;
        let tampered = STANDARD.encode(raw);
        assert!(!verify(b"payload", &tampered, &keypair.public_key));
    }

    #[test]
    fn test_cascade_accepts_hex_and_base64_producers() {
        // Same (data, key) pair, one producer emitting base64 and one
        // emitting hex, both through the same verify call.
        let keypair = keygen::generate_keypair().unwrap();
        let sig_b64 = create(b"cross-format", &keypair.private_key).unwrap();
        let sig_hex = hex::encode(STANDARD.decode(&sig_b64).unwrap());

        assert!(verify(b"cross-format", &sig_b64, &keypair.public_key));
        assert!(verify(b"cross-format", &sig_hex, &keypair.public_key));
    }

    #[test]
    fn test_undecodable_signature_is_false() {
        let keypair = keygen::generate_keypair().unwrap();
        assert!(!verify(b"data", "!!neither hex nor base64!!", &keypair.public_key));
        assert!(!verify(b"data", "", &keypair.public_key));
    }

    #[test]
    fn test_bad_public_key_is_false_not_panic() {
        assert!(!verify(b"data", "aabbcc", "not a pem"));
    }

    #[test]
    fn test_raw_rsa_backend_agrees_with_evp() {
        let keypair = keygen::generate_keypair().unwrap();
        let sig = create(b"backend parity", &keypair.private_key).unwrap();
        let sig_bytes = STANDARD.decode(&sig).unwrap();
        let pkey = PKey::public_key_from_pem(keypair.public_key.as_bytes()).unwrap();

        assert!(verify_raw_rsa(&pkey, b"backend parity", &sig_bytes).unwrap());
        assert!(!verify_raw_rsa(&pkey, b"different data", &sig_bytes).unwrap());
    }

    #[test]
    fn test_verify_strict_known_encodings() {
        let keypair = keygen::generate_keypair().unwrap();
        let sig_b64 = create(b"strict", &keypair.private_key).unwrap();
        let sig_hex = hex::encode(STANDARD.decode(&sig_b64).unwrap());

        assert!(verify_strict(b"strict", &sig_b64, &keypair.public_key, SignatureEncoding::Base64)
            .unwrap());
        assert!(
            verify_strict(b"strict", &sig_hex, &keypair.public_key, SignatureEncoding::Hex)
                .unwrap()
        );
    }

    #[test]
    fn test_verify_strict_wrong_encoding_is_hard_error() {
        let keypair = keygen::generate_keypair().unwrap();
        let sig_b64 = create(b"strict", &keypair.private_key).unwrap();
        // A base64 signature with '+', '/' or '=' is not valid hex
        match verify_strict(b"strict", &sig_b64, &keypair.public_key, SignatureEncoding::Hex) {
            Err(e) => assert!(matches!(
                e,
                CryptoError::Decryption {
                    reason: DecryptionReason::CorruptData
                }
            )),
            // Rarely the base64 string is also valid hex; then the
            // verification completes and must report false.
            Ok(valid) => assert!(!valid),
        }
    }

    #[test]
    fn test_sha256_hex() {
        // SHA-256 of the empty string is a fixed vector
        assert_eq!(
            sha256_hex(b"").unwrap(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(sha256_hex(b"hello").unwrap().len(), 64);
    }
}
