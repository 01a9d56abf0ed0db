//! msg-crypto - End-to-End Messaging Crypto Engine
//!
//! The cryptographic core of a pairwise secure-messaging system: each user
//! holds an RSA key pair, messages are encrypted for a single recipient and
//! signed by the sender, and X.509 certificates bind identities to public
//! keys.
//!
//! # Overview
//!
//! The engine is a library of pure, synchronous functions. It keeps no
//! state between calls and no copy of any key it generates or receives -
//! key material moves in and out as PEM-encoded strings, and persistence is
//! entirely the caller's concern. The only shared resource is OpenSSL's
//! thread-safe RNG, so every operation can run concurrently on independent
//! messages.
//!
//! A message exchange between two identities looks like this:
//!
//! ```no_run
//! use msg_crypto::{asymmetric, keygen, signature};
//!
//! # fn main() -> Result<(), msg_crypto::error::CryptoError> {
//! let alice = keygen::generate_keypair()?;
//! let bob = keygen::generate_keypair()?;
//!
//! // Alice -> Bob: encrypt for the recipient, sign as the sender
//! let ciphertext = asymmetric::encrypt(b"hello bob", &bob.public_key)?;
//! let sig = signature::create(b"hello bob", &alice.private_key)?;
//!
//! // Bob: decrypt with his private key, verify against Alice's public key
//! let plaintext = asymmetric::decrypt(&ciphertext, &bob.private_key)?;
//! assert!(signature::verify(&plaintext, &sig, &alice.public_key));
//! # Ok(())
//! # }
//! ```
//!
//! # Module Overview
//!
//! ## [`pem`]
//!
//! Structural and parseability validation for PEM key/certificate strings.
//! The precondition gate in front of every other operation.
//!
//! ```no_run
//! use msg_crypto::pem::{is_valid_pem, PemKind};
//!
//! assert!(!is_valid_pem("garbage", PemKind::PrivateKey));
//! ```
//!
//! ## [`keygen`]
//!
//! RSA-2048 key pairs (PKCS#8 + SPKI PEM), AES-256 keys and certificate
//! serial numbers, all drawn from the secure RNG.
//!
//! ```no_run
//! let keypair = msg_crypto::keygen::generate_keypair()?;
//! let aes_key = msg_crypto::keygen::generate_aes_key()?;
//! # Ok::<(), msg_crypto::error::CryptoError>(())
//! ```
//!
//! ## [`symmetric`]
//!
//! AES-256-CBC for payloads of arbitrary length, fresh random IV per call.
//!
//! ```no_run
//! use msg_crypto::{keygen, symmetric};
//!
//! let key = keygen::generate_aes_key()?;
//! let payload = symmetric::encrypt(b"large attachment", &key)?;
//! let plaintext = symmetric::decrypt(&payload.ciphertext, &key, &payload.iv)?;
//! # Ok::<(), msg_crypto::error::CryptoError>(())
//! ```
//!
//! ## [`asymmetric`]
//!
//! RSA OAEP-SHA1 for message bodies and key wrapping, with a PKCS#1 v1.5
//! decryption fallback for legacy peers. One block per call; a 2048-bit key
//! carries at most 214 plaintext bytes.
//!
//! ## [`signature`]
//!
//! Detached SHA-256 signatures. Creation emits canonical base64;
//! verification runs a decode-and-verify cascade across hex/base64 and two
//! independent back-ends, and never raises.
//!
//! ## [`certificate`]
//!
//! X.509v3 identity certificates: issuance (self-signed or CA-signed) with
//! a fixed extension set and one-year validity, boolean verification with
//! an optional single-hop chain-of-trust check, and public key extraction.
//!
//! ## [`diagnostics`]
//!
//! End-to-end engine self-checks with throwaway keys, reported as a
//! structured health summary.
//!
//! # Error Handling
//!
//! Fallible operations return [`error::CryptoError`], a typed taxonomy
//! callers can match on (see [`error`] for the full propagation policy).
//! The two trust-decision functions - [`signature::verify`] and
//! [`certificate::verify`] - never return errors at all: any internal
//! failure degrades to `false`, so a decoding bug can never be mistaken
//! for a verified signature or a trusted certificate.

pub mod asymmetric;
pub mod certificate;
pub mod diagnostics;
pub mod error;
pub mod keygen;
pub mod pem;
pub mod signature;
pub mod symmetric;

pub use error::{CryptoError, DecryptionReason};

#[cfg(test)]
mod tests {
    use crate::certificate::{self, CertificateBuilder, CertificateSubject};
    use crate::error::{CryptoError, DecryptionReason};
    use crate::{asymmetric, keygen, pem, signature, symmetric};

    /// The full pairwise messaging exchange: encrypt for the recipient,
    /// sign as the sender, decrypt and verify on the other side.
    #[test]
    fn test_message_exchange_between_two_identities() {
        let alice = keygen::generate_keypair().unwrap();
        let bob = keygen::generate_keypair().unwrap();

        assert!(pem::is_valid_pem(&bob.public_key, pem::PemKind::PublicKey));
        assert!(pem::is_valid_pem(&alice.private_key, pem::PemKind::PrivateKey));

        let ciphertext = asymmetric::encrypt(b"hello", &bob.public_key).unwrap();
        let sig = signature::create(b"hello", &alice.private_key).unwrap();

        let plaintext = asymmetric::decrypt(&ciphertext, &bob.private_key).unwrap();
        assert_eq!(plaintext, b"hello");

        assert!(signature::verify(&plaintext, &sig, &alice.public_key));
        assert!(!signature::verify(&plaintext, &sig, &bob.public_key));
    }

    /// Large payloads are wrapped with an AES key, and the AES key itself
    /// fits inside one RSA block.
    #[test]
    fn test_hybrid_wrap_for_large_message() {
        let recipient = keygen::generate_keypair().unwrap();
        let aes_key = keygen::generate_aes_key().unwrap();
        let large_message = vec![b'm'; 10_000];

        let payload = symmetric::encrypt(&large_message, &aes_key).unwrap();
        let wrapped_key =
            asymmetric::encrypt(aes_key.expose_bytes(), &recipient.public_key).unwrap();

        let unwrapped = asymmetric::decrypt(&wrapped_key, &recipient.private_key).unwrap();
        let mut recovered = [0u8; keygen::AES_256_KEY_SIZE];
        recovered.copy_from_slice(&unwrapped);
        let recovered_key = keygen::SymmetricKey::from_bytes(recovered);

        let plaintext =
            symmetric::decrypt(&payload.ciphertext, &recovered_key, &payload.iv).unwrap();
        assert_eq!(plaintext, large_message);
    }

    /// Certificates bind an identity's key; the message path is unaffected.
    #[test]
    fn test_certificate_binds_identity_key() {
        let alice = keygen::generate_keypair().unwrap();
        let serial = keygen::generate_serial().unwrap();
        let cert = CertificateBuilder::new(&alice.public_key, &alice.private_key)
            .subject(CertificateSubject {
                common_name: "alice".to_string(),
                organization_name: Some("Example Org".to_string()),
                email_address: "alice@example.com".to_string(),
            })
            .serial(serial)
            .build()
            .unwrap();

        assert!(pem::is_valid_pem(&cert, pem::PemKind::Certificate));
        assert!(certificate::verify(&cert, None));

        // A signature verifies against the key extracted from the certificate
        let key_from_cert = certificate::extract_public_key(&cert).unwrap();
        let sig = signature::create(b"signed under a certified key", &alice.private_key).unwrap();
        assert!(signature::verify(
            b"signed under a certified key",
            &sig,
            &key_from_cert
        ));
    }

    #[test]
    fn test_corrupt_ciphertext_reports_corrupt_data() {
        let recipient = keygen::generate_keypair().unwrap();
        let err = asymmetric::decrypt("*** definitely not base64 ***", &recipient.private_key)
            .unwrap_err();
        assert!(matches!(
            err,
            CryptoError::Decryption {
                reason: DecryptionReason::CorruptData
            }
        ));
    }
}
