//! Error types for the messaging crypto engine.
//!
//! The taxonomy separates failures by how a caller should react:
//!
//! - [`CryptoError::KeyGeneration`] - the RNG or key-generation primitive
//!   itself failed. Fatal; not worth retrying.
//! - [`CryptoError::InvalidKeyFormat`] - a precondition violation the
//!   caller can correct (malformed PEM, wrong key kind).
//! - [`CryptoError::PlaintextTooLarge`] - the caller must chunk the input
//!   or wrap it with a symmetric key first.
//! - [`CryptoError::Decryption`] - recoverable at the caller (re-request
//!   the message, or surface a "cannot decrypt" notice).
//! - [`CryptoError::Integrity`] - symmetric decryption produced invalid
//!   padding, typically a wrong key or a corrupted ciphertext/IV pair.
//! - [`CryptoError::InvalidCertificate`] - a certificate could not be
//!   parsed at all.
//!
//! Trust-decision functions ([`crate::signature::verify`] and
//! [`crate::certificate::verify`]) never return these errors: any internal
//! failure degrades to a `false` result so that a decoding bug can never be
//! mistaken for "trusted".
//!
//! # Example
//!
//! ```rust
//! use msg_crypto::error::{CryptoError, DecryptionReason};
//!
//! fn handle(err: CryptoError) -> &'static str {
//!     match err {
//!         CryptoError::Decryption { reason: DecryptionReason::CorruptData } => {
//!             "message data is garbled, ask the sender to resend"
//!         }
//!         CryptoError::Decryption { .. } => "cannot decrypt this message",
//!         CryptoError::PlaintextTooLarge { .. } => "message too long to encrypt directly",
//!         _ => "internal crypto failure",
//!     }
//! }
//! ```

/// Best-effort classification of an asymmetric decryption failure.
///
/// The split is diagnostic only. Callers must treat every reason as equally
/// untrusted input and must not base security decisions on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecryptionReason {
    /// The ciphertext is structurally invalid for the key (wrong length
    /// for the modulus).
    BadPadding,
    /// The ciphertext is structurally valid but no padding scheme accepted
    /// it, or the recovered plaintext failed the expected-format check.
    /// Most likely encrypted for a different key.
    WrongKey,
    /// The ciphertext string could not even be base64-decoded.
    CorruptData,
}

impl DecryptionReason {
    /// Short lowercase tag for log lines.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::BadPadding => "bad_padding",
            Self::WrongKey => "wrong_key",
            Self::CorruptData => "corrupt_data",
        }
    }
}

impl std::fmt::Display for DecryptionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let msg = match self {
            Self::BadPadding => "ciphertext is structurally invalid for the key",
            Self::WrongKey => "wrong key or corrupted message",
            Self::CorruptData => "ciphertext is not valid base64",
        };
        write!(f, "{}", msg)
    }
}

/// Error type for all fallible engine operations.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    /// The secure RNG or a key-generation primitive is unavailable.
    #[error("key generation failed: {context}")]
    KeyGeneration {
        /// What the primitive reported.
        context: String,
    },

    /// Key material did not parse as the expected PEM kind.
    #[error("invalid key format: {context}")]
    InvalidKeyFormat {
        /// What failed to parse.
        context: String,
    },

    /// Plaintext exceeds the modulus-derived maximum for one RSA block.
    #[error("plaintext too large: {len} bytes exceeds maximum of {max}")]
    PlaintextTooLarge {
        /// Length of the rejected plaintext.
        len: usize,
        /// Maximum length the key can encrypt in one call.
        max: usize,
    },

    /// Asymmetric decryption failed after all padding schemes were tried.
    #[error("decryption failed: {reason}")]
    Decryption {
        /// Best-effort diagnostic classification.
        reason: DecryptionReason,
    },

    /// Symmetric decryption produced invalid padding.
    #[error("integrity check failed: invalid padding after decryption")]
    Integrity,

    /// A certificate could not be parsed.
    #[error("invalid certificate: {context}")]
    InvalidCertificate {
        /// What failed to parse.
        context: String,
    },
}

impl CryptoError {
    /// Create a `KeyGeneration` error with context.
    #[must_use]
    pub fn key_generation(context: impl Into<String>) -> Self {
        Self::KeyGeneration {
            context: context.into(),
        }
    }

    /// Create an `InvalidKeyFormat` error with context.
    #[must_use]
    pub fn invalid_key_format(context: impl Into<String>) -> Self {
        Self::InvalidKeyFormat {
            context: context.into(),
        }
    }

    /// Create a `Decryption` error with the given reason.
    #[must_use]
    pub const fn decryption(reason: DecryptionReason) -> Self {
        Self::Decryption { reason }
    }

    /// Create an `InvalidCertificate` error with context.
    #[must_use]
    pub fn invalid_certificate(context: impl Into<String>) -> Self {
        Self::InvalidCertificate {
            context: context.into(),
        }
    }
}

/// A `Result` type alias using [`CryptoError`] as the error type.
pub type Result<T> = std::result::Result<T, CryptoError>;
