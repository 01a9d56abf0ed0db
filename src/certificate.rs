//! Certificate issuance and verification.
//!
//! Binds a public key to a subject identity in an X.509v3 certificate.
//! Certificates are issued either self-signed (issuer DN = subject DN,
//! signed by the subject's own key) or by a CA (issuer DN and signing key
//! belong to the CA). Verification checks the validity window and, when a
//! CA certificate is supplied, the signature against that one issuer - a
//! single-hop trust check, no chain walking.
//!
//! Issuance is deliberately non-configurable: every certificate gets the
//! same extension set and a fixed one-year validity window.
//!
//! ```rust
//! use msg_crypto::certificate::{self, CertificateBuilder, CertificateSubject};
//! use msg_crypto::keygen;
//!
//! let identity = keygen::generate_keypair()?;
//! let cert_pem = CertificateBuilder::new(&identity.public_key, &identity.private_key)
//!     .subject(CertificateSubject {
//!         common_name: "alice".to_string(),
//!         organization_name: None,
//!         email_address: "alice@example.com".to_string(),
//!     })
//!     .serial(keygen::generate_serial()?)
//!     .build()?;
//!
//! assert!(certificate::verify(&cert_pem, None));
//! # Ok::<(), msg_crypto::error::CryptoError>(())
//! ```

use log::warn;
use openssl::asn1::Asn1Time;
use openssl::bn::BigNum;
use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::pkey::PKey;
use openssl::x509::extension::{BasicConstraints, ExtendedKeyUsage, KeyUsage};
use openssl::x509::{X509Name, X509};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::error::{CryptoError, Result};

const X509_VERSION_3: i32 = 2; // X509 version 3 is represented by 2
/// Fixed certificate validity window in days.
pub const CERT_VALIDITY_DAYS: u32 = 365;
/// Organization used when the subject does not name one.
pub const DEFAULT_ORGANIZATION: &str = "Secure Messaging";

/// Distinguished-name attributes of a certificate subject or issuer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CertificateSubject {
    /// Primary identifier of the holder (username or display name).
    pub common_name: String,
    /// Organization; [`DEFAULT_ORGANIZATION`] is used when absent.
    pub organization_name: Option<String>,
    /// Contact email address.
    pub email_address: String,
}

/// Builder for issuing an X.509v3 identity certificate.
///
/// The subject's public key and the issuer's private key are fixed at
/// construction. With no explicit issuer the certificate is self-signed:
/// the issuer DN equals the subject DN, and the caller must pass the
/// subject's own key pair for both roles.
///
/// # Certificate Properties
/// - **Version**: X.509v3
/// - **Signature Algorithm**: SHA-256 with RSA
/// - **Validity**: now until now + 1 year (not configurable)
/// - **Basic Constraints**: CA=false
/// - **Key Usage**: digitalSignature, nonRepudiation, keyEncipherment,
///   dataEncipherment
/// - **Extended Key Usage**: serverAuth, clientAuth, emailProtection
pub struct CertificateBuilder {
    subject_public_key_pem: String,
    issuer_private_key_pem: String,
    subject: Option<CertificateSubject>,
    issuer: Option<CertificateSubject>,
    serial: String,
}

impl CertificateBuilder {
    /// Create a builder for a certificate over `subject_public_key_pem`,
    /// to be signed with `issuer_private_key_pem`.
    pub fn new(subject_public_key_pem: &str, issuer_private_key_pem: &str) -> Self {
        Self {
            subject_public_key_pem: subject_public_key_pem.to_string(),
            issuer_private_key_pem: issuer_private_key_pem.to_string(),
            subject: None,
            issuer: None,
            serial: String::new(),
        }
    }

    /// Set the subject identity. Required.
    pub fn subject(mut self, subject: CertificateSubject) -> Self {
        self.subject = Some(subject);
        self
    }

    /// Set the issuer identity. Omit for a self-signed certificate.
    pub fn issuer(mut self, issuer: CertificateSubject) -> Self {
        self.issuer = Some(issuer);
        self
    }

    /// Set the serial number as a hex string (see
    /// [`crate::keygen::generate_serial`]).
    pub fn serial(mut self, serial: impl Into<String>) -> Self {
        self.serial = serial.into();
        self
    }

    /// Issue the certificate, returning it PEM-encoded.
    ///
    /// # Errors
    /// - [`CryptoError::InvalidKeyFormat`] if either key does not parse.
    /// - [`CryptoError::InvalidCertificate`] if the subject is missing or
    ///   the serial is not a hex string.
    /// - [`CryptoError::KeyGeneration`] if a certificate primitive fails.
    pub fn build(self) -> Result<String> {
        let subject = self
            .subject
            .ok_or_else(|| CryptoError::invalid_certificate("subject is required"))?;

        let public_key = PKey::public_key_from_pem(self.subject_public_key_pem.as_bytes())
            .map_err(|e| CryptoError::invalid_key_format(format!("subject public key: {}", e)))?;
        let signing_key = crate::keygen::parse_private_key(&self.issuer_private_key_pem)?;

        let mut builder = X509::builder()
            .map_err(|e| CryptoError::key_generation(format!("X509 builder: {}", e)))?;
        builder
            .set_version(X509_VERSION_3)
            .map_err(|e| CryptoError::key_generation(format!("set version: {}", e)))?;

        let serial_bn = BigNum::from_hex_str(&self.serial)
            .map_err(|e| CryptoError::invalid_certificate(format!("serial is not hex: {}", e)))?;
        let serial = serial_bn
            .to_asn1_integer()
            .map_err(|e| CryptoError::key_generation(format!("serial encoding: {}", e)))?;
        builder
            .set_serial_number(&serial)
            .map_err(|e| CryptoError::key_generation(format!("set serial: {}", e)))?;

        let subject_name = build_name(&subject)?;
        builder
            .set_subject_name(&subject_name)
            .map_err(|e| CryptoError::key_generation(format!("set subject: {}", e)))?;

        // Issuer DN defaults to the subject DN for self-signed certificates
        let issuer_name = match &self.issuer {
            Some(issuer) => build_name(issuer)?,
            None => build_name(&subject)?,
        };
        builder
            .set_issuer_name(&issuer_name)
            .map_err(|e| CryptoError::key_generation(format!("set issuer: {}", e)))?;

        let not_before = Asn1Time::days_from_now(0)
            .map_err(|e| CryptoError::key_generation(format!("not_before: {}", e)))?;
        builder
            .set_not_before(&not_before)
            .map_err(|e| CryptoError::key_generation(format!("set not_before: {}", e)))?;
        let not_after = Asn1Time::days_from_now(CERT_VALIDITY_DAYS)
            .map_err(|e| CryptoError::key_generation(format!("not_after: {}", e)))?;
        builder
            .set_not_after(&not_after)
            .map_err(|e| CryptoError::key_generation(format!("set not_after: {}", e)))?;

        builder
            .set_pubkey(&public_key)
            .map_err(|e| CryptoError::key_generation(format!("set public key: {}", e)))?;

        // End-entity certificate: no CA capability
        let bc = BasicConstraints::new()
            .build()
            .map_err(|e| CryptoError::key_generation(format!("BasicConstraints: {}", e)))?;
        builder
            .append_extension(bc)
            .map_err(|e| CryptoError::key_generation(format!("add BasicConstraints: {}", e)))?;

        let mut ku = KeyUsage::new();
        ku.digital_signature();
        ku.non_repudiation();
        ku.key_encipherment();
        ku.data_encipherment();
        let ku = ku
            .build()
            .map_err(|e| CryptoError::key_generation(format!("KeyUsage: {}", e)))?;
        builder
            .append_extension(ku)
            .map_err(|e| CryptoError::key_generation(format!("add KeyUsage: {}", e)))?;

        let mut eku = ExtendedKeyUsage::new();
        eku.server_auth();
        eku.client_auth();
        eku.email_protection();
        let eku = eku
            .build()
            .map_err(|e| CryptoError::key_generation(format!("ExtendedKeyUsage: {}", e)))?;
        builder
            .append_extension(eku)
            .map_err(|e| CryptoError::key_generation(format!("add ExtendedKeyUsage: {}", e)))?;

        builder
            .sign(&signing_key, MessageDigest::sha256())
            .map_err(|e| CryptoError::key_generation(format!("certificate signing: {}", e)))?;

        let pem = builder
            .build()
            .to_pem()
            .map_err(|e| CryptoError::key_generation(format!("PEM encoding: {}", e)))?;
        String::from_utf8(pem)
            .map_err(|e| CryptoError::key_generation(format!("PEM is not UTF-8: {}", e)))
    }
}

/// Check a certificate's validity. Never panics, never errors.
///
/// Returns `true` when `notBefore <= now <= notAfter` and, if
/// `ca_cert_pem` is supplied, the certificate's signature verifies under
/// the CA's public key. Malformed input of any sort is `false`.
#[must_use]
pub fn verify(cert_pem: &str, ca_cert_pem: Option<&str>) -> bool {
    let result = (|| -> Result<bool> {
        let cert = X509::from_pem(cert_pem.as_bytes())
            .map_err(|e| CryptoError::invalid_certificate(format!("parse: {}", e)))?;

        let now = Asn1Time::days_from_now(0)
            .map_err(|e| CryptoError::key_generation(format!("clock: {}", e)))?;
        let started = cert
            .not_before()
            .compare(&now)
            .map_err(|e| CryptoError::invalid_certificate(format!("not_before: {}", e)))?
            != Ordering::Greater;
        let unexpired = cert
            .not_after()
            .compare(&now)
            .map_err(|e| CryptoError::invalid_certificate(format!("not_after: {}", e)))?
            != Ordering::Less;
        if !started || !unexpired {
            return Ok(false);
        }

        if let Some(ca_pem) = ca_cert_pem {
            let ca = X509::from_pem(ca_pem.as_bytes())
                .map_err(|e| CryptoError::invalid_certificate(format!("CA parse: {}", e)))?;
            let ca_key = ca
                .public_key()
                .map_err(|e| CryptoError::invalid_certificate(format!("CA key: {}", e)))?;
            let signed_by_ca = cert
                .verify(&ca_key)
                .map_err(|e| CryptoError::invalid_certificate(format!("signature: {}", e)))?;
            return Ok(signed_by_ca);
        }

        Ok(true)
    })();

    match result {
        Ok(valid) => valid,
        Err(e) => {
            warn!("certificate verification degraded to false: {}", e);
            false
        }
    }
}

/// Extract the embedded public key, re-encoded as SPKI PEM.
///
/// # Errors
/// [`CryptoError::InvalidCertificate`] if the certificate or its key
/// cannot be parsed.
pub fn extract_public_key(cert_pem: &str) -> Result<String> {
    let cert = X509::from_pem(cert_pem.as_bytes())
        .map_err(|e| CryptoError::invalid_certificate(format!("parse: {}", e)))?;
    let pem = cert
        .public_key()
        .map_err(|e| CryptoError::invalid_certificate(format!("public key: {}", e)))?
        .public_key_to_pem()
        .map_err(|e| CryptoError::invalid_certificate(format!("SPKI encoding: {}", e)))?;
    String::from_utf8(pem)
        .map_err(|e| CryptoError::invalid_certificate(format!("PEM is not UTF-8: {}", e)))
}

fn build_name(subject: &CertificateSubject) -> Result<X509Name> {
    let mut name = X509Name::builder()
        .map_err(|e| CryptoError::key_generation(format!("name builder: {}", e)))?;
    name.append_entry_by_nid(Nid::COMMONNAME, &subject.common_name)
        .map_err(|e| CryptoError::key_generation(format!("set CN: {}", e)))?;
    let organization = subject
        .organization_name
        .as_deref()
        .unwrap_or(DEFAULT_ORGANIZATION);
    name.append_entry_by_nid(Nid::ORGANIZATIONNAME, organization)
        .map_err(|e| CryptoError::key_generation(format!("set organization: {}", e)))?;
    name.append_entry_by_nid(Nid::PKCS9_EMAILADDRESS, &subject.email_address)
        .map_err(|e| CryptoError::key_generation(format!("set email: {}", e)))?;
    Ok(name.build())
}
