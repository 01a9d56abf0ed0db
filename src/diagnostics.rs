//! Engine self-checks.
//!
//! [`run_diagnostics`] exercises the engine end-to-end with throwaway keys
//! and reports what failed, so an integrator can tell a broken crypto
//! backend apart from bad stored key material before any real message is
//! touched. It never errors; failures are collected as issue strings.

use log::{info, warn};

use crate::{asymmetric, keygen, signature};

/// Outcome of one diagnostics run.
#[derive(Debug, Clone)]
pub struct DiagnosticsReport {
    /// Key-pair generation produced both PEM halves.
    pub key_generation: bool,
    /// Encrypt and decrypt under a single identity round-tripped.
    pub self_encryption: bool,
    /// Encrypt for a second identity and decrypt with its key round-tripped.
    pub cross_encryption: bool,
    /// Sign and verify succeeded, in base64 and re-encoded hex form.
    pub signature_roundtrip: bool,
    /// Human-readable description of each failed check.
    pub issues: Vec<String>,
}

impl DiagnosticsReport {
    /// True when every check passed.
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Run all engine self-checks. Never errors.
#[must_use]
pub fn run_diagnostics() -> DiagnosticsReport {
    let mut report = DiagnosticsReport {
        key_generation: false,
        self_encryption: false,
        cross_encryption: false,
        signature_roundtrip: false,
        issues: Vec::new(),
    };

    let keypair = match keygen::generate_keypair() {
        Ok(keypair) => {
            report.key_generation = true;
            keypair
        }
        Err(e) => {
            report.issues.push(format!("key generation failed: {}", e));
            warn!("diagnostics aborted: {}", report.issues[0]);
            return report;
        }
    };

    // Self encryption: one identity encrypting to itself
    let message = b"diagnostics probe message";
    match asymmetric::encrypt(message, &keypair.public_key)
        .and_then(|ciphertext| asymmetric::decrypt(&ciphertext, &keypair.private_key))
    {
        Ok(plaintext) if plaintext == message => report.self_encryption = true,
        Ok(_) => report
            .issues
            .push("self encryption: plaintext mismatch after roundtrip".to_string()),
        Err(e) => report.issues.push(format!("self encryption failed: {}", e)),
    }

    // Cross encryption: sender encrypting for a distinct recipient
    match keygen::generate_keypair() {
        Ok(recipient) => {
            match asymmetric::encrypt(message, &recipient.public_key)
                .and_then(|ciphertext| asymmetric::decrypt(&ciphertext, &recipient.private_key))
            {
                Ok(plaintext) if plaintext == message => report.cross_encryption = true,
                Ok(_) => report
                    .issues
                    .push("cross encryption: plaintext mismatch after roundtrip".to_string()),
                Err(e) => report.issues.push(format!("cross encryption failed: {}", e)),
            }
        }
        Err(e) => report
            .issues
            .push(format!("cross encryption: recipient key generation failed: {}", e)),
    }

    // Signature compatibility: the canonical base64 form and a hex
    // re-encoding must both verify through the cascade
    match signature::create(message, &keypair.private_key) {
        Ok(sig_b64) => {
            let verified_b64 = signature::verify(message, &sig_b64, &keypair.public_key);
            let verified_hex = {
                use base64::engine::general_purpose::STANDARD;
                use base64::Engine;
                match STANDARD.decode(&sig_b64) {
                    Ok(raw) => signature::verify(message, &hex::encode(raw), &keypair.public_key),
                    Err(_) => false,
                }
            };
            if verified_b64 && verified_hex {
                report.signature_roundtrip = true;
            } else {
                report.issues.push(format!(
                    "signature roundtrip failed: base64 verified={}, hex verified={}",
                    verified_b64, verified_hex
                ));
            }
        }
        Err(e) => report.issues.push(format!("signature creation failed: {}", e)),
    }

    if report.is_healthy() {
        info!("diagnostics passed: all engine checks healthy");
    } else {
        warn!("diagnostics found {} issue(s)", report.issues.len());
    }

    report
}
