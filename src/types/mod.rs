use anyhow::Context;
use chrono::NaiveDateTime;
use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::{AttestationError, CertificateError, Measurement};
use crate::utils::cert::{extract_subject_public_key, verify_signed_certificate};
use crate::utils::rsa::RsaPublicKey;
use crate::AttestationEvidence;

use self::quote::EnclaveReportBody;
use self::report::QuoteStatus;

pub mod quote;
pub mod report;

/// Enclave identity a verifier insists on. `None` skips the check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpectedMeasurements {
    #[serde(default, with = "crate::utils::measurement_hex")]
    pub mrenclave: Option<[u8; 32]>,
    #[serde(default, with = "crate::utils::measurement_hex")]
    pub mrsigner: Option<[u8; 32]>,
}

impl ExpectedMeasurements {
    pub fn check(&self, body: &EnclaveReportBody) -> Result<(), AttestationError> {
        check_measurement(Measurement::MrEnclave, self.mrenclave, body.mrenclave)?;
        check_measurement(Measurement::MrSigner, self.mrsigner, body.mrsigner)
    }
}

fn check_measurement(
    measurement: Measurement,
    expected: Option<[u8; 32]>,
    found: [u8; 32],
) -> Result<(), AttestationError> {
    match expected {
        Some(expected) if expected != found => {
            warn!(
                "{} mismatch, expected {} but got {}",
                measurement,
                hex::encode(expected),
                hex::encode(found)
            );
            Err(AttestationError::MeasurementMismatch {
                measurement,
                expected,
                found,
            })
        }
        _ => Ok(()),
    }
}

/// Trust anchor and enclave policy for verifying attestation reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifierConfig {
    pub root: RsaPublicKey,
    #[serde(default)]
    pub expected: ExpectedMeasurements,
}

impl VerifierConfig {
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let config: VerifierConfig =
            serde_json::from_str(json).context("Failed to parse verifier config")?;
        if config.root.modulus().is_empty() {
            anyhow::bail!("Root key modulus is empty");
        }
        Ok(config)
    }

    /// Pins the key of a self-signed root certificate. The self-signature must verify.
    pub fn from_root_certificate(
        root_certificate: &[u8],
        expected: ExpectedMeasurements,
    ) -> Result<Self, CertificateError> {
        let root = extract_subject_public_key(root_certificate)?;
        let root = verify_signed_certificate(root_certificate, root.modulus(), root.exponent())?;
        Ok(VerifierConfig { root, expected })
    }

    pub fn verify(&self, evidence: &AttestationEvidence<'_>) -> Result<VerifiedOutput, AttestationError> {
        crate::verify_attestation_report(evidence, &self.root, &self.expected)
    }
}

/// Authenticated contents of an attestation report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerifiedOutput {
    pub id: String,
    pub timestamp: NaiveDateTime,
    pub quote_status: QuoteStatus,
    pub advisory_ids: Vec<String>,
    #[serde(with = "hex")]
    pub mrenclave: [u8; 32],
    #[serde(with = "hex")]
    pub mrsigner: [u8; 32],
    pub isv_prod_id: u16,
    pub isv_svn: u16,
    /// Payload the enclave bound to the report.
    #[serde(with = "hex")]
    pub report_data: [u8; 64],
}
