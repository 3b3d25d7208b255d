pub mod constants;
pub mod error;
pub mod types;
pub mod utils;

use log::{debug, warn};

use error::AttestationError;
use types::{report::AttestationReport, ExpectedMeasurements, VerifiedOutput};
use utils::cert::verify_signed_certificate;
use utils::rsa::RsaPublicKey;

/// What an attestation service hands back: the signed report, its signature and the
/// certificate of the key that signed it.
#[derive(Debug, Clone, Copy)]
pub struct AttestationEvidence<'a> {
    /// Exact bytes the signature covers.
    pub report_body: &'a [u8],
    /// Raw big-endian RSA signature, as long as the signing key's modulus.
    pub report_signature: &'a [u8],
    /// DER report signing certificate, issued by the root.
    pub signing_certificate: &'a [u8],
}

/// Authenticates `evidence` against the pinned `root` key and returns the report body.
///
/// The report bytes are not interpreted.
pub fn verify_attestation<'a>(
    evidence: &AttestationEvidence<'a>,
    root: &RsaPublicKey,
) -> Result<&'a [u8], AttestationError> {
    // 1. Verify the report signing certificate was issued by the root.
    let signing_key =
        verify_signed_certificate(evidence.signing_certificate, root.modulus(), root.exponent())?;

    // 2. Verify the report signature with the certified key.
    if !signing_key.verify(evidence.report_body, evidence.report_signature)? {
        warn!("attestation report signature rejected");
        return Err(AttestationError::SignatureVerificationFailed);
    }

    debug!(
        "attestation report of {} bytes authenticated",
        evidence.report_body.len()
    );
    Ok(evidence.report_body)
}

/// Authenticates `evidence`, decodes the IAS report and checks the enclave measurements.
pub fn verify_attestation_report(
    evidence: &AttestationEvidence<'_>,
    root: &RsaPublicKey,
    expected: &ExpectedMeasurements,
) -> Result<VerifiedOutput, AttestationError> {
    // 1. Authenticate the report.
    let report_body = verify_attestation(evidence, root)?;

    // 2. Decode the report and the quote it carries.
    let report =
        AttestationReport::from_bytes(report_body).map_err(AttestationError::MalformedReport)?;
    let quote = report.quote().map_err(AttestationError::MalformedReport)?;

    // 3. Check the enclave identity.
    expected.check(&quote.body)?;

    if report.isv_enclave_quote_status != types::report::QuoteStatus::Ok {
        warn!(
            "attestation report {} has quote status {:?}",
            report.id, report.isv_enclave_quote_status
        );
    }

    Ok(VerifiedOutput {
        id: report.id,
        timestamp: report.timestamp,
        quote_status: report.isv_enclave_quote_status,
        advisory_ids: report.advisory_ids,
        mrenclave: quote.body.mrenclave,
        mrsigner: quote.body.mrsigner,
        isv_prod_id: quote.body.isv_prod_id.get(),
        isv_svn: quote.body.isv_svn.get(),
        report_data: quote.body.report_data,
    })
}
