use anyhow::{anyhow, bail, Context};
use log::{debug, warn};

use crate::constants::SHA256_WITH_RSA_ENCRYPTION_OID;
use crate::error::CertificateError;
use crate::utils::der::{
    DerNode, TAG_BIT_STRING, TAG_CONTEXT_0, TAG_INTEGER, TAG_OID, TAG_SEQUENCE,
};
use crate::utils::rsa::RsaPublicKey;

const PEM_CERTIFICATE_TAG: &str = "CERTIFICATE";

/// Verifies that `cert` was signed by the holder of `(parent_modulus, parent_exponent)`
/// and returns the subject public key it certifies.
///
/// Only the signature is checked. Validity period, key usage, basic constraints
/// and revocation are left to the caller.
pub fn verify_signed_certificate(
    cert: &[u8],
    parent_modulus: &[u8],
    parent_exponent: &[u8],
) -> Result<RsaPublicKey, CertificateError> {
    // Certificate ::= SEQUENCE { tbsCertificate, signatureAlgorithm, signatureValue }
    let certificate = DerNode::root(cert)?.expect_tag(TAG_SEQUENCE)?;
    let tbs_certificate = certificate.first_child()?.expect_tag(TAG_SEQUENCE)?;
    let signature_algorithm = tbs_certificate.next_sibling()?.expect_tag(TAG_SEQUENCE)?;
    let signature_value = signature_algorithm.next_sibling()?;

    check_signature_algorithm(signature_algorithm);

    let parent = RsaPublicKey::new(parent_modulus, parent_exponent);
    let signature = signature_value.bitstring()?;
    if !parent.verify(tbs_certificate.all_bytes(), signature)? {
        warn!(
            "certificate signature rejected by {}-bit issuer key",
            parent.modulus().len() * 8
        );
        return Err(CertificateError::SignatureVerificationFailed);
    }

    let subject_key = subject_public_key(tbs_certificate)?;
    debug!(
        "certificate verified, subject key is {} bits",
        subject_key.modulus().len() * 8
    );
    Ok(subject_key)
}

/// Reads the subject public key out of a certificate without checking its signature.
pub fn extract_subject_public_key(cert: &[u8]) -> Result<RsaPublicKey, CertificateError> {
    let certificate = DerNode::root(cert)?.expect_tag(TAG_SEQUENCE)?;
    let tbs_certificate = certificate.first_child()?.expect_tag(TAG_SEQUENCE)?;
    subject_public_key(tbs_certificate)
}

/// Verifies a chain ordered leaf first, as IAS returns it, starting from the
/// certificate closest to `root`. Returns the leaf key.
pub fn verify_certificate_chain(
    chain: &[&[u8]],
    root: &RsaPublicKey,
) -> Result<RsaPublicKey, CertificateError> {
    chain.iter().rev().try_fold(root.clone(), |issuer, cert| {
        verify_signed_certificate(cert, issuer.modulus(), issuer.exponent())
    })
}

/// Decodes a concatenation of PEM `CERTIFICATE` blocks into DER certificates.
pub fn pem_chain_to_der(pem_chain: &[u8]) -> anyhow::Result<Vec<Vec<u8>>> {
    let pems = pem::parse_many(pem_chain).context("Failed to parse PEM certificate chain")?;
    if pems.is_empty() {
        bail!("No certificate found in PEM chain");
    }

    pems.into_iter()
        .map(|pem| {
            if pem.tag() != PEM_CERTIFICATE_TAG {
                return Err(anyhow!("Unexpected PEM block {}", pem.tag()));
            }
            Ok(pem.into_contents())
        })
        .collect()
}

fn check_signature_algorithm(signature_algorithm: DerNode<'_>) {
    let oid = signature_algorithm
        .first_child()
        .and_then(|node| node.expect_tag(TAG_OID));
    match oid {
        Ok(oid) if oid.bytes() == SHA256_WITH_RSA_ENCRYPTION_OID => {}
        Ok(oid) => warn!(
            "certificate signature algorithm {} is not sha256WithRSAEncryption, assuming SHA-256",
            hex::encode(oid.bytes())
        ),
        Err(e) => warn!("unreadable certificate signature algorithm: {}", e),
    }
}

fn subject_public_key(tbs_certificate: DerNode<'_>) -> Result<RsaPublicKey, CertificateError> {
    // version [0] EXPLICIT is absent in v1 certificates
    let mut field = tbs_certificate.first_child()?;
    if field.tag() == TAG_CONTEXT_0 {
        field = field.next_sibling()?;
    }

    let serial_number = field.expect_tag(TAG_INTEGER)?;
    let signature = serial_number.next_sibling()?;
    let issuer = signature.next_sibling()?;
    let validity = issuer.next_sibling()?;
    let subject = validity.next_sibling()?;
    let subject_public_key_info = subject.next_sibling()?.expect_tag(TAG_SEQUENCE)?;

    let algorithm = subject_public_key_info.first_child()?;
    let subject_public_key = algorithm.next_sibling()?.expect_tag(TAG_BIT_STRING)?;

    // RSAPublicKey ::= SEQUENCE { modulus INTEGER, publicExponent INTEGER }
    let rsa_public_key = subject_public_key.first_child()?.expect_tag(TAG_SEQUENCE)?;
    let modulus = rsa_public_key.first_child()?.expect_tag(TAG_INTEGER)?;
    let exponent = modulus.next_sibling()?.expect_tag(TAG_INTEGER)?;

    Ok(RsaPublicKey::new(modulus.bytes(), exponent.bytes()))
}
