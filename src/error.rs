use thiserror::Error;

/// Structural failures of the DER cursor.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DerError {
    #[error("malformed DER encoding at offset {offset}")]
    MalformedEncoding { offset: usize },

    #[error("element with tag {tag:#04x} is primitive and has no children")]
    NotConstructedType { tag: u8 },

    #[error("no more elements in the enclosing structure")]
    NoMoreSiblings,

    #[error("unexpected tag, expected {expected:#04x} but got {found:#04x}")]
    UnexpectedTag { expected: u8, found: u8 },
}

/// Inputs that can never produce a valid PKCS#1 v1.5 signature.
///
/// A signature that simply does not match is not an error, `verify` returns `Ok(false)`.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RsaError {
    #[error("modulus of {modulus_len} bytes is too short for PKCS#1 v1.5 SHA-256 padding")]
    MessageTooShort { modulus_len: usize },

    #[error("signature is {signature_len} bytes but the modulus is {modulus_len} bytes")]
    SignatureLengthMismatch {
        signature_len: usize,
        modulus_len: usize,
    },

    #[error("message exceeds the SHA-256 input limit")]
    MessageTooLong,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CertificateError {
    #[error("certificate encoding: {0}")]
    Der(#[from] DerError),

    #[error("certificate signature: {0}")]
    Rsa(#[from] RsaError),

    #[error("certificate signature does not verify under the issuer key")]
    SignatureVerificationFailed,
}

/// Enclave measurements pinned by a verifier policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Measurement {
    MrEnclave,
    MrSigner,
}

impl std::fmt::Display for Measurement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Measurement::MrEnclave => write!(f, "mrenclave"),
            Measurement::MrSigner => write!(f, "mrsigner"),
        }
    }
}

#[derive(Error, Debug)]
pub enum AttestationError {
    #[error("report signing certificate rejected: {0}")]
    Certificate(#[from] CertificateError),

    #[error("report signature: {0}")]
    Rsa(#[from] RsaError),

    #[error("report signature does not verify under the report signing key")]
    SignatureVerificationFailed,

    #[error("authenticated report could not be decoded: {0:#}")]
    MalformedReport(#[source] anyhow::Error),

    #[error(
        "invalid {measurement}, expected {} but got {}",
        hex::encode(expected),
        hex::encode(found)
    )]
    MeasurementMismatch {
        measurement: Measurement,
        expected: [u8; 32],
        found: [u8; 32],
    },
}
