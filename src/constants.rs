// RFC 8017, section 9.2, note 1: DER encoded DigestInfo prefixes for SHA-256.

/// `DigestInfo` prefix with the explicit NULL algorithm parameter. The only form accepted.
pub const SHA256_DIGEST_INFO_PREFIX: [u8; 19] = [
    0x30, 0x31, 0x30, 0x0d, 0x06, 0x09, 0x60, 0x86, 0x48, 0x01, 0x65, 0x03, 0x04, 0x02, 0x01,
    0x05, 0x00, 0x04, 0x20,
];

/// `DigestInfo` prefix with the algorithm parameter omitted.
pub const SHA256_DIGEST_INFO_PREFIX_NO_NULL: [u8; 17] = [
    0x30, 0x2f, 0x30, 0x0b, 0x06, 0x09, 0x60, 0x86, 0x48, 0x01, 0x65, 0x03, 0x04, 0x02, 0x01,
    0x04, 0x20,
];

pub const SHA256_DIGEST_LEN: usize = 32;

/// 0x00 0x01 ... 0x00 framing plus the minimum run of eight 0xff octets.
pub const PKCS1_MIN_PADDING_LEN: usize = 11;

/// OID 1.2.840.113549.1.1.11, content octets only.
pub const SHA256_WITH_RSA_ENCRYPTION_OID: [u8; 9] =
    [0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x01, 0x0b];

// https://api.trustedservices.intel.com/documents/sgx-attestation-api-spec.pdf

pub const QUOTE_HEADER_LEN: usize = 48;
pub const ENCLAVE_REPORT_LEN: usize = 384;
pub const QUOTE_BODY_LEN: usize = QUOTE_HEADER_LEN + ENCLAVE_REPORT_LEN;
