use anyhow::{anyhow, bail};
use zerocopy::little_endian;

use crate::constants::{ENCLAVE_REPORT_LEN, QUOTE_HEADER_LEN};
use crate::utils;

/// EPID quote as carried in `isvEnclaveQuoteBody`: header and enclave report, no signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quote {
    pub header: QuoteHeader,
    pub body: EnclaveReportBody,
}

impl Quote {
    pub fn read(bytes: &mut &[u8]) -> anyhow::Result<Self> {
        if bytes.len() < QUOTE_HEADER_LEN + ENCLAVE_REPORT_LEN {
            bail!("incorrect quote size {}", bytes.len());
        }

        let header = utils::read_from_bytes::<QuoteHeader>(bytes)
            .ok_or_else(|| anyhow!("underflow reading quote header"))?;
        let body = utils::read_from_bytes::<EnclaveReportBody>(bytes)
            .ok_or_else(|| anyhow!("underflow reading enclave report body"))?;

        Ok(Quote { header, body })
    }
}

/// Header of the EPID quote structure (`sgx_quote_t`).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, zerocopy::FromBytes, zerocopy::FromZeroes, zerocopy::AsBytes,
)]
#[repr(C)]
pub struct QuoteHeader {
    /// Version of the quote structure.
    /// [2 bytes]
    pub version: little_endian::U16,

    /// 0 for unlinkable, 1 for linkable EPID signatures.
    /// [2 bytes]
    pub sign_type: little_endian::U16,

    /// [4 bytes]
    pub epid_group_id: [u8; 4],

    /// Security version of the quoting enclave.
    /// [2 bytes]
    pub qe_svn: little_endian::U16,

    /// Security version of the provisioning certification enclave.
    /// [2 bytes]
    pub pce_svn: little_endian::U16,

    /// Extended EPID group id.
    /// [4 bytes]
    pub xeid: little_endian::U32,

    /// [32 bytes]
    pub basename: [u8; 32],
}

/// Enclave report body (`sgx_report_body_t`).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, zerocopy::FromBytes, zerocopy::FromZeroes, zerocopy::AsBytes,
)]
#[repr(C)]
pub struct EnclaveReportBody {
    /// Security version of the CPU.
    /// [16 bytes]
    pub cpu_svn: [u8; 16],

    /// [4 bytes]
    pub misc_select: little_endian::U32,

    /// [28 bytes]
    pub reserved_1: [u8; 28],

    /// Enclave attributes, flags followed by XFRM.
    /// [16 bytes]
    pub attributes: [u8; 16],

    /// SHA-256 measurement of the enclave contents.
    /// [32 bytes]
    pub mrenclave: [u8; 32],

    /// [32 bytes]
    pub reserved_2: [u8; 32],

    /// SHA-256 of the modulus of the key that signed the enclave.
    /// [32 bytes]
    pub mrsigner: [u8; 32],

    /// [96 bytes]
    pub reserved_3: [u8; 96],

    /// [2 bytes]
    pub isv_prod_id: little_endian::U16,

    /// [2 bytes]
    pub isv_svn: little_endian::U16,

    /// [60 bytes]
    pub reserved_4: [u8; 60],

    /// Data chosen by the enclave, usually a hash binding a key or payload to the report.
    /// [64 bytes]
    pub report_data: [u8; 64],
}
