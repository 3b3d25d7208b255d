use anyhow::Context;
use base64ct::{Base64, Encoding};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::types::quote::Quote;

/// Attestation verification report returned by IAS (API version 4), the body
/// covered by `X-IASReport-Signature`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttestationReport {
    pub id: String,

    /// UTC, without an offset.
    #[serde(with = "ias_timestamp")]
    pub timestamp: NaiveDateTime,

    pub version: u32,

    pub isv_enclave_quote_status: QuoteStatus,

    /// Base64 encoded quote, header and report body.
    pub isv_enclave_quote_body: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revocation_reason: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pse_manifest_status: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pse_manifest_hash: Option<String>,

    /// Hex encoded TLV blob, present for some non-OK statuses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform_info_blob: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epid_pseudonym: Option<String>,

    #[serde(
        rename = "advisoryURL",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub advisory_url: Option<String>,

    #[serde(rename = "advisoryIDs", default, skip_serializing_if = "Vec::is_empty")]
    pub advisory_ids: Vec<String>,
}

impl AttestationReport {
    pub fn from_bytes(bytes: &[u8]) -> anyhow::Result<Self> {
        serde_json::from_slice(bytes).context("Failed to parse attestation report")
    }

    pub fn quote_bytes(&self) -> anyhow::Result<Vec<u8>> {
        Base64::decode_vec(&self.isv_enclave_quote_body)
            .map_err(|e| anyhow::anyhow!("Failed to decode isvEnclaveQuoteBody: {}", e))
    }

    pub fn quote(&self) -> anyhow::Result<Quote> {
        let raw = self.quote_bytes()?;
        Quote::read(&mut raw.as_slice()).context("Failed to read isvEnclaveQuoteBody")
    }
}

/// `isvEnclaveQuoteStatus` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuoteStatus {
    Ok,
    SignatureInvalid,
    GroupRevoked,
    SignatureRevoked,
    KeyRevoked,
    SigrlVersionMismatch,
    GroupOutOfDate,
    ConfigurationNeeded,
    SwHardeningNeeded,
    ConfigurationAndSwHardeningNeeded,
}

impl QuoteStatus {
    /// The platform is up to date, possibly pending configuration or software mitigations.
    pub fn is_trusted_platform(&self) -> bool {
        matches!(
            self,
            QuoteStatus::Ok
                | QuoteStatus::SwHardeningNeeded
                | QuoteStatus::ConfigurationNeeded
                | QuoteStatus::ConfigurationAndSwHardeningNeeded
        )
    }
}

mod ias_timestamp {
    use chrono::NaiveDateTime;
    use serde::{de, Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = <String>::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&s, FORMAT).map_err(de::Error::custom)
    }

    pub fn serialize<S: Serializer>(
        value: &NaiveDateTime,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.format(FORMAT).to_string())
    }
}
