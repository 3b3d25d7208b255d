//! RSASSA-PKCS1-v1_5 signature verification with SHA-256 (RFC 8017, section 8.2.2).

use serde::{Deserialize, Serialize};

use crate::constants::{
    PKCS1_MIN_PADDING_LEN, SHA256_DIGEST_INFO_PREFIX, SHA256_DIGEST_INFO_PREFIX_NO_NULL,
    SHA256_DIGEST_LEN,
};
use crate::error::RsaError;
use crate::utils::bignum::mod_exp;
use crate::utils::der::unsigned_magnitude;
use crate::utils::hash::{sha256sum, SHA256_MAX_INPUT_LEN};

/// RSA public key as big-endian unsigned magnitudes.
///
/// Leading zero octets are stripped on construction, so `modulus().len()` is the
/// key size in bytes and the expected signature length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RsaPublicKeyHex")]
pub struct RsaPublicKey {
    #[serde(with = "hex")]
    modulus: Vec<u8>,
    #[serde(with = "hex")]
    exponent: Vec<u8>,
}

#[derive(Deserialize)]
struct RsaPublicKeyHex {
    #[serde(with = "hex")]
    modulus: Vec<u8>,
    #[serde(with = "hex")]
    exponent: Vec<u8>,
}

impl From<RsaPublicKeyHex> for RsaPublicKey {
    fn from(raw: RsaPublicKeyHex) -> Self {
        RsaPublicKey::new(&raw.modulus, &raw.exponent)
    }
}

impl RsaPublicKey {
    pub fn new(modulus: &[u8], exponent: &[u8]) -> Self {
        RsaPublicKey {
            modulus: unsigned_magnitude(modulus).to_vec(),
            exponent: unsigned_magnitude(exponent).to_vec(),
        }
    }

    pub fn modulus(&self) -> &[u8] {
        &self.modulus
    }

    pub fn exponent(&self) -> &[u8] {
        &self.exponent
    }

    pub fn verify(&self, message: &[u8], signature: &[u8]) -> Result<bool, RsaError> {
        verify(message, signature, &self.modulus, &self.exponent)
    }
}

/// EMSA-PKCS1-v1_5 encoding of a SHA-256 digest:
/// `00 01 FF..FF 00 || DigestInfo prefix || digest`.
pub fn build_padded_block(
    modulus_len: usize,
    digest: &[u8; SHA256_DIGEST_LEN],
    include_null_parameter: bool,
) -> Result<Vec<u8>, RsaError> {
    let prefix: &[u8] = if include_null_parameter {
        &SHA256_DIGEST_INFO_PREFIX
    } else {
        &SHA256_DIGEST_INFO_PREFIX_NO_NULL
    };

    // emLen = ceil((modBits - 1) / 8)
    let em_len = modulus_len.saturating_mul(8).saturating_sub(1).div_ceil(8);
    let t_len = prefix.len() + digest.len();
    if em_len < t_len + PKCS1_MIN_PADDING_LEN {
        return Err(RsaError::MessageTooShort { modulus_len });
    }

    let ps_len = em_len - t_len - 3;
    let mut block = Vec::with_capacity(em_len);
    block.extend_from_slice(&[0x00, 0x01]);
    block.resize(2 + ps_len, 0xff);
    block.push(0x00);
    block.extend_from_slice(prefix);
    block.extend_from_slice(digest);
    Ok(block)
}

/// Verifies `signature` over `message` under the key `(modulus, exponent)`.
///
/// Returns `Ok(false)` when the signature does not match and `Err` when the
/// inputs can never verify. Only the DigestInfo form with an explicit NULL
/// parameter is accepted.
pub fn verify(
    message: &[u8],
    signature: &[u8],
    modulus: &[u8],
    exponent: &[u8],
) -> Result<bool, RsaError> {
    if message.len() as u64 > SHA256_MAX_INPUT_LEN {
        return Err(RsaError::MessageTooLong);
    }
    verify_digest(&sha256sum(message), signature, modulus, exponent)
}

/// Same as [`verify`] for a precomputed SHA-256 digest.
pub fn verify_digest(
    digest: &[u8; SHA256_DIGEST_LEN],
    signature: &[u8],
    modulus: &[u8],
    exponent: &[u8],
) -> Result<bool, RsaError> {
    if signature.len() != modulus.len() {
        return Err(RsaError::SignatureLengthMismatch {
            signature_len: signature.len(),
            modulus_len: modulus.len(),
        });
    }
    let expected = build_padded_block(modulus.len(), digest, true)?;

    // RSAVP1: the representative must lie in [0, n - 1]. Equal length big-endian
    // slices compare the same way as the integers they encode.
    if signature >= modulus {
        return Ok(false);
    }

    let recovered = mod_exp(signature, exponent, modulus);
    if recovered.len() > expected.len() {
        return Ok(false);
    }
    let mut block = vec![0u8; expected.len() - recovered.len()];
    block.extend_from_slice(&recovered);

    Ok(constant_time_eq(&block, &expected))
}

/// Compares two byte strings without stopping at the first difference.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use rand::Rng;

    use super::*;

    const EXPONENT: [u8; 3] = [0x01, 0x00, 0x01];

    const TEST_MODULUS_1024: &str = "af61f849498f594fb6ed9b3dcabdc03e3a06835a7fac72bd0bcd5c5aa26a81f3f35b0b47c6dae0a1fd3362406a967ce794b8644ffc93a8feffc008c45bf452b3e40ff08e8ab2549efd40816d65e7efc67fe9946e9bb1f9420ef0076bed22972e355b2ca936602f1001207a4e4379bcbe4866b06f7ad2fcbe5146c4185b7d3ccb";
    const TEST_PRIVATE_EXPONENT_1024: &str = "3e6756a805138b8cd0a314e4d4b9d5a88e8ef8b7ffcbc57bbcb25295314b427821f4183c6ee63c9d86f17c993d13d4d7b5d432653f92eec3e50e58503e03de54ea9abd34c29cf2db9638eb3054cf0364279fb6e033509a09918c12612473cdbc9b5aee64c9ec4510e75b42d471e47ed2d2542a29268f48fd9de628ff2ad60cd1";

    fn root_key() -> RsaPublicKey {
        let modulus = hex::decode(include_str!("../../data/test_root_ca_modulus.hex").trim()).unwrap();
        RsaPublicKey::new(&modulus, &EXPONENT)
    }

    fn sign(message: &[u8], modulus: &[u8], private_exponent: &[u8]) -> Vec<u8> {
        let block = build_padded_block(modulus.len(), &sha256sum(message), true).unwrap();
        let raw = mod_exp(&block, private_exponent, modulus);
        let mut signature = vec![0u8; modulus.len() - raw.len()];
        signature.extend_from_slice(&raw);
        signature
    }

    #[test]
    fn verifies_externally_produced_4096_bit_signature() {
        let key = root_key();
        assert_eq!(key.modulus().len(), 512);

        let message = include_bytes!("../../data/message.txt");
        let signature = include_bytes!("../../data/message_4096.sig");
        assert!(key.verify(message, signature).unwrap());
        assert!(verify(message, signature, key.modulus(), key.exponent()).unwrap());
    }

    #[test]
    fn rejects_digest_info_without_null_parameter() {
        let key = root_key();
        let message = include_bytes!("../../data/message.txt");
        let signature = include_bytes!("../../data/message_4096_no_null.sig");

        // the signature is well formed, just for the NULL-less DigestInfo
        let recovered = mod_exp(signature, key.exponent(), key.modulus());
        let no_null = build_padded_block(512, &sha256sum(message), false).unwrap();
        assert_eq!(recovered, no_null[1..]);

        assert!(!key.verify(message, signature).unwrap());
    }

    #[test]
    fn sign_then_verify() {
        let modulus = hex::decode(TEST_MODULUS_1024).unwrap();
        let private_exponent = hex::decode(TEST_PRIVATE_EXPONENT_1024).unwrap();
        let mut rng = rand::thread_rng();

        for len in [0usize, 1, 55, 64, 1000] {
            let message: Vec<u8> = (0..len).map(|_| rng.gen()).collect();
            let signature = sign(&message, &modulus, &private_exponent);
            assert!(verify(&message, &signature, &modulus, &EXPONENT).unwrap());
        }
    }

    #[test]
    fn single_bit_flips_are_rejected() {
        let modulus = hex::decode(TEST_MODULUS_1024).unwrap();
        let private_exponent = hex::decode(TEST_PRIVATE_EXPONENT_1024).unwrap();
        let message = include_bytes!("../../data/message.txt").to_vec();
        let signature = sign(&message, &modulus, &private_exponent);
        let mut rng = rand::thread_rng();

        for _ in 0..16 {
            let mut flipped = signature.clone();
            let bit = rng.gen_range(0..flipped.len() * 8);
            flipped[bit / 8] ^= 1 << (bit % 8);
            assert!(!verify(&message, &flipped, &modulus, &EXPONENT).unwrap());

            let mut flipped = modulus.clone();
            let bit = rng.gen_range(0..flipped.len() * 8);
            flipped[bit / 8] ^= 1 << (bit % 8);
            assert!(!verify(&message, &signature, &flipped, &EXPONENT).unwrap());

            let mut flipped = message.clone();
            let bit = rng.gen_range(0..flipped.len() * 8);
            flipped[bit / 8] ^= 1 << (bit % 8);
            assert!(!verify(&flipped, &signature, &modulus, &EXPONENT).unwrap());
        }
    }

    #[test]
    fn signature_not_below_modulus_is_rejected() {
        let key = root_key();
        let message = include_bytes!("../../data/message.txt");

        assert!(!key.verify(message, key.modulus()).unwrap());
        assert!(!key.verify(message, &vec![0xff; 512]).unwrap());
    }

    #[test]
    fn length_mismatch_is_an_error() {
        let key = root_key();
        let signature = include_bytes!("../../data/message_4096.sig");
        assert_eq!(
            key.verify(b"", &signature[1..]),
            Err(RsaError::SignatureLengthMismatch {
                signature_len: 511,
                modulus_len: 512
            })
        );
    }

    #[test]
    fn padded_block_layout() {
        let digest = sha256sum(b"abc");
        let block = build_padded_block(256, &digest, true).unwrap();

        assert_eq!(block.len(), 256);
        assert_eq!(block[..2], [0x00, 0x01]);
        assert!(block[2..204].iter().all(|&b| b == 0xff));
        assert_eq!(block[204], 0x00);
        assert_eq!(block[205..224], SHA256_DIGEST_INFO_PREFIX);
        assert_eq!(block[224..], digest);

        let block = build_padded_block(256, &digest, false).unwrap();
        assert_eq!(block[206..223], SHA256_DIGEST_INFO_PREFIX_NO_NULL);
    }

    #[test]
    fn modulus_too_short_for_padding() {
        let digest = [0u8; 32];
        assert_eq!(
            build_padded_block(61, &digest, true),
            Err(RsaError::MessageTooShort { modulus_len: 61 })
        );
        let block = build_padded_block(62, &digest, true).unwrap();
        assert_eq!(block[2..10], [0xff; 8]);
        assert_eq!(block[10], 0x00);

        assert_eq!(
            build_padded_block(0, &digest, true),
            Err(RsaError::MessageTooShort { modulus_len: 0 })
        );
        assert_eq!(
            verify(b"", &[0x01; 61], &[0xff; 61], &EXPONENT),
            Err(RsaError::MessageTooShort { modulus_len: 61 })
        );
    }

    #[test]
    fn key_strips_leading_zeros() {
        let key = RsaPublicKey::new(&[0x00, 0xc3, 0x01], &[0x00, 0x01, 0x00, 0x01]);
        assert_eq!(key.modulus(), [0xc3, 0x01]);
        assert_eq!(key.exponent(), EXPONENT);

        let parsed: RsaPublicKey =
            serde_json::from_str(r#"{"modulus": "00c301", "exponent": "010001"}"#).unwrap();
        assert_eq!(parsed, key);
        assert_eq!(
            serde_json::to_string(&key).unwrap(),
            r#"{"modulus":"c301","exponent":"010001"}"#
        );
    }

    #[test]
    fn constant_time_eq_compares_whole_input() {
        assert!(constant_time_eq(b"", b""));
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"xbc", b"abc"));
        assert!(!constant_time_eq(b"ab", b"abc"));
    }
}
