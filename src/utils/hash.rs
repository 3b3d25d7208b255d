use sha2::{Digest, Sha256};

/// Largest SHA-256 input in bytes, the padding encodes the bit length in 64 bits.
pub const SHA256_MAX_INPUT_LEN: u64 = (1 << 61) - 1;

pub fn sha256sum(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut output = [0; 32];
    output.copy_from_slice(&result);
    output
}
