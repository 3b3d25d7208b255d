//! Arbitrary precision modular exponentiation over big-endian byte strings.
//!
//! This is the only arithmetic RSA verification needs, so the integer type here supports
//! exactly multiplication, reduction and comparison. Numbers are little-endian `u32` limbs
//! with no zero limbs at the top; zero is the empty vector.

use std::cmp::Ordering;

const LIMB_BITS: u32 = 32;
const BASE: u64 = 1 << LIMB_BITS;

#[derive(Clone, Debug, PartialEq, Eq)]
struct Natural {
    limbs: Vec<u32>,
}

impl Natural {
    fn one() -> Self {
        Natural { limbs: vec![1] }
    }

    fn from_be_bytes(bytes: &[u8]) -> Self {
        let limbs = bytes
            .rchunks(4)
            .map(|chunk| chunk.iter().fold(0u32, |acc, &b| (acc << 8) | b as u32))
            .collect();
        Natural { limbs }.normalized()
    }

    /// Minimal big-endian encoding, empty for zero.
    fn to_be_bytes(&self) -> Vec<u8> {
        let mut out: Vec<u8> = self
            .limbs
            .iter()
            .rev()
            .flat_map(|limb| limb.to_be_bytes())
            .collect();
        let leading = out.iter().take_while(|&&b| b == 0).count();
        out.drain(..leading);
        out
    }

    fn normalized(mut self) -> Self {
        while self.limbs.last() == Some(&0) {
            self.limbs.pop();
        }
        self
    }

    fn is_zero(&self) -> bool {
        self.limbs.is_empty()
    }

    fn is_one(&self) -> bool {
        self.limbs == [1]
    }

    fn mul(&self, other: &Natural) -> Natural {
        if self.is_zero() || other.is_zero() {
            return Natural { limbs: Vec::new() };
        }

        let mut out = vec![0u32; self.limbs.len() + other.limbs.len()];
        for (i, &a) in self.limbs.iter().enumerate() {
            let mut carry = 0u64;
            for (j, &b) in other.limbs.iter().enumerate() {
                let t = a as u64 * b as u64 + out[i + j] as u64 + carry;
                out[i + j] = t as u32;
                carry = t >> LIMB_BITS;
            }
            out[i + other.limbs.len()] = carry as u32;
        }
        Natural { limbs: out }.normalized()
    }

    /// `self mod m` for a non-zero `m` (Knuth, TAOCP vol. 2, algorithm D).
    fn rem(&self, m: &Natural) -> Natural {
        debug_assert!(!m.is_zero());
        if self.cmp(m) == Ordering::Less {
            return self.clone();
        }

        if let [d] = m.limbs.as_slice() {
            let d = *d as u64;
            let r = self
                .limbs
                .iter()
                .rev()
                .fold(0u64, |r, &limb| ((r << LIMB_BITS) | limb as u64) % d);
            return Natural { limbs: vec![r as u32] }.normalized();
        }

        // Normalize so the divisor's top limb has its high bit set.
        let shift = m.limbs[m.limbs.len() - 1].leading_zeros();
        let mut v = shl_bits(&m.limbs, shift);
        v.pop();
        let mut u = shl_bits(&self.limbs, shift);

        let n = v.len();
        let v_top = v[n - 1] as u64;
        let v_next = v[n - 2] as u64;

        for j in (0..u.len() - n).rev() {
            let num = ((u[j + n] as u64) << LIMB_BITS) | u[j + n - 1] as u64;
            let mut qhat = num / v_top;
            let mut rhat = num % v_top;
            while qhat >= BASE || qhat * v_next > ((rhat << LIMB_BITS) | u[j + n - 2] as u64) {
                qhat -= 1;
                rhat += v_top;
                if rhat >= BASE {
                    break;
                }
            }

            // u[j..=j+n] -= qhat * v
            let mut borrow = 0i64;
            for i in 0..n {
                let p = qhat * v[i] as u64;
                let t = u[i + j] as i64 - borrow - (p & 0xffff_ffff) as i64;
                u[i + j] = t as u32;
                borrow = (p >> LIMB_BITS) as i64 - (t >> LIMB_BITS);
            }
            let t = u[j + n] as i64 - borrow;
            u[j + n] = t as u32;

            // qhat was one too large, add the divisor back
            if t < 0 {
                let mut carry = 0u64;
                for i in 0..n {
                    let t = u[i + j] as u64 + v[i] as u64 + carry;
                    u[i + j] = t as u32;
                    carry = t >> LIMB_BITS;
                }
                u[j + n] = u[j + n].wrapping_add(carry as u32);
            }
        }

        u.truncate(n);
        Natural {
            limbs: shr_bits(&u, shift),
        }
        .normalized()
    }

    fn mul_mod(&self, other: &Natural, m: &Natural) -> Natural {
        self.mul(other).rem(m)
    }
}

impl PartialOrd for Natural {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Natural {
    fn cmp(&self, other: &Self) -> Ordering {
        self.limbs
            .len()
            .cmp(&other.limbs.len())
            .then_with(|| self.limbs.iter().rev().cmp(other.limbs.iter().rev()))
    }
}

/// Shift left by `shift < 32` bits, always returning one extra limb for the carry.
fn shl_bits(limbs: &[u32], shift: u32) -> Vec<u32> {
    let mut out = Vec::with_capacity(limbs.len() + 1);
    let mut carry = 0u32;
    for &limb in limbs {
        if shift == 0 {
            out.push(limb);
        } else {
            out.push((limb << shift) | carry);
            carry = limb >> (LIMB_BITS - shift);
        }
    }
    out.push(carry);
    out
}

fn shr_bits(limbs: &[u32], shift: u32) -> Vec<u32> {
    if shift == 0 {
        return limbs.to_vec();
    }
    (0..limbs.len())
        .map(|i| {
            let high = limbs.get(i + 1).map_or(0, |&l| l << (LIMB_BITS - shift));
            (limbs[i] >> shift) | high
        })
        .collect()
}

/// Bit `pos` of a big-endian magnitude, counting from the least significant bit.
fn bit_at(bytes: &[u8], pos: usize) -> usize {
    let byte = pos / 8;
    if byte >= bytes.len() {
        return 0;
    }
    ((bytes[bytes.len() - 1 - byte] >> (pos % 8)) & 1) as usize
}

/// Computes `base ^ exponent mod modulus`.
///
/// All three arguments are big-endian unsigned integers of any length; leading zero bytes
/// are ignored. The result is the minimal big-endian encoding, so zero is returned as an
/// empty vector and callers that need a fixed width must left-pad it themselves.
///
/// A modulus of zero or one yields zero, and a zero exponent yields `1 mod modulus`.
pub fn mod_exp(base: &[u8], exponent: &[u8], modulus: &[u8]) -> Vec<u8> {
    let m = Natural::from_be_bytes(modulus);
    if m.is_zero() || m.is_one() {
        return Vec::new();
    }

    let base = Natural::from_be_bytes(base).rem(&m);
    let exponent = &exponent[exponent.iter().take_while(|&&b| b == 0).count()..];
    let bits = exponent.len() * 8;

    // Public exponents are tiny, a window only pays off for long exponents.
    let window = if bits > 64 { 4 } else { 1 };

    let mut table = Vec::with_capacity(1 << window);
    table.push(Natural::one());
    for i in 1..1 << window {
        let next = table[i - 1].mul_mod(&base, &m);
        table.push(next);
    }

    let mut acc = Natural::one();
    let mut pos = (bits + window - 1) / window * window;
    while pos > 0 {
        pos -= window;
        for _ in 0..window {
            acc = acc.mul_mod(&acc, &m);
        }
        let digit = (0..window)
            .rev()
            .fold(0, |digit, k| (digit << 1) | bit_at(exponent, pos + k));
        if digit != 0 {
            acc = acc.mul_mod(&table[digit], &m);
        }
    }

    acc.to_be_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::{BigUint, RandBigInt};
    use rand::Rng;

    fn expected(base: &BigUint, exponent: &BigUint, modulus: &BigUint) -> Vec<u8> {
        let result = base.modpow(exponent, modulus);
        if result == BigUint::from(0u32) {
            Vec::new()
        } else {
            result.to_bytes_be()
        }
    }

    #[test]
    fn eip198_vector() {
        // 3 ^ (p - 1) mod p for the secp256k1 field prime
        let exponent =
            hex::decode("fffffffffffffffffffffffffffffffffffffffffffffffffffffffefffffc2e")
                .unwrap();
        let modulus =
            hex::decode("fffffffffffffffffffffffffffffffffffffffffffffffffffffffefffffc2f")
                .unwrap();
        let result = mod_exp(&[0x03], &exponent, &modulus);

        let mut padded = [0u8; 32];
        padded[32 - result.len()..].copy_from_slice(&result);
        let mut one = [0u8; 32];
        one[31] = 1;
        assert_eq!(padded, one);
    }

    #[test]
    fn edge_cases() {
        // modulus 1 always gives zero
        assert!(mod_exp(&[0x05], &[0x03], &[0x01]).is_empty());
        assert!(mod_exp(&[0x05], &[0x03], &[0x00, 0x00, 0x01]).is_empty());
        // zero modulus follows the EIP-198 convention
        assert!(mod_exp(&[0x05], &[0x03], &[]).is_empty());
        // exponent 0 gives 1 mod m
        assert_eq!(mod_exp(&[0x05], &[], &[0x07]), vec![0x01]);
        assert_eq!(mod_exp(&[0x00], &[0x00, 0x00], &[0x07]), vec![0x01]);
        // base 0 gives 0
        assert!(mod_exp(&[], &[0x03], &[0x07]).is_empty());
        assert!(mod_exp(&[0x00, 0x00], &[0x01, 0x00, 0x01], &[0xff, 0xff, 0xff, 0xff, 0xff]).is_empty());
        // base larger than the modulus
        assert_eq!(mod_exp(&[0x01, 0x00], &[0x01], &[0x07]), vec![0x04]);
        // leading zeros are insignificant
        assert_eq!(
            mod_exp(&[0x00, 0x00, 0x04], &[0x00, 0x0d], &[0x00, 0x01, 0xf1]),
            mod_exp(&[0x04], &[0x0d], &[0x01, 0xf1])
        );
        assert_eq!(mod_exp(&[0x04], &[0x0d], &[0x01, 0xf1]), vec![0x01, 0xbd]);
    }

    #[test]
    fn agrees_with_num_bigint_on_random_operands() {
        let mut rng = rand::thread_rng();
        for _ in 0..64 {
            let modulus_bits: u64 = rng.gen_range(1..=1024);
            let base_bits: u64 = rng.gen_range(0..=1100);
            let exponent_bits: u64 = rng.gen_range(0..=300);

            let modulus = rng.gen_biguint(modulus_bits);
            if modulus == BigUint::from(0u32) {
                continue;
            }
            let base = rng.gen_biguint(base_bits);
            let exponent = rng.gen_biguint(exponent_bits);

            let ours = mod_exp(
                &base.to_bytes_be(),
                &exponent.to_bytes_be(),
                &modulus.to_bytes_be(),
            );
            assert_eq!(ours, expected(&base, &exponent, &modulus));
        }
    }

    #[test]
    fn agrees_with_num_bigint_on_rsa_sized_operands() {
        let mut rng = rand::thread_rng();
        for modulus_bits in [2048u64, 3072, 4096] {
            let modulus = (BigUint::from(1u32) << (modulus_bits - 1))
                | rng.gen_biguint(modulus_bits - 1)
                | BigUint::from(1u32);
            let base = rng.gen_biguint_below(&modulus);
            let exponent = BigUint::from(65537u32);

            let ours = mod_exp(
                &base.to_bytes_be(),
                &exponent.to_bytes_be(),
                &modulus.to_bytes_be(),
            );
            assert_eq!(ours, expected(&base, &exponent, &modulus));
        }
    }

    #[test]
    fn remainder_handles_quotient_correction() {
        // divisor with a top limb of 0x80000000 and a dividend forcing qhat overestimates
        let m = Natural::from_be_bytes(&hex::decode("800000000000000000000001").unwrap());
        let a = Natural::from_be_bytes(
            &hex::decode("7fffffffffffffffffffffff0000000000000000ffffffff").unwrap(),
        );
        let reference = BigUint::from_bytes_be(&a.to_be_bytes())
            % BigUint::from_bytes_be(&m.to_be_bytes());
        assert_eq!(a.rem(&m).to_be_bytes(), reference.to_bytes_be());
    }

    #[test]
    fn byte_conversion_is_minimal() {
        let n = Natural::from_be_bytes(&[0x00, 0x00, 0x01, 0x02, 0x03, 0x04, 0x05]);
        assert_eq!(n.limbs, vec![0x02030405, 0x01]);
        assert_eq!(n.to_be_bytes(), vec![0x01, 0x02, 0x03, 0x04, 0x05]);
        assert!(Natural::from_be_bytes(&[0, 0, 0]).is_zero());
        assert!(Natural::from_be_bytes(&[]).to_be_bytes().is_empty());
    }
}
