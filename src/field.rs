//! Modular arithmetic context for the target prime field.

use ff::PrimeFieldBits;
use num_bigint::BigUint;

/// Wraps the modulus of the scalar field a circuit is compiled for.
///
/// One context exists per compilation or solve session and it is never
/// mutated after construction. Arithmetic on elements is carried out by the
/// `Scalar` type itself; the context adds the arbitrary precision view of the
/// modulus and the conversions hints and the persisted form rely on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldContext<Scalar: PrimeFieldBits> {
    modulus: BigUint,
    num_bits: u32,
    byte_len: usize,
    non_residue: Scalar,
}

impl<Scalar: PrimeFieldBits> Default for FieldContext<Scalar> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Scalar: PrimeFieldBits> FieldContext<Scalar> {
    pub fn new() -> Self {
        // p - 1 is the largest canonical element, so p = (-1) + 1.
        let modulus = to_biguint(&-Scalar::ONE) + 1u32;
        let num_bits = Scalar::NUM_BITS;

        FieldContext {
            byte_len: ((modulus.bits() + 7) / 8) as usize,
            modulus,
            num_bits,
            non_residue: Scalar::MULTIPLICATIVE_GENERATOR,
        }
    }

    pub fn modulus(&self) -> &BigUint {
        &self.modulus
    }

    /// Bit length of the modulus; the widest decomposition `to_bits` accepts.
    pub fn num_bits(&self) -> u32 {
        self.num_bits
    }

    /// Width of a canonical big-endian element encoding.
    pub fn byte_len(&self) -> usize {
        self.byte_len
    }

    /// A fixed quadratic non-residue of the field.
    pub fn non_residue(&self) -> Scalar {
        self.non_residue
    }

    pub fn to_biguint(&self, value: &Scalar) -> BigUint {
        to_biguint(value)
    }

    /// Maps an integer into the field, reducing it modulo `p`.
    pub fn from_biguint(&self, value: &BigUint) -> Scalar {
        let reduced = value % &self.modulus;
        let shift = Scalar::from(1u64 << 32) * Scalar::from(1u64 << 32);

        reduced
            .iter_u64_digits()
            .rev()
            .fold(Scalar::ZERO, |acc, digit| acc * shift + Scalar::from(digit))
    }

    pub fn from_i64(&self, value: i64) -> Scalar {
        if value < 0 {
            -Scalar::from(value.unsigned_abs())
        } else {
            Scalar::from(value as u64)
        }
    }

    pub fn inverse(&self, value: &Scalar) -> Option<Scalar> {
        Option::from(value.invert())
    }

    /// `2^i` as a field element.
    pub fn power_of_two(&self, i: usize) -> Scalar {
        let mut acc = Scalar::ONE;
        for _ in 0..i {
            acc = acc.double();
        }
        acc
    }

    /// Little-endian bits of `value`, or `None` if it needs more than `n` bits.
    pub fn decompose(&self, value: &Scalar, n: usize) -> Option<Vec<bool>> {
        let bits: Vec<bool> = value.to_le_bits().into_iter().collect();
        if bits.iter().skip(n).any(|b| *b) {
            return None;
        }

        let mut result: Vec<bool> = bits.into_iter().take(n).collect();
        result.resize(n, false);
        Some(result)
    }

    /// Canonical fixed-width big-endian encoding of `value`.
    pub fn to_bytes(&self, value: &Scalar) -> Vec<u8> {
        let raw = to_biguint(value).to_bytes_be();
        let mut out = vec![0u8; self.byte_len - raw.len()];
        out.extend_from_slice(&raw);
        out
    }

    /// Inverse of [`FieldContext::to_bytes`]; rejects non-canonical encodings.
    pub fn from_bytes(&self, bytes: &[u8]) -> Option<Scalar> {
        let value = BigUint::from_bytes_be(bytes);
        if bytes.len() != self.byte_len || value >= self.modulus {
            return None;
        }
        Some(self.from_biguint(&value))
    }
}

pub(crate) fn to_biguint<Scalar: PrimeFieldBits>(value: &Scalar) -> BigUint {
    let mut digits = vec![0u32; (Scalar::NUM_BITS as usize + 31) / 32];
    for (i, bit) in value.to_le_bits().into_iter().enumerate() {
        if bit {
            digits[i / 32] |= 1 << (i % 32);
        }
    }
    BigUint::from_slice(&digits)
}

/// Renders a field element as a decimal integer, for diagnostics.
pub(crate) fn display<Scalar: PrimeFieldBits>(value: &Scalar) -> String {
    to_biguint(value).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use blstrs::Scalar as Fr;
    use ff::Field;

    #[test]
    fn test_modulus_bls12_381() {
        let field = FieldContext::<Fr>::new();
        let expected = BigUint::parse_bytes(
            b"52435875175126190479447740508185965837690552500527637822603658699938581184513",
            10,
        )
        .unwrap();

        assert_eq!(field.modulus(), &expected);
        assert_eq!(field.num_bits(), 255);
        assert_eq!(field.byte_len(), 32);
    }

    #[test]
    fn test_biguint_conversion() {
        let field = FieldContext::<Fr>::new();
        let x = Fr::from(123456789u64) * Fr::from(987654321u64) + Fr::from(u64::MAX);

        assert_eq!(field.from_biguint(&field.to_biguint(&x)), x);
        assert_eq!(field.from_biguint(field.modulus()), Fr::ZERO);
        assert_eq!(field.from_i64(-1), -Fr::ONE);
    }

    #[test]
    fn test_decompose() {
        let field = FieldContext::<Fr>::new();

        assert_eq!(
            field.decompose(&Fr::from(6u64), 4),
            Some(vec![false, true, true, false])
        );
        assert_eq!(field.decompose(&Fr::from(16u64), 4), None);
        assert_eq!(field.power_of_two(10), Fr::from(1024u64));
    }

    #[test]
    fn test_bytes_are_canonical() {
        let field = FieldContext::<Fr>::new();
        let x = -Fr::from(5u64);
        let bytes = field.to_bytes(&x);

        assert_eq!(bytes.len(), 32);
        assert_eq!(field.from_bytes(&bytes), Some(x));
        assert_eq!(field.from_bytes(&field.modulus().to_bytes_be()), None);
        assert_eq!(field.from_bytes(&bytes[1..]), None);
    }

    #[test]
    fn test_non_residue() {
        let field = FieldContext::<Fr>::new();
        assert!(bool::from(field.non_residue().sqrt().is_none()));
    }
}
