//! Helpers for packing vectors of bits into scalar field elements.

use ff::{PrimeField, PrimeFieldBits};

use crate::builder::Builder;
use crate::error::CompileError;
use crate::LinearCombination;

/// Takes a sequence of bits and exposes them as compact public inputs, one
/// per `Scalar::CAPACITY` bits. Returns the declared inputs.
pub fn pack_into_inputs<Scalar, B>(
    api: &mut B,
    name: &str,
    bits: &[LinearCombination<Scalar>],
) -> Result<Vec<LinearCombination<Scalar>>, CompileError>
where
    Scalar: PrimeFieldBits,
    B: Builder<Scalar>,
{
    let mut inputs = Vec::new();
    for (i, chunk) in bits.chunks(Scalar::CAPACITY as usize).enumerate() {
        let packed = api.from_bits(chunk);
        let input = api.public_input(&format!("{}[{}]", name, i));

        // packed * 1 = input
        api.assert_equal(&packed, &input)?;
        inputs.push(input);
    }

    Ok(inputs)
}

pub fn bytes_to_bits(bytes: &[u8]) -> Vec<bool> {
    bytes
        .iter()
        .flat_map(|&v| (0..8).rev().map(move |i| (v >> i) & 1 == 1))
        .collect()
}

pub fn bytes_to_bits_le(bytes: &[u8]) -> Vec<bool> {
    bytes
        .iter()
        .flat_map(|&v| (0..8).map(move |i| (v >> i) & 1 == 1))
        .collect()
}

/// Computes the public input values [`pack_into_inputs`] expects.
pub fn compute_multipacking<Scalar: PrimeField>(bits: &[bool]) -> Vec<Scalar> {
    bits.chunks(Scalar::CAPACITY as usize)
        .map(|chunk| {
            let mut cur = Scalar::ZERO;
            let mut coeff = Scalar::ONE;
            for bit in chunk {
                if *bit {
                    cur += coeff;
                }
                coeff = coeff.double();
            }
            cur
        })
        .collect()
}

/// Takes a sequence of bits and packs the first `Scalar::CAPACITY` of them
/// into a single wire.
pub fn pack_bits<Scalar, B>(
    api: &mut B,
    bits: &[LinearCombination<Scalar>],
) -> Result<LinearCombination<Scalar>, CompileError>
where
    Scalar: PrimeFieldBits,
    B: Builder<Scalar>,
{
    let take = bits.len().min(Scalar::CAPACITY as usize);
    let packed = api.from_bits(&bits[..take]);
    api.wire(&packed)
}
