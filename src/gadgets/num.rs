//! Gadgets on arbitrary field elements.

use ff::PrimeFieldBits;

use crate::builder::{single, Builder};
use crate::error::CompileError;
use crate::hint::INVERSE_OR_ZERO_HINT;
use crate::LinearCombination;

/// Returns 1 if `x` is zero and 0 otherwise, using two constraints:
/// `m = 1 - x·inv` and `x·m = 0`, where `inv` is hinted.
pub fn is_zero<Scalar, B>(
    api: &mut B,
    x: &LinearCombination<Scalar>,
) -> Result<LinearCombination<Scalar>, CompileError>
where
    Scalar: PrimeFieldBits,
    B: Builder<Scalar>,
{
    if let Some(value) = x.as_constant() {
        let flag = u64::from(bool::from(value.is_zero()));
        return Ok(api.constant(Scalar::from(flag)));
    }

    let inv = single(
        api.hint(INVERSE_OR_ZERO_HINT, std::slice::from_ref(x), 1)?,
        api.num_constraints(),
    )?;
    let product = api.mul(x, &inv)?;
    let m = api.sub(&api.constant(Scalar::ONE), &product);
    api.assert_product(x, &m, &LinearCombination::zero())?;
    Ok(m)
}

/// Returns 1 if `a == b` and 0 otherwise.
pub fn is_equal<Scalar, B>(
    api: &mut B,
    a: &LinearCombination<Scalar>,
    b: &LinearCombination<Scalar>,
) -> Result<LinearCombination<Scalar>, CompileError>
where
    Scalar: PrimeFieldBits,
    B: Builder<Scalar>,
{
    let diff = api.sub(a, b);
    is_zero(api, &diff)
}

/// Constrains `x` to have a multiplicative inverse. A constant zero fails
/// compilation with [`CompileError::DivisionByZeroConstant`]; a zero value
/// fails solving in the inversion hint.
pub fn assert_non_zero<Scalar, B>(
    api: &mut B,
    x: &LinearCombination<Scalar>,
) -> Result<(), CompileError>
where
    Scalar: PrimeFieldBits,
    B: Builder<Scalar>,
{
    api.inverse(x).map(|_| ())
}

/// Selects `table[b0 + 2·b1]`.
pub fn lookup2<Scalar, B>(
    api: &mut B,
    b0: &LinearCombination<Scalar>,
    b1: &LinearCombination<Scalar>,
    table: &[LinearCombination<Scalar>; 4],
) -> Result<LinearCombination<Scalar>, CompileError>
where
    Scalar: PrimeFieldBits,
    B: Builder<Scalar>,
{
    let low = api.select(b0, &table[1], &table[0])?;
    let high = api.select(b0, &table[3], &table[2])?;
    api.select(b1, &high, &low)
}
