//! Logic on expressions already known to be boolean.
//!
//! None of these constrain their operands; use
//! [`Builder::assert_boolean`] on values that come from inputs.

use ff::PrimeFieldBits;

use crate::builder::Builder;
use crate::error::CompileError;
use crate::LinearCombination;

pub fn not<Scalar, B>(api: &B, a: &LinearCombination<Scalar>) -> LinearCombination<Scalar>
where
    Scalar: PrimeFieldBits,
    B: Builder<Scalar>,
{
    api.sub(&api.constant(Scalar::ONE), a)
}

pub fn and<Scalar, B>(
    api: &mut B,
    a: &LinearCombination<Scalar>,
    b: &LinearCombination<Scalar>,
) -> Result<LinearCombination<Scalar>, CompileError>
where
    Scalar: PrimeFieldBits,
    B: Builder<Scalar>,
{
    api.mul(a, b)
}

/// `a + b - a·b`
pub fn or<Scalar, B>(
    api: &mut B,
    a: &LinearCombination<Scalar>,
    b: &LinearCombination<Scalar>,
) -> Result<LinearCombination<Scalar>, CompileError>
where
    Scalar: PrimeFieldBits,
    B: Builder<Scalar>,
{
    let ab = api.mul(a, b)?;
    Ok(api.sub(&api.add(a, b), &ab))
}

/// `a + b - 2·a·b`
pub fn xor<Scalar, B>(
    api: &mut B,
    a: &LinearCombination<Scalar>,
    b: &LinearCombination<Scalar>,
) -> Result<LinearCombination<Scalar>, CompileError>
where
    Scalar: PrimeFieldBits,
    B: Builder<Scalar>,
{
    let ab = api.mul(a, b)?;
    Ok(api.add(a, b) - (Scalar::ONE.double(), &ab))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{GateBuilder, R1csBuilder};
    use crate::hint::HintRegistry;
    use crate::solver::solve;
    use crate::ConstraintSystem;
    use blstrs::Scalar as Fr;
    use ff::Field;

    fn truth_table<B: Builder<Fr>>(mut api: B, into_system: fn(B) -> ConstraintSystem<Fr>) {
        let a = api.secret_input("a");
        let b = api.secret_input("b");
        api.assert_boolean(&a).unwrap();
        api.assert_boolean(&b).unwrap();

        let outputs = [
            and(&mut api, &a, &b).unwrap(),
            or(&mut api, &a, &b).unwrap(),
            xor(&mut api, &a, &b).unwrap(),
            not(&api, &a),
        ];
        let names = ["and", "or", "xor", "not"];
        for (name, out) in names.iter().zip(outputs.iter()) {
            let public = api.public_input(name);
            api.assert_equal(out, &public).unwrap();
        }
        let cs = into_system(api);
        let registry = HintRegistry::new();

        for (x, y) in [(false, false), (false, true), (true, false), (true, true)] {
            let expected = [x & y, x | y, x ^ y, !x];
            let public: Vec<Fr> = expected.iter().map(|v| Fr::from(u64::from(*v))).collect();
            let secret = [Fr::from(u64::from(x)), Fr::from(u64::from(y))];
            assert!(solve(&cs, &registry, &public, &secret).is_ok());

            let mut wrong = public.clone();
            wrong[0] += Fr::ONE;
            assert!(solve(&cs, &registry, &wrong, &secret).is_err());
        }
    }

    #[test]
    fn test_truth_tables() {
        truth_table(R1csBuilder::new(true), R1csBuilder::into_system);
        truth_table(GateBuilder::new(true), GateBuilder::into_system);
    }
}
