mod common;

// For benchmarking
use std::time::Instant;

use bellwire::util_cs::checker::CircuitChecker;
use bellwire::util_cs::Comparable;
use bellwire::{
    compile, BackendKind, Builder, Circuit, CompileError, CompileOptions, HintRegistry, Solver,
    SolveError,
};
use blstrs::Scalar as Fr;
use common::{init_logger, Goldilocks};
use ff::{Field, PrimeField, PrimeFieldBits};

const MIMC_ROUNDS: usize = 322;

/// This is an implementation of MiMC, specifically a
/// variant named `LongsightF322p3` for BLS12-381.
/// See http://eprint.iacr.org/2016/492 for more
/// information about this construction.
///
/// ```text
/// function LongsightF322p3(xL ⦂ Fp, xR ⦂ Fp) {
///     for i from 0 up to 321 {
///         xL, xR := xR + (xL + Ci)^3, xL
///     }
///     return xL
/// }
/// ```
fn mimc<Scalar: PrimeField>(mut xl: Scalar, mut xr: Scalar, constants: &[Scalar]) -> Scalar {
    assert_eq!(constants.len(), MIMC_ROUNDS);

    for constant in constants {
        let tmp1 = xl + constant;
        let tmp2 = tmp1.square() * tmp1 + xr;
        xr = xl;
        xl = tmp2;
    }

    xl
}

/// Round constants derived from a counter; any fixed sequence will do.
fn round_constants<Scalar: PrimeField>() -> Vec<Scalar> {
    (0..MIMC_ROUNDS as u64)
        .map(|i| Scalar::from(i * i + 7 * i + 3).square() + Scalar::MULTIPLICATIVE_GENERATOR)
        .collect()
}

/// Proves knowledge of the preimage of a MiMC hash invocation. The image is
/// public, the two halves of the preimage are secret.
struct MimcDemo<'a, Scalar: PrimeField> {
    constants: &'a [Scalar],
}

impl<'a, Scalar: PrimeFieldBits> Circuit<Scalar> for MimcDemo<'a, Scalar> {
    fn define<B: Builder<Scalar>>(&self, api: &mut B) -> Result<(), CompileError> {
        assert_eq!(self.constants.len(), MIMC_ROUNDS);

        let image = api.public_input("image");
        let mut xl = api.secret_input("preimage xl");
        let mut xr = api.secret_input("preimage xr");

        for constant in self.constants {
            // tmp = (xL + Ci)^2
            let shifted = api.add(&xl, &api.constant(*constant));
            let tmp = api.mul(&shifted, &shifted)?;

            // new_xL = xR + tmp * (xL + Ci)
            let cube = api.mul(&tmp, &shifted)?;
            let new_xl = api.add(&xr, &cube);

            xr = xl;
            xl = new_xl;
        }

        api.assert_equal(&xl, &image)
    }
}

fn solve_mimc<Scalar: PrimeFieldBits>(backend: BackendKind) {
    let constants = round_constants::<Scalar>();
    let circuit = MimcDemo {
        constants: &constants,
    };
    let xl = Scalar::from(0x1234_5678);
    let xr = Scalar::from(0x9abc_def0);
    let image = mimc(xl, xr, &constants);

    let start = Instant::now();
    let cs = compile(&circuit, &CompileOptions::new(backend)).unwrap();
    log::info!("compiled {} MiMC in {:?}", backend, start.elapsed());
    assert_eq!(cs.num_constraints(), cs.stats().constraints);

    let registry = HintRegistry::new();
    let start = Instant::now();
    let assignment = Solver::new(&cs, &registry).solve(&[image], &[xl, xr]).unwrap();
    log::info!("solved {} MiMC in {:?}", backend, start.elapsed());
    assert_eq!(assignment.public_values(), vec![image]);

    let mut solver = Solver::new(&cs, &registry);
    match solver.solve(&[image + Scalar::ONE], &[xl, xr]) {
        Err(SolveError::ConstraintViolated { index, .. }) => {
            assert_eq!(index, cs.num_constraints() - 1);
            assert!(solver.partial().iter().all(Option::is_some));
        }
        other => panic!("unexpected result: {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_mimc() {
    init_logger();
    for backend in [BackendKind::Rank1, BackendKind::Gate] {
        solve_mimc::<Fr>(backend);
        solve_mimc::<Goldilocks>(backend);
    }
}

#[test]
fn test_mimc_rank1_shape() {
    let constants = round_constants::<Fr>();
    let circuit = MimcDemo {
        constants: &constants,
    };
    let cs = compile(&circuit, &CompileOptions::default()).unwrap();

    // two products per round plus the image check
    assert_eq!(cs.num_constraints(), 2 * MIMC_ROUNDS + 1);
    assert_eq!(cs.num_variables(), 3 + 2 * MIMC_ROUNDS);

    let again = compile(&circuit, &CompileOptions::default()).unwrap();
    assert_eq!(cs.digest(), again.digest());
    assert!(cs.delta(&again, false) == bellwire::util_cs::Delta::Equal);
}

#[test]
fn test_mimc_checker() {
    let constants = round_constants::<Goldilocks>();
    let circuit = MimcDemo {
        constants: &constants,
    };
    let image = mimc(Goldilocks::ONE, Goldilocks::ZERO, &constants);
    let checker = CircuitChecker::new();

    checker.assert_solved(&circuit, &[image], &[Goldilocks::ONE, Goldilocks::ZERO]);
    checker.assert_failed(&circuit, &[image], &[Goldilocks::ZERO, Goldilocks::ONE]);
}
