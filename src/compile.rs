//! Compiler entry point.

use std::env;

use ff::PrimeFieldBits;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::builder::{Circuit, GateBuilder, R1csBuilder};
use crate::constraint_system::{BackendKind, ConstraintSystem};
use crate::error::CompileError;
use crate::util_cs::{Comparable, Delta};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileOptions {
    pub backend: BackendKind,
    /// Fold operations on known constants and share one wire per constant
    /// value. When unset every constant operand gets its own pinned wire.
    pub eliminate_constant_wires: bool,
    /// Compile twice and fail with
    /// [`CompileError::NonDeterministicCompilation`] if the results differ.
    pub check_determinism: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions {
            backend: BackendKind::Rank1,
            eliminate_constant_wires: true,
            check_determinism: false,
        }
    }
}

impl CompileOptions {
    pub fn new(backend: BackendKind) -> Self {
        CompileOptions {
            backend,
            ..Default::default()
        }
    }

    /// Defaults, overridden by `BELLWIRE_BACKEND` (`rank1` or `gate`),
    /// `BELLWIRE_ELIMINATE_CONSTANTS` and `BELLWIRE_CHECK_DETERMINISM`.
    pub fn from_env() -> Self {
        let mut options = Self::default();

        if let Ok(backend) = env::var("BELLWIRE_BACKEND") {
            match backend.to_ascii_lowercase().as_str() {
                "rank1" | "r1cs" => options.backend = BackendKind::Rank1,
                "gate" | "plonk" | "scs" => options.backend = BackendKind::Gate,
                other => warn!("ignoring unknown BELLWIRE_BACKEND `{}`", other),
            }
        }
        if let Some(flag) = env_flag("BELLWIRE_ELIMINATE_CONSTANTS") {
            options.eliminate_constant_wires = flag;
        }
        if let Some(flag) = env_flag("BELLWIRE_CHECK_DETERMINISM") {
            options.check_determinism = flag;
        }

        options
    }
}

fn env_flag(key: &str) -> Option<bool> {
    let value = env::var(key).ok()?;
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => {
            warn!("ignoring {}=`{}`, expected a boolean", key, value);
            None
        }
    }
}

/// Compiles `circuit` for the field `Scalar`.
pub fn compile<Scalar, C>(
    circuit: &C,
    options: &CompileOptions,
) -> Result<ConstraintSystem<Scalar>, CompileError>
where
    Scalar: PrimeFieldBits,
    C: Circuit<Scalar>,
{
    let cs = compile_once(circuit, options)?;

    if options.check_determinism {
        let again = compile_once(circuit, options)?;
        match cs.delta(&again, false) {
            Delta::Equal => {}
            delta => return Err(CompileError::NonDeterministicCompilation(delta.to_string())),
        }
    }

    info!(
        "compiled {} system: {} constraints, {} variables (digest {})",
        cs.backend(),
        cs.num_constraints(),
        cs.num_variables(),
        cs.digest()
    );
    Ok(cs)
}

fn compile_once<Scalar, C>(
    circuit: &C,
    options: &CompileOptions,
) -> Result<ConstraintSystem<Scalar>, CompileError>
where
    Scalar: PrimeFieldBits,
    C: Circuit<Scalar>,
{
    match options.backend {
        BackendKind::Rank1 => {
            let mut api = R1csBuilder::new(options.eliminate_constant_wires);
            circuit.define(&mut api)?;
            Ok(api.into_system())
        }
        BackendKind::Gate => {
            let mut api = GateBuilder::new(options.eliminate_constant_wires);
            circuit.define(&mut api)?;
            Ok(api.into_system())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::Builder;
    use crate::test_utils::with_env_vars;
    use blstrs::Scalar as Fr;
    use std::cell::Cell;

    struct Square;

    impl Circuit<Fr> for Square {
        fn define<B: Builder<Fr>>(&self, api: &mut B) -> Result<(), CompileError> {
            let a = api.public_input("A");
            let b = api.public_input("B");
            let sq = api.mul(&a, &a)?;
            api.assert_equal(&sq, &b)
        }
    }

    /// Emits one more constraint on every run.
    struct Drifting(Cell<u64>);

    impl Circuit<Fr> for Drifting {
        fn define<B: Builder<Fr>>(&self, api: &mut B) -> Result<(), CompileError> {
            let x = api.secret_input("x");
            let runs = self.0.get();
            self.0.set(runs + 1);
            for _ in 0..=runs {
                api.assert_boolean(&api.scale(&x, Fr::from(runs + 2)))?;
            }
            Ok(())
        }
    }

    #[test]
    fn test_backends() {
        for backend in [BackendKind::Rank1, BackendKind::Gate] {
            let options = CompileOptions {
                backend,
                check_determinism: true,
                ..Default::default()
            };
            let cs = compile(&Square, &options).unwrap();
            assert_eq!(cs.backend(), backend);
            assert_eq!(cs.public_inputs().len(), 2);
        }
    }

    #[test]
    fn test_determinism_check() {
        let options = CompileOptions {
            check_determinism: true,
            ..Default::default()
        };
        match compile(&Drifting(Cell::new(0)), &options) {
            Err(CompileError::NonDeterministicCompilation(msg)) => {
                assert!(msg.contains("constraints"), "{}", msg)
            }
            other => panic!("unexpected result: {:?}", other.map(|cs| cs.digest())),
        }

        assert!(compile(&Drifting(Cell::new(0)), &CompileOptions::default()).is_ok());
    }

    #[test]
    fn test_options_serde() {
        let options: CompileOptions = serde_json::from_str(r#"{"backend": "Gate"}"#).unwrap();
        assert_eq!(options.backend, BackendKind::Gate);
        assert!(options.eliminate_constant_wires);
        assert!(!options.check_determinism);

        let json = serde_json::to_string(&CompileOptions::default()).unwrap();
        assert_eq!(serde_json::from_str::<CompileOptions>(&json).unwrap(), CompileOptions::default());
    }

    #[test]
    fn test_from_env() {
        with_env_vars(
            vec![
                ("BELLWIRE_BACKEND", Some("GATE")),
                ("BELLWIRE_ELIMINATE_CONSTANTS", Some("0")),
                ("BELLWIRE_CHECK_DETERMINISM", Some("true")),
            ],
            || {
                let options = CompileOptions::from_env();
                assert_eq!(options.backend, BackendKind::Gate);
                assert!(!options.eliminate_constant_wires);
                assert!(options.check_determinism);
            },
        );

        with_env_vars(
            vec![
                ("BELLWIRE_BACKEND", Some("groth16")),
                ("BELLWIRE_ELIMINATE_CONSTANTS", Some("maybe")),
                ("BELLWIRE_CHECK_DETERMINISM", None),
            ],
            || assert_eq!(CompileOptions::from_env(), CompileOptions::default()),
        );
    }
}
