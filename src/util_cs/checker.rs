//! Assertion helper for circuit tests.
//!
//! A [`CircuitChecker`] compiles a circuit under every configured backend and
//! constant policy, checks that each compilation is deterministic and
//! survives a round trip through the persisted form, and then expects solving
//! to succeed or fail for a given input set.

use ff::PrimeFieldBits;
use log::debug;

use crate::builder::Circuit;
use crate::compile::{compile, CompileOptions};
use crate::constraint_system::{BackendKind, ConstraintSystem};
use crate::error::SolveError;
use crate::hint::HintRegistry;
use crate::solver::{Assignment, Solver};

pub struct CircuitChecker {
    registry: HintRegistry,
    configurations: Vec<CompileOptions>,
}

impl Default for CircuitChecker {
    fn default() -> Self {
        Self::new()
    }
}

impl CircuitChecker {
    /// Checks both backends, with and without constant wire elimination,
    /// against the built-in hints.
    pub fn new() -> Self {
        Self::with_registry(HintRegistry::new())
    }

    pub fn with_registry(registry: HintRegistry) -> Self {
        let mut configurations = Vec::new();
        for backend in [BackendKind::Rank1, BackendKind::Gate] {
            for eliminate_constant_wires in [true, false] {
                configurations.push(CompileOptions {
                    backend,
                    eliminate_constant_wires,
                    check_determinism: true,
                });
            }
        }

        CircuitChecker {
            registry,
            configurations,
        }
    }

    /// Restricts the check to the given backends.
    pub fn backends(mut self, backends: &[BackendKind]) -> Self {
        self.configurations
            .retain(|options| backends.contains(&options.backend));
        self
    }

    pub fn registry(&self) -> &HintRegistry {
        &self.registry
    }

    /// Compiles `circuit` under every configuration, panicking on a compile
    /// error or a failed round trip.
    pub fn compile<Scalar, C>(&self, circuit: &C) -> Vec<ConstraintSystem<Scalar>>
    where
        Scalar: PrimeFieldBits,
        C: Circuit<Scalar>,
    {
        self.configurations
            .iter()
            .map(|options| {
                let cs = compile(circuit, options)
                    .unwrap_or_else(|e| panic!("compilation failed ({:?}): {}", options, e));

                let mut bytes = Vec::new();
                cs.serialize(&mut bytes)
                    .unwrap_or_else(|e| panic!("serialization failed ({:?}): {}", options, e));
                let reloaded = ConstraintSystem::<Scalar>::deserialize(&bytes[..])
                    .unwrap_or_else(|e| panic!("deserialization failed ({:?}): {}", options, e));
                assert_eq!(reloaded, cs, "round trip changed the system ({:?})", options);

                debug!("{:?}: {:?}", options, cs.stats());
                cs
            })
            .collect()
    }

    /// Solves `circuit` under every configuration, expecting success and the
    /// same public values everywhere.
    pub fn assert_solved<Scalar, C>(
        &self,
        circuit: &C,
        public: &[Scalar],
        secret: &[Scalar],
    ) -> Vec<Assignment<Scalar>>
    where
        Scalar: PrimeFieldBits,
        C: Circuit<Scalar>,
    {
        let assignments: Vec<Assignment<Scalar>> = self
            .compile(circuit)
            .iter()
            .zip(&self.configurations)
            .map(|(cs, options)| {
                let assignment = Solver::new(cs, &self.registry)
                    .solve(public, secret)
                    .unwrap_or_else(|e| panic!("solving failed ({:?}): {}", options, e));
                assert!(cs.verify(assignment.values()).is_ok());
                assignment
            })
            .collect();

        if let Some(first) = assignments.first() {
            for other in &assignments[1..] {
                assert_eq!(first.public_values(), other.public_values());
            }
        }
        assignments
    }

    /// Solves `circuit` under every configuration, expecting failure.
    pub fn assert_failed<Scalar, C>(
        &self,
        circuit: &C,
        public: &[Scalar],
        secret: &[Scalar],
    ) -> Vec<SolveError>
    where
        Scalar: PrimeFieldBits,
        C: Circuit<Scalar>,
    {
        self.compile(circuit)
            .iter()
            .zip(&self.configurations)
            .map(|(cs, options)| {
                match Solver::new(cs, &self.registry).solve(public, secret) {
                    Ok(_) => panic!("solving succeeded unexpectedly ({:?})", options),
                    Err(e) => e,
                }
            })
            .collect()
    }
}
