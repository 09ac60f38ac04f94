//! `bellwire` compiles arithmetic circuits over a prime field into constraint
//! systems and computes satisfying witnesses for them.
//!
//! A circuit is written once against the [`Builder`] trait. The compiler runs
//! it against one of two backends: a rank-1 backend emitting `(L)·(R) = (O)`
//! triples, or a gate backend emitting fused
//! `q_l·l + q_r·r + q_o·o + q_m·l·r + q_c = 0` gates with derived copy
//! constraints. Values the constraints cannot express directly (inverses, bit
//! decompositions) are produced at solve time by named hints, looked up in a
//! [`HintRegistry`].
//!
//! # Example circuit
//!
//! ```
//! use bellwire::{compile, solve, BackendKind, Builder, Circuit, CompileError, CompileOptions,
//!     HintRegistry};
//! use blstrs::Scalar as Fr;
//!
//! /// Proves knowledge of `x` with `x³ + x + 5 = y`.
//! struct Cubic;
//!
//! impl Circuit<Fr> for Cubic {
//!     fn define<B: Builder<Fr>>(&self, api: &mut B) -> Result<(), CompileError> {
//!         let y = api.public_input("y");
//!         let x = api.secret_input("x");
//!         let x2 = api.mul(&x, &x)?;
//!         let x3 = api.mul(&x2, &x)?;
//!         let lhs = api.add(&api.add(&x3, &x), &api.constant(Fr::from(5u64)));
//!         api.assert_equal(&lhs, &y)
//!     }
//! }
//!
//! for backend in [BackendKind::Rank1, BackendKind::Gate] {
//!     let cs = compile(&Cubic, &CompileOptions::new(backend)).unwrap();
//!     let registry = HintRegistry::new();
//!
//!     assert!(solve(&cs, &registry, &[Fr::from(35u64)], &[Fr::from(3u64)]).is_ok());
//!     assert!(solve(&cs, &registry, &[Fr::from(36u64)], &[Fr::from(3u64)]).is_err());
//! }
//! ```

pub mod builder;
pub mod compile;
pub mod constraint_system;
mod encoding;
pub mod error;
pub mod field;
pub mod gadgets;
pub mod hint;
pub mod solver;
pub mod store;
#[cfg(test)]
pub mod test_utils;
pub mod util_cs;

mod lc;
pub use lc::{LinearCombination, Variable};

pub use builder::{Builder, Circuit, GateBuilder, R1csBuilder};
pub use compile::{compile, CompileOptions};
pub use constraint_system::{BackendKind, ConstraintSystem, Constraints, Gate, Rank1Constraint};
pub use error::{CompileError, RegistryError, SerializationError, SolveError};
pub use field::FieldContext;
pub use hint::{global_hints, normalize_hint_name, register_global_hint, HintRegistry};
pub use solver::{solve, Assignment, Solver, SolverOptions, SurplusInputs};
pub use store::VariableRole;

pub const BELLWIRE_VERSION: &str = env!("CARGO_PKG_VERSION");
