//! Circuit definitions and the builders that compile them.
//!
//! A circuit is written once against the [`Builder`] trait and compiled by
//! either backend: [`R1csBuilder`] emits rank-1 triples, [`GateBuilder`]
//! emits fused arithmetic gates.

use std::collections::{BTreeMap, BTreeSet};

use ff::PrimeFieldBits;
use log::trace;

use crate::error::CompileError;
use crate::field::FieldContext;
use crate::hint::{normalize_hint_name, HintBinding, BITS_HINT, DIV_HINT, INVERT_HINT};
use crate::store::{VariableRole, VariableStore};
use crate::{LinearCombination, Variable};

mod gate;
mod r1cs;

pub use gate::GateBuilder;
pub use r1cs::R1csBuilder;

/// Computations are expressed in terms of arithmetic circuits. The `Circuit`
/// trait represents a circuit that can be compiled by any [`Builder`]. The
/// `define` method must issue the same calls in the same order every time it
/// runs.
pub trait Circuit<Scalar: PrimeFieldBits> {
    fn define<B: Builder<Scalar>>(&self, api: &mut B) -> Result<(), CompileError>;
}

/// The primitive operation set a circuit is written against.
///
/// Linear operations never emit constraints and have shared implementations.
/// `div`, `inverse`, `select` and `to_bits` are expressed through the
/// constraint-emitting primitives, so both backends agree on them.
pub trait Builder<Scalar: PrimeFieldBits> {
    fn field(&self) -> &FieldContext<Scalar>;

    /// Number of constraints emitted so far.
    fn num_constraints(&self) -> usize;

    /// Declares the next public input.
    fn public_input(&mut self, name: &str) -> LinearCombination<Scalar>;

    /// Declares the next secret input.
    fn secret_input(&mut self, name: &str) -> LinearCombination<Scalar>;

    /// Whether operands that are known constants are folded at compile time
    /// instead of being pinned to wires.
    fn folds_constants(&self) -> bool;

    /// Returns an expression consisting of exactly one wire holding the value
    /// of `x`, emitting whatever constraints that takes.
    fn wire(&mut self, x: &LinearCombination<Scalar>)
        -> Result<LinearCombination<Scalar>, CompileError>;

    fn mul(
        &mut self,
        a: &LinearCombination<Scalar>,
        b: &LinearCombination<Scalar>,
    ) -> Result<LinearCombination<Scalar>, CompileError>;

    /// Enforce that `a` * `b` = `c`.
    fn assert_product(
        &mut self,
        a: &LinearCombination<Scalar>,
        b: &LinearCombination<Scalar>,
        c: &LinearCombination<Scalar>,
    ) -> Result<(), CompileError>;

    fn assert_equal(
        &mut self,
        a: &LinearCombination<Scalar>,
        b: &LinearCombination<Scalar>,
    ) -> Result<(), CompileError>;

    fn assert_boolean(&mut self, x: &LinearCombination<Scalar>) -> Result<(), CompileError>;

    /// Binds `n_outputs` fresh wires to the result of running hint `name` on
    /// `inputs` at solve time. The outputs are unconstrained: the caller must
    /// constrain them.
    fn hint(
        &mut self,
        name: &str,
        inputs: &[LinearCombination<Scalar>],
        n_outputs: usize,
    ) -> Result<Vec<LinearCombination<Scalar>>, CompileError>;

    fn constant(&self, value: Scalar) -> LinearCombination<Scalar> {
        LinearCombination::constant(value)
    }

    fn add(
        &self,
        a: &LinearCombination<Scalar>,
        b: &LinearCombination<Scalar>,
    ) -> LinearCombination<Scalar> {
        a.clone() + b
    }

    fn sub(
        &self,
        a: &LinearCombination<Scalar>,
        b: &LinearCombination<Scalar>,
    ) -> LinearCombination<Scalar> {
        a.clone() - b
    }

    fn neg(&self, a: &LinearCombination<Scalar>) -> LinearCombination<Scalar> {
        -a.clone()
    }

    fn scale(&self, a: &LinearCombination<Scalar>, factor: Scalar) -> LinearCombination<Scalar> {
        a.clone().scale(factor)
    }

    /// Recomposes little-endian bits into a value.
    fn from_bits(&self, bits: &[LinearCombination<Scalar>]) -> LinearCombination<Scalar> {
        let mut coeff = Scalar::ONE;
        let mut acc = LinearCombination::zero();
        for bit in bits {
            acc = acc + (coeff, bit);
            coeff = coeff.double();
        }
        acc
    }

    fn div(
        &mut self,
        a: &LinearCombination<Scalar>,
        b: &LinearCombination<Scalar>,
    ) -> Result<LinearCombination<Scalar>, CompileError> {
        if let Some(divisor) = b.as_constant() {
            let inverse = self
                .field()
                .inverse(&divisor)
                .ok_or(CompileError::DivisionByZeroConstant {
                    constraint: self.num_constraints(),
                })?;
            return Ok(a.clone().scale(inverse));
        }

        let a = self.wire(a)?;
        let b = self.wire(b)?;
        let quotient = single(
            self.hint(DIV_HINT, &[a.clone(), b.clone()], 1)?,
            self.num_constraints(),
        )?;
        self.assert_product(&b, &quotient, &a)?;
        Ok(quotient)
    }

    fn inverse(
        &mut self,
        a: &LinearCombination<Scalar>,
    ) -> Result<LinearCombination<Scalar>, CompileError> {
        if let Some(value) = a.as_constant() {
            let inverse = self
                .field()
                .inverse(&value)
                .ok_or(CompileError::DivisionByZeroConstant {
                    constraint: self.num_constraints(),
                })?;
            return Ok(LinearCombination::constant(inverse));
        }

        let a = self.wire(a)?;
        let y = single(
            self.hint(INVERT_HINT, std::slice::from_ref(&a), 1)?,
            self.num_constraints(),
        )?;
        self.assert_product(&a, &y, &LinearCombination::constant(Scalar::ONE))?;
        Ok(y)
    }

    /// `c ? a : b`, constraining `c` to be boolean.
    fn select(
        &mut self,
        c: &LinearCombination<Scalar>,
        a: &LinearCombination<Scalar>,
        b: &LinearCombination<Scalar>,
    ) -> Result<LinearCombination<Scalar>, CompileError> {
        let c = match c.as_constant() {
            Some(value) if self.folds_constants() => {
                return if value == Scalar::ONE {
                    Ok(a.clone())
                } else if bool::from(value.is_zero()) {
                    Ok(b.clone())
                } else {
                    Err(CompileError::MalformedCircuit {
                        constraint: self.num_constraints(),
                        reason: "select condition is a non-boolean constant".into(),
                    })
                };
            }
            Some(_) => self.wire(c)?,
            None => c.clone(),
        };

        self.assert_boolean(&c)?;
        let diff = a.clone() - b;
        let chosen = self.mul(&c, &diff)?;
        Ok(chosen + b)
    }

    /// Decomposes `x` into `n` little-endian bits, each constrained boolean.
    fn to_bits(
        &mut self,
        x: &LinearCombination<Scalar>,
        n: usize,
    ) -> Result<Vec<LinearCombination<Scalar>>, CompileError> {
        let num_bits = self.field().num_bits() as usize;
        if n == 0 || n > num_bits {
            return Err(CompileError::MalformedCircuit {
                constraint: self.num_constraints(),
                reason: format!("cannot decompose into {} bits (field has {})", n, num_bits),
            });
        }

        if let Some(value) = x.as_constant() {
            if self.folds_constants() {
                let bits = self.field().decompose(&value, n).ok_or_else(|| {
                    CompileError::MalformedCircuit {
                        constraint: self.num_constraints(),
                        reason: format!("constant does not fit in {} bits", n),
                    }
                })?;
                return Ok(bits
                    .into_iter()
                    .map(|bit| LinearCombination::constant(Scalar::from(u64::from(bit))))
                    .collect());
            }
        }

        let bits = self.hint(BITS_HINT, std::slice::from_ref(x), n)?;
        for bit in &bits {
            self.assert_boolean(bit)?;
        }
        let recomposed = self.from_bits(&bits);
        self.assert_equal(&recomposed, x)?;
        Ok(bits)
    }
}

/// The only output of a single-output hint. `constraint` is the position
/// reported if there is none.
pub(crate) fn single<Scalar: PrimeFieldBits>(
    mut outputs: Vec<LinearCombination<Scalar>>,
    constraint: usize,
) -> Result<LinearCombination<Scalar>, CompileError> {
    outputs.pop().ok_or_else(|| CompileError::MalformedCircuit {
        constraint,
        reason: "hint produced no output".into(),
    })
}

/// State both backends keep while a circuit is being defined.
#[derive(Debug)]
pub(crate) struct BuilderCore<Scalar: PrimeFieldBits> {
    pub(crate) field: FieldContext<Scalar>,
    pub(crate) store: VariableStore,
    pub(crate) hints: Vec<HintBinding>,
    pub(crate) eliminate_constant_wires: bool,
    booleans: BTreeSet<Variable>,
    constants: BTreeMap<Vec<u8>, Variable>,
}

impl<Scalar: PrimeFieldBits> BuilderCore<Scalar> {
    pub(crate) fn new(eliminate_constant_wires: bool) -> Self {
        BuilderCore {
            field: FieldContext::new(),
            store: VariableStore::new(),
            hints: Vec::new(),
            eliminate_constant_wires,
            booleans: BTreeSet::new(),
            constants: BTreeMap::new(),
        }
    }

    pub(crate) fn input(&mut self, role: VariableRole, name: &str) -> LinearCombination<Scalar> {
        let var = self.store.allocate_input(role, name.to_string());
        trace!("{:?} input `{}` is variable {}", role, name, var.0);
        var.into()
    }

    pub(crate) fn allocate(&mut self) -> Variable {
        self.store.allocate(VariableRole::Internal)
    }

    pub(crate) fn is_boolean(&self, var: Variable) -> bool {
        self.booleans.contains(&var)
    }

    pub(crate) fn mark_boolean(&mut self, var: Variable) {
        self.booleans.insert(var);
    }

    /// The wire already pinned to `value`, if constant wires are shared.
    pub(crate) fn cached_constant(&self, value: &Scalar) -> Option<Variable> {
        if !self.eliminate_constant_wires {
            return None;
        }
        self.constants.get(&self.field.to_bytes(value)).copied()
    }

    pub(crate) fn remember_constant(&mut self, value: &Scalar, var: Variable) {
        if self.eliminate_constant_wires {
            self.constants.insert(self.field.to_bytes(value), var);
        }
    }

    pub(crate) fn bind_hint(
        &mut self,
        name: &str,
        inputs: Vec<Variable>,
        n_outputs: usize,
        position: usize,
    ) -> Vec<Variable> {
        let outputs: Vec<Variable> = (0..n_outputs).map(|_| self.allocate()).collect();
        let name = normalize_hint_name(name);
        trace!(
            "hint {} bound to {} inputs, {} outputs after constraint {}",
            name,
            inputs.len(),
            n_outputs,
            position
        );
        self.hints.push(HintBinding {
            name,
            inputs,
            outputs: outputs.clone(),
            position,
        });
        outputs
    }

    /// Rejects a constant `x` unless it is 0 or 1. Returns `true` when there
    /// is nothing left to constrain.
    pub(crate) fn fold_boolean_constant(
        &self,
        x: &LinearCombination<Scalar>,
        constraint: usize,
    ) -> Result<bool, CompileError> {
        match x.as_constant() {
            Some(value) if self.eliminate_constant_wires => {
                if bool::from(value.is_zero()) || value == Scalar::ONE {
                    Ok(true)
                } else {
                    Err(CompileError::MalformedCircuit {
                        constraint,
                        reason: "boolean assertion on a non-boolean constant".into(),
                    })
                }
            }
            _ => Ok(false),
        }
    }
}

/// Rejects an equality between two distinct constants.
pub(crate) fn check_constant_difference<Scalar: PrimeFieldBits>(
    diff: &LinearCombination<Scalar>,
    constraint: usize,
) -> Result<bool, CompileError> {
    match diff.as_constant() {
        Some(value) if bool::from(value.is_zero()) => Ok(true),
        Some(_) => Err(CompileError::MalformedCircuit {
            constraint,
            reason: "equality between two distinct constants".into(),
        }),
        None => Ok(false),
    }
}
