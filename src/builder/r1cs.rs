use ff::PrimeFieldBits;
use log::info;

use super::{check_constant_difference, Builder, BuilderCore};
use crate::constraint_system::{ConstraintSystem, Constraints, Rank1Constraint};
use crate::error::CompileError;
use crate::field::FieldContext;
use crate::store::VariableRole;
use crate::LinearCombination;

/// Compiles a circuit into rank-1 triples `L * R = O`.
///
/// Only multiplications of two non-constant expressions, assertions and hint
/// plumbing emit constraints; everything linear is folded into the operands.
#[derive(Debug)]
pub struct R1csBuilder<Scalar: PrimeFieldBits> {
    core: BuilderCore<Scalar>,
    constraints: Vec<Rank1Constraint<Scalar>>,
}

impl<Scalar: PrimeFieldBits> R1csBuilder<Scalar> {
    pub fn new(eliminate_constant_wires: bool) -> Self {
        R1csBuilder {
            core: BuilderCore::new(eliminate_constant_wires),
            constraints: Vec::new(),
        }
    }

    fn enforce(
        &mut self,
        l: LinearCombination<Scalar>,
        r: LinearCombination<Scalar>,
        o: LinearCombination<Scalar>,
    ) {
        self.constraints.push(Rank1Constraint { l, r, o });
    }

    pub fn into_system(self) -> ConstraintSystem<Scalar> {
        let (roles, public, secret) = self.core.store.into_parts();
        info!(
            "rank-1 system: {} constraints, {} variables, {} hints",
            self.constraints.len(),
            roles.len(),
            self.core.hints.len()
        );

        ConstraintSystem {
            field: self.core.field,
            roles,
            public,
            secret,
            constraints: Constraints::Rank1(self.constraints),
            hints: self.core.hints,
        }
    }
}

impl<Scalar: PrimeFieldBits> Builder<Scalar> for R1csBuilder<Scalar> {
    fn field(&self) -> &FieldContext<Scalar> {
        &self.core.field
    }

    fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    fn public_input(&mut self, name: &str) -> LinearCombination<Scalar> {
        self.core.input(VariableRole::Public, name)
    }

    fn secret_input(&mut self, name: &str) -> LinearCombination<Scalar> {
        self.core.input(VariableRole::Secret, name)
    }

    fn folds_constants(&self) -> bool {
        self.core.eliminate_constant_wires
    }

    fn wire(
        &mut self,
        x: &LinearCombination<Scalar>,
    ) -> Result<LinearCombination<Scalar>, CompileError> {
        if let Some(var) = x.as_variable() {
            return Ok(var.into());
        }

        if let Some(value) = x.as_constant() {
            if let Some(var) = self.core.cached_constant(&value) {
                return Ok(var.into());
            }
            let w = self.core.allocate();
            self.enforce(
                LinearCombination::constant(Scalar::ONE),
                LinearCombination::constant(value),
                w.into(),
            );
            self.core.remember_constant(&value, w);
            return Ok(w.into());
        }

        let w = self.core.allocate();
        self.enforce(
            x.clone(),
            LinearCombination::constant(Scalar::ONE),
            w.into(),
        );
        Ok(w.into())
    }

    fn mul(
        &mut self,
        a: &LinearCombination<Scalar>,
        b: &LinearCombination<Scalar>,
    ) -> Result<LinearCombination<Scalar>, CompileError> {
        if let Some(k) = a.as_constant() {
            return Ok(b.clone().scale(k));
        }
        if let Some(k) = b.as_constant() {
            return Ok(a.clone().scale(k));
        }

        let o = self.core.allocate();
        self.enforce(a.clone(), b.clone(), o.into());
        Ok(o.into())
    }

    fn assert_product(
        &mut self,
        a: &LinearCombination<Scalar>,
        b: &LinearCombination<Scalar>,
        c: &LinearCombination<Scalar>,
    ) -> Result<(), CompileError> {
        match (a.as_constant(), b.as_constant()) {
            (Some(k), _) => self.assert_equal(&b.clone().scale(k), c),
            (_, Some(k)) => self.assert_equal(&a.clone().scale(k), c),
            _ => {
                self.enforce(a.clone(), b.clone(), c.clone());
                Ok(())
            }
        }
    }

    fn assert_equal(
        &mut self,
        a: &LinearCombination<Scalar>,
        b: &LinearCombination<Scalar>,
    ) -> Result<(), CompileError> {
        let diff = a.clone() - b;
        if check_constant_difference(&diff, self.num_constraints())? {
            return Ok(());
        }

        self.enforce(
            diff,
            LinearCombination::constant(Scalar::ONE),
            LinearCombination::zero(),
        );
        Ok(())
    }

    fn assert_boolean(&mut self, x: &LinearCombination<Scalar>) -> Result<(), CompileError> {
        if self.core.fold_boolean_constant(x, self.num_constraints())? {
            return Ok(());
        }
        let x = if x.as_constant().is_some() {
            self.wire(x)?
        } else {
            x.clone()
        };

        if let Some(var) = x.as_variable() {
            if self.core.is_boolean(var) {
                return Ok(());
            }
            self.core.mark_boolean(var);
        }

        let x_minus_one = x.clone().add_constant(-Scalar::ONE);
        self.enforce(x, x_minus_one, LinearCombination::zero());
        Ok(())
    }

    fn hint(
        &mut self,
        name: &str,
        inputs: &[LinearCombination<Scalar>],
        n_outputs: usize,
    ) -> Result<Vec<LinearCombination<Scalar>>, CompileError> {
        let mut wires = Vec::with_capacity(inputs.len());
        for input in inputs {
            let wire = self.wire(input)?;
            wires.extend(wire.as_variable());
        }
        let position = self.num_constraints();

        Ok(self
            .core
            .bind_hint(name, wires, n_outputs, position)
            .into_iter()
            .map(LinearCombination::from)
            .collect())
    }
}
