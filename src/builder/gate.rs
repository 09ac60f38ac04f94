use ff::PrimeFieldBits;
use log::info;

use super::{check_constant_difference, Builder, BuilderCore};
use crate::constraint_system::{derive_copies, ConstraintSystem, Constraints, Gate};
use crate::error::CompileError;
use crate::field::FieldContext;
use crate::store::VariableRole;
use crate::{LinearCombination, Variable};

/// Compiles a circuit into fused arithmetic gates
/// `qL·l + qR·r + qO·o + qM·l·r + qC = 0` with three wire slots each.
///
/// Expressions over more than a couple of wires are first materialized
/// through a chain of addition gates. The copy constraint table is derived
/// when the builder is frozen.
#[derive(Debug)]
pub struct GateBuilder<Scalar: PrimeFieldBits> {
    core: BuilderCore<Scalar>,
    gates: Vec<Gate<Scalar>>,
}

impl<Scalar: PrimeFieldBits> GateBuilder<Scalar> {
    pub fn new(eliminate_constant_wires: bool) -> Self {
        GateBuilder {
            core: BuilderCore::new(eliminate_constant_wires),
            gates: Vec::new(),
        }
    }

    pub fn into_system(self) -> ConstraintSystem<Scalar> {
        let (roles, public, secret) = self.core.store.into_parts();
        let copies = derive_copies(&self.gates);
        info!(
            "gate system: {} gates, {} copy constraints, {} variables, {} hints",
            self.gates.len(),
            copies.len(),
            roles.len(),
            self.core.hints.len()
        );

        ConstraintSystem {
            field: self.core.field,
            roles,
            public,
            secret,
            constraints: Constraints::Gate {
                gates: self.gates,
                copies,
            },
            hints: self.core.hints,
        }
    }

    /// Pins a fresh or shared wire to `value`.
    fn pin(&mut self, value: Scalar) -> Variable {
        if let Some(var) = self.core.cached_constant(&value) {
            return var;
        }
        let w = self.core.allocate();
        self.gates.push(Gate {
            q_l: Scalar::ONE,
            q_c: -value,
            l: Some(w),
            ..Gate::empty()
        });
        self.core.remember_constant(&value, w);
        w
    }

    /// A single wire equal to `x`.
    fn materialize(&mut self, x: &LinearCombination<Scalar>) -> Variable {
        if let Some(var) = x.as_variable() {
            return var;
        }
        if let Some(value) = x.as_constant() {
            return self.pin(value);
        }

        let mut terms = x.iter().map(|(var, coeff)| (*coeff, var));
        let constant = x.constant_term();
        let (mut acc_coeff, mut acc) = match terms.next() {
            Some(first) => first,
            None => return self.pin(constant),
        };

        let rest: Vec<(Scalar, Variable)> = terms.collect();
        if rest.is_empty() {
            let w = self.core.allocate();
            self.gates.push(Gate {
                q_l: acc_coeff,
                q_o: -Scalar::ONE,
                q_c: constant,
                l: Some(acc),
                o: Some(w),
                ..Gate::empty()
            });
            return w;
        }

        let last = rest.len() - 1;
        for (i, (coeff, var)) in rest.into_iter().enumerate() {
            let w = self.core.allocate();
            self.gates.push(Gate {
                q_l: acc_coeff,
                q_r: coeff,
                q_o: -Scalar::ONE,
                q_c: if i == last { constant } else { Scalar::ZERO },
                l: Some(acc),
                r: Some(var),
                o: Some(w),
                ..Gate::empty()
            });
            acc_coeff = Scalar::ONE;
            acc = w;
        }
        acc
    }

    /// Splits `x` into `c·v + k`, materializing it first if it spans several
    /// wires. `x` must not be constant.
    fn single_term(&mut self, x: &LinearCombination<Scalar>) -> (Scalar, Variable, Scalar) {
        match x.as_single_term() {
            Some(term) => term,
            None => (Scalar::ONE, self.materialize(x), Scalar::ZERO),
        }
    }

    /// Emits gates enforcing `x = 0` for a non-constant `x`.
    fn enforce_zero(&mut self, x: LinearCombination<Scalar>) {
        let mut terms: Vec<(Scalar, Variable)> = x.iter().map(|(var, coeff)| (*coeff, var)).collect();
        let mut constant = x.constant_term();

        if terms.len() > 3 {
            let tail = terms.split_off(terms.len() - 2);
            let head = terms
                .into_iter()
                .fold(LinearCombination::constant(constant), |lc, term| lc + term);
            terms = vec![(Scalar::ONE, self.materialize(&head))];
            terms.extend(tail);
            constant = Scalar::ZERO;
        }

        let mut gate = Gate {
            q_c: constant,
            ..Gate::empty()
        };
        let mut slots = terms.into_iter();
        if let Some((coeff, var)) = slots.next() {
            gate.q_l = coeff;
            gate.l = Some(var);
        }
        if let Some((coeff, var)) = slots.next() {
            gate.q_r = coeff;
            gate.r = Some(var);
        }
        if let Some((coeff, var)) = slots.next() {
            gate.q_o = coeff;
            gate.o = Some(var);
        }
        self.gates.push(gate);
    }
}

impl<Scalar: PrimeFieldBits> Builder<Scalar> for GateBuilder<Scalar> {
    fn field(&self) -> &FieldContext<Scalar> {
        &self.core.field
    }

    fn num_constraints(&self) -> usize {
        self.gates.len()
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
        Ok(self.materialize(x).into())
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

        let (ca, xa, ka) = self.single_term(a);
        let (cb, xb, kb) = self.single_term(b);
        let o = self.core.allocate();
        self.gates.push(Gate {
            q_m: ca * cb,
            q_l: ca * kb,
            q_r: cb * ka,
            q_o: -Scalar::ONE,
            q_c: ka * kb,
            l: Some(xa),
            r: Some(xb),
            o: Some(o),
        });
        Ok(o.into())
    }

    fn assert_product(
        &mut self,
        a: &LinearCombination<Scalar>,
        b: &LinearCombination<Scalar>,
        c: &LinearCombination<Scalar>,
    ) -> Result<(), CompileError> {
        match (a.as_constant(), b.as_constant()) {
            (Some(k), _) => return self.assert_equal(&b.clone().scale(k), c),
            (_, Some(k)) => return self.assert_equal(&a.clone().scale(k), c),
            _ => {}
        }

        let (ca, xa, ka) = self.single_term(a);
        let (cb, xb, kb) = self.single_term(b);
        let (q_o, o, kc) = match c.as_constant() {
            Some(kc) => (Scalar::ZERO, None, kc),
            None => {
                let (cc, xc, kc) = self.single_term(c);
                (-cc, Some(xc), kc)
            }
        };

        self.gates.push(Gate {
            q_m: ca * cb,
            q_l: ca * kb,
            q_r: cb * ka,
            q_o,
            q_c: ka * kb - kc,
            l: Some(xa),
            r: Some(xb),
            o,
        });
        Ok(())
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

        self.enforce_zero(diff);
        Ok(())
    }

    fn assert_boolean(&mut self, x: &LinearCombination<Scalar>) -> Result<(), CompileError> {
        if self.core.fold_boolean_constant(x, self.num_constraints())? {
            return Ok(());
        }

        let (c, var, k) = match x.as_constant() {
            Some(value) => (Scalar::ONE, self.pin(value), Scalar::ZERO),
            None => self.single_term(x),
        };
        let plain = c == Scalar::ONE && bool::from(k.is_zero());
        if plain {
            if self.core.is_boolean(var) {
                return Ok(());
            }
            self.core.mark_boolean(var);
        }

        // (c·x + k)(c·x + k - 1) = 0
        self.gates.push(Gate {
            q_m: c * c,
            q_l: (c * k).double() - c,
            q_c: k.square() - k,
            l: Some(var),
            r: Some(var),
            ..Gate::empty()
        });
        Ok(())
    }

    fn hint(
        &mut self,
        name: &str,
        inputs: &[LinearCombination<Scalar>],
        n_outputs: usize,
    ) -> Result<Vec<LinearCombination<Scalar>>, CompileError> {
        let wires = inputs.iter().map(|input| self.materialize(input)).collect();
        let position = self.num_constraints();

        Ok(self
            .core
            .bind_hint(name, wires, n_outputs, position)
            .into_iter()
            .map(LinearCombination::from)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint_system::{CopyConstraint, Slot, WireRef};
    use blstrs::Scalar as Fr;
    use ff::Field;

    fn gates(cs: &ConstraintSystem<Fr>) -> &[Gate<Fr>] {
        match cs.constraints() {
            Constraints::Gate { gates, .. } => gates,
            Constraints::Rank1(_) => panic!("expected a gate system"),
        }
    }

    #[test]
    fn test_fused_multiply_add() {
        let mut api = GateBuilder::<Fr>::new(true);
        let a = api.secret_input("a");
        let b = api.secret_input("b");

        // (2a + 1) * (b + 3)
        let lhs = api.scale(&a, Fr::from(2u64)).add_constant(Fr::ONE);
        let rhs = b.clone().add_constant(Fr::from(3u64));
        let out = api.mul(&lhs, &rhs).unwrap();

        let cs = api.into_system();
        assert_eq!(cs.num_constraints(), 1);
        let g = &gates(&cs)[0];
        assert_eq!(g.q_m, Fr::from(2u64));
        assert_eq!(g.q_l, Fr::from(6u64));
        assert_eq!(g.q_r, Fr::ONE);
        assert_eq!(g.q_c, Fr::from(3u64));
        assert_eq!(g.q_o, -Fr::ONE);
        assert_eq!(out.as_variable(), g.o);

        let values = [Fr::from(4u64), Fr::from(5u64), Fr::from(72u64)];
        assert!(cs.verify(&values).is_ok());
    }

    #[test]
    fn test_wide_equality_is_chained() {
        let mut api = GateBuilder::<Fr>::new(true);
        let inputs: Vec<_> = (0..5).map(|i| api.secret_input(&format!("x{}", i))).collect();

        let sum = inputs.iter().fold(LinearCombination::zero(), |acc, x| acc + x);
        api.assert_equal(&sum, &api.constant(Fr::from(15u64))).unwrap();

        let cs = api.into_system();
        // Two addition gates fold x0..x2, the last gate checks the rest.
        assert_eq!(cs.num_constraints(), 3);
        assert_eq!(cs.num_variables(), 7);

        let mut values: Vec<Fr> = (1..=5u64).map(Fr::from).collect();
        values.push(Fr::from(3u64));
        values.push(Fr::from(6u64) - Fr::from(15u64));
        assert!(cs.verify(&values).is_ok());
    }

    #[test]
    fn test_boolean_gate() {
        let mut api = GateBuilder::<Fr>::new(true);
        let x = api.secret_input("x");

        // 3x + 2 must be boolean.
        let y = api.scale(&x, Fr::from(3u64)).add_constant(Fr::from(2u64));
        api.assert_boolean(&y).unwrap();
        api.assert_boolean(&x).unwrap();
        api.assert_boolean(&x).unwrap();

        let cs = api.into_system();
        assert_eq!(cs.num_constraints(), 2);

        let third = Fr::from(3u64).invert().unwrap();
        // x = -1/3 makes 3x + 2 = 1.
        assert!(cs.violation(0, &[-third]).is_none());
        assert!(cs.violation(0, &[Fr::ONE]).is_some());
        assert!(cs.violation(1, &[Fr::ONE]).is_none());
    }

    #[test]
    fn test_copy_constraints() {
        let mut api = GateBuilder::<Fr>::new(true);
        let a = api.public_input("A");
        let b = api.public_input("B");

        let sq = api.mul(&a, &a).unwrap();
        api.assert_equal(&sq, &b).unwrap();

        let cs = api.into_system();
        let copies = match cs.constraints() {
            Constraints::Gate { copies, .. } => copies.clone(),
            Constraints::Rank1(_) => unreachable!(),
        };
        let wire = |gate, slot| WireRef { gate, slot };
        assert_eq!(
            copies,
            vec![
                CopyConstraint {
                    from: wire(0, Slot::Left),
                    to: wire(0, Slot::Right),
                },
                CopyConstraint {
                    from: wire(0, Slot::Output),
                    to: wire(1, Slot::Right),
                },
            ]
        );
    }

    #[test]
    fn test_hint_inputs_materialized() {
        let mut api = GateBuilder::<Fr>::new(true);
        let x = api.secret_input("x");
        let y = api.secret_input("y");

        let sum = api.add(&x, &y);
        let out = api.inverse(&sum).unwrap();

        let cs = api.into_system();
        // Addition gate for the hint input, then the inverse check.
        assert_eq!(cs.num_constraints(), 2);
        assert_eq!(cs.hints()[0].inputs, vec![Variable(2)]);
        assert_eq!(out.as_variable(), Some(Variable(3)));
    }
}
