//! Witness computation.
//!
//! The solver seeds the declared inputs and then propagates values to a
//! fixpoint. Every pass walks the constraints in compiled order; a hint runs
//! at the position it was bound, once its inputs are known, and a constraint
//! with a single unknown wire appearing linearly is solved for that wire. A
//! pass that learns nothing while wires are still unknown means the system is
//! underdetermined.

use ff::PrimeFieldBits;
use log::{debug, info, trace};
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use crate::constraint_system::{ConstraintSystem, Constraints};
use crate::error::SolveError;
use crate::field;
use crate::hint::HintRegistry;
use crate::store::VariableRole;
use crate::{LinearCombination, Variable};

/// What to do with more input values than declared inputs.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SurplusInputs {
    /// Fail with [`SolveError::ExtraInput`].
    #[default]
    Reject,
    /// Use the leading values and drop the rest.
    Ignore,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverOptions {
    pub surplus_inputs: SurplusInputs,
}

/// A complete assignment of every variable of a constraint system.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Assignment<Scalar: PrimeFieldBits> {
    values: Vec<Scalar>,
    public: Vec<Variable>,
    secret: Vec<Variable>,
}

impl<Scalar: PrimeFieldBits> Assignment<Scalar> {
    pub fn get(&self, var: Variable) -> Scalar {
        self.values[var.0]
    }

    /// Values indexed by variable id.
    pub fn values(&self) -> &[Scalar] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn public_values(&self) -> Vec<Scalar> {
        self.public.iter().map(|var| self.values[var.0]).collect()
    }

    pub fn secret_values(&self) -> Vec<Scalar> {
        self.secret.iter().map(|var| self.values[var.0]).collect()
    }

    pub fn to_biguints(&self) -> Vec<BigUint> {
        self.values.iter().map(field::to_biguint).collect()
    }
}

/// `u·coeff + constant` for the single unknown `u` of a constraint.
#[derive(Copy, Clone)]
struct Affine<Scalar> {
    coeff: Scalar,
    constant: Scalar,
}

impl<Scalar: PrimeFieldBits> Affine<Scalar> {
    fn known(constant: Scalar) -> Self {
        Affine {
            coeff: Scalar::ZERO,
            constant,
        }
    }

    fn of_lc(lc: &LinearCombination<Scalar>, unknown: Variable, values: &[Option<Scalar>]) -> Self {
        lc.iter().fold(Self::known(lc.constant_term()), |mut acc, (var, coeff)| {
            if var == unknown {
                acc.coeff += coeff;
            } else if let Some(value) = values[var.0] {
                acc.constant += *coeff * value;
            }
            acc
        })
    }

    fn of_slot(slot: Option<Variable>, unknown: Variable, values: &[Option<Scalar>]) -> Self {
        match slot {
            Some(var) if var == unknown => Affine {
                coeff: Scalar::ONE,
                constant: Scalar::ZERO,
            },
            Some(var) => Self::known(values[var.0].unwrap_or(Scalar::ZERO)),
            None => Self::known(Scalar::ZERO),
        }
    }
}

/// Coefficients of `quad·u² + lin·u + constant = 0`.
struct Residual<Scalar> {
    quad: Scalar,
    lin: Scalar,
    constant: Scalar,
}

/// Computes a full assignment for one constraint system.
///
/// A solver may be reused for several input sets; after a failure the
/// values it had learned remain available through [`Solver::partial`].
pub struct Solver<'a, Scalar: PrimeFieldBits> {
    cs: &'a ConstraintSystem<Scalar>,
    hints: &'a HintRegistry,
    options: SolverOptions,
    values: Vec<Option<Scalar>>,
    passes: usize,
}

impl<'a, Scalar: PrimeFieldBits> Solver<'a, Scalar> {
    pub fn new(cs: &'a ConstraintSystem<Scalar>, hints: &'a HintRegistry) -> Self {
        Solver {
            cs,
            hints,
            options: SolverOptions::default(),
            values: Vec::new(),
            passes: 0,
        }
    }

    pub fn with_options(mut self, options: SolverOptions) -> Self {
        self.options = options;
        self
    }

    /// Values known so far, indexed by variable id.
    pub fn partial(&self) -> &[Option<Scalar>] {
        &self.values
    }

    /// Propagation passes taken by the last call to [`Solver::solve`].
    pub fn passes(&self) -> usize {
        self.passes
    }

    pub fn solve(
        &mut self,
        public: &[Scalar],
        secret: &[Scalar],
    ) -> Result<Assignment<Scalar>, SolveError> {
        let result = self.run(public, secret);

        #[cfg(debug_assertions)]
        if let Err(e) = &result {
            debug!("solving failed: {}", e);
            for (i, value) in self.values.iter().enumerate() {
                match value {
                    Some(value) => debug!("  v{} = {}", i, field::display(value)),
                    None => debug!("  v{} = ?", i),
                }
            }
        }

        result
    }

    fn run(&mut self, public: &[Scalar], secret: &[Scalar]) -> Result<Assignment<Scalar>, SolveError> {
        let cs = self.cs;
        let n = cs.num_variables();
        self.values = vec![None; n];

        for binding in cs.hints() {
            self.hints.check(binding)?;
        }

        self.seed(VariableRole::Public, cs.public_inputs(), public)?;
        self.seed(VariableRole::Secret, cs.secret_inputs(), secret)?;

        let mut referenced = vec![false; n];
        let mut hint_owned = vec![false; n];
        for index in 0..cs.num_constraints() {
            for var in cs.constraints().variables_of(index) {
                referenced[var.0] = true;
            }
        }
        for binding in cs.hints() {
            for var in binding.inputs.iter() {
                referenced[var.0] = true;
            }
            for var in binding.outputs.iter() {
                referenced[var.0] = true;
                hint_owned[var.0] = true;
            }
        }

        let mut order: Vec<usize> = (0..cs.hints().len()).collect();
        order.sort_by_key(|index| cs.hints()[*index].position);

        let mut fired = vec![false; cs.hints().len()];
        let mut settled = vec![false; cs.num_constraints()];
        let mut cursor = 0;
        self.passes = 0;

        loop {
            while cursor < n && !(referenced[cursor] && self.values[cursor].is_none()) {
                cursor += 1;
            }
            if cursor == n {
                break;
            }

            self.passes += 1;
            let mut progress = false;
            let mut next_hint = 0;

            for index in 0..=cs.num_constraints() {
                while next_hint < order.len() && cs.hints()[order[next_hint]].position <= index {
                    let hint = order[next_hint];
                    next_hint += 1;
                    if !fired[hint] && self.fire(hint)? {
                        fired[hint] = true;
                        progress = true;
                    }
                }
                if index == cs.num_constraints() || settled[index] {
                    continue;
                }

                let mut unknown = None;
                let mut several = false;
                for var in cs.constraints().variables_of(index) {
                    if self.values[var.0].is_some() {
                        continue;
                    }
                    match unknown {
                        None => unknown = Some(var),
                        Some(first) if first != var => {
                            several = true;
                            break;
                        }
                        Some(_) => {}
                    }
                }

                match unknown {
                    None => {
                        self.check(index)?;
                        settled[index] = true;
                    }
                    Some(var) if !several && !hint_owned[var.0] => {
                        if self.isolate(index, var) {
                            settled[index] = true;
                            progress = true;
                        }
                    }
                    Some(_) => {}
                }
            }

            debug!("pass {}: progress = {}", self.passes, progress);
            if !progress {
                return Err(SolveError::UnderdeterminedSystem {
                    variable: cursor,
                });
            }
        }

        let values: Vec<Scalar> = self
            .values
            .iter()
            .map(|value| value.unwrap_or(Scalar::ZERO))
            .collect();
        cs.verify(&values)?;

        info!(
            "solved {} variables over {} constraints in {} passes",
            n,
            cs.num_constraints(),
            self.passes
        );
        Ok(Assignment {
            values,
            public: cs.public_inputs().iter().map(|(var, _)| *var).collect(),
            secret: cs.secret_inputs().iter().map(|(var, _)| *var).collect(),
        })
    }

    fn seed(
        &mut self,
        role: VariableRole,
        declared: &[(Variable, String)],
        supplied: &[Scalar],
    ) -> Result<(), SolveError> {
        if supplied.len() < declared.len() {
            let (_, name) = &declared[supplied.len()];
            return Err(SolveError::MissingInput {
                role,
                index: supplied.len(),
                name: name.clone(),
            });
        }
        if supplied.len() > declared.len() && self.options.surplus_inputs == SurplusInputs::Reject {
            return Err(SolveError::ExtraInput {
                role,
                expected: declared.len(),
                got: supplied.len(),
            });
        }

        for ((var, _), value) in declared.iter().zip(supplied) {
            self.values[var.0] = Some(*value);
        }
        Ok(())
    }

    /// Verifies constraint `index`, all of whose variables are known.
    fn check(&self, index: usize) -> Result<(), SolveError> {
        let values = &self.values;
        match self
            .cs
            .violation_with(index, |var| values[var.0].unwrap_or(Scalar::ZERO))
        {
            Some(detail) => Err(SolveError::ConstraintViolated { index, detail }),
            None => Ok(()),
        }
    }

    /// Runs hint `index` if all of its inputs are known.
    fn fire(&mut self, index: usize) -> Result<bool, SolveError> {
        let cs = self.cs;
        let binding = &cs.hints()[index];
        let inputs: Option<Vec<BigUint>> = binding
            .inputs
            .iter()
            .map(|var| self.values[var.0].as_ref().map(field::to_biguint))
            .collect();
        let inputs = match inputs {
            Some(inputs) => inputs,
            None => return Ok(false),
        };

        let outputs = self.hints.invoke(
            &binding.name,
            cs.field().modulus(),
            &inputs,
            binding.outputs.len(),
        )?;
        for (var, value) in binding.outputs.iter().zip(outputs) {
            self.values[var.0] = Some(cs.field().from_biguint(&value));
        }
        Ok(true)
    }

    /// Solves constraint `index` for `unknown` if it appears linearly.
    fn isolate(&mut self, index: usize, unknown: Variable) -> bool {
        let values = &self.values;
        let residual = match self.cs.constraints() {
            Constraints::Rank1(constraints) => {
                let c = &constraints[index];
                let l = Affine::of_lc(&c.l, unknown, values);
                let r = Affine::of_lc(&c.r, unknown, values);
                let o = Affine::of_lc(&c.o, unknown, values);
                Residual {
                    quad: l.coeff * r.coeff,
                    lin: l.coeff * r.constant + r.coeff * l.constant - o.coeff,
                    constant: l.constant * r.constant - o.constant,
                }
            }
            Constraints::Gate { gates, .. } => {
                let g = &gates[index];
                let l = Affine::of_slot(g.l, unknown, values);
                let r = Affine::of_slot(g.r, unknown, values);
                let o = Affine::of_slot(g.o, unknown, values);
                Residual {
                    quad: g.q_m * l.coeff * r.coeff,
                    lin: g.q_l * l.coeff
                        + g.q_r * r.coeff
                        + g.q_o * o.coeff
                        + g.q_m * (l.coeff * r.constant + r.coeff * l.constant),
                    constant: g.q_l * l.constant
                        + g.q_r * r.constant
                        + g.q_o * o.constant
                        + g.q_m * l.constant * r.constant
                        + g.q_c,
                }
            }
        };

        if !bool::from(residual.quad.is_zero()) {
            return false;
        }
        let inverse: Option<Scalar> = residual.lin.invert().into();
        match inverse {
            Some(inverse) => {
                let value = -residual.constant * inverse;
                trace!(
                    "constraint {} gives v{} = {}",
                    index,
                    unknown.0,
                    field::display(&value)
                );
                self.values[unknown.0] = Some(value);
                true
            }
            None => false,
        }
    }
}

/// Solves `cs` for the given inputs with default options.
pub fn solve<Scalar: PrimeFieldBits>(
    cs: &ConstraintSystem<Scalar>,
    hints: &HintRegistry,
    public: &[Scalar],
    secret: &[Scalar],
) -> Result<Assignment<Scalar>, SolveError> {
    Solver::new(cs, hints).solve(public, secret)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{Builder, GateBuilder, R1csBuilder};
    use crate::error::HintFailure;
    use blstrs::Scalar as Fr;
    use ff::Field;

    fn square_system() -> ConstraintSystem<Fr> {
        let mut api = R1csBuilder::<Fr>::new(true);
        let a = api.public_input("A");
        let b = api.public_input("B");
        let sq = api.mul(&a, &a).unwrap();
        api.assert_equal(&sq, &b).unwrap();
        api.into_system()
    }

    #[test]
    fn test_solves_square() {
        let cs = square_system();
        let registry = HintRegistry::new();

        let assignment = solve(&cs, &registry, &[Fr::from(3u64), Fr::from(9u64)], &[]).unwrap();
        assert_eq!(assignment.get(Variable(2)), Fr::from(9u64));
        assert_eq!(assignment.public_values(), vec![Fr::from(3u64), Fr::from(9u64)]);
        assert_eq!(assignment.to_biguints()[2], BigUint::from(9u32));
    }

    #[test]
    fn test_input_counts() {
        let cs = square_system();
        let registry = HintRegistry::new();

        match solve(&cs, &registry, &[Fr::ONE], &[]) {
            Err(SolveError::MissingInput { role, index, name }) => {
                assert_eq!(role, VariableRole::Public);
                assert_eq!(index, 1);
                assert_eq!(name, "B");
            }
            other => panic!("unexpected result: {:?}", other),
        }

        let three = [Fr::ONE, Fr::ONE, Fr::ONE];
        assert!(matches!(
            solve(&cs, &registry, &three, &[]),
            Err(SolveError::ExtraInput {
                expected: 2,
                got: 3,
                ..
            })
        ));

        let lenient = SolverOptions {
            surplus_inputs: SurplusInputs::Ignore,
        };
        assert!(Solver::new(&cs, &registry)
            .with_options(lenient)
            .solve(&three, &[Fr::ONE])
            .is_ok());
    }

    #[test]
    fn test_first_violation_reported() {
        let cs = square_system();
        let registry = HintRegistry::new();
        let mut solver = Solver::new(&cs, &registry);

        match solver.solve(&[Fr::from(2u64), Fr::from(5u64)], &[]) {
            Err(SolveError::ConstraintViolated { index, .. }) => assert_eq!(index, 1),
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(solver.partial()[2], Some(Fr::from(4u64)));
    }

    #[test]
    fn test_custom_hint_failure() {
        let mut api = GateBuilder::<Fr>::new(true);
        let x = api.public_input("x");
        let y = api.hint("bellwire.tests.Failing", &[x.clone()], 1).unwrap();
        let z = api.mul(&y[0], &y[0]).unwrap();
        api.assert_equal(&z, &x).unwrap();
        let cs = api.into_system();

        let mut registry = HintRegistry::empty();
        let failing = |_: &BigUint, _: &[BigUint], _: &mut [BigUint]| -> Result<(), HintFailure> {
            Err("no square root".into())
        };
        registry.register("bellwire.tests.Failing", 1, 1, failing).unwrap();

        match solve(&cs, &registry, &[Fr::from(3u64)], &[]) {
            Err(SolveError::HintExecutionFailed { name, inputs, source }) => {
                assert_eq!(name, "bellwire.tests.Failing");
                assert_eq!(inputs, vec!["3".to_string()]);
                assert_eq!(source.to_string(), "no square root");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_underdetermined() {
        let mut api = R1csBuilder::<Fr>::new(true);
        let x = api.secret_input("x");
        let y = api.secret_input("y");
        let w = api.add(&x, &y);
        let t = api.wire(&w).unwrap();
        let p = api.mul(&t, &t).unwrap();
        api.assert_equal(&p, &api.constant(Fr::from(4u64))).unwrap();
        let mut cs = api.into_system();
        // Forget the second input so only `x` is declared.
        cs.secret.truncate(1);

        match solve(&cs, &HintRegistry::new(), &[], &[Fr::ONE]) {
            Err(SolveError::UnderdeterminedSystem { variable }) => assert_eq!(variable, 1),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_hint_fails_before_solving() {
        let mut api = R1csBuilder::<Fr>::new(true);
        let x = api.secret_input("x");
        api.hint("bellwire.tests.Missing", &[x], 2).unwrap();
        let cs = api.into_system();

        let registry = HintRegistry::new();
        let mut solver = Solver::new(&cs, &registry);
        assert!(matches!(
            solver.solve(&[], &[Fr::ONE]),
            Err(SolveError::UnknownHint(name)) if name == "bellwire.tests.Missing"
        ));
        assert_eq!(solver.partial(), &[None, None, None]);
    }

    #[test]
    fn test_unreferenced_variables_default_to_zero() {
        let mut api = GateBuilder::<Fr>::new(true);
        let x = api.secret_input("x");
        let _unused = api.secret_input("unused");
        api.assert_boolean(&x).unwrap();
        let cs = api.into_system();

        let assignment = solve(&cs, &HintRegistry::new(), &[], &[Fr::ONE, Fr::from(42u64)]).unwrap();
        assert_eq!(assignment.secret_values(), vec![Fr::ONE, Fr::from(42u64)]);
    }

    #[test]
    fn test_long_chain_solves_in_one_pass() {
        let mut api = GateBuilder::<Fr>::new(true);
        let x = api.secret_input("x");
        let mut acc = x.clone();
        for _ in 0..2000 {
            let sq = api.mul(&acc, &acc).unwrap();
            acc = api.add(&sq, &x);
            acc = api.wire(&acc).unwrap();
        }
        let cs = api.into_system();

        let registry = HintRegistry::new();
        let mut solver = Solver::new(&cs, &registry);
        let assignment = solver.solve(&[], &[Fr::from(2u64)]).unwrap();
        assert_eq!(solver.passes(), 1);

        let mut expected = Fr::from(2u64);
        for _ in 0..2000 {
            expected = expected.square() + Fr::from(2u64);
        }
        assert_eq!(assignment.values().last(), Some(&expected));
    }
}
