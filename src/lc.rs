use std::ops::{Add, Neg, Sub};

use ff::PrimeField;
use serde::{Deserialize, Serialize};

/// Represents a variable (wire) in our constraint system.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Variable(pub(crate) usize);

impl Variable {
    /// This constructs a variable with an arbitrary index.
    /// Circuit implementations are not recommended to use this.
    pub fn new_unchecked(idx: usize) -> Variable {
        Variable(idx)
    }

    /// This returns the index underlying the variable.
    pub fn get_unchecked(&self) -> usize {
        self.0
    }
}

/// This represents a linear combination of some variables plus a constant,
/// with coefficients in the scalar field.
///
/// Terms are kept sorted by variable and merged on insertion; a term whose
/// coefficient cancels to zero is removed immediately. Two combinations
/// describing the same affine function are therefore structurally equal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinearCombination<Scalar: PrimeField> {
    terms: Vec<(usize, Scalar)>,
    constant: Scalar,
}

impl<Scalar: PrimeField> Default for LinearCombination<Scalar> {
    fn default() -> Self {
        Self::zero()
    }
}

impl<Scalar: PrimeField> From<Variable> for LinearCombination<Scalar> {
    fn from(var: Variable) -> Self {
        Self::zero() + var
    }
}

impl<Scalar: PrimeField> LinearCombination<Scalar> {
    pub fn zero() -> LinearCombination<Scalar> {
        LinearCombination {
            terms: Vec::new(),
            constant: Scalar::ZERO,
        }
    }

    pub fn constant(value: Scalar) -> LinearCombination<Scalar> {
        LinearCombination {
            terms: Vec::new(),
            constant: value,
        }
    }

    pub(crate) fn from_parts(terms: Vec<(usize, Scalar)>, constant: Scalar) -> Self {
        terms
            .into_iter()
            .fold(Self::constant(constant), |lc, (var, coeff)| {
                lc + (coeff, Variable(var))
            })
    }

    pub fn iter(&self) -> impl Iterator<Item = (Variable, &Scalar)> + '_ {
        self.terms.iter().map(|(k, v)| (Variable(*k), v))
    }

    pub fn constant_term(&self) -> Scalar {
        self.constant
    }

    pub fn add_constant(mut self, value: Scalar) -> Self {
        self.constant += value;
        self
    }

    fn add_assign_term(&mut self, new_var: usize, coeff: Scalar) {
        match self.terms.binary_search_by_key(&new_var, |(var, _coeff)| *var) {
            Ok(index) => {
                self.terms[index].1 += coeff;
                if bool::from(self.terms[index].1.is_zero()) {
                    self.terms.remove(index);
                }
            }
            Err(index) => {
                if !bool::from(coeff.is_zero()) {
                    self.terms.insert(index, (new_var, coeff));
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The value of this combination if it mentions no variable.
    pub fn as_constant(&self) -> Option<Scalar> {
        if self.terms.is_empty() {
            Some(self.constant)
        } else {
            None
        }
    }

    /// Splits `c·x + k` into `(c, x, k)`.
    pub fn as_single_term(&self) -> Option<(Scalar, Variable, Scalar)> {
        match self.terms.as_slice() {
            [(var, coeff)] => Some((*coeff, Variable(*var), self.constant)),
            _ => None,
        }
    }

    /// The variable itself when the combination is exactly `1·x`.
    pub fn as_variable(&self) -> Option<Variable> {
        match self.as_single_term() {
            Some((coeff, var, constant))
                if coeff == Scalar::ONE && bool::from(constant.is_zero()) =>
            {
                Some(var)
            }
            _ => None,
        }
    }

    pub fn scale(mut self, factor: Scalar) -> Self {
        if bool::from(factor.is_zero()) {
            return Self::zero();
        }
        for (_, coeff) in self.terms.iter_mut() {
            *coeff *= factor;
        }
        self.constant *= factor;
        self
    }

    /// Evaluates against a full assignment indexed by variable.
    pub fn eval(&self, assignment: &[Scalar]) -> Scalar {
        self.eval_with(|var| assignment[var.0])
    }

    /// Evaluates with `value` supplying each variable.
    pub fn eval_with(&self, value: impl Fn(Variable) -> Scalar) -> Scalar {
        self.terms
            .iter()
            .fold(self.constant, |acc, (index, coeff)| {
                acc + value(Variable(*index)) * coeff
            })
    }

    /// Evaluates against a partial assignment; `None` if any term is unknown.
    pub fn eval_partial(&self, assignment: &[Option<Scalar>]) -> Option<Scalar> {
        let mut acc = self.constant;
        for (index, coeff) in &self.terms {
            acc += assignment[*index]? * coeff;
        }
        Some(acc)
    }

    pub(crate) fn variables(&self) -> impl Iterator<Item = Variable> + '_ {
        self.terms.iter().map(|(k, _)| Variable(*k))
    }
}

impl<Scalar: PrimeField> Add<(Scalar, Variable)> for LinearCombination<Scalar> {
    type Output = LinearCombination<Scalar>;

    fn add(mut self, (coeff, var): (Scalar, Variable)) -> LinearCombination<Scalar> {
        self.add_assign_term(var.0, coeff);
        self
    }
}

impl<Scalar: PrimeField> Sub<(Scalar, Variable)> for LinearCombination<Scalar> {
    type Output = LinearCombination<Scalar>;

    #[allow(clippy::suspicious_arithmetic_impl)]
    fn sub(mut self, (coeff, var): (Scalar, Variable)) -> LinearCombination<Scalar> {
        self.add_assign_term(var.0, -coeff);
        self
    }
}

impl<Scalar: PrimeField> Add<Variable> for LinearCombination<Scalar> {
    type Output = LinearCombination<Scalar>;

    fn add(self, other: Variable) -> LinearCombination<Scalar> {
        self + (Scalar::ONE, other)
    }
}

impl<Scalar: PrimeField> Sub<Variable> for LinearCombination<Scalar> {
    type Output = LinearCombination<Scalar>;

    fn sub(self, other: Variable) -> LinearCombination<Scalar> {
        self - (Scalar::ONE, other)
    }
}

impl<'a, Scalar: PrimeField> Add<&'a LinearCombination<Scalar>> for LinearCombination<Scalar> {
    type Output = LinearCombination<Scalar>;

    fn add(mut self, other: &'a LinearCombination<Scalar>) -> LinearCombination<Scalar> {
        for (var, val) in &other.terms {
            self.add_assign_term(*var, *val);
        }
        self.constant += other.constant;

        self
    }
}

impl<'a, Scalar: PrimeField> Sub<&'a LinearCombination<Scalar>> for LinearCombination<Scalar> {
    type Output = LinearCombination<Scalar>;

    #[allow(clippy::suspicious_arithmetic_impl)]
    fn sub(mut self, other: &'a LinearCombination<Scalar>) -> LinearCombination<Scalar> {
        for (var, val) in &other.terms {
            self.add_assign_term(*var, -*val);
        }
        self.constant -= other.constant;

        self
    }
}

impl<'a, Scalar: PrimeField> Add<(Scalar, &'a LinearCombination<Scalar>)>
    for LinearCombination<Scalar>
{
    type Output = LinearCombination<Scalar>;

    fn add(
        mut self,
        (coeff, other): (Scalar, &'a LinearCombination<Scalar>),
    ) -> LinearCombination<Scalar> {
        for (var, val) in &other.terms {
            self.add_assign_term(*var, *val * coeff);
        }
        self.constant += other.constant * coeff;

        self
    }
}

impl<'a, Scalar: PrimeField> Sub<(Scalar, &'a LinearCombination<Scalar>)>
    for LinearCombination<Scalar>
{
    type Output = LinearCombination<Scalar>;

    #[allow(clippy::suspicious_arithmetic_impl)]
    fn sub(
        mut self,
        (coeff, other): (Scalar, &'a LinearCombination<Scalar>),
    ) -> LinearCombination<Scalar> {
        for (var, val) in &other.terms {
            self.add_assign_term(*var, -(*val * coeff));
        }
        self.constant -= other.constant * coeff;

        self
    }
}

impl<Scalar: PrimeField> Neg for LinearCombination<Scalar> {
    type Output = LinearCombination<Scalar>;

    fn neg(self) -> LinearCombination<Scalar> {
        self.scale(-Scalar::ONE)
    }
}
