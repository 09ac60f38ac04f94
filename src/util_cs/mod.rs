use std::fmt;

use ff::PrimeFieldBits;

use crate::constraint_system::{BackendKind, ConstraintSystem, Constraints};

pub mod checker;

pub trait Comparable<Scalar: PrimeFieldBits> {
    /// The `Comparable` trait allows comparison of two compiled constraint
    /// systems. The only non-trivial method, `delta`, has a default
    /// implementation which supplies the desired behavior.
    ///
    /// Use `delta` to compare constraint systems. If they are not identical, the
    /// returned `Delta` enum names the first place where they differ. This is
    /// what explains a failed determinism check.
    ///
    /// If `ignore_counts` is true, count mismatches will be ignored, and the
    /// first mismatching constraint will be returned instead. This is useful in
    /// pinpointing the source of a mismatch.
    ///
    /// Example usage:
    ///
    /// ```norun
    /// let delta = first.delta(&second, false);
    /// assert!(delta == Delta::Equal);
    /// ```
    fn system(&self) -> &ConstraintSystem<Scalar>;

    fn delta<C: Comparable<Scalar>>(&self, other: &C, ignore_counts: bool) -> Delta {
        let a = self.system();
        let b = other.system();

        if a.backend() != b.backend() {
            return Delta::BackendMismatch(a.backend(), b.backend());
        }
        if !ignore_counts && a.num_variables() != b.num_variables() {
            return Delta::VariableCountMismatch(a.num_variables(), b.num_variables());
        }
        if !ignore_counts && a.num_constraints() != b.num_constraints() {
            return Delta::ConstraintCountMismatch(a.num_constraints(), b.num_constraints());
        }

        if let Some(i) = a.roles().iter().zip(b.roles()).position(|(x, y)| x != y) {
            return Delta::RoleMismatch(i);
        }
        if a.public_inputs() != b.public_inputs() || a.secret_inputs() != b.secret_inputs() {
            return Delta::InputMismatch;
        }

        let mismatch = match (a.constraints(), b.constraints()) {
            (Constraints::Rank1(x), Constraints::Rank1(y)) => {
                x.iter().zip(y).position(|(p, q)| p != q)
            }
            (Constraints::Gate { gates: x, .. }, Constraints::Gate { gates: y, .. }) => {
                x.iter().zip(y).position(|(p, q)| p != q)
            }
            _ => None,
        };
        if let Some(i) = mismatch {
            return Delta::ConstraintMismatch(i, describe(a, i), describe(b, i));
        }

        if let Some(i) = a.hints().iter().zip(b.hints()).position(|(x, y)| x != y) {
            return Delta::HintMismatch(i);
        }

        if a == b {
            Delta::Equal
        } else {
            Delta::Different
        }
    }
}

impl<Scalar: PrimeFieldBits> Comparable<Scalar> for ConstraintSystem<Scalar> {
    fn system(&self) -> &ConstraintSystem<Scalar> {
        self
    }
}

fn describe<Scalar: PrimeFieldBits>(cs: &ConstraintSystem<Scalar>, index: usize) -> String {
    cs.pretty_print()
        .lines()
        .nth(index)
        .unwrap_or_default()
        .to_string()
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Delta {
    Equal,
    Different,
    BackendMismatch(BackendKind, BackendKind),
    VariableCountMismatch(usize, usize),
    ConstraintCountMismatch(usize, usize),
    RoleMismatch(usize),
    InputMismatch,
    ConstraintMismatch(usize, String, String),
    HintMismatch(usize),
}

impl fmt::Display for Delta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Delta::Equal => write!(f, "equal"),
            Delta::Different => write!(f, "different"),
            Delta::BackendMismatch(a, b) => write!(f, "backend {} != {}", a, b),
            Delta::VariableCountMismatch(a, b) => write!(f, "{} variables != {}", a, b),
            Delta::ConstraintCountMismatch(a, b) => write!(f, "{} constraints != {}", a, b),
            Delta::RoleMismatch(i) => write!(f, "role of variable {} differs", i),
            Delta::InputMismatch => write!(f, "input declarations differ"),
            Delta::ConstraintMismatch(i, a, b) => {
                write!(f, "constraint {} differs: `{}` != `{}`", i, a, b)
            }
            Delta::HintMismatch(i) => write!(f, "hint binding {} differs", i),
        }
    }
}
