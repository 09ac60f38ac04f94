use std::collections::BTreeMap;
use std::fmt;

use blake2s_simd::Params as Blake2sParams;
use ff::PrimeFieldBits;
use serde::{Deserialize, Serialize};

use crate::error::SolveError;
use crate::field::{self, FieldContext};
use crate::hint::HintBinding;
use crate::store::VariableRole;
use crate::{LinearCombination, Variable};

/// Target constraint representation.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BackendKind {
    /// Multiplicative triples `L * R = O`.
    #[default]
    Rank1,
    /// Fused gates `qL·l + qR·r + qO·o + qM·l·r + qC = 0`.
    Gate,
}

impl BackendKind {
    pub(crate) fn tag(self) -> u8 {
        match self {
            BackendKind::Rank1 => 0,
            BackendKind::Gate => 1,
        }
    }

    pub(crate) fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(BackendKind::Rank1),
            1 => Some(BackendKind::Gate),
            _ => None,
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Rank1 => write!(f, "rank-1"),
            BackendKind::Gate => write!(f, "gate"),
        }
    }
}

/// Enforces `l * r = o`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rank1Constraint<Scalar: PrimeFieldBits> {
    pub l: LinearCombination<Scalar>,
    pub r: LinearCombination<Scalar>,
    pub o: LinearCombination<Scalar>,
}

/// Enforces `q_l·l + q_r·r + q_o·o + q_m·l·r + q_c = 0`. An empty slot reads
/// as zero and always carries a zero coefficient.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Gate<Scalar: PrimeFieldBits> {
    pub q_l: Scalar,
    pub q_r: Scalar,
    pub q_o: Scalar,
    pub q_m: Scalar,
    pub q_c: Scalar,
    pub l: Option<Variable>,
    pub r: Option<Variable>,
    pub o: Option<Variable>,
}

impl<Scalar: PrimeFieldBits> Gate<Scalar> {
    pub(crate) fn empty() -> Self {
        Gate {
            q_l: Scalar::ZERO,
            q_r: Scalar::ZERO,
            q_o: Scalar::ZERO,
            q_m: Scalar::ZERO,
            q_c: Scalar::ZERO,
            l: None,
            r: None,
            o: None,
        }
    }

    pub fn slot(&self, slot: Slot) -> Option<Variable> {
        match slot {
            Slot::Left => self.l,
            Slot::Right => self.r,
            Slot::Output => self.o,
        }
    }

    pub fn variables(&self) -> impl Iterator<Item = Variable> + '_ {
        [self.l, self.r, self.o].into_iter().flatten()
    }
}

/// Wire slot of a gate.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Slot {
    Left,
    Right,
    Output,
}

impl Slot {
    pub(crate) const ALL: [Slot; 3] = [Slot::Left, Slot::Right, Slot::Output];

    pub(crate) fn tag(self) -> u8 {
        match self {
            Slot::Left => 0,
            Slot::Right => 1,
            Slot::Output => 2,
        }
    }

    pub(crate) fn from_tag(tag: u8) -> Option<Self> {
        Slot::ALL.get(tag as usize).copied()
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WireRef {
    pub gate: usize,
    pub slot: Slot,
}

/// Two gate slots that must hold the same value.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CopyConstraint {
    pub from: WireRef,
    pub to: WireRef,
}

/// Links consecutive occurrences of each variable across the gate table,
/// variables in ascending order.
pub(crate) fn derive_copies<Scalar: PrimeFieldBits>(gates: &[Gate<Scalar>]) -> Vec<CopyConstraint> {
    let mut occurrences: BTreeMap<Variable, Vec<WireRef>> = BTreeMap::new();
    for (index, gate) in gates.iter().enumerate() {
        for slot in Slot::ALL {
            if let Some(var) = gate.slot(slot) {
                occurrences
                    .entry(var)
                    .or_default()
                    .push(WireRef { gate: index, slot });
            }
        }
    }

    occurrences
        .values()
        .flat_map(|refs| {
            refs.windows(2).map(|pair| CopyConstraint {
                from: pair[0],
                to: pair[1],
            })
        })
        .collect()
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Constraints<Scalar: PrimeFieldBits> {
    Rank1(Vec<Rank1Constraint<Scalar>>),
    Gate {
        gates: Vec<Gate<Scalar>>,
        copies: Vec<CopyConstraint>,
    },
}

impl<Scalar: PrimeFieldBits> Constraints<Scalar> {
    pub fn len(&self) -> usize {
        match self {
            Constraints::Rank1(constraints) => constraints.len(),
            Constraints::Gate { gates, .. } => gates.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn backend(&self) -> BackendKind {
        match self {
            Constraints::Rank1(_) => BackendKind::Rank1,
            Constraints::Gate { .. } => BackendKind::Gate,
        }
    }

    /// Variables mentioned by constraint `index`, in slot order, possibly
    /// repeated.
    pub(crate) fn variables_of(&self, index: usize) -> impl Iterator<Item = Variable> + '_ {
        let (rank1, gate) = match self {
            Constraints::Rank1(constraints) => {
                let c = &constraints[index];
                let vars = c.l.variables().chain(c.r.variables()).chain(c.o.variables());
                (Some(vars), None)
            }
            Constraints::Gate { gates, .. } => (None, Some(gates[index].variables())),
        };
        rank1.into_iter().flatten().chain(gate.into_iter().flatten())
    }
}

/// Size summary of a compiled system.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemStats {
    pub constraints: usize,
    pub variables: usize,
    pub public_inputs: usize,
    pub secret_inputs: usize,
    pub internal: usize,
    pub hints: usize,
}

/// A compiled, immutable constraint system.
///
/// Wire numbering and constraint order are part of its identity: two
/// compilations of the same circuit compare equal, and a reloaded system is
/// equal to the one that was persisted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConstraintSystem<Scalar: PrimeFieldBits> {
    pub(crate) field: FieldContext<Scalar>,
    pub(crate) roles: Vec<VariableRole>,
    pub(crate) public: Vec<(Variable, String)>,
    pub(crate) secret: Vec<(Variable, String)>,
    pub(crate) constraints: Constraints<Scalar>,
    pub(crate) hints: Vec<HintBinding>,
}

impl<Scalar: PrimeFieldBits> ConstraintSystem<Scalar> {
    pub fn field(&self) -> &FieldContext<Scalar> {
        &self.field
    }

    pub fn backend(&self) -> BackendKind {
        self.constraints.backend()
    }

    pub fn num_variables(&self) -> usize {
        self.roles.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    pub fn role(&self, var: Variable) -> VariableRole {
        self.roles[var.0]
    }

    pub fn roles(&self) -> &[VariableRole] {
        &self.roles
    }

    /// Public inputs with their names, in declaration order.
    pub fn public_inputs(&self) -> &[(Variable, String)] {
        &self.public
    }

    /// Secret inputs with their names, in declaration order.
    pub fn secret_inputs(&self) -> &[(Variable, String)] {
        &self.secret
    }

    pub fn constraints(&self) -> &Constraints<Scalar> {
        &self.constraints
    }

    pub fn hints(&self) -> &[HintBinding] {
        &self.hints
    }

    pub fn stats(&self) -> SystemStats {
        SystemStats {
            constraints: self.num_constraints(),
            variables: self.num_variables(),
            public_inputs: self.public.len(),
            secret_inputs: self.secret.len(),
            internal: self
                .roles
                .iter()
                .filter(|role| **role == VariableRole::Internal)
                .count(),
            hints: self.hints.len(),
        }
    }

    /// BLAKE2s digest of the persisted form, as lowercase hex.
    pub fn digest(&self) -> String {
        let hash = Blake2sParams::new().hash_length(32).hash(&self.encode());

        let mut s = String::new();
        for b in hash.as_bytes() {
            s += &format!("{:02x}", b);
        }
        s
    }

    /// Describes how constraint `index` fails under `values`, or `None` if it
    /// holds.
    pub fn violation(&self, index: usize, values: &[Scalar]) -> Option<String> {
        self.violation_with(index, |var| values[var.0])
    }

    /// Like [`ConstraintSystem::violation`], reading each variable through
    /// `value`.
    pub fn violation_with(
        &self,
        index: usize,
        value: impl Fn(Variable) -> Scalar,
    ) -> Option<String> {
        match &self.constraints {
            Constraints::Rank1(constraints) => {
                let c = &constraints[index];
                let l = c.l.eval_with(&value);
                let r = c.r.eval_with(&value);
                let o = c.o.eval_with(&value);
                if l * r == o {
                    None
                } else {
                    Some(format!(
                        "{} * {} != {}",
                        field::display(&l),
                        field::display(&r),
                        field::display(&o)
                    ))
                }
            }
            Constraints::Gate { gates, .. } => {
                let g = &gates[index];
                let slot = |slot: Option<Variable>| slot.map_or(Scalar::ZERO, &value);
                let (l, r, o) = (slot(g.l), slot(g.r), slot(g.o));
                let residual = g.q_l * l + g.q_r * r + g.q_o * o + g.q_m * l * r + g.q_c;
                if bool::from(residual.is_zero()) {
                    None
                } else {
                    Some(format!(
                        "gate evaluates to {} with l = {}, r = {}, o = {}",
                        field::display(&residual),
                        field::display(&l),
                        field::display(&r),
                        field::display(&o)
                    ))
                }
            }
        }
    }

    /// Checks every constraint, returning the first violated one.
    pub fn verify(&self, values: &[Scalar]) -> Result<(), SolveError> {
        for index in 0..self.num_constraints() {
            if let Some(detail) = self.violation(index, values) {
                return Err(SolveError::ConstraintViolated { index, detail });
            }
        }
        Ok(())
    }

    /// Human readable listing, one constraint per line.
    pub fn pretty_print(&self) -> String {
        let mut s = String::new();
        let lc = |lc: &LinearCombination<Scalar>| {
            let mut out = field::display(&lc.constant_term());
            for (var, coeff) in lc.iter() {
                out += &format!(" + {}*v{}", field::display(coeff), var.0);
            }
            out
        };
        let slot = |slot: Option<Variable>| slot.map_or("-".to_string(), |v| format!("v{}", v.0));

        match &self.constraints {
            Constraints::Rank1(constraints) => {
                for (i, c) in constraints.iter().enumerate() {
                    s += &format!("{}: ({}) * ({}) = ({})\n", i, lc(&c.l), lc(&c.r), lc(&c.o));
                }
            }
            Constraints::Gate { gates, copies } => {
                for (i, g) in gates.iter().enumerate() {
                    s += &format!(
                        "{}: qL={} qR={} qO={} qM={} qC={} [{} {} {}]\n",
                        i,
                        field::display(&g.q_l),
                        field::display(&g.q_r),
                        field::display(&g.q_o),
                        field::display(&g.q_m),
                        field::display(&g.q_c),
                        slot(g.l),
                        slot(g.r),
                        slot(g.o)
                    );
                }
                for copy in copies {
                    s += &format!(
                        "copy {}.{:?} = {}.{:?}\n",
                        copy.from.gate, copy.from.slot, copy.to.gate, copy.to.slot
                    );
                }
            }
        }
        for hint in &self.hints {
            s += &format!("hint {} {:?} -> {:?}\n", hint.name, hint.inputs, hint.outputs);
        }
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blstrs::Scalar as Fr;
    use ff::Field;

    fn gate(l: Option<usize>, r: Option<usize>, o: Option<usize>) -> Gate<Fr> {
        Gate {
            l: l.map(Variable::new_unchecked),
            r: r.map(Variable::new_unchecked),
            o: o.map(Variable::new_unchecked),
            ..Gate::empty()
        }
    }

    #[test]
    fn test_copies_link_consecutive_occurrences() {
        let gates = vec![
            gate(Some(0), Some(1), Some(2)),
            gate(Some(2), Some(2), None),
            gate(Some(1), None, Some(0)),
        ];
        let copies = derive_copies(&gates);

        let wire = |gate, slot| WireRef { gate, slot };
        assert_eq!(
            copies,
            vec![
                CopyConstraint {
                    from: wire(0, Slot::Left),
                    to: wire(2, Slot::Output),
                },
                CopyConstraint {
                    from: wire(0, Slot::Right),
                    to: wire(2, Slot::Left),
                },
                CopyConstraint {
                    from: wire(0, Slot::Output),
                    to: wire(1, Slot::Left),
                },
                CopyConstraint {
                    from: wire(1, Slot::Left),
                    to: wire(1, Slot::Right),
                },
            ]
        );
    }

    #[test]
    fn test_gate_violation() {
        // x * y - z = 0
        let g = Gate {
            q_m: Fr::ONE,
            q_o: -Fr::ONE,
            ..gate(Some(0), Some(1), Some(2))
        };
        let cs = ConstraintSystem {
            field: FieldContext::new(),
            roles: vec![VariableRole::Secret; 3],
            public: vec![],
            secret: vec![],
            constraints: Constraints::Gate {
                copies: derive_copies(std::slice::from_ref(&g)),
                gates: vec![g],
            },
            hints: vec![],
        };

        let ok = [Fr::from(3u64), Fr::from(4u64), Fr::from(12u64)];
        let bad = [Fr::from(3u64), Fr::from(4u64), Fr::from(13u64)];
        assert!(cs.verify(&ok).is_ok());
        assert!(matches!(
            cs.verify(&bad),
            Err(SolveError::ConstraintViolated { index: 0, .. })
        ));
        assert_eq!(cs.backend(), BackendKind::Gate);
        assert_eq!(cs.stats().secret_inputs, 0);
    }

    #[test]
    fn test_slot_tags() {
        for slot in Slot::ALL {
            assert_eq!(Slot::from_tag(slot.tag()), Some(slot));
        }
        assert_eq!(Slot::from_tag(3), None);
        assert_eq!(BackendKind::from_tag(BackendKind::Gate.tag()), Some(BackendKind::Gate));
    }
}
