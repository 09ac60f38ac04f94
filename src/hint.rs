//! Hint system.
//!
//! Hints are computations the solver runs outside of the constraint system,
//! for values that are expensive to derive with constraints but cheap to
//! check (inverses, bit decompositions, ...). Hints are identified by name,
//! so a persisted constraint system can be solved by another process.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard};

use blake2s_simd::Params as Blake2sParams;
use byteorder::{BigEndian, ByteOrder};
use lazy_static::lazy_static;
use log::{debug, trace};
use num_bigint::BigUint;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{HintFailure, RegistryError, SolveError};
use crate::Variable;

/// Name of the built-in modular inversion hint: `[x] -> [1/x]`.
pub const INVERT_HINT: &str = "bellwire.hints.Invert";
/// Name of the built-in division hint: `[a, b] -> [a/b]`.
pub const DIV_HINT: &str = "bellwire.hints.Div";
/// Name of the built-in bit decomposition hint: `[x] -> [b_0, .., b_{n-1}]`.
pub const BITS_HINT: &str = "bellwire.hints.Bits";
/// Name of the built-in zero-test hint: `[x] -> [1/x or 0]`.
pub const INVERSE_OR_ZERO_HINT: &str = "bellwire.hints.InverseOrZero";

lazy_static! {
    static ref ANONYMOUS_STYLE: Regex =
        Regex::new(r"^(?P<pkgname>.*\.)init(?P<funcname>\.func\d+)$").expect("valid pattern");
    static ref GLOBAL_REGISTRY: RwLock<HintRegistry> = RwLock::new(HintRegistry::new());
}

/// Rewrites a compiler-synthesized name for an anonymous callback
/// (`pkg.init.funcN`) to the legacy form (`pkg.glob..funcN`) constraint
/// systems were persisted with. Any other name is returned unchanged, so the
/// rewrite is idempotent.
pub fn normalize_hint_name(name: &str) -> String {
    ANONYMOUS_STYLE
        .replace(name, "${pkgname}glob.${funcname}")
        .into_owned()
}

/// Stable 32-bit identifier of a hint, derived from its canonical name.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct HintId(pub u32);

impl HintId {
    pub fn of(name: &str) -> Self {
        let canonical = normalize_hint_name(name);
        let hash = Blake2sParams::new()
            .hash_length(32)
            .hash(canonical.as_bytes());
        HintId(BigEndian::read_u32(&hash.as_bytes()[0..4]))
    }
}

/// Number of values a hint consumes or produces.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Arity {
    Exact(usize),
    Any,
}

impl Arity {
    fn check(self, name: &str, what: &'static str, got: usize) -> Result<(), SolveError> {
        match self {
            Arity::Exact(expected) if expected != got => Err(SolveError::HintArityMismatch {
                name: name.to_string(),
                what,
                expected,
                got,
            }),
            _ => Ok(()),
        }
    }
}

impl From<usize> for Arity {
    fn from(n: usize) -> Self {
        Arity::Exact(n)
    }
}

/// Hint handler. Integers passed in and out are canonical residues modulo
/// `modulus`; outputs arrive zeroed and sized by the binding.
pub trait Hint: Send + Sync {
    fn call(
        &self,
        modulus: &BigUint,
        inputs: &[BigUint],
        outputs: &mut [BigUint],
    ) -> Result<(), HintFailure>;
}

impl<F> Hint for F
where
    F: Fn(&BigUint, &[BigUint], &mut [BigUint]) -> Result<(), HintFailure> + Send + Sync,
{
    fn call(
        &self,
        modulus: &BigUint,
        inputs: &[BigUint],
        outputs: &mut [BigUint],
    ) -> Result<(), HintFailure> {
        self(modulus, inputs, outputs)
    }
}

/// Records that the solver must run hint `name` on the values of `inputs`
/// and bind the results to `outputs`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HintBinding {
    pub name: String,
    pub inputs: Vec<Variable>,
    pub outputs: Vec<Variable>,
    /// Number of constraints emitted before the binding. The solver runs
    /// the hint after those constraints and before any later one.
    pub position: usize,
}

impl HintBinding {
    pub fn id(&self) -> HintId {
        HintId::of(&self.name)
    }
}

#[derive(Clone)]
struct RegisteredHint {
    inputs: Arity,
    outputs: Arity,
    handler: Arc<dyn Hint>,
}

/// Registry for hint handlers, keyed by canonical name.
///
/// Build it once before any solving starts; afterwards it is only read, and
/// may be shared between threads solving independent systems.
#[derive(Clone)]
pub struct HintRegistry {
    hints: BTreeMap<String, RegisteredHint>,
}

impl fmt::Debug for HintRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HintRegistry")
            .field("hints", &self.hints.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Default for HintRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl HintRegistry {
    /// A registry holding the hints the builders themselves emit.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register_builtins();
        registry
    }

    /// A registry without any hint, not even the built-in ones.
    pub fn empty() -> Self {
        HintRegistry {
            hints: BTreeMap::new(),
        }
    }

    pub fn register<H: Hint + 'static>(
        &mut self,
        name: &str,
        inputs: impl Into<Arity>,
        outputs: impl Into<Arity>,
        handler: H,
    ) -> Result<HintId, RegistryError> {
        let canonical = normalize_hint_name(name);
        if self.hints.contains_key(&canonical) {
            return Err(RegistryError::DuplicateHint(canonical));
        }

        debug!("registering hint {}", canonical);
        let id = HintId::of(&canonical);
        self.hints.insert(
            canonical,
            RegisteredHint {
                inputs: inputs.into(),
                outputs: outputs.into(),
                handler: Arc::new(handler),
            },
        );
        Ok(id)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.hints.contains_key(&normalize_hint_name(name))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.hints.keys().map(String::as_str)
    }

    fn lookup(
        &self,
        canonical: &str,
        n_inputs: usize,
        n_outputs: usize,
    ) -> Result<&RegisteredHint, SolveError> {
        let hint = self
            .hints
            .get(canonical)
            .ok_or_else(|| SolveError::UnknownHint(canonical.to_string()))?;

        hint.inputs.check(canonical, "inputs", n_inputs)?;
        hint.outputs.check(canonical, "outputs", n_outputs)?;
        Ok(hint)
    }

    /// Checks that `binding` names a registered hint with a matching shape.
    pub fn check(&self, binding: &HintBinding) -> Result<(), SolveError> {
        self.lookup(
            &normalize_hint_name(&binding.name),
            binding.inputs.len(),
            binding.outputs.len(),
        )
        .map(|_| ())
    }

    /// Runs hint `name` on `inputs`, producing `n_outputs` values.
    pub fn invoke(
        &self,
        name: &str,
        modulus: &BigUint,
        inputs: &[BigUint],
        n_outputs: usize,
    ) -> Result<Vec<BigUint>, SolveError> {
        let canonical = normalize_hint_name(name);
        let hint = self.lookup(&canonical, inputs.len(), n_outputs)?;

        trace!("invoking hint {} on {} inputs", canonical, inputs.len());
        let mut outputs = vec![BigUint::default(); n_outputs];
        hint.handler
            .call(modulus, inputs, &mut outputs)
            .map_err(|source| SolveError::HintExecutionFailed {
                name: canonical.clone(),
                inputs: inputs.iter().map(|x| x.to_string()).collect(),
                source,
            })?;

        for output in outputs.iter_mut() {
            *output %= modulus;
        }
        Ok(outputs)
    }

    fn register_builtins(&mut self) {
        let builtins: [(&str, Arity, Arity, Arc<dyn Hint>); 4] = [
            (INVERT_HINT, Arity::Exact(1), Arity::Exact(1), Arc::new(invert)),
            (DIV_HINT, Arity::Exact(2), Arity::Exact(1), Arc::new(div)),
            (BITS_HINT, Arity::Exact(1), Arity::Any, Arc::new(bits)),
            (
                INVERSE_OR_ZERO_HINT,
                Arity::Exact(1),
                Arity::Exact(1),
                Arc::new(inverse_or_zero),
            ),
        ];
        for (name, inputs, outputs, handler) in builtins {
            self.hints.insert(
                name.to_string(),
                RegisteredHint {
                    inputs,
                    outputs,
                    handler,
                },
            );
        }
    }
}

/// Registers a hint in the process-wide registry. Meant to run once at
/// startup, before any solving begins.
pub fn register_global_hint<H: Hint + 'static>(
    name: &str,
    inputs: impl Into<Arity>,
    outputs: impl Into<Arity>,
    handler: H,
) -> Result<HintId, RegistryError> {
    GLOBAL_REGISTRY
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .register(name, inputs, outputs, handler)
}

/// Read access to the process-wide registry.
pub fn global_hints() -> RwLockReadGuard<'static, HintRegistry> {
    GLOBAL_REGISTRY
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn field_inverse(x: &BigUint, modulus: &BigUint) -> Option<BigUint> {
    if *x == BigUint::default() {
        return None;
    }
    Some(x.modpow(&(modulus - 2u32), modulus))
}

fn invert(modulus: &BigUint, inputs: &[BigUint], outputs: &mut [BigUint]) -> Result<(), HintFailure> {
    outputs[0] = field_inverse(&inputs[0], modulus).ok_or("inverse of zero")?;
    Ok(())
}

fn div(modulus: &BigUint, inputs: &[BigUint], outputs: &mut [BigUint]) -> Result<(), HintFailure> {
    let inverse = field_inverse(&inputs[1], modulus).ok_or("division by zero")?;
    outputs[0] = (&inputs[0] * inverse) % modulus;
    Ok(())
}

fn bits(_: &BigUint, inputs: &[BigUint], outputs: &mut [BigUint]) -> Result<(), HintFailure> {
    let x = &inputs[0];
    if x.bits() > outputs.len() as u64 {
        return Err(format!("{} does not fit in {} bits", x, outputs.len()).into());
    }
    for (i, out) in outputs.iter_mut().enumerate() {
        *out = BigUint::from(u8::from(x.bit(i as u64)));
    }
    Ok(())
}

fn inverse_or_zero(
    modulus: &BigUint,
    inputs: &[BigUint],
    outputs: &mut [BigUint],
) -> Result<(), HintFailure> {
    outputs[0] = field_inverse(&inputs[0], modulus).unwrap_or_default();
    Ok(())
}
