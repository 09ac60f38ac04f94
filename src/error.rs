use std::io;

use crate::store::VariableRole;

/// Failure raised by a hint callback.
pub type HintFailure = Box<dyn std::error::Error + Send + Sync>;

/// This is an error that could occur while a circuit definition is compiled
/// into a constraint system.
#[derive(thiserror::Error, Debug)]
pub enum CompileError {
    /// A divisor reduced to the constant zero at compile time.
    #[error("division by the constant zero (at constraint {constraint})")]
    DivisionByZeroConstant { constraint: usize },
    /// The circuit asked for something no constraint system can express.
    #[error("malformed circuit (at constraint {constraint}): {reason}")]
    MalformedCircuit { constraint: usize, reason: String },
    /// Two compilations of the same circuit disagreed. This is a compiler bug.
    #[error("compilation is not deterministic: {0}")]
    NonDeterministicCompilation(String),
}

/// This is an error that could occur while computing a witness.
#[derive(thiserror::Error, Debug)]
pub enum SolveError {
    /// A declared input was given no value.
    #[error("missing value for {role:?} input #{index} `{name}`")]
    MissingInput {
        role: VariableRole,
        index: usize,
        name: String,
    },
    /// More input values were supplied than inputs were declared.
    #[error("{got} {role:?} values supplied but only {expected} inputs are declared")]
    ExtraInput {
        role: VariableRole,
        expected: usize,
        got: usize,
    },
    /// A full pass resolved nothing while wires were still unknown.
    #[error("underdetermined system: variable {variable} cannot be solved")]
    UnderdeterminedSystem { variable: usize },
    /// A constraint does not hold under the assignment.
    #[error("constraint #{index} is not satisfied: {detail}")]
    ConstraintViolated { index: usize, detail: String },
    /// A hint binding names a hint the registry does not know.
    #[error("unknown hint `{0}`")]
    UnknownHint(String),
    /// A hint was bound with a different shape than it was registered with.
    #[error("hint `{name}` expects {expected} {what}, got {got}")]
    HintArityMismatch {
        name: String,
        what: &'static str,
        expected: usize,
        got: usize,
    },
    /// The hint callback itself failed.
    #[error("hint `{name}` failed on inputs {inputs:?}: {source}")]
    HintExecutionFailed {
        name: String,
        inputs: Vec<String>,
        #[source]
        source: HintFailure,
    },
}

/// This is an error that could occur while registering hints.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("hint `{0}` is already registered")]
    DuplicateHint(String),
}

/// This is an error that could occur while reading or writing the persisted
/// form of a constraint system.
#[derive(thiserror::Error, Debug)]
pub enum SerializationError {
    #[error("encountered an I/O error: {0}")]
    IoError(#[from] io::Error),
    #[error("not a serialized constraint system")]
    BadMagic,
    #[error("unsupported format version {0}")]
    UnsupportedVersion(u16),
    #[error("constraint system was compiled for a different field")]
    FieldMismatch,
    #[error("non-canonical field element")]
    InvalidElement,
    #[error("invalid {what} tag {tag}")]
    InvalidTag { what: &'static str, tag: u8 },
    #[error("invalid UTF-8 in {0}")]
    InvalidUtf8(&'static str),
    #[error("variable {variable} out of range ({count} variables)")]
    VariableOutOfRange { variable: u64, count: u64 },
    #[error("{what} refers to constraint {index} out of range ({count} constraints)")]
    ConstraintOutOfRange {
        what: &'static str,
        index: u64,
        count: u64,
    },
    #[error("trailing bytes after constraint system")]
    TrailingBytes,
}
