//! Structured error types for the two fallible external verbs, `compile` and
//! `push_event`. Static diagnostics live in [`crate::diagnostics`];
//! this module covers the `Result`-level wrapping and stratum-3 runtime errors.

use crate::diagnostics::Diagnostics;
use thiserror::Error;

/// Failure to produce an [`crate::engine::Engine`] from a program.
#[derive(Debug, Error)]
pub enum CompileError {
    /// One or more blocking static diagnostics were raised (duplicate
    /// definition, undefined reference, or circular dependency).
    #[error("compilation failed:\n{0}")]
    Diagnostics(#[from] Diagnostics),

    /// A source's literal initializer failed to evaluate. Since a source
    /// is always rank 0, this can only be a malformed constant (e.g.
    /// `1 / 0`) rather than a missing dependency.
    #[error("source '{name}' has an invalid initializer: {cause}")]
    InvalidSourceInitializer { name: String, cause: crate::error::EvalError },
}

/// A runtime (evaluation) error. These never abort the engine:
/// `propagate` catches them per-node, logs a warning, and leaves the
/// poisoned node's cached value untouched for that step.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EvalError {
    #[error("identifier '{0}' is not bound in the current environment")]
    UnknownIdentifier(String),

    #[error("division by zero")]
    DivisionByZero,

    #[error("array index {index} out of bounds (length {len})")]
    IndexOutOfBounds { index: i64, len: usize },

    #[error("cannot index a non-array value")]
    NotAnArray,

    #[error("array index must be an integer")]
    IndexNotInt,

    #[error("cannot access field on a non-struct value")]
    NotAStruct,

    #[error("struct has no field '{0}'")]
    UnknownField(String),

    #[error("unknown function '{0}'")]
    UnknownFunction(String),

    #[error("function '{name}' expects {expected} argument(s), got {got}")]
    ArityMismatch { name: String, expected: usize, got: usize },

    #[error("type error: {0}")]
    Type(String),

    #[error("pushed to '{0}', which is not a source")]
    PushToNonSource(String),

    #[error("unknown source or struct source '{0}'")]
    UnknownSource(String),
}
