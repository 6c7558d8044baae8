//! Compile-time and emit-time error types (component C9).
//!
//! Runtime signals are in-band via `cs` and never use this
//! module; `RuntimeError` in [`crate::diagnostics`] is a convenience type
//! produced only by the reference interpreter, not by emitted code.

use crate::action::{ActionName, PreconditionName};

/// Errors that can occur while compiling a [`crate::ast::Ast`] into a
/// [`crate::machine::Machine`].
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("empty byte set in Symbol node")]
    EmptySymbol,

    #[error("unknown precondition {0:?} referenced")]
    UnknownPrecondition(PreconditionName),

    #[error(
        "ambiguous actions {action_a:?} and {action_b:?} both fire on witness input {witness:?}"
    )]
    Ambiguous { witness: Vec<u8>, action_a: ActionName, action_b: ActionName },

    #[error("state limit {limit} exceeded while compiling {offending_subregex}")]
    StateLimitExceeded { limit: u32, offending_subregex: String },
}

/// Errors that can occur while emitting matcher source from a
/// [`crate::machine::Machine`].
#[derive(Debug, thiserror::Error)]
pub enum EmitError {
    #[error("no action body supplied for action {0:?}")]
    MissingActionBody(ActionName),
}

pub type CompileResult<T> = Result<T, CompileError>;
pub type EmitResult<T> = Result<T, EmitError>;
