//! The top-level compilation pipeline tying together AST, NFA, DFA,
//! minimization, and the emission-ready [`Machine`] — the overall
//! algebra -> NFA -> DFA -> minimized DFA -> Machine pipeline,
//! collected into one entry point rather than leaving callers to wire up
//! each pass themselves.

pub use crate::ast::{Ast, AstBuilder};

use crate::dfa::Dfa;
use crate::error::{CompileError, CompileResult};
use crate::machine::Machine;
use crate::minimize::minimize;
use crate::nfa::Nfa;

/// Whether [`Machine::from_dfa`] should collapse bytes with identical
/// outgoing behavior into shared alphabet classes before building the
/// final transition tables.
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub enum AlphabetCompression {
    Enabled,
    Disabled,
}

#[derive(Clone, Copy, Debug)]
pub struct CompileOptions {
    /// Reject the pattern with [`crate::error::CompileError::Ambiguous`]
    /// if two actions of equal priority can fire on the same input.
    /// Required for the unambiguous tokenizer mode.
    pub unambiguous: bool,
    /// Run [`minimize`] after subset construction. Disabling this is
    /// mainly useful when debugging the raw subset-construction output.
    pub optimize: bool,
    pub alphabet_compression: AlphabetCompression,
    /// Implementation-defined cap on DFA state count, so a
    /// pathological intersection/difference fails fast instead of
    /// growing without bound.
    pub state_limit: Option<u32>,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions {
            unambiguous: false,
            optimize: true,
            alphabet_compression: AlphabetCompression::Enabled,
            state_limit: Some(1 << 16),
        }
    }
}

/// Run the full pipeline over `ast`, producing a [`Machine`] ready for
/// the reference interpreter or [`crate::emit`].
pub fn compile(ast: &Ast, options: CompileOptions) -> CompileResult<Machine> {
    let nfa = Nfa::from_ast(ast);
    let dfa = Dfa::from_nfa(&nfa, options.unambiguous)?;

    if let Some(limit) = options.state_limit {
        if dfa.state_count() as u32 > limit {
            tracing::error!(states = dfa.state_count(), limit, "state limit exceeded");
            return Err(CompileError::StateLimitExceeded {
                limit,
                offending_subregex: format!("<root, {} states>", dfa.state_count()),
            });
        }
    }

    let dfa = if options.optimize { minimize(&dfa) } else { dfa };
    Ok(Machine::from_dfa(&dfa, options.alphabet_compression))
}
