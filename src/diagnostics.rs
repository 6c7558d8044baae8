//! Human-facing rendering of compile-time and runtime failures
//! (component C9 continued). `CompileError`/`EmitError` (in
//! [`crate::error`]) are the values callers match on; this module turns
//! the interesting ones into a message worth printing to a terminal.
//!
//! No external diagnostics crate (`ariadne`, `codespan-reporting`) is
//! pulled in for this — the caret rendering a compiler needs here is one
//! indented line under a byte dump, not multi-file span tracking, so
//! `thiserror` plus a small formatting helper covers it.

use std::fmt;

use crate::error::CompileError;

/// A printable rendering of [`CompileError::Ambiguous`]: the witness
/// input as an escaped byte string, with a caret under the final byte —
/// the one both actions fire on.
pub struct AmbiguityReport<'a> {
    witness: &'a [u8],
    action_a: &'a str,
    action_b: &'a str,
}

impl<'a> AmbiguityReport<'a> {
    pub fn new(witness: &'a [u8], action_a: &'a str, action_b: &'a str) -> Self {
        AmbiguityReport { witness, action_a, action_b }
    }
}

impl fmt::Display for AmbiguityReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self.witness.iter().map(|b| escape_byte(*b)).collect();
        let line = rendered.join("");
        writeln!(f, "{}", line)?;

        let caret_offset: usize = rendered.iter().rev().skip(1).map(|s| s.len()).sum();
        writeln!(f, "{}^", " ".repeat(caret_offset))?;
        write!(
            f,
            "actions {:?} and {:?} both fire here with equal priority",
            self.action_a, self.action_b
        )
    }
}

fn escape_byte(b: u8) -> String {
    if b.is_ascii_graphic() || b == b' ' {
        (b as char).to_string()
    } else {
        format!("\\x{:02x}", b)
    }
}

/// Render any [`CompileError`] for a terminal. Ambiguity errors get the
/// caret treatment; everything else falls back to its `Display` impl,
/// since the rest of the error set carries no positional information.
pub fn render_compile_error(err: &CompileError) -> String {
    match err {
        CompileError::Ambiguous { witness, action_a, action_b } => {
            let report = AmbiguityReport::new(witness, action_a.as_str(), action_b.as_str());
            format!("{}\n{}", err, report)
        }
        other => other.to_string(),
    }
}

/// A failure surfaced by [`crate::machine::Machine::run`] or
/// [`crate::tokenizer::TokenStream`] when input can never reach an
/// accepting state, reported with a 1-based line/column the way a
/// hand-rolled line-tracking reader would: the line/column of the first
/// invalid byte.
#[derive(Debug, thiserror::Error)]
#[error("no match possible at byte {position} (line {line}, column {column})")]
pub struct RuntimeError {
    pub position: usize,
    pub line: usize,
    pub column: usize,
}

impl RuntimeError {
    pub fn at(data: &[u8], position: usize) -> Self {
        let mut line = 1;
        let mut column = 1;
        for &b in &data[..position.min(data.len())] {
            if b == b'\n' {
                line += 1;
                column = 1;
            } else {
                column += 1;
            }
        }
        RuntimeError { position, line, column }
    }
}
