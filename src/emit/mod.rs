//! Matcher code generation (component C8).
//!
//! Both backends splice caller-supplied action bodies as plain strings
//! into a generated function, rather than building token trees with a
//! macro-quoting crate — the same approach as `paper2code-enso`'s
//! `RuleExecutable { priority, code: String }` and `signalapp-ringrtc`'s
//! `regex-aot` emitter. The emitted function always exposes the same
//! variable protocol regardless of backend: `p` (current read position),
//! `p_end` (one past the last readable byte), `cs` (the state register;
//! caller reads it after the call using the `0`/`>0`/`<0` convention),
//! `byte` (the value at `data[p]` while an action body runs), and `data`
//! (the input slice).

pub mod direct;
pub mod table;

use std::collections::HashMap;

use crate::action::ActionName;
use crate::error::{EmitError, EmitResult};
use crate::machine::Machine;

#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub enum Backend {
    /// A flat static transition table plus a generic stepping loop.
    Table,
    /// One match arm per state, unrolled into a labeled loop — larger
    /// code, but each state's logic is inlined so the optimizer sees it
    /// directly (the "goto" style Ragel calls direct dispatch).
    Direct,
}

#[derive(Clone, Debug)]
pub struct EmitConfig {
    pub backend: Backend,
    /// Whether to emit an explicit `p < p_end` guard before each byte
    /// read. Matchers driven by a caller that never over-reads may turn
    /// this off to shave a branch per iteration.
    pub bounds_checked: bool,
    pub fn_name: String,
    /// Name of the emitted function's precondition-predicate parameter
    /// (`impl Fn(&str) -> bool`), called with a precondition name at every
    /// guarded state the way [`crate::machine::Machine::run`] calls its own
    /// `precondition` argument. Only needs overriding if `fn_name`'s
    /// surrounding scope already binds `precondition` to something else.
    pub precondition_param: String,
    /// Raw source spliced before the generated function, verbatim.
    pub preamble: Option<String>,
    /// Raw source spliced after the generated function, verbatim.
    pub epilogue: Option<String>,
}

impl Default for EmitConfig {
    fn default() -> Self {
        EmitConfig {
            backend: Backend::Table,
            bounds_checked: true,
            fn_name: "run".to_string(),
            precondition_param: "precondition".to_string(),
            preamble: None,
            epilogue: None,
        }
    }
}

/// User-supplied source snippets, one per declared action name. Snippets
/// are raw Rust statements, spliced verbatim into the generated function
/// body with `byte`, `p`, `data`, and `cx` in scope.
#[derive(Clone, Default)]
pub struct ActionBodies(HashMap<ActionName, String>);

impl ActionBodies {
    pub fn new() -> Self {
        ActionBodies(HashMap::new())
    }

    pub fn insert(&mut self, name: impl Into<ActionName>, body: impl Into<String>) {
        self.0.insert(name.into(), body.into());
    }

    pub fn get(&self, name: &ActionName) -> EmitResult<&str> {
        self.0.get(name).map(String::as_str).ok_or_else(|| EmitError::MissingActionBody(name.clone()))
    }
}

/// A small indentation-tracking string accumulator, the same shape as the
/// ad hoc indent-tracking writers built over `io::Write`, adapted
/// here to a plain `String` since emitted source is never streamed.
pub struct CodeWriter {
    buf: String,
    indent: usize,
}

impl CodeWriter {
    pub fn new() -> Self {
        CodeWriter { buf: String::new(), indent: 0 }
    }

    pub fn line(&mut self, text: &str) {
        for _ in 0..self.indent {
            self.buf.push_str("    ");
        }
        self.buf.push_str(text);
        self.buf.push('\n');
    }

    pub fn lines(&mut self, text: &str) {
        for line in text.lines() {
            self.line(line);
        }
    }

    pub fn indent(&mut self) {
        self.indent += 1;
    }

    pub fn dedent(&mut self) {
        self.indent = self.indent.saturating_sub(1);
    }

    pub fn blank(&mut self) {
        self.buf.push('\n');
    }

    pub fn finish(self) -> String {
        self.buf
    }
}

impl Default for CodeWriter {
    fn default() -> Self {
        CodeWriter::new()
    }
}

/// Render an action's names as a sequence of statements running each
/// body in priority order, looked up from `actions`.
pub(crate) fn emit_action_calls(
    writer: &mut CodeWriter,
    names: &[ActionName],
    actions: &ActionBodies,
) -> EmitResult<()> {
    for name in names {
        let body = actions.get(name)?;
        writer.line(&format!("// action: {}", name.as_str()));
        writer.lines(body);
    }
    Ok(())
}

pub fn emit(machine: &Machine, config: &EmitConfig, actions: &ActionBodies) -> EmitResult<String> {
    match config.backend {
        Backend::Table => table::emit(machine, config, actions),
        Backend::Direct => direct::emit(machine, config, actions),
    }
}
