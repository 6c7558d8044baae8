//! Direct-dispatch backend: one match arm per state inlined into a single
//! labeled loop, each arm testing its own byte ranges directly instead of
//! indirecting through a table. Larger generated code, but every branch
//! is visible to the optimizer at the call site — the style Ragel calls
//! "goto" generation.

use crate::error::EmitResult;
use crate::machine::{Machine, StateId};

use super::{emit_action_calls, ActionBodies, CodeWriter, EmitConfig};

pub fn emit(machine: &Machine, config: &EmitConfig, actions: &ActionBodies) -> EmitResult<String> {
    let mut w = CodeWriter::new();
    w.line("// Generated matcher (direct-dispatch backend). Do not edit by hand.");
    w.line("#[allow(clippy::all)]");
    w.blank();
    if let Some(preamble) = &config.preamble {
        w.lines(preamble);
        w.blank();
    }

    w.line(&format!(
        "pub fn {}(data: &[u8], is_eof: bool, {}: impl Fn(&str) -> bool) -> (usize, i32) {{",
        config.fn_name, config.precondition_param
    ));
    w.indent();
    w.line(&format!("let mut state: u32 = {};", machine.start().0));
    w.line("let mut p: usize = 0;");
    w.line("let p_end: usize = data.len();");
    w.line("let cs: i32;");
    w.blank();
    w.line("'outer: loop {");
    w.indent();
    if config.bounds_checked {
        w.line("if p >= p_end {");
        w.indent();
        w.line("break 'outer;");
        w.dedent();
        w.line("}");
    }
    w.line("let byte = data[p];");
    w.line("match state {");
    w.indent();

    // States are numbered from 1 (`Machine::state` never serves id 0), so
    // `cs = -(state as i32)` can never be mistaken for the `cs == 0`
    // success sentinel.
    for i in 0..machine.state_count() {
        let id = StateId((i + 1) as u32);
        let state = machine.state(id);
        w.line(&format!("{} => {{", i + 1));
        w.indent();
        for (name, target) in &state.guards {
            w.line(&format!("if {}({:?}) {{", config.precondition_param, name.as_str()));
            w.indent();
            w.line(&format!("state = {};", target.0));
            w.line("p += 1;");
            w.line("continue 'outer;");
            w.dedent();
            w.line("}");
        }
        if state.transitions.is_empty() {
            w.line("cs = -(state as i32);");
            w.line("return (p, cs);");
        } else {
            for (lo, hi, target, names) in &state.transitions {
                let pattern = byte_class_pattern(machine, *lo, *hi);
                w.line(&format!("if {} {{", pattern));
                w.indent();
                emit_action_calls(&mut w, names, actions)?;
                w.line(&format!("state = {};", target.0));
                w.line("p += 1;");
                w.line("continue 'outer;");
                w.dedent();
                w.line("}");
            }
            w.line("cs = -(state as i32);");
            w.line("return (p, cs);");
        }
        w.dedent();
        w.line("}");
    }
    w.line("_ => unreachable!(\"state id out of range\"),");
    w.dedent();
    w.line("}");
    w.dedent();
    w.line("}");
    w.blank();

    w.line("match state {");
    w.indent();
    for i in 0..machine.state_count() {
        let state = machine.state(StateId((i + 1) as u32));
        if !state.accept {
            continue;
        }
        w.line(&format!("{} => {{", i + 1));
        w.indent();
        w.line("if is_eof {");
        w.indent();
        emit_action_calls(&mut w, &state.eof_actions, actions)?;
        w.dedent();
        w.line("}");
        w.line("cs = 0;");
        w.dedent();
        w.line("}");
    }
    w.line("_ if is_eof => { cs = -(state as i32); }");
    w.line("_ => { cs = 1; }");
    w.dedent();
    w.line("}");
    w.line("(p, cs)");
    w.dedent();
    w.line("}");

    if let Some(epilogue) = &config.epilogue {
        w.blank();
        w.lines(epilogue);
    }

    Ok(w.finish())
}

/// A boolean Rust expression matching `byte` against the original byte
/// range underlying the compressed class range `[lo, hi]`. Since classes
/// are contiguous within a state's own transitions but not necessarily a
/// single underlying byte interval, this expands to the set of original
/// byte ranges sharing that class.
fn byte_class_pattern(machine: &Machine, lo: u16, hi: u16) -> String {
    let mut ranges: Vec<(u8, u8)> = Vec::new();
    let mut start: Option<u8> = None;
    let mut prev: Option<u8> = None;
    for b in 0..=255u8 {
        let class = machine.class_of(b);
        let in_range = class >= lo && class <= hi;
        match (in_range, start) {
            (true, None) => start = Some(b),
            (false, Some(s)) => {
                ranges.push((s, prev.unwrap()));
                start = None;
            }
            _ => {}
        }
        prev = Some(b);
    }
    if let Some(s) = start {
        ranges.push((s, 255));
    }

    ranges
        .into_iter()
        .map(|(lo, hi)| {
            if lo == hi {
                format!("byte == {}", lo)
            } else {
                format!("({}..={}).contains(&byte)", lo, hi)
            }
        })
        .collect::<Vec<_>>()
        .join(" || ")
}
