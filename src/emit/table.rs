//! Table-driven backend: one flat, data-only transition table per state
//! plus a generic stepping loop. Action bodies cannot themselves be data
//! (they are caller Rust code), so the table only carries small integer
//! "action list" ids; a generated `fire_actions` match dispatches those
//! ids to the actual spliced bodies.

use crate::action::ActionName;
use crate::error::EmitResult;
use crate::machine::{Machine, StateId};

use super::{emit_action_calls, ActionBodies, CodeWriter, EmitConfig};

pub fn emit(machine: &Machine, config: &EmitConfig, actions: &ActionBodies) -> EmitResult<String> {
    let mut action_lists: Vec<Vec<ActionName>> = Vec::new();
    let mut list_id_of = |names: &[ActionName], lists: &mut Vec<Vec<ActionName>>| -> usize {
        if let Some(pos) = lists.iter().position(|l| l.as_slice() == names) {
            return pos;
        }
        lists.push(names.to_vec());
        lists.len() - 1
    };

    let mut class_of_class = Vec::new();
    for byte in 0..=255u8 {
        class_of_class.push(machine.class_of(byte));
    }

    // State ids are 1-based (`Machine::state` never serves id 0), so every
    // per-state array below is padded with an unused row at index 0; the
    // generated code indexes these arrays directly by the runtime `state`
    // value without ever subtracting one.
    let mut per_state_rows: Vec<Vec<(u16, u16, u32, usize)>> =
        Vec::with_capacity(machine.state_count() + 1);
    let mut accept = Vec::with_capacity(machine.state_count() + 1);
    let mut eof_list_ids = Vec::with_capacity(machine.state_count() + 1);
    let mut guard_rows: Vec<Vec<(&str, u32)>> = Vec::with_capacity(machine.state_count() + 1);

    per_state_rows.push(Vec::new());
    accept.push(false);
    eof_list_ids.push(list_id_of(&[], &mut action_lists));
    guard_rows.push(Vec::new());

    for i in 0..machine.state_count() {
        let state = machine.state(StateId((i + 1) as u32));
        let mut rows = Vec::new();
        for (lo, hi, target, names) in &state.transitions {
            let id = list_id_of(names, &mut action_lists);
            rows.push((*lo, *hi, target.0, id));
        }
        per_state_rows.push(rows);
        accept.push(state.accept);
        eof_list_ids.push(list_id_of(&state.eof_actions, &mut action_lists));
        guard_rows.push(state.guards.iter().map(|(name, target)| (name.as_str(), target.0)).collect());
    }

    let mut w = CodeWriter::new();
    w.line("// Generated matcher (table-driven backend). Do not edit by hand.");
    w.line("#[allow(clippy::all)]");
    w.blank();
    if let Some(preamble) = &config.preamble {
        w.lines(preamble);
        w.blank();
    }

    w.line(&format!("const CLASS_OF: [u16; 256] = {:?};", class_of_class));
    w.blank();

    w.line("const TRANSITIONS: &[&[(u16, u16, u32, u32)]] = &[");
    w.indent();
    for rows in &per_state_rows {
        let flat: Vec<(u16, u16, u32, u32)> =
            rows.iter().map(|&(lo, hi, target, list)| (lo, hi, target, list as u32)).collect();
        w.line(&format!("&{:?},", flat));
    }
    w.dedent();
    w.line("];");
    w.blank();

    w.line(&format!("const ACCEPT: [bool; {}] = {:?};", accept.len(), accept));
    w.line(&format!("const EOF_ACTION_LIST: [u32; {}] = {:?};", eof_list_ids.len(), eof_list_ids));
    w.blank();

    w.line("const GUARDS: &[&[(&str, u32)]] = &[");
    w.indent();
    for rows in &guard_rows {
        w.line(&format!("&{:?},", rows));
    }
    w.dedent();
    w.line("];");
    w.blank();

    w.line("fn fire_actions(list_id: u32, data: &[u8], p: usize, byte: u8) {");
    w.indent();
    w.line("let _ = (data, p, byte);");
    w.line("match list_id {");
    w.indent();
    for (id, names) in action_lists.iter().enumerate() {
        w.line(&format!("{} => {{", id));
        w.indent();
        emit_action_calls(&mut w, names, actions)?;
        w.dedent();
        w.line("}");
    }
    w.line("_ => unreachable!(\"action list id out of range\"),");
    w.dedent();
    w.line("}");
    w.dedent();
    w.line("}");
    w.blank();

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
    w.line(&format!(
        "if let Some(&(_, target)) = GUARDS[state as usize].iter().find(|&&(name, _)| {}(name)) {{",
        config.precondition_param
    ));
    w.indent();
    w.line("state = target;");
    w.line("p += 1;");
    w.line("continue 'outer;");
    w.dedent();
    w.line("}");
    w.line("let byte = data[p];");
    w.line("let class = CLASS_OF[byte as usize];");
    w.line("let row = TRANSITIONS[state as usize].iter().find(|&&(lo, hi, _, _)| lo <= class && class <= hi);");
    w.line("match row {");
    w.indent();
    w.line("Some(&(_, _, target, list_id)) => {");
    w.indent();
    w.line("fire_actions(list_id, data, p, byte);");
    w.line("state = target;");
    w.line("p += 1;");
    w.dedent();
    w.line("}");
    w.line("None => {");
    w.indent();
    w.line("cs = -(state as i32);");
    w.line("return (p, cs);");
    w.dedent();
    w.line("}");
    w.dedent();
    w.line("}");
    w.dedent();
    w.line("}");
    w.blank();
    w.line("if ACCEPT[state as usize] {");
    w.indent();
    w.line("if is_eof {");
    w.indent();
    w.line("fire_actions(EOF_ACTION_LIST[state as usize], data, p, 0);");
    w.dedent();
    w.line("}");
    w.line("cs = 0;");
    w.dedent();
    w.line("} else if is_eof {");
    w.indent();
    w.line("cs = -(state as i32);");
    w.dedent();
    w.line("} else {");
    w.indent();
    w.line("cs = 1;");
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
