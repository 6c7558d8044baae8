//! The compact, emission-ready automaton (component C7): states renumbered
//! densely, byte ranges grouped behind a compressed input alphabet, and a
//! reference interpreter (`Machine::run`) that gives the emitted code
//! (table and direct-dispatch backends, [`crate::emit`]) something to be
//! checked against.
//!
//! The alphabet compression follows the classic technique used by table
//! driven scanner generators (grounded here on the `Run<A>` stepping loop
//! in a stepping-loop driver and the transition-table shape in
//! `dennisss-dacha`'s `fsm.rs`): group byte values into equivalence
//! classes that every state treats identically, then store transitions as
//! class ranges instead of byte ranges. Most matchers have far fewer
//! classes than 256 distinct byte values, which is what actually shrinks
//! the emitted table.

use crate::action::ActionName;
use crate::builder::AlphabetCompression;
use crate::dfa::{Dfa, DfaStateId};

#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct StateId(pub u32);

#[derive(Clone, Debug, Default)]
pub struct MachineState {
    /// Sorted, disjoint `(class_lo, class_hi, target)` ranges over the
    /// compressed alphabet.
    pub transitions: Vec<(u16, u16, StateId, Vec<ActionName>)>,
    pub accept: bool,
    pub eof_actions: Vec<ActionName>,
    pub guards: Vec<(crate::action::PreconditionName, StateId)>,
}

/// A complete, renumbered automaton ready for code emission.
pub struct Machine {
    states: Vec<MachineState>,
    start: StateId,
    /// `class_of[byte as usize]` is the compressed alphabet class.
    class_of: [u16; 256],
    class_count: usize,
}

impl Machine {
    pub fn from_dfa(dfa: &Dfa, alphabet_compression: AlphabetCompression) -> Machine {
        let (class_of, class_count) = match alphabet_compression {
            AlphabetCompression::Enabled => compress_alphabet(dfa),
            AlphabetCompression::Disabled => {
                let mut identity = [0u16; 256];
                for (b, slot) in identity.iter_mut().enumerate() {
                    *slot = b as u16;
                }
                (identity, 256)
            }
        };

        let states = dfa
            .states()
            .iter()
            .map(|state| {
                let mut transitions: Vec<(u16, u16, StateId, Vec<ActionName>)> = Vec::new();
                for (i, &(lo, hi, target)) in state.raw_transitions.iter().enumerate() {
                    let actions = state.transition_actions[i].names_in_order();
                    let class_lo = class_of[lo as usize];
                    let class_hi = class_of[hi as usize];
                    transitions.push((class_lo, class_hi, StateId(target.0 as u32 + 1), actions));
                }
                transitions.sort_by_key(|t| t.0);

                MachineState {
                    transitions,
                    accept: state.accept,
                    eof_actions: state.eof_actions.names_in_order(),
                    guards: state
                        .guards
                        .iter()
                        .map(|(name, target)| (name.clone(), StateId(target.0 as u32 + 1)))
                        .collect(),
                }
            })
            .collect();

        Machine { states, start: StateId(dfa.start_index() as u32 + 1), class_of, class_count }
    }

    pub fn start(&self) -> StateId {
        self.start
    }

    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    /// `id` is 1-based: state `k` lives at `StateId(k)`, never `StateId(0)`.
    /// This keeps `0` reserved so `cs = -(state as i32)` can never collide
    /// with the `cs == 0` success sentinel emitted code relies on.
    pub fn state(&self, id: StateId) -> &MachineState {
        &self.states[(id.0 - 1) as usize]
    }

    pub fn class_count(&self) -> usize {
        self.class_count
    }

    pub fn class_of(&self, byte: u8) -> u16 {
        self.class_of[byte as usize]
    }

    /// Write this automaton to Graphviz `dot` format for ad hoc debugging.
    /// Diagnostic tooling, not a supported export format.
    pub fn write_dot<W: std::io::Write>(&self, out: W) -> std::io::Result<()> {
        use crate::dot::{Edge as DotEdge, Family, GraphWriter, Node as DotNode};

        let mut writer = GraphWriter::new(out, Family::Directed, None)?;
        for (i, state) in self.states.iter().enumerate() {
            let node_id = i + 1;
            if state.accept {
                writer.node(node_id.into(), Some(DotNode { peripheries: Some(2), ..DotNode::none() }))?;
            }
            for (lo, hi, target, actions) in &state.transitions {
                let label = if actions.is_empty() {
                    format!("[{}-{}]", lo, hi)
                } else {
                    format!(
                        "[{}-{}] {}",
                        lo,
                        hi,
                        actions.iter().map(|a| a.as_str()).collect::<Vec<_>>().join(",")
                    )
                };
                writer.segment(
                    [node_id, target.0 as usize],
                    Some(DotEdge { label: Some(label.into()) }),
                )?;
            }
            for (name, target) in &state.guards {
                writer.segment(
                    [node_id, target.0 as usize],
                    Some(DotEdge { label: Some(format!("guard:{}", name.as_str()).into()) }),
                )?;
            }
        }
        Ok(())
    }

    /// Drive the automaton over `data`, following guarded transitions
    /// first whenever `precondition` returns true for the guard's name,
    /// falling back to the unguarded byte transition otherwise.
    ///
    /// `cs` in the result follows the variable protocol used by the
    /// emitted matchers: `0` means the run ended in an accepting state,
    /// `>0` means it ended mid-pattern and more input (or EOF) could
    /// still complete it, `<0` means no continuation of `data` can match.
    pub fn run(&self, data: &[u8], is_eof: bool, precondition: impl Fn(&str) -> bool) -> RunResult {
        let mut state = self.start;
        let mut fired: Vec<ActionName> = Vec::new();

        for (i, &byte) in data.iter().enumerate() {
            let guarded = self.state(state).guards.iter().find(|(name, _)| precondition(name.as_str()));

            let next = if let Some((_, target)) = guarded {
                Some(*target)
            } else {
                let class = self.class_of(byte);
                self.state(state).transitions.iter().find_map(|(lo, hi, target, actions)| {
                    if *lo <= class && class <= *hi {
                        fired.extend(actions.iter().cloned());
                        Some(*target)
                    } else {
                        None
                    }
                })
            };

            match next {
                Some(next_state) => state = next_state,
                None => return RunResult { consumed: i, cs: -(state.0 as i32), fired },
            }
        }

        if is_eof {
            if self.state(state).accept {
                fired.extend(self.state(state).eof_actions.iter().cloned());
                RunResult { consumed: data.len(), cs: 0, fired }
            } else {
                RunResult { consumed: data.len(), cs: -(state.0 as i32), fired }
            }
        } else if self.state(state).accept {
            RunResult { consumed: data.len(), cs: 0, fired }
        } else {
            RunResult { consumed: data.len(), cs: 1, fired }
        }
    }
}

#[derive(Clone, Debug)]
pub struct RunResult {
    pub consumed: usize,
    pub cs: i32,
    pub fired: Vec<ActionName>,
}

fn compress_alphabet(dfa: &Dfa) -> ([u16; 256], usize) {
    use std::collections::BTreeSet;

    let mut boundaries: BTreeSet<u16> = BTreeSet::new();
    boundaries.insert(0);
    boundaries.insert(256);
    for state in dfa.states() {
        for &(lo, hi, _) in &state.raw_transitions {
            boundaries.insert(lo as u16);
            boundaries.insert(hi as u16 + 1);
        }
    }
    let points: Vec<u16> = boundaries.into_iter().collect();

    // Signature per interval: for each state, the target reached by the
    // interval's representative byte (or `None`).
    let mut signatures: Vec<Vec<Option<DfaStateId>>> = Vec::with_capacity(points.len() - 1);
    for window in points.windows(2) {
        let representative = window[0] as u8;
        let sig: Vec<Option<DfaStateId>> = dfa
            .states()
            .iter()
            .map(|state| {
                state
                    .raw_transitions
                    .iter()
                    .find(|&&(lo, hi, _)| lo <= representative && representative <= hi)
                    .map(|&(_, _, target)| target)
            })
            .collect();
        signatures.push(sig);
    }

    let mut class_ids: Vec<usize> = Vec::with_capacity(signatures.len());
    let mut seen: Vec<Vec<Option<DfaStateId>>> = Vec::new();
    for sig in &signatures {
        let id = match seen.iter().position(|s| s == sig) {
            Some(id) => id,
            None => {
                seen.push(sig.clone());
                seen.len() - 1
            }
        };
        class_ids.push(id);
    }

    let mut class_of = [0u16; 256];
    for (interval_index, window) in points.windows(2).enumerate() {
        let (lo, hi) = (window[0], window[1] - 1);
        for b in lo..=hi.min(255) {
            class_of[b as usize] = class_ids[interval_index] as u16;
        }
    }

    (class_of, seen.len())
}
