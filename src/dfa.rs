//! Subset construction, ambiguity detection, and the product construction
//! used for intersection/difference (component C5).
//!
//! Determinization follows a worklist over composite NFA-state sets, keyed
//! by `FxHashMap<BTreeSet<NfaStateId>, DfaStateId>` the way `scnr`'s
//! `CompiledDfa::create_from_nfa` keys its subset map — a `BTreeSet` gives a
//! canonical, hashable identity for a composite state without needing a
//! second normalization pass.

use std::collections::{BTreeSet, VecDeque};

use rustc_hash::FxHashMap;

use crate::action::{ActionSet, PreconditionName};
use crate::error::{CompileError, CompileResult};
use crate::nfa::{Combinator, Nfa, NfaStateId};

#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct DfaStateId(pub usize);

#[derive(Clone, Debug, Default)]
pub struct DfaState {
    /// Disjoint, sorted `(lo, hi, target)` byte transitions.
    pub raw_transitions: Vec<(u8, u8, DfaStateId)>,
    /// Actions attached to each entry of `raw_transitions`, same index.
    pub transition_actions: Vec<ActionSet>,
    pub accept: bool,
    pub eof_actions: ActionSet,
    /// Preconditions observed while closing over this composite state's
    /// member NFA states, together with the state reached if the guard
    /// evaluates true at runtime: preconditions are evaluated by
    /// caller-supplied predicates, never decided at compile time.
    pub guards: Vec<(PreconditionName, DfaStateId)>,
}

pub struct Dfa {
    states: Vec<DfaState>,
    start: DfaStateId,
}

impl Dfa {
    pub(crate) fn from_parts(states: Vec<DfaState>, start: usize) -> Dfa {
        Dfa { states, start: DfaStateId(start) }
    }

    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    pub fn states(&self) -> &[DfaState] {
        &self.states
    }

    pub fn start_index(&self) -> usize {
        self.start.0
    }

    pub fn state(&self, id: DfaStateId) -> &DfaState {
        &self.states[id.0]
    }

    /// Determinize `nfa` via subset construction.
    ///
    /// When `unambiguous` is true, two actions of equal priority firing on
    /// the same transition is reported as [`CompileError::Ambiguous`] with a
    /// minimal witness input reconstructed by walking the worklist's parent
    /// pointers back to the start state. Combinator-internal sub-NFAs pass
    /// `false`, since action semantics are undefined for product
    /// construction and so cannot conflict.
    pub fn from_nfa(nfa: &Nfa, unambiguous: bool) -> CompileResult<Dfa> {
        let mut map: FxHashMap<BTreeSet<NfaStateId>, DfaStateId> = FxHashMap::default();
        let mut states: Vec<DfaState> = Vec::new();
        let mut parents: Vec<Option<(DfaStateId, u8)>> = Vec::new();
        let mut worklist: VecDeque<BTreeSet<NfaStateId>> = VecDeque::new();

        let start_closure = nfa.epsilon_closure([nfa.start]);
        let start_set: BTreeSet<NfaStateId> = start_closure.states.into_iter().collect();
        let start_id = DfaStateId(states.len());
        states.push(DfaState::default());
        parents.push(None);
        map.insert(start_set.clone(), start_id);
        worklist.push_back(start_set);

        while let Some(set) = worklist.pop_front() {
            let from_id = *map.get(&set).expect("set was enqueued with a known id");

            let accept = set.contains(&nfa.finish);
            let mut eof_actions = ActionSet::new();
            if accept {
                for &member in &set {
                    eof_actions.extend(&nfa.state(member).eof_actions);
                }
            }

            let mut guards: Vec<(PreconditionName, DfaStateId)> = Vec::new();
            let mut guard_names_seen: Vec<PreconditionName> = Vec::new();

            // Partition outgoing byte edges of every member state into a
            // minimal set of disjoint boundary points, so each resulting
            // transition range has a single, well-defined action set.
            let mut boundaries: BTreeSet<u16> = BTreeSet::new();
            boundaries.insert(0);
            boundaries.insert(256);
            for &member in &set {
                for edge in &nfa.state(member).byte_edges {
                    for &(lo, hi) in edge.bytes.ranges() {
                        boundaries.insert(lo as u16);
                        boundaries.insert(hi as u16 + 1);
                    }
                    if let Some(p) = &edge.precondition {
                        let precondition_closure = nfa.epsilon_closure([edge.target]);
                        let guard_set: BTreeSet<NfaStateId> =
                            precondition_closure.states.into_iter().collect();
                        let guard_id = match map.get(&guard_set) {
                            Some(&id) => id,
                            None => {
                                let id = DfaStateId(states.len());
                                states.push(DfaState::default());
                                parents.push(Some((from_id, 0)));
                                map.insert(guard_set.clone(), id);
                                worklist.push_back(guard_set);
                                id
                            }
                        };
                        if !guard_names_seen.contains(p) {
                            guard_names_seen.push(p.clone());
                            guards.push((p.clone(), guard_id));
                        }
                    }
                }
                for edge in &nfa.state(member).epsilon_edges {
                    if let Some(p) = &edge.precondition {
                        let precondition_closure = nfa.epsilon_closure([edge.target]);
                        let guard_set: BTreeSet<NfaStateId> =
                            precondition_closure.states.into_iter().collect();
                        let guard_id = match map.get(&guard_set) {
                            Some(&id) => id,
                            None => {
                                let id = DfaStateId(states.len());
                                states.push(DfaState::default());
                                parents.push(Some((from_id, 0)));
                                map.insert(guard_set.clone(), id);
                                worklist.push_back(guard_set);
                                id
                            }
                        };
                        if !guard_names_seen.contains(p) {
                            guard_names_seen.push(p.clone());
                            guards.push((p.clone(), guard_id));
                        }
                    }
                }
            }

            let mut transitions = Vec::new();
            let mut transition_actions = Vec::new();
            let boundary_points: Vec<u16> = boundaries.into_iter().collect();
            for window in boundary_points.windows(2) {
                let (lo16, hi16) = (window[0], window[1] - 1);
                if lo16 > 255 {
                    continue;
                }
                let (lo, hi) = (lo16 as u8, hi16.min(255) as u8);

                let mut next_set: BTreeSet<NfaStateId> = BTreeSet::new();
                let mut edge_actions = ActionSet::new();
                for &member in &set {
                    for edge in &nfa.state(member).byte_edges {
                        if edge.bytes.contains(lo) {
                            if edge.precondition.is_none() {
                                let closure = nfa.epsilon_closure([edge.target]);
                                next_set.extend(closure.states);
                                edge_actions.extend(&edge.actions);
                                edge_actions.extend(&closure.actions);
                            }
                        }
                    }
                }
                if next_set.is_empty() {
                    continue;
                }

                let to_id = match map.get(&next_set) {
                    Some(&id) => id,
                    None => {
                        let id = DfaStateId(states.len());
                        states.push(DfaState::default());
                        parents.push(Some((from_id, lo)));
                        map.insert(next_set.clone(), id);
                        worklist.push_back(next_set);
                        id
                    }
                };

                if unambiguous {
                    check_unambiguous(&edge_actions, lo, &parents, from_id)?;
                }

                transitions.push((lo, hi, to_id));
                transition_actions.push(edge_actions);
            }

            let state = &mut states[from_id.0];
            state.raw_transitions = transitions;
            state.transition_actions = transition_actions;
            state.accept = accept;
            state.eof_actions = eof_actions;
            state.guards = guards;
        }

        Ok(Dfa { states, start: start_id })
    }

    /// Product construction combining two DFAs via `combinator`
    /// (intersection or difference over the languages they accept). The
    /// result carries no actions; combinator DFAs are only ever inlined
    /// back into a [`crate::nfa::Nfa`] as plain structural fragments
    /// (an explicit design choice, not an accident of implementation order).
    pub fn product(a: &Dfa, b: &Dfa, combinator: Combinator) -> Dfa {
        // Reserved second component of a pair key: B has no live state here
        // (only reachable under `Diff`, once B has no edge for some byte).
        // Since B is total in that reading, missing-edge means "dead,
        // non-accepting sink" rather than "undefined" — A keeps running.
        const DEAD: usize = usize::MAX;

        let mut map: FxHashMap<(usize, usize), DfaStateId> = FxHashMap::default();
        let mut states: Vec<DfaState> = Vec::new();
        let mut worklist: VecDeque<(usize, usize)> = VecDeque::new();

        let start_pair = (a.start_index(), b.start_index());
        let start_id = DfaStateId(states.len());
        states.push(DfaState::default());
        map.insert(start_pair, start_id);
        worklist.push_back(start_pair);

        while let Some((ia, ib)) = worklist.pop_front() {
            let id = map[&(ia, ib)];
            let sa = &a.states[ia];
            let sb = if ib == DEAD { None } else { Some(&b.states[ib]) };

            let b_accepts = sb.is_some_and(|s| s.accept);
            let accept = match combinator {
                Combinator::And => sa.accept && b_accepts,
                Combinator::Diff => sa.accept && !b_accepts,
            };

            let mut boundaries: BTreeSet<u16> = BTreeSet::new();
            boundaries.insert(0);
            boundaries.insert(256);
            for &(lo, hi, _) in &sa.raw_transitions {
                boundaries.insert(lo as u16);
                boundaries.insert(hi as u16 + 1);
            }
            if let Some(sb) = sb {
                for &(lo, hi, _) in &sb.raw_transitions {
                    boundaries.insert(lo as u16);
                    boundaries.insert(hi as u16 + 1);
                }
            }

            let points: Vec<u16> = boundaries.into_iter().collect();
            let mut transitions = Vec::new();
            for window in points.windows(2) {
                let (lo16, hi16) = (window[0], window[1] - 1);
                if lo16 > 255 {
                    continue;
                }
                let (lo, hi) = (lo16 as u8, hi16.min(255) as u8);

                // A is never total here: no A-edge means this byte simply
                // cannot continue a match, for either combinator.
                let target_a = sa.raw_transitions.iter().find(|&&(l, h, _)| l <= lo && lo <= h);
                let Some(&(_, _, ta)) = target_a else {
                    continue;
                };

                let target_b = sb.and_then(|sb| {
                    sb.raw_transitions.iter().find(|&&(l, h, _)| l <= lo && lo <= h)
                });
                let ib_next = match (combinator, target_b) {
                    (_, Some(&(_, _, tb))) => tb.0,
                    (Combinator::Diff, None) => DEAD,
                    (Combinator::And, None) => continue,
                };

                let pair = (ta.0, ib_next);
                let to_id = match map.get(&pair) {
                    Some(&id) => id,
                    None => {
                        let id = DfaStateId(states.len());
                        states.push(DfaState::default());
                        map.insert(pair, id);
                        worklist.push_back(pair);
                        id
                    }
                };
                transitions.push((lo, hi, to_id));
            }

            let transition_count = transitions.len();
            let state = &mut states[id.0];
            state.raw_transitions = transitions;
            state.transition_actions = vec![ActionSet::new(); transition_count];
            state.accept = accept;
        }

        Dfa { states, start: start_id }
    }
}

fn check_unambiguous(
    edge_actions: &ActionSet,
    lo: u8,
    parents: &[Option<(DfaStateId, u8)>],
    from_id: DfaStateId,
) -> CompileResult<()> {
    let sorted = edge_actions.sorted();
    if sorted.len() < 2 {
        return Ok(());
    }
    if sorted[0].priority == sorted[1].priority {
        let witness = reconstruct_witness(parents, from_id, lo);
        return Err(CompileError::Ambiguous {
            witness,
            action_a: sorted[0].name.clone(),
            action_b: sorted[1].name.clone(),
        });
    }
    Ok(())
}

fn reconstruct_witness(
    parents: &[Option<(DfaStateId, u8)>],
    from: DfaStateId,
    last_byte: u8,
) -> Vec<u8> {
    let mut bytes = vec![last_byte];
    let mut cur = from;
    while let Some((parent, byte)) = parents[cur.0] {
        bytes.push(byte);
        cur = parent;
    }
    bytes.reverse();
    bytes
}
