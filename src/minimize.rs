//! Moore-style partition refinement for minimizing a [`crate::dfa::Dfa`].
//!
//! Hopcroft's algorithm is the faster textbook default, but Moore-style
//! refinement
//! produces the same final partition with a simpler fixpoint loop to
//! reason about once action sets (not just accept/reject) must be part of
//! state equivalence — two states are equivalent only if every transition
//! out of them goes to equivalent states AND carries the same action
//! names. That is the resolution recorded in DESIGN.md.

use std::collections::HashMap;

use rustc_hash::FxHashMap;

use crate::action::ActionName;
use crate::dfa::{Dfa, DfaState, DfaStateId};

/// A minimized `Dfa`: states collapsed by behavioral equivalence, states
/// renumbered densely starting at 0.
pub fn minimize(dfa: &Dfa) -> Dfa {
    let mut classes = initial_classes(dfa);

    loop {
        let signatures: Vec<Signature> =
            (0..dfa.state_count()).map(|i| signature_of(dfa, i, &classes)).collect();

        let mut assign: FxHashMap<Signature, usize> = FxHashMap::default();
        let mut next_classes = Vec::with_capacity(classes.len());
        for sig in signatures {
            let next_id = assign.len();
            let class = *assign.entry(sig).or_insert(next_id);
            next_classes.push(class);
        }

        if next_classes == classes {
            break;
        }
        classes = next_classes;
    }

    rebuild(dfa, &classes)
}

#[derive(Clone, Eq, PartialEq, Hash)]
struct Signature {
    class: usize,
    accept: bool,
    eof_actions: Vec<String>,
    transitions: Vec<(u8, u8, usize, Vec<String>)>,
    guards: Vec<(String, usize)>,
}

fn initial_classes(dfa: &Dfa) -> Vec<usize> {
    let mut assign: HashMap<(bool, Vec<String>), usize> = HashMap::new();
    let mut classes = Vec::with_capacity(dfa.state_count());
    for state in dfa.states() {
        let key = (state.accept, names(&state.eof_actions));
        let next_id = assign.len();
        let class = *assign.entry(key).or_insert(next_id);
        classes.push(class);
    }
    classes
}

fn signature_of(dfa: &Dfa, index: usize, classes: &[usize]) -> Signature {
    let state = dfa.state(DfaStateId(index));
    let mut transitions: Vec<(u8, u8, usize, Vec<String>)> = state
        .raw_transitions
        .iter()
        .zip(state.transition_actions.iter())
        .map(|(&(lo, hi, target), actions)| (lo, hi, classes[target.0], names(actions)))
        .collect();
    transitions.sort_by_key(|t| t.0);

    let mut guards: Vec<(String, usize)> = state
        .guards
        .iter()
        .map(|(name, target)| (name.as_str().to_string(), classes[target.0]))
        .collect();
    guards.sort();

    Signature {
        class: classes[index],
        accept: state.accept,
        eof_actions: names(&state.eof_actions),
        transitions,
        guards,
    }
}

fn names(actions: &crate::action::ActionSet) -> Vec<String> {
    actions.sorted().into_iter().map(|a| action_key(&a.name, a.priority)).collect()
}

fn action_key(name: &ActionName, priority: i32) -> String {
    format!("{}@{}", name.as_str(), priority)
}

fn rebuild(dfa: &Dfa, classes: &[usize]) -> Dfa {
    let class_count = classes.iter().max().map(|m| m + 1).unwrap_or(0);
    let mut representative = vec![None; class_count];
    for (state_index, &class) in classes.iter().enumerate() {
        representative[class].get_or_insert(state_index);
    }

    let mut new_states: Vec<DfaState> = Vec::with_capacity(class_count);
    for class in 0..class_count {
        let rep_index = representative[class].expect("every class has at least one member");
        let rep = dfa.state(DfaStateId(rep_index));

        let raw_transitions: Vec<(u8, u8, DfaStateId)> = rep
            .raw_transitions
            .iter()
            .map(|&(lo, hi, target)| (lo, hi, DfaStateId(classes[target.0])))
            .collect();
        let guards = rep
            .guards
            .iter()
            .map(|(name, target)| (name.clone(), DfaStateId(classes[target.0])))
            .collect();

        new_states.push(DfaState {
            raw_transitions,
            transition_actions: rep.transition_actions.clone(),
            accept: rep.accept,
            eof_actions: rep.eof_actions.clone(),
            guards,
        });
    }

    Dfa::from_parts(new_states, classes[dfa.start_index()])
}
