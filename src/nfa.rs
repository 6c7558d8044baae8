//! Graph of states with labeled byte-transitions and epsilon-transitions
//! carrying actions (component C4).
//!
//! Thompson-style expansion of a [`crate::ast::Ast`] into an epsilon-NFA,
//! implementing the five action/precondition placement rules described
//! below. States live in an arena (`Vec<NfaState>`) addressed by
//! `NfaStateId`, per the "cyclic graphs -> arena + integer indices"
//! redesign note; traversal (epsilon-closure) uses a worklist and a
//! visited set rather than recursion.

use std::collections::HashSet;

use crate::action::{ActionSet, PreconditionName};
use crate::ast::{Annotation, Ast, NodeId, Op};
use crate::byteset::ByteSet;
use crate::dfa::Dfa;

/// A node handle of an epsilon-NFA.
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct NfaStateId(pub u32);

#[derive(Clone, Debug)]
pub struct ByteEdge {
    pub bytes: ByteSet,
    pub target: NfaStateId,
    pub actions: ActionSet,
    pub precondition: Option<PreconditionName>,
}

#[derive(Clone, Debug)]
pub struct EpsilonEdge {
    pub target: NfaStateId,
    pub actions: ActionSet,
    pub precondition: Option<PreconditionName>,
}

#[derive(Clone, Debug, Default)]
pub struct NfaState {
    pub byte_edges: Vec<ByteEdge>,
    pub epsilon_edges: Vec<EpsilonEdge>,
    /// Actions to run if the overall match ends with this state live and
    /// this state is (transitively via epsilon) the accepting state —
    /// populated only on "exit gate" states created by `on_exit`
    /// annotations: exit actions are additionally stored as EOF
    /// actions, since the byte after a match may never arrive.
    pub eof_actions: ActionSet,
}

/// An epsilon-NFA: one `start` state, one `final` (accepting) state.
pub struct Nfa {
    states: Vec<NfaState>,
    pub start: NfaStateId,
    pub finish: NfaStateId,
}

/// A single-entry, single-exit subgraph under construction.
#[derive(Clone, Copy)]
struct Fragment {
    entry: NfaStateId,
    exit: NfaStateId,
}

struct Builder {
    states: Vec<NfaState>,
}

impl Builder {
    fn new() -> Self {
        Builder { states: Vec::new() }
    }

    fn new_state(&mut self) -> NfaStateId {
        let id = NfaStateId(self.states.len() as u32);
        self.states.push(NfaState::default());
        id
    }

    fn add_epsilon(&mut self, from: NfaStateId, to: NfaStateId) {
        self.states[from.0 as usize].epsilon_edges.push(EpsilonEdge {
            target: to,
            actions: ActionSet::new(),
            precondition: None,
        });
    }

    fn add_epsilon_actions(&mut self, from: NfaStateId, to: NfaStateId, actions: ActionSet) {
        self.states[from.0 as usize].epsilon_edges.push(EpsilonEdge {
            target: to,
            actions,
            precondition: None,
        });
    }

    fn add_byte(&mut self, from: NfaStateId, bytes: ByteSet, to: NfaStateId) {
        self.states[from.0 as usize].byte_edges.push(ByteEdge {
            bytes,
            target: to,
            actions: ActionSet::new(),
            precondition: None,
        });
    }

    /// All state ids reachable (by any edge kind) starting from `entry`,
    /// restricted to states created strictly for this fragment (i.e.
    /// those with id >= `floor`).
    fn fragment_states(&self, entry: NfaStateId, floor: u32) -> HashSet<NfaStateId> {
        let mut seen = HashSet::new();
        let mut stack = vec![entry];
        seen.insert(entry);
        while let Some(s) = stack.pop() {
            let node = &self.states[s.0 as usize];
            for e in &node.epsilon_edges {
                if e.target.0 >= floor && seen.insert(e.target) {
                    stack.push(e.target);
                }
            }
            for e in &node.byte_edges {
                if e.target.0 >= floor && seen.insert(e.target) {
                    stack.push(e.target);
                }
            }
        }
        seen
    }

    fn build_node(&mut self, ast: &Ast, id: NodeId) -> Fragment {
        let floor = self.states.len() as u32;
        let raw = match ast.op(id) {
            Op::Empty => {
                let entry = self.new_state();
                let exit = self.new_state();
                self.add_epsilon(entry, exit);
                Fragment { entry, exit }
            }
            Op::Symbol(bytes) => {
                let entry = self.new_state();
                let exit = self.new_state();
                self.add_byte(entry, bytes.clone(), exit);
                Fragment { entry, exit }
            }
            Op::Concat(a, b) => {
                let fa = self.build_node(ast, *a);
                let fb = self.build_node(ast, *b);
                self.add_epsilon(fa.exit, fb.entry);
                Fragment { entry: fa.entry, exit: fb.exit }
            }
            Op::Alt(a, b) => {
                let fa = self.build_node(ast, *a);
                let fb = self.build_node(ast, *b);
                let entry = self.new_state();
                let exit = self.new_state();
                self.add_epsilon(entry, fa.entry);
                self.add_epsilon(entry, fb.entry);
                self.add_epsilon(fa.exit, exit);
                self.add_epsilon(fb.exit, exit);
                Fragment { entry, exit }
            }
            Op::Rep(a) => {
                let fa = self.build_node(ast, *a);
                let entry = self.new_state();
                let exit = self.new_state();
                self.add_epsilon(entry, fa.entry);
                self.add_epsilon(fa.exit, fa.entry);
                self.add_epsilon(entry, exit);
                self.add_epsilon(fa.exit, exit);
                Fragment { entry, exit }
            }
            Op::And(a, b) => self.build_combinator(ast, *a, *b, Combinator::And),
            Op::Diff(a, b) => self.build_combinator(ast, *a, *b, Combinator::Diff),
        };

        self.apply_annotation(raw, ast.annotation(id), floor)
    }

    fn build_combinator(&mut self, ast: &Ast, a: NodeId, b: NodeId, combinator: Combinator) -> Fragment {
        let nfa_a = Nfa::from_ast_node(ast, a);
        let nfa_b = Nfa::from_ast_node(ast, b);
        let dfa_a = Dfa::from_nfa(&nfa_a, false).expect("sub-NFA compiles without ambiguity checks");
        let dfa_b = Dfa::from_nfa(&nfa_b, false).expect("sub-NFA compiles without ambiguity checks");
        let product = Dfa::product(&dfa_a, &dfa_b, combinator);
        self.inline_dfa(&product)
    }

    /// Materialize a whole DFA as a fresh single-entry/single-exit
    /// fragment in this builder's arena. Used to splice the result of an
    /// intersection/difference product construction back into the
    /// surrounding Thompson expansion. Product combinators carry no user
    /// actions here, since action semantics under NFA product are not
    /// well-defined.
    fn inline_dfa(&mut self, dfa: &Dfa) -> Fragment {
        let mut mapped = Vec::with_capacity(dfa.state_count());
        for _ in 0..dfa.state_count() {
            mapped.push(self.new_state());
        }
        let exit = self.new_state();
        for (i, state) in dfa.states().iter().enumerate() {
            for &(lo, hi, target) in &state.raw_transitions {
                self.add_byte(mapped[i], ByteSet::range(lo, hi), mapped[target.0 as usize]);
            }
            if state.accept {
                self.add_epsilon(mapped[i], exit);
            }
        }
        Fragment { entry: mapped[dfa.start_index()], exit }
    }

    fn apply_annotation(&mut self, raw: Fragment, ann: &Annotation, floor: u32) -> Fragment {
        if ann.on_final.is_empty()
            && ann.all.is_empty()
            && ann.precondition.is_none()
            && ann.enter.is_empty()
            && ann.exit.is_empty()
        {
            return raw;
        }

        let members = self.fragment_states(raw.entry, floor);

        if !ann.on_final.is_empty() {
            let mut found_any = false;
            for &s in &members {
                for edge in &mut self.states[s.0 as usize].byte_edges {
                    if edge.target == raw.exit {
                        edge.actions.extend(&ann.on_final);
                        found_any = true;
                    }
                }
            }
            if !found_any {
                tracing::warn!(
                    "final actions attached to a sub-regex with no determinable last byte; \
                     no byte-transition directly enters the exit state"
                );
            }
        }

        if !ann.all.is_empty() {
            for &s in &members {
                for edge in &mut self.states[s.0 as usize].byte_edges {
                    if members.contains(&edge.target) {
                        edge.actions.extend(&ann.all);
                    }
                }
            }
        }

        if let Some(precond) = &ann.precondition {
            let entry = raw.entry;
            let state = &mut self.states[entry.0 as usize];
            for edge in &mut state.byte_edges {
                edge.precondition = Some(precond.clone());
            }
            for edge in &mut state.epsilon_edges {
                edge.precondition = Some(precond.clone());
            }
        }

        let entry = if ann.enter.is_empty() {
            raw.entry
        } else {
            let new_entry = self.new_state();
            self.add_epsilon_actions(new_entry, raw.entry, ann.enter.clone());
            new_entry
        };

        let exit = if ann.exit.is_empty() {
            raw.exit
        } else {
            let new_exit = self.new_state();
            self.add_epsilon_actions(raw.exit, new_exit, ann.exit.clone());
            self.states[new_exit.0 as usize].eof_actions = ann.exit.clone();
            new_exit
        };

        Fragment { entry, exit }
    }
}

/// Which boolean combinator to apply when inlining a product DFA.
/// Intersection and difference are both implemented via product
/// construction on two NFAs converted to DFAs first.
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub enum Combinator {
    And,
    Diff,
}

impl Nfa {
    /// Build the NFA for an entire [`Ast`], rooted at `ast.root`.
    pub fn from_ast(ast: &Ast) -> Nfa {
        Nfa::from_ast_node(ast, ast.root)
    }

    /// Build a standalone NFA for the sub-tree rooted at `node`, used
    /// internally to feed the intersection/difference product
    /// construction with independent start/final states.
    pub(crate) fn from_ast_node(ast: &Ast, node: NodeId) -> Nfa {
        let mut builder = Builder::new();
        let fragment = builder.build_node(ast, node);
        Nfa { states: builder.states, start: fragment.entry, finish: fragment.exit }
    }

    pub fn state(&self, id: NfaStateId) -> &NfaState {
        &self.states[id.0 as usize]
    }

    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    pub fn states(&self) -> &[NfaState] {
        &self.states
    }

    /// All states reachable by epsilon transitions from `start`,
    /// including `start` itself.
    pub fn epsilon_closure<I: IntoIterator<Item = NfaStateId>>(&self, start: I) -> EpsilonClosure {
        let mut reached = HashSet::new();
        let mut actions = ActionSet::new();
        let mut precondition_gated: Vec<(PreconditionName, NfaStateId)> = Vec::new();
        let mut stack: Vec<NfaStateId> = start.into_iter().collect();
        for &s in &stack {
            reached.insert(s);
        }
        while let Some(s) = stack.pop() {
            for edge in &self.states[s.0 as usize].epsilon_edges {
                if let Some(p) = &edge.precondition {
                    precondition_gated.push((p.clone(), edge.target));
                }
                actions.extend(&edge.actions);
                if reached.insert(edge.target) {
                    stack.push(edge.target);
                }
            }
        }
        EpsilonClosure { states: reached, actions, precondition_gated }
    }

    /// Write this NFA to Graphviz `dot` format for ad hoc debugging
    /// Graph export is diagnostic tooling, not a supported output
    /// format, and carries no stability guarantee.
    pub fn write_dot<W: std::io::Write>(&self, out: W) -> std::io::Result<()> {
        use crate::dot::{Edge as DotEdge, Family, GraphWriter, Node as DotNode};

        let mut writer = GraphWriter::new(out, Family::Directed, None)?;
        writer.node(
            (self.finish.0 as usize).into(),
            Some(DotNode { peripheries: Some(2), ..DotNode::none() }),
        )?;
        for (i, state) in self.states.iter().enumerate() {
            for edge in &state.byte_edges {
                writer.segment(
                    [i, edge.target.0 as usize],
                    Some(DotEdge { label: Some(edge.bytes.to_string().into()) }),
                )?;
            }
            for edge in &state.epsilon_edges {
                writer.segment(
                    [i, edge.target.0 as usize],
                    Some(DotEdge { label: Some("eps".into()) }),
                )?;
            }
        }
        Ok(())
    }
}

/// The result of computing an epsilon-closure: the reachable state set, the
/// merged actions picked up along the way, and any precondition-guarded
/// edges found at the closure's boundary (evaluated by the caller, who
/// knows the runtime truth value).
pub struct EpsilonClosure {
    pub states: HashSet<NfaStateId>,
    pub actions: ActionSet,
    pub precondition_gated: Vec<(PreconditionName, NfaStateId)>,
}
