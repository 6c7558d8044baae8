//! Named, priority-bearing actions and precondition names (component C3).
//!
//! Actions and preconditions are user-opaque identifiers: the core never
//! interprets them, it only orders and threads them through NFA/DFA/Machine
//! transitions. Names are interned as `Arc<str>` so copying an action
//! reference through the many transformation passes is cheap.

use std::fmt;
use std::sync::Arc;

/// An interned action name.
#[derive(Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct ActionName(Arc<str>);

/// An interned precondition name.
#[derive(Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct PreconditionName(Arc<str>);

impl ActionName {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        ActionName(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl PreconditionName {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        PreconditionName(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ActionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for PreconditionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ActionName {
    fn from(s: &str) -> Self {
        ActionName::new(s)
    }
}

impl From<&str> for PreconditionName {
    fn from(s: &str) -> Self {
        PreconditionName::new(s)
    }
}

/// A named action with an integer priority. Larger priority wins when two
/// otherwise-coincident actions compete on the same transition.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct Action {
    pub name: ActionName,
    pub priority: i32,
}

impl Action {
    pub fn new(name: impl Into<ActionName>, priority: i32) -> Self {
        Action { name: name.into(), priority }
    }
}

impl From<&str> for Action {
    fn from(name: &str) -> Self {
        Action::new(name, 0)
    }
}

/// An ordered, deduplicated list of actions attached to one transition.
///
/// Order matters: this is not a `HashSet`. Equal-priority actions keep
/// their declaration order, and that order is observable — ties break by
/// declaration order, not priority alone.
#[derive(Clone, Eq, PartialEq, Debug, Default)]
pub struct ActionSet(Vec<Action>);

impl ActionSet {
    pub fn new() -> Self {
        ActionSet(Vec::new())
    }

    pub fn from_actions(actions: impl IntoIterator<Item = Action>) -> Self {
        let mut set = ActionSet::new();
        for action in actions {
            set.push(action);
        }
        set
    }

    /// Append an action, deduplicating on `(name, priority)` equality.
    pub fn push(&mut self, action: Action) {
        if !self.0.iter().any(|a| a.name == action.name && a.priority == action.priority) {
            self.0.push(action);
        }
    }

    /// Merge another set's actions into this one, preserving this set's
    /// actions first, then the other's, each in declaration order; callers
    /// that need the (priority desc, declaration order) total order should
    /// call [`ActionSet::sorted`] afterwards.
    pub fn extend(&mut self, other: &ActionSet) {
        for action in &other.0 {
            self.push(action.clone());
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Action> {
        self.0.iter()
    }

    /// The actions in the canonical firing order: priority descending, then
    /// original declaration order (a stable sort preserves the latter).
    pub fn sorted(&self) -> Vec<Action> {
        let mut actions = self.0.clone();
        actions.sort_by_key(|a| std::cmp::Reverse(a.priority));
        actions
    }

    pub fn names_in_order(&self) -> Vec<ActionName> {
        self.sorted().into_iter().map(|a| a.name).collect()
    }
}

impl IntoIterator for ActionSet {
    type Item = Action;
    type IntoIter = std::vec::IntoIter<Action>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
