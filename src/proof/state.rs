use std::fmt;

use crate::kernel::bitset::BitSet;
use crate::kernel::heap::FormulaId;
use crate::proof::delta::Delta;
use crate::type_system::TypeEnvironment;

/// States live in the proof's arena and are referred to by index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateId(pub u32);

impl StateId {
    pub fn get(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "s{}", self.0)
    }
}

/// One node of the proof tree. Never changes once created.
pub struct State {
    pub parent: Option<StateId>,

    // The rule that produced this state from its parent.
    pub rule: &'static str,

    // The truths the rule needed to justify this step.
    pub dependencies: Vec<FormulaId>,

    // The change relative to the parent.
    pub delta: Delta,

    // Every truth ever asserted between the root and here, active or not.
    pub known: BitSet,

    // The truths currently in force.
    pub active: BitSet,

    pub environment: TypeEnvironment,
}

impl State {
    pub fn root(environment: TypeEnvironment) -> State {
        State {
            parent: None,
            rule: "Root",
            dependencies: vec![],
            delta: Delta::new(),
            known: BitSet::new(),
            active: BitSet::new(),
            environment,
        }
    }

    /// A child of `parent` whose delta is not yet filled in.
    pub fn child(parent_id: StateId, parent: &State, rule: &'static str, dependencies: &[FormulaId]) -> State {
        State {
            parent: Some(parent_id),
            rule,
            dependencies: dependencies.to_vec(),
            delta: Delta::new(),
            known: parent.known.clone(),
            active: parent.active.clone(),
            environment: parent.environment.clone(),
        }
    }

    pub fn is_active(&self, id: FormulaId) -> bool {
        self.active.contains(id.get())
    }

    pub fn is_known(&self, id: FormulaId) -> bool {
        self.known.contains(id.get())
    }

    // Delta bookkeeping keeps the cumulative sets in step.
    pub(crate) fn add(&mut self, id: FormulaId) {
        self.delta.add(id);
        self.known.insert(id.get());
        self.active.insert(id.get());
    }

    pub(crate) fn remove(&mut self, id: FormulaId) {
        self.delta.remove(id);
        self.active.remove(id.get());
    }
}
