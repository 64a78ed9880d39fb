pub mod delta;
pub mod state;

use tracing::trace;

use crate::error::Error;
use crate::formula::Formula;
use crate::kernel::heap::{FormulaId, Heap};
use crate::kernel::name::Name;
use crate::kernel::types::Type;
use crate::proof::delta::Delta;
use crate::proof::state::{State, StateId};
use crate::type_system::{TypeEnvironment, TypeSystem};

/// A tree of proof states for a single assertion, together with the heap of every formula
/// those states mention.
///
/// States are append-only. Every primitive below takes the current head and returns a new
/// head, which is either a fresh child or the old head if nothing changed.
pub struct Proof<'a> {
    types: &'a TypeSystem,
    heap: Heap,
    states: Vec<State>,

    // Counter for skolem names.
    fresh: usize,
}

impl<'a> Proof<'a> {
    pub fn new(types: &'a TypeSystem, environment: TypeEnvironment) -> Proof<'a> {
        Proof {
            types,
            heap: Heap::new(),
            states: vec![State::root(environment)],
            fresh: 0,
        }
    }

    pub fn root(&self) -> StateId {
        StateId(0)
    }

    pub fn types(&self) -> &'a TypeSystem {
        self.types
    }

    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Panics if the id did not come from this proof.
    pub fn state(&self, id: StateId) -> &State {
        match self.states.get(id.get()) {
            Some(s) => s,
            None => panic!("state {} is not in a proof of size {}", id, self.len()),
        }
    }

    pub fn formula(&self, id: FormulaId) -> &Formula {
        self.heap.get(id)
    }

    pub fn allocate(&mut self, formula: Formula) -> FormulaId {
        self.heap.allocate(formula)
    }

    pub fn environment(&self, head: StateId) -> &TypeEnvironment {
        &self.state(head).environment
    }

    pub fn active(&self, head: StateId) -> Vec<FormulaId> {
        self.state(head)
            .active
            .iter()
            .map(|i| FormulaId(i as u32))
            .collect()
    }

    pub fn is_active(&self, head: StateId, id: FormulaId) -> bool {
        self.state(head).is_active(id)
    }

    /// Whether falsehood has been derived on the way to this state.
    pub fn is_closed(&self, head: StateId) -> bool {
        match self.heap.lookup(&Formula::Truth(false)) {
            Some(id) => self.state(head).is_known(id),
            None => false,
        }
    }

    /// A skolem name that has not been handed out before in this proof.
    pub fn fresh_name(&mut self, base: &Name) -> Name {
        self.fresh += 1;
        base.fresh(self.fresh)
    }

    fn push(&mut self, state: State) -> StateId {
        let id = StateId(self.states.len() as u32);
        trace!(
            state = %id,
            parent = ?state.parent,
            rule = state.rule,
            delta = ?state.delta,
            "new state"
        );
        self.states.push(state);
        id
    }

    fn child(&self, head: StateId, rule: &'static str, dependencies: &[FormulaId]) -> State {
        State::child(head, self.state(head), rule, dependencies)
    }

    /// Asserts a new truth. Does nothing if it has been known on this path before.
    pub fn infer(
        &mut self,
        head: StateId,
        rule: &'static str,
        truth: Formula,
        dependencies: &[FormulaId],
    ) -> StateId {
        if truth == Formula::Truth(true) {
            return head;
        }
        let id = self.heap.allocate(truth);
        if self.state(head).is_known(id) {
            return head;
        }
        let mut child = self.child(head, rule, dependencies);
        child.add(id);
        self.push(child)
    }

    /// Replaces one truth by another that is equivalent given the dependencies.
    pub fn subsume(
        &mut self,
        head: StateId,
        rule: &'static str,
        from: FormulaId,
        to: Formula,
        dependencies: &[FormulaId],
    ) -> StateId {
        self.subsume_all(head, rule, &[from], vec![to], dependencies)
    }

    /// Replaces several truths by several others at once.
    ///
    /// A replacement that was already known on this path is not asserted again: whatever
    /// superseded it is still in force.
    pub fn subsume_all(
        &mut self,
        head: StateId,
        rule: &'static str,
        from: &[FormulaId],
        to: Vec<Formula>,
        dependencies: &[FormulaId],
    ) -> StateId {
        let targets: Vec<FormulaId> = to
            .into_iter()
            .filter(|f| *f != Formula::Truth(true))
            .map(|f| self.heap.allocate(f))
            .collect();
        let state = self.state(head);
        let additions: Vec<FormulaId> = targets
            .iter()
            .filter(|t| !state.is_known(**t))
            .copied()
            .collect();
        let removals: Vec<FormulaId> = from
            .iter()
            .filter(|f| state.is_active(**f) && !targets.contains(f))
            .copied()
            .collect();
        if additions.is_empty() && removals.is_empty() {
            return head;
        }
        let mut child = self.child(head, rule, dependencies);
        for id in removals {
            child.remove(id);
        }
        for id in additions {
            child.add(id);
        }
        self.push(child)
    }

    /// Splits on a disjunction. Each child replaces the disjunction by one of its arms.
    pub fn split(&mut self, head: StateId, rule: &'static str, disjunct: FormulaId) -> Vec<StateId> {
        let arms = match self.formula(disjunct) {
            Formula::Disjunct(arms) => arms.clone(),
            _ => return vec![],
        };
        let mut children = vec![];
        for arm in arms {
            let id = self.heap.allocate(arm);
            let mut child = self.child(head, rule, &[disjunct]);
            child.remove(disjunct);
            if !child.is_active(id) {
                child.add(id);
            }
            children.push(self.push(child));
        }
        children
    }

    /// Narrows the tracked type of a variable.
    pub fn refine(
        &mut self,
        head: StateId,
        rule: &'static str,
        name: &Name,
        t: Type,
        dependencies: &[FormulaId],
    ) -> StateId {
        if self.environment(head).get(name) == Some(&t) {
            return head;
        }
        let mut child = self.child(head, rule, dependencies);
        child.environment.insert(name.clone(), t);
        self.push(child)
    }

    /// The states strictly after `ancestor`, down to and including `descendant`, in order.
    pub fn path(&self, ancestor: StateId, descendant: StateId) -> Result<Vec<StateId>, Error> {
        let mut path = vec![];
        let mut current = descendant;
        while current != ancestor {
            path.push(current);
            current = match self.state(current).parent {
                Some(parent) => parent,
                None => {
                    return Err(Error::internal(format!(
                        "{} is not an ancestor of {}",
                        ancestor, descendant
                    )))
                }
            };
        }
        path.reverse();
        Ok(path)
    }

    /// The combined change from `ancestor` to `descendant`.
    pub fn delta_between(&self, ancestor: StateId, descendant: StateId) -> Result<Delta, Error> {
        Ok(self
            .path(ancestor, descendant)?
            .into_iter()
            .fold(Delta::new(), |acc, s| acc.apply(&self.state(s).delta)))
    }

    /// The active truths of a state, for display.
    pub fn describe(&self, head: StateId) -> Vec<String> {
        self.active(head)
            .into_iter()
            .map(|id| self.formula(id).to_string())
            .collect()
    }
}
