use std::collections::HashMap;
use std::fmt;

use crate::formula::Formula;

/// Each interned formula has a unique id.
/// Structurally equal formulas always get the same id, and ids are never reused, so an id
/// can stand in for its formula in bit sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FormulaId(pub u32);

impl FormulaId {
    pub fn get(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for FormulaId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The append-only table of every formula a proof has mentioned.
#[derive(Default)]
pub struct Heap {
    formulas: Vec<Formula>,
    ids: HashMap<Formula, FormulaId>,
}

impl Heap {
    pub fn new() -> Heap {
        Heap::default()
    }

    /// Returns the canonical id for this formula, interning it if it's new.
    pub fn allocate(&mut self, formula: Formula) -> FormulaId {
        if let Some(id) = self.ids.get(&formula) {
            return *id;
        }
        let id = FormulaId(self.formulas.len() as u32);
        self.formulas.push(formula.clone());
        self.ids.insert(formula, id);
        id
    }

    /// The id of a formula that has already been interned.
    pub fn lookup(&self, formula: &Formula) -> Option<FormulaId> {
        self.ids.get(formula).copied()
    }

    /// Panics if the id did not come from this heap.
    pub fn get(&self, id: FormulaId) -> &Formula {
        match self.formulas.get(id.get()) {
            Some(f) => f,
            None => panic!("formula id {} is not in a heap of size {}", id, self.len()),
        }
    }

    pub fn len(&self) -> usize {
        self.formulas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.formulas.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::expr::Expr;

    #[test]
    fn test_structurally_equal_formulas_share_an_id() {
        let mut heap = Heap::new();
        let a = heap.allocate(Formula::equality(true, Expr::var("x"), Expr::var("y")));
        let b = heap.allocate(Formula::equality(true, Expr::var("y"), Expr::var("x")));
        let c = heap.allocate(Formula::Truth(false));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(heap.len(), 2);
        assert_eq!(heap.get(c), &Formula::Truth(false));
        assert_eq!(heap.lookup(&Formula::Truth(true)), None);
    }
}
