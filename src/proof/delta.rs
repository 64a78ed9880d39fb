use std::fmt;

use crate::kernel::bitset::BitSet;
use crate::kernel::heap::FormulaId;

/// The truths added and removed going from one state to a descendant.
/// A formula is never both added and removed by the same delta.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Delta {
    additions: BitSet,
    removals: BitSet,
}

impl Delta {
    pub fn new() -> Delta {
        Delta::default()
    }

    pub fn add(&mut self, id: FormulaId) {
        self.removals.remove(id.get());
        self.additions.insert(id.get());
    }

    pub fn remove(&mut self, id: FormulaId) {
        self.additions.remove(id.get());
        self.removals.insert(id.get());
    }

    pub fn is_empty(&self) -> bool {
        self.additions.is_empty() && self.removals.is_empty()
    }

    pub fn additions(&self) -> impl Iterator<Item = FormulaId> + '_ {
        self.additions.iter().map(|i| FormulaId(i as u32))
    }

    pub fn removals(&self) -> impl Iterator<Item = FormulaId> + '_ {
        self.removals.iter().map(|i| FormulaId(i as u32))
    }

    /// The delta of doing `self` and then `next`.
    /// Composition is associative, so deltas along a path can be folded in any grouping.
    pub fn apply(&self, next: &Delta) -> Delta {
        Delta {
            additions: self
                .additions
                .difference(&next.removals)
                .union(&next.additions),
            removals: self
                .removals
                .difference(&next.additions)
                .union(&next.removals),
        }
    }

    /// Applies this delta to a set of active truths.
    pub fn apply_to(&self, active: &BitSet) -> BitSet {
        active.difference(&self.removals).union(&self.additions)
    }
}

impl fmt::Debug for Delta {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "+{:?} -{:?}", self.additions, self.removals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delta(additions: &[u32], removals: &[u32]) -> Delta {
        let mut d = Delta::new();
        for &r in removals {
            d.remove(FormulaId(r));
        }
        for &a in additions {
            d.add(FormulaId(a));
        }
        d
    }

    #[test]
    fn test_later_changes_win() {
        let first = delta(&[1, 2], &[3]);
        let second = delta(&[3], &[1]);
        let both = first.apply(&second);
        assert_eq!(both, delta(&[2, 3], &[1]));
    }

    #[test]
    fn test_composition_is_associative() {
        let a = delta(&[1, 2], &[5]);
        let b = delta(&[5, 6], &[2, 7]);
        let c = delta(&[7, 2], &[6, 1]);
        assert_eq!(a.apply(&b).apply(&c), a.apply(&b.apply(&c)));
        let active = BitSet::from_slice(&[1, 5, 7, 9]);
        assert_eq!(
            a.apply(&b).apply(&c).apply_to(&active),
            c.apply_to(&b.apply_to(&a.apply_to(&active)))
        );
    }
}
