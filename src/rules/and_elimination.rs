use crate::error::Error;
use crate::formula::Formula;
use crate::kernel::heap::FormulaId;
use crate::proof::state::StateId;
use crate::proof::Proof;
use crate::rules::LinearRule;

/// Replaces a conjunction by its conjuncts.
pub struct AndElimination;

impl LinearRule for AndElimination {
    fn name(&self) -> &'static str {
        "AndElimination"
    }

    fn apply(&self, proof: &mut Proof, truth: FormulaId, head: StateId) -> Result<StateId, Error> {
        let parts = match proof.formula(truth) {
            Formula::Conjunct(parts) => parts.clone(),
            _ => return Ok(head),
        };
        Ok(proof.subsume_all(head, self.name(), &[truth], parts, &[truth]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::declaration::Declarations;
    use crate::kernel::expr::Expr;
    use crate::rules::testing::{assume, environment, truths, types};

    #[test]
    fn test_conjuncts_replace_the_conjunction() {
        let types = types(Declarations::new());
        let mut proof = Proof::new(&types, environment());
        let e = Expr::and(vec![
            Expr::ge(Expr::var("x$1"), Expr::int(0)),
            Expr::var("b$1"),
        ]);
        let (head, ids) = assume(&mut proof, &[e]);
        let next = AndElimination.apply(&mut proof, ids[0], head).unwrap();
        assert_eq!(truths(&proof, next), vec!["true == b$1", "x$1 >= 0"]);
        assert!(!proof.is_active(next, ids[0]));
    }
}
