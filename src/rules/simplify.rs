use crate::error::Error;
use crate::formula::Formula;
use crate::kernel::heap::FormulaId;
use crate::proof::state::StateId;
use crate::proof::Proof;
use crate::rules::LinearRule;
use crate::simplification::simplify;

/// Replaces a truth by its simplified form, and closes the branch when a truth meets its
/// own negation.
pub struct Simplification;

impl LinearRule for Simplification {
    fn name(&self) -> &'static str {
        "Simplification"
    }

    fn apply(&self, proof: &mut Proof, truth: FormulaId, head: StateId) -> Result<StateId, Error> {
        let formula = proof.formula(truth).clone();
        let simplified = simplify(&formula);
        if simplified != formula {
            return Ok(proof.subsume(head, self.name(), truth, simplified, &[truth]));
        }
        if let Some(negation) = proof.heap().lookup(&formula.negate()) {
            if proof.is_active(head, negation) {
                return Ok(proof.infer(
                    head,
                    self.name(),
                    Formula::Truth(false),
                    &[truth, negation],
                ));
            }
        }
        Ok(head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::declaration::Declarations;
    use crate::kernel::expr::Expr;
    use crate::rules::testing::{assume, environment, truths, types};

    #[test]
    fn test_folds_record_access() {
        let types = types(Declarations::new());
        let mut proof = Proof::new(&types, environment());
        let e = Expr::eq(Expr::field(Expr::record(vec![("f", Expr::var("x$1"))]), "f"), Expr::int(3));
        let (head, ids) = assume(&mut proof, &[e]);
        let next = Simplification.apply(&mut proof, ids[0], head).unwrap();
        assert_eq!(truths(&proof, next), vec!["3 == x$1"]);
    }

    #[test]
    fn test_complement_closes() {
        let types = types(Declarations::new());
        let mut proof = Proof::new(&types, environment());
        let b = Expr::var("b$1");
        let (head, ids) = assume(&mut proof, &[b.clone(), Expr::not(b)]);
        let next = Simplification.apply(&mut proof, ids[1], head).unwrap();
        assert!(proof.is_closed(next));
    }

    #[test]
    fn test_contradictory_bounds_close() {
        let types = types(Declarations::new());
        let mut proof = Proof::new(&types, environment());
        let x = Expr::var("x$1");
        let e = Expr::and(vec![
            Expr::gt(x.clone(), Expr::int(0)),
            Expr::lt(x, Expr::int(0)),
        ]);
        let (head, ids) = assume(&mut proof, &[e]);
        let next = Simplification.apply(&mut proof, ids[0], head).unwrap();
        assert!(proof.is_closed(next));
    }
}
