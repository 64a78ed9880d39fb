use crate::error::Error;
use crate::formula::Formula;
use crate::kernel::heap::FormulaId;
use crate::proof::state::StateId;
use crate::proof::Proof;
use crate::rules::NonLinearRule;

/// Case splits on a disjunction, one child per arm.
pub struct OrElimination;

impl NonLinearRule for OrElimination {
    fn name(&self) -> &'static str {
        "OrElimination"
    }

    fn apply(
        &self,
        proof: &mut Proof,
        truth: FormulaId,
        head: StateId,
    ) -> Result<Option<Vec<StateId>>, Error> {
        if !matches!(proof.formula(truth), Formula::Disjunct(_)) {
            return Ok(None);
        }
        Ok(Some(proof.split(head, self.name(), truth)))
    }
}
