use num_bigint::BigInt;
use num_traits::Signed;

use crate::error::Error;
use crate::formula::Formula;
use crate::kernel::heap::FormulaId;
use crate::polynomial::Polynomial;
use crate::proof::state::StateId;
use crate::proof::Proof;
use crate::rules::ClosureRule;

/// Combines bounds.
///
/// Two bounds `p >= 0` and `q >= 0` that mention the same greatest atom with opposite signs
/// yield a bound without it. Opposite bounds on the same difference yield an equality.
pub struct InequalityIntroduction;

// Each bound reads `p >= 0`.
fn bounds(f: &Formula) -> Vec<Polynomial> {
    match f {
        Formula::Inequality { lhs, rhs } => vec![lhs.subtract(rhs)],
        Formula::ArithmeticEquality {
            sign: true,
            lhs,
            rhs,
        } => vec![lhs.subtract(rhs), rhs.subtract(lhs)],
        _ => vec![],
    }
}

/// Eliminates the greatest linear atom shared by two bounds, if their coefficients on it
/// have opposite signs.
pub fn eliminate(p: &Polynomial, q: &Polynomial) -> Option<Polynomial> {
    let (a, c) = p.max_linear()?;
    let (b, d) = q.max_linear()?;
    if a != b || c.signum() == d.signum() {
        return None;
    }
    let c: BigInt = c.abs();
    let d: BigInt = d.abs();
    Some(p.scale(&d).add(&q.scale(&c)))
}

impl ClosureRule for InequalityIntroduction {
    fn name(&self) -> &'static str {
        "InequalityIntroduction"
    }

    fn apply(
        &self,
        proof: &mut Proof,
        truth: FormulaId,
        existing: &[FormulaId],
        head: StateId,
    ) -> Result<StateId, Error> {
        let formula = proof.formula(truth).clone();
        let new_bounds = bounds(&formula);
        if new_bounds.is_empty() {
            return Ok(head);
        }
        let mut head = head;
        for other in existing {
            if !proof.is_active(head, *other) {
                continue;
            }
            let other_formula = proof.formula(*other).clone();
            let old_bounds = bounds(&other_formula);
            let both_inequalities = matches!(formula, Formula::Inequality { .. })
                && matches!(other_formula, Formula::Inequality { .. });
            for p in &new_bounds {
                for q in &old_bounds {
                    if both_inequalities && *p == q.negate() {
                        let equality = Formula::arithmetic_equality(true, p.clone(), Polynomial::zero());
                        head = proof.infer(head, self.name(), equality, &[truth, *other]);
                    }
                    if let Some(combined) = eliminate(p, q) {
                        let bound = Formula::inequality(combined, Polynomial::zero());
                        head = proof.infer(head, self.name(), bound, &[truth, *other]);
                    }
                    if proof.is_closed(head) {
                        return Ok(head);
                    }
                }
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

    fn x() -> Expr {
        Expr::var("x$1")
    }

    fn y() -> Expr {
        Expr::var("y$1")
    }

    #[test]
    fn test_transitivity() {
        let types = types(Declarations::new());
        let mut proof = Proof::new(&types, environment());
        // x < y and y < 3 give x < 2.
        let (head, ids) = assume(&mut proof, &[Expr::lt(x(), y()), Expr::lt(y(), Expr::int(3))]);
        let next = InequalityIntroduction.apply(&mut proof, ids[1], &[ids[0]], head).unwrap();
        assert!(truths(&proof, next).contains(&"1 >= x$1".to_string()));
    }

    #[test]
    fn test_contradictory_bounds_close() {
        let types = types(Declarations::new());
        let mut proof = Proof::new(&types, environment());
        let (head, ids) = assume(
            &mut proof,
            &[Expr::ge(x(), Expr::int(5)), Expr::lt(x(), Expr::int(0))],
        );
        let next = InequalityIntroduction.apply(&mut proof, ids[1], &[ids[0]], head).unwrap();
        assert!(proof.is_closed(next));
    }

    #[test]
    fn test_antisymmetry_gives_equality() {
        let types = types(Declarations::new());
        let mut proof = Proof::new(&types, environment());
        let (head, ids) = assume(&mut proof, &[Expr::ge(x(), y()), Expr::le(x(), y())]);
        let next = InequalityIntroduction.apply(&mut proof, ids[1], &[ids[0]], head).unwrap();
        assert!(truths(&proof, next).contains(&"x$1 == y$1".to_string()));
    }

    #[test]
    fn test_same_sign_does_not_combine() {
        let p = Polynomial::from_expr(&Expr::sub(x(), Expr::int(1)));
        let q = Polynomial::from_expr(&Expr::add(x(), y()));
        assert_eq!(eliminate(&p, &q), None);
        let r = Polynomial::from_expr(&Expr::sub(Expr::int(4), Expr::mul(Expr::int(2), x())));
        let combined = eliminate(&p, &r).unwrap();
        assert_eq!(combined, Polynomial::int(2));
    }
}
