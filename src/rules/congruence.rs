use num_traits::One;

use crate::error::Error;
use crate::formula::Formula;
use crate::kernel::expr::Expr;
use crate::kernel::heap::FormulaId;
use crate::polynomial::Polynomial;
use crate::proof::state::StateId;
use crate::proof::Proof;
use crate::rules::ClosureRule;
use crate::simplification::simplify;
use crate::subtyping::Ternary;

/// Rewrites with equalities.
///
/// Every positive equality is read as a rewrite from its greater side to its lesser side.
/// A new equality rewrites the truths already in force, and the equalities in force
/// rewrite a new truth.
pub struct CongruenceClosure;

impl ClosureRule for CongruenceClosure {
    fn name(&self) -> &'static str {
        "CongruenceClosure"
    }

    fn apply(
        &self,
        proof: &mut Proof,
        truth: FormulaId,
        existing: &[FormulaId],
        head: StateId,
    ) -> Result<StateId, Error> {
        let mut head = head;
        if let Some(pair) = rewrite(proof.formula(truth)) {
            head = self.refine(proof, truth, &pair, head)?;
            for other in existing {
                if !proof.is_active(head, *other) {
                    continue;
                }
                let before = proof.formula(*other).clone();
                let after = simplify(&before.substitute(&[pair.clone()]));
                if after != before {
                    head = proof.subsume(head, self.name(), *other, after, &[truth, *other]);
                    if proof.is_closed(head) {
                        return Ok(head);
                    }
                }
            }
        }

        for other in existing {
            if !proof.is_active(head, truth) {
                break;
            }
            if !proof.is_active(head, *other) {
                continue;
            }
            let pair = match rewrite(proof.formula(*other)) {
                Some(pair) => pair,
                None => continue,
            };
            let before = proof.formula(truth).clone();
            let after = simplify(&before.substitute(&[pair]));
            if after != before {
                head = proof.subsume(head, self.name(), truth, after, &[*other, truth]);
            }
        }
        Ok(head)
    }
}

impl CongruenceClosure {
    // A variable equal to some term has at most the type of that term.
    fn refine(
        &self,
        proof: &mut Proof,
        truth: FormulaId,
        pair: &(Expr, Expr),
        head: StateId,
    ) -> Result<StateId, Error> {
        let (from, to) = pair;
        let (name, other) = match (from, to) {
            (Expr::Variable(name), other) | (other, Expr::Variable(name)) => (name, other),
            _ => return Ok(head),
        };
        let types = proof.types();
        let env = proof.environment(head);
        let current = match env.get(name) {
            Some(t) => t.clone(),
            None => return Ok(head),
        };
        let other_type = types.infer_type(env, other)?;
        if types.is_raw_subtype(&other_type, &current)? == Ternary::True {
            return Ok(head);
        }
        if types.is_void_intersection(&current, &other_type)? {
            return Ok(proof.infer(head, self.name(), Formula::Truth(false), &[truth]));
        }
        let narrowed = types.intersect(&current, &other_type)?;
        Ok(proof.refine(head, self.name(), name, narrowed, &[truth]))
    }
}

/// The rewrite a positive equality stands for, from the greater term to the lesser one.
///
/// An arithmetic equality is solved for its greatest atom with a unit coefficient. No
/// rewrite is returned if the term would have to be rewritten into something containing it.
pub fn rewrite(f: &Formula) -> Option<(Expr, Expr)> {
    match f {
        Formula::Equality {
            sign: true,
            lhs,
            rhs,
        } => {
            if lhs.contains(rhs) {
                None
            } else {
                Some((rhs.clone(), lhs.clone()))
            }
        }
        Formula::ArithmeticEquality {
            sign: true,
            lhs,
            rhs,
        } => {
            let difference = lhs.subtract(rhs);
            let mut candidates: Vec<(&Expr, bool)> = difference
                .terms()
                .iter()
                .filter_map(|t| {
                    let atom = t.as_linear()?;
                    let c = t.coefficient();
                    let positive = c.is_one();
                    if positive || (-c).is_one() {
                        Some((atom, positive))
                    } else {
                        None
                    }
                })
                .collect();
            candidates.sort_by(|a, b| b.0.cmp(a.0));
            for (atom, positive) in candidates {
                // difference = c*atom + rest, so atom = -rest/c.
                let unit = Polynomial::atom(atom.clone());
                let rest = if positive {
                    difference.subtract(&unit)
                } else {
                    difference.add(&unit)
                };
                let value = if positive { rest.negate() } else { rest };
                if value.atoms().any(|a| a.contains(atom)) {
                    continue;
                }
                return Some((atom.clone(), value.to_expr()));
            }
            None
        }
        _ => None,
    }
}
