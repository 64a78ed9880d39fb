use num_traits::Zero;
use tracing::trace;

use crate::error::Error;
use crate::formula::{offset, Formula};
use crate::kernel::expr::{Expr, VariableDecl};
use crate::kernel::heap::FormulaId;
use crate::kernel::types::Type;
use crate::polynomial::Polynomial;
use crate::proof::state::StateId;
use crate::proof::Proof;
use crate::rules::{lower, ClosureRule, LinearRule};
use crate::simplification::{simplify, simplify_expr};
use crate::subtyping::Ternary;

/// Replaces an existential by its body over fresh skolem variables.
/// The skolems get the declared types of the parameters, along with their invariants.
pub struct ExistentialElimination;

impl LinearRule for ExistentialElimination {
    fn name(&self) -> &'static str {
        "ExistentialElimination"
    }

    fn apply(&self, proof: &mut Proof, truth: FormulaId, head: StateId) -> Result<StateId, Error> {
        let (params, body) = match proof.formula(truth) {
            Formula::Quantifier {
                universal: false,
                params,
                body,
            } => (params.clone(), body.as_ref().clone()),
            _ => return Ok(head),
        };
        let types = proof.types();
        for p in &params {
            if types.is_void(&p.var_type)? {
                trace!(param = %p, "no value to witness");
                return Ok(proof.infer(head, self.name(), Formula::Truth(false), &[truth]));
            }
        }
        let mut head = head;
        let mut subst = vec![];
        for p in &params {
            let skolem = proof.fresh_name(&p.name);
            head = proof.refine(head, self.name(), &skolem, p.var_type.clone(), &[truth]);
            subst.push((Expr::Variable(p.name.clone()), Expr::Variable(skolem)));
        }
        let mut facts = vec![body.substitute(&subst)];
        for (p, (_, skolem)) in params.iter().zip(subst.iter()) {
            if let Some(invariant) = types.extract_invariant(&p.var_type, skolem)? {
                facts.push(lower(proof, head, &invariant)?);
            }
        }
        Ok(proof.subsume(head, self.name(), truth, Formula::and(facts), &[truth]))
    }
}

/// Instantiates universal quantifiers with ground terms.
///
/// A quantified variable is only instantiated through array accesses: a body mentioning
/// `xs[i + c]` is matched against ground accesses `xs[e]`, and `i` becomes `e - c`. The
/// instance keeps any remaining quantified variables.
pub struct ExhaustiveQuantifierInstantiation {
    // Candidates deeper than this are not substituted.
    max_depth: usize,
}

impl ExhaustiveQuantifierInstantiation {
    pub fn new(max_depth: usize) -> ExhaustiveQuantifierInstantiation {
        ExhaustiveQuantifierInstantiation { max_depth }
    }

    fn instantiate(
        &self,
        proof: &mut Proof,
        quantifier: FormulaId,
        ground: FormulaId,
        head: StateId,
    ) -> Result<StateId, Error> {
        let (params, body) = match proof.formula(quantifier) {
            Formula::Quantifier {
                universal: true,
                params,
                body,
            } => (params.clone(), body.as_ref().clone()),
            _ => return Ok(head),
        };
        let mut accesses = vec![];
        proof.formula(ground).walk_ground(&mut |e| {
            if let Expr::ArrayAccess(array, index) = e {
                accesses.push((array.as_ref().clone(), index.as_ref().clone()));
            }
        });
        if accesses.is_empty() {
            return Ok(head);
        }

        let mut head = head;
        for (k, param) in params.iter().enumerate() {
            let var = Expr::Variable(param.name.clone());
            for trigger in triggers(&body, &params, param) {
                for value in self.candidates(&trigger, &var, &accesses) {
                    let remaining: Vec<VariableDecl> = params
                        .iter()
                        .enumerate()
                        .filter(|(j, _)| *j != k)
                        .map(|(_, p)| p.clone())
                        .collect();
                    let instance = body.substitute(&[(var.clone(), value.clone())]);
                    let guard = guard(proof, head, &param.var_type, &value)?;
                    let instance = Formula::or(vec![guard.negate(), instance]);
                    let instance = simplify(&Formula::quantifier(true, remaining, instance));
                    head = proof.infer(head, self.name(), instance, &[quantifier, ground]);
                    if proof.is_closed(head) {
                        return Ok(head);
                    }
                }
            }
        }
        Ok(head)
    }

    // The values for `var` that turn the trigger into one of the ground accesses.
    fn candidates(&self, trigger: &(Expr, Expr), var: &Expr, accesses: &[(Expr, Expr)]) -> Vec<Expr> {
        let (trigger_array, trigger_index) = trigger;
        let mut answer = vec![];
        for (array, index) in accesses {
            if array != trigger_array {
                continue;
            }
            let mut subterms = vec![];
            index.walk(&mut |e| subterms.push(e));
            for c in subterms {
                if c.depth() > self.max_depth {
                    trace!(candidate = %c, "too deep to instantiate");
                    continue;
                }
                let guess = trigger_index.substitute(&[(var.clone(), c.clone())]);
                let shift = match offset(&guess, index) {
                    Some(shift) => shift,
                    None => continue,
                };
                let value = simplify_expr(
                    &Polynomial::from_expr(c)
                        .subtract(&Polynomial::constant(shift))
                        .to_expr(),
                );
                let check = trigger_index.substitute(&[(var.clone(), value.clone())]);
                if offset(&check, index).map_or(false, |d| d.is_zero()) && !answer.contains(&value) {
                    answer.push(value);
                }
            }
        }
        answer
    }
}

// Array accesses in the body whose index mentions the parameter, over arrays that mention no
// quantified variable.
fn triggers(body: &Formula, params: &[VariableDecl], param: &VariableDecl) -> Vec<(Expr, Expr)> {
    let mut answer = vec![];
    body.walk(&mut |e| {
        if let Expr::ArrayAccess(array, index) = e {
            let ground_array = !params.iter().any(|p| array.mentions(&p.name));
            let pair = (array.as_ref().clone(), index.as_ref().clone());
            if ground_array && index.mentions(&param.name) && !answer.contains(&pair) {
                answer.push(pair);
            }
        }
    });
    answer
}

// What `value` must satisfy to stand in for a variable of type `t`.
fn guard(proof: &Proof, head: StateId, t: &Type, value: &Expr) -> Result<Formula, Error> {
    let types = proof.types();
    let actual = types.infer_type(proof.environment(head), value)?;
    let mut conditions = vec![];
    let same_shape = types.is_int(t)? && types.is_int(&actual)?;
    if !same_shape && types.is_raw_subtype(t, &actual)? != Ternary::True {
        conditions.push(Formula::is(value.clone(), t.clone()));
    }
    if let Some(invariant) = types.extract_invariant(t, value)? {
        conditions.push(lower(proof, head, &invariant)?);
    }
    Ok(Formula::and(conditions))
}

impl ClosureRule for ExhaustiveQuantifierInstantiation {
    fn name(&self) -> &'static str {
        "ExhaustiveQuantifierInstantiation"
    }

    fn apply(
        &self,
        proof: &mut Proof,
        truth: FormulaId,
        existing: &[FormulaId],
        head: StateId,
    ) -> Result<StateId, Error> {
        let universal = matches!(
            proof.formula(truth),
            Formula::Quantifier {
                universal: true,
                ..
            }
        );
        let mut head = head;
        for other in existing {
            if !proof.is_active(head, *other) {
                continue;
            }
            let other_universal = matches!(
                proof.formula(*other),
                Formula::Quantifier {
                    universal: true,
                    ..
                }
            );
            head = match (universal, other_universal) {
                (true, false) => self.instantiate(proof, truth, *other, head)?,
                (false, true) => self.instantiate(proof, *other, truth, head)?,
                _ => head,
            };
            if proof.is_closed(head) {
                break;
            }
        }
        Ok(head)
    }
}
