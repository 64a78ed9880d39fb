use crate::error::Error;
use crate::formula::{equality, Formula};
use crate::kernel::expr::{Expr, VariableDecl};
use crate::kernel::heap::FormulaId;
use crate::kernel::name::Name;
use crate::kernel::types::Type;
use crate::proof::state::StateId;
use crate::proof::Proof;
use crate::rules::{lower, LinearRule};

/// Breaks equalities between compound values into equalities between their parts.
///
/// Records compare field by field, arrays by length and elements, and booleans by cases.
/// An integer disequality becomes a pair of strict inequalities.
pub struct EqualityCaseAnalysis;

impl LinearRule for EqualityCaseAnalysis {
    fn name(&self) -> &'static str {
        "EqualityCaseAnalysis"
    }

    fn apply(&self, proof: &mut Proof, truth: FormulaId, head: StateId) -> Result<StateId, Error> {
        let replacement = match proof.formula(truth).clone() {
            Formula::ArithmeticEquality {
                sign: false,
                lhs,
                rhs,
            } => Some(Formula::or(vec![
                Formula::less_than(lhs.clone(), rhs.clone()),
                Formula::less_than(rhs, lhs),
            ])),
            Formula::Equality { sign, lhs, rhs } => {
                if lhs.is_constant() || rhs.is_constant() {
                    None
                } else {
                    expand(proof, head, sign, &lhs, &rhs)?
                }
            }
            _ => None,
        };
        match replacement {
            Some(f) => Ok(proof.subsume(head, self.name(), truth, f, &[truth])),
            None => Ok(head),
        }
    }
}

fn expand(
    proof: &Proof,
    head: StateId,
    sign: bool,
    lhs: &Expr,
    rhs: &Expr,
) -> Result<Option<Formula>, Error> {
    let types = proof.types();
    let env = proof.environment(head);
    let lt = types.infer_type(env, lhs)?;
    let rt = types.infer_type(env, rhs)?;

    if let (Some(a), Some(b)) = (
        types.extract_readable_record(&lt)?,
        types.extract_readable_record(&rt)?,
    ) {
        let names: Vec<&Name> = a.fields.iter().map(|f| &f.name).collect();
        let same_fields = !a.open
            && !b.open
            && names.len() == b.fields.len()
            && b.fields.iter().all(|f| names.contains(&&f.name));
        if !same_fields {
            return Ok(None);
        }
        let mut parts = vec![];
        for name in names {
            let l = Expr::RecordAccess(Box::new(lhs.clone()), name.clone());
            let r = Expr::RecordAccess(Box::new(rhs.clone()), name.clone());
            parts.push(equality(types, env, true, &l, &r)?);
        }
        let f = Formula::and(parts);
        return Ok(Some(if sign { f } else { f.negate() }));
    }

    if types.extract_readable_array(&lt)?.is_some() && types.extract_readable_array(&rt)?.is_some() {
        let expanded = match (lhs, rhs) {
            (Expr::ArrayInitialiser(es), other) | (other, Expr::ArrayInitialiser(es)) => {
                let mut parts = vec![Expr::eq(Expr::length(other.clone()), Expr::int(es.len() as i64))];
                for (k, e) in es.iter().enumerate() {
                    parts.push(Expr::eq(Expr::access(other.clone(), Expr::int(k as i64)), e.clone()));
                }
                Some(Expr::and(parts))
            }
            (Expr::ArrayGenerator { value, length }, other)
            | (other, Expr::ArrayGenerator { value, length }) => {
                let i = index_variable();
                let in_bounds = Expr::and(vec![
                    Expr::le(Expr::int(0), Expr::Variable(i.name.clone())),
                    Expr::lt(Expr::Variable(i.name.clone()), length.as_ref().clone()),
                ]);
                let element = Expr::eq(
                    Expr::access(other.clone(), Expr::Variable(i.name.clone())),
                    value.as_ref().clone(),
                );
                Some(Expr::and(vec![
                    Expr::eq(Expr::length(other.clone()), length.as_ref().clone()),
                    Expr::forall(vec![i], Expr::implies(in_bounds, element)),
                ]))
            }
            _ if !sign => {
                // Two arrays differ in length or at some index.
                let i = index_variable();
                let v = Expr::Variable(i.name.clone());
                let in_bounds = Expr::and(vec![
                    Expr::le(Expr::int(0), v.clone()),
                    Expr::lt(v.clone(), Expr::length(lhs.clone())),
                ]);
                let differs = Expr::ne(Expr::access(lhs.clone(), v.clone()), Expr::access(rhs.clone(), v));
                return Ok(Some(lower(
                    proof,
                    head,
                    &Expr::or(vec![
                        Expr::ne(Expr::length(lhs.clone()), Expr::length(rhs.clone())),
                        Expr::exists(vec![i], Expr::and(vec![in_bounds, differs])),
                    ]),
                )?));
            }
            _ => None,
        };
        return match expanded {
            Some(e) => {
                let f = lower(proof, head, &e)?;
                Ok(Some(if sign { f } else { f.negate() }))
            }
            None => Ok(None),
        };
    }

    if types.is_bool(&lt)? && types.is_bool(&rt)? {
        let a = Formula::equality(true, lhs.clone(), Expr::bool(true));
        let b = Formula::equality(true, rhs.clone(), Expr::bool(true));
        let same = Formula::or(vec![
            Formula::and(vec![a.clone(), b.clone()]),
            Formula::and(vec![a.negate(), b.negate()]),
        ]);
        return Ok(Some(if sign { same } else { same.negate() }));
    }

    Ok(None)
}

// The binder for element-wise comparisons. The '$' keeps it apart from user names.
fn index_variable() -> VariableDecl {
    VariableDecl {
        var_type: Type::Int,
        name: Name::new("i").fresh(0),
    }
}
