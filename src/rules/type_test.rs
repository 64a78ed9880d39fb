use crate::error::Error;
use crate::formula::{equality, Formula};
use crate::kernel::expr::Expr;
use crate::kernel::heap::FormulaId;
use crate::kernel::name::Name;
use crate::proof::state::StateId;
use crate::proof::Proof;
use crate::rules::{lower, ClosureRule, LinearRule};
use crate::subtyping::Ternary;
use crate::type_system::{TypeEnvironment, TypeSystem};

/// Decides type tests where the current types allow it, and otherwise narrows the tracked
/// type of the tested variable.
pub struct TypeTestClosure;

impl ClosureRule for TypeTestClosure {
    fn name(&self) -> &'static str {
        "TypeTestClosure"
    }

    fn apply(
        &self,
        proof: &mut Proof,
        truth: FormulaId,
        existing: &[FormulaId],
        head: StateId,
    ) -> Result<StateId, Error> {
        let (expr, test) = match proof.formula(truth) {
            Formula::Is { expr, test } => (expr.clone(), test.clone()),
            _ => return Ok(head),
        };
        let types = proof.types();
        let current = types.infer_type(proof.environment(head), &expr)?;
        if types.is_raw_subtype(&test, &current)? == Ternary::True {
            return Ok(proof.subsume(head, self.name(), truth, Formula::Truth(true), &[truth]));
        }
        if types.is_void_intersection(&current, &test)? {
            return Ok(proof.infer(head, self.name(), Formula::Truth(false), &[truth]));
        }

        let name = match &expr {
            Expr::Variable(name) => name.clone(),
            _ => {
                // Combine with other tests on the same term.
                for other in existing {
                    let combined = match proof.formula(*other) {
                        Formula::Is { expr: e, test: t } if *e == expr => types.intersect(&test, t)?,
                        _ => continue,
                    };
                    let replacement = if types.is_void(&combined)? {
                        Formula::Truth(false)
                    } else {
                        Formula::is(expr.clone(), combined)
                    };
                    return Ok(proof.subsume_all(
                        head,
                        self.name(),
                        &[truth, *other],
                        vec![replacement],
                        &[truth, *other],
                    ));
                }
                return Ok(head);
            }
        };

        let narrowed = types.intersect(&current, &test)?;
        let mut head = proof.refine(head, self.name(), &name, narrowed, &[truth]);
        for other in existing {
            if !proof.is_active(head, *other) || !proof.formula(*other).mentions(&name) {
                continue;
            }
            let before = proof.formula(*other).clone();
            let after = retype(types, proof.environment(head), &name, &before)?;
            if after != before {
                head = proof.subsume(head, self.name(), *other, after, &[truth, *other]);
            }
        }
        Ok(head)
    }
}

// Rebuilds the atoms that mention a variable whose type just changed.
// An equality can become arithmetic, and a type test can become decidable.
fn retype(
    types: &TypeSystem,
    env: &TypeEnvironment,
    name: &Name,
    f: &Formula,
) -> Result<Formula, Error> {
    Ok(match f {
        Formula::Conjunct(fs) => {
            let mut parts = vec![];
            for x in fs {
                parts.push(retype(types, env, name, x)?);
            }
            Formula::and(parts)
        }
        Formula::Disjunct(fs) => {
            let mut parts = vec![];
            for x in fs {
                parts.push(retype(types, env, name, x)?);
            }
            Formula::or(parts)
        }
        Formula::Equality { sign, lhs, rhs } if f.mentions(name) => {
            equality(types, env, *sign, lhs, rhs)?
        }
        Formula::Is { expr, test } if expr.mentions(name) => {
            let actual = types.infer_type(env, expr)?;
            if types.is_raw_subtype(test, &actual)? == Ternary::True {
                Formula::Truth(true)
            } else if types.is_void_intersection(&actual, test)? {
                Formula::Truth(false)
            } else {
                f.clone()
            }
        }
        _ => f.clone(),
    })
}

/// Asserts the invariant a type test implies.
pub struct TypeInvariantExpansion;

impl LinearRule for TypeInvariantExpansion {
    fn name(&self) -> &'static str {
        "TypeInvariantExpansion"
    }

    fn apply(&self, proof: &mut Proof, truth: FormulaId, head: StateId) -> Result<StateId, Error> {
        let (expr, test) = match proof.formula(truth) {
            Formula::Is { expr, test } => (expr.clone(), test.clone()),
            _ => return Ok(head),
        };
        let invariant = match proof.types().extract_invariant(&test, &expr)? {
            Some(invariant) => lower(proof, head, &invariant)?,
            None => return Ok(head),
        };
        Ok(proof.infer(head, self.name(), invariant, &[truth]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::declaration::{Declaration, Declarations, TypeDecl};
    use crate::kernel::expr::VariableDecl;
    use crate::kernel::types::Type;
    use crate::rules::testing::{assume, truths, types};

    fn nat() -> Declaration {
        Declaration::Type(TypeDecl {
            name: Name::new("nat"),
            var: VariableDecl::new("n", Type::Int),
            invariant: vec![Expr::ge(Expr::var("n"), Expr::int(0))],
        })
    }

    fn int_or_null() -> TypeEnvironment {
        let mut env = TypeEnvironment::new();
        env.insert(Name::new("x$1"), Type::union(vec![Type::Int, Type::Null]));
        env.insert(Name::new("y$1"), Type::Int);
        env
    }

    #[test]
    fn test_narrowing_turns_equalities_arithmetic() {
        let types = types(Declarations::new());
        let mut proof = Proof::new(&types, int_or_null());
        let x = Expr::var("x$1");
        let (head, ids) = assume(
            &mut proof,
            &[Expr::eq(x.clone(), Expr::var("y$1")), Expr::is(x, Type::Int)],
        );
        assert_eq!(format!("{}", proof.formula(ids[0])), "x$1 == y$1");
        let existing = vec![ids[0]];
        let next = TypeTestClosure.apply(&mut proof, ids[1], &existing, head).unwrap();
        assert_eq!(
            proof.environment(next).get(&Name::new("x$1")),
            Some(&Type::Int)
        );
        let arithmetic = Formula::arithmetic_equality(
            true,
            crate::polynomial::Polynomial::atom(Expr::var("x$1")),
            crate::polynomial::Polynomial::atom(Expr::var("y$1")),
        );
        let id = proof.heap().lookup(&arithmetic).unwrap();
        assert!(proof.is_active(next, id));
        assert!(!proof.is_active(next, ids[0]));
    }

    #[test]
    fn test_disjoint_test_closes_and_implied_test_vanishes() {
        let types = types(Declarations::new());
        let mut proof = Proof::new(&types, int_or_null());
        let (head, ids) = assume(
            &mut proof,
            &[
                Expr::is(Expr::var("y$1"), Type::Bool),
                Expr::is(Expr::var("y$1"), Type::union(vec![Type::Int, Type::Null])),
            ],
        );
        let closed = TypeTestClosure.apply(&mut proof, ids[0], &[], head).unwrap();
        assert!(proof.is_closed(closed));
        let next = TypeTestClosure.apply(&mut proof, ids[1], &[], head).unwrap();
        assert!(!proof.is_active(next, ids[1]));
    }

    #[test]
    fn test_invariant_of_a_tested_type() {
        let types = types(Declarations::from_vec(vec![nat()]));
        let mut proof = Proof::new(&types, int_or_null());
        let (head, ids) = assume(&mut proof, &[Expr::is(Expr::var("y$1"), Type::nominal("nat"))]);
        let next = TypeInvariantExpansion.apply(&mut proof, ids[0], head).unwrap();
        let found = truths(&proof, next);
        assert!(found.contains(&"y$1 >= 0".to_string()));
    }
}
