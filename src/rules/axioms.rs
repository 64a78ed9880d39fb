use crate::error::Error;
use crate::formula::Formula;
use crate::kernel::expr::Expr;
use crate::kernel::heap::FormulaId;
use crate::polynomial::Polynomial;
use crate::proof::state::StateId;
use crate::proof::Proof;
use crate::rules::{lower, LinearRule};

// The atoms standing as linear terms on either side of an inequality. Atoms nested in
// products, and those of equalities, do not count.
fn inequality_operands(f: &Formula) -> Vec<Expr> {
    let mut answer = vec![];
    if let Formula::Inequality { lhs, rhs } = f {
        for term in lhs.terms().iter().chain(rhs.terms()) {
            if let Some(atom) = term.as_linear() {
                if !answer.contains(atom) {
                    answer.push(atom.clone());
                }
            }
        }
    }
    answer
}

/// Every array length is non-negative.
pub struct ArrayLengthAxiom;

impl LinearRule for ArrayLengthAxiom {
    fn name(&self) -> &'static str {
        "ArrayLengthAxiom"
    }

    fn apply(&self, proof: &mut Proof, truth: FormulaId, head: StateId) -> Result<StateId, Error> {
        let mut head = head;
        for atom in inequality_operands(proof.formula(truth)) {
            if let Expr::ArrayLength(_) = atom {
                let axiom = Formula::inequality(Polynomial::atom(atom), Polynomial::zero());
                head = proof.infer(head, self.name(), axiom, &[truth]);
            }
        }
        Ok(head)
    }
}

/// An array access is within the bounds of the array.
pub struct ArrayIndexAxiom;

impl LinearRule for ArrayIndexAxiom {
    fn name(&self) -> &'static str {
        "ArrayIndexAxiom"
    }

    fn apply(&self, proof: &mut Proof, truth: FormulaId, head: StateId) -> Result<StateId, Error> {
        let mut head = head;
        for atom in inequality_operands(proof.formula(truth)) {
            if let Expr::ArrayAccess(array, index) = atom {
                let index = Polynomial::from_expr(&index);
                let length = Polynomial::atom(Expr::ArrayLength(array));
                let axiom = Formula::and(vec![
                    Formula::inequality(index.clone(), Polynomial::zero()),
                    Formula::less_than(index, length),
                ]);
                head = proof.infer(head, self.name(), axiom, &[truth]);
            }
        }
        Ok(head)
    }
}

/// Every ground function call satisfies the function's contract.
///
/// Both the preconditions and the postconditions are asserted, with the parameters
/// replaced by the arguments and the returns by the call itself.
pub struct FunctionCallAxiom {
    // Calls deeper than this are not expanded, since a postcondition can mention further calls.
    max_depth: usize,
}

impl FunctionCallAxiom {
    pub fn new(max_depth: usize) -> FunctionCallAxiom {
        FunctionCallAxiom { max_depth }
    }
}

impl LinearRule for FunctionCallAxiom {
    fn name(&self) -> &'static str {
        "FunctionCallAxiom"
    }

    fn apply(&self, proof: &mut Proof, truth: FormulaId, head: StateId) -> Result<StateId, Error> {
        let mut calls = vec![];
        let formula = proof.formula(truth);
        if let Formula::Invoke {
            name,
            selector,
            args,
            ..
        } = formula
        {
            calls.push((name.clone(), *selector, args.clone()));
        }
        formula.walk_ground(&mut |e| {
            if let Expr::Invoke {
                name,
                selector,
                args,
            } = e
            {
                let call = (name.clone(), *selector, args.clone());
                if e.depth() <= self.max_depth && !calls.contains(&call) {
                    calls.push(call);
                }
            }
        });

        let declarations = proof.types().declarations();
        let mut head = head;
        for (name, _, args) in calls {
            if declarations.is_macro(&name) {
                continue;
            }
            let decl = declarations.resolve_function(&name)?;
            if decl.params.len() != args.len() {
                return Err(Error::ill_typed(format!(
                    "{} expects {} arguments, got {}",
                    name,
                    decl.params.len(),
                    args.len()
                )));
            }
            let mut subst: Vec<(Expr, Expr)> = decl
                .params
                .iter()
                .map(|p| Expr::Variable(p.name.clone()))
                .zip(args.iter().cloned())
                .collect();
            for (k, r) in decl.returns.iter().enumerate() {
                let call = Expr::Invoke {
                    name: name.clone(),
                    selector: k,
                    args: args.clone(),
                };
                subst.push((Expr::Variable(r.name.clone()), call));
            }
            let mut clauses = vec![];
            for clause in decl.requires.iter().chain(decl.ensures.iter()) {
                clauses.push(lower(proof, head, &clause.substitute(&subst))?);
            }
            head = proof.infer(head, self.name(), Formula::and(clauses), &[truth]);
        }
        Ok(head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::declaration::{Declaration, Declarations, FunctionDecl};
    use crate::kernel::expr::VariableDecl;
    use crate::kernel::name::Name;
    use crate::kernel::types::Type;
    use crate::rules::testing::{assume, environment, truths, types};

    fn xs() -> Expr {
        Expr::var("xs$1")
    }

    #[test]
    fn test_length_and_index_bounds() {
        let types = types(Declarations::new());
        let mut proof = Proof::new(&types, environment());
        let access = Expr::access(xs(), Expr::add(Expr::var("x$1"), Expr::int(1)));
        let (head, ids) = assume(
            &mut proof,
            &[Expr::lt(Expr::length(xs()), access)],
        );
        let next = ArrayLengthAxiom.apply(&mut proof, ids[0], head).unwrap();
        assert!(truths(&proof, next).contains(&"|xs$1| >= 0".to_string()));
        let next = ArrayIndexAxiom.apply(&mut proof, ids[0], next).unwrap();
        assert!(truths(&proof, next)
            .contains(&"(|xs$1| >= 2 + x$1 && 1 + x$1 >= 0)".to_string()));
    }

    #[test]
    fn test_equalities_and_products_give_no_bounds() {
        let types = types(Declarations::new());
        let mut proof = Proof::new(&types, environment());
        let access = Expr::access(xs(), Expr::var("x$1"));
        let product = Expr::mul(Expr::length(xs()), Expr::var("y$1"));
        let (head, ids) = assume(
            &mut proof,
            &[Expr::eq(access, Expr::int(3)), Expr::ge(product, Expr::int(1))],
        );
        let before = truths(&proof, head);
        let mut next = head;
        for id in &ids {
            next = ArrayIndexAxiom.apply(&mut proof, *id, next).unwrap();
            next = ArrayLengthAxiom.apply(&mut proof, *id, next).unwrap();
        }
        assert_eq!(truths(&proof, next), before);
    }

    #[test]
    fn test_function_contract_is_asserted() {
        let inc = Declaration::Function(FunctionDecl {
            name: Name::new("inc"),
            params: vec![VariableDecl::new("v", Type::Int)],
            returns: vec![VariableDecl::new("r", Type::Int)],
            requires: vec![Expr::ge(Expr::var("v"), Expr::int(0))],
            ensures: vec![Expr::eq(Expr::var("r"), Expr::add(Expr::var("v"), Expr::int(1)))],
        });
        let types = types(Declarations::from_vec(vec![inc]));
        let mut proof = Proof::new(&types, environment());
        let call = Expr::invoke("inc", vec![Expr::var("x$1")]);
        let (head, ids) = assume(&mut proof, &[Expr::lt(call, Expr::int(0))]);
        let next = FunctionCallAxiom::new(6).apply(&mut proof, ids[0], head).unwrap();
        assert!(truths(&proof, next)
            .contains(&"(inc(x$1) == 1 + x$1 && x$1 >= 0)".to_string()));
    }

    #[test]
    fn test_unknown_function_is_a_resolution_error() {
        let types = types(Declarations::new());
        let mut proof = Proof::new(&types, environment());
        let call = Expr::invoke("missing", vec![]);
        let f = Formula::inequality(Polynomial::atom(call), Polynomial::zero());
        let head = proof.infer(proof.root(), "Assumption", f.clone(), &[]);
        let id = proof.heap().lookup(&f).unwrap();
        let err = FunctionCallAxiom::new(6).apply(&mut proof, id, head).unwrap_err();
        assert!(err.is_resolution());
    }
}
