use crate::error::Error;
use crate::formula::Formula;
use crate::kernel::expr::Expr;
use crate::kernel::heap::FormulaId;
use crate::proof::state::StateId;
use crate::proof::Proof;
use crate::rules::{lower, LinearRule};

/// Replaces a macro call by the macro body over the call's arguments.
pub struct MacroExpansion;

impl LinearRule for MacroExpansion {
    fn name(&self) -> &'static str {
        "MacroExpansion"
    }

    fn apply(&self, proof: &mut Proof, truth: FormulaId, head: StateId) -> Result<StateId, Error> {
        let (sign, name, args) = match proof.formula(truth) {
            Formula::Invoke {
                sign, name, args, ..
            } => (*sign, name.clone(), args.clone()),
            _ => return Ok(head),
        };
        let declarations = proof.types().declarations();
        if !declarations.is_macro(&name) {
            return Ok(head);
        }
        let decl = declarations.resolve_macro(&name)?;
        if decl.params.len() != args.len() {
            return Err(Error::ill_typed(format!(
                "{} expects {} arguments, got {}",
                name,
                decl.params.len(),
                args.len()
            )));
        }
        let subst: Vec<(Expr, Expr)> = decl
            .params
            .iter()
            .map(|p| Expr::Variable(p.name.clone()))
            .zip(args)
            .collect();
        let body = lower(proof, head, &decl.body.substitute(&subst))?;
        let expansion = if sign { body } else { body.negate() };
        Ok(proof.subsume(head, self.name(), truth, expansion, &[truth]))
    }
}
