use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{DeclarationKind, Error};
use crate::kernel::expr::{Expr, VariableDecl};
use crate::kernel::name::Name;
use crate::kernel::types::Type;

/// `type name is (T var) where invariant...`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDecl {
    pub name: Name,
    pub var: VariableDecl,

    // Boolean clauses over `var`. An empty list means the type has no invariant.
    #[serde(default)]
    pub invariant: Vec<Expr>,
}

impl TypeDecl {
    pub fn has_invariant(&self) -> bool {
        !self.invariant.is_empty()
    }
}

/// An uninterpreted function with a contract.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionDecl {
    pub name: Name,
    pub params: Vec<VariableDecl>,
    pub returns: Vec<VariableDecl>,

    // Clauses over the parameters.
    #[serde(default)]
    pub requires: Vec<Expr>,

    // Clauses over the parameters and the returns.
    #[serde(default)]
    pub ensures: Vec<Expr>,
}

/// A named boolean property, expanded in place wherever it is invoked.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacroDecl {
    pub name: Name,
    pub params: Vec<VariableDecl>,
    pub body: Expr,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Declaration {
    Type(TypeDecl),
    Function(FunctionDecl),
    Macro(MacroDecl),
}

impl Declaration {
    pub fn name(&self) -> &Name {
        match self {
            Declaration::Type(d) => &d.name,
            Declaration::Function(d) => &d.name,
            Declaration::Macro(d) => &d.name,
        }
    }

    fn matches(&self, kind: DeclarationKind) -> bool {
        match (self, kind) {
            (Declaration::Type(_), DeclarationKind::Type) => true,
            (Declaration::Function(_), DeclarationKind::Function) => true,
            (Declaration::Macro(_), DeclarationKind::Macro) => true,
            (Declaration::Function(_), DeclarationKind::Callable) => true,
            (Declaration::Macro(_), DeclarationKind::Callable) => true,
            _ => false,
        }
    }
}

/// The declarations visible to a proof, indexed by name.
/// Names are unique; a later declaration with the same name replaces the earlier one.
#[derive(Clone, Debug, Default)]
pub struct Declarations {
    by_name: BTreeMap<Name, Declaration>,
}

impl Declarations {
    pub fn new() -> Declarations {
        Declarations::default()
    }

    pub fn from_vec(declarations: Vec<Declaration>) -> Declarations {
        let mut answer = Declarations::new();
        for d in declarations {
            answer.add(d);
        }
        answer
    }

    pub fn add(&mut self, declaration: Declaration) {
        self.by_name.insert(declaration.name().clone(), declaration);
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Finds the declaration with this name, failing unless it has the given kind.
    pub fn resolve_exactly(&self, name: &Name, kind: DeclarationKind) -> Result<&Declaration, Error> {
        match self.by_name.get(name) {
            Some(d) if d.matches(kind) => Ok(d),
            _ => Err(Error::resolution(name, kind)),
        }
    }

    pub fn resolve_type(&self, name: &Name) -> Result<&TypeDecl, Error> {
        match self.resolve_exactly(name, DeclarationKind::Type)? {
            Declaration::Type(d) => Ok(d),
            _ => Err(Error::resolution(name, DeclarationKind::Type)),
        }
    }

    pub fn resolve_function(&self, name: &Name) -> Result<&FunctionDecl, Error> {
        match self.resolve_exactly(name, DeclarationKind::Function)? {
            Declaration::Function(d) => Ok(d),
            _ => Err(Error::resolution(name, DeclarationKind::Function)),
        }
    }

    pub fn resolve_macro(&self, name: &Name) -> Result<&MacroDecl, Error> {
        match self.resolve_exactly(name, DeclarationKind::Macro)? {
            Declaration::Macro(d) => Ok(d),
            _ => Err(Error::resolution(name, DeclarationKind::Macro)),
        }
    }

    /// Whether the name refers to a macro. Unknown names are not macros.
    pub fn is_macro(&self, name: &Name) -> bool {
        matches!(self.by_name.get(name), Some(Declaration::Macro(_)))
    }

    /// The type of the selected return of a function.
    pub fn return_type(&self, name: &Name, selector: usize) -> Result<Type, Error> {
        let decl = self.resolve_exactly(name, DeclarationKind::Callable)?;
        match decl {
            Declaration::Function(f) => match f.returns.get(selector) {
                Some(r) => Ok(r.var_type.clone()),
                None => Err(Error::ill_typed(format!(
                    "{} has no return value #{}",
                    name, selector
                ))),
            },
            Declaration::Macro(_) => Ok(Type::Bool),
            Declaration::Type(_) => Err(Error::resolution(name, DeclarationKind::Callable)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nat() -> Declaration {
        Declaration::Type(TypeDecl {
            name: Name::new("nat"),
            var: VariableDecl::new("x", Type::Int),
            invariant: vec![Expr::ge(Expr::var("x"), Expr::int(0))],
        })
    }

    #[test]
    fn test_resolve_exactly_checks_the_kind() {
        let decls = Declarations::from_vec(vec![nat()]);
        assert!(decls.resolve_type(&Name::new("nat")).is_ok());
        let err = decls
            .resolve_exactly(&Name::new("nat"), DeclarationKind::Function)
            .unwrap_err();
        assert_eq!(err.error_type(), "Resolution");
        assert!(decls.resolve_type(&Name::new("pos")).is_err());
    }

    #[test]
    fn test_declarations_read_from_json() {
        let json = r#"{"kind": "macro", "name": "positive",
            "params": [{"var_type": "Int", "name": "x"}],
            "body": {"GreaterThan": [{"Variable": "x"}, {"Constant": {"Int": 0}}]}}"#;
        let decl: Declaration = serde_json::from_str(json).unwrap();
        assert_eq!(decl.name().as_str(), "positive");
        let decls = Declarations::from_vec(vec![decl]);
        assert!(decls.is_macro(&Name::new("positive")));
        assert_eq!(
            decls.return_type(&Name::new("positive"), 0).unwrap(),
            Type::Bool
        );
    }
}
