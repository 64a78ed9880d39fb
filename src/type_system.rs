use crate::error::Error;
use crate::kernel::declaration::Declarations;
use crate::kernel::expr::{Expr, Value, VariableDecl};
use crate::kernel::name::Name;
use crate::kernel::types::{FieldDecl, RecordType, Type};
use crate::subtyping::{SubtypeOperator, Ternary};

/// The declared type of each variable in scope.
/// States share environments structurally, so refining one variable is cheap.
pub type TypeEnvironment = im::HashMap<Name, Type>;

/// Answers type questions about expressions on behalf of the prover.
pub struct TypeSystem {
    declarations: Declarations,
}

impl TypeSystem {
    pub fn new(declarations: Declarations) -> TypeSystem {
        TypeSystem { declarations }
    }

    pub fn declarations(&self) -> &Declarations {
        &self.declarations
    }

    /// Whether every value of `child` is a value of `parent`, ignoring invariants where
    /// that matters.
    pub fn is_raw_subtype(&self, parent: &Type, child: &Type) -> Result<Ternary, Error> {
        SubtypeOperator::new(&self.declarations).is_subtype(parent, child)
    }

    pub fn is_void(&self, t: &Type) -> Result<bool, Error> {
        SubtypeOperator::new(&self.declarations).is_void(t)
    }

    pub fn is_void_intersection(&self, a: &Type, b: &Type) -> Result<bool, Error> {
        SubtypeOperator::new(&self.declarations).is_void_intersection(a, b)
    }

    pub fn is_int(&self, t: &Type) -> Result<bool, Error> {
        Ok(self.is_raw_subtype(&Type::Int, t)? == Ternary::True)
    }

    pub fn is_bool(&self, t: &Type) -> Result<bool, Error> {
        Ok(self.is_raw_subtype(&Type::Bool, t)? == Ternary::True)
    }

    /// The type of values in both `a` and `b`, keeping the narrower one when they nest.
    pub fn intersect(&self, a: &Type, b: &Type) -> Result<Type, Error> {
        if self.is_raw_subtype(b, a)? == Ternary::True {
            return Ok(a.clone());
        }
        if self.is_raw_subtype(a, b)? == Ternary::True {
            return Ok(b.clone());
        }
        Ok(Type::intersection(vec![a.clone(), b.clone()]))
    }

    pub fn infer_type(&self, env: &TypeEnvironment, e: &Expr) -> Result<Type, Error> {
        match e {
            Expr::Constant(Value::Null) => Ok(Type::Null),
            Expr::Constant(Value::Bool(_)) => Ok(Type::Bool),
            Expr::Constant(Value::Int(_)) => Ok(Type::Int),
            Expr::Variable(name) => match env.get(name) {
                Some(t) => Ok(t.clone()),
                None => Err(Error::UnboundVariable(name.clone())),
            },
            Expr::Invoke { name, selector, .. } => {
                self.declarations.return_type(name, *selector)
            }
            Expr::Negate(_)
            | Expr::Add(_)
            | Expr::Subtract(..)
            | Expr::Multiply(_)
            | Expr::Divide(..)
            | Expr::Remainder(..)
            | Expr::ArrayLength(_) => Ok(Type::Int),
            Expr::ArrayInitialiser(es) => {
                let mut elements = vec![];
                for e in es {
                    elements.push(self.infer_type(env, e)?);
                }
                Ok(Type::array(Type::union(elements)))
            }
            Expr::ArrayGenerator { value, .. } => Ok(Type::array(self.infer_type(env, value)?)),
            Expr::ArrayAccess(array, _) => {
                let t = self.infer_type(env, array)?;
                match self.extract_readable_array(&t)? {
                    Some(element) => Ok(element),
                    None => Err(Error::ill_typed(format!("{} is not an array", array))),
                }
            }
            Expr::ArrayUpdate { array, .. } => self.infer_type(env, array),
            Expr::RecordInitialiser(fields) => {
                let mut decls = vec![];
                for (name, e) in fields {
                    decls.push(FieldDecl {
                        name: name.clone(),
                        field_type: self.infer_type(env, e)?,
                    });
                }
                Ok(Type::record_from(decls, false))
            }
            Expr::RecordAccess(record, field) => {
                let t = self.infer_type(env, record)?;
                let found = self
                    .extract_readable_record(&t)?
                    .and_then(|r| r.field(field).cloned());
                match found {
                    Some(t) => Ok(t),
                    None => Err(Error::ill_typed(format!("{} has no field {}", record, field))),
                }
            }
            Expr::RecordUpdate { record, .. } => self.infer_type(env, record),
            _ => Ok(Type::Bool),
        }
    }

    /// The element type of any array this type admits, if every value of the type is an array.
    pub fn extract_readable_array(&self, t: &Type) -> Result<Option<Type>, Error> {
        self.readable_array(t, &mut vec![])
    }

    fn readable_array(&self, t: &Type, visited: &mut Vec<Name>) -> Result<Option<Type>, Error> {
        match t {
            Type::Array(element) => Ok(Some(*element.clone())),
            Type::Nominal(name) => {
                if visited.contains(name) {
                    return Ok(None);
                }
                let decl = self.declarations.resolve_type(name)?;
                visited.push(name.clone());
                let answer = self.readable_array(&decl.var.var_type, visited);
                visited.pop();
                answer
            }
            Type::Union(types) => {
                let mut elements = vec![];
                for t in types {
                    match self.readable_array(t, visited)? {
                        Some(element) => elements.push(element),
                        None => return Ok(None),
                    }
                }
                Ok(Some(Type::union(elements)))
            }
            Type::Intersection(types) => {
                let mut elements = vec![];
                for t in types {
                    if let Some(element) = self.readable_array(t, visited)? {
                        elements.push(element);
                    }
                }
                if elements.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(Type::intersection(elements)))
                }
            }
            _ => Ok(None),
        }
    }

    /// The fields readable from every record this type admits.
    /// For a union, that's the fields every alternative shares.
    pub fn extract_readable_record(&self, t: &Type) -> Result<Option<RecordType>, Error> {
        self.readable_record(t, &mut vec![])
    }

    fn readable_record(
        &self,
        t: &Type,
        visited: &mut Vec<Name>,
    ) -> Result<Option<RecordType>, Error> {
        match t {
            Type::Record(record) => Ok(Some(record.clone())),
            Type::Nominal(name) => {
                if visited.contains(name) {
                    return Ok(None);
                }
                let decl = self.declarations.resolve_type(name)?;
                visited.push(name.clone());
                let answer = self.readable_record(&decl.var.var_type, visited);
                visited.pop();
                answer
            }
            Type::Union(types) => {
                let mut records = vec![];
                for t in types {
                    match self.readable_record(t, visited)? {
                        Some(r) => records.push(r),
                        None => return Ok(None),
                    }
                }
                let Some(first) = records.first() else {
                    return Ok(None);
                };
                let mut fields = vec![];
                for field in &first.fields {
                    let mut alternatives = vec![];
                    for r in &records {
                        if let Some(t) = r.field(&field.name) {
                            alternatives.push(t.clone());
                        }
                    }
                    if alternatives.len() == records.len() {
                        fields.push(FieldDecl {
                            name: field.name.clone(),
                            field_type: Type::union(alternatives),
                        });
                    }
                }
                let open = records
                    .iter()
                    .any(|r| r.open || r.fields.len() != fields.len());
                Ok(Some(RecordType { fields, open }))
            }
            Type::Intersection(types) => {
                let mut merged: Option<RecordType> = None;
                for t in types {
                    let Some(r) = self.readable_record(t, visited)? else {
                        continue;
                    };
                    merged = Some(match merged {
                        None => r,
                        Some(m) => merge_records(&m, &r),
                    });
                }
                Ok(merged)
            }
            _ => Ok(None),
        }
    }

    /// The condition a value `e` must satisfy to belong to type `t`, beyond its raw shape.
    /// Reaches through records and arrays; None if the type carries no invariant.
    pub fn extract_invariant(&self, t: &Type, e: &Expr) -> Result<Option<Expr>, Error> {
        self.invariant(t, e, 0, &mut vec![])
    }

    fn invariant(
        &self,
        t: &Type,
        e: &Expr,
        depth: usize,
        visited: &mut Vec<Name>,
    ) -> Result<Option<Expr>, Error> {
        let mut clauses = vec![];
        match t {
            Type::Nominal(name) => {
                if visited.contains(name) {
                    return Ok(None);
                }
                let decl = self.declarations.resolve_type(name)?;
                visited.push(name.clone());
                let inner = self.invariant(&decl.var.var_type, e, depth, visited);
                visited.pop();
                if let Some(inner) = inner? {
                    clauses.push(inner);
                }
                let subst = [(Expr::Variable(decl.var.name.clone()), e.clone())];
                for clause in &decl.invariant {
                    clauses.push(clause.substitute(&subst));
                }
            }
            Type::Record(record) => {
                for field in &record.fields {
                    let access = Expr::RecordAccess(Box::new(e.clone()), field.name.clone());
                    if let Some(inner) = self.invariant(&field.field_type, &access, depth, visited)? {
                        clauses.push(inner);
                    }
                }
            }
            Type::Array(element) => {
                // The index name carries a '$' so it cannot clash with a user binder.
                let index = Name::new(&format!("i{}", depth)).fresh(0);
                let i = Expr::Variable(index.clone());
                let access = Expr::access(e.clone(), i.clone());
                if let Some(inner) = self.invariant(element, &access, depth + 1, visited)? {
                    let in_bounds = Expr::and(vec![
                        Expr::le(Expr::int(0), i.clone()),
                        Expr::lt(i, Expr::length(e.clone())),
                    ]);
                    clauses.push(Expr::forall(
                        vec![VariableDecl {
                            var_type: Type::Int,
                            name: index,
                        }],
                        Expr::implies(in_bounds, inner),
                    ));
                }
            }
            _ => {}
        }
        Ok(match clauses.len() {
            0 => None,
            1 => clauses.pop(),
            _ => Some(Expr::And(clauses)),
        })
    }
}

fn merge_records(a: &RecordType, b: &RecordType) -> RecordType {
    let mut fields: Vec<FieldDecl> = a.fields.clone();
    for field in &b.fields {
        match fields.iter_mut().find(|f| f.name == field.name) {
            Some(existing) => {
                existing.field_type = Type::intersection(vec![
                    existing.field_type.clone(),
                    field.field_type.clone(),
                ]);
            }
            None => fields.push(field.clone()),
        }
    }
    fields.sort();
    RecordType {
        fields,
        open: a.open && b.open,
    }
}
