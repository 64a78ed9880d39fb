use num_bigint::BigInt;
use num_traits::ToPrimitive;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;

use crate::kernel::name::Name;
use crate::kernel::types::Type;

/// A constant value.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int(#[serde(with = "bigint_repr")] BigInt),
}

// Integers are written as plain JSON numbers when they fit in 64 bits, and as decimal
// strings otherwise.
mod bigint_repr {
    use super::*;

    #[derive(Serialize, Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Small(i64),
        Big(String),
    }

    pub fn serialize<S: Serializer>(i: &BigInt, serializer: S) -> Result<S::Ok, S::Error> {
        match i.to_i64() {
            Some(small) => Repr::Small(small).serialize(serializer),
            None => Repr::Big(i.to_string()).serialize(serializer),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BigInt, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Small(small) => Ok(BigInt::from(small)),
            Repr::Big(s) => s.parse().map_err(serde::de::Error::custom),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
        }
    }
}

/// A typed variable, as bound by a quantifier or declared as a parameter.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct VariableDecl {
    pub var_type: Type,
    pub name: Name,
}

impl VariableDecl {
    pub fn new(name: &str, var_type: Type) -> VariableDecl {
        VariableDecl {
            var_type,
            name: Name::new(name),
        }
    }
}

impl fmt::Display for VariableDecl {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {}", self.var_type, self.name)
    }
}

/// A simultaneous substitution. Every occurrence of a left-hand side is replaced by the
/// corresponding right-hand side; replacements are not themselves rewritten.
pub type Substitution = [(Expr, Expr)];

/// A surface expression.
///
/// The variant order is significant: the derived `Ord` is the total order used to orient
/// equalities, so constants sort before variables, and variables before compound terms.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum Expr {
    Constant(Value),
    Variable(Name),

    // A call to a function. The selector picks one of several return values.
    Invoke {
        name: Name,
        selector: usize,
        args: Vec<Expr>,
    },

    Negate(Box<Expr>),
    Add(Vec<Expr>),
    Subtract(Box<Expr>, Box<Expr>),
    Multiply(Vec<Expr>),
    Divide(Box<Expr>, Box<Expr>),
    Remainder(Box<Expr>, Box<Expr>),

    ArrayInitialiser(Vec<Expr>),

    // [value; length]
    ArrayGenerator {
        value: Box<Expr>,
        length: Box<Expr>,
    },
    ArrayAccess(Box<Expr>, Box<Expr>),
    ArrayLength(Box<Expr>),
    ArrayUpdate {
        array: Box<Expr>,
        index: Box<Expr>,
        value: Box<Expr>,
    },

    // Fields are kept sorted by name.
    RecordInitialiser(Vec<(Name, Expr)>),
    RecordAccess(Box<Expr>, Name),
    RecordUpdate {
        record: Box<Expr>,
        field: Name,
        value: Box<Expr>,
    },

    Not(Box<Expr>),
    And(Vec<Expr>),
    Or(Vec<Expr>),
    Implies(Box<Expr>, Box<Expr>),
    Iff(Box<Expr>, Box<Expr>),
    Equal(Box<Expr>, Box<Expr>),
    NotEqual(Box<Expr>, Box<Expr>),
    LessThan(Box<Expr>, Box<Expr>),
    LessThanOrEqual(Box<Expr>, Box<Expr>),
    GreaterThan(Box<Expr>, Box<Expr>),
    GreaterThanOrEqual(Box<Expr>, Box<Expr>),
    Is(Box<Expr>, Type),
    Forall(Vec<VariableDecl>, Box<Expr>),
    Exists(Vec<VariableDecl>, Box<Expr>),
}

impl Expr {
    pub fn int(i: i64) -> Expr {
        Expr::Constant(Value::Int(BigInt::from(i)))
    }

    pub fn bigint(i: BigInt) -> Expr {
        Expr::Constant(Value::Int(i))
    }

    pub fn bool(b: bool) -> Expr {
        Expr::Constant(Value::Bool(b))
    }

    pub fn null() -> Expr {
        Expr::Constant(Value::Null)
    }

    pub fn var(name: &str) -> Expr {
        Expr::Variable(Name::new(name))
    }

    pub fn invoke(name: &str, args: Vec<Expr>) -> Expr {
        Expr::Invoke {
            name: Name::new(name),
            selector: 0,
            args,
        }
    }

    pub fn add(left: Expr, right: Expr) -> Expr {
        Expr::Add(vec![left, right])
    }

    pub fn sub(left: Expr, right: Expr) -> Expr {
        Expr::Subtract(Box::new(left), Box::new(right))
    }

    pub fn mul(left: Expr, right: Expr) -> Expr {
        Expr::Multiply(vec![left, right])
    }

    pub fn access(array: Expr, index: Expr) -> Expr {
        Expr::ArrayAccess(Box::new(array), Box::new(index))
    }

    pub fn length(array: Expr) -> Expr {
        Expr::ArrayLength(Box::new(array))
    }

    pub fn record(fields: Vec<(&str, Expr)>) -> Expr {
        let mut fields: Vec<(Name, Expr)> = fields
            .into_iter()
            .map(|(name, e)| (Name::new(name), e))
            .collect();
        fields.sort_by(|a, b| a.0.cmp(&b.0));
        Expr::RecordInitialiser(fields)
    }

    pub fn field(record: Expr, name: &str) -> Expr {
        Expr::RecordAccess(Box::new(record), Name::new(name))
    }

    pub fn not(e: Expr) -> Expr {
        Expr::Not(Box::new(e))
    }

    pub fn and(es: Vec<Expr>) -> Expr {
        Expr::And(es)
    }

    pub fn or(es: Vec<Expr>) -> Expr {
        Expr::Or(es)
    }

    pub fn implies(left: Expr, right: Expr) -> Expr {
        Expr::Implies(Box::new(left), Box::new(right))
    }

    pub fn eq(left: Expr, right: Expr) -> Expr {
        Expr::Equal(Box::new(left), Box::new(right))
    }

    pub fn ne(left: Expr, right: Expr) -> Expr {
        Expr::NotEqual(Box::new(left), Box::new(right))
    }

    pub fn lt(left: Expr, right: Expr) -> Expr {
        Expr::LessThan(Box::new(left), Box::new(right))
    }

    pub fn le(left: Expr, right: Expr) -> Expr {
        Expr::LessThanOrEqual(Box::new(left), Box::new(right))
    }

    pub fn gt(left: Expr, right: Expr) -> Expr {
        Expr::GreaterThan(Box::new(left), Box::new(right))
    }

    pub fn ge(left: Expr, right: Expr) -> Expr {
        Expr::GreaterThanOrEqual(Box::new(left), Box::new(right))
    }

    pub fn is(e: Expr, t: Type) -> Expr {
        Expr::Is(Box::new(e), t)
    }

    pub fn forall(params: Vec<VariableDecl>, body: Expr) -> Expr {
        Expr::Forall(params, Box::new(body))
    }

    pub fn exists(params: Vec<VariableDecl>, body: Expr) -> Expr {
        Expr::Exists(params, Box::new(body))
    }

    pub fn as_int(&self) -> Option<&BigInt> {
        match self {
            Expr::Constant(Value::Int(i)) => Some(i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Expr::Constant(Value::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    pub fn is_constant(&self) -> bool {
        matches!(self, Expr::Constant(_))
    }

    pub fn is_variable(&self) -> bool {
        matches!(self, Expr::Variable(_))
    }

    /// Whether this expression is built from the logical layer rather than being a term.
    pub fn is_logical(&self) -> bool {
        matches!(
            self,
            Expr::Not(_)
                | Expr::And(_)
                | Expr::Or(_)
                | Expr::Implies(..)
                | Expr::Iff(..)
                | Expr::Equal(..)
                | Expr::NotEqual(..)
                | Expr::LessThan(..)
                | Expr::LessThanOrEqual(..)
                | Expr::GreaterThan(..)
                | Expr::GreaterThanOrEqual(..)
                | Expr::Is(..)
                | Expr::Forall(..)
                | Expr::Exists(..)
        )
    }

    /// Whether this expression is an integer arithmetic operator.
    pub fn is_arithmetic(&self) -> bool {
        matches!(
            self,
            Expr::Negate(_)
                | Expr::Add(_)
                | Expr::Subtract(..)
                | Expr::Multiply(_)
                | Expr::Divide(..)
                | Expr::Remainder(..)
        )
    }

    /// The immediate subexpressions, in order.
    pub fn children(&self) -> Vec<&Expr> {
        match self {
            Expr::Constant(_) | Expr::Variable(_) => vec![],
            Expr::Invoke { args, .. } => args.iter().collect(),
            Expr::Negate(e)
            | Expr::ArrayLength(e)
            | Expr::RecordAccess(e, _)
            | Expr::Not(e)
            | Expr::Is(e, _)
            | Expr::Forall(_, e)
            | Expr::Exists(_, e) => vec![e],
            Expr::Add(es)
            | Expr::Multiply(es)
            | Expr::ArrayInitialiser(es)
            | Expr::And(es)
            | Expr::Or(es) => es.iter().collect(),
            Expr::Subtract(l, r)
            | Expr::Divide(l, r)
            | Expr::Remainder(l, r)
            | Expr::ArrayAccess(l, r)
            | Expr::Implies(l, r)
            | Expr::Iff(l, r)
            | Expr::Equal(l, r)
            | Expr::NotEqual(l, r)
            | Expr::LessThan(l, r)
            | Expr::LessThanOrEqual(l, r)
            | Expr::GreaterThan(l, r)
            | Expr::GreaterThanOrEqual(l, r) => vec![l, r],
            Expr::ArrayGenerator { value, length } => vec![value, length],
            Expr::ArrayUpdate {
                array,
                index,
                value,
            } => vec![array, index, value],
            Expr::RecordInitialiser(fields) => fields.iter().map(|(_, e)| e).collect(),
            Expr::RecordUpdate { record, value, .. } => vec![record, value],
        }
    }

    /// Visits this expression and every subexpression, parents before children.
    pub fn walk<'a>(&'a self, f: &mut dyn FnMut(&'a Expr)) {
        f(self);
        for child in self.children() {
            child.walk(f);
        }
    }

    /// Whether target occurs anywhere inside this expression, including at the root.
    pub fn contains(&self, target: &Expr) -> bool {
        if self == target {
            return true;
        }
        self.children().into_iter().any(|c| c.contains(target))
    }

    /// Whether the named variable occurs free in this expression.
    pub fn mentions(&self, name: &Name) -> bool {
        let mut free = BTreeSet::new();
        self.free_variables(&mut vec![], &mut free);
        free.contains(name)
    }

    /// Collects the free variables of this expression.
    /// `bound` holds the names bound by enclosing quantifiers.
    pub fn free_variables(&self, bound: &mut Vec<Name>, out: &mut BTreeSet<Name>) {
        match self {
            Expr::Variable(name) => {
                if !bound.contains(name) {
                    out.insert(name.clone());
                }
            }
            Expr::Forall(params, body) | Expr::Exists(params, body) => {
                let n = bound.len();
                bound.extend(params.iter().map(|p| p.name.clone()));
                body.free_variables(bound, out);
                bound.truncate(n);
            }
            _ => {
                for child in self.children() {
                    child.free_variables(bound, out);
                }
            }
        }
    }

    /// Applies a simultaneous substitution.
    /// Pairs whose left-hand side mentions a variable bound by an enclosing quantifier are
    /// not applied underneath that quantifier, and binders are renamed rather than capture a
    /// free variable of a replacement.
    pub fn substitute(&self, subst: &Substitution) -> Expr {
        if subst.is_empty() {
            return self.clone();
        }
        for (from, to) in subst {
            if self == from {
                return to.clone();
            }
        }
        match self {
            Expr::Forall(params, body) | Expr::Exists(params, body) => {
                let mut free = BTreeSet::new();
                body.free_variables(&mut vec![], &mut free);
                let (params, inner) = under_binder(params, subst, &free);
                let body = Box::new(body.substitute(&inner));
                match self {
                    Expr::Forall(..) => Expr::Forall(params, body),
                    _ => Expr::Exists(params, body),
                }
            }
            _ => self.map_children(&mut |e| e.substitute(subst)),
        }
    }

    /// Rebuilds this expression with every immediate subexpression rewritten.
    pub fn map_children(&self, f: &mut dyn FnMut(&Expr) -> Expr) -> Expr {
        let mut sub = |e: &Expr| Box::new(f(e));
        match self {
            Expr::Constant(_) | Expr::Variable(_) => self.clone(),
            Expr::Invoke {
                name,
                selector,
                args,
            } => Expr::Invoke {
                name: name.clone(),
                selector: *selector,
                args: args.iter().map(|e| *sub(e)).collect(),
            },
            Expr::Negate(e) => Expr::Negate(sub(e)),
            Expr::Add(es) => Expr::Add(es.iter().map(|e| *sub(e)).collect()),
            Expr::Subtract(l, r) => Expr::Subtract(sub(l), sub(r)),
            Expr::Multiply(es) => Expr::Multiply(es.iter().map(|e| *sub(e)).collect()),
            Expr::Divide(l, r) => Expr::Divide(sub(l), sub(r)),
            Expr::Remainder(l, r) => Expr::Remainder(sub(l), sub(r)),
            Expr::ArrayInitialiser(es) => {
                Expr::ArrayInitialiser(es.iter().map(|e| *sub(e)).collect())
            }
            Expr::ArrayGenerator { value, length } => Expr::ArrayGenerator {
                value: sub(value),
                length: sub(length),
            },
            Expr::ArrayAccess(a, i) => Expr::ArrayAccess(sub(a), sub(i)),
            Expr::ArrayLength(a) => Expr::ArrayLength(sub(a)),
            Expr::ArrayUpdate {
                array,
                index,
                value,
            } => Expr::ArrayUpdate {
                array: sub(array),
                index: sub(index),
                value: sub(value),
            },
            Expr::RecordInitialiser(fields) => Expr::RecordInitialiser(
                fields
                    .iter()
                    .map(|(n, e)| (n.clone(), *sub(e)))
                    .collect(),
            ),
            Expr::RecordAccess(e, field) => Expr::RecordAccess(sub(e), field.clone()),
            Expr::RecordUpdate {
                record,
                field,
                value,
            } => Expr::RecordUpdate {
                record: sub(record),
                field: field.clone(),
                value: sub(value),
            },
            Expr::Not(e) => Expr::Not(sub(e)),
            Expr::And(es) => Expr::And(es.iter().map(|e| *sub(e)).collect()),
            Expr::Or(es) => Expr::Or(es.iter().map(|e| *sub(e)).collect()),
            Expr::Implies(l, r) => Expr::Implies(sub(l), sub(r)),
            Expr::Iff(l, r) => Expr::Iff(sub(l), sub(r)),
            Expr::Equal(l, r) => Expr::Equal(sub(l), sub(r)),
            Expr::NotEqual(l, r) => Expr::NotEqual(sub(l), sub(r)),
            Expr::LessThan(l, r) => Expr::LessThan(sub(l), sub(r)),
            Expr::LessThanOrEqual(l, r) => Expr::LessThanOrEqual(sub(l), sub(r)),
            Expr::GreaterThan(l, r) => Expr::GreaterThan(sub(l), sub(r)),
            Expr::GreaterThanOrEqual(l, r) => Expr::GreaterThanOrEqual(sub(l), sub(r)),
            Expr::Is(e, t) => Expr::Is(sub(e), t.clone()),
            Expr::Forall(params, body) => Expr::Forall(params.clone(), sub(body)),
            Expr::Exists(params, body) => Expr::Exists(params.clone(), sub(body)),
        }
    }

    /// The number of nested subexpressions along the deepest path, counting this one.
    pub fn depth(&self) -> usize {
        1 + self.children().into_iter().map(|c| c.depth()).max().unwrap_or(0)
    }
}

/// Prepares a substitution for use underneath a binder for `params`, whose body has the
/// free variables `avoid`.
///
/// Pairs whose left-hand side mentions a parameter are dropped. A parameter whose name is
/// free in some remaining replacement gets a fresh name, and the renaming joins the
/// substitution. Returns the parameters to bind along with the substitution for the body.
pub fn under_binder(
    params: &[VariableDecl],
    subst: &Substitution,
    avoid: &BTreeSet<Name>,
) -> (Vec<VariableDecl>, Vec<(Expr, Expr)>) {
    let mut inner: Vec<(Expr, Expr)> = subst
        .iter()
        .filter(|(from, _)| !params.iter().any(|p| from.mentions(&p.name)))
        .cloned()
        .collect();
    let mut incoming = BTreeSet::new();
    for (_, to) in &inner {
        to.free_variables(&mut vec![], &mut incoming);
    }
    if !params.iter().any(|p| incoming.contains(&p.name)) {
        return (params.to_vec(), inner);
    }

    let mut taken = avoid.clone();
    taken.extend(incoming.iter().cloned());
    taken.extend(params.iter().map(|p| p.name.clone()));
    let mut renamed = vec![];
    for p in params {
        if !incoming.contains(&p.name) {
            renamed.push(p.clone());
            continue;
        }
        let mut k = 0;
        let mut fresh = p.name.fresh(k);
        while taken.contains(&fresh) {
            k += 1;
            fresh = p.name.fresh(k);
        }
        taken.insert(fresh.clone());
        inner.push((Expr::Variable(p.name.clone()), Expr::Variable(fresh.clone())));
        renamed.push(VariableDecl {
            var_type: p.var_type.clone(),
            name: fresh,
        });
    }
    (renamed, inner)
}

fn write_list(f: &mut fmt::Formatter, es: &[Expr], sep: &str) -> fmt::Result {
    for (i, e) in es.iter().enumerate() {
        if i > 0 {
            write!(f, "{}", sep)?;
        }
        write!(f, "{}", e)?;
    }
    Ok(())
}

fn write_params(f: &mut fmt::Formatter, params: &[VariableDecl]) -> fmt::Result {
    for (i, p) in params.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", p)?;
    }
    Ok(())
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Expr::Constant(v) => write!(f, "{}", v),
            Expr::Variable(name) => write!(f, "{}", name),
            Expr::Invoke {
                name,
                selector,
                args,
            } => {
                write!(f, "{}(", name)?;
                write_list(f, args, ", ")?;
                write!(f, ")")?;
                if *selector > 0 {
                    write!(f, "#{}", selector)?;
                }
                Ok(())
            }
            Expr::Negate(e) => write!(f, "-{}", Parens(e)),
            Expr::Add(es) => {
                write!(f, "(")?;
                write_list(f, es, " + ")?;
                write!(f, ")")
            }
            Expr::Subtract(l, r) => write!(f, "({} - {})", l, r),
            Expr::Multiply(es) => {
                write!(f, "(")?;
                write_list(f, es, " * ")?;
                write!(f, ")")
            }
            Expr::Divide(l, r) => write!(f, "({} / {})", l, r),
            Expr::Remainder(l, r) => write!(f, "({} % {})", l, r),
            Expr::ArrayInitialiser(es) => {
                write!(f, "[")?;
                write_list(f, es, ", ")?;
                write!(f, "]")
            }
            Expr::ArrayGenerator { value, length } => write!(f, "[{}; {}]", value, length),
            Expr::ArrayAccess(a, i) => write!(f, "{}[{}]", Parens(a), i),
            Expr::ArrayLength(a) => write!(f, "|{}|", a),
            Expr::ArrayUpdate {
                array,
                index,
                value,
            } => write!(f, "{}[{} := {}]", Parens(array), index, value),
            Expr::RecordInitialiser(fields) => {
                write!(f, "{{")?;
                for (i, (name, e)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", name, e)?;
                }
                write!(f, "}}")
            }
            Expr::RecordAccess(e, field) => write!(f, "{}.{}", Parens(e), field),
            Expr::RecordUpdate {
                record,
                field,
                value,
            } => write!(f, "{}{{{} := {}}}", Parens(record), field, value),
            Expr::Not(e) => write!(f, "!{}", Parens(e)),
            Expr::And(es) => {
                write!(f, "(")?;
                write_list(f, es, " && ")?;
                write!(f, ")")
            }
            Expr::Or(es) => {
                write!(f, "(")?;
                write_list(f, es, " || ")?;
                write!(f, ")")
            }
            Expr::Implies(l, r) => write!(f, "({} ==> {})", l, r),
            Expr::Iff(l, r) => write!(f, "({} <==> {})", l, r),
            Expr::Equal(l, r) => write!(f, "{} == {}", l, r),
            Expr::NotEqual(l, r) => write!(f, "{} != {}", l, r),
            Expr::LessThan(l, r) => write!(f, "{} < {}", l, r),
            Expr::LessThanOrEqual(l, r) => write!(f, "{} <= {}", l, r),
            Expr::GreaterThan(l, r) => write!(f, "{} > {}", l, r),
            Expr::GreaterThanOrEqual(l, r) => write!(f, "{} >= {}", l, r),
            Expr::Is(e, t) => write!(f, "{} is {}", Parens(e), t),
            Expr::Forall(params, body) => {
                write!(f, "forall(")?;
                write_params(f, params)?;
                write!(f, "): {}", body)
            }
            Expr::Exists(params, body) => {
                write!(f, "exists(")?;
                write_params(f, params)?;
                write!(f, "): {}", body)
            }
        }
    }
}

// Wraps operands that print with spaces so that prefix and postfix operators stay readable.
struct Parens<'a>(&'a Expr);

impl fmt::Display for Parens<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.0 {
            Expr::Constant(_)
            | Expr::Variable(_)
            | Expr::Invoke { .. }
            | Expr::ArrayAccess(..)
            | Expr::ArrayLength(_)
            | Expr::ArrayInitialiser(_)
            | Expr::RecordAccess(..)
            | Expr::RecordInitialiser(_)
            | Expr::Add(_)
            | Expr::Multiply(_)
            | Expr::Subtract(..)
            | Expr::Divide(..)
            | Expr::Remainder(..)
            | Expr::And(_)
            | Expr::Or(_) => write!(f, "{}", self.0),
            e => write!(f, "({})", e),
        }
    }
}
