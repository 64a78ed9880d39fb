use num_bigint::BigInt;
use num_traits::{Signed, Zero};
use std::collections::BTreeSet;
use std::fmt;

use crate::error::{DeclarationKind, Error};
use crate::kernel::expr::{under_binder, Expr, Substitution, Value, VariableDecl};
use crate::kernel::name::Name;
use crate::kernel::types::Type;
use crate::polynomial::Polynomial;
use crate::type_system::{TypeEnvironment, TypeSystem};

/// A boolean fact in canonical form.
///
/// Formulas are only built through the constructors below, which keep them normalised:
/// conjunctions and disjunctions are flat, sorted and free of duplicates, equalities are
/// oriented so that `lhs <= rhs`, and arithmetic comparisons are reduced to a coefficient-minimal
/// difference. Two formulas that mean the same thing in an obvious way are structurally equal,
/// which is what lets the heap intern them.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Formula {
    Truth(bool),
    Conjunct(Vec<Formula>),
    Disjunct(Vec<Formula>),
    Quantifier {
        universal: bool,
        params: Vec<VariableDecl>,
        body: Box<Formula>,
    },

    // Equality between non-integer terms.
    // Boolean atoms are written `e == true` and `e != true`.
    Equality {
        sign: bool,
        lhs: Expr,
        rhs: Expr,
    },

    ArithmeticEquality {
        sign: bool,
        lhs: Polynomial,
        rhs: Polynomial,
    },

    // lhs >= rhs
    Inequality {
        lhs: Polynomial,
        rhs: Polynomial,
    },

    // A boolean function or macro call.
    Invoke {
        sign: bool,
        name: Name,
        selector: usize,
        args: Vec<Expr>,
    },

    Is {
        expr: Expr,
        test: Type,
    },
}

fn flatten(fs: Vec<Formula>, conjunctive: bool, out: &mut Vec<Formula>) -> bool {
    for f in fs {
        match f {
            Formula::Conjunct(inner) if conjunctive => {
                if flatten(inner, conjunctive, out) {
                    return true;
                }
            }
            Formula::Disjunct(inner) if !conjunctive => {
                if flatten(inner, conjunctive, out) {
                    return true;
                }
            }
            Formula::Truth(b) => {
                // The absorbing value ends the whole thing; the neutral one disappears.
                if b != conjunctive {
                    return true;
                }
            }
            f => out.push(f),
        }
    }
    false
}

impl Formula {
    pub fn and(fs: Vec<Formula>) -> Formula {
        let mut flat = vec![];
        if flatten(fs, true, &mut flat) {
            return Formula::Truth(false);
        }
        flat.sort();
        flat.dedup();
        match flat.len() {
            0 => Formula::Truth(true),
            1 => flat.remove(0),
            _ => Formula::Conjunct(flat),
        }
    }

    pub fn or(fs: Vec<Formula>) -> Formula {
        let mut flat = vec![];
        if flatten(fs, false, &mut flat) {
            return Formula::Truth(true);
        }
        flat.sort();
        flat.dedup();
        match flat.len() {
            0 => Formula::Truth(false),
            1 => flat.remove(0),
            _ => Formula::Disjunct(flat),
        }
    }

    /// Builds a quantifier. A constant body absorbs the quantifier only when that cannot
    /// depend on the parameter types being empty: `forall x: true` and `exists x: false`
    /// always, the other two only over types that certainly have values.
    pub fn quantifier(universal: bool, params: Vec<VariableDecl>, body: Formula) -> Formula {
        if params.is_empty() {
            return body;
        }
        if let Formula::Truth(b) = body {
            if b == universal || params.iter().all(|p| p.var_type.is_inhabited()) {
                return body;
            }
        }
        Formula::Quantifier {
            universal,
            params,
            body: Box::new(body),
        }
    }

    pub fn equality(sign: bool, lhs: Expr, rhs: Expr) -> Formula {
        if lhs == rhs {
            return Formula::Truth(sign);
        }
        if let (Expr::Constant(a), Expr::Constant(b)) = (&lhs, &rhs) {
            return Formula::Truth((a == b) == sign);
        }
        let boolean = match (&lhs, &rhs) {
            (Expr::Constant(Value::Bool(b)), e) | (e, Expr::Constant(Value::Bool(b))) => {
                Some((sign == *b, e.clone()))
            }
            _ => None,
        };
        if let Some((sign, e)) = boolean {
            return match e {
                Expr::Invoke {
                    name,
                    selector,
                    args,
                } => Formula::invoke(sign, name, selector, args),
                e => Formula::Equality {
                    sign,
                    lhs: Expr::bool(true),
                    rhs: e,
                },
            };
        }
        let (lhs, rhs) = if lhs <= rhs { (lhs, rhs) } else { (rhs, lhs) };
        Formula::Equality { sign, lhs, rhs }
    }

    pub fn arithmetic_equality(sign: bool, lhs: Polynomial, rhs: Polynomial) -> Formula {
        let difference = lhs.subtract(&rhs);
        if let Some(c) = difference.as_constant() {
            return Formula::Truth(c.is_zero() == sign);
        }
        // No integer solution unless the gcd divides the constant.
        let g = difference.variable_gcd();
        if !(difference.constant_term() % &g).is_zero() {
            return Formula::Truth(!sign);
        }
        let (positive, negative) = difference.factorise().split();
        let (lhs, rhs) = if positive <= negative {
            (positive, negative)
        } else {
            (negative, positive)
        };
        Formula::ArithmeticEquality { sign, lhs, rhs }
    }

    /// `lhs >= rhs`
    pub fn inequality(lhs: Polynomial, rhs: Polynomial) -> Formula {
        let difference = lhs.subtract(&rhs);
        if let Some(c) = difference.as_constant() {
            return Formula::Truth(!c.is_negative());
        }
        let (lhs, rhs) = difference.tighten().split();
        Formula::Inequality { lhs, rhs }
    }

    /// `lhs < rhs`, which over the integers is `rhs >= lhs + 1`.
    pub fn less_than(lhs: Polynomial, rhs: Polynomial) -> Formula {
        Formula::inequality(rhs, lhs.add(&Polynomial::int(1)))
    }

    pub fn invoke(sign: bool, name: Name, selector: usize, args: Vec<Expr>) -> Formula {
        Formula::Invoke {
            sign,
            name,
            selector,
            args,
        }
    }

    pub fn is(expr: Expr, test: Type) -> Formula {
        match test {
            Type::Any => Formula::Truth(true),
            Type::Void => Formula::Truth(false),
            test => Formula::Is { expr, test },
        }
    }

    pub fn negate(&self) -> Formula {
        match self {
            Formula::Truth(b) => Formula::Truth(!b),
            Formula::Conjunct(fs) => Formula::or(fs.iter().map(|f| f.negate()).collect()),
            Formula::Disjunct(fs) => Formula::and(fs.iter().map(|f| f.negate()).collect()),
            Formula::Quantifier {
                universal,
                params,
                body,
            } => Formula::quantifier(!universal, params.clone(), body.negate()),
            Formula::Equality { sign, lhs, rhs } => Formula::Equality {
                sign: !sign,
                lhs: lhs.clone(),
                rhs: rhs.clone(),
            },
            Formula::ArithmeticEquality { sign, lhs, rhs } => Formula::ArithmeticEquality {
                sign: !sign,
                lhs: lhs.clone(),
                rhs: rhs.clone(),
            },
            Formula::Inequality { lhs, rhs } => Formula::less_than(lhs.clone(), rhs.clone()),
            Formula::Invoke {
                sign,
                name,
                selector,
                args,
            } => Formula::invoke(!sign, name.clone(), *selector, args.clone()),
            Formula::Is { expr, test } => Formula::is(expr.clone(), Type::negation(test.clone())),
        }
    }

    /// Applies a substitution to every expression and rebuilds the canonical form.
    pub fn substitute(&self, subst: &Substitution) -> Formula {
        self.map_exprs(&mut |e| e.substitute(subst), subst)
    }

    // Rebuilds the formula with every top-level expression rewritten. Under a quantifier, the
    // substitution decides which pairs still apply.
    fn map_exprs(&self, f: &mut dyn FnMut(&Expr) -> Expr, subst: &Substitution) -> Formula {
        match self {
            Formula::Truth(_) => self.clone(),
            Formula::Conjunct(fs) => {
                Formula::and(fs.iter().map(|x| x.map_exprs(f, subst)).collect())
            }
            Formula::Disjunct(fs) => {
                Formula::or(fs.iter().map(|x| x.map_exprs(f, subst)).collect())
            }
            Formula::Quantifier {
                universal,
                params,
                body,
            } => {
                let mut free = BTreeSet::new();
                body.free_variables(&mut vec![], &mut free);
                let (params, inner) = under_binder(params, subst, &free);
                Formula::quantifier(*universal, params, body.substitute(&inner))
            }
            Formula::Equality { sign, lhs, rhs } => Formula::equality(*sign, f(lhs), f(rhs)),
            Formula::ArithmeticEquality { sign, lhs, rhs } => {
                Formula::arithmetic_equality(*sign, lhs.map_atoms(f), rhs.map_atoms(f))
            }
            Formula::Inequality { lhs, rhs } => {
                Formula::inequality(lhs.map_atoms(f), rhs.map_atoms(f))
            }
            Formula::Invoke {
                sign,
                name,
                selector,
                args,
            } => {
                let call = Expr::Invoke {
                    name: name.clone(),
                    selector: *selector,
                    args: args.clone(),
                };
                match f(&call) {
                    Expr::Constant(Value::Bool(b)) => Formula::Truth(b == *sign),
                    Expr::Invoke {
                        name,
                        selector,
                        args,
                    } => Formula::invoke(*sign, name, selector, args),
                    other => Formula::equality(*sign, other, Expr::bool(true)),
                }
            }
            Formula::Is { expr, test } => Formula::is(f(expr), test.clone()),
        }
    }

    /// Rebuilds the formula with every expression outside quantifiers rewritten.
    pub fn map_ground(&self, f: &mut dyn FnMut(&Expr) -> Expr) -> Formula {
        match self {
            Formula::Quantifier { .. } => self.clone(),
            _ => self.map_exprs(f, &[]),
        }
    }

    /// Visits every expression and subexpression, including those under quantifiers.
    pub fn walk<'a>(&'a self, f: &mut dyn FnMut(&'a Expr)) {
        self.walk_from(f, true)
    }

    /// Visits every expression and subexpression outside quantifiers.
    pub fn walk_ground<'a>(&'a self, f: &mut dyn FnMut(&'a Expr)) {
        self.walk_from(f, false)
    }

    fn walk_from<'a>(&'a self, f: &mut dyn FnMut(&'a Expr), into_quantifiers: bool) {
        match self {
            Formula::Truth(_) => {}
            Formula::Conjunct(fs) | Formula::Disjunct(fs) => {
                for x in fs {
                    x.walk_from(f, into_quantifiers);
                }
            }
            Formula::Quantifier { body, .. } => {
                if into_quantifiers {
                    body.walk_from(f, into_quantifiers);
                }
            }
            Formula::Equality { lhs, rhs, .. } => {
                lhs.walk(f);
                rhs.walk(f);
            }
            Formula::ArithmeticEquality { lhs, rhs, .. } | Formula::Inequality { lhs, rhs } => {
                for atom in lhs.atoms().chain(rhs.atoms()) {
                    atom.walk(f);
                }
            }
            Formula::Invoke { args, .. } => {
                for arg in args {
                    arg.walk(f);
                }
            }
            Formula::Is { expr, .. } => expr.walk(f),
        }
    }

    /// Whether the expression occurs anywhere in this formula.
    pub fn contains(&self, target: &Expr) -> bool {
        let mut found = false;
        self.walk(&mut |e| {
            if e == target {
                found = true;
            }
        });
        found
    }

    pub fn free_variables(&self, bound: &mut Vec<Name>, out: &mut BTreeSet<Name>) {
        match self {
            Formula::Quantifier { params, body, .. } => {
                let n = bound.len();
                bound.extend(params.iter().map(|p| p.name.clone()));
                body.free_variables(bound, out);
                bound.truncate(n);
            }
            Formula::Conjunct(fs) | Formula::Disjunct(fs) => {
                for x in fs {
                    x.free_variables(bound, out);
                }
            }
            _ => {
                let mut roots = vec![];
                self.roots(&mut roots);
                for e in roots {
                    e.free_variables(bound, out);
                }
            }
        }
    }

    pub fn mentions(&self, name: &Name) -> bool {
        let mut free = BTreeSet::new();
        self.free_variables(&mut vec![], &mut free);
        free.contains(name)
    }

    // The top-level expressions of an atomic formula.
    fn roots<'a>(&'a self, out: &mut Vec<&'a Expr>) {
        match self {
            Formula::Equality { lhs, rhs, .. } => {
                out.push(lhs);
                out.push(rhs);
            }
            Formula::ArithmeticEquality { lhs, rhs, .. } | Formula::Inequality { lhs, rhs } => {
                out.extend(lhs.atoms());
                out.extend(rhs.atoms());
            }
            Formula::Invoke { args, .. } => out.extend(args.iter()),
            Formula::Is { expr, .. } => out.push(expr),
            _ => {}
        }
    }
}

fn write_joined(f: &mut fmt::Formatter, fs: &[Formula], sep: &str) -> fmt::Result {
    write!(f, "(")?;
    for (i, x) in fs.iter().enumerate() {
        if i > 0 {
            write!(f, "{}", sep)?;
        }
        write!(f, "{}", x)?;
    }
    write!(f, ")")
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Formula::Truth(b) => write!(f, "{}", b),
            Formula::Conjunct(fs) => write_joined(f, fs, " && "),
            Formula::Disjunct(fs) => write_joined(f, fs, " || "),
            Formula::Quantifier {
                universal,
                params,
                body,
            } => {
                write!(f, "{}(", if *universal { "forall" } else { "exists" })?;
                for (i, p) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", p)?;
                }
                write!(f, "): {}", body)
            }
            Formula::Equality { sign, lhs, rhs } => {
                write!(f, "{} {} {}", lhs, if *sign { "==" } else { "!=" }, rhs)
            }
            Formula::ArithmeticEquality { sign, lhs, rhs } => {
                write!(f, "{} {} {}", lhs, if *sign { "==" } else { "!=" }, rhs)
            }
            Formula::Inequality { lhs, rhs } => write!(f, "{} >= {}", lhs, rhs),
            Formula::Invoke {
                sign,
                name,
                selector,
                args,
            } => {
                if !sign {
                    write!(f, "!")?;
                }
                let call = Expr::Invoke {
                    name: name.clone(),
                    selector: *selector,
                    args: args.clone(),
                };
                write!(f, "{}", call)
            }
            Formula::Is { expr, test } => write!(f, "{} is {}", expr, test),
        }
    }
}

/// Lowers a boolean surface expression into a formula.
///
/// Equalities between integers become arithmetic equalities, and comparisons become
/// inequalities. Fails on names that do not resolve and on variables missing from `env`.
pub fn to_formula(types: &TypeSystem, env: &TypeEnvironment, e: &Expr) -> Result<Formula, Error> {
    let lower = |x: &Expr| to_formula(types, env, x);
    let poly = Polynomial::from_expr;
    let formula = match e {
        Expr::Constant(Value::Bool(b)) => Formula::Truth(*b),
        Expr::Constant(v) => {
            return Err(Error::ill_typed(format!("{} is not a boolean", v)));
        }
        Expr::Invoke { name, .. } => {
            types
                .declarations()
                .resolve_exactly(name, DeclarationKind::Callable)?;
            Formula::equality(true, e.clone(), Expr::bool(true))
        }
        Expr::Variable(_)
        | Expr::ArrayAccess(..)
        | Expr::RecordAccess(..) => {
            let t = types.infer_type(env, e)?;
            if !types.is_bool(&t)? {
                return Err(Error::ill_typed(format!("{} is not a boolean", e)));
            }
            Formula::equality(true, e.clone(), Expr::bool(true))
        }
        Expr::Not(inner) => lower(inner)?.negate(),
        Expr::And(es) => {
            let mut fs = vec![];
            for x in es {
                fs.push(lower(x)?);
            }
            Formula::and(fs)
        }
        Expr::Or(es) => {
            let mut fs = vec![];
            for x in es {
                fs.push(lower(x)?);
            }
            Formula::or(fs)
        }
        Expr::Implies(l, r) => Formula::or(vec![lower(l)?.negate(), lower(r)?]),
        Expr::Iff(l, r) => iff(lower(l)?, lower(r)?),
        Expr::Equal(l, r) => equality(types, env, true, l, r)?,
        Expr::NotEqual(l, r) => equality(types, env, false, l, r)?,
        Expr::LessThan(l, r) => Formula::less_than(poly(l), poly(r)),
        Expr::LessThanOrEqual(l, r) => Formula::inequality(poly(r), poly(l)),
        Expr::GreaterThan(l, r) => Formula::less_than(poly(r), poly(l)),
        Expr::GreaterThanOrEqual(l, r) => Formula::inequality(poly(l), poly(r)),
        Expr::Is(inner, t) => {
            types.infer_type(env, inner)?;
            Formula::is(*inner.clone(), t.clone())
        }
        Expr::Forall(params, body) | Expr::Exists(params, body) => {
            let mut inner_env = env.clone();
            for p in params {
                inner_env.insert(p.name.clone(), p.var_type.clone());
            }
            let body = to_formula(types, &inner_env, body)?;
            Formula::quantifier(matches!(e, Expr::Forall(..)), params.clone(), body)
        }
        _ => {
            return Err(Error::ill_typed(format!("{} is not a boolean", e)));
        }
    };
    Ok(formula)
}

fn iff(l: Formula, r: Formula) -> Formula {
    Formula::or(vec![
        Formula::and(vec![l.clone(), r.clone()]),
        Formula::and(vec![l.negate(), r.negate()]),
    ])
}

/// Lowers `l == r` (or `l != r`), choosing the representation by the operand types.
pub fn equality(
    types: &TypeSystem,
    env: &TypeEnvironment,
    sign: bool,
    l: &Expr,
    r: &Expr,
) -> Result<Formula, Error> {
    let lt = types.infer_type(env, l)?;
    let rt = types.infer_type(env, r)?;
    if types.is_int(&lt)? && types.is_int(&rt)? {
        return Ok(Formula::arithmetic_equality(
            sign,
            Polynomial::from_expr(l),
            Polynomial::from_expr(r),
        ));
    }
    if (l.is_logical() || r.is_logical()) && types.is_bool(&lt)? && types.is_bool(&rt)? {
        let f = iff(to_formula(types, env, l)?, to_formula(types, env, r)?);
        return Ok(if sign { f } else { f.negate() });
    }
    Ok(Formula::equality(sign, l.clone(), r.clone()))
}

/// The constant offset `p - q`, if there is one.
pub fn offset(p: &Expr, q: &Expr) -> Option<BigInt> {
    Polynomial::from_expr(p).offset_from(&Polynomial::from_expr(q))
}
