use std::collections::HashSet;
use std::fmt;

use crate::error::Error;
use crate::kernel::declaration::Declarations;
use crate::kernel::name::Name;
use crate::kernel::types::{FunctionType, RecordType, Type};

/// The result of a subtype query that may not be decidable from raw types alone.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Ternary {
    True,
    False,
    Unknown,
}

impl fmt::Display for Ternary {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Ternary::True => write!(f, "true"),
            Ternary::False => write!(f, "false"),
            Ternary::Unknown => write!(f, "unknown"),
        }
    }
}

/// A type occurrence inside an intersection being checked for voidness.
///
/// `maximise` picks how a nominal type with an invariant is read. When set, the invariant is
/// ignored and the nominal stands for its whole underlying type. When clear, nothing is
/// assumed to satisfy the invariant, so the nominal stands for the empty type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct Term {
    ty: Type,
    sign: bool,
    maximise: bool,
}

impl Term {
    fn new(ty: Type, sign: bool, maximise: bool) -> Term {
        Term { ty, sign, maximise }
    }

    fn negate(&self) -> Term {
        Term::new(self.ty.clone(), !self.sign, !self.maximise)
    }

    fn with_type(&self, ty: Type) -> Term {
        Term::new(ty, self.sign, self.maximise)
    }
}

// The head constructor of an atom. Values of different kinds never overlap.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Kind {
    Null,
    Bool,
    Int,
    Array,
    Record,
    Function,
}

fn kind(t: &Type) -> Option<Kind> {
    match t {
        Type::Null => Some(Kind::Null),
        Type::Bool => Some(Kind::Bool),
        Type::Int => Some(Kind::Int),
        Type::Array(_) => Some(Kind::Array),
        Type::Record(_) => Some(Kind::Record),
        Type::Function(_) => Some(Kind::Function),
        _ => None,
    }
}

/// Decides whether intersections of types are empty.
///
/// Recursive nominal types are handled coinductively: while a pair of terms is being checked,
/// meeting the same pair again is answered with "void". The assumption is withdrawn once the
/// check of that pair finishes.
pub struct SubtypeOperator<'a> {
    declarations: &'a Declarations,
    assumptions: HashSet<(Term, Term)>,
}

impl<'a> SubtypeOperator<'a> {
    pub fn new(declarations: &'a Declarations) -> SubtypeOperator<'a> {
        SubtypeOperator {
            declarations,
            assumptions: HashSet::new(),
        }
    }

    /// Whether every value of `child` is a value of `parent`.
    ///
    /// Computed as the voidness of `child & !parent`, once with the child's invariants
    /// ignored and once with them taken as unsatisfiable. Only agreement gives a definite answer.
    pub fn is_subtype(&mut self, parent: &Type, child: &Type) -> Result<Ternary, Error> {
        if parent == child || *parent == Type::Any || *child == Type::Void {
            return Ok(Ternary::True);
        }
        let upper = self.is_void_pair(
            Term::new(child.clone(), true, true),
            Term::new(parent.clone(), false, false),
        )?;
        let lower = self.is_void_pair(
            Term::new(child.clone(), true, false),
            Term::new(parent.clone(), false, true),
        )?;
        Ok(match (upper, lower) {
            (true, true) => Ternary::True,
            (false, false) => Ternary::False,
            _ => Ternary::Unknown,
        })
    }

    /// Whether no value has type `t`, reading invariants generously.
    pub fn is_void(&mut self, t: &Type) -> Result<bool, Error> {
        self.is_void_pair(Term::new(t.clone(), true, true), Term::new(Type::Any, true, true))
    }

    /// Whether no value has both types, reading invariants generously.
    pub fn is_void_intersection(&mut self, a: &Type, b: &Type) -> Result<bool, Error> {
        self.is_void_pair(Term::new(a.clone(), true, true), Term::new(b.clone(), true, true))
    }

    fn is_void_pair(&mut self, lhs: Term, rhs: Term) -> Result<bool, Error> {
        let key = (lhs, rhs);
        if self.assumptions.contains(&key) {
            return Ok(true);
        }
        self.assumptions.insert(key.clone());
        let answer = self.is_void_worklist(vec![key.0.clone(), key.1.clone()], vec![], vec![]);
        self.assumptions.remove(&key);
        answer
    }

    // Decomposes the worklist into atoms, branching on unions. `seen` holds the nominal terms
    // already unfolded on this branch; unfolding one twice adds nothing.
    fn is_void_worklist(
        &mut self,
        mut worklist: Vec<Term>,
        mut atoms: Vec<Term>,
        mut seen: Vec<Term>,
    ) -> Result<bool, Error> {
        while let Some(term) = worklist.pop() {
            match &term.ty {
                Type::Void => {
                    if term.sign {
                        return Ok(true);
                    }
                }
                Type::Any => {
                    if !term.sign {
                        return Ok(true);
                    }
                }
                Type::Negation(inner) => {
                    worklist.push(Term::new(*inner.clone(), !term.sign, !term.maximise));
                }
                Type::Union(alternatives) if term.sign => {
                    for alternative in alternatives {
                        let mut branch = worklist.clone();
                        branch.push(term.with_type(alternative.clone()));
                        if !self.is_void_worklist(branch, atoms.clone(), seen.clone())? {
                            return Ok(false);
                        }
                    }
                    return Ok(true);
                }
                Type::Intersection(conjuncts) if !term.sign => {
                    for conjunct in conjuncts {
                        let mut branch = worklist.clone();
                        branch.push(term.with_type(conjunct.clone()));
                        if !self.is_void_worklist(branch, atoms.clone(), seen.clone())? {
                            return Ok(false);
                        }
                    }
                    return Ok(true);
                }
                Type::Union(types) | Type::Intersection(types) => {
                    for t in types {
                        worklist.push(term.with_type(t.clone()));
                    }
                }
                Type::Nominal(name) => {
                    if seen.contains(&term) {
                        continue;
                    }
                    if let Some(body) = self.unfold(name, term.maximise)? {
                        seen.push(term.clone());
                        worklist.push(term.with_type(body));
                    } else if term.sign {
                        return Ok(true);
                    }
                }
                _ => {
                    if !atoms.contains(&term) {
                        atoms.push(term);
                    }
                }
            }
        }
        self.is_void_atoms(&atoms)
    }

    // The underlying type of a nominal, or None if its invariant stops it from being unfolded.
    fn unfold(&self, name: &Name, maximise: bool) -> Result<Option<Type>, Error> {
        let decl = self.declarations.resolve_type(name)?;
        if maximise || !decl.has_invariant() {
            Ok(Some(decl.var.var_type.clone()))
        } else {
            Ok(None)
        }
    }

    fn is_void_atoms(&mut self, atoms: &[Term]) -> Result<bool, Error> {
        for (i, a) in atoms.iter().enumerate() {
            if a.sign {
                if let Type::Record(record) = &a.ty {
                    if self.has_void_field(a, record)? {
                        return Ok(true);
                    }
                }
            }
            for b in &atoms[i + 1..] {
                let void = match (a.sign, b.sign) {
                    (true, true) => self.is_void_positive(a, b)?,
                    (true, false) => self.is_void_mixed(a, b)?,
                    (false, true) => self.is_void_mixed(b, a)?,
                    (false, false) => false,
                };
                if void {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    fn has_void_field(&mut self, term: &Term, record: &RecordType) -> Result<bool, Error> {
        for field in &record.fields {
            let field = term.with_type(field.field_type.clone());
            if self.is_void_pair(field, Term::new(Type::Any, true, true))? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    // Whether a value can have both types.
    fn is_void_positive(&mut self, a: &Term, b: &Term) -> Result<bool, Error> {
        if kind(&a.ty) != kind(&b.ty) {
            return Ok(true);
        }
        match (&a.ty, &b.ty) {
            // The empty array has every array type.
            (Type::Array(_), Type::Array(_)) => Ok(false),
            (Type::Record(ra), Type::Record(rb)) => {
                // Only two closed records are told apart by their field names. Against an
                // open record, just the shared fields are compared.
                let same_fields = fields_within(ra, rb) && fields_within(rb, ra);
                if !ra.open && !rb.open && !same_fields {
                    return Ok(true);
                }
                for field in &ra.fields {
                    if let Some(other) = rb.field(&field.name) {
                        let lhs = a.with_type(field.field_type.clone());
                        let rhs = b.with_type(other.clone());
                        if self.is_void_pair(lhs, rhs)? {
                            return Ok(true);
                        }
                    }
                }
                Ok(false)
            }
            (Type::Function(fa), Type::Function(fb)) => Ok(!same_arity(fa, fb)),
            _ => Ok(false),
        }
    }

    // Whether every value of `positive` is a value of the negated type, i.e. whether
    // `positive & !negated` is empty.
    fn is_void_mixed(&mut self, positive: &Term, negative: &Term) -> Result<bool, Error> {
        if kind(&positive.ty) != kind(&negative.ty) {
            return Ok(false);
        }
        // Flipping back the negative term gives the type it excludes.
        let excluded = negative.negate();
        match (&positive.ty, &negative.ty) {
            (Type::Array(ea), Type::Array(eb)) => self.is_void_pair(
                positive.with_type(*ea.clone()),
                negative.with_type(*eb.clone()),
            ),
            (Type::Record(ra), Type::Record(rb)) => {
                let shape_fits = if rb.open {
                    fields_within(rb, ra)
                } else {
                    !ra.open && fields_within(ra, rb) && fields_within(rb, ra)
                };
                if !shape_fits {
                    return Ok(false);
                }
                for field in &rb.fields {
                    let mine = match ra.field(&field.name) {
                        Some(t) => t.clone(),
                        None => return Ok(false),
                    };
                    let lhs = positive.with_type(mine);
                    let rhs = negative.with_type(field.field_type.clone());
                    if !self.is_void_pair(lhs, rhs)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            (Type::Function(fa), Type::Function(fb)) => {
                if !same_arity(fa, fb) {
                    return Ok(false);
                }
                // Parameters are contravariant.
                for (pa, pb) in fa.params.iter().zip(fb.params.iter()) {
                    let lhs = excluded.with_type(pb.clone());
                    let rhs = positive.negate().with_type(pa.clone());
                    if !self.is_void_pair(lhs, rhs)? {
                        return Ok(false);
                    }
                }
                for (ra, rb) in fa.returns.iter().zip(fb.returns.iter()) {
                    let lhs = positive.with_type(ra.clone());
                    let rhs = negative.with_type(rb.clone());
                    if !self.is_void_pair(lhs, rhs)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            // Same primitive kind.
            _ => Ok(true),
        }
    }
}

// Whether every field of `inner` is also a field of `outer`.
fn fields_within(inner: &RecordType, outer: &RecordType) -> bool {
    inner.fields.iter().all(|f| outer.has_field(&f.name))
}

fn same_arity(a: &FunctionType, b: &FunctionType) -> bool {
    a.params.len() == b.params.len() && a.returns.len() == b.returns.len()
}
