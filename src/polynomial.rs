use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{One, Signed, Zero};
use std::cmp::Ordering;
use std::fmt;

use crate::kernel::expr::{Expr, Substitution, Value};

/// One summand of a polynomial: a coefficient times a product of atoms.
/// An atom is any expression that polynomial arithmetic treats as opaque,
/// such as a variable, an array length, or a division.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Term {
    coefficient: BigInt,

    // Sorted, may contain repeats (x*x).
    atoms: Vec<Expr>,
}

impl Term {
    /// Panics on a zero coefficient attached to atoms, which would break the normal form.
    pub fn new(coefficient: BigInt, mut atoms: Vec<Expr>) -> Term {
        if coefficient.is_zero() && !atoms.is_empty() {
            panic!(
                "polynomial term with zero coefficient and atoms {:?}",
                atoms
            );
        }
        atoms.sort();
        Term { coefficient, atoms }
    }

    pub fn coefficient(&self) -> &BigInt {
        &self.coefficient
    }

    pub fn atoms(&self) -> &[Expr] {
        &self.atoms
    }

    pub fn is_constant(&self) -> bool {
        self.atoms.is_empty()
    }

    /// The atom of a term of the form `c * a`.
    pub fn as_linear(&self) -> Option<&Expr> {
        match self.atoms.as_slice() {
            [atom] => Some(atom),
            _ => None,
        }
    }

    fn multiply(&self, other: &Term) -> Term {
        let mut atoms = self.atoms.clone();
        atoms.extend(other.atoms.iter().cloned());
        Term::new(&self.coefficient * &other.coefficient, atoms)
    }

    fn to_expr(&self) -> Expr {
        if self.atoms.is_empty() {
            return Expr::bigint(self.coefficient.clone());
        }
        let product = if self.atoms.len() == 1 {
            self.atoms[0].clone()
        } else {
            Expr::Multiply(self.atoms.clone())
        };
        if self.coefficient.is_one() {
            product
        } else if (-&self.coefficient).is_one() {
            Expr::Negate(Box::new(product))
        } else {
            let mut factors = vec![Expr::bigint(self.coefficient.clone())];
            factors.extend(self.atoms.iter().cloned());
            Expr::Multiply(factors)
        }
    }
}

/// A canonical sum of terms.
///
/// Invariants: terms are sorted by their atom lists (so the constant term comes first), no two
/// terms share an atom list, and no term has a zero coefficient, except that the zero
/// polynomial is represented by the single term `0`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Polynomial {
    terms: Vec<Term>,
}

impl Polynomial {
    pub fn zero() -> Polynomial {
        Polynomial {
            terms: vec![Term::new(BigInt::zero(), vec![])],
        }
    }

    pub fn constant(value: BigInt) -> Polynomial {
        Polynomial {
            terms: vec![Term::new(value, vec![])],
        }
    }

    pub fn int(value: i64) -> Polynomial {
        Polynomial::constant(BigInt::from(value))
    }

    pub fn atom(atom: Expr) -> Polynomial {
        Polynomial {
            terms: vec![Term::new(BigInt::one(), vec![atom])],
        }
    }

    /// Builds the normal form of an arbitrary sum of terms.
    pub fn from_terms(terms: Vec<Term>) -> Polynomial {
        let mut terms = terms;
        terms.sort_by(|a, b| a.atoms.cmp(&b.atoms));
        let mut merged: Vec<Term> = vec![];
        for term in terms {
            match merged.last_mut() {
                Some(last) if last.atoms == term.atoms => {
                    last.coefficient += term.coefficient;
                }
                _ => merged.push(term),
            }
        }
        merged.retain(|t| !t.coefficient.is_zero());
        if merged.is_empty() {
            return Polynomial::zero();
        }
        Polynomial { terms: merged }
    }

    /// Lowers an integer expression into normal form.
    /// Division and remainder are not distributed; unless both operands are constants they
    /// become atoms over normalised operands.
    pub fn from_expr(e: &Expr) -> Polynomial {
        match e {
            Expr::Constant(Value::Int(i)) => Polynomial::constant(i.clone()),
            Expr::Negate(inner) => Polynomial::from_expr(inner).negate(),
            Expr::Add(es) => es
                .iter()
                .fold(Polynomial::zero(), |acc, e| acc.add(&Polynomial::from_expr(e))),
            Expr::Subtract(l, r) => Polynomial::from_expr(l).subtract(&Polynomial::from_expr(r)),
            Expr::Multiply(es) => es.iter().fold(Polynomial::int(1), |acc, e| {
                acc.multiply(&Polynomial::from_expr(e))
            }),
            Expr::Divide(l, r) | Expr::Remainder(l, r) => {
                let lp = Polynomial::from_expr(l);
                let rp = Polynomial::from_expr(r);
                if let (Some(a), Some(b)) = (lp.as_constant(), rp.as_constant()) {
                    if !b.is_zero() {
                        // Truncating division, remainder takes the sign of the dividend.
                        let value = match e {
                            Expr::Divide(..) => a / b,
                            _ => a % b,
                        };
                        return Polynomial::constant(value);
                    }
                }
                let (l, r) = (Box::new(lp.to_expr()), Box::new(rp.to_expr()));
                let atom = match e {
                    Expr::Divide(..) => Expr::Divide(l, r),
                    _ => Expr::Remainder(l, r),
                };
                Polynomial::atom(atom)
            }
            _ => Polynomial::atom(e.clone()),
        }
    }

    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    pub fn is_zero(&self) -> bool {
        self.terms.len() == 1 && self.terms[0].is_constant() && self.terms[0].coefficient.is_zero()
    }

    pub fn is_constant(&self) -> bool {
        self.terms.len() == 1 && self.terms[0].is_constant()
    }

    pub fn as_constant(&self) -> Option<&BigInt> {
        if self.is_constant() {
            Some(&self.terms[0].coefficient)
        } else {
            None
        }
    }

    /// The constant summand, zero if there is none.
    pub fn constant_term(&self) -> BigInt {
        match self.terms.first() {
            Some(t) if t.is_constant() => t.coefficient.clone(),
            _ => BigInt::zero(),
        }
    }

    /// The coefficient of the linear term `c * atom`, zero if there is none.
    pub fn coefficient_of(&self, atom: &Expr) -> BigInt {
        for term in &self.terms {
            if term.as_linear() == Some(atom) {
                return term.coefficient.clone();
            }
        }
        BigInt::zero()
    }

    /// If the polynomial is exactly one atom with coefficient one, that atom.
    pub fn as_atom(&self) -> Option<&Expr> {
        match self.terms.as_slice() {
            [t] if t.coefficient.is_one() => t.as_linear(),
            _ => None,
        }
    }

    /// Every atom of every term.
    pub fn atoms(&self) -> impl Iterator<Item = &Expr> {
        self.terms.iter().flat_map(|t| t.atoms.iter())
    }

    pub fn add(&self, other: &Polynomial) -> Polynomial {
        let mut terms = self.terms.clone();
        terms.extend(other.terms.iter().cloned());
        Polynomial::from_terms(terms)
    }

    pub fn subtract(&self, other: &Polynomial) -> Polynomial {
        self.add(&other.negate())
    }

    pub fn negate(&self) -> Polynomial {
        Polynomial::from_terms(
            self.terms
                .iter()
                .map(|t| Term {
                    coefficient: -&t.coefficient,
                    atoms: t.atoms.clone(),
                })
                .collect(),
        )
    }

    pub fn multiply(&self, other: &Polynomial) -> Polynomial {
        if self.is_zero() || other.is_zero() {
            return Polynomial::zero();
        }
        let mut terms = vec![];
        for a in &self.terms {
            for b in &other.terms {
                terms.push(a.multiply(b));
            }
        }
        Polynomial::from_terms(terms)
    }

    pub fn scale(&self, factor: &BigInt) -> Polynomial {
        if factor.is_zero() {
            return Polynomial::zero();
        }
        Polynomial::from_terms(
            self.terms
                .iter()
                .map(|t| Term::new(&t.coefficient * factor, t.atoms.clone()))
                .collect(),
        )
    }

    /// The positive gcd of all coefficients. Zero only for the zero polynomial.
    pub fn gcd(&self) -> BigInt {
        self.terms
            .iter()
            .fold(BigInt::zero(), |g, t| g.gcd(&t.coefficient))
    }

    /// Divides every coefficient by their gcd. The sign of each coefficient is preserved, so
    /// `p == 0` and `factorise(p) == 0` have the same truth value.
    pub fn factorise(&self) -> Polynomial {
        let g = self.gcd();
        if g.is_zero() || g.is_one() {
            return self.clone();
        }
        Polynomial::from_terms(
            self.terms
                .iter()
                .map(|t| Term::new(&t.coefficient / &g, t.atoms.clone()))
                .collect(),
        )
    }

    /// The positive gcd of the coefficients of the non-constant terms.
    pub fn variable_gcd(&self) -> BigInt {
        self.terms
            .iter()
            .filter(|t| !t.is_constant())
            .fold(BigInt::zero(), |g, t| g.gcd(&t.coefficient))
    }

    /// Normalises `p >= 0` over the integers: divides the non-constant coefficients by their
    /// gcd and rounds the constant down, which gives an equivalent, tighter bound.
    pub fn tighten(&self) -> Polynomial {
        let g = self.variable_gcd();
        if g.is_zero() || g.is_one() {
            return self.clone();
        }
        Polynomial::from_terms(
            self.terms
                .iter()
                .map(|t| {
                    if t.is_constant() {
                        Term::new(t.coefficient.div_floor(&g), vec![])
                    } else {
                        Term::new(&t.coefficient / &g, t.atoms.clone())
                    }
                })
                .collect(),
        )
    }

    /// Splits into (positive part, negated negative part), so that
    /// `self == positive - negative` and both parts have only positive coefficients.
    pub fn split(&self) -> (Polynomial, Polynomial) {
        let mut positive = vec![];
        let mut negative = vec![];
        for t in &self.terms {
            if t.coefficient.is_positive() {
                positive.push(t.clone());
            } else if t.coefficient.is_negative() {
                negative.push(Term::new(-&t.coefficient, t.atoms.clone()));
            }
        }
        (Polynomial::from_terms(positive), Polynomial::from_terms(negative))
    }

    /// If `self - other` is a constant, that constant.
    pub fn offset_from(&self, other: &Polynomial) -> Option<BigInt> {
        self.subtract(other).as_constant().cloned()
    }

    /// The largest atom that appears as a linear term, with its coefficient.
    pub fn max_linear(&self) -> Option<(&Expr, &BigInt)> {
        self.terms
            .iter()
            .filter_map(|t| t.as_linear().map(|a| (a, &t.coefficient)))
            .max_by(|a, b| a.0.cmp(b.0))
    }

    /// Rewrites every atom and renormalises, since an atom can turn into an arithmetic
    /// expression.
    pub fn map_atoms(&self, f: &mut dyn FnMut(&Expr) -> Expr) -> Polynomial {
        let mut answer = Polynomial::zero();
        for t in &self.terms {
            let mut product = Polynomial::constant(t.coefficient.clone());
            for atom in &t.atoms {
                product = product.multiply(&Polynomial::from_expr(&f(atom)));
            }
            answer = answer.add(&product);
        }
        answer
    }

    pub fn substitute(&self, subst: &Substitution) -> Polynomial {
        self.map_atoms(&mut |atom| atom.substitute(subst))
    }

    /// Converts back into an expression. `from_expr(p.to_expr()) == p`.
    pub fn to_expr(&self) -> Expr {
        if self.terms.len() == 1 {
            return self.terms[0].to_expr();
        }
        Expr::Add(self.terms.iter().map(|t| t.to_expr()).collect())
    }
}

impl Ord for Polynomial {
    /// Orders by term count, then term by term on atoms and then coefficients.
    fn cmp(&self, other: &Self) -> Ordering {
        self.terms
            .len()
            .cmp(&other.terms.len())
            .then_with(|| {
                for (a, b) in self.terms.iter().zip(other.terms.iter()) {
                    let c = a.atoms.cmp(&b.atoms);
                    if c != Ordering::Equal {
                        return c;
                    }
                }
                Ordering::Equal
            })
            .then_with(|| {
                for (a, b) in self.terms.iter().zip(other.terms.iter()) {
                    let c = a.coefficient.cmp(&b.coefficient);
                    if c != Ordering::Equal {
                        return c;
                    }
                }
                Ordering::Equal
            })
    }
}

impl PartialOrd for Polynomial {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Polynomial {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (i, t) in self.terms.iter().enumerate() {
            let magnitude = t.coefficient.abs();
            if i == 0 {
                if t.coefficient.is_negative() {
                    write!(f, "-")?;
                }
            } else if t.coefficient.is_negative() {
                write!(f, " - ")?;
            } else {
                write!(f, " + ")?;
            }
            if t.atoms.is_empty() {
                write!(f, "{}", magnitude)?;
                continue;
            }
            if !magnitude.is_one() {
                write!(f, "{}*", magnitude)?;
            }
            for (j, atom) in t.atoms.iter().enumerate() {
                if j > 0 {
                    write!(f, "*")?;
                }
                write!(f, "{}", atom)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn x() -> Expr {
        Expr::var("x")
    }

    fn y() -> Expr {
        Expr::var("y")
    }

    #[test]
    fn test_normal_form_merges_and_drops_terms() {
        // (x + 2) + (3 - x) + y*x - x*y
        let e = Expr::Add(vec![
            Expr::add(x(), Expr::int(2)),
            Expr::sub(Expr::int(3), x()),
            Expr::mul(y(), x()),
            Expr::Negate(Box::new(Expr::mul(x(), y()))),
        ]);
        let p = Polynomial::from_expr(&e);
        assert_eq!(p, Polynomial::int(5));
        assert_eq!(format!("{}", p), "5");
    }

    #[test]
    fn test_adding_the_negation_gives_zero() {
        let p = Polynomial::from_expr(&Expr::Add(vec![
            Expr::mul(Expr::int(3), x()),
            Expr::length(y()),
            Expr::int(-7),
        ]));
        let sum = p.add(&p.negate());
        assert!(sum.is_zero());
        assert_eq!(sum.terms().len(), 1);
    }

    #[test]
    fn test_multiply_distributes() {
        // (x + 1) * (x - 1) = x*x - 1
        let a = Polynomial::from_expr(&Expr::add(x(), Expr::int(1)));
        let b = Polynomial::from_expr(&Expr::sub(x(), Expr::int(1)));
        let product = a.multiply(&b);
        assert_eq!(product.terms().len(), 2);
        assert_eq!(product.constant_term(), BigInt::from(-1));
        assert_eq!(format!("{}", product), "-1 + x*x");
    }

    #[test]
    fn test_factorise_keeps_signs() {
        let p = Polynomial::from_expr(&Expr::Add(vec![
            Expr::mul(Expr::int(-4), x()),
            Expr::mul(Expr::int(6), y()),
            Expr::int(2),
        ]));
        let f = p.factorise();
        assert_eq!(f.coefficient_of(&x()), BigInt::from(-2));
        assert_eq!(f.coefficient_of(&y()), BigInt::from(3));
        assert_eq!(f.constant_term(), BigInt::from(1));
    }

    #[test]
    fn test_tighten_rounds_the_constant_down() {
        // 2x - 3 >= 0 is x - 2 >= 0 over the integers
        let p = Polynomial::from_expr(&Expr::sub(Expr::mul(Expr::int(2), x()), Expr::int(3)));
        let t = p.tighten();
        assert_eq!(t.coefficient_of(&x()), BigInt::from(1));
        assert_eq!(t.constant_term(), BigInt::from(-2));
    }

    #[test]
    fn test_constant_division_folds() {
        let e = Expr::Divide(Box::new(Expr::int(-7)), Box::new(Expr::int(2)));
        assert_eq!(Polynomial::from_expr(&e), Polynomial::int(-3));
        let e = Expr::Remainder(Box::new(Expr::int(-7)), Box::new(Expr::int(2)));
        assert_eq!(Polynomial::from_expr(&e), Polynomial::int(-1));
        let e = Expr::Divide(Box::new(x()), Box::new(Expr::int(0)));
        assert!(Polynomial::from_expr(&e).as_atom().is_some());
    }

    #[test]
    fn test_round_trip_through_expressions() {
        let p = Polynomial::from_expr(&Expr::Add(vec![
            Expr::mul(Expr::int(-1), x()),
            Expr::mul(Expr::int(5), Expr::mul(x(), y())),
            Expr::int(9),
        ]));
        assert_eq!(Polynomial::from_expr(&p.to_expr()), p);
    }

    #[test]
    fn test_ordering_by_term_count_first() {
        let one_term = Polynomial::atom(y());
        let two_terms = Polynomial::from_expr(&Expr::add(x(), Expr::int(1)));
        assert!(one_term < two_terms);
        assert!(Polynomial::int(100) < Polynomial::atom(x()));
        assert!(Polynomial::atom(x()) < Polynomial::atom(y()));
    }

    #[test]
    fn test_substitution_renormalises() {
        let p = Polynomial::from_expr(&Expr::mul(Expr::int(2), x()));
        let q = p.substitute(&[(x(), Expr::add(y(), Expr::int(1)))]);
        assert_eq!(q.coefficient_of(&y()), BigInt::from(2));
        assert_eq!(q.constant_term(), BigInt::from(2));
        assert_eq!(q.offset_from(&Polynomial::from_expr(&Expr::mul(Expr::int(2), y()))), Some(BigInt::from(2)));
    }

    #[test]
    #[should_panic]
    fn test_zero_coefficient_with_atoms_is_rejected() {
        Term::new(BigInt::zero(), vec![x()]);
    }
}
