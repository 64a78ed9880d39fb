use num_bigint::BigInt;
use num_traits::{Signed, ToPrimitive};

use crate::formula::Formula;
use crate::kernel::expr::Expr;
use crate::polynomial::Polynomial;

/// Folds constructions that are immediately taken apart again, such as indexing into an
/// array literal, and normalises integer arithmetic.
pub fn simplify_expr(e: &Expr) -> Expr {
    fold(e.map_children(&mut |c| simplify_expr(c)))
}

fn constant_index(index: &Expr) -> Option<usize> {
    index.as_int().and_then(|i| i.to_usize())
}

// Assumes the children are already simplified.
fn fold(e: Expr) -> Expr {
    match e {
        Expr::ArrayAccess(array, index) => match *array {
            Expr::ArrayInitialiser(mut es) => match constant_index(&index) {
                Some(i) if i < es.len() => es.swap_remove(i),
                _ => Expr::ArrayAccess(Box::new(Expr::ArrayInitialiser(es)), index),
            },
            Expr::ArrayGenerator { value, .. } => *value,
            Expr::ArrayUpdate {
                array: inner,
                index: updated,
                value,
            } => {
                if updated == index {
                    *value
                } else if updated.is_constant() && index.is_constant() {
                    fold(Expr::ArrayAccess(inner, index))
                } else {
                    Expr::ArrayAccess(
                        Box::new(Expr::ArrayUpdate {
                            array: inner,
                            index: updated,
                            value,
                        }),
                        index,
                    )
                }
            }
            array => Expr::ArrayAccess(Box::new(array), index),
        },
        Expr::ArrayLength(array) => match *array {
            Expr::ArrayInitialiser(es) => Expr::int(es.len() as i64),
            Expr::ArrayGenerator { length, .. } => *length,
            Expr::ArrayUpdate { array: inner, .. } => fold(Expr::ArrayLength(inner)),
            array => Expr::ArrayLength(Box::new(array)),
        },
        Expr::ArrayUpdate {
            array,
            index,
            value,
        } => match (*array, constant_index(&index)) {
            (Expr::ArrayInitialiser(mut es), Some(i)) if i < es.len() => {
                es[i] = *value;
                Expr::ArrayInitialiser(es)
            }
            (array, _) => Expr::ArrayUpdate {
                array: Box::new(array),
                index,
                value,
            },
        },
        Expr::RecordAccess(record, field) => match *record {
            Expr::RecordInitialiser(fields) => {
                match fields.iter().position(|(name, _)| *name == field) {
                    Some(i) => fields[i].1.clone(),
                    None => Expr::RecordAccess(Box::new(Expr::RecordInitialiser(fields)), field),
                }
            }
            Expr::RecordUpdate {
                record: inner,
                field: updated,
                value,
            } => {
                if updated == field {
                    *value
                } else {
                    fold(Expr::RecordAccess(inner, field))
                }
            }
            record => Expr::RecordAccess(Box::new(record), field),
        },
        Expr::RecordUpdate {
            record,
            field,
            value,
        } => match *record {
            Expr::RecordInitialiser(mut fields) => {
                match fields.iter().position(|(name, _)| *name == field) {
                    Some(i) => {
                        fields[i].1 = *value;
                        Expr::RecordInitialiser(fields)
                    }
                    None => Expr::RecordUpdate {
                        record: Box::new(Expr::RecordInitialiser(fields)),
                        field,
                        value,
                    },
                }
            }
            record => Expr::RecordUpdate {
                record: Box::new(record),
                field,
                value,
            },
        },
        e if e.is_arithmetic() => Polynomial::from_expr(&e).to_expr(),
        e => e,
    }
}

/// Brings a formula into its simplest canonical form.
///
/// Expressions are folded, constant comparisons collapse to truths, a conjunction holding
/// some formula and its negation becomes false (dually for disjunctions), and so does one
/// holding two bounds that cannot both hold, such as `x >= 1` and `0 >= x`.
/// Quantified variables the body never mentions are dropped when their type has values.
pub fn simplify(f: &Formula) -> Formula {
    match f {
        Formula::Truth(_) => f.clone(),
        Formula::Conjunct(fs) => {
            let g = Formula::and(fs.iter().map(simplify).collect());
            match &g {
                Formula::Conjunct(parts)
                    if has_complement(parts)
                        || has_bound_pair(parts, &|c: &BigInt| c.is_negative()) =>
                {
                    Formula::Truth(false)
                }
                _ => g,
            }
        }
        Formula::Disjunct(fs) => {
            let g = Formula::or(fs.iter().map(simplify).collect());
            // If neither `a >= 0` nor `b >= 0` holds then a + b <= -2.
            let minus_one = BigInt::from(-1);
            match &g {
                Formula::Disjunct(parts)
                    if has_complement(parts)
                        || has_bound_pair(parts, &|c: &BigInt| *c >= minus_one) =>
                {
                    Formula::Truth(true)
                }
                _ => g,
            }
        }
        Formula::Quantifier {
            universal,
            params,
            body,
        } => {
            let body = simplify(body);
            let params = params
                .iter()
                .filter(|p| body.mentions(&p.name) || !p.var_type.is_inhabited())
                .cloned()
                .collect();
            Formula::quantifier(*universal, params, body)
        }
        _ => f.map_ground(&mut |e| simplify_expr(e)),
    }
}

// Parts are sorted, so lookups can binary search.
fn has_complement(parts: &[Formula]) -> bool {
    parts
        .iter()
        .any(|p| parts.binary_search(&p.negate()).is_ok())
}

// Whether two inequalities `a >= 0` and `b >= 0` among the parts have a constant sum a + b
// that satisfies the test.
fn has_bound_pair(parts: &[Formula], test: &dyn Fn(&BigInt) -> bool) -> bool {
    let differences: Vec<Polynomial> = parts
        .iter()
        .filter_map(|p| match p {
            Formula::Inequality { lhs, rhs } => Some(lhs.subtract(rhs)),
            _ => None,
        })
        .collect();
    differences.iter().enumerate().any(|(i, a)| {
        differences[i + 1..]
            .iter()
            .any(|b| a.add(b).as_constant().map_or(false, |c| test(c)))
    })
}
