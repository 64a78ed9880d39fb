use serde::{Deserialize, Serialize};
use std::fmt;

use crate::kernel::name::Name;

/// One field of a record type.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct FieldDecl {
    pub name: Name,
    pub field_type: Type,
}

/// A record type. Fields are kept sorted by name.
/// An open record `{int f, ...}` admits any record that has at least the listed fields.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct RecordType {
    pub fields: Vec<FieldDecl>,
    pub open: bool,
}

impl RecordType {
    pub fn field(&self, name: &Name) -> Option<&Type> {
        self.fields
            .binary_search_by(|f| f.name.cmp(name))
            .ok()
            .map(|i| &self.fields[i].field_type)
    }

    pub fn has_field(&self, name: &Name) -> bool {
        self.field(name).is_some()
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct FunctionType {
    pub params: Vec<Type>,
    pub returns: Vec<Type>,
}

/// A type expression.
///
/// Types are plain trees. Use the smart constructors (`union`, `intersection`, `negation`, ...)
/// to keep them flattened, which matters because type tests are deduplicated structurally.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum Type {
    // The empty type. No value has it.
    Void,

    // The type every value has.
    Any,

    Null,
    Bool,
    Int,
    Array(Box<Type>),
    Record(RecordType),
    Function(FunctionType),

    // A reference to a named type declaration, which may carry an invariant.
    Nominal(Name),

    Union(Vec<Type>),
    Intersection(Vec<Type>),
    Negation(Box<Type>),
}

impl Type {
    pub fn array(element: Type) -> Type {
        Type::Array(Box::new(element))
    }

    pub fn nominal(name: &str) -> Type {
        Type::Nominal(Name::new(name))
    }

    pub fn record(fields: Vec<(&str, Type)>, open: bool) -> Type {
        let fields = fields
            .into_iter()
            .map(|(name, field_type)| FieldDecl {
                name: Name::new(name),
                field_type,
            })
            .collect();
        Type::record_from(fields, open)
    }

    pub fn record_from(mut fields: Vec<FieldDecl>, open: bool) -> Type {
        fields.sort();
        fields.dedup_by(|a, b| a.name == b.name);
        Type::Record(RecordType { fields, open })
    }

    pub fn function(params: Vec<Type>, returns: Vec<Type>) -> Type {
        Type::Function(FunctionType { params, returns })
    }

    /// Flattens nested unions, drops void, and absorbs into any.
    pub fn union(types: Vec<Type>) -> Type {
        let mut flat = vec![];
        for t in types {
            match t {
                Type::Union(inner) => flat.extend(inner),
                Type::Void => {}
                Type::Any => return Type::Any,
                t => flat.push(t),
            }
        }
        flat.sort();
        flat.dedup();
        match flat.len() {
            0 => Type::Void,
            1 => flat.pop().unwrap_or(Type::Void),
            _ => Type::Union(flat),
        }
    }

    /// Flattens nested intersections, drops any, and absorbs into void.
    pub fn intersection(types: Vec<Type>) -> Type {
        let mut flat = vec![];
        for t in types {
            match t {
                Type::Intersection(inner) => flat.extend(inner),
                Type::Any => {}
                Type::Void => return Type::Void,
                t => flat.push(t),
            }
        }
        flat.sort();
        flat.dedup();
        match flat.len() {
            0 => Type::Any,
            1 => flat.pop().unwrap_or(Type::Any),
            _ => Type::Intersection(flat),
        }
    }

    pub fn negation(t: Type) -> Type {
        match t {
            Type::Negation(inner) => *inner,
            Type::Any => Type::Void,
            Type::Void => Type::Any,
            t => Type::Negation(Box::new(t)),
        }
    }

    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            Type::Void | Type::Any | Type::Null | Type::Bool | Type::Int
        )
    }

    /// Whether some value certainly has this type, without consulting any declaration.
    /// Nominal types, intersections and negations answer false since they may be empty.
    pub fn is_inhabited(&self) -> bool {
        match self {
            Type::Void | Type::Nominal(_) | Type::Intersection(_) | Type::Negation(_) => false,
            Type::Any | Type::Null | Type::Bool | Type::Int | Type::Array(_) => true,
            Type::Function(ft) => ft.returns.iter().all(|t| t.is_inhabited()),
            Type::Record(r) => r.fields.iter().all(|f| f.field_type.is_inhabited()),
            Type::Union(types) => types.iter().any(|t| t.is_inhabited()),
        }
    }
}

fn write_joined(f: &mut fmt::Formatter, types: &[Type], sep: &str) -> fmt::Result {
    for (i, t) in types.iter().enumerate() {
        if i > 0 {
            write!(f, "{}", sep)?;
        }
        match t {
            Type::Union(_) | Type::Intersection(_) => write!(f, "({})", t)?,
            _ => write!(f, "{}", t)?,
        }
    }
    Ok(())
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Type::Void => write!(f, "void"),
            Type::Any => write!(f, "any"),
            Type::Null => write!(f, "null"),
            Type::Bool => write!(f, "bool"),
            Type::Int => write!(f, "int"),
            Type::Array(element) => match element.as_ref() {
                Type::Union(_) | Type::Intersection(_) | Type::Negation(_) => {
                    write!(f, "({})[]", element)
                }
                _ => write!(f, "{}[]", element),
            },
            Type::Record(record) => {
                write!(f, "{{")?;
                for (i, field) in record.fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{} {}", field.field_type, field.name)?;
                }
                if record.open {
                    if record.fields.is_empty() {
                        write!(f, "...")?;
                    } else {
                        write!(f, ", ...")?;
                    }
                }
                write!(f, "}}")
            }
            Type::Function(ft) => {
                write!(f, "function(")?;
                write_joined(f, &ft.params, ",")?;
                write!(f, ")->(")?;
                write_joined(f, &ft.returns, ",")?;
                write!(f, ")")
            }
            Type::Nominal(name) => write!(f, "{}", name),
            Type::Union(types) => write_joined(f, types, "|"),
            Type::Intersection(types) => write_joined(f, types, "&"),
            Type::Negation(inner) => match inner.as_ref() {
                Type::Union(_) | Type::Intersection(_) => write!(f, "!({})", inner),
                _ => write!(f, "!{}", inner),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_union_flattening() {
        let t = Type::union(vec![
            Type::Int,
            Type::union(vec![Type::Null, Type::Int]),
            Type::Void,
        ]);
        assert_eq!(t, Type::Union(vec![Type::Null, Type::Int]));
        assert_eq!(Type::union(vec![Type::Int, Type::Any]), Type::Any);
        assert_eq!(Type::union(vec![]), Type::Void);
    }

    #[test]
    fn test_intersection_and_negation() {
        assert_eq!(Type::intersection(vec![Type::Any, Type::Int]), Type::Int);
        assert_eq!(Type::intersection(vec![Type::Void, Type::Int]), Type::Void);
        assert_eq!(Type::negation(Type::negation(Type::Bool)), Type::Bool);
        assert_eq!(Type::negation(Type::Any), Type::Void);
    }

    #[test]
    fn test_record_fields_are_sorted() {
        let r = Type::record(vec![("g", Type::Bool), ("f", Type::Int)], true);
        assert_eq!(format!("{}", r), "{int f, bool g, ...}");
        match r {
            Type::Record(record) => {
                assert_eq!(record.field(&Name::new("g")), Some(&Type::Bool));
                assert!(!record.has_field(&Name::new("h")));
            }
            _ => panic!("expected a record"),
        }
    }

    #[test]
    fn test_inhabited_types() {
        assert!(Type::Int.is_inhabited());
        assert!(Type::record(vec![("f", Type::Int)], false).is_inhabited());
        assert!(Type::union(vec![Type::nominal("nat"), Type::Null]).is_inhabited());
        assert!(!Type::Void.is_inhabited());
        assert!(!Type::nominal("nat").is_inhabited());
        assert!(!Type::record(vec![("f", Type::nominal("Loop"))], false).is_inhabited());
    }
}
