use std::fmt;
use std::io;

use crate::kernel::name::Name;

/// The kind of declaration a name is expected to resolve to.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DeclarationKind {
    Type,
    Function,
    Macro,

    // Either a function or a macro.
    Callable,
}

impl fmt::Display for DeclarationKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DeclarationKind::Type => write!(f, "type"),
            DeclarationKind::Function => write!(f, "function"),
            DeclarationKind::Macro => write!(f, "macro"),
            DeclarationKind::Callable => write!(f, "function or macro"),
        }
    }
}

#[derive(Debug)]
pub enum Error {
    // A name could not be bound to a declaration of the expected kind.
    // This aborts the proof attempt for the current assertion only.
    Resolution(Name, DeclarationKind),

    // A variable was used without being declared in any enclosing scope.
    UnboundVariable(Name),

    // An expression was used in a position its type does not support,
    // for example indexing into something that is not an array.
    IllTyped(String),

    // Something went wrong, it's our fault, and we can't figure out what it is
    Internal(String),

    // Trouble reading or writing proof units and reports.
    Io(io::Error),

    // A proof unit or configuration file could not be decoded.
    Json(serde_json::Error),
}

impl Error {
    pub fn resolution(name: &Name, kind: DeclarationKind) -> Error {
        Error::Resolution(name.clone(), kind)
    }

    pub fn ill_typed<T: Into<String>>(s: T) -> Error {
        Error::IllTyped(s.into())
    }

    pub fn internal<T: Into<String>>(s: T) -> Error {
        Error::Internal(s.into())
    }

    /// Resolution-style errors abort only the current assertion.
    /// Everything else indicates trouble with the run as a whole.
    pub fn is_resolution(&self) -> bool {
        matches!(
            self,
            Error::Resolution(..) | Error::UnboundVariable(_) | Error::IllTyped(_)
        )
    }

    pub fn error_type(&self) -> &'static str {
        match self {
            Error::Resolution(..) => "Resolution",
            Error::UnboundVariable(_) => "UnboundVariable",
            Error::IllTyped(_) => "IllTyped",
            Error::Internal(_) => "Internal",
            Error::Io(_) => "Io",
            Error::Json(_) => "Json",
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Resolution(name, kind) => {
                write!(f, "unable to resolve '{}' as a {}", name, kind)
            }
            Error::UnboundVariable(name) => write!(f, "unknown variable '{}'", name),
            Error::IllTyped(s) => write!(f, "ill-typed expression: {}", s),
            Error::Internal(s) => write!(f, "internal error: {}", s),
            Error::Io(e) => write!(f, "{}", e),
            Error::Json(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for Error {}

impl From<io::Error> for Error {
    fn from(error: io::Error) -> Self {
        Error::Io(error)
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Error::Json(error)
    }
}
