use serde::{Deserialize, Serialize};
use std::fmt;

/// An identifier for a variable, field, type, function or macro.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Name(String);

impl Name {
    pub fn new(s: &str) -> Name {
        Name(s.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The name with any skolemization suffix removed.
    /// Fresh names are built as "base$n", so this recovers "base".
    pub fn base(&self) -> &str {
        match self.0.find('$') {
            Some(i) => &self.0[..i],
            None => &self.0,
        }
    }

    /// Builds the n-th fresh variant of this name.
    pub fn fresh(&self, n: usize) -> Name {
        Name(format!("{}${}", self.base(), n))
    }
}

impl From<&str> for Name {
    fn from(s: &str) -> Self {
        Name::new(s)
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_names_share_a_base() {
        let x = Name::new("x");
        let x3 = x.fresh(3);
        assert_eq!(x3.as_str(), "x$3");
        assert_eq!(x3.base(), "x");
        assert_eq!(x3.fresh(4).as_str(), "x$4");
    }
}
