use std::{fmt, rc::Rc};

/// Name of a variable, field, function or module.
///
/// Deliberately not `Borrow<str>`: lookups go through an `Identifier`, never a
/// bare string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identifier(Rc<str>);

impl Identifier {
    pub fn new(name: impl Into<Rc<str>>) -> Self {
        Identifier(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Identifier {
    fn from(value: &str) -> Self {
        Identifier::new(value)
    }
}

impl From<String> for Identifier {
    fn from(value: String) -> Self {
        Identifier::new(value)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::Identifier;
    use rustc_hash::FxHashSet;

    #[test]
    fn equal_names_hash_together() {
        let mut set = FxHashSet::default();
        set.insert(Identifier::from("x"));
        assert!(set.contains(&Identifier::new(String::from("x"))));
        assert!(!set.contains(&Identifier::from("y")));
    }

    #[test]
    fn displays_bare_name() {
        assert_eq!(Identifier::from("accumulator").to_string(), "accumulator");
    }
}
