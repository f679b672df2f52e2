//! Function signatures.

use crate::types::Type;
use std::fmt;

/// Structural descriptor of a function: name, argument types and return
/// type. Two signatures with equal parts are interchangeable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Signature {
    name: String,
    return_type: Type,
    argument_types: Vec<Type>,
}

impl Signature {
    pub fn new(name: impl Into<String>, return_type: Type, argument_types: Vec<Type>) -> Self {
        Self {
            name: name.into(),
            return_type,
            argument_types,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn return_type(&self) -> Type {
        self.return_type
    }

    pub fn argument_types(&self) -> &[Type] {
        &self.argument_types
    }

    pub fn arity(&self) -> usize {
        self.argument_types.len()
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, t) in self.argument_types.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", t)?;
        }
        write!(f, "):{}", self.return_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_structural_identity() {
        let a = Signature::new("add", Type::Bigint, vec![Type::Bigint, Type::Bigint]);
        let b = Signature::new("add", Type::Bigint, vec![Type::Bigint, Type::Bigint]);
        let c = Signature::new("add", Type::Double, vec![Type::Double, Type::Double]);
        assert_eq!(a, b);
        assert_ne!(a, c);

        let mut map = HashMap::new();
        map.insert(a, 1);
        assert_eq!(map.get(&b), Some(&1));
        assert_eq!(map.get(&c), None);
    }

    #[test]
    fn test_display() {
        let sig = Signature::new("current_user", Type::Varchar, vec![]);
        assert_eq!(sig.to_string(), "current_user():varchar");
        assert_eq!(sig.arity(), 0);
    }
}
