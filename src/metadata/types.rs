//! The resolved type model: type definitions with their methods, and member references.

use std::fmt;

use serde::Serialize;

use crate::metadata::{method::Method, token::Token};

/// A reference to a member declared elsewhere, resolved to readable names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberRef {
    /// `MemberRef` token
    pub token: Token,
    /// Full name of the declaring type, nested types joined with `/`
    pub declaring_type: String,
    /// Member name
    pub name: String,
}

impl MemberRef {
    /// Create a new member reference.
    #[must_use]
    pub fn new(token: Token, declaring_type: &str, name: &str) -> MemberRef {
        MemberRef {
            token,
            declaring_type: declaring_type.to_string(),
            name: name.to_string(),
        }
    }

    /// `true` if this references `name` on `declaring_type`.
    #[must_use]
    pub fn is(&self, declaring_type: &str, name: &str) -> bool {
        self.declaring_type == declaring_type && self.name == name
    }
}

impl fmt::Display for MemberRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.declaring_type, self.name)
    }
}

/// A type defined in the module.
#[derive(Debug, Clone)]
pub struct TypeDef {
    /// `TypeDef` token
    pub token: Token,
    /// Namespace, empty for the global namespace
    pub namespace: String,
    /// Type name
    pub name: String,
    /// Methods owned by this type, in table order
    pub methods: Vec<Method>,
}

impl TypeDef {
    /// Create a new type definition.
    #[must_use]
    pub fn new(token: Token, namespace: &str, name: &str, methods: Vec<Method>) -> TypeDef {
        TypeDef {
            token,
            namespace: namespace.to_string(),
            name: name.to_string(),
            methods,
        }
    }

    /// `Namespace.Name`, or just the name in the global namespace.
    #[must_use]
    pub fn full_name(&self) -> String {
        full_name(&self.namespace, &self.name)
    }
}

pub(crate) fn full_name(namespace: &str, name: &str) -> String {
    if namespace.is_empty() {
        name.to_string()
    } else {
        format!("{namespace}.{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names() {
        let program = TypeDef::new(Token(0x0200_0002), "Demo", "Program", Vec::new());
        assert_eq!(program.full_name(), "Demo.Program");

        let global = TypeDef::new(Token(0x0200_0001), "", "<Module>", Vec::new());
        assert_eq!(global.full_name(), "<Module>");

        let member = MemberRef::new(Token(0x0A00_0001), "System.Convert", "FromBase64String");
        assert!(member.is("System.Convert", "FromBase64String"));
        assert!(!member.is("System.Convert", "ToBase64String"));
        assert_eq!(member.to_string(), "System.Convert::FromBase64String");
    }
}
