//! Static types as the checker sees them.
//!
//! [`Type`] is deliberately coarse: generics are erased and anything the
//! checker cannot infer is [`Type::Unknown`], which is compatible with
//! everything.

use std::fmt;

use javelin_types::ast::{PrimType, TypeRef};
use javelin_types::library;

// ══════════════════════════════════════════════════════════════════════════════
// Type
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    Prim(PrimType),
    String,
    /// Type of the `null` literal.
    Null,
    /// A class, interface, enum or library type, by simple name.
    Class(std::string::String),
    Array(Box<Type>),
    Void,
    /// Could not be inferred (calls into the library, generics, lambdas).
    Unknown,
}

impl Type {
    /// Convert a declared type. Type parameters become [`Type::Unknown`].
    pub fn from_ref(ty: &TypeRef, is_type_param: impl Fn(&str) -> bool) -> Self {
        match ty {
            TypeRef::Prim(p) => Type::Prim(*p),
            TypeRef::Class { .. } if ty.is_string() => Type::String,
            TypeRef::Class { .. } => match ty.simple_name() {
                Some(name) if !is_type_param(name) => Type::Class(name.to_string()),
                _ => Type::Unknown,
            },
            TypeRef::Array(elem) => Type::Array(Box::new(Type::from_ref(elem, is_type_param))),
            TypeRef::Void => Type::Void,
            TypeRef::Var => Type::Unknown,
        }
    }

    pub fn prim(&self) -> Option<PrimType> {
        match self {
            Type::Prim(p) => Some(*p),
            Type::Class(name) => PrimType::from_wrapper(name),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.prim().is_some_and(PrimType::is_numeric)
    }

    pub fn is_boolean(&self) -> bool {
        self.prim() == Some(PrimType::Boolean)
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Primitive conversions
// ══════════════════════════════════════════════════════════════════════════════

fn rank(p: PrimType) -> u8 {
    match p {
        PrimType::Boolean => 0,
        PrimType::Char => 1,
        PrimType::Int => 2,
        PrimType::Long => 3,
        PrimType::Float => 4,
        PrimType::Double => 5,
    }
}

/// Widening primitive conversion (or identity).
pub fn widens(from: PrimType, to: PrimType) -> bool {
    if from == to {
        return true;
    }
    match (from, to) {
        (PrimType::Boolean, _) | (_, PrimType::Boolean) => false,
        (_, PrimType::Char) => false,
        _ => rank(from) < rank(to),
    }
}

/// Binary numeric promotion.
pub fn promote(a: PrimType, b: PrimType) -> PrimType {
    let wider = if rank(a) >= rank(b) { a } else { b };
    if rank(wider) < rank(PrimType::Int) {
        PrimType::Int
    } else {
        wider
    }
}

/// Reference types a boxed primitive may be assigned to.
fn boxes_into(p: PrimType, target: &str) -> bool {
    target == "Object"
        || target == "Comparable"
        || PrimType::from_wrapper(target) == Some(p)
        || (target == "Number" && p.is_numeric() && p != PrimType::Char)
}

// ══════════════════════════════════════════════════════════════════════════════
// Assignment compatibility
// ══════════════════════════════════════════════════════════════════════════════

/// Answers subtype questions about named classes. `None` means "cannot
/// tell", which the checker treats as compatible.
pub trait Hierarchy {
    fn is_subtype(&self, sub: &str, sup: &str) -> Option<bool>;
}

/// Whether a value of static type `from` may be stored in a variable of type
/// `to`. `int_constant` marks an int literal, which also narrows to `char`.
pub fn assignable(from: &Type, to: &Type, int_constant: bool, classes: &impl Hierarchy) -> bool {
    match (from, to) {
        (Type::Unknown, _) | (_, Type::Unknown) => true,
        (_, Type::Void | Type::Null) | (Type::Void, _) => false,
        // Any value converts to text when the declared type is String.
        (_, Type::String) => true,
        (Type::Null, target) => !matches!(target, Type::Prim(_)),
        (Type::Prim(a), Type::Prim(b)) => {
            widens(*a, *b) || (int_constant && *a == PrimType::Int && *b == PrimType::Char)
        }
        (Type::Prim(a), Type::Class(target)) => {
            boxes_into(*a, target) || library::library_is_a(a.wrapper(), target)
        }
        (Type::Class(name), Type::Prim(b)) => match PrimType::from_wrapper(name) {
            Some(a) => widens(a, *b),
            None => matches!(name.as_str(), "Object" | "Number" | "Comparable"),
        },
        (Type::Class(sub), Type::Class(sup)) => classes.is_subtype(sub, sup).unwrap_or(true),
        (Type::Class(name), Type::Array(_)) => name == "Object",
        (Type::String, Type::Class(target)) => library::library_is_a("String", target),
        (Type::Array(a), Type::Array(b)) => match (a.as_ref(), b.as_ref()) {
            (Type::Prim(x), Type::Prim(y)) => x == y,
            (Type::Prim(_), _) | (_, Type::Prim(_)) => false,
            (x, y) => assignable(x, y, false, classes),
        },
        (Type::Array(_), Type::Class(target)) => target == "Object",
        (Type::Prim(_) | Type::String | Type::Array(_), Type::Prim(_) | Type::Array(_)) => false,
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Display
// ══════════════════════════════════════════════════════════════════════════════

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Prim(p) => f.write_str(p.as_str()),
            Type::String => f.write_str("String"),
            Type::Null => f.write_str("null"),
            Type::Class(name) => f.write_str(name),
            Type::Array(elem) => write!(f, "{elem}[]"),
            Type::Void => f.write_str("void"),
            Type::Unknown => f.write_str("unknown"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Flat;

    impl Hierarchy for Flat {
        fn is_subtype(&self, sub: &str, sup: &str) -> Option<bool> {
            match (sub, sup) {
                ("Dog", "Animal") => Some(true),
                ("Animal", "Dog") => Some(false),
                _ => None,
            }
        }
    }

    fn int() -> Type {
        Type::Prim(PrimType::Int)
    }

    #[test]
    fn test_widening() {
        assert!(widens(PrimType::Int, PrimType::Long));
        assert!(widens(PrimType::Char, PrimType::Int));
        assert!(widens(PrimType::Long, PrimType::Float));
        assert!(!widens(PrimType::Double, PrimType::Int));
        assert!(!widens(PrimType::Int, PrimType::Char));
        assert!(!widens(PrimType::Boolean, PrimType::Int));
    }

    #[test]
    fn test_promotion() {
        assert_eq!(promote(PrimType::Char, PrimType::Char), PrimType::Int);
        assert_eq!(promote(PrimType::Int, PrimType::Long), PrimType::Long);
        assert_eq!(promote(PrimType::Float, PrimType::Long), PrimType::Float);
    }

    #[test]
    fn test_string_into_int_rejected() {
        assert!(!assignable(&Type::String, &int(), false, &Flat));
    }

    #[test]
    fn test_anything_into_string_accepted() {
        assert!(assignable(&int(), &Type::String, false, &Flat));
        assert!(assignable(&Type::Array(Box::new(int())), &Type::String, false, &Flat));
    }

    #[test]
    fn test_int_constant_into_char() {
        let ch = Type::Prim(PrimType::Char);
        assert!(assignable(&int(), &ch, true, &Flat));
        assert!(!assignable(&int(), &ch, false, &Flat));
    }

    #[test]
    fn test_boxing_and_unboxing() {
        let integer = Type::Class("Integer".into());
        assert!(assignable(&int(), &integer, false, &Flat));
        assert!(assignable(&integer, &Type::Prim(PrimType::Long), false, &Flat));
        assert!(assignable(&int(), &Type::Class("Object".into()), false, &Flat));
        assert!(!assignable(&Type::Prim(PrimType::Boolean), &integer, false, &Flat));
    }

    #[test]
    fn test_class_hierarchy() {
        let dog = Type::Class("Dog".into());
        let animal = Type::Class("Animal".into());
        assert!(assignable(&dog, &animal, false, &Flat));
        assert!(!assignable(&animal, &dog, false, &Flat));
        assert!(assignable(&Type::Null, &dog, false, &Flat));
        assert!(!assignable(&Type::Null, &int(), false, &Flat));
    }

    #[test]
    fn test_unknown_is_compatible() {
        assert!(assignable(&Type::Unknown, &int(), false, &Flat));
        assert!(assignable(&Type::String, &Type::Unknown, false, &Flat));
    }
}
