//! Type-membership table for library types.
//!
//! Library types have no declaration in the program. The static phase uses
//! this table to accept their names, and the runtime uses it to answer
//! `instanceof` and casts for library values.

// ══════════════════════════════════════════════════════════════════════════════
// Tables
// ══════════════════════════════════════════════════════════════════════════════

/// Concrete library types and the supertypes each one is a member of.
const CONCRETE: &[(&str, &[&str])] = &[
    ("Object", &[]),
    ("String", &["CharSequence", "Comparable"]),
    ("Integer", &["Number", "Comparable"]),
    ("Long", &["Number", "Comparable"]),
    ("Float", &["Number", "Comparable"]),
    ("Double", &["Number", "Comparable"]),
    ("Character", &["Comparable"]),
    ("Boolean", &["Comparable"]),
    ("Number", &[]),
    (
        "ArrayList",
        &["List", "AbstractList", "Collection", "Iterable"],
    ),
    (
        "LinkedList",
        &["List", "Deque", "Queue", "Collection", "Iterable"],
    ),
    ("Stack", &["Vector", "List", "Collection", "Iterable"]),
    ("HashMap", &["Map"]),
    ("HashSet", &["Set", "Collection", "Iterable"]),
    ("Optional", &[]),
    ("LocalDateTime", &["Comparable"]),
    ("Iterator", &[]),
];

/// Library interfaces. Lambdas satisfy any of the functional ones.
const INTERFACES: &[&str] = &[
    "List",
    "AbstractList",
    "Collection",
    "Iterable",
    "Map",
    "Set",
    "Deque",
    "Queue",
    "Vector",
    "CharSequence",
    "Comparable",
    "Comparator",
    "Runnable",
    "Consumer",
    "BiConsumer",
    "Function",
    "BiFunction",
    "Supplier",
    "Predicate",
    "BiPredicate",
    "UnaryOperator",
    "BinaryOperator",
];

const FUNCTIONAL: &[&str] = &[
    "Comparator",
    "Runnable",
    "Consumer",
    "BiConsumer",
    "Function",
    "BiFunction",
    "Supplier",
    "Predicate",
    "BiPredicate",
    "UnaryOperator",
    "BinaryOperator",
];

/// Names usable only as static-member holders (`Math.max`, `System.out`).
const STATIC_HOLDERS: &[&str] = &[
    "Math",
    "System",
    "Collections",
    "Arrays",
    "Assertions",
];

/// Prelude exception classes: (name, superclass). `Throwable` itself
/// extends `Object`.
pub const THROWABLES: &[(&str, &str)] = &[
    ("Exception", "Throwable"),
    ("Error", "Throwable"),
    ("InterruptedException", "Exception"),
    ("RuntimeException", "Exception"),
    ("ArithmeticException", "RuntimeException"),
    ("NullPointerException", "RuntimeException"),
    ("ClassCastException", "RuntimeException"),
    ("IndexOutOfBoundsException", "RuntimeException"),
    ("ArrayIndexOutOfBoundsException", "IndexOutOfBoundsException"),
    ("StringIndexOutOfBoundsException", "IndexOutOfBoundsException"),
    ("NegativeArraySizeException", "RuntimeException"),
    ("IllegalArgumentException", "RuntimeException"),
    ("IllegalStateException", "RuntimeException"),
    ("IllegalThreadStateException", "IllegalArgumentException"),
    ("NumberFormatException", "IllegalArgumentException"),
    ("NoSuchElementException", "RuntimeException"),
    ("EmptyStackException", "RuntimeException"),
    ("UnsupportedOperationException", "RuntimeException"),
    ("StackOverflowError", "Error"),
];

/// Prelude classes outside the exception hierarchy. `Entry` is how programs
/// spell the map entry type (`Map.Entry`).
const PRELUDE_OTHERS: &[&str] = &["Throwable", "Thread", "Entry"];

// ══════════════════════════════════════════════════════════════════════════════
// Queries
// ══════════════════════════════════════════════════════════════════════════════

/// Whether `name` is declared by the runtime prelude.
pub fn is_prelude_type(name: &str) -> bool {
    PRELUDE_OTHERS.contains(&name) || THROWABLES.iter().any(|(n, _)| *n == name)
}

/// Superclass of a prelude class; `Object` for the roots.
pub fn prelude_superclass(name: &str) -> Option<&'static str> {
    if PRELUDE_OTHERS.contains(&name) {
        return Some("Object");
    }
    THROWABLES.iter().find(|(n, _)| *n == name).map(|(_, s)| *s)
}

/// Whether `name` is a library class, interface or static holder.
pub fn is_library_type(name: &str) -> bool {
    CONCRETE.iter().any(|(n, _)| *n == name)
        || INTERFACES.contains(&name)
        || STATIC_HOLDERS.contains(&name)
}

pub fn is_library_interface(name: &str) -> bool {
    INTERFACES.contains(&name)
}

pub fn is_functional_interface(name: &str) -> bool {
    FUNCTIONAL.contains(&name)
}

/// Whether a value of library type `ty` is a member of `target`.
///
/// `Object` is a supertype of everything.
pub fn library_is_a(ty: &str, target: &str) -> bool {
    if ty == target || target == "Object" {
        return true;
    }
    CONCRETE
        .iter()
        .find(|(n, _)| *n == ty)
        .is_some_and(|(_, supers)| supers.contains(&target))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collections_are_iterable() {
        assert!(library_is_a("ArrayList", "List"));
        assert!(library_is_a("ArrayList", "Iterable"));
        assert!(library_is_a("LinkedList", "Deque"));
        assert!(library_is_a("HashSet", "Collection"));
        assert!(!library_is_a("HashMap", "Collection"));
    }

    #[test]
    fn test_everything_is_object() {
        assert!(library_is_a("Optional", "Object"));
        assert!(library_is_a("String", "Object"));
    }

    #[test]
    fn test_prelude_hierarchy() {
        assert!(is_prelude_type("NumberFormatException"));
        assert!(is_prelude_type("Thread"));
        assert!(!is_prelude_type("ArrayList"));
        assert_eq!(prelude_superclass("NumberFormatException"), Some("IllegalArgumentException"));
        assert_eq!(prelude_superclass("Throwable"), Some("Object"));
        assert_eq!(prelude_superclass("Test"), None);
    }

    #[test]
    fn test_known_names() {
        assert!(is_library_type("Math"));
        assert!(is_library_type("Runnable"));
        assert!(!is_library_type("Test"));
        assert!(is_functional_interface("Consumer"));
        assert!(!is_functional_interface("List"));
    }
}
