//! Classes every program can use without declaring them.
//!
//! They are ordinary class declarations, loaded ahead of the program, so
//! program classes extend them and catch them like their own. Behaviour that
//! needs the runtime (thread start/join, exception rendering) is attached
//! natively by the dispatcher.

use javelin_types::ast::ClassDecl;
use javelin_types::build::*;
use javelin_types::library::THROWABLES;

/// Class of the entries `HashMap.entrySet()` hands out.
pub const MAP_ENTRY: &str = "Map$Entry";

pub fn prelude_classes() -> Vec<ClassDecl> {
    let mut classes = vec![class("Object").build(), throwable(), thread(), map_entry()];
    for (cls, parent) in THROWABLES {
        classes.push(
            class(cls)
                .extends(parent)
                .ctor(&[], vec![])
                .ctor(&[("String", "message")], vec![super_ctor(vec![name("message")])])
                .ctor(
                    &[("String", "message"), ("Throwable", "cause")],
                    vec![super_ctor(vec![name("message"), name("cause")])],
                )
                .build(),
        );
    }
    classes
}

fn throwable() -> ClassDecl {
    class("Throwable")
        .field("String", "message")
        .field("Throwable", "cause")
        .ctor(&[], vec![])
        .ctor(
            &[("String", "message")],
            vec![set(this_field("message"), name("message"))],
        )
        .ctor(
            &[("String", "message"), ("Throwable", "cause")],
            vec![
                set(this_field("message"), name("message")),
                set(this_field("cause"), name("cause")),
            ],
        )
        .method(method("String", "getMessage", &[], vec![ret(this_field("message"))]))
        .method(method(
            "String",
            "getLocalizedMessage",
            &[],
            vec![ret(this_field("message"))],
        ))
        .method(method("Throwable", "getCause", &[], vec![ret(this_field("cause"))]))
        .build()
}

/// `Thread` runs its target unless a subclass overrides `run`. `start` and
/// `join` are native.
fn thread() -> ClassDecl {
    class("Thread")
        .implements("Runnable")
        .field("Runnable", "target")
        .ctor(&[], vec![])
        .ctor(
            &[("Runnable", "target")],
            vec![set(this_field("target"), name("target"))],
        )
        .method(method(
            "void",
            "run",
            &[],
            vec![if_(
                ne(this_field("target"), null()),
                vec![stmt(invoke(this_field("target"), "run", vec![]))],
            )],
        ))
        .build()
}

fn map_entry() -> ClassDecl {
    class(MAP_ENTRY)
        .implements("Entry")
        .field("Object", "key")
        .field("Object", "value")
        .ctor(
            &[("Object", "key"), ("Object", "value")],
            vec![
                set(this_field("key"), name("key")),
                set(this_field("value"), name("value")),
            ],
        )
        .method(method("Object", "getKey", &[], vec![ret(this_field("key"))]))
        .method(method("Object", "getValue", &[], vec![ret(this_field("value"))]))
        .method(method(
            "String",
            "toString",
            &[],
            vec![ret(add(add(this_field("key"), string("=")), this_field("value")))],
        ))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prelude_names_unique() {
        let classes = prelude_classes();
        let mut names: Vec<_> = classes.iter().map(|c| c.name.name.clone()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), classes.len());
    }

    #[test]
    fn test_exceptions_have_message_ctor() {
        let classes = prelude_classes();
        let npe = classes
            .iter()
            .find(|c| c.name.name == "NullPointerException")
            .unwrap();
        assert!(npe.constructors.iter().any(|c| c.params.len() == 1));
    }
}
