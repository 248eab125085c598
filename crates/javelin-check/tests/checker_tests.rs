//! Static phase integration tests.
//!
//! Each test builds a program with `javelin_types::build`, runs it through
//! `javelin_check::check` and asserts on the presence (or absence) of
//! specific error codes.

use javelin_types::ast::Program;
use javelin_types::build::*;
use javelin_types::{CompileErrors, ErrorCode, SourceFile};

// ══════════════════════════════════════════════════════════════════════════════
// Helpers
// ══════════════════════════════════════════════════════════════════════════════

fn codes(errors: &CompileErrors) -> Vec<String> {
    errors
        .errors
        .iter()
        .map(|e| format!("{}: {}", e.code, e.message))
        .collect()
}

fn assert_ok(prog: &Program) {
    let errors = javelin_check::check(prog);
    assert!(
        !errors.has_errors(),
        "expected no errors, got {}:\n{:#?}",
        errors.total_errors,
        codes(&errors)
    );
}

fn assert_error(prog: &Program, expected_code: ErrorCode) {
    let errors = javelin_check::check(prog);
    assert!(
        errors.errors.iter().any(|e| e.code == expected_code),
        "expected error code {:?}, got codes: {:?}",
        expected_code,
        codes(&errors)
    );
}

fn main_only(stmts: Vec<javelin_types::ast::Stmt>) -> Program {
    program(vec![], stmts)
}

// ══════════════════════════════════════════════════════════════════════════════
// Clean programs
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_class_hierarchy_program_passes() {
    let prog = program(
        vec![
            class("A")
                .method(method("String", "name", &[], vec![ret(string("A"))]))
                .build(),
            class("B")
                .extends("A")
                .method(method("String", "name", &[], vec![ret(string("B"))]))
                .build(),
            class("C")
                .extends("B")
                .method(method(
                    "String",
                    "name",
                    &[],
                    vec![ret(super_call(2, "name", vec![]))],
                ))
                .build(),
        ],
        vec![
            local("A", "a", new("C", vec![])),
            println(invoke(name("a"), "name", vec![])),
        ],
    );
    assert_ok(&prog);
}

#[test]
fn test_generics_and_collections_pass() {
    let prog = program(
        vec![class("Box")
            .type_param("T")
            .field("T", "value")
            .method(method("T", "get", &[], vec![ret(name("value"))]))
            .build()],
        vec![
            local("List<Integer>", "xs", new("ArrayList<>", vec![])),
            stmt(invoke(name("xs"), "add", vec![int(1)])),
            local("int", "first", invoke(name("xs"), "get", vec![int(0)])),
            local("Map<String, List<Integer>>", "m", new("HashMap<>", vec![])),
            local("Box<String>", "b", new("Box<>", vec![])),
            local("var", "n", int(3)),
            local("long", "wide", name("n")),
            local("double", "d", name("wide")),
            local("char", "c", int(65)),
            local("Object", "o", int(7)),
            local("Runnable", "r", lambda_expr(&[], call("println", vec![]))),
        ],
    );
    assert_ok(&prog);
}

#[test]
fn test_labeled_loops_pass() {
    let prog = main_only(vec![labeled(
        "outer",
        for_range(
            "i",
            int(0),
            int(3),
            vec![for_range(
                "j",
                int(0),
                int(3),
                vec![
                    if_(eq(name("j"), int(1)), vec![cont_to("outer")]),
                    if_(eq(name("i"), int(2)), vec![brk_to("outer")]),
                ],
            )],
        ),
    )]);
    assert_ok(&prog);
}

#[test]
fn test_anonymous_class_passes() {
    let prog = program(
        vec![class("Base").ctor(&[("int", "x")], vec![]).build()],
        vec![
            local(
                "Base",
                "b",
                new_anon("Base", vec![int(1)], anon_body("Base")),
            ),
            local(
                "Runnable",
                "r",
                new_anon(
                    "Runnable",
                    vec![],
                    anon_body("Runnable").method(method("void", "run", &[], vec![])),
                ),
            ),
        ],
    );
    assert_ok(&prog);
}

// ══════════════════════════════════════════════════════════════════════════════
// Type errors
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_string_into_int_local() {
    let prog = main_only(vec![local("int", "i", string("Test"))]);
    let errors = javelin_check::check(&prog);
    assert_eq!(errors.total_errors, 1);
    assert_eq!(errors.errors[0].id, "cantAssignValueToLocalVariable");
    assert_eq!(
        errors.errors[0].message,
        "Can't assign a value of type String to a local variable of type int"
    );
}

#[test]
fn test_double_into_int_local() {
    assert_error(
        &main_only(vec![local("int", "i", dbl(1.5))]),
        ErrorCode::CANT_ASSIGN_TO_LOCAL,
    );
}

#[test]
fn test_unrelated_class_into_local() {
    let prog = program(
        vec![class("Cat").build(), class("Dog").build()],
        vec![local("Cat", "c", new("Dog", vec![]))],
    );
    assert_error(&prog, ErrorCode::CANT_ASSIGN_TO_LOCAL);
}

#[test]
fn test_field_initializer_mismatch() {
    let prog = program(
        vec![class("A").field_init("boolean", "flag", int(1)).build()],
        vec![],
    );
    assert_error(&prog, ErrorCode::CANT_ASSIGN_TO_FIELD);
}

#[test]
fn test_unknown_type() {
    assert_error(
        &main_only(vec![local("Widget", "w", null())]),
        ErrorCode::UNKNOWN_TYPE,
    );
    assert_error(
        &main_only(vec![local("List<Widget>", "ws", null())]),
        ErrorCode::UNKNOWN_TYPE,
    );
    assert_error(
        &program(vec![class("A").extends("Missing").build()], vec![]),
        ErrorCode::UNKNOWN_TYPE,
    );
}

#[test]
fn test_constructor_arity() {
    let prog = program(
        vec![
            class("Point")
                .ctor(&[("int", "x"), ("int", "y")], vec![])
                .build(),
            class("Empty").build(),
        ],
        vec![
            local("Point", "p", new("Point", vec![int(1)])),
            local("Empty", "e", new("Empty", vec![int(1)])),
        ],
    );
    let errors = javelin_check::check(&prog);
    assert_eq!(errors.total_errors, 2, "{:?}", codes(&errors));
    assert!(errors.errors.iter().all(|e| e.code == ErrorCode::WRONG_ARG_COUNT));
}

// ══════════════════════════════════════════════════════════════════════════════
// Scope errors
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_duplicate_local() {
    let prog = main_only(vec![local("int", "x", int(1)), local("int", "x", int(2))]);
    assert_error(&prog, ErrorCode::VARIABLE_ALREADY_DECLARED);
}

#[test]
fn test_shadowing_in_nested_block_is_allowed() {
    let prog = main_only(vec![
        block(vec![local("int", "x", int(1))]),
        block(vec![local("int", "x", int(2))]),
    ]);
    assert_ok(&prog);
}

#[test]
fn test_break_outside_loop() {
    assert_error(&main_only(vec![brk()]), ErrorCode::BREAK_OUTSIDE_LOOP);
    assert_error(&main_only(vec![cont()]), ErrorCode::BREAK_OUTSIDE_LOOP);
    assert_error(
        &main_only(vec![while_(boolean(true), vec![brk_to("nowhere")])]),
        ErrorCode::BREAK_OUTSIDE_LOOP,
    );
}

#[test]
fn test_break_inside_switch_is_allowed() {
    let prog = main_only(vec![switch(
        int(1),
        vec![case(vec![int(1)], vec![brk()]), default_case(vec![brk()])],
    )]);
    assert_ok(&prog);
}

#[test]
fn test_break_does_not_cross_lambda() {
    let prog = main_only(vec![while_(
        boolean(true),
        vec![local("Runnable", "r", lambda(&[], vec![brk()]))],
    )]);
    assert_error(&prog, ErrorCode::BREAK_OUTSIDE_LOOP);
}

#[test]
fn test_super_outside_class() {
    assert_error(
        &main_only(vec![stmt(super_call(1, "toString", vec![]))]),
        ErrorCode::SUPER_OUTSIDE_CLASS,
    );
}

#[test]
fn test_super_depth_exceeds_ancestors() {
    let prog = program(
        vec![
            class("A").build(),
            class("B")
                .extends("A")
                .method(method(
                    "void",
                    "m",
                    &[],
                    vec![stmt(super_call(3, "toString", vec![]))],
                ))
                .build(),
        ],
        vec![],
    );
    assert_error(&prog, ErrorCode::INVALID_SUPER_DEPTH);
}

// ══════════════════════════════════════════════════════════════════════════════
// Structure errors
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_cyclic_inheritance() {
    let prog = program(
        vec![
            class("A").extends("B").build(),
            class("B").extends("A").build(),
        ],
        vec![],
    );
    let errors = javelin_check::check(&prog);
    assert_eq!(errors.total_errors, 2);
    assert!(errors.contains_id("cyclicInheritance"));
}

// ══════════════════════════════════════════════════════════════════════════════
// Diagnostics
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_error_quotes_source_line() {
    let source = SourceFile::new("Main.java", "int ok = 1;\nint i = \"Test\";\n");
    let prog = main_only(vec![
        local("int", "ok", int(1)).at(1, 1),
        local("int", "i", string("Test").at(2, 9)).at(2, 1),
    ]);
    let errors = javelin_check::check_source(&prog, &source);
    assert_eq!(errors.total_errors, 1);
    let error = &errors.errors[0];
    assert_eq!(error.file, "Main.java");
    assert_eq!(error.span.start_line, 2);
    assert_eq!(error.source_line, "int i = \"Test\";");
}
