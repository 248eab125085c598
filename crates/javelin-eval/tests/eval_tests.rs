//! Integration tests for the Javelin runtime.
//!
//! Programs are built with `javelin_types::build`, run end to end through
//! `javelin_eval::run`, and judged by their printed output, their assertion
//! failures and the fatal text of uncaught exceptions.

use javelin_eval::RunReport;
use javelin_types::ast::{AssignOp, Program};
use javelin_types::build::*;
use pretty_assertions::assert_eq;

// ══════════════════════════════════════════════════════════════════════════════
// Helpers
// ══════════════════════════════════════════════════════════════════════════════

/// Run a program and insist it compiled and finished without a fatal error.
fn run_ok(prog: Program) -> RunReport {
    let report = javelin_eval::run(prog);
    assert!(
        !report.compile_errors.has_errors(),
        "unexpected compile errors: {:#?}",
        report.compile_errors.errors
    );
    assert_eq!(report.fatal, None, "output so far:\n{}", report.output);
    report
}

fn lines(prog: Program) -> Vec<String> {
    run_ok(prog)
        .output_lines()
        .into_iter()
        .map(str::to_string)
        .collect()
}

fn main_only(stmts: Vec<javelin_types::ast::Stmt>) -> Program {
    program(vec![], stmts)
}

// ══════════════════════════════════════════════════════════════════════════════
// Inheritance
// ══════════════════════════════════════════════════════════════════════════════

fn abc_hierarchy() -> Vec<javelin_types::ast::ClassDecl> {
    vec![
        class("A")
            .field_init("int", "x", int(1))
            .method(method("String", "name", &[], vec![ret(string("A"))]))
            .build(),
        class("B")
            .extends("A")
            .field_init("int", "x", int(2))
            .method(method("String", "name", &[], vec![ret(string("B"))]))
            .build(),
        class("C")
            .extends("B")
            .field_init("int", "x", int(3))
            .method(method(
                "String",
                "name",
                &[],
                vec![ret(super_call(2, "name", vec![]))],
            ))
            .method(method(
                "void",
                "show",
                &[],
                vec![
                    println(name("x")),
                    println(super_field(1, "x")),
                    println(super_field(2, "x")),
                ],
            ))
            .build(),
    ]
}

#[test]
fn test_super_chain_reaches_shadowed_fields() {
    let prog = program(
        abc_hierarchy(),
        vec![
            local("C", "c", new("C", vec![])),
            stmt(invoke(name("c"), "show", vec![])),
        ],
    );
    assert_eq!(lines(prog), vec!["3", "2", "1"]);
}

#[test]
fn test_super_super_method_skips_a_level() {
    let prog = program(
        abc_hierarchy(),
        vec![
            local("A", "a", new("C", vec![])),
            println(invoke(name("a"), "name", vec![])),
            local("A", "b", new("B", vec![])),
            println(invoke(name("b"), "name", vec![])),
        ],
    );
    assert_eq!(lines(prog), vec!["A", "B"]);
}

#[test]
fn test_array_field_initializer_is_per_instance() {
    let prog = program(
        vec![class("Holder")
            .field_init(
                "int[]",
                "data",
                array("int", vec![int(1), int(2), int(3)]),
            )
            .build()],
        vec![
            local("Holder", "h1", new("Holder", vec![])),
            local("Holder", "h2", new("Holder", vec![])),
            set(index(field(name("h1"), "data"), int(0)), int(99)),
            println(index(field(name("h1"), "data"), int(0))),
            println(index(field(name("h2"), "data"), int(0))),
        ],
    );
    assert_eq!(lines(prog), vec!["99", "1"]);
}

#[test]
fn test_anonymous_class_overrides_base() {
    let prog = program(
        vec![class("Greeter")
            .method(method("String", "greet", &[], vec![ret(string("hello"))]))
            .build()],
        vec![
            local(
                "Greeter",
                "g",
                new_anon(
                    "Greeter",
                    vec![],
                    anon_body("Greeter").method(method(
                        "String",
                        "greet",
                        &[],
                        vec![ret(add(super_call(1, "greet", vec![]), string(" there")))],
                    )),
                ),
            ),
            println(invoke(name("g"), "greet", vec![])),
        ],
    );
    assert_eq!(lines(prog), vec!["hello there"]);
}

#[test]
fn test_inner_class_reads_outer_field() {
    let prog = program(
        vec![class("Outer")
            .field_init("int", "v", int(7))
            .inner(
                class("Inner")
                    .method(method("int", "get", &[], vec![ret(name("v"))]))
                    .build(),
            )
            .build()],
        vec![
            local("Outer", "o", new("Outer", vec![])),
            local("var", "i", new_in(name("o"), "Inner", vec![])),
            set(field(name("o"), "v"), int(8)),
            println(invoke(name("i"), "get", vec![])),
        ],
    );
    assert_eq!(lines(prog), vec!["8"]);
}

#[test]
fn test_varargs_collect_trailing_arguments() {
    let prog = program(
        vec![class("Util")
            .method(static_method(
                "int",
                "sum",
                &[("int...", "xs")],
                vec![
                    local("int", "s", int(0)),
                    for_each(
                        "int",
                        "x",
                        name("xs"),
                        vec![stmt(assign_op(name("s"), AssignOp::Add, name("x")))],
                    ),
                    ret(name("s")),
                ],
            ))
            .build()],
        vec![
            println(invoke(name("Util"), "sum", vec![int(1), int(2), int(3)])),
            println(invoke(name("Util"), "sum", vec![])),
        ],
    );
    assert_eq!(lines(prog), vec!["6", "0"]);
}

#[test]
fn test_failed_cast_is_catchable() {
    let prog = program(
        vec![
            class("Animal").build(),
            class("Dog").extends("Animal").build(),
            class("Cat").extends("Animal").build(),
        ],
        vec![
            local("Animal", "a", new("Cat", vec![])),
            println(instance_of(name("a"), "Animal")),
            println(instance_of(name("a"), "Dog")),
            try_catch(
                vec![local("Dog", "d", cast("Dog", name("a")))],
                vec![catch("ClassCastException", "e", vec![println(string("cce"))])],
                None,
            ),
        ],
    );
    assert_eq!(lines(prog), vec!["true", "false", "cce"]);
}

#[test]
fn test_instance_of_interface_through_superclass() {
    let prog = program(
        vec![
            interface("Shape").build(),
            class("Base").implements("Shape").build(),
            class("Square").extends("Base").build(),
        ],
        vec![
            local("Object", "o", new("Square", vec![])),
            println(instance_of(name("o"), "Shape")),
            println(instance_of(name("o"), "Base")),
            println(instance_of(name("o"), "Runnable")),
        ],
    );
    assert_eq!(lines(prog), vec!["true", "true", "false"]);
}

// ══════════════════════════════════════════════════════════════════════════════
// Static initialization
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_static_block_runs_once_before_first_use() {
    let prog = program(
        vec![class("Config")
            .static_field("int", "base", None)
            .static_block(vec![
                println(string("init")),
                set(field(name("Config"), "base"), int(40)),
            ])
            .build()],
        vec![
            println(string("start")),
            println(add(field(name("Config"), "base"), int(2))),
            println(field(name("Config"), "base")),
        ],
    );
    assert_eq!(lines(prog), vec!["start", "init", "42", "40"]);
}

// ══════════════════════════════════════════════════════════════════════════════
// Control flow
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_switch_falls_through_until_break() {
    let prog = main_only(vec![switch(
        int(2),
        vec![
            case(vec![int(1)], vec![println(string("one"))]),
            case(vec![int(2)], vec![println(string("two"))]),
            case(vec![int(3)], vec![println(string("three")), brk()]),
            default_case(vec![println(string("other"))]),
        ],
    )]);
    assert_eq!(lines(prog), vec!["two", "three"]);
}

#[test]
fn test_labeled_continue_and_break() {
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
                    println(add(add(name("i"), string(",")), name("j"))),
                ],
            )],
        ),
    )]);
    assert_eq!(lines(prog), vec!["0,0", "1,0"]);
}

#[test]
fn test_do_while_runs_body_before_testing() {
    let prog = main_only(vec![
        local("int", "i", int(5)),
        do_while(
            vec![println(name("i")), stmt(post_inc(name("i")))],
            lt(name("i"), int(3)),
        ),
        local("int", "j", int(0)),
        do_while(vec![stmt(post_inc(name("j")))], lt(name("j"), int(4))),
        println(name("j")),
    ]);
    assert_eq!(lines(prog), vec!["5", "4"]);
}

#[test]
fn test_for_each_over_user_iterable() {
    let countdown = class("Countdown")
        .field("int", "n")
        .ctor(&[("int", "n")], vec![set(this_field("n"), name("n"))])
        .method(method("Countdown", "iterator", &[], vec![ret(this())]))
        .method(method(
            "boolean",
            "hasNext",
            &[],
            vec![ret(gt(this_field("n"), int(0)))],
        ))
        .method(method("int", "next", &[], vec![ret(post_dec(this_field("n")))]))
        .build();
    let prog = program(
        vec![countdown],
        vec![for_each(
            "int",
            "k",
            new("Countdown", vec![int(3)]),
            vec![println(name("k"))],
        )],
    );
    assert_eq!(lines(prog), vec!["3", "2", "1"]);
}

#[test]
fn test_switch_on_enum_constants() {
    let color = enumeration("Color")
        .constant("RED", vec![])
        .constant("GREEN", vec![])
        .constant("BLUE", vec![])
        .build();
    let prog = program(
        vec![color],
        vec![
            local("Color", "c", field(name("Color"), "GREEN")),
            switch(
                name("c"),
                vec![
                    case(vec![name("RED")], vec![println(string("red")), brk()]),
                    case(vec![name("GREEN")], vec![println(string("green")), brk()]),
                    default_case(vec![println(string("other"))]),
                ],
            ),
            println(invoke(name("c"), "ordinal", vec![])),
            println(field(invoke(name("Color"), "values", vec![]), "length")),
            println(index(invoke(name("Color"), "values", vec![]), int(2))),
        ],
    );
    assert_eq!(lines(prog), vec!["green", "1", "3", "BLUE"]);
}

// ══════════════════════════════════════════════════════════════════════════════
// Exceptions
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_inner_finally_runs_before_outer_catch() {
    let prog = main_only(vec![try_catch(
        vec![try_catch(
            vec![throw(new("RuntimeException", vec![string("x")]))],
            vec![],
            Some(vec![println(string("inner finally"))]),
        )],
        vec![catch(
            "RuntimeException",
            "e",
            vec![println(add(string("caught "), invoke(name("e"), "getMessage", vec![])))],
        )],
        None,
    )]);
    assert_eq!(lines(prog), vec!["inner finally", "caught x"]);
}

#[test]
fn test_return_in_finally_wins() {
    let prog = program(
        vec![class("Util")
            .method(static_method(
                "int",
                "f",
                &[],
                vec![try_catch(vec![ret(int(1))], vec![], Some(vec![ret(int(2))]))],
            ))
            .build()],
        vec![println(invoke(name("Util"), "f", vec![]))],
    );
    assert_eq!(lines(prog), vec!["2"]);
}

#[test]
fn test_catch_matches_supertype_and_multi_catch() {
    let prog = main_only(vec![
        try_catch(
            vec![throw(new("IllegalArgumentException", vec![string("arg")]))],
            vec![catch(
                "RuntimeException",
                "e",
                vec![println(name("e"))],
            )],
            None,
        ),
        try_catch(
            vec![stmt(div(int(1), int(0)))],
            vec![catch(
                "NullPointerException|ArithmeticException",
                "e",
                vec![println(string("math"))],
            )],
            None,
        ),
    ]);
    assert_eq!(
        lines(prog),
        vec!["IllegalArgumentException: arg", "math"]
    );
}

#[test]
fn test_uncaught_exception_is_fatal() {
    let report = javelin_eval::run(main_only(vec![
        println(string("before")),
        throw(new("IllegalStateException", vec![string("bad")])),
        println(string("after")),
    ]));
    assert_eq!(report.output_lines(), vec!["before"]);
    assert_eq!(
        report.fatal.as_deref(),
        Some("Uncaught exception in thread main: IllegalStateException: bad")
    );
    assert!(!report.passed());
}

// ══════════════════════════════════════════════════════════════════════════════
// Closures
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_loop_captures_are_per_iteration() {
    let prog = main_only(vec![
        local("List<Supplier<Integer>>", "fs", new("ArrayList<>", vec![])),
        for_range(
            "i",
            int(0),
            int(3),
            vec![
                local("int", "k", name("i")),
                stmt(invoke(
                    name("fs"),
                    "add",
                    vec![lambda_expr(&[], mul(name("k"), int(10)))],
                )),
            ],
        ),
        for_each(
            "Supplier<Integer>",
            "f",
            name("fs"),
            vec![println(invoke(name("f"), "get", vec![]))],
        ),
    ]);
    assert_eq!(lines(prog), vec!["0", "10", "20"]);
}

#[test]
fn test_lambda_mutates_shared_array() {
    let prog = main_only(vec![
        local("int[]", "count", array("int", vec![int(0)])),
        local(
            "Runnable",
            "r",
            lambda_expr(&[], post_inc(index(name("count"), int(0)))),
        ),
        stmt(invoke(name("r"), "run", vec![])),
        stmt(invoke(name("r"), "run", vec![])),
        println(index(name("count"), int(0))),
    ]);
    assert_eq!(lines(prog), vec!["2"]);
}

#[test]
fn test_closure_sees_later_mutation() {
    let prog = main_only(vec![
        local("int", "n", int(1)),
        local("Supplier<Integer>", "s", lambda_expr(&[], name("n"))),
        set(name("n"), int(5)),
        println(invoke(name("s"), "get", vec![])),
    ]);
    assert_eq!(lines(prog), vec!["5"]);
}

#[test]
fn test_var_local_string_append() {
    let prog = main_only(vec![
        local("var", "s", string("a")),
        stmt(assign_op(name("s"), AssignOp::Add, int(1))),
        stmt(assign_op(name("s"), AssignOp::Add, chr('!'))),
        println(name("s")),
        local("var", "n", int(1)),
        stmt(assign_op(name("n"), AssignOp::Add, int(1))),
        println(name("n")),
    ]);
    assert_eq!(lines(prog), vec!["a1!", "2"]);
}

#[test]
fn test_untyped_lambda_param_concatenates_or_adds() {
    let prog = main_only(vec![
        local("List<String>", "words", new("ArrayList<>", vec![])),
        stmt(invoke(name("words"), "add", vec![string("x")])),
        stmt(invoke(name("words"), "add", vec![string("y")])),
        stmt(invoke(
            name("words"),
            "forEach",
            vec![lambda(
                &["w"],
                vec![
                    stmt(assign_op(name("w"), AssignOp::Add, int(2))),
                    println(name("w")),
                ],
            )],
        )),
        local("List<Integer>", "nums", new("ArrayList<>", vec![])),
        stmt(invoke(name("nums"), "add", vec![int(1)])),
        stmt(invoke(
            name("nums"),
            "forEach",
            vec![lambda(
                &["n"],
                vec![
                    stmt(assign_op(name("n"), AssignOp::Add, int(2))),
                    println(name("n")),
                ],
            )],
        )),
    ]);
    assert_eq!(lines(prog), vec!["x2", "y2", "3"]);
}

// ══════════════════════════════════════════════════════════════════════════════
// Threads
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_threads_accumulate_into_shared_static() {
    let worker = lambda(
        &[],
        vec![for_range(
            "i",
            int(0),
            int(10),
            vec![stmt(assign_op(
                field(name("Acc"), "total"),
                AssignOp::Add,
                mul(name("k"), name("i")),
            ))],
        )],
    );
    let prog = program(
        vec![class("Acc")
            .static_field("int", "total", Some(int(0)))
            .build()],
        vec![
            set(field(name("Acc"), "total"), int(0)),
            local("List<Thread>", "threads", new("ArrayList<>", vec![])),
            for_range(
                "n",
                int(0),
                int(10),
                vec![
                    local("int", "k", name("n")),
                    local("Thread", "t", new("Thread", vec![worker])),
                    stmt(invoke(name("threads"), "add", vec![name("t")])),
                    stmt(invoke(name("t"), "start", vec![])),
                ],
            ),
            for_each(
                "Thread",
                "t",
                name("threads"),
                vec![stmt(invoke(name("t"), "join", vec![]))],
            ),
            println(field(name("Acc"), "total")),
        ],
    );
    assert_eq!(lines(prog), vec!["2025"]);
}

#[test]
fn test_thread_subclass_overrides_run() {
    let prog = program(
        vec![class("Worker")
            .extends("Thread")
            .method(method("void", "run", &[], vec![println(string("working"))]))
            .build()],
        vec![
            local("Worker", "w", new("Worker", vec![])),
            stmt(invoke(name("w"), "start", vec![])),
            stmt(invoke(name("w"), "join", vec![])),
            println(string("done")),
        ],
    );
    assert_eq!(lines(prog), vec!["working", "done"]);
}

#[test]
fn test_uncaught_exception_ends_only_its_thread() {
    let prog = main_only(vec![
        local(
            "Thread",
            "t",
            new(
                "Thread",
                vec![lambda(
                    &[],
                    vec![throw(new("RuntimeException", vec![string("boom")]))],
                )],
            ),
        ),
        stmt(invoke(name("t"), "start", vec![])),
        stmt(invoke(name("t"), "join", vec![])),
        println(string("main continues")),
    ]);
    let report = javelin_eval::run(prog);
    assert_eq!(report.output_lines(), vec!["main continues"]);
    let fatal = report.fatal.unwrap_or_default();
    assert!(fatal.ends_with("RuntimeException: boom"), "{fatal}");
    assert!(!fatal.contains("thread main"), "{fatal}");
}

// ══════════════════════════════════════════════════════════════════════════════
// Library
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_optional_rendering() {
    let prog = main_only(vec![
        println(invoke(name("Optional"), "of", vec![int(5)])),
        println(invoke(name("Optional"), "empty", vec![])),
        println(invoke(
            invoke(name("Optional"), "empty", vec![]),
            "orElse",
            vec![int(7)],
        )),
    ]);
    assert_eq!(lines(prog), vec!["Just 5", "Nothing", "7"]);
}

#[test]
fn test_optional_map_and_flat_map() {
    let double = lambda_expr(&["x"], mul(name("x"), int(2)));
    let prog = main_only(vec![
        println(invoke(
            invoke(name("Optional"), "of", vec![int(3)]),
            "map",
            vec![double.clone()],
        )),
        println(invoke(
            invoke(name("Optional"), "empty", vec![]),
            "map",
            vec![double],
        )),
        println(invoke(
            invoke(name("Optional"), "of", vec![int(3)]),
            "flatMap",
            vec![lambda_expr(
                &["x"],
                invoke(name("Optional"), "of", vec![add(name("x"), int(1))]),
            )],
        )),
    ]);
    assert_eq!(lines(prog), vec!["Just 6", "Nothing", "Just 4"]);
}

#[test]
fn test_list_of_boxed_and_primitive() {
    let prog = main_only(vec![
        local("List<Integer>", "xs", new("ArrayList<>", vec![])),
        stmt(invoke(
            name("xs"),
            "add",
            vec![invoke(name("Integer"), "valueOf", vec![int(12)])],
        )),
        stmt(invoke(name("xs"), "add", vec![int(10)])),
        println(name("xs")),
        println(invoke(name("xs"), "size", vec![])),
    ]);
    assert_eq!(lines(prog), vec!["[12, 10]", "2"]);
}

#[test]
fn test_map_keeps_insertion_order() {
    let prog = main_only(vec![
        local("Map<String, Integer>", "m", new("HashMap<>", vec![])),
        stmt(invoke(name("m"), "put", vec![string("b"), int(2)])),
        stmt(invoke(name("m"), "put", vec![string("a"), int(1)])),
        stmt(invoke(name("m"), "put", vec![string("b"), int(3)])),
        println(name("m")),
        println(invoke(name("m"), "get", vec![string("b")])),
        println(invoke(name("m"), "getOrDefault", vec![string("z"), int(0)])),
    ]);
    assert_eq!(lines(prog), vec!["{b=3, a=1}", "3", "0"]);
}

#[test]
fn test_set_and_stack() {
    let prog = main_only(vec![
        local("Set<String>", "s", new("HashSet<>", vec![])),
        stmt(invoke(name("s"), "add", vec![string("x")])),
        stmt(invoke(name("s"), "add", vec![string("y")])),
        println(invoke(name("s"), "add", vec![string("x")])),
        println(invoke(name("s"), "size", vec![])),
        local("Stack<Integer>", "st", new("Stack<>", vec![])),
        stmt(invoke(name("st"), "push", vec![int(1)])),
        stmt(invoke(name("st"), "push", vec![int(2)])),
        println(invoke(name("st"), "pop", vec![])),
        println(invoke(name("st"), "peek", vec![])),
        println(invoke(name("st"), "empty", vec![])),
    ]);
    assert_eq!(lines(prog), vec!["false", "2", "2", "1", "false"]);
}

#[test]
fn test_date_until_counts_days() {
    let prog = main_only(vec![
        local(
            "LocalDateTime",
            "start",
            invoke(
                name("LocalDateTime"),
                "of",
                vec![int(2023), int(1), int(1), int(0), int(0)],
            ),
        ),
        local(
            "LocalDateTime",
            "end",
            invoke(
                name("LocalDateTime"),
                "of",
                vec![int(2023), int(11), int(21), int(0), int(0)],
            ),
        ),
        println(invoke(name("start"), "until", vec![name("end")])),
    ]);
    assert_eq!(lines(prog), vec!["-324"]);
}

#[test]
fn test_contains_all_on_lists_and_sets() {
    let prog = main_only(vec![
        local("List<Integer>", "xs", new("ArrayList<>", vec![])),
        stmt(invoke(name("xs"), "add", vec![int(1)])),
        stmt(invoke(name("xs"), "add", vec![int(2)])),
        stmt(invoke(name("xs"), "add", vec![int(3)])),
        local("Set<Integer>", "s", new("HashSet<>", vec![])),
        stmt(invoke(name("s"), "add", vec![int(1)])),
        stmt(invoke(name("s"), "add", vec![int(3)])),
        println(invoke(name("xs"), "containsAll", vec![name("s")])),
        println(invoke(name("s"), "containsAll", vec![name("xs")])),
        stmt(invoke(name("s"), "add", vec![int(2)])),
        println(invoke(name("s"), "containsAll", vec![name("xs")])),
    ]);
    assert_eq!(lines(prog), vec!["true", "false", "true"]);
}

#[test]
fn test_two_dimensional_array_defaults_and_rendering() {
    let prog = main_only(vec![
        local("int[][]", "grid", new_array("int", vec![int(2), int(3)])),
        set(index(index(name("grid"), int(1)), int(2)), int(7)),
        println(field(name("grid"), "length")),
        println(field(index(name("grid"), int(0)), "length")),
        println(invoke(name("Arrays"), "deepToString", vec![name("grid")])),
        println(index(name("grid"), int(1))),
    ]);
    assert_eq!(
        lines(prog),
        vec!["2", "3", "[[0, 0, 0], [0, 0, 7]]", "[0, 0, 7]"]
    );
}

#[test]
fn test_math_max_and_min_promote() {
    let prog = main_only(vec![
        println(invoke(name("Math"), "max", vec![int(2), int(9)])),
        println(invoke(name("Math"), "min", vec![int(3), dbl(7.5)])),
        println(invoke(name("Math"), "max", vec![long(4), int(-1)])),
    ]);
    assert_eq!(lines(prog), vec!["9", "3.0", "4"]);
}

// ══════════════════════════════════════════════════════════════════════════════
// Assertions
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_failed_assertion_is_reported_and_run_continues() {
    let report = javelin_eval::run(main_only(vec![
        stmt(call("assertTrue", vec![boolean(true)])),
        stmt(call(
            "assertEquals",
            vec![int(3), add(int(1), int(1)), string("sum")],
        )),
        println(string("still running")),
    ]));
    assert_eq!(report.output_lines(), vec!["still running"]);
    assert_eq!(report.failures.len(), 1);
    let failure = &report.failures[0];
    assert_eq!(failure.message, "sum");
    assert_eq!(failure.detail.as_deref(), Some("expected: 3, actual: 2"));
    assert_eq!(failure.thread, "main");
    assert_eq!(report.fatal, None);
    assert!(!report.passed());
}

#[test]
fn test_compile_errors_stop_the_run() {
    let report = javelin_eval::run(main_only(vec![
        println(string("never")),
        local("int", "i", string("Test")),
    ]));
    assert!(report.compile_errors.has_errors());
    assert_eq!(report.output, "");
    assert!(!report.passed());
}
