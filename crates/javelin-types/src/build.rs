//! Builder DSL for constructing programs without a parser.
//!
//! Used by embedders that generate programs and by the test suites:
//!
//! ```
//! use javelin_types::build::*;
//!
//! let prog = program(
//!     vec![class("A")
//!         .field_init("int", "x", int(1))
//!         .method(method("int", "getX", &[], vec![ret(name("x"))]))
//!         .build()],
//!     vec![println(invoke(new("A", vec![]), "getX", vec![]))],
//! );
//! assert_eq!(prog.classes.len(), 1);
//! ```
//!
//! Every node gets the default (synthetic) span; use [`Expr::at`] and
//! [`Stmt::at`] where a location matters.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::ast::*;
use crate::Span;

static ANON_COUNTER: AtomicUsize = AtomicUsize::new(1);

fn sp() -> Span {
    Span::default()
}

fn ident(name: &str) -> Ident {
    Ident::new(name, sp())
}

fn e(kind: ExprKind) -> Expr {
    Expr::new(kind, sp())
}

fn s(kind: StmtKind) -> Stmt {
    Stmt::new(kind, sp())
}

fn blk(stmts: Vec<Stmt>) -> Block {
    Block { stmts, span: sp() }
}

impl Expr {
    /// Attach a point location.
    pub fn at(mut self, line: u32, col: u32) -> Self {
        self.span = Span::point(line, col);
        self
    }
}

impl Stmt {
    /// Attach a point location.
    pub fn at(mut self, line: u32, col: u32) -> Self {
        self.span = Span::point(line, col);
        self
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Types
// ══════════════════════════════════════════════════════════════════════════════

/// Parse a type written in source syntax: `int`, `String[]`,
/// `HashMap<String, Integer>`, `A.B.C`, `var`, `void`.
pub fn ty(src: &str) -> TypeRef {
    let src = src.trim();
    if let Some(elem) = src.strip_suffix("[]") {
        return TypeRef::array_of(ty(elem));
    }
    match src {
        "var" => return TypeRef::Var,
        "void" => return TypeRef::Void,
        _ => {}
    }
    if let Some(p) = PrimType::from_name(src) {
        return TypeRef::Prim(p);
    }
    match src.find('<') {
        Some(open) if src.ends_with('>') => TypeRef::Class {
            name: src[..open].trim().to_string(),
            args: split_type_args(&src[open + 1..src.len() - 1])
                .into_iter()
                .map(ty)
                .collect(),
        },
        _ => TypeRef::class(src),
    }
}

/// Split `A, B<C, D>` at top-level commas.
fn split_type_args(src: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, ch) in src.char_indices() {
        match ch {
            '<' => depth += 1,
            '>' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(src[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    let last = src[start..].trim();
    if !last.is_empty() {
        parts.push(last);
    }
    parts
}

fn params(list: &[(&str, &str)]) -> Vec<Param> {
    list.iter()
        .map(|(t, n)| {
            let (ty_src, varargs) = match t.strip_suffix("...") {
                Some(elem) => (format!("{elem}[]"), true),
                None => (t.to_string(), false),
            };
            Param {
                name: ident(n),
                ty: ty(&ty_src),
                varargs,
                span: sp(),
            }
        })
        .collect()
}

// ══════════════════════════════════════════════════════════════════════════════
// Program & Classes
// ══════════════════════════════════════════════════════════════════════════════

pub fn program(classes: Vec<ClassDecl>, main: Vec<Stmt>) -> Program {
    Program {
        file: "Main.java".into(),
        classes,
        main,
    }
}

/// Fluent builder for [`ClassDecl`].
#[derive(Debug, Clone)]
pub struct ClassBuilder {
    decl: ClassDecl,
}

pub fn class(name: &str) -> ClassBuilder {
    ClassBuilder::new(name, ClassKind::Class)
}

pub fn interface(name: &str) -> ClassBuilder {
    ClassBuilder::new(name, ClassKind::Interface)
}

pub fn enumeration(name: &str) -> ClassBuilder {
    ClassBuilder::new(name, ClassKind::Enum)
}

/// An anonymous class body, named uniquely after the type it instantiates.
pub fn anon_body(base: &str) -> ClassBuilder {
    let n = ANON_COUNTER.fetch_add(1, Ordering::Relaxed);
    let simple = base.rsplit('.').next().unwrap_or(base);
    let simple = simple.split('<').next().unwrap_or(simple);
    ClassBuilder::new(&format!("{simple}$anon{n}"), ClassKind::Class)
}

impl ClassBuilder {
    fn new(name: &str, kind: ClassKind) -> Self {
        Self {
            decl: ClassDecl {
                name: ident(name),
                kind,
                is_static: false,
                is_abstract: false,
                type_params: Vec::new(),
                superclass: None,
                interfaces: Vec::new(),
                fields: Vec::new(),
                methods: Vec::new(),
                constructors: Vec::new(),
                inner_classes: Vec::new(),
                static_blocks: Vec::new(),
                enum_constants: Vec::new(),
                span: sp(),
            },
        }
    }

    pub fn extends(mut self, superclass: &str) -> Self {
        self.decl.superclass = Some(ty(superclass));
        self
    }

    pub fn implements(mut self, interface: &str) -> Self {
        self.decl.interfaces.push(ty(interface));
        self
    }

    pub fn type_param(mut self, name: &str) -> Self {
        self.decl.type_params.push(name.into());
        self
    }

    pub fn static_class(mut self) -> Self {
        self.decl.is_static = true;
        self
    }

    pub fn abstract_class(mut self) -> Self {
        self.decl.is_abstract = true;
        self
    }

    fn push_field(mut self, t: &str, name: &str, init: Option<Expr>, is_static: bool) -> Self {
        self.decl.fields.push(FieldDecl {
            name: ident(name),
            ty: ty(t),
            init,
            is_static,
            is_final: false,
            span: sp(),
        });
        self
    }

    pub fn field(self, t: &str, name: &str) -> Self {
        self.push_field(t, name, None, false)
    }

    pub fn field_init(self, t: &str, name: &str, init: Expr) -> Self {
        self.push_field(t, name, Some(init), false)
    }

    pub fn static_field(self, t: &str, name: &str, init: Option<Expr>) -> Self {
        self.push_field(t, name, init, true)
    }

    pub fn method(mut self, method: MethodDecl) -> Self {
        self.decl.methods.push(method);
        self
    }

    pub fn ctor(mut self, list: &[(&str, &str)], body: Vec<Stmt>) -> Self {
        self.decl.constructors.push(ConstructorDecl {
            params: params(list),
            body: blk(body),
            span: sp(),
        });
        self
    }

    pub fn inner(mut self, class: impl Into<ClassDecl>) -> Self {
        self.decl.inner_classes.push(class.into());
        self
    }

    pub fn static_block(mut self, body: Vec<Stmt>) -> Self {
        self.decl.static_blocks.push(blk(body));
        self
    }

    pub fn constant(mut self, name: &str, args: Vec<Expr>) -> Self {
        self.decl.enum_constants.push(EnumConstant {
            name: ident(name),
            args,
            span: sp(),
        });
        self
    }

    pub fn at(mut self, line: u32, col: u32) -> Self {
        self.decl.span = Span::point(line, col);
        self
    }

    pub fn build(self) -> ClassDecl {
        self.decl
    }
}

impl From<ClassBuilder> for ClassDecl {
    fn from(b: ClassBuilder) -> Self {
        b.build()
    }
}

// ── Methods ──────────────────────────────────────────────────────────────────

pub fn method(ret: &str, name: &str, list: &[(&str, &str)], body: Vec<Stmt>) -> MethodDecl {
    MethodDecl {
        name: ident(name),
        type_params: Vec::new(),
        params: params(list),
        ret: ty(ret),
        body: Some(blk(body)),
        is_static: false,
        span: sp(),
    }
}

pub fn static_method(
    ret: &str,
    name: &str,
    list: &[(&str, &str)],
    body: Vec<Stmt>,
) -> MethodDecl {
    MethodDecl {
        is_static: true,
        ..method(ret, name, list, body)
    }
}

/// A method without a body (interface or abstract).
pub fn abstract_method(ret: &str, name: &str, list: &[(&str, &str)]) -> MethodDecl {
    MethodDecl {
        body: None,
        ..method(ret, name, list, Vec::new())
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Statements
// ══════════════════════════════════════════════════════════════════════════════

pub fn local(t: &str, name: &str, init: Expr) -> Stmt {
    locals(t, vec![(name, Some(init))])
}

pub fn declare(t: &str, name: &str) -> Stmt {
    locals(t, vec![(name, None)])
}

/// `int x = 3, y;`
pub fn locals(t: &str, decls: Vec<(&str, Option<Expr>)>) -> Stmt {
    s(StmtKind::LocalVar(LocalVarDecl {
        ty: ty(t),
        declarators: decls
            .into_iter()
            .map(|(n, init)| Declarator {
                name: ident(n),
                init,
            })
            .collect(),
    }))
}

pub fn stmt(expr: Expr) -> Stmt {
    s(StmtKind::Expr(expr))
}

pub fn block(stmts: Vec<Stmt>) -> Stmt {
    s(StmtKind::Block(blk(stmts)))
}

pub fn if_(cond: Expr, then: Vec<Stmt>) -> Stmt {
    s(StmtKind::If {
        cond,
        then_branch: Box::new(block(then)),
        else_branch: None,
    })
}

pub fn if_else(cond: Expr, then: Vec<Stmt>, otherwise: Vec<Stmt>) -> Stmt {
    s(StmtKind::If {
        cond,
        then_branch: Box::new(block(then)),
        else_branch: Some(Box::new(block(otherwise))),
    })
}

/// `if (..) {..} else if ...`: the else branch is a single statement.
pub fn if_else_if(cond: Expr, then: Vec<Stmt>, otherwise: Stmt) -> Stmt {
    s(StmtKind::If {
        cond,
        then_branch: Box::new(block(then)),
        else_branch: Some(Box::new(otherwise)),
    })
}

pub fn while_(cond: Expr, body: Vec<Stmt>) -> Stmt {
    s(StmtKind::While {
        cond,
        body: Box::new(block(body)),
    })
}

pub fn do_while(body: Vec<Stmt>, cond: Expr) -> Stmt {
    s(StmtKind::DoWhile {
        body: Box::new(block(body)),
        cond,
    })
}

pub fn for_(init: Vec<Stmt>, cond: Option<Expr>, update: Vec<Expr>, body: Vec<Stmt>) -> Stmt {
    s(StmtKind::For {
        init,
        cond,
        update,
        body: Box::new(block(body)),
    })
}

/// `for (int var = from; var < to; var++) body`
pub fn for_range(var: &str, from: Expr, to: Expr, body: Vec<Stmt>) -> Stmt {
    for_(
        vec![local("int", var, from)],
        Some(lt(name(var), to)),
        vec![post_inc(name(var))],
        body,
    )
}

pub fn for_each(t: &str, var: &str, iterable: Expr, body: Vec<Stmt>) -> Stmt {
    s(StmtKind::ForEach {
        ty: ty(t),
        var: ident(var),
        iterable,
        body: Box::new(block(body)),
    })
}

pub fn switch(selector: Expr, cases: Vec<SwitchCase>) -> Stmt {
    s(StmtKind::Switch(SwitchStmt { selector, cases }))
}

pub fn case(labels: Vec<Expr>, body: Vec<Stmt>) -> SwitchCase {
    SwitchCase {
        labels,
        body,
        span: sp(),
    }
}

pub fn default_case(body: Vec<Stmt>) -> SwitchCase {
    case(Vec::new(), body)
}

pub fn brk() -> Stmt {
    s(StmtKind::Break(None))
}

pub fn brk_to(label: &str) -> Stmt {
    s(StmtKind::Break(Some(ident(label))))
}

pub fn cont() -> Stmt {
    s(StmtKind::Continue(None))
}

pub fn cont_to(label: &str) -> Stmt {
    s(StmtKind::Continue(Some(ident(label))))
}

pub fn labeled(label: &str, body: Stmt) -> Stmt {
    s(StmtKind::Labeled {
        label: ident(label),
        body: Box::new(body),
    })
}

pub fn ret(value: Expr) -> Stmt {
    s(StmtKind::Return(Some(value)))
}

pub fn ret_void() -> Stmt {
    s(StmtKind::Return(None))
}

pub fn throw(value: Expr) -> Stmt {
    s(StmtKind::Throw(value))
}

pub fn try_catch(body: Vec<Stmt>, catches: Vec<CatchClause>, finally: Option<Vec<Stmt>>) -> Stmt {
    s(StmtKind::Try(TryStmt {
        body: blk(body),
        catches,
        finally: finally.map(blk),
    }))
}

/// `catch (A | B var) { body }`; `types` uses `|` for multi-catch.
pub fn catch(types: &str, var: &str, body: Vec<Stmt>) -> CatchClause {
    CatchClause {
        types: types.split('|').map(ty).collect(),
        var: ident(var),
        body: blk(body),
        span: sp(),
    }
}

pub fn this_ctor(args: Vec<Expr>) -> Stmt {
    s(StmtKind::ConstructorCall {
        target: ConstructorTarget::This,
        args,
    })
}

pub fn super_ctor(args: Vec<Expr>) -> Stmt {
    s(StmtKind::ConstructorCall {
        target: ConstructorTarget::Super,
        args,
    })
}

pub fn println(value: Expr) -> Stmt {
    stmt(call("println", vec![value]))
}

pub fn print(value: Expr) -> Stmt {
    stmt(call("print", vec![value]))
}

// ══════════════════════════════════════════════════════════════════════════════
// Expressions
// ══════════════════════════════════════════════════════════════════════════════

// ── Literals ──

pub fn int(v: i32) -> Expr {
    e(ExprKind::IntLit(v))
}

pub fn long(v: i64) -> Expr {
    e(ExprKind::LongLit(v))
}

pub fn float(v: f32) -> Expr {
    e(ExprKind::FloatLit(v))
}

pub fn dbl(v: f64) -> Expr {
    e(ExprKind::DoubleLit(v))
}

pub fn boolean(v: bool) -> Expr {
    e(ExprKind::BoolLit(v))
}

pub fn chr(v: char) -> Expr {
    e(ExprKind::CharLit(v))
}

pub fn string(v: &str) -> Expr {
    e(ExprKind::StringLit(v.into()))
}

pub fn null() -> Expr {
    e(ExprKind::NullLit)
}

// ── Names ──

pub fn name(n: &str) -> Expr {
    e(ExprKind::Name(n.into()))
}

pub fn this() -> Expr {
    e(ExprKind::This)
}

pub fn field(object: Expr, f: &str) -> Expr {
    e(ExprKind::FieldAccess {
        object: Box::new(object),
        field: ident(f),
    })
}

/// `this.f`
pub fn this_field(f: &str) -> Expr {
    field(this(), f)
}

pub fn super_field(depth: u32, f: &str) -> Expr {
    e(ExprKind::SuperField {
        depth,
        field: ident(f),
    })
}

// ── Calls ──

pub fn call(n: &str, args: Vec<Expr>) -> Expr {
    e(ExprKind::Call {
        name: ident(n),
        args,
    })
}

pub fn invoke(object: Expr, m: &str, args: Vec<Expr>) -> Expr {
    e(ExprKind::MethodCall {
        object: Box::new(object),
        method: ident(m),
        args,
    })
}

pub fn super_call(depth: u32, m: &str, args: Vec<Expr>) -> Expr {
    e(ExprKind::SuperCall {
        depth,
        method: ident(m),
        args,
    })
}

// ── Creation ──

pub fn new(t: &str, args: Vec<Expr>) -> Expr {
    e(ExprKind::New(Box::new(NewExpr {
        class: ty(t),
        args,
        outer: None,
        body: None,
    })))
}

/// `outer.new T(args)`
pub fn new_in(outer: Expr, t: &str, args: Vec<Expr>) -> Expr {
    e(ExprKind::New(Box::new(NewExpr {
        class: ty(t),
        args,
        outer: Some(outer),
        body: None,
    })))
}

/// `new T(args) { body }`; build `body` with [`anon_body`].
pub fn new_anon(t: &str, args: Vec<Expr>, body: ClassBuilder) -> Expr {
    e(ExprKind::New(Box::new(NewExpr {
        class: ty(t),
        args,
        outer: None,
        body: Some(body.build()),
    })))
}

/// `new elem[d1][d2]...`
pub fn new_array(elem: &str, dims: Vec<Expr>) -> Expr {
    new_array_extra(elem, dims, 0)
}

/// `new elem[d1][]...` with `extra` unsized trailing dimensions.
pub fn new_array_extra(elem: &str, dims: Vec<Expr>, extra: u32) -> Expr {
    e(ExprKind::NewArray {
        elem: ty(elem),
        dims,
        extra_dims: extra,
    })
}

/// `{a, b, c}` with element type `elem`.
pub fn array(elem: &str, elements: Vec<Expr>) -> Expr {
    e(ExprKind::ArrayLit {
        elem: ty(elem),
        elements,
    })
}

// ── Access & Mutation ──

pub fn index(a: Expr, i: Expr) -> Expr {
    e(ExprKind::Index {
        array: Box::new(a),
        index: Box::new(i),
    })
}

pub fn assign(target: Expr, value: Expr) -> Expr {
    assign_op(target, AssignOp::Assign, value)
}

pub fn assign_op(target: Expr, op: AssignOp, value: Expr) -> Expr {
    e(ExprKind::Assign {
        target: Box::new(target),
        op,
        value: Box::new(value),
    })
}

/// `target = value;` as a statement.
pub fn set(target: Expr, value: Expr) -> Stmt {
    stmt(assign(target, value))
}

fn inc_dec(target: Expr, op: IncDecOp) -> Expr {
    e(ExprKind::IncDec {
        target: Box::new(target),
        op,
    })
}

pub fn pre_inc(target: Expr) -> Expr {
    inc_dec(target, IncDecOp::PreInc)
}

pub fn pre_dec(target: Expr) -> Expr {
    inc_dec(target, IncDecOp::PreDec)
}

pub fn post_inc(target: Expr) -> Expr {
    inc_dec(target, IncDecOp::PostInc)
}

pub fn post_dec(target: Expr) -> Expr {
    inc_dec(target, IncDecOp::PostDec)
}

// ── Operators ──

pub fn bin(left: Expr, op: BinOp, right: Expr) -> Expr {
    e(ExprKind::Binary {
        left: Box::new(left),
        op,
        right: Box::new(right),
    })
}

pub fn add(l: Expr, r: Expr) -> Expr {
    bin(l, BinOp::Add, r)
}

pub fn sub(l: Expr, r: Expr) -> Expr {
    bin(l, BinOp::Sub, r)
}

pub fn mul(l: Expr, r: Expr) -> Expr {
    bin(l, BinOp::Mul, r)
}

pub fn div(l: Expr, r: Expr) -> Expr {
    bin(l, BinOp::Div, r)
}

pub fn rem(l: Expr, r: Expr) -> Expr {
    bin(l, BinOp::Mod, r)
}

pub fn eq(l: Expr, r: Expr) -> Expr {
    bin(l, BinOp::Eq, r)
}

pub fn ne(l: Expr, r: Expr) -> Expr {
    bin(l, BinOp::NotEq, r)
}

pub fn lt(l: Expr, r: Expr) -> Expr {
    bin(l, BinOp::Less, r)
}

pub fn le(l: Expr, r: Expr) -> Expr {
    bin(l, BinOp::LessEq, r)
}

pub fn gt(l: Expr, r: Expr) -> Expr {
    bin(l, BinOp::Greater, r)
}

pub fn ge(l: Expr, r: Expr) -> Expr {
    bin(l, BinOp::GreaterEq, r)
}

pub fn and(l: Expr, r: Expr) -> Expr {
    bin(l, BinOp::And, r)
}

pub fn or(l: Expr, r: Expr) -> Expr {
    bin(l, BinOp::Or, r)
}

pub fn unary(op: UnaryOp, operand: Expr) -> Expr {
    e(ExprKind::Unary {
        op,
        operand: Box::new(operand),
    })
}

pub fn not(operand: Expr) -> Expr {
    unary(UnaryOp::Not, operand)
}

pub fn neg(operand: Expr) -> Expr {
    unary(UnaryOp::Neg, operand)
}

pub fn cond(c: Expr, then_expr: Expr, else_expr: Expr) -> Expr {
    e(ExprKind::Conditional {
        cond: Box::new(c),
        then_expr: Box::new(then_expr),
        else_expr: Box::new(else_expr),
    })
}

pub fn cast(t: &str, expr: Expr) -> Expr {
    e(ExprKind::Cast {
        ty: ty(t),
        expr: Box::new(expr),
    })
}

pub fn instance_of(expr: Expr, t: &str) -> Expr {
    e(ExprKind::InstanceOf {
        expr: Box::new(expr),
        ty: ty(t),
    })
}

pub fn paren(inner: Expr) -> Expr {
    e(ExprKind::Paren(Box::new(inner)))
}

// ── Lambdas ──

/// `(params) -> { body }`
pub fn lambda(list: &[&str], body: Vec<Stmt>) -> Expr {
    e(ExprKind::Lambda(Arc::new(LambdaExpr {
        params: list.iter().map(|p| ident(p)).collect(),
        body: LambdaBody::Block(blk(body)),
        span: sp(),
    })))
}

/// `(params) -> expr`
pub fn lambda_expr(list: &[&str], body: Expr) -> Expr {
    e(ExprKind::Lambda(Arc::new(LambdaExpr {
        params: list.iter().map(|p| ident(p)).collect(),
        body: LambdaBody::Expr(body),
        span: sp(),
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_ty_parses_primitives_and_arrays() {
        assert_eq!(ty("int"), TypeRef::Prim(PrimType::Int));
        assert_eq!(
            ty("double[][]"),
            TypeRef::array_of(TypeRef::array_of(TypeRef::Prim(PrimType::Double)))
        );
        assert_eq!(ty("var"), TypeRef::Var);
    }

    #[test]
    fn test_ty_parses_nested_generics() {
        assert_eq!(
            ty("HashMap<String, ArrayList<Integer>>"),
            TypeRef::Class {
                name: "HashMap".into(),
                args: vec![
                    TypeRef::class("String"),
                    TypeRef::Class {
                        name: "ArrayList".into(),
                        args: vec![TypeRef::class("Integer")],
                    },
                ],
            }
        );
    }

    #[test]
    fn test_varargs_param() {
        let m = method("void", "f", &[("String", "a"), ("int...", "rest")], vec![]);
        assert!(m.is_varargs());
        assert_eq!(m.params[1].ty, ty("int[]"));
        assert!(m.accepts_arity(1));
        assert!(m.accepts_arity(5));
    }

    #[test]
    fn test_anon_bodies_are_unique() {
        let a = anon_body("Runnable").build();
        let b = anon_body("Runnable").build();
        assert_ne!(a.name.name, b.name.name);
        assert!(a.name.name.starts_with("Runnable$anon"));
    }

    #[test]
    fn test_multi_catch() {
        let c = catch("ArithmeticException | NullPointerException", "e", vec![]);
        assert_eq!(c.types.len(), 2);
        assert_eq!(c.types[1], TypeRef::class("NullPointerException"));
    }

    #[test]
    fn test_program_json_round_trip() {
        let prog = program(
            vec![class("A").field_init("int[]", "v", array("int", vec![int(1), int(2)])).build()],
            vec![println(lambda_expr(&["x"], add(name("x"), int(1))))],
        );
        let json = serde_json::to_string(&prog).unwrap();
        let back: Program = serde_json::from_str(&json).unwrap();
        assert_eq!(back, prog);
    }
}
