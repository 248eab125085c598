//! AST node types for Javelin programs.
//!
//! Every node carries a [`Span`] for error reporting. The tree is produced by
//! an external parser (or by [`crate::build`]) and is immutable once handed
//! to the runtime. All nodes serialize with `serde`, so a program can cross a
//! process boundary as JSON.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::Span;

// ══════════════════════════════════════════════════════════════════════════════
// Top Level
// ══════════════════════════════════════════════════════════════════════════════

/// A complete program: class declarations plus the entry statements.
///
/// Classes may appear anywhere in the source; they are hoisted here and are
/// all visible to the entry statements and to each other.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    /// Source file name used in diagnostics.
    pub file: String,
    pub classes: Vec<ClassDecl>,
    pub main: Vec<Stmt>,
}

// ══════════════════════════════════════════════════════════════════════════════
// Identifiers
// ══════════════════════════════════════════════════════════════════════════════

/// A spanned identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

impl Ident {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            span,
        }
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Class Declarations
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassKind {
    Class,
    Interface,
    Enum,
}

/// `class Name<T> extends Base implements I, J { ... }`
///
/// Also used for interfaces, enums and anonymous class bodies. Anonymous
/// bodies carry a synthetic, program-unique name and have no declared
/// superclass: the type named in their `new` expression decides whether it
/// is extended or implemented.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassDecl {
    pub name: Ident,
    pub kind: ClassKind,
    /// `static` nested class: instances carry no enclosing-instance link.
    pub is_static: bool,
    pub is_abstract: bool,
    pub type_params: Vec<String>,
    pub superclass: Option<TypeRef>,
    pub interfaces: Vec<TypeRef>,
    pub fields: Vec<FieldDecl>,
    pub methods: Vec<MethodDecl>,
    pub constructors: Vec<ConstructorDecl>,
    pub inner_classes: Vec<ClassDecl>,
    pub static_blocks: Vec<Block>,
    pub enum_constants: Vec<EnumConstant>,
    pub span: Span,
}

impl ClassDecl {
    pub fn is_interface(&self) -> bool {
        self.kind == ClassKind::Interface
    }

    pub fn is_enum(&self) -> bool {
        self.kind == ClassKind::Enum
    }
}

/// A field declaration: `int x = 3;`, `static int count;`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDecl {
    pub name: Ident,
    pub ty: TypeRef,
    pub init: Option<Expr>,
    pub is_static: bool,
    pub is_final: bool,
    pub span: Span,
}

/// A method declaration. `body` is `None` for abstract and interface methods.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodDecl {
    pub name: Ident,
    pub type_params: Vec<String>,
    pub params: Vec<Param>,
    pub ret: TypeRef,
    pub body: Option<Block>,
    pub is_static: bool,
    pub span: Span,
}

impl MethodDecl {
    /// True when the last parameter is `T...`.
    pub fn is_varargs(&self) -> bool {
        self.params.last().is_some_and(|p| p.varargs)
    }

    /// Whether a call with `argc` arguments can bind to this method.
    pub fn accepts_arity(&self, argc: usize) -> bool {
        accepts_arity(&self.params, argc)
    }
}

/// A constructor: `Name(params) { body }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstructorDecl {
    pub params: Vec<Param>,
    pub body: Block,
    pub span: Span,
}

impl ConstructorDecl {
    pub fn accepts_arity(&self, argc: usize) -> bool {
        accepts_arity(&self.params, argc)
    }
}

fn accepts_arity(params: &[Param], argc: usize) -> bool {
    match params.last() {
        Some(last) if last.varargs => argc + 1 >= params.len(),
        _ => argc == params.len(),
    }
}

/// A formal parameter. A varargs parameter's `ty` is the array type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub name: Ident,
    pub ty: TypeRef,
    pub varargs: bool,
    pub span: Span,
}

/// An enum constant: `RED`, `PLANET(3, 4)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumConstant {
    pub name: Ident,
    pub args: Vec<Expr>,
    pub span: Span,
}

// ══════════════════════════════════════════════════════════════════════════════
// Statements
// ══════════════════════════════════════════════════════════════════════════════

/// `{ stmts... }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

impl Stmt {
    pub fn new(kind: StmtKind, span: Span) -> Self {
        Self { kind, span }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StmtKind {
    /// `int x = 3, y;`
    LocalVar(LocalVarDecl),
    /// A bare expression statement.
    Expr(Expr),
    Block(Block),
    If {
        cond: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },
    While {
        cond: Expr,
        body: Box<Stmt>,
    },
    DoWhile {
        body: Box<Stmt>,
        cond: Expr,
    },
    /// `for (init; cond; update) body`
    For {
        init: Vec<Stmt>,
        cond: Option<Expr>,
        update: Vec<Expr>,
        body: Box<Stmt>,
    },
    /// `for (T x : iterable) body`
    ForEach {
        ty: TypeRef,
        var: Ident,
        iterable: Expr,
        body: Box<Stmt>,
    },
    Switch(SwitchStmt),
    Break(Option<Ident>),
    Continue(Option<Ident>),
    Return(Option<Expr>),
    Throw(Expr),
    Try(TryStmt),
    /// `label: stmt`
    Labeled {
        label: Ident,
        body: Box<Stmt>,
    },
    /// `this(...)` or `super(...)` as the first statement of a constructor.
    ConstructorCall {
        target: ConstructorTarget,
        args: Vec<Expr>,
    },
    Empty,
}

/// A local declaration with one or more declarators sharing a type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalVarDecl {
    pub ty: TypeRef,
    pub declarators: Vec<Declarator>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Declarator {
    pub name: Ident,
    pub init: Option<Expr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConstructorTarget {
    This,
    Super,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwitchStmt {
    pub selector: Expr,
    pub cases: Vec<SwitchCase>,
}

/// `case a: case b: stmts...` or `default: stmts...`.
///
/// An empty `labels` list marks the default case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwitchCase {
    pub labels: Vec<Expr>,
    pub body: Vec<Stmt>,
    pub span: Span,
}

impl SwitchCase {
    pub fn is_default(&self) -> bool {
        self.labels.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TryStmt {
    pub body: Block,
    pub catches: Vec<CatchClause>,
    pub finally: Option<Block>,
}

/// `catch (A | B e) { ... }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatchClause {
    pub types: Vec<TypeRef>,
    pub var: Ident,
    pub body: Block,
    pub span: Span,
}

// ══════════════════════════════════════════════════════════════════════════════
// Expressions
// ══════════════════════════════════════════════════════════════════════════════

/// An expression node. Uses `Box` for recursive variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// The expression with any number of surrounding parentheses removed.
    pub fn unparen(&self) -> &Expr {
        let mut expr = self;
        while let ExprKind::Paren(inner) = &expr.kind {
            expr = inner;
        }
        expr
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExprKind {
    // ── Literals ──
    IntLit(i32),
    LongLit(i64),
    FloatLit(f32),
    DoubleLit(f64),
    BoolLit(bool),
    CharLit(char),
    StringLit(String),
    NullLit,

    // ── Names & Members ──
    /// An unqualified name: local, field, static, or class name.
    Name(String),
    This,
    /// `expr.field`; `expr` may name a class for static access.
    FieldAccess {
        object: Box<Expr>,
        field: Ident,
    },
    /// `super.x` (depth 1), `super.super.x` (depth 2).
    SuperField {
        depth: u32,
        field: Ident,
    },

    // ── Calls ──
    /// `name(args...)`
    Call {
        name: Ident,
        args: Vec<Expr>,
    },
    /// `expr.method(args...)`
    MethodCall {
        object: Box<Expr>,
        method: Ident,
        args: Vec<Expr>,
    },
    /// `super.m(args)` (depth 1), `super.super.m(args)` (depth 2).
    SuperCall {
        depth: u32,
        method: Ident,
        args: Vec<Expr>,
    },

    // ── Creation ──
    /// `new T(args)`, `outer.new T(args)`, `new T(args) { body }`.
    New(Box<NewExpr>),
    /// `new int[3][4]`, `new String[2][]`.
    NewArray {
        elem: TypeRef,
        dims: Vec<Expr>,
        extra_dims: u32,
    },
    /// `{1, 2, 3}` in an initializer, or `new int[] {1, 2, 3}`.
    ArrayLit {
        elem: TypeRef,
        elements: Vec<Expr>,
    },

    // ── Access & Mutation ──
    Index {
        array: Box<Expr>,
        index: Box<Expr>,
    },
    /// `target = value`, `target += value`, ...
    Assign {
        target: Box<Expr>,
        op: AssignOp,
        value: Box<Expr>,
    },
    /// `++x`, `x--`, ...
    IncDec {
        target: Box<Expr>,
        op: IncDecOp,
    },

    // ── Operators ──
    Binary {
        left: Box<Expr>,
        op: BinOp,
        right: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    /// `cond ? a : b`
    Conditional {
        cond: Box<Expr>,
        then_expr: Box<Expr>,
        else_expr: Box<Expr>,
    },
    Cast {
        ty: TypeRef,
        expr: Box<Expr>,
    },
    InstanceOf {
        expr: Box<Expr>,
        ty: TypeRef,
    },

    // ── Lambda ──
    Lambda(Arc<LambdaExpr>),

    // ── Grouping ──
    Paren(Box<Expr>),
}

/// `new` expression payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewExpr {
    pub class: TypeRef,
    pub args: Vec<Expr>,
    /// Explicit enclosing instance: `outer.new Inner()`.
    pub outer: Option<Expr>,
    /// Anonymous class body.
    pub body: Option<ClassDecl>,
}

// ── Binary Operators ──────────────────────────────────────────────────────────

/// Binary operators (in precedence order, lowest first).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinOp {
    // Logical (short-circuit)
    Or,
    And,
    // Bitwise / non-short-circuit logical
    BitOr,
    BitXor,
    BitAnd,
    // Equality
    Eq,
    NotEq,
    // Relational
    Less,
    Greater,
    LessEq,
    GreaterEq,
    // Shift
    Shl,
    Shr,
    UShr,
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl BinOp {
    /// Returns the operator symbol for error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            BinOp::Or => "||",
            BinOp::And => "&&",
            BinOp::BitOr => "|",
            BinOp::BitXor => "^",
            BinOp::BitAnd => "&",
            BinOp::Eq => "==",
            BinOp::NotEq => "!=",
            BinOp::Less => "<",
            BinOp::Greater => ">",
            BinOp::LessEq => "<=",
            BinOp::GreaterEq => ">=",
            BinOp::Shl => "<<",
            BinOp::Shr => ">>",
            BinOp::UShr => ">>>",
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
        }
    }

    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinOp::Eq
                | BinOp::NotEq
                | BinOp::Less
                | BinOp::Greater
                | BinOp::LessEq
                | BinOp::GreaterEq
        )
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    /// `-x`
    Neg,
    /// `+x`
    Plus,
    /// `!x`
    Not,
    /// `~x`
    BitNot,
}

/// Assignment operators. `Assign` is plain `=`; the rest are compound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssignOp {
    Assign,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    UShr,
}

impl AssignOp {
    /// The binary operator a compound assignment applies.
    pub fn binary_op(self) -> Option<BinOp> {
        Some(match self {
            AssignOp::Assign => return None,
            AssignOp::Add => BinOp::Add,
            AssignOp::Sub => BinOp::Sub,
            AssignOp::Mul => BinOp::Mul,
            AssignOp::Div => BinOp::Div,
            AssignOp::Mod => BinOp::Mod,
            AssignOp::BitAnd => BinOp::BitAnd,
            AssignOp::BitOr => BinOp::BitOr,
            AssignOp::BitXor => BinOp::BitXor,
            AssignOp::Shl => BinOp::Shl,
            AssignOp::Shr => BinOp::Shr,
            AssignOp::UShr => BinOp::UShr,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IncDecOp {
    PreInc,
    PreDec,
    PostInc,
    PostDec,
}

impl IncDecOp {
    pub fn is_increment(self) -> bool {
        matches!(self, IncDecOp::PreInc | IncDecOp::PostInc)
    }

    pub fn is_prefix(self) -> bool {
        matches!(self, IncDecOp::PreInc | IncDecOp::PreDec)
    }
}

// ── Lambda ────────────────────────────────────────────────────────────────────

/// `(a, b) -> expr` or `(a, b) -> { stmts }`.
///
/// Parameters are untyped; lambdas adopt whatever functional interface the
/// receiving code expects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LambdaExpr {
    pub params: Vec<Ident>,
    pub body: LambdaBody,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LambdaBody {
    Expr(Expr),
    Block(Block),
}

// ══════════════════════════════════════════════════════════════════════════════
// Type References
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimType {
    Boolean,
    Char,
    Int,
    Long,
    Float,
    Double,
}

impl PrimType {
    pub fn as_str(self) -> &'static str {
        match self {
            PrimType::Boolean => "boolean",
            PrimType::Char => "char",
            PrimType::Int => "int",
            PrimType::Long => "long",
            PrimType::Float => "float",
            PrimType::Double => "double",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "boolean" => PrimType::Boolean,
            "char" => PrimType::Char,
            "int" | "short" | "byte" => PrimType::Int,
            "long" => PrimType::Long,
            "float" => PrimType::Float,
            "double" => PrimType::Double,
            _ => return None,
        })
    }

    pub fn is_numeric(self) -> bool {
        !matches!(self, PrimType::Boolean)
    }

    /// The boxed wrapper class for this primitive.
    pub fn wrapper(self) -> &'static str {
        match self {
            PrimType::Boolean => "Boolean",
            PrimType::Char => "Character",
            PrimType::Int => "Integer",
            PrimType::Long => "Long",
            PrimType::Float => "Float",
            PrimType::Double => "Double",
        }
    }

    /// The primitive a wrapper class boxes.
    pub fn from_wrapper(name: &str) -> Option<Self> {
        Some(match name {
            "Boolean" => PrimType::Boolean,
            "Character" => PrimType::Char,
            "Integer" | "Short" | "Byte" => PrimType::Int,
            "Long" => PrimType::Long,
            "Float" => PrimType::Float,
            "Double" => PrimType::Double,
            _ => return None,
        })
    }
}

/// A declared type. Generic arguments are kept for diagnostics only; they
/// are erased at run time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TypeRef {
    Prim(PrimType),
    /// Class, interface, enum, library or type-parameter name. Nested classes
    /// may be written qualified (`A.B.C`).
    Class { name: String, args: Vec<TypeRef> },
    Array(Box<TypeRef>),
    /// `var`: inferred from the initializer.
    Var,
    Void,
}

impl TypeRef {
    pub fn class(name: impl Into<String>) -> Self {
        TypeRef::Class {
            name: name.into(),
            args: Vec::new(),
        }
    }

    pub fn array_of(elem: TypeRef) -> Self {
        TypeRef::Array(Box::new(elem))
    }

    /// The class name, stripped of any qualification (`A.B.C` → `C`).
    pub fn simple_name(&self) -> Option<&str> {
        match self {
            TypeRef::Class { name, .. } => Some(name.rsplit('.').next().unwrap_or(name)),
            _ => None,
        }
    }

    pub fn is_string(&self) -> bool {
        self.simple_name() == Some("String")
    }

    pub fn prim(&self) -> Option<PrimType> {
        match self {
            TypeRef::Prim(p) => Some(*p),
            _ => None,
        }
    }

    /// Element type of an array type.
    pub fn array_elem(&self) -> Option<&TypeRef> {
        match self {
            TypeRef::Array(elem) => Some(elem),
            _ => None,
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Prim(p) => f.write_str(p.as_str()),
            TypeRef::Class { name, args } => {
                f.write_str(name)?;
                if !args.is_empty() {
                    f.write_str("<")?;
                    for (i, a) in args.iter().enumerate() {
                        if i > 0 {
                            f.write_str(", ")?;
                        }
                        write!(f, "{a}")?;
                    }
                    f.write_str(">")?;
                }
                Ok(())
            }
            TypeRef::Array(elem) => write!(f, "{elem}[]"),
            TypeRef::Var => f.write_str("var"),
            TypeRef::Void => f.write_str("void"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_ref_display() {
        let t = TypeRef::Class {
            name: "HashMap".into(),
            args: vec![TypeRef::class("String"), TypeRef::class("Integer")],
        };
        assert_eq!(t.to_string(), "HashMap<String, Integer>");
        let arr = TypeRef::array_of(TypeRef::array_of(TypeRef::Prim(PrimType::Int)));
        assert_eq!(arr.to_string(), "int[][]");
    }

    #[test]
    fn test_simple_name_strips_qualification() {
        assert_eq!(TypeRef::class("A.B.C").simple_name(), Some("C"));
        assert_eq!(TypeRef::class("String").simple_name(), Some("String"));
        assert!(TypeRef::Prim(PrimType::Int).simple_name().is_none());
    }

    #[test]
    fn test_varargs_arity() {
        let p = |name: &str, varargs| Param {
            name: Ident::new(name, Span::default()),
            ty: TypeRef::Prim(PrimType::Int),
            varargs,
            span: Span::default(),
        };
        let fixed = [p("a", false), p("b", false)];
        assert!(accepts_arity(&fixed, 2));
        assert!(!accepts_arity(&fixed, 3));
        let var = [p("a", false), p("rest", true)];
        assert!(accepts_arity(&var, 1));
        assert!(accepts_arity(&var, 4));
        assert!(!accepts_arity(&var, 0));
    }

    #[test]
    fn test_wrapper_round_trip() {
        for p in [
            PrimType::Boolean,
            PrimType::Char,
            PrimType::Int,
            PrimType::Long,
            PrimType::Float,
            PrimType::Double,
        ] {
            assert_eq!(PrimType::from_wrapper(p.wrapper()), Some(p));
        }
    }
}
