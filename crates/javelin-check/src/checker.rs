//! Javelin static checker: walks a program before it runs.
//!
//! Entry point: [`Checker::check`].
//!
//! Error codes emitted:
//! - E200: unknown type
//! - E201: local initializer not assignable to the declared type
//! - E202: `new` with no constructor of that arity
//! - E204: field initializer not assignable to the field type
//! - E500: local declared twice in one scope
//! - E501: `break`/`continue` with no loop, switch or label to leave
//! - E502: `super` outside a class
//! - E503: `super` chain longer than the ancestor chain
//! - E600: cyclic inheritance
//!
//! Typing is best-effort. Whatever cannot be inferred is
//! [`Type::Unknown`] and never produces an error.

use std::collections::{HashMap, HashSet};

use javelin_types::ast::*;
use javelin_types::library;
use javelin_types::{CompileError, CompileErrors, ErrorCode, SourceFile, Span};

use crate::env::{ScopeKind, TypeEnv};
use crate::ty::{assignable, promote, Hierarchy, Type};

// ══════════════════════════════════════════════════════════════════════════════
// Class table
// ══════════════════════════════════════════════════════════════════════════════

/// Program classes by simple name, nested ones included.
pub struct ClassTable<'a> {
    by_name: HashMap<&'a str, &'a ClassDecl>,
}

impl<'a> ClassTable<'a> {
    pub fn new(program: &'a Program) -> Self {
        fn collect<'a>(decl: &'a ClassDecl, out: &mut HashMap<&'a str, &'a ClassDecl>) {
            out.entry(decl.name.name.as_str()).or_insert(decl);
            for inner in &decl.inner_classes {
                collect(inner, out);
            }
        }
        let mut by_name = HashMap::new();
        for decl in &program.classes {
            collect(decl, &mut by_name);
        }
        Self { by_name }
    }

    pub fn get(&self, name: &str) -> Option<&'a ClassDecl> {
        self.by_name.get(name).copied()
    }

    fn is_interface(&self, name: &str) -> bool {
        match self.get(name) {
            Some(decl) => decl.is_interface(),
            None => library::is_library_interface(name),
        }
    }

    /// Superclass by simple name. `None` for `Object`, interfaces and types
    /// the table knows nothing about.
    fn superclass(&self, name: &str) -> Option<String> {
        match self.get(name) {
            Some(decl) if decl.is_interface() => None,
            Some(decl) => Some(
                decl.superclass
                    .as_ref()
                    .and_then(TypeRef::simple_name)
                    .unwrap_or("Object")
                    .to_string(),
            ),
            None => library::prelude_superclass(name).map(str::to_string),
        }
    }

    /// Direct supertypes, or `None` for a type outside the program and the
    /// prelude.
    fn supertypes(&self, name: &str) -> Option<Vec<String>> {
        if let Some(decl) = self.get(name) {
            let mut supers: Vec<String> = decl
                .interfaces
                .iter()
                .filter_map(TypeRef::simple_name)
                .map(str::to_string)
                .collect();
            if decl.is_interface() {
                supers.extend(decl.superclass.as_ref().and_then(TypeRef::simple_name).map(str::to_string));
            } else {
                supers.extend(self.superclass(name));
            }
            if decl.is_enum() {
                supers.push("Comparable".into());
            }
            return Some(supers);
        }
        match name {
            "Throwable" | "Entry" => Some(vec!["Object".into()]),
            "Thread" => Some(vec!["Object".into(), "Runnable".into()]),
            _ => library::prelude_superclass(name).map(|s| vec![s.to_string()]),
        }
    }

    /// Number of classes above `name` up to and including `Object`, or
    /// `None` when the chain leaves the program and the prelude.
    pub fn ancestor_count(&self, name: &str) -> Option<u32> {
        let mut count = 0;
        let mut current = name.to_string();
        while current != "Object" {
            current = self.superclass(&current)?;
            count += 1;
            if count as usize > self.by_name.len() + 64 {
                return None;
            }
        }
        Some(count)
    }

    /// Program classes whose superclass chain loops back to themselves.
    fn cyclic(&self) -> Vec<&'a ClassDecl> {
        let mut found: Vec<&'a ClassDecl> = self
            .by_name
            .values()
            .copied()
            .filter(|decl| {
                let start = decl.name.name.as_str();
                let mut seen = HashSet::new();
                let mut current = self.superclass(start);
                while let Some(c) = current {
                    if c == start {
                        return true;
                    }
                    if !seen.insert(c.clone()) || self.get(&c).is_none() {
                        return false;
                    }
                    current = self.superclass(&c);
                }
                false
            })
            .collect();
        found.sort_by_key(|d| (d.span, d.name.name.clone()));
        found
    }

    /// Declared type of `field` in `class` or an ancestor.
    fn field_type(&self, class: &str, field: &str) -> Option<&'a TypeRef> {
        let mut current = Some(class.to_string());
        let mut steps = 0;
        while let Some(name) = current {
            let decl = self.get(&name)?;
            if let Some(f) = decl.fields.iter().find(|f| f.name.name == field) {
                return Some(&f.ty);
            }
            steps += 1;
            if steps > self.by_name.len() {
                return None;
            }
            current = self.superclass(&name);
        }
        None
    }

    /// Methods named `method` accepting `argc` arguments, in `class` and its
    /// ancestors.
    fn methods(&self, class: &str, method: &str, argc: usize) -> Vec<&'a MethodDecl> {
        let mut found = Vec::new();
        let mut current = Some(class.to_string());
        let mut steps = 0;
        while let Some(name) = current {
            let Some(decl) = self.get(&name) else {
                break;
            };
            found.extend(
                decl.methods
                    .iter()
                    .filter(|m| m.name.name == method && m.accepts_arity(argc)),
            );
            steps += 1;
            if steps > self.by_name.len() {
                break;
            }
            current = self.superclass(&name);
        }
        found
    }
}

impl Hierarchy for ClassTable<'_> {
    fn is_subtype(&self, sub: &str, sup: &str) -> Option<bool> {
        if sub == sup || sup == "Object" {
            return Some(true);
        }
        if self.supertypes(sub).is_none() {
            return library::library_is_a(sub, sup).then_some(true);
        }
        let mut uncertain = false;
        let mut seen = HashSet::new();
        let mut queue = vec![sub.to_string()];
        while let Some(name) = queue.pop() {
            if !seen.insert(name.clone()) {
                continue;
            }
            match self.supertypes(&name) {
                Some(supers) => {
                    for s in supers {
                        if s == sup {
                            return Some(true);
                        }
                        queue.push(s);
                    }
                }
                None if name == "Object" => {}
                None if library::library_is_a(&name, sup) => return Some(true),
                None => uncertain = true,
            }
        }
        if uncertain {
            None
        } else {
            Some(false)
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Checker
// ══════════════════════════════════════════════════════════════════════════════

/// Where `break` and `continue` may go.
#[derive(Debug, Clone, PartialEq)]
enum Jump {
    Loop(Option<String>),
    Switch,
    /// A labeled statement that is not a loop: only `break label` leaves it.
    Label(String),
}

/// A class body being checked.
struct ClassFrame<'a> {
    decl: &'a ClassDecl,
    /// For anonymous bodies: the type named in the `new` expression.
    anon_base: Option<String>,
}

/// Walks a [`Program`] and records static errors.
pub struct Checker<'a> {
    env: TypeEnv,
    errors: &'a mut CompileErrors,
    file: String,
    source: Option<&'a SourceFile>,
    classes: ClassTable<'a>,
    frames: Vec<ClassFrame<'a>>,
    /// Type parameters of the methods being checked, innermost last.
    method_type_params: Vec<&'a [String]>,
    jumps: Vec<Jump>,
}

impl<'a> Checker<'a> {
    pub fn new(program: &'a Program, errors: &'a mut CompileErrors) -> Self {
        Self {
            env: TypeEnv::new(),
            errors,
            file: program.file.clone(),
            source: None,
            classes: ClassTable::new(program),
            frames: Vec::new(),
            method_type_params: Vec::new(),
            jumps: Vec::new(),
        }
    }

    /// Quote source lines in the errors.
    pub fn with_source(mut self, source: &'a SourceFile) -> Self {
        self.source = Some(source);
        self
    }

    /// Check a complete program.
    pub fn check(&mut self, program: &'a Program) {
        let cyclic = self.classes.cyclic();
        for decl in &cyclic {
            self.error(
                ErrorCode::CYCLIC_INHERITANCE,
                format!("Cyclic inheritance involving '{}'", decl.name),
                decl.span,
            );
        }
        if !cyclic.is_empty() {
            return;
        }

        for decl in &program.classes {
            self.check_class(decl, None);
        }
        self.check_stmts(&program.main);
    }

    // ══════════════════════════════════════════════════════════════════════
    // Classes
    // ══════════════════════════════════════════════════════════════════════

    fn check_class(&mut self, decl: &'a ClassDecl, anon_base: Option<String>) {
        self.frames.push(ClassFrame { decl, anon_base });
        let saved_jumps = std::mem::take(&mut self.jumps);

        if let Some(sup) = &decl.superclass {
            self.check_type_ref(sup, decl.span);
        }
        for iface in &decl.interfaces {
            self.check_type_ref(iface, decl.span);
        }

        for field in &decl.fields {
            self.check_type_ref(&field.ty, field.span);
            if let Some(init) = &field.init {
                self.env.push_scope(ScopeKind::Member);
                let value_ty = self.check_expr(init);
                self.env.pop_scope();
                let declared = self.resolve(&field.ty);
                if !assignable(&value_ty, &declared, is_int_constant(init), &self.classes) {
                    self.error(
                        ErrorCode::CANT_ASSIGN_TO_FIELD,
                        format!(
                            "Can't assign a value of type {value_ty} to field '{}' of type {declared}",
                            field.name
                        ),
                        init.span,
                    );
                }
            }
        }

        for constant in &decl.enum_constants {
            for arg in &constant.args {
                self.check_expr(arg);
            }
        }

        for block in &decl.static_blocks {
            self.env.push_scope(ScopeKind::Member);
            self.check_stmts(&block.stmts);
            self.env.pop_scope();
        }

        for ctor in &decl.constructors {
            self.env.push_scope(ScopeKind::Member);
            self.define_params(&ctor.params);
            self.check_stmts(&ctor.body.stmts);
            self.env.pop_scope();
        }

        for method in &decl.methods {
            self.method_type_params.push(&method.type_params);
            self.env.push_scope(ScopeKind::Member);
            self.define_params(&method.params);
            self.check_type_ref(&method.ret, method.span);
            if let Some(body) = &method.body {
                self.check_stmts(&body.stmts);
            }
            self.env.pop_scope();
            self.method_type_params.pop();
        }

        for inner in &decl.inner_classes {
            self.check_class(inner, None);
        }

        self.jumps = saved_jumps;
        self.frames.pop();
    }

    fn define_params(&mut self, params: &'a [Param]) {
        for param in params {
            self.check_type_ref(&param.ty, param.span);
            let ty = self.resolve(&param.ty);
            if !self.env.define(&param.name.name, ty) {
                self.already_defined(&param.name);
            }
        }
    }

    // ══════════════════════════════════════════════════════════════════════
    // Types
    // ══════════════════════════════════════════════════════════════════════

    fn is_type_param(&self, name: &str) -> bool {
        self.frames
            .iter()
            .any(|f| f.decl.type_params.iter().any(|p| p == name))
            || self
                .method_type_params
                .iter()
                .any(|params| params.iter().any(|p| p == name))
    }

    fn is_known_type(&self, name: &str) -> bool {
        self.classes.get(name).is_some()
            || library::is_library_type(name)
            || library::is_prelude_type(name)
            || PrimType::from_wrapper(name).is_some()
            || name.starts_with('?')
            || self.is_type_param(name)
    }

    /// Report unknown class names anywhere in `ty`, type arguments included.
    fn check_type_ref(&mut self, ty: &TypeRef, span: Span) {
        match ty {
            TypeRef::Class { args, .. } => {
                if let Some(name) = ty.simple_name() {
                    if !self.is_known_type(name) {
                        self.error(
                            ErrorCode::UNKNOWN_TYPE,
                            format!("Unknown type '{ty}'"),
                            span,
                        );
                    }
                }
                for arg in args {
                    self.check_type_ref(arg, span);
                }
            }
            TypeRef::Array(elem) => self.check_type_ref(elem, span),
            TypeRef::Prim(_) | TypeRef::Var | TypeRef::Void => {}
        }
    }

    fn resolve(&self, ty: &TypeRef) -> Type {
        Type::from_ref(ty, |name| self.is_type_param(name))
    }

    /// Static type of `this` in the innermost class body.
    fn this_type(&self) -> Type {
        match self.frames.last() {
            Some(ClassFrame {
                anon_base: Some(base),
                ..
            }) => Type::Class(base.clone()),
            Some(frame) => Type::Class(frame.decl.name.name.clone()),
            None => Type::Unknown,
        }
    }

    /// Classes whose members an unqualified name may refer to, innermost
    /// first.
    fn lexical_classes(&self) -> Vec<String> {
        let mut names = Vec::new();
        for frame in self.frames.iter().rev() {
            names.push(frame.decl.name.name.clone());
            if let Some(base) = &frame.anon_base {
                names.push(base.clone());
            }
        }
        names
    }

    fn field_of_lexical(&self, name: &str) -> Option<Type> {
        for frame in self.frames.iter().rev() {
            if let Some(f) = frame.decl.fields.iter().find(|f| f.name.name == name) {
                return Some(self.resolve(&f.ty));
            }
            let owner = frame.anon_base.as_deref().unwrap_or(&frame.decl.name.name);
            if let Some(ty) = self.classes.field_type(owner, name) {
                return Some(self.resolve(ty));
            }
        }
        None
    }

    /// Return type shared by every candidate, if they agree.
    fn return_type(&self, candidates: &[&'a MethodDecl]) -> Type {
        let mut types = candidates.iter().map(|m| {
            Type::from_ref(&m.ret, |n| self.is_type_param(n) || m.type_params.iter().any(|p| p == n))
        });
        match types.next() {
            Some(first) if types.all(|t| t == first) => first,
            _ => Type::Unknown,
        }
    }

    // ══════════════════════════════════════════════════════════════════════
    // Statements
    // ══════════════════════════════════════════════════════════════════════

    fn check_stmts(&mut self, stmts: &'a [Stmt]) {
        for stmt in stmts {
            self.check_stmt(stmt);
        }
    }

    fn check_scoped(&mut self, stmt: &'a Stmt) {
        self.env.push_scope(ScopeKind::Block);
        match &stmt.kind {
            StmtKind::Block(block) => self.check_stmts(&block.stmts),
            _ => self.check_stmt(stmt),
        }
        self.env.pop_scope();
    }

    fn check_stmt(&mut self, stmt: &'a Stmt) {
        match &stmt.kind {
            StmtKind::LocalVar(decl) => self.check_local(decl, stmt.span),
            StmtKind::Expr(expr) => {
                self.check_expr(expr);
            }
            StmtKind::Block(_) => self.check_scoped(stmt),
            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                self.check_expr(cond);
                self.check_scoped(then_branch);
                if let Some(otherwise) = else_branch {
                    self.check_scoped(otherwise);
                }
            }
            StmtKind::While { .. }
            | StmtKind::DoWhile { .. }
            | StmtKind::For { .. }
            | StmtKind::ForEach { .. } => self.check_loop(stmt, None),
            StmtKind::Switch(switch) => {
                self.check_expr(&switch.selector);
                self.jumps.push(Jump::Switch);
                self.env.push_scope(ScopeKind::Block);
                for case in &switch.cases {
                    for label in &case.labels {
                        self.check_expr(label);
                    }
                    self.check_stmts(&case.body);
                }
                self.env.pop_scope();
                self.jumps.pop();
            }
            StmtKind::Break(label) => {
                let ok = match label {
                    None => self
                        .jumps
                        .iter()
                        .any(|j| matches!(j, Jump::Loop(_) | Jump::Switch)),
                    Some(l) => self.jumps.iter().any(|j| match j {
                        Jump::Loop(Some(name)) | Jump::Label(name) => *name == l.name,
                        _ => false,
                    }),
                };
                if !ok {
                    let message = match label {
                        Some(l) => format!("Undefined label '{l}'"),
                        None => "'break' outside of a loop or switch".to_string(),
                    };
                    self.error(ErrorCode::BREAK_OUTSIDE_LOOP, message, stmt.span);
                }
            }
            StmtKind::Continue(label) => {
                let ok = self.jumps.iter().any(|j| match (j, label) {
                    (Jump::Loop(_), None) => true,
                    (Jump::Loop(Some(name)), Some(l)) => *name == l.name,
                    _ => false,
                });
                if !ok {
                    let message = match label {
                        Some(l) => format!("Undefined loop label '{l}'"),
                        None => "'continue' outside of a loop".to_string(),
                    };
                    self.error(ErrorCode::BREAK_OUTSIDE_LOOP, message, stmt.span);
                }
            }
            StmtKind::Return(value) => {
                if let Some(value) = value {
                    self.check_expr(value);
                }
            }
            StmtKind::Throw(value) => {
                self.check_expr(value);
            }
            StmtKind::Try(t) => {
                self.env.push_scope(ScopeKind::Block);
                self.check_stmts(&t.body.stmts);
                self.env.pop_scope();
                for catch in &t.catches {
                    self.env.push_scope(ScopeKind::Block);
                    for ty in &catch.types {
                        self.check_type_ref(ty, catch.span);
                    }
                    let ty = match catch.types.as_slice() {
                        [single] => self.resolve(single),
                        _ => Type::Class("Throwable".into()),
                    };
                    self.env.define(&catch.var.name, ty);
                    self.check_stmts(&catch.body.stmts);
                    self.env.pop_scope();
                }
                if let Some(finally) = &t.finally {
                    self.env.push_scope(ScopeKind::Block);
                    self.check_stmts(&finally.stmts);
                    self.env.pop_scope();
                }
            }
            StmtKind::Labeled { label, body } => match &body.kind {
                StmtKind::While { .. }
                | StmtKind::DoWhile { .. }
                | StmtKind::For { .. }
                | StmtKind::ForEach { .. } => self.check_loop(body, Some(label.name.clone())),
                _ => {
                    self.jumps.push(Jump::Label(label.name.clone()));
                    self.check_scoped(body);
                    self.jumps.pop();
                }
            },
            StmtKind::ConstructorCall { args, .. } => {
                for arg in args {
                    self.check_expr(arg);
                }
            }
            StmtKind::Empty => {}
        }
    }

    fn check_loop(&mut self, stmt: &'a Stmt, label: Option<String>) {
        self.env.push_scope(ScopeKind::Block);
        let body = match &stmt.kind {
            StmtKind::While { cond, body } | StmtKind::DoWhile { body, cond } => {
                self.check_expr(cond);
                Some(body)
            }
            StmtKind::For {
                init,
                cond,
                update,
                body,
            } => {
                self.check_stmts(init);
                if let Some(cond) = cond {
                    self.check_expr(cond);
                }
                for u in update {
                    self.check_expr(u);
                }
                Some(body)
            }
            StmtKind::ForEach {
                ty,
                var,
                iterable,
                body,
            } => {
                self.check_type_ref(ty, stmt.span);
                let iter_ty = self.check_expr(iterable);
                let var_ty = match (ty, iter_ty) {
                    (TypeRef::Var, Type::Array(elem)) => *elem,
                    (TypeRef::Var, _) => Type::Unknown,
                    (declared, _) => self.resolve(declared),
                };
                if !self.env.define(&var.name, var_ty) {
                    self.already_defined(var);
                }
                Some(body)
            }
            _ => None,
        };
        if let Some(body) = body {
            self.jumps.push(Jump::Loop(label));
            self.check_scoped(body);
            self.jumps.pop();
        }
        self.env.pop_scope();
    }

    fn check_local(&mut self, decl: &'a LocalVarDecl, span: Span) {
        self.check_type_ref(&decl.ty, span);
        let declared = self.resolve(&decl.ty);
        for d in &decl.declarators {
            let mut ty = declared.clone();
            if let Some(init) = &d.init {
                let value_ty = self.check_expr(init);
                if decl.ty == TypeRef::Var {
                    ty = value_ty;
                } else if !assignable(&value_ty, &declared, is_int_constant(init), &self.classes) {
                    self.error(
                        ErrorCode::CANT_ASSIGN_TO_LOCAL,
                        format!(
                            "Can't assign a value of type {value_ty} to a local variable of type {declared}"
                        ),
                        init.span,
                    );
                }
            }
            if !self.env.define(&d.name.name, ty) {
                self.already_defined(&d.name);
            }
        }
    }

    // ══════════════════════════════════════════════════════════════════════
    // Expressions
    // ══════════════════════════════════════════════════════════════════════

    fn check_expr(&mut self, expr: &'a Expr) -> Type {
        match &expr.kind {
            // ── Literals ──
            ExprKind::IntLit(_) => Type::Prim(PrimType::Int),
            ExprKind::LongLit(_) => Type::Prim(PrimType::Long),
            ExprKind::FloatLit(_) => Type::Prim(PrimType::Float),
            ExprKind::DoubleLit(_) => Type::Prim(PrimType::Double),
            ExprKind::BoolLit(_) => Type::Prim(PrimType::Boolean),
            ExprKind::CharLit(_) => Type::Prim(PrimType::Char),
            ExprKind::StringLit(_) => Type::String,
            ExprKind::NullLit => Type::Null,

            // ── Names & Members ──
            ExprKind::Name(name) => self
                .env
                .lookup(name)
                .cloned()
                .or_else(|| self.field_of_lexical(name))
                .unwrap_or(Type::Unknown),
            ExprKind::This => self.this_type(),
            ExprKind::FieldAccess { object, field } => {
                match self.check_expr(object) {
                    Type::Array(_) if field.name == "length" => Type::Prim(PrimType::Int),
                    Type::Class(class) => self
                        .classes
                        .field_type(&class, &field.name)
                        .map_or(Type::Unknown, |ty| self.resolve(ty)),
                    _ => Type::Unknown,
                }
            }
            ExprKind::SuperField { depth, .. } => {
                self.check_super(*depth, expr.span);
                Type::Unknown
            }

            // ── Calls ──
            ExprKind::Call { name, args } => {
                for arg in args {
                    self.check_expr(arg);
                }
                for class in self.lexical_classes() {
                    let candidates = self.classes.methods(&class, &name.name, args.len());
                    if !candidates.is_empty() {
                        return self.return_type(&candidates);
                    }
                }
                Type::Unknown
            }
            ExprKind::MethodCall {
                object,
                method,
                args,
            } => {
                let receiver = self.check_expr(object);
                for arg in args {
                    self.check_expr(arg);
                }
                match receiver {
                    Type::String => string_method_type(&method.name),
                    Type::Class(class) => {
                        let candidates = self.classes.methods(&class, &method.name, args.len());
                        self.return_type(&candidates)
                    }
                    _ => Type::Unknown,
                }
            }
            ExprKind::SuperCall { depth, args, .. } => {
                self.check_super(*depth, expr.span);
                for arg in args {
                    self.check_expr(arg);
                }
                Type::Unknown
            }

            // ── Creation ──
            ExprKind::New(new) => self.check_new(new, expr.span),
            ExprKind::NewArray {
                elem,
                dims,
                extra_dims,
            } => {
                self.check_type_ref(elem, expr.span);
                for dim in dims {
                    self.check_expr(dim);
                }
                let mut ty = self.resolve(elem);
                for _ in 0..dims.len() + *extra_dims as usize {
                    ty = Type::Array(Box::new(ty));
                }
                ty
            }
            ExprKind::ArrayLit { elem, elements } => {
                self.check_type_ref(elem, expr.span);
                for e in elements {
                    self.check_expr(e);
                }
                Type::Array(Box::new(self.resolve(elem)))
            }

            // ── Access & Mutation ──
            ExprKind::Index { array, index } => {
                let array_ty = self.check_expr(array);
                self.check_expr(index);
                match array_ty {
                    Type::Array(elem) => *elem,
                    _ => Type::Unknown,
                }
            }
            ExprKind::Assign { target, value, .. } => {
                let ty = self.check_expr(target);
                self.check_expr(value);
                ty
            }
            ExprKind::IncDec { target, .. } => self.check_expr(target),

            // ── Operators ──
            ExprKind::Binary { left, op, right } => {
                let l = self.check_expr(left);
                let r = self.check_expr(right);
                binary_type(*op, &l, &r)
            }
            ExprKind::Unary { op, operand } => {
                let ty = self.check_expr(operand);
                match (op, ty.prim()) {
                    (UnaryOp::Not, _) => Type::Prim(PrimType::Boolean),
                    (_, Some(p)) if p.is_numeric() => Type::Prim(promote(p, PrimType::Int)),
                    _ => Type::Unknown,
                }
            }
            ExprKind::Conditional {
                cond,
                then_expr,
                else_expr,
            } => {
                self.check_expr(cond);
                let a = self.check_expr(then_expr);
                let b = self.check_expr(else_expr);
                match (a, b) {
                    (a, b) if a == b => a,
                    (Type::Null, other) | (other, Type::Null)
                        if !matches!(other, Type::Prim(_)) =>
                    {
                        other
                    }
                    (Type::Prim(x), Type::Prim(y)) if x.is_numeric() && y.is_numeric() => {
                        Type::Prim(promote(x, y))
                    }
                    _ => Type::Unknown,
                }
            }
            ExprKind::Cast { ty, expr: inner } => {
                self.check_type_ref(ty, expr.span);
                self.check_expr(inner);
                self.resolve(ty)
            }
            ExprKind::InstanceOf { expr: inner, ty } => {
                self.check_type_ref(ty, expr.span);
                self.check_expr(inner);
                Type::Prim(PrimType::Boolean)
            }

            // ── Lambda ──
            ExprKind::Lambda(lambda) => {
                let saved_jumps = std::mem::take(&mut self.jumps);
                self.env.push_scope(ScopeKind::Lambda);
                for param in &lambda.params {
                    self.env.define(&param.name, Type::Unknown);
                }
                match &lambda.body {
                    LambdaBody::Expr(body) => {
                        self.check_expr(body);
                    }
                    LambdaBody::Block(block) => self.check_stmts(&block.stmts),
                }
                self.env.pop_scope();
                self.jumps = saved_jumps;
                Type::Unknown
            }

            // ── Grouping ──
            ExprKind::Paren(inner) => self.check_expr(inner),
        }
    }

    fn check_new(&mut self, new: &'a NewExpr, span: Span) -> Type {
        if let Some(outer) = &new.outer {
            self.check_expr(outer);
        }
        self.check_type_ref(&new.class, span);
        for arg in &new.args {
            self.check_expr(arg);
        }

        let name = new.class.simple_name().unwrap_or_default().to_string();
        if let Some(decl) = self.classes.get(&name) {
            let argc = new.args.len();
            let fits = if decl.constructors.is_empty() {
                argc == 0
            } else {
                decl.constructors.iter().any(|c| c.accepts_arity(argc))
            };
            let checked = !decl.is_interface() && !decl.is_enum();
            if checked && !fits {
                self.error(
                    ErrorCode::WRONG_ARG_COUNT,
                    format!("No constructor of '{name}' takes {argc} argument(s)"),
                    span,
                );
            }
        }

        if let Some(body) = &new.body {
            self.env.push_scope(ScopeKind::Member);
            self.check_class(body, Some(name));
            self.env.pop_scope();
        }
        self.resolve(&new.class)
    }

    fn check_super(&mut self, depth: u32, span: Span) {
        let Some(frame) = self.frames.last() else {
            self.error(
                ErrorCode::SUPER_OUTSIDE_CLASS,
                "'super' used outside of a class".to_string(),
                span,
            );
            return;
        };
        let (owner, ancestors) = match &frame.anon_base {
            Some(base) if self.classes.is_interface(base) => (base.clone(), Some(1)),
            Some(base) => (base.clone(), self.classes.ancestor_count(base).map(|n| n + 1)),
            None => {
                let name = frame.decl.name.name.clone();
                let count = self.classes.ancestor_count(&name);
                (name, count)
            }
        };
        if let Some(n) = ancestors {
            if depth > n {
                self.error(
                    ErrorCode::INVALID_SUPER_DEPTH,
                    format!("'super' of depth {depth} exceeds the {n} ancestor(s) of '{owner}'"),
                    span,
                );
            }
        }
    }

    // ══════════════════════════════════════════════════════════════════════
    // Error Reporting
    // ══════════════════════════════════════════════════════════════════════

    fn already_defined(&mut self, name: &Ident) {
        self.error(
            ErrorCode::VARIABLE_ALREADY_DECLARED,
            format!("Variable '{name}' is already defined in this scope"),
            name.span,
        );
    }

    fn error(&mut self, code: ErrorCode, message: String, span: Span) {
        let source_line = self
            .source
            .and_then(|s| s.line(span.start_line))
            .unwrap_or("")
            .to_string();
        self.errors
            .push(CompileError::new(&self.file, code, message, span, source_line));
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Helpers
// ══════════════════════════════════════════════════════════════════════════════

/// An int-valued expression built only from literals, which also converts
/// to `char` on assignment.
fn is_int_constant(expr: &Expr) -> bool {
    fn constant(expr: &Expr) -> bool {
        match &expr.kind {
            ExprKind::IntLit(_) | ExprKind::CharLit(_) => true,
            ExprKind::Paren(inner) => constant(inner),
            ExprKind::Unary { operand, .. } => constant(operand),
            ExprKind::Binary { left, right, .. } => constant(left) && constant(right),
            _ => false,
        }
    }
    !matches!(expr.unparen().kind, ExprKind::CharLit(_)) && constant(expr)
}

fn binary_type(op: BinOp, l: &Type, r: &Type) -> Type {
    let boolean = Type::Prim(PrimType::Boolean);
    match op {
        BinOp::And | BinOp::Or => boolean,
        op if op.is_comparison() => boolean,
        BinOp::Add if *l == Type::String || *r == Type::String => Type::String,
        BinOp::BitAnd | BinOp::BitOr | BinOp::BitXor if l.is_boolean() && r.is_boolean() => {
            boolean
        }
        BinOp::Shl | BinOp::Shr | BinOp::UShr => match l.prim() {
            Some(p) if p.is_numeric() => Type::Prim(promote(p, PrimType::Int)),
            _ => Type::Unknown,
        },
        _ => match (l.prim(), r.prim()) {
            (Some(a), Some(b)) if a.is_numeric() && b.is_numeric() => Type::Prim(promote(a, b)),
            _ => Type::Unknown,
        },
    }
}

/// Result type of the `String` methods whose type is fixed.
fn string_method_type(method: &str) -> Type {
    match method {
        "length" | "indexOf" | "lastIndexOf" | "compareTo" | "compareToIgnoreCase"
        | "hashCode" => Type::Prim(PrimType::Int),
        "charAt" => Type::Prim(PrimType::Char),
        "isEmpty" | "isBlank" | "contains" | "startsWith" | "endsWith" | "equals"
        | "equalsIgnoreCase" | "matches" => Type::Prim(PrimType::Boolean),
        "substring" | "trim" | "strip" | "toLowerCase" | "toUpperCase" | "concat" | "replace"
        | "replaceAll" | "replaceFirst" | "repeat" | "toString" | "intern" => Type::String,
        _ => Type::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use javelin_types::build::*;

    fn errors_of(prog: &Program) -> CompileErrors {
        let mut errors = CompileErrors::new();
        Checker::new(prog, &mut errors).check(prog);
        errors
    }

    #[test]
    fn test_int_constant_detection() {
        assert!(is_int_constant(&int(65)));
        assert!(is_int_constant(&add(chr('a'), int(1))));
        assert!(!is_int_constant(&chr('a')));
        assert!(!is_int_constant(&name("x")));
    }

    #[test]
    fn test_binary_types() {
        let int = Type::Prim(PrimType::Int);
        let dbl = Type::Prim(PrimType::Double);
        assert_eq!(binary_type(BinOp::Add, &int, &dbl), dbl);
        assert_eq!(binary_type(BinOp::Add, &int, &Type::String), Type::String);
        assert_eq!(
            binary_type(BinOp::Less, &int, &dbl),
            Type::Prim(PrimType::Boolean)
        );
        assert_eq!(binary_type(BinOp::Mul, &Type::Unknown, &int), Type::Unknown);
    }

    #[test]
    fn test_ancestor_count() {
        let prog = program(
            vec![
                class("A").build(),
                class("B").extends("A").build(),
                class("E").extends("RuntimeException").build(),
            ],
            vec![],
        );
        let table = ClassTable::new(&prog);
        assert_eq!(table.ancestor_count("A"), Some(1));
        assert_eq!(table.ancestor_count("B"), Some(2));
        assert_eq!(table.ancestor_count("E"), Some(4));
    }

    #[test]
    fn test_subtyping_through_interfaces() {
        let prog = program(
            vec![
                interface("Shape").build(),
                class("Square").implements("Shape").build(),
                class("Other").build(),
            ],
            vec![],
        );
        let table = ClassTable::new(&prog);
        assert_eq!(table.is_subtype("Square", "Shape"), Some(true));
        assert_eq!(table.is_subtype("Other", "Shape"), Some(false));
        assert_eq!(table.is_subtype("Square", "Object"), Some(true));
    }

    #[test]
    fn test_clean_program_has_no_errors() {
        let prog = program(
            vec![class("A").field_init("int", "x", int(1)).build()],
            vec![local("A", "a", new("A", vec![])), println(field(name("a"), "x"))],
        );
        assert!(!errors_of(&prog).has_errors());
    }
}
