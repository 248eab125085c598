//! Read-only AST traversal.
//!
//! Implement [`Visitor`] and override the hooks of interest; the `walk_*`
//! functions descend into children. Nested and anonymous class bodies are
//! visited through [`Visitor::visit_class`].

use crate::ast::*;

pub trait Visitor {
    fn visit_class(&mut self, class: &ClassDecl) {
        walk_class(self, class);
    }

    fn visit_stmt(&mut self, stmt: &Stmt) {
        walk_stmt(self, stmt);
    }

    fn visit_expr(&mut self, expr: &Expr) {
        walk_expr(self, expr);
    }
}

pub fn walk_program<V: Visitor + ?Sized>(v: &mut V, program: &Program) {
    for class in &program.classes {
        v.visit_class(class);
    }
    for stmt in &program.main {
        v.visit_stmt(stmt);
    }
}

pub fn walk_class<V: Visitor + ?Sized>(v: &mut V, class: &ClassDecl) {
    for field in &class.fields {
        if let Some(init) = &field.init {
            v.visit_expr(init);
        }
    }
    for constant in &class.enum_constants {
        for arg in &constant.args {
            v.visit_expr(arg);
        }
    }
    for block in &class.static_blocks {
        walk_block(v, block);
    }
    for ctor in &class.constructors {
        walk_block(v, &ctor.body);
    }
    for method in &class.methods {
        if let Some(body) = &method.body {
            walk_block(v, body);
        }
    }
    for inner in &class.inner_classes {
        v.visit_class(inner);
    }
}

pub fn walk_block<V: Visitor + ?Sized>(v: &mut V, block: &Block) {
    for stmt in &block.stmts {
        v.visit_stmt(stmt);
    }
}

pub fn walk_stmt<V: Visitor + ?Sized>(v: &mut V, stmt: &Stmt) {
    match &stmt.kind {
        StmtKind::LocalVar(decl) => {
            for d in &decl.declarators {
                if let Some(init) = &d.init {
                    v.visit_expr(init);
                }
            }
        }
        StmtKind::Expr(e) | StmtKind::Throw(e) => v.visit_expr(e),
        StmtKind::Block(b) => walk_block(v, b),
        StmtKind::If {
            cond,
            then_branch,
            else_branch,
        } => {
            v.visit_expr(cond);
            v.visit_stmt(then_branch);
            if let Some(e) = else_branch {
                v.visit_stmt(e);
            }
        }
        StmtKind::While { cond, body } | StmtKind::DoWhile { body, cond } => {
            v.visit_expr(cond);
            v.visit_stmt(body);
        }
        StmtKind::For {
            init,
            cond,
            update,
            body,
        } => {
            for s in init {
                v.visit_stmt(s);
            }
            if let Some(c) = cond {
                v.visit_expr(c);
            }
            for u in update {
                v.visit_expr(u);
            }
            v.visit_stmt(body);
        }
        StmtKind::ForEach { iterable, body, .. } => {
            v.visit_expr(iterable);
            v.visit_stmt(body);
        }
        StmtKind::Switch(sw) => {
            v.visit_expr(&sw.selector);
            for case in &sw.cases {
                for label in &case.labels {
                    v.visit_expr(label);
                }
                for s in &case.body {
                    v.visit_stmt(s);
                }
            }
        }
        StmtKind::Return(e) => {
            if let Some(e) = e {
                v.visit_expr(e);
            }
        }
        StmtKind::Try(t) => {
            walk_block(v, &t.body);
            for c in &t.catches {
                walk_block(v, &c.body);
            }
            if let Some(f) = &t.finally {
                walk_block(v, f);
            }
        }
        StmtKind::Labeled { body, .. } => v.visit_stmt(body),
        StmtKind::ConstructorCall { args, .. } => {
            for a in args {
                v.visit_expr(a);
            }
        }
        StmtKind::Break(_) | StmtKind::Continue(_) | StmtKind::Empty => {}
    }
}

pub fn walk_expr<V: Visitor + ?Sized>(v: &mut V, expr: &Expr) {
    match &expr.kind {
        ExprKind::IntLit(_)
        | ExprKind::LongLit(_)
        | ExprKind::FloatLit(_)
        | ExprKind::DoubleLit(_)
        | ExprKind::BoolLit(_)
        | ExprKind::CharLit(_)
        | ExprKind::StringLit(_)
        | ExprKind::NullLit
        | ExprKind::Name(_)
        | ExprKind::This
        | ExprKind::SuperField { .. } => {}
        ExprKind::FieldAccess { object, .. } => v.visit_expr(object),
        ExprKind::Call { args, .. } | ExprKind::SuperCall { args, .. } => {
            for a in args {
                v.visit_expr(a);
            }
        }
        ExprKind::MethodCall { object, args, .. } => {
            v.visit_expr(object);
            for a in args {
                v.visit_expr(a);
            }
        }
        ExprKind::New(new) => {
            if let Some(outer) = &new.outer {
                v.visit_expr(outer);
            }
            for a in &new.args {
                v.visit_expr(a);
            }
            if let Some(body) = &new.body {
                v.visit_class(body);
            }
        }
        ExprKind::NewArray { dims, .. } => {
            for d in dims {
                v.visit_expr(d);
            }
        }
        ExprKind::ArrayLit { elements, .. } => {
            for e in elements {
                v.visit_expr(e);
            }
        }
        ExprKind::Index { array, index } => {
            v.visit_expr(array);
            v.visit_expr(index);
        }
        ExprKind::Assign { target, value, .. } => {
            v.visit_expr(target);
            v.visit_expr(value);
        }
        ExprKind::IncDec { target, .. } => v.visit_expr(target),
        ExprKind::Binary { left, right, .. } => {
            v.visit_expr(left);
            v.visit_expr(right);
        }
        ExprKind::Unary { operand, .. } => v.visit_expr(operand),
        ExprKind::Conditional {
            cond,
            then_expr,
            else_expr,
        } => {
            v.visit_expr(cond);
            v.visit_expr(then_expr);
            v.visit_expr(else_expr);
        }
        ExprKind::Cast { expr, .. } | ExprKind::InstanceOf { expr, .. } => v.visit_expr(expr),
        ExprKind::Lambda(lambda) => match &lambda.body {
            LambdaBody::Expr(e) => v.visit_expr(e),
            LambdaBody::Block(b) => walk_block(v, b),
        },
        ExprKind::Paren(inner) => v.visit_expr(inner),
    }
}
