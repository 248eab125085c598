//! Statement execution.
//!
//! Statements yield a [`Completion`]. A thrown program exception is not a
//! completion: it travels as `Err(EvalError::Exception)` so that every `?`
//! unwinds it, and `try` is the only construct that inspects it.

use javelin_types::ast::*;

use crate::error::{EvalError, EvalResult};
use crate::evaluator::Evaluator;
use crate::heap::{HeapObject, ObjRef};
use crate::value::Value;

/// How a statement finished.
#[derive(Debug, Clone)]
pub enum Completion {
    Normal,
    Break(Option<String>),
    Continue(Option<String>),
    Return(Value),
}

/// What a for-each loop walks.
enum IterSource {
    /// Read live by index, so element writes during the loop are seen.
    Array(ObjRef),
    Snapshot(Vec<Value>),
    /// An object with `hasNext()`/`next()`.
    Iterator(Value),
}

/// Decide what a loop does with its body's completion: `None` keeps
/// looping, `Some(c)` leaves the loop with `c`.
fn after_body(completion: Completion, label: Option<&str>) -> Option<Completion> {
    match completion {
        Completion::Normal | Completion::Continue(None) => None,
        Completion::Continue(Some(l)) if Some(l.as_str()) == label => None,
        Completion::Break(None) => Some(Completion::Normal),
        Completion::Break(Some(l)) if Some(l.as_str()) == label => Some(Completion::Normal),
        other => Some(other),
    }
}

impl Evaluator {
    // ══════════════════════════════════════════════════════════════════════
    // Blocks
    // ══════════════════════════════════════════════════════════════════════

    /// Execute a block in its own scope.
    pub fn exec_block(&mut self, block: &Block) -> EvalResult<Completion> {
        self.env.push_scope();
        let result = self.exec_stmts(&block.stmts);
        self.env.pop_scope();
        result
    }

    /// Execute statements in the current scope until one completes
    /// abruptly.
    pub fn exec_stmts(&mut self, stmts: &[Stmt]) -> EvalResult<Completion> {
        for stmt in stmts {
            match self.exec_stmt(stmt)? {
                Completion::Normal => {}
                other => return Ok(other),
            }
        }
        Ok(Completion::Normal)
    }

    /// A nested statement body gets a scope of its own.
    fn exec_scoped(&mut self, stmt: &Stmt) -> EvalResult<Completion> {
        if let StmtKind::Block(block) = &stmt.kind {
            return self.exec_block(block);
        }
        self.env.push_scope();
        let result = self.exec_stmt(stmt);
        self.env.pop_scope();
        result
    }

    pub fn exec_stmt(&mut self, stmt: &Stmt) -> EvalResult<Completion> {
        self.tick()?;
        match &stmt.kind {
            StmtKind::LocalVar(decl) => {
                for d in &decl.declarators {
                    let value = match &d.init {
                        Some(init) => {
                            let v = self.eval_expr(init)?;
                            self.coerce(v, &decl.ty)?
                        }
                        None => Value::default_for(&decl.ty),
                    };
                    self.env.define(&d.name.name, decl.ty.clone(), value);
                }
                Ok(Completion::Normal)
            }
            StmtKind::Expr(expr) => {
                self.eval_expr(expr)?;
                Ok(Completion::Normal)
            }
            StmtKind::Block(block) => self.exec_block(block),
            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                if self.eval_cond(cond)? {
                    self.exec_scoped(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.exec_scoped(else_branch)
                } else {
                    Ok(Completion::Normal)
                }
            }
            StmtKind::While { .. }
            | StmtKind::DoWhile { .. }
            | StmtKind::For { .. }
            | StmtKind::ForEach { .. } => self.exec_loop(stmt, None),
            StmtKind::Switch(switch) => self.exec_switch(switch),
            StmtKind::Break(label) => Ok(Completion::Break(label.as_ref().map(|l| l.name.clone()))),
            StmtKind::Continue(label) => {
                Ok(Completion::Continue(label.as_ref().map(|l| l.name.clone())))
            }
            StmtKind::Return(value) => Ok(Completion::Return(match value {
                Some(e) => self.eval_expr(e)?,
                None => Value::Null,
            })),
            StmtKind::Throw(expr) => match self.eval_expr(expr)? {
                Value::Null => Err(self.npe("Cannot throw null")),
                thrown => Err(EvalError::Exception(thrown)),
            },
            StmtKind::Try(t) => self.exec_try(t),
            StmtKind::Labeled { label, body } => {
                let completion = match &body.kind {
                    StmtKind::While { .. }
                    | StmtKind::DoWhile { .. }
                    | StmtKind::For { .. }
                    | StmtKind::ForEach { .. } => self.exec_loop(body, Some(&label.name))?,
                    _ => self.exec_stmt(body)?,
                };
                Ok(match completion {
                    Completion::Break(Some(l)) if l == label.name => Completion::Normal,
                    other => other,
                })
            }
            StmtKind::ConstructorCall { .. } => Err(EvalError::Runtime(
                "this(...)/super(...) must be the first statement of a constructor".into(),
            )),
            StmtKind::Empty => Ok(Completion::Normal),
        }
    }

    // ══════════════════════════════════════════════════════════════════════
    // Loops
    // ══════════════════════════════════════════════════════════════════════

    fn exec_loop(&mut self, stmt: &Stmt, label: Option<&str>) -> EvalResult<Completion> {
        match &stmt.kind {
            StmtKind::While { cond, body } => {
                while self.eval_cond(cond)? {
                    let c = self.exec_scoped(body)?;
                    if let Some(out) = after_body(c, label) {
                        return Ok(out);
                    }
                }
                Ok(Completion::Normal)
            }
            StmtKind::DoWhile { body, cond } => {
                loop {
                    let c = self.exec_scoped(body)?;
                    if let Some(out) = after_body(c, label) {
                        return Ok(out);
                    }
                    if !self.eval_cond(cond)? {
                        return Ok(Completion::Normal);
                    }
                }
            }
            StmtKind::For {
                init,
                cond,
                update,
                body,
            } => {
                self.env.push_scope();
                let result = self.exec_for(init, cond.as_ref(), update, body, label);
                self.env.pop_scope();
                result
            }
            StmtKind::ForEach {
                ty,
                var,
                iterable,
                body,
            } => {
                let source = self.eval_expr(iterable)?;
                let source = self.iteration_source(source)?;
                self.exec_for_each(ty, &var.name, source, body, label)
            }
            _ => self.exec_stmt(stmt),
        }
    }

    fn exec_for(
        &mut self,
        init: &[Stmt],
        cond: Option<&Expr>,
        update: &[Expr],
        body: &Stmt,
        label: Option<&str>,
    ) -> EvalResult<Completion> {
        for s in init {
            self.exec_stmt(s)?;
        }
        loop {
            if let Some(cond) = cond {
                if !self.eval_cond(cond)? {
                    return Ok(Completion::Normal);
                }
            }
            let c = self.exec_scoped(body)?;
            if let Some(out) = after_body(c, label) {
                return Ok(out);
            }
            // Closures made during this iteration keep this iteration's cells.
            self.env.refresh_scope();
            for u in update {
                self.eval_expr(u)?;
            }
        }
    }

    fn iteration_source(&mut self, source: Value) -> EvalResult<IterSource> {
        let r = match &source {
            Value::Ref(r) => *r,
            Value::Null => return Err(self.npe("Cannot iterate over null")),
            other => {
                return Err(EvalError::TypeMismatch(format!(
                    "{} is not iterable",
                    other.type_name()
                )))
            }
        };
        enum Kind {
            Array,
            Items(Vec<Value>),
            Iterator,
            Object,
            Other(&'static str),
        }
        let kind = self.rt.heap.with(r, |o| match o {
            HeapObject::Array { .. } => Kind::Array,
            HeapObject::List { items, .. } => Kind::Items(items.clone()),
            HeapObject::Set(set) => Kind::Items(set.values().cloned().collect()),
            HeapObject::Iterator { .. } => Kind::Iterator,
            HeapObject::Instance(_) => Kind::Object,
            HeapObject::Map(_) => Kind::Other("HashMap"),
        })?;
        Ok(match kind {
            Kind::Array => IterSource::Array(r),
            Kind::Items(items) => IterSource::Snapshot(items),
            Kind::Iterator => IterSource::Iterator(source),
            Kind::Object => {
                let iterable = self
                    .class_of(r)?
                    .is_some_and(|c| self.rt.classes.declares_method(c, "iterator"));
                if iterable {
                    IterSource::Iterator(self.call_method(source, "iterator", Vec::new())?)
                } else {
                    IterSource::Iterator(source)
                }
            }
            Kind::Other(name) => {
                return Err(EvalError::TypeMismatch(format!("{name} is not iterable")))
            }
        })
    }

    /// Run one for-each iteration with `var` bound in a fresh scope.
    fn for_each_step(
        &mut self,
        ty: &TypeRef,
        var: &str,
        item: Value,
        body: &Stmt,
    ) -> EvalResult<Completion> {
        let item = self.coerce(item, ty)?;
        self.env.push_scope();
        self.env.define(var, ty.clone(), item);
        let result = self.exec_scoped(body);
        self.env.pop_scope();
        result
    }

    fn exec_for_each(
        &mut self,
        ty: &TypeRef,
        var: &str,
        source: IterSource,
        body: &Stmt,
        label: Option<&str>,
    ) -> EvalResult<Completion> {
        match source {
            IterSource::Array(arr) => {
                let mut i = 0;
                loop {
                    let item = self.rt.heap.with(arr, |o| match o {
                        HeapObject::Array { items, .. } => items.get(i).cloned(),
                        _ => None,
                    })?;
                    let Some(item) = item else {
                        return Ok(Completion::Normal);
                    };
                    let c = self.for_each_step(ty, var, item, body)?;
                    if let Some(out) = after_body(c, label) {
                        return Ok(out);
                    }
                    i += 1;
                }
            }
            IterSource::Snapshot(items) => {
                for item in items {
                    let c = self.for_each_step(ty, var, item, body)?;
                    if let Some(out) = after_body(c, label) {
                        return Ok(out);
                    }
                }
                Ok(Completion::Normal)
            }
            IterSource::Iterator(it) => loop {
                let more = self.call_method(it.clone(), "hasNext", Vec::new())?;
                if !more.as_bool().unwrap_or(false) {
                    return Ok(Completion::Normal);
                }
                let item = self.call_method(it.clone(), "next", Vec::new())?;
                let c = self.for_each_step(ty, var, item, body)?;
                if let Some(out) = after_body(c, label) {
                    return Ok(out);
                }
            },
        }
    }

    // ══════════════════════════════════════════════════════════════════════
    // Switch
    // ══════════════════════════════════════════════════════════════════════

    fn exec_switch(&mut self, switch: &SwitchStmt) -> EvalResult<Completion> {
        let selector = self.eval_expr(&switch.selector)?;
        if selector.is_null() {
            return Err(self.npe("Cannot switch on null"));
        }
        let enum_name = self.enum_name(&selector)?;
        let mut start = None;
        'cases: for (i, case) in switch.cases.iter().enumerate() {
            for label in &case.labels {
                if self.case_matches(&selector, enum_name.as_deref(), label)? {
                    start = Some(i);
                    break 'cases;
                }
            }
        }
        let Some(start) = start.or_else(|| switch.cases.iter().position(SwitchCase::is_default))
        else {
            return Ok(Completion::Normal);
        };
        self.env.push_scope();
        let result = self.exec_cases(&switch.cases[start..]);
        self.env.pop_scope();
        result
    }

    /// Run case bodies from the matched one on, falling through.
    fn exec_cases(&mut self, cases: &[SwitchCase]) -> EvalResult<Completion> {
        for case in cases {
            match self.exec_stmts(&case.body)? {
                Completion::Normal => {}
                Completion::Break(None) => return Ok(Completion::Normal),
                other => return Ok(other),
            }
        }
        Ok(Completion::Normal)
    }

    fn case_matches(
        &mut self,
        selector: &Value,
        enum_name: Option<&str>,
        label: &Expr,
    ) -> EvalResult<bool> {
        if let (Some(name), ExprKind::Name(constant)) = (enum_name, &label.unparen().kind) {
            return Ok(name == constant);
        }
        let label = self.eval_expr(label)?;
        if selector.is_numeric() && label.is_numeric() {
            return Ok(selector.as_f64() == label.as_f64());
        }
        self.java_equals(selector, &label)
    }

    // ══════════════════════════════════════════════════════════════════════
    // Try
    // ══════════════════════════════════════════════════════════════════════

    fn exec_try(&mut self, t: &TryStmt) -> EvalResult<Completion> {
        let mut outcome = self.exec_block(&t.body);
        if let Err(EvalError::Exception(thrown)) = &outcome {
            let thrown = thrown.clone();
            if let Some(clause) = self.matching_catch(&t.catches, &thrown)? {
                outcome = self.exec_catch(clause, thrown);
            }
        }
        if let Some(finally) = &t.finally {
            // Faults of the runtime itself skip `finally`; program
            // exceptions and normal completions do not.
            if matches!(outcome, Ok(_) | Err(EvalError::Exception(_))) {
                match self.exec_block(finally)? {
                    Completion::Normal => {}
                    replaced => return Ok(replaced),
                }
            }
        }
        outcome
    }

    fn matching_catch<'a>(
        &self,
        catches: &'a [CatchClause],
        thrown: &Value,
    ) -> EvalResult<Option<&'a CatchClause>> {
        for clause in catches {
            for ty in &clause.types {
                if self.instance_of(thrown, ty)? {
                    return Ok(Some(clause));
                }
            }
        }
        Ok(None)
    }

    fn exec_catch(&mut self, clause: &CatchClause, thrown: Value) -> EvalResult<Completion> {
        let ty = match clause.types.as_slice() {
            [single] => single.clone(),
            _ => TypeRef::class("Throwable"),
        };
        self.env.push_scope();
        self.env.define(&clause.var.name, ty, thrown);
        let result = self.exec_block(&clause.body);
        self.env.pop_scope();
        result
    }
}
