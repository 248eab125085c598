//! Core expression evaluator.
//!
//! One [`Evaluator`] runs per execution context. It owns its scope chain and
//! call frame and shares everything else (classes, heap, host) through the
//! [`Runtime`]. Statements live in [`crate::exec`], calls and object creation
//! in [`crate::dispatch`], conversions in [`crate::convert`].

use std::sync::Arc;

use javelin_types::ast::*;
use javelin_types::library;

use crate::class::ClassId;
use crate::env::{Environment, Slot};
use crate::error::{EvalError, EvalResult};
use crate::heap::{HeapObject, Instance, NativeSlot, ObjRef};
use crate::ops::{self, OpError};
use crate::runtime::Runtime;
use crate::value::{Closure, Value};

/// Receiver and class context of the code being run.
#[derive(Debug, Clone, Default)]
pub struct Frame {
    /// `this`, absent in static code and in the entry statements.
    pub this: Option<ObjRef>,
    /// Class whose code is running; decides `super` and lexical lookup.
    pub class: Option<ClassId>,
    /// Scope chain an anonymous class body closes over.
    pub captured: Option<Arc<Environment>>,
}

/// The tree-walking evaluator for one execution context.
pub struct Evaluator {
    pub(crate) rt: Arc<Runtime>,
    /// Variable environment (scoped).
    pub(crate) env: Environment,
    pub(crate) frame: Frame,
    /// Active method and lambda calls.
    pub(crate) depth: usize,
    /// Steps taken; limited by `RunConfig::gas_limit`.
    gas: u64,
    pub(crate) thread_name: Arc<str>,
}

/// An assignable location.
#[derive(Debug, Clone)]
pub(crate) enum Place {
    Local(Slot, TypeRef),
    Field(ObjRef, usize, TypeRef),
    Static(ClassId, usize, TypeRef),
    Element(ObjRef, usize),
}

/// A qualifier naming a type rather than a value.
#[derive(Debug, Clone)]
pub(crate) enum StaticTarget {
    Class(ClassId),
    Library(String),
    SystemOut,
}

/// Link fields of a class instance.
#[derive(Debug, Clone)]
pub(crate) struct InstanceInfo {
    pub class: ClassId,
    pub outer: Option<ObjRef>,
    pub captured: Option<Arc<Environment>>,
}

impl Evaluator {
    pub fn new(rt: Arc<Runtime>, thread_name: impl Into<Arc<str>>) -> Self {
        Self {
            rt,
            env: Environment::new(),
            frame: Frame::default(),
            depth: 0,
            gas: 0,
            thread_name: thread_name.into(),
        }
    }

    /// Consume one unit of gas. Returns error if exhausted.
    pub(crate) fn tick(&mut self) -> EvalResult<()> {
        self.gas += 1;
        let limit = self.rt.config.gas_limit;
        if limit > 0 && self.gas > limit {
            Err(EvalError::GasExhausted)
        } else {
            Ok(())
        }
    }

    pub fn gas_used(&self) -> u64 {
        self.gas
    }

    /// Run `f` with a replaced scope chain and frame, restoring both after.
    pub(crate) fn in_frame<T>(
        &mut self,
        env: Environment,
        frame: Frame,
        f: impl FnOnce(&mut Self) -> EvalResult<T>,
    ) -> EvalResult<T> {
        let saved_env = std::mem::replace(&mut self.env, env);
        let saved_frame = std::mem::replace(&mut self.frame, frame);
        let result = f(self);
        self.env = saved_env;
        self.frame = saved_frame;
        result
    }

    // ══════════════════════════════════════════════════════════════════════
    // Runtime exceptions
    // ══════════════════════════════════════════════════════════════════════

    /// A program exception of class `class`, created without running any
    /// constructor code.
    pub(crate) fn throwable(&self, class: &str, message: Option<String>) -> EvalError {
        let classes = &self.rt.classes;
        let Some(id) = classes.lookup(class).filter(|id| classes.is_a(*id, "Throwable")) else {
            return EvalError::Runtime(format!(
                "{class}: {}",
                message.unwrap_or_default()
            ));
        };
        let desc = classes.get(id);
        let mut fields = vec![Value::Null; desc.field_count];
        if let (Some(info), Some(message)) = (classes.find_field(id, "message"), message) {
            if let Some(slot) = fields.get_mut(info.slot) {
                *slot = Value::str(message);
            }
        }
        let obj = self.rt.heap.alloc(HeapObject::Instance(Instance {
            class: id,
            fields,
            outer: None,
            captured: None,
            native: NativeSlot::None,
        }));
        EvalError::Exception(Value::Ref(obj))
    }

    pub(crate) fn exception(&self, class: &str, message: impl Into<String>) -> EvalError {
        self.throwable(class, Some(message.into()))
    }

    pub(crate) fn npe(&self, message: impl Into<String>) -> EvalError {
        self.exception("NullPointerException", message)
    }

    pub(crate) fn op_error(&self, e: OpError) -> EvalError {
        match e {
            OpError::DivideByZero => self.exception("ArithmeticException", "/ by zero"),
            OpError::NullOperand => self.npe("Cannot unbox null value"),
            OpError::TypeMismatch(m) => EvalError::TypeMismatch(m),
        }
    }

    // ══════════════════════════════════════════════════════════════════════
    // Expression evaluation
    // ══════════════════════════════════════════════════════════════════════

    /// Evaluate an expression to a Value.
    pub fn eval_expr(&mut self, expr: &Expr) -> EvalResult<Value> {
        self.tick()?;
        match &expr.kind {
            ExprKind::IntLit(i) => Ok(Value::Int(*i)),
            ExprKind::LongLit(l) => Ok(Value::Long(*l)),
            ExprKind::FloatLit(f) => Ok(Value::Float(*f)),
            ExprKind::DoubleLit(d) => Ok(Value::Double(*d)),
            ExprKind::BoolLit(b) => Ok(Value::Bool(*b)),
            ExprKind::CharLit(c) => Ok(Value::Char(*c)),
            ExprKind::StringLit(s) => Ok(Value::str(s)),
            ExprKind::NullLit => Ok(Value::Null),

            ExprKind::Name(name) => self.eval_name(name),
            ExprKind::This => self
                .frame
                .this
                .map(Value::Ref)
                .ok_or_else(|| EvalError::UnresolvedName("this".into())),
            ExprKind::FieldAccess { object, field } => {
                self.eval_field_access(object, &field.name)
            }
            ExprKind::SuperField { depth, field } => {
                let place = self.super_field_place(*depth, &field.name)?;
                self.read_place(&place)
            }

            ExprKind::Call { name, args } => self.eval_call(&name.name, args, expr.span),
            ExprKind::MethodCall {
                object,
                method,
                args,
            } => self.eval_method_call(object, &method.name, args, expr.span),
            ExprKind::SuperCall {
                depth,
                method,
                args,
            } => self.eval_super_call(*depth, &method.name, args),

            ExprKind::New(new) => self.eval_new(new),
            ExprKind::NewArray {
                elem,
                dims,
                extra_dims,
            } => self.eval_new_array(elem, dims, *extra_dims),
            ExprKind::ArrayLit { elem, elements } => self.eval_array_literal(elem, elements),

            ExprKind::Index { array, index } => {
                let place = self.element_place(array, index)?;
                self.read_place(&place)
            }
            ExprKind::Assign { target, op, value } => self.eval_assign(target, *op, value),
            ExprKind::IncDec { target, op } => self.eval_inc_dec(target, *op),

            ExprKind::Binary { left, op, right } => self.eval_binary(left, *op, right),
            ExprKind::Unary { op, operand } => {
                let v = self.eval_expr(operand)?;
                ops::unary(*op, &v).map_err(|e| self.op_error(e))
            }
            ExprKind::Conditional {
                cond,
                then_expr,
                else_expr,
            } => {
                if self.eval_cond(cond)? {
                    self.eval_expr(then_expr)
                } else {
                    self.eval_expr(else_expr)
                }
            }
            ExprKind::Cast { ty, expr } => {
                let v = self.eval_expr(expr)?;
                self.cast(v, ty)
            }
            ExprKind::InstanceOf { expr, ty } => {
                let v = self.eval_expr(expr)?;
                Ok(Value::Bool(self.instance_of(&v, ty)?))
            }

            ExprKind::Lambda(lambda) => Ok(Value::Closure(Arc::new(Closure {
                lambda: lambda.clone(),
                env: self.env.clone(),
                frame: self.frame.clone(),
            }))),
            ExprKind::Paren(inner) => self.eval_expr(inner),
        }
    }

    /// Evaluate a boolean condition.
    pub(crate) fn eval_cond(&mut self, expr: &Expr) -> EvalResult<bool> {
        let v = self.eval_expr(expr)?;
        match v {
            Value::Null => Err(self.npe("Cannot unbox null value")),
            other => other.as_bool().ok_or_else(|| {
                EvalError::TypeMismatch(format!(
                    "condition must be boolean, got {}",
                    other.type_name()
                ))
            }),
        }
    }

    pub(crate) fn eval_args(&mut self, args: &[Expr]) -> EvalResult<Vec<Value>> {
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.eval_expr(arg)?);
        }
        Ok(values)
    }

    // ── Operators ─────────────────────────────────────────────────────────

    fn eval_binary(&mut self, left: &Expr, op: BinOp, right: &Expr) -> EvalResult<Value> {
        match op {
            BinOp::And => {
                let l = self.eval_cond(left)?;
                return Ok(Value::Bool(l && self.eval_cond(right)?));
            }
            BinOp::Or => {
                let l = self.eval_cond(left)?;
                return Ok(Value::Bool(l || self.eval_cond(right)?));
            }
            _ => {}
        }
        let l = self.eval_expr(left)?;
        let r = self.eval_expr(right)?;
        self.binary_values(op, l, r)
    }

    /// Apply a binary operator to evaluated operands. `+` with a string on
    /// either side concatenates.
    pub(crate) fn binary_values(&mut self, op: BinOp, l: Value, r: Value) -> EvalResult<Value> {
        if op == BinOp::Add && (matches!(l, Value::Str(_)) || matches!(r, Value::Str(_))) {
            let mut text = self.render(&l)?;
            text.push_str(&self.render(&r)?);
            return Ok(Value::str(text));
        }
        ops::binary(op, &l, &r).map_err(|e| self.op_error(e))
    }

    // ── Assignment ────────────────────────────────────────────────────────

    fn eval_assign(&mut self, target: &Expr, op: AssignOp, value: &Expr) -> EvalResult<Value> {
        let place = self.place(target)?;
        let rhs = self.eval_expr(value)?;
        match op.binary_op() {
            None => self.write_place(&place, rhs),
            Some(bop) => self.compound(&place, bop, rhs),
        }
    }

    /// `place op= rhs`, read-modify-write under the place's lock.
    pub(crate) fn compound(&mut self, place: &Place, op: BinOp, rhs: Value) -> EvalResult<Value> {
        if op != BinOp::Add {
            let (_, new) = self.update_place(place, |old| {
                ops::binary(op, old, &rhs).map(|r| ops::narrow_like(old, r))
            })?;
            return Ok(new);
        }
        // `var` locals and lambda params have no declared type, so the
        // current value decides between concatenation and addition.
        let string_place = self.place_type(place)?.is_string();
        let rhs_is_str = matches!(rhs, Value::Str(_));
        let suffix = self.render(&rhs)?;
        let (_, new) = self.update_place(place, |old| {
            if string_place || rhs_is_str || matches!(old, Value::Str(_)) {
                let mut text = old.primitive_text().unwrap_or_default();
                text.push_str(&suffix);
                Ok(Value::str(text))
            } else {
                ops::binary(op, old, &rhs).map(|r| ops::narrow_like(old, r))
            }
        })?;
        Ok(new)
    }

    fn eval_inc_dec(&mut self, target: &Expr, op: IncDecOp) -> EvalResult<Value> {
        let place = self.place(target)?;
        let delta = if op.is_increment() {
            BinOp::Add
        } else {
            BinOp::Sub
        };
        let (old, new) = self.update_place(&place, |old| {
            ops::binary(delta, old, &Value::Int(1)).map(|r| ops::narrow_like(old, r))
        })?;
        Ok(if op.is_prefix() { new } else { old })
    }

    // ══════════════════════════════════════════════════════════════════════
    // Names
    // ══════════════════════════════════════════════════════════════════════

    fn eval_name(&mut self, name: &str) -> EvalResult<Value> {
        if let Some(v) = self.env.get(name) {
            return Ok(v);
        }
        match self.resolve_name(name)? {
            Some(place) => self.read_place(&place),
            None => Err(EvalError::UnresolvedName(name.to_string())),
        }
    }

    /// Find the variable an unqualified name denotes.
    ///
    /// Order: locals, fields of `this`, variables captured by an anonymous
    /// class body, members of enclosing instances (and what their bodies
    /// captured), then statics of the lexical class and its enclosers.
    pub(crate) fn resolve_name(&mut self, name: &str) -> EvalResult<Option<Place>> {
        if let Some((slot, ty)) = self.env.lookup(name) {
            return Ok(Some(Place::Local(slot, ty)));
        }
        let rt = self.rt.clone();
        let classes = &rt.classes;
        if let (Some(this), Some(cls)) = (self.frame.this, self.frame.class) {
            if let Some(f) = classes.find_field(cls, name) {
                return Ok(Some(Place::Field(this, f.slot, f.ty.clone())));
            }
        }
        if let Some((slot, ty)) = self.frame.captured.as_ref().and_then(|env| env.lookup(name)) {
            return Ok(Some(Place::Local(slot, ty)));
        }

        let mut lexical = self.frame.class;
        let mut current = self.frame.this;
        while let (Some(cls), Some(obj)) = (lexical, current) {
            let Some(enclosing) = classes.get(cls).enclosing else {
                break;
            };
            let Some(outer) = self.instance_info(obj)?.and_then(|i| i.outer) else {
                break;
            };
            if let Some(f) = classes.find_field(enclosing, name) {
                return Ok(Some(Place::Field(outer, f.slot, f.ty.clone())));
            }
            let captured = self.instance_info(outer)?.and_then(|i| i.captured);
            if classes.get(enclosing).is_anonymous {
                if let Some((slot, ty)) = captured.as_ref().and_then(|env| env.lookup(name)) {
                    return Ok(Some(Place::Local(slot, ty)));
                }
            }
            lexical = Some(enclosing);
            current = Some(outer);
        }

        let mut lexical = self.frame.class;
        while let Some(cls) = lexical {
            if let Some((owner, index)) = classes.find_static(cls, name) {
                self.ensure_initialized(owner)?;
                let ty = classes.get(owner).statics[index].ty.clone();
                return Ok(Some(Place::Static(owner, index, ty)));
            }
            lexical = classes.get(cls).enclosing;
        }
        Ok(None)
    }

    /// Whether `name` denotes a variable rather than a type.
    fn names_variable(&self, name: &str) -> bool {
        if self.env.contains(name) {
            return true;
        }
        if self
            .frame
            .captured
            .as_ref()
            .is_some_and(|env| env.contains(name))
        {
            return true;
        }
        let classes = &self.rt.classes;
        let mut lexical = self.frame.class;
        while let Some(cls) = lexical {
            if classes.find_field(cls, name).is_some() || classes.find_static(cls, name).is_some() {
                return true;
            }
            lexical = classes.get(cls).enclosing;
        }
        false
    }

    /// Classify a qualifier that names a type: `Outer`, `Outer.Inner`,
    /// `Math`, `System.out`.
    pub(crate) fn static_target(&self, expr: &Expr) -> Option<StaticTarget> {
        match &expr.kind {
            ExprKind::Name(name) => {
                if self.names_variable(name) {
                    return None;
                }
                if let Some(id) = self.rt.classes.resolve(self.frame.class, name) {
                    return Some(StaticTarget::Class(id));
                }
                library::is_library_type(name).then(|| StaticTarget::Library(name.clone()))
            }
            ExprKind::FieldAccess { object, field } => match self.static_target(object)? {
                StaticTarget::Class(outer) => self
                    .rt
                    .classes
                    .nested(outer, &field.name)
                    .map(StaticTarget::Class),
                StaticTarget::Library(holder) if holder == "System" && field.name == "out" => {
                    Some(StaticTarget::SystemOut)
                }
                _ => None,
            },
            ExprKind::Paren(inner) => self.static_target(inner),
            _ => None,
        }
    }

    // ══════════════════════════════════════════════════════════════════════
    // Fields and elements
    // ══════════════════════════════════════════════════════════════════════

    fn eval_field_access(&mut self, object: &Expr, field: &str) -> EvalResult<Value> {
        if let Some(target) = self.static_target(object) {
            return self.static_field(target, field);
        }
        let obj = self.eval_expr(object)?;
        self.field_of(&obj, field)
    }

    /// Read `obj.field`, including array `length`.
    pub(crate) fn field_of(&mut self, obj: &Value, field: &str) -> EvalResult<Value> {
        if let Value::Ref(r) = obj {
            let len = self.rt.heap.with(*r, |o| match o {
                HeapObject::Array { items, .. } => Some(items.len()),
                _ => None,
            })?;
            if let Some(len) = len {
                if field == "length" {
                    return Ok(Value::Int(len as i32));
                }
            }
        }
        let place = self.field_place(obj, field)?;
        self.read_place(&place)
    }

    fn static_field(&mut self, target: StaticTarget, field: &str) -> EvalResult<Value> {
        match target {
            StaticTarget::Class(cls) if field == "this" => self
                .find_outer_for(Some(cls))
                .map(Value::Ref)
                .ok_or_else(|| {
                    EvalError::UnresolvedName(format!("{}.this", self.rt.classes.name_of(cls)))
                }),
            StaticTarget::Library(holder) => crate::stdlib::static_field(&holder, field)
                .ok_or_else(|| EvalError::UnresolvedName(format!("{holder}.{field}"))),
            target => {
                let place = self.static_place(target, field)?;
                self.read_place(&place)
            }
        }
    }

    fn static_place(&mut self, target: StaticTarget, field: &str) -> EvalResult<Place> {
        let StaticTarget::Class(cls) = target else {
            return Err(EvalError::UnresolvedName(field.to_string()));
        };
        let rt = self.rt.clone();
        match rt.classes.find_static(cls, field) {
            Some((owner, index)) => {
                self.ensure_initialized(owner)?;
                let ty = rt.classes.get(owner).statics[index].ty.clone();
                Ok(Place::Static(owner, index, ty))
            }
            None => Err(EvalError::UnresolvedName(format!(
                "{}.{field}",
                rt.classes.name_of(cls)
            ))),
        }
    }

    fn field_place(&mut self, obj: &Value, field: &str) -> EvalResult<Place> {
        let r = match obj {
            Value::Ref(r) => *r,
            Value::Null => {
                return Err(self.npe(format!(
                    "Cannot read field \"{field}\" because value is null"
                )))
            }
            other => {
                return Err(EvalError::TypeMismatch(format!(
                    "{} has no field {field}",
                    other.type_name()
                )))
            }
        };
        let Some(info) = self.instance_info(r)? else {
            return Err(EvalError::UnresolvedName(field.to_string()));
        };
        let rt = self.rt.clone();
        if let Some(f) = rt.classes.find_field(info.class, field) {
            return Ok(Place::Field(r, f.slot, f.ty.clone()));
        }
        self.static_place(StaticTarget::Class(info.class), field)
    }

    fn super_field_place(&mut self, depth: u32, field: &str) -> EvalResult<Place> {
        let rt = self.rt.clone();
        let (Some(this), Some(cls)) = (self.frame.this, self.frame.class) else {
            return Err(EvalError::UnresolvedName(format!("super.{field}")));
        };
        let start = rt
            .classes
            .ancestor_at(cls, depth)
            .ok_or_else(|| EvalError::UnresolvedName(format!("super.{field}")))?;
        if let Some(f) = rt.classes.find_field(start, field) {
            return Ok(Place::Field(this, f.slot, f.ty.clone()));
        }
        self.static_place(StaticTarget::Class(start), field)
    }

    fn element_place(&mut self, array: &Expr, index: &Expr) -> EvalResult<Place> {
        let arr = self.eval_expr(array)?;
        let idx = self.eval_expr(index)?;
        let r = match arr {
            Value::Ref(r) => r,
            Value::Null => return Err(self.npe("Cannot load from array because it is null")),
            other => {
                return Err(EvalError::TypeMismatch(format!(
                    "cannot index {}",
                    other.type_name()
                )))
            }
        };
        let i = idx
            .as_i64()
            .ok_or_else(|| EvalError::TypeMismatch("array index must be an integer".into()))?;
        let len = self
            .rt
            .heap
            .with(r, |o| match o {
                HeapObject::Array { items, .. } => Some(items.len()),
                _ => None,
            })?
            .ok_or_else(|| EvalError::TypeMismatch("indexed value is not an array".into()))?;
        if i < 0 || i >= len as i64 {
            return Err(self.exception(
                "ArrayIndexOutOfBoundsException",
                format!("Index {i} out of bounds for length {len}"),
            ));
        }
        Ok(Place::Element(r, i as usize))
    }

    /// Resolve an assignment target.
    pub(crate) fn place(&mut self, target: &Expr) -> EvalResult<Place> {
        match &target.kind {
            ExprKind::Name(name) => self
                .resolve_name(name)?
                .ok_or_else(|| EvalError::UnresolvedName(name.clone())),
            ExprKind::FieldAccess { object, field } => {
                if let Some(t) = self.static_target(object) {
                    return self.static_place(t, &field.name);
                }
                let obj = self.eval_expr(object)?;
                self.field_place(&obj, &field.name)
            }
            ExprKind::SuperField { depth, field } => self.super_field_place(*depth, &field.name),
            ExprKind::Index { array, index } => self.element_place(array, index),
            ExprKind::Paren(inner) => self.place(inner),
            _ => Err(EvalError::TypeMismatch(
                "left-hand side is not assignable".into(),
            )),
        }
    }

    // ── Place access ──────────────────────────────────────────────────────

    pub(crate) fn read_place(&self, place: &Place) -> EvalResult<Value> {
        match place {
            Place::Local(slot, _) => Ok(slot.lock().clone()),
            Place::Static(cls, index, _) => Ok(self.rt.classes.get(*cls).get_static(*index)),
            Place::Field(obj, slot, _) => self
                .rt
                .heap
                .with(*obj, |o| match o {
                    HeapObject::Instance(i) => i.fields.get(*slot).cloned(),
                    _ => None,
                })?
                .ok_or_else(|| EvalError::Runtime("field slot out of range".into())),
            Place::Element(arr, index) => self
                .rt
                .heap
                .with(*arr, |o| match o {
                    HeapObject::Array { items, .. } => items.get(*index).cloned(),
                    _ => None,
                })?
                .ok_or_else(|| EvalError::Runtime("array slot out of range".into())),
        }
    }

    fn place_type(&self, place: &Place) -> EvalResult<TypeRef> {
        match place {
            Place::Local(_, ty) | Place::Field(_, _, ty) | Place::Static(_, _, ty) => {
                Ok(ty.clone())
            }
            Place::Element(arr, _) => self
                .rt
                .heap
                .with(*arr, |o| match o {
                    HeapObject::Array { elem, .. } => elem.clone(),
                    _ => TypeRef::Var,
                }),
        }
    }

    /// Store into a place after converting to its declared type. Returns the
    /// stored value.
    pub(crate) fn write_place(&mut self, place: &Place, value: Value) -> EvalResult<Value> {
        let ty = self.place_type(place)?;
        let value = self.coerce(value, &ty)?;
        let stored = value.clone();
        match place {
            Place::Local(slot, _) => *slot.lock() = value,
            Place::Static(cls, index, _) => self.rt.classes.get(*cls).set_static(*index, value),
            Place::Field(obj, slot, _) => self.rt.heap.with(*obj, |o| {
                if let HeapObject::Instance(i) = o {
                    if let Some(f) = i.fields.get_mut(*slot) {
                        *f = value;
                    }
                }
            })?,
            Place::Element(arr, index) => self.rt.heap.with(*arr, |o| {
                if let HeapObject::Array { items, .. } = o {
                    if let Some(item) = items.get_mut(*index) {
                        *item = value;
                    }
                }
            })?,
        }
        Ok(stored)
    }

    /// Replace the value in a place with `f(old)` while holding its lock, so
    /// concurrent updates never interleave. Returns `(old, new)`.
    pub(crate) fn update_place(
        &mut self,
        place: &Place,
        f: impl FnOnce(&Value) -> Result<Value, OpError>,
    ) -> EvalResult<(Value, Value)> {
        fn apply(
            cell: &mut Value,
            f: impl FnOnce(&Value) -> Result<Value, OpError>,
        ) -> Result<(Value, Value), OpError> {
            let new = f(cell)?;
            let old = std::mem::replace(cell, new.clone());
            Ok((old, new))
        }
        let missing = || OpError::TypeMismatch("assignment target vanished".into());
        let result = match place {
            Place::Local(slot, _) => apply(&mut slot.lock(), f),
            Place::Static(cls, index, _) => {
                let desc = self.rt.classes.get(*cls);
                let mut values = desc.static_values.lock();
                match values.get_mut(*index) {
                    Some(cell) => apply(cell, f),
                    None => Err(missing()),
                }
            }
            Place::Field(obj, slot, _) => self.rt.heap.with(*obj, |o| match o {
                HeapObject::Instance(i) => match i.fields.get_mut(*slot) {
                    Some(cell) => apply(cell, f),
                    None => Err(missing()),
                },
                _ => Err(missing()),
            })?,
            Place::Element(arr, index) => self.rt.heap.with(*arr, |o| match o {
                HeapObject::Array { items, .. } => match items.get_mut(*index) {
                    Some(cell) => apply(cell, f),
                    None => Err(missing()),
                },
                _ => Err(missing()),
            })?,
        };
        result.map_err(|e| self.op_error(e))
    }

    // ══════════════════════════════════════════════════════════════════════
    // Arrays
    // ══════════════════════════════════════════════════════════════════════

    fn eval_new_array(&mut self, elem: &TypeRef, dims: &[Expr], extra: u32) -> EvalResult<Value> {
        let mut sizes = Vec::with_capacity(dims.len());
        for dim in dims {
            let n = self
                .eval_expr(dim)?
                .as_i64()
                .ok_or_else(|| EvalError::TypeMismatch("array size must be an integer".into()))?;
            if n < 0 {
                return Err(self.exception("NegativeArraySizeException", n.to_string()));
            }
            sizes.push(n as usize);
        }
        Ok(self.alloc_nested(elem, &sizes, extra))
    }

    /// Allocate `new elem[s0][s1]...[]...`: sized levels are filled, the
    /// innermost sized level holds defaults or nulls.
    fn alloc_nested(&self, elem: &TypeRef, sizes: &[usize], extra: u32) -> Value {
        let Some((&len, rest)) = sizes.split_first() else {
            return Value::Null;
        };
        let mut item_ty = elem.clone();
        for _ in 0..rest.len() + extra as usize {
            item_ty = TypeRef::array_of(item_ty);
        }
        let items = if !rest.is_empty() {
            (0..len).map(|_| self.alloc_nested(elem, rest, extra)).collect()
        } else {
            vec![Value::default_for(&item_ty); len]
        };
        self.rt.heap.alloc_array(item_ty, items)
    }

    fn eval_array_literal(&mut self, elem: &TypeRef, elements: &[Expr]) -> EvalResult<Value> {
        let mut items = Vec::with_capacity(elements.len());
        for e in elements {
            let v = self.eval_expr(e)?;
            items.push(self.coerce(v, elem)?);
        }
        Ok(self.rt.heap.alloc_array(elem.clone(), items))
    }

    // ══════════════════════════════════════════════════════════════════════
    // Heap helpers
    // ══════════════════════════════════════════════════════════════════════

    /// Class and links of a class instance; `None` for arrays and library
    /// objects.
    pub(crate) fn instance_info(&self, r: ObjRef) -> EvalResult<Option<InstanceInfo>> {
        self.rt.heap.with(r, |o| match o {
            HeapObject::Instance(i) => Some(InstanceInfo {
                class: i.class,
                outer: i.outer,
                captured: i.captured.clone(),
            }),
            _ => None,
        })
    }

    pub(crate) fn class_of(&self, r: ObjRef) -> EvalResult<Option<ClassId>> {
        Ok(self.instance_info(r)?.map(|i| i.class))
    }

    /// Constant name of an enum value.
    pub(crate) fn enum_name(&self, v: &Value) -> EvalResult<Option<Arc<str>>> {
        let Value::Ref(r) = v else {
            return Ok(None);
        };
        self.rt.heap.with(*r, |o| match o {
            HeapObject::Instance(Instance {
                native: NativeSlot::Enum { name, .. },
                ..
            }) => Some(name.clone()),
            _ => None,
        })
    }

    pub(crate) fn is_array(&self, v: &Value) -> EvalResult<bool> {
        match v {
            Value::Ref(r) => self
                .rt
                .heap
                .with(*r, |o| matches!(o, HeapObject::Array { .. })),
            _ => Ok(false),
        }
    }

    /// The innermost instance, starting at `this` and walking outward, whose
    /// class is `target` or a subclass of it.
    pub(crate) fn find_outer_for(&self, target: Option<ClassId>) -> Option<ObjRef> {
        let target = target?;
        let mut current = self.frame.this;
        while let Some(obj) = current {
            let info = self.instance_info(obj).ok().flatten()?;
            if self.rt.classes.is_subclass(info.class, target) {
                return Some(obj);
            }
            current = info.outer;
        }
        self.frame.this
    }
}
