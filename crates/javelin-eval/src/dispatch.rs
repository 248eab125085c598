//! Calls, object creation and class initialization.

use std::sync::Arc;

use javelin_types::ast::*;
use javelin_types::Span;
use tracing::{debug, trace};

use crate::assertions;
use crate::class::ClassId;
use crate::env::Environment;
use crate::error::{EvalError, EvalResult};
use crate::evaluator::{Evaluator, Frame, StaticTarget};
use crate::exec::Completion;
use crate::heap::{HeapObject, Instance, NativeSlot, ObjRef};
use crate::stdlib;
use crate::threads;
use crate::value::{Closure, Value};

impl Evaluator {
    // ══════════════════════════════════════════════════════════════════════
    // Call expressions
    // ══════════════════════════════════════════════════════════════════════

    /// `name(args)`: a method of the current class or an enclosing one, else
    /// a host function.
    pub(crate) fn eval_call(&mut self, name: &str, args: &[Expr], span: Span) -> EvalResult<Value> {
        let args = self.eval_args(args)?;
        let rt = self.rt.clone();
        let classes = &rt.classes;
        let mut lexical = self.frame.class;
        let mut receiver = self.frame.this;
        while let Some(cls) = lexical {
            let candidates = classes.methods(cls, name, args.len());
            if !candidates.is_empty() || classes.declares_method(cls, name) {
                if let Some((owner, m)) = self.select_method(&candidates, &args)? {
                    if m.is_static {
                        return self.invoke_method(None, owner, &m, args);
                    }
                }
                return match receiver {
                    Some(obj) => self.call_instance(obj, name, args),
                    None => Err(EvalError::UnresolvedName(format!(
                        "instance method {name} called from a static context"
                    ))),
                };
            }
            receiver = match receiver {
                Some(obj) => self.instance_info(obj)?.and_then(|i| i.outer),
                None => None,
            };
            lexical = classes.get(cls).enclosing;
        }
        match assertions::call_host(self, name, args, span)? {
            Some(v) => Ok(v),
            None => Err(EvalError::UnresolvedName(format!("{name}()"))),
        }
    }

    /// `object.method(args)`
    pub(crate) fn eval_method_call(
        &mut self,
        object: &Expr,
        method: &str,
        args: &[Expr],
        span: Span,
    ) -> EvalResult<Value> {
        if let Some(target) = self.static_target(object) {
            let args = self.eval_args(args)?;
            return match target {
                StaticTarget::Class(cls) => self.call_static(cls, method, args, span),
                StaticTarget::Library(holder) => {
                    stdlib::call_static(self, &holder, method, args, span)
                }
                StaticTarget::SystemOut => self.system_out(method, args),
            };
        }
        let receiver = self.eval_expr(object)?;
        let args = self.eval_args(args)?;
        self.call_method(receiver, method, args)
    }

    /// `super.m(args)`: non-virtual call starting `depth` classes up.
    pub(crate) fn eval_super_call(
        &mut self,
        depth: u32,
        method: &str,
        args: &[Expr],
    ) -> EvalResult<Value> {
        let args = self.eval_args(args)?;
        let rt = self.rt.clone();
        let (Some(this), Some(cls)) = (self.frame.this, self.frame.class) else {
            return Err(EvalError::UnresolvedName(format!("super.{method}")));
        };
        let start = rt
            .classes
            .ancestor_at(cls, depth)
            .ok_or_else(|| EvalError::UnresolvedName(format!("super.{method}")))?;
        let candidates = rt.classes.methods(start, method, args.len());
        match self.select_method(&candidates, &args)? {
            Some((owner, m)) => self.invoke_method(Some(this), owner, &m, args),
            None => self.object_builtin(this, method, args),
        }
    }

    fn system_out(&mut self, method: &str, args: Vec<Value>) -> EvalResult<Value> {
        let text = match (method, args.as_slice()) {
            ("println", []) => "\n".to_string(),
            ("println", [v]) => self.render(v)? + "\n",
            ("print", [v]) => self.render(v)?,
            ("printf" | "format", [fmt, rest @ ..]) => {
                let fmt = self.render(fmt)?;
                stdlib::string::format(self, &fmt, rest)?
            }
            _ => {
                return Err(EvalError::UnresolvedName(format!(
                    "System.out.{method}/{}",
                    args.len()
                )))
            }
        };
        self.rt.host.print(&text);
        Ok(Value::Null)
    }

    // ══════════════════════════════════════════════════════════════════════
    // Method dispatch
    // ══════════════════════════════════════════════════════════════════════

    /// Call `method` on any value.
    pub fn call_method(&mut self, receiver: Value, method: &str, args: Vec<Value>) -> EvalResult<Value> {
        match &receiver {
            Value::Null => Err(self.npe(format!(
                "Cannot invoke \"{method}()\" because value is null"
            ))),
            Value::Str(s) => stdlib::string::call(self, s, method, args),
            Value::Bool(_)
            | Value::Char(_)
            | Value::Int(_)
            | Value::Long(_)
            | Value::Float(_)
            | Value::Double(_)
            | Value::Boxed(_) => stdlib::boxed::call(self, &receiver, method, args),
            Value::Optional(inner) => stdlib::optional::call(self, inner.clone(), method, args),
            Value::DateTime(dt) => stdlib::datetime::call(self, *dt, method, args),
            Value::Closure(c) => match (method, args.as_slice()) {
                ("equals", [other]) => Ok(Value::Bool(
                    matches!(other, Value::Closure(o) if Arc::ptr_eq(o, c)),
                )),
                ("hashCode", []) => Ok(Value::Int(Arc::as_ptr(c) as usize as i32 & 0x7fff_ffff)),
                ("toString", []) => Ok(Value::str(self.render(&receiver)?)),
                _ => self.call_closure(c, args),
            },
            Value::Ref(r) => match self.class_of(*r)? {
                Some(_) => self.call_instance(*r, method, args),
                None => stdlib::call_object(self, *r, method, args),
            },
        }
    }

    /// Virtual call on a class instance, falling back to the behaviour every
    /// object has.
    pub(crate) fn call_instance(&mut self, obj: ObjRef, method: &str, args: Vec<Value>) -> EvalResult<Value> {
        let cls = self
            .class_of(obj)?
            .ok_or_else(|| EvalError::TypeMismatch(format!("{method} called on a non-object")))?;
        let candidates = self.rt.classes.methods(cls, method, args.len());
        match self.select_method(&candidates, &args)? {
            Some((owner, m)) => self.invoke_method(Some(obj), owner, &m, args),
            None => self.object_builtin(obj, method, args),
        }
    }

    /// Methods implemented natively for class instances: `Object`'s, enum
    /// members, thread control and `printStackTrace`.
    fn object_builtin(&mut self, obj: ObjRef, method: &str, args: Vec<Value>) -> EvalResult<Value> {
        let rt = self.rt.clone();
        let cls = self
            .class_of(obj)?
            .ok_or_else(|| EvalError::TypeMismatch(format!("{method} called on a non-object")))?;
        let native = rt.heap.with(obj, |o| match o {
            HeapObject::Instance(i) => i.native.clone(),
            _ => NativeSlot::None,
        })?;
        match (method, args.as_slice(), &native) {
            ("toString", [], _) => Ok(Value::str(self.default_text(obj)?)),
            ("equals", [other], _) => Ok(Value::Bool(matches!(other, Value::Ref(o) if *o == obj))),
            ("hashCode", [], _) => Ok(Value::Int(obj.identity_hash())),
            ("getClass", [], _) => Ok(Value::str(rt.classes.name_of(cls))),
            ("name", [], NativeSlot::Enum { name, .. }) => Ok(Value::Str(name.clone())),
            ("ordinal", [], NativeSlot::Enum { ordinal, .. }) => Ok(Value::Int(*ordinal)),
            ("compareTo", [other], NativeSlot::Enum { ordinal, .. }) => {
                let theirs = match other {
                    Value::Ref(o) => rt.heap.with(*o, |o| match o {
                        HeapObject::Instance(Instance {
                            native: NativeSlot::Enum { ordinal, .. },
                            ..
                        }) => Some(*ordinal),
                        _ => None,
                    })?,
                    Value::Null => return Err(self.npe("Cannot compare to null")),
                    _ => None,
                };
                let theirs = theirs.ok_or_else(|| {
                    EvalError::TypeMismatch("enum compared with a non-enum value".into())
                })?;
                Ok(Value::Int(ordinal - theirs))
            }
            ("start", [], _) if rt.classes.is_a(cls, "Thread") => {
                threads::start(self, obj)?;
                Ok(Value::Null)
            }
            ("join", [] | [_], _) if rt.classes.is_a(cls, "Thread") => {
                threads::join(self, obj)?;
                Ok(Value::Null)
            }
            ("isAlive", [], _) if rt.classes.is_a(cls, "Thread") => {
                Ok(Value::Bool(threads::is_alive(self, obj)?))
            }
            ("printStackTrace", [], _) if rt.classes.is_a(cls, "Throwable") => {
                let text = self.default_text(obj)?;
                rt.host.print(&format!("{text}\n"));
                Ok(Value::Null)
            }
            _ => Err(EvalError::UnresolvedName(format!(
                "{}.{method}/{}",
                rt.classes.name_of(cls),
                args.len()
            ))),
        }
    }

    /// `Class.method(args)`
    fn call_static(&mut self, cls: ClassId, method: &str, args: Vec<Value>, span: Span) -> EvalResult<Value> {
        self.ensure_initialized(cls)?;
        let rt = self.rt.clone();
        let candidates: Vec<_> = rt
            .classes
            .methods(cls, method, args.len())
            .into_iter()
            .filter(|(_, m)| m.is_static)
            .collect();
        if let Some((owner, m)) = self.select_method(&candidates, &args)? {
            return self.invoke_method(None, owner, &m, args);
        }
        let desc = rt.classes.get(cls);
        if desc.is_enum() {
            let constants: Vec<Value> = (0..desc.enum_constants.len())
                .map(|i| desc.get_static(i))
                .collect();
            match (method, args.as_slice()) {
                ("values", []) => {
                    return Ok(rt.heap.alloc_array(TypeRef::class(desc.name.clone()), constants))
                }
                ("valueOf", [Value::Str(wanted)]) => {
                    for c in constants {
                        if self.enum_name(&c)?.as_deref() == Some(&**wanted) {
                            return Ok(c);
                        }
                    }
                    return Err(self.exception(
                        "IllegalArgumentException",
                        format!("No enum constant {}.{wanted}", desc.name),
                    ));
                }
                _ => {}
            }
        }
        if desc.is_prelude {
            return stdlib::call_static(self, &desc.name, method, args, span);
        }
        Err(EvalError::UnresolvedName(format!("{}.{method}", desc.name)))
    }

    /// Pick the overload that fits the runtime arguments: an exact fit,
    /// then a compatible one, then the first by arity.
    pub(crate) fn select_method(
        &self,
        candidates: &[(ClassId, Arc<MethodDecl>)],
        args: &[Value],
    ) -> EvalResult<Option<(ClassId, Arc<MethodDecl>)>> {
        if candidates.len() <= 1 {
            return Ok(candidates.first().cloned());
        }
        for exact in [true, false] {
            for (owner, m) in candidates {
                if self.params_accept(&m.params, args, exact)? {
                    return Ok(Some((*owner, m.clone())));
                }
            }
        }
        Ok(candidates.first().cloned())
    }

    fn params_accept(&self, params: &[Param], args: &[Value], exact: bool) -> EvalResult<bool> {
        let varargs = params.last().is_some_and(|p| p.varargs);
        if varargs && !(args.len() == params.len() && self.is_array(&args[params.len() - 1])?) {
            let fixed = params.len() - 1;
            let elem = params[fixed].ty.array_elem().cloned().unwrap_or(TypeRef::Var);
            for (i, arg) in args.iter().enumerate() {
                let ty = if i < fixed { &params[i].ty } else { &elem };
                if !self.accepts(ty, arg, exact)? {
                    return Ok(false);
                }
            }
            return Ok(true);
        }
        if args.len() != params.len() {
            return Ok(false);
        }
        for (p, arg) in params.iter().zip(args) {
            if !self.accepts(&p.ty, arg, exact)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Bind arguments to parameters in a fresh environment, packing trailing
    /// arguments into an array for a varargs parameter.
    fn bind_params(&mut self, params: &[Param], mut args: Vec<Value>) -> EvalResult<Environment> {
        if let Some(last) = params.last().filter(|p| p.varargs) {
            let fixed = params.len() - 1;
            let passes_array =
                args.len() == params.len() && (args[fixed].is_null() || self.is_array(&args[fixed])?);
            if !passes_array {
                let elem = last.ty.array_elem().cloned().unwrap_or(TypeRef::Var);
                let rest = args.split_off(fixed.min(args.len()));
                let mut packed = Vec::with_capacity(rest.len());
                for v in rest {
                    packed.push(self.coerce(v, &elem)?);
                }
                args.push(self.rt.heap.alloc_array(elem, packed));
            }
        }
        let mut env = Environment::new();
        for (p, v) in params.iter().zip(args) {
            let v = self.coerce(v, &p.ty)?;
            env.define(&p.name.name, p.ty.clone(), v);
        }
        Ok(env)
    }

    fn enter_call(&mut self) -> EvalResult<()> {
        if self.depth >= self.rt.config.max_call_depth {
            return Err(self.throwable("StackOverflowError", None));
        }
        self.depth += 1;
        Ok(())
    }

    /// Scope chain visible to code of `cls` running on `obj`.
    fn captured_for(&self, obj: ObjRef, cls: ClassId) -> EvalResult<Option<Arc<Environment>>> {
        if !self.rt.classes.get(cls).is_anonymous {
            return Ok(None);
        }
        Ok(self.instance_info(obj)?.and_then(|i| i.captured))
    }

    /// Run a method body with `this` bound (or not, for statics).
    pub(crate) fn invoke_method(
        &mut self,
        this: Option<ObjRef>,
        owner: ClassId,
        method: &MethodDecl,
        args: Vec<Value>,
    ) -> EvalResult<Value> {
        let Some(body) = &method.body else {
            return Err(EvalError::UnresolvedName(format!(
                "abstract method {}",
                method.name
            )));
        };
        trace!(method = %method.name, depth = self.depth, "invoke");
        let env = self.bind_params(&method.params, args)?;
        let captured = match this {
            Some(obj) => self.captured_for(obj, owner)?,
            None => None,
        };
        let frame = Frame {
            this,
            class: Some(owner),
            captured,
        };
        self.enter_call()?;
        let result = self.in_frame(env, frame, |ev| ev.exec_body(body));
        self.depth -= 1;
        let value = result?;
        match method.ret {
            TypeRef::Void => Ok(Value::Null),
            ref ret => self.coerce(value, ret),
        }
    }

    /// Run a block as a method body, yielding its return value.
    pub(crate) fn exec_body(&mut self, body: &Block) -> EvalResult<Value> {
        match self.exec_block(body)? {
            Completion::Return(v) => Ok(v),
            _ => Ok(Value::Null),
        }
    }

    pub(crate) fn call_closure(&mut self, closure: &Closure, args: Vec<Value>) -> EvalResult<Value> {
        let mut env = closure.env.clone();
        env.push_scope();
        for (param, v) in closure.lambda.params.iter().zip(args) {
            env.define(&param.name, TypeRef::Var, v);
        }
        self.enter_call()?;
        let result = self.in_frame(env, closure.frame.clone(), |ev| match &closure.lambda.body {
            LambdaBody::Expr(e) => ev.eval_expr(e),
            LambdaBody::Block(b) => ev.exec_body(b),
        });
        self.depth -= 1;
        result
    }

    /// Invoke a functional value: a lambda, or an object implementing the
    /// interface whose single method is `method`.
    pub fn call_functional(&mut self, target: &Value, method: &str, args: Vec<Value>) -> EvalResult<Value> {
        match target {
            Value::Closure(c) => self.call_closure(c, args),
            Value::Null => Err(self.npe(format!(
                "Cannot invoke \"{method}()\" because value is null"
            ))),
            other => self.call_method(other.clone(), method, args),
        }
    }

    // ══════════════════════════════════════════════════════════════════════
    // Object creation
    // ══════════════════════════════════════════════════════════════════════

    pub(crate) fn eval_new(&mut self, new: &NewExpr) -> EvalResult<Value> {
        let explicit_outer = match &new.outer {
            Some(e) => match self.eval_expr(e)? {
                Value::Ref(r) => Some(r),
                Value::Null => return Err(self.npe("Cannot create inner object of null")),
                other => {
                    return Err(EvalError::TypeMismatch(format!(
                        "{} cannot enclose an inner class",
                        other.type_name()
                    )))
                }
            },
            None => None,
        };
        let args = self.eval_args(&new.args)?;
        let rt = self.rt.clone();
        if let Some(body) = &new.body {
            let cls = rt
                .classes
                .lookup(&body.name.name)
                .ok_or_else(|| EvalError::UnresolvedName(body.name.name.clone()))?;
            let captured = Arc::new(self.env.clone());
            return self.instantiate(cls, args, explicit_outer, Some(captured));
        }
        let TypeRef::Class { name, .. } = &new.class else {
            return Err(EvalError::TypeMismatch(format!("cannot instantiate {}", new.class)));
        };
        let scope = match explicit_outer {
            Some(outer) => self.class_of(outer)?,
            None => self.frame.class,
        };
        match rt.classes.resolve(scope, name) {
            Some(cls) => {
                if rt.classes.get(cls).is_abstract {
                    return Err(EvalError::TypeMismatch(format!(
                        "{name} is abstract; cannot be instantiated"
                    )));
                }
                self.instantiate(cls, args, explicit_outer, None)
            }
            None => {
                let simple = new.class.simple_name().unwrap_or(name);
                stdlib::construct(self, simple, args)
            }
        }
    }

    /// Create an instance of `cls` and run its constructor chain.
    pub fn instantiate(
        &mut self,
        cls: ClassId,
        args: Vec<Value>,
        explicit_outer: Option<ObjRef>,
        captured: Option<Arc<Environment>>,
    ) -> EvalResult<Value> {
        self.ensure_initialized(cls)?;
        let desc = self.rt.classes.get(cls);
        let outer = if desc.needs_outer {
            explicit_outer.or_else(|| self.find_outer_for(desc.enclosing))
        } else {
            None
        };
        let obj = self.alloc_instance(cls, outer, captured, NativeSlot::None);
        self.run_constructor(obj, cls, args)?;
        Ok(Value::Ref(obj))
    }

    /// Allocate an instance with every field at its default.
    fn alloc_instance(
        &self,
        cls: ClassId,
        outer: Option<ObjRef>,
        captured: Option<Arc<Environment>>,
        native: NativeSlot,
    ) -> ObjRef {
        let classes = &self.rt.classes;
        let mut fields = vec![Value::Null; classes.get(cls).field_count];
        for c in classes.chain(cls) {
            for f in &classes.get(c).fields {
                if let Some(slot) = fields.get_mut(f.slot) {
                    *slot = Value::default_for(&f.ty);
                }
            }
        }
        self.rt.heap.alloc(HeapObject::Instance(Instance {
            class: cls,
            fields,
            outer,
            captured,
            native,
        }))
    }

    /// Run the constructor of `cls` matching `args` on `obj`.
    fn run_constructor(&mut self, obj: ObjRef, cls: ClassId, args: Vec<Value>) -> EvalResult<()> {
        let rt = self.rt.clone();
        let desc = rt.classes.get(cls);
        if desc.constructors.is_empty() {
            if let Some(sup) = desc.superclass {
                let forwarded = if desc.is_anonymous { args } else { Vec::new() };
                self.run_constructor(obj, sup, forwarded)?;
            }
            return self.init_fields(obj, cls);
        }
        let ctor = self.select_constructor(&desc.constructors, &args)?;
        let env = self.bind_params(&ctor.params, args)?;
        let frame = Frame {
            this: Some(obj),
            class: Some(cls),
            captured: self.captured_for(obj, cls)?,
        };
        self.enter_call()?;
        let result = self.in_frame(env, frame, |ev| ev.constructor_body(obj, cls, &ctor.body));
        self.depth -= 1;
        result
    }

    fn select_constructor(
        &self,
        ctors: &[Arc<ConstructorDecl>],
        args: &[Value],
    ) -> EvalResult<Arc<ConstructorDecl>> {
        let fitting: Vec<_> = ctors.iter().filter(|c| c.accepts_arity(args.len())).collect();
        for exact in [true, false] {
            for c in &fitting {
                if self.params_accept(&c.params, args, exact)? {
                    return Ok((*c).clone());
                }
            }
        }
        fitting.first().map(|c| (*c).clone()).ok_or_else(|| {
            EvalError::TypeMismatch(format!("no constructor takes {} arguments", args.len()))
        })
    }

    /// Explicit or implicit `this(...)`/`super(...)`, field initializers,
    /// then the rest of the body.
    fn constructor_body(&mut self, obj: ObjRef, cls: ClassId, body: &Block) -> EvalResult<()> {
        let superclass = self.rt.classes.get(cls).superclass;
        let (first, rest) = match body.stmts.split_first() {
            Some((s, rest)) if matches!(s.kind, StmtKind::ConstructorCall { .. }) => (Some(s), rest),
            _ => (None, body.stmts.as_slice()),
        };
        match first.map(|s| &s.kind) {
            Some(StmtKind::ConstructorCall {
                target: ConstructorTarget::This,
                args,
            }) => {
                let args = self.eval_args(args)?;
                self.run_constructor(obj, cls, args)?;
            }
            Some(StmtKind::ConstructorCall {
                target: ConstructorTarget::Super,
                args,
            }) => {
                let args = self.eval_args(args)?;
                if let Some(sup) = superclass {
                    self.run_constructor(obj, sup, args)?;
                }
                self.init_fields(obj, cls)?;
            }
            _ => {
                if let Some(sup) = superclass {
                    self.run_constructor(obj, sup, Vec::new())?;
                }
                self.init_fields(obj, cls)?;
            }
        }
        self.env.push_scope();
        let result = self.exec_stmts(rest);
        self.env.pop_scope();
        result.map(|_| ())
    }

    /// Evaluate the field initializers `cls` declares.
    fn init_fields(&mut self, obj: ObjRef, cls: ClassId) -> EvalResult<()> {
        let rt = self.rt.clone();
        let desc = rt.classes.get(cls);
        if desc.fields.iter().all(|f| f.init.is_none()) {
            return Ok(());
        }
        let frame = Frame {
            this: Some(obj),
            class: Some(cls),
            captured: self.captured_for(obj, cls)?,
        };
        self.in_frame(Environment::new(), frame, |ev| {
            for f in &desc.fields {
                if let Some(init) = &f.init {
                    let v = ev.eval_expr(init)?;
                    let v = ev.coerce(v, &f.ty)?;
                    ev.rt.heap.with(obj, |o| {
                        if let HeapObject::Instance(i) = o {
                            if let Some(cell) = i.fields.get_mut(f.slot) {
                                *cell = v;
                            }
                        }
                    })?;
                }
            }
            Ok(())
        })
    }

    // ══════════════════════════════════════════════════════════════════════
    // Static initialization
    // ══════════════════════════════════════════════════════════════════════

    /// Run static initialization of `cls` (superclass first) unless it has
    /// run or is running.
    pub(crate) fn ensure_initialized(&mut self, cls: ClassId) -> EvalResult<()> {
        let rt = self.rt.clone();
        let desc = rt.classes.get(cls);
        if desc.is_initialized() {
            return Ok(());
        }
        if !desc.begin_init() {
            desc.wait_init();
            return Ok(());
        }
        if let Some(sup) = desc.superclass {
            self.ensure_initialized(sup)?;
        }
        debug!(class = %desc.name, "static init");
        let frame = Frame {
            this: None,
            class: Some(cls),
            captured: None,
        };
        let result = self.in_frame(Environment::new(), frame, |ev| ev.run_static_init(cls));
        desc.finish_init();
        result
    }

    fn run_static_init(&mut self, cls: ClassId) -> EvalResult<()> {
        let rt = self.rt.clone();
        let desc = rt.classes.get(cls);
        for (ordinal, constant) in desc.enum_constants.iter().enumerate() {
            let args = self.eval_args(&constant.args)?;
            let native = NativeSlot::Enum {
                ordinal: ordinal as i32,
                name: Arc::from(constant.name.name.as_str()),
            };
            let obj = self.alloc_instance(cls, None, None, native);
            desc.set_static(ordinal, Value::Ref(obj));
            self.run_constructor(obj, cls, args)?;
        }
        for (index, s) in desc.statics.iter().enumerate() {
            if let Some(init) = &s.init {
                let v = self.eval_expr(init)?;
                let v = self.coerce(v, &s.ty)?;
                desc.set_static(index, v);
            }
        }
        for block in &desc.static_blocks {
            self.exec_block(block)?;
        }
        Ok(())
    }
}
