//! Conversions that may need the heap or user code: textual rendering,
//! assignment conversion, casts, type tests, value equality, ordering and
//! hashing.

use std::cmp::Ordering;

use javelin_types::ast::{PrimType, TypeRef};
use javelin_types::library;

use crate::error::{EvalError, EvalResult};
use crate::evaluator::Evaluator;
use crate::heap::{HeapObject, Instance, NativeSlot, ObjRef};
use crate::ops;
use crate::stdlib::string::{java_hash, locale_compare};
use crate::value::{Boxed, Value};

/// Heap contents captured for rendering or comparison without holding the
/// entry lock across user code.
enum Shape {
    Instance,
    Array(Vec<Value>),
    List(Vec<Value>),
    Set(Vec<Value>),
    Map(Vec<(Value, Value)>),
    Iterator,
}

fn widens(from: PrimType, to: PrimType) -> bool {
    use PrimType::*;
    from == to
        || matches!(
            (from, to),
            (Char, Int | Long | Float | Double)
                | (Int, Long | Float | Double)
                | (Long, Float | Double)
                | (Float, Double)
        )
}

impl Evaluator {
    fn shape(&self, r: ObjRef) -> EvalResult<Shape> {
        self.rt.heap.with(r, |o| match o {
            HeapObject::Instance(_) => Shape::Instance,
            HeapObject::Array { items, .. } => Shape::Array(items.clone()),
            HeapObject::List { items, .. } => Shape::List(items.clone()),
            HeapObject::Set(set) => Shape::Set(set.values().cloned().collect()),
            HeapObject::Map(map) => Shape::Map(map.values().cloned().collect()),
            HeapObject::Iterator { .. } => Shape::Iterator,
        })
    }

    /// Whether `name` denotes any type the runtime knows, as opposed to a
    /// type parameter.
    pub(crate) fn is_known_type(&self, name: &str) -> bool {
        self.rt.classes.lookup(name).is_some() || library::is_library_type(name)
    }

    /// Type name of a value as reported in cast failures.
    pub(crate) fn runtime_type_name(&self, v: &Value) -> EvalResult<String> {
        Ok(match v {
            Value::Ref(r) => match self.class_of(*r)? {
                Some(cls) => self.rt.classes.name_of(cls).to_string(),
                None => self
                    .rt
                    .heap
                    .with(*r, |o| o.library_name().unwrap_or("Object"))?
                    .to_string(),
            },
            other => other.type_name().to_string(),
        })
    }

    // ══════════════════════════════════════════════════════════════════════
    // Rendering
    // ══════════════════════════════════════════════════════════════════════

    /// The text `String.valueOf(v)` produces.
    pub fn render(&mut self, v: &Value) -> EvalResult<String> {
        if let Some(text) = v.primitive_text() {
            return Ok(text);
        }
        match v {
            Value::Optional(None) => Ok("Nothing".into()),
            Value::Optional(Some(inner)) => Ok(format!("Just {}", self.render(inner)?)),
            Value::Closure(c) => Ok(format!(
                "Lambda@{:x}",
                std::sync::Arc::as_ptr(c) as usize as u32
            )),
            Value::Ref(r) => match self.shape(*r)? {
                Shape::Instance => self.render_instance(*r),
                Shape::Array(items) | Shape::List(items) | Shape::Set(items) => {
                    self.render_seq(&items)
                }
                Shape::Map(entries) => {
                    let mut parts = Vec::with_capacity(entries.len());
                    for (k, v) in &entries {
                        parts.push(format!("{}={}", self.render(k)?, self.render(v)?));
                    }
                    Ok(format!("{{{}}}", parts.join(", ")))
                }
                Shape::Iterator => Ok(format!("Iterator@{:x}", r.identity_hash())),
            },
            _ => Ok(String::new()),
        }
    }

    fn render_seq(&mut self, items: &[Value]) -> EvalResult<String> {
        let mut parts = Vec::with_capacity(items.len());
        for item in items {
            parts.push(self.render(item)?);
        }
        Ok(format!("[{}]", parts.join(", ")))
    }

    fn render_instance(&mut self, obj: ObjRef) -> EvalResult<String> {
        let Some(cls) = self.class_of(obj)? else {
            return Ok(String::new());
        };
        if self.rt.classes.methods(cls, "toString", 0).is_empty() {
            return self.default_text(obj);
        }
        let text = self.call_instance(obj, "toString", Vec::new())?;
        self.render(&text)
    }

    /// `Object.toString` for instances: enum constant name, exception
    /// `Name: message`, else `Name@hash`.
    pub(crate) fn default_text(&mut self, obj: ObjRef) -> EvalResult<String> {
        let rt = self.rt.clone();
        let Some(cls) = self.class_of(obj)? else {
            return Ok(String::new());
        };
        let name = rt.classes.name_of(cls).to_string();
        let enum_name = rt.heap.with(obj, |o| match o {
            HeapObject::Instance(Instance {
                native: NativeSlot::Enum { name, .. },
                ..
            }) => Some(name.clone()),
            _ => None,
        })?;
        if let Some(constant) = enum_name {
            return Ok(constant.to_string());
        }
        if rt.classes.is_a(cls, "Throwable") {
            let message = self.call_instance(obj, "getMessage", Vec::new())?;
            return Ok(match message {
                Value::Null => name,
                m => format!("{name}: {}", self.render(&m)?),
            });
        }
        Ok(format!("{name}@{:x}", obj.identity_hash()))
    }

    // ══════════════════════════════════════════════════════════════════════
    // Assignment conversion and casts
    // ══════════════════════════════════════════════════════════════════════

    /// Convert a value for storage in a variable of type `ty`: primitive
    /// widening and narrowing, boxing and unboxing, and rendering to text
    /// for `String` targets.
    pub fn coerce(&mut self, v: Value, ty: &TypeRef) -> EvalResult<Value> {
        match ty {
            TypeRef::Prim(p) => {
                if v.is_null() {
                    return Err(self.npe("Cannot unbox null value"));
                }
                ops::convert_prim(*p, &v).ok_or_else(|| {
                    EvalError::TypeMismatch(format!(
                        "cannot convert {} to {}",
                        v.type_name(),
                        p.as_str()
                    ))
                })
            }
            TypeRef::Class { .. } => {
                let simple = ty.simple_name().unwrap_or_default();
                if simple == "String" {
                    return match v {
                        Value::Str(_) | Value::Null => Ok(v),
                        other => Ok(Value::str(self.render(&other)?)),
                    };
                }
                if let Some(p) = PrimType::from_wrapper(simple) {
                    let already_boxed = matches!(&v, Value::Boxed(_)) && v.prim_kind() == Some(p);
                    if already_boxed || v.prim_kind().is_none() {
                        return Ok(v);
                    }
                    return Ok(match ops::convert_prim(p, &v) {
                        Some(converted) => Boxed::new(converted),
                        None => v,
                    });
                }
                Ok(match v {
                    Value::Bool(_)
                    | Value::Char(_)
                    | Value::Int(_)
                    | Value::Long(_)
                    | Value::Float(_)
                    | Value::Double(_) => Boxed::new(v),
                    other => other,
                })
            }
            TypeRef::Array(_) | TypeRef::Var | TypeRef::Void => Ok(v),
        }
    }

    /// `(ty) v`
    pub fn cast(&mut self, v: Value, ty: &TypeRef) -> EvalResult<Value> {
        match ty {
            TypeRef::Prim(p) => {
                if v.is_null() {
                    return Err(self.npe("Cannot unbox null value"));
                }
                match ops::convert_prim(*p, &v) {
                    Some(converted) => Ok(converted),
                    None => Err(self.class_cast(&v, p.wrapper())?),
                }
            }
            TypeRef::Class { .. } => {
                if v.is_null() {
                    return Ok(v);
                }
                let simple = ty.simple_name().unwrap_or_default();
                if let Some(p) = PrimType::from_wrapper(simple) {
                    return match v.prim_kind() {
                        Some(k) if k == p => Ok(Boxed::new(v)),
                        _ => Err(self.class_cast(&v, simple)?),
                    };
                }
                if !self.is_known_type(simple) || self.instance_of(&v, ty)? {
                    Ok(v)
                } else {
                    Err(self.class_cast(&v, simple)?)
                }
            }
            TypeRef::Array(_) => {
                if v.is_null() || self.is_array(&v)? {
                    Ok(v)
                } else {
                    Err(self.class_cast(&v, &ty.to_string())?)
                }
            }
            TypeRef::Var | TypeRef::Void => Ok(v),
        }
    }

    fn class_cast(&self, v: &Value, target: &str) -> EvalResult<EvalError> {
        let from = self.runtime_type_name(v)?;
        Ok(self.exception(
            "ClassCastException",
            format!("class {from} cannot be cast to class {target}"),
        ))
    }

    // ══════════════════════════════════════════════════════════════════════
    // Type tests
    // ══════════════════════════════════════════════════════════════════════

    /// `v instanceof ty`. Never true for `null`.
    pub fn instance_of(&self, v: &Value, ty: &TypeRef) -> EvalResult<bool> {
        if v.is_null() {
            return Ok(false);
        }
        match ty {
            TypeRef::Prim(p) => Ok(v.prim_kind() == Some(*p)),
            TypeRef::Array(_) => self.is_array(v),
            TypeRef::Var | TypeRef::Void => Ok(true),
            TypeRef::Class { .. } => {
                let target = ty.simple_name().unwrap_or_default();
                let classes = &self.rt.classes;
                match v {
                    Value::Ref(r) => match self.class_of(*r)? {
                        Some(cls) => Ok(classes.is_a(cls, target)),
                        None => {
                            let lib = self.rt.heap.with(*r, |o| o.library_name())?;
                            Ok(match lib {
                                Some("Array") | None => target == "Object",
                                Some(lib) => library::library_is_a(lib, target),
                            })
                        }
                    },
                    Value::Closure(_) => Ok(target == "Object"
                        || library::is_functional_interface(target)
                        || classes
                            .lookup(target)
                            .is_some_and(|c| classes.get(c).is_interface())),
                    other => Ok(library::library_is_a(other.type_name(), target)),
                }
            }
        }
    }

    /// Whether an argument fits a parameter type. `exact` rejects
    /// conversions (widening, boxing) so that the most specific overload
    /// is tried first.
    pub(crate) fn accepts(&self, ty: &TypeRef, v: &Value, exact: bool) -> EvalResult<bool> {
        match ty {
            TypeRef::Var => Ok(true),
            TypeRef::Void => Ok(false),
            TypeRef::Prim(p) => Ok(match v {
                Value::Boxed(_) if exact => false,
                _ => match v.prim_kind() {
                    Some(k) if exact => k == *p,
                    Some(k) => widens(k, *p),
                    None => false,
                },
            }),
            TypeRef::Array(_) => Ok(v.is_null() || self.is_array(v)?),
            TypeRef::Class { .. } => {
                if v.is_null() {
                    return Ok(true);
                }
                let simple = ty.simple_name().unwrap_or_default();
                if let Some(p) = PrimType::from_wrapper(simple) {
                    return Ok(v.prim_kind() == Some(p));
                }
                if !self.is_known_type(simple) {
                    return Ok(!exact);
                }
                let unboxed_prim = v.prim_kind().is_some() && !matches!(v, Value::Boxed(_));
                if exact && unboxed_prim {
                    return Ok(false);
                }
                self.instance_of(v, ty)
            }
        }
    }

    // ══════════════════════════════════════════════════════════════════════
    // Equality, ordering, hashing
    // ══════════════════════════════════════════════════════════════════════

    /// `a.equals(b)`: value equality for strings, boxed values, optionals,
    /// dates and collections; user `equals` for instances that declare
    /// one; identity otherwise.
    pub fn java_equals(&mut self, a: &Value, b: &Value) -> EvalResult<bool> {
        match (a, b) {
            (Value::Null, Value::Null) => Ok(true),
            (Value::Null, _) | (_, Value::Null) => Ok(false),
            (Value::Str(x), Value::Str(y)) => Ok(x == y),
            (Value::Optional(x), Value::Optional(y)) => match (x, y) {
                (None, None) => Ok(true),
                (Some(x), Some(y)) => self.java_equals(x, y),
                _ => Ok(false),
            },
            (Value::DateTime(x), Value::DateTime(y)) => Ok(x == y),
            (Value::Closure(_), _) | (_, Value::Closure(_)) => Ok(ops::identical(a, b)),
            (Value::Ref(x), _) => self.ref_equals(*x, b),
            _ => match (a.prim_kind(), b.prim_kind()) {
                (Some(ka), Some(kb)) => Ok(ka == kb && ops::identical(&a.unboxed(), &b.unboxed())),
                _ => Ok(false),
            },
        }
    }

    fn ref_equals(&mut self, a: ObjRef, b: &Value) -> EvalResult<bool> {
        if let Some(cls) = self.class_of(a)? {
            if !self.rt.classes.methods(cls, "equals", 1).is_empty() {
                let result = self.call_instance(a, "equals", vec![b.clone()])?;
                return Ok(result.as_bool().unwrap_or(false));
            }
            return Ok(matches!(b, Value::Ref(o) if *o == a));
        }
        let Value::Ref(b) = b else {
            return Ok(false);
        };
        if a == *b {
            return Ok(true);
        }
        match (self.shape(a)?, self.shape(*b)?) {
            (Shape::List(xs), Shape::List(ys)) => {
                if xs.len() != ys.len() {
                    return Ok(false);
                }
                for (x, y) in xs.iter().zip(&ys) {
                    if !self.java_equals(x, y)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            (Shape::Set(xs), Shape::Set(ys)) => {
                if xs.len() != ys.len() {
                    return Ok(false);
                }
                for x in &xs {
                    if !self.contains_value(&ys, x)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            (Shape::Map(xs), Shape::Map(ys)) => {
                if xs.len() != ys.len() {
                    return Ok(false);
                }
                for (k, v) in &xs {
                    let mut found = false;
                    for (k2, v2) in &ys {
                        if self.java_equals(k, k2)? {
                            found = self.java_equals(v, v2)?;
                            break;
                        }
                    }
                    if !found {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Position of the first element equal to `needle`.
    pub(crate) fn position_of(&mut self, items: &[Value], needle: &Value) -> EvalResult<Option<usize>> {
        for (i, item) in items.iter().enumerate() {
            if self.java_equals(item, needle)? {
                return Ok(Some(i));
            }
        }
        Ok(None)
    }

    pub(crate) fn contains_value(&mut self, items: &[Value], needle: &Value) -> EvalResult<bool> {
        Ok(self.position_of(items, needle)?.is_some())
    }

    /// Natural ordering (`Comparable.compareTo`).
    pub fn compare_natural(&mut self, a: &Value, b: &Value) -> EvalResult<Ordering> {
        let (x, y) = (a.unboxed(), b.unboxed());
        match (&x, &y) {
            (Value::Null, _) | (_, Value::Null) => Err(self.npe("Cannot compare null")),
            (Value::Str(s), Value::Str(t)) => Ok(locale_compare(s, t).cmp(&0)),
            (Value::Bool(p), Value::Bool(q)) => Ok(p.cmp(q)),
            (Value::DateTime(p), Value::DateTime(q)) => Ok(p.cmp(q)),
            _ if x.is_numeric() && y.is_numeric() => {
                if let (Some(p), Some(q), false, false) = (
                    x.as_i64(),
                    y.as_i64(),
                    matches!(x, Value::Float(_) | Value::Double(_)),
                    matches!(y, Value::Float(_) | Value::Double(_)),
                ) {
                    return Ok(p.cmp(&q));
                }
                let (p, q) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
                Ok(p.partial_cmp(&q).unwrap_or(Ordering::Equal))
            }
            (Value::Ref(_), _) => {
                let result = self.call_method(x.clone(), "compareTo", vec![y.clone()])?;
                Ok(result.as_i64().unwrap_or(0).cmp(&0))
            }
            _ => {
                let from = self.runtime_type_name(a)?;
                Err(self.exception(
                    "ClassCastException",
                    format!("class {from} cannot be cast to class Comparable"),
                ))
            }
        }
    }

    /// `v.hashCode()`
    pub fn hash_code(&mut self, v: &Value) -> EvalResult<i32> {
        Ok(match v {
            Value::Null => 0,
            Value::Bool(b) => {
                if *b {
                    1231
                } else {
                    1237
                }
            }
            Value::Char(c) => *c as i32,
            Value::Int(i) => *i,
            Value::Long(l) => (*l ^ ((*l as u64) >> 32) as i64) as i32,
            Value::Float(f) => f.to_bits() as i32,
            Value::Double(d) => {
                let bits = d.to_bits();
                (bits ^ (bits >> 32)) as i32
            }
            Value::Str(s) => java_hash(s),
            Value::Boxed(b) => return self.hash_code(b.get()),
            Value::Optional(None) => 0,
            Value::Optional(Some(inner)) => return self.hash_code(inner),
            Value::DateTime(dt) => {
                let secs = dt.and_utc().timestamp();
                (secs ^ (secs >> 32)) as i32
            }
            Value::Closure(c) => std::sync::Arc::as_ptr(c) as usize as i32 & 0x7fff_ffff,
            Value::Ref(r) => match self.shape(*r)? {
                Shape::Instance => {
                    let declared = self
                        .class_of(*r)?
                        .is_some_and(|c| !self.rt.classes.methods(c, "hashCode", 0).is_empty());
                    if declared {
                        let h = self.call_instance(*r, "hashCode", Vec::new())?;
                        h.as_i64().unwrap_or(0) as i32
                    } else {
                        r.identity_hash()
                    }
                }
                Shape::List(items) => {
                    let mut h: i32 = 1;
                    for item in &items {
                        h = h.wrapping_mul(31).wrapping_add(self.hash_code(item)?);
                    }
                    h
                }
                Shape::Set(items) => {
                    let mut h: i32 = 0;
                    for item in &items {
                        h = h.wrapping_add(self.hash_code(item)?);
                    }
                    h
                }
                Shape::Map(entries) => {
                    let mut h: i32 = 0;
                    for (k, v) in &entries {
                        h = h.wrapping_add(self.hash_code(k)? ^ self.hash_code(v)?);
                    }
                    h
                }
                Shape::Array(_) | Shape::Iterator => r.identity_hash(),
            },
        })
    }
}
