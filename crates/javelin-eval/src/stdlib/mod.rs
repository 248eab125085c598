//! Library types implemented natively: collections, strings, boxed
//! numerics, `Optional`, `LocalDateTime` and the static holders (`Math`,
//! `Collections`, ...).
//!
//! Each module exposes a `call` entry that matches on the method name the
//! same way for every type. Library objects are heap entries without a
//! class; strings, boxes, optionals and dates are plain values.

pub mod boxed;
pub mod datetime;
pub mod iter;
pub mod list;
pub mod map;
pub mod optional;
pub mod set;
pub mod statics;
pub mod string;

use indexmap::IndexMap;
use javelin_types::Span;

use crate::error::{EvalError, EvalResult};
use crate::evaluator::Evaluator;
use crate::heap::{HashKey, HeapObject, ListKind, ObjRef};
use crate::value::Value;

// ══════════════════════════════════════════════════════════════════════════════
// Faults raised while an entry is locked
// ══════════════════════════════════════════════════════════════════════════════

/// A library error detected inside a heap lock, turned into an exception
/// once the lock is released.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Fault {
    OutOfBounds { index: i64, len: usize },
    NoSuchElement,
    EmptyStack,
    Unsupported(&'static str),
}

impl Evaluator {
    pub(crate) fn fault(&self, fault: Fault) -> EvalError {
        match fault {
            Fault::OutOfBounds { index, len } => self.exception(
                "IndexOutOfBoundsException",
                format!("Index {index} out of bounds for length {len}"),
            ),
            Fault::NoSuchElement => self.throwable("NoSuchElementException", None),
            Fault::EmptyStack => self.throwable("EmptyStackException", None),
            Fault::Unsupported(what) => self.exception("UnsupportedOperationException", what),
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Argument helpers
// ══════════════════════════════════════════════════════════════════════════════

pub(crate) fn no_method(ty: &str, method: &str, argc: usize) -> EvalError {
    EvalError::UnresolvedName(format!("{ty}.{method}/{argc}"))
}

/// An integral argument (int, long or char, boxed or not).
pub(crate) fn int_arg(v: &Value) -> EvalResult<i64> {
    v.as_i64()
        .ok_or_else(|| EvalError::TypeMismatch(format!("expected an integer, got {}", v.type_name())))
}

/// A numeric argument as `f64`.
pub(crate) fn num_arg(v: &Value) -> EvalResult<f64> {
    v.as_f64()
        .ok_or_else(|| EvalError::TypeMismatch(format!("expected a number, got {}", v.type_name())))
}

/// Whether an argument to `remove` means an index rather than an element:
/// an unboxed `int` does, an `Integer` does not.
pub(crate) fn is_index(v: &Value) -> bool {
    matches!(v, Value::Int(_))
}

/// Elements of any iterable library value or array, in iteration order.
pub(crate) fn elements(ev: &Evaluator, v: &Value) -> EvalResult<Vec<Value>> {
    match v {
        Value::Null => Err(ev.npe("Cannot iterate over null")),
        Value::Ref(r) => ev.rt.heap.with(*r, |o| o.elements())?.ok_or_else(|| {
            EvalError::TypeMismatch("value is not a collection".into())
        }),
        other => Err(EvalError::TypeMismatch(format!(
            "{} is not a collection",
            other.type_name()
        ))),
    }
}

/// Build a set entry table from values.
pub(crate) fn set_table(items: Vec<Value>) -> IndexMap<HashKey, Value> {
    let mut table = IndexMap::with_capacity(items.len());
    for v in items {
        table.entry(HashKey::of(&v)).or_insert(v);
    }
    table
}

// ══════════════════════════════════════════════════════════════════════════════
// Entry points used by the evaluator
// ══════════════════════════════════════════════════════════════════════════════

/// `new T(args)` for a library type.
pub fn construct(ev: &mut Evaluator, ty: &str, args: Vec<Value>) -> EvalResult<Value> {
    let rt = ev.rt.clone();
    let heap = &rt.heap;
    let initial = |ev: &Evaluator| -> EvalResult<Vec<Value>> {
        match args.as_slice() {
            [] => Ok(Vec::new()),
            [v] if v.as_i64().is_some() => Ok(Vec::new()),
            [source] => elements(ev, source),
            _ => Err(no_method(ty, "<init>", args.len())),
        }
    };
    Ok(match ty {
        "ArrayList" | "List" => heap.alloc_list(ListKind::ArrayList, initial(ev)?),
        "LinkedList" => heap.alloc_list(ListKind::LinkedList, initial(ev)?),
        "Stack" => heap.alloc_list(ListKind::Stack, Vec::new()),
        "HashSet" | "Set" => Value::Ref(heap.alloc(HeapObject::Set(set_table(initial(ev)?)))),
        "HashMap" | "Map" => {
            let table = match args.as_slice() {
                [Value::Ref(source)] => heap.with(*source, |o| match o {
                    HeapObject::Map(m) => m.clone(),
                    _ => IndexMap::new(),
                })?,
                _ => IndexMap::new(),
            };
            Value::Ref(heap.alloc(HeapObject::Map(table)))
        }
        "String" => match args.as_slice() {
            [] => Value::str(""),
            [Value::Str(s)] => Value::Str(s.clone()),
            [chars] => {
                let mut text = String::new();
                for c in elements(ev, chars)? {
                    text.push_str(&ev.render(&c)?);
                }
                Value::str(text)
            }
            _ => return Err(no_method(ty, "<init>", args.len())),
        },
        "Integer" | "Long" | "Double" | "Float" | "Character" | "Boolean" => match args.as_slice() {
            [v] => boxed::value_of(ev, ty, v)?,
            _ => return Err(no_method(ty, "<init>", args.len())),
        },
        _ => return Err(EvalError::UnresolvedName(format!("new {ty}"))),
    })
}

/// Instance method on a library heap object.
pub fn call_object(ev: &mut Evaluator, r: ObjRef, method: &str, args: Vec<Value>) -> EvalResult<Value> {
    let this = Value::Ref(r);
    match (method, args.as_slice()) {
        ("toString", []) => return Ok(Value::str(ev.render(&this)?)),
        ("equals", [other]) => return Ok(Value::Bool(ev.java_equals(&this, other)?)),
        ("hashCode", []) => return Ok(Value::Int(ev.hash_code(&this)?)),
        _ => {}
    }
    let kind = ev.rt.heap.with(r, |o| match o {
        HeapObject::List { kind, .. } => Some(Some(*kind)),
        HeapObject::Array { .. } => Some(None),
        _ => None,
    })?;
    let lib = ev.rt.heap.with(r, |o| o.library_name())?;
    match (kind, lib) {
        (Some(Some(kind)), _) => list::call(ev, r, kind, method, args),
        (Some(None), _) => call_array(ev, r, method, args),
        (None, Some("HashMap")) => map::call(ev, r, method, args),
        (None, Some("HashSet")) => set::call(ev, r, method, args),
        (None, Some("Iterator")) => iter::call(ev, r, method, args),
        _ => Err(no_method("Object", method, args.len())),
    }
}

fn call_array(ev: &mut Evaluator, r: ObjRef, method: &str, args: Vec<Value>) -> EvalResult<Value> {
    match (method, args.as_slice()) {
        ("clone", []) => {
            let copy = ev.rt.heap.with(r, |o| o.clone())?;
            Ok(Value::Ref(ev.rt.heap.alloc(copy)))
        }
        ("getClass", []) => Ok(Value::str("Array")),
        _ => Err(no_method("Array", method, args.len())),
    }
}

/// `Holder.method(args)` for a library holder or a prelude class.
pub fn call_static(
    ev: &mut Evaluator,
    holder: &str,
    method: &str,
    args: Vec<Value>,
    span: Span,
) -> EvalResult<Value> {
    match holder {
        "Optional" => optional::call_static(ev, method, args),
        "LocalDateTime" => datetime::call_static(ev, method, args),
        "Integer" | "Long" | "Double" | "Float" | "Character" | "Boolean" => {
            boxed::call_static(ev, holder, method, args)
        }
        "Assertions" => crate::assertions::call_host(ev, method, args, span)?
            .ok_or_else(|| no_method(holder, method, 0)),
        _ => statics::call(ev, holder, method, args),
    }
}

/// `Holder.FIELD` for library constants.
pub fn static_field(holder: &str, field: &str) -> Option<Value> {
    Some(match (holder, field) {
        ("Integer", "MAX_VALUE") => Value::Int(i32::MAX),
        ("Integer", "MIN_VALUE") => Value::Int(i32::MIN),
        ("Long", "MAX_VALUE") => Value::Long(i64::MAX),
        ("Long", "MIN_VALUE") => Value::Long(i64::MIN),
        ("Double", "MAX_VALUE") => Value::Double(f64::MAX),
        ("Double", "MIN_VALUE") => Value::Double(f64::from_bits(1)),
        ("Double", "POSITIVE_INFINITY") => Value::Double(f64::INFINITY),
        ("Double", "NEGATIVE_INFINITY") => Value::Double(f64::NEG_INFINITY),
        ("Double", "NaN") => Value::Double(f64::NAN),
        ("Character", "MAX_VALUE") => Value::Char('\u{ffff}'),
        ("Character", "MIN_VALUE") => Value::Char('\0'),
        ("Math", "PI") => Value::Double(std::f64::consts::PI),
        ("Math", "E") => Value::Double(std::f64::consts::E),
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Boxed;

    #[test]
    fn test_static_constants() {
        assert!(matches!(static_field("Integer", "MAX_VALUE"), Some(Value::Int(i32::MAX))));
        assert!(matches!(static_field("Math", "PI"), Some(Value::Double(d)) if d > 3.14));
        assert!(static_field("Math", "TAU").is_none());
    }

    #[test]
    fn test_set_table_deduplicates_in_order() {
        let table = set_table(vec![Value::Int(3), Value::Int(1), Value::Int(3)]);
        let keys: Vec<_> = table.values().filter_map(Value::as_i64).collect();
        assert_eq!(keys, vec![3, 1]);
    }

    #[test]
    fn test_remove_index_vs_element() {
        assert!(is_index(&Value::Int(0)));
        assert!(!is_index(&Boxed::new(Value::Int(0))));
    }
}
