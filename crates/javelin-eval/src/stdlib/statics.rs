//! Static holders: `Math`, `System`, `Collections`, `Arrays`, `String`
//! and `Thread`.

use std::time::Duration;

use chrono::Utc;
use javelin_types::ast::{PrimType, TypeRef};

use super::list::{sort_values, stored};
use super::{elements, int_arg, no_method, num_arg, string};
use crate::error::{EvalError, EvalResult};
use crate::evaluator::Evaluator;
use crate::heap::{HeapObject, ListKind, ObjRef};
use crate::ops;
use crate::value::Value;

/// `Holder.method(args)` for the holders without instances.
pub fn call(ev: &mut Evaluator, holder: &str, method: &str, args: Vec<Value>) -> EvalResult<Value> {
    match holder {
        "Math" => math(ev, method, &args),
        "System" => system(method, &args),
        "Collections" => collections(ev, method, args),
        "Arrays" => arrays(ev, method, args),
        "String" => string_static(ev, method, args),
        "Thread" => thread(ev, method, &args),
        _ => Err(no_method(holder, method, args.len())),
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Math
// ══════════════════════════════════════════════════════════════════════════════

/// The result kind of a binary numeric operation on `a` and `b`.
fn promoted(a: &Value, b: &Value) -> PrimType {
    let rank = |v: &Value| match v.prim_kind() {
        Some(PrimType::Double) => 3,
        Some(PrimType::Float) => 2,
        Some(PrimType::Long) => 1,
        _ => 0,
    };
    match rank(a).max(rank(b)) {
        3 => PrimType::Double,
        2 => PrimType::Float,
        1 => PrimType::Long,
        _ => PrimType::Int,
    }
}

fn widened(v: &Value, to: PrimType) -> EvalResult<Value> {
    ops::convert_prim(to, v)
        .ok_or_else(|| EvalError::TypeMismatch(format!("expected a number, got {}", v.type_name())))
}

/// Next value of the runtime's xorshift generator, in `[0, 1)`.
fn random(ev: &Evaluator) -> f64 {
    let mut state = ev.rt.random_state.lock();
    let mut x = *state;
    x ^= x << 13;
    x ^= x >> 7;
    x ^= x << 17;
    *state = x;
    (x >> 11) as f64 / (1u64 << 53) as f64
}

fn math(ev: &mut Evaluator, method: &str, args: &[Value]) -> EvalResult<Value> {
    let d = |v: &Value| num_arg(v);
    Ok(match (method, args) {
        ("abs", [v]) => match v.unboxed() {
            Value::Int(i) => Value::Int(i.wrapping_abs()),
            Value::Long(l) => Value::Long(l.wrapping_abs()),
            Value::Float(f) => Value::Float(f.abs()),
            other => Value::Double(d(&other)?.abs()),
        },
        ("max" | "min", [a, b]) => {
            let kind = promoted(a, b);
            let (a, b) = (widened(a, kind)?, widened(b, kind)?);
            let a_less = ops::binary(javelin_types::ast::BinOp::Less, &a, &b)
                .map_err(|e| ev.op_error(e))?
                .as_bool()
                .unwrap_or(false);
            if a_less == (method == "min") {
                a
            } else {
                b
            }
        }
        ("pow", [a, b]) => Value::Double(d(a)?.powf(d(b)?)),
        ("sqrt", [v]) => Value::Double(d(v)?.sqrt()),
        ("cbrt", [v]) => Value::Double(d(v)?.cbrt()),
        ("floor", [v]) => Value::Double(d(v)?.floor()),
        ("ceil", [v]) => Value::Double(d(v)?.ceil()),
        ("exp", [v]) => Value::Double(d(v)?.exp()),
        ("log", [v]) => Value::Double(d(v)?.ln()),
        ("log10", [v]) => Value::Double(d(v)?.log10()),
        ("sin", [v]) => Value::Double(d(v)?.sin()),
        ("cos", [v]) => Value::Double(d(v)?.cos()),
        ("tan", [v]) => Value::Double(d(v)?.tan()),
        ("hypot", [a, b]) => Value::Double(d(a)?.hypot(d(b)?)),
        ("signum", [v]) => {
            let x = d(v)?;
            Value::Double(if x == 0.0 || x.is_nan() { x } else { x.signum() })
        }
        ("round", [v]) => match v.unboxed() {
            Value::Float(f) => Value::Int((f + 0.5).floor() as i32),
            other => Value::Long((d(&other)? + 0.5).floor() as i64),
        },
        ("floorDiv" | "floorMod", [a, b]) => {
            let (x, y) = (int_arg(a)?, int_arg(b)?);
            if y == 0 {
                return Err(ev.exception("ArithmeticException", "/ by zero"));
            }
            let mut quotient = x / y;
            if x % y != 0 && (x < 0) != (y < 0) {
                quotient -= 1;
            }
            let result = if method == "floorDiv" { quotient } else { x - quotient * y };
            widened(&Value::Long(result), promoted(a, b))?
        }
        ("random", []) => Value::Double(random(ev)),
        _ => return Err(no_method("Math", method, args.len())),
    })
}

// ══════════════════════════════════════════════════════════════════════════════
// System and Thread
// ══════════════════════════════════════════════════════════════════════════════

fn system(method: &str, args: &[Value]) -> EvalResult<Value> {
    let now = Utc::now();
    Ok(match (method, args) {
        ("currentTimeMillis", []) => Value::Long(now.timestamp_millis()),
        ("nanoTime", []) => Value::Long(now.timestamp_nanos_opt().unwrap_or_default()),
        ("lineSeparator", []) => Value::str("\n"),
        _ => return Err(no_method("System", method, args.len())),
    })
}

fn thread(ev: &mut Evaluator, method: &str, args: &[Value]) -> EvalResult<Value> {
    match (method, args) {
        ("sleep", [ms]) => {
            let ms = int_arg(ms)?;
            if ms < 0 {
                return Err(ev.exception("IllegalArgumentException", "timeout value is negative"));
            }
            std::thread::sleep(Duration::from_millis(ms as u64));
            Ok(Value::Null)
        }
        ("yield" | "onSpinWait", []) => {
            std::thread::yield_now();
            Ok(Value::Null)
        }
        _ => Err(no_method("Thread", method, args.len())),
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Collections and Arrays
// ══════════════════════════════════════════════════════════════════════════════

fn list_ref(ev: &Evaluator, v: &Value) -> EvalResult<ObjRef> {
    match v {
        Value::Ref(r) if ev.rt.heap.with(*r, |o| matches!(o, HeapObject::List { .. }))? => Ok(*r),
        Value::Null => Err(ev.npe("list argument is null")),
        other => Err(EvalError::TypeMismatch(format!(
            "expected a list, got {}",
            other.type_name()
        ))),
    }
}

fn array_ref(ev: &Evaluator, v: &Value) -> EvalResult<ObjRef> {
    match v {
        Value::Ref(r) if ev.is_array(v)? => Ok(*r),
        Value::Null => Err(ev.npe("array argument is null")),
        other => Err(EvalError::TypeMismatch(format!(
            "expected an array, got {}",
            other.type_name()
        ))),
    }
}

/// Replace the items of a list or array in place.
fn write_items(ev: &Evaluator, r: ObjRef, new_items: Vec<Value>) -> EvalResult<()> {
    ev.rt.heap.with(r, |o| match o {
        HeapObject::List { items, .. } | HeapObject::Array { items, .. } => *items = new_items,
        _ => {}
    })
}

fn collections(ev: &mut Evaluator, method: &str, args: Vec<Value>) -> EvalResult<Value> {
    Ok(match (method, args.as_slice()) {
        ("sort", [list, rest @ ..]) if rest.len() <= 1 => {
            let r = list_ref(ev, list)?;
            let comparator = rest.first().cloned().unwrap_or(Value::Null);
            let items = elements(ev, list)?;
            let sorted = sort_values(ev, items, &comparator)?;
            write_items(ev, r, sorted)?;
            Value::Null
        }
        ("reverse", [list]) => {
            let r = list_ref(ev, list)?;
            let mut items = elements(ev, list)?;
            items.reverse();
            write_items(ev, r, items)?;
            Value::Null
        }
        ("swap", [list, i, j]) => {
            let r = list_ref(ev, list)?;
            let mut items = elements(ev, list)?;
            let (i, j) = (int_arg(i)?, int_arg(j)?);
            let len = items.len();
            for index in [i, j] {
                if index < 0 || index as usize >= len {
                    return Err(ev.fault(super::Fault::OutOfBounds { index, len }));
                }
            }
            items.swap(i as usize, j as usize);
            write_items(ev, r, items)?;
            Value::Null
        }
        ("max" | "min", [coll, rest @ ..]) if rest.len() <= 1 => {
            let comparator = rest.first().cloned().unwrap_or(Value::Null);
            let items = elements(ev, coll)?;
            let sorted = sort_values(ev, items, &comparator)?;
            let pick = if method == "max" { sorted.last() } else { sorted.first() };
            match pick {
                Some(v) => v.clone(),
                None => return Err(ev.throwable("NoSuchElementException", None)),
            }
        }
        ("frequency", [coll, needle]) => {
            let mut count = 0;
            for item in elements(ev, coll)? {
                if ev.java_equals(&item, needle)? {
                    count += 1;
                }
            }
            Value::Int(count)
        }
        ("addAll", [list, extra @ ..]) => {
            let r = list_ref(ev, list)?;
            let mut items = elements(ev, list)?;
            items.extend(extra.iter().cloned().map(stored));
            write_items(ev, r, items)?;
            Value::Bool(!extra.is_empty())
        }
        ("unmodifiableList" | "synchronizedList", [list]) => list.clone(),
        ("emptyList", []) => ev.rt.heap.alloc_list(ListKind::ArrayList, Vec::new()),
        _ => return Err(no_method("Collections", method, args.len())),
    })
}

fn arrays(ev: &mut Evaluator, method: &str, args: Vec<Value>) -> EvalResult<Value> {
    Ok(match (method, args.as_slice()) {
        ("toString" | "deepToString", [Value::Null]) => Value::str("null"),
        ("toString" | "deepToString", [array]) => Value::str(ev.render(array)?),
        ("sort", [array, rest @ ..]) if rest.len() <= 1 => {
            let r = array_ref(ev, array)?;
            let comparator = rest.first().cloned().unwrap_or(Value::Null);
            let items = elements(ev, array)?;
            let sorted = sort_values(ev, items, &comparator)?;
            write_items(ev, r, sorted)?;
            Value::Null
        }
        ("fill", [array, v]) => {
            let r = array_ref(ev, array)?;
            let len = elements(ev, array)?.len();
            write_items(ev, r, vec![v.clone(); len])?;
            Value::Null
        }
        ("asList" | "stream", [single]) if ev.is_array(single)? => {
            let items = elements(ev, single)?.into_iter().map(stored).collect();
            ev.rt.heap.alloc_list(ListKind::ArrayList, items)
        }
        ("asList", items) => {
            let items = items.iter().cloned().map(stored).collect();
            ev.rt.heap.alloc_list(ListKind::ArrayList, items)
        }
        ("copyOf", [array, n]) => {
            let r = array_ref(ev, array)?;
            let elem = ev.rt.heap.with(r, |o| match o {
                HeapObject::Array { elem, .. } => elem.clone(),
                _ => TypeRef::Var,
            })?;
            let n = int_arg(n)?;
            if n < 0 {
                return Err(ev.exception("NegativeArraySizeException", n.to_string()));
            }
            let mut items = elements(ev, array)?;
            items.resize(n as usize, Value::default_for(&elem));
            ev.rt.heap.alloc_array(elem, items)
        }
        ("equals", [a, b]) => Value::Bool(match (a, b) {
            (Value::Null, Value::Null) => true,
            (Value::Null, _) | (_, Value::Null) => false,
            _ => {
                let (xs, ys) = (elements(ev, a)?, elements(ev, b)?);
                let mut same = xs.len() == ys.len();
                for (x, y) in xs.iter().zip(&ys) {
                    if !same {
                        break;
                    }
                    same = ev.java_equals(x, y)?;
                }
                same
            }
        }),
        _ => return Err(no_method("Arrays", method, args.len())),
    })
}

// ══════════════════════════════════════════════════════════════════════════════
// String
// ══════════════════════════════════════════════════════════════════════════════

fn string_static(ev: &mut Evaluator, method: &str, args: Vec<Value>) -> EvalResult<Value> {
    Ok(match (method, args.as_slice()) {
        ("valueOf" | "copyValueOf", [v]) => {
            let is_char_array = match v {
                Value::Ref(r) => ev.rt.heap.with(*r, |o| {
                    matches!(o, HeapObject::Array { elem: TypeRef::Prim(PrimType::Char), .. })
                })?,
                _ => false,
            };
            if is_char_array {
                let mut text = String::new();
                for c in elements(ev, v)? {
                    text.push_str(&ev.render(&c)?);
                }
                Value::str(text)
            } else {
                Value::str(ev.render(v)?)
            }
        }
        ("format", [fmt, rest @ ..]) => {
            let fmt = ev.render(fmt)?;
            Value::str(string::format(ev, &fmt, rest)?)
        }
        ("join", [sep, rest @ ..]) => {
            let sep = ev.render(sep)?;
            let parts = match rest {
                [single] if !matches!(single, Value::Str(_)) => elements(ev, single)?,
                _ => rest.to_vec(),
            };
            let mut rendered = Vec::with_capacity(parts.len());
            for p in &parts {
                rendered.push(ev.render(p)?);
            }
            Value::str(rendered.join(&sep))
        }
        _ => return Err(no_method("String", method, args.len())),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_promoted_kind() {
        assert_eq!(promoted(&Value::Int(1), &Value::Int(2)), PrimType::Int);
        assert_eq!(promoted(&Value::Int(1), &Value::Double(2.0)), PrimType::Double);
        assert_eq!(promoted(&Value::Long(1), &Value::Char('a')), PrimType::Long);
    }

    #[test]
    fn test_system_clock_is_positive() {
        let now = system("currentTimeMillis", &[]).unwrap();
        assert!(now.as_i64().unwrap() > 0);
    }
}
