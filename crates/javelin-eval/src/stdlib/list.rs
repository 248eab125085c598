//! `ArrayList`, `LinkedList` and `Stack`, which share one representation.

use std::cmp::Ordering;

use javelin_types::ast::TypeRef;

use super::{elements, int_arg, is_index, no_method, Fault};
use crate::error::{EvalError, EvalResult};
use crate::evaluator::Evaluator;
use crate::heap::{HeapObject, ListKind, ObjRef};
use crate::value::{Boxed, Value};

/// Collections hold references: primitives are boxed on the way in.
pub(crate) fn stored(v: Value) -> Value {
    match v {
        Value::Bool(_)
        | Value::Char(_)
        | Value::Int(_)
        | Value::Long(_)
        | Value::Float(_)
        | Value::Double(_) => Boxed::new(v),
        other => other,
    }
}

fn checked(index: i64, len: usize) -> Result<usize, Fault> {
    if index < 0 || index as usize >= len {
        Err(Fault::OutOfBounds { index, len })
    } else {
        Ok(index as usize)
    }
}

fn snapshot(ev: &Evaluator, r: ObjRef) -> EvalResult<Vec<Value>> {
    Ok(ev
        .rt
        .heap
        .with(r, |o| match o {
            HeapObject::List { items, .. } => Some(items.clone()),
            _ => None,
        })?
        .unwrap_or_default())
}

/// Run `f` on the list's items under the entry lock.
fn mutate<T>(
    ev: &Evaluator,
    r: ObjRef,
    f: impl FnOnce(&mut Vec<Value>) -> Result<T, Fault>,
) -> EvalResult<T> {
    let result = ev.rt.heap.with(r, |o| match o {
        HeapObject::List { items, .. } => Some(f(items)),
        _ => None,
    })?;
    match result {
        Some(Ok(v)) => Ok(v),
        Some(Err(fault)) => Err(ev.fault(fault)),
        None => Err(EvalError::TypeMismatch("not a list".into())),
    }
}

fn replace_all(ev: &Evaluator, r: ObjRef, items: Vec<Value>) -> EvalResult<()> {
    mutate(ev, r, |current| {
        *current = items;
        Ok(())
    })
}

fn first(items: &mut Vec<Value>, remove: bool) -> Option<Value> {
    if items.is_empty() {
        None
    } else if remove {
        Some(items.remove(0))
    } else {
        items.first().cloned()
    }
}

fn last(items: &mut Vec<Value>, remove: bool) -> Option<Value> {
    if remove {
        items.pop()
    } else {
        items.last().cloned()
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Sorting
// ══════════════════════════════════════════════════════════════════════════════

/// Stable merge sort by a comparator value, or natural order when it is
/// `null`. The comparator may throw, so the sort is fallible.
pub(crate) fn sort_values(ev: &mut Evaluator, items: Vec<Value>, comparator: &Value) -> EvalResult<Vec<Value>> {
    if items.len() <= 1 {
        return Ok(items);
    }
    let mut left = items;
    let right = left.split_off(left.len() / 2);
    let left = sort_values(ev, left, comparator)?;
    let right = sort_values(ev, right, comparator)?;
    let mut merged = Vec::with_capacity(left.len() + right.len());
    let mut right = right.into_iter().peekable();
    for l in left {
        while let Some(r) = right.peek() {
            if compare(ev, r, &l, comparator)? == Ordering::Less {
                merged.extend(right.next());
            } else {
                break;
            }
        }
        merged.push(l);
    }
    merged.extend(right);
    Ok(merged)
}

fn compare(ev: &mut Evaluator, a: &Value, b: &Value, comparator: &Value) -> EvalResult<Ordering> {
    if comparator.is_null() {
        return ev.compare_natural(a, b);
    }
    let result = ev.call_functional(comparator, "compare", vec![a.clone(), b.clone()])?;
    Ok(int_arg(&result)?.cmp(&0))
}

// ══════════════════════════════════════════════════════════════════════════════
// Methods
// ══════════════════════════════════════════════════════════════════════════════

/// `list.method(args)`
pub fn call(
    ev: &mut Evaluator,
    r: ObjRef,
    kind: ListKind,
    method: &str,
    args: Vec<Value>,
) -> EvalResult<Value> {
    match kind {
        ListKind::Stack => {
            if let Some(v) = call_stack(ev, r, method, &args)? {
                return Ok(v);
            }
        }
        ListKind::LinkedList => {
            if let Some(v) = call_deque(ev, r, method, &args)? {
                return Ok(v);
            }
        }
        ListKind::ArrayList => {}
    }
    let mut args = args.into_iter();
    let (a, b) = (args.next(), args.next());
    let argc = usize::from(a.is_some()) + usize::from(b.is_some());
    Ok(match (method, a, b) {
        ("add", Some(e), None) => {
            mutate(ev, r, |items| {
                items.push(stored(e));
                Ok(())
            })?;
            Value::Bool(true)
        }
        ("add", Some(i), Some(e)) => {
            let i = int_arg(&i)?;
            mutate(ev, r, |items| {
                if i < 0 || i as usize > items.len() {
                    return Err(Fault::OutOfBounds { index: i, len: items.len() });
                }
                items.insert(i as usize, stored(e));
                Ok(())
            })?;
            Value::Null
        }
        ("addAll", Some(source), None) => {
            let extra = elements(ev, &source)?;
            let changed = !extra.is_empty();
            mutate(ev, r, |items| {
                items.extend(extra.into_iter().map(stored));
                Ok(())
            })?;
            Value::Bool(changed)
        }
        ("get", Some(i), None) => {
            let i = int_arg(&i)?;
            mutate(ev, r, |items| Ok(items[checked(i, items.len())?].clone()))?
        }
        ("set", Some(i), Some(e)) => {
            let i = int_arg(&i)?;
            mutate(ev, r, |items| {
                let i = checked(i, items.len())?;
                Ok(std::mem::replace(&mut items[i], stored(e)))
            })?
        }
        ("remove", Some(target), None) if is_index(&target) => {
            let i = int_arg(&target)?;
            mutate(ev, r, |items| Ok(items.remove(checked(i, items.len())?)))?
        }
        ("remove", Some(target), None) => Value::Bool(remove_equal(ev, r, &target, false)?),
        ("removeAll" | "retainAll", Some(source), None) => {
            let other = elements(ev, &source)?;
            let current = snapshot(ev, r)?;
            let before = current.len();
            let mut kept = Vec::with_capacity(before);
            for item in current {
                if ev.contains_value(&other, &item)? == (method == "retainAll") {
                    kept.push(item);
                }
            }
            let changed = kept.len() != before;
            replace_all(ev, r, kept)?;
            Value::Bool(changed)
        }
        ("removeIf", Some(predicate), None) => {
            let current = snapshot(ev, r)?;
            let before = current.len();
            let mut kept = Vec::with_capacity(before);
            for item in current {
                let test = ev.call_functional(&predicate, "test", vec![item.clone()])?;
                if !test.as_bool().unwrap_or(false) {
                    kept.push(item);
                }
            }
            let changed = kept.len() != before;
            replace_all(ev, r, kept)?;
            Value::Bool(changed)
        }
        ("size", None, None) => Value::Int(snapshot(ev, r)?.len() as i32),
        ("isEmpty", None, None) => Value::Bool(snapshot(ev, r)?.is_empty()),
        ("clear", None, None) => {
            replace_all(ev, r, Vec::new())?;
            Value::Null
        }
        ("contains", Some(needle), None) => {
            let items = snapshot(ev, r)?;
            Value::Bool(ev.contains_value(&items, &needle)?)
        }
        ("containsAll", Some(source), None) => {
            let items = snapshot(ev, r)?;
            let mut all = true;
            for needle in elements(ev, &source)? {
                if !ev.contains_value(&items, &needle)? {
                    all = false;
                    break;
                }
            }
            Value::Bool(all)
        }
        ("indexOf", Some(needle), None) => {
            let items = snapshot(ev, r)?;
            Value::Int(ev.position_of(&items, &needle)?.map_or(-1, |i| i as i32))
        }
        ("lastIndexOf", Some(needle), None) => Value::Int(last_index_of(ev, r, &needle)?),
        ("forEach", Some(action), None) => {
            for item in snapshot(ev, r)? {
                ev.call_functional(&action, "accept", vec![item])?;
            }
            Value::Null
        }
        ("iterator" | "listIterator", None, None) => {
            let items = snapshot(ev, r)?;
            ev.rt.heap.alloc_iterator(items)
        }
        ("sort", Some(comparator), None) => {
            let items = snapshot(ev, r)?;
            let sorted = sort_values(ev, items, &comparator)?;
            replace_all(ev, r, sorted)?;
            Value::Null
        }
        ("toArray", _, None) => {
            let items = snapshot(ev, r)?;
            ev.rt.heap.alloc_array(TypeRef::class("Object"), items)
        }
        ("subList", Some(from), Some(to)) => {
            let (from, to) = (int_arg(&from)?, int_arg(&to)?);
            let items = snapshot(ev, r)?;
            if from < 0 || to as usize > items.len() || from > to {
                return Err(ev.fault(Fault::OutOfBounds { index: to, len: items.len() }));
            }
            ev.rt
                .heap
                .alloc_list(ListKind::ArrayList, items[from as usize..to as usize].to_vec())
        }
        _ => return Err(no_method(kind.name(), method, argc)),
    })
}

/// Remove the first (or last) element equal to `target`.
fn remove_equal(ev: &mut Evaluator, r: ObjRef, target: &Value, from_end: bool) -> EvalResult<bool> {
    let mut items = snapshot(ev, r)?;
    if from_end {
        items.reverse();
    }
    let Some(pos) = ev.position_of(&items, target)? else {
        return Ok(false);
    };
    let len = items.len();
    let index = if from_end { len - 1 - pos } else { pos };
    mutate(ev, r, |items| {
        if index < items.len() {
            items.remove(index);
        }
        Ok(())
    })?;
    Ok(true)
}

fn last_index_of(ev: &mut Evaluator, r: ObjRef, needle: &Value) -> EvalResult<i32> {
    let mut items = snapshot(ev, r)?;
    items.reverse();
    let len = items.len();
    Ok(ev
        .position_of(&items, needle)?
        .map_or(-1, |pos| (len - 1 - pos) as i32))
}

/// `Stack` additions. `None` falls through to the list methods.
fn call_stack(ev: &mut Evaluator, r: ObjRef, method: &str, args: &[Value]) -> EvalResult<Option<Value>> {
    Ok(Some(match (method, args) {
        ("push", [e]) => {
            let e = stored(e.clone());
            let pushed = e.clone();
            mutate(ev, r, |items| {
                items.push(e);
                Ok(())
            })?;
            pushed
        }
        ("pop", []) => mutate(ev, r, |items| last(items, true).ok_or(Fault::EmptyStack))?,
        ("peek", []) => mutate(ev, r, |items| last(items, false).ok_or(Fault::EmptyStack))?,
        ("empty", []) => Value::Bool(snapshot(ev, r)?.is_empty()),
        ("search", [needle]) => {
            let len = snapshot(ev, r)?.len() as i32;
            match last_index_of(ev, r, needle)? {
                -1 => Value::Int(-1),
                i => Value::Int(len - 1 - i),
            }
        }
        _ => return Ok(None),
    }))
}

/// `LinkedList` deque operations. `push` appends and `pop` removes the
/// last element. `None` falls through to the list methods.
fn call_deque(ev: &mut Evaluator, r: ObjRef, method: &str, args: &[Value]) -> EvalResult<Option<Value>> {
    Ok(Some(match (method, args) {
        ("addFirst" | "offerFirst", [e]) => {
            let e = stored(e.clone());
            mutate(ev, r, |items| {
                items.insert(0, e);
                Ok(())
            })?;
            if method == "offerFirst" {
                Value::Bool(true)
            } else {
                Value::Null
            }
        }
        ("addLast" | "offer" | "offerLast" | "push", [e]) => {
            let e = stored(e.clone());
            mutate(ev, r, |items| {
                items.push(e);
                Ok(())
            })?;
            if method == "push" || method == "addLast" {
                Value::Null
            } else {
                Value::Bool(true)
            }
        }
        ("getFirst" | "element", []) => {
            mutate(ev, r, |items| first(items, false).ok_or(Fault::NoSuchElement))?
        }
        ("getLast", []) => mutate(ev, r, |items| last(items, false).ok_or(Fault::NoSuchElement))?,
        ("removeFirst" | "remove", []) => {
            mutate(ev, r, |items| first(items, true).ok_or(Fault::NoSuchElement))?
        }
        ("removeLast" | "pop", []) => {
            mutate(ev, r, |items| last(items, true).ok_or(Fault::NoSuchElement))?
        }
        ("peek" | "peekFirst", []) => mutate(ev, r, |items| Ok(first(items, false)))?.unwrap_or(Value::Null),
        ("peekLast", []) => mutate(ev, r, |items| Ok(last(items, false)))?.unwrap_or(Value::Null),
        ("poll" | "pollFirst", []) => mutate(ev, r, |items| Ok(first(items, true)))?.unwrap_or(Value::Null),
        ("pollLast", []) => mutate(ev, r, |items| Ok(last(items, true)))?.unwrap_or(Value::Null),
        ("removeFirstOccurrence", [target]) => Value::Bool(remove_equal(ev, r, target, false)?),
        ("removeLastOccurrence", [target]) => Value::Bool(remove_equal(ev, r, target, true)?),
        ("descendingIterator", []) => {
            let mut items = snapshot(ev, r)?;
            items.reverse();
            ev.rt.heap.alloc_iterator(items)
        }
        _ => return Ok(None),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stored_boxes_primitives() {
        assert!(matches!(stored(Value::Int(3)), Value::Boxed(_)));
        assert!(matches!(stored(Value::str("a")), Value::Str(_)));
        assert!(stored(Value::Null).is_null());
    }

    #[test]
    fn test_checked_bounds() {
        assert_eq!(checked(0, 1), Ok(0));
        assert_eq!(checked(1, 1), Err(Fault::OutOfBounds { index: 1, len: 1 }));
        assert_eq!(checked(-1, 3), Err(Fault::OutOfBounds { index: -1, len: 3 }));
    }

    #[test]
    fn test_first_last_on_empty() {
        let mut items = Vec::new();
        assert!(first(&mut items, true).is_none());
        assert!(last(&mut items, false).is_none());
    }
}
