//! `HashSet`, iterated in insertion order.

use indexmap::IndexMap;

use super::list::stored;
use super::{elements, no_method};
use crate::error::{EvalError, EvalResult};
use crate::evaluator::Evaluator;
use crate::heap::{HashKey, HeapObject, ObjRef};
use crate::value::Value;

type Table = IndexMap<HashKey, Value>;

fn with_table<T>(ev: &Evaluator, r: ObjRef, f: impl FnOnce(&mut Table) -> T) -> EvalResult<T> {
    ev.rt
        .heap
        .with(r, |o| match o {
            HeapObject::Set(table) => Some(f(table)),
            _ => None,
        })?
        .ok_or_else(|| EvalError::TypeMismatch("not a set".into()))
}

fn add(table: &mut Table, v: Value) -> bool {
    let key = HashKey::of(&v);
    if table.contains_key(&key) {
        return false;
    }
    table.insert(key, stored(v));
    true
}

/// `set.method(args)`
pub fn call(ev: &mut Evaluator, r: ObjRef, method: &str, args: Vec<Value>) -> EvalResult<Value> {
    Ok(match (method, args.as_slice()) {
        ("add", [v]) => {
            let v = v.clone();
            Value::Bool(with_table(ev, r, |t| add(t, v))?)
        }
        ("addAll", [source]) => {
            let extra = elements(ev, source)?;
            Value::Bool(with_table(ev, r, |t| {
                extra.into_iter().fold(false, |changed, v| add(t, v) || changed)
            })?)
        }
        ("remove", [v]) => {
            let key = HashKey::of(v);
            Value::Bool(with_table(ev, r, |t| t.shift_remove(&key).is_some())?)
        }
        ("removeAll" | "retainAll", [source]) => {
            let keys: Vec<HashKey> = elements(ev, source)?.iter().map(HashKey::of).collect();
            let retain = method == "retainAll";
            Value::Bool(with_table(ev, r, |t| {
                let before = t.len();
                t.retain(|k, _| keys.contains(k) == retain);
                t.len() != before
            })?)
        }
        ("contains", [v]) => {
            let key = HashKey::of(v);
            Value::Bool(with_table(ev, r, |t| t.contains_key(&key))?)
        }
        ("containsAll", [source]) => {
            let keys: Vec<HashKey> = elements(ev, source)?.iter().map(HashKey::of).collect();
            Value::Bool(with_table(ev, r, |t| keys.iter().all(|k| t.contains_key(k)))?)
        }
        ("size", []) => Value::Int(with_table(ev, r, |t| t.len())? as i32),
        ("isEmpty", []) => Value::Bool(with_table(ev, r, |t| t.is_empty())?),
        ("clear", []) => {
            with_table(ev, r, |t| t.clear())?;
            Value::Null
        }
        ("forEach", [action]) => {
            for item in with_table(ev, r, |t| t.values().cloned().collect::<Vec<_>>())? {
                ev.call_functional(action, "accept", vec![item])?;
            }
            Value::Null
        }
        ("iterator", []) => {
            let items = with_table(ev, r, |t| t.values().cloned().collect())?;
            ev.rt.heap.alloc_iterator(items)
        }
        _ => return Err(no_method("HashSet", method, args.len())),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Boxed;

    #[test]
    fn test_add_ignores_duplicates() {
        let mut table = Table::new();
        assert!(add(&mut table, Value::Int(1)));
        assert!(!add(&mut table, Value::Int(1)));
        assert!(!add(&mut table, Boxed::new(Value::Int(1))));
        assert!(add(&mut table, Value::Long(1)));
        assert_eq!(table.len(), 2);
    }
}
