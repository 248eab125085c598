//! `HashMap`, iterated in insertion order.

use indexmap::IndexMap;

use super::list::stored;
use super::{no_method, set_table};
use crate::error::{EvalError, EvalResult};
use crate::evaluator::Evaluator;
use crate::heap::{HashKey, HeapObject, ListKind, ObjRef};
use crate::prelude::MAP_ENTRY;
use crate::value::Value;

type Table = IndexMap<HashKey, (Value, Value)>;

fn with_table<T>(ev: &Evaluator, r: ObjRef, f: impl FnOnce(&mut Table) -> T) -> EvalResult<T> {
    ev.rt
        .heap
        .with(r, |o| match o {
            HeapObject::Map(table) => Some(f(table)),
            _ => None,
        })?
        .ok_or_else(|| EvalError::TypeMismatch("not a map".into()))
}

fn entries(ev: &Evaluator, r: ObjRef) -> EvalResult<Vec<(Value, Value)>> {
    with_table(ev, r, |t| t.values().cloned().collect())
}

fn lookup(ev: &Evaluator, r: ObjRef, key: &Value) -> EvalResult<Option<Value>> {
    let hk = HashKey::of(key);
    with_table(ev, r, |t| t.get(&hk).map(|(_, v)| v.clone()))
}

fn insert(ev: &Evaluator, r: ObjRef, key: Value, value: Value) -> EvalResult<Value> {
    let hk = HashKey::of(&key);
    let (key, value) = (stored(key), stored(value));
    with_table(ev, r, |t| match t.get_mut(&hk) {
        Some(slot) => std::mem::replace(&mut slot.1, value),
        None => {
            t.insert(hk, (key, value));
            Value::Null
        }
    })
}

/// `map.method(args)`
pub fn call(ev: &mut Evaluator, r: ObjRef, method: &str, args: Vec<Value>) -> EvalResult<Value> {
    Ok(match (method, args.as_slice()) {
        ("put", [k, v]) => insert(ev, r, k.clone(), v.clone())?,
        ("get", [k]) => lookup(ev, r, k)?.unwrap_or(Value::Null),
        ("getOrDefault", [k, default]) => lookup(ev, r, k)?.unwrap_or_else(|| default.clone()),
        ("containsKey", [k]) => Value::Bool(lookup(ev, r, k)?.is_some()),
        ("containsValue", [v]) => {
            let values: Vec<Value> = entries(ev, r)?.into_iter().map(|(_, v)| v).collect();
            Value::Bool(ev.contains_value(&values, v)?)
        }
        ("remove", [k]) => {
            let hk = HashKey::of(k);
            with_table(ev, r, |t| t.shift_remove(&hk).map(|(_, v)| v))?.unwrap_or(Value::Null)
        }
        ("putIfAbsent", [k, v]) => match lookup(ev, r, k)? {
            Some(existing) if !existing.is_null() => existing,
            _ => {
                insert(ev, r, k.clone(), v.clone())?;
                Value::Null
            }
        },
        ("computeIfAbsent", [k, f]) => match lookup(ev, r, k)? {
            Some(existing) if !existing.is_null() => existing,
            _ => {
                let computed = ev.call_functional(f, "apply", vec![k.clone()])?;
                if !computed.is_null() {
                    insert(ev, r, k.clone(), computed.clone())?;
                }
                stored(computed)
            }
        },
        ("merge", [k, v, f]) => {
            let merged = match lookup(ev, r, k)? {
                Some(old) if !old.is_null() => {
                    ev.call_functional(f, "apply", vec![old, v.clone()])?
                }
                _ => v.clone(),
            };
            if merged.is_null() {
                let hk = HashKey::of(k);
                with_table(ev, r, |t| t.shift_remove(&hk))?;
            } else {
                insert(ev, r, k.clone(), merged.clone())?;
            }
            stored(merged)
        }
        ("putAll", [Value::Ref(source)]) => {
            let extra = entries(ev, *source)?;
            for (k, v) in extra {
                insert(ev, r, k, v)?;
            }
            Value::Null
        }
        ("size", []) => Value::Int(with_table(ev, r, |t| t.len())? as i32),
        ("isEmpty", []) => Value::Bool(with_table(ev, r, |t| t.is_empty())?),
        ("clear", []) => {
            with_table(ev, r, |t| t.clear())?;
            Value::Null
        }
        ("keySet", []) => {
            let keys = entries(ev, r)?.into_iter().map(|(k, _)| k).collect();
            Value::Ref(ev.rt.heap.alloc(HeapObject::Set(set_table(keys))))
        }
        ("values", []) => {
            let values = entries(ev, r)?.into_iter().map(|(_, v)| v).collect();
            ev.rt.heap.alloc_list(ListKind::ArrayList, values)
        }
        ("entrySet", []) => {
            let rt = ev.rt.clone();
            let entry_class = rt
                .classes
                .lookup(MAP_ENTRY)
                .ok_or_else(|| EvalError::Load(format!("{MAP_ENTRY} is not loaded")))?;
            let mut items = Vec::new();
            for (k, v) in entries(ev, r)? {
                items.push(ev.instantiate(entry_class, vec![k, v], None, None)?);
            }
            Value::Ref(rt.heap.alloc(HeapObject::Set(set_table(items))))
        }
        ("forEach", [action]) => {
            for (k, v) in entries(ev, r)? {
                ev.call_functional(action, "accept", vec![k, v])?;
            }
            Value::Null
        }
        _ => return Err(no_method("HashMap", method, args.len())),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_keeps_insertion_order_and_replaces_values() {
        let mut table: Table = IndexMap::new();
        for (k, v) in [("b", 1), ("a", 2), ("b", 3)] {
            let key = Value::str(k);
            table
                .entry(HashKey::of(&key))
                .and_modify(|slot| slot.1 = Value::Int(v))
                .or_insert((key, Value::Int(v)));
        }
        let order: Vec<_> = table.values().map(|(k, _)| k.as_str().unwrap_or("").to_string()).collect();
        assert_eq!(order, vec!["b", "a"]);
        assert!(matches!(table.get(&HashKey::of(&Value::str("b"))), Some((_, Value::Int(3)))));
    }
}
