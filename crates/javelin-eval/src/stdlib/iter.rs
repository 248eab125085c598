//! Iterators over a snapshot of a collection.

use super::{no_method, Fault};
use crate::error::{EvalError, EvalResult};
use crate::evaluator::Evaluator;
use crate::heap::{HeapObject, ObjRef};
use crate::value::Value;

/// `iterator.method(args)`
pub fn call(ev: &mut Evaluator, r: ObjRef, method: &str, args: Vec<Value>) -> EvalResult<Value> {
    let step = ev.rt.heap.with(r, |o| match o {
        HeapObject::Iterator { items, pos } => Some(match method {
            "hasNext" => Ok(Value::Bool(*pos < items.len())),
            "next" => match items.get(*pos).cloned() {
                Some(v) => {
                    *pos += 1;
                    Ok(v)
                }
                None => Err(Fault::NoSuchElement),
            },
            _ => Err(Fault::Unsupported("iterator operation")),
        }),
        _ => None,
    })?;
    match step {
        Some(Ok(v)) => Ok(v),
        Some(Err(Fault::Unsupported(_))) => Err(no_method("Iterator", method, args.len())),
        Some(Err(fault)) => Err(ev.fault(fault)),
        None => Err(EvalError::TypeMismatch("not an iterator".into())),
    }
}
