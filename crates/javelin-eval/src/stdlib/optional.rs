//! `Optional`: a present/absent wrapper rendered as `Just x` / `Nothing`.

use std::sync::Arc;

use super::no_method;
use crate::error::{EvalError, EvalResult};
use crate::evaluator::Evaluator;
use crate::value::Value;

fn present(v: Value) -> Value {
    Value::Optional(Some(Arc::new(v)))
}

fn of_nullable(v: Value) -> Value {
    match v {
        Value::Null => Value::Optional(None),
        v => present(v),
    }
}

/// `Optional.method(args)`
pub fn call_static(ev: &mut Evaluator, method: &str, args: Vec<Value>) -> EvalResult<Value> {
    match (method, args.as_slice()) {
        ("empty", []) => Ok(Value::Optional(None)),
        ("of", [Value::Null]) => Err(ev.npe("Optional.of(null)")),
        ("of", [v]) => Ok(present(v.clone())),
        ("ofNullable", [v]) => Ok(of_nullable(v.clone())),
        _ => Err(no_method("Optional", method, args.len())),
    }
}

/// `optional.method(args)`
pub fn call(
    ev: &mut Evaluator,
    inner: Option<Arc<Value>>,
    method: &str,
    args: Vec<Value>,
) -> EvalResult<Value> {
    let this = Value::Optional(inner.clone());
    let value = inner.map(|v| (*v).clone());
    Ok(match (method, args.as_slice(), value) {
        ("isPresent", [], v) => Value::Bool(v.is_some()),
        ("isEmpty", [], v) => Value::Bool(v.is_none()),
        ("get" | "orElseThrow", [], Some(v)) => v,
        ("get" | "orElseThrow", [], None) => {
            return Err(ev.exception("NoSuchElementException", "No value present"))
        }
        ("orElse", [_], Some(v)) => v,
        ("orElse", [other], None) => other.clone(),
        ("orElseGet", [_], Some(v)) => v,
        ("orElseGet", [supplier], None) => ev.call_functional(supplier, "get", Vec::new())?,
        ("ifPresent", [action], v) => {
            if let Some(v) = v {
                ev.call_functional(action, "accept", vec![v])?;
            }
            Value::Null
        }
        ("ifPresentOrElse", [action, otherwise], v) => {
            match v {
                Some(v) => ev.call_functional(action, "accept", vec![v])?,
                None => ev.call_functional(otherwise, "run", Vec::new())?,
            };
            Value::Null
        }
        ("map", [_], None) | ("flatMap", [_], None) | ("filter", [_], None) => {
            Value::Optional(None)
        }
        ("map", [f], Some(v)) => of_nullable(ev.call_functional(f, "apply", vec![v])?),
        ("flatMap", [f], Some(v)) => match ev.call_functional(f, "apply", vec![v])? {
            result @ Value::Optional(_) => result,
            Value::Null => return Err(ev.npe("flatMap function returned null")),
            other => {
                return Err(EvalError::TypeMismatch(format!(
                    "flatMap function returned {}",
                    other.type_name()
                )))
            }
        },
        ("filter", [predicate], Some(v)) => {
            let keep = ev.call_functional(predicate, "test", vec![v.clone()])?;
            if keep.as_bool().unwrap_or(false) {
                present(v)
            } else {
                Value::Optional(None)
            }
        }
        ("equals", [other], _) => Value::Bool(ev.java_equals(&this, other)?),
        ("hashCode", [], _) => Value::Int(ev.hash_code(&this)?),
        ("toString", [], _) => Value::str(ev.render(&this)?),
        _ => return Err(no_method("Optional", method, args.len())),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_of_nullable() {
        assert!(matches!(of_nullable(Value::Null), Value::Optional(None)));
        assert!(matches!(of_nullable(Value::Int(1)), Value::Optional(Some(_))));
    }
}
