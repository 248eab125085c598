//! Boxed numerics (`Integer`, `Double`, ...) and `Character`/`Boolean`
//! helpers. Instance methods also apply to unboxed primitives.

use javelin_types::ast::{BinOp, PrimType};

use super::{int_arg, no_method, num_arg};
use crate::error::{EvalError, EvalResult};
use crate::evaluator::Evaluator;
use crate::ops;
use crate::value::{Boxed, Value};

fn number_format(ev: &Evaluator, text: &str) -> EvalError {
    ev.exception("NumberFormatException", format!("For input string: \"{text}\""))
}

fn parse(ev: &mut Evaluator, prim: PrimType, v: &Value) -> EvalResult<Value> {
    let text = match v {
        Value::Null => return Err(ev.exception("NumberFormatException", "Cannot parse null string")),
        Value::Str(s) => s.to_string(),
        other => ev.render(other)?,
    };
    let trimmed = text.trim();
    let parsed = match prim {
        PrimType::Int => text.parse::<i32>().ok().map(Value::Int),
        PrimType::Long => text.parse::<i64>().ok().map(Value::Long),
        PrimType::Double => trimmed.parse::<f64>().ok().map(Value::Double),
        PrimType::Float => trimmed.parse::<f32>().ok().map(Value::Float),
        PrimType::Boolean => Some(Value::Bool(trimmed.eq_ignore_ascii_case("true"))),
        PrimType::Char => {
            let mut chars = text.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Some(Value::Char(c)),
                _ => None,
            }
        }
    };
    parsed.ok_or_else(|| number_format(ev, &text))
}

/// `Integer.valueOf(v)` and friends: parse strings, convert numbers, box.
pub fn value_of(ev: &mut Evaluator, holder: &str, v: &Value) -> EvalResult<Value> {
    let prim = PrimType::from_wrapper(holder)
        .ok_or_else(|| EvalError::UnresolvedName(format!("{holder}.valueOf")))?;
    let prim_value = match v {
        Value::Str(_) | Value::Null => parse(ev, prim, v)?,
        other => ops::convert_prim(prim, other).ok_or_else(|| {
            EvalError::TypeMismatch(format!("cannot convert {} to {holder}", other.type_name()))
        })?,
    };
    Ok(Boxed::new(prim_value))
}

fn char_arg(v: &Value) -> EvalResult<char> {
    match v.unboxed() {
        Value::Char(c) => Ok(c),
        Value::Int(i) => char::from_u32(i as u32)
            .ok_or_else(|| EvalError::TypeMismatch(format!("{i} is not a character"))),
        other => Err(EvalError::TypeMismatch(format!(
            "expected a char, got {}",
            other.type_name()
        ))),
    }
}

fn character_static(method: &str, args: &[Value]) -> EvalResult<Option<Value>> {
    let [arg] = args else {
        return Ok(None);
    };
    let c = char_arg(arg)?;
    Ok(Some(match method {
        "isDigit" => Value::Bool(c.is_ascii_digit()),
        "isLetter" | "isAlphabetic" => Value::Bool(c.is_alphabetic()),
        "isLetterOrDigit" => Value::Bool(c.is_alphanumeric()),
        "isUpperCase" => Value::Bool(c.is_uppercase()),
        "isLowerCase" => Value::Bool(c.is_lowercase()),
        "isWhitespace" => Value::Bool(c.is_whitespace()),
        "toUpperCase" => Value::Char(c.to_uppercase().next().unwrap_or(c)),
        "toLowerCase" => Value::Char(c.to_lowercase().next().unwrap_or(c)),
        "getNumericValue" => Value::Int(c.to_digit(36).map_or(-1, |d| d as i32)),
        "toString" => Value::str(c.to_string()),
        _ => return Ok(None),
    }))
}

/// `Integer.method(args)`, `Character.method(args)`, ...
pub fn call_static(ev: &mut Evaluator, holder: &str, method: &str, args: Vec<Value>) -> EvalResult<Value> {
    if holder == "Character" {
        if let Some(v) = character_static(method, &args)? {
            return Ok(v);
        }
    }
    let prim = PrimType::from_wrapper(holder)
        .ok_or_else(|| EvalError::UnresolvedName(format!("{holder}.{method}")))?;
    Ok(match (method, args.as_slice()) {
        ("valueOf", [v]) => value_of(ev, holder, v)?,
        ("parseInt" | "parseLong" | "parseDouble" | "parseFloat" | "parseBoolean", [v]) => {
            parse(ev, prim, v)?
        }
        ("toString", [v]) => Value::str(ev.render(v)?),
        ("compare", [a, b]) => Value::Int(ev.compare_natural(a, b)? as i32),
        ("max" | "min", [_, _]) => return super::statics::call(ev, "Math", method, args.clone()),
        ("sum", [a, b]) => ops::binary(BinOp::Add, a, b).map_err(|e| ev.op_error(e))?,
        ("toBinaryString", [v]) => Value::str(format!("{:b}", int_arg(v)? as i32 as u32)),
        ("toHexString", [v]) => Value::str(format!("{:x}", int_arg(v)? as i32 as u32)),
        ("isNaN", [v]) => Value::Bool(num_arg(v)?.is_nan()),
        _ => return Err(no_method(holder, method, args.len())),
    })
}

/// `n.method(args)` on a boxed or primitive receiver.
pub fn call(ev: &mut Evaluator, receiver: &Value, method: &str, args: Vec<Value>) -> EvalResult<Value> {
    let to = |p: PrimType| {
        ops::convert_prim(p, receiver).ok_or_else(|| {
            EvalError::TypeMismatch(format!("{} has no {method}", receiver.type_name()))
        })
    };
    Ok(match (method, args.as_slice()) {
        ("intValue", []) => to(PrimType::Int)?,
        ("longValue", []) => to(PrimType::Long)?,
        ("doubleValue", []) => to(PrimType::Double)?,
        ("floatValue", []) => to(PrimType::Float)?,
        ("charValue", []) => to(PrimType::Char)?,
        ("booleanValue", []) => to(PrimType::Boolean)?,
        ("compareTo", [other]) => Value::Int(ev.compare_natural(receiver, other)? as i32),
        ("equals", [other]) => Value::Bool(ev.java_equals(receiver, other)?),
        ("hashCode", []) => Value::Int(ev.hash_code(receiver)?),
        ("toString", []) => Value::str(ev.render(receiver)?),
        ("isNaN", []) => Value::Bool(receiver.as_f64().is_some_and(f64::is_nan)),
        _ => return Err(no_method(receiver.type_name(), method, args.len())),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_char_arg_accepts_code_points() {
        assert_eq!(char_arg(&Value::Int(65)).ok(), Some('A'));
        assert_eq!(char_arg(&Value::Char('z')).ok(), Some('z'));
        assert!(char_arg(&Value::str("a")).is_err());
    }

    #[test]
    fn test_character_predicates() {
        let digit = character_static("isDigit", &[Value::Char('7')]).ok().flatten();
        assert!(matches!(digit, Some(Value::Bool(true))));
        let upper = character_static("toUpperCase", &[Value::Char('q')]).ok().flatten();
        assert!(matches!(upper, Some(Value::Char('Q'))));
        assert!(character_static("isDigit", &[]).ok().flatten().is_none());
    }
}
