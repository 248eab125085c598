//! `String` methods, `printf`-style formatting and string ordering.

use std::cmp::Ordering;
use std::sync::Arc;

use javelin_types::ast::{PrimType, TypeRef};
use regex::Regex;

use super::{int_arg, no_method};
use crate::error::{EvalError, EvalResult};
use crate::evaluator::Evaluator;
use crate::value::Value;

// ══════════════════════════════════════════════════════════════════════════════
// Ordering and hashing
// ══════════════════════════════════════════════════════════════════════════════

/// Locale-style string ordering: case-insensitive first, and on a tie a
/// lowercase letter sorts before its uppercase form. Returns -1, 0 or 1.
pub fn locale_compare(a: &str, b: &str) -> i32 {
    let folded = a
        .chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase));
    let ordering = folded.then_with(|| {
        for (x, y) in a.chars().zip(b.chars()) {
            if x != y {
                return match (x.is_lowercase(), y.is_lowercase()) {
                    (true, false) => Ordering::Less,
                    (false, true) => Ordering::Greater,
                    _ => x.cmp(&y),
                };
            }
        }
        a.len().cmp(&b.len())
    });
    match ordering {
        Ordering::Less => -1,
        Ordering::Equal => 0,
        Ordering::Greater => 1,
    }
}

/// `String.hashCode`: `s[0]*31^(n-1) + ... + s[n-1]` over UTF-16 units.
pub fn java_hash(s: &str) -> i32 {
    s.encode_utf16()
        .fold(0i32, |h, unit| h.wrapping_mul(31).wrapping_add(unit as i32))
}

// ══════════════════════════════════════════════════════════════════════════════
// Methods
// ══════════════════════════════════════════════════════════════════════════════

fn text_arg(ev: &mut Evaluator, v: &Value) -> EvalResult<String> {
    match v {
        Value::Null => Err(ev.npe("String argument is null")),
        Value::Str(s) => Ok(s.to_string()),
        other => ev.render(other),
    }
}

fn compile(ev: &Evaluator, pattern: &str) -> EvalResult<Regex> {
    Regex::new(pattern).map_err(|e| ev.exception("IllegalArgumentException", e.to_string()))
}

/// Char position of a byte offset found by a search, or -1.
fn char_index(found: Option<usize>, s: &str) -> i32 {
    found.map_or(-1, |byte| s[..byte].chars().count() as i32)
}

/// Byte offset of the `n`th char, clamped to the end.
fn byte_at(s: &str, n: usize) -> usize {
    s.char_indices().nth(n).map_or(s.len(), |(i, _)| i)
}

fn out_of_range(ev: &Evaluator, message: String) -> EvalError {
    ev.exception("StringIndexOutOfBoundsException", message)
}

/// `s.method(args)`
pub fn call(ev: &mut Evaluator, s: &Arc<str>, method: &str, args: Vec<Value>) -> EvalResult<Value> {
    let chars: Vec<char> = s.chars().collect();
    let len = chars.len() as i64;
    Ok(match (method, args.as_slice()) {
        ("length", []) => Value::Int(len as i32),
        ("isEmpty", []) => Value::Bool(s.is_empty()),
        ("isBlank", []) => Value::Bool(s.trim().is_empty()),
        ("charAt", [i]) => {
            let i = int_arg(i)?;
            if i < 0 || i >= len {
                return Err(out_of_range(ev, format!("Index {i} out of bounds for length {len}")));
            }
            Value::Char(chars[i as usize])
        }
        ("indexOf" | "lastIndexOf", [needle, rest @ ..]) => {
            let needle = text_arg(ev, needle)?;
            let from = match rest {
                [from] => Some(int_arg(from)?.clamp(0, len) as usize),
                _ => None,
            };
            let found = if method == "indexOf" {
                let start = byte_at(s, from.unwrap_or(0));
                s[start..].find(&needle).map(|b| b + start)
            } else {
                let end = match from {
                    Some(f) => byte_at(s, f + needle.chars().count()).min(s.len()),
                    None => s.len(),
                };
                s[..end].rfind(&needle)
            };
            Value::Int(char_index(found, s))
        }
        ("contains", [needle]) => Value::Bool(s.contains(text_arg(ev, needle)?.as_str())),
        ("startsWith", [prefix]) => Value::Bool(s.starts_with(text_arg(ev, prefix)?.as_str())),
        ("endsWith", [suffix]) => Value::Bool(s.ends_with(text_arg(ev, suffix)?.as_str())),
        ("equals", [other]) => Value::Bool(matches!(other, Value::Str(o) if o == s)),
        ("equalsIgnoreCase", [other]) => Value::Bool(match other {
            Value::Str(o) => o.to_lowercase() == s.to_lowercase(),
            _ => false,
        }),
        ("compareTo", [other]) => {
            let other = text_arg(ev, other)?;
            Value::Int(locale_compare(s, &other))
        }
        ("compareToIgnoreCase", [other]) => {
            let other = text_arg(ev, other)?;
            Value::Int(locale_compare(&s.to_lowercase(), &other.to_lowercase()))
        }
        ("concat", [other]) => Value::str(format!("{s}{}", text_arg(ev, other)?)),
        ("toLowerCase", []) => Value::str(s.to_lowercase()),
        ("toUpperCase", []) => Value::str(s.to_uppercase()),
        ("trim" | "strip", []) => Value::str(s.trim()),
        ("substring", [begin, rest @ ..]) => {
            let begin = int_arg(begin)?;
            let end = match rest {
                [end] => int_arg(end)?,
                _ => len,
            };
            if begin < 0 || end > len || begin > end {
                return Err(out_of_range(
                    ev,
                    format!("begin {begin}, end {end}, length {len}"),
                ));
            }
            Value::str(chars[begin as usize..end as usize].iter().collect::<String>())
        }
        ("replace", [from, to]) => {
            let from = text_arg(ev, from)?;
            let to = text_arg(ev, to)?;
            Value::str(s.replacen(&from, &to, 1))
        }
        ("replaceAll" | "replaceFirst", [pattern, replacement]) => {
            let pattern = text_arg(ev, pattern)?;
            let re = compile(ev, &pattern)?;
            let replacement = text_arg(ev, replacement)?;
            let limit = if method == "replaceAll" { 0 } else { 1 };
            Value::str(re.replacen(s, limit, replacement.as_str()))
        }
        ("matches", [pattern]) => {
            let pattern = text_arg(ev, pattern)?;
            let re = compile(ev, &format!("^(?:{pattern})$"))?;
            Value::Bool(re.is_match(s))
        }
        ("split", [pattern]) => {
            let pattern = text_arg(ev, pattern)?;
            let re = compile(ev, &pattern)?;
            let mut parts: Vec<&str> = if s.is_empty() {
                vec![""]
            } else {
                re.split(s).collect()
            };
            while parts.len() > 1 && parts.last().is_some_and(|p| p.is_empty()) {
                parts.pop();
            }
            if parts.first().is_some_and(|p| p.is_empty()) && parts.len() > 1 {
                let leading_match = re.find(s).is_some_and(|m| m.start() == 0 && m.end() == 0);
                if leading_match {
                    parts.remove(0);
                }
            }
            let items = parts.into_iter().map(Value::str).collect();
            ev.rt.heap.alloc_array(TypeRef::class("String"), items)
        }
        ("toCharArray", []) => ev.rt.heap.alloc_array(
            TypeRef::Prim(PrimType::Char),
            chars.iter().map(|c| Value::Char(*c)).collect(),
        ),
        ("repeat", [n]) => {
            let n = int_arg(n)?;
            if n < 0 {
                return Err(ev.exception("IllegalArgumentException", format!("count is negative: {n}")));
            }
            Value::str(s.repeat(n as usize))
        }
        ("hashCode", []) => Value::Int(java_hash(s)),
        ("toString" | "intern", []) => Value::Str(s.clone()),
        _ => return Err(no_method("String", method, args.len())),
    })
}

// ══════════════════════════════════════════════════════════════════════════════
// Formatting
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Default)]
struct Spec {
    left: bool,
    zero: bool,
    plus: bool,
    grouping: bool,
    width: Option<usize>,
    precision: Option<usize>,
}

fn group_thousands(digits: &str) -> String {
    let (sign, digits) = match digits.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", digits),
    };
    let (int_part, frac) = match digits.find('.') {
        Some(dot) => (&digits[..dot], &digits[dot..]),
        None => (digits, ""),
    };
    let mut grouped = String::new();
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    format!("{sign}{grouped}{frac}")
}

fn pad(spec: &Spec, body: String) -> String {
    let Some(width) = spec.width else {
        return body;
    };
    let n = body.chars().count();
    if n >= width {
        return body;
    }
    let fill = width - n;
    if spec.left {
        format!("{body}{}", " ".repeat(fill))
    } else if spec.zero {
        match body.strip_prefix('-') {
            Some(rest) => format!("-{}{rest}", "0".repeat(fill)),
            None => format!("{}{body}", "0".repeat(fill)),
        }
    } else {
        format!("{}{body}", " ".repeat(fill))
    }
}

fn missing_argument(ev: &Evaluator, conversion: char) -> EvalError {
    ev.exception(
        "IllegalArgumentException",
        format!("Format specifier '%{conversion}' has no argument"),
    )
}

/// `String.format(fmt, args)`: `%d %s %f %e %x %c %b %n %%` with flags
/// `-`, `0`, `+`, `,`, width and precision.
pub fn format(ev: &mut Evaluator, fmt: &str, args: &[Value]) -> EvalResult<String> {
    let mut out = String::with_capacity(fmt.len());
    let mut next = args.iter();
    let mut chars = fmt.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        let mut spec = Spec::default();
        while let Some(&flag) = chars.peek() {
            match flag {
                '-' => spec.left = true,
                '0' => spec.zero = true,
                '+' => spec.plus = true,
                ',' => spec.grouping = true,
                _ => break,
            }
            chars.next();
        }
        let mut width = String::new();
        while let Some(&d) = chars.peek().filter(|d| d.is_ascii_digit()) {
            width.push(d);
            chars.next();
        }
        spec.width = width.parse().ok();
        if chars.peek() == Some(&'.') {
            chars.next();
            let mut precision = String::new();
            while let Some(&d) = chars.peek().filter(|d| d.is_ascii_digit()) {
                precision.push(d);
                chars.next();
            }
            spec.precision = precision.parse().ok();
        }
        let Some(conversion) = chars.next() else {
            return Err(ev.exception("IllegalArgumentException", "Format ends with '%'"));
        };
        let body = match conversion {
            '%' => "%".to_string(),
            'n' => "\n".to_string(),
            _ => {
                let arg = next.next().ok_or_else(|| missing_argument(ev, conversion))?;
                format_one(ev, conversion, &spec, arg)?
            }
        };
        out.push_str(&pad(&spec, body));
    }
    Ok(out)
}

fn format_one(ev: &mut Evaluator, conversion: char, spec: &Spec, arg: &Value) -> EvalResult<String> {
    let mismatch = || {
        EvalError::TypeMismatch(format!(
            "%{conversion} cannot format {}",
            arg.type_name()
        ))
    };
    Ok(match conversion {
        'd' => {
            let n = arg.as_i64().filter(|_| !matches!(arg.unboxed(), Value::Char(_))).ok_or_else(mismatch)?;
            let mut text = n.to_string();
            if spec.grouping {
                text = group_thousands(&text);
            }
            if spec.plus && n >= 0 {
                text.insert(0, '+');
            }
            text
        }
        'f' | 'e' => {
            let d = arg.as_f64().ok_or_else(mismatch)?;
            let precision = spec.precision.unwrap_or(6);
            let mut text = if conversion == 'f' {
                format!("{d:.precision$}")
            } else {
                let raw = format!("{d:.precision$e}");
                match raw.split_once('e') {
                    Some((mantissa, exp)) => {
                        let exp: i32 = exp.parse().unwrap_or(0);
                        let sign = if exp < 0 { '-' } else { '+' };
                        format!("{mantissa}e{sign}{:02}", exp.abs())
                    }
                    None => raw,
                }
            };
            if spec.grouping {
                text = group_thousands(&text);
            }
            if spec.plus && d >= 0.0 {
                text.insert(0, '+');
            }
            text
        }
        'x' | 'X' => {
            let text = match arg.unboxed() {
                Value::Int(i) => format!("{:x}", i as u32),
                Value::Long(l) => format!("{:x}", l as u64),
                _ => return Err(mismatch()),
            };
            if conversion == 'X' {
                text.to_uppercase()
            } else {
                text
            }
        }
        'c' => match arg.unboxed() {
            Value::Char(c) => c.to_string(),
            Value::Int(i) => char::from_u32(i as u32).ok_or_else(mismatch)?.to_string(),
            _ => return Err(mismatch()),
        },
        'b' | 'B' => match arg {
            Value::Null => "false".to_string(),
            v => v.as_bool().unwrap_or(true).to_string(),
        },
        's' | 'S' => {
            let mut text = ev.render(arg)?;
            if let Some(p) = spec.precision {
                text = text.chars().take(p).collect();
            }
            if conversion == 'S' {
                text.to_uppercase()
            } else {
                text
            }
        }
        other => {
            return Err(ev.exception(
                "IllegalArgumentException",
                format!("Unknown format conversion: '{other}'"),
            ))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locale_compare_case_insensitive_first() {
        assert_eq!(locale_compare("apple", "Banana"), -1);
        assert_eq!(locale_compare("Banana", "apple"), 1);
        assert_eq!(locale_compare("same", "same"), 0);
    }

    #[test]
    fn test_locale_compare_lowercase_wins_tie() {
        assert_eq!(locale_compare("a", "A"), -1);
        assert_eq!(locale_compare("Hello", "hello"), 1);
    }

    #[test]
    fn test_locale_compare_prefix_is_smaller() {
        assert_eq!(locale_compare("abc", "abcd"), -1);
    }

    #[test]
    fn test_java_hash() {
        assert_eq!(java_hash(""), 0);
        assert_eq!(java_hash("a"), 97);
        assert_eq!(java_hash("hello"), 99162322);
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands("1234567"), "1,234,567");
        assert_eq!(group_thousands("-1234.50"), "-1,234.50");
        assert_eq!(group_thousands("999"), "999");
    }

    #[test]
    fn test_pad() {
        let spec = Spec {
            width: Some(5),
            ..Spec::default()
        };
        assert_eq!(pad(&spec, "42".into()), "   42");
        let spec = Spec {
            width: Some(5),
            zero: true,
            ..Spec::default()
        };
        assert_eq!(pad(&spec, "-42".into()), "-0042");
    }
}
