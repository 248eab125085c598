//! Runtime values.

use std::sync::Arc;

use chrono::NaiveDateTime;
use javelin_types::ast::{LambdaExpr, PrimType, TypeRef};

use crate::env::Environment;
use crate::evaluator::Frame;
use crate::heap::ObjRef;

// ══════════════════════════════════════════════════════════════════════════════
// Value
// ══════════════════════════════════════════════════════════════════════════════

/// A runtime value.
///
/// Primitives and strings are value-typed. Objects, arrays and collections
/// live on the [`Heap`](crate::heap::Heap) and are referenced by handle, so
/// copying a `Value::Ref` aliases the same storage.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Char(char),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Str(Arc<str>),
    /// A boxed wrapper (`Integer`, `Double`, ...) with reference identity.
    Boxed(Boxed),
    Ref(ObjRef),
    Closure(Arc<Closure>),
    /// `Optional`: present or absent.
    Optional(Option<Arc<Value>>),
    DateTime(NaiveDateTime),
}

impl Value {
    pub fn str(s: impl AsRef<str>) -> Self {
        Value::Str(Arc::from(s.as_ref()))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The value with any boxing removed.
    pub fn unboxed(&self) -> Value {
        match self {
            Value::Boxed(b) => b.get().clone(),
            other => other.clone(),
        }
    }

    /// The primitive kind, looking through boxing.
    pub fn prim_kind(&self) -> Option<PrimType> {
        match self {
            Value::Bool(_) => Some(PrimType::Boolean),
            Value::Char(_) => Some(PrimType::Char),
            Value::Int(_) => Some(PrimType::Int),
            Value::Long(_) => Some(PrimType::Long),
            Value::Float(_) => Some(PrimType::Float),
            Value::Double(_) => Some(PrimType::Double),
            Value::Boxed(b) => b.get().prim_kind(),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.prim_kind().is_some_and(PrimType::is_numeric)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.unboxed() {
            Value::Bool(b) => Some(b),
            _ => None,
        }
    }

    /// Integral view of an int, long or char (boxed or not).
    pub fn as_i64(&self) -> Option<i64> {
        match self.unboxed() {
            Value::Int(i) => Some(i as i64),
            Value::Long(l) => Some(l),
            Value::Char(c) => Some(c as i64),
            _ => None,
        }
    }

    /// Floating view of any numeric value.
    pub fn as_f64(&self) -> Option<f64> {
        match self.unboxed() {
            Value::Int(i) => Some(i as f64),
            Value::Long(l) => Some(l as f64),
            Value::Char(c) => Some(c as u32 as f64),
            Value::Float(f) => Some(f as f64),
            Value::Double(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_ref(&self) -> Option<ObjRef> {
        match self {
            Value::Ref(r) => Some(*r),
            _ => None,
        }
    }

    /// Name of the value's runtime type, for messages and library dispatch.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "Boolean",
            Value::Char(_) => "Character",
            Value::Int(_) => "Integer",
            Value::Long(_) => "Long",
            Value::Float(_) => "Float",
            Value::Double(_) => "Double",
            Value::Str(_) => "String",
            Value::Boxed(b) => b.get().type_name(),
            Value::Ref(_) => "Object",
            Value::Closure(_) => "Lambda",
            Value::Optional(_) => "Optional",
            Value::DateTime(_) => "LocalDateTime",
        }
    }

    /// The zero value a declaration of type `ty` starts with.
    pub fn default_for(ty: &TypeRef) -> Value {
        match ty {
            TypeRef::Prim(p) => match p {
                PrimType::Boolean => Value::Bool(false),
                PrimType::Char => Value::Char('\0'),
                PrimType::Int => Value::Int(0),
                PrimType::Long => Value::Long(0),
                PrimType::Float => Value::Float(0.0),
                PrimType::Double => Value::Double(0.0),
            },
            _ => Value::Null,
        }
    }

    /// Text of a value that needs no heap access or user code, or `None`.
    pub fn primitive_text(&self) -> Option<String> {
        Some(match self {
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Char(c) => c.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Long(l) => l.to_string(),
            Value::Float(f) => format_float(*f),
            Value::Double(d) => format_double(*d),
            Value::Str(s) => s.to_string(),
            Value::Boxed(b) => return b.get().primitive_text(),
            Value::DateTime(dt) => format_datetime(dt),
            Value::Ref(_) | Value::Closure(_) | Value::Optional(_) => return None,
        })
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Boxed wrappers
// ══════════════════════════════════════════════════════════════════════════════

/// A boxed primitive. Two boxes are the same object only if they share the
/// allocation.
#[derive(Debug, Clone)]
pub struct Boxed(Arc<Value>);

impl Boxed {
    /// Box a primitive. Boxing an already boxed value keeps its identity.
    pub fn new(value: Value) -> Value {
        match value {
            Value::Boxed(_) | Value::Null => value,
            prim => Value::Boxed(Boxed(Arc::new(prim))),
        }
    }

    pub fn get(&self) -> &Value {
        &self.0
    }

    pub fn ptr_eq(&self, other: &Boxed) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Small integers, chars and booleans behave as if drawn from a shared
    /// cache: `==` on two such boxes compares their values.
    pub fn is_cached(&self) -> bool {
        match self.get() {
            Value::Int(i) => (-128..=127).contains(i),
            Value::Long(l) => (-128..=127).contains(l),
            Value::Char(c) => (*c as u32) <= 127,
            Value::Bool(_) => true,
            _ => false,
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Closures
// ══════════════════════════════════════════════════════════════════════════════

/// A lambda value.
///
/// `env` shares the cells of the scope chain it was created in, so captured
/// locals stay live in both directions. `frame` remembers the receiver and
/// class context of the creating code.
#[derive(Debug)]
pub struct Closure {
    pub lambda: Arc<LambdaExpr>,
    pub env: Environment,
    pub frame: Frame,
}

// ══════════════════════════════════════════════════════════════════════════════
// Formatting
// ══════════════════════════════════════════════════════════════════════════════

/// Render a `double` the way `Double.toString` does.
pub fn format_double(d: f64) -> String {
    if d.is_nan() {
        return "NaN".into();
    }
    if d.is_infinite() {
        return if d > 0.0 { "Infinity" } else { "-Infinity" }.into();
    }
    if d == 0.0 {
        return if d.is_sign_negative() { "-0.0" } else { "0.0" }.into();
    }
    let abs = d.abs();
    if (1e-3..1e7).contains(&abs) {
        let s = format!("{d}");
        if s.contains('.') {
            s
        } else {
            format!("{s}.0")
        }
    } else {
        scientific(format!("{d:E}"))
    }
}

/// Render a `float` the way `Float.toString` does.
pub fn format_float(f: f32) -> String {
    if f.is_nan() || f.is_infinite() || f == 0.0 {
        return format_double(f as f64);
    }
    let abs = f.abs();
    if (1e-3..1e7).contains(&abs) {
        let s = format!("{f}");
        if s.contains('.') {
            s
        } else {
            format!("{s}.0")
        }
    } else {
        scientific(format!("{f:E}"))
    }
}

/// `1E10` → `1.0E10`
fn scientific(s: String) -> String {
    match s.split_once('E') {
        Some((mantissa, exp)) if !mantissa.contains('.') => format!("{mantissa}.0E{exp}"),
        _ => s,
    }
}

/// ISO-8601 without zero seconds, as `LocalDateTime.toString` prints it.
pub fn format_datetime(dt: &NaiveDateTime) -> String {
    use chrono::Timelike;
    if dt.second() == 0 && dt.nanosecond() == 0 {
        dt.format("%Y-%m-%dT%H:%M").to_string()
    } else {
        dt.format("%Y-%m-%dT%H:%M:%S").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_double_plain() {
        assert_eq!(format_double(10.0), "10.0");
        assert_eq!(format_double(1.5), "1.5");
        assert_eq!(format_double(-0.25), "-0.25");
        assert_eq!(format_double(0.0), "0.0");
    }

    #[test]
    fn test_format_double_scientific() {
        assert_eq!(format_double(1e10), "1.0E10");
        assert_eq!(format_double(1.5e-5), "1.5E-5");
    }

    #[test]
    fn test_format_double_special() {
        assert_eq!(format_double(f64::NAN), "NaN");
        assert_eq!(format_double(f64::NEG_INFINITY), "-Infinity");
    }

    #[test]
    fn test_format_float() {
        assert_eq!(format_float(2.5), "2.5");
        assert_eq!(format_float(3.0), "3.0");
    }

    #[test]
    fn test_boxing_keeps_identity() {
        let a = Boxed::new(Value::Int(1000));
        let b = a.clone();
        let c = Boxed::new(Value::Int(1000));
        match (&a, &b, &c) {
            (Value::Boxed(x), Value::Boxed(y), Value::Boxed(z)) => {
                assert!(x.ptr_eq(y));
                assert!(!x.ptr_eq(z));
                assert!(!x.is_cached());
            }
            _ => panic!("expected boxes"),
        }
    }

    #[test]
    fn test_unboxed_and_kind() {
        let b = Boxed::new(Value::Double(2.0));
        assert_eq!(b.prim_kind(), Some(PrimType::Double));
        assert!(matches!(b.unboxed(), Value::Double(d) if d == 2.0));
        assert_eq!(b.type_name(), "Double");
    }

    #[test]
    fn test_datetime_format() {
        let dt = chrono::NaiveDate::from_ymd_opt(2024, 6, 20)
            .unwrap()
            .and_hms_opt(12, 15, 0)
            .unwrap();
        assert_eq!(format_datetime(&dt), "2024-06-20T12:15");
        let dt = dt.with_second_value(25);
        assert_eq!(format_datetime(&dt), "2024-06-20T12:15:25");
    }

    trait WithSecond {
        fn with_second_value(self, s: u32) -> Self;
    }

    impl WithSecond for NaiveDateTime {
        fn with_second_value(self, s: u32) -> Self {
            use chrono::Timelike;
            self.with_second(s).unwrap()
        }
    }

    #[test]
    fn test_char_as_number() {
        assert_eq!(Value::Char('A').as_i64(), Some(65));
        assert_eq!(Value::Char('1').as_f64(), Some(49.0));
    }
}
