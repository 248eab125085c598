//! `LocalDateTime` over `chrono::NaiveDateTime`.

use chrono::{Datelike, Local, Months, NaiveDate, NaiveDateTime, TimeDelta, Timelike};

use super::{int_arg, no_method};
use crate::error::{EvalError, EvalResult};
use crate::evaluator::Evaluator;
use crate::value::Value;

fn out_of_range(ev: &Evaluator, what: &str) -> EvalError {
    ev.exception("IllegalArgumentException", format!("Invalid date-time: {what}"))
}

fn date_arg(ev: &Evaluator, v: &Value) -> EvalResult<NaiveDateTime> {
    match v {
        Value::DateTime(dt) => Ok(*dt),
        Value::Null => Err(ev.npe("LocalDateTime argument is null")),
        other => Err(EvalError::TypeMismatch(format!(
            "expected LocalDateTime, got {}",
            other.type_name()
        ))),
    }
}

fn u32_arg(v: &Value) -> EvalResult<u32> {
    let n = int_arg(v)?;
    u32::try_from(n).map_err(|_| EvalError::TypeMismatch(format!("{n} is not a valid field value")))
}

/// `LocalDateTime.method(args)`
pub fn call_static(ev: &mut Evaluator, method: &str, args: Vec<Value>) -> EvalResult<Value> {
    match (method, args.as_slice()) {
        ("now", []) => Ok(Value::DateTime(Local::now().naive_local())),
        ("of", [y, mo, d, h, mi, rest @ ..]) if rest.len() <= 1 => {
            let year = i32::try_from(int_arg(y)?).map_err(|_| out_of_range(ev, "year"))?;
            let second = match rest {
                [s] => u32_arg(s)?,
                _ => 0,
            };
            let dt = NaiveDate::from_ymd_opt(year, u32_arg(mo)?, u32_arg(d)?)
                .and_then(|date| date.and_hms_opt(u32_arg(h).ok()?, u32_arg(mi).ok()?, second))
                .ok_or_else(|| out_of_range(ev, "field out of range"))?;
            Ok(Value::DateTime(dt))
        }
        ("parse", [Value::Str(text)]) => NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S")
            .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M"))
            .map(Value::DateTime)
            .map_err(|_| out_of_range(ev, text)),
        _ => Err(no_method("LocalDateTime", method, args.len())),
    }
}

fn shifted(ev: &Evaluator, dt: NaiveDateTime, delta: Option<TimeDelta>) -> EvalResult<Value> {
    delta
        .and_then(|d| dt.checked_add_signed(d))
        .map(Value::DateTime)
        .ok_or_else(|| out_of_range(ev, "result out of range"))
}

fn shifted_months(ev: &Evaluator, dt: NaiveDateTime, months: i64) -> EvalResult<Value> {
    let magnitude = u32::try_from(months.unsigned_abs()).map_err(|_| out_of_range(ev, "months"))?;
    let result = if months >= 0 {
        dt.checked_add_months(Months::new(magnitude))
    } else {
        dt.checked_sub_months(Months::new(magnitude))
    };
    result
        .map(Value::DateTime)
        .ok_or_else(|| out_of_range(ev, "result out of range"))
}

/// `dateTime.method(args)`
pub fn call(ev: &mut Evaluator, dt: NaiveDateTime, method: &str, args: Vec<Value>) -> EvalResult<Value> {
    let this = Value::DateTime(dt);
    match (method, args.as_slice()) {
        ("getYear", []) => Ok(Value::Int(dt.year())),
        ("getMonth" | "getMonthValue", []) => Ok(Value::Int(dt.month() as i32)),
        ("getDayOfMonth", []) => Ok(Value::Int(dt.day() as i32)),
        ("getDayOfYear", []) => Ok(Value::Int(dt.ordinal() as i32)),
        ("getHour", []) => Ok(Value::Int(dt.hour() as i32)),
        ("getMinute", []) => Ok(Value::Int(dt.minute() as i32)),
        ("getSecond", []) => Ok(Value::Int(dt.second() as i32)),
        ("until", [other, ..]) => {
            let other = date_arg(ev, other)?;
            Ok(Value::Long((dt - other).num_days()))
        }
        ("plusDays" | "minusDays", [n]) => {
            let n = int_arg(n)?;
            let n = if method == "minusDays" { -n } else { n };
            shifted(ev, dt, TimeDelta::try_days(n))
        }
        ("plusWeeks" | "minusWeeks", [n]) => {
            let n = int_arg(n)?;
            let n = if method == "minusWeeks" { -n } else { n };
            shifted(ev, dt, TimeDelta::try_weeks(n))
        }
        ("plusHours" | "minusHours", [n]) => {
            let n = int_arg(n)?;
            let n = if method == "minusHours" { -n } else { n };
            shifted(ev, dt, TimeDelta::try_hours(n))
        }
        ("plusMinutes" | "minusMinutes", [n]) => {
            let n = int_arg(n)?;
            let n = if method == "minusMinutes" { -n } else { n };
            shifted(ev, dt, TimeDelta::try_minutes(n))
        }
        ("plusSeconds" | "minusSeconds", [n]) => {
            let n = int_arg(n)?;
            let n = if method == "minusSeconds" { -n } else { n };
            shifted(ev, dt, TimeDelta::try_seconds(n))
        }
        ("plusMonths" | "minusMonths", [n]) => {
            let n = int_arg(n)?;
            shifted_months(ev, dt, if method == "minusMonths" { -n } else { n })
        }
        ("plusYears" | "minusYears", [n]) => {
            let n = int_arg(n)?.saturating_mul(12);
            shifted_months(ev, dt, if method == "minusYears" { -n } else { n })
        }
        ("isBefore", [other]) => Ok(Value::Bool(dt < date_arg(ev, other)?)),
        ("isAfter", [other]) => Ok(Value::Bool(dt > date_arg(ev, other)?)),
        ("isEqual", [other]) => Ok(Value::Bool(dt == date_arg(ev, other)?)),
        ("compareTo", [other]) => {
            let other = date_arg(ev, other)?;
            Ok(Value::Int(dt.cmp(&other) as i32))
        }
        ("equals", [other]) => Ok(Value::Bool(matches!(other, Value::DateTime(o) if *o == dt))),
        ("hashCode", []) => Ok(Value::Int(ev.hash_code(&this)?)),
        ("toString", []) => Ok(Value::str(ev.render(&this)?)),
        _ => Err(no_method("LocalDateTime", method, args.len())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::ClassRegistry;
    use crate::prelude::prelude_classes;
    use crate::{RecordingHost, RunConfig, Runtime};
    use javelin_types::build::program;
    use std::sync::Arc;

    fn evaluator() -> Evaluator {
        let classes = ClassRegistry::load(&prelude_classes(), &program(vec![], vec![])).unwrap();
        let rt = Runtime::new(classes, Arc::new(RecordingHost::new()), RunConfig::default());
        Evaluator::new(Arc::new(rt), "main")
    }

    fn at(y: i32, mo: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .unwrap()
    }

    #[test]
    fn test_until_counts_this_minus_other() {
        let mut ev = evaluator();
        let later = Value::DateTime(at(2023, 11, 21));
        let days = call(&mut ev, at(2023, 1, 1), "until", vec![later]).unwrap();
        assert!(matches!(days, Value::Long(-324)));
        let earlier = Value::DateTime(at(2023, 1, 1));
        let days = call(&mut ev, at(2023, 11, 21), "until", vec![earlier]).unwrap();
        assert!(matches!(days, Value::Long(324)));
    }

    #[test]
    fn test_month_shift_clamps_day() {
        let jan31 = at(2024, 1, 31);
        assert_eq!(jan31.checked_add_months(Months::new(1)), Some(at(2024, 2, 29)));
    }
}
