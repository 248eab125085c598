//! Host functions reachable from programs: output and test assertions.
//!
//! Failures are recorded through the [`Host`](crate::host::Host) and never
//! interrupt the program.

use std::collections::BTreeMap;

use javelin_types::ast::{Expr, ExprKind, Program};
use javelin_types::visit::{walk_expr, walk_program, Visitor};
use javelin_types::Span;

use crate::error::EvalResult;
use crate::evaluator::Evaluator;
use crate::host::Failure;
use crate::value::Value;

// ══════════════════════════════════════════════════════════════════════════════
// Reached-site collection
// ══════════════════════════════════════════════════════════════════════════════

/// `assertCodeReached` call sites with their messages, in source order.
#[derive(Default)]
struct SiteCollector {
    sites: BTreeMap<(u32, u32, String), Span>,
}

fn is_reached_call(expr: &Expr) -> Option<&[Expr]> {
    match &expr.kind {
        ExprKind::Call { name, args } if name.name == "assertCodeReached" => Some(args),
        ExprKind::MethodCall {
            object,
            method,
            args,
        } if method.name == "assertCodeReached"
            && matches!(&object.kind, ExprKind::Name(n) if n == "Assertions") =>
        {
            Some(args)
        }
        _ => None,
    }
}

impl Visitor for SiteCollector {
    fn visit_expr(&mut self, expr: &Expr) {
        if let Some(args) = is_reached_call(expr) {
            let message = match args.first().map(|a| &a.kind) {
                Some(ExprKind::StringLit(s)) => s.clone(),
                _ => String::new(),
            };
            let span = expr.span;
            self.sites
                .insert((span.start_line, span.start_col, message), span);
        }
        walk_expr(self, expr);
    }
}

/// Every `assertCodeReached` site in the program, in source order.
pub fn code_reached_sites(program: &Program) -> Vec<(Span, String)> {
    let mut collector = SiteCollector::default();
    walk_program(&mut collector, program);
    collector
        .sites
        .into_iter()
        .map(|((_, _, message), span)| (span, message))
        .collect()
}

// ══════════════════════════════════════════════════════════════════════════════
// Host calls
// ══════════════════════════════════════════════════════════════════════════════

impl Evaluator {
    fn report(&self, message: String, detail: Option<String>, span: Span) {
        let location = (!span.is_synthetic()).then_some(span);
        let mut failure = Failure::new(message, location, self.thread_name.as_ref());
        if let Some(detail) = detail {
            failure = failure.with_detail(detail);
        }
        self.rt.host.fail(failure);
    }

    fn message_arg(&mut self, arg: Option<&Value>, fallback: &str) -> EvalResult<String> {
        match arg {
            Some(v) => self.render(v),
            None => Ok(fallback.to_string()),
        }
    }

    /// `assertEquals` comparison: numbers by value across numeric types,
    /// text by rendering when either side is a string, otherwise `equals`.
    fn assert_equal(&mut self, expected: &Value, actual: &Value) -> EvalResult<bool> {
        if expected.is_numeric() && actual.is_numeric() {
            return Ok(match (expected.as_i64(), actual.as_i64()) {
                (Some(x), Some(y)) => x == y,
                _ => expected.as_f64() == actual.as_f64(),
            });
        }
        if matches!(expected, Value::Str(_)) || matches!(actual, Value::Str(_)) {
            if expected.is_null() || actual.is_null() {
                return Ok(false);
            }
            return Ok(self.render(expected)? == self.render(actual)?);
        }
        self.java_equals(expected, actual)
    }
}

/// Run host function `name`, or `None` if there is no such function.
pub fn call_host(
    ev: &mut Evaluator,
    name: &str,
    args: Vec<Value>,
    span: Span,
) -> EvalResult<Option<Value>> {
    match (name, args.as_slice()) {
        ("print", [v]) => {
            let text = ev.render(v)?;
            ev.rt.host.print(&text);
        }
        ("println", []) => ev.rt.host.print("\n"),
        ("println", [v]) => {
            let text = ev.render(v)? + "\n";
            ev.rt.host.print(&text);
        }
        ("assertEquals" | "assertNotEquals", [expected, actual, rest @ ..]) if rest.len() <= 1 => {
            let equal = match rest.first() {
                Some(delta) if delta.is_numeric() && expected.is_numeric() && actual.is_numeric() => {
                    let (e, a, d) = (
                        expected.as_f64().unwrap_or(f64::NAN),
                        actual.as_f64().unwrap_or(f64::NAN),
                        delta.as_f64().unwrap_or(0.0),
                    );
                    (e - a).abs() <= d
                }
                _ => ev.assert_equal(expected, actual)?,
            };
            let wanted = name == "assertEquals";
            if equal != wanted {
                let message = match rest.first() {
                    Some(m @ Value::Str(_)) => ev.render(m)?,
                    _ => format!("{name} failed"),
                };
                let detail = if wanted {
                    format!("expected: {}, actual: {}", ev.render(expected)?, ev.render(actual)?)
                } else {
                    format!("unexpected: {}", ev.render(actual)?)
                };
                ev.report(message, Some(detail), span);
            }
        }
        ("assertTrue" | "assertFalse", [cond, rest @ ..]) if rest.len() <= 1 => {
            let wanted = name == "assertTrue";
            if cond.as_bool() != Some(wanted) {
                let message = ev.message_arg(rest.first(), &format!("{name} failed"))?;
                ev.report(message, Some(format!("expected: {wanted}")), span);
            }
        }
        ("assertNull" | "assertNotNull", [v, rest @ ..]) if rest.len() <= 1 => {
            let wanted = name == "assertNull";
            if v.is_null() != wanted {
                let message = ev.message_arg(rest.first(), &format!("{name} failed"))?;
                let actual = ev.render(v)?;
                ev.report(message, Some(format!("actual: {actual}")), span);
            }
        }
        ("assertCodeReached", rest) if rest.len() <= 1 => {
            let message = match rest.first() {
                Some(Value::Str(s)) => s.to_string(),
                _ => String::new(),
            };
            ev.rt.reached.lock().insert((span, message));
        }
        ("fail", rest) if rest.len() <= 1 => {
            let message = ev.message_arg(rest.first(), "fail")?;
            ev.report(message, None, span);
        }
        _ => return Ok(None),
    }
    Ok(Some(Value::Null))
}

#[cfg(test)]
mod tests {
    use super::*;
    use javelin_types::build::*;

    #[test]
    fn test_collects_reached_sites_in_order() {
        let program = program(
            vec![],
            vec![
                stmt(call("assertCodeReached", vec![string("second")]).at(5, 1)),
                stmt(call("assertCodeReached", vec![string("first")]).at(2, 1)),
                stmt(call("println", vec![string("x")])),
            ],
        );
        let sites = code_reached_sites(&program);
        let messages: Vec<_> = sites.iter().map(|(_, m)| m.as_str()).collect();
        assert_eq!(messages, vec!["first", "second"]);
    }
}
