//! Javelin static phase: validates a program before it is executed.
//!
//! ```text
//! Program → Checker (types, scopes, structure) → CompileErrors
//! ```
//!
//! A program with any error is never run. The checks cover unknown types,
//! incompatible initializers, constructor arity, duplicate locals, stray
//! `break`/`continue`, `super` misuse and cyclic inheritance.

pub mod checker;
pub mod env;
pub mod ty;

pub use checker::{Checker, ClassTable};

use javelin_types::ast::Program;
use javelin_types::{CompileErrors, SourceFile};
use tracing::debug;

/// Check `program` without quoting source lines in the errors.
pub fn check(program: &Program) -> CompileErrors {
    let mut errors = CompileErrors::new();
    Checker::new(program, &mut errors).check(program);
    debug!(file = %program.file, errors = errors.total_errors, "static phase done");
    errors
}

/// Check `program`, quoting the offending line of `source` in each error.
pub fn check_source(program: &Program, source: &SourceFile) -> CompileErrors {
    let mut errors = CompileErrors::new();
    Checker::new(program, &mut errors)
        .with_source(source)
        .check(program);
    debug!(file = %program.file, errors = errors.total_errors, "static phase done");
    errors
}
