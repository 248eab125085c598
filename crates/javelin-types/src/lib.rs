//! Shared types for the Javelin runtime.
//!
//! This crate defines the program representation handed to the runtime
//! (AST nodes, type references, source spans), the static-phase error
//! types, the library type-membership table, and a builder DSL for
//! constructing programs without a parser.

mod error;
mod span;
pub mod ast;
pub mod build;
pub mod library;
pub mod visit;

pub use error::{CompileError, CompileErrors, ErrorCategory, ErrorCode, MAX_ERRORS};
pub use span::{SourceFile, Span};
