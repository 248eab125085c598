//! Javelin tree-walking runtime.
//!
//! Runs a checked [`Program`](javelin_types::ast::Program) directly from its
//! AST: classes with single inheritance and `super` chains, inner and
//! anonymous classes, lambdas over shared cells, exceptions, the collection
//! library and program threads over one shared heap.
//!
//! ```
//! use javelin_types::build::*;
//!
//! let prog = program(
//!     vec![class("Counter")
//!         .field_init("int", "n", int(0))
//!         .method(method("int", "next", &[], vec![ret(pre_inc(name("n")))]))
//!         .build()],
//!     vec![
//!         local("Counter", "c", new("Counter", vec![])),
//!         stmt(invoke(name("c"), "next", vec![])),
//!         println(invoke(name("c"), "next", vec![])),
//!     ],
//! );
//! let report = javelin_eval::run(prog);
//! assert_eq!(report.output, "2\n");
//! ```

pub mod assertions;
pub mod class;
pub mod config;
mod convert;
mod dispatch;
pub mod env;
pub mod error;
pub mod evaluator;
mod exec;
pub mod heap;
pub mod host;
pub mod ops;
pub mod prelude;
pub mod runtime;
mod stdlib;
pub mod threads;
pub mod value;

pub use config::RunConfig;
pub use error::{EvalError, EvalResult};
pub use evaluator::Evaluator;
pub use host::{Failure, Host, RecordingHost};
pub use runtime::{run, run_with_config, Interpreter, RunOutcome, RunReport, Runtime};
pub use value::Value;
