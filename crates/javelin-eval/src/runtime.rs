//! Run entry points: the shared [`Runtime`], the [`Interpreter`] builder and
//! the [`RunReport`] handed back to callers.

use std::collections::HashSet;
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use std::thread::JoinHandle;

use chrono::Utc;
use javelin_types::ast::{Program, Stmt};
use javelin_types::{CompileErrors, Span};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{info, warn};

use crate::assertions::code_reached_sites;
use crate::class::ClassRegistry;
use crate::config::RunConfig;
use crate::error::{EvalError, EvalResult};
use crate::evaluator::Evaluator;
use crate::heap::Heap;
use crate::host::{Failure, Host, RecordingHost};
use crate::prelude::prelude_classes;

// ══════════════════════════════════════════════════════════════════════════════
// Shared runtime
// ══════════════════════════════════════════════════════════════════════════════

/// State shared by every execution context of one run.
pub struct Runtime {
    pub classes: ClassRegistry,
    pub heap: Heap,
    pub host: Arc<dyn Host>,
    pub config: RunConfig,
    /// Handles of started program threads not yet joined.
    pub(crate) threads: Mutex<Vec<JoinHandle<()>>>,
    pub(crate) thread_counter: AtomicUsize,
    fatal: Mutex<Vec<String>>,
    /// `assertCodeReached` sites that have executed.
    pub(crate) reached: Mutex<HashSet<(Span, String)>>,
    /// xorshift state behind `Math.random`; never zero.
    pub(crate) random_state: Mutex<u64>,
}

impl Runtime {
    pub fn new(classes: ClassRegistry, host: Arc<dyn Host>, config: RunConfig) -> Self {
        let seed = Utc::now().timestamp_nanos_opt().unwrap_or(0x2545_f491) as u64 | 1;
        Self {
            classes,
            heap: Heap::new(),
            host,
            config,
            threads: Mutex::new(Vec::new()),
            thread_counter: AtomicUsize::new(0),
            fatal: Mutex::new(Vec::new()),
            reached: Mutex::new(HashSet::new()),
            random_state: Mutex::new(seed),
        }
    }

    pub(crate) fn record_fatal(&self, message: String) {
        warn!("{message}");
        self.fatal.lock().push(message);
    }

    fn fatal_text(&self) -> Option<String> {
        let fatal = self.fatal.lock();
        (!fatal.is_empty()).then(|| fatal.join("\n"))
    }

    /// Join started threads until none are left, including threads
    /// started while joining.
    fn join_all(&self) -> usize {
        let mut joined = 0;
        loop {
            let handles = std::mem::take(&mut *self.threads.lock());
            if handles.is_empty() {
                return joined;
            }
            for handle in handles {
                let name = handle.thread().name().unwrap_or("?").to_string();
                if handle.join().is_err() {
                    self.record_fatal(format!("Thread {name} panicked"));
                }
                joined += 1;
            }
        }
    }
}

/// Record how an execution context ended. An uncaught exception or a
/// runtime fault ends only the context it happened in.
pub(crate) fn settle(ev: &mut Evaluator, result: EvalResult<()>) {
    let message = match result {
        Ok(()) => return,
        Err(EvalError::Exception(thrown)) => {
            let text = ev.render(&thrown).unwrap_or_else(|e| e.to_string());
            format!("Uncaught exception in thread {}: {text}", ev.thread_name)
        }
        Err(e) => format!("Fatal error in thread {}: {e}", ev.thread_name),
    };
    ev.rt.record_fatal(message);
}

// ══════════════════════════════════════════════════════════════════════════════
// Reports
// ══════════════════════════════════════════════════════════════════════════════

/// What [`Interpreter::execute`] returns. Output and failures went to the
/// host.
#[derive(Debug, Clone, Default)]
pub struct RunOutcome {
    pub compile_errors: CompileErrors,
    /// Uncaught exceptions and runtime faults, one per line.
    pub fatal: Option<String>,
    /// Program threads started besides the main context.
    pub threads: usize,
}

/// Everything one run produced.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub output: String,
    pub failures: Vec<Failure>,
    pub compile_errors: CompileErrors,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fatal: Option<String>,
}

impl RunReport {
    pub fn output_lines(&self) -> Vec<&str> {
        self.output.lines().collect()
    }

    /// No compile errors, no failed assertion, no uncaught exception.
    pub fn passed(&self) -> bool {
        !self.compile_errors.has_errors() && self.failures.is_empty() && self.fatal.is_none()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Interpreter
// ══════════════════════════════════════════════════════════════════════════════

/// One program, ready to run.
///
/// ```
/// use javelin_types::build::*;
///
/// let report = javelin_eval::run(program(vec![], vec![println(string("hi"))]));
/// assert_eq!(report.output_lines(), vec!["hi"]);
/// assert!(report.passed());
/// ```
pub struct Interpreter {
    program: Program,
    config: RunConfig,
    host: Arc<dyn Host>,
}

impl Interpreter {
    pub fn new(program: Program) -> Self {
        Self {
            program,
            config: RunConfig::default(),
            host: Arc::new(RecordingHost::new()),
        }
    }

    pub fn with_config(mut self, config: RunConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_host(mut self, host: Arc<dyn Host>) -> Self {
        self.host = host;
        self
    }

    /// Check, load and run the program, then wait for every thread it
    /// started.
    pub fn execute(self) -> RunOutcome {
        let Self {
            program,
            config,
            host,
        } = self;

        let compile_errors = javelin_check::check(&program);
        if compile_errors.has_errors() {
            info!(errors = compile_errors.total_errors, "static phase rejected program");
            return RunOutcome {
                compile_errors,
                ..RunOutcome::default()
            };
        }

        let classes = match ClassRegistry::load(&prelude_classes(), &program) {
            Ok(classes) => classes,
            Err(e) => {
                warn!("{e}");
                return RunOutcome {
                    compile_errors,
                    fatal: Some(e.to_string()),
                    threads: 0,
                };
            }
        };
        let sites = if config.collect_unreached {
            code_reached_sites(&program)
        } else {
            Vec::new()
        };
        info!(classes = classes.len(), sites = sites.len(), "run started");

        let rt = Arc::new(Runtime::new(classes, host, config));
        run_main(&rt, program.main);
        let threads = rt.join_all();

        let reached = rt.reached.lock().clone();
        for (span, message) in sites {
            if reached.contains(&(span, message.clone())) {
                continue;
            }
            let location = (!span.is_synthetic()).then_some(span);
            rt.host.fail(
                Failure::new(message, location, "main").with_detail("code was never reached"),
            );
        }

        let fatal = rt.fatal_text();
        info!(threads, fatal = fatal.is_some(), "run finished");
        RunOutcome {
            compile_errors,
            fatal,
            threads,
        }
    }
}

/// Run the entry statements on a native thread of their own, so the
/// configured stack size applies to them too.
fn run_main(rt: &Arc<Runtime>, main: Vec<Stmt>) {
    let spawned = std::thread::Builder::new()
        .name("main".into())
        .stack_size(rt.config.thread_stack_size)
        .spawn({
            let rt = rt.clone();
            move || {
                let mut ev = Evaluator::new(rt, "main");
                let result = ev.exec_stmts(&main).map(|_| ());
                settle(&mut ev, result);
            }
        });
    match spawned.map(JoinHandle::join) {
        Ok(Ok(())) => {}
        Ok(Err(_)) => rt.record_fatal("Thread main panicked".into()),
        Err(e) => rt.record_fatal(format!("could not spawn the main thread: {e}")),
    }
}

/// Run `program` with the default configuration.
pub fn run(program: Program) -> RunReport {
    run_with_config(program, RunConfig::default())
}

/// Run `program`, buffering output and failures into the report.
pub fn run_with_config(program: Program, config: RunConfig) -> RunReport {
    let host = Arc::new(RecordingHost::new());
    let outcome = Interpreter::new(program)
        .with_config(config)
        .with_host(host.clone())
        .execute();
    let output = if outcome.compile_errors.has_errors() {
        String::new()
    } else {
        host.output()
    };
    RunReport {
        output,
        failures: host.failures(),
        compile_errors: outcome.compile_errors,
        fatal: outcome.fatal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use javelin_types::build::*;

    #[test]
    fn test_report_passed() {
        let mut report = RunReport::default();
        assert!(report.passed());
        report.fatal = Some("boom".into());
        assert!(!report.passed());
    }

    #[test]
    fn test_report_json_skips_missing_fatal() {
        let report = RunReport {
            output: "x\n".into(),
            ..RunReport::default()
        };
        let json = report.to_json().unwrap();
        assert!(json.contains("\"output\""));
        assert!(!json.contains("\"fatal\""));
    }

    #[test]
    fn test_unreached_site_reported() {
        let prog = program(
            vec![],
            vec![if_(
                boolean(false),
                vec![stmt(call("assertCodeReached", vec![string("inside")]).at(3, 5))],
            )],
        );
        let report = run(prog);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].message, "inside");
        assert_eq!(report.failures[0].location, Some(Span::point(3, 5)));
    }

    #[test]
    fn test_uncaught_exception_is_fatal() {
        let prog = program(
            vec![],
            vec![
                println(string("before")),
                throw(new("IllegalStateException", vec![string("bad")])),
                println(string("after")),
            ],
        );
        let report = run(prog);
        assert_eq!(report.output_lines(), vec!["before"]);
        assert_eq!(
            report.fatal.as_deref(),
            Some("Uncaught exception in thread main: IllegalStateException: bad")
        );
    }
}
