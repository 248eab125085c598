//! Host bridge: where program output and assertion failures go.

use javelin_types::Span;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// A failed assertion, reported through [`Host::fail`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Failure {
    /// Message supplied by the program.
    pub message: String,
    /// What was compared, e.g. `expected: 3, actual: 4`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Source location of the assertion, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Span>,
    /// Name of the execution context that reported it.
    pub thread: String,
}

impl Failure {
    pub fn new(message: impl Into<String>, location: Option<Span>, thread: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            detail: None,
            location,
            thread: thread.into(),
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Receiver of program side effects.
///
/// Called concurrently from every execution context; implementations
/// serialize internally.
pub trait Host: Send + Sync {
    /// Append text to the program's output stream.
    fn print(&self, text: &str);

    /// Record an assertion failure. Execution continues.
    fn fail(&self, failure: Failure);
}

/// A host that buffers everything for later inspection.
#[derive(Debug, Default)]
pub struct RecordingHost {
    output: Mutex<String>,
    failures: Mutex<Vec<Failure>>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn output(&self) -> String {
        self.output.lock().clone()
    }

    pub fn failures(&self) -> Vec<Failure> {
        self.failures.lock().clone()
    }
}

impl Host for RecordingHost {
    fn print(&self, text: &str) {
        self.output.lock().push_str(text);
    }

    fn fail(&self, failure: Failure) {
        self.failures.lock().push(failure);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_recording_host_buffers_output() {
        let host = RecordingHost::new();
        host.print("a");
        host.print("b\n");
        assert_eq!(host.output(), "ab\n");
    }

    #[test]
    fn test_failure_json_skips_empty_fields() {
        let f = Failure::new("sum", None, "main");
        let json = serde_json::to_string(&f).unwrap();
        assert!(!json.contains("detail"));
        assert!(!json.contains("location"));
        let f = f.with_detail("expected: 1, actual: 2");
        assert!(serde_json::to_string(&f).unwrap().contains("expected: 1"));
    }

    #[test]
    fn test_concurrent_prints_are_not_lost() {
        let host = Arc::new(RecordingHost::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let host = host.clone();
                std::thread::spawn(move || {
                    for _ in 0..50 {
                        host.print("x");
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(host.output().len(), 400);
    }
}
