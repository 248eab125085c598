//! Runtime configuration.

use serde::{Deserialize, Serialize};

/// Limits and switches for one run.
///
/// Every field has a default, so a config document only needs the keys it
/// overrides:
///
/// ```
/// let cfg = javelin_eval::RunConfig::from_json(r#"{ "gas_limit": 1000 }"#).unwrap();
/// assert_eq!(cfg.gas_limit, 1000);
/// assert!(cfg.collect_unreached);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Evaluation steps allowed per execution context; `0` disables metering.
    pub gas_limit: u64,
    /// Call depth at which `StackOverflowError` is thrown.
    pub max_call_depth: usize,
    /// Native stack size, in bytes, for the main context.
    pub thread_stack_size: usize,
    /// Native stack size, in bytes, for each program-started thread.
    pub worker_stack_size: usize,
    /// Report `assertCodeReached` sites that never ran.
    pub collect_unreached: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            gas_limit: 500_000_000,
            max_call_depth: 1024,
            thread_stack_size: 256 * 1024 * 1024,
            worker_stack_size: 64 * 1024 * 1024,
            collect_unreached: true,
        }
    }
}

impl RunConfig {
    /// Parse a JSON config document.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn with_gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = gas_limit;
        self
    }

    pub fn with_max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }

    pub fn with_worker_stack_size(mut self, bytes: usize) -> Self {
        self.worker_stack_size = bytes;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_gives_defaults() {
        let cfg = RunConfig::from_json("{}").unwrap();
        assert_eq!(cfg, RunConfig::default());
    }

    #[test]
    fn test_partial_override() {
        let cfg = RunConfig::from_json(r#"{"max_call_depth": 10, "collect_unreached": false}"#)
            .unwrap();
        assert_eq!(cfg.max_call_depth, 10);
        assert!(!cfg.collect_unreached);
        assert_eq!(cfg.gas_limit, RunConfig::default().gas_limit);
    }

    #[test]
    fn test_worker_stack_is_separate_and_smaller() {
        let cfg = RunConfig::default();
        assert!(cfg.worker_stack_size < cfg.thread_stack_size);
        let cfg = RunConfig::from_json(r#"{"worker_stack_size": 1048576}"#).unwrap();
        assert_eq!(cfg.worker_stack_size, 1 << 20);
        assert_eq!(cfg.thread_stack_size, RunConfig::default().thread_stack_size);
        assert_eq!(
            RunConfig::default().with_worker_stack_size(4096).worker_stack_size,
            4096
        );
    }

    #[test]
    fn test_rejects_wrong_types() {
        assert!(RunConfig::from_json(r#"{"gas_limit": "lots"}"#).is_err());
    }
}
