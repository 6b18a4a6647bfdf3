//! Evaluation configuration

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Configuration and state for evaluation.
///
/// Owned by the [`Environment`](crate::Environment) and consulted on every
/// call and loop iteration for recursion limits and interruption.
#[derive(Debug, Clone)]
pub struct EvalConfig {
    /// Maximum call depth (stack overflow protection)
    pub max_call_depth: usize,

    /// Interrupt flag - set to true to abort evaluation
    pub interrupt: Arc<AtomicBool>,

    /// Log every interpreted call and its result at `debug` level
    pub trace: bool,

    /// Attach the working token tree to parse errors
    pub verbose_parse_errors: bool,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            max_call_depth: 1000,
            interrupt: Arc::new(AtomicBool::new(false)),
            trace: false,
            verbose_parse_errors: false,
        }
    }
}

impl EvalConfig {
    /// Create a new configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a configuration with a custom call depth limit.
    pub fn with_max_call_depth(max_depth: usize) -> Self {
        Self {
            max_call_depth: max_depth,
            ..Default::default()
        }
    }

    /// Enable or disable call tracing.
    pub fn traced(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }

    /// Enable or disable tree snapshots in parse errors.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose_parse_errors = verbose;
        self
    }

    /// Check if evaluation has been interrupted.
    pub fn is_interrupted(&self) -> bool {
        self.interrupt.load(Ordering::Relaxed)
    }

    /// Request interruption of evaluation.
    pub fn interrupt(&self) {
        self.interrupt.store(true, Ordering::Relaxed);
    }

    /// Reset the interrupt flag.
    pub fn reset_interrupt(&self) {
        self.interrupt.store(false, Ordering::Relaxed);
    }
}
