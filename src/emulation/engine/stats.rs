//! Execution statistics.

use std::fmt;

/// Counters collected by the [`Interpreter`](crate::emulation::Interpreter).
///
/// Counters accumulate across every invocation on the same interpreter; use
/// [`ExecutionStats::reset`] to start over.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutionStats {
    /// Instructions executed.
    pub instructions: u64,
    /// Frames pushed for interpreted or native methods.
    pub calls: u64,
    /// Invocations that ran a native implementation.
    pub native_calls: u64,
    /// Heap allocations, including lazily materialized array elements.
    pub allocations: u64,
    /// Deepest call depth reached.
    pub max_depth: usize,
}

impl ExecutionStats {
    /// Creates zeroed statistics.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears all counters.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub(crate) fn record_instruction(&mut self) {
        self.instructions += 1;
    }

    pub(crate) fn record_call(&mut self, depth: usize) {
        self.calls += 1;
        self.max_depth = self.max_depth.max(depth);
    }

    pub(crate) fn record_native_call(&mut self) {
        self.native_calls += 1;
    }

    pub(crate) fn record_allocation(&mut self) {
        self.allocations += 1;
    }
}

impl fmt::Display for ExecutionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} instructions, {} calls ({} native), {} allocations, max depth {}",
            self.instructions, self.calls, self.native_calls, self.allocations, self.max_depth
        )
    }
}
