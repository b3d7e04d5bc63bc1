//! Outcome of executing a single instruction.

/// What the dispatch loop does after an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepResult {
    /// Advance to the next instruction.
    Continue,
    /// Jump to the instruction at the given byte offset.
    Branch {
        /// Target offset, resolved to an index through the stream's offset map.
        target: u64,
    },
    /// Leave the dispatch loop; the frame is unwound by the caller.
    Return,
}
