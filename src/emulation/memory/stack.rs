//! Per-frame evaluation stack.

use crate::{
    emulation::{EmValue, EmulationError},
    Result,
};

/// The operand stack of a single frame.
///
/// Frames never share evaluation stacks; values cross frame boundaries only as call arguments
/// and as the single return value moved by
/// [`CallStack::unwind`](crate::emulation::CallStack::unwind).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EvaluationStack {
    values: Vec<EmValue>,
}

impl EvaluationStack {
    /// Creates an empty stack.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes a value.
    pub fn push(&mut self, value: EmValue) {
        self.values.push(value);
    }

    /// Pops the top value.
    ///
    /// # Errors
    ///
    /// Returns [`EmulationError::StackUnderflow`] if the stack is empty.
    pub fn pop(&mut self) -> Result<EmValue> {
        self.values
            .pop()
            .ok_or_else(|| EmulationError::StackUnderflow.into())
    }

    /// Pops `count` values and returns them in the order they were pushed.
    ///
    /// # Errors
    ///
    /// Returns [`EmulationError::StackUnderflow`] if fewer than `count` values are available;
    /// the stack is left unchanged in that case.
    pub fn pop_n(&mut self, count: usize) -> Result<Vec<EmValue>> {
        let Some(start) = self.values.len().checked_sub(count) else {
            return Err(EmulationError::StackUnderflow.into());
        };
        Ok(self.values.split_off(start))
    }

    /// Returns the top value without removing it.
    ///
    /// # Errors
    ///
    /// Returns [`EmulationError::StackUnderflow`] if the stack is empty.
    pub fn peek(&self) -> Result<&EmValue> {
        self.values
            .last()
            .ok_or_else(|| EmulationError::StackUnderflow.into())
    }

    /// Duplicates the top value.
    ///
    /// # Errors
    ///
    /// Returns [`EmulationError::StackUnderflow`] if the stack is empty.
    pub fn dup(&mut self) -> Result<()> {
        let top = self.peek()?.clone();
        self.values.push(top);
        Ok(())
    }

    /// Number of values on the stack.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if the stack holds no values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The values, bottom first.
    #[must_use]
    pub fn values(&self) -> &[EmValue] {
        &self.values
    }

    /// Removes all values.
    pub fn clear(&mut self) {
        self.values.clear();
    }
}
