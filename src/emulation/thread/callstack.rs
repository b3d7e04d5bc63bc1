//! The call stack and its push / unwind discipline.
//!
//! Every invocation, native or interpreted, follows the same sequence: [`CallStack::push`] a
//! frame, execute the method in it, then [`CallStack::unwind`] exactly that frame. Unwinding
//! moves the single return value (if the method has one) onto the caller's evaluation stack,
//! which is how results cross frame boundaries.
//!
//! The depth bound is enforced by `push` before a frame is created, so a runaway recursion
//! fails deterministically instead of exhausting the host stack. Host entry frames created with
//! [`CallStack::push_entry`] do not count towards the bound.

use crate::{
    emulation::{EmValue, EmulationError, StackFrame},
    metadata::DomainMethodRc,
    Result,
};

/// Bounded LIFO sequence of [`StackFrame`]s.
#[derive(Clone, Debug)]
pub struct CallStack {
    frames: Vec<StackFrame>,
    entry_frames: usize,
    max_depth: usize,
}

impl CallStack {
    /// Creates an empty call stack admitting at most `max_depth` method frames.
    #[must_use]
    pub fn new(max_depth: usize) -> Self {
        CallStack {
            frames: Vec::new(),
            entry_frames: 0,
            max_depth,
        }
    }

    /// Pushes a frame for `method`.
    ///
    /// The caller context is taken from the current top frame.
    ///
    /// # Errors
    ///
    /// Returns [`EmulationError::StackDepthExceeded`] if the stack already holds the maximum
    /// number of method frames. Nothing is pushed in that case.
    pub fn push(&mut self, method: DomainMethodRc, arguments: Vec<EmValue>) -> Result<()> {
        let depth = self.depth();
        if depth >= self.max_depth {
            return Err(EmulationError::StackDepthExceeded {
                depth: depth + 1,
                limit: self.max_depth,
            }
            .into());
        }

        let caller = self.frames.last().and_then(|frame| frame.method().cloned());
        self.frames.push(StackFrame::new(caller, method, arguments));
        Ok(())
    }

    /// Pushes a host entry frame that receives the return value of the next outermost call.
    pub fn push_entry(&mut self) {
        self.frames.push(StackFrame::entry());
        self.entry_frames += 1;
    }

    /// Pops the top frame and propagates its return value.
    ///
    /// If the frame's method returns a value, that value is popped from the frame and pushed
    /// onto the new top frame. A method frame must leave nothing else behind.
    ///
    /// # Returns
    ///
    /// The propagated return value, if any.
    ///
    /// # Errors
    ///
    /// - [`EmulationError::NoActiveFrame`] if the stack is empty
    /// - [`EmulationError::InconsistentReturn`] if a non-void method left no value, or any
    ///   method left extra values; the frame is discarded regardless
    pub fn unwind(&mut self) -> Result<Option<EmValue>> {
        let mut frame = self.discard().ok_or(EmulationError::NoActiveFrame)?;
        let Some(method) = frame.method().cloned() else {
            return Ok(None);
        };

        let value = if method.returns_value() {
            Some(
                frame
                    .pop()
                    .map_err(|_| inconsistent(&method, "returned without a value"))?,
            )
        } else {
            None
        };
        if !frame.stack().is_empty() {
            return Err(inconsistent(
                &method,
                &format!("left {} values on its stack", frame.stack().depth()),
            ));
        }

        if let (Some(value), Some(caller)) = (&value, self.frames.last_mut()) {
            caller.push(value.clone());
        }
        Ok(value)
    }

    /// Pops the top frame without propagating anything.
    ///
    /// Used on the failure path, where the frame's state is abandoned.
    pub fn discard(&mut self) -> Option<StackFrame> {
        let frame = self.frames.pop()?;
        if frame.is_entry() {
            self.entry_frames -= 1;
        }
        Some(frame)
    }

    /// Discards frames until at most `len` remain.
    pub fn truncate(&mut self, len: usize) {
        while self.frames.len() > len {
            self.discard();
        }
    }

    /// The current frame.
    ///
    /// # Errors
    ///
    /// Returns [`EmulationError::NoActiveFrame`] if the stack is empty.
    pub fn current(&self) -> Result<&StackFrame> {
        self.frames
            .last()
            .ok_or_else(|| EmulationError::NoActiveFrame.into())
    }

    /// The current frame, mutably.
    ///
    /// # Errors
    ///
    /// Returns [`EmulationError::NoActiveFrame`] if the stack is empty.
    pub fn current_mut(&mut self) -> Result<&mut StackFrame> {
        self.frames
            .last_mut()
            .ok_or_else(|| EmulationError::NoActiveFrame.into())
    }

    /// Number of method frames, which is what the depth bound applies to.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.frames.len() - self.entry_frames
    }

    /// Number of frames, including host entry frames.
    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Returns `true` if no frame is active.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// The depth bound.
    #[must_use]
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// The frames, bottom first.
    #[must_use]
    pub fn frames(&self) -> &[StackFrame] {
        &self.frames
    }
}

fn inconsistent(method: &DomainMethodRc, detail: &str) -> crate::Error {
    EmulationError::InconsistentReturn {
        method: format!("{} {detail}", method.fullname()),
    }
    .into()
}
