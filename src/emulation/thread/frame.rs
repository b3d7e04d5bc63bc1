//! Stack frames.

use std::fmt;

use crate::{
    emulation::{EmValue, EmulationError, EvaluationStack, LocalVariables},
    metadata::DomainMethodRc,
    Result,
};

/// The execution context of one active invocation.
///
/// A frame holds the positional arguments (for instance methods argument 0 is the receiver),
/// the zero-initialized local slots declared by the method and a private evaluation stack.
///
/// The frame at the bottom of a [`CallStack`](crate::emulation::CallStack) may be a host entry
/// frame without a method; it only receives the return value of the outermost call.
#[derive(Clone)]
pub struct StackFrame {
    caller: Option<DomainMethodRc>,
    method: Option<DomainMethodRc>,
    arguments: Vec<EmValue>,
    locals: LocalVariables,
    stack: EvaluationStack,
}

impl StackFrame {
    /// Creates a frame for `method`.
    #[must_use]
    pub fn new(
        caller: Option<DomainMethodRc>,
        method: DomainMethodRc,
        arguments: Vec<EmValue>,
    ) -> Self {
        let locals = LocalVariables::new(method.locals());
        StackFrame {
            caller,
            method: Some(method),
            arguments,
            locals,
            stack: EvaluationStack::new(),
        }
    }

    /// Creates a host entry frame.
    #[must_use]
    pub fn entry() -> Self {
        StackFrame {
            caller: None,
            method: None,
            arguments: Vec::new(),
            locals: LocalVariables::default(),
            stack: EvaluationStack::new(),
        }
    }

    /// The method executing in this frame; `None` for the host entry frame.
    #[must_use]
    pub fn method(&self) -> Option<&DomainMethodRc> {
        self.method.as_ref()
    }

    /// The method executing in the frame below, if any.
    #[must_use]
    pub fn caller(&self) -> Option<&DomainMethodRc> {
        self.caller.as_ref()
    }

    /// Returns `true` for the host entry frame.
    #[must_use]
    pub fn is_entry(&self) -> bool {
        self.method.is_none()
    }

    /// All arguments, receiver first for instance methods.
    #[must_use]
    pub fn arguments(&self) -> &[EmValue] {
        &self.arguments
    }

    /// Reads an argument slot.
    ///
    /// # Errors
    ///
    /// Returns [`EmulationError::ArgumentIndexOutOfBounds`] for an unknown slot.
    pub fn argument(&self, index: usize) -> Result<&EmValue> {
        self.arguments.get(index).ok_or_else(|| {
            EmulationError::ArgumentIndexOutOfBounds {
                index,
                count: self.arguments.len(),
            }
            .into()
        })
    }

    /// The local variable slots.
    #[must_use]
    pub fn locals(&self) -> &LocalVariables {
        &self.locals
    }

    /// The local variable slots, mutably.
    pub fn locals_mut(&mut self) -> &mut LocalVariables {
        &mut self.locals
    }

    /// The evaluation stack.
    #[must_use]
    pub fn stack(&self) -> &EvaluationStack {
        &self.stack
    }

    /// The evaluation stack, mutably.
    pub fn stack_mut(&mut self) -> &mut EvaluationStack {
        &mut self.stack
    }

    /// Pushes onto the evaluation stack.
    pub fn push(&mut self, value: EmValue) {
        self.stack.push(value);
    }

    /// Pops from the evaluation stack.
    ///
    /// # Errors
    ///
    /// Returns [`EmulationError::StackUnderflow`] if the stack is empty.
    pub fn pop(&mut self) -> Result<EmValue> {
        self.stack.pop()
    }

    /// A short label for traces and errors.
    #[must_use]
    pub fn label(&self) -> String {
        self.method
            .as_ref()
            .map_or_else(|| "<entry>".to_string(), |method| method.fullname())
    }
}

impl fmt::Debug for StackFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StackFrame")
            .field("method", &self.label())
            .field("arguments", &self.arguments)
            .field("locals", &self.locals)
            .field("stack", &self.stack)
            .finish()
    }
}
