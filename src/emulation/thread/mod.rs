//! Frames and the call stack of a single logical thread of execution.

mod callstack;
mod frame;

pub use callstack::CallStack;
pub use frame::StackFrame;
