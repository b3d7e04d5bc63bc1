//! CIL execution engine.
//!
//! This module provides a controlled execution environment for pre-decoded CIL method bodies.
//! It reproduces the observable behavior of a managed runtime for a small instruction subset:
//! object allocation, field and array access, argument and local handling, static, instance
//! and virtual dispatch, and structured control flow.
//!
//! # Architecture
//!
//! The engine is organized into several sub-modules:
//!
//! - Runtime value representation and the arithmetic on it
//! - Memory model: evaluation stack, local variables and the managed heap
//! - Frames and the bounded call stack
//! - The dispatch engine and virtual call resolution
//! - Native methods and the built-in runtime library
//! - The process façade hosts use to run methods
//!
//! # Key Components
//!
//! ## Process Model
//! - [`crate::emulation::EmulationProcess`] - Runs methods and keeps the heap between calls
//! - [`crate::emulation::EmulationConfig`] - Limits and tracing switches
//!
//! ## Value System
//! - [`crate::emulation::EmValue`] - Tagged runtime value
//! - [`crate::emulation::HeapRef`] - Handle to a heap object
//!
//! ## Memory Model
//! - [`crate::emulation::EvaluationStack`] - Per-frame operand stack
//! - [`crate::emulation::LocalVariables`] - Typed local variable slots
//! - [`crate::emulation::ManagedHeap`] - Handle-indexed object store
//!
//! ## Call Stack
//! - [`crate::emulation::StackFrame`] - One activation record
//! - [`crate::emulation::CallStack`] - Bounded sequence of frames with push / unwind discipline
//!
//! ## Execution Engine
//! - [`crate::emulation::Interpreter`] - Instruction dispatch and the call protocol
//! - [`crate::emulation::VirtualDispatch`] - `callvirt` target resolution
//! - [`crate::emulation::EmulationError`] - Fatal execution failures
//!
//! ## Runtime Library
//! - [`crate::emulation::NativeMethod`] - Host implementation of a built-in method
//! - [`crate::emulation::NativeRegistry`] - Native implementations available to a catalog
//!
//! # Usage Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use minclr::{
//!     emulation::{EmulationConfig, EmulationProcess},
//!     metadata::{Catalog, MethodRef, TypeRef},
//! };
//!
//! # fn main() -> minclr::Result<()> {
//! let catalog = Arc::new(Catalog::with_corelib()?);
//! let mut process = EmulationProcess::new(catalog, EmulationConfig::default());
//!
//! let left = process.alloc_string("mini")?;
//! let right = process.alloc_string("clr")?;
//! let concat = MethodRef::new(TypeRef::string(), "Concat", 2);
//! if let Some(joined) = process.invoke(&concat, vec![left, right])? {
//!     assert_eq!(&*process.read_string(&joined)?, "miniclr");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Execution Limits
//!
//! The only resource bound is the call depth (25 nested method frames by default). It is
//! checked before every frame push, so runaway recursion fails with a stack-depth error
//! instead of exhausting the host stack.
//!
//! # Thread Safety
//!
//! An [`EmulationProcess`] owns its heap and call stack and is meant for single-threaded use.
//! The [`crate::metadata::Catalog`] it executes against is shared through an `Arc`, so several
//! processes on different threads may run against the same catalog.

mod engine;
mod memory;
mod process;
pub mod runtime;
mod thread;
mod value;

// Re-export primary types from value module
pub use value::{BinaryOp, CompareOp, ConversionType, EmValue, HeapRef};

// Re-export primary types from memory module
pub use memory::{
    ArrayStorage, EvaluationStack, HeapObject, LocalVariables, ManagedHeap, MAX_ARRAY_LENGTH,
};

// Re-export primary types from thread module
pub use thread::{CallStack, StackFrame};

// Re-export primary types from engine module
pub use engine::{
    EmulationError, ErrorKind, ExecutionStats, Interpreter, StepResult, VirtualDispatch,
};

// Re-export primary types from runtime module
pub use runtime::{NativeContext, NativeFn, NativeMethod, NativeRegistry};

// Re-export primary types from process module
pub use process::{
    EmulationConfig, EmulationLimits, EmulationProcess, TracingConfig, DEFAULT_MAX_CALL_DEPTH,
};
