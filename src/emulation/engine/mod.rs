//! CIL instruction interpreter and execution engine.
//!
//! This module provides the dispatch engine for executing method bodies. It implements
//! instruction routing, the call protocol and virtual dispatch on top of the memory model in
//! [`crate::emulation`].
//!
//! # Architecture
//!
//! The engine module is organized into several sub-modules:
//!
//! - `dispatch` - Virtual call resolution with a per-execution cache
//! - `error` - Emulation error types and their classification
//! - `interpreter` - Instruction dispatch and the call protocol
//! - `result` - Outcome of a single instruction
//! - `stats` - Execution counters
//!
//! # Key Components
//!
//! - [`Interpreter`] - Executes methods and single instructions
//! - [`VirtualDispatch`] - Finds the implementation a `callvirt` reaches
//! - [`StepResult`] - What the dispatch loop does after an instruction
//! - [`EmulationError`] / [`ErrorKind`] - Fatal failures and their coarse categories
//! - [`ExecutionStats`] - Instruction, call and allocation counts

mod dispatch;
mod error;
mod interpreter;
mod result;
mod stats;

pub use dispatch::VirtualDispatch;
pub use error::{EmulationError, ErrorKind};
pub use interpreter::Interpreter;
pub use result::StepResult;
pub use stats::ExecutionStats;
