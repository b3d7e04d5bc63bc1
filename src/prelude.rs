//! # minclr Prelude
//!
//! This module provides a convenient prelude for the most commonly used types from the
//! minclr library. Import this module to get quick access to everything needed to describe
//! types, assemble method bodies and run them.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all minclr operations
pub use crate::Error;

/// The result type used throughout minclr
pub use crate::Result;

// ================================================================================================
// Catalog and References
// ================================================================================================

/// The registry of known types
pub use crate::metadata::Catalog;

/// Symbolic references carried by instructions
pub use crate::metadata::{FieldRef, MethodRef, TypeRef};

/// Registered entities and their builders
pub use crate::metadata::{CilFlavor, DomainMethod, DomainType};

// ================================================================================================
// Method Bodies
// ================================================================================================

/// Building and holding instruction streams
pub use crate::assembly::{FlowType, Instruction, InstructionAssembler, InstructionStream, Operand};

// ================================================================================================
// Execution
// ================================================================================================

/// Runtime values
pub use crate::emulation::{EmValue, HeapRef};

/// Running methods
pub use crate::emulation::{EmulationConfig, EmulationLimits, EmulationProcess};

/// Failure classification
pub use crate::emulation::{EmulationError, ErrorKind};

/// Host implementations of built-in methods
pub use crate::emulation::{NativeContext, NativeMethod};
