// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![allow(dead_code)]

//! # minclr
//!
//! A miniature CIL execution engine. `minclr` interprets pre-decoded, stack-machine method
//! bodies against a simulated managed heap and call stack, reproducing the observable results
//! a real runtime would produce for the supported instruction subset: object allocation,
//! field and array access, argument and local handling, static/instance/virtual dispatch and
//! structured control flow.
//!
//! ## Architecture
//!
//! The crate is organized bottom-up:
//!
//! - [`assembly`] - Decoded instructions, the per-body [`assembly::InstructionStream`] with its
//!   offset lookup, and the [`assembly::InstructionAssembler`] for building bodies by hand
//! - [`metadata`] - The closed [`metadata::Catalog`] of types, fields and methods, and the
//!   symbolic references instructions carry
//! - [`emulation`] - Values, the heap, frames and the call stack, the dispatch engine and the
//!   built-in runtime library
//!
//! ## Execution Model
//!
//! Every invocation follows the same discipline: a frame is pushed, the method is executed
//! (natively for built-ins, by walking its instruction stream otherwise) and exactly one frame
//! is unwound, moving the return value (if any) onto the caller's operand stack. Calls recurse
//! into the dispatch engine, so the host call stack mirrors the emulated one; the emulated depth
//! is bounded by [`emulation::EmulationLimits::max_call_depth`] and checked before every push.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use minclr::prelude::*;
//!
//! # fn main() -> minclr::Result<()> {
//! let catalog = Arc::new(Catalog::with_corelib()?);
//!
//! let mut asm = InstructionAssembler::new();
//! asm.ldc_i4(2)?.ldc_i4(3)?.emit("add")?.emit("ret")?;
//!
//! let program = TypeRef::new("Demo", "Demo.Program");
//! catalog.register(
//!     DomainType::builder(program.clone()).method(
//!         DomainMethod::builder("Five")
//!             .as_static()
//!             .returns(TypeRef::corelib("System.Int32"))
//!             .body(asm.finish()?),
//!     ),
//! )?;
//!
//! let mut process = EmulationProcess::new(catalog, EmulationConfig::default());
//! let result = process.invoke(&MethodRef::new(program, "Five", 0), vec![])?;
//! assert_eq!(result, Some(EmValue::I32(5)));
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! All fallible operations return [`Result`]. Failures raised while executing are reported as
//! [`Error::Emulation`] carrying an [`emulation::EmulationError`]; use
//! [`emulation::EmulationError::kind`] to classify them and the wrapping
//! [`emulation::EmulationError::InstructionFault`] to find the method, offset and mnemonic that
//! triggered them. Every failure is fatal: execution is aborted, all nested frames are
//! discarded and the call stack is restored to the depth it had before the failing invocation.

#[macro_use]
pub(crate) mod error;

/// Convenient re-exports of the most commonly used types.
///
/// # Example
///
/// ```rust,no_run
/// use minclr::prelude::*;
///
/// let catalog = Catalog::with_corelib()?;
/// assert!(catalog.contains(&TypeRef::corelib("System.String")));
/// # Ok::<(), minclr::Error>(())
/// ```
pub mod prelude;

/// Decoded CIL instructions and method body streams.
///
/// Instructions arrive pre-decoded: each carries its byte offset, its mnemonic, its flow-control
/// category and a symbolic operand. This module also provides the opcode table used to size and
/// classify instructions, and an assembler that lays out bodies with label-resolved branches.
pub mod assembly;

/// The closed catalog of types, fields and methods the engine may reference.
///
/// Types are identified by their `(module, name)` pair. Instructions refer to catalog entries
/// through [`metadata::TypeRef`], [`metadata::MethodRef`] and [`metadata::FieldRef`], which the
/// catalog resolves to the registered [`metadata::DomainType`] and [`metadata::DomainMethod`]
/// entities.
pub mod metadata;

/// The execution engine.
///
/// Contains the tagged [`emulation::EmValue`] model, the [`emulation::ManagedHeap`], frames and
/// the [`emulation::CallStack`], the [`emulation::Interpreter`] dispatch engine with its virtual
/// dispatch resolver, the native runtime library and the [`emulation::EmulationProcess`] façade.
pub mod emulation;

/// `minclr` Result type.
///
/// A type alias for `std::result::Result<T, Error>` where the error type is always [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// `minclr` Error type.
///
/// The main error type for all operations in this crate. See [`Error`] for the individual
/// failure categories.
///
/// # Examples
///
/// ```rust,no_run
/// use minclr::{emulation::ErrorKind, Error};
///
/// # fn check(result: minclr::Result<()>) {
/// match result {
///     Err(Error::Emulation(e)) if e.kind() == ErrorKind::StackDepthExceeded => {
///         println!("call chain too deep: {e}");
///     }
///     Err(e) => println!("error: {e}"),
///     Ok(()) => {}
/// }
/// # }
/// ```
pub use error::Error;
