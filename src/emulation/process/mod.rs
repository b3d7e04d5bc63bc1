//! The host-facing process model.
//!
//! An [`EmulationProcess`] is one simulated execution: its own heap and call stack on top of a
//! shared [`Catalog`](crate::metadata::Catalog). It is the entry point for running methods
//! from the host, configured through [`EmulationConfig`].
//!
//! # Key Components
//!
//! - [`EmulationProcess`] - Resolves a method, runs it and hands back the result
//! - [`EmulationConfig`] - Limits and tracing, with presets
//! - [`EmulationLimits`] - The call depth bound
//! - [`TracingConfig`] - Which events are logged
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use minclr::{
//!     emulation::{EmValue, EmulationConfig, EmulationProcess},
//!     metadata::{Catalog, MethodRef, TypeRef},
//! };
//!
//! # fn main() -> minclr::Result<()> {
//! let catalog = Arc::new(Catalog::with_corelib()?);
//! let mut process = EmulationProcess::new(catalog, EmulationConfig::debug());
//!
//! let left = process.alloc_string("mini")?;
//! let right = process.alloc_string("clr")?;
//! let concat = MethodRef::new(TypeRef::string(), "Concat", 2);
//! let joined = process.invoke(&concat, vec![left, right])?;
//!
//! assert_eq!(&*process.read_string(&joined.unwrap_or(EmValue::Null))?, "miniclr");
//! # Ok(())
//! # }
//! ```

mod config;
mod execution;

pub use config::{EmulationConfig, EmulationLimits, TracingConfig, DEFAULT_MAX_CALL_DEPTH};
pub use execution::EmulationProcess;
