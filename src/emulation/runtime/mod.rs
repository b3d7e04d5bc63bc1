//! Native methods and the built-in runtime library.
//!
//! [`NativeRegistry`] maps method references to host routines. The catalog consults it when a
//! type declaring body-less methods is registered, so the choice between interpreting and
//! calling natively is made once per method. [`register_corelib`] installs the small runtime
//! library every catalog built with [`Catalog::with_corelib`](crate::metadata::Catalog::with_corelib)
//! starts with.

mod bcl;
mod native;

pub use bcl::{register_corelib, PRIMITIVES};
pub use native::{NativeContext, NativeFn, NativeMethod, NativeRegistry};
