//! The built-in runtime library.
//!
//! Registration order matters: `System.Object` must exist before anything deriving from it,
//! and each native implementation is registered before the type declaring it.

mod object;
mod primitives;
mod string;

pub use primitives::PRIMITIVES;

use crate::{metadata::Catalog, Result};

/// Registers `System.Object`, `System.String` and the primitive value types into `catalog`.
///
/// # Errors
///
/// Fails if any of these types is already registered.
pub fn register_corelib(catalog: &Catalog) -> Result<()> {
    object::register(catalog)?;
    string::register(catalog)?;
    primitives::register(catalog)?;
    log::debug!("registered {} corelib types", catalog.len());
    Ok(())
}
