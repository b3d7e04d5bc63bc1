//! Virtual dispatch resolution.

use rustc_hash::FxHashMap;

use crate::{
    emulation::EmulationError,
    metadata::{Catalog, DomainMethodRc, DomainTypeRc, TypeRef},
    Result,
};

/// Resolves a statically declared virtual method against a receiver's runtime type.
///
/// Resolution is by method name only (see [`Catalog::find_override`]). Results are memoized
/// per runtime type and method name; the catalog is immutable once execution starts, so a
/// cached entry never goes stale.
#[derive(Debug, Default)]
pub struct VirtualDispatch {
    cache: FxHashMap<(TypeRef, String), DomainMethodRc>,
}

impl VirtualDispatch {
    /// Creates a resolver with an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the method a virtual call to `declared` reaches on `runtime_type`.
    ///
    /// # Errors
    ///
    /// Returns a resolution failure if `runtime_type` neither defines nor inherits a
    /// non-abstract method of that name.
    pub fn resolve(
        &mut self,
        catalog: &Catalog,
        declared: &DomainMethodRc,
        runtime_type: &DomainTypeRc,
    ) -> Result<DomainMethodRc> {
        let key = (runtime_type.type_ref().clone(), declared.name().to_string());
        if let Some(method) = self.cache.get(&key) {
            return Ok(method.clone());
        }

        let method = catalog
            .find_override(runtime_type, declared.name())?
            .ok_or_else(|| {
                EmulationError::unresolved(
                    "virtual override",
                    format!("{} on {}", declared.method_ref(), runtime_type.type_ref()),
                )
            })?;
        self.cache.insert(key, method.clone());
        Ok(method)
    }

    /// Number of memoized resolutions.
    #[must_use]
    pub fn cached(&self) -> usize {
        self.cache.len()
    }
}
