//! `System.Object`.

use crate::{
    emulation::NativeMethod,
    metadata::{Catalog, CilFlavor, DomainMethod, DomainType, MethodRef, TypeRef},
    Result,
};

/// Registers `System.Object` and its parameterless constructor.
///
/// The constructor does nothing; derived constructors may chain to it with `call`.
///
/// # Errors
///
/// Fails if `System.Object` is already registered.
pub fn register(catalog: &Catalog) -> Result<()> {
    catalog.natives().register(
        MethodRef::constructor(TypeRef::object(), 0),
        NativeMethod::new("System.Object::.ctor", |_, _| Ok(None)),
    );

    catalog.register(
        DomainType::builder(TypeRef::object())
            .flavor(CilFlavor::Object)
            .method(DomainMethod::constructor()),
    )?;
    Ok(())
}
