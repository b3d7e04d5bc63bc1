//! Primitive value types.

use crate::{
    metadata::{Catalog, CilFlavor, DomainType, TypeRef},
    Result,
};

/// Corelib primitive types and their storage flavors.
pub const PRIMITIVES: &[(&str, CilFlavor)] = &[
    ("System.Boolean", CilFlavor::Boolean),
    ("System.Char", CilFlavor::Char),
    ("System.SByte", CilFlavor::I1),
    ("System.Byte", CilFlavor::U1),
    ("System.Int16", CilFlavor::I2),
    ("System.UInt16", CilFlavor::U2),
    ("System.Int32", CilFlavor::I4),
    ("System.UInt32", CilFlavor::U4),
    ("System.Int64", CilFlavor::I8),
    ("System.UInt64", CilFlavor::U8),
    ("System.Single", CilFlavor::R4),
    ("System.Double", CilFlavor::R8),
];

/// Registers every entry of [`PRIMITIVES`].
///
/// # Errors
///
/// Fails if one of the types is already registered.
pub fn register(catalog: &Catalog) -> Result<()> {
    for (name, flavor) in PRIMITIVES {
        catalog.register(DomainType::builder(TypeRef::corelib(*name)).flavor(*flavor))?;
    }
    Ok(())
}
