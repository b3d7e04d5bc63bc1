//! Type definitions of the catalog.
//!
//! # Key Components
//!
//! - [`DomainType`] - A registered type with its fields and methods
//! - [`DomainTypeBuilder`] - Describes a type before registration
//! - [`DomainField`] - An instance field
//! - [`CilFlavor`] - Storage category deciding inline versus handle representation

mod flavor;
mod types;

pub use flavor::CilFlavor;
pub use types::{DomainField, DomainType, DomainTypeBuilder, DomainTypeRc};
