//! Catalog entities and the references that name them.
//!
//! # Key Components
//!
//! - [`Catalog`] - The closed registry resolving references to entities
//! - [`TypeRef`], [`MethodRef`], [`FieldRef`] - Symbolic references carried by instructions
//! - [`DomainType`], [`DomainMethod`], [`DomainField`] - Registered entities
//! - [`MethodBody`] - Interpreted, native or abstract implementation of a method
//! - [`CilFlavor`] - Storage category of a type

mod catalog;
mod method;
mod reference;
pub mod typesystem;

pub use catalog::Catalog;
pub use method::{DomainMethod, DomainMethodRc, MethodBody, MethodBuilder, MethodModifiers};
pub use reference::{
    FieldRef, MethodRef, TypeRef, CONSTRUCTOR_NAME, CORELIB, OBJECT_TYPE, STRING_TYPE,
    STRING_VALUE_FIELD,
};
pub use typesystem::{
    CilFlavor, DomainField, DomainType, DomainTypeBuilder, DomainTypeRc,
};
