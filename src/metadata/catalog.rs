//! The closed catalog of known types.
//!
//! [`Catalog`] is the engine's only source of type information. It is populated up front, by
//! registering [`DomainTypeBuilder`]s, and afterwards answers the lookups instructions need:
//! resolving type, method, constructor and field references, walking base-type chains for type
//! tests and computing the instance layout of a type.
//!
//! # Registration Rules
//!
//! - A type's identity (`module`, `name`) may be registered once
//! - A base type must be registered before any type deriving from it, which keeps every
//!   hierarchy acyclic
//! - Methods declared without instructions are built-ins and are bound to their native
//!   implementation from [`Catalog::natives`] during registration; registration fails if none
//!   exists
//!
//! # Thread Safety
//!
//! The catalog uses a concurrent map, so registration and lookups take `&self` and a catalog
//! can be shared through an `Arc` by several independent executions.

use std::sync::Arc;

use dashmap::DashMap;
use rustc_hash::FxHashSet;

use crate::{
    emulation::{EmulationError, NativeRegistry},
    metadata::{
        CilFlavor, DomainField, DomainMethodRc, DomainType, DomainTypeBuilder, DomainTypeRc,
        FieldRef, MethodRef, TypeRef,
    },
    Error, Result,
};

/// Registry of all types, methods and fields the engine may reference.
///
/// # Examples
///
/// ```rust,no_run
/// use minclr::metadata::{Catalog, DomainType, MethodRef, TypeRef};
///
/// let catalog = Catalog::with_corelib()?;
/// let point = TypeRef::new("App", "App.Point");
/// catalog.register(
///     DomainType::builder(point.clone())
///         .field("x", TypeRef::corelib("System.Int32"))
///         .default_constructor(),
/// )?;
///
/// let ctor = catalog.resolve_constructor(&MethodRef::constructor(point, 0))?;
/// assert!(ctor.is_constructor());
/// # Ok::<(), minclr::Error>(())
/// ```
#[derive(Default)]
pub struct Catalog {
    types: DashMap<TypeRef, DomainTypeRc>,
    natives: NativeRegistry,
}

impl Catalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a catalog holding the built-in runtime library.
    ///
    /// See [`crate::emulation::runtime`] for the registered types.
    ///
    /// # Errors
    ///
    /// Fails only if the runtime library definitions are inconsistent.
    pub fn with_corelib() -> Result<Self> {
        let catalog = Self::new();
        crate::emulation::runtime::register_corelib(&catalog)?;
        Ok(catalog)
    }

    /// The native implementations available to built-in methods.
    ///
    /// Implementations must be registered before the types declaring the built-ins.
    #[must_use]
    pub fn natives(&self) -> &NativeRegistry {
        &self.natives
    }

    /// Registers a type.
    ///
    /// # Arguments
    ///
    /// * `builder` - The type description
    ///
    /// # Errors
    ///
    /// - [`Error::Malformed`] if the type is already registered or declares duplicate fields or
    ///   methods (same name and parameter count)
    /// - [`Error::Emulation`] with a resolution failure if the base type is unknown
    /// - [`Error::NotSupported`] if a built-in method has no native implementation
    pub fn register(&self, builder: DomainTypeBuilder) -> Result<DomainTypeRc> {
        let DomainTypeBuilder {
            type_ref,
            flavor,
            base,
            fields,
            methods,
        } = builder;

        if self.types.contains_key(&type_ref) {
            return Err(malformed_error!("Type {} is already registered", type_ref));
        }
        if let Some(base) = &base {
            self.resolve_type(base)?;
        }

        let mut field_names = FxHashSet::default();
        for field in &fields {
            if !field_names.insert(field.name.as_str()) {
                return Err(malformed_error!(
                    "Field {} declared twice on {}",
                    field.name,
                    type_ref
                ));
            }
        }

        let mut signatures = FxHashSet::default();
        let mut built = Vec::with_capacity(methods.len());
        for method in methods {
            let mut method = method.build(&type_ref);
            if !signatures.insert((method.name().to_string(), method.param_count())) {
                return Err(malformed_error!(
                    "Method {} declared twice on {}",
                    method.method_ref(),
                    type_ref
                ));
            }

            if method.is_unbound() {
                let method_ref = method.method_ref();
                let Some(native) = self.natives.get(&method_ref) else {
                    return Err(Error::NotSupported(format!(
                        "built-in method {method_ref} has no native implementation"
                    )));
                };
                method.bind_native(native);
            }
            built.push(Arc::new(method));
        }

        let ty = Arc::new(DomainType::from_parts(
            type_ref.clone(),
            flavor,
            base,
            fields,
            built,
        ));
        self.types.insert(type_ref, ty.clone());
        Ok(ty)
    }

    /// Looks up a type without failing.
    #[must_use]
    pub fn get(&self, type_ref: &TypeRef) -> Option<DomainTypeRc> {
        self.types.get(type_ref).map(|entry| entry.value().clone())
    }

    /// Returns `true` if the type is registered.
    #[must_use]
    pub fn contains(&self, type_ref: &TypeRef) -> bool {
        self.types.contains_key(type_ref)
    }

    /// Number of registered types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Returns `true` if no types are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Resolves a type reference.
    ///
    /// # Errors
    ///
    /// Returns a resolution failure if the type is unknown.
    pub fn resolve_type(&self, type_ref: &TypeRef) -> Result<DomainTypeRc> {
        self.get(type_ref)
            .ok_or_else(|| EmulationError::unresolved("type", type_ref).into())
    }

    /// Resolves a method reference.
    ///
    /// The method is searched on the referenced type first and then up its base-type chain,
    /// so a method inherited from a base type can be referenced through a derived type.
    ///
    /// # Errors
    ///
    /// Returns a resolution failure if the type or method is unknown.
    pub fn resolve_method(&self, method_ref: &MethodRef) -> Result<DomainMethodRc> {
        let mut current = Some(self.resolve_type(&method_ref.declaring_type)?);
        while let Some(ty) = current {
            if let Some(method) = ty.find_method(&method_ref.name, method_ref.param_count) {
                return Ok(method);
            }
            current = self.base_of(&ty)?;
        }

        Err(EmulationError::unresolved("method", method_ref).into())
    }

    /// Resolves a constructor reference.
    ///
    /// Constructors are not inherited: only the referenced type itself is searched.
    ///
    /// # Errors
    ///
    /// Returns a resolution failure if the type is unknown or has no matching constructor.
    pub fn resolve_constructor(&self, ctor_ref: &MethodRef) -> Result<DomainMethodRc> {
        let ty = self.resolve_type(&ctor_ref.declaring_type)?;
        ty.find_method(&ctor_ref.name, ctor_ref.param_count)
            .filter(|method| method.is_constructor())
            .ok_or_else(|| EmulationError::unresolved("constructor", ctor_ref).into())
    }

    /// Resolves a field reference, searching the base-type chain.
    ///
    /// # Errors
    ///
    /// Returns a resolution failure if the type or field is unknown.
    pub fn resolve_field(&self, field_ref: &FieldRef) -> Result<DomainField> {
        let mut current = Some(self.resolve_type(&field_ref.declaring_type)?);
        while let Some(ty) = current {
            if let Some(field) = ty.field(&field_ref.name) {
                return Ok(field.clone());
            }
            current = self.base_of(&ty)?;
        }

        Err(EmulationError::unresolved("field", field_ref).into())
    }

    /// Finds the implementation a virtual call named `name` reaches on `runtime_type`.
    ///
    /// Matching is by name only, starting at `runtime_type` and walking up its base-type chain;
    /// abstract declarations are skipped. This relies on a hierarchy never mixing virtual and
    /// non-virtual methods of the same name.
    ///
    /// # Returns
    ///
    /// The most-derived non-abstract method with that name, or `None`.
    ///
    /// # Errors
    ///
    /// Returns a resolution failure if a base type in the chain is unknown.
    pub fn find_override(
        &self,
        runtime_type: &DomainTypeRc,
        name: &str,
    ) -> Result<Option<DomainMethodRc>> {
        let mut current = Some(runtime_type.clone());
        while let Some(ty) = current {
            let found = ty
                .methods()
                .iter()
                .find(|method| method.name() == name && !method.is_abstract());
            if let Some(method) = found {
                return Ok(Some(method.clone()));
            }
            current = self.base_of(&ty)?;
        }
        Ok(None)
    }

    /// Returns the flavor of a referenced type.
    ///
    /// # Errors
    ///
    /// Returns a resolution failure if the type is unknown.
    pub fn flavor_of(&self, type_ref: &TypeRef) -> Result<CilFlavor> {
        Ok(self.resolve_type(type_ref)?.flavor())
    }

    /// Checks whether `ty` is `target` or derives from it.
    ///
    /// # Errors
    ///
    /// Returns a resolution failure if a base type in the chain is unknown.
    pub fn is_assignable_to(&self, ty: &DomainTypeRc, target: &TypeRef) -> Result<bool> {
        let mut current = Some(ty.clone());
        while let Some(ty) = current {
            if ty.type_ref() == target {
                return Ok(true);
            }
            current = self.base_of(&ty)?;
        }
        Ok(false)
    }

    /// Computes the instance fields of `ty`, including inherited ones, base fields first.
    ///
    /// # Returns
    ///
    /// Field names paired with the flavor of their declared type. A field redeclared by a
    /// derived type shadows the inherited one.
    ///
    /// # Errors
    ///
    /// Returns a resolution failure if a base type or field type is unknown.
    pub fn instance_fields(&self, ty: &DomainTypeRc) -> Result<Vec<(String, CilFlavor)>> {
        let mut chain = Vec::new();
        let mut current = Some(ty.clone());
        while let Some(ty) = current {
            current = self.base_of(&ty)?;
            chain.push(ty);
        }

        let mut layout: Vec<(String, CilFlavor)> = Vec::new();
        for ty in chain.iter().rev() {
            for field in ty.fields() {
                let flavor = self.flavor_of(&field.field_type)?;
                match layout.iter_mut().find(|(name, _)| *name == field.name) {
                    Some(slot) => slot.1 = flavor,
                    None => layout.push((field.name.clone(), flavor)),
                }
            }
        }
        Ok(layout)
    }

    fn base_of(&self, ty: &DomainType) -> Result<Option<DomainTypeRc>> {
        ty.base().map(|base| self.resolve_type(base)).transpose()
    }
}
