use std::{fmt, sync::Arc};

use crate::{
    emulation::NativeMethod,
    metadata::{CilFlavor, DomainMethod, DomainMethodRc, MethodBuilder, TypeRef, CONSTRUCTOR_NAME},
};

/// A reference-counted pointer to a [`DomainType`].
pub type DomainTypeRc = Arc<DomainType>;

/// An instance field declared by a type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainField {
    /// Field name, unique within the declaring type
    pub name: String,
    /// Declared field type
    pub field_type: TypeRef,
}

/// A type known to the catalog.
///
/// Identity is the `(module, name)` pair of [`DomainType::type_ref`]. Types are immutable once
/// registered and shared as [`DomainTypeRc`].
pub struct DomainType {
    type_ref: TypeRef,
    flavor: CilFlavor,
    base: Option<TypeRef>,
    fields: Vec<DomainField>,
    methods: Vec<DomainMethodRc>,
}

impl DomainType {
    /// Starts building a reference type deriving from `System.Object`.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use minclr::metadata::{DomainType, TypeRef};
    ///
    /// let shape = TypeRef::new("App", "App.Shape");
    /// let circle = DomainType::builder(TypeRef::new("App", "App.Circle"))
    ///     .extends(shape)
    ///     .field("radius", TypeRef::corelib("System.Int32"));
    /// ```
    #[must_use]
    pub fn builder(type_ref: TypeRef) -> DomainTypeBuilder {
        DomainTypeBuilder::new(type_ref)
    }

    pub(crate) fn from_parts(
        type_ref: TypeRef,
        flavor: CilFlavor,
        base: Option<TypeRef>,
        fields: Vec<DomainField>,
        methods: Vec<DomainMethodRc>,
    ) -> Self {
        DomainType {
            type_ref,
            flavor,
            base,
            fields,
            methods,
        }
    }

    /// The identity of this type.
    #[must_use]
    pub fn type_ref(&self) -> &TypeRef {
        &self.type_ref
    }

    /// The owning module.
    #[must_use]
    pub fn module(&self) -> &str {
        &self.type_ref.module
    }

    /// The full type name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.type_ref.name
    }

    /// The storage flavor.
    #[must_use]
    pub fn flavor(&self) -> CilFlavor {
        self.flavor
    }

    /// Returns `true` if values of this type are held inline and copied.
    #[must_use]
    pub fn is_value_type(&self) -> bool {
        self.flavor.is_value_type()
    }

    /// The direct base type, if any.
    #[must_use]
    pub fn base(&self) -> Option<&TypeRef> {
        self.base.as_ref()
    }

    /// Instance fields declared directly on this type.
    #[must_use]
    pub fn fields(&self) -> &[DomainField] {
        &self.fields
    }

    /// Looks up a field declared directly on this type.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&DomainField> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// All methods and constructors declared directly on this type.
    #[must_use]
    pub fn methods(&self) -> &[DomainMethodRc] {
        &self.methods
    }

    /// Looks up a method declared on this type by name and parameter count.
    #[must_use]
    pub fn find_method(&self, name: &str, param_count: usize) -> Option<DomainMethodRc> {
        self.methods
            .iter()
            .find(|method| method.name() == name && method.param_count() == param_count)
            .cloned()
    }

    /// Looks up a method declared on this type by name alone.
    ///
    /// Used by virtual dispatch, which assumes a single overriding method per name and type.
    #[must_use]
    pub fn find_method_by_name(&self, name: &str) -> Option<DomainMethodRc> {
        self.methods
            .iter()
            .find(|method| method.name() == name)
            .cloned()
    }

    /// Iterates over the instance constructors.
    pub fn constructors(&self) -> impl Iterator<Item = &DomainMethodRc> {
        self.methods.iter().filter(|method| method.is_constructor())
    }
}

impl fmt::Debug for DomainType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DomainType")
            .field("type_ref", &self.type_ref)
            .field("flavor", &self.flavor)
            .field("base", &self.base)
            .field("fields", &self.fields.len())
            .field("methods", &self.methods.len())
            .finish()
    }
}

impl fmt::Display for DomainType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_ref)
    }
}

/// Builder for [`DomainType`], consumed by [`crate::metadata::Catalog::register`].
#[derive(Debug, Clone)]
pub struct DomainTypeBuilder {
    pub(crate) type_ref: TypeRef,
    pub(crate) flavor: CilFlavor,
    pub(crate) base: Option<TypeRef>,
    pub(crate) fields: Vec<DomainField>,
    pub(crate) methods: Vec<MethodBuilder>,
}

impl DomainTypeBuilder {
    fn new(type_ref: TypeRef) -> Self {
        let base = if type_ref == TypeRef::object() {
            None
        } else {
            Some(TypeRef::object())
        };

        DomainTypeBuilder {
            type_ref,
            flavor: CilFlavor::Class,
            base,
            fields: Vec::new(),
            methods: Vec::new(),
        }
    }

    /// Sets the storage flavor.
    ///
    /// Value-type flavors drop the implicit `System.Object` base; value types take part in
    /// neither inheritance nor virtual dispatch.
    #[must_use]
    pub fn flavor(mut self, flavor: CilFlavor) -> Self {
        if flavor.is_value_type() {
            self.base = None;
        }
        self.flavor = flavor;
        self
    }

    /// Sets the direct base type.
    #[must_use]
    pub fn extends(mut self, base: TypeRef) -> Self {
        self.base = Some(base);
        self
    }

    /// Adds an instance field.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, field_type: TypeRef) -> Self {
        self.fields.push(DomainField {
            name: name.into(),
            field_type,
        });
        self
    }

    /// Adds a method or constructor.
    #[must_use]
    pub fn method(mut self, method: MethodBuilder) -> Self {
        self.methods.push(method);
        self
    }

    /// Adds a parameterless constructor that does nothing.
    #[must_use]
    pub fn default_constructor(self) -> Self {
        self.method(
            DomainMethod::builder(CONSTRUCTOR_NAME)
                .native(NativeMethod::new(CONSTRUCTOR_NAME, |_, _| Ok(None))),
        )
    }

    /// The identity of the type being built.
    #[must_use]
    pub fn type_ref(&self) -> &TypeRef {
        &self.type_ref
    }
}
