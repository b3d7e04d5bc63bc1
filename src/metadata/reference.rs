//! Symbolic references to catalog entries.
//!
//! Instructions never hold catalog entities directly. They carry these lightweight descriptors,
//! which [`crate::metadata::Catalog`] resolves on use. A type is identified by its owning module
//! and its full name; members are identified relative to their declaring type.

use std::fmt;

/// Name of the module that owns the built-in runtime library types.
pub const CORELIB: &str = "System.Private.CoreLib";

/// Full name of the root of every reference type hierarchy.
pub const OBJECT_TYPE: &str = "System.Object";

/// Full name of the string type materialized by `ldstr`.
pub const STRING_TYPE: &str = "System.String";

/// Name of the field holding a string instance's host text.
pub const STRING_VALUE_FIELD: &str = "value";

/// Name shared by all instance constructors.
pub const CONSTRUCTOR_NAME: &str = ".ctor";

/// Reference to a type by `(module, name)`.
///
/// # Examples
///
/// ```rust,no_run
/// use minclr::metadata::TypeRef;
///
/// let int32 = TypeRef::corelib("System.Int32");
/// assert_eq!(int32.to_string(), "[System.Private.CoreLib]System.Int32");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeRef {
    /// Owning module or assembly
    pub module: String,
    /// Full type name including namespace
    pub name: String,
}

impl TypeRef {
    /// Creates a reference to `name` in `module`.
    pub fn new(module: impl Into<String>, name: impl Into<String>) -> Self {
        TypeRef {
            module: module.into(),
            name: name.into(),
        }
    }

    /// Creates a reference to a runtime library type.
    pub fn corelib(name: impl Into<String>) -> Self {
        Self::new(CORELIB, name)
    }

    /// Reference to `System.Object`.
    #[must_use]
    pub fn object() -> Self {
        Self::corelib(OBJECT_TYPE)
    }

    /// Reference to `System.String`.
    #[must_use]
    pub fn string() -> Self {
        Self::corelib(STRING_TYPE)
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]{}", self.module, self.name)
    }
}

/// Reference to a method or constructor.
///
/// Methods are matched by name and parameter count within the declaring type. Constructors use
/// the name `.ctor`; see [`MethodRef::constructor`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodRef {
    /// The type the method is referenced through
    pub declaring_type: TypeRef,
    /// Method name
    pub name: String,
    /// Number of declared parameters, excluding the receiver
    pub param_count: usize,
}

impl MethodRef {
    /// Creates a method reference.
    ///
    /// # Arguments
    ///
    /// * `declaring_type` - The type the method is referenced through
    /// * `name` - The method name
    /// * `param_count` - Number of declared parameters (the receiver is not counted)
    pub fn new(declaring_type: TypeRef, name: impl Into<String>, param_count: usize) -> Self {
        MethodRef {
            declaring_type,
            name: name.into(),
            param_count,
        }
    }

    /// Creates a reference to an instance constructor of `declaring_type`.
    #[must_use]
    pub fn constructor(declaring_type: TypeRef, param_count: usize) -> Self {
        Self::new(declaring_type, CONSTRUCTOR_NAME, param_count)
    }

    /// Returns `true` if this names a constructor.
    #[must_use]
    pub fn is_constructor(&self) -> bool {
        self.name == CONSTRUCTOR_NAME
    }
}

impl fmt::Display for MethodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}::{}/{}",
            self.declaring_type, self.name, self.param_count
        )
    }
}

/// Reference to a field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldRef {
    /// The type the field is referenced through
    pub declaring_type: TypeRef,
    /// Field name
    pub name: String,
}

impl FieldRef {
    /// Creates a field reference.
    pub fn new(declaring_type: TypeRef, name: impl Into<String>) -> Self {
        FieldRef {
            declaring_type,
            name: name.into(),
        }
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.declaring_type, self.name)
    }
}
