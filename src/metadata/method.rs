//! Method and constructor definitions.
//!
//! A [`DomainMethod`] describes one method of a catalog type: its modifiers, declared
//! parameter and return types, the flavors of its locals and its [`MethodBody`]. Constructors
//! are ordinary methods named `.ctor`.
//!
//! # Interpreted and Native Bodies
//!
//! Methods defined without instructions are built-ins. When their declaring type is registered,
//! the catalog looks up the matching native implementation and fixes the body to
//! [`MethodBody::Native`] once; the engine never has to decide per call whether to interpret.

use std::sync::Arc;

use bitflags::bitflags;

use crate::{
    assembly::InstructionStream,
    emulation::NativeMethod,
    metadata::{CilFlavor, MethodRef, TypeRef, CONSTRUCTOR_NAME},
};

/// A reference-counted pointer to a [`DomainMethod`].
pub type DomainMethodRc = Arc<DomainMethod>;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    /// Method modifier flags
    pub struct MethodModifiers: u32 {
        /// Defined on type, else per instance
        const STATIC = 0x0010;
        /// Method is virtual
        const VIRTUAL = 0x0040;
        /// Method does not provide an implementation
        const ABSTRACT = 0x0400;
    }
}

/// How a method is executed.
#[derive(Debug, Clone)]
pub enum MethodBody {
    /// Walk the instruction stream.
    Interpreted(InstructionStream),
    /// Invoke a host routine.
    Native(NativeMethod),
    /// No implementation; only reachable through virtual dispatch to an override.
    Abstract,
}

/// A method or constructor of a catalog type.
#[derive(Debug, Clone)]
pub struct DomainMethod {
    declaring_type: TypeRef,
    name: String,
    modifiers: MethodModifiers,
    params: Vec<TypeRef>,
    return_type: Option<TypeRef>,
    locals: Vec<CilFlavor>,
    body: MethodBody,
}

impl DomainMethod {
    /// Starts building a method named `name`.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use minclr::metadata::{DomainMethod, TypeRef};
    ///
    /// let builder = DomainMethod::builder("Add")
    ///     .as_static()
    ///     .param(TypeRef::corelib("System.Int32"))
    ///     .param(TypeRef::corelib("System.Int32"))
    ///     .returns(TypeRef::corelib("System.Int32"));
    /// ```
    #[must_use]
    pub fn builder(name: impl Into<String>) -> MethodBuilder {
        MethodBuilder::new(name)
    }

    /// Starts building an instance constructor.
    #[must_use]
    pub fn constructor() -> MethodBuilder {
        MethodBuilder::new(CONSTRUCTOR_NAME)
    }

    /// The type that declares this method.
    #[must_use]
    pub fn declaring_type(&self) -> &TypeRef {
        &self.declaring_type
    }

    /// The method name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The modifier flags.
    #[must_use]
    pub fn modifiers(&self) -> MethodModifiers {
        self.modifiers
    }

    /// Returns `true` for static methods.
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.modifiers.contains(MethodModifiers::STATIC)
    }

    /// Returns `true` for virtual methods.
    #[must_use]
    pub fn is_virtual(&self) -> bool {
        self.modifiers.contains(MethodModifiers::VIRTUAL)
    }

    /// Returns `true` for methods without an implementation.
    #[must_use]
    pub fn is_abstract(&self) -> bool {
        matches!(self.body, MethodBody::Abstract)
    }

    /// Returns `true` for instance constructors.
    #[must_use]
    pub fn is_constructor(&self) -> bool {
        self.name == CONSTRUCTOR_NAME
    }

    /// Returns `true` if the body is a host routine.
    #[must_use]
    pub fn is_native(&self) -> bool {
        matches!(self.body, MethodBody::Native(_))
    }

    /// The declared parameter types, excluding the receiver.
    #[must_use]
    pub fn params(&self) -> &[TypeRef] {
        &self.params
    }

    /// The number of declared parameters, excluding the receiver.
    #[must_use]
    pub fn param_count(&self) -> usize {
        self.params.len()
    }

    /// The number of argument slots a frame for this method holds.
    ///
    /// Instance methods receive the receiver as an extra leading argument.
    #[must_use]
    pub fn arg_count(&self) -> usize {
        if self.is_static() {
            self.params.len()
        } else {
            self.params.len() + 1
        }
    }

    /// The return type, or `None` for `void`.
    #[must_use]
    pub fn return_type(&self) -> Option<&TypeRef> {
        self.return_type.as_ref()
    }

    /// Returns `true` if the method leaves a value for its caller.
    #[must_use]
    pub fn returns_value(&self) -> bool {
        self.return_type.is_some()
    }

    /// The flavors of the local variable slots.
    #[must_use]
    pub fn locals(&self) -> &[CilFlavor] {
        &self.locals
    }

    /// The method body.
    #[must_use]
    pub fn body(&self) -> &MethodBody {
        &self.body
    }

    /// Returns a reference naming this method.
    #[must_use]
    pub fn method_ref(&self) -> MethodRef {
        MethodRef::new(self.declaring_type.clone(), &self.name, self.params.len())
    }

    /// The fully qualified name, `Namespace.Type::Method`.
    #[must_use]
    pub fn fullname(&self) -> String {
        format!("{}::{}", self.declaring_type.name, self.name)
    }

    /// Returns `true` if the method was declared without instructions and still awaits a
    /// native implementation.
    pub(crate) fn is_unbound(&self) -> bool {
        matches!(&self.body, MethodBody::Interpreted(stream) if stream.is_empty())
    }

    pub(crate) fn bind_native(&mut self, native: NativeMethod) {
        self.body = MethodBody::Native(native);
    }
}

/// Builder for [`DomainMethod`].
///
/// The declaring type is filled in when the owning type is registered with the catalog.
#[derive(Debug, Clone)]
pub struct MethodBuilder {
    name: String,
    modifiers: MethodModifiers,
    params: Vec<TypeRef>,
    return_type: Option<TypeRef>,
    locals: Vec<CilFlavor>,
    body: Option<InstructionStream>,
    native: Option<NativeMethod>,
}

impl MethodBuilder {
    fn new(name: impl Into<String>) -> Self {
        MethodBuilder {
            name: name.into(),
            modifiers: MethodModifiers::empty(),
            params: Vec::new(),
            return_type: None,
            locals: Vec::new(),
            body: None,
            native: None,
        }
    }

    /// Marks the method static.
    #[must_use]
    pub fn as_static(mut self) -> Self {
        self.modifiers |= MethodModifiers::STATIC;
        self
    }

    /// Marks the method virtual.
    #[must_use]
    pub fn as_virtual(mut self) -> Self {
        self.modifiers |= MethodModifiers::VIRTUAL;
        self
    }

    /// Marks the method abstract (and therefore virtual).
    #[must_use]
    pub fn as_abstract(mut self) -> Self {
        self.modifiers |= MethodModifiers::VIRTUAL | MethodModifiers::ABSTRACT;
        self
    }

    /// Appends a declared parameter.
    #[must_use]
    pub fn param(mut self, ty: TypeRef) -> Self {
        self.params.push(ty);
        self
    }

    /// Sets the return type. Methods without one return `void`.
    #[must_use]
    pub fn returns(mut self, ty: TypeRef) -> Self {
        self.return_type = Some(ty);
        self
    }

    /// Appends a local variable slot of the given flavor.
    #[must_use]
    pub fn local(mut self, flavor: CilFlavor) -> Self {
        self.locals.push(flavor);
        self
    }

    /// Sets the instruction body.
    #[must_use]
    pub fn body(mut self, body: InstructionStream) -> Self {
        self.body = Some(body);
        self
    }

    /// Supplies a native implementation directly instead of relying on the catalog's registry.
    #[must_use]
    pub fn native(mut self, native: NativeMethod) -> Self {
        self.native = Some(native);
        self
    }

    /// The name of the method being built.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn build(self, declaring_type: &TypeRef) -> DomainMethod {
        let body = match (self.native, self.body) {
            (Some(native), _) => MethodBody::Native(native),
            (None, _) if self.modifiers.contains(MethodModifiers::ABSTRACT) => {
                MethodBody::Abstract
            }
            (None, Some(stream)) => MethodBody::Interpreted(stream),
            (None, None) => MethodBody::Interpreted(InstructionStream::empty()),
        };

        DomainMethod {
            declaring_type: declaring_type.clone(),
            name: self.name,
            modifiers: self.modifiers,
            params: self.params,
            return_type: self.return_type,
            locals: self.locals,
            body,
        }
    }
}
