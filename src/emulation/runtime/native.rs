//! Native method implementations.
//!
//! Built-in methods are declared in the catalog without instructions and bound to a
//! [`NativeMethod`] when their type is registered. A native routine receives a
//! [`NativeContext`] giving it the heap and the catalog, plus the frame's arguments (receiver
//! first for instance methods), and returns the method's result.

use std::{fmt, sync::Arc};

use dashmap::DashMap;

use crate::{
    emulation::{EmValue, EmulationError, HeapRef, ManagedHeap},
    metadata::{Catalog, MethodRef, TypeRef},
    Result,
};

/// Signature of a native routine.
pub type NativeFn =
    dyn Fn(&mut NativeContext<'_>, &[EmValue]) -> Result<Option<EmValue>> + Send + Sync;

/// State a native routine may touch.
pub struct NativeContext<'a> {
    /// The heap of the running execution.
    pub heap: &'a mut ManagedHeap,
    /// The catalog the execution resolves against.
    pub catalog: &'a Catalog,
}

impl<'a> NativeContext<'a> {
    /// Creates a context.
    pub fn new(heap: &'a mut ManagedHeap, catalog: &'a Catalog) -> Self {
        NativeContext { heap, catalog }
    }

    /// Allocates a `System.String` instance.
    ///
    /// # Errors
    ///
    /// Fails if `System.String` is not registered.
    pub fn alloc_string(&mut self, text: &str) -> Result<HeapRef> {
        let string_type = self.catalog.resolve_type(&TypeRef::string())?;
        Ok(self.heap.alloc_string(string_type, text))
    }

    /// Reads the text of a string argument.
    ///
    /// # Errors
    ///
    /// Returns [`EmulationError::NullReference`] for null and a type mismatch for anything
    /// that is not a string instance.
    pub fn read_string(&self, value: &EmValue) -> Result<Arc<str>> {
        match value {
            EmValue::ObjectRef(heap_ref) => self.heap.get_string(*heap_ref),
            EmValue::Null => Err(EmulationError::NullReference.into()),
            other => Err(EmulationError::HeapTypeMismatch {
                expected: "string",
                found: other.type_name(),
            }
            .into()),
        }
    }

    /// Returns the receiver handle of an instance method.
    ///
    /// # Errors
    ///
    /// Returns [`EmulationError::NullReference`] if argument 0 is null and
    /// [`EmulationError::ArgumentIndexOutOfBounds`] if there are no arguments.
    pub fn this(args: &[EmValue]) -> Result<HeapRef> {
        match args.first() {
            Some(EmValue::ObjectRef(heap_ref)) => Ok(*heap_ref),
            Some(EmValue::Null) => Err(EmulationError::NullReference.into()),
            Some(other) => Err(EmulationError::HeapTypeMismatch {
                expected: "object reference",
                found: other.type_name(),
            }
            .into()),
            None => Err(EmulationError::ArgumentIndexOutOfBounds { index: 0, count: 0 }.into()),
        }
    }
}

/// A host routine standing in for a method body.
#[derive(Clone)]
pub struct NativeMethod {
    name: Arc<str>,
    func: Arc<NativeFn>,
}

impl NativeMethod {
    /// Wraps a closure as a native method.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use minclr::emulation::{EmValue, NativeMethod};
    ///
    /// let answer = NativeMethod::new("Answer", |_ctx, _args| Ok(Some(EmValue::I32(42))));
    /// assert_eq!(answer.name(), "Answer");
    /// ```
    pub fn new<F>(name: impl Into<Arc<str>>, func: F) -> Self
    where
        F: Fn(&mut NativeContext<'_>, &[EmValue]) -> Result<Option<EmValue>>
            + Send
            + Sync
            + 'static,
    {
        NativeMethod {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    /// The name used in traces.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Runs the routine.
    ///
    /// # Errors
    ///
    /// Propagates whatever the routine returns.
    pub fn invoke(&self, ctx: &mut NativeContext<'_>, args: &[EmValue]) -> Result<Option<EmValue>> {
        (self.func)(ctx, args)
    }
}

impl fmt::Debug for NativeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeMethod")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Native implementations keyed by the method they implement.
///
/// Consulted by [`Catalog::register`] to bind body-less methods.
#[derive(Default)]
pub struct NativeRegistry {
    methods: DashMap<MethodRef, NativeMethod>,
}

impl NativeRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) the implementation of `method`.
    pub fn register(&self, method: MethodRef, native: NativeMethod) {
        self.methods.insert(method, native);
    }

    /// Looks up the implementation of `method`.
    #[must_use]
    pub fn get(&self, method: &MethodRef) -> Option<NativeMethod> {
        self.methods.get(method).map(|entry| entry.value().clone())
    }

    /// Returns `true` if `method` has an implementation.
    #[must_use]
    pub fn contains(&self, method: &MethodRef) -> bool {
        self.methods.contains_key(method)
    }

    /// Number of registered implementations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.methods.len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

impl fmt::Debug for NativeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeRegistry")
            .field("methods", &self.methods.len())
            .finish()
    }
}
