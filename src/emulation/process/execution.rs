//! Emulation process - the host entry point.
//!
//! [`EmulationProcess`] wraps an [`Interpreter`] and takes care of what a host call needs
//! around [`Interpreter::execute`]: resolving the method, checking the argument count, keeping
//! a host entry frame at the bottom of the call stack to receive return values, and restoring
//! the call stack after a failure.

use std::sync::Arc;

use crate::{
    emulation::{
        process::EmulationConfig, EmValue, EmulationError, ExecutionStats, HeapRef, Interpreter,
        ManagedHeap, NativeContext,
    },
    metadata::{Catalog, MethodRef},
    Result,
};

/// One simulated execution.
///
/// The heap persists across [`EmulationProcess::invoke`] calls, so objects created by one
/// invocation can be passed to the next.
pub struct EmulationProcess {
    interpreter: Interpreter,
    config: EmulationConfig,
}

impl EmulationProcess {
    /// Creates a process with an empty heap.
    ///
    /// # Arguments
    ///
    /// * `catalog` - The types executed code may reference
    /// * `config` - Limits and tracing switches
    #[must_use]
    pub fn new(catalog: Arc<Catalog>, config: EmulationConfig) -> Self {
        EmulationProcess {
            interpreter: Interpreter::new(catalog, &config),
            config,
        }
    }

    /// Runs a method to completion.
    ///
    /// # Arguments
    ///
    /// * `method_ref` - The method to run, resolved through the catalog (inherited methods
    ///   are found through the base-type chain)
    /// * `arguments` - Its arguments; instance methods take the receiver first
    ///
    /// # Returns
    ///
    /// The method's return value, or `None` for `void` methods.
    ///
    /// # Errors
    ///
    /// - [`crate::Error::Malformed`] if the argument count does not match the method
    /// - [`crate::Error::Emulation`] for any failure during resolution or execution. The call
    ///   stack is restored to its depth before the call; objects allocated before the failure
    ///   stay on the heap.
    pub fn invoke(
        &mut self,
        method_ref: &MethodRef,
        arguments: Vec<EmValue>,
    ) -> Result<Option<EmValue>> {
        let method = self.interpreter.catalog().resolve_method(method_ref)?;
        if arguments.len() != method.arg_count() {
            return Err(malformed_error!(
                "{} takes {} arguments, got {}",
                method_ref,
                method.arg_count(),
                arguments.len()
            ));
        }

        if self.interpreter.call_stack().is_empty() {
            self.interpreter.call_stack_mut().push_entry();
        }
        let entry_len = self.interpreter.call_stack().len();

        match self.interpreter.invoke(method.clone(), arguments) {
            Ok(value) => {
                if value.is_some() {
                    self.interpreter.call_stack_mut().current_mut()?.pop()?;
                }
                Ok(value)
            }
            Err(error) => {
                self.interpreter.call_stack_mut().truncate(entry_len);
                log::warn!("{} failed: {error}", method.fullname());
                Err(error)
            }
        }
    }

    /// Runs a constructor on a new instance and returns its handle.
    ///
    /// # Errors
    ///
    /// Fails like [`EmulationProcess::invoke`].
    pub fn construct(&mut self, ctor_ref: &MethodRef, arguments: Vec<EmValue>) -> Result<HeapRef> {
        if self.interpreter.call_stack().is_empty() {
            self.interpreter.call_stack_mut().push_entry();
        }
        let entry_len = self.interpreter.call_stack().len();

        self.interpreter
            .construct(ctor_ref, arguments)
            .inspect_err(|error| {
                self.interpreter.call_stack_mut().truncate(entry_len);
                log::warn!("{ctor_ref} failed: {error}");
            })
    }

    /// Allocates a `System.String` and returns a reference to it.
    ///
    /// # Errors
    ///
    /// Fails if `System.String` is not registered.
    pub fn alloc_string(&mut self, text: &str) -> Result<EmValue> {
        let catalog = self.interpreter.catalog().clone();
        let mut ctx = NativeContext::new(self.interpreter.heap_mut(), &catalog);
        let heap_ref = ctx.alloc_string(text)?;
        self.interpreter.stats_mut().record_allocation();
        Ok(EmValue::ObjectRef(heap_ref))
    }

    /// Reads the text of a string reference.
    ///
    /// # Errors
    ///
    /// Fails for null and for anything that is not a string instance.
    pub fn read_string(&self, value: &EmValue) -> Result<Arc<str>> {
        match value {
            EmValue::ObjectRef(heap_ref) => self.heap().get_string(*heap_ref),
            EmValue::Null => Err(EmulationError::NullReference.into()),
            other => Err(EmulationError::HeapTypeMismatch {
                expected: "string",
                found: other.type_name(),
            }
            .into()),
        }
    }

    /// Returns the heap.
    #[must_use]
    pub fn heap(&self) -> &ManagedHeap {
        self.interpreter.heap()
    }

    /// Returns the catalog.
    #[must_use]
    pub fn catalog(&self) -> &Arc<Catalog> {
        self.interpreter.catalog()
    }

    /// Returns the configuration the process was created with.
    #[must_use]
    pub fn config(&self) -> &EmulationConfig {
        &self.config
    }

    /// Returns the accumulated execution statistics.
    #[must_use]
    pub fn stats(&self) -> &ExecutionStats {
        self.interpreter.stats()
    }

    /// Returns the interpreter.
    #[must_use]
    pub fn interpreter(&self) -> &Interpreter {
        &self.interpreter
    }

    /// Returns the interpreter mutably.
    #[must_use]
    pub fn interpreter_mut(&mut self) -> &mut Interpreter {
        &mut self.interpreter
    }
}
