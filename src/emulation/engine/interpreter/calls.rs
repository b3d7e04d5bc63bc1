//! Handlers of the call family: `call`, `callvirt` and `newobj`.
//!
//! Each call pops its arguments from the caller's frame, pushes a frame for the target and
//! recurses into [`Interpreter::execute`] through [`Interpreter::invoke`]. The target's return
//! value arrives on the caller's frame when the callee unwinds.

use crate::{
    assembly::Instruction,
    emulation::{
        engine::result::StepResult, EmValue, EmulationError, HeapObject, HeapRef, Interpreter,
    },
    metadata::{DomainMethodRc, DomainTypeRc, MethodRef, TypeRef},
    Result,
};

impl Interpreter {
    /// Routes an instruction of the call family.
    pub(super) fn execute_call(&mut self, instruction: &Instruction) -> Result<StepResult> {
        let method_ref = instruction
            .get_method_operand()
            .ok_or_else(|| Self::invalid_operand(instruction, "method"))?;

        match instruction.mnemonic.as_str() {
            "call" => self.call_method(method_ref, false)?,
            "callvirt" => self.call_method(method_ref, true)?,
            "newobj" => {
                let arguments = self.pop_arguments(method_ref)?;
                let heap_ref = self.construct(method_ref, arguments)?;
                self.push(EmValue::ObjectRef(heap_ref))?;
            }
            _ => return Err(Self::unsupported(instruction)),
        }
        Ok(StepResult::Continue)
    }

    /// Allocates an instance and runs a constructor on it.
    ///
    /// The new handle is passed to the constructor as argument 0. This is `newobj` without the
    /// operand stack, and lets hosts create receivers for instance methods.
    ///
    /// # Arguments
    ///
    /// * `ctor_ref` - The constructor to run
    /// * `arguments` - The constructor's declared arguments, without the receiver
    ///
    /// # Returns
    ///
    /// The handle of the initialized instance.
    ///
    /// # Errors
    ///
    /// Fails if the type or constructor cannot be resolved, the argument count does not match,
    /// or the constructor fails.
    pub fn construct(&mut self, ctor_ref: &MethodRef, arguments: Vec<EmValue>) -> Result<HeapRef> {
        let ctor = self.catalog.resolve_constructor(ctor_ref)?;
        if arguments.len() != ctor.param_count() {
            return Err(malformed_error!(
                "Constructor {} expects {} arguments, got {}",
                ctor_ref,
                ctor.param_count(),
                arguments.len()
            ));
        }
        let ty = self.catalog.resolve_type(&ctor_ref.declaring_type)?;

        let heap_ref = self.allocate_object(ty)?;
        let mut frame_arguments = Vec::with_capacity(arguments.len() + 1);
        frame_arguments.push(EmValue::ObjectRef(heap_ref));
        frame_arguments.extend(arguments);

        self.invoke(ctor, frame_arguments)?;
        Ok(heap_ref)
    }

    /// `call` / `callvirt`.
    ///
    /// Pops the declared arguments and, for instance methods, the receiver below them. Only
    /// `callvirt` re-resolves a virtual target against the receiver's runtime type, so `call`
    /// can reach a base implementation from inside an override.
    fn call_method(&mut self, method_ref: &MethodRef, is_virtual_call: bool) -> Result<()> {
        let declared = self.catalog.resolve_method(method_ref)?;
        let mut arguments = self.frame()?.stack_mut().pop_n(declared.param_count())?;

        let target = if declared.is_static() {
            declared
        } else {
            let receiver = self.pop()?;
            let target = if is_virtual_call {
                self.resolve_virtual(declared, &receiver)?
            } else {
                declared
            };
            arguments.insert(0, receiver);
            target
        };

        self.invoke(target, arguments)?;
        Ok(())
    }

    /// Picks the implementation a `callvirt` on `receiver` reaches.
    fn resolve_virtual(
        &mut self,
        declared: DomainMethodRc,
        receiver: &EmValue,
    ) -> Result<DomainMethodRc> {
        let heap_ref = match receiver {
            EmValue::ObjectRef(heap_ref) => *heap_ref,
            EmValue::Null => return Err(EmulationError::NullReference.into()),
            other => return Err(Self::operand_type_error("callvirt", other)),
        };
        if !declared.is_virtual() {
            return Ok(declared);
        }

        let runtime_type = self.runtime_type(heap_ref)?;
        self.dispatch.resolve(&self.catalog, &declared, &runtime_type)
    }

    /// The runtime type of a heap object; arrays dispatch as `System.Object`.
    fn runtime_type(&self, heap_ref: HeapRef) -> Result<DomainTypeRc> {
        match self.heap.get(heap_ref)? {
            HeapObject::Instance { type_handle, .. } => Ok(type_handle.clone()),
            HeapObject::Array { .. } => self.catalog.resolve_type(&TypeRef::object()),
        }
    }

    /// Pops the declared arguments of a constructor reference.
    fn pop_arguments(&mut self, method_ref: &MethodRef) -> Result<Vec<EmValue>> {
        self.frame()?.stack_mut().pop_n(method_ref.param_count)
    }
}
