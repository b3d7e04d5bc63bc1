//! The dispatch engine.
//!
//! The [`Interpreter`] owns everything a single logical execution touches: the heap, the call
//! stack, the virtual dispatch cache and the statistics. It shares the immutable [`Catalog`]
//! with other executions through an `Arc`.
//!
//! # Execution Model
//!
//! [`Interpreter::execute`] runs one method in the frame on top of the call stack. Native
//! bodies are invoked directly; interpreted bodies are walked instruction by instruction, with
//! each instruction routed by its [`FlowType`]:
//!
//! - `Sequential` - stack, local, argument, arithmetic, array, field and type-test operations
//! - `Call` - `call`, `callvirt` and `newobj`, which push a frame and recurse into
//!   [`Interpreter::execute`]
//! - `UnconditionalBranch` / `ConditionalBranch` - redirect the program counter through the
//!   body's offset map
//! - `Return` - leave the loop
//!
//! Any other category, and any mnemonic a family does not implement, fails immediately. When the
//! loop ends, exactly one frame is unwound.
//!
//! # Failure Handling
//!
//! Every failure is fatal. The innermost failing instruction wraps the error once in
//! [`EmulationError::InstructionFault`]; each `execute` discards its own frame on the way out,
//! so by the time the error reaches the caller of the outermost `execute` the call stack is
//! back where it started.

mod calls;
mod handlers;
#[cfg(test)]
mod tests;

use std::sync::Arc;

use crate::{
    assembly::{FlowType, Instruction, InstructionStream},
    emulation::{
        engine::{dispatch::VirtualDispatch, result::StepResult, stats::ExecutionStats},
        process::{EmulationConfig, TracingConfig},
        BinaryOp, CallStack, CompareOp, ConversionType, EmValue, EmulationError, ManagedHeap,
        NativeContext, NativeMethod, StackFrame,
    },
    metadata::{Catalog, DomainMethodRc, MethodBody},
    Error, Result,
};

/// The dispatch engine.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use minclr::{
///     assembly::InstructionAssembler,
///     emulation::{EmValue, EmulationConfig, Interpreter},
///     metadata::{Catalog, DomainMethod, DomainType, MethodRef, TypeRef},
/// };
///
/// # fn main() -> minclr::Result<()> {
/// let catalog = Arc::new(Catalog::with_corelib()?);
/// let mut asm = InstructionAssembler::new();
/// asm.ldc_i4(7)?.emit("ret")?;
/// let ty = TypeRef::new("Demo", "Demo.Seven");
/// catalog.register(DomainType::builder(ty.clone()).method(
///     DomainMethod::builder("Get")
///         .as_static()
///         .returns(TypeRef::corelib("System.Int32"))
///         .body(asm.finish()?),
/// ))?;
///
/// let mut interpreter = Interpreter::new(catalog.clone(), &EmulationConfig::default());
/// let method = catalog.resolve_method(&MethodRef::new(ty, "Get", 0))?;
///
/// interpreter.call_stack_mut().push_entry();
/// assert_eq!(interpreter.invoke(method, vec![])?, Some(EmValue::I32(7)));
/// # Ok(())
/// # }
/// ```
pub struct Interpreter {
    /// Shared type information.
    catalog: Arc<Catalog>,

    /// Objects allocated by this execution.
    heap: ManagedHeap,

    /// Active frames.
    call_stack: CallStack,

    /// Memoized virtual call targets.
    dispatch: VirtualDispatch,

    /// Execution counters.
    stats: ExecutionStats,

    /// Which events to log.
    tracing: TracingConfig,
}

impl Interpreter {
    /// Creates an interpreter with an empty heap and call stack.
    ///
    /// # Arguments
    ///
    /// * `catalog` - The types the executed code may reference
    /// * `config` - Limits and tracing switches
    #[must_use]
    pub fn new(catalog: Arc<Catalog>, config: &EmulationConfig) -> Self {
        Interpreter {
            catalog,
            heap: ManagedHeap::new(),
            call_stack: CallStack::new(config.limits.max_call_depth),
            dispatch: VirtualDispatch::new(),
            stats: ExecutionStats::new(),
            tracing: config.tracing.clone(),
        }
    }

    /// Returns the catalog.
    #[must_use]
    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// Returns the heap.
    #[must_use]
    pub fn heap(&self) -> &ManagedHeap {
        &self.heap
    }

    /// Returns the heap mutably, for hosts preparing arguments.
    #[must_use]
    pub fn heap_mut(&mut self) -> &mut ManagedHeap {
        &mut self.heap
    }

    /// Returns the call stack.
    #[must_use]
    pub fn call_stack(&self) -> &CallStack {
        &self.call_stack
    }

    /// Returns the call stack mutably, for hosts constructing the initial frame.
    #[must_use]
    pub fn call_stack_mut(&mut self) -> &mut CallStack {
        &mut self.call_stack
    }

    /// Returns the virtual dispatch resolver.
    #[must_use]
    pub fn dispatch(&self) -> &VirtualDispatch {
        &self.dispatch
    }

    /// Returns the execution statistics.
    #[must_use]
    pub fn stats(&self) -> &ExecutionStats {
        &self.stats
    }

    /// Returns the execution statistics mutably.
    #[must_use]
    pub fn stats_mut(&mut self) -> &mut ExecutionStats {
        &mut self.stats
    }

    /// Pushes a frame for `method` and executes it.
    ///
    /// # Arguments
    ///
    /// * `method` - The method to run
    /// * `arguments` - Its arguments, receiver first for instance methods
    ///
    /// # Returns
    ///
    /// The return value, which has also been pushed onto the caller's frame.
    ///
    /// # Errors
    ///
    /// Returns [`EmulationError::StackDepthExceeded`] if the frame cannot be pushed, and any
    /// failure raised while executing. The call stack is unchanged on error.
    pub fn invoke(
        &mut self,
        method: DomainMethodRc,
        arguments: Vec<EmValue>,
    ) -> Result<Option<EmValue>> {
        self.call_stack.push(method.clone(), arguments)?;

        let depth = self.call_stack.depth();
        self.stats.record_call(depth);
        if self.tracing.trace_calls {
            log::debug!("-> {} (depth {depth})", method.fullname());
        }

        self.execute(&method)
    }

    /// Runs `method` in the frame on top of the call stack, then unwinds that frame.
    ///
    /// The frame must already have been pushed by the caller.
    ///
    /// # Returns
    ///
    /// The value propagated to the caller's frame, if the method returns one.
    ///
    /// # Errors
    ///
    /// Any failure raised by the method or anything it calls. The method's frame is discarded
    /// before the error is returned.
    pub fn execute(&mut self, method: &DomainMethodRc) -> Result<Option<EmValue>> {
        let outcome = match method.body() {
            MethodBody::Native(native) => self.run_native(native),
            MethodBody::Interpreted(body) => self.run_body(method, body),
            MethodBody::Abstract => {
                Err(EmulationError::unresolved("method body", method.method_ref()).into())
            }
        };

        if let Err(error) = outcome {
            self.call_stack.discard();
            return Err(error);
        }

        let value = self.call_stack.unwind()?;
        if self.tracing.trace_calls {
            match &value {
                Some(value) => log::debug!("<- {} = {value}", method.fullname()),
                None => log::debug!("<- {}", method.fullname()),
            }
        }
        Ok(value)
    }

    /// Invokes a native body with the current frame's arguments.
    fn run_native(&mut self, native: &NativeMethod) -> Result<()> {
        self.stats.record_native_call();
        let arguments = self.call_stack.current()?.arguments().to_vec();

        let before = self.heap.len();
        let mut ctx = NativeContext::new(&mut self.heap, &self.catalog);
        let result = native.invoke(&mut ctx, &arguments)?;
        for _ in before..self.heap.len() {
            self.stats.record_allocation();
        }

        if let Some(value) = result {
            self.frame()?.push(value);
        }
        Ok(())
    }

    /// Walks an interpreted body until `ret` or the end of the stream.
    fn run_body(&mut self, method: &DomainMethodRc, body: &InstructionStream) -> Result<()> {
        let mut index = 0;
        while let Some(instruction) = body.get(index) {
            self.stats.record_instruction();
            if self.tracing.trace_instructions {
                log::trace!(
                    "{} IL_{:04X}: {} [stack {}]",
                    method.fullname(),
                    instruction.offset,
                    instruction.mnemonic,
                    self.call_stack.current()?.stack().depth()
                );
            }

            let step = self
                .step(instruction)
                .map_err(|error| Self::fault(method, instruction, error))?;

            match step {
                StepResult::Continue => index += 1,
                StepResult::Branch { target } => {
                    index = body.index_of(target).ok_or_else(|| {
                        Self::fault(
                            method,
                            instruction,
                            EmulationError::InvalidBranchTarget { target }.into(),
                        )
                    })?;
                }
                StepResult::Return => break,
            }
        }
        Ok(())
    }

    /// Executes a single instruction in the current frame.
    ///
    /// # Returns
    ///
    /// What the dispatch loop does next. Branch targets are returned as offsets; resolving
    /// them is left to the loop.
    ///
    /// # Errors
    ///
    /// Returns [`EmulationError::UnsupportedOperation`] for unsupported flow categories and
    /// mnemonics, and any failure the instruction's handler raises.
    pub fn step(&mut self, instruction: &Instruction) -> Result<StepResult> {
        match instruction.flow_type {
            FlowType::Sequential => self.execute_sequential(instruction),
            FlowType::Call => self.execute_call(instruction),
            FlowType::UnconditionalBranch | FlowType::ConditionalBranch => {
                self.execute_branch(instruction)
            }
            FlowType::Return if instruction.mnemonic == "ret" => Ok(StepResult::Return),
            _ => Err(Self::unsupported(instruction)),
        }
    }

    /// Executes an instruction of the sequential family.
    fn execute_sequential(&mut self, instruction: &Instruction) -> Result<StepResult> {
        match instruction.mnemonic.as_str() {
            // ================================================================
            // Stack Operations
            // ================================================================
            "nop" => Ok(StepResult::Continue),
            "pop" => {
                self.pop()?;
                Ok(StepResult::Continue)
            }
            "dup" => {
                self.frame()?.stack_mut().dup()?;
                Ok(StepResult::Continue)
            }

            // ================================================================
            // Load Constants
            // ================================================================
            "ldc.i4.m1" => self.load_constant(-1),
            "ldc.i4.0" => self.load_constant(0),
            "ldc.i4.1" => self.load_constant(1),
            "ldc.i4.2" => self.load_constant(2),
            "ldc.i4.3" => self.load_constant(3),
            "ldc.i4.4" => self.load_constant(4),
            "ldc.i4.5" => self.load_constant(5),
            "ldc.i4.6" => self.load_constant(6),
            "ldc.i4.7" => self.load_constant(7),
            "ldc.i4.8" => self.load_constant(8),
            "ldc.i4.s" | "ldc.i4" => {
                let value = instruction
                    .get_i32_operand()
                    .ok_or_else(|| Self::invalid_operand(instruction, "int32"))?;
                self.load_constant(value)
            }
            "ldstr" => self.load_string(instruction),

            // ================================================================
            // Arguments and Locals
            // ================================================================
            "ldarg.0" => self.load_argument(0),
            "ldarg.1" => self.load_argument(1),
            "ldarg.2" => self.load_argument(2),
            "ldarg.3" => self.load_argument(3),
            "ldarg.s" | "ldarg" => {
                let index = instruction
                    .get_u16_operand()
                    .ok_or_else(|| Self::invalid_operand(instruction, "argument index"))?;
                self.load_argument(index)
            }
            "ldloc.0" => self.load_local(0),
            "ldloc.1" => self.load_local(1),
            "ldloc.2" => self.load_local(2),
            "ldloc.3" => self.load_local(3),
            "ldloc.s" | "ldloc" => {
                let index = instruction
                    .get_u16_operand()
                    .ok_or_else(|| Self::invalid_operand(instruction, "local index"))?;
                self.load_local(index)
            }
            "stloc.0" => self.store_local(0),
            "stloc.1" => self.store_local(1),
            "stloc.2" => self.store_local(2),
            "stloc.3" => self.store_local(3),
            "stloc.s" | "stloc" => {
                let index = instruction
                    .get_u16_operand()
                    .ok_or_else(|| Self::invalid_operand(instruction, "local index"))?;
                self.store_local(index)
            }

            // ================================================================
            // Arithmetic, Comparison and Conversion
            // ================================================================
            "add" => self.binary_op(BinaryOp::Add),
            "sub" => self.binary_op(BinaryOp::Sub),
            "div" => self.binary_op(BinaryOp::Div),
            "ceq" => self.compare(CompareOp::Eq),
            "cgt" => self.compare(CompareOp::Gt),
            "clt" => self.compare(CompareOp::Lt),
            mnemonic if mnemonic.starts_with("conv.") => {
                let conversion: ConversionType = mnemonic
                    .parse()
                    .map_err(|_| Self::unsupported(instruction))?;
                self.convert(conversion)
            }

            // ================================================================
            // Objects
            // ================================================================
            "isinst" => self.is_instance(instruction),
            "ldfld" => self.load_field(instruction),
            "stfld" => self.store_field(instruction),
            "stind.ref" => self.store_indirect_ref(),

            // ================================================================
            // Arrays
            // ================================================================
            "newarr" => self.new_array(instruction),
            "ldlen" => self.load_array_length(),
            "ldelem.i1" => self.load_element(ElementWidth::I1),
            "ldelem.i2" => self.load_element(ElementWidth::I2),
            "ldelem.i4" => self.load_element(ElementWidth::I4),
            "stelem.i1" => self.store_element(ElementWidth::I1),
            "stelem.i2" => self.store_element(ElementWidth::I2),
            "stelem.i4" => self.store_element(ElementWidth::I4),
            "ldelem.ref" | "ldelema" => self.load_element_ref(),
            "stelem.ref" => self.store_element_ref(),

            _ => Err(Self::unsupported(instruction)),
        }
    }

    /// Executes an instruction of the branch family.
    fn execute_branch(&mut self, instruction: &Instruction) -> Result<StepResult> {
        let target = instruction
            .get_branch_target()
            .ok_or_else(|| Self::invalid_operand(instruction, "branch target"))?;

        match instruction.mnemonic.as_str() {
            "br" | "br.s" => Ok(StepResult::Branch { target }),
            "brtrue" | "brtrue.s" => self.branch_if(target, true),
            "brfalse" | "brfalse.s" => self.branch_if(target, false),
            _ => Err(Self::unsupported(instruction)),
        }
    }

    /// Returns the current frame.
    fn frame(&mut self) -> Result<&mut StackFrame> {
        self.call_stack.current_mut()
    }

    /// Pops a value from the current frame.
    fn pop(&mut self) -> Result<EmValue> {
        self.frame()?.pop()
    }

    /// Pushes a value onto the current frame.
    fn push(&mut self, value: EmValue) -> Result<()> {
        self.frame()?.push(value);
        Ok(())
    }

    /// Attaches the failing instruction to an error that does not carry one yet.
    fn fault(method: &DomainMethodRc, instruction: &Instruction, error: Error) -> Error {
        match error {
            Error::Emulation(source) if !source.is_located() => EmulationError::InstructionFault {
                method: method.fullname(),
                offset: instruction.offset,
                mnemonic: instruction.mnemonic.clone(),
                source,
            }
            .into(),
            other => other,
        }
    }

    fn unsupported(instruction: &Instruction) -> Error {
        EmulationError::UnsupportedOperation {
            mnemonic: instruction.mnemonic.clone(),
            flow_type: instruction.flow_type,
        }
        .into()
    }
}

/// Width of a primitive array element accessed by `ldelem.*` / `stelem.*`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ElementWidth {
    I1,
    I2,
    I4,
}
