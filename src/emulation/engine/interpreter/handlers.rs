//! Handlers of the sequential and branch families.
//!
//! These are private helpers called from [`Interpreter::step`]. They are organized by
//! category:
//!
//! - **Error helpers**: `invalid_operand`, `operand_type_error`
//! - **Constants and strings**: `load_constant`, `load_string`
//! - **Arguments and locals**: `load_argument`, `load_local`, `store_local`
//! - **Arithmetic**: `binary_op`, `compare`, `convert`
//! - **Branches**: `branch_if`
//! - **Objects**: `is_instance`, `load_field`, `store_field`, `store_indirect_ref`
//! - **Arrays**: `new_array`, `load_array_length`, `load_element`, `store_element`,
//!   `load_element_ref`, `store_element_ref`

use crate::{
    assembly::Instruction,
    emulation::{
        engine::{interpreter::ElementWidth, result::StepResult},
        BinaryOp, CompareOp, ConversionType, EmValue, EmulationError, HeapObject, HeapRef,
        Interpreter,
    },
    metadata::{DomainTypeRc, TypeRef, STRING_VALUE_FIELD},
    Error, Result,
};

impl Interpreter {
    /// Creates an error for a missing or mistyped operand.
    pub(super) fn invalid_operand(instruction: &Instruction, expected: &'static str) -> Error {
        EmulationError::InvalidOperand {
            instruction: instruction.mnemonic.clone(),
            expected,
        }
        .into()
    }

    /// Creates an error for an operation applied to a value of the wrong kind.
    pub(super) fn operand_type_error(operation: &str, value: &EmValue) -> Error {
        EmulationError::InvalidOperationTypes {
            operation: operation.to_string(),
            operand_types: value.type_name().to_string(),
        }
        .into()
    }

    /// Pops an integer used as an index or length.
    fn pop_integer(&mut self, operation: &str) -> Result<i64> {
        let value = self.pop()?;
        value
            .as_i64()
            .ok_or_else(|| Self::operand_type_error(operation, &value))
    }

    /// Pops an object handle, failing on null.
    pub(super) fn pop_object(&mut self, operation: &str) -> Result<HeapRef> {
        match self.pop()? {
            EmValue::ObjectRef(heap_ref) => Ok(heap_ref),
            EmValue::Null => Err(EmulationError::NullReference.into()),
            other => Err(Self::operand_type_error(operation, &other)),
        }
    }

    /// Allocates an instance of `ty` with every field, inherited ones included, at its default.
    pub(super) fn allocate_object(&mut self, ty: DomainTypeRc) -> Result<HeapRef> {
        let fields = self
            .catalog
            .instance_fields(&ty)?
            .into_iter()
            .map(|(name, flavor)| (name, EmValue::default_for_flavor(flavor)));

        let name = ty.name().to_string();
        let heap_ref = self.heap.alloc_instance(ty, fields);
        self.stats.record_allocation();
        if self.tracing.trace_heap {
            log::trace!("alloc {name} -> {heap_ref}");
        }
        Ok(heap_ref)
    }

    // ====================================================================
    // Constants and strings
    // ====================================================================

    pub(super) fn load_constant(&mut self, value: i32) -> Result<StepResult> {
        self.push(EmValue::I32(value))?;
        Ok(StepResult::Continue)
    }

    /// Materializes a string literal as a new `System.String` instance.
    ///
    /// # Errors
    ///
    /// Fails if the operand is not a string or `System.String` is not registered.
    pub(super) fn load_string(&mut self, instruction: &Instruction) -> Result<StepResult> {
        let text = instruction
            .get_string_operand()
            .ok_or_else(|| Self::invalid_operand(instruction, "string"))?;

        let string_type = self.catalog.resolve_type(&TypeRef::string())?;
        let heap_ref = self.heap.alloc_string(string_type, text);
        self.stats.record_allocation();
        if self.tracing.trace_heap {
            log::trace!("ldstr {text:?} -> {heap_ref}");
        }

        self.push(EmValue::ObjectRef(heap_ref))?;
        Ok(StepResult::Continue)
    }

    // ====================================================================
    // Arguments and locals
    // ====================================================================

    /// Pushes an argument.
    ///
    /// Slot 0 of an instance method is the receiver; declared parameters follow it. Scalars
    /// are copied, references are pushed as handles.
    ///
    /// # Errors
    ///
    /// Returns [`EmulationError::ArgumentIndexOutOfBounds`] for an unknown slot.
    pub(super) fn load_argument(&mut self, index: u16) -> Result<StepResult> {
        let frame = self.frame()?;
        let value = frame.argument(usize::from(index))?.clone();
        frame.push(value);
        Ok(StepResult::Continue)
    }

    pub(super) fn load_local(&mut self, index: u16) -> Result<StepResult> {
        let frame = self.frame()?;
        let value = frame.locals().get(usize::from(index))?.clone();
        frame.push(value);
        Ok(StepResult::Continue)
    }

    pub(super) fn store_local(&mut self, index: u16) -> Result<StepResult> {
        let frame = self.frame()?;
        let value = frame.pop()?;
        frame.locals_mut().set(usize::from(index), value)?;
        Ok(StepResult::Continue)
    }

    // ====================================================================
    // Arithmetic
    // ====================================================================

    /// Pops the right and then the left operand, applies `op` and pushes the result.
    ///
    /// # Errors
    ///
    /// Fails on stack underflow, unsupported operand tags and integer division by zero.
    pub(super) fn binary_op(&mut self, op: BinaryOp) -> Result<StepResult> {
        let right = self.pop()?;
        let left = self.pop()?;
        let result = left.binary_op(&right, op)?;
        self.push(result)?;
        Ok(StepResult::Continue)
    }

    /// Pops two operands and pushes `1` if `left op right` holds, `0` otherwise.
    pub(super) fn compare(&mut self, op: CompareOp) -> Result<StepResult> {
        let right = self.pop()?;
        let left = self.pop()?;
        let result = left.compare(&right, op)?;
        self.push(result)?;
        Ok(StepResult::Continue)
    }

    pub(super) fn convert(&mut self, conversion: ConversionType) -> Result<StepResult> {
        let value = self.pop()?;
        let result = value.convert(conversion)?;
        self.push(result)?;
        Ok(StepResult::Continue)
    }

    // ====================================================================
    // Branches
    // ====================================================================

    /// Pops a condition and branches if its truth value equals `expected`.
    ///
    /// Integers are true when non-zero; handles are true and null is false.
    ///
    /// # Errors
    ///
    /// Fails on stack underflow or a value without a truth value (floats).
    pub(super) fn branch_if(&mut self, target: u64, expected: bool) -> Result<StepResult> {
        let value = self.pop()?;
        let condition = value.as_condition().ok_or_else(|| {
            Self::operand_type_error(if expected { "brtrue" } else { "brfalse" }, &value)
        })?;

        if condition == expected {
            Ok(StepResult::Branch { target })
        } else {
            Ok(StepResult::Continue)
        }
    }

    // ====================================================================
    // Objects
    // ====================================================================

    /// `isinst`: pushes the popped handle if its runtime type is the target type or derives
    /// from it, null otherwise.
    ///
    /// A null operand yields null without touching the heap. Arrays are only instances of
    /// `System.Object`.
    ///
    /// # Errors
    ///
    /// Fails if the operand is not a reference or the target type is unknown.
    pub(super) fn is_instance(&mut self, instruction: &Instruction) -> Result<StepResult> {
        let target = instruction
            .get_type_operand()
            .ok_or_else(|| Self::invalid_operand(instruction, "type"))?;

        let heap_ref = match self.pop()? {
            EmValue::Null => {
                self.push(EmValue::Null)?;
                return Ok(StepResult::Continue);
            }
            EmValue::ObjectRef(heap_ref) => heap_ref,
            other => return Err(Self::operand_type_error("isinst", &other)),
        };

        self.catalog.resolve_type(target)?;
        let matches = match self.heap.get(heap_ref)? {
            HeapObject::Instance { type_handle, .. } => {
                self.catalog.is_assignable_to(type_handle, target)?
            }
            HeapObject::Array { .. } => *target == TypeRef::object(),
        };

        self.push(if matches {
            EmValue::ObjectRef(heap_ref)
        } else {
            EmValue::Null
        })?;
        Ok(StepResult::Continue)
    }

    /// `ldfld`: pops an instance and pushes the value of the named field.
    ///
    /// # Errors
    ///
    /// Fails if the field cannot be resolved, the operand is null, or the instance does not
    /// carry the field.
    pub(super) fn load_field(&mut self, instruction: &Instruction) -> Result<StepResult> {
        let field = instruction
            .get_field_operand()
            .ok_or_else(|| Self::invalid_operand(instruction, "field"))?;
        self.catalog.resolve_field(field)?;

        let heap_ref = self.pop_object("ldfld")?;
        let value = self.heap.get_field(heap_ref, &field.name)?;
        self.push(value)?;
        Ok(StepResult::Continue)
    }

    /// `stfld`: pops a value and an instance and stores the value into the named field.
    ///
    /// # Errors
    ///
    /// Fails if the field cannot be resolved, the instance is null, or the value does not fit
    /// the field's declared type.
    pub(super) fn store_field(&mut self, instruction: &Instruction) -> Result<StepResult> {
        let field = instruction
            .get_field_operand()
            .ok_or_else(|| Self::invalid_operand(instruction, "field"))?;
        let declared = self.catalog.resolve_field(field)?;
        let flavor = self.catalog.flavor_of(&declared.field_type)?;

        let value = self.pop()?;
        let heap_ref = self.pop_object("stfld")?;
        if !value.fits_flavor(flavor) {
            return Err(Self::operand_type_error(
                &format!("stfld {flavor} {}", field.name),
                &value,
            ));
        }

        self.heap.set_field(heap_ref, &field.name, value)?;
        Ok(StepResult::Continue)
    }

    /// `stind.ref`: pops a source and a destination instance and copies the source's `value`
    /// field into the destination.
    pub(super) fn store_indirect_ref(&mut self) -> Result<StepResult> {
        let source = self.pop_object("stind.ref")?;
        let destination = self.pop_object("stind.ref")?;

        let value = self.heap.get_field(source, STRING_VALUE_FIELD)?;
        self.heap.set_field(destination, STRING_VALUE_FIELD, value)?;
        Ok(StepResult::Continue)
    }

    // ====================================================================
    // Arrays
    // ====================================================================

    /// `newarr`: pops an element count and pushes a new zero-initialized array.
    ///
    /// # Errors
    ///
    /// Fails if the element type is unknown, the count is negative, or the count exceeds
    /// [`MAX_ARRAY_LENGTH`](crate::emulation::MAX_ARRAY_LENGTH).
    pub(super) fn new_array(&mut self, instruction: &Instruction) -> Result<StepResult> {
        let element_ref = instruction
            .get_type_operand()
            .ok_or_else(|| Self::invalid_operand(instruction, "type"))?;
        let element_type = self.catalog.resolve_type(element_ref)?;

        let count = self.pop_integer("newarr")?;
        if count < 0 {
            return Err(EmulationError::ArrayIndexOutOfBounds {
                index: count,
                length: 0,
            }
            .into());
        }
        let length = usize::try_from(count)
            .map_err(|_| EmulationError::ArrayTooLarge { length: count })?;

        let heap_ref = self.heap.alloc_array(element_type, length)?;
        self.stats.record_allocation();
        if self.tracing.trace_heap {
            log::trace!("newarr {element_ref}[{length}] -> {heap_ref}");
        }

        self.push(EmValue::ObjectRef(heap_ref))?;
        Ok(StepResult::Continue)
    }

    /// `ldlen`: pops an array and pushes its length.
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    pub(super) fn load_array_length(&mut self) -> Result<StepResult> {
        let heap_ref = self.pop_object("ldlen")?;
        let length = self.heap.array_length(heap_ref)?;
        self.push(EmValue::I32(length as i32))?;
        Ok(StepResult::Continue)
    }

    /// `ldelem.i1/i2/i4`: pops an index and an array and pushes the element, sign-extended
    /// from the access width.
    #[allow(clippy::cast_possible_truncation)]
    pub(super) fn load_element(&mut self, width: ElementWidth) -> Result<StepResult> {
        let index = self.pop_integer("ldelem")?;
        let heap_ref = self.pop_object("ldelem")?;

        let element = self.heap.get_element(heap_ref, index)?;
        let value = element
            .as_i32()
            .ok_or_else(|| Self::operand_type_error("ldelem", &element))?;
        let value = match width {
            ElementWidth::I1 => i32::from(value as i8),
            ElementWidth::I2 => i32::from(value as i16),
            ElementWidth::I4 => value,
        };

        self.push(EmValue::I32(value))?;
        Ok(StepResult::Continue)
    }

    /// `stelem.i1/i2/i4`: pops a value, an index and an array and stores the value truncated
    /// to the access width.
    #[allow(clippy::cast_possible_truncation)]
    pub(super) fn store_element(&mut self, width: ElementWidth) -> Result<StepResult> {
        let value = self.pop()?;
        let index = self.pop_integer("stelem")?;
        let heap_ref = self.pop_object("stelem")?;

        let value = value
            .as_i64()
            .ok_or_else(|| Self::operand_type_error("stelem", &value))?;
        let stored = match width {
            ElementWidth::I1 => i32::from(value as i8),
            ElementWidth::I2 => i32::from(value as i16),
            ElementWidth::I4 => value as i32,
        };

        self.heap.set_element(heap_ref, index, EmValue::I32(stored))?;
        Ok(StepResult::Continue)
    }

    /// `ldelem.ref` / `ldelema`: pops an index and a reference array and pushes the handle
    /// stored in the slot.
    ///
    /// A slot that was never written is filled on first read with a new default instance of
    /// the array's element type; later reads return that same handle.
    ///
    /// # Errors
    ///
    /// Fails if the array is null, is not a reference array, or the index is out of bounds.
    pub(super) fn load_element_ref(&mut self) -> Result<StepResult> {
        let index = self.pop_integer("ldelem.ref")?;
        let array = self.pop_object("ldelem.ref")?;

        let heap_ref = match self.heap.get_reference(array, index)? {
            Some(heap_ref) => heap_ref,
            None => {
                let element_type = self.heap.element_type(array)?;
                let heap_ref = self.allocate_object(element_type)?;
                self.heap.set_reference(array, index, Some(heap_ref))?;
                heap_ref
            }
        };

        self.push(EmValue::ObjectRef(heap_ref))?;
        Ok(StepResult::Continue)
    }

    /// `stelem.ref`: pops a handle (or null), an index and a reference array and stores the
    /// handle.
    pub(super) fn store_element_ref(&mut self) -> Result<StepResult> {
        let value = match self.pop()? {
            EmValue::ObjectRef(heap_ref) => Some(heap_ref),
            EmValue::Null => None,
            other => return Err(Self::operand_type_error("stelem.ref", &other)),
        };
        let index = self.pop_integer("stelem.ref")?;
        let array = self.pop_object("stelem.ref")?;

        self.heap.set_reference(array, index, value)?;
        Ok(StepResult::Continue)
    }
}
