//! Fluent assembly of method bodies.
//!
//! [`InstructionAssembler`] lays out instructions back to back using the encoded sizes from the
//! [opcode table](crate::assembly::opcodes), so the produced offsets match what a decoder would
//! report for the same body. Branches refer to named labels which are resolved when the body is
//! finished.
//!
//! # Usage Examples
//!
//! ```rust,no_run
//! use minclr::assembly::InstructionAssembler;
//!
//! // if (arg0 == 0) return 1; else return 2;
//! let mut asm = InstructionAssembler::new();
//! asm.ldarg(0)?
//!     .branch("brtrue.s", "other")?
//!     .ldc_i4(1)?
//!     .emit("ret")?
//!     .label("other")?
//!     .ldc_i4(2)?
//!     .emit("ret")?;
//!
//! let body = asm.finish()?;
//! assert_eq!(body.len(), 6);
//! # Ok::<(), minclr::Error>(())
//! ```

use rustc_hash::FxHashMap;

use crate::{
    assembly::{opcodes, Immediate, Instruction, InstructionStream, Operand},
    metadata::{FieldRef, MethodRef, TypeRef},
    Error, Result,
};

/// A branch whose target label is resolved in [`InstructionAssembler::finish`].
#[derive(Debug, Clone)]
struct LabelFixup {
    /// Index of the branch instruction
    index: usize,
    /// Name of the referenced label
    label: String,
}

/// Builds an [`InstructionStream`] one instruction at a time.
///
/// Every emitting method returns `Result<&mut Self>` so calls can be chained with `?`.
#[derive(Debug, Default)]
pub struct InstructionAssembler {
    instructions: Vec<Instruction>,
    labels: FxHashMap<String, u64>,
    fixups: Vec<LabelFixup>,
    position: u64,
}

impl InstructionAssembler {
    /// Creates an empty assembler positioned at offset 0.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the offset the next instruction will be placed at.
    #[must_use]
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Emits an instruction that takes no operand.
    ///
    /// # Errors
    ///
    /// Returns an error if the mnemonic is unknown or expects an operand.
    pub fn emit(&mut self, mnemonic: &str) -> Result<&mut Self> {
        self.emit_with(mnemonic, Operand::None)
    }

    /// Emits an instruction with an explicit operand.
    ///
    /// # Arguments
    ///
    /// * `mnemonic` - A mnemonic from the opcode table
    /// * `operand` - The operand, which must match the opcode's operand kind
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotSupported`] for unknown mnemonics and [`Error::Malformed`] if the
    /// operand does not fit the opcode.
    pub fn emit_with(&mut self, mnemonic: &str, operand: Operand) -> Result<&mut Self> {
        let Some(info) = opcodes::lookup(mnemonic) else {
            return Err(Error::NotSupported(format!("mnemonic '{mnemonic}'")));
        };
        if !info.operand.accepts(&operand) {
            return Err(malformed_error!(
                "Operand '{}' does not fit {} (expected {:?})",
                operand,
                mnemonic,
                info.operand
            ));
        }

        let size = u64::from(info.size);
        self.instructions.push(Instruction::new(
            self.position,
            size,
            info.mnemonic,
            info.flow_type,
            operand,
        ));
        self.position += size;
        Ok(self)
    }

    /// Appends an instruction verbatim, bypassing the opcode table.
    ///
    /// The position advances past the instruction's end. This is the way to produce bodies the
    /// table does not describe, such as unknown mnemonics or unusual flow categories.
    pub fn emit_raw(&mut self, instruction: Instruction) -> &mut Self {
        self.position = self.position.max(instruction.next_offset());
        self.instructions.push(instruction);
        self
    }

    /// Emits the shortest `ldc.i4` form for `value`.
    ///
    /// # Errors
    ///
    /// Never fails for well-formed input; the `Result` matches the other emitters.
    pub fn ldc_i4(&mut self, value: i32) -> Result<&mut Self> {
        match value {
            -1 => self.emit("ldc.i4.m1"),
            0 => self.emit("ldc.i4.0"),
            1 => self.emit("ldc.i4.1"),
            2 => self.emit("ldc.i4.2"),
            3 => self.emit("ldc.i4.3"),
            4 => self.emit("ldc.i4.4"),
            5 => self.emit("ldc.i4.5"),
            6 => self.emit("ldc.i4.6"),
            7 => self.emit("ldc.i4.7"),
            8 => self.emit("ldc.i4.8"),
            _ => match i8::try_from(value) {
                Ok(short) => self.emit_with("ldc.i4.s", Operand::Immediate(Immediate::Int8(short))),
                Err(_) => self.emit_with("ldc.i4", Operand::Immediate(Immediate::Int32(value))),
            },
        }
    }

    /// Emits the shortest `ldarg` form for `index`.
    ///
    /// # Errors
    ///
    /// Never fails for well-formed input; the `Result` matches the other emitters.
    pub fn ldarg(&mut self, index: u16) -> Result<&mut Self> {
        match index {
            0 => self.emit("ldarg.0"),
            1 => self.emit("ldarg.1"),
            2 => self.emit("ldarg.2"),
            3 => self.emit("ldarg.3"),
            4..=255 => self.emit_with("ldarg.s", Operand::Argument(index)),
            _ => self.emit_with("ldarg", Operand::Argument(index)),
        }
    }

    /// Emits the shortest `ldloc` form for `index`.
    ///
    /// # Errors
    ///
    /// Never fails for well-formed input; the `Result` matches the other emitters.
    pub fn ldloc(&mut self, index: u16) -> Result<&mut Self> {
        match index {
            0 => self.emit("ldloc.0"),
            1 => self.emit("ldloc.1"),
            2 => self.emit("ldloc.2"),
            3 => self.emit("ldloc.3"),
            4..=255 => self.emit_with("ldloc.s", Operand::Local(index)),
            _ => self.emit_with("ldloc", Operand::Local(index)),
        }
    }

    /// Emits the shortest `stloc` form for `index`.
    ///
    /// # Errors
    ///
    /// Never fails for well-formed input; the `Result` matches the other emitters.
    pub fn stloc(&mut self, index: u16) -> Result<&mut Self> {
        match index {
            0 => self.emit("stloc.0"),
            1 => self.emit("stloc.1"),
            2 => self.emit("stloc.2"),
            3 => self.emit("stloc.3"),
            4..=255 => self.emit_with("stloc.s", Operand::Local(index)),
            _ => self.emit_with("stloc", Operand::Local(index)),
        }
    }

    /// Emits `ldstr` for a string literal.
    ///
    /// # Errors
    ///
    /// Never fails for well-formed input; the `Result` matches the other emitters.
    pub fn ldstr(&mut self, value: impl Into<String>) -> Result<&mut Self> {
        self.emit_with("ldstr", Operand::String(value.into()))
    }

    /// Emits `call` for a method reference.
    ///
    /// # Errors
    ///
    /// Never fails for well-formed input; the `Result` matches the other emitters.
    pub fn call(&mut self, method: MethodRef) -> Result<&mut Self> {
        self.emit_with("call", Operand::Method(method))
    }

    /// Emits `callvirt` for a method reference.
    ///
    /// # Errors
    ///
    /// Never fails for well-formed input; the `Result` matches the other emitters.
    pub fn callvirt(&mut self, method: MethodRef) -> Result<&mut Self> {
        self.emit_with("callvirt", Operand::Method(method))
    }

    /// Emits `newobj` for a constructor reference.
    ///
    /// # Errors
    ///
    /// Never fails for well-formed input; the `Result` matches the other emitters.
    pub fn newobj(&mut self, constructor: MethodRef) -> Result<&mut Self> {
        self.emit_with("newobj", Operand::Method(constructor))
    }

    /// Emits `newarr` for an element type.
    ///
    /// # Errors
    ///
    /// Never fails for well-formed input; the `Result` matches the other emitters.
    pub fn newarr(&mut self, element_type: TypeRef) -> Result<&mut Self> {
        self.emit_with("newarr", Operand::Type(element_type))
    }

    /// Emits `isinst` for a target type.
    ///
    /// # Errors
    ///
    /// Never fails for well-formed input; the `Result` matches the other emitters.
    pub fn isinst(&mut self, target: TypeRef) -> Result<&mut Self> {
        self.emit_with("isinst", Operand::Type(target))
    }

    /// Emits `ldfld` for a field reference.
    ///
    /// # Errors
    ///
    /// Never fails for well-formed input; the `Result` matches the other emitters.
    pub fn ldfld(&mut self, field: FieldRef) -> Result<&mut Self> {
        self.emit_with("ldfld", Operand::Field(field))
    }

    /// Emits `stfld` for a field reference.
    ///
    /// # Errors
    ///
    /// Never fails for well-formed input; the `Result` matches the other emitters.
    pub fn stfld(&mut self, field: FieldRef) -> Result<&mut Self> {
        self.emit_with("stfld", Operand::Field(field))
    }

    /// Emits a branch to a named label.
    ///
    /// The label may be defined before or after the branch.
    ///
    /// # Errors
    ///
    /// Returns an error if `mnemonic` is not a branch opcode.
    pub fn branch(&mut self, mnemonic: &str, label: &str) -> Result<&mut Self> {
        match opcodes::lookup(mnemonic) {
            Some(info) if info.flow_type.is_branch() => {}
            _ => return Err(malformed_error!("'{}' is not a branch instruction", mnemonic)),
        }

        self.fixups.push(LabelFixup {
            index: self.instructions.len(),
            label: label.to_string(),
        });
        self.emit_with(mnemonic, Operand::Target(0))
    }

    /// Defines a label at the current position.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Malformed`] if the label already exists.
    pub fn label(&mut self, name: &str) -> Result<&mut Self> {
        if self.labels.insert(name.to_string(), self.position).is_some() {
            return Err(malformed_error!("Label '{}' defined twice", name));
        }
        Ok(self)
    }

    /// Resolves all labels and produces the body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Malformed`] if a branch refers to an undefined label or offsets collide.
    pub fn finish(mut self) -> Result<InstructionStream> {
        for fixup in &self.fixups {
            let Some(target) = self.labels.get(&fixup.label) else {
                return Err(malformed_error!("Undefined label '{}'", fixup.label));
            };
            if let Some(instruction) = self.instructions.get_mut(fixup.index) {
                instruction.operand = Operand::Target(*target);
            }
        }

        InstructionStream::new(self.instructions)
    }
}
