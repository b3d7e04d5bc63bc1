//! Decoded CIL instruction representation.
//!
//! This module defines the structured form in which method bodies reach the engine. Decoding
//! raw bytecode is not part of this crate: a producer hands over instructions that already carry
//! their byte offset, mnemonic, flow-control category and a symbolic operand.
//!
//! # Key Components
//!
//! - [`Instruction`] - One decoded instruction
//! - [`Operand`] - Tagged operand union (immediates, strings, jump targets, catalog references)
//! - [`Immediate`] - Immediate constants with their encoded width
//! - [`FlowType`] - Flow-control category driving dispatch routing
//!
//! # Producer Contract
//!
//! Within one body, offsets are unique and every [`Operand::Target`] names the offset of some
//! instruction of the same body. Violations are detected by the engine and reported as fatal
//! failures rather than trusted.

use std::fmt;

use strum::{Display, IntoStaticStr};

use crate::metadata::{FieldRef, MethodRef, TypeRef};

/// Immediate constant carried by an instruction.
///
/// The variant records the encoded width; the accessors on [`Instruction`] widen or reinterpret
/// as the consuming opcode requires.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Immediate {
    /// Signed 8-bit immediate value
    Int8(i8),
    /// Unsigned 8-bit immediate value
    UInt8(u8),
    /// Unsigned 16-bit immediate value
    UInt16(u16),
    /// Signed 32-bit immediate value
    Int32(i32),
    /// Signed 64-bit immediate value
    Int64(i64),
    /// 32-bit floating point immediate value
    Float32(f32),
    /// 64-bit floating point immediate value
    Float64(f64),
}

impl fmt::Display for Immediate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Immediate::Int8(value) => write!(f, "{value}"),
            Immediate::UInt8(value) => write!(f, "{value}"),
            Immediate::UInt16(value) => write!(f, "{value}"),
            Immediate::Int32(value) => write!(f, "{value}"),
            Immediate::Int64(value) => write!(f, "{value}"),
            Immediate::Float32(value) => write!(f, "{value}"),
            Immediate::Float64(value) => write!(f, "{value}"),
        }
    }
}

/// How an instruction affects control flow.
///
/// The dispatch engine routes [`FlowType::Sequential`], [`FlowType::Call`], the two branch
/// categories and [`FlowType::Return`] to their handler families. Every other category is
/// rejected as an unsupported operation.
///
/// # Examples
///
/// ```rust,no_run
/// use minclr::assembly::FlowType;
///
/// assert_eq!(FlowType::ConditionalBranch.to_string(), "ConditionalBranch");
/// assert!(FlowType::Throw.is_unsupported());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr)]
pub enum FlowType {
    /// Normal execution continues to next instruction
    Sequential,
    /// Conditional branch to another location
    ConditionalBranch,
    /// Always branches to another location (unconditional jump)
    UnconditionalBranch,
    /// Call to another method
    Call,
    /// Returns from current method
    Return,
    /// Exception throwing
    Throw,
    /// Debugger breakpoint
    Break,
    /// Prefix or other meta instruction
    Meta,
    /// Any category the producer could not classify
    Unsupported,
}

impl FlowType {
    /// Returns `true` if the engine refuses to execute instructions of this category.
    #[must_use]
    pub fn is_unsupported(&self) -> bool {
        matches!(
            self,
            FlowType::Throw | FlowType::Break | FlowType::Meta | FlowType::Unsupported
        )
    }

    /// Returns `true` for both branch categories.
    #[must_use]
    pub fn is_branch(&self) -> bool {
        matches!(
            self,
            FlowType::ConditionalBranch | FlowType::UnconditionalBranch
        )
    }
}

/// Operand of a decoded instruction.
///
/// References to fields, types and methods are symbolic: they name catalog entries and are
/// resolved through [`crate::metadata::Catalog`] when the instruction executes.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// No operand present
    None,
    /// Immediate constant
    Immediate(Immediate),
    /// String literal (`ldstr`)
    String(String),
    /// Absolute jump-target offset within the same body
    Target(u64),
    /// Local variable index
    Local(u16),
    /// Argument index
    Argument(u16),
    /// Field reference (`ldfld`, `stfld`)
    Field(FieldRef),
    /// Type reference (`newarr`, `isinst`, `ldelema`)
    Type(TypeRef),
    /// Method or constructor reference (`call`, `callvirt`, `newobj`)
    Method(MethodRef),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::None => Ok(()),
            Operand::Immediate(imm) => write!(f, "{imm}"),
            Operand::String(value) => write!(f, "{value:?}"),
            Operand::Target(target) => write!(f, "IL_{target:04X}"),
            Operand::Local(index) => write!(f, "V_{index}"),
            Operand::Argument(index) => write!(f, "A_{index}"),
            Operand::Field(field) => write!(f, "{field}"),
            Operand::Type(ty) => write!(f, "{ty}"),
            Operand::Method(method) => write!(f, "{method}"),
        }
    }
}

/// A decoded CIL instruction.
///
/// Instructions are immutable once produced. `size` is the encoded length in bytes and is only
/// used to compute the offset of the following instruction; the engine itself never inspects it.
#[derive(Clone, PartialEq)]
pub struct Instruction {
    /// Byte offset of this instruction from the start of the method body
    pub offset: u64,
    /// Encoded size in bytes
    pub size: u64,
    /// Opcode mnemonic (e.g. `ldc.i4.s`)
    pub mnemonic: String,
    /// Flow-control category
    pub flow_type: FlowType,
    /// Symbolic operand
    pub operand: Operand,
}

impl Instruction {
    /// Creates a new instruction.
    ///
    /// # Arguments
    ///
    /// * `offset` - Byte offset within the method body
    /// * `size` - Encoded size in bytes
    /// * `mnemonic` - Opcode mnemonic
    /// * `flow_type` - Flow-control category
    /// * `operand` - Symbolic operand
    #[must_use]
    pub fn new(
        offset: u64,
        size: u64,
        mnemonic: impl Into<String>,
        flow_type: FlowType,
        operand: Operand,
    ) -> Self {
        Instruction {
            offset,
            size,
            mnemonic: mnemonic.into(),
            flow_type,
            operand,
        }
    }

    /// Returns the offset of the instruction that follows this one.
    #[must_use]
    pub fn next_offset(&self) -> u64 {
        self.offset + self.size
    }

    /// Extracts a u16 index operand (locals and arguments).
    ///
    /// Returns `None` if the operand is not a suitable type for u16 extraction.
    #[must_use]
    pub fn get_u16_operand(&self) -> Option<u16> {
        match &self.operand {
            Operand::Local(idx) | Operand::Argument(idx) => Some(*idx),
            Operand::Immediate(Immediate::UInt8(v)) => Some(u16::from(*v)),
            Operand::Immediate(Immediate::UInt16(v)) => Some(*v),
            Operand::Immediate(Immediate::Int8(v)) => u16::try_from(*v).ok(),
            Operand::Immediate(Immediate::Int32(v)) => u16::try_from(*v).ok(),
            Operand::Immediate(Immediate::Int64(v)) => u16::try_from(*v).ok(),
            _ => None,
        }
    }

    /// Extracts an i32 operand from the instruction.
    ///
    /// Returns `None` if the operand is not an integer immediate that fits in 32 bits.
    #[must_use]
    pub fn get_i32_operand(&self) -> Option<i32> {
        match &self.operand {
            Operand::Immediate(Immediate::Int32(v)) => Some(*v),
            Operand::Immediate(Immediate::Int8(v)) => Some(i32::from(*v)),
            // Reinterpret u8 bits as i8 (CIL semantics)
            Operand::Immediate(Immediate::UInt8(v)) => {
                Some(i32::from(i8::from_ne_bytes(v.to_ne_bytes())))
            }
            Operand::Immediate(Immediate::UInt16(v)) => Some(i32::from(*v)),
            Operand::Immediate(Immediate::Int64(v)) => i32::try_from(*v).ok(),
            _ => None,
        }
    }

    /// Returns the jump-target offset of a branch instruction.
    #[must_use]
    pub fn get_branch_target(&self) -> Option<u64> {
        match &self.operand {
            Operand::Target(target) => Some(*target),
            _ => None,
        }
    }

    /// Returns the string literal operand.
    #[must_use]
    pub fn get_string_operand(&self) -> Option<&str> {
        match &self.operand {
            Operand::String(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the field reference operand.
    #[must_use]
    pub fn get_field_operand(&self) -> Option<&FieldRef> {
        match &self.operand {
            Operand::Field(field) => Some(field),
            _ => None,
        }
    }

    /// Returns the type reference operand.
    #[must_use]
    pub fn get_type_operand(&self) -> Option<&TypeRef> {
        match &self.operand {
            Operand::Type(ty) => Some(ty),
            _ => None,
        }
    }

    /// Returns the method reference operand.
    #[must_use]
    pub fn get_method_operand(&self) -> Option<&MethodRef> {
        match &self.operand {
            Operand::Method(method) => Some(method),
            _ => None,
        }
    }
}

impl fmt::Debug for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IL_{:04X}: {:<12}", self.offset, self.mnemonic)?;
        if self.operand != Operand::None {
            write!(f, " {}", self.operand)?;
        }
        write!(f, " [{}]", self.flow_type)
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IL_{:04X}: {}", self.offset, self.mnemonic)?;
        if self.operand != Operand::None {
            write!(f, " {}", self.operand)?;
        }
        Ok(())
    }
}
