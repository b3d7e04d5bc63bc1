//! Opcode table for the supported instruction subset.
//!
//! Each entry records a mnemonic's encoded size (prefix byte included), its flow-control
//! category and the kind of operand it takes. [`crate::assembly::InstructionAssembler`] uses the
//! table to lay out realistic offsets and to classify emitted instructions; the dispatch engine
//! relies only on the flow type and mnemonic carried by each [`crate::assembly::Instruction`].
//!
//! `throw` and `break` are listed so their flow categories can be produced; the engine rejects
//! them at execution time.

use crate::assembly::{FlowType, Immediate, Operand};

/// The kind of operand an opcode expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandType {
    /// No operand
    None,
    /// Signed 8-bit immediate
    Int8,
    /// Unsigned 8-bit index
    UInt8,
    /// Unsigned 16-bit index
    UInt16,
    /// Signed 32-bit immediate
    Int32,
    /// Branch target
    Target,
    /// String literal
    String,
    /// Field reference
    Field,
    /// Type reference
    Type,
    /// Method or constructor reference
    Method,
}

impl OperandType {
    /// Checks whether `operand` is acceptable for this operand type.
    #[must_use]
    pub fn accepts(&self, operand: &Operand) -> bool {
        match (self, operand) {
            (OperandType::None, Operand::None)
            | (OperandType::Target, Operand::Target(_))
            | (OperandType::String, Operand::String(_))
            | (OperandType::Field, Operand::Field(_))
            | (OperandType::Type, Operand::Type(_))
            | (OperandType::Method, Operand::Method(_)) => true,
            (OperandType::Int8, Operand::Immediate(Immediate::Int8(_) | Immediate::UInt8(_))) => {
                true
            }
            (OperandType::Int32, Operand::Immediate(Immediate::Int32(_))) => true,
            (
                OperandType::UInt8,
                Operand::Local(idx)
                | Operand::Argument(idx)
                | Operand::Immediate(Immediate::UInt16(idx)),
            ) => *idx <= u16::from(u8::MAX),
            (OperandType::UInt8, Operand::Immediate(Immediate::UInt8(_))) => true,
            (
                OperandType::UInt16,
                Operand::Local(_)
                | Operand::Argument(_)
                | Operand::Immediate(Immediate::UInt8(_) | Immediate::UInt16(_)),
            ) => true,
            _ => false,
        }
    }
}

/// Static description of one opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpcodeInfo {
    /// Mnemonic as it appears in decoded instructions
    pub mnemonic: &'static str,
    /// Encoded size in bytes, including prefix and operand
    pub size: u8,
    /// Flow-control category
    pub flow_type: FlowType,
    /// Expected operand kind
    pub operand: OperandType,
}

const fn op(
    mnemonic: &'static str,
    size: u8,
    flow_type: FlowType,
    operand: OperandType,
) -> OpcodeInfo {
    OpcodeInfo {
        mnemonic,
        size,
        flow_type,
        operand,
    }
}

use FlowType::{Call, ConditionalBranch, Return, Sequential, UnconditionalBranch};
use OperandType as Op;

/// All opcodes known to the assembler.
pub static OPCODES: &[OpcodeInfo] = &[
    // Misc
    op("nop", 1, Sequential, Op::None),
    op("break", 1, FlowType::Break, Op::None),
    op("dup", 1, Sequential, Op::None),
    op("pop", 1, Sequential, Op::None),
    // Arguments
    op("ldarg.0", 1, Sequential, Op::None),
    op("ldarg.1", 1, Sequential, Op::None),
    op("ldarg.2", 1, Sequential, Op::None),
    op("ldarg.3", 1, Sequential, Op::None),
    op("ldarg.s", 2, Sequential, Op::UInt8),
    op("ldarg", 4, Sequential, Op::UInt16),
    // Locals
    op("ldloc.0", 1, Sequential, Op::None),
    op("ldloc.1", 1, Sequential, Op::None),
    op("ldloc.2", 1, Sequential, Op::None),
    op("ldloc.3", 1, Sequential, Op::None),
    op("ldloc.s", 2, Sequential, Op::UInt8),
    op("ldloc", 4, Sequential, Op::UInt16),
    op("stloc.0", 1, Sequential, Op::None),
    op("stloc.1", 1, Sequential, Op::None),
    op("stloc.2", 1, Sequential, Op::None),
    op("stloc.3", 1, Sequential, Op::None),
    op("stloc.s", 2, Sequential, Op::UInt8),
    op("stloc", 4, Sequential, Op::UInt16),
    // Constants
    op("ldc.i4.m1", 1, Sequential, Op::None),
    op("ldc.i4.0", 1, Sequential, Op::None),
    op("ldc.i4.1", 1, Sequential, Op::None),
    op("ldc.i4.2", 1, Sequential, Op::None),
    op("ldc.i4.3", 1, Sequential, Op::None),
    op("ldc.i4.4", 1, Sequential, Op::None),
    op("ldc.i4.5", 1, Sequential, Op::None),
    op("ldc.i4.6", 1, Sequential, Op::None),
    op("ldc.i4.7", 1, Sequential, Op::None),
    op("ldc.i4.8", 1, Sequential, Op::None),
    op("ldc.i4.s", 2, Sequential, Op::Int8),
    op("ldc.i4", 5, Sequential, Op::Int32),
    op("ldstr", 5, Sequential, Op::String),
    // Arithmetic and comparison
    op("add", 1, Sequential, Op::None),
    op("sub", 1, Sequential, Op::None),
    op("div", 1, Sequential, Op::None),
    op("ceq", 2, Sequential, Op::None),
    op("cgt", 2, Sequential, Op::None),
    op("clt", 2, Sequential, Op::None),
    // Conversions
    op("conv.i1", 1, Sequential, Op::None),
    op("conv.i2", 1, Sequential, Op::None),
    op("conv.i4", 1, Sequential, Op::None),
    op("conv.i8", 1, Sequential, Op::None),
    op("conv.u1", 1, Sequential, Op::None),
    op("conv.u2", 1, Sequential, Op::None),
    op("conv.u4", 1, Sequential, Op::None),
    op("conv.u8", 1, Sequential, Op::None),
    op("conv.r4", 1, Sequential, Op::None),
    op("conv.r8", 1, Sequential, Op::None),
    // Objects
    op("isinst", 5, Sequential, Op::Type),
    op("ldfld", 5, Sequential, Op::Field),
    op("stfld", 5, Sequential, Op::Field),
    op("stind.ref", 1, Sequential, Op::None),
    // Arrays
    op("newarr", 5, Sequential, Op::Type),
    op("ldlen", 1, Sequential, Op::None),
    op("ldelem.i1", 1, Sequential, Op::None),
    op("ldelem.i2", 1, Sequential, Op::None),
    op("ldelem.i4", 1, Sequential, Op::None),
    op("ldelem.ref", 1, Sequential, Op::None),
    op("ldelema", 5, Sequential, Op::Type),
    op("stelem.i1", 1, Sequential, Op::None),
    op("stelem.i2", 1, Sequential, Op::None),
    op("stelem.i4", 1, Sequential, Op::None),
    op("stelem.ref", 1, Sequential, Op::None),
    // Calls
    op("call", 5, Call, Op::Method),
    op("callvirt", 5, Call, Op::Method),
    op("newobj", 5, Call, Op::Method),
    // Branches
    op("br.s", 2, UnconditionalBranch, Op::Target),
    op("br", 5, UnconditionalBranch, Op::Target),
    op("brfalse.s", 2, ConditionalBranch, Op::Target),
    op("brfalse", 5, ConditionalBranch, Op::Target),
    op("brtrue.s", 2, ConditionalBranch, Op::Target),
    op("brtrue", 5, ConditionalBranch, Op::Target),
    // Return and exceptions
    op("ret", 1, Return, Op::None),
    op("throw", 1, FlowType::Throw, Op::None),
];

/// Looks up the table entry for `mnemonic`.
///
/// # Arguments
///
/// * `mnemonic` - The opcode mnemonic (e.g. `"brtrue.s"`)
#[must_use]
pub fn lookup(mnemonic: &str) -> Option<&'static OpcodeInfo> {
    OPCODES.iter().find(|info| info.mnemonic == mnemonic)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustc_hash::FxHashSet;

    #[test]
    fn test_mnemonics_unique() {
        let mut seen = FxHashSet::default();
        for info in OPCODES {
            assert!(seen.insert(info.mnemonic), "duplicate {}", info.mnemonic);
        }
    }

    #[test]
    fn test_lookup() {
        let info = lookup("brtrue.s").unwrap();
        assert_eq!(info.size, 2);
        assert_eq!(info.flow_type, FlowType::ConditionalBranch);
        assert!(lookup("ldnull").is_none());
    }

    #[test]
    fn test_operand_acceptance() {
        assert!(OperandType::UInt8.accepts(&Operand::Local(3)));
        assert!(!OperandType::UInt8.accepts(&Operand::Local(300)));
        assert!(OperandType::UInt16.accepts(&Operand::Argument(300)));
        assert!(OperandType::Int8.accepts(&Operand::Immediate(Immediate::Int8(-1))));
        assert!(!OperandType::Int32.accepts(&Operand::Immediate(Immediate::Int8(1))));
        assert!(!OperandType::None.accepts(&Operand::Target(0)));
    }
}
