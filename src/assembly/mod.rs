//! Decoded instructions, method body streams and the instruction assembler.
//!
//! # Key Components
//!
//! - [`Instruction`] / [`Operand`] / [`FlowType`] - The decoded instruction model
//! - [`InstructionStream`] - One method body with its offset-to-index lookup
//! - [`InstructionAssembler`] - Lays out bodies with correct offsets and resolved labels
//! - [`opcodes`] - Size, flow category and operand kind of every known mnemonic

mod assembler;
mod instruction;
pub mod opcodes;
mod stream;

pub use assembler::InstructionAssembler;
pub use instruction::{FlowType, Immediate, Instruction, Operand};
pub use opcodes::{OpcodeInfo, OperandType};
pub use stream::InstructionStream;
