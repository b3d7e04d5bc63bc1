//! Method body instruction streams.
//!
//! An [`InstructionStream`] owns the ordered instructions of one method body together with the
//! mapping from byte offset to sequence index. The mapping is built once, when the stream is
//! created, so that branch targets resolve in constant time however often the body runs.

use std::{ops::Index, slice};

use rustc_hash::FxHashMap;

use crate::{assembly::Instruction, Result};

/// The ordered instructions of one method body.
///
/// # Examples
///
/// ```rust,no_run
/// use minclr::assembly::{FlowType, Instruction, InstructionStream, Operand};
///
/// let stream = InstructionStream::new(vec![
///     Instruction::new(0, 1, "nop", FlowType::Sequential, Operand::None),
///     Instruction::new(1, 1, "ret", FlowType::Return, Operand::None),
/// ])?;
/// assert_eq!(stream.index_of(1), Some(1));
/// assert_eq!(stream.index_of(2), None);
/// # Ok::<(), minclr::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct InstructionStream {
    instructions: Vec<Instruction>,
    offsets: FxHashMap<u64, usize>,
}

impl InstructionStream {
    /// Creates a stream from decoded instructions.
    ///
    /// # Arguments
    ///
    /// * `instructions` - The body, in execution order
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] if two instructions share an offset.
    pub fn new(instructions: Vec<Instruction>) -> Result<Self> {
        let mut offsets =
            FxHashMap::with_capacity_and_hasher(instructions.len(), Default::default());
        for (index, instruction) in instructions.iter().enumerate() {
            if offsets.insert(instruction.offset, index).is_some() {
                return Err(malformed_error!(
                    "Duplicate instruction offset IL_{:04X}",
                    instruction.offset
                ));
            }
        }

        Ok(InstructionStream {
            instructions,
            offsets,
        })
    }

    /// Creates an empty stream.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Resolves a byte offset to a sequence index.
    #[must_use]
    pub fn index_of(&self, offset: u64) -> Option<usize> {
        self.offsets.get(&offset).copied()
    }

    /// Returns the instruction at sequence index `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Instruction> {
        self.instructions.get(index)
    }

    /// Returns the number of instructions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Returns `true` if the body contains no instructions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Returns an iterator over the instructions.
    pub fn iter(&self) -> slice::Iter<'_, Instruction> {
        self.instructions.iter()
    }

    /// Returns the instructions as a slice.
    #[must_use]
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }
}

impl Index<usize> for InstructionStream {
    type Output = Instruction;

    fn index(&self, index: usize) -> &Self::Output {
        &self.instructions[index]
    }
}

impl<'a> IntoIterator for &'a InstructionStream {
    type Item = &'a Instruction;
    type IntoIter = slice::Iter<'a, Instruction>;

    fn into_iter(self) -> Self::IntoIter {
        self.instructions.iter()
    }
}
