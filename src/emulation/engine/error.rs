//! Execution failures.
//!
//! Every [`EmulationError`] is fatal: the dispatch engine aborts the current invocation and all
//! nested frames and hands the error to the top-level caller. [`EmulationError::kind`] maps each
//! variant onto the coarse [`ErrorKind`] taxonomy.

use std::fmt;

use strum::Display;

use crate::assembly::FlowType;

/// Coarse classification of an [`EmulationError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum ErrorKind {
    /// An instruction's flow-control category or mnemonic is not implemented.
    UnsupportedOperation,
    /// A type, method, constructor, field, override or heap object could not be found.
    ResolutionFailure,
    /// A call would exceed the maximum call depth.
    StackDepthExceeded,
    /// A method unwound without leaving exactly its return value.
    InconsistentReturn,
    /// The executed code violated a runtime invariant (stack underflow, bad operand types,
    /// null dereference, out-of-range index and similar).
    InvalidProgram,
}

/// A fatal failure raised while executing.
#[derive(Debug, Clone, PartialEq)]
pub enum EmulationError {
    /// The flow-control category or mnemonic is not implemented.
    UnsupportedOperation {
        /// The offending mnemonic.
        mnemonic: String,
        /// Its flow-control category.
        flow_type: FlowType,
    },

    /// A symbolic reference could not be resolved.
    ResolutionFailure {
        /// What was being looked up (`"type"`, `"method"`, `"virtual override"`, ...).
        what: &'static str,
        /// The reference that was not found.
        reference: String,
    },

    /// A frame push would exceed the maximum call depth.
    StackDepthExceeded {
        /// The depth the push would have reached.
        depth: usize,
        /// The configured maximum.
        limit: usize,
    },

    /// A method left no return value, or extra values, on its evaluation stack.
    InconsistentReturn {
        /// The method and what it left behind.
        method: String,
    },

    /// An operation needed more values than the evaluation stack holds.
    StackUnderflow,

    /// No frame is active.
    NoActiveFrame,

    /// Local variable index out of range.
    LocalIndexOutOfBounds {
        /// The requested slot.
        index: usize,
        /// The number of slots.
        count: usize,
    },

    /// Argument index out of range.
    ArgumentIndexOutOfBounds {
        /// The requested slot.
        index: usize,
        /// The number of arguments.
        count: usize,
    },

    /// A branch target does not match any instruction offset in the method body.
    InvalidBranchTarget {
        /// The target offset.
        target: u64,
    },

    /// An instruction carries an operand of the wrong kind.
    InvalidOperand {
        /// The instruction mnemonic.
        instruction: String,
        /// The expected operand kind.
        expected: &'static str,
    },

    /// An operation does not support the given operand types.
    InvalidOperationTypes {
        /// The operation.
        operation: String,
        /// The tags of the operands it received.
        operand_types: String,
    },

    /// A null reference was dereferenced.
    NullReference,

    /// Array index out of range.
    ArrayIndexOutOfBounds {
        /// The requested index.
        index: i64,
        /// The array length.
        length: usize,
    },

    /// An array length beyond the runtime's ceiling, or one the host could not reserve.
    ArrayTooLarge {
        /// The requested element count.
        length: i64,
    },

    /// A heap object or stored value has the wrong shape for the operation.
    HeapTypeMismatch {
        /// The expected shape.
        expected: &'static str,
        /// The shape found.
        found: &'static str,
    },

    /// Integer division by zero.
    DivideByZero,

    /// A failure raised by a specific instruction.
    ///
    /// Applied once, at the innermost frame; outer frames propagate it unchanged.
    InstructionFault {
        /// The method containing the instruction.
        method: String,
        /// The instruction offset.
        offset: u64,
        /// The instruction mnemonic.
        mnemonic: String,
        /// The underlying failure.
        source: Box<EmulationError>,
    },
}

impl EmulationError {
    /// Creates a [`EmulationError::ResolutionFailure`].
    pub fn unresolved(what: &'static str, reference: impl fmt::Display) -> Self {
        EmulationError::ResolutionFailure {
            what,
            reference: reference.to_string(),
        }
    }

    /// Classifies the error, looking through [`EmulationError::InstructionFault`].
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self.root_cause() {
            EmulationError::UnsupportedOperation { .. } => ErrorKind::UnsupportedOperation,
            EmulationError::ResolutionFailure { .. } => ErrorKind::ResolutionFailure,
            EmulationError::StackDepthExceeded { .. } => ErrorKind::StackDepthExceeded,
            EmulationError::InconsistentReturn { .. } => ErrorKind::InconsistentReturn,
            _ => ErrorKind::InvalidProgram,
        }
    }

    /// Returns the failure without its instruction context.
    #[must_use]
    pub fn root_cause(&self) -> &EmulationError {
        let mut current = self;
        while let EmulationError::InstructionFault { source, .. } = current {
            current = source;
        }
        current
    }

    /// Returns `true` if the error already carries instruction context.
    #[must_use]
    pub fn is_located(&self) -> bool {
        matches!(self, EmulationError::InstructionFault { .. })
    }
}

impl fmt::Display for EmulationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmulationError::UnsupportedOperation {
                mnemonic,
                flow_type,
            } => write!(f, "unsupported instruction '{mnemonic}' ({flow_type})"),
            EmulationError::ResolutionFailure { what, reference } => {
                write!(f, "unresolved {what}: {reference}")
            }
            EmulationError::StackDepthExceeded { depth, limit } => {
                write!(f, "call depth {depth} exceeds limit of {limit}")
            }
            EmulationError::InconsistentReturn { method } => {
                write!(f, "inconsistent return: {method}")
            }
            EmulationError::StackUnderflow => write!(f, "evaluation stack underflow"),
            EmulationError::NoActiveFrame => write!(f, "no active frame"),
            EmulationError::LocalIndexOutOfBounds { index, count } => {
                write!(f, "local {index} out of range ({count} locals)")
            }
            EmulationError::ArgumentIndexOutOfBounds { index, count } => {
                write!(f, "argument {index} out of range ({count} arguments)")
            }
            EmulationError::InvalidBranchTarget { target } => {
                write!(f, "branch target IL_{target:04X} is not an instruction offset")
            }
            EmulationError::InvalidOperand {
                instruction,
                expected,
            } => write!(f, "'{instruction}' expects a {expected} operand"),
            EmulationError::InvalidOperationTypes {
                operation,
                operand_types,
            } => write!(f, "{operation} not supported for ({operand_types})"),
            EmulationError::NullReference => write!(f, "null reference"),
            EmulationError::ArrayIndexOutOfBounds { index, length } => {
                write!(f, "array index {index} out of range (length {length})")
            }
            EmulationError::ArrayTooLarge { length } => {
                write!(f, "cannot allocate an array of {length} elements")
            }
            EmulationError::HeapTypeMismatch { expected, found } => {
                write!(f, "expected {expected}, found {found}")
            }
            EmulationError::DivideByZero => write!(f, "integer division by zero"),
            EmulationError::InstructionFault {
                method,
                offset,
                mnemonic,
                source,
            } => write!(f, "{method} at IL_{offset:04X} ({mnemonic}): {source}"),
        }
    }
}

impl std::error::Error for EmulationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EmulationError::InstructionFault { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}
