use thiserror::Error;

use crate::emulation::EmulationError;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// # Error Categories
///
/// ## Input Errors
/// - [`Error::Malformed`] - An instruction stream, type definition or method definition
///   handed to the crate violates its structural contract (duplicate offsets, undefined labels,
///   duplicate type registrations)
/// - [`Error::NotSupported`] - A definition requests something the runtime cannot provide,
///   such as a built-in method without a native implementation
///
/// ## Execution Errors
/// - [`Error::Emulation`] - A fatal failure raised while executing a method. The boxed
///   [`EmulationError`] carries the failure and, once it has passed through the dispatch
///   engine, the instruction that triggered it
///
/// # Examples
///
/// ```rust,no_run
/// use minclr::{emulation::EmulationError, Error};
///
/// # fn report(error: Error) {
/// match error {
///     Error::Emulation(e) => match e.root_cause() {
///         EmulationError::StackDepthExceeded { depth, limit } => {
///             eprintln!("recursion reached {depth} frames (limit {limit})");
///         }
///         other => eprintln!("execution failed: {other}"),
///     },
///     Error::Malformed { message, file, line } => {
///         eprintln!("malformed input: {message} ({file}:{line})");
///     }
///     Error::NotSupported(what) => eprintln!("not supported: {what}"),
/// }
/// # }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The provided input is structurally invalid.
    ///
    /// Raised while building instruction streams and registering catalog entries. The source
    /// location points at the check that rejected the input.
    ///
    /// # Fields
    ///
    /// * `message` - Detailed error message
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// The requested feature is not supported.
    #[error("Not supported - {0}")]
    NotSupported(String),

    /// A fatal failure raised during execution.
    ///
    /// The error is boxed to keep [`crate::Result`] small on the hot dispatch path.
    #[error("{0}")]
    Emulation(Box<EmulationError>),
}

impl From<EmulationError> for Error {
    fn from(error: EmulationError) -> Self {
        Error::Emulation(Box::new(error))
    }
}

impl Error {
    /// Returns the emulation failure wrapped by this error, if any.
    #[must_use]
    pub fn as_emulation(&self) -> Option<&EmulationError> {
        match self {
            Error::Emulation(e) => Some(&**e),
            _ => None,
        }
    }
}
