//! Runtime value representation.
//!
//! [`EmValue`] is the tagged value model shared by operand stacks, argument and local slots,
//! instance fields and array elements. [`HeapRef`] is the opaque handle through which every
//! object is reached. The operations in `ops` implement arithmetic, comparison and numeric
//! conversion over pairs of tags.

mod emvalue;
mod ops;

pub use emvalue::{EmValue, HeapRef};
pub use ops::{BinaryOp, CompareOp, ConversionType};
