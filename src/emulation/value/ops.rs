//! Arithmetic, comparison and conversion on [`EmValue`].
//!
//! Every operation is an explicit match over the operand tags. Mixed integer widths widen to
//! 64 bits and mixed float widths widen to `float64`; every other combination is rejected with
//! [`EmulationError::InvalidOperationTypes`]. Integer arithmetic wraps, matching unchecked CIL
//! opcodes.

use strum::{Display, EnumString};

use crate::{
    emulation::{EmValue, EmulationError},
    Result,
};

/// Binary arithmetic operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum BinaryOp {
    /// `add`
    Add,
    /// `sub`
    Sub,
    /// `div`
    Div,
}

/// Comparison operations producing `1` or `0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum CompareOp {
    /// `ceq`
    #[strum(serialize = "ceq")]
    Eq,
    /// `cgt`
    #[strum(serialize = "cgt")]
    Gt,
    /// `clt`
    #[strum(serialize = "clt")]
    Lt,
}

/// Numeric conversions, parsed from their `conv.*` mnemonic.
///
/// # Examples
///
/// ```rust,no_run
/// use std::str::FromStr;
/// use minclr::emulation::ConversionType;
///
/// assert_eq!(ConversionType::from_str("conv.u1").ok(), Some(ConversionType::U1));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
pub enum ConversionType {
    /// Truncate to `int8`, sign-extend to `int32`
    #[strum(serialize = "conv.i1")]
    I1,
    /// Truncate to `int16`, sign-extend to `int32`
    #[strum(serialize = "conv.i2")]
    I2,
    /// Convert to `int32`
    #[strum(serialize = "conv.i4")]
    I4,
    /// Convert to `int64`
    #[strum(serialize = "conv.i8")]
    I8,
    /// Truncate to `uint8`, zero-extend to `int32`
    #[strum(serialize = "conv.u1")]
    U1,
    /// Truncate to `uint16`, zero-extend to `int32`
    #[strum(serialize = "conv.u2")]
    U2,
    /// Convert to `uint32`
    #[strum(serialize = "conv.u4")]
    U4,
    /// Convert to `uint64`
    #[strum(serialize = "conv.u8")]
    U8,
    /// Convert to `float32`
    #[strum(serialize = "conv.r4")]
    R4,
    /// Convert to `float64`
    #[strum(serialize = "conv.r8")]
    R8,
}

fn type_error(operation: impl ToString, operands: &[&EmValue]) -> crate::Error {
    let operand_types = operands
        .iter()
        .map(|value| value.type_name())
        .collect::<Vec<_>>()
        .join(", ");
    EmulationError::InvalidOperationTypes {
        operation: operation.to_string(),
        operand_types,
    }
    .into()
}

/// Operand pair after widening to a common representation.
enum Widened {
    Int32(i32, i32),
    Int64(i64, i64),
    Float(f64, f64),
    Float32(f32, f32),
}

fn widen(left: &EmValue, right: &EmValue) -> Option<Widened> {
    match (left, right) {
        (EmValue::I32(a), EmValue::I32(b)) => Some(Widened::Int32(*a, *b)),
        (EmValue::I64(a), EmValue::I64(b)) => Some(Widened::Int64(*a, *b)),
        (EmValue::I32(a), EmValue::I64(b)) => Some(Widened::Int64(i64::from(*a), *b)),
        (EmValue::I64(a), EmValue::I32(b)) => Some(Widened::Int64(*a, i64::from(*b))),
        (EmValue::F32(a), EmValue::F32(b)) => Some(Widened::Float32(*a, *b)),
        (EmValue::F64(a), EmValue::F64(b)) => Some(Widened::Float(*a, *b)),
        (EmValue::F32(a), EmValue::F64(b)) => Some(Widened::Float(f64::from(*a), *b)),
        (EmValue::F64(a), EmValue::F32(b)) => Some(Widened::Float(*a, f64::from(*b))),
        _ => None,
    }
}

impl EmValue {
    /// Applies a binary arithmetic operation with `self` as the left operand.
    ///
    /// # Arguments
    ///
    /// * `other` - The right operand (the value that was on top of the stack)
    /// * `op` - The operation
    ///
    /// # Errors
    ///
    /// Returns [`EmulationError::InvalidOperationTypes`] for unsupported operand tags and
    /// [`EmulationError::DivideByZero`] for integer division by zero.
    pub fn binary_op(&self, other: &Self, op: BinaryOp) -> Result<Self> {
        let Some(pair) = widen(self, other) else {
            return Err(type_error(op, &[self, other]));
        };

        match (op, pair) {
            (BinaryOp::Add, Widened::Int32(a, b)) => Ok(EmValue::I32(a.wrapping_add(b))),
            (BinaryOp::Add, Widened::Int64(a, b)) => Ok(EmValue::I64(a.wrapping_add(b))),
            (BinaryOp::Add, Widened::Float32(a, b)) => Ok(EmValue::F32(a + b)),
            (BinaryOp::Add, Widened::Float(a, b)) => Ok(EmValue::F64(a + b)),

            (BinaryOp::Sub, Widened::Int32(a, b)) => Ok(EmValue::I32(a.wrapping_sub(b))),
            (BinaryOp::Sub, Widened::Int64(a, b)) => Ok(EmValue::I64(a.wrapping_sub(b))),
            (BinaryOp::Sub, Widened::Float32(a, b)) => Ok(EmValue::F32(a - b)),
            (BinaryOp::Sub, Widened::Float(a, b)) => Ok(EmValue::F64(a - b)),

            (BinaryOp::Div, Widened::Int32(_, 0) | Widened::Int64(_, 0)) => {
                Err(EmulationError::DivideByZero.into())
            }
            (BinaryOp::Div, Widened::Int32(a, b)) => Ok(EmValue::I32(a.wrapping_div(b))),
            (BinaryOp::Div, Widened::Int64(a, b)) => Ok(EmValue::I64(a.wrapping_div(b))),
            (BinaryOp::Div, Widened::Float32(a, b)) => Ok(EmValue::F32(a / b)),
            (BinaryOp::Div, Widened::Float(a, b)) => Ok(EmValue::F64(a / b)),
        }
    }

    /// Compares `self` (left) against `other` (right).
    ///
    /// Numbers compare by value after widening. `ceq` additionally compares handles by identity
    /// and null against handles; ordering comparisons on references are rejected.
    ///
    /// # Errors
    ///
    /// Returns [`EmulationError::InvalidOperationTypes`] for unsupported operand tags.
    pub fn compare(&self, other: &Self, op: CompareOp) -> Result<Self> {
        if let Some(pair) = widen(self, other) {
            let result = match (op, pair) {
                (CompareOp::Eq, Widened::Int32(a, b)) => a == b,
                (CompareOp::Eq, Widened::Int64(a, b)) => a == b,
                (CompareOp::Eq, Widened::Float32(a, b)) => a == b,
                (CompareOp::Eq, Widened::Float(a, b)) => a == b,
                (CompareOp::Gt, Widened::Int32(a, b)) => a > b,
                (CompareOp::Gt, Widened::Int64(a, b)) => a > b,
                (CompareOp::Gt, Widened::Float32(a, b)) => a > b,
                (CompareOp::Gt, Widened::Float(a, b)) => a > b,
                (CompareOp::Lt, Widened::Int32(a, b)) => a < b,
                (CompareOp::Lt, Widened::Int64(a, b)) => a < b,
                (CompareOp::Lt, Widened::Float32(a, b)) => a < b,
                (CompareOp::Lt, Widened::Float(a, b)) => a < b,
            };
            return Ok(EmValue::from(result));
        }

        match (op, self, other) {
            (CompareOp::Eq, EmValue::ObjectRef(a), EmValue::ObjectRef(b)) => {
                Ok(EmValue::from(a == b))
            }
            (CompareOp::Eq, EmValue::Null, EmValue::Null) => Ok(EmValue::from(true)),
            (CompareOp::Eq, EmValue::ObjectRef(_), EmValue::Null)
            | (CompareOp::Eq, EmValue::Null, EmValue::ObjectRef(_)) => Ok(EmValue::from(false)),
            _ => Err(type_error(op, &[self, other])),
        }
    }

    /// Converts the value to another numeric representation.
    ///
    /// Narrowing conversions truncate. Float-to-integer conversions saturate at the bounds of
    /// the target type.
    ///
    /// # Errors
    ///
    /// Returns [`EmulationError::InvalidOperationTypes`] for references and text.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn convert(&self, conv: ConversionType) -> Result<Self> {
        let converted = match (conv, self) {
            (ConversionType::I1, EmValue::I32(v)) => EmValue::I32(i32::from(*v as i8)),
            (ConversionType::I1, EmValue::I64(v)) => EmValue::I32(i32::from(*v as i8)),
            (ConversionType::I1, v) => EmValue::I32(i32::from(Self::float_of(conv, v)? as i8)),

            (ConversionType::I2, EmValue::I32(v)) => EmValue::I32(i32::from(*v as i16)),
            (ConversionType::I2, EmValue::I64(v)) => EmValue::I32(i32::from(*v as i16)),
            (ConversionType::I2, v) => EmValue::I32(i32::from(Self::float_of(conv, v)? as i16)),

            (ConversionType::I4, EmValue::I32(v)) => EmValue::I32(*v),
            (ConversionType::I4, EmValue::I64(v)) => EmValue::I32(*v as i32),
            (ConversionType::I4, v) => EmValue::I32(Self::float_of(conv, v)? as i32),

            (ConversionType::I8, EmValue::I32(v)) => EmValue::I64(i64::from(*v)),
            (ConversionType::I8, EmValue::I64(v)) => EmValue::I64(*v),
            (ConversionType::I8, v) => EmValue::I64(Self::float_of(conv, v)? as i64),

            (ConversionType::U1, EmValue::I32(v)) => EmValue::I32(i32::from(*v as u8)),
            (ConversionType::U1, EmValue::I64(v)) => EmValue::I32(i32::from(*v as u8)),
            (ConversionType::U1, v) => EmValue::I32(i32::from(Self::float_of(conv, v)? as u8)),

            (ConversionType::U2, EmValue::I32(v)) => EmValue::I32(i32::from(*v as u16)),
            (ConversionType::U2, EmValue::I64(v)) => EmValue::I32(i32::from(*v as u16)),
            (ConversionType::U2, v) => EmValue::I32(i32::from(Self::float_of(conv, v)? as u16)),

            (ConversionType::U4, EmValue::I32(v)) => EmValue::I32(*v),
            (ConversionType::U4, EmValue::I64(v)) => EmValue::I32(*v as u32 as i32),
            (ConversionType::U4, v) => EmValue::I32(Self::float_of(conv, v)? as u32 as i32),

            (ConversionType::U8, EmValue::I32(v)) => EmValue::I64(i64::from(*v as u32)),
            (ConversionType::U8, EmValue::I64(v)) => EmValue::I64(*v),
            (ConversionType::U8, v) => EmValue::I64(Self::float_of(conv, v)? as u64 as i64),

            (ConversionType::R4, EmValue::I32(v)) => EmValue::F32(*v as f32),
            (ConversionType::R4, EmValue::I64(v)) => EmValue::F32(*v as f32),
            (ConversionType::R4, v) => EmValue::F32(Self::float_of(conv, v)? as f32),

            (ConversionType::R8, EmValue::I32(v)) => EmValue::F64(f64::from(*v)),
            (ConversionType::R8, EmValue::I64(v)) => EmValue::F64(*v as f64),
            (ConversionType::R8, v) => EmValue::F64(Self::float_of(conv, v)?),
        };
        Ok(converted)
    }

    fn float_of(conv: ConversionType, value: &EmValue) -> Result<f64> {
        value.as_f64().ok_or_else(|| type_error(conv, &[value]))
    }
}
