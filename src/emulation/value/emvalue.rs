//! Core runtime value representation.

use std::{fmt, sync::Arc};

use crate::metadata::CilFlavor;

/// Runtime value held on an operand stack, in an argument or local slot, in an instance field
/// or in an array element.
///
/// The set of variants is closed. Arithmetic and comparison dispatch on the pair of tags and
/// fail on combinations they do not define instead of coercing implicitly.
///
/// # Slot Flavors
///
/// Every integer flavor of 32 bits or less (booleans and chars included) is carried as
/// [`EmValue::I32`], with unsigned bit patterns kept as-is. `I8`/`U8` map to
/// [`EmValue::I64`], `R4`/`R8` to the float variants, and every reference flavor to
/// [`EmValue::ObjectRef`] or [`EmValue::Null`].
///
/// [`EmValue::Text`] is the host payload stored in the `value` field of string instances. It
/// reaches an operand stack only through `ldfld` of that field, and no arithmetic, comparison
/// or branch accepts it.
///
/// # Value and Reference Semantics
///
/// Scalars are copied whenever they are moved between slots. Objects are only ever reached
/// through an [`EmValue::ObjectRef`] handle, so copying the value copies the handle and both
/// copies observe the same instance.
#[derive(Clone, Debug)]
pub enum EmValue {
    /// 32-bit integer (also bool, char, and the narrow integer types)
    I32(i32),
    /// 64-bit integer
    I64(i64),
    /// 32-bit float
    F32(f32),
    /// 64-bit float
    F64(f64),
    /// Handle of a heap object
    ObjectRef(HeapRef),
    /// The null reference
    Null,
    /// Host text backing a string instance
    Text(Arc<str>),
}

impl EmValue {
    /// Returns the zero value for a storage slot of the given flavor.
    ///
    /// Value types start at zero; every reference flavor starts as [`EmValue::Null`].
    #[must_use]
    pub fn default_for_flavor(flavor: CilFlavor) -> Self {
        match flavor {
            CilFlavor::I8 | CilFlavor::U8 => EmValue::I64(0),
            CilFlavor::R4 => EmValue::F32(0.0),
            CilFlavor::R8 => EmValue::F64(0.0),
            CilFlavor::Boolean
            | CilFlavor::Char
            | CilFlavor::I1
            | CilFlavor::U1
            | CilFlavor::I2
            | CilFlavor::U2
            | CilFlavor::I4
            | CilFlavor::U4
            | CilFlavor::ValueType => EmValue::I32(0),
            CilFlavor::Void
            | CilFlavor::Object
            | CilFlavor::String
            | CilFlavor::Class
            | CilFlavor::Array => EmValue::Null,
        }
    }

    /// Returns a short name of the variant for diagnostics.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            EmValue::I32(_) => "int32",
            EmValue::I64(_) => "int64",
            EmValue::F32(_) => "float32",
            EmValue::F64(_) => "float64",
            EmValue::ObjectRef(_) => "object",
            EmValue::Null => "null",
            EmValue::Text(_) => "text",
        }
    }

    /// Returns `true` for [`EmValue::Null`].
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, EmValue::Null)
    }

    /// Returns `true` for handles and null.
    #[must_use]
    pub fn is_reference(&self) -> bool {
        matches!(self, EmValue::ObjectRef(_) | EmValue::Null)
    }

    /// Returns the heap handle, if this is an object reference.
    #[must_use]
    pub fn as_heap_ref(&self) -> Option<HeapRef> {
        match self {
            EmValue::ObjectRef(r) => Some(*r),
            _ => None,
        }
    }

    /// Returns the value as `i32` if it is a 32-bit integer.
    #[must_use]
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            EmValue::I32(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the value as `i64` if it is an integer of either width.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            EmValue::I32(v) => Some(i64::from(*v)),
            EmValue::I64(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the value as `f64` if it is a float of either width.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            EmValue::F32(v) => Some(f64::from(*v)),
            EmValue::F64(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the host text of a string payload.
    #[must_use]
    pub fn as_text(&self) -> Option<&Arc<str>> {
        match self {
            EmValue::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Interprets the value as a branch condition.
    ///
    /// Integers are true when non-zero, handles are true and null is false. Floats and text
    /// have no truth value.
    #[must_use]
    pub fn as_condition(&self) -> Option<bool> {
        match self {
            EmValue::I32(v) => Some(*v != 0),
            EmValue::I64(v) => Some(*v != 0),
            EmValue::ObjectRef(_) => Some(true),
            EmValue::Null => Some(false),
            EmValue::F32(_) | EmValue::F64(_) | EmValue::Text(_) => None,
        }
    }

    /// Checks whether the value can live in a slot of the given flavor.
    ///
    /// Value-type slots accept only scalars; reference slots accept only handles and null.
    #[must_use]
    pub fn fits_flavor(&self, flavor: CilFlavor) -> bool {
        match self {
            EmValue::I32(_) => flavor.is_value_type() && !flavor.is_int64() && !flavor.is_float(),
            EmValue::I64(_) => flavor.is_int64(),
            EmValue::F32(_) | EmValue::F64(_) => flavor.is_float(),
            EmValue::ObjectRef(_) | EmValue::Null => flavor.is_reference_type(),
            EmValue::Text(_) => false,
        }
    }
}

impl PartialEq for EmValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (EmValue::Null, EmValue::Null) => true,
            (EmValue::I32(a), EmValue::I32(b)) => a == b,
            (EmValue::I64(a), EmValue::I64(b)) => a == b,
            (EmValue::F32(a), EmValue::F32(b)) => a.to_bits() == b.to_bits(),
            (EmValue::F64(a), EmValue::F64(b)) => a.to_bits() == b.to_bits(),
            (EmValue::ObjectRef(a), EmValue::ObjectRef(b)) => a == b,
            (EmValue::Text(a), EmValue::Text(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for EmValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmValue::I32(v) => write!(f, "{v}"),
            EmValue::I64(v) => write!(f, "{v}L"),
            EmValue::F32(v) => write!(f, "{v}f"),
            EmValue::F64(v) => write!(f, "{v}"),
            EmValue::ObjectRef(r) => write!(f, "ref@{}", r.0),
            EmValue::Null => write!(f, "null"),
            EmValue::Text(text) => write!(f, "{text:?}"),
        }
    }
}

impl From<i32> for EmValue {
    fn from(value: i32) -> Self {
        EmValue::I32(value)
    }
}

impl From<i64> for EmValue {
    fn from(value: i64) -> Self {
        EmValue::I64(value)
    }
}

impl From<f32> for EmValue {
    fn from(value: f32) -> Self {
        EmValue::F32(value)
    }
}

impl From<f64> for EmValue {
    fn from(value: f64) -> Self {
        EmValue::F64(value)
    }
}

impl From<bool> for EmValue {
    fn from(value: bool) -> Self {
        EmValue::I32(i32::from(value))
    }
}

impl From<HeapRef> for EmValue {
    fn from(value: HeapRef) -> Self {
        EmValue::ObjectRef(value)
    }
}

/// Handle of an object in a [`ManagedHeap`](crate::emulation::ManagedHeap).
///
/// Handles compare by identity: two handles are equal exactly when they name the same slot.
/// Handles are never reused within one heap.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HeapRef(pub(crate) u64);

impl HeapRef {
    /// Wraps a raw slot number. Only the heap hands these out during normal execution.
    #[must_use]
    pub fn new(id: u64) -> Self {
        HeapRef(id)
    }

    /// Raw slot number.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for HeapRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_default_for_flavor() {
        assert_eq!(EmValue::default_for_flavor(CilFlavor::I4), EmValue::I32(0));
        assert_eq!(EmValue::default_for_flavor(CilFlavor::U8), EmValue::I64(0));
        assert_eq!(EmValue::default_for_flavor(CilFlavor::R8), EmValue::F64(0.0));
        assert_eq!(EmValue::default_for_flavor(CilFlavor::Class), EmValue::Null);
        assert_eq!(EmValue::default_for_flavor(CilFlavor::String), EmValue::Null);
    }

    #[test]
    fn test_defaults_fit_their_flavor() {
        for flavor in CilFlavor::iter().filter(|f| *f != CilFlavor::Void) {
            assert!(
                EmValue::default_for_flavor(flavor).fits_flavor(flavor),
                "default of {flavor} must fit"
            );
        }
    }

    #[test]
    fn test_condition() {
        assert_eq!(EmValue::I32(0).as_condition(), Some(false));
        assert_eq!(EmValue::I32(7).as_condition(), Some(true));
        assert_eq!(EmValue::I64(-1).as_condition(), Some(true));
        assert_eq!(EmValue::Null.as_condition(), Some(false));
        assert_eq!(EmValue::ObjectRef(HeapRef::new(1)).as_condition(), Some(true));
        assert_eq!(EmValue::F64(1.0).as_condition(), None);
    }

    #[test]
    fn test_equality_is_tag_sensitive() {
        assert_ne!(EmValue::I32(1), EmValue::I64(1));
        assert_eq!(EmValue::F64(f64::NAN), EmValue::F64(f64::NAN));
        assert_eq!(
            EmValue::ObjectRef(HeapRef::new(3)),
            EmValue::from(HeapRef::new(3))
        );
        assert_ne!(
            EmValue::ObjectRef(HeapRef::new(3)),
            EmValue::ObjectRef(HeapRef::new(4))
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(EmValue::I32(5).to_string(), "5");
        assert_eq!(EmValue::I64(5).to_string(), "5L");
        assert_eq!(EmValue::ObjectRef(HeapRef::new(9)).to_string(), "ref@9");
        assert_eq!(EmValue::Null.to_string(), "null");
        assert_eq!(EmValue::Text("hi".into()).to_string(), "\"hi\"");
        assert_eq!(HeapRef::new(2).to_string(), "#2");
    }
}
