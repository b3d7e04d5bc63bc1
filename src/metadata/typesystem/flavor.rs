use strum::{Display, EnumIter};

#[allow(missing_docs)]
/// The storage category of a type.
///
/// The flavor decides how values of the type are represented on the operand stack and in
/// storage slots: value-type flavors are held inline and copied, every other flavor is held
/// as a heap handle (or null).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum CilFlavor {
    // Base primitive types
    Void,
    Boolean,
    Char,
    I1,
    U1,
    I2,
    U2,
    I4,
    U4,
    I8,
    U8,
    R4,
    R8,
    Object,
    String,

    // Type categories
    Class,
    ValueType,
    Array,
}

impl CilFlavor {
    /// Check if this is a primitive type
    #[must_use]
    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            CilFlavor::Void
                | CilFlavor::Boolean
                | CilFlavor::Char
                | CilFlavor::I1
                | CilFlavor::U1
                | CilFlavor::I2
                | CilFlavor::U2
                | CilFlavor::I4
                | CilFlavor::U4
                | CilFlavor::I8
                | CilFlavor::U8
                | CilFlavor::R4
                | CilFlavor::R8
                | CilFlavor::Object
                | CilFlavor::String
        )
    }

    /// Check if this is a value type
    #[must_use]
    pub fn is_value_type(&self) -> bool {
        matches!(
            self,
            CilFlavor::Boolean
                | CilFlavor::Char
                | CilFlavor::I1
                | CilFlavor::U1
                | CilFlavor::I2
                | CilFlavor::U2
                | CilFlavor::I4
                | CilFlavor::U4
                | CilFlavor::I8
                | CilFlavor::U8
                | CilFlavor::R4
                | CilFlavor::R8
                | CilFlavor::ValueType
        )
    }

    /// Check if this is a reference type
    #[must_use]
    pub fn is_reference_type(&self) -> bool {
        matches!(
            self,
            CilFlavor::Object | CilFlavor::String | CilFlavor::Class | CilFlavor::Array
        )
    }

    /// Check if values of this flavor are 64-bit integers on the operand stack
    #[must_use]
    pub fn is_int64(&self) -> bool {
        matches!(self, CilFlavor::I8 | CilFlavor::U8)
    }

    /// Check if this is a floating point type
    #[must_use]
    pub fn is_float(&self) -> bool {
        matches!(self, CilFlavor::R4 | CilFlavor::R8)
    }
}
