//! Local variable slots.

use crate::{
    emulation::{EmValue, EmulationError},
    metadata::CilFlavor,
    Result,
};

/// The fixed-size local variable array of a frame.
///
/// Slots are created zeroed for their declared flavor and only accept values that fit it, so a
/// reference slot never holds a scalar and a value slot never holds a handle.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LocalVariables {
    values: Vec<EmValue>,
    flavors: Vec<CilFlavor>,
}

impl LocalVariables {
    /// Creates zero-initialized slots for the given flavors.
    #[must_use]
    pub fn new(flavors: &[CilFlavor]) -> Self {
        LocalVariables {
            values: flavors
                .iter()
                .map(|flavor| EmValue::default_for_flavor(*flavor))
                .collect(),
            flavors: flavors.to_vec(),
        }
    }

    /// Reads a slot.
    ///
    /// # Errors
    ///
    /// Returns [`EmulationError::LocalIndexOutOfBounds`] for an unknown slot.
    pub fn get(&self, index: usize) -> Result<&EmValue> {
        self.values.get(index).ok_or_else(|| {
            EmulationError::LocalIndexOutOfBounds {
                index,
                count: self.values.len(),
            }
            .into()
        })
    }

    /// Writes a slot.
    ///
    /// # Errors
    ///
    /// Returns [`EmulationError::LocalIndexOutOfBounds`] for an unknown slot and
    /// [`EmulationError::InvalidOperationTypes`] if the value does not fit the slot's flavor.
    pub fn set(&mut self, index: usize, value: EmValue) -> Result<()> {
        let count = self.values.len();
        let (Some(slot), Some(flavor)) = (self.values.get_mut(index), self.flavors.get(index))
        else {
            return Err(EmulationError::LocalIndexOutOfBounds { index, count }.into());
        };

        if !value.fits_flavor(*flavor) {
            return Err(EmulationError::InvalidOperationTypes {
                operation: format!("store to {flavor} local {index}"),
                operand_types: value.type_name().to_string(),
            }
            .into());
        }
        *slot = value;
        Ok(())
    }

    /// Number of slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if the method declares no locals.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The declared flavor of a slot.
    #[must_use]
    pub fn flavor(&self, index: usize) -> Option<CilFlavor> {
        self.flavors.get(index).copied()
    }
}
