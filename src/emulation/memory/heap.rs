//! Managed heap implementation.
//!
//! This module provides [`ManagedHeap`], an arena that owns every object instance and array
//! created during an execution. Objects are reached only through [`HeapRef`] handles:
//!
//! - **Instances** - An object of a catalog type with its fields stored by name
//! - **Arrays** - Single-dimensional arrays, backed either by scalar values (value-type
//!   elements) or by optional handles (reference-type elements)
//!
//! # Object References
//!
//! Handles are assigned from a monotonically increasing counter starting at 1 and are never
//! reused. No deallocation is exposed, so every handle stays valid for the lifetime of the heap
//! and cyclic object graphs need no special treatment.
//!
//! # Ownership
//!
//! The heap is owned by a single execution and mutated through `&mut self`; aliasing happens
//! only through handles, so two handles to the same object observe each other's writes.

use std::{fmt, sync::Arc};

use rustc_hash::FxHashMap;

use crate::{
    emulation::{EmValue, EmulationError, HeapRef},
    metadata::{DomainTypeRc, STRING_VALUE_FIELD},
    Result,
};

/// Backing storage of an array.
#[derive(Clone, Debug, PartialEq)]
pub enum ArrayStorage {
    /// Value-type elements stored inline.
    Values(Vec<EmValue>),
    /// Reference-type elements. `None` marks a slot that was never written and is materialized
    /// on first read.
    References(Vec<Option<HeapRef>>),
}

impl ArrayStorage {
    /// Number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            ArrayStorage::Values(values) => values.len(),
            ArrayStorage::References(slots) => slots.len(),
        }
    }

    /// Returns `true` if the array has no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn kind(&self) -> &'static str {
        match self {
            ArrayStorage::Values(_) => "value array",
            ArrayStorage::References(_) => "reference array",
        }
    }
}

/// Object stored on the managed heap.
#[derive(Clone, Debug)]
pub enum HeapObject {
    /// An instance of a catalog type.
    Instance {
        /// The runtime type of the instance.
        type_handle: DomainTypeRc,
        /// Field values keyed by field name.
        fields: FxHashMap<String, EmValue>,
    },

    /// A single-dimensional array.
    Array {
        /// The declared element type.
        element_type: DomainTypeRc,
        /// The elements.
        storage: ArrayStorage,
    },
}

impl HeapObject {
    /// Returns a human-readable description of the object kind.
    ///
    /// This is used in error messages and trace output.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            HeapObject::Instance { .. } => "instance",
            HeapObject::Array { storage, .. } => storage.kind(),
        }
    }

    /// The runtime type of an instance; `None` for arrays.
    #[must_use]
    pub fn type_handle(&self) -> Option<&DomainTypeRc> {
        match self {
            HeapObject::Instance { type_handle, .. } => Some(type_handle),
            HeapObject::Array { .. } => None,
        }
    }
}

impl fmt::Display for HeapObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeapObject::Instance { type_handle, fields } => {
                write!(f, "{}{{{} fields}}", type_handle.name(), fields.len())
            }
            HeapObject::Array {
                element_type,
                storage,
            } => write!(f, "{}[{}]", element_type.name(), storage.len()),
        }
    }
}

/// Largest element count a single array may hold (`i32::MAX`, as in the CLR).
pub const MAX_ARRAY_LENGTH: usize = i32::MAX as usize;

/// Handle-indexed store of object instances.
///
/// # Example
///
/// ```rust,no_run
/// use minclr::{emulation::{EmValue, ManagedHeap}, metadata::{Catalog, TypeRef}};
///
/// let catalog = Catalog::with_corelib()?;
/// let mut heap = ManagedHeap::new();
///
/// let int32 = catalog.resolve_type(&TypeRef::corelib("System.Int32"))?;
/// let array = heap.alloc_array(int32, 4)?;
/// heap.set_element(array, 2, EmValue::I32(7))?;
/// assert_eq!(heap.get_element(array, 2)?, EmValue::I32(7));
/// # Ok::<(), minclr::Error>(())
/// ```
#[derive(Debug)]
pub struct ManagedHeap {
    objects: FxHashMap<HeapRef, HeapObject>,
    next_id: u64,
}

impl Default for ManagedHeap {
    fn default() -> Self {
        Self::new()
    }
}

impl ManagedHeap {
    /// Creates an empty heap.
    #[must_use]
    pub fn new() -> Self {
        ManagedHeap {
            objects: FxHashMap::default(),
            next_id: 1,
        }
    }

    /// Stores an object and returns its fresh handle.
    pub fn alloc(&mut self, object: HeapObject) -> HeapRef {
        let heap_ref = HeapRef::new(self.next_id);
        self.next_id += 1;
        self.objects.insert(heap_ref, object);
        heap_ref
    }

    /// Allocates an instance of `type_handle` with the given initial fields.
    pub fn alloc_instance(
        &mut self,
        type_handle: DomainTypeRc,
        fields: impl IntoIterator<Item = (String, EmValue)>,
    ) -> HeapRef {
        self.alloc(HeapObject::Instance {
            type_handle,
            fields: fields.into_iter().collect(),
        })
    }

    /// Allocates a string instance whose `value` field holds `text`.
    ///
    /// # Arguments
    ///
    /// * `string_type` - The resolved `System.String` type
    /// * `text` - The host text
    pub fn alloc_string(&mut self, string_type: DomainTypeRc, text: &str) -> HeapRef {
        self.alloc_instance(
            string_type,
            [(STRING_VALUE_FIELD.to_string(), EmValue::Text(Arc::from(text)))],
        )
    }

    /// Allocates a zero-initialized array.
    ///
    /// Value-type element types get inline scalar storage initialized to the element flavor's
    /// default; every other element type gets handle storage with all slots unset.
    ///
    /// # Errors
    ///
    /// Returns [`EmulationError::ArrayTooLarge`] if `length` exceeds [`MAX_ARRAY_LENGTH`] or
    /// the backing storage cannot be reserved.
    pub fn alloc_array(&mut self, element_type: DomainTypeRc, length: usize) -> Result<HeapRef> {
        let storage = if element_type.is_value_type() {
            let zero = EmValue::default_for_flavor(element_type.flavor());
            ArrayStorage::Values(Self::filled(length, zero)?)
        } else {
            ArrayStorage::References(Self::filled(length, None)?)
        };

        Ok(self.alloc(HeapObject::Array {
            element_type,
            storage,
        }))
    }

    fn filled<T: Clone>(length: usize, fill: T) -> Result<Vec<T>> {
        let too_large = || EmulationError::ArrayTooLarge {
            length: i64::try_from(length).unwrap_or(i64::MAX),
        };
        if length > MAX_ARRAY_LENGTH {
            return Err(too_large().into());
        }

        let mut slots = Vec::new();
        slots.try_reserve_exact(length).map_err(|_| too_large())?;
        slots.resize(length, fill);
        Ok(slots)
    }

    /// Looks up an object.
    ///
    /// # Errors
    ///
    /// Returns a resolution failure if the handle is unknown.
    pub fn get(&self, heap_ref: HeapRef) -> Result<&HeapObject> {
        self.objects
            .get(&heap_ref)
            .ok_or_else(|| EmulationError::unresolved("heap object", heap_ref).into())
    }

    /// Looks up an object for mutation.
    ///
    /// # Errors
    ///
    /// Returns a resolution failure if the handle is unknown.
    pub fn get_mut(&mut self, heap_ref: HeapRef) -> Result<&mut HeapObject> {
        self.objects
            .get_mut(&heap_ref)
            .ok_or_else(|| EmulationError::unresolved("heap object", heap_ref).into())
    }

    /// Returns `true` if the handle refers to a live object.
    #[must_use]
    pub fn contains(&self, heap_ref: HeapRef) -> bool {
        self.objects.contains_key(&heap_ref)
    }

    /// Number of objects on the heap.
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Returns `true` if nothing has been allocated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Iterates over all objects in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = (HeapRef, &HeapObject)> {
        self.objects.iter().map(|(heap_ref, object)| (*heap_ref, object))
    }

    /// Returns the runtime type of an instance.
    ///
    /// # Errors
    ///
    /// Fails if the handle is unknown or refers to an array.
    pub fn type_of(&self, heap_ref: HeapRef) -> Result<DomainTypeRc> {
        match self.get(heap_ref)? {
            HeapObject::Instance { type_handle, .. } => Ok(type_handle.clone()),
            other => Err(mismatch("instance", other)),
        }
    }

    /// Reads an instance field.
    ///
    /// # Errors
    ///
    /// Fails if the handle is unknown, refers to an array, or the instance has no such field.
    pub fn get_field(&self, heap_ref: HeapRef, name: &str) -> Result<EmValue> {
        match self.get(heap_ref)? {
            HeapObject::Instance { type_handle, fields } => fields.get(name).cloned().ok_or_else(
                || EmulationError::unresolved("field", format!("{}::{name}", type_handle.name())).into(),
            ),
            other => Err(mismatch("instance", other)),
        }
    }

    /// Writes an instance field.
    ///
    /// # Errors
    ///
    /// Fails if the handle is unknown, refers to an array, or the instance has no such field.
    pub fn set_field(&mut self, heap_ref: HeapRef, name: &str, value: EmValue) -> Result<()> {
        match self.get_mut(heap_ref)? {
            HeapObject::Instance { type_handle, fields } => match fields.get_mut(name) {
                Some(slot) => {
                    *slot = value;
                    Ok(())
                }
                None => Err(EmulationError::unresolved(
                    "field",
                    format!("{}::{name}", type_handle.name()),
                )
                .into()),
            },
            other => Err(mismatch("instance", other)),
        }
    }

    /// Reads the host text of a string instance.
    ///
    /// # Errors
    ///
    /// Fails if the object is not an instance, or its `value` field holds no text.
    pub fn get_string(&self, heap_ref: HeapRef) -> Result<Arc<str>> {
        match self.get_field(heap_ref, STRING_VALUE_FIELD)? {
            EmValue::Text(text) => Ok(text),
            other => Err(EmulationError::HeapTypeMismatch {
                expected: "string",
                found: other.type_name(),
            }
            .into()),
        }
    }

    /// Returns the element type of an array.
    ///
    /// # Errors
    ///
    /// Fails if the handle is unknown or refers to an instance.
    pub fn element_type(&self, heap_ref: HeapRef) -> Result<DomainTypeRc> {
        match self.get(heap_ref)? {
            HeapObject::Array { element_type, .. } => Ok(element_type.clone()),
            other => Err(mismatch("array", other)),
        }
    }

    /// Returns the number of elements of an array.
    ///
    /// # Errors
    ///
    /// Fails if the handle is unknown or refers to an instance.
    pub fn array_length(&self, heap_ref: HeapRef) -> Result<usize> {
        match self.get(heap_ref)? {
            HeapObject::Array { storage, .. } => Ok(storage.len()),
            other => Err(mismatch("array", other)),
        }
    }

    /// Reads an element of a value-type array.
    ///
    /// # Errors
    ///
    /// Fails if the handle does not refer to a value array or the index is out of bounds.
    pub fn get_element(&self, heap_ref: HeapRef, index: i64) -> Result<EmValue> {
        match self.get(heap_ref)? {
            HeapObject::Array {
                storage: ArrayStorage::Values(values),
                ..
            } => {
                let slot = checked_index(index, values.len())?;
                Ok(values[slot].clone())
            }
            other => Err(mismatch("value array", other)),
        }
    }

    /// Writes an element of a value-type array.
    ///
    /// # Errors
    ///
    /// Fails if the handle does not refer to a value array or the index is out of bounds.
    pub fn set_element(&mut self, heap_ref: HeapRef, index: i64, value: EmValue) -> Result<()> {
        match self.get_mut(heap_ref)? {
            HeapObject::Array {
                storage: ArrayStorage::Values(values),
                ..
            } => {
                let slot = checked_index(index, values.len())?;
                values[slot] = value;
                Ok(())
            }
            other => Err(mismatch("value array", other)),
        }
    }

    /// Reads a slot of a reference-type array; `None` if the slot was never written.
    ///
    /// # Errors
    ///
    /// Fails if the handle does not refer to a reference array or the index is out of bounds.
    pub fn get_reference(&self, heap_ref: HeapRef, index: i64) -> Result<Option<HeapRef>> {
        match self.get(heap_ref)? {
            HeapObject::Array {
                storage: ArrayStorage::References(slots),
                ..
            } => {
                let slot = checked_index(index, slots.len())?;
                Ok(slots[slot])
            }
            other => Err(mismatch("reference array", other)),
        }
    }

    /// Writes a slot of a reference-type array.
    ///
    /// # Errors
    ///
    /// Fails if the handle does not refer to a reference array or the index is out of bounds.
    pub fn set_reference(
        &mut self,
        heap_ref: HeapRef,
        index: i64,
        value: Option<HeapRef>,
    ) -> Result<()> {
        match self.get_mut(heap_ref)? {
            HeapObject::Array {
                storage: ArrayStorage::References(slots),
                ..
            } => {
                let slot = checked_index(index, slots.len())?;
                slots[slot] = value;
                Ok(())
            }
            other => Err(mismatch("reference array", other)),
        }
    }
}

fn mismatch(expected: &'static str, found: &HeapObject) -> crate::Error {
    EmulationError::HeapTypeMismatch {
        expected,
        found: found.kind(),
    }
    .into()
}

fn checked_index(index: i64, length: usize) -> Result<usize> {
    usize::try_from(index)
        .ok()
        .filter(|slot| *slot < length)
        .ok_or_else(|| EmulationError::ArrayIndexOutOfBounds { index, length }.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{Catalog, TypeRef};

    fn resolve(catalog: &Catalog, name: &str) -> DomainTypeRc {
        catalog.resolve_type(&TypeRef::corelib(name)).unwrap()
    }

    #[test]
    fn test_handles_are_unique() {
        let catalog = Catalog::with_corelib().unwrap();
        let object = resolve(&catalog, "System.Object");
        let mut heap = ManagedHeap::new();

        let a = heap.alloc_instance(object.clone(), []);
        let b = heap.alloc_instance(object, []);
        assert_ne!(a, b);
        assert_eq!(a.id(), 1);
        assert_eq!(heap.len(), 2);
    }

    #[test]
    fn test_unknown_handle() {
        let heap = ManagedHeap::new();
        let error = heap.get(HeapRef::new(99)).unwrap_err();
        assert!(matches!(
            error.as_emulation(),
            Some(EmulationError::ResolutionFailure { .. })
        ));
    }

    #[test]
    fn test_fields() {
        let catalog = Catalog::with_corelib().unwrap();
        let mut heap = ManagedHeap::new();
        let string = heap.alloc_string(resolve(&catalog, "System.String"), "abc");

        assert_eq!(&*heap.get_string(string).unwrap(), "abc");
        heap.set_field(string, "value", EmValue::Text("xyz".into()))
            .unwrap();
        assert_eq!(&*heap.get_string(string).unwrap(), "xyz");
        assert!(heap.set_field(string, "missing", EmValue::Null).is_err());
        assert!(heap.get_field(string, "missing").is_err());
    }

    #[test]
    fn test_value_array() {
        let catalog = Catalog::with_corelib().unwrap();
        let mut heap = ManagedHeap::new();
        let array = heap
            .alloc_array(resolve(&catalog, "System.Int64"), 3)
            .unwrap();

        assert_eq!(heap.array_length(array).unwrap(), 3);
        assert_eq!(heap.get_element(array, 1).unwrap(), EmValue::I64(0));
        heap.set_element(array, 1, EmValue::I64(-9)).unwrap();
        assert_eq!(heap.get_element(array, 1).unwrap(), EmValue::I64(-9));

        for index in [-1, 3] {
            let error = heap.get_element(array, index).unwrap_err();
            assert_eq!(
                error.as_emulation(),
                Some(&EmulationError::ArrayIndexOutOfBounds { index, length: 3 })
            );
        }
        assert!(heap.get_reference(array, 0).is_err());
    }

    #[test]
    fn test_reference_array() {
        let catalog = Catalog::with_corelib().unwrap();
        let mut heap = ManagedHeap::new();
        let string = resolve(&catalog, "System.String");
        let array = heap.alloc_array(string.clone(), 2).unwrap();
        let text = heap.alloc_string(string, "hi");

        assert_eq!(heap.get_reference(array, 0).unwrap(), None);
        heap.set_reference(array, 0, Some(text)).unwrap();
        assert_eq!(heap.get_reference(array, 0).unwrap(), Some(text));
        assert_eq!(heap.element_type(array).unwrap().name(), "System.String");
        assert!(heap.type_of(array).is_err());
        assert!(heap.get_element(array, 0).is_err());
    }

    #[test]
    fn test_array_length_ceiling() {
        let catalog = Catalog::with_corelib().unwrap();
        let mut heap = ManagedHeap::new();
        let object = resolve(&catalog, "System.Object");

        let error = heap
            .alloc_array(object.clone(), MAX_ARRAY_LENGTH + 1)
            .unwrap_err();
        assert_eq!(
            error.as_emulation(),
            Some(&EmulationError::ArrayTooLarge {
                length: i64::from(i32::MAX) + 1
            })
        );
        assert!(heap.alloc_array(object, usize::MAX).is_err());
        assert!(heap.is_empty());
    }
}
