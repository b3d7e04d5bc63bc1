//! `System.String`.
//!
//! A string is an ordinary instance of `System.String` whose `value` field holds the host
//! text. `ldstr` fills that field directly; the natives below cover construction from a
//! character array, concatenation and the length property.
//!
//! | Method | Description |
//! |--------|-------------|
//! | `.ctor(char[])` | Decodes UTF-16 code units into the receiver |
//! | `Concat(string, string)` | Allocates the concatenation; null counts as empty |
//! | `get_Length()` | Length in UTF-16 code units |

use crate::{
    emulation::{ArrayStorage, EmValue, EmulationError, HeapObject, NativeContext, NativeMethod},
    metadata::{
        Catalog, CilFlavor, DomainMethod, DomainType, MethodRef, TypeRef, STRING_VALUE_FIELD,
    },
    Result,
};

/// Registers `System.String` with its native methods.
///
/// # Errors
///
/// Fails if `System.Object` is missing or `System.String` is already registered.
pub fn register(catalog: &Catalog) -> Result<()> {
    let string = TypeRef::string();
    let natives = catalog.natives();
    natives.register(
        MethodRef::constructor(string.clone(), 1),
        NativeMethod::new("System.String::.ctor", string_ctor),
    );
    natives.register(
        MethodRef::new(string.clone(), "Concat", 2),
        NativeMethod::new("System.String::Concat", string_concat),
    );
    natives.register(
        MethodRef::new(string.clone(), "get_Length", 0),
        NativeMethod::new("System.String::get_Length", string_length),
    );

    catalog.register(
        DomainType::builder(string.clone())
            .flavor(CilFlavor::String)
            .field(STRING_VALUE_FIELD, string.clone())
            .method(DomainMethod::constructor().param(TypeRef::corelib("System.Char[]")))
            .method(
                DomainMethod::builder("Concat")
                    .as_static()
                    .param(string.clone())
                    .param(string.clone())
                    .returns(string.clone()),
            )
            .method(DomainMethod::builder("get_Length").returns(TypeRef::corelib("System.Int32"))),
    )?;
    Ok(())
}

fn string_ctor(ctx: &mut NativeContext<'_>, args: &[EmValue]) -> Result<Option<EmValue>> {
    let this = NativeContext::this(args)?;
    let chars = match args.get(1) {
        Some(EmValue::ObjectRef(chars)) => *chars,
        Some(EmValue::Null) => return Err(EmulationError::NullReference.into()),
        _ => {
            return Err(EmulationError::InvalidOperationTypes {
                operation: "System.String::.ctor".to_string(),
                operand_types: args
                    .get(1)
                    .map_or("missing", EmValue::type_name)
                    .to_string(),
            }
            .into())
        }
    };

    let units = match ctx.heap.get(chars)? {
        HeapObject::Array {
            storage: ArrayStorage::Values(values),
            ..
        } => values
            .iter()
            .map(|element| {
                let unit = element
                    .as_i32()
                    .ok_or(EmulationError::HeapTypeMismatch {
                        expected: "char",
                        found: element.type_name(),
                    })?;
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let unit = unit as u16;
                Ok(unit)
            })
            .collect::<std::result::Result<Vec<u16>, EmulationError>>()?,
        other => {
            return Err(EmulationError::HeapTypeMismatch {
                expected: "char array",
                found: other.kind(),
            }
            .into())
        }
    };

    let text: String = char::decode_utf16(units)
        .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect();
    ctx.heap
        .set_field(this, STRING_VALUE_FIELD, EmValue::Text(text.into()))?;
    Ok(None)
}

fn string_concat(ctx: &mut NativeContext<'_>, args: &[EmValue]) -> Result<Option<EmValue>> {
    let mut text = String::new();
    for arg in args {
        if !arg.is_null() {
            text.push_str(&ctx.read_string(arg)?);
        }
    }
    let result = ctx.alloc_string(&text)?;
    Ok(Some(EmValue::ObjectRef(result)))
}

fn string_length(ctx: &mut NativeContext<'_>, args: &[EmValue]) -> Result<Option<EmValue>> {
    let this = NativeContext::this(args)?;
    let text = ctx.heap.get_string(this)?;
    let length = i32::try_from(text.encode_utf16().count()).unwrap_or(i32::MAX);
    Ok(Some(EmValue::I32(length)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emulation::{HeapRef, ManagedHeap};

    fn char_array(ctx: &mut NativeContext<'_>, text: &str) -> HeapRef {
        let char_type = ctx
            .catalog
            .resolve_type(&TypeRef::corelib("System.Char"))
            .unwrap();
        let units: Vec<u16> = text.encode_utf16().collect();
        let array = ctx.heap.alloc_array(char_type, units.len()).unwrap();
        for (index, unit) in units.iter().enumerate() {
            ctx.heap
                .set_element(array, index as i64, EmValue::I32(i32::from(*unit)))
                .unwrap();
        }
        array
    }

    #[test]
    fn test_ctor_from_chars() {
        let catalog = Catalog::with_corelib().unwrap();
        let mut heap = ManagedHeap::new();
        let mut ctx = NativeContext::new(&mut heap, &catalog);

        let chars = char_array(&mut ctx, "héllo");
        let this = ctx.alloc_string("").unwrap();
        string_ctor(
            &mut ctx,
            &[EmValue::ObjectRef(this), EmValue::ObjectRef(chars)],
        )
        .unwrap();
        assert_eq!(&*ctx.heap.get_string(this).unwrap(), "héllo");

        let error = string_ctor(&mut ctx, &[EmValue::ObjectRef(this), EmValue::Null]).unwrap_err();
        assert!(matches!(
            error.as_emulation(),
            Some(EmulationError::NullReference)
        ));
    }

    #[test]
    fn test_concat_and_length() {
        let catalog = Catalog::with_corelib().unwrap();
        let mut heap = ManagedHeap::new();
        let mut ctx = NativeContext::new(&mut heap, &catalog);

        let left = ctx.alloc_string("foo").unwrap();
        let joined = string_concat(&mut ctx, &[EmValue::ObjectRef(left), EmValue::Null])
            .unwrap()
            .unwrap();
        let joined = joined.as_heap_ref().unwrap();
        assert_ne!(joined, left);
        assert_eq!(&*ctx.heap.get_string(joined).unwrap(), "foo");

        let length = string_length(&mut ctx, &[EmValue::ObjectRef(joined)]).unwrap();
        assert_eq!(length, Some(EmValue::I32(3)));
    }
}
