//! Cross-entity references.
//!
//! An assembly never embeds another entity directly; every edge to a type
//! or function goes through a reference table entry. The entry describes
//! where the target lives: in this assembly, in the native assembly, or in
//! another assembly entirely.

use num_enum::TryFromPrimitive;

use crate::buffer::Reader;
use crate::data::LoadError;

/// On-disk tag identifying the kind of an [`ItemRef`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u32)]
pub enum RefKind {
    Internal = 0,
    Native = 1,
    External = 2,
}

/// A reference to a type or function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemRef {
    /// An item in this assembly, addressed by block ordinal and the item's
    /// index inside that block's table.
    Internal { block: u32, index: u32 },
    /// An item in the native assembly's table.
    Native { index: u32 },
    /// An item in another assembly, addressed by name. Both indices point
    /// into the enclosing assembly's name table.
    External {
        block_name_index: u32,
        item_name_index: u32,
    },
}

impl ItemRef {
    pub fn kind(&self) -> RefKind {
        match self {
            ItemRef::Internal { .. } => RefKind::Internal,
            ItemRef::Native { .. } => RefKind::Native,
            ItemRef::External { .. } => RefKind::External,
        }
    }
}

/// Reads a reference table: `count: u32`, then one tagged entry per item.
pub fn read_item_ref_table(reader: &mut Reader<'_>) -> Result<Vec<ItemRef>, LoadError> {
    let count = reader.read_u32()? as usize;
    let mut refs = Vec::with_capacity(count);

    for _ in 0..count {
        let offset = reader.position();
        let raw_kind = reader.read_u32()?;
        let kind = RefKind::try_from(raw_kind)
            .map_err(|_| LoadError::UnknownRefKind { kind: raw_kind, offset })?;

        refs.push(match kind {
            RefKind::Internal => ItemRef::Internal {
                block: reader.read_u32()?,
                index: reader.read_u32()?,
            },
            RefKind::Native => ItemRef::Native {
                index: reader.read_u32()?,
            },
            RefKind::External => ItemRef::External {
                block_name_index: reader.read_u32()?,
                item_name_index: reader.read_u32()?,
            },
        });
    }

    Ok(refs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_all_kinds() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&3u32.to_le_bytes());
        // Internal { block: 1, index: 2 }
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.extend_from_slice(&1u32.to_le_bytes());
        bytes.extend_from_slice(&2u32.to_le_bytes());
        // Native { index: 7 }
        bytes.extend_from_slice(&1u32.to_le_bytes());
        bytes.extend_from_slice(&7u32.to_le_bytes());
        // External { block_name_index: 3, item_name_index: 4 }
        bytes.extend_from_slice(&2u32.to_le_bytes());
        bytes.extend_from_slice(&3u32.to_le_bytes());
        bytes.extend_from_slice(&4u32.to_le_bytes());

        let mut reader = Reader::new(&bytes);
        let refs = read_item_ref_table(&mut reader).unwrap();
        assert_eq!(
            refs,
            vec![
                ItemRef::Internal { block: 1, index: 2 },
                ItemRef::Native { index: 7 },
                ItemRef::External {
                    block_name_index: 3,
                    item_name_index: 4
                },
            ]
        );
        assert_eq!(refs[0].kind(), RefKind::Internal);
    }

    #[test]
    fn test_unknown_kind_is_fatal() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&1u32.to_le_bytes());
        bytes.extend_from_slice(&9u32.to_le_bytes());

        let mut reader = Reader::new(&bytes);
        let err = read_item_ref_table(&mut reader).unwrap_err();
        assert!(matches!(
            err,
            LoadError::UnknownRefKind { kind: 9, offset: 4 }
        ));
    }
}
