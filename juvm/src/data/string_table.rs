//! Packed string tables.
//!
//! A string table on disk is `table_size: u32, string_count: u32` followed
//! by `string_count` records of `length: u64, bytes`. The decoded form
//! re-packs the records into a single 8-byte-aligned blob (each record is
//! `length, bytes, zero padding to the next 8-byte boundary`) with a
//! parallel index mapping each ordinal to its offset in the blob. Lookups
//! read the bytes in place; the string contents are never copied again.

use crate::buffer::Reader;
use crate::data::LoadError;

const RECORD_ALIGN: usize = 8;

#[derive(Debug)]
pub struct StringTable {
    /// The packed blob of `[length][bytes][pad]` records.
    data: Box<[u8]>,
    /// Offset of each record's length prefix inside `data`.
    offsets: Vec<usize>,
}

impl StringTable {
    /// Decodes a string table from the cursor's current position.
    pub fn read(reader: &mut Reader<'_>) -> Result<Self, LoadError> {
        // table_size is informational; the cursor tracks its own position.
        let _table_size = reader.read_u32()?;
        let count = reader.read_u32()? as usize;

        let mut data = Vec::new();
        let mut offsets = Vec::with_capacity(count);

        for _ in 0..count {
            offsets.push(data.len());

            let length = reader.read_u64()?;
            data.extend_from_slice(&length.to_le_bytes());
            data.extend_from_slice(reader.read_bytes(length as usize)?);

            while data.len() % RECORD_ALIGN != 0 {
                data.push(0);
            }
        }

        Ok(Self {
            data: data.into_boxed_slice(),
            offsets,
        })
    }

    /// Builds a table directly from string contents. This is the in-memory
    /// equivalent of decoding a table that contains exactly `strings`.
    pub fn from_strings<S: AsRef<str>>(strings: &[S]) -> Self {
        let mut data = Vec::new();
        let mut offsets = Vec::with_capacity(strings.len());

        for s in strings {
            let bytes = s.as_ref().as_bytes();
            offsets.push(data.len());
            data.extend_from_slice(&(bytes.len() as u64).to_le_bytes());
            data.extend_from_slice(bytes);
            while data.len() % RECORD_ALIGN != 0 {
                data.push(0);
            }
        }

        Self {
            data: data.into_boxed_slice(),
            offsets,
        }
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// The size, in bytes, of the packed blob.
    pub fn byte_size(&self) -> usize {
        self.data.len()
    }

    /// Returns the raw bytes of string `index`, or `None` if the index is
    /// out of range.
    pub fn get(&self, index: usize) -> Option<&[u8]> {
        let offset = *self.offsets.get(index)?;
        let mut length_raw = [0u8; 8];
        length_raw.copy_from_slice(&self.data[offset..offset + 8]);
        let length = u64::from_le_bytes(length_raw) as usize;
        Some(&self.data[offset + 8..offset + 8 + length])
    }

    /// Returns string `index` as UTF-8, or `None` if the index is out of
    /// range or the bytes are not valid UTF-8.
    pub fn get_str(&self, index: usize) -> Option<&str> {
        std::str::from_utf8(self.get(index)?).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(strings: &[&str]) -> Vec<u8> {
        let mut out = Vec::new();
        let body_size: usize = strings.iter().map(|s| 8 + s.len()).sum();
        out.extend_from_slice(&(body_size as u32).to_le_bytes());
        out.extend_from_slice(&(strings.len() as u32).to_le_bytes());
        for s in strings {
            out.extend_from_slice(&(s.len() as u64).to_le_bytes());
            out.extend_from_slice(s.as_bytes());
        }
        out
    }

    #[test]
    fn test_read_preserves_ordinals() {
        let bytes = encode(&["main", "Hello, world!", ""]);
        let mut reader = Reader::new(&bytes);
        let table = StringTable::read(&mut reader).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.get_str(0), Some("main"));
        assert_eq!(table.get_str(1), Some("Hello, world!"));
        assert_eq!(table.get_str(2), Some(""));
        assert_eq!(table.get_str(3), None);
    }

    #[test]
    fn test_records_are_aligned() {
        let table = StringTable::from_strings(&["a", "bc"]);
        assert_eq!(table.byte_size() % 8, 0);
        assert_eq!(table.get_str(0), Some("a"));
        assert_eq!(table.get_str(1), Some("bc"));
    }

    #[test]
    fn test_from_strings_matches_read() {
        let bytes = encode(&["x", "yz"]);
        let mut reader = Reader::new(&bytes);
        let decoded = StringTable::read(&mut reader).unwrap();
        let built = StringTable::from_strings(&["x", "yz"]);
        assert_eq!(decoded.byte_size(), built.byte_size());
        assert_eq!(decoded.get(1), built.get(1));
    }

    #[test]
    fn test_truncated_string_is_rejected() {
        let mut bytes = encode(&["hello"]);
        bytes.truncate(bytes.len() - 2);
        let mut reader = Reader::new(&bytes);
        assert!(matches!(
            StringTable::read(&mut reader),
            Err(LoadError::UnexpectedEof { .. })
        ));
    }

    #[test]
    fn test_non_utf8_bytes_are_reachable_raw() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&9u32.to_le_bytes());
        bytes.extend_from_slice(&1u32.to_le_bytes());
        bytes.extend_from_slice(&1u64.to_le_bytes());
        bytes.push(0xFF);
        let mut reader = Reader::new(&bytes);
        let table = StringTable::read(&mut reader).unwrap();
        assert_eq!(table.get(0), Some(&[0xFF][..]));
        assert_eq!(table.get_str(0), None);
    }
}
