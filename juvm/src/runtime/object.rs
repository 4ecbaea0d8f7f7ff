//! Heap object model.
//!
//! The only object kind the interpreter creates or mutates at runtime is
//! the interned UTF-8 string; the remaining kinds exist so the header tag
//! is stable across toolchain versions.

use num_enum::TryFromPrimitive;

/// Object header tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u8)]
pub enum ObjectKind {
    Invalid = 0,
    Utf8String = 1,
    Function = 2,
    Instance = 3,
    Box = 4,
}

/// An immutable UTF-8 string with an explicit length, owned by the intern
/// table. Identity (the handle issued by the table) doubles as content
/// equality.
#[derive(Debug)]
pub struct StringObject {
    kind: ObjectKind,
    contents: Box<str>,
}

impl StringObject {
    pub(crate) fn new(contents: &str) -> Self {
        Self {
            kind: ObjectKind::Utf8String,
            contents: contents.into(),
        }
    }

    pub fn kind(&self) -> ObjectKind {
        self.kind
    }

    pub fn as_str(&self) -> &str {
        &self.contents
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.contents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }
}
