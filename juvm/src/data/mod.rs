//! Binary file model for JUDITH assemblies.
//!
//! This module mirrors the on-disk layout of an assembly file (commonly
//! named `*.jdll`) and parses it in a single pass. Loading executes no
//! code; the result is a passive [`AssemblyFile`] that the linker turns
//! into a runtime [`Assembly`](crate::runtime::Assembly).
//!
//! # File format
//!
//! ```text
//! +----------------------+
//! | Magic (6 bytes)      |  "JUDITH"
//! +----------------------+
//! | Endianness (1 byte)  |  discarded; little-endian is mandatory
//! +----------------------+
//! | judith_version (u32) |  toolchain version
//! +----------------------+
//! | version (4 x u16)    |  major, minor, patch, build
//! +----------------------+
//! | name table           |  StringTable: every identifier used by refs
//! +----------------------+
//! | dep_count (u32)      |  must be 0; dependencies are not supported
//! +----------------------+
//! | type_ref_table       |  count, then tagged ItemRef entries
//! +----------------------+
//! | func_ref_table       |  count, then tagged ItemRef entries
//! +----------------------+
//! | block_count (u32)    |
//! | blocks               |  see BinaryBlock
//! +----------------------+
//! ```
//!
//! A block is `name_index: u32`, its own string table, `type_count: u32`
//! (must be 0), `func_count: u32`, then that many functions. A function is
//! `name_index: u32`, `param_count: u16`, one `name_index: u32` per
//! parameter, `max_locals: u16`, `max_stack: u16`, `code_length: u32`,
//! then the raw code bytes. All multi-byte integers are little-endian.

mod item_ref;
mod string_table;
pub mod writer;

pub use item_ref::{read_item_ref_table, ItemRef, RefKind};
pub use string_table::StringTable;

use std::fmt;
use std::path::Path;

use thiserror::Error;

use crate::buffer::Reader;

/// Magic bytes identifying a JUDITH assembly file.
pub const MAGIC: &[u8; 6] = b"JUDITH";

/// Binary format error raised while parsing an assembly file.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid magic number; not a JUDITH assembly")]
    InvalidMagic,
    #[error("unexpected end of file at offset {offset} ({needed} more bytes needed)")]
    UnexpectedEof { offset: usize, needed: usize },
    #[error("assembly declares {0} dependencies; dependency loading is not supported")]
    DependenciesUnsupported(u32),
    #[error("block declares {0} types; type tables are not supported")]
    TypesUnsupported(u32),
    #[error("unknown item reference kind {kind} at offset {offset}")]
    UnknownRefKind { kind: u32, offset: usize },
}

/// The version of the assembly itself, as recorded by its producer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssemblyVersion {
    pub major: u16,
    pub minor: u16,
    pub patch: u16,
    pub build: u16,
}

impl fmt::Display for AssemblyVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}",
            self.major, self.minor, self.patch, self.build
        )
    }
}

/// A parameter of a [`BinaryFunction`]. Parameters carry a name only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BinaryParameter {
    /// Index into the enclosing block's string table.
    pub name_index: u32,
}

/// A function as it appears on disk: metadata plus a raw chunk of code.
#[derive(Debug)]
pub struct BinaryFunction {
    /// Index into the enclosing block's string table.
    pub name_index: u32,
    pub parameters: Vec<BinaryParameter>,
    pub max_locals: u16,
    pub max_stack: u16,
    pub code: Vec<u8>,
}

/// A namespace-like unit inside an assembly, holding a private string
/// table and a function table.
#[derive(Debug)]
pub struct BinaryBlock {
    /// Index into the enclosing assembly's name table.
    pub name_index: u32,
    pub string_table: StringTable,
    pub functions: Vec<BinaryFunction>,
}

/// The parsed, in-memory form of one assembly file.
#[derive(Debug)]
pub struct AssemblyFile {
    pub judith_version: u32,
    pub version: AssemblyVersion,
    pub name_table: StringTable,
    pub type_refs: Vec<ItemRef>,
    pub func_refs: Vec<ItemRef>,
    pub blocks: Vec<BinaryBlock>,
}

impl AssemblyFile {
    /// Reads a whole file from disk and parses it.
    pub fn read_from_file<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        let bytes = std::fs::read(path)?;
        Self::read(&bytes)
    }

    /// Parses an assembly from raw bytes.
    pub fn read(bytes: &[u8]) -> Result<Self, LoadError> {
        let mut reader = Reader::new(bytes);

        let magic = reader.read_bytes(MAGIC.len())?;
        if magic != MAGIC {
            return Err(LoadError::InvalidMagic);
        }

        reader.read_u8()?; // endianness; little-endian is mandatory

        let judith_version = reader.read_u32()?;
        let version = read_version(&mut reader)?;

        let name_table = StringTable::read(&mut reader)?;

        let dep_count = reader.read_u32()?;
        if dep_count != 0 {
            return Err(LoadError::DependenciesUnsupported(dep_count));
        }

        let type_refs = read_item_ref_table(&mut reader)?;
        let func_refs = read_item_ref_table(&mut reader)?;

        let block_count = reader.read_u32()? as usize;
        let mut blocks = Vec::with_capacity(block_count);
        for _ in 0..block_count {
            blocks.push(read_block(&mut reader)?);
        }

        Ok(Self {
            judith_version,
            version,
            name_table,
            type_refs,
            func_refs,
            blocks,
        })
    }
}

fn read_version(reader: &mut Reader<'_>) -> Result<AssemblyVersion, LoadError> {
    Ok(AssemblyVersion {
        major: reader.read_u16()?,
        minor: reader.read_u16()?,
        patch: reader.read_u16()?,
        build: reader.read_u16()?,
    })
}

fn read_block(reader: &mut Reader<'_>) -> Result<BinaryBlock, LoadError> {
    let name_index = reader.read_u32()?;
    let string_table = StringTable::read(reader)?;

    let type_count = reader.read_u32()?;
    if type_count != 0 {
        return Err(LoadError::TypesUnsupported(type_count));
    }

    let func_count = reader.read_u32()? as usize;
    let mut functions = Vec::with_capacity(func_count);
    for _ in 0..func_count {
        functions.push(read_function(reader)?);
    }

    Ok(BinaryBlock {
        name_index,
        string_table,
        functions,
    })
}

fn read_function(reader: &mut Reader<'_>) -> Result<BinaryFunction, LoadError> {
    let name_index = reader.read_u32()?;

    let param_count = reader.read_u16()? as usize;
    let mut parameters = Vec::with_capacity(param_count);
    for _ in 0..param_count {
        parameters.push(BinaryParameter {
            name_index: reader.read_u32()?,
        });
    }

    let max_locals = reader.read_u16()?;
    let max_stack = reader.read_u16()?;

    let code_length = reader.read_u32()? as usize;
    let code = reader.read_bytes(code_length)?.to_vec();

    Ok(BinaryFunction {
        name_index,
        parameters,
        max_locals,
        max_stack,
        code,
    })
}
