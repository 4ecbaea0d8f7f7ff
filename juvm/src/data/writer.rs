//! JUDITH assembly serializer.
//!
//! The exact inverse of the reader in [`crate::data`]: takes a plain
//! description of an assembly and emits the on-disk byte layout. The
//! compiler that produces real assemblies lives outside this crate; this
//! writer exists for toolchains embedding the VM and for tests that need
//! to fabricate assemblies byte for byte.

use std::io;
use std::path::Path;

use crate::data::{AssemblyVersion, ItemRef, MAGIC};

/// Description of a function to serialize.
#[derive(Debug, Clone, Default)]
pub struct FunctionDef {
    /// Index into the enclosing block's string list.
    pub name_index: u32,
    /// One string index per parameter name.
    pub parameters: Vec<u32>,
    pub max_locals: u16,
    pub max_stack: u16,
    pub code: Vec<u8>,
}

/// Description of a block to serialize.
#[derive(Debug, Clone, Default)]
pub struct BlockDef {
    /// Index into the assembly's name list.
    pub name_index: u32,
    pub strings: Vec<String>,
    pub functions: Vec<FunctionDef>,
}

/// Description of a whole assembly to serialize.
#[derive(Debug, Clone)]
pub struct AssemblyDef {
    pub judith_version: u32,
    pub version: AssemblyVersion,
    pub names: Vec<String>,
    pub type_refs: Vec<ItemRef>,
    pub func_refs: Vec<ItemRef>,
    pub blocks: Vec<BlockDef>,
}

impl Default for AssemblyDef {
    fn default() -> Self {
        Self {
            judith_version: 1,
            version: AssemblyVersion::default(),
            names: Vec::new(),
            type_refs: Vec::new(),
            func_refs: Vec::new(),
            blocks: Vec::new(),
        }
    }
}

/// Serializes an assembly description to JUDITH bytes.
pub fn save_to_bytes(def: &AssemblyDef) -> Vec<u8> {
    let mut out = Vec::new();

    out.extend_from_slice(MAGIC);
    out.push(0); // endianness: little-endian
    out.extend_from_slice(&def.judith_version.to_le_bytes());
    write_version(&mut out, def.version);

    write_string_table(&mut out, &def.names);

    out.extend_from_slice(&0u32.to_le_bytes()); // dep_count

    write_item_ref_table(&mut out, &def.type_refs);
    write_item_ref_table(&mut out, &def.func_refs);

    out.extend_from_slice(&(def.blocks.len() as u32).to_le_bytes());
    for block in &def.blocks {
        write_block(&mut out, block);
    }

    out
}

/// Serializes an assembly description and writes it to `path`.
pub fn save<P: AsRef<Path>>(def: &AssemblyDef, path: P) -> io::Result<()> {
    std::fs::write(path, save_to_bytes(def))
}

fn write_version(out: &mut Vec<u8>, version: AssemblyVersion) {
    out.extend_from_slice(&version.major.to_le_bytes());
    out.extend_from_slice(&version.minor.to_le_bytes());
    out.extend_from_slice(&version.patch.to_le_bytes());
    out.extend_from_slice(&version.build.to_le_bytes());
}

fn write_string_table(out: &mut Vec<u8>, strings: &[String]) {
    let body_size: usize = strings.iter().map(|s| 8 + s.len()).sum();
    out.extend_from_slice(&(body_size as u32).to_le_bytes());
    out.extend_from_slice(&(strings.len() as u32).to_le_bytes());
    for s in strings {
        out.extend_from_slice(&(s.len() as u64).to_le_bytes());
        out.extend_from_slice(s.as_bytes());
    }
}

fn write_item_ref_table(out: &mut Vec<u8>, refs: &[ItemRef]) {
    out.extend_from_slice(&(refs.len() as u32).to_le_bytes());
    for item in refs {
        out.extend_from_slice(&(item.kind() as u32).to_le_bytes());
        match *item {
            ItemRef::Internal { block, index } => {
                out.extend_from_slice(&block.to_le_bytes());
                out.extend_from_slice(&index.to_le_bytes());
            }
            ItemRef::Native { index } => {
                out.extend_from_slice(&index.to_le_bytes());
            }
            ItemRef::External {
                block_name_index,
                item_name_index,
            } => {
                out.extend_from_slice(&block_name_index.to_le_bytes());
                out.extend_from_slice(&item_name_index.to_le_bytes());
            }
        }
    }
}

fn write_block(out: &mut Vec<u8>, block: &BlockDef) {
    out.extend_from_slice(&block.name_index.to_le_bytes());
    write_string_table(out, &block.strings);
    out.extend_from_slice(&0u32.to_le_bytes()); // type_count
    out.extend_from_slice(&(block.functions.len() as u32).to_le_bytes());
    for func in &block.functions {
        write_function(out, func);
    }
}

fn write_function(out: &mut Vec<u8>, func: &FunctionDef) {
    out.extend_from_slice(&func.name_index.to_le_bytes());
    out.extend_from_slice(&(func.parameters.len() as u16).to_le_bytes());
    for name_index in &func.parameters {
        out.extend_from_slice(&name_index.to_le_bytes());
    }
    out.extend_from_slice(&func.max_locals.to_le_bytes());
    out.extend_from_slice(&func.max_stack.to_le_bytes());
    out.extend_from_slice(&(func.code.len() as u32).to_le_bytes());
    out.extend_from_slice(&func.code);
}
