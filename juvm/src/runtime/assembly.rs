//! Linked runtime model.
//!
//! Linking turns a parsed [`AssemblyFile`] into an [`Assembly`]: every
//! name and string constant is interned, blocks and functions get their
//! runtime shape, and every function reference is resolved to a concrete
//! callable. Blocks and functions are addressed by index inside their
//! owning containers, so the linked structure is acyclic and nothing
//! needs a fix-up pass after containers stop moving.

use std::rc::Rc;

use thiserror::Error;

use crate::data::{AssemblyFile, ItemRef, StringTable};
use crate::runtime::func_ref::{FuncRef, FunctionCollection};
use crate::runtime::interner::{InternedStringTable, StringHandle};
use crate::runtime::native::NativeAssembly;
use crate::vm::STACK_MAX;

/// Fatal error raised while linking an assembly.
#[derive(Debug, Error)]
pub enum LinkError {
    #[error("name index {index} out of range (name table holds {len} entries)")]
    NameIndexOutOfRange { index: u32, len: usize },
    #[error("string index {index} out of range in block {block} (table holds {len} entries)")]
    StringIndexOutOfRange { block: usize, index: u32, len: usize },
    #[error("name table entry {index} is not valid UTF-8")]
    NameNotUtf8 { index: usize },
    #[error("string table entry {index} in block {block} is not valid UTF-8")]
    StringNotUtf8 { block: usize, index: usize },
    #[error("function reference {entry} names missing block {block}")]
    MissingBlock { entry: usize, block: u32 },
    #[error("function reference {entry} names missing function {index} in block {block}")]
    MissingFunction { entry: usize, block: u32, index: u32 },
    #[error("function reference {entry} names native function {index}, which does not exist")]
    NativeIndexOutOfRange { entry: usize, index: u32 },
    #[error("function reference {entry} is external; external references are not supported")]
    ExternalRefUnsupported { entry: usize },
    #[error("function `{function}` declares max_stack {declared}, above the operand stack capacity {capacity}")]
    StackLimitExceeded {
        function: String,
        declared: u16,
        capacity: usize,
    },
}

/// The executable body of a single function: the raw code bytes. The
/// enclosing block's string table serves the chunk's string constants.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub code: Rc<[u8]>,
}

impl Chunk {
    fn new(code: &[u8]) -> Self {
        Self { code: code.into() }
    }

    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct JasmParameter {
    pub name: StringHandle,
}

/// A linked function.
#[derive(Debug)]
pub struct JasmFunction {
    pub name: StringHandle,
    pub parameters: Vec<JasmParameter>,
    pub max_locals: u16,
    pub max_stack: u16,
    pub chunk: Chunk,
}

/// A linked block: its name, its interned string table, and its functions.
#[derive(Debug)]
pub struct Block {
    pub name: StringHandle,
    pub string_table: Vec<StringHandle>,
    pub functions: Vec<JasmFunction>,
}

/// A fully linked assembly.
#[derive(Debug)]
pub struct Assembly {
    /// One interned handle per name-table entry, ordinals preserved.
    pub name_table: Vec<StringHandle>,
    pub blocks: Vec<Block>,
    pub function_refs: FunctionCollection,
}

impl Assembly {
    /// Links `file` in a fixed order: intern names, build blocks in order,
    /// then resolve every function reference against the finished blocks.
    pub fn build(
        interner: &mut InternedStringTable,
        native: &NativeAssembly,
        file: &AssemblyFile,
    ) -> Result<Self, LinkError> {
        let name_table = intern_name_table(interner, &file.name_table)?;

        let mut blocks = Vec::with_capacity(file.blocks.len());
        for (ordinal, binary_block) in file.blocks.iter().enumerate() {
            blocks.push(build_block(interner, &name_table, ordinal, binary_block)?);
        }

        let function_refs = resolve_func_refs(native, &blocks, &file.func_refs)?;

        let assembly = Assembly {
            name_table,
            blocks,
            function_refs,
        };
        assembly.check_stack_limits(interner)?;
        Ok(assembly)
    }

    fn check_stack_limits(&self, interner: &InternedStringTable) -> Result<(), LinkError> {
        for block in &self.blocks {
            for func in &block.functions {
                if func.max_stack as usize > STACK_MAX {
                    let function = interner
                        .get(func.name)
                        .map(|s| s.as_str().to_string())
                        .unwrap_or_default();
                    return Err(LinkError::StackLimitExceeded {
                        function,
                        declared: func.max_stack,
                        capacity: STACK_MAX,
                    });
                }
            }
        }
        Ok(())
    }
}

fn intern_name_table(
    interner: &mut InternedStringTable,
    table: &StringTable,
) -> Result<Vec<StringHandle>, LinkError> {
    let mut handles = Vec::with_capacity(table.len());
    for index in 0..table.len() {
        let name = table
            .get_str(index)
            .ok_or(LinkError::NameNotUtf8 { index })?;
        handles.push(interner.intern(name));
    }
    Ok(handles)
}

fn build_block(
    interner: &mut InternedStringTable,
    name_table: &[StringHandle],
    ordinal: usize,
    binary_block: &crate::data::BinaryBlock,
) -> Result<Block, LinkError> {
    let name = *name_table
        .get(binary_block.name_index as usize)
        .ok_or(LinkError::NameIndexOutOfRange {
            index: binary_block.name_index,
            len: name_table.len(),
        })?;

    // Bulk-intern the block's private string table, ordinals preserved.
    let mut string_table = Vec::with_capacity(binary_block.string_table.len());
    for index in 0..binary_block.string_table.len() {
        let contents = binary_block
            .string_table
            .get_str(index)
            .ok_or(LinkError::StringNotUtf8 { block: ordinal, index })?;
        string_table.push(interner.intern(contents));
    }

    let mut functions = Vec::with_capacity(binary_block.functions.len());
    for binary_func in &binary_block.functions {
        functions.push(build_function(ordinal, &string_table, binary_func)?);
    }

    Ok(Block {
        name,
        string_table,
        functions,
    })
}

fn build_function(
    block: usize,
    string_table: &[StringHandle],
    binary_func: &crate::data::BinaryFunction,
) -> Result<JasmFunction, LinkError> {
    let lookup = |index: u32| {
        string_table
            .get(index as usize)
            .copied()
            .ok_or(LinkError::StringIndexOutOfRange {
                block,
                index,
                len: string_table.len(),
            })
    };

    // Function and parameter names index the block's string table.
    let name = lookup(binary_func.name_index)?;
    let parameters = binary_func
        .parameters
        .iter()
        .map(|p| Ok(JasmParameter { name: lookup(p.name_index)? }))
        .collect::<Result<Vec<_>, LinkError>>()?;

    Ok(JasmFunction {
        name,
        parameters,
        max_locals: binary_func.max_locals,
        max_stack: binary_func.max_stack,
        chunk: Chunk::new(&binary_func.code),
    })
}

fn resolve_func_refs(
    native: &NativeAssembly,
    blocks: &[Block],
    refs: &[ItemRef],
) -> Result<FunctionCollection, LinkError> {
    let mut resolved = Vec::with_capacity(refs.len());

    for (entry, item) in refs.iter().enumerate() {
        resolved.push(match *item {
            ItemRef::Internal { block, index } => {
                let target_block = blocks
                    .get(block as usize)
                    .ok_or(LinkError::MissingBlock { entry, block })?;
                if target_block.functions.get(index as usize).is_none() {
                    return Err(LinkError::MissingFunction { entry, block, index });
                }
                FuncRef::Internal {
                    block: block as usize,
                    function: index as usize,
                }
            }
            ItemRef::Native { index } => {
                let func = native
                    .function(index)
                    .ok_or(LinkError::NativeIndexOutOfRange { entry, index })?;
                FuncRef::Native(func)
            }
            ItemRef::External { .. } => {
                return Err(LinkError::ExternalRefUnsupported { entry });
            }
        });
    }

    Ok(FunctionCollection::new(resolved))
}
