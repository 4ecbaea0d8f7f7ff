//! Linked runtime model: interned strings, native tables, and the
//! executable form of a loaded assembly.

mod assembly;
mod func_ref;
mod interner;
mod native;
mod object;

pub use assembly::{Assembly, Block, Chunk, JasmFunction, JasmParameter, LinkError};
pub use func_ref::{FuncRef, FunctionCollection};
pub use interner::{InternedStringTable, StringHandle};
pub use native::{NativeAssembly, NativeFunction, NativeType, NativeTypeKind, NativeTypeTag};
pub use object::{ObjectKind, StringObject};
