//! Human-readable views of loaded code.

mod disassembly;

pub use disassembly::{disassemble_assembly, disassemble_chunk, disassemble_function};
