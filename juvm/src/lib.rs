// Prevent accidental debug output in library code; everything a program
// prints goes through the VM's output sink. CLI binaries (bin/) may use
// eprintln!() for user-facing error messages.
#![deny(clippy::print_stderr)]
#![deny(clippy::print_stdout)]

//! A stack-based virtual machine for the JUDITH binary assembly format.
//!
//! The pipeline has three stages: the binary loader parses an assembly
//! file into an [`AssemblyFile`](data::AssemblyFile); the linker builds a
//! runtime [`Assembly`](runtime::Assembly) from it, interning every string
//! and resolving every function reference; the interpreter executes a
//! linked function against an operand stack and per-frame locals.
//!
//! ```no_run
//! use juvm::Vm;
//!
//! let mut vm = Vm::new();
//! vm.start("res/test.jdll").expect("execution failed");
//! ```

pub mod buffer;
pub mod data;
pub mod diagnostics;
pub mod error;
pub mod runtime;
pub mod vm;

pub use error::Error;
pub use vm::{Value, Vm, VmError, STACK_MAX};
