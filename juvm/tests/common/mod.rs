//! Shared helpers for integration tests: output capture and assembly
//! fabrication.

#![allow(dead_code)]

use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

use juvm::data::writer::{save_to_bytes, AssemblyDef, BlockDef, FunctionDef};
use juvm::data::{AssemblyFile, ItemRef};
use juvm::error::Error;
use juvm::Vm;

/// A `Write` sink the test keeps a handle to after handing it to the VM.
#[derive(Clone, Debug, Default)]
pub struct SharedOutput(Rc<RefCell<Vec<u8>>>);

impl SharedOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        String::from_utf8(self.0.borrow().clone()).expect("VM output was not UTF-8")
    }
}

impl Write for SharedOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A VM whose program output is captured and whose input is empty.
pub fn vm_with_capture() -> (Vm, SharedOutput) {
    let out = SharedOutput::new();
    let vm = Vm::with_io(Box::new(out.clone()), Box::new(io::empty()));
    (vm, out)
}

/// A VM with captured output and the given bytes on standard input.
pub fn vm_with_input(input: &str) -> (Vm, SharedOutput) {
    let out = SharedOutput::new();
    let vm = Vm::with_io(
        Box::new(out.clone()),
        Box::new(io::Cursor::new(input.as_bytes().to_vec())),
    );
    (vm, out)
}

/// Serializes `def` and parses it back, the way the VM would read it from
/// disk.
pub fn assemble(def: &AssemblyDef) -> AssemblyFile {
    AssemblyFile::read(&save_to_bytes(def)).expect("writer produced an unreadable assembly")
}

/// An assembly with one block named `main` whose first function is the
/// entry point. The block string table is `["main"]` followed by
/// `strings`, so test code addresses its own strings from index 1.
pub fn main_def(
    strings: &[&str],
    func_refs: Vec<ItemRef>,
    max_locals: u16,
    code: Vec<u8>,
) -> AssemblyDef {
    let mut all_strings = vec!["main".to_string()];
    all_strings.extend(strings.iter().map(|s| s.to_string()));

    AssemblyDef {
        names: vec!["main".to_string()],
        func_refs,
        blocks: vec![BlockDef {
            name_index: 0,
            strings: all_strings,
            functions: vec![FunctionDef {
                name_index: 0,
                parameters: vec![],
                max_locals,
                max_stack: 16,
                code,
            }],
        }],
        ..AssemblyDef::default()
    }
}

/// Loads `def` into a capturing VM, runs its entry point, and returns the
/// captured output.
pub fn run_program(def: &AssemblyDef) -> Result<String, Error> {
    let (mut vm, out) = vm_with_capture();
    vm.load_assembly("test", &assemble(def))?;
    vm.run("test")?;
    Ok(out.contents())
}
