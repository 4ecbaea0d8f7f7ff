//! The virtual machine.
//!
//! A [`Vm`] owns every piece of long-lived mutable state: the string
//! intern table, the native assembly, the loaded assemblies, the operand
//! stack, and the locals-frame stack. Construction is cheap and VMs are
//! independent of each other; there is no process-global state.
//!
//! Execution is strictly single-threaded. `CALL` is a synchronous nested
//! invocation of the interpreter on the same thread, and a fatal runtime
//! error unwinds the whole execution.

pub mod error;
mod exec;
mod natives;
pub mod opcode;
pub mod value;

pub use error::VmError;
pub use value::Value;

use std::collections::HashMap;
use std::fmt;
use std::io::{self, BufRead, Write};
use std::path::Path;

use crate::data::AssemblyFile;
use crate::error::Error;
use crate::runtime::{Assembly, InternedStringTable, NativeAssembly};

/// Operand stack capacity, in value cells. Each function's declared
/// `max_stack` is validated against this at link time.
pub const STACK_MAX: usize = 1024;

/// One call frame: the function's local variable array.
#[derive(Debug)]
pub(crate) struct Frame {
    locals: Vec<Value>,
}

/// The virtual machine.
pub struct Vm {
    pub(crate) interner: InternedStringTable,
    native: NativeAssembly,
    /// Registered assembly names, mapping into `loaded`.
    assemblies: HashMap<String, usize>,
    pub(crate) loaded: Vec<Assembly>,
    stack: Vec<Value>,
    frames: Vec<Frame>,
    pub(crate) output: Box<dyn Write>,
    pub(crate) input: Box<dyn BufRead>,
}

impl fmt::Debug for Vm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Vm")
            .field("assemblies", &self.assemblies)
            .field("stack_depth", &self.stack.len())
            .field("frame_depth", &self.frames.len())
            .field("interned_strings", &self.interner.len())
            .finish_non_exhaustive()
    }
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}

impl Vm {
    /// A VM wired to standard output and standard input.
    pub fn new() -> Self {
        Self::with_io(
            Box::new(io::stdout()),
            Box::new(io::BufReader::new(io::stdin())),
        )
    }

    /// A VM whose program output goes to `output` instead of stdout.
    pub fn with_output(output: Box<dyn Write>) -> Self {
        Self::with_io(output, Box::new(io::BufReader::new(io::stdin())))
    }

    pub fn with_io(output: Box<dyn Write>, input: Box<dyn BufRead>) -> Self {
        let mut interner = InternedStringTable::new();
        let native = NativeAssembly::new(&mut interner);
        Self {
            interner,
            native,
            assemblies: HashMap::new(),
            loaded: Vec::new(),
            stack: Vec::with_capacity(STACK_MAX),
            frames: Vec::new(),
            output,
            input,
        }
    }

    pub fn interner(&self) -> &InternedStringTable {
        &self.interner
    }

    pub fn native_assembly(&self) -> &NativeAssembly {
        &self.native
    }

    pub fn assembly(&self, name: &str) -> Option<&Assembly> {
        self.assemblies.get(name).map(|&index| &self.loaded[index])
    }

    /// Current operand stack depth. Zero between top-level executions of a
    /// well-formed assembly.
    pub fn stack_depth(&self) -> usize {
        self.stack.len()
    }

    /// Loads the given file as an executable assembly and starts execution
    /// at its entry point, the first function of its first block. The file
    /// name's stem becomes the assembly name.
    pub fn start<P: AsRef<Path>>(&mut self, entry_point: P) -> Result<(), Error> {
        let path = entry_point.as_ref();
        let name = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .ok_or_else(|| Error::BadEntryPath(path.display().to_string()))?
            .to_string();

        let file = AssemblyFile::read_from_file(path)?;
        self.load_assembly(&name, &file)?;
        self.run(&name)
    }

    /// Links `file` and registers the result under `name`.
    pub fn load_assembly(&mut self, name: &str, file: &AssemblyFile) -> Result<(), Error> {
        let assembly = Assembly::build(&mut self.interner, &self.native, file)?;
        let index = self.loaded.len();
        self.loaded.push(assembly);
        self.assemblies.insert(name.to_string(), index);
        Ok(())
    }

    /// Executes the entry point of a previously loaded assembly.
    pub fn run(&mut self, name: &str) -> Result<(), Error> {
        let &index = self
            .assemblies
            .get(name)
            .ok_or_else(|| Error::AssemblyNotLoaded(name.to_string()))?;

        let has_entry = self.loaded[index]
            .blocks
            .first()
            .is_some_and(|block| !block.functions.is_empty());
        if !has_entry {
            return Err(Error::NoEntryFunction(name.to_string()));
        }

        self.execute(index, 0, 0)?;
        self.output.flush().map_err(VmError::from)?;
        Ok(())
    }

    // Operand stack.

    pub(crate) fn push_value(&mut self, value: Value) -> Result<(), VmError> {
        if self.stack.len() == STACK_MAX {
            return Err(VmError::StackOverflow);
        }
        self.stack.push(value);
        Ok(())
    }

    pub(crate) fn pop_value(&mut self) -> Result<Value, VmError> {
        self.stack.pop().ok_or(VmError::StackUnderflow)
    }

    pub(crate) fn peek_value(&self) -> Result<Value, VmError> {
        self.stack.last().copied().ok_or(VmError::StackUnderflow)
    }

    // Locals frames.

    pub(crate) fn enter_function(&mut self, max_locals: usize) {
        self.frames.push(Frame {
            locals: vec![Value::ZERO; max_locals],
        });
    }

    pub(crate) fn exit_function(&mut self) {
        self.frames.pop();
    }

    /// Pops the top of the stack into the local at `index`.
    pub(crate) fn store_local(&mut self, index: usize) -> Result<(), VmError> {
        let value = self.pop_value()?;
        let frame = self.frames.last_mut().ok_or(VmError::NoActiveFrame)?;
        let max_locals = frame.locals.len();
        let slot = frame
            .locals
            .get_mut(index)
            .ok_or(VmError::LocalOutOfRange { index, max_locals })?;
        *slot = value;
        Ok(())
    }

    /// Pushes the local at `index` onto the stack.
    pub(crate) fn load_local(&mut self, index: usize) -> Result<(), VmError> {
        let frame = self.frames.last().ok_or(VmError::NoActiveFrame)?;
        let max_locals = frame.locals.len();
        let value = *frame
            .locals
            .get(index)
            .ok_or(VmError::LocalOutOfRange { index, max_locals })?;
        self.push_value(value)
    }
}
