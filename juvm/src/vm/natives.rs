//! Native function bodies.
//!
//! These run directly against the VM state instead of a chunk. Argument
//! passing follows the same contract as bytecode functions: the caller
//! leaves arguments on the operand stack and the native consumes them.

use std::io::{BufRead, Write};

use crate::runtime::{NativeFunction, ObjectKind};
use crate::vm::error::VmError;
use crate::vm::value::Value;
use crate::vm::Vm;

impl Vm {
    pub(crate) fn run_native(&mut self, func: NativeFunction) -> Result<(), VmError> {
        match func {
            NativeFunction::Error => self.native_error(),
            NativeFunction::Print => self.native_print(),
            NativeFunction::Println => {
                self.native_print()?;
                writeln!(self.output)?;
                Ok(())
            }
            NativeFunction::Readln => self.native_readln(),
        }
    }

    /// Pops a message (when it is an interned string) and raises a fatal
    /// runtime error.
    fn native_error(&mut self) -> Result<(), VmError> {
        let value = self.pop_value()?;
        let message = self
            .interner
            .resolve_bits(value.as_u64())
            .map(|s| s.as_str().to_string())
            .unwrap_or_default();
        Err(VmError::ErrorCalled(message))
    }

    /// Pops a value that must be a UTF-8 string object and writes its
    /// bytes, without a trailing newline.
    fn native_print(&mut self) -> Result<(), VmError> {
        let value = self.pop_value()?;
        let object = self
            .interner
            .resolve_bits(value.as_u64())
            .ok_or(VmError::NotAString)?;
        if object.kind() != ObjectKind::Utf8String {
            return Err(VmError::NotAString);
        }
        write!(self.output, "{}", object.as_str())?;
        Ok(())
    }

    /// Reads one line from the VM's input, interns it, and pushes the
    /// resulting string.
    fn native_readln(&mut self) -> Result<(), VmError> {
        let mut line = String::new();
        self.input.read_line(&mut line)?;
        while line.ends_with('\n') || line.ends_with('\r') {
            line.pop();
        }
        let handle = self.interner.intern(&line);
        self.push_value(Value::from_string(handle))
    }
}
