//! Runtime errors raised during VM execution.

/// A fatal runtime error. Execution unwinds to the caller of
/// [`Vm::start`](crate::vm::Vm::start); the VM should be discarded
/// afterwards, as partially-executed instructions leave the stack in
/// whatever intermediate state they had reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VmError {
    StackOverflow,
    StackUnderflow,
    /// A local slot was touched with no frame active.
    NoActiveFrame,
    /// The instruction pointer left the chunk, either by running past the
    /// end or by a jump to a negative offset.
    IpOutOfRange { offset: usize },
    UnknownOpcode { opcode: u8, offset: usize },
    /// `NATIVE` is reserved and must not appear in emitted code.
    ReservedOpcode { offset: usize },
    LocalOutOfRange { index: usize, max_locals: usize },
    StringIndexOutOfRange { index: u32, len: usize },
    /// `CALL` with an index the function reference table does not cover.
    UnresolvedFunction { index: u32 },
    DivisionByZero,
    IntegerOverflow { mnemonic: &'static str },
    /// A value that had to be an interned string was not one.
    NotAString,
    /// The `error` native function was invoked.
    ErrorCalled(String),
    Io(String),
}

impl std::fmt::Display for VmError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StackOverflow => write!(f, "Operand stack overflow"),
            Self::StackUnderflow => write!(f, "Operand stack underflow"),
            Self::NoActiveFrame => write!(f, "No active call frame"),
            Self::IpOutOfRange { offset } => {
                write!(f, "Instruction pointer out of range at offset {}", offset)
            }
            Self::UnknownOpcode { opcode, offset } => {
                write!(f, "Unknown opcode {:#04x} at offset {}", opcode, offset)
            }
            Self::ReservedOpcode { offset } => {
                write!(f, "Reserved opcode NATIVE executed at offset {}", offset)
            }
            Self::LocalOutOfRange { index, max_locals } => {
                write!(
                    f,
                    "Local index {} out of range (frame has {} locals)",
                    index, max_locals
                )
            }
            Self::StringIndexOutOfRange { index, len } => {
                write!(
                    f,
                    "String constant {} out of range (block has {} strings)",
                    index, len
                )
            }
            Self::UnresolvedFunction { index } => {
                write!(f, "Call to unresolved function reference {}", index)
            }
            Self::DivisionByZero => write!(f, "Division by zero"),
            Self::IntegerOverflow { mnemonic } => {
                write!(f, "Integer overflow in {}", mnemonic)
            }
            Self::NotAString => write!(f, "Expected an interned string value"),
            Self::ErrorCalled(msg) => {
                if msg.is_empty() {
                    write!(f, "error called")
                } else {
                    write!(f, "error: {}", msg)
                }
            }
            Self::Io(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl std::error::Error for VmError {}

impl From<std::io::Error> for VmError {
    fn from(e: std::io::Error) -> Self {
        VmError::Io(e.to_string())
    }
}
