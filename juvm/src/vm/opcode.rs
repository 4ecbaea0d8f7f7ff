//! Instruction encoding.
//!
//! Opcodes are single bytes; immediates follow in little-endian. Jump
//! offsets are signed (one byte in the short forms, four in the `_L`
//! forms) and are added to the instruction pointer after the jump's
//! operands have been consumed.

use num_enum::TryFromPrimitive;

/// The instruction set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u8)]
pub enum OpCode {
    Noop = 0x00,
    /// Reserved for future native-call dispatch.
    Native = 0x01,

    /// Push the u8 operand as an integer literal.
    Const = 0x02,
    /// Push the i32 operand as an integer literal.
    ConstL = 0x03,
    /// Push an inline i64 literal.
    ConstLL = 0x04,
    Const0 = 0x05,
    FConst1 = 0x06,
    FConst2 = 0x07,
    IConst1 = 0x08,
    IConst2 = 0x09,
    /// Push the interned string at the u8 index into the current block's
    /// string table.
    StrConst = 0x0a,
    /// `StrConst` with a u32 index.
    StrConstL = 0x0b,

    Ret = 0x0c,

    FNeg = 0x0d,
    FAdd = 0x0e,
    FSub = 0x0f,
    FMul = 0x10,
    FDiv = 0x11,
    FGt = 0x12,
    FGe = 0x13,
    FLt = 0x14,
    FLe = 0x15,

    INeg = 0x16,
    IAdd = 0x17,
    IAddChecked = 0x18,
    ISub = 0x19,
    ISubChecked = 0x1a,
    IMul = 0x1b,
    IMulChecked = 0x1c,
    IDiv = 0x1d,
    IDivChecked = 0x1e,
    IGt = 0x1f,
    IGe = 0x20,
    ILt = 0x21,
    ILe = 0x22,

    /// Bitwise equality of two cells.
    Eq = 0x23,
    Neq = 0x24,

    Pop = 0x25,

    Store0 = 0x26,
    Store1 = 0x27,
    Store2 = 0x28,
    Store3 = 0x29,
    Store4 = 0x2a,
    /// Store into the local at the u8 index.
    Store = 0x2b,
    /// Store into the local at the u16 index.
    StoreL = 0x2c,

    Load0 = 0x2d,
    Load1 = 0x2e,
    Load2 = 0x2f,
    Load3 = 0x30,
    Load4 = 0x31,
    Load = 0x32,
    LoadL = 0x33,

    Jmp = 0x34,
    JmpL = 0x35,
    Jtrue = 0x36,
    JtrueL = 0x37,
    /// Like `Jtrue`, but keeps the condition on the stack when the jump is
    /// taken; pops it only on fall-through.
    JtrueK = 0x38,
    JtrueKL = 0x39,
    Jfalse = 0x3a,
    JfalseL = 0x3b,
    JfalseK = 0x3c,
    JfalseKL = 0x3d,

    /// Dispatch through the enclosing assembly's function references; the
    /// u32 operand is the reference index.
    Call = 0x3e,
    /// Pop and print the top of the stack; the u8 operand is the value's
    /// constant-type tag.
    Print = 0x3f,
}

impl OpCode {
    /// The mnemonic used by the disassembler.
    pub fn mnemonic(self) -> &'static str {
        match self {
            OpCode::Noop => "NOOP",
            OpCode::Native => "NATIVE",
            OpCode::Const => "CONST",
            OpCode::ConstL => "CONST_L",
            OpCode::ConstLL => "CONST_L_L",
            OpCode::Const0 => "CONST_0",
            OpCode::FConst1 => "F_CONST_1",
            OpCode::FConst2 => "F_CONST_2",
            OpCode::IConst1 => "I_CONST_1",
            OpCode::IConst2 => "I_CONST_2",
            OpCode::StrConst => "STR_CONST",
            OpCode::StrConstL => "STR_CONST_L",
            OpCode::Ret => "RET",
            OpCode::FNeg => "F_NEG",
            OpCode::FAdd => "F_ADD",
            OpCode::FSub => "F_SUB",
            OpCode::FMul => "F_MUL",
            OpCode::FDiv => "F_DIV",
            OpCode::FGt => "F_GT",
            OpCode::FGe => "F_GE",
            OpCode::FLt => "F_LT",
            OpCode::FLe => "F_LE",
            OpCode::INeg => "I_NEG",
            OpCode::IAdd => "I_ADD",
            OpCode::IAddChecked => "I_ADD_CHECKED",
            OpCode::ISub => "I_SUB",
            OpCode::ISubChecked => "I_SUB_CHECKED",
            OpCode::IMul => "I_MUL",
            OpCode::IMulChecked => "I_MUL_CHECKED",
            OpCode::IDiv => "I_DIV",
            OpCode::IDivChecked => "I_DIV_CHECKED",
            OpCode::IGt => "I_GT",
            OpCode::IGe => "I_GE",
            OpCode::ILt => "I_LT",
            OpCode::ILe => "I_LE",
            OpCode::Eq => "EQ",
            OpCode::Neq => "NEQ",
            OpCode::Pop => "POP",
            OpCode::Store0 => "STORE_0",
            OpCode::Store1 => "STORE_1",
            OpCode::Store2 => "STORE_2",
            OpCode::Store3 => "STORE_3",
            OpCode::Store4 => "STORE_4",
            OpCode::Store => "STORE",
            OpCode::StoreL => "STORE_L",
            OpCode::Load0 => "LOAD_0",
            OpCode::Load1 => "LOAD_1",
            OpCode::Load2 => "LOAD_2",
            OpCode::Load3 => "LOAD_3",
            OpCode::Load4 => "LOAD_4",
            OpCode::Load => "LOAD",
            OpCode::LoadL => "LOAD_L",
            OpCode::Jmp => "JMP",
            OpCode::JmpL => "JMP_L",
            OpCode::Jtrue => "JTRUE",
            OpCode::JtrueL => "JTRUE_L",
            OpCode::JtrueK => "JTRUE_K",
            OpCode::JtrueKL => "JTRUE_K_L",
            OpCode::Jfalse => "JFALSE",
            OpCode::JfalseL => "JFALSE_L",
            OpCode::JfalseK => "JFALSE_K",
            OpCode::JfalseKL => "JFALSE_K_L",
            OpCode::Call => "CALL",
            OpCode::Print => "PRINT",
        }
    }
}

/// Tags identifying how `PRINT` should format its operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u8)]
pub enum ConstantType {
    Error = 0,
    Int64 = 1,
    Float64 = 2,
    UnsignedInt64 = 3,
    StringUtf8 = 4,
    Bool = 5,
}
