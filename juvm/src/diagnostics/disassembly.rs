//! Textual disassembly of JUDITH bytecode.
//!
//! One line per instruction: the byte offset, the mnemonic, and the
//! decoded operands. String constants are resolved against the block's
//! string table so the output is readable without the binary at hand.

use std::fmt::Write;

use crate::runtime::{Assembly, Block, Chunk, InternedStringTable, JasmFunction, StringHandle};
use crate::vm::opcode::{ConstantType, OpCode};

/// Disassembles every function of every block in `assembly`.
pub fn disassemble_assembly(assembly: &Assembly, interner: &InternedStringTable) -> String {
    let mut out = String::new();
    for block in &assembly.blocks {
        let block_name = resolve(interner, block.name);
        let _ = writeln!(out, "block {}", block_name);
        for func in &block.functions {
            out.push_str(&disassemble_function(block, func, interner));
        }
    }
    out
}

/// Disassembles one function, including its header line.
pub fn disassemble_function(
    block: &Block,
    func: &JasmFunction,
    interner: &InternedStringTable,
) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "func {} (params: {}, max_locals: {}, max_stack: {})",
        resolve(interner, func.name),
        func.parameters.len(),
        func.max_locals,
        func.max_stack,
    );
    out.push_str(&disassemble_chunk(&func.chunk, &block.string_table, interner));
    out
}

/// Disassembles raw code bytes against a block string table.
pub fn disassemble_chunk(
    chunk: &Chunk,
    string_table: &[StringHandle],
    interner: &InternedStringTable,
) -> String {
    let code = &chunk.code;
    let mut out = String::new();
    let mut offset = 0usize;

    while offset < code.len() {
        let line_start = offset;
        let raw = code[offset];
        offset += 1;

        let Ok(op) = OpCode::try_from(raw) else {
            let _ = writeln!(out, "{:#06x}  <unknown {:#04x}>", line_start, raw);
            continue;
        };

        let operand = match operand_text(op, code, &mut offset, string_table, interner) {
            Some(text) => text,
            None => {
                let _ = writeln!(out, "{:#06x}  {:<16}<truncated>", line_start, op.mnemonic());
                break;
            }
        };

        if operand.is_empty() {
            let _ = writeln!(out, "{:#06x}  {}", line_start, op.mnemonic());
        } else {
            let _ = writeln!(out, "{:#06x}  {:<16}{}", line_start, op.mnemonic(), operand);
        }
    }

    out
}

fn operand_text(
    op: OpCode,
    code: &[u8],
    offset: &mut usize,
    string_table: &[StringHandle],
    interner: &InternedStringTable,
) -> Option<String> {
    let text = match op {
        OpCode::Const => format!("{}", take_u8(code, offset)?),
        OpCode::ConstL => format!("{}", take_i32(code, offset)?),
        OpCode::ConstLL => format!("{}", take_i64(code, offset)?),

        OpCode::StrConst => {
            let index = take_u8(code, offset)? as usize;
            string_operand(index, string_table, interner)
        }
        OpCode::StrConstL => {
            let index = take_u32(code, offset)? as usize;
            string_operand(index, string_table, interner)
        }

        OpCode::Store | OpCode::Load => format!("{}", take_u8(code, offset)?),
        OpCode::StoreL | OpCode::LoadL => format!("{}", take_u16(code, offset)?),

        OpCode::Jmp | OpCode::Jtrue | OpCode::JtrueK | OpCode::Jfalse | OpCode::JfalseK => {
            let delta = take_u8(code, offset)? as i8 as i64;
            jump_operand(*offset, delta)
        }
        OpCode::JmpL | OpCode::JtrueL | OpCode::JtrueKL | OpCode::JfalseL | OpCode::JfalseKL => {
            let delta = take_i32(code, offset)? as i64;
            jump_operand(*offset, delta)
        }

        OpCode::Call => format!("{}", take_u32(code, offset)?),

        OpCode::Print => {
            let tag = take_u8(code, offset)?;
            match ConstantType::try_from(tag) {
                Ok(t) => format!("{:?}", t),
                Err(_) => format!("<tag {}>", tag),
            }
        }

        _ => String::new(),
    };
    Some(text)
}

fn string_operand(
    index: usize,
    string_table: &[StringHandle],
    interner: &InternedStringTable,
) -> String {
    match string_table.get(index) {
        Some(&handle) => format!("{} ; {:?}", index, resolve(interner, handle)),
        None => format!("{} ; <out of range>", index),
    }
}

fn jump_operand(after: usize, delta: i64) -> String {
    let target = after as i64 + delta;
    format!("{:+} -> {:#06x}", delta, target)
}

fn resolve(interner: &InternedStringTable, handle: StringHandle) -> &str {
    interner.get(handle).map_or("<invalid>", |s| s.as_str())
}

fn take_u8(code: &[u8], offset: &mut usize) -> Option<u8> {
    let byte = *code.get(*offset)?;
    *offset += 1;
    Some(byte)
}

fn take_u16(code: &[u8], offset: &mut usize) -> Option<u16> {
    let bytes = code.get(*offset..*offset + 2)?;
    *offset += 2;
    Some(u16::from_le_bytes([bytes[0], bytes[1]]))
}

fn take_u32(code: &[u8], offset: &mut usize) -> Option<u32> {
    let bytes = code.get(*offset..*offset + 4)?;
    *offset += 4;
    Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

fn take_i32(code: &[u8], offset: &mut usize) -> Option<i32> {
    take_u32(code, offset).map(|v| v as i32)
}

fn take_i64(code: &[u8], offset: &mut usize) -> Option<i64> {
    let bytes = code.get(*offset..*offset + 8)?;
    *offset += 8;
    let mut raw = [0u8; 8];
    raw.copy_from_slice(bytes);
    Some(i64::from_le_bytes(raw))
}
