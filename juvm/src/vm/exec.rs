//! The interpreter loop.
//!
//! A classic stack machine: one big match on the opcode byte. The
//! instruction pointer is advanced past the opcode before its body runs;
//! operand reads advance it further. Jump offsets are applied after the
//! jump's operands have been consumed.

use std::io::Write;
use std::rc::Rc;

use crate::runtime::FuncRef;
use crate::vm::error::VmError;
use crate::vm::opcode::{ConstantType, OpCode};
use crate::vm::value::Value;
use crate::vm::Vm;

impl Vm {
    /// Runs one function to its `RET`, entering and leaving a locals
    /// frame around it. `CALL` re-enters this method for the callee.
    pub(crate) fn execute(
        &mut self,
        assembly: usize,
        block: usize,
        function: usize,
    ) -> Result<(), VmError> {
        let (code, max_locals) = {
            let func = &self.loaded[assembly].blocks[block].functions[function];
            (Rc::clone(&func.chunk.code), func.max_locals)
        };

        self.enter_function(max_locals as usize);
        self.run_chunk(&code, assembly, block)?;
        self.exit_function();
        Ok(())
    }

    fn run_chunk(&mut self, code: &[u8], assembly: usize, block: usize) -> Result<(), VmError> {
        let mut ip = 0usize;

        loop {
            let op_offset = ip;
            let raw = fetch_u8(code, &mut ip)?;
            let op = OpCode::try_from(raw).map_err(|_| VmError::UnknownOpcode {
                opcode: raw,
                offset: op_offset,
            })?;

            match op {
                OpCode::Noop => {}

                OpCode::Native => {
                    return Err(VmError::ReservedOpcode { offset: op_offset });
                }

                OpCode::Const => {
                    let literal = fetch_u8(code, &mut ip)? as i64;
                    self.push_value(Value::from_i64(literal))?;
                }

                OpCode::ConstL => {
                    let literal = fetch_i32(code, &mut ip)? as i64;
                    self.push_value(Value::from_i64(literal))?;
                }

                OpCode::ConstLL => {
                    let literal = fetch_i64(code, &mut ip)?;
                    self.push_value(Value::from_i64(literal))?;
                }

                OpCode::Const0 => self.push_value(Value::ZERO)?,
                OpCode::FConst1 => self.push_value(Value::from_f64(1.0))?,
                OpCode::FConst2 => self.push_value(Value::from_f64(2.0))?,
                OpCode::IConst1 => self.push_value(Value::from_i64(1))?,
                OpCode::IConst2 => self.push_value(Value::from_i64(2))?,

                OpCode::StrConst => {
                    let index = fetch_u8(code, &mut ip)? as u32;
                    self.push_string_constant(assembly, block, index)?;
                }

                OpCode::StrConstL => {
                    let index = fetch_u32(code, &mut ip)?;
                    self.push_string_constant(assembly, block, index)?;
                }

                OpCode::Ret => return Ok(()),

                OpCode::FNeg => {
                    let v = self.pop_value()?.as_f64();
                    self.push_value(Value::from_f64(-v))?;
                }

                OpCode::FAdd => self.f_binary(|a, b| a + b)?,
                OpCode::FSub => self.f_binary(|a, b| a - b)?,
                OpCode::FMul => self.f_binary(|a, b| a * b)?,
                // IEEE semantics: dividing by zero yields an infinity or
                // NaN, never a fault.
                OpCode::FDiv => self.f_binary(|a, b| a / b)?,

                OpCode::FGt => self.f_compare(|a, b| a > b)?,
                OpCode::FGe => self.f_compare(|a, b| a >= b)?,
                OpCode::FLt => self.f_compare(|a, b| a < b)?,
                OpCode::FLe => self.f_compare(|a, b| a <= b)?,

                OpCode::INeg => {
                    let v = self.pop_value()?.as_i64();
                    self.push_value(Value::from_i64(v.wrapping_neg()))?;
                }

                OpCode::IAdd => self.i_binary(i64::wrapping_add)?,
                OpCode::ISub => self.i_binary(i64::wrapping_sub)?,
                OpCode::IMul => self.i_binary(i64::wrapping_mul)?,

                OpCode::IAddChecked => self.i_checked("I_ADD_CHECKED", i64::checked_add)?,
                OpCode::ISubChecked => self.i_checked("I_SUB_CHECKED", i64::checked_sub)?,
                OpCode::IMulChecked => self.i_checked("I_MUL_CHECKED", i64::checked_mul)?,

                OpCode::IDiv => {
                    let b = self.pop_value()?.as_i64();
                    let a = self.pop_value()?.as_i64();
                    if b == 0 {
                        return Err(VmError::DivisionByZero);
                    }
                    self.push_value(Value::from_i64(a.wrapping_div(b)))?;
                }

                OpCode::IDivChecked => {
                    let b = self.pop_value()?.as_i64();
                    let a = self.pop_value()?.as_i64();
                    if b == 0 {
                        return Err(VmError::DivisionByZero);
                    }
                    let quotient = a
                        .checked_div(b)
                        .ok_or(VmError::IntegerOverflow { mnemonic: "I_DIV_CHECKED" })?;
                    self.push_value(Value::from_i64(quotient))?;
                }

                OpCode::IGt => self.i_compare(|a, b| a > b)?,
                OpCode::IGe => self.i_compare(|a, b| a >= b)?,
                OpCode::ILt => self.i_compare(|a, b| a < b)?,
                OpCode::ILe => self.i_compare(|a, b| a <= b)?,

                // Generic equality is bitwise over the whole cell.
                OpCode::Eq => {
                    let b = self.pop_value()?.as_u64();
                    let a = self.pop_value()?.as_u64();
                    self.push_value(Value::from_bool(a == b))?;
                }

                OpCode::Neq => {
                    let b = self.pop_value()?.as_u64();
                    let a = self.pop_value()?.as_u64();
                    self.push_value(Value::from_bool(a != b))?;
                }

                OpCode::Pop => {
                    self.pop_value()?;
                }

                OpCode::Store0 => self.store_local(0)?,
                OpCode::Store1 => self.store_local(1)?,
                OpCode::Store2 => self.store_local(2)?,
                OpCode::Store3 => self.store_local(3)?,
                OpCode::Store4 => self.store_local(4)?,

                OpCode::Store => {
                    let index = fetch_u8(code, &mut ip)? as usize;
                    self.store_local(index)?;
                }

                OpCode::StoreL => {
                    let index = fetch_u16(code, &mut ip)? as usize;
                    self.store_local(index)?;
                }

                OpCode::Load0 => self.load_local(0)?,
                OpCode::Load1 => self.load_local(1)?,
                OpCode::Load2 => self.load_local(2)?,
                OpCode::Load3 => self.load_local(3)?,
                OpCode::Load4 => self.load_local(4)?,

                OpCode::Load => {
                    let index = fetch_u8(code, &mut ip)? as usize;
                    self.load_local(index)?;
                }

                OpCode::LoadL => {
                    let index = fetch_u16(code, &mut ip)? as usize;
                    self.load_local(index)?;
                }

                OpCode::Jmp => {
                    let offset = fetch_i8(code, &mut ip)? as i32;
                    branch(&mut ip, offset, code.len())?;
                }

                OpCode::JmpL => {
                    let offset = fetch_i32(code, &mut ip)?;
                    branch(&mut ip, offset, code.len())?;
                }

                OpCode::Jtrue => {
                    let offset = fetch_i8(code, &mut ip)? as i32;
                    if self.pop_value()?.is_truthy() {
                        branch(&mut ip, offset, code.len())?;
                    }
                }

                OpCode::JtrueL => {
                    let offset = fetch_i32(code, &mut ip)?;
                    if self.pop_value()?.is_truthy() {
                        branch(&mut ip, offset, code.len())?;
                    }
                }

                // The _K forms keep the condition on the stack when the
                // jump is taken and pop it on fall-through.
                OpCode::JtrueK => {
                    let offset = fetch_i8(code, &mut ip)? as i32;
                    if self.peek_value()?.is_truthy() {
                        branch(&mut ip, offset, code.len())?;
                    } else {
                        self.pop_value()?;
                    }
                }

                OpCode::JtrueKL => {
                    let offset = fetch_i32(code, &mut ip)?;
                    if self.peek_value()?.is_truthy() {
                        branch(&mut ip, offset, code.len())?;
                    } else {
                        self.pop_value()?;
                    }
                }

                OpCode::Jfalse => {
                    let offset = fetch_i8(code, &mut ip)? as i32;
                    if !self.pop_value()?.is_truthy() {
                        branch(&mut ip, offset, code.len())?;
                    }
                }

                OpCode::JfalseL => {
                    let offset = fetch_i32(code, &mut ip)?;
                    if !self.pop_value()?.is_truthy() {
                        branch(&mut ip, offset, code.len())?;
                    }
                }

                OpCode::JfalseK => {
                    let offset = fetch_i8(code, &mut ip)? as i32;
                    if !self.peek_value()?.is_truthy() {
                        branch(&mut ip, offset, code.len())?;
                    } else {
                        self.pop_value()?;
                    }
                }

                OpCode::JfalseKL => {
                    let offset = fetch_i32(code, &mut ip)?;
                    if !self.peek_value()?.is_truthy() {
                        branch(&mut ip, offset, code.len())?;
                    } else {
                        self.pop_value()?;
                    }
                }

                OpCode::Call => {
                    let index = fetch_u32(code, &mut ip)?;
                    let func_ref = self.loaded[assembly]
                        .function_refs
                        .get(index)
                        .ok_or(VmError::UnresolvedFunction { index })?;
                    match func_ref {
                        FuncRef::Internal { block, function } => {
                            self.execute(assembly, block, function)?;
                        }
                        FuncRef::Native(func) => {
                            self.run_native(func)?;
                        }
                    }
                }

                OpCode::Print => {
                    let tag = fetch_u8(code, &mut ip)?;
                    let value = self.pop_value()?;
                    self.print_value(tag, value)?;
                    writeln!(self.output)?;
                }
            }
        }
    }

    fn push_string_constant(
        &mut self,
        assembly: usize,
        block: usize,
        index: u32,
    ) -> Result<(), VmError> {
        let table = &self.loaded[assembly].blocks[block].string_table;
        let handle = table
            .get(index as usize)
            .copied()
            .ok_or(VmError::StringIndexOutOfRange { index, len: table.len() })?;
        self.push_value(Value::from_string(handle))
    }

    fn f_binary(&mut self, op: fn(f64, f64) -> f64) -> Result<(), VmError> {
        let b = self.pop_value()?.as_f64();
        let a = self.pop_value()?.as_f64();
        self.push_value(Value::from_f64(op(a, b)))
    }

    fn f_compare(&mut self, op: fn(f64, f64) -> bool) -> Result<(), VmError> {
        let b = self.pop_value()?.as_f64();
        let a = self.pop_value()?.as_f64();
        self.push_value(Value::from_bool(op(a, b)))
    }

    fn i_binary(&mut self, op: fn(i64, i64) -> i64) -> Result<(), VmError> {
        let b = self.pop_value()?.as_i64();
        let a = self.pop_value()?.as_i64();
        self.push_value(Value::from_i64(op(a, b)))
    }

    fn i_checked(
        &mut self,
        mnemonic: &'static str,
        op: fn(i64, i64) -> Option<i64>,
    ) -> Result<(), VmError> {
        let b = self.pop_value()?.as_i64();
        let a = self.pop_value()?.as_i64();
        let result = op(a, b).ok_or(VmError::IntegerOverflow { mnemonic })?;
        self.push_value(Value::from_i64(result))
    }

    fn i_compare(&mut self, op: fn(i64, i64) -> bool) -> Result<(), VmError> {
        let b = self.pop_value()?.as_i64();
        let a = self.pop_value()?.as_i64();
        self.push_value(Value::from_bool(op(a, b)))
    }

    /// Formats a popped value per its constant-type tag and writes it to
    /// the VM's output. An unknown tag writes a diagnostic string instead
    /// of faulting.
    fn print_value(&mut self, tag: u8, value: Value) -> Result<(), VmError> {
        match ConstantType::try_from(tag) {
            Ok(ConstantType::Int64) => write!(self.output, "{}", value.as_i64())?,
            Ok(ConstantType::Float64) => write!(self.output, "{}", value.as_f64())?,
            Ok(ConstantType::UnsignedInt64) => write!(self.output, "{}", value.as_u64())?,
            Ok(ConstantType::Bool) => {
                write!(self.output, "{}", if value.is_truthy() { "true" } else { "false" })?;
            }
            Ok(ConstantType::StringUtf8) => {
                let object = self
                    .interner
                    .resolve_bits(value.as_u64())
                    .ok_or(VmError::NotAString)?;
                write!(self.output, "{}", object.as_str())?;
            }
            Ok(ConstantType::Error) | Err(_) => {
                write!(self.output, "Error: unknown type.")?;
            }
        }
        Ok(())
    }
}

fn fetch_u8(code: &[u8], ip: &mut usize) -> Result<u8, VmError> {
    let byte = *code.get(*ip).ok_or(VmError::IpOutOfRange { offset: *ip })?;
    *ip += 1;
    Ok(byte)
}

fn fetch_i8(code: &[u8], ip: &mut usize) -> Result<i8, VmError> {
    Ok(fetch_u8(code, ip)? as i8)
}

fn fetch_u16(code: &[u8], ip: &mut usize) -> Result<u16, VmError> {
    let bytes = fetch_array::<2>(code, ip)?;
    Ok(u16::from_le_bytes(bytes))
}

fn fetch_u32(code: &[u8], ip: &mut usize) -> Result<u32, VmError> {
    let bytes = fetch_array::<4>(code, ip)?;
    Ok(u32::from_le_bytes(bytes))
}

fn fetch_i32(code: &[u8], ip: &mut usize) -> Result<i32, VmError> {
    let bytes = fetch_array::<4>(code, ip)?;
    Ok(i32::from_le_bytes(bytes))
}

fn fetch_i64(code: &[u8], ip: &mut usize) -> Result<i64, VmError> {
    let bytes = fetch_array::<8>(code, ip)?;
    Ok(i64::from_le_bytes(bytes))
}

fn fetch_array<const N: usize>(code: &[u8], ip: &mut usize) -> Result<[u8; N], VmError> {
    let slice = code
        .get(*ip..*ip + N)
        .ok_or(VmError::IpOutOfRange { offset: *ip })?;
    let mut bytes = [0u8; N];
    bytes.copy_from_slice(slice);
    *ip += N;
    Ok(bytes)
}

/// Applies a relative jump. The resulting position may sit at the very end
/// of the chunk; the next fetch reports that as an IP range fault.
fn branch(ip: &mut usize, offset: i32, code_len: usize) -> Result<(), VmError> {
    let target = *ip as i64 + offset as i64;
    if target < 0 || target as usize > code_len {
        return Err(VmError::IpOutOfRange { offset: *ip });
    }
    *ip = target as usize;
    Ok(())
}
