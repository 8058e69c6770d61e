//! Instruction decoding for emitted code.
//!
//! Walks a code array instruction by instruction, accounting for `wide`
//! prefixes and the alignment padding of the two switch instructions.

use std::fmt::Write as _;

use super::opcodes::{self, *};
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    pub pc: u32,
    pub opcode: u8,
    /// Encoded length in bytes, prefix and padding included.
    pub len: u32,
    /// Whether the instruction carries a `wide` prefix; `opcode` is then
    /// the modified instruction.
    pub wide: bool,
}

/// Decoded operands of a `tableswitch` or `lookupswitch`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchTable {
    pub default: u32,
    /// `(key, target)` in table order.
    pub cases: Vec<(i32, u32)>,
}

fn byte(code: &[u8], pc: usize) -> Result<u8> {
    code.get(pc)
        .copied()
        .ok_or_else(|| Error::internal(format!("code ends inside the instruction at {}", pc)))
}

fn int4(code: &[u8], pc: usize) -> Result<i32> {
    let b = code
        .get(pc..pc + 4)
        .ok_or_else(|| Error::internal(format!("code ends inside the operand at {}", pc)))?;
    Ok(i32::from_be_bytes([b[0], b[1], b[2], b[3]]))
}

fn int2(code: &[u8], pc: usize) -> Result<i16> {
    Ok(i16::from_be_bytes([byte(code, pc)?, byte(code, pc + 1)?]))
}

/// Offset of the first 4-byte operand of a switch at `pc`.
fn switch_operands(pc: usize) -> usize {
    (pc + 4) & !3
}

fn decode_at(code: &[u8], pc: usize) -> Result<Instruction> {
    let op = byte(code, pc)?;
    let (opcode, len, wide) = match op {
        WIDE => {
            let modified = byte(code, pc + 1)?;
            (modified, if modified == IINC { 6 } else { 4 }, true)
        }
        TABLESWITCH => {
            let base = switch_operands(pc);
            let lo = int4(code, base + 4)?;
            let hi = int4(code, base + 8)?;
            if hi < lo {
                return Err(Error::internal(format!("tableswitch at {} has high {} below low {}", pc, hi, lo)));
            }
            let entries = (hi as i64 - lo as i64 + 1) as usize;
            (op, base - pc + 12 + 4 * entries, false)
        }
        LOOKUPSWITCH => {
            let base = switch_operands(pc);
            let npairs = int4(code, base + 4)?;
            if npairs < 0 {
                return Err(Error::internal(format!("lookupswitch at {} has {} pairs", pc, npairs)));
            }
            (op, base - pc + 8 + 8 * npairs as usize, false)
        }
        _ => match opcodes::length(op) {
            Some(len) if len > 0 => (op, len as usize, false),
            _ => return Err(Error::internal(format!("undefined opcode {:#04x} at {}", op, pc))),
        },
    };
    if pc + len > code.len() {
        return Err(Error::internal(format!("{} at {} runs past the end of the code", mnemonic(opcode), pc)));
    }
    Ok(Instruction { pc: pc as u32, opcode, len: len as u32, wide })
}

/// Every instruction of `code`, in order.
pub fn decode(code: &[u8]) -> Result<Vec<Instruction>> {
    let mut out = Vec::new();
    let mut pc = 0;
    while pc < code.len() {
        let insn = decode_at(code, pc)?;
        pc += insn.len as usize;
        out.push(insn);
    }
    Ok(out)
}

/// The opcodes of `code`, `wide` prefixes elided.
pub fn opcodes_of(code: &[u8]) -> Result<Vec<u8>> {
    Ok(decode(code)?.into_iter().map(|i| i.opcode).collect())
}

/// The mnemonics of `code`, `wide` prefixes elided.
pub fn mnemonics(code: &[u8]) -> Result<Vec<&'static str>> {
    Ok(decode(code)?.into_iter().map(|i| mnemonic(i.opcode)).collect())
}

impl Instruction {
    pub fn is_branch(&self) -> bool {
        matches!(self.opcode, IFEQ..=JSR | IFNULL | IFNONNULL | GOTO_W | JSR_W)
    }

    /// Absolute target of a branch instruction.
    pub fn branch_target(&self, code: &[u8]) -> Result<Option<u32>> {
        let pc = self.pc as usize;
        let offset = match self.opcode {
            GOTO_W | JSR_W => int4(code, pc + 1)?,
            _ if self.is_branch() => i32::from(int2(code, pc + 1)?),
            _ => return Ok(None),
        };
        Ok(Some((self.pc as i64 + offset as i64) as u32))
    }

    /// Local register operand of a load, store, `iinc` or `ret`.
    pub fn register(&self, code: &[u8]) -> Result<Option<u16>> {
        let pc = self.pc as usize;
        let reg = match self.opcode {
            ILOAD..=ALOAD | ISTORE..=ASTORE | IINC | RET if self.wide => {
                u16::from_be_bytes([byte(code, pc + 2)?, byte(code, pc + 3)?])
            }
            ILOAD..=ALOAD | ISTORE..=ASTORE | IINC | RET => u16::from(byte(code, pc + 1)?),
            ILOAD_0..=ALOAD_3 => u16::from((self.opcode - ILOAD_0) % 4),
            ISTORE_0..=ASTORE_3 => u16::from((self.opcode - ISTORE_0) % 4),
            _ => return Ok(None),
        };
        Ok(Some(reg))
    }

    /// Key/target table of a switch instruction.
    pub fn switch_table(&self, code: &[u8]) -> Result<Option<SwitchTable>> {
        let pc = self.pc as usize;
        let base = switch_operands(pc);
        let target = |offset: i32| (self.pc as i64 + offset as i64) as u32;
        let table = match self.opcode {
            TABLESWITCH => {
                let default = target(int4(code, base)?);
                let lo = int4(code, base + 4)?;
                let hi = int4(code, base + 8)?;
                let mut cases = Vec::new();
                for (i, key) in (lo..=hi).enumerate() {
                    cases.push((key, target(int4(code, base + 12 + 4 * i)?)));
                }
                SwitchTable { default, cases }
            }
            LOOKUPSWITCH => {
                let default = target(int4(code, base)?);
                let npairs = int4(code, base + 4)?.max(0) as usize;
                let mut cases = Vec::with_capacity(npairs);
                for i in 0..npairs {
                    let at = base + 8 + 8 * i;
                    cases.push((int4(code, at)?, target(int4(code, at + 4)?)));
                }
                SwitchTable { default, cases }
            }
            _ => return Ok(None),
        };
        Ok(Some(table))
    }
}

/// One line per instruction: pc, mnemonic and, for branches, the target.
pub fn disassemble(code: &[u8]) -> Result<String> {
    let mut out = String::new();
    for insn in decode(code)? {
        let _ = write!(out, "{:5}: ", insn.pc);
        if insn.wide {
            out.push_str("wide ");
        }
        out.push_str(mnemonic(insn.opcode));
        if let Some(target) = insn.branch_target(code)? {
            let _ = write!(out, " {}", target);
        } else if let Some(reg) = insn.register(code)? {
            if insn.len > 1 {
                let _ = write!(out, " {}", reg);
            }
        }
        out.push('\n');
    }
    Ok(out)
}
