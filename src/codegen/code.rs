//! Code buffer for one method body.
//!
//! `Code` owns the instruction bytes and simulates the operand stack as
//! instructions are emitted, so every branch can record the machine state
//! its target must be entered with. It also owns the per-method tables:
//! exception ranges, line numbers, local variables and character ranges.
//!
//! Emission is a no-op while the code is dead (after an unconditional
//! transfer and before the next resolved jump target).

use log::trace;

use super::chain::{self, Chain};
use super::crt::CrTable;
use super::opcodes::*;
use super::typecodes::{self, DOUBLE, FLOAT, INT, LONG, OBJECT, VOID};
use crate::ast::Type;
use crate::config::Config;
use crate::diagnostics::LimitKind;
use crate::error::{Error, Result};

/// Largest encodable method size, stack depth and local count.
pub const MAX_CODE: u32 = 0xFFFF;

/// Machine state at a program point: one type code per operand-stack
/// word (the upper word of a long or double is `VOID`) and the registers
/// of the monitors currently held.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct State {
    stack: Vec<u8>,
    locks: Vec<u16>,
}

impl State {
    pub fn stack_size(&self) -> u32 {
        self.stack.len() as u32
    }

    pub fn locks(&self) -> &[u16] {
        &self.locks
    }

    pub fn push(&mut self, tc: u8) {
        match typecodes::width(tc) {
            0 => {}
            1 => self.stack.push(tc),
            _ => {
                self.stack.push(tc);
                self.stack.push(VOID);
            }
        }
    }

    pub fn pop(&mut self, words: u32) -> Result<()> {
        let words = words as usize;
        if words > self.stack.len() {
            return Err(Error::internal(format!(
                "operand stack underflow: popping {} of {} words",
                words,
                self.stack.len()
            )));
        }
        self.stack.truncate(self.stack.len() - words);
        Ok(())
    }

    /// Type code of the value on top of the stack.
    pub fn top(&self) -> Option<u8> {
        let n = self.stack.len();
        match self.stack.last()? {
            &VOID if n >= 2 => Some(self.stack[n - 2]),
            &tc => Some(tc),
        }
    }

    /// Copies the top `words` words below the `under` words beneath them.
    fn dup_x(&mut self, words: usize, under: usize) -> Result<()> {
        let n = self.stack.len();
        if n < words + under {
            return Err(Error::internal("operand stack underflow in dup"));
        }
        let copy: Vec<u8> = self.stack[n - words..].to_vec();
        let at = n - words - under;
        self.stack.splice(at..at, copy);
        Ok(())
    }

    fn swap(&mut self) -> Result<()> {
        let n = self.stack.len();
        if n < 2 {
            return Err(Error::internal("operand stack underflow in swap"));
        }
        self.stack.swap(n - 1, n - 2);
        Ok(())
    }

    /// Retypes the top value, as when two arms of a conditional join.
    pub fn force_stack_top(&mut self, tc: u8) {
        if let Some(top) = self.top() {
            if top == OBJECT && tc == OBJECT {
                return;
            }
            let w = typecodes::width(top) as usize;
            if w == typecodes::width(tc) as usize {
                let n = self.stack.len();
                self.stack[n - w] = tc;
            }
        }
    }

    pub fn lock(&mut self, reg: u16) {
        self.locks.push(reg);
    }

    pub fn unlock(&mut self, reg: u16) -> Result<()> {
        match self.locks.iter().rposition(|&r| r == reg) {
            Some(i) => {
                self.locks.remove(i);
                Ok(())
            }
            None => Err(Error::internal(format!("unlocking monitor in register {} that is not held", reg))),
        }
    }

    /// Same stack depth and lock set; the condition for two paths to join.
    pub fn compatible(&self, other: &State) -> bool {
        self.stack.len() == other.stack.len() && self.locks == other.locks
    }
}

/// One exception-table row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatchEntry {
    pub start_pc: u16,
    pub end_pc: u16,
    pub handler_pc: u16,
    /// Pool index of the caught class, 0 for a catch-all.
    pub catch_type: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineNumberEntry {
    pub start_pc: u16,
    pub line: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalVarEntry {
    pub start_pc: u16,
    pub length: u16,
    pub name: String,
    pub descriptor: String,
    pub reg: u16,
}

#[derive(Debug, Clone)]
struct LocalSlot {
    name: String,
    descriptor: String,
    start_pc: Option<u32>,
}

/// Finished code of one method.
#[derive(Debug, Clone, PartialEq)]
pub struct CodeAttr {
    pub code: Vec<u8>,
    pub max_stack: u16,
    pub max_locals: u16,
    pub exception_table: Vec<CatchEntry>,
    pub line_numbers: Option<Vec<LineNumberEntry>>,
    pub local_vars: Option<Vec<LocalVarEntry>>,
    pub crt: Option<CrTable>,
}

pub struct Code {
    bytes: Vec<u8>,
    pub max_stack: u32,
    pub max_locals: u32,
    pub state: State,
    alive: bool,
    /// Set once the current pc has been observed; forbids dropping a
    /// trailing `goto` that some recorded position may point past.
    fixed_pc: bool,
    /// Use 32-bit branch offsets.
    pub fatcode: bool,
    /// A narrow branch offset did not fit; the body must be regenerated.
    needs_wide: bool,
    /// Jumps to the next instruction emitted.
    pending_jumps: Option<Box<Chain>>,
    pending_stat_line: Option<usize>,
    line_debug_info: bool,
    var_debug_info: bool,
    debug_code: bool,
    catch_info: Vec<CatchEntry>,
    line_info: Vec<LineNumberEntry>,
    locals: Vec<Option<LocalSlot>>,
    local_var_table: Vec<LocalVarEntry>,
    next_reg: u32,
    pub crt: Option<CrTable>,
}

impl Code {
    pub fn new(fatcode: bool, config: &Config) -> Self {
        Self {
            bytes: Vec::new(),
            max_stack: 0,
            max_locals: 0,
            state: State::default(),
            alive: true,
            fixed_pc: false,
            fatcode,
            needs_wide: false,
            pending_jumps: None,
            pending_stat_line: None,
            line_debug_info: config.line_debug_info,
            var_debug_info: config.var_debug_info,
            debug_code: config.debug_code,
            catch_info: Vec::new(),
            line_info: Vec::new(),
            locals: Vec::new(),
            local_var_table: Vec::new(),
            next_reg: 0,
            crt: if config.gen_crt { Some(CrTable::new()) } else { None },
        }
    }

    /// Current code pointer, without resolving pending jumps.
    pub fn cp(&self) -> u32 {
        self.bytes.len() as u32
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Reachable now, or reachable through a jump to the next instruction.
    pub fn is_alive(&self) -> bool {
        self.alive || self.pending_jumps.is_some()
    }

    pub fn mark_dead(&mut self) {
        self.alive = false;
    }

    pub fn is_statement_start(&self) -> bool {
        !self.alive || self.state.stack_size() == 0
    }

    pub fn needs_wide(&self) -> bool {
        self.needs_wide
    }

    pub fn next_reg(&self) -> u32 {
        self.next_reg
    }

    pub fn catch_info(&self) -> &[CatchEntry] {
        &self.catch_info
    }

    /// Line of the statement whose entry has not been emitted yet.
    pub fn pending_stat(&self) -> Option<usize> {
        self.pending_stat_line
    }

    pub fn set_pending_stat(&mut self, line: Option<usize>) {
        self.pending_stat_line = line;
    }

    /// Starts allocating registers above every register used so far.
    pub fn new_reg_segment(&mut self) {
        self.next_reg = self.max_locals;
    }

    // ----- raw bytes -----

    fn emit1(&mut self, b: u8) {
        if self.alive {
            self.bytes.push(b);
        }
    }

    fn emit2(&mut self, v: u16) {
        if self.alive {
            self.bytes.extend_from_slice(&v.to_be_bytes());
        }
    }

    pub fn emit4(&mut self, v: i32) {
        if self.alive {
            self.bytes.extend_from_slice(&v.to_be_bytes());
        }
    }

    pub fn get1(&self, pc: u32) -> u8 {
        self.bytes[pc as usize]
    }

    pub fn get2(&self, pc: u32) -> u16 {
        let p = pc as usize;
        u16::from_be_bytes([self.bytes[p], self.bytes[p + 1]])
    }

    pub fn get4(&self, pc: u32) -> i32 {
        let p = pc as usize;
        i32::from_be_bytes([self.bytes[p], self.bytes[p + 1], self.bytes[p + 2], self.bytes[p + 3]])
    }

    fn put2(&mut self, pc: u32, v: u16) {
        let p = pc as usize;
        self.bytes[p..p + 2].copy_from_slice(&v.to_be_bytes());
    }

    pub fn put4(&mut self, pc: u32, v: i32) {
        let p = pc as usize;
        self.bytes[p..p + 4].copy_from_slice(&v.to_be_bytes());
    }

    // ----- opcodes -----

    fn push(&mut self, tc: u8) {
        self.state.push(tc);
        self.max_stack = self.max_stack.max(self.state.stack_size());
    }

    fn dup_x(&mut self, words: usize, under: usize) -> Result<()> {
        self.state.dup_x(words, under)?;
        self.max_stack = self.max_stack.max(self.state.stack_size());
        Ok(())
    }

    fn emitop(&mut self, op: u8) -> Result<()> {
        if self.pending_jumps.is_some() {
            self.resolve_pending()?;
        }
        if self.alive {
            if self.pending_stat_line.is_some() {
                self.mark_stat_begin();
            }
            if self.debug_code {
                trace!("emit {:5}: {:<16} stack={}", self.cp(), mnemonic(op), self.state.stack_size());
            }
            self.emit1(op);
        }
        Ok(())
    }

    /// Emits an instruction without operands and applies its stack effect.
    pub fn emitop0(&mut self, op: u8) -> Result<()> {
        self.emitop(op)?;
        if !self.alive {
            return Ok(());
        }
        match op {
            NOP => {}
            ACONST_NULL => self.push(OBJECT),
            ICONST_M1..=ICONST_5 => self.push(INT),
            LCONST_0 | LCONST_1 => self.push(LONG),
            FCONST_0..=FCONST_2 => self.push(FLOAT),
            DCONST_0 | DCONST_1 => self.push(DOUBLE),
            ILOAD_0..=ILOAD_3 => self.push(INT),
            LLOAD_0..=LLOAD_3 => self.push(LONG),
            FLOAD_0..=FLOAD_3 => self.push(FLOAT),
            DLOAD_0..=DLOAD_3 => self.push(DOUBLE),
            ALOAD_0..=ALOAD_3 => self.push(OBJECT),
            IALOAD | BALOAD | CALOAD | SALOAD => {
                self.state.pop(2)?;
                self.push(INT)
            }
            LALOAD => {
                self.state.pop(2)?;
                self.push(LONG)
            }
            FALOAD => {
                self.state.pop(2)?;
                self.push(FLOAT)
            }
            DALOAD => {
                self.state.pop(2)?;
                self.push(DOUBLE)
            }
            AALOAD => {
                self.state.pop(2)?;
                self.push(OBJECT)
            }
            ISTORE_0..=ISTORE_3 | FSTORE_0..=FSTORE_3 | ASTORE_0..=ASTORE_3 => self.state.pop(1)?,
            LSTORE_0..=LSTORE_3 | DSTORE_0..=DSTORE_3 => self.state.pop(2)?,
            IASTORE | FASTORE | AASTORE | BASTORE | CASTORE | SASTORE => self.state.pop(3)?,
            LASTORE | DASTORE => self.state.pop(4)?,
            POP => self.state.pop(1)?,
            POP2 => self.state.pop(2)?,
            DUP => self.dup_x(1, 0)?,
            DUP_X1 => self.dup_x(1, 1)?,
            DUP_X2 => self.dup_x(1, 2)?,
            DUP2 => self.dup_x(2, 0)?,
            DUP2_X1 => self.dup_x(2, 1)?,
            DUP2_X2 => self.dup_x(2, 2)?,
            SWAP => self.state.swap()?,
            IADD | ISUB | IMUL | IDIV | IREM | ISHL | ISHR | IUSHR | IAND | IOR | IXOR => {
                self.state.pop(2)?;
                self.push(INT)
            }
            LADD | LSUB | LMUL | LDIV | LREM | LAND | LOR | LXOR => {
                self.state.pop(4)?;
                self.push(LONG)
            }
            LSHL | LSHR | LUSHR => {
                self.state.pop(3)?;
                self.push(LONG)
            }
            FADD | FSUB | FMUL | FDIV | FREM => {
                self.state.pop(2)?;
                self.push(FLOAT)
            }
            DADD | DSUB | DMUL | DDIV | DREM => {
                self.state.pop(4)?;
                self.push(DOUBLE)
            }
            INEG | I2B | I2C | I2S => {
                self.state.pop(1)?;
                self.push(INT)
            }
            LNEG => {
                self.state.pop(2)?;
                self.push(LONG)
            }
            FNEG => {
                self.state.pop(1)?;
                self.push(FLOAT)
            }
            DNEG => {
                self.state.pop(2)?;
                self.push(DOUBLE)
            }
            I2L | F2L => {
                self.state.pop(1)?;
                self.push(LONG)
            }
            I2F => {
                self.state.pop(1)?;
                self.push(FLOAT)
            }
            I2D | F2D => {
                self.state.pop(1)?;
                self.push(DOUBLE)
            }
            L2I | D2I => {
                self.state.pop(2)?;
                self.push(INT)
            }
            L2F | D2F => {
                self.state.pop(2)?;
                self.push(FLOAT)
            }
            L2D | D2L => {
                self.state.pop(2)?;
                self.push(if op == L2D { DOUBLE } else { LONG })
            }
            F2I => {
                self.state.pop(1)?;
                self.push(INT)
            }
            LCMP | DCMPL | DCMPG => {
                self.state.pop(4)?;
                self.push(INT)
            }
            FCMPL | FCMPG => {
                self.state.pop(2)?;
                self.push(INT)
            }
            IRETURN | FRETURN | ARETURN => {
                self.state.pop(1)?;
                self.mark_dead()
            }
            LRETURN | DRETURN => {
                self.state.pop(2)?;
                self.mark_dead()
            }
            RETURN => self.mark_dead(),
            ATHROW => {
                self.state.pop(1)?;
                self.mark_dead()
            }
            ARRAYLENGTH => {
                self.state.pop(1)?;
                self.push(INT)
            }
            MONITORENTER | MONITOREXIT | TABLESWITCH | LOOKUPSWITCH => self.state.pop(1)?,
            _ => {
                return Err(Error::internal(format!(
                    "`{}` is not an operand-free instruction",
                    mnemonic(op)
                )))
            }
        }
        Ok(())
    }

    /// Emits an instruction with a one-byte operand.
    pub fn emitop1(&mut self, op: u8, od: u8) -> Result<()> {
        self.emitop(op)?;
        self.emit1(od);
        if !self.alive {
            return Ok(());
        }
        match op {
            BIPUSH => self.push(INT),
            NEWARRAY => {
                self.state.pop(1)?;
                self.push(OBJECT)
            }
            _ => return Err(Error::internal(format!("`{}` takes no byte operand", mnemonic(op)))),
        }
        Ok(())
    }

    /// Emits a local-variable instruction, widened when the register needs it.
    pub fn emitop1w(&mut self, op: u8, reg: u16) -> Result<()> {
        if reg > 0xFF {
            self.emitop(WIDE)?;
            self.emitop(op)?;
            self.emit2(reg);
        } else {
            self.emitop(op)?;
            self.emit1(reg as u8);
        }
        if !self.alive {
            return Ok(());
        }
        match op {
            ILOAD => self.push(INT),
            LLOAD => self.push(LONG),
            FLOAD => self.push(FLOAT),
            DLOAD => self.push(DOUBLE),
            ALOAD => self.push(OBJECT),
            ISTORE | FSTORE | ASTORE => self.state.pop(1)?,
            LSTORE | DSTORE => self.state.pop(2)?,
            RET => self.mark_dead(),
            _ => return Err(Error::internal(format!("`{}` takes no register operand", mnemonic(op)))),
        }
        Ok(())
    }

    /// `iinc reg, delta`, widened when either operand needs it.
    pub fn emit_iinc(&mut self, reg: u16, delta: i16) -> Result<()> {
        if reg > 0xFF || !(-128..=127).contains(&delta) {
            self.emitop(WIDE)?;
            self.emitop(IINC)?;
            self.emit2(reg);
            self.emit2(delta as u16);
        } else {
            self.emitop(IINC)?;
            self.emit1(reg as u8);
            self.emit1(delta as i8 as u8);
        }
        Ok(())
    }

    /// Emits an instruction with a two-byte operand.
    pub fn emitop2(&mut self, op: u8, od: u16) -> Result<()> {
        self.emitop(op)?;
        self.emit2(od);
        if !self.alive {
            return Ok(());
        }
        match op {
            SIPUSH => self.push(INT),
            NEW => self.push(OBJECT),
            ANEWARRAY | CHECKCAST => {
                self.state.pop(1)?;
                self.push(OBJECT)
            }
            INSTANCEOF => {
                self.state.pop(1)?;
                self.push(INT)
            }
            IFEQ..=IFLE | IFNULL | IFNONNULL => self.state.pop(1)?,
            IF_ICMPEQ..=IF_ACMPNE => self.state.pop(2)?,
            GOTO => self.mark_dead(),
            JSR => {}
            _ => return Err(Error::internal(format!("`{}` takes no short operand", mnemonic(op)))),
        }
        Ok(())
    }

    fn emitop4(&mut self, op: u8, od: i32) -> Result<()> {
        self.emitop(op)?;
        self.emit4(od);
        if !self.alive {
            return Ok(());
        }
        match op {
            GOTO_W => self.mark_dead(),
            JSR_W => {}
            _ => return Err(Error::internal(format!("`{}` takes no int operand", mnemonic(op)))),
        }
        Ok(())
    }

    /// Loads a pool constant of type code `tc`.
    pub fn emit_ldc(&mut self, index: u16, tc: u8) -> Result<()> {
        if tc == LONG || tc == DOUBLE {
            self.emitop(LDC2_W)?;
            self.emit2(index);
        } else if index <= 0xFF {
            self.emitop(LDC)?;
            self.emit1(index as u8);
        } else {
            self.emitop(LDC_W)?;
            self.emit2(index);
        }
        if self.alive {
            self.push(tc);
        }
        Ok(())
    }

    /// Field access; `tc` is the field's type code.
    pub fn emit_field(&mut self, op: u8, index: u16, tc: u8) -> Result<()> {
        self.emitop(op)?;
        self.emit2(index);
        if !self.alive {
            return Ok(());
        }
        let w = typecodes::width(tc);
        match op {
            GETSTATIC => self.push(tc),
            PUTSTATIC => self.state.pop(w)?,
            GETFIELD => {
                self.state.pop(1)?;
                self.push(tc)
            }
            PUTFIELD => self.state.pop(w + 1)?,
            _ => return Err(Error::internal(format!("`{}` is not a field instruction", mnemonic(op)))),
        }
        Ok(())
    }

    /// Method invocation popping `arg_words` (plus the receiver unless
    /// static) and pushing a result of type code `ret`.
    pub fn emit_invoke(&mut self, op: u8, index: u16, arg_words: u32, ret: u8) -> Result<()> {
        self.emitop(op)?;
        self.emit2(index);
        if op == INVOKEINTERFACE {
            self.emit1((arg_words + 1) as u8);
            self.emit1(0);
        }
        if !self.alive {
            return Ok(());
        }
        let receiver = if op == INVOKESTATIC { 0 } else { 1 };
        self.state.pop(arg_words + receiver)?;
        self.push(ret);
        Ok(())
    }

    pub fn emit_multianewarray(&mut self, ndims: u8, index: u16) -> Result<()> {
        self.emitop(MULTIANEWARRAY)?;
        self.emit2(index);
        self.emit1(ndims);
        if self.alive {
            self.state.pop(ndims as u32)?;
            self.push(OBJECT);
        }
        Ok(())
    }

    /// Pads with `nop` up to a multiple of `incr`.
    pub fn align(&mut self, incr: u32) -> Result<()> {
        if self.alive {
            while self.cp() % incr != 0 {
                self.emitop0(NOP)?;
            }
        }
        Ok(())
    }

    // ----- jumps -----

    /// Emits a branch with a zero offset and returns its pc. In fat mode
    /// conditional branches become an inverted branch over a `goto_w`.
    pub fn emit_jump(&mut self, op: u8) -> Result<u32> {
        if self.fatcode {
            if op == GOTO || op == JSR {
                self.emitop4(if op == GOTO { GOTO_W } else { JSR_W }, 0)?;
            } else {
                self.emitop2(negate(op), 8)?;
                self.emitop4(GOTO_W, 0)?;
                self.alive = true;
            }
            Ok(self.cp() - 5)
        } else {
            self.emitop2(op, 0)?;
            Ok(self.cp() - 3)
        }
    }

    /// Emits a branch and returns the chain holding it. A `goto` also
    /// takes over the jumps pending at this point; `DONTGOTO` emits nothing.
    pub fn branch(&mut self, op: u8) -> Result<Option<Box<Chain>>> {
        let mut result = None;
        if op == GOTO {
            result = self.pending_jumps.take();
        }
        if op != DONTGOTO && self.is_alive() {
            let pc = self.emit_jump(op)?;
            result = Chain::new(pc, self.state.clone(), result).boxed();
            self.fixed_pc = self.fatcode;
            if op == GOTO {
                self.alive = false;
            }
        }
        Ok(result)
    }

    /// Patches every branch in `chain` to `target`.
    pub fn resolve_to(&mut self, chain: Option<Box<Chain>>, mut target: u32) -> Result<()> {
        let mut new_state: Option<State> = None;
        let mut link = chain;
        while let Some(mut c) = link {
            link = c.next.take();
            if target >= self.cp() {
                target = self.cp();
            }
            if self.get1(c.pc) == GOTO && c.pc + 3 == target && target == self.cp() && !self.fixed_pc {
                // jump to the next instruction: drop it
                self.drop_trailing(3);
                target -= 3;
                if link.is_none() {
                    self.alive = true;
                    break;
                }
            } else {
                let offset = target as i64 - c.pc as i64;
                if self.fatcode {
                    self.put4(c.pc + 1, offset as i32);
                } else if offset < i16::MIN as i64 || offset > i16::MAX as i64 {
                    self.needs_wide = true;
                } else {
                    self.put2(c.pc + 1, offset as i16 as u16);
                }
                let current = new_state.as_ref().unwrap_or(&self.state);
                if self.alive && !c.state.compatible(current) {
                    return Err(Error::StateMismatch {
                        pc: target,
                        detail: format!(
                            "branch at {} carries stack {} / locks {:?}, target has stack {} / locks {:?}",
                            c.pc,
                            c.state.stack_size(),
                            c.state.locks(),
                            current.stack_size(),
                            current.locks()
                        ),
                    });
                }
            }
            self.fixed_pc = true;
            if self.cp() == target {
                if self.debug_code {
                    trace!("resolving chain at {} to {}", c.pc, target);
                }
                if !self.alive || new_state.is_none() {
                    if !self.alive {
                        self.alive = true;
                        new_state = Some(c.state);
                    } else {
                        new_state = Some(self.state.clone());
                    }
                }
            }
        }
        if let Some(state) = new_state {
            self.state = state;
            self.max_stack = self.max_stack.max(self.state.stack_size());
        }
        Ok(())
    }

    /// Makes `chain` jump to the next instruction emitted.
    pub fn resolve(&mut self, chain: Option<Box<Chain>>) -> Result<()> {
        if let Some(c) = &chain {
            if self.alive && !self.state.compatible(&c.state) {
                return Err(Error::StateMismatch {
                    pc: self.cp(),
                    detail: format!(
                        "pending branch at {} carries stack {}, fallthrough has {}",
                        c.pc,
                        c.state.stack_size(),
                        self.state.stack_size()
                    ),
                });
            }
        }
        let pending = self.pending_jumps.take();
        self.pending_jumps = chain::merge(chain, pending)?;
        Ok(())
    }

    fn resolve_pending(&mut self) -> Result<()> {
        let pending = self.pending_jumps.take();
        let cp = self.cp();
        self.resolve_to(pending, cp)
    }

    /// Current pc with pending jumps resolved; fixes the position.
    pub fn cur_cp(&mut self) -> Result<u32> {
        if self.pending_jumps.is_some() {
            self.resolve_pending()?;
        }
        if self.pending_stat_line.is_some() {
            self.mark_stat_begin();
        }
        self.fixed_pc = true;
        Ok(self.cp())
    }

    /// Marks the current pc as a jump target with the current state.
    pub fn entry_point(&mut self) -> Result<u32> {
        let pc = self.cur_cp()?;
        self.alive = true;
        Ok(pc)
    }

    /// Marks the current pc as a jump target entered with `state`.
    pub fn entry_point_with(&mut self, state: &State) -> Result<u32> {
        let pc = self.cur_cp()?;
        self.alive = true;
        self.state = state.clone();
        self.max_stack = self.max_stack.max(self.state.stack_size());
        Ok(pc)
    }

    /// Like [`Code::entry_point_with`], with one extra value of type code `tc` pushed.
    pub fn entry_point_pushed(&mut self, state: &State, tc: u8) -> Result<u32> {
        let pc = self.entry_point_with(state)?;
        self.push(tc);
        Ok(pc)
    }

    fn drop_trailing(&mut self, n: u32) {
        let old_cp = self.cp();
        let new_cp = old_cp - n;
        self.bytes.truncate(new_cp as usize);
        if self.var_debug_info {
            for entry in &mut self.local_var_table {
                if entry.start_pc as u32 + entry.length as u32 >= old_cp {
                    entry.length = entry.length.saturating_sub(n as u16);
                }
            }
            for slot in self.locals.iter_mut().flatten() {
                if let Some(start) = slot.start_pc {
                    if start > new_cp {
                        slot.start_pc = Some(new_cp);
                    }
                }
            }
        }
        while self.line_info.last().map_or(false, |e| e.start_pc as u32 >= new_cp) {
            self.line_info.pop();
        }
    }

    // ----- exception table -----

    /// Adds an exception-table row; empty ranges are dropped.
    pub fn add_catch(&mut self, start_pc: u16, end_pc: u16, handler_pc: u16, catch_type: u16) {
        if start_pc != end_pc {
            self.catch_info.push(CatchEntry { start_pc, end_pc, handler_pc, catch_type });
        }
    }

    // ----- line numbers -----

    /// Records that the next statement starts on `line`.
    pub fn stat_begin(&mut self, line: usize) {
        if line > 0 {
            self.pending_stat_line = Some(line);
        }
    }

    /// Emits the pending line-number entry at the current pc.
    pub fn mark_stat_begin(&mut self) {
        if let Some(line) = self.pending_stat_line.take() {
            if self.alive && self.line_debug_info && self.cp() <= 0xFFFF && line <= 0xFFFF {
                self.add_line_number(self.cp() as u16, line as u16);
            }
        }
    }

    fn add_line_number(&mut self, start_pc: u16, line: u16) {
        if self.line_info.last().map_or(false, |e| e.start_pc == start_pc) {
            self.line_info.pop();
        }
        if self.line_info.last().map_or(true, |e| e.line != line) {
            self.line_info.push(LineNumberEntry { start_pc, line });
        }
    }

    // ----- local variables -----

    /// Allocates a register for a value of type code `tc`.
    pub fn new_local_reg(&mut self, tc: u8) -> u16 {
        let reg = self.next_reg;
        self.next_reg += typecodes::width(tc).max(1);
        self.max_locals = self.max_locals.max(self.next_reg);
        reg as u16
    }

    /// Allocates a register for a named variable, tracked for the
    /// local-variable table when enabled.
    pub fn new_local(&mut self, name: &str, ty: &Type) -> u16 {
        let reg = self.new_local_reg(typecodes::of(ty));
        if self.var_debug_info {
            let r = reg as usize;
            if self.locals.len() <= r {
                self.locals.resize(r + 1, None);
            }
            self.locals[r] = Some(LocalSlot {
                name: name.to_string(),
                descriptor: ty.descriptor(),
                start_pc: None,
            });
        }
        reg
    }

    /// Marks `reg` as holding a value from here on.
    pub fn set_defined(&mut self, reg: u16) {
        let cp = self.cp();
        if let Some(Some(slot)) = self.locals.get_mut(reg as usize) {
            if slot.start_pc.is_none() {
                slot.start_pc = Some(cp);
            }
        }
    }

    /// Frees every register from `first` up.
    pub fn end_scopes(&mut self, first: u32) -> Result<()> {
        let prev = self.next_reg;
        self.next_reg = first;
        for reg in first..prev {
            self.end_scope(reg as usize)?;
        }
        Ok(())
    }

    fn end_scope(&mut self, reg: usize) -> Result<()> {
        let Some(slot) = self.locals.get_mut(reg).and_then(Option::take) else {
            return Ok(());
        };
        if let Some(start) = slot.start_pc {
            let end = self.cur_cp()?;
            let length = end - start;
            if length > 0 && length < 0xFFFF && start <= 0xFFFF {
                self.local_var_table.push(LocalVarEntry {
                    start_pc: start as u16,
                    length: length as u16,
                    name: slot.name,
                    descriptor: slot.descriptor,
                    reg: reg as u16,
                });
            }
        }
        Ok(())
    }

    // ----- completion -----

    /// Limits this method exceeds.
    pub fn check_limits(&self) -> Vec<LimitKind> {
        let mut over = Vec::new();
        if self.cp() > MAX_CODE {
            over.push(LimitKind::Code);
        }
        if self.max_stack > MAX_CODE {
            over.push(LimitKind::Stack);
        }
        if self.max_locals > MAX_CODE {
            over.push(LimitKind::Locals);
        }
        over
    }

    pub fn finish(self) -> CodeAttr {
        CodeAttr {
            code: self.bytes,
            max_stack: self.max_stack.min(MAX_CODE) as u16,
            max_locals: self.max_locals.min(MAX_CODE) as u16,
            exception_table: self.catch_info,
            line_numbers: if self.line_debug_info { Some(self.line_info) } else { None },
            local_vars: if self.var_debug_info { Some(self.local_var_table) } else { None },
            crt: self.crt,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code() -> Code {
        Code::new(false, &Config::default())
    }

    #[test]
    fn stack_effects_are_tracked() {
        let mut c = code();
        c.emitop0(LCONST_1).unwrap();
        c.emitop0(DUP2).unwrap();
        assert_eq!(c.state.stack_size(), 4);
        c.emitop0(LADD).unwrap();
        assert_eq!(c.state.stack_size(), 2);
        assert_eq!(c.state.top(), Some(LONG));
        c.emitop0(POP2).unwrap();
        assert_eq!(c.max_stack, 4);
    }

    #[test]
    fn dup_forms_raise_max_stack() {
        let mut c = code();
        c.emitop0(ICONST_1).unwrap();
        c.emitop0(DUP).unwrap();
        assert_eq!(c.max_stack, 2);
        c.emitop0(ICONST_2).unwrap();
        c.emitop0(DUP_X2).unwrap();
        assert_eq!(c.state.stack_size(), 4);
        c.emitop0(POP2).unwrap();
        c.emitop0(POP2).unwrap();
        assert_eq!(c.max_stack, 4);
    }

    #[test]
    fn resolved_chain_state_counts_towards_max_stack() {
        let mut c = code();
        let mut state = c.state.clone();
        state.push(OBJECT);
        let pc = c.emit_jump(JSR).unwrap();
        let chain = Chain::new(pc, state, None).boxed();
        c.emitop0(RETURN).unwrap();
        assert_eq!(c.max_stack, 0);
        c.resolve(chain).unwrap();
        c.emitop1w(ASTORE, 1).unwrap();
        assert_eq!(c.max_stack, 1);
        assert_eq!(c.state.stack_size(), 0);
    }

    #[test]
    fn emission_stops_when_dead() {
        let mut c = code();
        c.emitop0(RETURN).unwrap();
        c.emitop0(ICONST_1).unwrap();
        assert_eq!(c.bytes(), &[RETURN]);
        assert!(!c.is_alive());
    }

    #[test]
    fn goto_to_next_instruction_is_dropped() {
        let mut c = code();
        c.emitop0(NOP).unwrap();
        let chain = c.branch(GOTO).unwrap();
        c.resolve(chain).unwrap();
        c.emitop0(RETURN).unwrap();
        assert_eq!(c.bytes(), &[NOP, RETURN]);
    }

    #[test]
    fn backward_branch_gets_negative_offset() {
        let mut c = code();
        let start = c.entry_point().unwrap();
        c.emitop0(NOP).unwrap();
        let chain = c.branch(GOTO).unwrap();
        c.resolve_to(chain, start).unwrap();
        assert_eq!(c.get1(1), GOTO);
        assert_eq!(c.get2(2) as i16, -1);
    }

    #[test]
    fn far_branch_requests_wide_encoding() {
        let mut c = code();
        c.emitop0(ICONST_0).unwrap();
        let chain = c.branch(IFEQ).unwrap();
        for _ in 0..40_000 {
            c.emitop0(NOP).unwrap();
        }
        c.resolve(chain).unwrap();
        c.emitop0(RETURN).unwrap();
        assert!(c.needs_wide());
    }

    #[test]
    fn fat_conditional_is_inverted_over_goto_w() {
        let mut c = Code::new(true, &Config::default());
        c.emitop0(ICONST_0).unwrap();
        let chain = c.branch(IFEQ).unwrap();
        assert!(c.is_alive());
        c.emitop0(NOP).unwrap();
        c.resolve(chain).unwrap();
        c.emitop0(RETURN).unwrap();
        assert_eq!(c.get1(1), IFNE);
        assert_eq!(c.get2(2), 8);
        assert_eq!(c.get1(4), GOTO_W);
        assert_eq!(c.get4(5), 6);
    }

    #[test]
    fn wide_register_forms() {
        let mut c = code();
        c.emitop0(ICONST_0).unwrap();
        c.emitop1w(ISTORE, 300).unwrap();
        c.emit_iinc(2, 1000).unwrap();
        assert_eq!(&c.bytes()[1..5], &[WIDE, ISTORE, 0x01, 0x2c]);
        assert_eq!(&c.bytes()[5..11], &[WIDE, IINC, 0x00, 0x02, 0x03, 0xe8]);
    }

    #[test]
    fn empty_catch_ranges_are_dropped() {
        let mut c = code();
        c.add_catch(4, 4, 10, 0);
        c.add_catch(0, 4, 10, 0);
        assert_eq!(c.catch_info().len(), 1);
    }

    #[test]
    fn line_numbers_collapse() {
        let mut c = code();
        c.stat_begin(3);
        c.emitop0(NOP).unwrap();
        c.stat_begin(3);
        c.emitop0(NOP).unwrap();
        c.stat_begin(4);
        c.emitop0(RETURN).unwrap();
        let attr = c.finish();
        let lines = attr.line_numbers.unwrap();
        assert_eq!(lines, vec![
            LineNumberEntry { start_pc: 0, line: 3 },
            LineNumberEntry { start_pc: 2, line: 4 },
        ]);
    }
}
