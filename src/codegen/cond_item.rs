//! Conditions as jump chains.
//!
//! A `CondItem` is a condition that has been evaluated up to its final
//! test. `opcode` is the branch taken when the condition holds; the chains
//! hold jumps already emitted for short-circuited sub-conditions.

use super::chain::{self, Chain};
use super::code::Code;
use super::opcodes::{self, DONTGOTO, GOTO, ICONST_0, ICONST_1};
use crate::error::Result;

#[derive(Debug, Clone, PartialEq)]
pub struct CondItem {
    pub opcode: u8,
    /// Jumps taken when the condition is true.
    pub true_jumps: Option<Box<Chain>>,
    /// Jumps taken when the condition is false.
    pub false_jumps: Option<Box<Chain>>,
}

impl CondItem {
    pub fn new(opcode: u8, true_jumps: Option<Box<Chain>>, false_jumps: Option<Box<Chain>>) -> Self {
        Self { opcode, true_jumps, false_jumps }
    }

    /// Constant condition: always true or always false.
    pub fn constant(value: bool) -> Self {
        Self::new(if value { GOTO } else { DONTGOTO }, None, None)
    }

    /// Statically true: nothing can jump to the false side.
    pub fn is_true(&self) -> bool {
        self.false_jumps.is_none() && self.opcode == GOTO
    }

    /// Statically false: nothing can jump to the true side.
    pub fn is_false(&self) -> bool {
        self.true_jumps.is_none() && self.opcode == DONTGOTO
    }

    /// Emits the final test and returns every jump taken on true.
    pub fn jump_true(self, code: &mut Code) -> Result<Option<Box<Chain>>> {
        let jump = code.branch(self.opcode)?;
        chain::merge(self.true_jumps, jump)
    }

    /// Emits the negated final test and returns every jump taken on false.
    pub fn jump_false(self, code: &mut Code) -> Result<Option<Box<Chain>>> {
        let jump = code.branch(opcodes::negate(self.opcode))?;
        chain::merge(self.false_jumps, jump)
    }

    pub fn negate(self) -> CondItem {
        CondItem::new(opcodes::negate(self.opcode), self.false_jumps, self.true_jumps)
    }

    /// Materializes the condition as 0 or 1 on the stack.
    pub fn load(mut self, code: &mut Code) -> Result<()> {
        let true_jumps = self.true_jumps.take();
        let is_false = true_jumps.is_none() && self.opcode == DONTGOTO;
        let false_chain = CondItem::new(self.opcode, None, self.false_jumps.take()).jump_false(code)?;
        let mut true_chain = None;
        if !is_false {
            code.resolve(true_jumps)?;
            code.emitop0(ICONST_1)?;
            true_chain = code.branch(GOTO)?;
        }
        if false_chain.is_some() {
            code.resolve(false_chain)?;
            code.emitop0(ICONST_0)?;
        }
        code.resolve(true_chain)
    }
}
