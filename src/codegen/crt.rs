//! Character-range table: maps source ranges to code ranges for coverage tools.

use crate::ast::Span;

pub const CRT_STATEMENT: u16 = 0x0001;
pub const CRT_BLOCK: u16 = 0x0002;
pub const CRT_ASSIGNMENT: u16 = 0x0004;
pub const CRT_FLOW_CONTROLLER: u16 = 0x0008;
pub const CRT_FLOW_TARGET: u16 = 0x0010;
pub const CRT_INVOKE: u16 = 0x0020;
pub const CRT_CREATE: u16 = 0x0040;
pub const CRT_BRANCH_TRUE: u16 = 0x0080;
pub const CRT_BRANCH_FALSE: u16 = 0x0100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrtEntry {
    pub span: Span,
    pub flags: u16,
    pub start_pc: u32,
    pub end_pc: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrTable {
    entries: Vec<CrtEntry>,
}

impl CrTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a range; ranges that cover no code are dropped.
    pub fn put(&mut self, span: Span, flags: u16, start_pc: u32, end_pc: u32) {
        if start_pc < end_pc {
            self.entries.push(CrtEntry { span, flags, start_pc, end_pc });
        }
    }

    pub fn entries(&self) -> &[CrtEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
