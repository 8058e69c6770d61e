//! Attributed syntax tree consumed by the code generator.
//!
//! Trees arrive here fully attributed: every expression carries its erased
//! type and (when it is a compile-time constant) its folded value, every
//! identifier carries its resolved symbol, and every `break`/`continue`
//! names the statement it leaves.

mod maker;
mod nodes;
mod types;

pub use maker::*;
pub use nodes::*;
pub use types::*;

/// Source location information
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Location {
    pub line: usize,
    pub column: usize,
    pub offset: usize,
}

impl Location {
    pub fn new(line: usize, column: usize, offset: usize) -> Self {
        Self { line, column, offset }
    }
}

/// Span of source code (start and end locations)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Span {
    pub start: Location,
    pub end: Location,
}

impl Span {
    pub fn new(start: Location, end: Location) -> Self {
        Self { start, end }
    }

    pub fn from_to(start_line: usize, start_col: usize, end_line: usize, end_col: usize) -> Self {
        Self {
            start: Location::new(start_line, start_col, 0),
            end: Location::new(end_line, end_col, 0),
        }
    }

    /// A span covering a single line, used by synthesized trees and tests.
    pub fn line(line: usize) -> Self {
        Self::from_to(line, 1, line, 1)
    }

    pub fn first_line(&self) -> usize {
        self.start.line
    }

    pub fn last_line(&self) -> usize {
        self.end.line
    }
}

/// Identity of a statement node. Jump targets refer to statements by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Id given to statements the generator synthesizes itself; never a jump target.
    pub const SYNTHETIC: NodeId = NodeId(u32::MAX);
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}
