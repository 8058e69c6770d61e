//! User-visible limit diagnostics.
//!
//! These are legal programs the target format cannot represent. Reporting
//! one voids the affected member's code but never stops the pass.

use std::fmt;

use crate::ast::Span;

/// Largest number of parameter words a method may take.
pub const MAX_PARAMETERS: u32 = 255;
/// Largest number of array dimensions.
pub const MAX_DIMENSIONS: usize = 255;
/// String constants must be strictly shorter than this.
pub const MAX_STRING_LENGTH: usize = 0xFFFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LimitKind {
    Dimensions,
    Parameters,
    StringConstant,
    PoolEntries,
    CodeTooLargeForTry,
    Code,
    Stack,
    Locals,
}

impl LimitKind {
    /// Message key, as used by compiler resource bundles.
    pub fn key(self) -> &'static str {
        match self {
            LimitKind::Dimensions => "limit.dimensions",
            LimitKind::Parameters => "limit.parameters",
            LimitKind::StringConstant => "limit.string",
            LimitKind::PoolEntries => "limit.pool",
            LimitKind::CodeTooLargeForTry => "limit.code.too.large.for.try.stmt",
            LimitKind::Code => "limit.code",
            LimitKind::Stack => "limit.stack",
            LimitKind::Locals => "limit.locals",
        }
    }
}

impl fmt::Display for LimitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            LimitKind::Dimensions => "array type has too many dimensions",
            LimitKind::Parameters => "too many parameters",
            LimitKind::StringConstant => "constant string too long",
            LimitKind::PoolEntries => "too many constants",
            LimitKind::CodeTooLargeForTry => "code too large for try statement",
            LimitKind::Code => "code too large",
            LimitKind::Stack => "code requires too much stack",
            LimitKind::Locals => "too many local variables",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub span: Span,
    pub kind: LimitKind,
}

/// Receiver of limit diagnostics.
pub trait DiagnosticSink {
    fn report(&mut self, span: Span, kind: LimitKind);
}

/// A sink that keeps every report, in order.
#[derive(Debug, Default, Clone)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, kind: LimitKind) -> bool {
        self.entries.iter().any(|d| d.kind == kind)
    }
}

impl DiagnosticSink for Diagnostics {
    fn report(&mut self, span: Span, kind: LimitKind) {
        log::warn!("{}:{}: {} [{}]", span.start.line, span.start.column, kind, kind.key());
        self.entries.push(Diagnostic { span, kind });
    }
}
