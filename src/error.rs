//! Error types for the code generator

use thiserror::Error;

use crate::ast::NodeId;

/// Errors raised while lowering a class.
///
/// Everything except [`Error::CodeSizeOverflow`] and [`Error::Config`] is an
/// invariant violation: the input tree broke a precondition of the pass or
/// the generator itself is inconsistent. `CodeSizeOverflow` never leaves the
/// method driver, which turns it into a regeneration with wide encodings.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("operand stack depth is {depth} at statement boundary (line {line})")]
    StackDepth { depth: u32, line: usize },
    #[error("jump chain still unresolved when leaving {scope} scope")]
    UnresolvedChain { scope: &'static str },
    #[error("gap list has odd length when opening a new gap")]
    OddGapList,
    #[error("incompatible machine states at pc {pc}: {detail}")]
    StateMismatch { pc: u32, detail: String },
    #[error("{kind} must be lowered before code generation (line {line})")]
    Unlowered { kind: &'static str, line: usize },
    #[error("illegal operation `{op}` on {item} item")]
    IllegalItemOp { op: &'static str, item: &'static str },
    #[error("cannot resolve internal method {owner}.{name}")]
    UnresolvedMethod { owner: String, name: String },
    #[error("jump target {0} is not an enclosing statement")]
    UnknownJumpTarget(NodeId),
    #[error("exception range does not fit the narrow encoding")]
    CodeSizeOverflow,
    #[error("invalid option: {message}")]
    Config { message: String },
    #[error("internal code generator error: {message}")]
    Internal { message: String },
}

impl Error {
    pub fn internal(message: impl Into<String>) -> Self {
        Error::Internal { message: message.into() }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Error::Config { message: message.into() }
    }

    /// True for errors that signal a broken precondition or generator bug.
    pub fn is_invariant_violation(&self) -> bool {
        !matches!(self, Error::CodeSizeOverflow | Error::Config { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
