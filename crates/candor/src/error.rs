//! Error types for the compilation pipeline.
//!
//! Two kinds of failure exist. [`ParseError`] is user-visible: the parser
//! never panics, it records the first descriptive message together with the
//! source offset of the offending token. [`CompileError`] covers internal
//! invariant violations in the HIR layer; these indicate a bug in the caller
//! or the compiler itself and abort compilation with a diagnostic.

use std::{borrow::Cow, fmt};

/// A parse failure: a descriptive message plus the byte offset of the first
/// unrecoverable token.
///
/// Only the first error raised during a parse is kept; later errors are
/// suppressed until the parse either succeeds (which clears the error) or
/// gives up.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ParseError {
    /// Human-readable description of what the parser expected.
    pub message: Cow<'static, str>,
    /// Byte offset into the source buffer where the error was detected.
    pub offset: u32,
}

impl ParseError {
    pub(crate) fn new(message: &'static str, offset: u32) -> Self {
        Self {
            message: Cow::Borrowed(message),
            offset,
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at offset {}", self.message, self.offset)
    }
}

impl std::error::Error for ParseError {}

/// An internal invariant violation during HIR construction.
///
/// These are programming errors, not malformed input: the parser has already
/// accepted the program, so hitting one of these means the AST, the scope
/// tables, or the graph bookkeeping disagree with each other.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum CompileError {
    /// `break` or `continue` reached the HIR builder outside any loop.
    StrayLoopExit {
        /// Byte offset of the statement.
        offset: u32,
    },
    /// A name node reached the builder without a slot assigned by the
    /// resolver.
    UnresolvedSlot {
        /// Byte offset of the name.
        offset: u32,
    },
    /// The left-hand side of an assignment is not a name or member access.
    InvalidAssignTarget {
        /// Byte offset of the target expression.
        offset: u32,
    },
    /// Graph bookkeeping violation (duplicate result, malformed block, ...).
    Invariant {
        /// Description of the violated invariant.
        message: Cow<'static, str>,
    },
}

impl CompileError {
    pub(crate) fn invariant(message: &'static str) -> Self {
        Self::Invariant {
            message: Cow::Borrowed(message),
        }
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StrayLoopExit { offset } => {
                write!(f, "break or continue outside of a loop at offset {offset}")
            }
            Self::UnresolvedSlot { offset } => {
                write!(f, "name without a resolved slot at offset {offset}")
            }
            Self::InvalidAssignTarget { offset } => {
                write!(f, "invalid assignment target at offset {offset}")
            }
            Self::Invariant { message } => write!(f, "compiler invariant violated: {message}"),
        }
    }
}

impl std::error::Error for CompileError {}

/// Any failure produced by [`crate::compile`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The source text did not parse.
    Parse(ParseError),
    /// The compiler tripped over an internal invariant.
    Compile(CompileError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(e) => e.fmt(f),
            Self::Compile(e) => e.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Parse(e) => Some(e),
            Self::Compile(e) => Some(e),
        }
    }
}

impl From<ParseError> for Error {
    fn from(e: ParseError) -> Self {
        Self::Parse(e)
    }
}

impl From<CompileError> for Error {
    fn from(e: CompileError) -> Self {
        Self::Compile(e)
    }
}
