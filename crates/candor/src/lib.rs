//! Compilation front half and inline-cache runtime for the Candor
//! scripting language.
//!
//! The pipeline turns source text into an SSA high-level intermediate
//! representation ready for instruction selection:
//!
//! 1. [`parser`]: recursive descent with savepoint rollback over a
//!    lookahead lexer, producing an arena [`Ast`].
//! 2. [`scope`]: slot resolution covering locals, captured context slots,
//!    and the root `global` object.
//! 3. [`hir`]: SSA construction over a CFG with φ-nodes at joins and loop
//!    headers, trivial-φ pruning, and representation inference.
//!
//! At run time, compiled property accesses specialize themselves through
//! [`Pic`], a self-patching polymorphic inline cache that cooperates with
//! the embedding host's garbage collector through the narrow [`Heap`] and
//! [`CodeSpace`] interfaces.
//!
//! ```
//! let compilation = candor::compile("a = 1\nb = 1\nreturn a").unwrap();
//! assert!(compilation.hir_dump().starts_with("# Block 0\ni0 = Entry\n"));
//! ```

pub mod ast;
pub mod code;
pub mod compile;
pub mod error;
pub mod heap;
pub mod hir;
pub mod intern;
pub mod lexer;
pub mod parser;
pub mod pic;
pub mod scope;

pub use crate::{
    ast::{Ast, AstKind, NodeId},
    code::{ChunkId, CodeSpace, MemoryCodeSpace},
    compile::{Compilation, compile},
    error::{CompileError, Error, ParseError},
    heap::{Heap, HeapTag, IC_DISABLED, RefKind, Word},
    hir::{Graph, InstrId, InstrKind, Representation},
    intern::{RootPool, RootSlot},
    lexer::{Lexer, Token, TokenKind},
    parser::{Parser, parse},
    pic::Pic,
    scope::{ScopeInfo, SlotRef},
};
