//! Arena-backed abstract syntax tree.
//!
//! Nodes live in a single `Vec` owned by [`Ast`] and refer to each other by
//! dense [`NodeId`] indices; a failed speculative parse may leave unreachable
//! nodes behind, which is fine: the whole arena is dropped when compilation
//! ends. Child order is semantic: left before right, condition before body
//! before else.

use smallvec::SmallVec;

/// Index of a node in the AST arena.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct NodeId(u32);

impl NodeId {
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Binary operator subtags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum BinOpKind {
    Add,
    Sub,
    Mul,
    Div,
    BAnd,
    BOr,
    BXor,
    LAnd,
    LOr,
    Eq,
    Ne,
    StrictEq,
    StrictNe,
    Lt,
    Gt,
    Le,
    Ge,
}

impl BinOpKind {
    /// Short-circuiting operators lower to control flow instead of a
    /// `BinOp` instruction.
    #[must_use]
    pub fn is_logical(self) -> bool {
        matches!(self, Self::LAnd | Self::LOr)
    }

    /// Arithmetic operators produce numbers.
    #[must_use]
    pub fn is_arithmetic(self) -> bool {
        matches!(self, Self::Add | Self::Sub | Self::Mul | Self::Div)
    }

    /// Bitwise operators produce small integers.
    #[must_use]
    pub fn is_bitwise(self) -> bool {
        matches!(self, Self::BAnd | Self::BOr | Self::BXor)
    }
}

/// Unary operator subtags. Prefix `++`/`--` and their postfix forms share
/// the increment instruction; the difference is which value the expression
/// yields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum UnOpKind {
    Plus,
    Minus,
    Not,
    PreInc,
    PreDec,
    PostInc,
    PostDec,
}

/// Payload of an object literal: parallel key/value lists in source order.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ObjectParts {
    pub keys: Vec<NodeId>,
    pub values: Vec<NodeId>,
}

/// Payload of a function literal.
///
/// While a `(`-suffixed member is being parsed this doubles as the staging
/// area for what may turn out to be a plain call: `params` holds the
/// argument expressions until the presence or absence of a body decides
/// which it is.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FunctionParts {
    /// The declared name (or callee while undecided); `None` for anonymous
    /// functions.
    pub name: Option<NodeId>,
    /// Parameter names for declarations; argument expressions while
    /// undecided.
    pub params: Vec<NodeId>,
    /// Set for `recv:name(...)` receiver calls.
    pub method: bool,
}

/// Node variant tags. Children are stored on the node itself; a block's
/// children are its statements, a function literal's children are its body
/// statements.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum AstKind {
    Block,
    Nop,
    Return,
    Break,
    Continue,
    If,
    While,
    Assign,
    /// Children: `[receiver, key]`; `computed` distinguishes `a[expr]` from
    /// `a.name`.
    Member {
        computed: bool,
    },
    Property,
    Name,
    Number,
    String,
    True,
    False,
    Nil,
    ArrayLiteral,
    ObjectLiteral(Box<ObjectParts>),
    FunctionLiteral(Box<FunctionParts>),
    /// Children: `[callee, args...]`.
    Call {
        method: bool,
    },
    /// A `expr...` spread in call arguments or a trailing rest parameter.
    VarArg,
    BinOp(BinOpKind),
    UnOp(UnOpKind),
    Typeof,
    Sizeof,
    Keysof,
    Clone,
    Delete,
}

/// One AST node: tag, source span, ordered children.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AstNode {
    pub kind: AstKind,
    pub offset: u32,
    pub length: u32,
    pub children: SmallVec<[NodeId; 4]>,
}

impl AstNode {
    /// The source substring this node's span covers. Meaningful for
    /// token-derived nodes (names, literals, properties); composite nodes
    /// carry an offset but no length.
    #[must_use]
    pub fn lexeme<'src>(&self, source: &'src str) -> &'src str {
        let start = self.offset as usize;
        &source[start..start + self.length as usize]
    }
}

/// The arena. The root is always a synthetic top-level `FunctionLiteral`
/// holding the program's statements.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Ast {
    nodes: Vec<AstNode>,
    root: NodeId,
}

impl Ast {
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            root: NodeId(0),
        }
    }

    pub fn alloc(&mut self, kind: AstKind, offset: u32) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(AstNode {
            kind,
            offset,
            length: 0,
            children: SmallVec::new(),
        });
        id
    }

    #[must_use]
    pub fn node(&self, id: NodeId) -> &AstNode {
        &self.nodes[id.index()]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut AstNode {
        &mut self.nodes[id.index()]
    }

    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    pub(crate) fn set_root(&mut self, root: NodeId) {
        self.root = root;
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// All node ids in allocation order.
    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len() as u32).map(NodeId)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl Default for Ast {
    fn default() -> Self {
        Self::new()
    }
}
