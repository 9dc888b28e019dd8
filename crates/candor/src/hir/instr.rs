//! HIR instructions: SSA values with dense ids, use lists, and a
//! representation bitmask.

use std::fmt;

use bitflags::bitflags;
use smallvec::SmallVec;
use strum::IntoStaticStr;

use crate::{
    ast::{BinOpKind, NodeId},
    intern::{LiteralKind, RootSlot},
    scope::SlotRef,
};

use super::BlockId;

/// Dense instruction id, assigned in creation order and stepping by two:
/// odd ids are reserved for the paired move instructions a later lowering
/// stage inserts between existing instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct InstrId(pub(crate) u32);

impl InstrId {
    /// The raw id as printed in dumps.
    #[must_use]
    pub fn value(self) -> u32 {
        self.0
    }

    pub(crate) fn arena_index(self) -> usize {
        (self.0 / 2) as usize
    }
}

impl fmt::Display for InstrId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "i{}", self.0)
    }
}

/// A resolved context address used by `LoadContext`/`StoreContext`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ContextSlot {
    /// The root context object (`global`).
    Global,
    /// `depth` hops up the context chain, then slot `index`.
    At { depth: u16, index: u16 },
}

bitflags! {
    /// Value representation bitmask, computed by a fixed-point pass after
    /// construction. Starts at [`Representation::ANY`] and narrows.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
    pub struct Representation: u16 {
        const NIL = 1 << 0;
        const SMI = 1 << 1;
        const HEAP_NUMBER = 1 << 2;
        const STRING = 1 << 3;
        const BOOLEAN = 1 << 4;
        const OBJECT = 1 << 5;
        const ARRAY = 1 << 6;
        const FUNCTION = 1 << 7;
        const HOLE = 1 << 8;

        const NUMBER = Self::SMI.bits() | Self::HEAP_NUMBER.bits();
        const ANY = Self::NIL.bits()
            | Self::NUMBER.bits()
            | Self::STRING.bits()
            | Self::BOOLEAN.bits()
            | Self::OBJECT.bits()
            | Self::ARRAY.bits()
            | Self::FUNCTION.bits()
            | Self::HOLE.bits();
    }
}

/// Instruction variant tags. The static name of each variant is the
/// instruction name printed in dumps.
#[derive(Debug, Clone, PartialEq, Eq, IntoStaticStr, serde::Serialize, serde::Deserialize)]
pub enum InstrKind {
    Nop,
    Nil,
    Entry {
        context_slots: u16,
    },
    Return,
    Function {
        body: BlockId,
        arg_count: u16,
    },
    LoadArg {
        index: u16,
    },
    LoadVarArg,
    StoreArg {
        index: u16,
    },
    StoreVarArg,
    AlignStack,
    LoadContext {
        slot: ContextSlot,
    },
    StoreContext {
        slot: ContextSlot,
    },
    LoadProperty,
    StoreProperty,
    DeleteProperty,
    If,
    /// The loop flavor of `If`, emitted by the condition block of a
    /// `while`.
    While,
    Goto,
    Literal {
        kind: LiteralKind,
        slot: RootSlot,
        /// Lexeme shown in dumps; synthesized literals (array indices)
        /// carry none and print bare.
        text: Option<Box<str>>,
    },
    Not,
    BinOp {
        op: BinOpKind,
    },
    Typeof,
    Sizeof,
    Keysof,
    Clone,
    Call,
    CollectGarbage,
    GetStackTrace,
    AllocateObject {
        size: u16,
    },
    AllocateArray {
        size: u16,
    },
    Phi,
}

impl InstrKind {
    /// Terminators close their block; instructions created against a closed
    /// block are dropped.
    #[must_use]
    pub fn is_terminator(&self) -> bool {
        matches!(self, Self::Goto | Self::If | Self::While | Self::Return)
    }

    /// Branches fork into two successor blocks.
    #[must_use]
    pub fn is_branch(&self) -> bool {
        matches!(self, Self::If | Self::While)
    }
}

/// One SSA value.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Instr {
    pub id: InstrId,
    pub kind: InstrKind,
    /// Ordered argument list; references to other values by id.
    pub inputs: SmallVec<[InstrId; 2]>,
    /// Back-edges: values consuming this one.
    pub uses: Vec<InstrId>,
    /// Owning basic block.
    pub block: BlockId,
    /// Source AST node this value was lowered from.
    pub ast: Option<NodeId>,
    /// Scope slot association, when the value defines or loads a variable.
    pub slot: Option<SlotRef>,
    pub repr: Representation,
    /// Pinned values must stay in their block; set for the benefit of
    /// code-motion passes downstream of this crate.
    pub pinned: bool,
    /// Logically deleted. Removed values keep their id so dump id gaps stay
    /// stable.
    pub removed: bool,
}

impl Instr {
    /// Computes this value's representation from its operator and inputs.
    /// Called repeatedly by the fixed-point pass until nothing changes.
    #[must_use]
    pub fn calculate_representation(&self, input_reprs: &[Representation]) -> Representation {
        match &self.kind {
            InstrKind::Phi => input_reprs
                .iter()
                .copied()
                .fold(Representation::ANY, |acc, r| acc & r),
            InstrKind::Nil => Representation::NIL,
            InstrKind::Literal { kind, text, .. } => literal_representation(*kind, text.as_deref()),
            InstrKind::BinOp { op } => {
                if op.is_arithmetic() {
                    Representation::NUMBER
                } else if op.is_bitwise() {
                    Representation::SMI
                } else {
                    Representation::BOOLEAN
                }
            }
            InstrKind::Not => Representation::BOOLEAN,
            InstrKind::Typeof => Representation::STRING,
            InstrKind::Sizeof => Representation::NUMBER,
            InstrKind::Keysof => Representation::ARRAY,
            InstrKind::Clone => Representation::OBJECT,
            InstrKind::AllocateObject { .. } => Representation::OBJECT,
            InstrKind::AllocateArray { .. } => Representation::ARRAY,
            InstrKind::Function { .. } => Representation::FUNCTION,
            // Stores flow their stored value through.
            InstrKind::StoreContext { .. } => input_reprs.first().copied().unwrap_or(Representation::ANY),
            InstrKind::StoreProperty => input_reprs.get(2).copied().unwrap_or(Representation::ANY),
            _ => Representation::ANY,
        }
    }
}

/// Number literals that parse as small integers are unboxed.
fn literal_representation(kind: LiteralKind, text: Option<&str>) -> Representation {
    match kind {
        LiteralKind::String => Representation::STRING,
        LiteralKind::True | LiteralKind::False => Representation::BOOLEAN,
        LiteralKind::Number => match text {
            None => Representation::SMI,
            Some(text) => match text.parse::<i64>() {
                Ok(v) if v.unsigned_abs() < (1 << 30) => Representation::SMI,
                _ => Representation::HEAP_NUMBER,
            },
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instruction_names_match_variants() {
        let name: &'static str = (&InstrKind::LoadProperty).into();
        assert_eq!(name, "LoadProperty");
        let name: &'static str = (&InstrKind::While).into();
        assert_eq!(name, "While");
        let name: &'static str = (&InstrKind::AllocateObject { size: 2 }).into();
        assert_eq!(name, "AllocateObject");
    }

    #[test]
    fn smi_cutoff() {
        assert_eq!(
            literal_representation(LiteralKind::Number, Some("7")),
            Representation::SMI
        );
        assert_eq!(
            literal_representation(LiteralKind::Number, Some("1073741824")),
            Representation::HEAP_NUMBER
        );
        assert_eq!(
            literal_representation(LiteralKind::Number, Some("1.5")),
            Representation::HEAP_NUMBER
        );
    }

    #[test]
    fn phi_narrows_by_intersection() {
        let phi = Instr {
            id: InstrId(0),
            kind: InstrKind::Phi,
            inputs: SmallVec::new(),
            uses: Vec::new(),
            block: BlockId(0),
            ast: None,
            slot: None,
            repr: Representation::ANY,
            pinned: false,
            removed: false,
        };
        let reprs = [Representation::NUMBER, Representation::SMI];
        assert_eq!(phi.calculate_representation(&reprs), Representation::SMI);
    }
}
