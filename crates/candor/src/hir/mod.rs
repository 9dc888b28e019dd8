//! High-level intermediate representation: an SSA graph of typed
//! instructions over a control-flow graph of basic blocks.
//!
//! Instructions and blocks live in per-compilation arenas and reference
//! each other through dense ids, which keeps the value/use-list cycles out
//! of the ownership graph. Instruction ids step by two in creation order;
//! removed instructions keep their id, so gaps in a dump are meaningful and
//! stable.
//!
//! # Module structure
//!
//! - `instr` - instruction tags, ids, representation bitmask
//! - `builder` - AST to SSA lowering
//! - `abi` - call argument expansion for the instruction selector

use std::fmt::Write;

use smallvec::SmallVec;

use crate::ast::NodeId;

pub use abi::expand_call_args;
pub use builder::build;
pub use instr::{ContextSlot, Instr, InstrId, InstrKind, Representation};

mod abi;
mod builder;
mod instr;

/// Dense basic-block id; doubles as the block number in dumps.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct BlockId(pub(crate) u32);

impl BlockId {
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A basic block: at most two successors, one terminator at the tail.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Block {
    pub id: BlockId,
    pub preds: SmallVec<[BlockId; 2]>,
    pub succs: SmallVec<[BlockId; 2]>,
    /// φ-nodes, in slot order; printed ahead of the instruction list.
    pub phis: Vec<InstrId>,
    pub instrs: Vec<InstrId>,
    /// Set once a terminator lands; later instructions are dropped.
    pub closed: bool,
    /// Loop headers stay unsealed until their back edge arrives and are
    /// annotated in dumps.
    pub is_loop: bool,
    pub loop_continue_target: Option<BlockId>,
    pub loop_break_target: Option<BlockId>,
}

/// The instruction and block arenas plus id allocation.
#[derive(Debug, Default, Clone, serde::Serialize, serde::Deserialize)]
pub struct Graph {
    instrs: Vec<Instr>,
    blocks: Vec<Block>,
    next_id: u32,
    /// Entry block of the top-level function.
    pub entry: BlockId,
}

impl Graph {
    pub fn new_block(&mut self) -> BlockId {
        let id = BlockId(self.blocks.len() as u32);
        self.blocks.push(Block {
            id,
            preds: SmallVec::new(),
            succs: SmallVec::new(),
            phis: Vec::new(),
            instrs: Vec::new(),
            closed: false,
            is_loop: false,
            loop_continue_target: None,
            loop_break_target: None,
        });
        id
    }

    /// Creates an instruction in `block`. The id is always consumed; if the
    /// block is already closed the instruction is created in the removed
    /// state and never attached, which is how dead tails behave.
    pub fn add_instr(
        &mut self,
        block: BlockId,
        kind: InstrKind,
        inputs: &[InstrId],
        ast: Option<NodeId>,
    ) -> InstrId {
        let id = self.alloc_id();
        let dropped = self.blocks[block.index()].closed;
        let terminator = kind.is_terminator();
        self.instrs.push(Instr {
            id,
            kind,
            inputs: SmallVec::from_slice(inputs),
            uses: Vec::new(),
            block,
            ast,
            slot: None,
            repr: Representation::ANY,
            pinned: false,
            removed: dropped,
        });
        if !dropped {
            for &input in inputs {
                self.instr_mut(input).uses.push(id);
            }
            let b = &mut self.blocks[block.index()];
            b.instrs.push(id);
            if terminator {
                b.closed = true;
            }
        }
        id
    }

    /// Creates a φ in `block`'s φ list. Inputs may be appended later while
    /// the block's predecessor set is still growing.
    pub fn add_phi(&mut self, block: BlockId, inputs: &[InstrId]) -> InstrId {
        let id = self.alloc_id();
        let dropped = self.blocks[block.index()].closed;
        self.instrs.push(Instr {
            id,
            kind: InstrKind::Phi,
            inputs: SmallVec::from_slice(inputs),
            uses: Vec::new(),
            block,
            ast: None,
            slot: None,
            repr: Representation::ANY,
            pinned: false,
            removed: dropped,
        });
        if !dropped {
            for &input in inputs {
                self.instr_mut(input).uses.push(id);
            }
            self.blocks[block.index()].phis.push(id);
        }
        id
    }

    /// Appends an incoming value to a φ (loop back edges).
    pub fn append_phi_input(&mut self, phi: InstrId, value: InstrId) {
        self.instr_mut(phi).inputs.push(value);
        self.instr_mut(value).uses.push(phi);
    }

    pub fn add_edge(&mut self, from: BlockId, to: BlockId) {
        debug_assert!(
            self.blocks[from.index()].succs.len() < 2,
            "a block has at most two successors"
        );
        self.blocks[from.index()].succs.push(to);
        self.blocks[to.index()].preds.push(from);
    }

    fn alloc_id(&mut self) -> InstrId {
        let id = InstrId(self.next_id);
        self.next_id += 2;
        id
    }

    #[must_use]
    pub fn instr(&self, id: InstrId) -> &Instr {
        &self.instrs[id.arena_index()]
    }

    pub fn instr_mut(&mut self, id: InstrId) -> &mut Instr {
        &mut self.instrs[id.arena_index()]
    }

    #[must_use]
    pub fn block(&self, id: BlockId) -> &Block {
        &self.blocks[id.index()]
    }

    pub fn block_mut(&mut self, id: BlockId) -> &mut Block {
        &mut self.blocks[id.index()]
    }

    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.blocks.iter()
    }

    pub fn instrs(&self) -> impl Iterator<Item = &Instr> {
        self.instrs.iter()
    }

    /// Swaps one argument of `user` and keeps both use lists consistent.
    pub fn replace_arg(&mut self, user: InstrId, old: InstrId, new: InstrId) {
        let mut swapped = 0usize;
        {
            let instr = self.instr_mut(user);
            for input in &mut instr.inputs {
                if *input == old {
                    *input = new;
                    swapped += 1;
                }
            }
        }
        if swapped == 0 {
            return;
        }
        self.instr_mut(old).uses.retain(|&u| u != user);
        for _ in 0..swapped {
            self.instr_mut(new).uses.push(user);
        }
    }

    /// Marks an instruction removed and detaches it from every argument's
    /// use list. The id stays allocated.
    pub fn remove(&mut self, id: InstrId) {
        let (inputs, block) = {
            let instr = self.instr_mut(id);
            if instr.removed {
                return;
            }
            instr.removed = true;
            (instr.inputs.clone(), instr.block)
        };
        for input in inputs {
            self.instr_mut(input).uses.retain(|&u| u != id);
        }
        let b = &mut self.blocks[block.index()];
        b.instrs.retain(|&i| i != id);
        b.phis.retain(|&i| i != id);
    }

    /// Pins an instruction to its block for later code-motion passes.
    pub fn pin(&mut self, id: InstrId) {
        self.instr_mut(id).pinned = true;
    }

    // ------------------------------------------------------------------
    // Post-construction passes
    // ------------------------------------------------------------------

    /// Removes φs whose inputs collapse to a single value, rewriting users
    /// to that value, until a fixed point. Runs after construction; the
    /// builder's read-site and loop-header φs are created eagerly and most
    /// of them die here, leaving their ids as dump gaps.
    pub fn prune_phis(&mut self) {
        loop {
            let mut changed = false;
            for bi in 0..self.blocks.len() {
                let phis = self.blocks[bi].phis.clone();
                for phi in phis {
                    if self.instr(phi).removed {
                        continue;
                    }
                    let mut distinct: SmallVec<[InstrId; 2]> = SmallVec::new();
                    for &input in &self.instr(phi).inputs {
                        if input != phi && !distinct.contains(&input) {
                            distinct.push(input);
                        }
                    }
                    if distinct.len() > 1 {
                        continue;
                    }
                    let replacement = distinct.first().copied();
                    if replacement.is_none() && !self.instr(phi).uses.is_empty() {
                        // A φ over nothing: the slot was never defined on
                        // any path. Keep it; it reads as nil downstream.
                        continue;
                    }
                    let users = self.instr(phi).uses.clone();
                    self.remove(phi);
                    if let Some(replacement) = replacement {
                        for user in users {
                            self.replace_arg(user, phi, replacement);
                        }
                    }
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }
    }

    /// Fixed-point representation inference. Every value starts at `ANY`
    /// and narrows; φs intersect their inputs.
    pub fn infer_representations(&mut self) {
        loop {
            let mut changed = false;
            for index in 0..self.instrs.len() {
                if self.instrs[index].removed {
                    continue;
                }
                let input_reprs: SmallVec<[Representation; 2]> = self.instrs[index]
                    .inputs
                    .iter()
                    .map(|input| self.instr(*input).repr)
                    .collect();
                let repr = self.instrs[index].calculate_representation(&input_reprs);
                if repr != self.instrs[index].repr {
                    self.instrs[index].repr = repr;
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }
    }

    // ------------------------------------------------------------------
    // Debug dump
    // ------------------------------------------------------------------

    /// Renders the textual dump the test suite compares byte-for-byte.
    #[must_use]
    pub fn dump(&self) -> String {
        let mut out = String::new();
        for (bi, block) in self.blocks.iter().enumerate() {
            let _ = write!(out, "# Block {bi}");
            if block.is_loop {
                out.push_str(" (loop)");
            }
            out.push('\n');

            for &phi in &block.phis {
                self.dump_instr(&mut out, phi);
            }
            for &instr in &block.instrs {
                self.dump_instr(&mut out, instr);
            }

            if !block.succs.is_empty() {
                out.push_str("# succ:");
                for succ in &block.succs {
                    let _ = write!(out, " {}", succ.index());
                }
                out.push('\n');
            }
            if bi + 1 != self.blocks.len() {
                out.push_str("--------\n");
            }
        }
        out
    }

    fn dump_instr(&self, out: &mut String, id: InstrId) {
        let instr = self.instr(id);
        if instr.removed {
            return;
        }
        let name: &'static str = (&instr.kind).into();
        let _ = write!(out, "{id} = {name}");
        match &instr.kind {
            InstrKind::Literal {
                text: Some(text), ..
            } => {
                let _ = write!(out, "[{text}]");
            }
            InstrKind::BinOp { .. } => out.push_str("[]"),
            _ => {}
        }
        if !instr.inputs.is_empty() {
            out.push('(');
            for (i, input) in instr.inputs.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                let _ = write!(out, "{input}");
            }
            out.push(')');
        }
        out.push('\n');
    }
}
