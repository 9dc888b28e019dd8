//! AST to SSA lowering.
//!
//! The builder keeps a per-block variable environment mapping stack slots
//! to their current defining value. Writes update the environment only;
//! reads that miss the current block resolve the value by walking the
//! predecessor chain and then materialize a single-input φ in the reading
//! block. Loop headers materialize one φ per stack slot when their pre-loop
//! predecessor attaches and receive the second input from the back edge.
//! Joins create a φ per slot whose values differ across the two tails.
//!
//! Most of those φs are trivial and die in [`Graph::prune_phis`]; they are
//! created anyway because instruction ids are assigned at creation and the
//! dump contract exposes the gaps.

use std::collections::VecDeque;

use ahash::AHashMap;
use smallvec::SmallVec;

use crate::{
    ast::{Ast, AstKind, BinOpKind, NodeId, UnOpKind},
    error::CompileError,
    intern::{LiteralKind, RootPool},
    scope::{FunctionScope, ScopeInfo, SlotRef},
};

use super::{Block, BlockId, ContextSlot, Graph, InstrId, InstrKind};

/// Lowers a resolved AST into an SSA graph. The returned graph still
/// carries its trivial φs; callers run [`Graph::prune_phis`] and
/// [`Graph::infer_representations`] afterwards.
pub fn build(
    ast: &Ast,
    source: &str,
    scopes: &ScopeInfo,
    pool: &mut RootPool,
) -> Result<Graph, CompileError> {
    let mut builder = HirBuilder {
        ast,
        source,
        scopes,
        pool,
        graph: Graph::default(),
        envs: Vec::new(),
        loops: Vec::new(),
        queue: VecDeque::new(),
        current: BlockId(0),
        fn_scope: FunctionScope::default(),
    };

    let entry = builder.new_block();
    builder.graph.entry = entry;
    builder.queue.push_back((ast.root(), entry));
    while let Some((fn_node, entry)) = builder.queue.pop_front() {
        builder.build_function(fn_node, entry)?;
    }
    Ok(builder.graph)
}

struct LoopCtx {
    header: BlockId,
    /// The block that takes the back edge; continues chain into it.
    repeat: BlockId,
    /// The loop's exit successor; breaks chain out of it.
    end: BlockId,
    continues: Vec<BlockId>,
    breaks: Vec<BlockId>,
}

struct HirBuilder<'a> {
    ast: &'a Ast,
    source: &'a str,
    scopes: &'a ScopeInfo,
    pool: &'a mut RootPool,
    graph: Graph,
    /// Per-block slot environment, parallel to the graph's block arena.
    envs: Vec<AHashMap<u16, InstrId>>,
    loops: Vec<LoopCtx>,
    /// Nested function bodies build after the enclosing function finishes.
    queue: VecDeque<(NodeId, BlockId)>,
    current: BlockId,
    fn_scope: FunctionScope,
}

impl HirBuilder<'_> {
    // ------------------------------------------------------------------
    // Blocks, environments, edges
    // ------------------------------------------------------------------

    fn new_block(&mut self) -> BlockId {
        let block = self.graph.new_block();
        self.envs.push(AHashMap::new());
        block
    }

    fn emit(&mut self, kind: InstrKind, inputs: &[InstrId], ast: Option<NodeId>) -> InstrId {
        self.graph.add_instr(self.current, kind, inputs, ast)
    }

    fn block(&self, id: BlockId) -> &Block {
        self.graph.block(id)
    }

    /// Emits a `Goto` from `from` to `to` and attaches the edge. A goto
    /// aimed out of an already-closed block is dropped, but its id is
    /// consumed, which the dump contract depends on.
    fn goto(&mut self, from: BlockId, to: BlockId) {
        let dropped = self.block(from).closed;
        self.graph.add_instr(from, InstrKind::Goto, &[], None);
        if dropped {
            return;
        }
        self.graph.add_edge(from, to);
        self.attach(to, from);
    }

    /// Predecessor bookkeeping after an edge lands.
    fn attach(&mut self, to: BlockId, from: BlockId) {
        let preds = self.block(to).preds.len();
        if self.block(to).is_loop {
            if preds == 1 {
                self.mark_loop(to, from);
            } else {
                self.close_loop(to, from);
            }
        } else if preds == 2 {
            self.merge_join(to);
        }
    }

    /// First predecessor of a loop header: materialize one φ per stack
    /// slot. Slots undefined before the loop contribute no input yet.
    fn mark_loop(&mut self, header: BlockId, pre: BlockId) {
        for slot in 0..self.fn_scope.stack_slots {
            let inputs: SmallVec<[InstrId; 1]> =
                self.resolve(pre, slot).into_iter().collect();
            let phi = self.graph.add_phi(header, &inputs);
            self.graph.instr_mut(phi).slot = Some(SlotRef::Stack(slot));
            self.envs[header.index()].insert(slot, phi);
        }
    }

    /// Back edge: every header φ receives its second input.
    fn close_loop(&mut self, header: BlockId, back: BlockId) {
        let phis = self.block(header).phis.clone();
        for (slot, phi) in (0..self.fn_scope.stack_slots).zip(phis) {
            if let Some(value) = self.resolve(back, slot) {
                self.graph.append_phi_input(phi, value);
            }
        }
    }

    /// Second predecessor of a join: a φ per slot whose resolved values
    /// differ across the two tails, inputs in predecessor order.
    fn merge_join(&mut self, to: BlockId) {
        let (left, right) = {
            let preds = &self.block(to).preds;
            (preds[0], preds[1])
        };
        for slot in 0..self.fn_scope.stack_slots {
            let lv = self.resolve(left, slot);
            let rv = self.resolve(right, slot);
            if lv == rv {
                continue;
            }
            let inputs: SmallVec<[InstrId; 2]> =
                lv.into_iter().chain(rv).collect();
            let phi = self.graph.add_phi(to, &inputs);
            self.graph.instr_mut(phi).slot = Some(SlotRef::Stack(slot));
            self.envs[to.index()].insert(slot, phi);
        }
    }

    /// Pure predecessor-chain walk; never creates instructions. Joins store
    /// merged definitions, so walking the first predecessor through a join
    /// is sound.
    fn resolve(&self, block: BlockId, slot: u16) -> Option<InstrId> {
        let mut b = block;
        loop {
            if let Some(&value) = self.envs[b.index()].get(&slot) {
                return Some(value);
            }
            b = *self.block(b).preds.first()?;
        }
    }

    fn read_slot(&mut self, slot: u16, node: NodeId) -> InstrId {
        if let Some(&value) = self.envs[self.current.index()].get(&slot) {
            return value;
        }
        match self.resolve(self.current, slot) {
            Some(value) => {
                let phi = self.graph.add_phi(self.current, &[value]);
                self.graph.instr_mut(phi).slot = Some(SlotRef::Stack(slot));
                self.envs[self.current.index()].insert(slot, phi);
                phi
            }
            None => {
                // Reading a slot no path defines yields nil.
                let nil = self.emit(InstrKind::Nil, &[], Some(node));
                self.envs[self.current.index()].insert(slot, nil);
                nil
            }
        }
    }

    fn write_slot(&mut self, slot: u16, value: InstrId) {
        self.envs[self.current.index()].insert(slot, value);
    }

    fn slot_of(&self, name_node: NodeId) -> Result<SlotRef, CompileError> {
        self.scopes.slot(name_node).ok_or(CompileError::UnresolvedSlot {
            offset: self.ast.node(name_node).offset,
        })
    }

    // ------------------------------------------------------------------
    // Functions
    // ------------------------------------------------------------------

    fn build_function(&mut self, fn_node: NodeId, entry: BlockId) -> Result<(), CompileError> {
        let AstKind::FunctionLiteral(parts) = &self.ast.node(fn_node).kind else {
            return Err(CompileError::invariant("function body is not a function literal"));
        };
        let params = parts.params.clone();

        self.current = entry;
        self.fn_scope = self.scopes.function(fn_node);
        self.emit(
            InstrKind::Entry {
                context_slots: self.fn_scope.context_slots,
            },
            &[],
            Some(fn_node),
        );

        for (index, &param) in params.iter().enumerate() {
            let (name_node, kind) = match &self.ast.node(param).kind {
                AstKind::VarArg => (self.ast.node(param).children[0], InstrKind::LoadVarArg),
                _ => (
                    param,
                    InstrKind::LoadArg {
                        index: index as u16,
                    },
                ),
            };
            let value = self.emit(kind, &[], Some(name_node));
            self.bind_name(name_node, value)?;
        }

        for i in 0..self.ast.node(fn_node).children.len() {
            let stmt = self.ast.node(fn_node).children[i];
            self.visit_statement(stmt)?;
        }

        // Falling off the end returns nil.
        if !self.block(self.current).closed {
            let nil = self.emit(InstrKind::Nil, &[], None);
            self.emit(InstrKind::Return, &[nil], None);
        }
        Ok(())
    }

    /// Writes a value to whatever a name resolved to.
    fn bind_name(&mut self, name_node: NodeId, value: InstrId) -> Result<(), CompileError> {
        match self.slot_of(name_node)? {
            SlotRef::Stack(slot) => self.write_slot(slot, value),
            SlotRef::Context { depth, index } => {
                self.emit(
                    InstrKind::StoreContext {
                        slot: ContextSlot::At { depth, index },
                    },
                    &[value],
                    Some(name_node),
                );
            }
            SlotRef::Global => {
                self.emit(
                    InstrKind::StoreContext {
                        slot: ContextSlot::Global,
                    },
                    &[value],
                    Some(name_node),
                );
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn visit_statement(&mut self, node: NodeId) -> Result<(), CompileError> {
        match &self.ast.node(node).kind {
            AstKind::Block => {
                for i in 0..self.ast.node(node).children.len() {
                    let child = self.ast.node(node).children[i];
                    self.visit_statement(child)?;
                }
            }
            AstKind::Nop => {
                self.emit(InstrKind::Nop, &[], Some(node));
            }
            AstKind::Return => {
                let value = self.visit_expr(self.ast.node(node).children[0])?;
                self.emit(InstrKind::Return, &[value], Some(node));
            }
            AstKind::Break => self.loop_exit(node, true)?,
            AstKind::Continue => self.loop_exit(node, false)?,
            AstKind::If => self.visit_if(node)?,
            AstKind::While => self.visit_while(node)?,
            _ => {
                self.visit_expr(node)?;
            }
        }
        Ok(())
    }

    fn loop_exit(&mut self, node: NodeId, is_break: bool) -> Result<(), CompileError> {
        if self.loops.is_empty() {
            return Err(CompileError::StrayLoopExit {
                offset: self.ast.node(node).offset,
            });
        }
        let target = self.new_block();
        let ctx = self.loops.last_mut().expect("loop stack checked above");
        if is_break {
            ctx.breaks.push(target);
        } else {
            ctx.continues.push(target);
        }
        let from = self.current;
        self.goto(from, target);
        Ok(())
    }

    fn visit_if(&mut self, node: NodeId) -> Result<(), CompileError> {
        let cond = self.visit_expr(self.ast.node(node).children[0])?;
        let (left, right) = self.branch(InstrKind::If, cond, node);

        self.current = left;
        self.visit_statement(self.ast.node(node).children[1])?;
        let left_end = self.current;

        self.current = right;
        if let Some(&else_node) = self.ast.node(node).children.get(2) {
            self.visit_statement(else_node)?;
        }
        let right_end = self.current;

        let join = self.new_block();
        self.goto(left_end, join);
        self.goto(right_end, join);
        self.current = join;
        Ok(())
    }

    /// Emits a branch in the current block and returns its two fresh
    /// successors.
    fn branch(&mut self, kind: InstrKind, cond: InstrId, node: NodeId) -> (BlockId, BlockId) {
        let from = self.current;
        let dropped = self.block(from).closed;
        self.graph.add_instr(from, kind, &[cond], Some(node));
        let left = self.new_block();
        let right = self.new_block();
        if !dropped {
            self.graph.add_edge(from, left);
            self.graph.add_edge(from, right);
        }
        (left, right)
    }

    fn visit_while(&mut self, node: NodeId) -> Result<(), CompileError> {
        let header = self.new_block();
        self.graph.block_mut(header).is_loop = true;
        let pre = self.current;
        self.goto(pre, header);

        // The header holds the slot φs and exactly one goto into the
        // condition block.
        let cond_block = self.new_block();
        self.goto(header, cond_block);
        self.current = cond_block;
        let cond = self.visit_expr(self.ast.node(node).children[0])?;

        let body = self.new_block();
        let repeat = self.new_block();
        let end = self.new_block();
        {
            let from = self.current;
            let dropped = self.block(from).closed;
            self.graph.add_instr(from, InstrKind::While, &[cond], Some(node));
            if !dropped {
                self.graph.add_edge(from, body);
                self.graph.add_edge(from, end);
            }
        }
        self.graph.block_mut(header).loop_continue_target = Some(repeat);
        self.graph.block_mut(header).loop_break_target = Some(end);

        self.loops.push(LoopCtx {
            header,
            repeat,
            end,
            continues: Vec::new(),
            breaks: Vec::new(),
        });
        self.current = body;
        self.visit_statement(self.ast.node(node).children[1])?;
        let ctx = self.loops.pop().expect("loop context pushed above");

        // Body tail chains through the continue blocks into the repeat
        // block, which takes the back edge.
        let mut tail = self.current;
        for target in ctx.continues {
            self.goto(tail, target);
            tail = target;
        }
        self.goto(tail, ctx.repeat);
        self.goto(ctx.repeat, ctx.header);

        // The exit chains through the break blocks into the post-loop
        // block.
        let mut exit = ctx.end;
        for target in ctx.breaks {
            self.goto(exit, target);
            exit = target;
        }
        let after = self.new_block();
        self.goto(exit, after);
        self.current = after;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    fn visit_expr(&mut self, node: NodeId) -> Result<InstrId, CompileError> {
        match &self.ast.node(node).kind {
            AstKind::Name => match self.slot_of(node)? {
                SlotRef::Stack(slot) => Ok(self.read_slot(slot, node)),
                SlotRef::Context { depth, index } => Ok(self.emit(
                    InstrKind::LoadContext {
                        slot: ContextSlot::At { depth, index },
                    },
                    &[],
                    Some(node),
                )),
                SlotRef::Global => Ok(self.emit(
                    InstrKind::LoadContext {
                        slot: ContextSlot::Global,
                    },
                    &[],
                    Some(node),
                )),
            },
            AstKind::Nil => Ok(self.emit(InstrKind::Nil, &[], Some(node))),
            AstKind::True => Ok(self.literal(node, LiteralKind::True)),
            AstKind::False => Ok(self.literal(node, LiteralKind::False)),
            AstKind::Number => Ok(self.literal(node, LiteralKind::Number)),
            AstKind::String => Ok(self.literal(node, LiteralKind::String)),
            AstKind::Assign => self.visit_assign(node),
            AstKind::BinOp(op) if op.is_logical() => self.visit_logical(node, *op),
            AstKind::BinOp(op) => {
                let op = *op;
                let lhs = self.visit_expr(self.ast.node(node).children[0])?;
                let rhs = self.visit_expr(self.ast.node(node).children[1])?;
                Ok(self.emit(InstrKind::BinOp { op }, &[lhs, rhs], Some(node)))
            }
            AstKind::UnOp(op) => self.visit_unop(node, *op),
            AstKind::Member { .. } => {
                let (recv, key) = self.member_parts(node)?;
                Ok(self.emit(InstrKind::LoadProperty, &[recv, key], Some(node)))
            }
            AstKind::ObjectLiteral(_) => self.visit_object_literal(node),
            AstKind::ArrayLiteral => self.visit_array_literal(node),
            AstKind::FunctionLiteral(_) => self.visit_function_literal(node),
            AstKind::Call { method } => self.visit_call(node, *method),
            AstKind::Typeof => self.visit_prefix(node, InstrKind::Typeof),
            AstKind::Sizeof => self.visit_prefix(node, InstrKind::Sizeof),
            AstKind::Keysof => self.visit_prefix(node, InstrKind::Keysof),
            AstKind::Clone => self.visit_prefix(node, InstrKind::Clone),
            AstKind::Delete => {
                let target = self.ast.node(node).children[0];
                if !matches!(self.ast.node(target).kind, AstKind::Member { .. }) {
                    return Err(CompileError::invariant(
                        "delete target must be a member expression",
                    ));
                }
                let (recv, key) = self.member_parts(target)?;
                Ok(self.emit(InstrKind::DeleteProperty, &[recv, key], Some(node)))
            }
            AstKind::VarArg => self.visit_expr(self.ast.node(node).children[0]),
            _ => Err(CompileError::invariant(
                "statement node reached expression lowering",
            )),
        }
    }

    fn visit_prefix(&mut self, node: NodeId, kind: InstrKind) -> Result<InstrId, CompileError> {
        let value = self.visit_expr(self.ast.node(node).children[0])?;
        Ok(self.emit(kind, &[value], Some(node)))
    }

    /// A literal becomes a `Literal` value referencing its root-scope slot.
    fn literal(&mut self, node: NodeId, kind: LiteralKind) -> InstrId {
        let text = self.ast.node(node).lexeme(self.source);
        let slot = self.pool.intern(kind, text);
        let text: Box<str> = Box::from(text);
        self.emit(
            InstrKind::Literal {
                kind,
                slot,
                text: Some(text),
            },
            &[],
            Some(node),
        )
    }

    /// A lexeme-less number literal (array indices, inc/dec constants share
    /// the visible form instead).
    fn synth_number(&mut self, node: NodeId, value: usize) -> InstrId {
        let text = value.to_string();
        let slot = self.pool.intern(LiteralKind::Number, &text);
        self.emit(
            InstrKind::Literal {
                kind: LiteralKind::Number,
                slot,
                text: None,
            },
            &[],
            Some(node),
        )
    }

    /// A synthesized number literal that still shows its text in dumps
    /// (the `0`/`1` constants of unary plus/minus and inc/dec).
    fn visible_number(&mut self, node: NodeId, text: &str) -> InstrId {
        let slot = self.pool.intern(LiteralKind::Number, text);
        self.emit(
            InstrKind::Literal {
                kind: LiteralKind::Number,
                slot,
                text: Some(Box::from(text)),
            },
            &[],
            Some(node),
        )
    }

    fn visit_assign(&mut self, node: NodeId) -> Result<InstrId, CompileError> {
        let target = self.ast.node(node).children[0];
        let value = self.visit_expr(self.ast.node(node).children[1])?;
        match &self.ast.node(target).kind {
            AstKind::Name => {
                self.bind_name(target, value)?;
            }
            AstKind::Member { .. } => {
                let (recv, key) = self.member_parts(target)?;
                self.emit(InstrKind::StoreProperty, &[recv, key, value], Some(node));
            }
            _ => {
                return Err(CompileError::InvalidAssignTarget {
                    offset: self.ast.node(target).offset,
                });
            }
        }
        // The assignment's value is its right-hand side, so chains work.
        Ok(value)
    }

    /// Receiver and key values of a member access, in that order. Dotted
    /// keys lower to string literals.
    fn member_parts(&mut self, node: NodeId) -> Result<(InstrId, InstrId), CompileError> {
        let recv_node = self.ast.node(node).children[0];
        let key_node = self.ast.node(node).children[1];
        let recv = self.visit_expr(recv_node)?;
        let key = match &self.ast.node(key_node).kind {
            AstKind::Property => self.literal(key_node, LiteralKind::String),
            _ => self.visit_expr(key_node)?,
        };
        Ok((recv, key))
    }

    fn visit_object_literal(&mut self, node: NodeId) -> Result<InstrId, CompileError> {
        let AstKind::ObjectLiteral(parts) = &self.ast.node(node).kind else {
            return Err(CompileError::invariant("object literal node expected"));
        };
        let keys = parts.keys.clone();
        let values = parts.values.clone();

        let size = (keys.len() * 2).next_power_of_two() as u16;
        let obj = self.emit(InstrKind::AllocateObject { size }, &[], Some(node));
        for (key_node, value_node) in keys.into_iter().zip(values) {
            let value = self.visit_expr(value_node)?;
            let key = self.literal(key_node, LiteralKind::String);
            self.emit(InstrKind::StoreProperty, &[obj, key, value], Some(node));
        }
        Ok(obj)
    }

    fn visit_array_literal(&mut self, node: NodeId) -> Result<InstrId, CompileError> {
        let elements = self.ast.node(node).children.clone();
        let size = (elements.len() * 2).next_power_of_two() as u16;
        let arr = self.emit(InstrKind::AllocateArray { size }, &[], Some(node));
        for (index, element) in elements.into_iter().enumerate() {
            let key = self.synth_number(node, index);
            let value = self.visit_expr(element)?;
            self.emit(InstrKind::StoreProperty, &[arr, key, value], Some(node));
        }
        Ok(arr)
    }

    /// Short-circuit lowering. The branch gets a block of its own; the join
    /// φ's inputs are `[rhs, lhs]` for `&&` and `[lhs, rhs]` for `||`,
    /// matching predecessor order.
    fn visit_logical(&mut self, node: NodeId, op: BinOpKind) -> Result<InstrId, CompileError> {
        let lhs = self.visit_expr(self.ast.node(node).children[0])?;
        let from = self.current;
        let branch_block = self.new_block();
        self.goto(from, branch_block);
        self.current = branch_block;

        let (left, right) = self.branch(InstrKind::If, lhs, node);

        let (left_end, right_end, left_val, right_val);
        if op == BinOpKind::LAnd {
            self.current = left;
            let rhs = self.visit_expr(self.ast.node(node).children[1])?;
            left_end = self.current;
            right_end = right;
            left_val = rhs;
            right_val = lhs;
        } else {
            self.current = right;
            let rhs = self.visit_expr(self.ast.node(node).children[1])?;
            left_end = left;
            right_end = self.current;
            left_val = lhs;
            right_val = rhs;
        }

        let join = self.new_block();
        self.goto(left_end, join);
        self.goto(right_end, join);
        let phi = self.graph.add_phi(join, &[left_val, right_val]);
        self.current = join;
        Ok(phi)
    }

    fn visit_unop(&mut self, node: NodeId, op: UnOpKind) -> Result<InstrId, CompileError> {
        match op {
            UnOpKind::Not => {
                let value = self.visit_expr(self.ast.node(node).children[0])?;
                Ok(self.emit(InstrKind::Not, &[value], Some(node)))
            }
            // Unary plus coerces through addition, so it keeps its BinOp
            // even against zero.
            UnOpKind::Plus | UnOpKind::Minus => {
                let value = self.visit_expr(self.ast.node(node).children[0])?;
                let zero = self.visible_number(node, "0");
                let op = if op == UnOpKind::Plus {
                    BinOpKind::Add
                } else {
                    BinOpKind::Sub
                };
                Ok(self.emit(InstrKind::BinOp { op }, &[zero, value], Some(node)))
            }
            UnOpKind::PreInc | UnOpKind::PreDec | UnOpKind::PostInc | UnOpKind::PostDec => {
                self.visit_incdec(node, op)
            }
        }
    }

    fn visit_incdec(&mut self, node: NodeId, op: UnOpKind) -> Result<InstrId, CompileError> {
        let target = self.ast.node(node).children[0];
        let is_member = matches!(self.ast.node(target).kind, AstKind::Member { .. });

        let (old, member) = if is_member {
            let (recv, key) = self.member_parts(target)?;
            let old = self.emit(InstrKind::LoadProperty, &[recv, key], Some(target));
            (old, Some((recv, key)))
        } else {
            (self.visit_expr(target)?, None)
        };

        let one = self.visible_number(node, "1");
        let bin_op = if matches!(op, UnOpKind::PreInc | UnOpKind::PostInc) {
            BinOpKind::Add
        } else {
            BinOpKind::Sub
        };
        let new = self.emit(InstrKind::BinOp { op: bin_op }, &[one, old], Some(node));

        match member {
            Some((recv, key)) => {
                self.emit(InstrKind::StoreProperty, &[recv, key, new], Some(node));
            }
            None => {
                if !matches!(self.ast.node(target).kind, AstKind::Name) {
                    return Err(CompileError::InvalidAssignTarget {
                        offset: self.ast.node(target).offset,
                    });
                }
                self.bind_name(target, new)?;
            }
        }

        // Postfix yields the old value, prefix the new one.
        Ok(if matches!(op, UnOpKind::PostInc | UnOpKind::PostDec) {
            old
        } else {
            new
        })
    }

    fn visit_function_literal(&mut self, node: NodeId) -> Result<InstrId, CompileError> {
        let AstKind::FunctionLiteral(parts) = &self.ast.node(node).kind else {
            return Err(CompileError::invariant("function literal node expected"));
        };
        let name = parts.name;
        let arg_count = parts.params.len() as u16;

        let entry = self.new_block();
        let value = self.emit(
            InstrKind::Function {
                body: entry,
                arg_count,
            },
            &[],
            Some(node),
        );
        self.queue.push_back((node, entry));

        // A named declaration also assigns the function to its name.
        if let Some(name) = name {
            self.bind_name(name, value)?;
        }
        Ok(value)
    }

    fn visit_call(&mut self, node: NodeId, method: bool) -> Result<InstrId, CompileError> {
        let children = self.ast.node(node).children.clone();
        let callee = children[0];
        let args = &children[1..];

        // Runtime intrinsics keep their own instructions.
        if !method && matches!(self.ast.node(callee).kind, AstKind::Name) {
            match self.ast.node(callee).lexeme(self.source) {
                "__$gc" => return Ok(self.emit(InstrKind::CollectGarbage, &[], Some(node))),
                "__$trace" => return Ok(self.emit(InstrKind::GetStackTrace, &[], Some(node))),
                _ => {}
            }
        }

        let mut inputs: SmallVec<[InstrId; 4]> = SmallVec::new();
        if method {
            // recv:name(args) passes the receiver as the first argument.
            let member = self.ast.node(callee).children.clone();
            let recv = self.visit_expr(member[0])?;
            let mut arg_values: SmallVec<[InstrId; 4]> = SmallVec::new();
            for &arg in args {
                arg_values.push(self.visit_expr(arg)?);
            }
            let key = self.literal(member[1], LiteralKind::String);
            let fun = self.emit(InstrKind::LoadProperty, &[recv, key], Some(callee));
            inputs.push(fun);
            inputs.push(recv);
            inputs.extend(arg_values);
        } else {
            let mut arg_values: SmallVec<[InstrId; 4]> = SmallVec::new();
            for &arg in args {
                arg_values.push(self.visit_expr(arg)?);
            }
            let fun = self.visit_expr(callee)?;
            inputs.push(fun);
            inputs.extend(arg_values);
        }
        Ok(self.emit(InstrKind::Call, &inputs, Some(node)))
    }
}
