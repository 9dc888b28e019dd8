//! Call argument expansion for the instruction selector.
//!
//! During SSA construction a `Call` carries its callee and arguments as
//! plain inputs. Before instruction selection the argument transfer has to
//! become explicit stack traffic: an `AlignStack` followed by one
//! `StoreArg`/`StoreVarArg` per argument, pushed right to left, after which
//! the `Call` keeps only its callee input. The dump-facing pipeline does not
//! run this pass; the code generator invokes it once per graph.

use crate::ast::{Ast, AstKind};

use super::{Graph, InstrId, InstrKind};

/// Rewrites every `Call`'s argument transfer in place.
pub fn expand_call_args(graph: &mut Graph, ast: &Ast) {
    let block_count = graph.blocks().count();
    for bi in 0..block_count {
        let block_id = graph.block(super::BlockId(bi as u32)).id;
        let old_list = graph.block(block_id).instrs.clone();
        let mut new_list = Vec::with_capacity(old_list.len());

        for id in old_list {
            if !is_expandable_call(graph, id) {
                new_list.push(id);
                continue;
            }

            let inputs = graph.instr(id).inputs.clone();
            let args = &inputs[1..];
            let method = call_is_method(graph, ast, id);

            let align = graph.add_instr(block_id, InstrKind::AlignStack, &[], None);
            new_list.push(align);

            for (pos, &arg) in args.iter().enumerate().rev() {
                let kind = if arg_is_vararg(graph, ast, id, method, pos) {
                    InstrKind::StoreVarArg
                } else {
                    InstrKind::StoreArg { index: pos as u16 }
                };
                let store = graph.add_instr(block_id, kind, &[arg], None);
                new_list.push(store);
            }

            // The call keeps its callee; argument uses move to the stores.
            for &arg in args {
                let uses = &mut graph.instr_mut(arg).uses;
                if let Some(at) = uses.iter().position(|&u| u == id) {
                    uses.remove(at);
                }
            }
            let callee = inputs[0];
            let instr = graph.instr_mut(id);
            instr.inputs.clear();
            instr.inputs.push(callee);
            new_list.push(id);
        }

        graph.block_mut(block_id).instrs = new_list;
    }
}

fn is_expandable_call(graph: &Graph, id: InstrId) -> bool {
    let instr = graph.instr(id);
    !instr.removed && matches!(instr.kind, InstrKind::Call) && instr.inputs.len() > 1
}

fn call_is_method(graph: &Graph, ast: &Ast, id: InstrId) -> bool {
    graph
        .instr(id)
        .ast
        .is_some_and(|node| matches!(ast.node(node).kind, AstKind::Call { method: true }))
}

/// `pos` indexes the call's argument inputs; for a method call position
/// zero is the receiver, which is never a spread.
fn arg_is_vararg(graph: &Graph, ast: &Ast, id: InstrId, method: bool, pos: usize) -> bool {
    let Some(call_node) = graph.instr(id).ast else {
        return false;
    };
    let Some(ast_index) = (if method { pos.checked_sub(1) } else { Some(pos) }) else {
        return false;
    };
    ast.node(call_node)
        .children
        .get(1 + ast_index)
        .is_some_and(|&arg| matches!(ast.node(arg).kind, AstKind::VarArg))
}
