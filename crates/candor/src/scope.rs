//! Name resolution: every variable gets an abstract storage slot.
//!
//! Candor has no declarations. A name belongs to the innermost enclosing
//! function that assigns it; names nobody assigns are locals of the function
//! that reads them (and read as nil). A name whose home function differs
//! from the function using it is *captured*: it is promoted out of SSA into
//! a context slot addressed by `{depth, index}`, and every access goes
//! through the context, in the home function too. The special name `global`
//! always resolves to the root context object.
//!
//! Resolution runs in passes: collect per-function name events, compute
//! captured sets, allocate slot indices in first-appearance order, then
//! resolve every event. First-appearance order matters because stack slot
//! indices are observable downstream (loop headers materialize one φ per
//! stack slot, in slot order).

use ahash::{AHashMap, AHashSet};

use crate::ast::{Ast, AstKind, NodeId, UnOpKind};

/// Where a resolved name lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SlotRef {
    /// SSA-tracked local slot of the owning function.
    Stack(u16),
    /// Context slot: `depth` hops up the lexical chain, then `index`.
    Context { depth: u16, index: u16 },
    /// The root context object (`global`).
    Global,
}

/// Per-function slot counts reported to the HIR builder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FunctionScope {
    /// Number of SSA stack slots.
    pub stack_slots: u16,
    /// Number of context slots allocated for captured variables.
    pub context_slots: u16,
    /// Declared parameter count.
    pub arg_count: u16,
}

/// Output of resolution: slot assignments keyed by name node, slot counts
/// keyed by function literal node.
#[derive(Debug, Default)]
pub struct ScopeInfo {
    functions: AHashMap<NodeId, FunctionScope>,
    names: AHashMap<NodeId, SlotRef>,
}

impl ScopeInfo {
    /// Slot counts for a function literal node.
    #[must_use]
    pub fn function(&self, fn_node: NodeId) -> FunctionScope {
        self.functions.get(&fn_node).copied().unwrap_or_default()
    }

    /// The slot a name node resolved to.
    #[must_use]
    pub fn slot(&self, name_node: NodeId) -> Option<SlotRef> {
        self.names.get(&name_node).copied()
    }
}

struct Event<'src> {
    node: NodeId,
    name: &'src str,
    assign: bool,
}

struct FnCtx<'src> {
    node: NodeId,
    parent: Option<usize>,
    depth: u16,
    arg_count: u16,
    events: Vec<Event<'src>>,
    assigned: AHashSet<&'src str>,
}

/// Resolves every name in the tree. Infallible: unknown names become
/// locals that read as nil.
#[must_use]
pub fn resolve(ast: &Ast, source: &str) -> ScopeInfo {
    let mut fns: Vec<FnCtx<'_>> = Vec::new();
    enter_function(ast, source, ast.root(), None, &mut fns);

    // Which names each function must expose through its context.
    let mut captured: Vec<AHashSet<&str>> = fns.iter().map(|_| AHashSet::new()).collect();
    for fi in 0..fns.len() {
        for ei in 0..fns[fi].events.len() {
            let name = fns[fi].events[ei].name;
            if name == "global" {
                continue;
            }
            if let Some(home) = find_home(&fns, fi, name) {
                if home != fi {
                    captured[home].insert(name);
                }
            }
        }
    }

    // Slot indices, in first-appearance order per function.
    let mut stack_index: Vec<AHashMap<&str, u16>> = fns.iter().map(|_| AHashMap::new()).collect();
    let mut context_index: Vec<AHashMap<&str, u16>> = fns.iter().map(|_| AHashMap::new()).collect();
    for fi in 0..fns.len() {
        for ei in 0..fns[fi].events.len() {
            let name = fns[fi].events[ei].name;
            if name == "global" {
                continue;
            }
            let home = find_home(&fns, fi, name).unwrap_or(fi);
            if home != fi {
                continue;
            }
            if captured[fi].contains(name) {
                let next = context_index[fi].len() as u16;
                context_index[fi].entry(name).or_insert(next);
            } else {
                let next = stack_index[fi].len() as u16;
                stack_index[fi].entry(name).or_insert(next);
            }
        }
    }

    let mut info = ScopeInfo::default();
    for fi in 0..fns.len() {
        for ei in 0..fns[fi].events.len() {
            let event = &fns[fi].events[ei];
            let slot = if event.name == "global" {
                SlotRef::Global
            } else {
                let home = find_home(&fns, fi, event.name).unwrap_or(fi);
                if home == fi {
                    match stack_index[fi].get(event.name) {
                        Some(&index) => SlotRef::Stack(index),
                        None => SlotRef::Context {
                            depth: 0,
                            index: context_index[fi][event.name],
                        },
                    }
                } else {
                    SlotRef::Context {
                        depth: fns[fi].depth - fns[home].depth,
                        index: context_index[home][event.name],
                    }
                }
            };
            info.names.insert(event.node, slot);
        }
        info.functions.insert(
            fns[fi].node,
            FunctionScope {
                stack_slots: stack_index[fi].len() as u16,
                context_slots: context_index[fi].len() as u16,
                arg_count: fns[fi].arg_count,
            },
        );
    }
    info
}

fn find_home(fns: &[FnCtx<'_>], from: usize, name: &str) -> Option<usize> {
    let mut cursor = Some(from);
    while let Some(fi) = cursor {
        if fns[fi].assigned.contains(name) {
            return Some(fi);
        }
        cursor = fns[fi].parent;
    }
    None
}

fn enter_function<'src>(
    ast: &Ast,
    source: &'src str,
    node: NodeId,
    parent: Option<usize>,
    fns: &mut Vec<FnCtx<'src>>,
) {
    let AstKind::FunctionLiteral(parts) = &ast.node(node).kind else {
        return;
    };

    let depth = parent.map_or(0, |p| fns[p].depth + 1);
    let fi = fns.len();
    fns.push(FnCtx {
        node,
        parent,
        depth,
        arg_count: parts.params.len() as u16,
        events: Vec::new(),
        assigned: AHashSet::new(),
    });

    // Parameters are assignments performed by the caller.
    for &param in &parts.params {
        let name_node = match &ast.node(param).kind {
            AstKind::VarArg => ast.node(param).children[0],
            _ => param,
        };
        push_event(ast, source, fns, fi, name_node, true);
    }

    for i in 0..ast.node(node).children.len() {
        let child = ast.node(node).children[i];
        walk(ast, source, child, fns, fi);
    }
}

fn walk<'src>(ast: &Ast, source: &'src str, node: NodeId, fns: &mut Vec<FnCtx<'src>>, cur: usize) {
    match &ast.node(node).kind {
        AstKind::Name => push_event(ast, source, fns, cur, node, false),
        AstKind::Assign => {
            let target = ast.node(node).children[0];
            if matches!(ast.node(target).kind, AstKind::Name) {
                push_event(ast, source, fns, cur, target, true);
            } else {
                walk(ast, source, target, fns, cur);
            }
            let value = ast.node(node).children[1];
            walk(ast, source, value, fns, cur);
        }
        AstKind::UnOp(
            UnOpKind::PreInc | UnOpKind::PreDec | UnOpKind::PostInc | UnOpKind::PostDec,
        ) => {
            let target = ast.node(node).children[0];
            if matches!(ast.node(target).kind, AstKind::Name) {
                // Increment both reads and writes; one assign event covers
                // discovery and home determination.
                push_event(ast, source, fns, cur, target, true);
            } else {
                walk(ast, source, target, fns, cur);
            }
        }
        AstKind::FunctionLiteral(parts) => {
            if let Some(name) = parts.name {
                if matches!(ast.node(name).kind, AstKind::Name) {
                    push_event(ast, source, fns, cur, name, true);
                }
            }
            enter_function(ast, source, node, Some(cur), fns);
        }
        AstKind::ObjectLiteral(parts) => {
            // Keys are property nodes, not variable references.
            for i in 0..parts.values.len() {
                walk(ast, source, parts.values[i], fns, cur);
            }
        }
        _ => {
            for i in 0..ast.node(node).children.len() {
                let child = ast.node(node).children[i];
                walk(ast, source, child, fns, cur);
            }
        }
    }
}

fn push_event<'src>(
    ast: &Ast,
    source: &'src str,
    fns: &mut Vec<FnCtx<'src>>,
    fi: usize,
    name_node: NodeId,
    assign: bool,
) {
    let name = ast.node(name_node).lexeme(source);
    if assign && name != "global" {
        fns[fi].assigned.insert(name);
    }
    fns[fi].events.push(Event {
        node: name_node,
        name,
        assign,
    });
}
