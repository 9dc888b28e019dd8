//! Structural SSA invariants checked over the graphs of a program corpus:
//! single definitions dominating every use, φ/predecessor correspondence,
//! terminator discipline, and the absence of trivial φs. Also covers
//! representation inference results and builder-level compile errors.

use std::collections::{HashMap, HashSet};

use candor::{
    CompileError, Error, Representation, compile,
    hir::{Graph, InstrKind},
};

const CORPUS: &[&str] = &[
    "a = 1\nb = 1\nreturn a",
    "return { a: 1 }",
    "return ['a', 'b', 'c']",
    "a = {}\na.b = 1\ndelete a.b\nreturn a.b",
    "a = global\nreturn a:b(1,2,3)",
    "i = 0\nreturn !i",
    "i = 1\nreturn +i",
    "i = 0\nreturn ++i",
    "i = 0\nreturn i++",
    "i = 0\nreturn i && 1",
    "i = 0\nreturn i || 1",
    "if (a) { a = 2 }\nreturn a",
    "if (a) { a = 2 } else { a = 3 }\nreturn a",
    "a = 1\nif (a) {\n  a = 2\n} else {\n  if (a) {\n    if (a) {\n      a = 3\n    }\n  } else {\n    a = 4\n  }\n}\nreturn a",
    "a = 0\nwhile (true) { b = a\na = 2 }\nreturn a",
    "a = 1\nwhile(nil) {\n  a = 2\n  if (true) { continue }\n  a = 3\n}\nreturn a",
    "a = 1\nwhile (true) { break }\nreturn a",
    "a = 0\nwhile (a < 10) { a = a + 1\nif (a == 5) { break } }\nreturn a",
    "a = 0\nb = 0\nwhile (a < 3) { a = a + 1\nwhile (b < 3) { b = b + 1 } }\nreturn b",
    "f(a, b) { return a + b }\nreturn f(1, 2)",
    "a = 1\nf() { return a }\nreturn f()",
    "x = 1\nreturn x == 1 && x < 2 || x >= 3",
];

#[test]
fn corpus_graphs_uphold_ssa_invariants() {
    for source in CORPUS {
        let compilation =
            compile(source).unwrap_or_else(|e| panic!("compile failed for {source:?}: {e}"));
        verify(&compilation.graph, source);
    }
}

fn verify(graph: &Graph, source: &str) {
    let block_count = graph.blocks().count();

    // Entry blocks are the ones opened by an Entry instruction (one per
    // function literal).
    let entries: HashSet<usize> = graph
        .instrs()
        .filter(|i| !i.removed && matches!(i.kind, InstrKind::Entry { .. }))
        .map(|i| i.block.index())
        .collect();
    assert!(!entries.is_empty(), "{source:?}: no entry block");

    let dominators = compute_dominators(graph, block_count, &entries);
    let reachable = compute_reachable(graph, block_count, &entries);

    // Positions of attached values inside their block: φs first.
    let mut position: HashMap<u32, (usize, usize)> = HashMap::new();
    for block in graph.blocks() {
        for (at, &id) in block.phis.iter().chain(&block.instrs).enumerate() {
            position.insert(id.value(), (block.id.index(), at));
        }
    }

    for block in graph.blocks() {
        let bi = block.id.index();
        if !reachable[bi] {
            continue;
        }

        // Property: every non-entry block has at least one predecessor and
        // ends in exactly one terminator.
        if !entries.contains(&bi) {
            assert!(
                !block.preds.is_empty(),
                "{source:?}: block {bi} is unreachable but not an entry"
            );
        }
        let terminators: Vec<usize> = block
            .instrs
            .iter()
            .enumerate()
            .filter(|&(_, &id)| graph.instr(id).kind.is_terminator())
            .map(|(at, _)| at)
            .collect();
        assert_eq!(
            terminators.len(),
            1,
            "{source:?}: block {bi} should have exactly one terminator"
        );
        assert_eq!(
            terminators[0],
            block.instrs.len() - 1,
            "{source:?}: block {bi}'s terminator is not at the tail"
        );
        assert!(block.succs.len() <= 2);

        // Property: φ inputs correspond one-to-one with predecessors, in
        // order, and each input is available on its edge.
        for &phi in &block.phis {
            let instr = graph.instr(phi);
            assert_eq!(
                instr.inputs.len(),
                block.preds.len(),
                "{source:?}: φ {phi} input count mismatches predecessors"
            );
            let distinct: HashSet<u32> = instr.inputs.iter().map(|i| i.value()).collect();
            assert!(
                distinct.len() > 1,
                "{source:?}: φ {phi} survived with identical inputs"
            );
            for (edge, &input) in instr.inputs.iter().enumerate() {
                let def_block = graph.instr(input).block.index();
                let pred = block.preds[edge].index();
                assert!(
                    def_block == pred || dominators[pred].contains(&def_block),
                    "{source:?}: φ {phi} input {input} not available from predecessor {pred}"
                );
            }
        }

        // Property: uses are dominated by definitions.
        for (at, &id) in block.instrs.iter().enumerate() {
            let instr = graph.instr(id);
            assert!(!instr.removed, "{source:?}: removed value still attached");
            for &input in &instr.inputs {
                let input_instr = graph.instr(input);
                assert!(
                    !input_instr.removed,
                    "{source:?}: {id} consumes removed value {input}"
                );
                assert!(
                    input_instr.uses.contains(&id),
                    "{source:?}: {input} missing {id} in its use list"
                );
                let (def_block, def_at) = position[&input.value()];
                if def_block == bi {
                    let in_phis = graph.block(block.id).phis.contains(&input);
                    assert!(
                        in_phis || def_at < at + block.phis.len(),
                        "{source:?}: {id} uses {input} before its definition"
                    );
                } else {
                    assert!(
                        dominators[bi].contains(&def_block),
                        "{source:?}: {id} uses {input} from a non-dominating block"
                    );
                }
            }
        }
    }
}

fn compute_reachable(graph: &Graph, block_count: usize, entries: &HashSet<usize>) -> Vec<bool> {
    let mut reachable = vec![false; block_count];
    let mut worklist: Vec<usize> = entries.iter().copied().collect();
    while let Some(b) = worklist.pop() {
        if std::mem::replace(&mut reachable[b], true) {
            continue;
        }
        for succ in graph.blocks().nth(b).into_iter().flat_map(|bl| &bl.succs) {
            worklist.push(succ.index());
        }
    }
    reachable
}

/// Iterative dominator sets; entry blocks dominate themselves only.
fn compute_dominators(
    graph: &Graph,
    block_count: usize,
    entries: &HashSet<usize>,
) -> Vec<HashSet<usize>> {
    let all: HashSet<usize> = (0..block_count).collect();
    let mut dom: Vec<HashSet<usize>> = (0..block_count)
        .map(|b| {
            if entries.contains(&b) {
                HashSet::from([b])
            } else {
                all.clone()
            }
        })
        .collect();

    let mut changed = true;
    while changed {
        changed = false;
        for block in graph.blocks() {
            let bi = block.id.index();
            if entries.contains(&bi) || block.preds.is_empty() {
                continue;
            }
            let mut next = dom[block.preds[0].index()].clone();
            for pred in &block.preds[1..] {
                next.retain(|d| dom[pred.index()].contains(d));
            }
            next.insert(bi);
            if next != dom[bi] {
                dom[bi] = next;
                changed = true;
            }
        }
    }
    dom
}

// ----------------------------------------------------------------------
// Representation inference
// ----------------------------------------------------------------------

fn repr_of_return_value(source: &str) -> Representation {
    let compilation = compile(source).expect("compile");
    let ret = compilation
        .graph
        .instrs()
        .find(|i| !i.removed && matches!(i.kind, InstrKind::Return))
        .expect("a return instruction");
    compilation.graph.instr(ret.inputs[0]).repr
}

#[test]
fn arithmetic_produces_numbers() {
    assert_eq!(repr_of_return_value("return 1 + 2"), Representation::NUMBER);
}

#[test]
fn comparisons_produce_booleans() {
    assert_eq!(
        repr_of_return_value("a = 1\nreturn a < 2"),
        Representation::BOOLEAN
    );
}

#[test]
fn bitwise_operators_produce_smis() {
    assert_eq!(repr_of_return_value("return 1 & 3"), Representation::SMI);
}

#[test]
fn small_integer_literals_are_smis() {
    assert_eq!(repr_of_return_value("return 7"), Representation::SMI);
}

#[test]
fn fractional_literals_are_heap_numbers() {
    assert_eq!(
        repr_of_return_value("return 1.5"),
        Representation::HEAP_NUMBER
    );
}

#[test]
fn allocators_produce_their_shapes() {
    assert_eq!(
        repr_of_return_value("return { a: 1 }"),
        Representation::OBJECT
    );
    assert_eq!(repr_of_return_value("return [1]"), Representation::ARRAY);
}

#[test]
fn prefix_operators_have_fixed_representations() {
    assert_eq!(
        repr_of_return_value("a = 1\nreturn typeof a"),
        Representation::STRING
    );
    assert_eq!(
        repr_of_return_value("a = 1\nreturn sizeof a"),
        Representation::NUMBER
    );
    assert_eq!(
        repr_of_return_value("a = [1]\nreturn keysof a"),
        Representation::ARRAY
    );
    assert_eq!(
        repr_of_return_value("a = { b: 1 }\nreturn clone a"),
        Representation::OBJECT
    );
}

#[test]
fn phis_intersect_their_inputs() {
    // Both branches produce small integers, so the join does too.
    assert_eq!(
        repr_of_return_value("if (c) { a = 1 } else { a = 2 }\nreturn a"),
        Representation::SMI
    );
    // A loop-carried value narrows to what its inputs share: the small
    // integer seed intersected with the arithmetic update.
    assert_eq!(
        repr_of_return_value("a = 0\nwhile (a < 3) { a = a + 1 }\nreturn a"),
        Representation::SMI
    );
}

#[test]
fn nil_reads_are_nil() {
    assert_eq!(repr_of_return_value("return x"), Representation::NIL);
}

// ----------------------------------------------------------------------
// Builder-level errors
// ----------------------------------------------------------------------

#[test]
fn stray_break_is_a_compile_error() {
    match compile("break") {
        Err(Error::Compile(CompileError::StrayLoopExit { offset })) => assert_eq!(offset, 0),
        other => panic!("expected a stray-loop-exit error, got {other:?}"),
    }
}

#[test]
fn stray_continue_is_a_compile_error() {
    assert!(matches!(
        compile("a = 1\ncontinue"),
        Err(Error::Compile(CompileError::StrayLoopExit { offset: 6 }))
    ));
}

#[test]
fn intrinsic_calls_lower_to_runtime_instructions() {
    let compilation = compile("__$gc()\nreturn __$trace()").expect("compile");
    assert!(
        compilation
            .graph
            .instrs()
            .any(|i| matches!(i.kind, InstrKind::CollectGarbage))
    );
    assert!(
        compilation
            .graph
            .instrs()
            .any(|i| matches!(i.kind, InstrKind::GetStackTrace))
    );
}
