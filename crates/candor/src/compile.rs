//! The front-half pipeline: source text to an SSA graph ready for
//! lowering.

use crate::{
    ast::Ast,
    error::Error,
    hir::{self, Graph},
    intern::RootPool,
    parser,
    scope::{self, ScopeInfo},
};

/// Everything the back half needs: the AST, the resolved scopes, the root
/// constant pool, and the SSA graph with φs pruned and representations
/// inferred.
#[derive(Debug)]
pub struct Compilation {
    pub source: String,
    pub ast: Ast,
    pub scopes: ScopeInfo,
    pub roots: RootPool,
    pub graph: Graph,
}

impl Compilation {
    /// The textual HIR dump the test suite compares byte-for-byte.
    #[must_use]
    pub fn hir_dump(&self) -> String {
        self.graph.dump()
    }
}

/// Compiles a source buffer through parse, scope resolution, and SSA
/// construction. Synchronous and single-threaded; every arena built here is
/// dropped together when the [`Compilation`] goes away.
pub fn compile(source: &str) -> Result<Compilation, Error> {
    let ast = parser::parse(source)?;
    let scopes = scope::resolve(&ast, source);
    let mut roots = RootPool::default();
    let mut graph = hir::build(&ast, source, &scopes, &mut roots)?;
    graph.prune_phis();
    graph.infer_representations();
    Ok(Compilation {
        source: source.to_owned(),
        ast,
        scopes,
        roots,
        graph,
    })
}
