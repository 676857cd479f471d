//! Services the inliner requests from the surrounding compiler

use crate::ir::{Graph, NodeId};
use core_types::{CompilationResult, MethodId};
use std::sync::Arc;

/// Graph construction, cost model and assumption bookkeeping of the
/// enclosing compilation.
pub trait InliningCallback {
    /// Build the graph of `method`.
    ///
    /// Implementations may run further inlining on the result before
    /// returning it.
    fn build_graph(&self, method: MethodId) -> CompilationResult<Arc<Graph>>;

    /// Cost of inlining `candidate` at `invoke` in `caller`'s `graph`.
    /// Lower is better.
    fn inlining_weight(
        &self,
        caller: MethodId,
        candidate: MethodId,
        graph: &Graph,
        invoke: NodeId,
    ) -> f64;

    /// Record that the compiled code is only valid while `declared`
    /// dispatches to `concrete` alone
    fn record_concrete_method_assumption(&self, declared: MethodId, concrete: MethodId);
}
