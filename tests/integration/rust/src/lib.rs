//! Integration test suite for the inliner
//!
//! [`Compiler`] plays the part of the enclosing JIT: it produces callee
//! graphs from a [`Program`], inlines into them before handing them out,
//! and shares the results through a [`GraphCache`].

use core_types::{CompilationError, CompilationResult, ErrorKind, MethodId};
use jit_compiler::{
    Assumptions, Graph, GraphCache, InMemoryRuntime, InliningCallback, InliningContext,
    InliningOptions, InliningPhase, InliningStats, NodeId,
};
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::{Arc, Once};
use tracing::debug;

static TRACING: Once = Once::new();

/// Install a test subscriber filtered by `RUST_LOG`
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Unoptimized graphs of every method the tests can call
#[derive(Debug, Clone, Default)]
pub struct Program {
    bodies: HashMap<MethodId, Graph>,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `graph` as the body of its method
    pub fn define(mut self, graph: Graph) -> Self {
        self.bodies.insert(graph.method(), graph);
        self
    }

    pub fn body(&self, method: MethodId) -> Option<&Graph> {
        self.bodies.get(&method)
    }
}

/// One compilation thread.
///
/// Callees are compiled recursively. A method already being compiled on
/// this thread is handed out uninlined, which bounds recursion by the
/// inline level limit.
pub struct Compiler<'a> {
    runtime: &'a InMemoryRuntime,
    program: &'a Program,
    cache: &'a GraphCache,
    options: InliningOptions,
    assumptions: Assumptions,
    in_progress: RefCell<Vec<MethodId>>,
    stats: RefCell<Vec<InliningStats>>,
}

impl<'a> Compiler<'a> {
    pub fn new(
        runtime: &'a InMemoryRuntime,
        program: &'a Program,
        cache: &'a GraphCache,
        options: InliningOptions,
    ) -> Self {
        Self {
            runtime,
            program,
            cache,
            options,
            assumptions: Assumptions::new(),
            in_progress: RefCell::new(Vec::new()),
            stats: RefCell::new(Vec::new()),
        }
    }

    /// Compile `method` with inlining
    pub fn compile(&self, method: MethodId) -> CompilationResult<Graph> {
        let mut graph = self.body(method)?.clone();
        self.in_progress.borrow_mut().push(method);
        let ctx = InliningContext::new(self.runtime, self, &self.options)
            .with_assumptions(&self.assumptions)
            .with_cache(self.cache);
        let mut phase = InliningPhase::new();
        let result = phase.apply(&mut graph, &ctx);
        self.in_progress.borrow_mut().pop();
        result?;
        self.stats.borrow_mut().push(phase.stats().clone());
        graph.verify()?;
        Ok(graph)
    }

    /// Assumptions recorded so far
    pub fn assumptions(&self) -> &Assumptions {
        &self.assumptions
    }

    /// Statistics of every finished phase run, innermost callee first
    pub fn stats(&self) -> Vec<InliningStats> {
        self.stats.borrow().clone()
    }

    fn body(&self, method: MethodId) -> CompilationResult<&Graph> {
        self.program.body(method).ok_or_else(|| {
            CompilationError::new(ErrorKind::GraphBuildFailed, format!("no body for {method}"))
        })
    }
}

impl InliningCallback for Compiler<'_> {
    fn build_graph(&self, method: MethodId) -> CompilationResult<Arc<Graph>> {
        if self.in_progress.borrow().contains(&method) {
            debug!(%method, "recursive call, using the uninlined body");
            return Ok(Arc::new(self.body(method)?.clone()));
        }
        self.compile(method).map(Arc::new)
    }

    fn inlining_weight(&self, _: MethodId, candidate: MethodId, _: &Graph, _: NodeId) -> f64 {
        self.program
            .body(candidate)
            .map_or(f64::INFINITY, |body| body.len() as f64)
    }

    fn record_concrete_method_assumption(&self, declared: MethodId, concrete: MethodId) {
        self.assumptions.record_concrete_method(declared, concrete);
    }
}
