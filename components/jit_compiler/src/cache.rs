//! Shared cache of callee graphs
//!
//! Building a method's graph is expensive and the same callee is often
//! inlined at many call sites, possibly by several concurrent compilations.

use crate::ir::Graph;
use core_types::{CompilationResult, MethodId};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::trace;

/// Thread-safe map from a method to its built graph.
///
/// Concurrent misses on the same method may both build the graph; the last
/// insert wins and every reader sees one complete graph.
#[derive(Debug, Default)]
pub struct GraphCache {
    graphs: RwLock<HashMap<MethodId, Arc<Graph>>>,
}

impl GraphCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached graph of `method`
    pub fn get(&self, method: MethodId) -> Option<Arc<Graph>> {
        self.graphs.read().get(&method).cloned()
    }

    /// Store the graph of `method`, replacing any previous entry
    pub fn insert(&self, method: MethodId, graph: Arc<Graph>) {
        self.graphs.write().insert(method, graph);
    }

    /// Cached graph of `method`, building and caching it on a miss.
    ///
    /// `build` runs without holding the lock, so it may itself use the cache.
    pub fn get_or_build<F>(&self, method: MethodId, build: F) -> CompilationResult<Arc<Graph>>
    where
        F: FnOnce() -> CompilationResult<Arc<Graph>>,
    {
        if let Some(graph) = self.get(method) {
            trace!(%method, "reusing graph");
            return Ok(graph);
        }
        let graph = build()?;
        self.insert(method, Arc::clone(&graph));
        Ok(graph)
    }

    /// Drop the cached graph of `method`, e.g. after its class was redefined
    pub fn invalidate(&self, method: MethodId) -> bool {
        self.graphs.write().remove(&method).is_some()
    }

    /// Number of cached graphs
    pub fn len(&self) -> usize {
        self.graphs.read().len()
    }

    /// Whether the cache is empty
    pub fn is_empty(&self) -> bool {
        self.graphs.read().is_empty()
    }

    /// Drop every cached graph
    pub fn clear(&self) {
        self.graphs.write().clear();
    }
}
