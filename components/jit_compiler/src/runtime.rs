//! Runtime queries used by the inliner
//!
//! The compiler never reads runtime tables directly. It asks a
//! [`CompilerRuntime`], which the embedding VM implements over its own
//! metadata. [`InMemoryRuntime`] implements it over a [`Universe`].

use crate::ir::{Graph, NodeId};
use core_types::{
    MethodDescriptor, MethodId, TypeDescriptor, TypeId, TypeProfile, Universe,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Resolution, profiling and policy queries answered by the runtime.
///
/// Implementations are shared between concurrent compilations.
pub trait CompilerRuntime: Send + Sync {
    /// Substitute graph for a call of `target` at `caller@bci`, if the
    /// runtime provides one
    fn intrinsic_graph(
        &self,
        caller: MethodId,
        bci: u32,
        target: MethodId,
        arguments: &[NodeId],
    ) -> Option<Arc<Graph>>;

    /// Whether the runtime forbids inlining `method`
    fn must_not_inline(&self, method: MethodId) -> bool;

    /// Method descriptor
    fn method(&self, method: MethodId) -> Option<&MethodDescriptor>;

    /// Type descriptor
    fn type_descriptor(&self, type_id: TypeId) -> Option<&TypeDescriptor>;

    /// Whether `sub` is `sup` or one of its subtypes
    fn is_subtype_of(&self, sub: TypeId, sup: TypeId) -> bool;

    /// Implementation of `method` selected for a receiver of exact type
    /// `receiver`
    fn resolve_method_impl(&self, receiver: TypeId, method: MethodId) -> Option<MethodId>;

    /// Single concrete implementation of `method` among the subtypes of
    /// `holder`
    fn unique_concrete_method(&self, holder: TypeId, method: MethodId) -> Option<MethodId>;

    /// Whether calls to `method` cannot dispatch elsewhere
    fn can_be_statically_bound(&self, method: MethodId) -> bool;

    /// Receivers observed at `method@bci`
    fn type_profile(&self, method: MethodId, bci: u32) -> Option<&TypeProfile>;

    /// Name for diagnostics
    fn method_name(&self, method: MethodId) -> String {
        method.to_string()
    }
}

/// Runtime backed by in-memory tables.
#[derive(Debug, Default)]
pub struct InMemoryRuntime {
    universe: Universe,
    intrinsics: HashMap<MethodId, Arc<Graph>>,
    vetoed: HashSet<MethodId>,
}

impl InMemoryRuntime {
    /// Create a runtime over `universe`
    pub fn new(universe: Universe) -> Self {
        Self {
            universe,
            intrinsics: HashMap::new(),
            vetoed: HashSet::new(),
        }
    }

    /// Substitute `graph` for every call of `method`
    pub fn register_intrinsic(&mut self, method: MethodId, graph: Graph) {
        self.intrinsics.insert(method, Arc::new(graph));
    }

    /// Forbid inlining of `method`
    pub fn veto(&mut self, method: MethodId) {
        self.vetoed.insert(method);
    }

    /// Underlying tables
    pub fn universe(&self) -> &Universe {
        &self.universe
    }

    /// Mutable access to the underlying tables
    pub fn universe_mut(&mut self) -> &mut Universe {
        &mut self.universe
    }
}

impl CompilerRuntime for InMemoryRuntime {
    fn intrinsic_graph(
        &self,
        _caller: MethodId,
        _bci: u32,
        target: MethodId,
        _arguments: &[NodeId],
    ) -> Option<Arc<Graph>> {
        self.intrinsics.get(&target).cloned()
    }

    fn must_not_inline(&self, method: MethodId) -> bool {
        self.vetoed.contains(&method)
    }

    fn method(&self, method: MethodId) -> Option<&MethodDescriptor> {
        self.universe.method(method)
    }

    fn type_descriptor(&self, type_id: TypeId) -> Option<&TypeDescriptor> {
        self.universe.type_descriptor(type_id)
    }

    fn is_subtype_of(&self, sub: TypeId, sup: TypeId) -> bool {
        self.universe.is_subtype_of(sub, sup)
    }

    fn resolve_method_impl(&self, receiver: TypeId, method: MethodId) -> Option<MethodId> {
        self.universe.resolve_method_impl(receiver, method)
    }

    fn unique_concrete_method(&self, holder: TypeId, method: MethodId) -> Option<MethodId> {
        self.universe.unique_concrete_method(holder, method)
    }

    fn can_be_statically_bound(&self, method: MethodId) -> bool {
        self.universe.can_be_statically_bound(method)
    }

    fn type_profile(&self, method: MethodId, bci: u32) -> Option<&TypeProfile> {
        self.universe.type_profile(method, bci)
    }

    fn method_name(&self, method: MethodId) -> String {
        self.universe.method_name(method)
    }
}
