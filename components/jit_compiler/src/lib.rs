//! Call-site inlining for an optimizing JIT compiler
//!
//! This crate provides:
//! - IR: a sea-of-nodes graph with fixed control nodes, floating data nodes
//!   and frame states for deoptimization
//! - Decision engine: decides whether a call site is inlined and with which
//!   speculation (type guard, class-hierarchy assumption, intrinsic)
//! - Graph splicer: replaces a call node by a duplicate of the callee graph
//! - Phase driver: inlines a whole graph, cheapest call sites first
//!
//! # Example
//!
//! ```
//! use core_types::{CompilationResult, MethodDescriptor, MethodFlags, MethodId, MethodRef,
//!     TypeDescriptor, TypeId, Universe, ValueKind};
//! use jit_compiler::ir::{Bci, CallTarget, ConstantValue, FrameStateData, InvokeKind};
//! use jit_compiler::{Graph, GraphBuilder, InMemoryRuntime, InliningCallback,
//!     InliningContext, InliningOptions, InliningPhase, NodeId};
//! use std::sync::Arc;
//!
//! const MAIN: MethodId = MethodId(1);
//! const ANSWER: MethodId = MethodId(2);
//!
//! struct Callees;
//!
//! impl InliningCallback for Callees {
//!     fn build_graph(&self, method: MethodId) -> CompilationResult<Arc<Graph>> {
//!         let mut builder = GraphBuilder::new(method);
//!         let answer = builder.constant(ConstantValue::Int(42));
//!         builder.return_value(Some(answer))?;
//!         Ok(Arc::new(builder.finish()?))
//!     }
//!
//!     fn inlining_weight(&self, _: MethodId, _: MethodId, _: &Graph, _: NodeId) -> f64 {
//!         1.0
//!     }
//!
//!     fn record_concrete_method_assumption(&self, _: MethodId, _: MethodId) {}
//! }
//!
//! let mut universe = Universe::new();
//! universe.add_type(TypeDescriptor::new(TypeId(0), "Main", None));
//! universe.add_method(
//!     MethodDescriptor::new(ANSWER, TypeId(0), "answer", "()I").with_flags(MethodFlags {
//!         static_: true,
//!         ..Default::default()
//!     }),
//! );
//! let runtime = InMemoryRuntime::new(universe);
//!
//! let mut builder = GraphBuilder::new(MAIN);
//! let call = builder
//!     .invoke(
//!         CallTarget::new(MethodRef::Resolved(ANSWER), InvokeKind::Static, ValueKind::Int),
//!         0,
//!         vec![],
//!     )
//!     .unwrap();
//! builder
//!     .attach_state(call, FrameStateData::new(MAIN, Bci::At(3)).with_stack(vec![call]))
//!     .unwrap();
//! builder.return_value(Some(call)).unwrap();
//! let mut graph = builder.finish().unwrap();
//!
//! let options = InliningOptions::default();
//! let ctx = InliningContext::new(&runtime, &Callees, &options);
//! let inlined = InliningPhase::new().apply(&mut graph, &ctx).unwrap();
//! assert_eq!(inlined, 1);
//! assert!(graph.invokes().is_empty());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod assumptions;
pub mod cache;
pub mod deopt;
pub mod inlining;
pub mod ir;
pub mod options;
pub mod runtime;

// Re-export main types at crate root
pub use assumptions::{Assumptions, ConcreteMethodAssumption};
pub use cache::GraphCache;
pub use deopt::{DeoptAction, DeoptReason};
pub use inlining::{
    inline_info, DeclineReason, InlineInfo, InliningCallback, InliningContext, InliningDecision,
    InliningPhase, InliningStats, StaticInline,
};
pub use ir::{Graph, GraphBuilder, NodeId};
pub use options::InliningOptions;
pub use runtime::{CompilerRuntime, InMemoryRuntime};
