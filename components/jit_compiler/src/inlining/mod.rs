//! Call-site inlining
//!
//! - [`decision`]: decides whether and how a call site can be inlined
//! - [`splice`]: replaces a call node by a copy of the callee graph
//! - [`phase`]: drives both over a whole graph, best candidates first
//!
//! Both halves read the surrounding compilation through an
//! [`InliningContext`].

pub mod callback;
pub mod decision;
pub mod phase;
pub mod splice;


pub use callback::InliningCallback;
pub use decision::{inline_info, DeclineReason, InlineInfo, InliningDecision, StaticInline};
pub use phase::{InliningPhase, InliningStats};

use crate::assumptions::Assumptions;
use crate::cache::GraphCache;
use crate::options::InliningOptions;
use crate::runtime::CompilerRuntime;

/// Everything the inliner consults while compiling one method.
///
/// Without an [`Assumptions`] registry, calls that could only be inlined
/// under a class-hierarchy assumption are declined. Without a
/// [`GraphCache`], every callee graph is requested from the callback.
#[derive(Clone, Copy)]
pub struct InliningContext<'a> {
    /// Resolution and profiling queries
    pub runtime: &'a dyn CompilerRuntime,
    /// Graph building, cost model and assumption recording
    pub callback: &'a dyn InliningCallback,
    /// Feature flags and limits
    pub options: &'a InliningOptions,
    /// Assumption registry of this compilation
    pub assumptions: Option<&'a Assumptions>,
    /// Shared callee graphs
    pub cache: Option<&'a GraphCache>,
}

impl<'a> InliningContext<'a> {
    /// Context without assumptions or cache
    pub fn new(
        runtime: &'a dyn CompilerRuntime,
        callback: &'a dyn InliningCallback,
        options: &'a InliningOptions,
    ) -> Self {
        Self {
            runtime,
            callback,
            options,
            assumptions: None,
            cache: None,
        }
    }

    /// Allow assumption-based inlining
    pub fn with_assumptions(mut self, assumptions: &'a Assumptions) -> Self {
        self.assumptions = Some(assumptions);
        self
    }

    /// Reuse callee graphs through `cache`
    pub fn with_cache(mut self, cache: &'a GraphCache) -> Self {
        self.cache = Some(cache);
        self
    }
}
