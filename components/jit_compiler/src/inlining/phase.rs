//! Inlining over a whole graph
//!
//! Call sites are ranked by weight and inlined cheapest first. Calls exposed
//! by an inlined body are evaluated one level deeper, until the configured
//! limits stop the process.

use super::decision::{inline_info, DeclineReason, InlineInfo, InliningDecision};
use super::InliningContext;
use crate::ir::{Graph, NodeId};
use core_types::CompilationResult;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use tracing::{debug, info};

/// Inlining statistics
#[derive(Debug, Clone, Default)]
pub struct InliningStats {
    /// Total inlining decisions made
    pub decisions_made: u64,
    /// Call sites inlined
    pub inlined: u64,
    /// Intrinsics substituted
    pub intrinsics: u64,
    /// Statically bound calls inlined
    pub static_inlines: u64,
    /// Calls inlined behind a receiver type guard
    pub type_guarded_inlines: u64,
    /// Calls inlined under a class-hierarchy assumption
    pub assumption_inlines: u64,
    /// Call sites declined
    pub declined: u64,
    /// Declines by reason
    pub decline_counts: HashMap<DeclineReason, u64>,
    /// Accepted candidates dropped for exceeding the weight limit
    pub over_weight: u64,
}

impl InliningStats {
    fn record_inline(&mut self, info: &InlineInfo) {
        self.inlined += 1;
        let counter = match info {
            InlineInfo::Intrinsic { .. } => &mut self.intrinsics,
            InlineInfo::Static(_) => &mut self.static_inlines,
            InlineInfo::TypeGuarded { .. } => &mut self.type_guarded_inlines,
            InlineInfo::AssumptionBased { .. } => &mut self.assumption_inlines,
        };
        *counter += 1;
    }

    fn record_decline(&mut self, reason: DeclineReason) {
        self.declined += 1;
        *self.decline_counts.entry(reason).or_insert(0) += 1;
    }

    /// Number of declines for `reason`
    pub fn declines(&self, reason: DeclineReason) -> u64 {
        self.decline_counts.get(&reason).copied().unwrap_or(0)
    }
}

/// Queued opportunity; the heap pops the lowest weight, earliest first
struct Candidate {
    info: InlineInfo,
    sequence: u64,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .info
            .weight()
            .total_cmp(&self.info.weight())
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

impl std::fmt::Debug for Candidate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Candidate")
            .field("invoke", &self.info.invoke())
            .field("weight", &self.info.weight())
            .field("sequence", &self.sequence)
            .finish()
    }
}

/// Inlines the call sites of a graph, cheapest first.
#[derive(Debug, Default)]
pub struct InliningPhase {
    stats: InliningStats,
    queue: BinaryHeap<Candidate>,
    sequence: u64,
}

impl InliningPhase {
    /// Create a phase with empty statistics
    pub fn new() -> Self {
        Self::default()
    }

    /// Inline the call sites of `graph` within the limits of
    /// `ctx.options`. Returns the number of call sites inlined.
    pub fn apply(&mut self, graph: &mut Graph, ctx: &InliningContext<'_>) -> CompilationResult<usize> {
        let options = ctx.options;
        self.queue.clear();

        for invoke in graph.invokes() {
            self.evaluate(graph, invoke, 0, ctx)?;
        }

        let mut inlined = 0;
        while let Some(candidate) = self.queue.pop() {
            if inlined >= options.maximum_inline_count {
                debug!(
                    method = %graph.method(),
                    limit = options.maximum_inline_count,
                    "inline count limit reached"
                );
                break;
            }
            let info = candidate.info;
            if options
                .maximum_inline_weight
                .is_some_and(|limit| info.weight() > limit)
            {
                self.stats.over_weight += 1;
                continue;
            }
            let still_a_call = graph
                .get(info.invoke())
                .is_some_and(|n| n.as_invoke().is_some());
            if !still_a_call {
                continue;
            }

            let level = info.level();
            self.stats.record_inline(&info);
            let mapping = info.inline(graph, ctx)?;
            inlined += 1;

            let next_level = level + 1;
            if next_level > options.maximum_inline_level {
                continue;
            }
            let mut exposed: Vec<NodeId> = mapping
                .values()
                .copied()
                .filter(|&id| graph.get(id).is_some_and(|n| n.as_invoke().is_some()))
                .collect();
            exposed.sort();
            for invoke in exposed {
                self.evaluate(graph, invoke, next_level, ctx)?;
            }
        }
        self.queue.clear();

        info!(
            method = %graph.method(),
            inlined,
            declined = self.stats.declined,
            "inlining finished"
        );
        Ok(inlined)
    }

    fn evaluate(
        &mut self,
        graph: &Graph,
        invoke: NodeId,
        level: u32,
        ctx: &InliningContext<'_>,
    ) -> CompilationResult<()> {
        self.stats.decisions_made += 1;
        match inline_info(graph, invoke, level, ctx)? {
            InliningDecision::Inline(info) => {
                self.queue.push(Candidate {
                    info,
                    sequence: self.sequence,
                });
                self.sequence += 1;
            }
            InliningDecision::Decline(reason) => self.stats.record_decline(reason),
        }
        Ok(())
    }

    /// Statistics accumulated over every `apply`
    pub fn stats(&self) -> &InliningStats {
        &self.stats
    }

    /// Reset statistics
    pub fn reset_stats(&mut self) {
        self.stats = InliningStats::default();
    }
}
