//! Inlining decisions
//!
//! For one call site, [`inline_info`] determines whether and how the target
//! can be inlined. The rules are tried in a fixed order and the first one
//! that applies decides; a rule that applies but whose target is not
//! inlinable declines without trying the remaining rules.
//!
//! Making a decision has no side effects. Applying an [`InlineInfo`] mutates
//! the caller's graph.

use super::splice;
use super::InliningContext;
use crate::deopt::{DeoptAction, DeoptReason};
use crate::ir::{Graph, InvokeKind, Node, NodeId, NodeKind, Stamp};
use core_types::{
    CompilationError, CompilationResult, MethodId, SourcePosition, TypeId, TypeRef, ValueKind,
};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

/// Why a call site is not inlined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeclineReason {
    /// An earlier phase marked the call as not inlinable
    NotInlinable,
    /// The call has no frame state after it
    MissingStateAfter,
    /// The call is not reachable
    DeadCode,
    /// The target, or its implementation for the receiver, is unknown
    Unresolved,
    /// The runtime forbids inlining the target
    VetoedByRuntime,
    /// The target is implemented natively
    NativeMethod,
    /// The target has no body
    AbstractMethod,
    /// The target's holder has not been initialized
    UninitializedHolder,
    /// A unique implementation exists but assumptions cannot be recorded
    NoAssumptions,
    /// Type-checked inlining is switched off
    TypeCheckInliningDisabled,
    /// The receiver profile does not show exactly one type
    NoMonomorphicReceiver,
}

impl fmt::Display for DeclineReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            DeclineReason::NotInlinable => "it is marked non-inlinable",
            DeclineReason::MissingStateAfter => "the invoke has no after state",
            DeclineReason::DeadCode => "the invoke is dead code",
            DeclineReason::Unresolved => "it is unresolved",
            DeclineReason::VetoedByRuntime => "the runtime does not allow it",
            DeclineReason::NativeMethod => "it is a native method",
            DeclineReason::AbstractMethod => "it is an abstract method",
            DeclineReason::UninitializedHolder => "the method's class is not initialized",
            DeclineReason::NoAssumptions => "assumptions are not allowed",
            DeclineReason::TypeCheckInliningDisabled => "type-checked inlining is disabled",
            DeclineReason::NoMonomorphicReceiver => "no single receiver type was profiled",
        };
        f.write_str(reason)
    }
}

/// Outcome of [`inline_info`]
#[derive(Debug, Clone)]
pub enum InliningDecision {
    /// The call site can be inlined this way
    Inline(InlineInfo),
    /// The call site stays a call
    Decline(DeclineReason),
}

impl InliningDecision {
    /// Whether the call site can be inlined
    pub fn is_inline(&self) -> bool {
        matches!(self, InliningDecision::Inline(_))
    }

    /// The opportunity, if any
    pub fn into_info(self) -> Option<InlineInfo> {
        match self {
            InliningDecision::Inline(info) => Some(info),
            InliningDecision::Decline(_) => None,
        }
    }

    /// The decline reason, if any
    pub fn decline_reason(&self) -> Option<DeclineReason> {
        match self {
            InliningDecision::Inline(_) => None,
            InliningDecision::Decline(reason) => Some(*reason),
        }
    }
}

/// Inlining of a statically known implementation
#[derive(Debug, Clone, PartialEq)]
pub struct StaticInline {
    /// Call site
    pub invoke: NodeId,
    /// Implementation to inline
    pub concrete: MethodId,
    /// Cost reported by the cost model
    pub weight: f64,
    /// Nesting level of the call site
    pub level: u32,
}

/// A way to inline one call site
#[derive(Debug, Clone)]
pub enum InlineInfo {
    /// Runtime-provided substitute graph
    Intrinsic {
        /// Call site
        invoke: NodeId,
        /// Substitute
        graph: Arc<Graph>,
    },
    /// Target known without speculation
    Static(StaticInline),
    /// Target selected by the profiled receiver type, guarded by a type check
    TypeGuarded {
        /// Inlining performed after the guard
        inline: StaticInline,
        /// Expected receiver type
        type_id: TypeId,
        /// Profiled probability of that type
        probability: f64,
    },
    /// Target is the only implementation in the loaded hierarchy
    AssumptionBased {
        /// Inlining performed
        inline: StaticInline,
        /// Target declared at the call site
        declared: MethodId,
    },
}

impl InlineInfo {
    /// Call site this opportunity applies to
    pub fn invoke(&self) -> NodeId {
        match self {
            InlineInfo::Intrinsic { invoke, .. } => *invoke,
            InlineInfo::Static(inline)
            | InlineInfo::TypeGuarded { inline, .. }
            | InlineInfo::AssumptionBased { inline, .. } => inline.invoke,
        }
    }

    /// Cost used to rank opportunities; intrinsics are free
    pub fn weight(&self) -> f64 {
        self.static_inline().map_or(0.0, |inline| inline.weight)
    }

    /// Nesting level; intrinsics are always level 0
    pub fn level(&self) -> u32 {
        self.static_inline().map_or(0, |inline| inline.level)
    }

    /// Implementation that will be inlined, `None` for intrinsics
    pub fn concrete(&self) -> Option<MethodId> {
        self.static_inline().map(|inline| inline.concrete)
    }

    /// Short name of the variant
    pub fn kind_name(&self) -> &'static str {
        match self {
            InlineInfo::Intrinsic { .. } => "intrinsic",
            InlineInfo::Static(_) => "static",
            InlineInfo::TypeGuarded { .. } => "type-guarded",
            InlineInfo::AssumptionBased { .. } => "assumption",
        }
    }

    fn static_inline(&self) -> Option<&StaticInline> {
        match self {
            InlineInfo::Intrinsic { .. } => None,
            InlineInfo::Static(inline)
            | InlineInfo::TypeGuarded { inline, .. }
            | InlineInfo::AssumptionBased { inline, .. } => Some(inline),
        }
    }

    /// Perform the inlining on `graph`.
    ///
    /// Returns the mapping from callee node ids to the ids of their live
    /// copies in `graph`.
    pub fn inline(
        self,
        graph: &mut Graph,
        ctx: &InliningContext<'_>,
    ) -> CompilationResult<HashMap<NodeId, NodeId>> {
        debug!(
            caller = %graph.method(),
            invoke = %self.invoke(),
            kind = self.kind_name(),
            weight = self.weight(),
            level = self.level(),
            "inlining {}",
            self.concrete()
                .map_or_else(|| "intrinsic".to_string(), |m| ctx.runtime.method_name(m))
        );
        match self {
            InlineInfo::Intrinsic { invoke, graph: callee } => splice::inline(
                graph,
                invoke,
                &callee,
                ctx.options.receiver_null_check,
                ctx.options,
            ),
            InlineInfo::Static(inline) => inline.apply(graph, ctx),
            InlineInfo::TypeGuarded { inline, type_id, .. } => {
                insert_type_guard(graph, inline.invoke, type_id)?;
                inline.apply(graph, ctx)
            }
            InlineInfo::AssumptionBased { inline, declared } => {
                ctx.callback
                    .record_concrete_method_assumption(declared, inline.concrete);
                inline.apply(graph, ctx)
            }
        }
    }
}

impl StaticInline {
    fn apply(
        self,
        graph: &mut Graph,
        ctx: &InliningContext<'_>,
    ) -> CompilationResult<HashMap<NodeId, NodeId>> {
        let callee = self.callee_graph(ctx)?;
        splice::inline(
            graph,
            self.invoke,
            &callee,
            ctx.options.receiver_null_check,
            ctx.options,
        )
    }

    fn callee_graph(&self, ctx: &InliningContext<'_>) -> CompilationResult<Arc<Graph>> {
        let method = self.concrete;
        let build = || {
            trace!(%method, "building graph");
            ctx.callback.build_graph(method)
        };
        match ctx.cache.filter(|_| ctx.options.use_graph_cache) {
            Some(cache) => cache.get_or_build(method, build),
            None => build(),
        }
    }
}

/// Insert `IsType(receiver, type_id)` and a guard on it right before the
/// call
fn insert_type_guard(graph: &mut Graph, invoke: NodeId, type_id: TypeId) -> CompilationResult<()> {
    let node = graph.node(invoke)?;
    let receiver = *node.inputs().first().ok_or_else(|| {
        CompilationError::malformed(format!("type-guarded call {invoke} has no receiver"))
    })?;
    let probability = node.probability();

    let is_type = graph.add(
        Node::new(NodeKind::IsType { type_id })
            .with_inputs(vec![receiver])
            .with_stamp(Stamp::of(ValueKind::Int)),
    );
    let guard = graph.add(
        Node::new(NodeKind::FixedGuard {
            reason: DeoptReason::TypeCheckedInliningViolated,
            action: DeoptAction::InvalidateReprofile,
        })
        .with_inputs(vec![is_type]),
    );
    graph.set_probability(guard, probability)?;
    graph.replace_at_predecessor(invoke, Some(guard))?;
    graph.set_next(guard, Some(invoke))
}

/// Decide how the call at `invoke` can be inlined.
///
/// Declines are returned as [`InliningDecision::Decline`]. Errors are
/// reserved for inconsistent input, such as an exact receiver type outside
/// the target's hierarchy.
pub fn inline_info(
    graph: &Graph,
    invoke: NodeId,
    level: u32,
    ctx: &InliningContext<'_>,
) -> CompilationResult<InliningDecision> {
    let node = graph.node(invoke)?;
    let data = node.as_invoke().ok_or_else(|| {
        CompilationError::invariant(format!(
            "{invoke} is a {} node, not a call",
            node.kind().name()
        ))
    })?;
    let caller = graph.method();
    let position = SourcePosition::new(caller, data.bci);
    let decider = Decider {
        graph,
        invoke,
        level,
        ctx,
        position,
    };
    let target_name = data.call_target.target.to_string();

    if !data.can_inline {
        return Ok(decider.decline(&target_name, DeclineReason::NotInlinable));
    }
    if node.state_after().is_none() {
        return Ok(decider.decline(&target_name, DeclineReason::MissingStateAfter));
    }
    if node.predecessor().is_none() {
        return Ok(decider.decline(&target_name, DeclineReason::DeadCode));
    }

    let target = data.call_target.target.resolved();
    if let Some(target) = target {
        if let Some(substitute) =
            ctx.runtime
                .intrinsic_graph(caller, data.bci, target, node.inputs())
        {
            return Ok(InliningDecision::Inline(InlineInfo::Intrinsic {
                invoke,
                graph: substitute,
            }));
        }
    }

    let statically_bound = matches!(
        data.call_target.invoke_kind,
        InvokeKind::Special | InvokeKind::Static
    ) || target.is_some_and(|t| ctx.runtime.can_be_statically_bound(t));
    if statically_bound {
        return Ok(match target {
            Some(target) => decider.static_inline(target),
            None => decider.decline(&target_name, DeclineReason::Unresolved),
        });
    }

    let Some(target) = target else {
        return Ok(decider.decline(&target_name, DeclineReason::Unresolved));
    };
    let declared = ctx.runtime.method(target).ok_or_else(|| {
        CompilationError::unresolved(format!("no descriptor for call target {target}"))
            .at(position)
    })?;
    let receiver = *node.inputs().first().ok_or_else(|| {
        CompilationError::malformed(format!("virtual call {invoke} has no receiver")).at(position)
    })?;
    let receiver_stamp = graph.node(receiver)?.stamp();

    if let Some(exact) = receiver_stamp.exact_type {
        if !ctx.runtime.is_subtype_of(exact, declared.holder) {
            return Err(CompilationError::inconsistent_subtype(format!(
                "exact receiver type {exact} of {invoke} is not a subtype of {}",
                declared.holder
            ))
            .at(position));
        }
        return Ok(match ctx.runtime.resolve_method_impl(exact, target) {
            Some(resolved) => decider.static_inline(resolved),
            None => decider.decline(&target_name, DeclineReason::Unresolved),
        });
    }

    let mut holder = declared.holder;
    if let Some(declared_type) = receiver_stamp.declared_type.as_ref().and_then(TypeRef::resolved) {
        if declared_type != holder && ctx.runtime.is_subtype_of(declared_type, holder) {
            holder = declared_type;
        }
    }

    if ctx.assumptions.is_none() {
        return Ok(decider.decline(&target_name, DeclineReason::NoAssumptions));
    }
    if let Some(concrete) = ctx.runtime.unique_concrete_method(holder, target) {
        return Ok(match decider.check_target(concrete) {
            Ok(()) => InliningDecision::Inline(InlineInfo::AssumptionBased {
                inline: decider.weighted(concrete),
                declared: target,
            }),
            Err(reason) => decider.decline(&ctx.runtime.method_name(concrete), reason),
        });
    }

    let profile = ctx.runtime.type_profile(caller, data.bci);
    let Some((type_id, probability)) = profile
        .filter(|p| p.is_monomorphic())
        .and_then(|p| p.dominant())
    else {
        return Ok(decider.decline(&target_name, DeclineReason::NoMonomorphicReceiver));
    };
    if !ctx.options.inline_with_type_check {
        return Ok(decider.decline(&target_name, DeclineReason::TypeCheckInliningDisabled));
    }
    let Some(concrete) = ctx.runtime.resolve_method_impl(type_id, target) else {
        return Ok(decider.decline(&target_name, DeclineReason::Unresolved));
    };
    Ok(match decider.check_target(concrete) {
        Ok(()) => InliningDecision::Inline(InlineInfo::TypeGuarded {
            inline: decider.weighted(concrete),
            type_id,
            probability,
        }),
        Err(reason) => decider.decline(&ctx.runtime.method_name(concrete), reason),
    })
}

struct Decider<'g, 'c, 'r> {
    graph: &'g Graph,
    invoke: NodeId,
    level: u32,
    ctx: &'c InliningContext<'r>,
    position: SourcePosition,
}

impl Decider<'_, '_, '_> {
    fn decline(&self, method: &str, reason: DeclineReason) -> InliningDecision {
        debug!(
            position = %self.position,
            level = self.level,
            ?reason,
            "not inlining {} because {}",
            method,
            reason
        );
        InliningDecision::Decline(reason)
    }

    fn static_inline(&self, concrete: MethodId) -> InliningDecision {
        match self.check_target(concrete) {
            Ok(()) => InliningDecision::Inline(InlineInfo::Static(self.weighted(concrete))),
            Err(reason) => self.decline(&self.ctx.runtime.method_name(concrete), reason),
        }
    }

    fn weighted(&self, concrete: MethodId) -> StaticInline {
        let weight = self.ctx.callback.inlining_weight(
            self.graph.method(),
            concrete,
            self.graph,
            self.invoke,
        );
        StaticInline {
            invoke: self.invoke,
            concrete,
            weight,
            level: self.level,
        }
    }

    fn check_target(&self, method: MethodId) -> Result<(), DeclineReason> {
        let runtime = self.ctx.runtime;
        let descriptor = runtime.method(method).ok_or(DeclineReason::Unresolved)?;
        if runtime.must_not_inline(method) {
            return Err(DeclineReason::VetoedByRuntime);
        }
        if descriptor.flags.native {
            return Err(DeclineReason::NativeMethod);
        }
        if descriptor.flags.abstract_ {
            return Err(DeclineReason::AbstractMethod);
        }
        let initialized = runtime
            .type_descriptor(descriptor.holder)
            .is_some_and(|holder| holder.is_initialized);
        if !initialized {
            return Err(DeclineReason::UninitializedHolder);
        }
        Ok(())
    }
}
