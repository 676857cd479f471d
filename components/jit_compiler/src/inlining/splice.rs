//! Graph splicing
//!
//! Replaces a call node by a copy of the callee's graph. Parameters become
//! the call's arguments, the callee's returned value replaces the call's
//! value, its exceptional exit is connected to the call's exception
//! handler, and several returns or unwinds are first joined at a merge.
//! The callee's frame states are chained to the caller's so that
//! deoptimization inside the inlined code rebuilds both frames.

use crate::deopt::{DeoptAction, DeoptReason};
use crate::ir::{Bci, Graph, Node, NodeId, NodeKind, Stamp};
use crate::options::InliningOptions;
use core_types::{CompilationError, CompilationResult, SourcePosition, ValueKind};
use std::collections::HashMap;
use tracing::trace;

/// Exits and frame states found while partitioning the callee
#[derive(Default)]
struct CalleeShape {
    duplicate: Vec<NodeId>,
    replacements: HashMap<NodeId, NodeId>,
    returns: Vec<NodeId>,
    unwinds: Vec<NodeId>,
    frame_states: Vec<NodeId>,
}

/// Inline `callee` at the call node `invoke` of `graph`.
///
/// Returns the mapping from callee ids to their copies that are still live
/// after splicing.
pub fn inline(
    graph: &mut Graph,
    invoke: NodeId,
    callee: &Graph,
    receiver_null_check: bool,
    options: &InliningOptions,
) -> CompilationResult<HashMap<NodeId, NodeId>> {
    let node = graph.node(invoke)?;
    let data = node.as_invoke().cloned().ok_or_else(|| {
        CompilationError::invariant(format!(
            "{invoke} is a {} node, not a call",
            node.kind().name()
        ))
    })?;
    let position = SourcePosition::new(graph.method(), data.bci);
    let fail = |message: String| CompilationError::invariant(message).at(position);

    node.predecessor()
        .ok_or_else(|| fail(format!("call {invoke} has no predecessor")))?;
    let continuation = node
        .next()
        .ok_or_else(|| fail(format!("call {invoke} has no successor")))?;
    let state_after = node
        .state_after()
        .ok_or_else(|| fail(format!("call {invoke} has no frame state after it")))?;
    let exception_edge = node.exception_edge();
    let arguments = node.inputs().to_vec();
    let invoke_probability = node.probability();
    let return_kind = data.call_target.return_kind;

    let caller_state = graph
        .node(state_after)?
        .as_frame_state()
        .ok_or_else(|| fail(format!("state after {invoke} is not a frame state")))?;
    let caller_locks = caller_state.locks_size();
    let caller_rethrow = caller_state.rethrow_exception;

    trace!(
        caller = %graph.method(),
        callee = %callee.method(),
        %invoke,
        "splicing {} callee nodes",
        callee.len()
    );

    let shape = partition(callee, &arguments, position)?;
    let duplicates = graph.add_duplicates(callee, &shape.duplicate, &shape.replacements)?;
    let copy_of = |old: NodeId| {
        duplicates.get(&old).copied().ok_or_else(|| {
            CompilationError::invariant(format!("callee node {old} was not duplicated"))
                .at(position)
        })
    };

    // entry
    let first = callee
        .next(callee.start())
        .ok_or_else(|| CompilationError::malformed("callee graph has an empty entry").at(position))?;
    let first = copy_of(first)?;
    let receiver = arguments.first().copied();
    let needs_null_check = match receiver {
        Some(receiver) if receiver_null_check && !data.call_target.is_static() => {
            let stamp = graph.node(receiver)?.stamp();
            stamp.kind == ValueKind::Object && !stamp.non_null
        }
        _ => false,
    };
    match receiver.filter(|_| needs_null_check) {
        Some(receiver) => {
            let non_null = graph.add(
                Node::new(NodeKind::NullCheck {
                    expected_null: false,
                })
                .with_inputs(vec![receiver])
                .with_stamp(Stamp::of(ValueKind::Int)),
            );
            let guard = graph.add(
                Node::new(NodeKind::FixedGuard {
                    reason: DeoptReason::NullCheckException,
                    action: DeoptAction::InvalidateReprofile,
                })
                .with_inputs(vec![non_null]),
            );
            graph.set_probability(guard, invoke_probability)?;
            graph.replace_at_predecessor(invoke, Some(guard))?;
            graph.set_next(guard, Some(first))?;
        }
        None => graph.replace_at_predecessor(invoke, Some(first))?,
    }

    // frequencies
    if options.probability_analysis {
        for &copy in duplicates.values() {
            let node = graph.node(copy)?;
            if node.is_fixed() {
                let scaled = node.probability() * invoke_probability;
                graph.set_probability(copy, scaled)?;
            }
        }
    }

    // several exits of a kind are joined so that one edge leaves the body
    let mut exits = [None, None];
    for (slot, callee_exits) in exits.iter_mut().zip([&shape.returns, &shape.unwinds]) {
        let copies = callee_exits
            .iter()
            .map(|&exit| copy_of(exit))
            .collect::<CompilationResult<Vec<_>>>()?;
        *slot = match copies.as_slice() {
            [] => None,
            [only] => Some(*only),
            _ => Some(graph.merge_exits(&copies).map_err(|e| e.at(position))?),
        };
    }
    let [return_copy, unwind_copy] = exits;

    // frame states at the method boundary
    let mut state_before = None;
    for &state in &shape.frame_states {
        let copy = copy_of(state)?;
        let bci = graph.node(copy)?.as_frame_state().map(|s| s.bci);
        match bci {
            Some(Bci::BeforeCall) => {
                let before = match state_before {
                    Some(before) => before,
                    None => {
                        let before = graph.duplicate_frame_state_modified(
                            state_after,
                            data.bci,
                            false,
                            return_kind,
                            &arguments,
                        )?;
                        state_before = Some(before);
                        before
                    }
                };
                graph.replace_and_delete(copy, before)?;
            }
            Some(Bci::AfterCall) => graph.replace_and_delete(copy, state_after)?,
            _ => {}
        }
    }

    // locks
    if caller_locks > 0 {
        for &copy in duplicates.values() {
            if let NodeKind::AccessMonitor { lock_index, .. } = &mut graph.node_mut(copy)?.kind {
                *lock_index += caller_locks;
            }
        }
    }

    // normal exit
    graph.set_next(invoke, None)?;
    match return_copy {
        Some(return_copy) => {
            let value = graph.node(return_copy)?.inputs().first().copied();
            match value {
                Some(value) => graph.replace_at_usages(invoke, value)?,
                None if !return_kind.is_void() => {
                    return Err(CompilationError::malformed(format!(
                        "callee {} returns no value for a {return_kind:?} call",
                        callee.method()
                    ))
                    .at(position))
                }
                None => {}
            }
            graph.replace_at_predecessor(return_copy, Some(continuation))?;
            let inputs = graph.clear_inputs(return_copy)?;
            graph.delete(return_copy)?;
            graph.remove_unused_floating(inputs);
        }
        None => graph.kill_cfg(continuation)?,
    }

    // exceptional exit
    match (unwind_copy, exception_edge) {
        (Some(unwind), Some(handler)) => {
            if !matches!(graph.node(handler)?.kind(), NodeKind::ExceptionObject) {
                return Err(CompilationError::malformed(format!(
                    "exception edge of {invoke} does not start with an exception object"
                ))
                .at(position));
            }
            let exception = graph
                .node(unwind)?
                .inputs()
                .first()
                .copied()
                .ok_or_else(|| CompilationError::malformed("unwind without exception"))?;
            graph.replace_at_usages(handler, exception)?;
            let handler_next = graph.next(handler);
            graph.set_next(handler, None)?;
            graph.set_successor(invoke, 1, None)?;
            graph.replace_at_predecessor(unwind, handler_next)?;

            let mut inputs = graph.clear_inputs(unwind)?;
            graph.delete(unwind)?;
            inputs.extend(graph.clear_inputs(handler)?);
            graph.delete(handler)?;
            graph.remove_unused_floating(inputs);
        }
        (None, Some(handler)) => {
            graph.set_successor(invoke, 1, None)?;
            graph.kill_cfg(handler)?;
        }
        (Some(unwind), None) => {
            let deopt = graph.add(Node::new(NodeKind::Deoptimize {
                action: DeoptAction::InvalidateRecompile,
            }));
            let probability = graph.node(unwind)?.probability();
            graph.set_probability(deopt, probability)?;
            graph.replace_at_predecessor(unwind, Some(deopt))?;
            let inputs = graph.clear_inputs(unwind)?;
            graph.delete(unwind)?;
            graph.remove_unused_floating(inputs);
        }
        (None, None) => {}
    }

    // outer frame state of the inlined frame
    let unlinked: Vec<NodeId> = shape
        .frame_states
        .iter()
        .filter_map(|state| duplicates.get(state).copied())
        .filter(|&copy| {
            graph
                .get(copy)
                .and_then(Node::as_frame_state)
                .is_some_and(|s| s.outer.is_none())
        })
        .collect();
    if !unlinked.is_empty() {
        let outer = graph.duplicate_frame_state_modified(
            state_after,
            data.bci,
            caller_rethrow,
            return_kind,
            &[],
        )?;
        for copy in unlinked {
            if let NodeKind::FrameState(state) = &mut graph.node_mut(copy)?.kind {
                state.outer = Some(outer);
            }
        }
    }

    // the call itself
    let mut inputs = graph.clear_inputs(invoke)?;
    inputs.push(state_after);
    graph.remove_unused_floating(inputs);
    if !graph.usages(invoke).is_empty() {
        return Err(CompilationError::malformed(format!(
            "value of {invoke} is still used but {} never returns",
            callee.method()
        ))
        .at(position));
    }
    graph.delete(invoke)?;

    let mut mapping = duplicates;
    mapping.retain(|_, copy| graph.contains(*copy));
    Ok(mapping)
}

/// Sort callee nodes into parameters, which map to arguments, and nodes to
/// copy. The entry node is dropped, and so is its frame state unless
/// something else reads it.
fn partition(
    callee: &Graph,
    arguments: &[NodeId],
    position: SourcePosition,
) -> CompilationResult<CalleeShape> {
    let start = callee.start();
    let start_state = callee
        .start_state()
        .filter(|&state| callee.usages(state) == [start]);

    let mut shape = CalleeShape::default();
    for id in callee.node_ids() {
        if id == start || Some(id) == start_state {
            continue;
        }
        let node = callee.node(id)?;
        match node.kind() {
            NodeKind::Local { index } => {
                let argument = arguments.get(*index).copied().ok_or_else(|| {
                    CompilationError::malformed(format!(
                        "parameter {index} of {} has no argument, the call passes {}",
                        callee.method(),
                        arguments.len()
                    ))
                    .at(position)
                })?;
                shape.replacements.insert(id, argument);
                continue;
            }
            NodeKind::Return => shape.returns.push(id),
            NodeKind::Unwind => shape.unwinds.push(id),
            NodeKind::FrameState(_) => shape.frame_states.push(id),
            _ => {}
        }
        shape.duplicate.push(id);
    }
    Ok(shape)
}
