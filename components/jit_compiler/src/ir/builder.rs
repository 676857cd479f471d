//! Programmatic graph construction
//!
//! Stands in for the bytecode parser: tests, intrinsics and the in-memory
//! runtime assemble method graphs node by node with it.

use super::frame_state::FrameStateData;
use super::graph::Graph;
use super::node::{
    ArithmeticOp, CallTarget, ConstantValue, InvokeData, MonitorOp, Node, NodeId, NodeKind, Stamp,
};
use crate::deopt::{DeoptAction, DeoptReason};
use core_types::{CompilationError, CompilationResult, MethodId, TypeId, ValueKind};

/// Appends fixed nodes after a cursor and creates floating nodes on demand.
///
/// # Examples
///
/// ```
/// use jit_compiler::ir::{ArithmeticOp, GraphBuilder};
/// use core_types::{MethodId, ValueKind};
///
/// let mut builder = GraphBuilder::new(MethodId(1));
/// let x = builder.parameter(0, ValueKind::Int);
/// let y = builder.parameter(1, ValueKind::Int);
/// let sum = builder.arithmetic(ArithmeticOp::Add, x, y);
/// builder.return_value(Some(sum)).unwrap();
/// let graph = builder.finish().unwrap();
/// assert_eq!(graph.len(), 5);
/// ```
#[derive(Debug)]
pub struct GraphBuilder {
    graph: Graph,
    cursor: NodeId,
}

impl GraphBuilder {
    /// Start building a graph for `method`
    pub fn new(method: MethodId) -> Self {
        let graph = Graph::new(method);
        let cursor = graph.start();
        Self { graph, cursor }
    }

    /// Graph under construction
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Node the next fixed node is appended after
    pub fn cursor(&self) -> NodeId {
        self.cursor
    }

    /// Continue appending after `node`
    pub fn set_cursor(&mut self, node: NodeId) {
        self.cursor = node;
    }

    /// Parameter placeholder of the given kind
    pub fn parameter(&mut self, index: usize, kind: ValueKind) -> NodeId {
        self.parameter_with_stamp(index, Stamp::of(kind))
    }

    /// Parameter placeholder with an explicit stamp
    pub fn parameter_with_stamp(&mut self, index: usize, stamp: Stamp) -> NodeId {
        self.graph
            .add(Node::new(NodeKind::Local { index }).with_stamp(stamp))
    }

    /// Constant
    pub fn constant(&mut self, value: ConstantValue) -> NodeId {
        let stamp = match value {
            ConstantValue::Null => Stamp::object(None),
            other => Stamp::of(other.kind()),
        };
        self.graph
            .add(Node::new(NodeKind::Constant(value)).with_stamp(stamp))
    }

    /// Binary arithmetic, typed like its left operand
    pub fn arithmetic(&mut self, op: ArithmeticOp, left: NodeId, right: NodeId) -> NodeId {
        let kind = self
            .graph
            .get(left)
            .map_or(ValueKind::Int, |n| n.stamp().kind);
        self.graph.add(
            Node::new(NodeKind::Arithmetic(op))
                .with_inputs(vec![left, right])
                .with_stamp(Stamp::of(kind)),
        )
    }

    /// Exact-type test of `value`
    pub fn is_type(&mut self, value: NodeId, type_id: TypeId) -> NodeId {
        self.graph.add(
            Node::new(NodeKind::IsType { type_id })
                .with_inputs(vec![value])
                .with_stamp(Stamp::of(ValueKind::Int)),
        )
    }

    /// Frame state node
    pub fn frame_state(&mut self, data: FrameStateData) -> NodeId {
        self.graph
            .add(Node::new(NodeKind::FrameState(Box::new(data))))
    }

    /// Create a frame state and attach it as the state after `node`
    pub fn attach_state(&mut self, node: NodeId, data: FrameStateData) -> CompilationResult<NodeId> {
        let state = self.frame_state(data);
        self.graph.set_state_after(node, Some(state))?;
        Ok(state)
    }

    /// Attach the entry frame state
    pub fn set_start_state(&mut self, data: FrameStateData) -> CompilationResult<NodeId> {
        let start = self.graph.start();
        self.attach_state(start, data)
    }

    /// Append a fixed node after the cursor and move the cursor to it
    pub fn append(&mut self, node: Node) -> CompilationResult<NodeId> {
        if !node.is_fixed() {
            return Err(CompilationError::malformed(format!(
                "cannot append floating {} node to control flow",
                node.kind().name()
            )));
        }
        let id = self.graph.add(node);
        self.graph.set_next(self.cursor, Some(id))?;
        self.cursor = id;
        Ok(id)
    }

    /// Append a block begin
    pub fn begin(&mut self) -> CompilationResult<NodeId> {
        self.append(Node::new(NodeKind::Begin))
    }

    /// Append a call without exception edge
    pub fn invoke(
        &mut self,
        call_target: CallTarget,
        bci: u32,
        arguments: Vec<NodeId>,
    ) -> CompilationResult<NodeId> {
        let node = Self::invoke_node(call_target, bci, arguments);
        self.append(node)
    }

    /// Append a call with an exception edge leading to a fresh exception
    /// object. The cursor stays on the call; returns the call and the
    /// exception object.
    pub fn invoke_with_exception(
        &mut self,
        call_target: CallTarget,
        bci: u32,
        arguments: Vec<NodeId>,
    ) -> CompilationResult<(NodeId, NodeId)> {
        let node = Self::invoke_node(call_target, bci, arguments).with_exception_edge();
        let invoke = self.append(node)?;
        let exception = self.graph.add(
            Node::new(NodeKind::ExceptionObject).with_stamp(Stamp::object(None).non_null()),
        );
        self.graph.set_successor(invoke, 1, Some(exception))?;
        Ok((invoke, exception))
    }

    fn invoke_node(call_target: CallTarget, bci: u32, arguments: Vec<NodeId>) -> Node {
        let stamp = Stamp::of(call_target.return_kind);
        Node::new(NodeKind::Invoke(Box::new(InvokeData {
            call_target,
            bci,
            can_inline: true,
        })))
        .with_inputs(arguments)
        .with_stamp(stamp)
    }

    /// Append a lock acquire
    pub fn monitor_enter(&mut self, object: NodeId, lock_index: usize) -> CompilationResult<NodeId> {
        self.append(
            Node::new(NodeKind::AccessMonitor {
                op: MonitorOp::Enter,
                lock_index,
            })
            .with_inputs(vec![object]),
        )
    }

    /// Append a lock release
    pub fn monitor_exit(&mut self, object: NodeId, lock_index: usize) -> CompilationResult<NodeId> {
        self.append(
            Node::new(NodeKind::AccessMonitor {
                op: MonitorOp::Exit,
                lock_index,
            })
            .with_inputs(vec![object]),
        )
    }

    /// Append a guard on `condition`
    pub fn guard(
        &mut self,
        condition: NodeId,
        reason: DeoptReason,
        action: DeoptAction,
    ) -> CompilationResult<NodeId> {
        self.append(Node::new(NodeKind::FixedGuard { reason, action }).with_inputs(vec![condition]))
    }

    /// Append a branch; returns the begin nodes of the true and false arms.
    /// The cursor moves to the true arm.
    pub fn if_(&mut self, condition: NodeId) -> CompilationResult<(NodeId, NodeId)> {
        let branch = self.append(Node::new(NodeKind::If).with_inputs(vec![condition]))?;
        let on_true = self.graph.add(Node::new(NodeKind::Begin));
        let on_false = self.graph.add(Node::new(NodeKind::Begin));
        self.graph.set_successor(branch, 0, Some(on_true))?;
        self.graph.set_successor(branch, 1, Some(on_false))?;
        self.cursor = on_true;
        Ok((on_true, on_false))
    }

    /// Append the end of the current block, to be joined by [`Self::merge`]
    pub fn end(&mut self) -> CompilationResult<NodeId> {
        self.append(Node::new(NodeKind::End))
    }

    /// Join `ends` at a new merge and move the cursor to it
    pub fn merge(&mut self, ends: Vec<NodeId>) -> CompilationResult<NodeId> {
        for &end in &ends {
            if !matches!(self.graph.node(end)?.kind(), NodeKind::End) {
                return Err(CompilationError::malformed(format!(
                    "{end} is not an end node"
                )));
            }
        }
        let merge = self.graph.add(Node::new(NodeKind::Merge).with_inputs(ends));
        self.cursor = merge;
        Ok(merge)
    }

    /// Value selected at `merge`, one entry per joined end
    pub fn phi(
        &mut self,
        merge: NodeId,
        values: Vec<NodeId>,
        kind: ValueKind,
    ) -> CompilationResult<NodeId> {
        let node = self.graph.node(merge)?;
        if !matches!(node.kind(), NodeKind::Merge) || node.inputs().len() != values.len() {
            return Err(CompilationError::malformed(format!(
                "phi at {merge} needs one value per end, got {}",
                values.len()
            )));
        }
        let inputs = std::iter::once(merge).chain(values).collect();
        Ok(self
            .graph
            .add(Node::new(NodeKind::Phi).with_inputs(inputs).with_stamp(Stamp::of(kind))))
    }

    /// Append a normal exit
    pub fn return_value(&mut self, value: Option<NodeId>) -> CompilationResult<NodeId> {
        self.append(Node::new(NodeKind::Return).with_inputs(value.into_iter().collect()))
    }

    /// Append an exceptional exit
    pub fn unwind(&mut self, exception: NodeId) -> CompilationResult<NodeId> {
        self.append(Node::new(NodeKind::Unwind).with_inputs(vec![exception]))
    }

    /// Append an unconditional deoptimization
    pub fn deoptimize(&mut self, action: DeoptAction) -> CompilationResult<NodeId> {
        self.append(Node::new(NodeKind::Deoptimize { action }))
    }

    /// Mutable access to the graph under construction
    pub fn graph_mut(&mut self) -> &mut Graph {
        &mut self.graph
    }

    /// Verify and return the graph
    pub fn finish(self) -> CompilationResult<Graph> {
        self.graph.verify()?;
        Ok(self.graph)
    }
}
