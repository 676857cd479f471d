//! IR node representation

use super::frame_state::FrameStateData;
use crate::deopt::{DeoptAction, DeoptReason};
use core_types::{MethodRef, TypeId, TypeRef, ValueKind};
use std::fmt;

/// Stable handle of a node inside one [`super::Graph`].
///
/// Ids are arena indices. They are never reused, so a handle to a deleted
/// node stays distinguishable from every live node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Arena index of this node
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Constant values
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConstantValue {
    /// 32-bit integer
    Int(i32),
    /// 64-bit integer
    Long(i64),
    /// 64-bit float
    Double(f64),
    /// The null reference
    Null,
}

impl ConstantValue {
    /// Value kind of the constant
    pub fn kind(self) -> ValueKind {
        match self {
            ConstantValue::Int(_) => ValueKind::Int,
            ConstantValue::Long(_) => ValueKind::Long,
            ConstantValue::Double(_) => ValueKind::Double,
            ConstantValue::Null => ValueKind::Object,
        }
    }
}

/// Binary arithmetic operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticOp {
    /// Addition
    Add,
    /// Subtraction
    Sub,
    /// Multiplication
    Mul,
}

/// How a call dispatches to its target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvokeKind {
    /// No receiver
    Static,
    /// Receiver present, target fixed (constructors, private, super calls)
    Special,
    /// Receiver present, dispatch on the receiver's class
    Virtual,
    /// Receiver present, dispatch through an interface
    Interface,
}

/// The method a call node targets
#[derive(Debug, Clone, PartialEq)]
pub struct CallTarget {
    /// Declared target
    pub target: MethodRef,
    /// Dispatch kind
    pub invoke_kind: InvokeKind,
    /// Kind of the value the call produces
    pub return_kind: ValueKind,
}

impl CallTarget {
    /// Create a call target
    pub fn new(target: MethodRef, invoke_kind: InvokeKind, return_kind: ValueKind) -> Self {
        Self {
            target,
            invoke_kind,
            return_kind,
        }
    }

    /// Whether the call has no receiver argument
    pub fn is_static(&self) -> bool {
        self.invoke_kind == InvokeKind::Static
    }
}

/// Call-site attributes of an invoke node
#[derive(Debug, Clone, PartialEq)]
pub struct InvokeData {
    /// Call target
    pub call_target: CallTarget,
    /// Bytecode index of the call in the caller
    pub bci: u32,
    /// Cleared when an earlier phase decided the call must stay a call
    pub can_inline: bool,
}

/// Lock access direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorOp {
    /// Acquire
    Enter,
    /// Release
    Exit,
}

/// The operation a node performs.
///
/// Fixed nodes are ordered by control flow (they have a predecessor and
/// successors); floating nodes are ordered only by their data inputs.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Graph entry; `state_after` is the entry frame state
    Start,
    /// Start of a control-flow block
    Begin,
    /// Parameter placeholder, numbered positionally
    Local {
        /// Parameter position
        index: usize,
    },
    /// Constant value
    Constant(ConstantValue),
    /// Binary arithmetic on inputs 0 and 1
    Arithmetic(ArithmeticOp),
    /// Call site; inputs are the arguments, successor 1 is the exception
    /// edge when present
    Invoke(Box<InvokeData>),
    /// Normal exit; optional input 0 is the returned value
    Return,
    /// Exceptional exit; input 0 is the exception
    Unwind,
    /// Entry of an exception handler, produces the caught exception
    ExceptionObject,
    /// Deoptimization state snapshot
    FrameState(Box<FrameStateData>),
    /// Lock acquire or release on input 0
    AccessMonitor {
        /// Acquire or release
        op: MonitorOp,
        /// Lock slot in the frame
        lock_index: usize,
    },
    /// True when input 0 has exactly the given type
    IsType {
        /// Tested type
        type_id: TypeId,
    },
    /// True when input 0 is (or is not) null
    NullCheck {
        /// Expected outcome
        expected_null: bool,
    },
    /// Continues only if condition input 0 holds, deoptimizes otherwise
    FixedGuard {
        /// Reason recorded when the guard fails
        reason: DeoptReason,
        /// Action taken when the guard fails
        action: DeoptAction,
    },
    /// Two-way branch on condition input 0
    If,
    /// Last node of a block that flows into a [`NodeKind::Merge`]
    End,
    /// Joins control flow; the inputs are the incoming ends in order
    Merge,
    /// Value chosen by the incoming end of the merge in input 0; input
    /// `i + 1` belongs to end `i`
    Phi,
    /// Unconditional transfer to the interpreter
    Deoptimize {
        /// Action taken
        action: DeoptAction,
    },
}

impl NodeKind {
    /// Whether nodes of this kind participate in control flow
    pub fn is_fixed(&self) -> bool {
        matches!(
            self,
            NodeKind::Start
                | NodeKind::Begin
                | NodeKind::Invoke(_)
                | NodeKind::Return
                | NodeKind::Unwind
                | NodeKind::ExceptionObject
                | NodeKind::AccessMonitor { .. }
                | NodeKind::FixedGuard { .. }
                | NodeKind::If
                | NodeKind::End
                | NodeKind::Merge
                | NodeKind::Deoptimize { .. }
        )
    }

    /// Number of successor slots a fresh node of this kind has
    fn successor_count(&self) -> usize {
        match self {
            NodeKind::Start
            | NodeKind::Begin
            | NodeKind::Invoke(_)
            | NodeKind::ExceptionObject
            | NodeKind::AccessMonitor { .. }
            | NodeKind::FixedGuard { .. }
            | NodeKind::Merge => 1,
            NodeKind::If => 2,
            _ => 0,
        }
    }

    /// Short name for diagnostics
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Start => "Start",
            NodeKind::Begin => "Begin",
            NodeKind::Local { .. } => "Local",
            NodeKind::Constant(_) => "Constant",
            NodeKind::Arithmetic(_) => "Arithmetic",
            NodeKind::Invoke(_) => "Invoke",
            NodeKind::Return => "Return",
            NodeKind::Unwind => "Unwind",
            NodeKind::ExceptionObject => "ExceptionObject",
            NodeKind::FrameState(_) => "FrameState",
            NodeKind::AccessMonitor { .. } => "AccessMonitor",
            NodeKind::IsType { .. } => "IsType",
            NodeKind::NullCheck { .. } => "NullCheck",
            NodeKind::FixedGuard { .. } => "FixedGuard",
            NodeKind::If => "If",
            NodeKind::End => "End",
            NodeKind::Merge => "Merge",
            NodeKind::Phi => "Phi",
            NodeKind::Deoptimize { .. } => "Deoptimize",
        }
    }
}

/// What is statically known about the value a node produces
#[derive(Debug, Clone, PartialEq)]
pub struct Stamp {
    /// Machine kind
    pub kind: ValueKind,
    /// Static type, possibly a supertype of the runtime type
    pub declared_type: Option<TypeRef>,
    /// Exact runtime type, when type propagation proved it
    pub exact_type: Option<TypeId>,
    /// Proven never to be null
    pub non_null: bool,
}

impl Stamp {
    /// Stamp of nodes without a value
    pub fn void() -> Self {
        Self::of(ValueKind::Void)
    }

    /// Stamp of a value of the given kind with no type information
    pub fn of(kind: ValueKind) -> Self {
        Self {
            kind,
            declared_type: None,
            exact_type: None,
            non_null: false,
        }
    }

    /// Object stamp with a declared type
    pub fn object(declared_type: Option<TypeRef>) -> Self {
        Self {
            declared_type,
            ..Self::of(ValueKind::Object)
        }
    }

    /// Mark the exact runtime type
    pub fn with_exact_type(mut self, type_id: TypeId) -> Self {
        self.exact_type = Some(type_id);
        self
    }

    /// Mark the value as never null
    pub fn non_null(mut self) -> Self {
        self.non_null = true;
        self
    }
}

impl Default for Stamp {
    fn default() -> Self {
        Self::void()
    }
}

/// Single IR node
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub(crate) kind: NodeKind,
    pub(crate) inputs: Vec<NodeId>,
    pub(crate) successors: Vec<Option<NodeId>>,
    pub(crate) predecessor: Option<NodeId>,
    pub(crate) state_after: Option<NodeId>,
    pub(crate) stamp: Stamp,
    pub(crate) probability: f64,
    pub(crate) deleted: bool,
}

impl Node {
    /// Create a node with no inputs, empty successor slots and
    /// probability 1.0
    pub fn new(kind: NodeKind) -> Self {
        let successors = vec![None; kind.successor_count()];
        Self {
            kind,
            inputs: Vec::new(),
            successors,
            predecessor: None,
            state_after: None,
            stamp: Stamp::void(),
            probability: 1.0,
            deleted: false,
        }
    }

    /// Set the data inputs
    pub fn with_inputs(mut self, inputs: Vec<NodeId>) -> Self {
        self.inputs = inputs;
        self
    }

    /// Set the stamp
    pub fn with_stamp(mut self, stamp: Stamp) -> Self {
        self.stamp = stamp;
        self
    }

    /// Set the frame state describing the state after this node
    pub fn with_state_after(mut self, state: NodeId) -> Self {
        self.state_after = Some(state);
        self
    }

    /// Add an exception-edge successor slot (invokes only)
    pub fn with_exception_edge(mut self) -> Self {
        if matches!(self.kind, NodeKind::Invoke(_)) && self.successors.len() == 1 {
            self.successors.push(None);
        }
        self
    }

    /// The operation
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// Data inputs, excluding the frame state
    pub fn inputs(&self) -> &[NodeId] {
        &self.inputs
    }

    /// Control successors
    pub fn successors(&self) -> &[Option<NodeId>] {
        &self.successors
    }

    /// First control successor
    pub fn next(&self) -> Option<NodeId> {
        self.successors.first().copied().flatten()
    }

    /// Control predecessor
    pub fn predecessor(&self) -> Option<NodeId> {
        self.predecessor
    }

    /// Frame state after this node
    pub fn state_after(&self) -> Option<NodeId> {
        self.state_after
    }

    /// Value information
    pub fn stamp(&self) -> &Stamp {
        &self.stamp
    }

    /// Relative execution frequency
    pub fn probability(&self) -> f64 {
        self.probability
    }

    /// Whether the node participates in control flow
    pub fn is_fixed(&self) -> bool {
        self.kind.is_fixed()
    }

    /// Invoke attributes, if this is an invoke
    pub fn as_invoke(&self) -> Option<&InvokeData> {
        match &self.kind {
            NodeKind::Invoke(data) => Some(data),
            _ => None,
        }
    }

    /// Frame state contents, if this is a frame state
    pub fn as_frame_state(&self) -> Option<&FrameStateData> {
        match &self.kind {
            NodeKind::FrameState(data) => Some(data),
            _ => None,
        }
    }

    /// Exception-edge successor of an invoke
    pub fn exception_edge(&self) -> Option<NodeId> {
        match self.kind {
            NodeKind::Invoke(_) => self.successors.get(1).copied().flatten(),
            _ => None,
        }
    }

    /// Every node this node reads: data inputs, `state_after` and frame
    /// state values
    pub fn input_ids(&self) -> Vec<NodeId> {
        let mut ids = self.inputs.clone();
        ids.extend(self.state_after);
        if let NodeKind::FrameState(state) = &self.kind {
            ids.extend(state.value_ids());
        }
        ids
    }

    pub(crate) fn input_slots_mut(&mut self) -> Vec<&mut NodeId> {
        let mut slots: Vec<&mut NodeId> = self.inputs.iter_mut().collect();
        slots.extend(self.state_after.iter_mut());
        if let NodeKind::FrameState(state) = &mut self.kind {
            slots.extend(state.value_slots_mut());
        }
        slots
    }

    pub(crate) fn clear_inputs(&mut self) {
        self.inputs.clear();
        self.state_after = None;
        if let NodeKind::FrameState(state) = &mut self.kind {
            state.clear_values();
        }
    }
}
