//! Frame states
//!
//! A frame state snapshots the interpreter-visible state (locals, operand
//! stack, held locks) at a bytecode position. Deoptimization uses it to
//! rebuild interpreter frames; the GC uses it to find live references.

use super::NodeId;
use core_types::{MethodId, ValueKind};

/// Position a frame state describes.
///
/// Graphs built for inlining tag the states at their boundaries instead of
/// using a concrete bci, because the caller-side position is only known
/// once the graph is spliced into a call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bci {
    /// A concrete bytecode index
    At(u32),
    /// State on entry to the method, before its first instruction
    BeforeCall,
    /// State after the method has returned to its caller
    AfterCall,
}

/// Contents of a frame state node
#[derive(Debug, Clone, PartialEq)]
pub struct FrameStateData {
    /// Method whose frame is described
    pub method: MethodId,
    /// Position in that method
    pub bci: Bci,
    /// Local variable slots, `None` for dead or uninitialized slots
    pub locals: Vec<Option<NodeId>>,
    /// Operand stack, bottom first
    pub stack: Vec<NodeId>,
    /// Objects of the held locks, outermost first
    pub locks: Vec<NodeId>,
    /// Resume by rethrowing the exception on top of the stack
    pub rethrow_exception: bool,
    /// State of the caller's frame when this frame was inlined
    pub outer: Option<NodeId>,
}

impl FrameStateData {
    /// Create an empty state
    pub fn new(method: MethodId, bci: Bci) -> Self {
        Self {
            method,
            bci,
            locals: Vec::new(),
            stack: Vec::new(),
            locks: Vec::new(),
            rethrow_exception: false,
            outer: None,
        }
    }

    /// Set the local slots
    pub fn with_locals(mut self, locals: Vec<Option<NodeId>>) -> Self {
        self.locals = locals;
        self
    }

    /// Set the operand stack
    pub fn with_stack(mut self, stack: Vec<NodeId>) -> Self {
        self.stack = stack;
        self
    }

    /// Set the held locks
    pub fn with_locks(mut self, locks: Vec<NodeId>) -> Self {
        self.locks = locks;
        self
    }

    /// Number of held locks
    pub fn locks_size(&self) -> usize {
        self.locks.len()
    }

    /// Number of operand stack entries
    pub fn stack_size(&self) -> usize {
        self.stack.len()
    }

    /// Copy of this state at `bci`, with the value of kind `pop_kind` removed
    /// from the top of the stack and `pushed` appended.
    ///
    /// Deriving the state before a call from the state after it pops the
    /// call's result and pushes the call's arguments back.
    pub fn duplicate_modified(
        &self,
        bci: u32,
        rethrow_exception: bool,
        pop_kind: ValueKind,
        pushed: &[NodeId],
    ) -> Self {
        let mut stack = self.stack.clone();
        if !pop_kind.is_void() {
            stack.pop();
        }
        stack.extend_from_slice(pushed);
        Self {
            method: self.method,
            bci: Bci::At(bci),
            locals: self.locals.clone(),
            stack,
            locks: self.locks.clone(),
            rethrow_exception,
            outer: self.outer,
        }
    }

    /// All referenced nodes, including the outer state
    pub fn value_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.locals
            .iter()
            .flatten()
            .chain(self.stack.iter())
            .chain(self.locks.iter())
            .chain(self.outer.iter())
            .copied()
    }

    pub(crate) fn value_slots_mut(&mut self) -> Vec<&mut NodeId> {
        let mut slots: Vec<&mut NodeId> = self.locals.iter_mut().flatten().collect();
        slots.extend(self.stack.iter_mut());
        slots.extend(self.locks.iter_mut());
        slots.extend(self.outer.iter_mut());
        slots
    }

    pub(crate) fn clear_values(&mut self) {
        self.locals.clear();
        self.stack.clear();
        self.locks.clear();
        self.outer = None;
    }
}
