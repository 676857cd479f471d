//! Arena-backed IR graph and its editing primitives.

use super::node::{Node, NodeId, NodeKind, Stamp};
use core_types::{CompilationError, CompilationResult, MethodId, ValueKind};
use std::collections::{HashMap, HashSet};

/// A mutable IR graph of one method.
///
/// Nodes live in an arena indexed by [`NodeId`]. Deleting a node marks its
/// slot dead; ids are never reused within a graph.
#[derive(Debug, Clone)]
pub struct Graph {
    method: MethodId,
    nodes: Vec<Node>,
    start: NodeId,
}

impl Graph {
    /// Create a graph containing only its `Start` node
    pub fn new(method: MethodId) -> Self {
        let start = Node::new(NodeKind::Start);
        Self {
            method,
            nodes: vec![start],
            start: NodeId(0),
        }
    }

    /// Method this graph was built for
    pub fn method(&self) -> MethodId {
        self.method
    }

    /// Entry node
    pub fn start(&self) -> NodeId {
        self.start
    }

    /// Frame state on entry to the method
    pub fn start_state(&self) -> Option<NodeId> {
        self.get(self.start).and_then(Node::state_after)
    }

    /// Add a node and return its id
    pub fn add(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    /// Live node by id, `None` if unknown or deleted
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index()).filter(|n| !n.deleted)
    }

    /// Live node by id
    pub fn node(&self, id: NodeId) -> CompilationResult<&Node> {
        self.get(id).ok_or_else(|| self.dangling(id))
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> CompilationResult<&mut Node> {
        let method = self.method;
        self.nodes
            .get_mut(id.index())
            .filter(|n| !n.deleted)
            .ok_or_else(|| {
                CompilationError::malformed(format!("{id} is not a live node of {method}"))
            })
    }

    fn dangling(&self, id: NodeId) -> CompilationError {
        CompilationError::malformed(format!("{id} is not a live node of {}", self.method))
    }

    /// Whether `id` names a live node
    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    /// Whether `id` names a node that existed and has been deleted
    pub fn is_deleted(&self, id: NodeId) -> bool {
        self.nodes.get(id.index()).is_some_and(|n| n.deleted)
    }

    /// Ids of all live nodes in creation order
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| !n.deleted)
            .map(|(i, _)| NodeId(i as u32))
    }

    /// Number of live nodes
    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|n| !n.deleted).count()
    }

    /// Whether the graph has no live nodes
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Live nodes satisfying `predicate`, in creation order
    pub fn nodes_matching(&self, predicate: impl Fn(&Node) -> bool) -> Vec<NodeId> {
        self.node_ids()
            .filter(|&id| self.get(id).is_some_and(&predicate))
            .collect()
    }

    /// All live call nodes
    pub fn invokes(&self) -> Vec<NodeId> {
        self.nodes_matching(|n| matches!(n.kind, NodeKind::Invoke(_)))
    }

    /// First control successor of a node
    pub fn next(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(Node::next)
    }

    /// Exception-edge successor of a call node
    pub fn exception_edge(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(Node::exception_edge)
    }

    /// Set successor slot `slot` of `id`, keeping predecessor links in sync.
    ///
    /// The previous occupant of the slot loses its predecessor. The new
    /// successor must not already have a different predecessor.
    pub fn set_successor(
        &mut self,
        id: NodeId,
        slot: usize,
        successor: Option<NodeId>,
    ) -> CompilationResult<()> {
        if let Some(new) = successor {
            let current = self.node(new)?.predecessor;
            if current.is_some_and(|p| p != id) {
                return Err(CompilationError::malformed(format!(
                    "{new} already has a predecessor"
                )));
            }
        }

        let node = self.node_mut(id)?;
        let previous = match node.successors.get_mut(slot) {
            Some(entry) => std::mem::replace(entry, successor),
            None => {
                return Err(CompilationError::malformed(format!(
                    "{} node {id} has no successor slot {slot}",
                    node.kind.name()
                )))
            }
        };

        if let Some(old) = previous {
            if let Some(old_node) = self.nodes.get_mut(old.index()) {
                if old_node.predecessor == Some(id) {
                    old_node.predecessor = None;
                }
            }
        }
        if let Some(new) = successor {
            self.node_mut(new)?.predecessor = Some(id);
        }
        Ok(())
    }

    /// Set the first control successor
    pub fn set_next(&mut self, id: NodeId, next: Option<NodeId>) -> CompilationResult<()> {
        self.set_successor(id, 0, next)
    }

    /// Make `replacement` take `old`'s place as successor of `old`'s
    /// predecessor. `old` is left without a predecessor.
    pub fn replace_at_predecessor(
        &mut self,
        old: NodeId,
        replacement: Option<NodeId>,
    ) -> CompilationResult<()> {
        let Some(predecessor) = self.node(old)?.predecessor else {
            return Ok(());
        };
        let slot = self
            .node(predecessor)?
            .successors
            .iter()
            .position(|s| *s == Some(old))
            .ok_or_else(|| {
                CompilationError::malformed(format!(
                    "{predecessor} is recorded as predecessor of {old} but does not point to it"
                ))
            })?;
        self.set_successor(predecessor, slot, replacement)
    }

    /// Set the frame state after a node
    pub fn set_state_after(&mut self, id: NodeId, state: Option<NodeId>) -> CompilationResult<()> {
        if let Some(state) = state {
            if self.node(state)?.as_frame_state().is_none() {
                return Err(CompilationError::malformed(format!(
                    "{state} is not a frame state"
                )));
            }
        }
        self.node_mut(id)?.state_after = state;
        Ok(())
    }

    /// Replace the stamp of a node
    pub fn set_stamp(&mut self, id: NodeId, stamp: Stamp) -> CompilationResult<()> {
        self.node_mut(id)?.stamp = stamp;
        Ok(())
    }

    /// Set the relative execution frequency of a node
    pub fn set_probability(&mut self, id: NodeId, probability: f64) -> CompilationResult<()> {
        self.node_mut(id)?.probability = probability;
        Ok(())
    }

    /// Mark whether a call node may be inlined
    pub fn set_can_inline(&mut self, id: NodeId, can_inline: bool) -> CompilationResult<()> {
        match &mut self.node_mut(id)?.kind {
            NodeKind::Invoke(data) => {
                data.can_inline = can_inline;
                Ok(())
            }
            other => Err(CompilationError::malformed(format!(
                "{id} is a {} node, not a call",
                other.name()
            ))),
        }
    }

    /// Live nodes reading `id`, in creation order
    pub fn usages(&self, id: NodeId) -> Vec<NodeId> {
        self.node_ids()
            .filter(|&user| {
                self.get(user)
                    .is_some_and(|n| n.input_ids().contains(&id))
            })
            .collect()
    }

    /// Replace every occurrence of `old` among the inputs of `user`
    pub fn replace_input(
        &mut self,
        user: NodeId,
        old: NodeId,
        new: NodeId,
    ) -> CompilationResult<()> {
        for slot in self.node_mut(user)?.input_slots_mut() {
            if *slot == old {
                *slot = new;
            }
        }
        Ok(())
    }

    /// Redirect every user of `old` to `new`
    pub fn replace_at_usages(&mut self, old: NodeId, new: NodeId) -> CompilationResult<()> {
        self.node(new)?;
        for user in self.usages(old) {
            self.replace_input(user, old, new)?;
        }
        Ok(())
    }

    /// Clear all inputs of a node, returning what it read
    pub fn clear_inputs(&mut self, id: NodeId) -> CompilationResult<Vec<NodeId>> {
        let node = self.node_mut(id)?;
        let inputs = node.input_ids();
        node.clear_inputs();
        Ok(inputs)
    }

    /// Delete a node that nothing reads anymore.
    ///
    /// The node is unlinked from its predecessor and successors first.
    pub fn delete(&mut self, id: NodeId) -> CompilationResult<()> {
        let users = self.usages(id);
        if !users.is_empty() {
            return Err(CompilationError::malformed(format!(
                "cannot delete {id}, still used by {users:?}"
            )));
        }
        self.replace_at_predecessor(id, None)?;
        let slots = self.node(id)?.successors.len();
        for slot in 0..slots {
            self.set_successor(id, slot, None)?;
        }
        let node = self.node_mut(id)?;
        node.clear_inputs();
        node.deleted = true;
        Ok(())
    }

    /// Redirect the users of `old` to `new`, then delete `old`
    pub fn replace_and_delete(&mut self, old: NodeId, new: NodeId) -> CompilationResult<()> {
        self.replace_at_usages(old, new)?;
        self.delete(old)
    }

    /// Delete the floating nodes among `candidates` that nothing reads,
    /// then whatever becomes unused through them. Parameters are kept.
    pub fn remove_unused_floating(&mut self, candidates: Vec<NodeId>) {
        let mut worklist = candidates;
        while let Some(id) = worklist.pop() {
            let removable = self.get(id).is_some_and(|n| {
                !n.is_fixed() && !matches!(n.kind, NodeKind::Local { .. })
            });
            if !removable || !self.usages(id).is_empty() {
                continue;
            }
            let node = &mut self.nodes[id.index()];
            worklist.extend(node.input_ids());
            node.clear_inputs();
            node.deleted = true;
        }
    }

    /// Delete the control-flow subgraph reachable from `root`, together with
    /// the floating nodes only it used.
    ///
    /// `root` is detached from its predecessor first. Floating nodes that
    /// read a killed node are deleted as well. A killed end is removed from
    /// its merge, and a merge left without ends is killed in turn.
    pub fn kill_cfg(&mut self, root: NodeId) -> CompilationResult<()> {
        self.replace_at_predecessor(root, None)?;

        let mut visited = HashSet::new();
        let mut worklist = vec![root];
        let mut killed = Vec::new();
        while let Some(id) = worklist.pop() {
            if !visited.insert(id) {
                continue;
            }
            let node = self.node(id)?;
            worklist.extend(node.successors.iter().flatten().copied());
            killed.push(id);
        }

        let mut floating = Vec::new();
        let mut emptied = Vec::new();
        for &end in &killed {
            if !matches!(self.node(end)?.kind, NodeKind::End) {
                continue;
            }
            for merge in self.usages(end) {
                if visited.contains(&merge) || !matches!(self.node(merge)?.kind, NodeKind::Merge) {
                    continue;
                }
                if self.remove_merge_end(merge, end, &mut floating)? {
                    emptied.push(merge);
                }
            }
        }

        for &id in &killed {
            let node = &mut self.nodes[id.index()];
            floating.extend(node.input_ids());
            node.clear_inputs();
            node.successors.iter_mut().for_each(|s| *s = None);
            node.predecessor = None;
            node.deleted = true;
        }

        self.remove_dangling_floating();
        self.remove_unused_floating(floating);
        for merge in emptied {
            if self.contains(merge) {
                self.kill_cfg(merge)?;
            }
        }
        Ok(())
    }

    /// Phis of `merge`, in creation order
    pub fn phis(&self, merge: NodeId) -> Vec<NodeId> {
        self.nodes_matching(|n| {
            matches!(n.kind, NodeKind::Phi) && n.inputs.first() == Some(&merge)
        })
    }

    /// Drop `end` from `merge` and the matching value from each of its phis.
    /// Dropped values are added to `dropped`. Returns whether the merge has
    /// no ends left.
    fn remove_merge_end(
        &mut self,
        merge: NodeId,
        end: NodeId,
        dropped: &mut Vec<NodeId>,
    ) -> CompilationResult<bool> {
        let Some(index) = self.node(merge)?.inputs.iter().position(|&e| e == end) else {
            return Ok(false);
        };
        self.node_mut(merge)?.inputs.remove(index);
        for phi in self.phis(merge) {
            let inputs = &mut self.node_mut(phi)?.inputs;
            if index + 1 < inputs.len() {
                dropped.push(inputs.remove(index + 1));
            }
        }
        Ok(self.node(merge)?.inputs.is_empty())
    }

    /// Join several exits of the same kind (`Return` or `Unwind`) into one.
    ///
    /// Each exit is replaced by an `End` flowing into a new `Merge`, which
    /// is followed by a single exit of that kind. When the exits carry
    /// values, the new exit reads a `Phi` of them. Returns the new exit.
    pub fn merge_exits(&mut self, exits: &[NodeId]) -> CompilationResult<NodeId> {
        let Some(&first) = exits.first() else {
            return Err(CompilationError::invariant("no exits to merge"));
        };
        let kind = self.node(first)?.kind.clone();
        if !matches!(kind, NodeKind::Return | NodeKind::Unwind) {
            return Err(CompilationError::invariant(format!(
                "{first} is a {} node, not an exit",
                kind.name()
            )));
        }

        let mut ends = Vec::with_capacity(exits.len());
        let mut values = Vec::with_capacity(exits.len());
        let mut probability = 0.0;
        for &exit in exits {
            let node = self.node(exit)?;
            if node.kind != kind {
                return Err(CompilationError::malformed(format!(
                    "cannot merge {} {exit} with {} exits",
                    node.kind.name(),
                    kind.name()
                )));
            }
            let exit_probability = node.probability;
            values.extend(node.inputs.first().copied());
            probability += exit_probability;
            let end = self.add(Node::new(NodeKind::End));
            self.set_probability(end, exit_probability)?;
            self.replace_at_predecessor(exit, Some(end))?;
            self.clear_inputs(exit)?;
            self.delete(exit)?;
            ends.push(end);
        }

        let merge = self.add(Node::new(NodeKind::Merge).with_inputs(ends));
        self.set_probability(merge, probability)?;
        let exit_inputs = match values.len() {
            0 => Vec::new(),
            n if n == exits.len() => {
                let stamp = Stamp::of(self.node(values[0])?.stamp.kind);
                let phi = self.add(
                    Node::new(NodeKind::Phi)
                        .with_inputs(std::iter::once(merge).chain(values).collect())
                        .with_stamp(stamp),
                );
                vec![phi]
            }
            _ => {
                return Err(CompilationError::malformed(format!(
                    "only some {} exits carry a value",
                    kind.name()
                )))
            }
        };
        let exit = self.add(Node::new(kind).with_inputs(exit_inputs));
        self.set_probability(exit, probability)?;
        self.set_next(merge, Some(exit))?;
        Ok(exit)
    }

    fn remove_dangling_floating(&mut self) {
        loop {
            let dangling: Vec<NodeId> = self.nodes_matching(|n| {
                !n.is_fixed() && n.input_ids().iter().any(|&i| self.is_deleted(i))
            });
            if dangling.is_empty() {
                return;
            }
            for id in dangling {
                let node = &mut self.nodes[id.index()];
                node.clear_inputs();
                node.deleted = true;
            }
        }
    }

    /// Copy `nodes` of `source` into this graph in one batch.
    ///
    /// Inputs are rewritten to the copies when the input is among `nodes`,
    /// otherwise to its entry in `replacements`. An input found in neither
    /// is an error. Control edges to nodes outside the batch are dropped.
    /// Returns the mapping from source ids to new ids.
    pub fn add_duplicates(
        &mut self,
        source: &Graph,
        nodes: &[NodeId],
        replacements: &HashMap<NodeId, NodeId>,
    ) -> CompilationResult<HashMap<NodeId, NodeId>> {
        let mut mapping = HashMap::with_capacity(nodes.len());
        let base = self.nodes.len() as u32;
        for (offset, &old) in nodes.iter().enumerate() {
            source.node(old)?;
            mapping.insert(old, NodeId(base + offset as u32));
        }

        let mut copies = Vec::with_capacity(nodes.len());
        for &old in nodes {
            let mut copy = source.node(old)?.clone();
            for slot in copy.input_slots_mut() {
                let input = *slot;
                *slot = mapping
                    .get(&input)
                    .or_else(|| replacements.get(&input))
                    .copied()
                    .ok_or_else(|| {
                        CompilationError::malformed(format!(
                            "input {input} of {old} in {} is neither duplicated nor replaced",
                            source.method
                        ))
                    })?;
            }
            for successor in copy.successors.iter_mut() {
                *successor = successor.and_then(|s| mapping.get(&s).copied());
            }
            copy.predecessor = copy.predecessor.and_then(|p| mapping.get(&p).copied());
            copies.push(copy);
        }

        self.nodes.extend(copies);
        Ok(mapping)
    }

    /// Add a copy of frame state `state` at `bci`, with the result of kind
    /// `pop_kind` popped and `pushed` appended to the stack
    pub fn duplicate_frame_state_modified(
        &mut self,
        state: NodeId,
        bci: u32,
        rethrow_exception: bool,
        pop_kind: ValueKind,
        pushed: &[NodeId],
    ) -> CompilationResult<NodeId> {
        let data = self
            .node(state)?
            .as_frame_state()
            .ok_or_else(|| CompilationError::malformed(format!("{state} is not a frame state")))?
            .duplicate_modified(bci, rethrow_exception, pop_kind, pushed);
        Ok(self.add(Node::new(NodeKind::FrameState(Box::new(data)))))
    }

    /// Check that every edge of a live node points at a live node and that
    /// control edges are symmetric
    pub fn verify(&self) -> CompilationResult<()> {
        for id in self.node_ids() {
            let node = self.node(id)?;
            for input in node.input_ids() {
                if !self.contains(input) {
                    return Err(CompilationError::malformed(format!(
                        "{id} ({}) reads dead node {input}",
                        node.kind.name()
                    )));
                }
            }
            for successor in node.successors.iter().flatten() {
                let successor_node = self.node(*successor)?;
                if successor_node.predecessor != Some(id) {
                    return Err(CompilationError::malformed(format!(
                        "{successor} follows {id} but records predecessor {:?}",
                        successor_node.predecessor
                    )));
                }
            }
            if matches!(node.kind, NodeKind::Merge) {
                for &end in &node.inputs {
                    if !matches!(self.node(end)?.kind, NodeKind::End) {
                        return Err(CompilationError::malformed(format!(
                            "merge {id} joins {end}, which is not an end"
                        )));
                    }
                }
            }
            if let Some(predecessor) = node.predecessor {
                if !self.node(predecessor)?.successors.contains(&Some(id)) {
                    return Err(CompilationError::malformed(format!(
                        "{id} records predecessor {predecessor} which does not point to it"
                    )));
                }
            }
        }
        Ok(())
    }
}
