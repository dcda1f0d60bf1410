//! Configuration Stack: branch points recorded for backtracking.
//!
//! A [`Configuration`] is a small `Copy` record. The Stack Set it was taken from is interned in a [`FrameArena`]
//! as a parent-linked chain of frames, so configurations pushed from similar stacks share their common prefix.

use std::collections::HashMap;

use retrace_core::{ActionCode, ParseTable, SymbolId, TokenIndex};

use crate::stacks::{Frame, StackSet};

/// Handle of an interned frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

#[derive(Debug, Clone)]
struct Node {
    frame: Frame,
    parent: Option<NodeId>,
}

/// Deduplicating store of stack snapshots.
///
/// A snapshot is the id of its top frame; walking `parent` links reaches the bottom.
#[derive(Debug, Clone, Default)]
pub struct FrameArena {
    nodes: Vec<Node>,
    interned: HashMap<(Option<NodeId>, Frame), NodeId>,
}

impl FrameArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern every level of `stacks`. Returns `None` for an empty stack.
    pub fn intern(&mut self, stacks: &StackSet) -> Option<NodeId> {
        let mut parent = None;
        for frame in stacks.frames() {
            parent = Some(self.intern_frame(parent, frame));
        }
        parent
    }

    fn intern_frame(&mut self, parent: Option<NodeId>, frame: Frame) -> NodeId {
        let nodes = &mut self.nodes;
        *self.interned.entry((parent, frame)).or_insert_with(|| {
            nodes.push(Node { frame, parent });
            NodeId((nodes.len() - 1) as u32)
        })
    }

    /// Replace the contents of `stacks` with the snapshot `top`.
    pub fn restore(&self, top: Option<NodeId>, stacks: &mut StackSet) {
        let mut chain: Vec<Frame> = self.chain(top).collect();
        chain.reverse();
        stacks.clear();
        for frame in chain {
            stacks.push(frame);
        }
    }

    /// Whether the snapshot `top` holds the same states and locations as `stacks`.
    pub fn matches(&self, top: Option<NodeId>, stacks: &StackSet) -> bool {
        let mut chain = self.chain(top);
        for level in (0..stacks.len()).rev() {
            match chain.next() {
                Some(frame) if frame.same_position(&stacks.frame(level)) => {}
                _ => return false,
            }
        }
        chain.next().is_none()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Forget every snapshot. Ids handed out earlier become invalid.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.interned.clear();
    }

    /// Frames from top to bottom.
    fn chain(&self, top: Option<NodeId>) -> impl Iterator<Item = Frame> + '_ {
        std::iter::successors(top, |id| self.nodes[id.0 as usize].parent).map(|id| self.nodes[id.0 as usize].frame)
    }
}

/// Parser position outside the Stack Set, captured together with a branch point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint {
    /// Token Sequence length.
    pub token_count: usize,
    /// Token being looked at.
    pub lookahead: TokenIndex,
    pub lookahead_kind: SymbolId,
    /// Stream position of the token after `lookahead`.
    pub resume: TokenIndex,
    /// Action-log length.
    pub action_count: usize,
    /// Pending-queue length.
    pub undo_count: usize,
}

/// A branch point: a snapshot plus the next untried conflict alternative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Configuration {
    snapshot: Option<NodeId>,
    /// Stack Set length at the branch point.
    pub depth: usize,
    /// Index into the conflict lists of the next alternative to try.
    pub next_alternative: ActionCode,
    pub checkpoint: Checkpoint,
}

/// Stack of branch points, most recent last.
#[derive(Debug, Clone, Default)]
pub struct ConfigurationStack {
    arena: FrameArena,
    entries: Vec<Configuration>,
}

impl ConfigurationStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a branch point whose next alternative is the conflict slot `next_alternative`.
    pub fn push(&mut self, stacks: &StackSet, next_alternative: ActionCode, checkpoint: Checkpoint) {
        let snapshot = self.arena.intern(stacks);
        self.entries.push(Configuration {
            snapshot,
            depth: stacks.len(),
            next_alternative,
            checkpoint,
        });
    }

    /// Next untried alternative of the most recent branch point, with that branch point.
    ///
    /// Branch points whose alternatives are exhausted are discarded on the way. `None` means every branch has
    /// been tried. Restoring the parser from the returned configuration is the caller's job.
    pub fn pop<T: ParseTable + ?Sized>(&mut self, table: &T) -> Option<(Configuration, ActionCode)> {
        while let Some(top) = self.entries.last_mut() {
            let code = table.base_action(top.next_alternative);
            if code == 0 {
                self.entries.pop();
                continue;
            }
            top.next_alternative += 1;
            return Some((*top, code));
        }
        None
    }

    /// Whether a branch point already exists for the same stack contents, token position and lookahead.
    ///
    /// Only states and locations are compared, so re-entering a conflict through a reduction loop is detected.
    pub fn find_equivalent(&self, stacks: &StackSet, token_count: usize, lookahead: TokenIndex) -> bool {
        self.entries.iter().any(|config| {
            config.depth == stacks.len()
                && config.checkpoint.token_count == token_count
                && config.checkpoint.lookahead == lookahead
                && self.arena.matches(config.snapshot, stacks)
        })
    }

    /// Reset `stacks` to the snapshot of `config`.
    pub fn restore(&self, config: &Configuration, stacks: &mut StackSet) {
        self.arena.restore(config.snapshot, stacks);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every branch point together with the snapshots they reference.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.arena.clear();
    }
}
