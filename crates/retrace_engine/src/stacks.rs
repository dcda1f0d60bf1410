//! The Stack Set: parser progress at every open depth.
//!
//! Four index-aligned vectors hold, per level, the automaton state, the Token Sequence length, the action-log
//! length and the pending-queue length at the moment the level was pushed. The lengths are what rollback and
//! recovery rewind to.

use retrace_core::{ActionCode, TokenIndex};

/// One level of the Stack Set, as a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Frame {
    pub state: ActionCode,
    /// Token Sequence length when the level was pushed.
    pub location: usize,
    /// Action-log length when the level was pushed.
    pub action_count: usize,
    /// Pending-queue length when the level was pushed.
    pub undo_marker: usize,
}

impl Frame {
    pub fn new(state: ActionCode, location: usize, action_count: usize, undo_marker: usize) -> Self {
        Self {
            state,
            location,
            action_count,
            undo_marker,
        }
    }

    /// Whether two frames describe the same parser position, ignoring the bookkeeping counts.
    pub fn same_position(&self, other: &Frame) -> bool {
        self.state == other.state && self.location == other.location
    }
}

/// Growable stack of parser levels stored as parallel vectors.
///
/// ## Notes
/// - The four vectors only change together through [`StackSet::push`] and [`StackSet::truncate`], so they always
///   have the same length.
/// - Index `0` is the bottom (start state); [`StackSet::top`] is the index of the last level.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StackSet {
    state: Vec<ActionCode>,
    location: Vec<usize>,
    action_count: Vec<usize>,
    undo_marker: Vec<usize>,
}

impl StackSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            state: Vec::with_capacity(capacity),
            location: Vec::with_capacity(capacity),
            action_count: Vec::with_capacity(capacity),
            undo_marker: Vec::with_capacity(capacity),
        }
    }

    /// Copy of levels `0..=level`.
    pub fn prefix(&self, level: usize) -> Self {
        let end = (level + 1).min(self.len());
        Self {
            state: self.state[..end].to_vec(),
            location: self.location[..end].to_vec(),
            action_count: self.action_count[..end].to_vec(),
            undo_marker: self.undo_marker[..end].to_vec(),
        }
    }

    pub fn push(&mut self, frame: Frame) {
        self.state.push(frame.state);
        self.location.push(frame.location);
        self.action_count.push(frame.action_count);
        self.undo_marker.push(frame.undo_marker);
        debug_assert!(self.is_aligned());
    }

    /// Keep the first `len` levels.
    pub fn truncate(&mut self, len: usize) {
        self.state.truncate(len);
        self.location.truncate(len);
        self.action_count.truncate(len);
        self.undo_marker.truncate(len);
    }

    pub fn clear(&mut self) {
        self.truncate(0);
    }

    pub fn len(&self) -> usize {
        self.state.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.is_empty()
    }

    /// Index of the top level. `0` for an empty stack.
    pub fn top(&self) -> usize {
        self.len().saturating_sub(1)
    }

    pub fn state(&self, level: usize) -> ActionCode {
        self.state[level]
    }

    pub fn top_state(&self) -> ActionCode {
        self.state[self.top()]
    }

    pub fn location(&self, level: usize) -> usize {
        self.location[level]
    }

    pub fn action_count(&self, level: usize) -> usize {
        self.action_count[level]
    }

    pub fn undo_marker(&self, level: usize) -> usize {
        self.undo_marker[level]
    }

    pub fn frame(&self, level: usize) -> Frame {
        Frame::new(
            self.state[level],
            self.location[level],
            self.action_count[level],
            self.undo_marker[level],
        )
    }

    /// Frames from bottom to top.
    pub fn frames(&self) -> impl DoubleEndedIterator<Item = Frame> + '_ {
        (0..self.len()).map(|level| self.frame(level))
    }

    /// States from bottom to top.
    pub fn states(&self) -> &[ActionCode] {
        &self.state
    }

    fn is_aligned(&self) -> bool {
        let len = self.state.len();
        self.location.len() == len && self.action_count.len() == len && self.undo_marker.len() == len
    }
}

/// Token position a level was pushed at, mapped through `tokens` when it points inside the Token Sequence.
pub(crate) fn token_after(stacks: &StackSet, level: usize, tokens: &[TokenIndex]) -> Option<TokenIndex> {
    tokens.get(stacks.location(level)).copied()
}
