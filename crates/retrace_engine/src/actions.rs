//! Semantic action protocol: trial, undo and commit.
//!
//! During exploration every reduction runs its rule's trial action. A trial that returns `Ok(true)` leaves its
//! [`Rule`] in the pending queue until the branch is either abandoned (undo, most recent first) or accepted. Once a
//! parse is accepted, the engine replays the winning action log and runs commit exactly once per reduction, in
//! bottom-up order.
//!
//! ## Notes
//! - A trial returning `Err(Backtrack)` must leave no observable effect; it is never undone.
//! - The [`Rule`] handed to commit is the one its trial kept, so a payload attached during trial is visible at commit.
//!   Reductions whose trial did not keep the rule are committed with a fresh `Rule` and no payload.

use std::collections::VecDeque;
use std::ops::Range;

use retrace_core::{RuleNumber, TokenIndex};

/// Request from a trial action to abandon the current branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backtrack;

/// One reduction instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule<P> {
    pub number: RuleNumber,
    /// First Token Sequence offset covered by the rule.
    pub start: usize,
    /// One past the last Token Sequence offset covered by the rule.
    pub end: usize,
    /// Data attached by the action provider.
    pub payload: Option<P>,
}

impl<P> Rule<P> {
    pub fn new(number: RuleNumber, start: usize, end: usize) -> Self {
        Self {
            number,
            start,
            end,
            payload: None,
        }
    }

    pub fn span(&self) -> Range<usize> {
        self.start..self.end
    }

    /// The tokens this rule covers within `tokens`.
    pub fn tokens<'t>(&self, tokens: &'t [TokenIndex]) -> &'t [TokenIndex] {
        tokens.get(self.span()).unwrap_or(&[])
    }

    pub fn as_span(&self) -> RuleSpan {
        RuleSpan {
            number: self.number,
            start: self.start,
            end: self.end,
        }
    }
}

/// Payload-free identity of a reduction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RuleSpan {
    pub number: RuleNumber,
    pub start: usize,
    pub end: usize,
}

/// Receiver of semantic actions.
///
/// `tokens` is the Token Sequence at the time of the call; index it with [`Rule::span`].
pub trait ActionProvider {
    type Payload;

    /// Speculative action. `Ok(true)` keeps the rule pending so it can be undone, `Ok(false)` means there is
    /// nothing to undo, `Err(Backtrack)` rejects the branch.
    fn trial(&mut self, rule: &mut Rule<Self::Payload>, tokens: &[TokenIndex]) -> Result<bool, Backtrack>;

    /// Reverse the effect of a trial that returned `Ok(true)`.
    fn undo(&mut self, rule: &mut Rule<Self::Payload>);

    /// Final action, run once per reduction of the accepted parse.
    fn commit(&mut self, rule: &mut Rule<Self::Payload>, tokens: &[TokenIndex]);

    /// Called with the reduction about to be dispatched, and with `None` once it returns.
    fn set_active_rule(&mut self, _rule: Option<RuleSpan>) {}
}

/// Provider with no semantic actions. Parses with it only check syntax.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoActions;

impl ActionProvider for NoActions {
    type Payload = ();

    fn trial(&mut self, _rule: &mut Rule<()>, _tokens: &[TokenIndex]) -> Result<bool, Backtrack> {
        Ok(false)
    }

    fn undo(&mut self, _rule: &mut Rule<()>) {}

    fn commit(&mut self, _rule: &mut Rule<()>, _tokens: &[TokenIndex]) {}
}

pub type TrialFn<S, P> = fn(&mut S, &mut Rule<P>, &[TokenIndex]) -> Result<bool, Backtrack>;
pub type UndoFn<S, P> = fn(&mut S, &mut Rule<P>);
pub type CommitFn<S, P> = fn(&mut S, &mut Rule<P>, &[TokenIndex]);

/// The trial/undo/commit triple of one rule.
pub struct RuleHandler<S, P> {
    pub trial: TrialFn<S, P>,
    pub undo: UndoFn<S, P>,
    pub commit: CommitFn<S, P>,
}

impl<S, P> RuleHandler<S, P> {
    pub const fn new(trial: TrialFn<S, P>, undo: UndoFn<S, P>, commit: CommitFn<S, P>) -> Self {
        Self { trial, undo, commit }
    }

    /// Handler that only acts at commit time.
    pub fn commit_only(commit: CommitFn<S, P>) -> Self {
        Self {
            trial: |_, _, _| Ok(false),
            undo: |_, _| {},
            commit,
        }
    }
}

impl<S, P> Clone for RuleHandler<S, P> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S, P> Copy for RuleHandler<S, P> {}

/// Dispatch table from rule numbers to handlers, over user state `S`.
///
/// Rules without a handler keep nothing at trial and do nothing at commit.
///
/// ## Examples
/// ```rust
/// use retrace_engine::{ActionProvider, ActionTable, Rule, RuleHandler};
///
/// let mut table = ActionTable::<Vec<u32>, ()>::new(Vec::new(), 2)
///     .with_rule(2, RuleHandler::commit_only(|seen, rule, _| seen.push(rule.number)));
/// table.commit(&mut Rule::new(2, 0, 1), &[1]);
/// table.commit(&mut Rule::new(1, 0, 1), &[1]);
/// assert_eq!(table.state(), &vec![2]);
/// ```
pub struct ActionTable<S, P = ()> {
    state: S,
    handlers: Vec<Option<RuleHandler<S, P>>>,
    active: Option<RuleSpan>,
}

impl<S, P> ActionTable<S, P> {
    /// Create a table for rules `1..=rule_count` with no handlers.
    pub fn new(state: S, rule_count: u32) -> Self {
        Self {
            state,
            handlers: vec![None; rule_count as usize + 1],
            active: None,
        }
    }

    pub fn with_rule(mut self, rule: RuleNumber, handler: RuleHandler<S, P>) -> Self {
        self.set(rule, handler);
        self
    }

    /// Install `handler` for `rule`, growing the table if needed.
    pub fn set(&mut self, rule: RuleNumber, handler: RuleHandler<S, P>) {
        let index = rule as usize;
        if index >= self.handlers.len() {
            self.handlers.resize(index + 1, None);
        }
        self.handlers[index] = Some(handler);
    }

    pub fn state(&self) -> &S {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut S {
        &mut self.state
    }

    pub fn into_state(self) -> S {
        self.state
    }

    /// The reduction currently being dispatched, if any.
    pub fn active_rule(&self) -> Option<RuleSpan> {
        self.active
    }

    fn handler(&self, rule: RuleNumber) -> Option<RuleHandler<S, P>> {
        self.handlers.get(rule as usize).copied().flatten()
    }
}

impl<S, P> ActionProvider for ActionTable<S, P> {
    type Payload = P;

    fn trial(&mut self, rule: &mut Rule<P>, tokens: &[TokenIndex]) -> Result<bool, Backtrack> {
        match self.handler(rule.number) {
            Some(handler) => (handler.trial)(&mut self.state, rule, tokens),
            None => Ok(false),
        }
    }

    fn undo(&mut self, rule: &mut Rule<P>) {
        if let Some(handler) = self.handler(rule.number) {
            (handler.undo)(&mut self.state, rule);
        }
    }

    fn commit(&mut self, rule: &mut Rule<P>, tokens: &[TokenIndex]) {
        if let Some(handler) = self.handler(rule.number) {
            (handler.commit)(&mut self.state, rule, tokens);
        }
    }

    fn set_active_rule(&mut self, rule: Option<RuleSpan>) {
        self.active = rule;
    }
}

/// The Pending Action Queue: rules whose trial kept them, oldest first.
#[derive(Debug)]
pub(crate) struct PendingActions<P> {
    rules: VecDeque<Rule<P>>,
}

impl<P> PendingActions<P> {
    pub(crate) fn new() -> Self {
        Self { rules: VecDeque::new() }
    }

    pub(crate) fn len(&self) -> usize {
        self.rules.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub(crate) fn push(&mut self, rule: Rule<P>) {
        self.rules.push_back(rule);
    }

    /// Undo rules beyond the first `mark`, most recent first. Returns how many were undone.
    pub(crate) fn undo_to<A>(&mut self, mark: usize, actions: &mut A) -> usize
    where
        A: ActionProvider<Payload = P> + ?Sized,
    {
        let mut undone = 0;
        while self.rules.len() > mark {
            let Some(mut rule) = self.rules.pop_back() else {
                break;
            };
            actions.set_active_rule(Some(rule.as_span()));
            actions.undo(&mut rule);
            actions.set_active_rule(None);
            undone += 1;
        }
        undone
    }

    /// Take the oldest rule if it is the reduction `span`.
    pub(crate) fn take_matching(&mut self, span: RuleSpan) -> Option<Rule<P>> {
        if self.rules.front().is_some_and(|rule| rule.as_span() == span) {
            self.rules.pop_front()
        } else {
            None
        }
    }
}
