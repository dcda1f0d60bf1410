//! The driving engine: exploration with backtracking, then replay of the accepted action log.
//!
//! ## Notes
//! - Exploration logs every shift, reduce and shift-reduce it performs. Restoring a configuration or rewinding for
//!   a repair truncates the log together with the Stack Set and the Token Sequence, so once the parse is accepted
//!   the log holds exactly the winning path.
//! - Replay walks that log against the settled Token Sequence and only runs commit actions. It is not polled for
//!   cancellation.

use std::collections::HashMap;

use retrace_core::{
    Action, ActionCode, ParseTable, RuleNumber, Sentinels, SymbolId, TableError, TokenIndex, TokenStream,
};
use tracing::{debug, trace, warn};

use crate::actions::{ActionProvider, Backtrack, PendingActions, Rule, RuleSpan};
use crate::automaton::{Automaton, Failure};
use crate::config::{Checkpoint, ConfigurationStack};
use crate::monitor::Monitor;
use crate::options::{ParseOptions, RejectionPolicy, RepairBudget};
use crate::outcome::{ParseOutcome, ParseReport, ParseStats};
use crate::recovery::Recovery;
use crate::stacks::{Frame, StackSet};

/// Backtracking LR driver over a validated parse table.
///
/// An engine holds no per-parse state; every call to [`Engine::parse`] or [`Engine::parse_with_report`] creates
/// its own stacks, so one engine can drive any number of parses.
///
/// ## Examples
/// ```rust
/// use retrace_core::{Entry, Goto, TableBuilder, VecTokenStream};
/// use retrace_engine::{Engine, NoActions, ParseOutcome};
///
/// let mut b = TableBuilder::new("$eof", "error");
/// let a = b.terminal("a");
/// let s = b.nonterminal("S");
/// let r1 = b.rule(s, &["a"]);
/// let s0 = b.state();
/// let s1 = b.state();
/// b.action(s0, a, Entry::ShiftReduce(r1));
/// b.goto(s0, s, Goto::State(s1));
/// b.action(s1, b.eof(), Entry::Accept);
/// let table = b.build(s0).unwrap();
///
/// let engine = Engine::new(&table).unwrap();
/// let mut stream = VecTokenStream::from_kinds(&[a], b.eof());
/// assert_eq!(engine.parse(&mut stream, &mut NoActions, 0), ParseOutcome::Accepted(vec![1]));
/// ```
pub struct Engine<'a, T: ?Sized> {
    table: &'a T,
    sentinels: Sentinels,
    options: ParseOptions,
    monitor: Option<&'a dyn Monitor>,
}

impl<'a, T: ParseTable + ?Sized> Engine<'a, T> {
    /// Create an engine for `table`.
    ///
    /// ## Errors
    /// Returns the [`TableError`] from [`Sentinels::validate`] if the table is not a usable backtracking table.
    pub fn new(table: &'a T) -> Result<Self, TableError> {
        let sentinels = Sentinels::validate(table)?;
        Ok(Self {
            table,
            sentinels,
            options: ParseOptions::default(),
            monitor: None,
        })
    }

    pub fn with_options(mut self, options: ParseOptions) -> Self {
        self.options = options;
        self
    }

    /// Poll `monitor` for cancellation during exploration and recovery.
    pub fn with_monitor(mut self, monitor: &'a dyn Monitor) -> Self {
        self.monitor = Some(monitor);
        self
    }

    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    pub fn table(&self) -> &'a T {
        self.table
    }

    pub fn sentinels(&self) -> Sentinels {
        self.sentinels
    }

    /// Parse `stream` with at most `max_error_repairs` repairs.
    ///
    /// `0` disables recovery, a positive count bounds it, a negative count allows unlimited repairs validated
    /// against a single following token. Other options come from [`Engine::with_options`].
    pub fn parse<S, A>(&self, stream: &mut S, actions: &mut A, max_error_repairs: i32) -> ParseOutcome
    where
        S: TokenStream,
        A: ActionProvider,
    {
        self.run(stream, actions, RepairBudget::from(max_error_repairs)).outcome
    }

    /// Parse `stream` with the configured options and return the outcome with statistics.
    pub fn parse_with_report<S, A>(&self, stream: &mut S, actions: &mut A) -> ParseReport
    where
        S: TokenStream,
        A: ActionProvider,
    {
        self.run(stream, actions, self.options.repairs())
    }

    #[tracing::instrument(skip_all, fields(repairs = ?budget))]
    fn run<S, A>(&self, stream: &mut S, actions: &mut A, budget: RepairBudget) -> ParseReport
    where
        S: TokenStream,
        A: ActionProvider,
    {
        let mut session = Session::new(self, stream, actions);
        let outcome = session.drive(budget);
        debug!(
            accepted = outcome.is_accepted(),
            steps = session.stats.steps,
            backtracks = session.stats.backtracks,
            repairs = session.stats.repairs,
            "parse finished"
        );
        ParseReport {
            outcome,
            stats: session.stats,
        }
    }
}

/// How one exploration run ended.
enum Branch {
    Accepted,
    Failed(Failure),
    Cancelled,
}

/// The branch that reached the furthest offending token, kept while later alternatives are explored.
///
/// Recovery repairs this branch rather than whichever branch was explored last.
pub(crate) struct FurthestBranch {
    /// Backtrack generation the branch failed in.
    pub(crate) generation: u64,
    pub(crate) stacks: StackSet,
    pub(crate) tokens: Vec<TokenIndex>,
    pub(crate) log: Vec<ActionCode>,
    pub(crate) lookahead: TokenIndex,
}

/// Mutable state of one parse.
pub(crate) struct Session<'s, 'a, T: ?Sized, S, A: ActionProvider> {
    pub(crate) automaton: Automaton<'a, T>,
    options: ParseOptions,
    monitor: Option<&'a dyn Monitor>,
    pub(crate) stream: &'s mut S,
    pub(crate) actions: &'s mut A,
    pub(crate) stacks: StackSet,
    /// Token Sequence of the path being explored.
    pub(crate) tokens: Vec<TokenIndex>,
    /// Shift, reduce and shift-reduce codes of the path being explored.
    pub(crate) log: Vec<ActionCode>,
    pub(crate) pending: PendingActions<A::Payload>,
    pub(crate) configs: ConfigurationStack,
    /// Synthesized error tokens, mapped to the first raw token they cover.
    pub(crate) synthetic: HashMap<TokenIndex, TokenIndex>,
    pub(crate) curtok: TokenIndex,
    pub(crate) kind: SymbolId,
    /// Furthest offending token of the current failure.
    pub(crate) error_token: Option<TokenIndex>,
    /// Saved copy of the branch that failed at `error_token`, if another branch was explored after it.
    pub(crate) furthest: Option<FurthestBranch>,
    /// Bumped on every backtrack, so a saved branch can tell whether it is still the live one.
    pub(crate) generation: u64,
    error_state: Option<ActionCode>,
    first_error: Option<(TokenIndex, Option<ActionCode>)>,
    last_repair: Option<TokenIndex>,
    charged_repairs: u32,
    pub(crate) stats: ParseStats,
}

impl<'s, 'a, T, S, A> Session<'s, 'a, T, S, A>
where
    T: ParseTable + ?Sized,
    S: TokenStream,
    A: ActionProvider,
{
    fn new(engine: &Engine<'a, T>, stream: &'s mut S, actions: &'s mut A) -> Self {
        let mut stacks = StackSet::with_capacity(64);
        stacks.push(Frame::new(engine.table.start_state(), 0, 0, 0));
        let curtok = stream.next_token();
        let kind = stream.kind_of(curtok);
        Self {
            automaton: Automaton::new(engine.table, engine.sentinels),
            options: engine.options,
            monitor: engine.monitor,
            stream,
            actions,
            stacks,
            tokens: Vec::new(),
            log: Vec::new(),
            pending: PendingActions::new(),
            configs: ConfigurationStack::new(),
            synthetic: HashMap::new(),
            curtok,
            kind,
            error_token: None,
            furthest: None,
            generation: 0,
            error_state: None,
            first_error: None,
            last_repair: None,
            charged_repairs: 0,
            stats: ParseStats::default(),
        }
    }

    fn drive(&mut self, budget: RepairBudget) -> ParseOutcome {
        loop {
            match self.explore() {
                Branch::Accepted => return ParseOutcome::Accepted(self.replay()),
                Branch::Cancelled => {
                    debug!("parse cancelled");
                    self.abandon();
                    return ParseOutcome::Cancelled;
                }
                Branch::Failed(failure) => {
                    let offender = self.record_failure();
                    let Some(charged) = self.repair_allowed(budget, failure) else {
                        debug!(offender, "syntax error is not repairable");
                        self.abandon();
                        return ParseOutcome::BadParse(offender);
                    };
                    let distance = self.options.acceptance_distance(budget);
                    match self.recover(distance) {
                        Recovery::Repaired => {
                            self.last_repair = self.error_token;
                            if charged {
                                self.charged_repairs += 1;
                            }
                        }
                        Recovery::Failed => {
                            debug!(offender, "no resynchronization point found");
                            self.abandon();
                            return ParseOutcome::BadParse(offender);
                        }
                        Recovery::Cancelled => {
                            debug!("parse cancelled during recovery");
                            self.abandon();
                            return ParseOutcome::Cancelled;
                        }
                    }
                }
            }
        }
    }

    /// Run the automaton until it accepts, every branch has failed, or the monitor cancels.
    fn explore(&mut self) -> Branch {
        let mut next: Option<ActionCode> = None;
        loop {
            if self.cancelled() {
                return Branch::Cancelled;
            }
            self.stats.steps += 1;

            let code = match next.take() {
                Some(code) => code,
                None => self.resolve_current(),
            };
            let step = match self.automaton.decode(code) {
                Action::Shift(state) => {
                    self.log.push(code);
                    self.shift();
                    self.push_frame(state);
                    Ok(())
                }
                Action::ShiftReduce(rule) => {
                    self.log.push(code);
                    self.shift();
                    self.reduce(rule, self.stacks.len())
                }
                Action::Reduce(rule) => {
                    self.log.push(code);
                    self.reduce(rule, self.stacks.top())
                }
                Action::Accept => return Branch::Accepted,
                Action::Conflict(index) => {
                    if self.configs.find_equivalent(&self.stacks, self.tokens.len(), self.curtok) {
                        trace!(state = self.stacks.top_state(), token = self.curtok, "conflict loop detected");
                        Err(Failure::Syntax)
                    } else {
                        let checkpoint = self.checkpoint();
                        self.configs.push(&self.stacks, index + 1, checkpoint);
                        self.stats.configurations_pushed += 1;
                        self.stats.max_configuration_depth =
                            self.stats.max_configuration_depth.max(self.configs.len());
                        trace!(state = self.stacks.top_state(), token = self.curtok, "branching on conflict");
                        next = Some(self.automaton.table().base_action(index));
                        Ok(())
                    }
                }
                Action::Error | Action::Lookahead(_) => Err(Failure::Syntax),
            };

            if let Err(failure) = step {
                self.note_offender();
                match self.backtrack() {
                    Some(code) => next = Some(code),
                    None => return Branch::Failed(failure),
                }
            }
        }
    }

    fn resolve_current(&mut self) -> ActionCode {
        let (code, depth) =
            self.automaton
                .resolve(self.stacks.top_state(), self.kind, self.stream.peek(), &*self.stream);
        self.stats.max_lookahead = self.stats.max_lookahead.max(depth);
        code
    }

    fn shift(&mut self) {
        self.tokens.push(self.curtok);
        self.curtok = self.stream.next_token();
        self.kind = self.stream.kind_of(self.curtok);
    }

    pub(crate) fn push_frame(&mut self, state: ActionCode) {
        self.stacks
            .push(Frame::new(state, self.tokens.len(), self.log.len(), self.pending.len()));
    }

    /// Reduce `rule` ending at stack level `end`, running trial actions, and push the goto state.
    pub(crate) fn reduce(&mut self, rule: RuleNumber, end: usize) -> Result<(), Failure> {
        let automaton = self.automaton;
        let table = automaton.table();
        let tokens = &self.tokens;
        let actions = &mut *self.actions;
        let pending = &mut self.pending;
        let stats = &mut self.stats;

        let goto = automaton.reduce(&mut self.stacks, rule, end, |number, start| {
            let mut rule = Rule::new(number, start, tokens.len());
            actions.set_active_rule(Some(rule.as_span()));
            let kept = actions.trial(&mut rule, tokens);
            actions.set_active_rule(None);
            stats.trials += 1;
            trace!(rule = number, text = table.rule_text(number).unwrap_or_default(), ?kept, "trial");
            match kept {
                Ok(true) => {
                    pending.push(rule);
                    Ok(())
                }
                Ok(false) => Ok(()),
                Err(Backtrack) => Err(Backtrack),
            }
        })?;
        self.push_frame(goto);
        Ok(())
    }

    fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            token_count: self.tokens.len(),
            lookahead: self.curtok,
            lookahead_kind: self.kind,
            resume: self.stream.peek(),
            action_count: self.log.len(),
            undo_count: self.pending.len(),
        }
    }

    /// Resume the most recent untried alternative, undoing everything done since its branch point.
    fn backtrack(&mut self) -> Option<ActionCode> {
        let (config, code) = self.configs.pop(self.automaton.table())?;
        self.stats.backtracks += 1;
        self.generation += 1;
        let checkpoint = config.checkpoint;
        self.stats.undos += self.pending.undo_to(checkpoint.undo_count, &mut *self.actions) as u64;
        self.log.truncate(checkpoint.action_count);
        self.tokens.truncate(checkpoint.token_count);
        self.configs.restore(&config, &mut self.stacks);
        self.stream.reset(checkpoint.resume);
        self.curtok = checkpoint.lookahead;
        self.kind = checkpoint.lookahead_kind;
        trace!(depth = config.depth, token = self.curtok, "backtracking");
        Some(code)
    }

    /// Raise the offending token to the current one if it got further.
    ///
    /// While untried alternatives remain, the failing branch is saved so recovery can return to it.
    fn note_offender(&mut self) {
        let position = self.raw_position(self.curtok);
        if self.error_token.is_none_or(|furthest| position > furthest) {
            self.error_token = Some(position);
            self.error_state = Some(self.stacks.top_state());
            self.furthest = (!self.configs.is_empty()).then(|| FurthestBranch {
                generation: self.generation,
                stacks: self.stacks.clone(),
                tokens: self.tokens.clone(),
                log: self.log.clone(),
                lookahead: self.curtok,
            });
        }
    }

    /// Remember the first failure of the parse and return its offending token.
    fn record_failure(&mut self) -> TokenIndex {
        let current = (self.error_token.unwrap_or(self.curtok), self.error_state);
        let (offender, state) = *self.first_error.get_or_insert(current);
        self.stats.error_state = state;
        offender
    }

    /// Whether recovery may run for the current failure, and if so whether the repair is charged to the budget.
    ///
    /// A repair must get further than the previous one; otherwise the same repair would be found again.
    fn repair_allowed(&self, budget: RepairBudget, failure: Failure) -> Option<bool> {
        if !budget.is_enabled() {
            return None;
        }
        let error_token = self.error_token?;
        if self.last_repair.is_some_and(|previous| error_token <= previous) {
            return None;
        }
        let free = failure == Failure::Rejected && self.options.rejection_policy() == RejectionPolicy::Free;
        if free {
            Some(false)
        } else if budget.allows(self.charged_repairs) {
            Some(true)
        } else {
            None
        }
    }

    /// Undo every pending trial.
    fn abandon(&mut self) {
        self.stats.undos += self.pending.undo_to(0, &mut *self.actions) as u64;
        self.configs.clear();
    }

    pub(crate) fn cancelled(&self) -> bool {
        self.monitor.is_some_and(|monitor| monitor.is_cancelled())
    }

    /// Raw stream position of `token`: synthesized error tokens map to the first token they cover.
    pub(crate) fn raw_position(&self, token: TokenIndex) -> TokenIndex {
        self.synthetic.get(&token).copied().unwrap_or(token)
    }

    /// Walk the accepted action log again, running commit actions. Returns the settled Token Sequence.
    fn replay(&mut self) -> Vec<TokenIndex> {
        let automaton = self.automaton;
        let log = std::mem::take(&mut self.log);
        let tokens = std::mem::take(&mut self.tokens);
        let mut pending = std::mem::replace(&mut self.pending, PendingActions::new());
        let actions = &mut *self.actions;
        let stats = &mut self.stats;

        let mut stacks = StackSet::with_capacity(self.stacks.len());
        stacks.push(Frame::new(automaton.table().start_state(), 0, 0, 0));
        let mut consumed = 0;

        for &code in &log {
            let (rule, end) = match automaton.decode(code) {
                Action::Shift(state) => {
                    consumed += 1;
                    stacks.push(Frame::new(state, consumed, 0, 0));
                    continue;
                }
                Action::ShiftReduce(rule) => {
                    consumed += 1;
                    (rule, stacks.len())
                }
                Action::Reduce(rule) => (rule, stacks.top()),
                _ => continue,
            };
            let reduced = automaton.reduce(&mut stacks, rule, end, |number, start| {
                let span = RuleSpan {
                    number,
                    start,
                    end: consumed,
                };
                let mut rule = pending
                    .take_matching(span)
                    .unwrap_or_else(|| Rule::new(number, start, consumed));
                actions.set_active_rule(Some(span));
                actions.commit(&mut rule, &tokens);
                actions.set_active_rule(None);
                stats.commits += 1;
                Ok(())
            });
            match reduced {
                Ok(goto) => stacks.push(Frame::new(goto, consumed, 0, 0)),
                Err(failure) => {
                    warn!(?failure, "replay diverged from the accepted parse");
                    break;
                }
            }
        }

        if !pending.is_empty() {
            warn!(count = pending.len(), "trial actions left pending after replay");
            stats.undos += pending.undo_to(0, actions) as u64;
        }
        tokens
    }
}
