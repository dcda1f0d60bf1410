//! Error recovery: find a stack level that accepts the error terminal and a later token to resynchronize on.
//!
//! Phase 1 scans the Stack Set from the top for a level whose state has an action on the error terminal. Phase 2
//! tries every raw token from the first one after that level through end-of-input as the resynchronization point,
//! validating each with a [`Simulation`] that runs no semantic actions. If no token validates, Phase 1 continues
//! below the level.
//!
//! A validated repair rewinds the parser to the chosen level and replaces the skipped tokens with one synthesized
//! error token, which becomes the lookahead.

use retrace_core::{Action, ActionCode, ParseTable, RuleNumber, SymbolId, TokenIndex, TokenStream};
use tracing::debug;

use crate::actions::ActionProvider;
use crate::automaton::Automaton;
use crate::config::{Checkpoint, ConfigurationStack};
use crate::driver::{FurthestBranch, Session};
use crate::stacks::{Frame, StackSet, token_after};

pub(crate) enum Recovery {
    Repaired,
    Failed,
    Cancelled,
}

/// A validated resynchronization: repair at stack `level`, covering `first` up to the token before `candidate`.
struct Resync {
    level: usize,
    first: TokenIndex,
    candidate: TokenIndex,
}

enum Search {
    Found(Resync),
    Exhausted,
    Cancelled,
}

impl<T, S, A> Session<'_, '_, T, S, A>
where
    T: ParseTable + ?Sized,
    S: TokenStream,
    A: ActionProvider,
{
    /// Repair the failure at `self.error_token`. `distance` is how many tokens past the offending token a
    /// resynchronization must parse.
    ///
    /// The repair is searched on the branch that reached the offending token. When a later alternative was
    /// explored after it, that branch is rebuilt before the repair is applied.
    pub(crate) fn recover(&mut self, distance: usize) -> Recovery {
        let Some(error_token) = self.error_token else {
            return Recovery::Failed;
        };
        let saved = self
            .furthest
            .take()
            .filter(|branch| branch.generation != self.generation);
        let found = match &saved {
            Some(branch) => self.search(&branch.stacks, &branch.tokens, branch.lookahead, error_token, distance),
            None => self.search(&self.stacks, &self.tokens, self.curtok, error_token, distance),
        };
        let resync = match found {
            Search::Found(resync) => resync,
            Search::Exhausted => return Recovery::Failed,
            Search::Cancelled => return Recovery::Cancelled,
        };
        if let Some(branch) = &saved {
            if !self.rebuild(branch, resync.level) {
                debug!(level = resync.level, "failed branch could not be rebuilt");
                return Recovery::Failed;
            }
        }
        self.apply_repair(resync, error_token);
        Recovery::Repaired
    }

    /// Phase 1 and 2 over the branch described by `stacks`, `tokens` and `lookahead`.
    fn search(
        &self,
        stacks: &StackSet,
        tokens: &[TokenIndex],
        lookahead: TokenIndex,
        error_token: TokenIndex,
        distance: usize,
    ) -> Search {
        let mut below = stacks.len();
        while let Some(level) = self.recovery_level(stacks, below) {
            let first = self.raw_position(token_after(stacks, level, tokens).unwrap_or(lookahead));
            let mut candidate = first;
            loop {
                if self.cancelled() {
                    return Search::Cancelled;
                }
                if self.viable(stacks, level, candidate, error_token, distance) {
                    return Search::Found(Resync {
                        level,
                        first,
                        candidate,
                    });
                }
                let next = self.stream.next_of(candidate);
                if next == candidate {
                    break;
                }
                candidate = next;
            }
            debug!(level, "no resynchronization token above this level");
            below = level;
        }
        Search::Exhausted
    }

    /// Deepest level under `below` whose state acts on the error terminal.
    ///
    /// Levels pushed by null reductions share their location with the level beneath; the lowest level of such a
    /// run is preferred when it also accepts the error terminal.
    fn recovery_level(&self, stacks: &StackSet, below: usize) -> Option<usize> {
        let table = self.automaton.table();
        let error_symbol = table.error_symbol();
        let error = table.error_action();
        let accepts_error = |level: usize| table.t_action(stacks.state(level), error_symbol) != error;

        let level = (0..below).rev().find(|&level| accepts_error(level))?;
        let location = stacks.location(level);
        let mut lowest = level;
        while lowest > 0 && stacks.location(lowest - 1) == location {
            lowest -= 1;
        }
        if lowest != level && accepts_error(lowest) {
            Some(lowest)
        } else {
            Some(level)
        }
    }

    fn viable(
        &self,
        stacks: &StackSet,
        level: usize,
        candidate: TokenIndex,
        error_token: TokenIndex,
        distance: usize,
    ) -> bool {
        let stream = &*self.stream;
        let mut target = stream.next_of(error_token).max(candidate);
        for _ in 1..distance {
            target = stream.next_of(target);
        }
        let simulation = Simulation::new(
            self.automaton,
            stream,
            stacks.prefix(level),
            self.automaton.table().error_symbol(),
            candidate,
        );
        simulation.run(target)
    }

    /// Replace the live parse with `branch` up to stack `level`, running fresh trials for its reductions.
    ///
    /// Everything the last explored branch left pending is undone first. Returns `false` if a reduction no longer
    /// goes through, e.g. because a trial now rejects it.
    fn rebuild(&mut self, branch: &FurthestBranch, level: usize) -> bool {
        let mark = branch.stacks.frame(level);
        self.stats.undos += self.pending.undo_to(0, &mut *self.actions) as u64;
        self.log.clear();
        self.tokens.clear();
        self.stacks.truncate(1);

        for &code in branch.log.iter().take(mark.action_count) {
            let action = self.automaton.decode(code);
            if matches!(action, Action::Shift(_) | Action::ShiftReduce(_)) {
                let Some(&token) = branch.tokens.get(self.tokens.len()) else {
                    return false;
                };
                self.tokens.push(token);
            }
            self.log.push(code);
            let step = match action {
                Action::Shift(state) => {
                    self.push_frame(state);
                    Ok(())
                }
                Action::ShiftReduce(rule) => self.reduce(rule, self.stacks.len()),
                Action::Reduce(rule) => self.reduce(rule, self.stacks.top()),
                _ => Ok(()),
            };
            if step.is_err() {
                return false;
            }
        }
        self.stacks.len() == level + 1
    }

    fn apply_repair(&mut self, resync: Resync, error_token: TokenIndex) {
        let Resync {
            level,
            first,
            candidate,
        } = resync;
        let error_symbol = self.automaton.table().error_symbol();
        let mark = self.stacks.frame(level);
        self.stats.undos += self.pending.undo_to(mark.undo_marker, &mut *self.actions) as u64;
        self.log.truncate(mark.action_count);
        self.tokens.truncate(mark.location);
        self.stacks.truncate(level + 1);
        self.configs.clear();

        let last = self.stream.previous_of(candidate);
        let repair = self.stream.synthesize_error_token(first, last, error_token, error_symbol);
        self.synthetic.insert(repair, first);
        self.stream.reset(candidate);
        self.curtok = repair;
        self.kind = error_symbol;
        self.stats.repairs += 1;
        debug!(level, first, last, resync = candidate, offender = error_token, "repaired syntax error");
    }
}

/// Action-free forward parse from a stack prefix, fed the error terminal and then the raw tokens from a
/// candidate onward.
struct Simulation<'r, 'a, T: ?Sized, S: ?Sized> {
    automaton: Automaton<'a, T>,
    stream: &'r S,
    stacks: StackSet,
    configs: ConfigurationStack,
    consumed: usize,
    curtok: TokenIndex,
    kind: SymbolId,
    next: TokenIndex,
}

impl<'r, 'a, T, S> Simulation<'r, 'a, T, S>
where
    T: ParseTable + ?Sized,
    S: TokenStream + ?Sized,
{
    fn new(
        automaton: Automaton<'a, T>,
        stream: &'r S,
        stacks: StackSet,
        error_symbol: SymbolId,
        candidate: TokenIndex,
    ) -> Self {
        let consumed = stacks.location(stacks.top());
        Self {
            automaton,
            stream,
            stacks,
            configs: ConfigurationStack::new(),
            consumed,
            // the error token stands just before the candidate
            curtok: stream.previous_of(candidate),
            kind: error_symbol,
            next: candidate,
        }
    }

    /// Whether the parse accepts or shifts a token at or beyond `target`.
    fn run(mut self, target: TokenIndex) -> bool {
        let mut next_code: Option<ActionCode> = None;
        loop {
            let code = match next_code.take() {
                Some(code) => code,
                None => {
                    self.automaton
                        .resolve(self.stacks.top_state(), self.kind, self.next, self.stream)
                        .0
                }
            };
            let step = match self.automaton.decode(code) {
                Action::Shift(state) => {
                    if self.curtok >= target {
                        return true;
                    }
                    self.shift();
                    self.stacks.push(Frame::new(state, self.consumed, 0, 0));
                    true
                }
                Action::ShiftReduce(rule) => {
                    if self.curtok >= target {
                        return true;
                    }
                    self.shift();
                    self.reduce(rule, self.stacks.len())
                }
                Action::Reduce(rule) => self.reduce(rule, self.stacks.top()),
                Action::Accept => return true,
                Action::Conflict(index) => {
                    if self.configs.find_equivalent(&self.stacks, self.consumed, self.curtok) {
                        false
                    } else {
                        let checkpoint = Checkpoint {
                            token_count: self.consumed,
                            lookahead: self.curtok,
                            lookahead_kind: self.kind,
                            resume: self.next,
                            action_count: 0,
                            undo_count: 0,
                        };
                        self.configs.push(&self.stacks, index + 1, checkpoint);
                        next_code = Some(self.automaton.table().base_action(index));
                        true
                    }
                }
                Action::Error | Action::Lookahead(_) => false,
            };

            if !step {
                let Some((config, code)) = self.configs.pop(self.automaton.table()) else {
                    return false;
                };
                self.configs.restore(&config, &mut self.stacks);
                let checkpoint = config.checkpoint;
                self.consumed = checkpoint.token_count;
                self.curtok = checkpoint.lookahead;
                self.kind = checkpoint.lookahead_kind;
                self.next = checkpoint.resume;
                next_code = Some(code);
            }
        }
    }

    fn shift(&mut self) {
        self.consumed += 1;
        self.curtok = self.next;
        self.kind = self.stream.kind_of(self.next);
        self.next = self.stream.next_of(self.next);
    }

    fn reduce(&mut self, rule: RuleNumber, end: usize) -> bool {
        match self.automaton.reduce(&mut self.stacks, rule, end, |_, _| Ok(())) {
            Ok(goto) => {
                self.stacks.push(Frame::new(goto, self.consumed, 0, 0));
                true
            }
            Err(_) => false,
        }
    }
}
