//! Table walking shared by exploration, replay and the recovery simulation.

use retrace_core::{Action, ActionCode, ParseTable, RuleNumber, Sentinels, SymbolId, TokenIndex, TokenStream};

use crate::actions::Backtrack;
use crate::stacks::StackSet;

/// Why a branch stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Failure {
    /// The automaton has no action for the current symbol.
    Syntax,
    /// A trial action returned `Err(Backtrack)`.
    Rejected,
}

/// A parse table paired with its decoded sentinels.
pub(crate) struct Automaton<'a, T: ?Sized> {
    table: &'a T,
    sentinels: Sentinels,
}

impl<T: ?Sized> Clone for Automaton<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: ?Sized> Copy for Automaton<'_, T> {}

impl<'a, T: ParseTable + ?Sized> Automaton<'a, T> {
    pub(crate) fn new(table: &'a T, sentinels: Sentinels) -> Self {
        Self { table, sentinels }
    }

    pub(crate) fn table(&self) -> &'a T {
        self.table
    }

    pub(crate) fn decode(&self, code: ActionCode) -> Action {
        self.sentinels.decode(code)
    }

    /// Action for `kind` in `state`, with lookahead-deferred codes resolved against the terminals starting at
    /// `next`. Returns the concrete code and how many terminals were inspected.
    pub(crate) fn resolve<S: TokenStream + ?Sized>(
        &self,
        state: ActionCode,
        kind: SymbolId,
        next: TokenIndex,
        stream: &S,
    ) -> (ActionCode, usize) {
        let mut code = self.table.t_action(state, kind);
        let mut token = next;
        let mut depth = 0;
        while code > self.sentinels.la_offset {
            // end-of-input repeats forever; a table that keeps deferring there is broken
            if depth > stream.stream_length() {
                return (self.sentinels.error, depth);
            }
            depth += 1;
            code = self.table.look_ahead(code - self.sentinels.la_offset, stream.kind_of(token));
            token = stream.next_of(token);
        }
        (code, depth)
    }

    /// Reduce `rule` whose last symbol sits at stack level `end` (virtually, for a shift-reduce), following
    /// goto-reduces until a goto names a state.
    ///
    /// `on_reduce` runs once per reduction with the rule number and the Token Sequence offset the rule starts at,
    /// after the right-hand side has been popped. Returns the goto state; the caller pushes it.
    ///
    /// ## Errors
    /// - [`Failure::Rejected`] if `on_reduce` returned `Err(Backtrack)`.
    /// - [`Failure::Syntax`] if the stack is too shallow for the rule or a goto is missing.
    pub(crate) fn reduce<F>(
        &self,
        stacks: &mut StackSet,
        mut rule: RuleNumber,
        mut end: usize,
        mut on_reduce: F,
    ) -> Result<ActionCode, Failure>
    where
        F: FnMut(RuleNumber, usize) -> Result<(), Backtrack>,
    {
        loop {
            let below = end
                .checked_sub(self.table.rhs_len(rule))
                .filter(|&below| below < stacks.len())
                .ok_or(Failure::Syntax)?;
            let start = stacks.location(below);
            stacks.truncate(below + 1);
            on_reduce(rule, start).map_err(|Backtrack| Failure::Rejected)?;

            let goto = self.table.nt_action(stacks.state(below), self.table.lhs(rule));
            if goto == 0 {
                return Err(Failure::Syntax);
            }
            if self.sentinels.is_goto_reduce(goto) {
                rule = goto;
                end = below + 1;
                continue;
            }
            return match self.decode(goto) {
                Action::Shift(_) => Ok(goto),
                _ => Err(Failure::Syntax),
            };
        }
    }
}
