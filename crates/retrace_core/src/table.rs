//! Parse table access and action-code decoding.
//!
//! A backtracking LR table is consumed through [`ParseTable`]. The raw cell values are integers; [`Sentinels`]
//! captures the boundaries between the code ranges once and turns every raw code into an [`Action`].

use thiserror::Error;

use crate::{ActionCode, RuleNumber, SymbolId};

/// Errors raised while building or validating a parse table.
///
/// These are construction-time failures. A table that passes validation never produces one at parse time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableError {
    #[error("parse table was not generated for backtracking")]
    NotBacktracking,

    #[error("malformed parse table: {0}")]
    Malformed(String),

    #[error("start state {0} is not a shift state")]
    InvalidStartState(ActionCode),

    #[error("unknown state {0}")]
    UnknownState(usize),

    #[error("unknown lookahead state {0}")]
    UnknownLookahead(usize),

    #[error("unknown rule {0}")]
    UnknownRule(RuleNumber),

    #[error("unknown symbol `{0}`")]
    UnknownSymbol(String),

    #[error("invalid table entry `{0}`")]
    InvalidEntry(String),
}

/// Read-only view over a precomputed backtracking LR automaton.
///
/// Terminal symbols are queried through [`ParseTable::t_action`] and nonterminals through
/// [`ParseTable::nt_action`]; the two symbol spaces are independent.
pub trait ParseTable {
    /// State the parse starts in.
    fn start_state(&self) -> ActionCode;

    /// Number of grammar rules. Rules are numbered `1..=rule_count()`.
    fn rule_count(&self) -> u32;

    /// Number of symbols on the right-hand side of `rule`.
    fn rhs_len(&self, rule: RuleNumber) -> usize;

    /// Nonterminal on the left-hand side of `rule`.
    fn lhs(&self, rule: RuleNumber) -> SymbolId;

    /// Action for `terminal` in `state`.
    fn t_action(&self, state: ActionCode, terminal: SymbolId) -> ActionCode;

    /// Goto for `nonterminal` in `state`: a state, or a rule number for a goto-reduce.
    fn nt_action(&self, state: ActionCode, nonterminal: SymbolId) -> ActionCode;

    /// Entry `index` of the conflict alternative lists. A list ends with `0`.
    fn base_action(&self, index: ActionCode) -> ActionCode;

    /// Action for `terminal` in lookahead state `la_state` (already offset-adjusted).
    fn look_ahead(&self, la_state: ActionCode, terminal: SymbolId) -> ActionCode;

    fn accept_action(&self) -> ActionCode;

    fn error_action(&self) -> ActionCode;

    /// Codes strictly greater than this are lookahead states.
    fn la_state_offset(&self) -> ActionCode;

    /// Terminal used for error productions.
    fn error_symbol(&self) -> SymbolId;

    /// End-of-input terminal.
    fn eof_symbol(&self) -> SymbolId;

    /// Whether the table keeps conflicts for backtracking instead of resolving them.
    fn is_backtracking(&self) -> bool;

    /// Number of terminals. Terminals are numbered `0..terminal_count()`.
    fn terminal_count(&self) -> u32;

    fn terminal_name(&self, _terminal: SymbolId) -> Option<&str> {
        None
    }

    fn nonterminal_name(&self, _nonterminal: SymbolId) -> Option<&str> {
        None
    }

    /// Human-readable `lhs ::= rhs` text of `rule`.
    fn rule_text(&self, _rule: RuleNumber) -> Option<&str> {
        None
    }
}

/// A decoded table action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Reduce(RuleNumber),
    Shift(ActionCode),
    /// Shift the current token and immediately reduce the rule.
    ShiftReduce(RuleNumber),
    Accept,
    Error,
    /// Index of the first alternative in the conflict lists.
    Conflict(ActionCode),
    /// Lookahead state, offset-adjusted.
    Lookahead(ActionCode),
}

/// Boundaries of the action-code ranges of one table.
///
/// ```text
/// 0                          end of a conflict list
/// 1 ..= rules                reduce
/// rules+1 .. accept          shift
/// accept                     accept
/// accept+1 .. error          conflict index
/// error                      error
/// error+1 ..= error+rules    shift-reduce
/// > la_offset                lookahead state
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sentinels {
    pub rule_count: u32,
    pub accept: ActionCode,
    pub error: ActionCode,
    pub la_offset: ActionCode,
}

impl Sentinels {
    /// Read the sentinels of `table` and check that they describe a usable backtracking table.
    ///
    /// ## Errors
    /// - [`TableError::NotBacktracking`] if the table resolved its conflicts at generation time.
    /// - [`TableError::Malformed`] if the code ranges overlap or the error and eof terminals coincide.
    /// - [`TableError::InvalidStartState`] if the start state is not in the shift range.
    pub fn validate<T: ParseTable + ?Sized>(table: &T) -> Result<Self, TableError> {
        if !table.is_backtracking() {
            return Err(TableError::NotBacktracking);
        }

        let sentinels = Self {
            rule_count: table.rule_count(),
            accept: table.accept_action(),
            error: table.error_action(),
            la_offset: table.la_state_offset(),
        };

        if sentinels.rule_count == 0 {
            return Err(TableError::Malformed("table has no rules".to_string()));
        }
        if sentinels.accept <= sentinels.rule_count {
            return Err(TableError::Malformed(format!(
                "accept action {} overlaps the reduce range 1..={}",
                sentinels.accept, sentinels.rule_count
            )));
        }
        if sentinels.error <= sentinels.accept {
            return Err(TableError::Malformed(format!(
                "error action {} must be greater than accept action {}",
                sentinels.error, sentinels.accept
            )));
        }
        let shift_reduce_end = sentinels.error.checked_add(sentinels.rule_count).ok_or_else(|| {
            TableError::Malformed(format!(
                "shift-reduce range of error action {} overflows the code space",
                sentinels.error
            ))
        })?;
        if sentinels.la_offset < shift_reduce_end {
            return Err(TableError::Malformed(format!(
                "lookahead offset {} overlaps the shift-reduce range",
                sentinels.la_offset
            )));
        }
        if table.error_symbol() == table.eof_symbol() {
            return Err(TableError::Malformed(
                "error and end-of-input terminals must differ".to_string(),
            ));
        }

        let start = table.start_state();
        if !matches!(sentinels.decode(start), Action::Shift(_)) {
            return Err(TableError::InvalidStartState(start));
        }

        Ok(sentinels)
    }

    /// Decode a terminal action code.
    pub fn decode(&self, code: ActionCode) -> Action {
        if code > self.la_offset {
            Action::Lookahead(code - self.la_offset)
        } else if code == 0 {
            Action::Error
        } else if code <= self.rule_count {
            Action::Reduce(code)
        } else if code < self.accept {
            Action::Shift(code)
        } else if code == self.accept {
            Action::Accept
        } else if code < self.error {
            Action::Conflict(code)
        } else if code == self.error {
            Action::Error
        } else if code - self.error <= self.rule_count {
            Action::ShiftReduce(code - self.error)
        } else {
            Action::Error
        }
    }

    /// Encode an action back into its code.
    pub fn encode(&self, action: Action) -> ActionCode {
        match action {
            Action::Reduce(rule) => rule,
            Action::Shift(state) => state,
            Action::ShiftReduce(rule) => self.error + rule,
            Action::Accept => self.accept,
            Action::Error => self.error,
            Action::Conflict(index) => index,
            Action::Lookahead(la) => self.la_offset + la,
        }
    }

    /// Whether a goto result names a rule (goto-reduce) rather than a state.
    pub fn is_goto_reduce(&self, code: ActionCode) -> bool {
        code <= self.rule_count
    }
}

/// Terminals accepted in `state`, excluding the error terminal, in numeric order.
pub fn expected_terminals<T: ParseTable + ?Sized>(table: &T, state: ActionCode) -> Vec<SymbolId> {
    let error = table.error_action();
    (0..table.terminal_count())
        .filter(|&t| t != table.error_symbol())
        .filter(|&t| table.t_action(state, t) != error)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sentinels() -> Sentinels {
        // 3 rules, states 4..=9, accept 10, conflicts 11..=14, error 15, shift-reduce 16..=18, lookahead > 18
        Sentinels {
            rule_count: 3,
            accept: 10,
            error: 15,
            la_offset: 18,
        }
    }

    #[test]
    fn test_decode_ranges() {
        let s = sentinels();
        assert_eq!(s.decode(0), Action::Error);
        assert_eq!(s.decode(1), Action::Reduce(1));
        assert_eq!(s.decode(3), Action::Reduce(3));
        assert_eq!(s.decode(4), Action::Shift(4));
        assert_eq!(s.decode(9), Action::Shift(9));
        assert_eq!(s.decode(10), Action::Accept);
        assert_eq!(s.decode(11), Action::Conflict(11));
        assert_eq!(s.decode(14), Action::Conflict(14));
        assert_eq!(s.decode(15), Action::Error);
        assert_eq!(s.decode(16), Action::ShiftReduce(1));
        assert_eq!(s.decode(18), Action::ShiftReduce(3));
        assert_eq!(s.decode(19), Action::Lookahead(1));
    }

    #[test]
    fn test_encode_inverts_decode() {
        let s = sentinels();
        for code in 1..25 {
            assert_eq!(s.encode(s.decode(code)), code, "code {code}");
        }
    }

    /// Hand-written table with caller-chosen sentinels and no states beyond the start state.
    struct Bare {
        rule_count: u32,
        accept: ActionCode,
        error: ActionCode,
        la_offset: ActionCode,
    }

    impl ParseTable for Bare {
        fn start_state(&self) -> ActionCode {
            self.rule_count + 1
        }
        fn rule_count(&self) -> u32 {
            self.rule_count
        }
        fn rhs_len(&self, _rule: RuleNumber) -> usize {
            0
        }
        fn lhs(&self, _rule: RuleNumber) -> SymbolId {
            0
        }
        fn t_action(&self, _state: ActionCode, _terminal: SymbolId) -> ActionCode {
            self.error
        }
        fn nt_action(&self, _state: ActionCode, _nonterminal: SymbolId) -> ActionCode {
            0
        }
        fn base_action(&self, _index: ActionCode) -> ActionCode {
            0
        }
        fn look_ahead(&self, _la_state: ActionCode, _terminal: SymbolId) -> ActionCode {
            self.error
        }
        fn accept_action(&self) -> ActionCode {
            self.accept
        }
        fn error_action(&self) -> ActionCode {
            self.error
        }
        fn la_state_offset(&self) -> ActionCode {
            self.la_offset
        }
        fn error_symbol(&self) -> SymbolId {
            1
        }
        fn eof_symbol(&self) -> SymbolId {
            0
        }
        fn is_backtracking(&self) -> bool {
            true
        }
        fn terminal_count(&self) -> u32 {
            2
        }
    }

    #[test]
    fn test_validate_accepts_consistent_sentinels() {
        let table = Bare {
            rule_count: 3,
            accept: 10,
            error: 15,
            la_offset: 18,
        };
        assert_eq!(Sentinels::validate(&table), Ok(sentinels()));
    }

    #[test]
    fn test_validate_rejects_overflowing_shift_reduce_range() {
        let table = Bare {
            rule_count: 3,
            accept: 10,
            error: u32::MAX - 1,
            la_offset: u32::MAX,
        };
        assert!(matches!(Sentinels::validate(&table), Err(TableError::Malformed(_))));
    }

    #[test]
    fn test_decode_near_code_limit() {
        let s = Sentinels {
            rule_count: 3,
            accept: 10,
            error: u32::MAX - 1,
            la_offset: u32::MAX,
        };
        assert_eq!(s.decode(u32::MAX - 1), Action::Error);
        assert_eq!(s.decode(u32::MAX), Action::ShiftReduce(1));
    }

    #[test]
    fn test_goto_reduce_boundary() {
        let s = sentinels();
        assert!(s.is_goto_reduce(3));
        assert!(!s.is_goto_reduce(4));
    }
}
