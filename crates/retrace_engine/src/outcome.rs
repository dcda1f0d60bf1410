//! Parse results and statistics.

use retrace_core::{ActionCode, TokenIndex};

/// How a parse ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseOutcome {
    /// The input was accepted and every commit action has run. Carries the settled Token Sequence, synthesized
    /// error tokens included.
    Accepted(Vec<TokenIndex>),
    /// The input could not be parsed within the repair budget. Carries the first offending token.
    BadParse(TokenIndex),
    /// The monitor requested cancellation. No commit action ran and every trial was undone.
    Cancelled,
}

impl ParseOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted(_))
    }

    pub fn tokens(&self) -> Option<&[TokenIndex]> {
        match self {
            Self::Accepted(tokens) => Some(tokens),
            _ => None,
        }
    }

    pub fn offending_token(&self) -> Option<TokenIndex> {
        match self {
            Self::BadParse(token) => Some(*token),
            _ => None,
        }
    }
}

/// Counters collected during one parse.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseStats {
    /// Driving steps of the exploration pass.
    pub steps: u64,
    pub trials: u64,
    pub undos: u64,
    pub commits: u64,
    /// Branch points recorded on conflicts.
    pub configurations_pushed: u64,
    /// Alternatives resumed from the Configuration Stack.
    pub backtracks: u64,
    pub max_configuration_depth: usize,
    /// Error tokens synthesized by recovery.
    pub repairs: u32,
    /// Most terminals inspected to resolve one lookahead-deferred action.
    pub max_lookahead: usize,
    /// State on top of the stack when the first offending token was met.
    pub error_state: Option<ActionCode>,
}

/// Outcome plus statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseReport {
    pub outcome: ParseOutcome,
    pub stats: ParseStats,
}
