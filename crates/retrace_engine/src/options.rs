//! Parse options.
//!
//! ## Notes
//! - Options are immutable once handed to an [`crate::Engine`]; use the `with_*` builders to derive variants.
//! - Defaults: recovery disabled, acceptance distance derived from the repair budget, rejections count as repairs.

/// How many error repairs a parse may perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RepairBudget {
    /// Any syntax error fails the parse.
    #[default]
    Disabled,
    /// At most this many repairs.
    Limited(u32),
    /// Repair as often as needed, validating each repair against a single following token.
    Unlimited,
}

impl From<i32> for RepairBudget {
    /// `0` disables recovery, a positive count bounds it and a negative count removes the bound.
    fn from(count: i32) -> Self {
        match count {
            0 => Self::Disabled,
            n if n > 0 => Self::Limited(n as u32),
            _ => Self::Unlimited,
        }
    }
}

impl RepairBudget {
    pub fn is_enabled(self) -> bool {
        self != Self::Disabled
    }

    /// Whether another charged repair fits after `used` charged repairs.
    pub fn allows(self, used: u32) -> bool {
        match self {
            Self::Disabled => false,
            Self::Limited(limit) => used < limit,
            Self::Unlimited => true,
        }
    }

    /// Tokens a resynchronization must carry the parse past the offending token.
    pub fn default_acceptance_distance(self) -> usize {
        match self {
            Self::Unlimited => 1,
            _ => 2,
        }
    }
}

/// Whether a repair triggered by a semantic rejection consumes the repair budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RejectionPolicy {
    /// Every repair is charged, whatever made the branch fail.
    #[default]
    CountsAsRepair,
    /// Repairs following a failure caused by `Err(Backtrack)` are free. Recovery still has to be enabled.
    Free,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ParseOptions {
    repairs: RepairBudget,
    acceptance_distance: Option<usize>,
    rejection_policy: RejectionPolicy,
}

impl ParseOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the repair budget, from a [`RepairBudget`] or an `i32` count.
    pub fn with_repairs(mut self, repairs: impl Into<RepairBudget>) -> Self {
        self.repairs = repairs.into();
        self
    }

    /// Override the number of tokens a repair must parse beyond the offending token. Clamped to at least 1.
    pub fn with_acceptance_distance(mut self, distance: usize) -> Self {
        self.acceptance_distance = Some(distance.max(1));
        self
    }

    pub fn with_rejection_policy(mut self, policy: RejectionPolicy) -> Self {
        self.rejection_policy = policy;
        self
    }

    pub fn repairs(&self) -> RepairBudget {
        self.repairs
    }

    pub fn rejection_policy(&self) -> RejectionPolicy {
        self.rejection_policy
    }

    /// Acceptance distance for `budget`: the explicit override, or the budget's default.
    pub fn acceptance_distance(&self, budget: RepairBudget) -> usize {
        self.acceptance_distance
            .unwrap_or_else(|| budget.default_acceptance_distance())
    }
}
