//! In-memory parse tables assembled from explicit entries.
//!
//! [`TableBuilder`] does not compute LR item sets; it encodes a table someone (or some generator) already decided
//! into the code layout described on [`Sentinels`]. States and lookahead states are referred to by
//! [`StateRef`]/[`LookaheadRef`] handles until [`TableBuilder::build`] knows the final code ranges.
//!
//! ## Notes
//! - Missing terminal entries are errors unless the state has a default entry (default reductions).
//! - Conflict lists are laid out in state order, then terminal order, so the encoding is deterministic.

use std::collections::{BTreeMap, HashMap};

use crate::table::{ParseTable, Sentinels, TableError};
use crate::{ActionCode, RuleNumber, SymbolId};

/// Handle to a state under construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateRef(pub usize);

/// Handle to a lookahead state under construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LookaheadRef(pub usize);

/// A terminal entry of a state or lookahead state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    Shift(StateRef),
    Reduce(RuleNumber),
    ShiftReduce(RuleNumber),
    Accept,
    /// Alternatives tried in order by the backtracking driver. The first is the base action.
    Conflict(Vec<Entry>),
    /// Defer the decision to the next terminal(s).
    Lookahead(LookaheadRef),
}

/// A nonterminal entry of a state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Goto {
    State(StateRef),
    /// Reduce immediately without pushing a state (goto-reduce).
    Reduce(RuleNumber),
}

#[derive(Debug, Clone)]
struct RuleDef {
    lhs: SymbolId,
    rhs_len: usize,
    text: String,
}

#[derive(Debug, Clone, Default)]
struct StateDef {
    actions: BTreeMap<SymbolId, Entry>,
    default: Option<Entry>,
    gotos: BTreeMap<SymbolId, Goto>,
}

/// Assembles an [`InMemoryTable`].
#[derive(Debug, Clone)]
pub struct TableBuilder {
    terminals: Vec<String>,
    nonterminals: Vec<String>,
    terminal_ids: HashMap<String, SymbolId>,
    nonterminal_ids: HashMap<String, SymbolId>,
    rules: Vec<RuleDef>,
    states: Vec<StateDef>,
    lookaheads: Vec<BTreeMap<SymbolId, Entry>>,
    backtracking: bool,
}

impl TableBuilder {
    /// Create a builder whose terminal `0` is end-of-input and terminal `1` is the error terminal.
    pub fn new(eof: &str, error: &str) -> Self {
        let mut builder = Self {
            terminals: Vec::new(),
            nonterminals: Vec::new(),
            terminal_ids: HashMap::new(),
            nonterminal_ids: HashMap::new(),
            rules: Vec::new(),
            states: Vec::new(),
            lookaheads: Vec::new(),
            backtracking: true,
        };
        builder.terminal(eof);
        builder.terminal(error);
        builder
    }

    pub fn eof(&self) -> SymbolId {
        0
    }

    pub fn error(&self) -> SymbolId {
        1
    }

    /// Intern a terminal name.
    pub fn terminal(&mut self, name: &str) -> SymbolId {
        if let Some(&id) = self.terminal_ids.get(name) {
            return id;
        }
        let id = self.terminals.len() as SymbolId;
        self.terminals.push(name.to_string());
        self.terminal_ids.insert(name.to_string(), id);
        id
    }

    /// Intern a nonterminal name.
    pub fn nonterminal(&mut self, name: &str) -> SymbolId {
        if let Some(&id) = self.nonterminal_ids.get(name) {
            return id;
        }
        let id = self.nonterminals.len() as SymbolId;
        self.nonterminals.push(name.to_string());
        self.nonterminal_ids.insert(name.to_string(), id);
        id
    }

    pub fn terminal_id(&self, name: &str) -> Option<SymbolId> {
        self.terminal_ids.get(name).copied()
    }

    pub fn nonterminal_id(&self, name: &str) -> Option<SymbolId> {
        self.nonterminal_ids.get(name).copied()
    }

    /// Add a rule `lhs ::= rhs...` and return its number. The right-hand side names are only used for display and
    /// arity.
    pub fn rule(&mut self, lhs: SymbolId, rhs: &[&str]) -> RuleNumber {
        let lhs_name = self.nonterminals.get(lhs as usize).map(String::as_str).unwrap_or("?");
        let text = if rhs.is_empty() {
            format!("{lhs_name} ::=")
        } else {
            format!("{lhs_name} ::= {}", rhs.join(" "))
        };
        self.rules.push(RuleDef {
            lhs,
            rhs_len: rhs.len(),
            text,
        });
        self.rules.len() as RuleNumber
    }

    pub fn state(&mut self) -> StateRef {
        self.states.push(StateDef::default());
        StateRef(self.states.len() - 1)
    }

    pub fn lookahead_state(&mut self) -> LookaheadRef {
        self.lookaheads.push(BTreeMap::new());
        LookaheadRef(self.lookaheads.len() - 1)
    }

    /// Set the entry for `terminal` in `state`, replacing any earlier one.
    ///
    /// Unknown state handles are reported by [`TableBuilder::build`].
    pub fn action(&mut self, state: StateRef, terminal: SymbolId, entry: Entry) -> &mut Self {
        if let Some(def) = self.states.get_mut(state.0) {
            def.actions.insert(terminal, entry);
        }
        self
    }

    /// Entry used for every terminal without an explicit one.
    pub fn default_action(&mut self, state: StateRef, entry: Entry) -> &mut Self {
        if let Some(def) = self.states.get_mut(state.0) {
            def.default = Some(entry);
        }
        self
    }

    pub fn goto(&mut self, state: StateRef, nonterminal: SymbolId, goto: Goto) -> &mut Self {
        if let Some(def) = self.states.get_mut(state.0) {
            def.gotos.insert(nonterminal, goto);
        }
        self
    }

    pub fn lookahead(&mut self, la: LookaheadRef, terminal: SymbolId, entry: Entry) -> &mut Self {
        if let Some(map) = self.lookaheads.get_mut(la.0) {
            map.insert(terminal, entry);
        }
        self
    }

    /// Mark the table as generated without backtracking support. Such tables are rejected by the engine.
    pub fn set_backtracking(&mut self, backtracking: bool) -> &mut Self {
        self.backtracking = backtracking;
        self
    }

    /// Encode the table with `start` as its start state.
    ///
    /// ## Errors
    /// Returns a [`TableError`] for dangling state, lookahead, rule or symbol references, and for conflict lists
    /// that are empty or contain nested conflicts or lookahead entries.
    pub fn build(&self, start: StateRef) -> Result<InMemoryTable, TableError> {
        if self.rules.is_empty() {
            return Err(TableError::Malformed("table has no rules".to_string()));
        }
        if start.0 >= self.states.len() {
            return Err(TableError::UnknownState(start.0));
        }

        let rule_count = self.rules.len() as u32;
        let state_count = self.states.len() as u32;
        let accept = rule_count + state_count + 1;
        let conflict_slots: u32 = self
            .states
            .iter()
            .flat_map(|s| s.actions.values().chain(s.default.iter()))
            .chain(self.lookaheads.iter().flat_map(|la| la.values()))
            .map(conflict_slots)
            .sum();
        let error = accept + conflict_slots + 1;
        let sentinels = Sentinels {
            rule_count,
            accept,
            error,
            la_offset: error + rule_count,
        };

        let mut encoder = Encoder {
            builder: self,
            sentinels,
            conflicts: Vec::with_capacity(conflict_slots as usize),
        };

        let terminal_count = self.terminals.len();
        let nonterminal_count = self.nonterminals.len();

        let mut t_actions = vec![error; self.states.len() * terminal_count];
        let mut nt_actions = vec![error; self.states.len() * nonterminal_count];
        for (index, state) in self.states.iter().enumerate() {
            let row = &mut t_actions[index * terminal_count..(index + 1) * terminal_count];
            if let Some(default) = &state.default {
                let code = encoder.encode(default)?;
                row.fill(code);
            }
            for (&terminal, entry) in &state.actions {
                let slot = row
                    .get_mut(terminal as usize)
                    .ok_or_else(|| TableError::UnknownSymbol(format!("terminal #{terminal}")))?;
                *slot = encoder.encode(entry)?;
            }
            for (&nonterminal, goto) in &state.gotos {
                let code = match *goto {
                    Goto::State(target) => encoder.state_code(target)?,
                    Goto::Reduce(rule) => encoder.rule(rule)?,
                };
                let slot = nt_actions
                    .get_mut(index * nonterminal_count + nonterminal as usize)
                    .filter(|_| (nonterminal as usize) < nonterminal_count)
                    .ok_or_else(|| TableError::UnknownSymbol(format!("nonterminal #{nonterminal}")))?;
                *slot = code;
            }
        }

        let mut la_actions = vec![error; self.lookaheads.len() * terminal_count];
        for (index, la) in self.lookaheads.iter().enumerate() {
            for (&terminal, entry) in la {
                if terminal as usize >= terminal_count {
                    return Err(TableError::UnknownSymbol(format!("terminal #{terminal}")));
                }
                la_actions[index * terminal_count + terminal as usize] = encoder.encode(entry)?;
            }
        }

        for rule in &self.rules {
            if rule.lhs as usize >= nonterminal_count {
                return Err(TableError::UnknownSymbol(format!("nonterminal #{}", rule.lhs)));
            }
        }

        let start_state = encoder.state_code(start)?;
        let conflicts = encoder.conflicts;

        Ok(InMemoryTable {
            terminals: self.terminals.clone(),
            nonterminals: self.nonterminals.clone(),
            terminal_ids: self.terminal_ids.clone(),
            rules: self.rules.clone(),
            sentinels,
            start_state,
            state_count: self.states.len(),
            lookahead_count: self.lookaheads.len(),
            t_actions,
            nt_actions,
            la_actions,
            conflicts,
            backtracking: self.backtracking,
        })
    }
}

fn conflict_slots(entry: &Entry) -> u32 {
    match entry {
        Entry::Conflict(alternatives) => alternatives.len() as u32 + 1,
        _ => 0,
    }
}

struct Encoder<'b> {
    builder: &'b TableBuilder,
    sentinels: Sentinels,
    conflicts: Vec<ActionCode>,
}

impl Encoder<'_> {
    fn state_code(&self, state: StateRef) -> Result<ActionCode, TableError> {
        if state.0 >= self.builder.states.len() {
            return Err(TableError::UnknownState(state.0));
        }
        Ok(self.sentinels.rule_count + 1 + state.0 as ActionCode)
    }

    fn rule(&self, rule: RuleNumber) -> Result<RuleNumber, TableError> {
        if rule == 0 || rule > self.sentinels.rule_count {
            return Err(TableError::UnknownRule(rule));
        }
        Ok(rule)
    }

    fn encode(&mut self, entry: &Entry) -> Result<ActionCode, TableError> {
        match entry {
            Entry::Conflict(alternatives) => {
                if alternatives.is_empty() {
                    return Err(TableError::InvalidEntry("empty conflict".to_string()));
                }
                let index = self.sentinels.accept + 1 + self.conflicts.len() as ActionCode;
                let mut codes = Vec::with_capacity(alternatives.len() + 1);
                for alternative in alternatives {
                    if matches!(alternative, Entry::Conflict(_) | Entry::Lookahead(_)) {
                        return Err(TableError::InvalidEntry(format!(
                            "conflict alternative {alternative:?} must be a concrete action"
                        )));
                    }
                    codes.push(self.encode(alternative)?);
                }
                codes.push(0);
                self.conflicts.extend(codes);
                Ok(index)
            }
            other => self.encode_concrete(other),
        }
    }

    fn encode_concrete(&self, entry: &Entry) -> Result<ActionCode, TableError> {
        match *entry {
            Entry::Shift(state) => self.state_code(state),
            Entry::Reduce(rule) => self.rule(rule),
            Entry::ShiftReduce(rule) => Ok(self.sentinels.error + self.rule(rule)?),
            Entry::Accept => Ok(self.sentinels.accept),
            Entry::Lookahead(la) => {
                if la.0 >= self.builder.lookaheads.len() {
                    return Err(TableError::UnknownLookahead(la.0));
                }
                Ok(self.sentinels.la_offset + 1 + la.0 as ActionCode)
            }
            Entry::Conflict(_) => Err(TableError::InvalidEntry("nested conflict".to_string())),
        }
    }
}

/// A dense, fully encoded parse table.
#[derive(Debug, Clone)]
pub struct InMemoryTable {
    terminals: Vec<String>,
    nonterminals: Vec<String>,
    terminal_ids: HashMap<String, SymbolId>,
    rules: Vec<RuleDef>,
    sentinels: Sentinels,
    start_state: ActionCode,
    state_count: usize,
    lookahead_count: usize,
    t_actions: Vec<ActionCode>,
    nt_actions: Vec<ActionCode>,
    la_actions: Vec<ActionCode>,
    conflicts: Vec<ActionCode>,
    backtracking: bool,
}

impl InMemoryTable {
    pub fn sentinels(&self) -> Sentinels {
        self.sentinels
    }

    pub fn state_count(&self) -> usize {
        self.state_count
    }

    pub fn lookahead_count(&self) -> usize {
        self.lookahead_count
    }

    /// Number of conflict cells (entries that need backtracking).
    pub fn conflict_count(&self) -> usize {
        self.t_actions
            .iter()
            .chain(&self.la_actions)
            .filter(|&&code| matches!(self.sentinels.decode(code), crate::Action::Conflict(_)))
            .count()
    }

    pub fn nonterminal_count(&self) -> usize {
        self.nonterminals.len()
    }

    pub fn terminal_id(&self, name: &str) -> Option<SymbolId> {
        self.terminal_ids.get(name).copied()
    }

    /// Code of the state built from `state`.
    pub fn state_code(&self, state: StateRef) -> ActionCode {
        self.sentinels.rule_count + 1 + state.0 as ActionCode
    }

    fn state_row(&self, state: ActionCode) -> Option<usize> {
        let first = self.sentinels.rule_count + 1;
        let index = state.checked_sub(first)? as usize;
        (index < self.state_count).then_some(index)
    }
}

impl ParseTable for InMemoryTable {
    fn start_state(&self) -> ActionCode {
        self.start_state
    }

    fn rule_count(&self) -> u32 {
        self.sentinels.rule_count
    }

    fn rhs_len(&self, rule: RuleNumber) -> usize {
        rule.checked_sub(1)
            .and_then(|index| self.rules.get(index as usize))
            .map_or(0, |r| r.rhs_len)
    }

    fn lhs(&self, rule: RuleNumber) -> SymbolId {
        rule.checked_sub(1)
            .and_then(|index| self.rules.get(index as usize))
            .map_or(0, |r| r.lhs)
    }

    fn t_action(&self, state: ActionCode, terminal: SymbolId) -> ActionCode {
        let width = self.terminals.len();
        match self.state_row(state) {
            Some(row) if (terminal as usize) < width => self.t_actions[row * width + terminal as usize],
            _ => self.sentinels.error,
        }
    }

    fn nt_action(&self, state: ActionCode, nonterminal: SymbolId) -> ActionCode {
        let width = self.nonterminals.len();
        match self.state_row(state) {
            Some(row) if (nonterminal as usize) < width => self.nt_actions[row * width + nonterminal as usize],
            _ => self.sentinels.error,
        }
    }

    fn base_action(&self, index: ActionCode) -> ActionCode {
        index
            .checked_sub(self.sentinels.accept + 1)
            .and_then(|slot| self.conflicts.get(slot as usize))
            .copied()
            .unwrap_or(0)
    }

    fn look_ahead(&self, la_state: ActionCode, terminal: SymbolId) -> ActionCode {
        let width = self.terminals.len();
        match la_state.checked_sub(1).map(|i| i as usize) {
            Some(row) if row < self.lookahead_count && (terminal as usize) < width => {
                self.la_actions[row * width + terminal as usize]
            }
            _ => self.sentinels.error,
        }
    }

    fn accept_action(&self) -> ActionCode {
        self.sentinels.accept
    }

    fn error_action(&self) -> ActionCode {
        self.sentinels.error
    }

    fn la_state_offset(&self) -> ActionCode {
        self.sentinels.la_offset
    }

    fn error_symbol(&self) -> SymbolId {
        1
    }

    fn eof_symbol(&self) -> SymbolId {
        0
    }

    fn is_backtracking(&self) -> bool {
        self.backtracking
    }

    fn terminal_count(&self) -> u32 {
        self.terminals.len() as u32
    }

    fn terminal_name(&self, terminal: SymbolId) -> Option<&str> {
        self.terminals.get(terminal as usize).map(String::as_str)
    }

    fn nonterminal_name(&self, nonterminal: SymbolId) -> Option<&str> {
        self.nonterminals.get(nonterminal as usize).map(String::as_str)
    }

    fn rule_text(&self, rule: RuleNumber) -> Option<&str> {
        rule.checked_sub(1)
            .and_then(|index| self.rules.get(index as usize))
            .map(|r| r.text.as_str())
    }
}
