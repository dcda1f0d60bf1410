//! Serializable table descriptions (feature `json`).
//!
//! A [`TableSpec`] mirrors the [`TableBuilder`] API with names instead of ids and a compact entry syntax:
//!
//! | text    | entry                          |
//! |---------|--------------------------------|
//! | `s3`    | shift to state 3               |
//! | `r2`    | reduce rule 2                  |
//! | `sr4`   | shift, then reduce rule 4      |
//! | `acc`   | accept                         |
//! | `la0`   | defer to lookahead state 0     |
//! | `[..]`  | conflict, alternatives in order|
//!
//! Gotos use `s<N>` for a state and `r<N>` for a goto-reduce.
//!
//! ```json
//! {
//!   "eof": "$eof",
//!   "error": "error",
//!   "terminals": ["a"],
//!   "rules": [{ "lhs": "S", "rhs": ["a"] }],
//!   "states": [
//!     { "actions": { "a": "sr1" }, "gotos": { "S": "s1" } },
//!     { "actions": { "$eof": "acc" } }
//!   ]
//! }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::builder::{Entry, Goto, InMemoryTable, LookaheadRef, StateRef, TableBuilder};
use crate::table::TableError;
use crate::{RuleNumber, SymbolId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSpec {
    pub eof: String,
    pub error: String,
    /// Remaining terminals, numbered after `eof` and `error` in this order.
    #[serde(default)]
    pub terminals: Vec<String>,
    pub rules: Vec<RuleSpec>,
    pub states: Vec<StateSpec>,
    #[serde(default)]
    pub lookahead: Vec<BTreeMap<String, EntrySpec>>,
    #[serde(default)]
    pub start: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSpec {
    pub lhs: String,
    #[serde(default)]
    pub rhs: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSpec {
    #[serde(default)]
    pub actions: BTreeMap<String, EntrySpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<EntrySpec>,
    #[serde(default)]
    pub gotos: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntrySpec {
    One(String),
    Conflict(Vec<String>),
}

impl TableSpec {
    /// Encode the description into an [`InMemoryTable`].
    ///
    /// Nonterminals are numbered in order of first appearance as a rule left-hand side.
    ///
    /// ## Errors
    /// Returns [`TableError::UnknownSymbol`] for names that are neither declared terminals nor rule left-hand
    /// sides, [`TableError::InvalidEntry`] for unparseable entry text, and any error from
    /// [`TableBuilder::build`].
    pub fn build(&self) -> Result<InMemoryTable, TableError> {
        let mut b = TableBuilder::new(&self.eof, &self.error);
        for name in &self.terminals {
            b.terminal(name);
        }
        for rule in &self.rules {
            let lhs = b.nonterminal(&rule.lhs);
            let rhs: Vec<&str> = rule.rhs.iter().map(String::as_str).collect();
            b.rule(lhs, &rhs);
        }

        let states: Vec<StateRef> = self.states.iter().map(|_| b.state()).collect();
        let lookaheads: Vec<LookaheadRef> = self.lookahead.iter().map(|_| b.lookahead_state()).collect();

        for (state, spec) in states.iter().zip(&self.states) {
            if let Some(default) = &spec.default {
                let entry = parse_entry(default)?;
                b.default_action(*state, entry);
            }
            for (name, text) in &spec.actions {
                let terminal = terminal(&b, name)?;
                let entry = parse_entry(text)?;
                b.action(*state, terminal, entry);
            }
            for (name, text) in &spec.gotos {
                let nonterminal = b
                    .nonterminal_id(name)
                    .ok_or_else(|| TableError::UnknownSymbol(name.clone()))?;
                let goto = parse_goto(text)?;
                b.goto(*state, nonterminal, goto);
            }
        }

        for (la, spec) in lookaheads.iter().zip(&self.lookahead) {
            for (name, text) in spec {
                let terminal = terminal(&b, name)?;
                let entry = parse_entry(text)?;
                b.lookahead(*la, terminal, entry);
            }
        }

        b.build(StateRef(self.start))
    }
}

fn terminal(b: &TableBuilder, name: &str) -> Result<SymbolId, TableError> {
    b.terminal_id(name).ok_or_else(|| TableError::UnknownSymbol(name.to_string()))
}

fn parse_entry(spec: &EntrySpec) -> Result<Entry, TableError> {
    match spec {
        EntrySpec::One(text) => parse_single(text),
        EntrySpec::Conflict(alternatives) => alternatives
            .iter()
            .map(|text| parse_single(text))
            .collect::<Result<Vec<_>, _>>()
            .map(Entry::Conflict),
    }
}

fn parse_single(text: &str) -> Result<Entry, TableError> {
    let text = text.trim();
    let invalid = || TableError::InvalidEntry(text.to_string());
    let number = |digits: &str| digits.parse::<usize>().map_err(|_| invalid());

    if text == "acc" {
        Ok(Entry::Accept)
    } else if let Some(rest) = text.strip_prefix("sr") {
        Ok(Entry::ShiftReduce(number(rest)? as RuleNumber))
    } else if let Some(rest) = text.strip_prefix("la") {
        Ok(Entry::Lookahead(LookaheadRef(number(rest)?)))
    } else if let Some(rest) = text.strip_prefix('s') {
        Ok(Entry::Shift(StateRef(number(rest)?)))
    } else if let Some(rest) = text.strip_prefix('r') {
        Ok(Entry::Reduce(number(rest)? as RuleNumber))
    } else {
        Err(invalid())
    }
}

fn parse_goto(text: &str) -> Result<Goto, TableError> {
    match parse_single(text)? {
        Entry::Shift(state) => Ok(Goto::State(state)),
        Entry::Reduce(rule) => Ok(Goto::Reduce(rule)),
        _ => Err(TableError::InvalidEntry(text.to_string())),
    }
}
