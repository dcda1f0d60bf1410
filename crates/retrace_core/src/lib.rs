//! Shared vocabulary for the retrace backtracking LR engine: parse table access, action-code decoding,
//! in-memory tables and token streams.
//!
//! This crate is dependency-light and has no knowledge of the driving algorithm. The engine
//! (`retrace_engine`) only talks to the traits defined here, so any table or token source that implements them
//! can be driven.
//!
//! ## Notes
//! - Tables use the backtracking LR code layout documented on [`table::Sentinels`]: one integer range per action
//!   kind, with conflict lists and lookahead states addressed by code.
//! - Token streams address tokens by index. Index `0` is conventionally a start-of-stream sentinel so that an
//!   empty span `first > last` can be expressed for every position.
//!
//! ## Examples
//! ```rust
//! use retrace_core::builder::{Entry, Goto, TableBuilder};
//! use retrace_core::table::ParseTable;
//!
//! let mut b = TableBuilder::new("$eof", "error");
//! let a = b.terminal("a");
//! let s = b.nonterminal("S");
//! let r1 = b.rule(s, &["a"]);
//! let s0 = b.state();
//! let s1 = b.state();
//! b.action(s0, a, Entry::ShiftReduce(r1));
//! b.goto(s0, s, Goto::State(s1));
//! b.action(s1, b.eof(), Entry::Accept);
//! let table = b.build(s0).unwrap();
//! assert_eq!(table.rule_count(), 1);
//! ```

pub mod builder;
#[cfg(feature = "json")]
pub mod spec;
pub mod stream;
pub mod table;

pub use builder::{Entry, Goto, InMemoryTable, LookaheadRef, StateRef, TableBuilder};
pub use stream::{ErrorSpan, Span, Token, TokenStream, VecTokenStream};
pub use table::{Action, ParseTable, Sentinels, TableError};

/// Integer code stored in a parse table cell. States, rules, sentinels and conflict indices share one space.
pub type ActionCode = u32;

/// Rule numbers are 1-based; `0` never names a rule.
pub type RuleNumber = u32;

/// Terminal or nonterminal identifier. Terminals and nonterminals are numbered independently.
pub type SymbolId = u32;

/// Position of a token inside a [`TokenStream`].
pub type TokenIndex = usize;
