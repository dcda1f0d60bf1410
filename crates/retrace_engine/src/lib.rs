//! Backtracking LR driver for tables and token streams described by `retrace_core`.
//!
//! The [`Engine`] explores conflicting table actions depth-first, rolling back on failure, repairs syntax errors
//! by synthesizing error tokens, and runs semantic actions transactionally: trial during exploration, undo when a
//! branch is abandoned, commit exactly once per reduction of the accepted parse.
//!
//! ## Notes
//! - Parsing is single-threaded and synchronous. Cancellation is cooperative through a [`Monitor`].
//! - Table problems are reported once, by [`Engine::new`]; a parse never fails because of the table.
//!
//! ## Examples
//! ```rust
//! use retrace_core::{Entry, Goto, TableBuilder, VecTokenStream};
//! use retrace_engine::{ActionTable, Engine, ParseOutcome, RuleHandler};
//!
//! // S ::= a | S a
//! let mut b = TableBuilder::new("$eof", "error");
//! let a = b.terminal("a");
//! let s = b.nonterminal("S");
//! let single = b.rule(s, &["a"]);
//! let more = b.rule(s, &["S", "a"]);
//! let s0 = b.state();
//! let s1 = b.state();
//! b.action(s0, a, Entry::ShiftReduce(single));
//! b.goto(s0, s, Goto::State(s1));
//! b.action(s1, a, Entry::ShiftReduce(more));
//! b.action(s1, b.eof(), Entry::Accept);
//! let table = b.build(s0).unwrap();
//!
//! let mut actions = ActionTable::<Vec<u32>, ()>::new(Vec::new(), 2)
//!     .with_rule(single, RuleHandler::commit_only(|seen, rule, _| seen.push(rule.number)))
//!     .with_rule(more, RuleHandler::commit_only(|seen, rule, _| seen.push(rule.number)));
//! let mut stream = VecTokenStream::from_kinds(&[a, a, a], b.eof());
//!
//! let outcome = Engine::new(&table).unwrap().parse(&mut stream, &mut actions, 0);
//! assert!(outcome.is_accepted());
//! assert_eq!(actions.state(), &vec![1, 2, 2]);
//! ```

pub mod actions;
mod automaton;
pub mod config;
pub mod driver;
pub mod monitor;
pub mod options;
pub mod outcome;
mod recovery;
pub mod stacks;

pub use actions::{ActionProvider, ActionTable, Backtrack, NoActions, Rule, RuleHandler, RuleSpan};
pub use driver::Engine;
pub use monitor::{CancelFlag, Monitor};
pub use options::{ParseOptions, RejectionPolicy, RepairBudget};
pub use outcome::{ParseOutcome, ParseReport, ParseStats};
