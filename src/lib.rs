#![forbid(unsafe_code)]
//! retrace: drive backtracking LR tables from the command line.
//!
//! The parsing machinery lives in two workspace crates: `retrace_core` (table encoding, JSON table files, token
//! streams) and `retrace_engine` (the backtracking driver). This crate adds what a tool around them needs: turning
//! input text into a token stream, recording the committed derivation, and rendering syntax errors and repairs as
//! `miette` diagnostics.
//!
//! ## Panic Policy
//!
//! - **Production code**: Use `Result` or `Option` with `?` / `ok_or` / `map_err`. The `cli` module enforces
//!   `#![deny(clippy::unwrap_used)]`.
//! - **Test code**: `.unwrap()` and `.expect()` are acceptable in tests.

pub mod cli;
pub mod derivation;
pub mod diagnostics;
pub mod input;

pub use derivation::{Derivation, Step};
pub use diagnostics::{ParseError, RepairNote, SyntaxDiagnostic, UnknownTerminal, render};
pub use input::tokenize;

pub use retrace_core::spec::TableSpec;
pub use retrace_engine::{Engine, ParseOptions, ParseOutcome};
