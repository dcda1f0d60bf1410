//! CLI module for retrace
//!
//! This module provides the command-line interface over JSON table files.
//!
//! ## Commands
//!
//! - `check <TABLE>` - Validate a table file and summarize it
//! - `parse <TABLE> [INPUT]` - Parse whitespace-separated terminal names with a table
//!
//! ## Design
//!
//! The CLI uses clap for argument parsing with derive macros.
//! Command functions return `CliResult<T>` instead of calling `process::exit`.
//! Only the top-level `run()` function handles errors and exits.

// Enforce explicit error handling - no panicking in production code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod commands;

use std::fmt;
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

// ============================================================================
// CLI Error handling
// ============================================================================

/// Exit code for CLI operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(pub i32);

impl ExitCode {
    pub const SUCCESS: ExitCode = ExitCode(0);
    pub const FAILURE: ExitCode = ExitCode(1);
    /// The input did not parse.
    pub const SYNTAX_ERROR: ExitCode = ExitCode(2);
}

/// Error type for CLI operations.
///
/// Contains a user-facing message and an exit code. The CLI entry point
/// catches these errors, prints the message, and exits with the code.
#[derive(Debug)]
pub struct CliError {
    /// User-facing error message (already formatted for display)
    pub message: String,
    /// Exit code to return to the shell
    pub exit_code: ExitCode,
}

impl CliError {
    /// Create a new CLI error with a message and exit code.
    pub fn new(message: impl Into<String>, exit_code: ExitCode) -> Self {
        Self {
            message: message.into(),
            exit_code,
        }
    }

    /// Create a failure error (exit code 1).
    pub fn failure(message: impl Into<String>) -> Self {
        Self::new(message, ExitCode::FAILURE)
    }

    /// Create a syntax error (exit code 2).
    pub fn syntax(message: impl Into<String>) -> Self {
        Self::new(message, ExitCode::SYNTAX_ERROR)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

const VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// Clap CLI definition
// ============================================================================

/// Backtracking LR parsing with error recovery
#[derive(Parser, Debug)]
#[command(name = "retrace")]
#[command(version = VERSION)]
#[command(about = "Backtracking LR parsing with error recovery", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Validate a JSON table file and print a summary
    Check {
        /// Table file
        #[arg(value_name = "TABLE")]
        table: PathBuf,
    },

    /// Parse input with a table and print the committed reductions
    Parse {
        /// Table file
        #[arg(value_name = "TABLE")]
        table: PathBuf,
        /// File of whitespace-separated terminal names
        #[arg(value_name = "INPUT", conflicts_with = "tokens")]
        input: Option<PathBuf>,
        /// Parse these terminal names instead of a file
        #[arg(short = 't', long = "tokens", value_name = "TOKENS")]
        tokens: Option<String>,
        /// Error repairs allowed: 0 disables recovery, negative is unlimited
        #[arg(short = 'r', long, value_name = "N", default_value_t = 0, allow_negative_numbers = true)]
        repairs: i32,
        /// Tokens past the offending one a repair must parse
        #[arg(short = 'd', long, value_name = "N")]
        distance: Option<usize>,
        /// Print parse statistics
        #[arg(long)]
        stats: bool,
    },
}

// ============================================================================
// CLI entry point
// ============================================================================

/// Main CLI entry point.
///
/// This is the only place where `process::exit` is called. All command
/// implementations return `CliResult` and errors are handled here.
pub fn run() {
    let cli = Cli::parse();

    match execute(cli) {
        Ok(exit_code) => {
            if exit_code.0 != 0 {
                process::exit(exit_code.0);
            }
        }
        Err(e) => {
            if !e.message.is_empty() {
                eprintln!("{}", e.message);
            }
            process::exit(e.exit_code.0);
        }
    }
}

/// Execute the CLI command and return result.
fn execute(cli: Cli) -> CliResult<ExitCode> {
    match cli.command {
        Command::Check { table } => commands::check_table(&table.to_string_lossy()),
        Command::Parse {
            table,
            input,
            tokens,
            repairs,
            distance,
            stats,
        } => {
            let source = match (input, tokens) {
                (Some(path), _) => commands::InputSource::File(path.to_string_lossy().to_string()),
                (None, Some(tokens)) => commands::InputSource::Inline(tokens),
                (None, None) => {
                    return Err(CliError::failure("Error: parse requires an INPUT file or --tokens"));
                }
            };
            let request = commands::ParseRequest {
                table: table.to_string_lossy().to_string(),
                source,
                repairs,
                distance,
                stats,
            };
            commands::parse_input(&request)
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_check() {
        let cli = Cli::try_parse_from(["retrace", "check", "table.json"]).unwrap();
        assert!(matches!(cli.command, Command::Check { .. }));
    }

    #[test]
    fn test_cli_parse_with_tokens() {
        let cli = Cli::try_parse_from(["retrace", "parse", "table.json", "-t", "a ; a ;", "--stats"]).unwrap();
        if let Command::Parse {
            tokens,
            input,
            repairs,
            stats,
            ..
        } = cli.command
        {
            assert_eq!(tokens.as_deref(), Some("a ; a ;"));
            assert!(input.is_none());
            assert_eq!(repairs, 0);
            assert!(stats);
        } else {
            panic!("Expected Parse command");
        }
    }

    #[test]
    fn test_cli_parse_negative_repairs() {
        let cli = Cli::try_parse_from(["retrace", "parse", "table.json", "input.txt", "--repairs", "-1", "-d", "3"])
            .unwrap();
        if let Command::Parse {
            repairs, distance, ..
        } = cli.command
        {
            assert_eq!(repairs, -1);
            assert_eq!(distance, Some(3));
        } else {
            panic!("Expected Parse command");
        }
    }

    #[test]
    fn test_cli_input_conflicts_with_tokens() {
        let result = Cli::try_parse_from(["retrace", "parse", "table.json", "input.txt", "-t", "a"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_execute_requires_input() {
        let cli = Cli::try_parse_from(["retrace", "parse", "table.json"]).unwrap();
        let err = execute(cli).unwrap_err();
        assert_eq!(err.exit_code, ExitCode::FAILURE);
    }
}
