//! CLI command implementations
//!
//! All command functions return `CliResult<ExitCode>` instead of calling
//! `process::exit`. Error handling and exits happen in the top-level `run()`.

use std::fs;

use miette::GraphicalTheme;
use retrace_core::spec::TableSpec;
use retrace_core::{InMemoryTable, ParseTable, TokenIndex, TokenStream, VecTokenStream};
use retrace_engine::{Engine, ParseOptions, ParseOutcome, ParseStats};

use super::{CliError, CliResult, ExitCode};
use crate::derivation::Derivation;
use crate::diagnostics::{ParseError, RepairNote, SyntaxDiagnostic, render};
use crate::input::tokenize;

/// Maximum table or input file size (100 MB)
const MAX_SOURCE_SIZE: u64 = 100 * 1024 * 1024;

/// Read a table or input file.
///
/// ## Errors
///
/// Returns an error if:
/// - The file cannot be read (I/O error)
/// - The file exceeds `MAX_SOURCE_SIZE` (100 MB)
pub fn read_source(file_path: &str) -> CliResult<String> {
    let metadata =
        fs::metadata(file_path).map_err(|e| CliError::failure(format!("Cannot access file '{}': {}", file_path, e)))?;

    if metadata.len() > MAX_SOURCE_SIZE {
        return Err(CliError::failure(format!(
            "File '{}' is too large ({} bytes, max {} bytes)",
            file_path,
            metadata.len(),
            MAX_SOURCE_SIZE
        )));
    }

    fs::read_to_string(file_path).map_err(|e| CliError::failure(format!("Error reading file '{}': {}", file_path, e)))
}

/// Read and encode a JSON table file.
pub fn load_table(file_path: &str) -> CliResult<InMemoryTable> {
    let text = read_source(file_path)?;
    let spec: TableSpec = serde_json::from_str(&text)
        .map_err(|e| CliError::failure(format!("Invalid table file '{}': {}", file_path, e)))?;
    let table = spec
        .build()
        .map_err(|e| CliError::failure(format!("Invalid table '{}': {}", file_path, e)))?;
    tracing::debug!(
        path = file_path,
        states = table.state_count(),
        rules = table.rule_count(),
        "loaded table"
    );
    Ok(table)
}

/// One-line-per-fact summary of a table.
pub fn summarize(table: &InMemoryTable) -> String {
    let rows = [
        ("terminals", table.terminal_count() as usize),
        ("nonterminals", table.nonterminal_count()),
        ("rules", table.rule_count() as usize),
        ("states", table.state_count()),
        ("lookahead states", table.lookahead_count()),
        ("conflict entries", table.conflict_count()),
    ];
    rows.iter()
        .map(|(name, count)| format!("  {:<18}{}\n", format!("{name}:"), count))
        .collect()
}

/// Validate a table file and print its summary.
pub fn check_table(file_path: &str) -> CliResult<ExitCode> {
    let table = load_table(file_path)?;
    Engine::new(&table).map_err(|e| CliError::failure(format!("Table '{}' cannot be driven: {}", file_path, e)))?;
    println!("{}: ok", file_path);
    print!("{}", summarize(&table));
    Ok(ExitCode::SUCCESS)
}

/// Where `parse` reads its terminal names from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    File(String),
    Inline(String),
}

/// Arguments of the `parse` command.
#[derive(Debug, Clone)]
pub struct ParseRequest {
    pub table: String,
    pub source: InputSource,
    pub repairs: i32,
    pub distance: Option<usize>,
    pub stats: bool,
}

impl ParseRequest {
    pub fn options(&self) -> ParseOptions {
        let options = ParseOptions::new().with_repairs(self.repairs);
        match self.distance {
            Some(distance) => options.with_acceptance_distance(distance),
            None => options,
        }
    }
}

/// Result of an accepted parse.
#[derive(Debug)]
pub struct ParseSummary {
    /// Rendered committed reductions, one per line.
    pub derivation: String,
    /// Repairs that are part of the accepted parse, in input order.
    pub repairs: Vec<RepairNote>,
    pub stats: ParseStats,
}

/// A parse that was not accepted. `stats` is `None` when the input never reached the engine.
#[derive(Debug)]
pub struct ParseFailure {
    pub error: ParseError,
    pub stats: Option<ParseStats>,
}

/// Parse `source` with `engine`.
///
/// ## Errors
///
/// Returns a [`ParseFailure`] if a word names no terminal or the input could not be parsed within the repair
/// budget.
pub fn parse_source(
    engine: &Engine<'_, InMemoryTable>,
    source: &str,
    source_name: &str,
) -> Result<ParseSummary, ParseFailure> {
    let table = engine.table();
    let mut stream = tokenize(table, source, source_name).map_err(|e| ParseFailure {
        error: e.into(),
        stats: None,
    })?;
    let mut derivation = Derivation::new();
    let report = engine.parse_with_report(&mut stream, &mut derivation);

    match report.outcome {
        ParseOutcome::Accepted(tokens) => Ok(ParseSummary {
            derivation: derivation.render(table, &stream, source),
            repairs: accepted_repairs(table, &stream, &tokens, source, source_name),
            stats: report.stats,
        }),
        ParseOutcome::BadParse(offender) => {
            let diagnostic =
                SyntaxDiagnostic::new(table, &stream, offender, report.stats.error_state, source, source_name);
            Err(ParseFailure {
                error: diagnostic.into(),
                stats: Some(report.stats),
            })
        }
        ParseOutcome::Cancelled => Err(ParseFailure {
            error: ParseError::Cancelled,
            stats: Some(report.stats),
        }),
    }
}

/// Repairs among the accepted tokens. Repairs that were rewound by a later one are not reported.
fn accepted_repairs(
    table: &InMemoryTable,
    stream: &VecTokenStream,
    tokens: &[TokenIndex],
    source: &str,
    source_name: &str,
) -> Vec<RepairNote> {
    tokens
        .iter()
        .filter(|&&token| token >= stream.stream_length())
        .filter_map(|&token| RepairNote::new(table, stream, token, source, source_name))
        .collect()
}

pub fn format_stats(stats: &ParseStats) -> String {
    let mut out = String::new();
    out.push_str(&format!("steps: {}\n", stats.steps));
    out.push_str(&format!("trials: {}\n", stats.trials));
    out.push_str(&format!("undos: {}\n", stats.undos));
    out.push_str(&format!("commits: {}\n", stats.commits));
    out.push_str(&format!(
        "configurations: {} pushed, {} deepest\n",
        stats.configurations_pushed, stats.max_configuration_depth
    ));
    out.push_str(&format!("backtracks: {}\n", stats.backtracks));
    out.push_str(&format!("repairs: {}\n", stats.repairs));
    out.push_str(&format!("lookahead depth: {}\n", stats.max_lookahead));
    out
}

/// Parse input and print the committed reductions.
///
/// Repairs are printed as warnings; a syntax error that could not be repaired exits with
/// [`ExitCode::SYNTAX_ERROR`].
pub fn parse_input(request: &ParseRequest) -> CliResult<ExitCode> {
    let table = load_table(&request.table)?;
    let (source, source_name) = match &request.source {
        InputSource::File(path) => (read_source(path)?, path.clone()),
        InputSource::Inline(tokens) => (tokens.clone(), "<tokens>".to_string()),
    };

    let engine = Engine::new(&table)
        .map_err(|e| CliError::failure(format!("Table '{}' cannot be driven: {}", request.table, e)))?
        .with_options(request.options());

    match parse_source(&engine, &source, &source_name) {
        Ok(summary) => {
            for repair in &summary.repairs {
                eprint!("{}", render(repair, GraphicalTheme::default()));
            }
            print!("{}", summary.derivation);
            if request.stats {
                eprint!("{}", format_stats(&summary.stats));
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(failure) => {
            if let (true, Some(stats)) = (request.stats, &failure.stats) {
                eprint!("{}", format_stats(stats));
            }
            let message = render(&failure.error, GraphicalTheme::default());
            Err(CliError::syntax(message.trim_end()))
        }
    }
}
