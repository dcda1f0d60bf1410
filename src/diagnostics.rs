//! Syntax errors, repairs and input problems as `miette` diagnostics.
//!
//! All diagnostics own their source text so they can be rendered after the parse that produced them is gone.

use miette::{Diagnostic, GraphicalReportHandler, GraphicalTheme, NamedSource, SourceSpan};
use retrace_core::table::expected_terminals;
use retrace_core::{ActionCode, ParseTable, Span, TokenIndex, TokenStream, VecTokenStream};
use thiserror::Error;

/// A parse that could not be completed.
#[derive(Debug, Error, Diagnostic)]
#[error("unexpected {found}")]
#[diagnostic(code(retrace::syntax_error))]
pub struct SyntaxDiagnostic {
    /// Description of the offending token, e.g. `` `b` `` or `end of input`.
    pub found: String,
    /// Terminals the failing state would have accepted, error terminal excluded.
    pub expected: Vec<String>,
    #[source_code]
    pub source_code: NamedSource<String>,
    #[label("not expected here")]
    pub span: SourceSpan,
    #[help]
    pub help: Option<String>,
}

impl SyntaxDiagnostic {
    /// Describe the failure at `offender`. `error_state` is the state that could not act on it, when known.
    pub fn new<T: ParseTable + ?Sized>(
        table: &T,
        stream: &VecTokenStream,
        offender: TokenIndex,
        error_state: Option<ActionCode>,
        source: &str,
        source_name: &str,
    ) -> Self {
        let expected: Vec<String> = error_state
            .map(|state| expected_terminals(table, state))
            .unwrap_or_default()
            .into_iter()
            .map(|t| table.terminal_name(t).map_or_else(|| format!("#{t}"), str::to_string))
            .collect();
        let help = match expected.as_slice() {
            [] => None,
            [only] => Some(format!("expected `{only}`")),
            many => Some(format!("expected one of {}", quoted_list(many))),
        };
        Self {
            found: describe(table, stream, offender),
            expected,
            source_code: NamedSource::new(source_name, source.to_string()),
            span: token_span(stream, offender),
            help,
        }
    }
}

/// A syntax error the engine recovered from.
#[derive(Debug, Error, Diagnostic)]
#[error("{message}")]
#[diagnostic(code(retrace::repaired), severity(Warning))]
pub struct RepairNote {
    pub message: String,
    /// Number of raw tokens the error token replaced; `0` for an insertion.
    pub skipped: usize,
    #[source_code]
    pub source_code: NamedSource<String>,
    #[label("replaced by an error token")]
    pub span: SourceSpan,
    #[help]
    pub help: Option<String>,
}

impl RepairNote {
    /// Describe the synthesized error token `repair`. Returns `None` for a token that is not a repair.
    pub fn new<T: ParseTable + ?Sized>(
        table: &T,
        stream: &VecTokenStream,
        repair: TokenIndex,
        source: &str,
        source_name: &str,
    ) -> Option<Self> {
        let token = stream.token(repair)?;
        let covered = token.repair?;
        let found = describe(table, stream, covered.original);
        let skipped = if covered.is_insertion() {
            0
        } else {
            covered.last - covered.first + 1
        };
        let message = match skipped {
            0 => format!("recovered from unexpected {found} by inserting an error token"),
            1 => format!("recovered from unexpected {found} by skipping 1 token"),
            n => format!("recovered from unexpected {found} by skipping {n} tokens"),
        };
        let resume = stream.next_of(repair);
        Some(Self {
            message,
            skipped,
            source_code: NamedSource::new(source_name, source.to_string()),
            span: to_source_span(token.span),
            help: Some(format!("parsing resumed at {}", describe(table, stream, resume))),
        })
    }
}

/// A word of the input that names no terminal.
#[derive(Debug, Error, Diagnostic)]
#[error("unknown terminal `{name}`")]
#[diagnostic(code(retrace::unknown_terminal))]
pub struct UnknownTerminal {
    pub name: String,
    /// Terminal names that may appear in input.
    pub known: Vec<String>,
    #[source_code]
    pub source_code: NamedSource<String>,
    #[label("not a terminal of this table")]
    pub span: SourceSpan,
    #[help]
    pub help: Option<String>,
}

impl UnknownTerminal {
    pub fn new(name: &str, span: Span, source: &str, source_name: &str, known: &[&str]) -> Self {
        let known: Vec<String> = known.iter().map(|name| name.to_string()).collect();
        let help = (!known.is_empty()).then(|| format!("terminals are {}", quoted_list(&known)));
        Self {
            name: name.to_string(),
            known,
            source_code: NamedSource::new(source_name, source.to_string()),
            span: to_source_span(span),
            help,
        }
    }
}

/// Why input could not be turned into an accepted parse.
#[derive(Debug, Error, Diagnostic)]
pub enum ParseError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    UnknownTerminal(#[from] UnknownTerminal),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Syntax(#[from] SyntaxDiagnostic),

    #[error("parse cancelled")]
    #[diagnostic(code(retrace::cancelled))]
    Cancelled,
}

/// Render a diagnostic with source context.
///
/// Falls back to the plain message if the report cannot be rendered.
pub fn render(diagnostic: &dyn Diagnostic, theme: GraphicalTheme) -> String {
    let mut out = String::new();
    match GraphicalReportHandler::new_themed(theme).render_report(&mut out, diagnostic) {
        Ok(()) => out,
        Err(_) => diagnostic.to_string(),
    }
}

fn describe<T: ParseTable + ?Sized>(table: &T, stream: &VecTokenStream, token: TokenIndex) -> String {
    let kind = stream.kind_of(token);
    if kind == table.eof_symbol() {
        return "end of input".to_string();
    }
    match table.terminal_name(kind) {
        Some(name) => format!("`{name}`"),
        None => format!("terminal #{kind}"),
    }
}

fn token_span(stream: &VecTokenStream, token: TokenIndex) -> SourceSpan {
    stream
        .token(token)
        .map_or_else(|| SourceSpan::from(0..0), |t| to_source_span(t.span))
}

fn to_source_span(span: Span) -> SourceSpan {
    SourceSpan::from(span.start..span.end)
}

fn quoted_list(names: &[String]) -> String {
    names.iter().map(|name| format!("`{name}`")).collect::<Vec<_>>().join(", ")
}
