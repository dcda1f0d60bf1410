//! Input text to token stream.
//!
//! Input is a whitespace-separated sequence of terminal names, exactly as they are spelled in the table. Each
//! word becomes one token whose span is its byte range in the text. There is no lexing beyond that split.

use std::collections::HashMap;

use retrace_core::{ParseTable, Span, SymbolId, Token, VecTokenStream};

use crate::diagnostics::UnknownTerminal;

/// Split `source` into words with their byte offsets.
fn words(source: &str) -> Vec<(usize, &str)> {
    let mut words = Vec::new();
    let mut start = None;
    for (i, ch) in source.char_indices().chain(std::iter::once((source.len(), ' '))) {
        match (ch.is_whitespace(), start) {
            (true, Some(s)) => {
                words.push((s, &source[s..i]));
                start = None;
            }
            (false, None) => start = Some(i),
            _ => {}
        }
    }
    words
}

/// Map every word of `source` to the terminal of the same name.
///
/// The end-of-input terminal is appended by the stream and may not be spelled out. The error terminal may, which
/// lets an input exercise error productions directly.
///
/// ## Errors
/// Returns [`UnknownTerminal`] for the first word that names no terminal of `table`.
pub fn tokenize<T: ParseTable + ?Sized>(
    table: &T,
    source: &str,
    source_name: &str,
) -> Result<VecTokenStream, UnknownTerminal> {
    let eof = table.eof_symbol();
    let terminals: HashMap<&str, SymbolId> = (0..table.terminal_count())
        .filter(|&t| t != eof)
        .filter_map(|t| table.terminal_name(t).map(|name| (name, t)))
        .collect();

    let mut tokens = Vec::new();
    for (offset, word) in words(source) {
        let Some(&kind) = terminals.get(word) else {
            let mut known: Vec<(&str, SymbolId)> = terminals.iter().map(|(&name, &t)| (name, t)).collect();
            known.sort_by_key(|&(_, t)| t);
            let known: Vec<&str> = known.into_iter().map(|(name, _)| name).collect();
            return Err(UnknownTerminal::new(
                word,
                Span::new(offset, offset + word.len()),
                source,
                source_name,
                &known,
            ));
        };
        tokens.push(Token::new(kind, Span::new(offset, offset + word.len())));
    }
    Ok(VecTokenStream::new(tokens, eof))
}
