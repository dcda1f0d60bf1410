//! Token streams consumed by the engine.
//!
//! The engine never owns tokens; it holds [`TokenIndex`] values and asks the stream for kinds and neighbours.
//! [`VecTokenStream`] is the vector-backed implementation used by the CLI and the tests.

use crate::{SymbolId, TokenIndex};

/// Seekable, peekable source of terminals.
///
/// ## Notes
/// - `next_token` returns the token at the current position and advances; at end-of-input it keeps returning the
///   end-of-input token.
/// - Synthesized error tokens live past [`TokenStream::stream_length`] and are never returned by `next_token`.
pub trait TokenStream {
    /// Index of the token `next_token` would return, without consuming it.
    fn peek(&self) -> TokenIndex;

    fn next_token(&mut self) -> TokenIndex;

    fn kind_of(&self, token: TokenIndex) -> SymbolId;

    fn previous_of(&self, token: TokenIndex) -> TokenIndex;

    fn next_of(&self, token: TokenIndex) -> TokenIndex;

    /// Reposition so that `next_token` returns `position`.
    fn reset(&mut self, position: TokenIndex);

    /// Number of raw tokens, sentinel and end-of-input included.
    fn stream_length(&self) -> usize;

    /// Create a token of kind `error_kind` covering `first..=last`. An empty range (`first > last`) is an
    /// insertion. Returns the new token's index.
    fn synthesize_error_token(
        &mut self,
        first: TokenIndex,
        last: TokenIndex,
        original_error: TokenIndex,
        error_kind: SymbolId,
    ) -> TokenIndex;
}

/// Byte range of a token in its source text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Raw tokens covered by a synthesized error token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorSpan {
    pub first: TokenIndex,
    pub last: TokenIndex,
    /// The offending token that triggered the repair.
    pub original: TokenIndex,
}

impl ErrorSpan {
    /// Whether the repair inserted an error token without skipping anything.
    pub fn is_insertion(&self) -> bool {
        self.first > self.last
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: SymbolId,
    pub span: Span,
    pub repair: Option<ErrorSpan>,
}

impl Token {
    pub fn new(kind: SymbolId, span: Span) -> Self {
        Self {
            kind,
            span,
            repair: None,
        }
    }
}

/// Token stream over an owned vector.
///
/// Layout: index `0` is a start sentinel, the real tokens follow, then one end-of-input token. Error tokens are
/// appended after that.
#[derive(Debug, Clone)]
pub struct VecTokenStream {
    tokens: Vec<Token>,
    raw_len: usize,
    position: usize,
}

impl VecTokenStream {
    /// Build a stream from `tokens`, appending an end-of-input token of kind `eof`.
    pub fn new(tokens: impl IntoIterator<Item = Token>, eof: SymbolId) -> Self {
        let mut all = vec![Token::new(eof, Span::default())];
        all.extend(tokens);
        let end = all.last().map_or(0, |t| t.span.end);
        all.push(Token::new(eof, Span::new(end, end)));
        let raw_len = all.len();
        Self {
            tokens: all,
            raw_len,
            position: 1,
        }
    }

    /// Build a stream of unit-width tokens from terminal kinds, mostly for tests.
    pub fn from_kinds(kinds: &[SymbolId], eof: SymbolId) -> Self {
        Self::new(
            kinds.iter().enumerate().map(|(i, &kind)| Token::new(kind, Span::new(i, i + 1))),
            eof,
        )
    }

    pub fn token(&self, index: TokenIndex) -> Option<&Token> {
        self.tokens.get(index)
    }

    /// All tokens, sentinel and synthesized ones included.
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn first_index(&self) -> TokenIndex {
        1
    }

    pub fn eof_index(&self) -> TokenIndex {
        self.raw_len - 1
    }

    /// Synthesized error tokens in creation order.
    pub fn repairs(&self) -> impl Iterator<Item = (TokenIndex, &Token)> {
        self.tokens.iter().enumerate().skip(self.raw_len)
    }

    fn repair_of(&self, token: TokenIndex) -> Option<ErrorSpan> {
        self.tokens.get(token).and_then(|t| t.repair)
    }
}

impl TokenStream for VecTokenStream {
    fn peek(&self) -> TokenIndex {
        self.position
    }

    fn next_token(&mut self) -> TokenIndex {
        let token = self.position;
        if self.position < self.eof_index() {
            self.position += 1;
        }
        token
    }

    fn kind_of(&self, token: TokenIndex) -> SymbolId {
        match self.tokens.get(token) {
            Some(t) => t.kind,
            None => self.tokens[self.eof_index()].kind,
        }
    }

    fn previous_of(&self, token: TokenIndex) -> TokenIndex {
        if let Some(repair) = self.repair_of(token) {
            return self.previous_of(repair.first);
        }
        token.min(self.eof_index()).saturating_sub(1)
    }

    fn next_of(&self, token: TokenIndex) -> TokenIndex {
        if let Some(repair) = self.repair_of(token) {
            return self.next_of(repair.last);
        }
        (token + 1).min(self.eof_index())
    }

    fn reset(&mut self, position: TokenIndex) {
        self.position = position.clamp(1, self.eof_index());
    }

    fn stream_length(&self) -> usize {
        self.raw_len
    }

    fn synthesize_error_token(
        &mut self,
        first: TokenIndex,
        last: TokenIndex,
        original_error: TokenIndex,
        error_kind: SymbolId,
    ) -> TokenIndex {
        let start = self.tokens.get(first).map_or(0, |t| t.span.start);
        let end = if first > last {
            start
        } else {
            self.tokens.get(last).map_or(start, |t| t.span.end)
        };
        self.tokens.push(Token {
            kind: error_kind,
            span: Span::new(start, end),
            repair: Some(ErrorSpan {
                first,
                last,
                original: original_error,
            }),
        });
        self.tokens.len() - 1
    }
}
