//! Committed reductions of an accepted parse, in the order the engine commits them.

use retrace_core::{ParseTable, RuleNumber, TokenIndex, VecTokenStream};
use retrace_engine::{ActionProvider, Backtrack, Rule};

/// One committed reduction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub rule: RuleNumber,
    /// Token Sequence offsets covered by the rule.
    pub start: usize,
    pub end: usize,
    /// Stream indices of the covered tokens, error tokens included.
    pub tokens: Vec<TokenIndex>,
}

/// Action provider that records every commit and does nothing speculative.
#[derive(Debug, Default)]
pub struct Derivation {
    steps: Vec<Step>,
}

impl Derivation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// One line per step: the rule text and the source text it covers.
    ///
    /// Empty rules cover no text and are shown as `ε`.
    pub fn render<T: ParseTable + ?Sized>(&self, table: &T, stream: &VecTokenStream, source: &str) -> String {
        let rules: Vec<String> = self
            .steps
            .iter()
            .map(|step| {
                table
                    .rule_text(step.rule)
                    .map_or_else(|| format!("rule {}", step.rule), str::to_string)
            })
            .collect();
        let width = rules.iter().map(|text| text.chars().count()).max().unwrap_or(0);

        let mut out = String::new();
        for (step, rule) in self.steps.iter().zip(&rules) {
            let covered = covered_text(step, stream, source);
            out.push_str(&format!("{rule:<width$}  {covered}\n"));
        }
        out
    }
}

fn covered_text<'s>(step: &Step, stream: &VecTokenStream, source: &'s str) -> &'s str {
    let spans = step.tokens.iter().filter_map(|&token| stream.token(token)).map(|token| token.span);
    let (start, end) = spans.fold((usize::MAX, 0), |(start, end), span| (start.min(span.start), end.max(span.end)));
    if start >= end {
        return "ε";
    }
    source.get(start..end).unwrap_or("ε")
}

impl ActionProvider for Derivation {
    type Payload = ();

    fn trial(&mut self, _rule: &mut Rule<()>, _tokens: &[TokenIndex]) -> Result<bool, Backtrack> {
        Ok(false)
    }

    fn undo(&mut self, _rule: &mut Rule<()>) {}

    fn commit(&mut self, rule: &mut Rule<()>, tokens: &[TokenIndex]) {
        self.steps.push(Step {
            rule: rule.number,
            start: rule.start,
            end: rule.end,
            tokens: rule.tokens(tokens).to_vec(),
        });
    }
}
