//! Hand-encoded grammars and an instrumented action provider shared by the engine tests.

#![allow(dead_code)]

use retrace_core::{Entry, Goto, InMemoryTable, RuleNumber, SymbolId, TableBuilder, TokenIndex};
use retrace_engine::{ActionProvider, Backtrack, CancelFlag, Rule};

pub const EOF: SymbolId = 0;

/// Statement list with an error production.
///
/// ```text
/// 1  P  ::= Ss
/// 2  Ss ::= Ss St
/// 3  Ss ::= St
/// 4  St ::= a ;
/// 5  St ::= error a ;
/// ```
///
/// `b` is a terminal no state accepts, used as the spurious token.
pub struct Statements {
    pub table: InMemoryTable,
    pub a: SymbolId,
    pub semi: SymbolId,
    pub b: SymbolId,
}

pub fn statements() -> Statements {
    let mut g = TableBuilder::new("$eof", "error");
    let a = g.terminal("a");
    let semi = g.terminal(";");
    let b = g.terminal("b");
    let error = g.error();
    let eof = g.eof();
    let p = g.nonterminal("P");
    let ss = g.nonterminal("Ss");
    let st = g.nonterminal("St");
    let r1 = g.rule(p, &["Ss"]);
    let r2 = g.rule(ss, &["Ss", "St"]);
    let r3 = g.rule(ss, &["St"]);
    let r4 = g.rule(st, &["a", ";"]);
    let r5 = g.rule(st, &["error", "a", ";"]);

    let s: Vec<_> = (0..6).map(|_| g.state()).collect();
    g.action(s[0], a, Entry::Shift(s[3]))
        .action(s[0], error, Entry::Shift(s[4]))
        .goto(s[0], p, Goto::State(s[1]))
        .goto(s[0], ss, Goto::State(s[2]))
        .goto(s[0], st, Goto::Reduce(r3));
    g.action(s[1], eof, Entry::Accept);
    g.action(s[2], eof, Entry::Reduce(r1))
        .action(s[2], a, Entry::Shift(s[3]))
        .action(s[2], error, Entry::Shift(s[4]))
        .goto(s[2], st, Goto::Reduce(r2));
    g.action(s[3], semi, Entry::ShiftReduce(r4));
    g.action(s[4], a, Entry::Shift(s[5]));
    g.action(s[5], semi, Entry::ShiftReduce(r5));

    Statements {
        table: g.build(s[0]).unwrap(),
        a,
        semi,
        b,
    }
}

/// Two rules that only differ after the conflict point.
///
/// ```text
/// 1  S ::= A c x
/// 2  S ::= B c y
/// 3  A ::= a
/// 4  B ::= a
/// ```
///
/// On `c` after `a` the table keeps both reductions, `A ::= a` first.
pub struct Ambiguous {
    pub table: InMemoryTable,
    pub a: SymbolId,
    pub c: SymbolId,
    pub x: SymbolId,
    pub y: SymbolId,
}

pub fn ambiguous() -> Ambiguous {
    let (mut g, [a, c, x, y]) = two_way_symbols();
    let (sym_s, sym_a, sym_b) = (0, 1, 2);
    let s: Vec<_> = (0..7).map(|_| g.state()).collect();
    g.action(s[0], a, Entry::Shift(s[1]))
        .goto(s[0], sym_s, Goto::State(s[2]))
        .goto(s[0], sym_a, Goto::State(s[3]))
        .goto(s[0], sym_b, Goto::State(s[4]));
    g.action(s[1], c, Entry::Conflict(vec![Entry::Reduce(3), Entry::Reduce(4)]));
    g.action(s[2], EOF, Entry::Accept);
    g.action(s[3], c, Entry::Shift(s[5]));
    g.action(s[4], c, Entry::Shift(s[6]));
    g.action(s[5], x, Entry::ShiftReduce(1));
    g.action(s[6], y, Entry::ShiftReduce(2));
    Ambiguous {
        table: g.build(s[0]).unwrap(),
        a,
        c,
        x,
        y,
    }
}

/// Like [`ambiguous`] with two `c`s, decided by two terminals of lookahead instead of backtracking.
///
/// ```text
/// 1  S ::= A c c x
/// 2  S ::= B c c y
/// 3  A ::= a
/// 4  B ::= a
/// ```
pub fn lookahead() -> Ambiguous {
    let (mut g, [a, c, x, y]) = two_way_symbols_with(&["A", "c", "c", "x"], &["B", "c", "c", "y"]);
    let (sym_s, sym_a, sym_b) = (0, 1, 2);
    let s: Vec<_> = (0..9).map(|_| g.state()).collect();
    let la0 = g.lookahead_state();
    let la1 = g.lookahead_state();
    g.action(s[0], a, Entry::Shift(s[1]))
        .goto(s[0], sym_s, Goto::State(s[2]))
        .goto(s[0], sym_a, Goto::State(s[3]))
        .goto(s[0], sym_b, Goto::State(s[4]));
    g.action(s[1], c, Entry::Lookahead(la0));
    g.lookahead(la0, c, Entry::Lookahead(la1));
    g.lookahead(la1, x, Entry::Reduce(3)).lookahead(la1, y, Entry::Reduce(4));
    g.action(s[2], EOF, Entry::Accept);
    g.action(s[3], c, Entry::Shift(s[5]));
    g.action(s[5], c, Entry::Shift(s[7]));
    g.action(s[7], x, Entry::ShiftReduce(1));
    g.action(s[4], c, Entry::Shift(s[6]));
    g.action(s[6], c, Entry::Shift(s[8]));
    g.action(s[8], y, Entry::ShiftReduce(2));
    Ambiguous {
        table: g.build(s[0]).unwrap(),
        a,
        c,
        x,
        y,
    }
}

fn two_way_symbols() -> (TableBuilder, [SymbolId; 4]) {
    two_way_symbols_with(&["A", "c", "x"], &["B", "c", "y"])
}

fn two_way_symbols_with(first: &[&str], second: &[&str]) -> (TableBuilder, [SymbolId; 4]) {
    let mut g = TableBuilder::new("$eof", "error");
    let terminals = [g.terminal("a"), g.terminal("c"), g.terminal("x"), g.terminal("y")];
    let s = g.nonterminal("S");
    let a = g.nonterminal("A");
    let b = g.nonterminal("B");
    g.rule(s, first);
    g.rule(s, second);
    g.rule(a, &["a"]);
    g.rule(b, &["a"]);
    (g, terminals)
}

/// Terminal ids of the whitespace-separated names in `text`.
pub fn kinds(table: &InMemoryTable, text: &str) -> Vec<SymbolId> {
    text.split_whitespace()
        .map(|name| table.terminal_id(name).unwrap())
        .collect()
}

/// The base alternative gets further before failing than the one explored after it.
///
/// ```text
/// 1  S ::= A c x error ;
/// 2  S ::= B c y ;
/// 3  A ::= a
/// 4  B ::= a
/// ```
///
/// Only the `A` branch can absorb a spurious token, and only after `x`. `q` is accepted nowhere.
pub fn late_error() -> InMemoryTable {
    let mut g = TableBuilder::new("$eof", "error");
    let [a, c, x, y, semi] = ["a", "c", "x", "y", ";"].map(|name| g.terminal(name));
    g.terminal("q");
    let error = g.error();
    let (s, sym_a, sym_b) = (g.nonterminal("S"), g.nonterminal("A"), g.nonterminal("B"));
    let r1 = g.rule(s, &["A", "c", "x", "error", ";"]);
    let r2 = g.rule(s, &["B", "c", "y", ";"]);
    let r3 = g.rule(sym_a, &["a"]);
    let r4 = g.rule(sym_b, &["a"]);

    let st: Vec<_> = (0..10).map(|_| g.state()).collect();
    g.action(st[0], a, Entry::Shift(st[1]))
        .goto(st[0], s, Goto::State(st[2]))
        .goto(st[0], sym_a, Goto::State(st[3]))
        .goto(st[0], sym_b, Goto::State(st[4]));
    g.action(st[1], c, Entry::Conflict(vec![Entry::Reduce(r3), Entry::Reduce(r4)]));
    g.action(st[2], EOF, Entry::Accept);
    g.action(st[3], c, Entry::Shift(st[5]));
    g.action(st[5], x, Entry::Shift(st[7]));
    g.action(st[7], error, Entry::Shift(st[8]));
    g.action(st[8], semi, Entry::ShiftReduce(r1));
    g.action(st[4], c, Entry::Shift(st[6]));
    g.action(st[6], y, Entry::Shift(st[9]));
    g.action(st[9], semi, Entry::ShiftReduce(r2));
    g.build(st[0]).unwrap()
}

/// An empty reduction pushes a level at the same location as the start state.
///
/// ```text
/// 1  P ::= O a ;
/// 2  P ::= error ;
/// 3  O ::=
/// 4  P ::= O error ;
/// ```
///
/// Both levels accept the error terminal. `q` is accepted nowhere.
pub fn nullable_prefix() -> InMemoryTable {
    let mut g = TableBuilder::new("$eof", "error");
    let [a, semi] = ["a", ";"].map(|name| g.terminal(name));
    g.terminal("q");
    let error = g.error();
    let (p, o) = (g.nonterminal("P"), g.nonterminal("O"));
    let r1 = g.rule(p, &["O", "a", ";"]);
    let r2 = g.rule(p, &["error", ";"]);
    let r3 = g.rule(o, &[]);
    let r4 = g.rule(p, &["O", "error", ";"]);

    let st: Vec<_> = (0..7).map(|_| g.state()).collect();
    g.action(st[0], a, Entry::Reduce(r3))
        .action(st[0], error, Entry::Shift(st[5]))
        .goto(st[0], o, Goto::State(st[1]))
        .goto(st[0], p, Goto::State(st[2]));
    g.action(st[1], a, Entry::Shift(st[3]))
        .action(st[1], error, Entry::Shift(st[6]));
    g.action(st[2], EOF, Entry::Accept);
    g.action(st[3], semi, Entry::ShiftReduce(r1));
    g.action(st[5], semi, Entry::ShiftReduce(r2));
    g.action(st[6], semi, Entry::ShiftReduce(r4));
    g.build(st[0]).unwrap()
}

/// Error productions at two depths.
///
/// ```text
/// 1  P ::= ( B )
/// 2  P ::= error ;
/// 3  B ::= a
/// 4  B ::= error
/// ```
///
/// Inside the parentheses an error can only be followed by `)`.
pub fn nested_errors() -> InMemoryTable {
    let mut g = TableBuilder::new("$eof", "error");
    let [open, close, a, semi] = ["(", ")", "a", ";"].map(|name| g.terminal(name));
    g.terminal("q");
    let error = g.error();
    let (p, b) = (g.nonterminal("P"), g.nonterminal("B"));
    let r1 = g.rule(p, &["(", "B", ")"]);
    let r2 = g.rule(p, &["error", ";"]);
    let r3 = g.rule(b, &["a"]);
    let r4 = g.rule(b, &["error"]);

    let st: Vec<_> = (0..6).map(|_| g.state()).collect();
    g.action(st[0], open, Entry::Shift(st[1]))
        .action(st[0], error, Entry::Shift(st[5]))
        .goto(st[0], p, Goto::State(st[2]));
    g.action(st[1], a, Entry::ShiftReduce(r3))
        .action(st[1], error, Entry::ShiftReduce(r4))
        .goto(st[1], b, Goto::State(st[3]));
    g.action(st[2], EOF, Entry::Accept);
    g.action(st[3], close, Entry::ShiftReduce(r1));
    g.action(st[5], semi, Entry::ShiftReduce(r2));
    g.build(st[0]).unwrap()
}

/// A unit rule that re-enters its own conflict.
///
/// ```text
/// 1  S ::= A x
/// 2  A ::= a
/// 3  A ::= A
/// ```
///
/// On `x` the table tries `A ::= A` before shifting.
pub fn unit_cycle() -> InMemoryTable {
    let mut g = TableBuilder::new("$eof", "error");
    let [a, x] = ["a", "x"].map(|name| g.terminal(name));
    let (s, sym_a) = (g.nonterminal("S"), g.nonterminal("A"));
    let r1 = g.rule(s, &["A", "x"]);
    let r2 = g.rule(sym_a, &["a"]);
    let r3 = g.rule(sym_a, &["A"]);

    let st: Vec<_> = (0..3).map(|_| g.state()).collect();
    g.action(st[0], a, Entry::ShiftReduce(r2))
        .goto(st[0], sym_a, Goto::State(st[1]))
        .goto(st[0], s, Goto::State(st[2]));
    g.action(st[1], x, Entry::Conflict(vec![Entry::Reduce(r3), Entry::ShiftReduce(r1)]));
    g.action(st[2], EOF, Entry::Accept);
    g.build(st[0]).unwrap()
}

/// [`ambiguous`] behind a leading error production, so a repair has to parse through the decision.
///
/// ```text
/// 1  S ::= error T
/// 2  T ::= A c x
/// 3  T ::= B c y
/// 4  A ::= a
/// 5  B ::= a
/// ```
///
/// With `by_lookahead` the decision on `c` peeks at the next terminal, otherwise it is a conflict with
/// `A ::= a` first.
pub fn guarded(by_lookahead: bool) -> InMemoryTable {
    let mut g = TableBuilder::new("$eof", "error");
    let [a, c, x, y] = ["a", "c", "x", "y"].map(|name| g.terminal(name));
    g.terminal("q");
    let error = g.error();
    let [s, t, sym_a, sym_b] = ["S", "T", "A", "B"].map(|name| g.nonterminal(name));
    let r1 = g.rule(s, &["error", "T"]);
    let r2 = g.rule(t, &["A", "c", "x"]);
    let r3 = g.rule(t, &["B", "c", "y"]);
    let r4 = g.rule(sym_a, &["a"]);
    let r5 = g.rule(sym_b, &["a"]);

    let st: Vec<_> = (0..10).map(|_| g.state()).collect();
    g.action(st[0], error, Entry::Shift(st[1]))
        .goto(st[0], s, Goto::State(st[2]));
    g.action(st[1], a, Entry::Shift(st[3]))
        .goto(st[1], t, Goto::State(st[4]))
        .goto(st[1], sym_a, Goto::State(st[5]))
        .goto(st[1], sym_b, Goto::State(st[6]));
    g.action(st[2], EOF, Entry::Accept);
    if by_lookahead {
        let la = g.lookahead_state();
        g.lookahead(la, x, Entry::Reduce(r4)).lookahead(la, y, Entry::Reduce(r5));
        g.action(st[3], c, Entry::Lookahead(la));
    } else {
        g.action(st[3], c, Entry::Conflict(vec![Entry::Reduce(r4), Entry::Reduce(r5)]));
    }
    g.action(st[4], EOF, Entry::Reduce(r1));
    g.action(st[5], c, Entry::Shift(st[7]));
    g.action(st[7], x, Entry::ShiftReduce(r2));
    g.action(st[6], c, Entry::Shift(st[8]));
    g.action(st[8], y, Entry::ShiftReduce(r3));
    g.build(st[0]).unwrap()
}

/// Action provider that records every call and keeps a trial/undo balance.
#[derive(Default)]
pub struct Recorder {
    pub events: Vec<String>,
    /// Trials kept minus undos.
    pub balance: i64,
    /// Commits in order, as `(rule, start, end)`.
    pub commits: Vec<(RuleNumber, usize, usize)>,
    /// Rules whose trial rejects the branch.
    pub reject: Vec<RuleNumber>,
    /// Raise this flag from the trial of the given rule.
    pub cancel_on: Option<(RuleNumber, CancelFlag)>,
    trials: u32,
}

impl Recorder {
    pub fn rejecting(rules: &[RuleNumber]) -> Self {
        Self {
            reject: rules.to_vec(),
            ..Self::default()
        }
    }

    pub fn cancelling(rule: RuleNumber, flag: CancelFlag) -> Self {
        Self {
            cancel_on: Some((rule, flag)),
            ..Self::default()
        }
    }

    pub fn committed_rules(&self) -> Vec<RuleNumber> {
        self.commits.iter().map(|&(rule, _, _)| rule).collect()
    }

    pub fn transcript(&self) -> String {
        self.events.join("\n")
    }
}

impl ActionProvider for Recorder {
    /// Serial number of the trial that kept the rule.
    type Payload = u32;

    fn trial(&mut self, rule: &mut Rule<u32>, _tokens: &[TokenIndex]) -> Result<bool, Backtrack> {
        if self.reject.contains(&rule.number) {
            self.events.push(format!("reject {} {:?}", rule.number, rule.span()));
            return Err(Backtrack);
        }
        if let Some((target, flag)) = &self.cancel_on {
            if *target == rule.number {
                flag.cancel();
            }
        }
        self.trials += 1;
        rule.payload = Some(self.trials);
        self.balance += 1;
        self.events.push(format!("trial {} {:?}", rule.number, rule.span()));
        Ok(true)
    }

    fn undo(&mut self, rule: &mut Rule<u32>) {
        self.balance -= 1;
        self.events.push(format!("undo {} {:?}", rule.number, rule.span()));
    }

    fn commit(&mut self, rule: &mut Rule<u32>, tokens: &[TokenIndex]) {
        self.commits.push((rule.number, rule.start, rule.end));
        self.events.push(format!(
            "commit {} {:?} {:?} #{}",
            rule.number,
            rule.span(),
            rule.tokens(tokens),
            rule.payload.map_or_else(|| "-".to_string(), |serial| serial.to_string())
        ));
    }
}
