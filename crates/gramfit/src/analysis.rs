//! The combined LL(1)/SLR(1) analysis of a grammar.

use crate::{
    first_follow::{FirstSets, FollowSets},
    grammar::{Grammar, TerminalID},
    ll1::{self, LL1Table, LL1Verdict},
    slr::{self, SlrAutomaton, SlrConflict},
    Verdict,
};
use std::fmt;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ParserKind {
    /// The table-driven predictive parser.
    LL1,
    /// The shift/reduce parser driven by the SLR(1) automaton.
    SLR1,
}

impl fmt::Display for ParserKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::LL1 => "LL(1)",
            Self::SLR1 => "SLR(1)",
        })
    }
}

#[derive(Debug, thiserror::Error)]
#[error("the grammar is not {kind}")]
pub struct Unavailable {
    pub kind: ParserKind,
}

/// Everything derived from a grammar that the parsers need.
#[derive(Debug)]
pub struct Analysis<'g> {
    grammar: &'g Grammar,
    first: FirstSets,
    follow: FollowSets,
    ll1_verdict: LL1Verdict,
    ll1_table: Option<LL1Table>,
    automaton: SlrAutomaton,
    slr_conflicts: Vec<SlrConflict>,
}

impl<'g> Analysis<'g> {
    pub fn new(grammar: &'g Grammar) -> Self {
        let span = tracing::trace_span!("analysis");
        let _entered = span.enter();

        let first = FirstSets::compute(grammar);
        let follow = FollowSets::compute(grammar, &first, grammar.start_symbol);

        let ll1_verdict = ll1::classify(grammar, &first, &follow);
        tracing::debug!(ll1 = ll1_verdict.is_ll1(), "classified");
        let ll1_table = match (ll1_verdict.is_ll1(), ll1::build_table(grammar, &first, &follow)) {
            (true, Ok(table)) => Some(table),
            (true, Err(conflict)) => panic!(
                "the grammar is classified as LL(1) but its table has a conflict: {}",
                conflict.display(grammar)
            ),
            (false, _) => None,
        };

        let mut automaton = slr::build_automaton(grammar);
        let slr_conflicts = automaton.detect_conflicts_and_fill_reduce_actions(grammar, &follow);
        tracing::debug!(
            states = automaton.state_count(),
            conflicts = slr_conflicts.len(),
            "built SLR(1) automaton"
        );

        Self {
            grammar,
            first,
            follow,
            ll1_verdict,
            ll1_table,
            automaton,
            slr_conflicts,
        }
    }

    pub fn grammar(&self) -> &'g Grammar {
        self.grammar
    }

    pub fn first_sets(&self) -> &FirstSets {
        &self.first
    }

    pub fn follow_sets(&self) -> &FollowSets {
        &self.follow
    }

    pub fn ll1_verdict(&self) -> &LL1Verdict {
        &self.ll1_verdict
    }

    /// The predictive table, present iff the grammar is LL(1).
    pub fn ll1_table(&self) -> Option<&LL1Table> {
        self.ll1_table.as_ref()
    }

    pub fn slr_automaton(&self) -> &SlrAutomaton {
        &self.automaton
    }

    pub fn slr_conflicts(&self) -> &[SlrConflict] {
        &self.slr_conflicts
    }

    pub fn is_ll1(&self) -> bool {
        self.ll1_table.is_some()
    }

    pub fn is_slr1(&self) -> bool {
        self.slr_conflicts.is_empty()
    }

    /// The parsers that can be used for the grammar, LL(1) first.
    pub fn available(&self) -> Vec<ParserKind> {
        let mut kinds = vec![];
        if self.is_ll1() {
            kinds.push(ParserKind::LL1);
        }
        if self.is_slr1() {
            kinds.push(ParserKind::SLR1);
        }
        kinds
    }

    pub fn parse(&self, kind: ParserKind, input: &[TerminalID]) -> Result<Verdict, Unavailable> {
        let verdict = match kind {
            ParserKind::LL1 => {
                let table = self.ll1_table.as_ref().ok_or(Unavailable { kind })?;
                ll1::run(self.grammar, table, input)
            }
            ParserKind::SLR1 => {
                if !self.is_slr1() {
                    return Err(Unavailable { kind });
                }
                slr::run(self.grammar, &self.automaton, input)
            }
        };
        tracing::debug!(%kind, ?verdict, "parsed");
        Ok(verdict)
    }

    /// Tokenize `input` and parse it, rejecting strings that contain
    /// something other than the terminals of the grammar.
    pub fn parse_str(&self, kind: ParserKind, input: &str) -> Result<Verdict, Unavailable> {
        match self.grammar.tokenize(input) {
            Ok(tokens) => self.parse(kind, &tokens),
            Err(err) => {
                if !self.available().contains(&kind) {
                    return Err(Unavailable { kind });
                }
                tracing::warn!(%err, "rejecting untokenizable input");
                Ok(Verdict::Reject)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::SymbolID::*;

    #[test]
    fn both_parsers_agree_on_right_recursive_list() {
        // S -> A ; A -> a A | e
        let grammar = Grammar::define(|g| {
            let a = g.terminal("a")?;
            let s = g.nonterminal("S")?;
            let n_a = g.nonterminal("A")?;
            g.production(s, [N(n_a)])?;
            g.production(n_a, [T(a), N(n_a)])?;
            g.production(n_a, [])?;
            Ok(())
        })
        .unwrap();
        let analysis = Analysis::new(&grammar);
        assert_eq!(analysis.available(), [ParserKind::LL1, ParserKind::SLR1]);

        for kind in [ParserKind::LL1, ParserKind::SLR1] {
            assert!(analysis.parse_str(kind, "a").unwrap().is_accept());
            assert_eq!(analysis.parse_str(kind, "aaa").unwrap(), Verdict::Accept);
            assert_eq!(analysis.parse_str(kind, "").unwrap(), Verdict::Accept);
            assert_eq!(analysis.parse_str(kind, "ab").unwrap(), Verdict::Reject);
        }
    }

    #[test]
    fn only_slr1_for_left_recursion() {
        // E -> E + T | T ; T -> id
        let grammar = Grammar::define(|g| {
            let plus = g.terminal("+")?;
            let ident = g.terminal("id")?;
            let e = g.nonterminal("E")?;
            let t = g.nonterminal("T")?;
            g.production(e, [N(e), T(plus), N(t)])?;
            g.production(e, [N(t)])?;
            g.production(t, [T(ident)])?;
            Ok(())
        })
        .unwrap();
        let analysis = Analysis::new(&grammar);
        assert_eq!(analysis.available(), [ParserKind::SLR1]);
        assert!(analysis.ll1_table().is_none());

        let err = analysis.parse_str(ParserKind::LL1, "id").unwrap_err();
        assert_eq!(err.kind, ParserKind::LL1);
        assert_eq!(
            analysis.parse_str(ParserKind::SLR1, "id + id").unwrap(),
            Verdict::Accept
        );
    }

    #[test]
    fn neither_parser_for_ambiguous_grammar() {
        // E -> E + E | id
        let grammar = Grammar::define(|g| {
            let plus = g.terminal("+")?;
            let ident = g.terminal("id")?;
            let e = g.nonterminal("E")?;
            g.production(e, [N(e), T(plus), N(e)])?;
            g.production(e, [T(ident)])?;
            Ok(())
        })
        .unwrap();
        let analysis = Analysis::new(&grammar);
        assert!(analysis.available().is_empty());
        assert!(!analysis.slr_conflicts().is_empty());
        assert!(analysis.parse(ParserKind::SLR1, &[]).is_err());
    }
}
