//! LL(1) classification, predictive table construction and table-driven parsing.

use crate::{
    first_follow::{First, FirstSets, FollowSets, TerminalSet},
    grammar::{Grammar, NonterminalID, ProductionID, SymbolID, TerminalID},
    types::Map,
    util::display_fn,
    Verdict,
};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LL1Verdict {
    LL1,
    NotLL1(NotLL1Reason),
}

impl LL1Verdict {
    pub fn is_ll1(&self) -> bool {
        matches!(self, Self::LL1)
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| match self {
            Self::LL1 => f.write_str("the grammar is LL(1)"),
            Self::NotLL1(reason) => write!(f, "the grammar is not LL(1): {}", reason.display(g)),
        })
    }
}

/// The first reason found that disqualifies a grammar from LL(1).
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum NotLL1Reason {
    /// A production of the form `A -> A ...`.
    ///
    /// Only immediate left recursion is detected here.
    LeftRecursion {
        nonterminal: NonterminalID,
        production: ProductionID,
    },

    /// Two alternatives of the same nonterminal share a non-empty prefix.
    LeftFactoring {
        nonterminal: NonterminalID,
        productions: [ProductionID; 2],
        prefix_len: usize,
    },

    /// `First(alpha)` and `First(beta)` intersect.
    FirstFirst {
        nonterminal: NonterminalID,
        productions: [ProductionID; 2],
        overlap: First,
    },

    /// `alpha` can vanish and `First(beta)` intersects `Follow(A)`.
    FirstFollow {
        nonterminal: NonterminalID,
        nullable: ProductionID,
        other: ProductionID,
        overlap: TerminalSet,
    },
}

impl NotLL1Reason {
    pub fn nonterminal(&self) -> NonterminalID {
        match self {
            Self::LeftRecursion { nonterminal, .. }
            | Self::LeftFactoring { nonterminal, .. }
            | Self::FirstFirst { nonterminal, .. }
            | Self::FirstFollow { nonterminal, .. } => *nonterminal,
        }
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| match self {
            Self::LeftRecursion { production, .. } => {
                write!(f, "left recursion in `{}'", g.production(*production).display(g))
            }
            Self::LeftFactoring {
                productions: [p1, p2],
                prefix_len,
                ..
            } => write!(
                f,
                "`{}' and `{}' share a common prefix of {} symbol(s)",
                g.production(*p1).display(g),
                g.production(*p2).display(g),
                prefix_len
            ),
            Self::FirstFirst {
                productions: [p1, p2],
                overlap,
                ..
            } => write!(
                f,
                "First sets of `{}' and `{}' intersect on {}",
                g.production(*p1).display(g),
                g.production(*p2).display(g),
                overlap.display(g)
            ),
            Self::FirstFollow {
                nonterminal,
                nullable,
                other,
                overlap,
            } => write!(
                f,
                "`{}' can vanish but First of `{}' intersects Follow({}) on {}",
                g.production(*nullable).display(g),
                g.production(*other).display(g),
                g.nonterminal_name(*nonterminal),
                overlap.display(g)
            ),
        })
    }
}

/// Determine whether the grammar is LL(1).
///
/// The checks run in a fixed order (left recursion, then left factoring,
/// then First/Follow conflicts), each over the nonterminals in declaration
/// order, and the first hit wins.
pub fn classify(g: &Grammar, first: &FirstSets, follow: &FollowSets) -> LL1Verdict {
    let span = tracing::trace_span!("ll1_classify");
    let _entered = span.enter();

    let verdict = match left_recursion(g)
        .or_else(|| left_factoring(g))
        .or_else(|| first_follow_conflict(g, first, follow))
    {
        Some(reason) => LL1Verdict::NotLL1(reason),
        None => LL1Verdict::LL1,
    };
    tracing::debug!("LL(1) verdict: {}", verdict.display(g));
    verdict
}

fn left_recursion(g: &Grammar) -> Option<NotLL1Reason> {
    for &n in g.nonterminals.keys() {
        for (id, p) in g.productions_of(n) {
            if p.right.first() == Some(&SymbolID::N(n)) {
                return Some(NotLL1Reason::LeftRecursion {
                    nonterminal: n,
                    production: id,
                });
            }
        }
    }
    None
}

fn left_factoring(g: &Grammar) -> Option<NotLL1Reason> {
    for &n in g.nonterminals.keys() {
        let alternatives: Vec<_> = g.productions_of(n).collect();
        for (i, (id1, p1)) in alternatives.iter().enumerate() {
            for (id2, p2) in &alternatives[i + 1..] {
                let prefix_len = p1
                    .right
                    .iter()
                    .zip(&p2.right)
                    .take_while(|(x, y)| x == y)
                    .count();
                if prefix_len > 0 {
                    return Some(NotLL1Reason::LeftFactoring {
                        nonterminal: n,
                        productions: [*id1, *id2],
                        prefix_len,
                    });
                }
            }
        }
    }
    None
}

fn first_follow_conflict(
    g: &Grammar,
    first: &FirstSets,
    follow: &FollowSets,
) -> Option<NotLL1Reason> {
    for &n in g.nonterminals.keys() {
        let alternatives: Vec<_> = g
            .productions_of(n)
            .map(|(id, p)| (id, first.of_sequence(&p.right)))
            .collect();
        let follow_n = follow.get(n);

        for (i, (id1, first1)) in alternatives.iter().enumerate() {
            for (id2, first2) in &alternatives[i + 1..] {
                if first1.intersects(first2) {
                    return Some(NotLL1Reason::FirstFirst {
                        nonterminal: n,
                        productions: [*id1, *id2],
                        overlap: First {
                            terminals: first1.terminals.intersection(&first2.terminals),
                            nullable: first1.nullable && first2.nullable,
                        },
                    });
                }

                for ((nullable, _), (other, other_first)) in
                    [((id1, first1), (id2, first2)), ((id2, first2), (id1, first1))]
                        .into_iter()
                        .filter(|((_, f), _)| f.nullable)
                {
                    let overlap = other_first.terminals.intersection(follow_n);
                    if !overlap.is_empty() {
                        return Some(NotLL1Reason::FirstFollow {
                            nonterminal: n,
                            nullable: *nullable,
                            other: *other,
                            overlap,
                        });
                    }
                }
            }
        }
    }
    None
}

/// The predictive parsing table.
///
/// Values of this type are only produced by [`build_table`], so every table
/// handed to [`run`] is conflict-free.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LL1Table {
    cells: Map<(NonterminalID, TerminalID), ProductionID>,
    start: NonterminalID,
}

impl LL1Table {
    pub fn get(&self, nonterminal: NonterminalID, lookahead: TerminalID) -> Option<ProductionID> {
        self.cells.get(&(nonterminal, lookahead)).copied()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn iter(
        &self,
    ) -> impl Iterator<Item = ((NonterminalID, TerminalID), ProductionID)> + '_ {
        self.cells.iter().map(|(key, p)| (*key, *p))
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            for &n in g.nonterminals.keys() {
                writeln!(f, "## {}", g.nonterminal_name(n))?;
                for &t in g.terminals.keys() {
                    if let Some(p) = self.get(n, t) {
                        writeln!(
                            f,
                            "- {} => {}",
                            g.terminal_name(t),
                            g.production(p).display(g)
                        )?;
                    }
                }
            }
            Ok(())
        })
    }
}

/// Two productions competing for the same table cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableConflict {
    pub nonterminal: NonterminalID,
    pub lookahead: TerminalID,
    pub existing: ProductionID,
    pub incoming: ProductionID,
}

impl TableConflict {
    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            write!(
                f,
                "LL(1) table conflict at ({}, {}): `{}' vs `{}'",
                g.nonterminal_name(self.nonterminal),
                g.terminal_name(self.lookahead),
                g.production(self.existing).display(g),
                g.production(self.incoming).display(g)
            )
        })
    }
}

/// Construct the predictive parsing table.
///
/// Cells are filled for the nonterminals in declaration order, their
/// productions in definition order and the lookaheads in ascending
/// `TerminalID` order (First set first, then Follow set). Construction stops
/// at the first conflicting cell.
pub fn build_table(
    g: &Grammar,
    first: &FirstSets,
    follow: &FollowSets,
) -> Result<LL1Table, TableConflict> {
    let span = tracing::trace_span!("ll1_table");
    let _entered = span.enter();

    let mut cells = Map::default();
    for &n in g.nonterminals.keys() {
        for (id, p) in g.productions_of(n) {
            let first_alpha = first.of_sequence(&p.right);
            let follow_n = first_alpha.nullable.then(|| follow.get(n));
            let lookaheads = first_alpha
                .terminals
                .iter()
                .chain(follow_n.into_iter().flat_map(|f| f.iter()));
            for t in lookaheads {
                match cells.get(&(n, t)) {
                    Some(&existing) if existing != id => {
                        let conflict = TableConflict {
                            nonterminal: n,
                            lookahead: t,
                            existing,
                            incoming: id,
                        };
                        tracing::debug!("{}", conflict.display(g));
                        return Err(conflict);
                    }
                    Some(..) => (),
                    None => {
                        cells.insert((n, t), id);
                    }
                }
            }
        }
    }

    Ok(LL1Table {
        cells,
        start: g.start_symbol,
    })
}

/// Drive the predictive parser over `input`.
///
/// The end-of-input marker is appended implicitly and must not occur in
/// `input` itself.
pub fn run(g: &Grammar, table: &LL1Table, input: &[TerminalID]) -> Verdict {
    let span = tracing::trace_span!("ll1_run");
    let _entered = span.enter();

    if input.contains(&TerminalID::EOI) {
        return Verdict::Reject;
    }

    let mut stack = vec![SymbolID::T(TerminalID::EOI), SymbolID::N(table.start)];
    let mut cursor = 0;
    loop {
        let Some(&top) = stack.last() else {
            return Verdict::Reject;
        };
        let current = input.get(cursor).copied().unwrap_or(TerminalID::EOI);
        tracing::trace!(?top, ?current, depth = stack.len(), "step");

        match top {
            SymbolID::T(t) if t == current => {
                if t == TerminalID::EOI {
                    return Verdict::Accept;
                }
                stack.pop();
                cursor += 1;
            }

            SymbolID::T(..) => return Verdict::Reject,

            SymbolID::N(n) => {
                let Some(production) = table.get(n, current).and_then(|p| g.productions.get(&p))
                else {
                    return Verdict::Reject;
                };
                stack.pop();
                stack.extend(production.right.iter().rev().copied());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::SymbolID::*;

    struct Fixture {
        grammar: Grammar,
        first: FirstSets,
        follow: FollowSets,
    }

    impl Fixture {
        fn new(grammar: Grammar) -> Self {
            let first = FirstSets::compute(&grammar);
            let follow = FollowSets::compute(&grammar, &first, grammar.start_symbol);
            Self {
                grammar,
                first,
                follow,
            }
        }

        fn classify(&self) -> LL1Verdict {
            classify(&self.grammar, &self.first, &self.follow)
        }

        fn table(&self) -> Result<LL1Table, TableConflict> {
            build_table(&self.grammar, &self.first, &self.follow)
        }

        fn run(&self, input: &str) -> Verdict {
            let table = self.table().unwrap();
            let tokens = self.grammar.tokenize(input).unwrap();
            run(&self.grammar, &table, &tokens)
        }
    }

    #[test]
    fn right_recursive_list() {
        // S -> A ; A -> a A | e   (plus an unused terminal `b`)
        let fixture = Fixture::new(
            Grammar::define(|g| {
                let a_ = g.terminal("a")?;
                let _ = g.terminal("b")?;
                let s = g.nonterminal("S")?;
                let a = g.nonterminal("A")?;
                g.production(s, [N(a)])?;
                g.production(a, [T(a_), N(a)])?;
                g.production(a, [])?;
                Ok(())
            })
            .unwrap(),
        );
        assert_eq!(fixture.classify(), LL1Verdict::LL1);

        let table = fixture.table().unwrap();
        eprintln!("{}", table.display(&fixture.grammar));
        assert_eq!(table.len(), 4);

        assert_eq!(fixture.run("aaa"), Verdict::Accept);
        assert_eq!(fixture.run(""), Verdict::Accept);
        assert_eq!(fixture.run("aab"), Verdict::Reject);
        assert_eq!(fixture.run("b"), Verdict::Reject);
    }

    #[test]
    fn immediate_left_recursion() {
        // E -> E + T | T ; T -> id
        let fixture = Fixture::new(
            Grammar::define(|g| {
                let plus = g.terminal("+")?;
                let ident = g.terminal("id")?;
                let e = g.nonterminal("E")?;
                let t = g.nonterminal("T")?;
                g.production(e, [N(e), T(plus), N(t)])?;
                g.production(e, [N(t)])?;
                g.production(t, [T(ident)])?;
                Ok(())
            })
            .unwrap(),
        );
        let e = fixture.grammar.find_nonterminal("E").unwrap();
        assert!(matches!(
            fixture.classify(),
            LL1Verdict::NotLL1(NotLL1Reason::LeftRecursion { nonterminal, .. }) if nonterminal == e
        ));
    }

    #[test]
    fn common_prefix_is_reported_before_first_sets() {
        // A -> a b | a c
        let fixture = Fixture::new(
            Grammar::define(|g| {
                let a_ = g.terminal("a")?;
                let b_ = g.terminal("b")?;
                let c_ = g.terminal("c")?;
                let a = g.nonterminal("A")?;
                g.production(a, [T(a_), T(b_)])?;
                g.production(a, [T(a_), T(c_)])?;
                Ok(())
            })
            .unwrap(),
        );
        assert!(matches!(
            fixture.classify(),
            LL1Verdict::NotLL1(NotLL1Reason::LeftFactoring { prefix_len: 1, .. })
        ));
    }

    #[test]
    fn first_first_conflict() {
        // S -> A | B ; A -> a ; B -> a
        let fixture = Fixture::new(
            Grammar::define(|g| {
                let a_ = g.terminal("a")?;
                let s = g.nonterminal("S")?;
                let a = g.nonterminal("A")?;
                let b = g.nonterminal("B")?;
                g.production(s, [N(a)])?;
                g.production(s, [N(b)])?;
                g.production(a, [T(a_)])?;
                g.production(b, [T(a_)])?;
                Ok(())
            })
            .unwrap(),
        );
        let verdict = fixture.classify();
        eprintln!("{}", verdict.display(&fixture.grammar));
        assert!(matches!(
            verdict,
            LL1Verdict::NotLL1(NotLL1Reason::FirstFirst { .. })
        ));

        let conflict = fixture.table().unwrap_err();
        let g = &fixture.grammar;
        assert_eq!(conflict.nonterminal, g.find_nonterminal("S").unwrap());
        assert_eq!(conflict.lookahead, g.find_terminal("a").unwrap());
        assert_eq!(g.production(conflict.existing).right, [N(g.find_nonterminal("A").unwrap())]);
        assert_eq!(g.production(conflict.incoming).right, [N(g.find_nonterminal("B").unwrap())]);
    }

    #[test]
    fn first_follow_conflict() {
        // S -> A a ; A -> a | e
        let fixture = Fixture::new(
            Grammar::define(|g| {
                let a_ = g.terminal("a")?;
                let s = g.nonterminal("S")?;
                let a = g.nonterminal("A")?;
                g.production(s, [N(a), T(a_)])?;
                g.production(a, [T(a_)])?;
                g.production(a, [])?;
                Ok(())
            })
            .unwrap(),
        );
        let g = &fixture.grammar;
        match fixture.classify() {
            LL1Verdict::NotLL1(NotLL1Reason::FirstFollow {
                nonterminal,
                nullable,
                overlap,
                ..
            }) => {
                assert_eq!(nonterminal, g.find_nonterminal("A").unwrap());
                assert!(g.production(nullable).is_epsilon());
                assert_eq!(
                    overlap.iter().collect::<Vec<_>>(),
                    [g.find_terminal("a").unwrap()]
                );
            }
            verdict => panic!("unexpected verdict: {:?}", verdict),
        }
        assert!(fixture.table().is_err());
    }

    #[test]
    fn classic_expression_grammar() {
        let fixture = Fixture::new(
            Grammar::define(|g| {
                let plus = g.terminal("+")?;
                let star = g.terminal("*")?;
                let lparen = g.terminal("(")?;
                let rparen = g.terminal(")")?;
                let ident = g.terminal("id")?;

                let e = g.nonterminal("E")?;
                let e_ = g.nonterminal("E'")?;
                let t = g.nonterminal("T")?;
                let t_ = g.nonterminal("T'")?;
                let f = g.nonterminal("F")?;

                g.production(e, [N(t), N(e_)])?;
                g.production(e_, [T(plus), N(t), N(e_)])?;
                g.production(e_, [])?;
                g.production(t, [N(f), N(t_)])?;
                g.production(t_, [T(star), N(f), N(t_)])?;
                g.production(t_, [])?;
                g.production(f, [T(lparen), N(e), T(rparen)])?;
                g.production(f, [T(ident)])?;
                Ok(())
            })
            .unwrap(),
        );
        assert!(fixture.classify().is_ll1());
        assert!(fixture.table().is_ok());

        for input in ["id", "id+id*id", "(id+id)*id", "((id))"] {
            assert_eq!(fixture.run(input), Verdict::Accept, "{}", input);
        }
        for input in ["", "id+", "id+*id", "(id", "id)", "id id"] {
            assert_eq!(fixture.run(input), Verdict::Reject, "{}", input);
        }
    }
}
