//! Calculation of First and Follow sets.
//!
//! Both sets are computed by plain fixpoint iteration over the productions:
//! every pass only ever adds elements, and the alphabet is finite, so the
//! loops terminate.

use crate::{
    grammar::{Grammar, NonterminalID, SymbolID, TerminalID, EPSILON},
    types::Map,
    util::{display_fn, write_joined},
};
use std::fmt;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TerminalSet {
    inner: bit_set::BitSet,
}

impl TerminalSet {
    pub fn contains(&self, id: TerminalID) -> bool {
        self.inner.contains(id.into_raw().into())
    }
    pub fn insert(&mut self, id: TerminalID) -> bool {
        self.inner.insert(id.into_raw().into())
    }
    /// Add all elements of `other`, returning whether the set grew.
    pub fn union_with(&mut self, other: &Self) -> bool {
        let len = self.inner.len();
        self.inner.union_with(&other.inner);
        self.inner.len() != len
    }
    pub fn intersection(&self, other: &Self) -> Self {
        let mut inner = self.inner.clone();
        inner.intersect_with(&other.inner);
        Self { inner }
    }
    pub fn is_disjoint(&self, other: &Self) -> bool {
        self.inner.is_disjoint(&other.inner)
    }
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
    pub fn len(&self) -> usize {
        self.inner.len()
    }
    /// Iterate over the elements in ascending ID order.
    pub fn iter(&self) -> impl Iterator<Item = TerminalID> + '_ {
        self.inner
            .iter()
            .filter_map(|raw| u16::try_from(raw).ok())
            .map(TerminalID::from_raw)
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            f.write_str("{")?;
            write_joined(f, ", ", self.iter().map(|t| g.terminal_name(t)))?;
            f.write_str("}")
        })
    }
}

impl FromIterator<TerminalID> for TerminalSet {
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = TerminalID>,
    {
        Self {
            inner: iter.into_iter().map(|t| t.into_raw().into()).collect(),
        }
    }
}

/// The First set of a symbol or a sequence of symbols.
///
/// `nullable` records whether epsilon is a member.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct First {
    pub terminals: TerminalSet,
    pub nullable: bool,
}

impl First {
    pub fn contains_epsilon(&self) -> bool {
        self.nullable
    }

    /// Whether the two sets share an element, epsilon included.
    pub fn intersects(&self, other: &Self) -> bool {
        (self.nullable && other.nullable) || !self.terminals.is_disjoint(&other.terminals)
    }

    fn absorb(&mut self, other: &Self) -> bool {
        let mut changed = self.terminals.union_with(&other.terminals);
        if other.nullable && !self.nullable {
            self.nullable = true;
            changed = true;
        }
        changed
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            f.write_str("{")?;
            let epsilon = self.nullable.then_some(EPSILON);
            write_joined(
                f,
                ", ",
                self.terminals
                    .iter()
                    .map(|t| g.terminal_name(t))
                    .chain(epsilon),
            )?;
            f.write_str("}")
        })
    }
}

#[derive(Debug)]
pub struct FirstSets {
    map: Map<SymbolID, First>,
    iterations: usize,
}

impl FirstSets {
    pub fn compute(g: &Grammar) -> Self {
        let span = tracing::trace_span!("first_sets");
        let _entered = span.enter();

        let mut map = Map::<SymbolID, First>::default();

        // First(t) = {t}
        for &t in g.terminals.keys() {
            map.insert(
                SymbolID::T(t),
                First {
                    terminals: Some(t).into_iter().collect(),
                    nullable: false,
                },
            );
        }
        for &n in g.nonterminals.keys() {
            map.insert(SymbolID::N(n), First::default());
        }

        let mut iterations = 0;
        let mut changed = true;
        while changed {
            changed = false;
            iterations += 1;
            for production in g.productions.values() {
                let derived = first_of_sequence(&map, &production.right);
                changed |= map[&SymbolID::N(production.left)].absorb(&derived);
            }
            tracing::trace!(iterations, changed, "first sets updated");
        }

        Self { map, iterations }
    }

    pub fn get(&self, symbol: SymbolID) -> &First {
        &self.map[&symbol]
    }

    /// `First(X1 X2 ... Xn)`
    pub fn of_sequence(&self, symbols: &[SymbolID]) -> First {
        first_of_sequence(&self.map, symbols)
    }

    /// The number of passes the fixpoint iteration took.
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn iter(&self) -> impl Iterator<Item = (SymbolID, &First)> + '_ {
        self.map.iter().map(|(s, first)| (*s, first))
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            let nonterminals = g.nonterminals.keys().map(|n| SymbolID::N(*n));
            let terminals = g
                .terminals
                .keys()
                .filter(|t| **t != TerminalID::EOI)
                .map(|t| SymbolID::T(*t));
            for symbol in nonterminals.chain(terminals) {
                writeln!(
                    f,
                    "First({}) = {}",
                    g.symbol_name(symbol),
                    self.get(symbol).display(g)
                )?;
            }
            Ok(())
        })
    }
}

fn first_of_sequence(map: &Map<SymbolID, First>, symbols: &[SymbolID]) -> First {
    let mut res = First::default();
    for symbol in symbols {
        let first = &map[symbol];
        res.terminals.union_with(&first.terminals);
        if !first.nullable {
            return res;
        }
    }
    // every symbol (or none at all) can vanish.
    res.nullable = true;
    res
}

#[derive(Debug)]
pub struct FollowSets {
    map: Map<NonterminalID, TerminalSet>,
    iterations: usize,
}

impl FollowSets {
    pub fn compute(g: &Grammar, first: &FirstSets, start: NonterminalID) -> Self {
        let span = tracing::trace_span!("follow_sets");
        let _entered = span.enter();

        let mut map = Map::<NonterminalID, TerminalSet>::default();
        for &n in g.nonterminals.keys() {
            map.insert(n, TerminalSet::default());
        }
        map.entry(start).or_default().insert(TerminalID::EOI);

        let mut iterations = 0;
        let mut changed = true;
        while changed {
            changed = false;
            iterations += 1;
            for production in g.productions.values() {
                for (i, symbol) in production.right.iter().enumerate() {
                    let b = match symbol {
                        SymbolID::N(b) => *b,
                        SymbolID::T(..) => continue,
                    };
                    // A -> alpha B beta
                    let beta = first.of_sequence(&production.right[i + 1..]);
                    changed |= map[&b].union_with(&beta.terminals);
                    if beta.nullable && b != production.left {
                        let follow_a = map[&production.left].clone();
                        changed |= map[&b].union_with(&follow_a);
                    }
                }
            }
            tracing::trace!(iterations, changed, "follow sets updated");
        }

        Self { map, iterations }
    }

    pub fn get(&self, symbol: NonterminalID) -> &TerminalSet {
        &self.map[&symbol]
    }

    /// The number of passes the fixpoint iteration took.
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn iter(&self) -> impl Iterator<Item = (NonterminalID, &TerminalSet)> + '_ {
        self.map.iter().map(|(n, follow)| (*n, follow))
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            for (n, follow) in &self.map {
                writeln!(
                    f,
                    "Follow({}) = {}",
                    g.nonterminal_name(*n),
                    follow.display(g)
                )?;
            }
            Ok(())
        })
    }
}
