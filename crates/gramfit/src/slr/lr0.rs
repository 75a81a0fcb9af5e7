//! LR(0) items and the canonical collection of item sets.

use crate::{
    grammar::{Grammar, NonterminalID, Production, ProductionID, SymbolID, EPSILON},
    types::Map,
    util::display_fn,
};
use std::{
    collections::{BTreeSet, VecDeque},
    fmt,
};

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateID(usize);

impl fmt::Debug for StateID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S#{:03}", self.0)
    }
}

impl fmt::Display for StateID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl StateID {
    pub const INITIAL: Self = Self(0);

    pub const fn from_index(index: usize) -> Self {
        Self(index)
    }

    pub const fn index(self) -> usize {
        self.0
    }
}

/// A grammar extended with the synthetic production `S' -> S`.
///
/// The extension lives only as long as the automaton construction that needs
/// it; the wrapped `Grammar` itself is never modified.
#[derive(Debug)]
pub struct Augmented<'g> {
    grammar: &'g Grammar,
    accept: Production,
}

impl<'g> Augmented<'g> {
    pub fn new(grammar: &'g Grammar) -> Self {
        Self {
            grammar,
            accept: Production {
                left: NonterminalID::AUGMENTED_START,
                right: vec![SymbolID::N(grammar.start_symbol)],
            },
        }
    }

    pub fn grammar(&self) -> &'g Grammar {
        self.grammar
    }

    pub fn production(&self, id: ProductionID) -> &Production {
        if id == ProductionID::AUGMENTED {
            &self.accept
        } else {
            self.grammar.production(id)
        }
    }

    fn productions_of(
        &self,
        left: NonterminalID,
    ) -> Box<dyn Iterator<Item = ProductionID> + '_> {
        if left == NonterminalID::AUGMENTED_START {
            Box::new(Some(ProductionID::AUGMENTED).into_iter())
        } else {
            Box::new(self.grammar.productions_of(left).map(|(id, _)| id))
        }
    }

    /// The symbols that can follow a dot, in `SymbolID` order.
    fn symbols(&self) -> impl Iterator<Item = SymbolID> + '_ {
        let terminals = self.grammar.terminals.keys().map(|t| SymbolID::T(*t));
        let nonterminals = self.grammar.nonterminals.keys().map(|n| SymbolID::N(*n));
        terminals.chain(nonterminals)
    }
}

/// The LR(0) item, a production with a marker position.
///
/// The left-hand side and the right-hand side are those of `production`, so
/// comparing the production ID and the marker compares all four components.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LR0Item {
    pub production: ProductionID,
    pub index: u16,
}

impl LR0Item {
    pub const fn start(production: ProductionID) -> Self {
        Self {
            production,
            index: 0,
        }
    }

    /// The symbol right after the marker, if any.
    pub fn next_symbol(&self, g: &Augmented<'_>) -> Option<SymbolID> {
        g.production(self.production)
            .right
            .get(usize::from(self.index))
            .copied()
    }

    /// Whether the marker has reached the end of the production.
    pub fn is_complete(&self, g: &Augmented<'_>) -> bool {
        usize::from(self.index) >= g.production(self.production).right.len()
    }

    fn advance(self) -> Self {
        Self {
            index: self.index + 1,
            ..self
        }
    }

    pub fn display<'a>(&'a self, g: &'a Augmented<'a>) -> impl fmt::Display + 'a {
        display_fn(move |f| {
            let production = g.production(self.production);
            let grammar = g.grammar();
            write!(f, "{} ->", grammar.nonterminal_name(production.left))?;
            if production.is_epsilon() {
                return write!(f, " . {}", EPSILON);
            }
            for (i, symbol) in production.right.iter().enumerate() {
                if i == usize::from(self.index) {
                    f.write_str(" .")?;
                }
                write!(f, " {}", grammar.symbol_name(*symbol))?;
            }
            if self.is_complete(g) {
                f.write_str(" .")?;
            }
            Ok(())
        })
    }
}

/// A set of LR(0) items.
///
/// Equality and hashing are those of the underlying set, independent of the
/// order in which the items were added.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash)]
pub struct ItemSet {
    items: BTreeSet<LR0Item>,
}

impl ItemSet {
    pub fn contains(&self, item: &LR0Item) -> bool {
        self.items.contains(item)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterate over the items in `(production, marker)` order.
    pub fn iter(&self) -> impl Iterator<Item = LR0Item> + '_ {
        self.items.iter().copied()
    }
}

impl FromIterator<LR0Item> for ItemSet {
    fn from_iter<I: IntoIterator<Item = LR0Item>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

/// Expand `items` with every item reachable through a nonterminal right
/// after a marker.
pub fn closure(g: &Augmented<'_>, items: impl IntoIterator<Item = LR0Item>) -> ItemSet {
    let mut set = ItemSet::default();
    let mut pending: Vec<LR0Item> = vec![];
    for item in items {
        if set.items.insert(item) {
            pending.push(item);
        }
    }

    while let Some(item) = pending.pop() {
        if let Some(SymbolID::N(n)) = item.next_symbol(g) {
            for production in g.productions_of(n) {
                let new_item = LR0Item::start(production);
                if set.items.insert(new_item) {
                    pending.push(new_item);
                }
            }
        }
    }

    set
}

/// `goto(I, X)`: advance the marker over `symbol` and take the closure.
///
/// An empty result means that there is no transition on `symbol`.
pub fn goto(g: &Augmented<'_>, items: &ItemSet, symbol: SymbolID) -> ItemSet {
    let kernels: Vec<_> = items
        .iter()
        .filter(|item| item.next_symbol(g) == Some(symbol))
        .map(LR0Item::advance)
        .collect();
    if kernels.is_empty() {
        return ItemSet::default();
    }
    closure(g, kernels)
}

/// The canonical collection of LR(0) item sets.
#[derive(Debug)]
pub struct CanonicalCollection {
    pub states: Map<StateID, ItemSet>,
    pub transitions: Map<(StateID, SymbolID), StateID>,
}

impl CanonicalCollection {
    pub fn display<'a>(&'a self, g: &'a Augmented<'a>) -> impl fmt::Display + 'a {
        display_fn(move |f| {
            for (id, items) in &self.states {
                writeln!(f, "#### State {}", id)?;
                for item in items.iter() {
                    writeln!(f, "- {}", item.display(g))?;
                }
            }
            Ok(())
        })
    }
}

/// Calculate the canonical collection starting from `closure({S' -> . S})`.
///
/// Only newly discovered states are expanded, and the symbols of a state
/// are visited in `SymbolID` order, so the numbering of the states is
/// deterministic.
pub fn canonical_collection(g: &Augmented<'_>) -> CanonicalCollection {
    let span = tracing::trace_span!("lr0");
    let _entered = span.enter();

    let mut states = Map::<StateID, ItemSet>::default();
    let mut isocores = Map::<ItemSet, StateID>::default();
    let mut transitions = Map::default();
    let mut pending = VecDeque::new();

    let initial = closure(g, Some(LR0Item::start(ProductionID::AUGMENTED)));
    isocores.insert(initial.clone(), StateID::INITIAL);
    states.insert(StateID::INITIAL, initial);
    pending.push_back(StateID::INITIAL);

    while let Some(current) = pending.pop_front() {
        let items = states[&current].clone();
        for symbol in g.symbols() {
            let target = goto(g, &items, symbol);
            if target.is_empty() {
                continue;
            }
            let next = match isocores.get(&target) {
                Some(id) => *id,
                None => {
                    let id = StateID::from_index(states.len());
                    tracing::trace!(?current, ?id, "new state");
                    isocores.insert(target.clone(), id);
                    states.insert(id, target);
                    pending.push_back(id);
                    id
                }
            };
            transitions.insert((current, symbol), next);
        }
    }

    tracing::debug!(states = states.len(), "canonical collection");
    CanonicalCollection {
        states,
        transitions,
    }
}
