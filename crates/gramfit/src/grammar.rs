//! Grammar types.

use crate::{
    types::Map,
    util::{display_fn, write_joined},
};
use std::fmt;

/// The reserved spelling of the empty derivation.
pub const EPSILON: &str = "e";

/// The reserved spelling of the end-of-input marker.
pub const END_OF_INPUT: &str = "$";

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct TerminalID {
    raw: u16,
}

impl TerminalID {
    /// Reserved symbol used as a terminal symbol that means the end of input.
    pub const EOI: Self = Self::from_raw(0);

    const OFFSET: u16 = 1;

    #[inline]
    pub const fn from_raw(raw: u16) -> Self {
        Self { raw }
    }

    #[inline]
    pub const fn into_raw(self) -> u16 {
        self.raw
    }
}

#[derive(Debug)]
pub struct Terminal {
    id: TerminalID,
    name: String,
}

impl Terminal {
    pub fn id(&self) -> TerminalID {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Terminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct NonterminalID {
    raw: u16,
}

impl NonterminalID {
    /// Reserved for the synthetic start symbol of an augmented grammar.
    ///
    /// No `Grammar` ever registers a nonterminal under this ID.
    pub const AUGMENTED_START: Self = Self::new(0);

    const OFFSET: u16 = 1;

    #[inline]
    const fn new(raw: u16) -> Self {
        Self { raw }
    }
}

#[derive(Debug)]
pub struct Nonterminal {
    id: NonterminalID,
    name: String,
}

impl Nonterminal {
    pub fn id(&self) -> NonterminalID {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Nonterminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SymbolID {
    T(TerminalID),
    N(NonterminalID),
}

/// The identifier of a production, assigned in definition order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct ProductionID {
    raw: u16,
}

impl ProductionID {
    /// Reserved for the synthetic production `S' -> S` of an augmented grammar.
    pub const AUGMENTED: Self = Self::new(0);

    const OFFSET: u16 = 1;

    #[inline]
    const fn new(raw: u16) -> Self {
        Self { raw }
    }

    #[inline]
    pub const fn into_raw(self) -> u16 {
        self.raw
    }
}

impl fmt::Display for ProductionID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.raw, f)
    }
}

/// The type that represents a production rule in grammar.
///
/// An epsilon production has an empty right-hand side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Production {
    pub left: NonterminalID,
    pub right: Vec<SymbolID>,
}

impl Production {
    pub fn is_epsilon(&self) -> bool {
        self.right.is_empty()
    }

    // `"LHS -> R1 R2 R3"`
    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            write!(f, "{} -> ", g.nonterminal_name(self.left))?;
            if self.is_epsilon() {
                return f.write_str(EPSILON);
            }
            write_joined(f, " ", self.right.iter().map(|s| g.symbol_name(*s)))
        })
    }
}

/// The grammar definition consumed by the analyzers.
///
/// Once defined, a `Grammar` is never mutated.
#[derive(Debug)]
#[non_exhaustive]
pub struct Grammar {
    pub terminals: Map<TerminalID, Terminal>,
    pub nonterminals: Map<NonterminalID, Nonterminal>,
    pub productions: Map<ProductionID, Production>,
    pub start_symbol: NonterminalID,
    alternatives: Map<NonterminalID, Vec<ProductionID>>,
}

impl Grammar {
    /// Define a grammar using the specified function.
    pub fn define<F>(f: F) -> Result<Self, GrammarDefError>
    where
        F: FnOnce(&mut GrammarDef) -> Result<(), GrammarDefError>,
    {
        let mut def = GrammarDef::default();
        f(&mut def)?;
        def.end()
    }

    pub fn production(&self, id: ProductionID) -> &Production {
        &self.productions[&id]
    }

    /// Iterate over the productions of `left`, in definition order.
    pub fn productions_of(
        &self,
        left: NonterminalID,
    ) -> impl Iterator<Item = (ProductionID, &Production)> + '_ {
        self.alternatives
            .get(&left)
            .into_iter()
            .flatten()
            .map(move |id| (*id, &self.productions[id]))
    }

    pub fn terminal_name(&self, id: TerminalID) -> &str {
        self.terminals.get(&id).map_or("<unknown>", |t| t.name())
    }

    pub fn nonterminal_name(&self, id: NonterminalID) -> &str {
        match self.nonterminals.get(&id) {
            Some(n) => n.name(),
            None if id == NonterminalID::AUGMENTED_START => "S'",
            None => "<unknown>",
        }
    }

    pub fn symbol_name(&self, symbol: SymbolID) -> &str {
        match symbol {
            SymbolID::T(t) => self.terminal_name(t),
            SymbolID::N(n) => self.nonterminal_name(n),
        }
    }

    pub fn find_terminal(&self, name: &str) -> Option<TerminalID> {
        self.terminals
            .values()
            .find(|t| t.name() == name)
            .map(|t| t.id())
    }

    pub fn find_nonterminal(&self, name: &str) -> Option<NonterminalID> {
        self.nonterminals
            .values()
            .find(|n| n.name() == name)
            .map(|n| n.id())
    }

    /// Split `input` into terminal symbols.
    ///
    /// Whitespace is skipped, and at each position the
    /// longest terminal spelling wins. The end-of-input marker is never
    /// produced; the parsers pad the input with it themselves.
    pub fn tokenize(&self, input: &str) -> Result<Vec<TerminalID>, TokenizeError> {
        let mut tokens = vec![];
        let mut offset = 0;
        while offset < input.len() {
            let rest = &input[offset..];
            let trimmed = rest.trim_start();
            if trimmed.len() != rest.len() {
                offset += rest.len() - trimmed.len();
                continue;
            }

            let matched = self
                .terminals
                .values()
                .filter(|t| t.id() != TerminalID::EOI && rest.starts_with(t.name()))
                .max_by_key(|t| t.name().len());
            match matched {
                Some(t) => {
                    tokens.push(t.id());
                    offset += t.name().len();
                }
                None => {
                    return Err(TokenizeError::UnknownSymbol {
                        offset,
                        rest: rest.to_owned(),
                    })
                }
            }
        }
        Ok(tokens)
    }
}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "## terminals:")?;
        for terminal in self.terminals.values() {
            writeln!(f, "{}", terminal)?;
        }

        writeln!(f, "\n## nonterminals:")?;
        for nonterminal in self.nonterminals.values() {
            write!(f, "{}", nonterminal)?;
            if nonterminal.id() == self.start_symbol {
                write!(f, " (start)")?;
            }
            writeln!(f)?;
        }

        writeln!(f, "\n## productions:")?;
        for (id, production) in &self.productions {
            writeln!(f, "{:>3}: {}", id, production.display(self))?;
        }

        Ok(())
    }
}

/// The contextural values for building a `Grammar`.
#[derive(Debug)]
pub struct GrammarDef {
    terminals: Map<TerminalID, Terminal>,
    nonterminals: Map<NonterminalID, Nonterminal>,
    productions: Map<ProductionID, Production>,
    start: Option<NonterminalID>,
    next_terminal_id: u16,
    next_nonterminal_id: u16,
    next_production_id: u16,
}

impl Default for GrammarDef {
    fn default() -> Self {
        let mut def = GrammarDef {
            terminals: Map::default(),
            nonterminals: Map::default(),
            productions: Map::default(),
            start: None,
            next_terminal_id: TerminalID::OFFSET,
            next_nonterminal_id: NonterminalID::OFFSET,
            next_production_id: ProductionID::OFFSET,
        };

        def.terminals.insert(
            TerminalID::EOI,
            Terminal {
                id: TerminalID::EOI,
                name: END_OF_INPUT.to_owned(),
            },
        );

        def
    }
}

impl GrammarDef {
    /// Declare a terminal symbol used in this grammar.
    pub fn terminal(&mut self, name: &str) -> Result<TerminalID, GrammarDefError> {
        self.verify_name(name)?;
        let id = TerminalID::from_raw(next_id(&mut self.next_terminal_id)?);
        self.terminals.insert(
            id,
            Terminal {
                id,
                name: name.to_owned(),
            },
        );
        Ok(id)
    }

    /// Declare a nonterminal symbol used in this grammar.
    pub fn nonterminal(&mut self, name: &str) -> Result<NonterminalID, GrammarDefError> {
        self.verify_name(name)?;
        let id = NonterminalID::new(next_id(&mut self.next_nonterminal_id)?);
        self.nonterminals.insert(
            id,
            Nonterminal {
                id,
                name: name.to_owned(),
            },
        );
        Ok(id)
    }

    /// Specify a production rule into this grammer.
    ///
    /// An empty `right` defines an epsilon production.
    pub fn production<I>(
        &mut self,
        left: NonterminalID,
        right: I,
    ) -> Result<ProductionID, GrammarDefError>
    where
        I: IntoIterator<Item = SymbolID>,
    {
        if !self.nonterminals.contains_key(&left) {
            return Err(GrammarDefError::UndeclaredSymbol);
        }
        let right: Vec<SymbolID> = right.into_iter().collect();
        // The marker position of an LR(0) item is a u16.
        if right.len() > usize::from(u16::MAX) {
            return Err(GrammarDefError::TooManyDefinitions);
        }
        for symbol in &right {
            let declared = match symbol {
                SymbolID::T(t) => *t != TerminalID::EOI && self.terminals.contains_key(t),
                SymbolID::N(n) => self.nonterminals.contains_key(n),
            };
            if !declared {
                return Err(GrammarDefError::UndeclaredSymbol);
            }
        }

        let production = Production { left, right };
        if self.productions.values().any(|p| *p == production) {
            return Err(GrammarDefError::DuplicateProduction {
                left: self.nonterminals[&left].name.clone(),
            });
        }

        let id = ProductionID::new(next_id(&mut self.next_production_id)?);
        self.productions.insert(id, production);
        Ok(id)
    }

    /// Specify the start symbol for this grammar.
    pub fn start_symbol(&mut self, symbol: NonterminalID) -> Result<(), GrammarDefError> {
        if !self.nonterminals.contains_key(&symbol) {
            return Err(GrammarDefError::UndeclaredSymbol);
        }
        self.start.replace(symbol);
        Ok(())
    }

    fn verify_name(&self, name: &str) -> Result<(), GrammarDefError> {
        if name.is_empty() || name.chars().any(char::is_whitespace) {
            return Err(GrammarDefError::InvalidName { name: name.into() });
        }
        if name == EPSILON || name == END_OF_INPUT {
            return Err(GrammarDefError::ReservedName { name: name.into() });
        }
        let used = self.terminals.values().any(|t| t.name == name)
            || self.nonterminals.values().any(|n| n.name == name);
        if used {
            return Err(GrammarDefError::DuplicateSymbol { name: name.into() });
        }
        Ok(())
    }

    fn end(mut self) -> Result<Grammar, GrammarDefError> {
        // Fall back to the first declared nonterminal.
        let start = match self.start.take() {
            Some(start) => start,
            None => self
                .nonterminals
                .keys()
                .next()
                .copied()
                .ok_or(GrammarDefError::EmptyNonterminals)?,
        };

        let mut alternatives = Map::<NonterminalID, Vec<ProductionID>>::default();
        for &id in self.nonterminals.keys() {
            alternatives.insert(id, vec![]);
        }
        for (&id, production) in &self.productions {
            alternatives[&production.left].push(id);
        }
        for (id, alts) in &alternatives {
            if alts.is_empty() {
                return Err(GrammarDefError::NoProductions {
                    name: self.nonterminals[id].name.clone(),
                });
            }
        }

        Ok(Grammar {
            terminals: self.terminals,
            nonterminals: self.nonterminals,
            productions: self.productions,
            start_symbol: start,
            alternatives,
        })
    }
}

fn next_id(counter: &mut u16) -> Result<u16, GrammarDefError> {
    let id = *counter;
    *counter = counter
        .checked_add(1)
        .ok_or(GrammarDefError::TooManyDefinitions)?;
    Ok(id)
}

#[derive(Debug, thiserror::Error)]
pub enum GrammarDefError {
    #[error("invalid symbol name: `{name}'")]
    InvalidName { name: String },

    #[error("the name `{name}' is reserved")]
    ReservedName { name: String },

    #[error("the symbol `{name}' has already been declared")]
    DuplicateSymbol { name: String },

    #[error("duplicate production rule for `{left}'")]
    DuplicateProduction { left: String },

    #[error("the production refers to a symbol not declared in this grammar")]
    UndeclaredSymbol,

    #[error("the nonterminal `{name}' has no associated production rule")]
    NoProductions { name: String },

    #[error("empty nonterminal symbols")]
    EmptyNonterminals,

    #[error("too many symbols or productions")]
    TooManyDefinitions,
}

#[derive(Debug, thiserror::Error)]
pub enum TokenizeError {
    #[error("no terminal matches the input at offset {offset}: `{rest}'")]
    UnknownSymbol { offset: usize, rest: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use SymbolID::*;

    fn expr_grammar() -> Grammar {
        Grammar::define(|g| {
            let plus = g.terminal("+")?;
            let ident = g.terminal("id")?;
            let i = g.terminal("i")?;
            let e = g.nonterminal("E")?;
            let t = g.nonterminal("T")?;
            g.production(e, [N(e), T(plus), N(t)])?;
            g.production(e, [N(t)])?;
            g.production(t, [T(ident)])?;
            g.production(t, [T(i)])?;
            Ok(())
        })
        .unwrap()
    }

    #[test]
    fn production_ids_follow_definition_order() {
        let g = expr_grammar();
        let ids: Vec<u16> = g.productions.keys().map(|id| id.into_raw()).collect();
        assert_eq!(ids, [1, 2, 3, 4]);
        let e = g.find_nonterminal("E").unwrap();
        let alts: Vec<_> = g.productions_of(e).map(|(id, _)| id.into_raw()).collect();
        assert_eq!(alts, [1, 2]);
        assert_eq!(g.start_symbol, e);
        eprintln!("{}", g);
    }

    #[test]
    fn tokenize_prefers_longest_terminal() {
        let g = expr_grammar();
        let ident = g.find_terminal("id").unwrap();
        let i = g.find_terminal("i").unwrap();
        let plus = g.find_terminal("+").unwrap();
        assert_eq!(
            g.tokenize("id + i+id").unwrap(),
            [ident, plus, i, plus, ident]
        );
        assert!(matches!(
            g.tokenize("id-id"),
            Err(TokenizeError::UnknownSymbol { offset: 2, .. })
        ));
        assert!(g.tokenize("").unwrap().is_empty());
    }

    #[test]
    fn rejects_malformed_definitions() {
        let err = Grammar::define(|g| {
            let _ = g.terminal("a")?;
            let _ = g.nonterminal("a")?;
            Ok(())
        })
        .unwrap_err();
        assert!(matches!(err, GrammarDefError::DuplicateSymbol { .. }));

        let err = Grammar::define(|g| {
            let _ = g.terminal(EPSILON)?;
            Ok(())
        })
        .unwrap_err();
        assert!(matches!(err, GrammarDefError::ReservedName { .. }));

        let err = Grammar::define(|g| {
            let s = g.nonterminal("S")?;
            let a = g.nonterminal("A")?;
            g.production(s, [N(a)])?;
            Ok(())
        })
        .unwrap_err();
        assert!(matches!(err, GrammarDefError::NoProductions { name } if name == "A"));

        let err = Grammar::define(|g| {
            let s = g.nonterminal("S")?;
            g.production(s, [])?;
            g.production(s, [])?;
            Ok(())
        })
        .unwrap_err();
        assert!(matches!(err, GrammarDefError::DuplicateProduction { .. }));

        let err = Grammar::define(|g| {
            let s = g.nonterminal("S")?;
            g.production(s, [T(TerminalID::EOI)])?;
            Ok(())
        })
        .unwrap_err();
        assert!(matches!(err, GrammarDefError::UndeclaredSymbol));

        let err = Grammar::define(|g| {
            let a = g.terminal("a")?;
            let s = g.nonterminal("S")?;
            g.production(s, vec![T(a); usize::from(u16::MAX) + 1])?;
            Ok(())
        })
        .unwrap_err();
        assert!(matches!(err, GrammarDefError::TooManyDefinitions));
    }
}
