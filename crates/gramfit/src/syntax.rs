//! Loader for the plain-text grammar format.
//!
//! ```text
//! 3            # optional: the number of production lines
//! S -> A B
//! A -> a A | e
//! B -> b
//! ```

pub mod ast;
pub mod lexer;

use self::lexer::{Lexer, Spanned, Token};
use crate::{
    grammar::{Grammar, GrammarDefError, NonterminalID, SymbolID, TerminalID, EPSILON},
    types::{Map, Set},
};
use anyhow::Context as _;
use std::path::Path;

/// The start symbol used when none is given and a nonterminal `S` exists.
pub const DEFAULT_START: &str = "S";

#[derive(Debug, thiserror::Error)]
pub enum SyntaxError {
    #[error("line {line}, column {column}: unrecognized input")]
    Lex { line: u32, column: u32 },

    #[error("line {line}: expected a nonterminal followed by `->`")]
    MissingArrow { line: u32 },

    #[error("line {line}: unexpected `->` in the right-hand side")]
    UnexpectedArrow { line: u32 },

    #[error("line {line}: empty alternative (write `{}` for the empty string)", EPSILON)]
    EmptyAlternative { line: u32 },

    #[error("line {line}: `{}` must be the only symbol of its alternative", EPSILON)]
    MisplacedEpsilon { line: u32 },

    #[error("{declared} production lines are declared, but {actual} are given")]
    CountMismatch { declared: usize, actual: usize },

    #[error("no production lines")]
    Empty,

    #[error("the start symbol `{name}' is not defined by any production line")]
    UnknownStart { name: String },

    #[error("invalid grammar definition")]
    Definition(
        #[from]
        #[source]
        GrammarDefError,
    ),
}

/// Parse the source text into its syntax tree.
pub fn parse(source: &str) -> Result<ast::Document, SyntaxError> {
    let span = tracing::trace_span!("parse");
    let _entered = span.enter();

    let mut doc = ast::Document::default();
    let mut line: Vec<Spanned<'_>> = vec![];
    let mut lexer = Lexer::new(source);
    loop {
        let token = match lexer.next() {
            Some(Ok(token)) => Some(token),
            Some(Err(err)) => {
                return Err(SyntaxError::Lex {
                    line: err.location.line + 1,
                    column: err.location.col + 1,
                });
            }
            None => None,
        };
        match token {
            Some((_, Token::Newline, _)) => {
                parse_line(&mut doc, &line)?;
                line.clear();
            }
            Some(token) => line.push(token),
            None => {
                parse_line(&mut doc, &line)?;
                break;
            }
        }
    }

    Ok(doc)
}

fn parse_line(doc: &mut ast::Document, tokens: &[Spanned<'_>]) -> Result<(), SyntaxError> {
    let Some((start, _, _)) = tokens.first() else {
        return Ok(());
    };
    let line = start.line + 1;
    let tokens: Vec<Token<'_>> = tokens
        .iter()
        .flat_map(|(_, token, _)| split_arrows(*token))
        .collect();

    // The count is only recognized before the first production line.
    if let [Token::Symbol(count)] = tokens[..] {
        if doc.count.is_none() && doc.rules.is_empty() {
            if let Ok(count) = count.parse::<usize>() {
                tracing::trace!(count, "production line count");
                doc.count = Some(count);
                return Ok(());
            }
        }
    }

    let [Token::Symbol(left), Token::Arrow, ref rest @ ..] = tokens[..] else {
        return Err(SyntaxError::MissingArrow { line });
    };

    let mut alternatives = vec![];
    let mut current: Vec<String> = vec![];
    for token in rest.iter().copied().chain(Some(Token::VertBar)) {
        match token {
            Token::Symbol(symbol) => current.push(symbol.to_owned()),
            Token::VertBar => {
                let alternative = std::mem::take(&mut current);
                alternatives.push(epsilon_to_empty(alternative, line)?);
            }
            Token::Arrow => return Err(SyntaxError::UnexpectedArrow { line }),
            Token::Newline => unreachable!("lines are split at newlines"),
        }
    }

    doc.rules.push(ast::RuleLine {
        line,
        left: left.to_owned(),
        alternatives,
    });
    Ok(())
}

/// Split `->` out of symbol runs such as `S->a`.
fn split_arrows(token: Token<'_>) -> Vec<Token<'_>> {
    let Token::Symbol(symbol) = token else {
        return vec![token];
    };
    let mut tokens = vec![];
    for (i, part) in symbol.split("->").enumerate() {
        if i > 0 {
            tokens.push(Token::Arrow);
        }
        if !part.is_empty() {
            tokens.push(Token::Symbol(part));
        }
    }
    tokens
}

fn epsilon_to_empty(alternative: Vec<String>, line: u32) -> Result<Vec<String>, SyntaxError> {
    match &alternative[..] {
        [] => Err(SyntaxError::EmptyAlternative { line }),
        [symbol] if symbol == EPSILON => Ok(vec![]),
        symbols if symbols.iter().any(|s| s == EPSILON) => {
            Err(SyntaxError::MisplacedEpsilon { line })
        }
        _ => Ok(alternative),
    }
}

/// Build a `Grammar` from a parsed document.
///
/// Every left-hand side is a nonterminal. Any other symbol is a nonterminal
/// when it starts with an uppercase letter, and a terminal otherwise.
/// Without an explicit `start`, the start symbol is [`DEFAULT_START`] if it
/// has productions, or else the first left-hand side.
pub fn lower(doc: &ast::Document, start: Option<&str>) -> Result<Grammar, SyntaxError> {
    if doc.rules.is_empty() {
        return Err(SyntaxError::Empty);
    }
    if let Some(declared) = doc.count {
        if declared != doc.rules.len() {
            return Err(SyntaxError::CountMismatch {
                declared,
                actual: doc.rules.len(),
            });
        }
    }

    let lefts: Set<&str> = doc.rules.iter().map(|rule| rule.left.as_str()).collect();
    let start = match start {
        Some(name) if lefts.contains(name) => name,
        Some(name) => {
            return Err(SyntaxError::UnknownStart { name: name.into() });
        }
        None if lefts.contains(DEFAULT_START) => DEFAULT_START,
        None => doc.rules[0].left.as_str(),
    };

    let grammar = Grammar::define(|g| {
        let mut nonterminals = Map::<&str, NonterminalID>::default();
        let mut terminals = Map::<&str, TerminalID>::default();
        for &name in &lefts {
            nonterminals.insert(name, g.nonterminal(name)?);
        }
        for symbol in doc
            .rules
            .iter()
            .flat_map(|rule| rule.alternatives.iter().flatten())
        {
            let name = symbol.as_str();
            if nonterminals.contains_key(name) || terminals.contains_key(name) {
                continue;
            }
            if name.starts_with(char::is_uppercase) {
                nonterminals.insert(name, g.nonterminal(name)?);
            } else {
                terminals.insert(name, g.terminal(name)?);
            }
        }

        for rule in &doc.rules {
            let left = nonterminals[rule.left.as_str()];
            for alternative in &rule.alternatives {
                let right = alternative.iter().map(|name| match terminals.get(name.as_str()) {
                    Some(t) => SymbolID::T(*t),
                    None => SymbolID::N(nonterminals[name.as_str()]),
                });
                g.production(left, right)?;
            }
        }

        g.start_symbol(nonterminals[start])?;
        Ok(())
    })?;

    tracing::debug!(
        terminals = grammar.terminals.len(),
        nonterminals = grammar.nonterminals.len(),
        productions = grammar.productions.len(),
        "loaded grammar"
    );
    Ok(grammar)
}

/// Parse and build a grammar from its source text.
pub fn load(source: &str, start: Option<&str>) -> Result<Grammar, SyntaxError> {
    let doc = parse(source)?;
    lower(&doc, start)
}

/// Read a grammar file and build the grammar.
pub fn load_file(path: impl AsRef<Path>, start: Option<&str>) -> anyhow::Result<Grammar> {
    let path = path.as_ref();
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read `{}'", path.display()))?;
    let grammar =
        load(&source, start).with_context(|| format!("failed to load `{}'", path.display()))?;
    Ok(grammar)
}
