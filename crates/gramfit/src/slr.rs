//! SLR(1) analysis: the LR(0) automaton with Follow-set lookaheads.

pub mod lr0;
pub mod table;

pub use self::{
    lr0::{ItemSet, LR0Item, StateID},
    table::{build_automaton, Action, ConflictKind, SlrAutomaton, SlrConflict},
};

use crate::{
    grammar::{Grammar, SymbolID, TerminalID},
    Verdict,
};

/// Drive the shift/reduce automaton over `input`.
///
/// `input` must not contain the end marker; it is appended implicitly.
/// The automaton is expected to be conflict-free.
pub fn run(g: &Grammar, automaton: &SlrAutomaton, input: &[TerminalID]) -> Verdict {
    let span = tracing::trace_span!("slr_run", len = input.len());
    let _entered = span.enter();

    if input.contains(&TerminalID::EOI) {
        return Verdict::Reject;
    }

    let mut stack = vec![StateID::INITIAL];
    let mut cursor = 0;
    loop {
        let current = input.get(cursor).copied().unwrap_or(TerminalID::EOI);
        let Some(&top) = stack.last() else {
            return Verdict::Reject;
        };
        let Some(action) = automaton.action(top, current) else {
            return Verdict::Reject;
        };
        tracing::trace!(?top, ?current, ?action, depth = stack.len(), "step");
        match action {
            Action::Shift(next) => {
                stack.push(next);
                cursor += 1;
            }
            Action::Reduce(id) => {
                let Some(production) = g.productions.get(&id) else {
                    tracing::warn!(?id, "reduction by an unknown production");
                    return Verdict::Reject;
                };
                let n = production.right.len();
                if n >= stack.len() {
                    tracing::warn!(?id, depth = stack.len(), "state stack underflow");
                    return Verdict::Reject;
                }
                stack.truncate(stack.len() - n);
                let exposed = stack[stack.len() - 1];
                match automaton.goto(exposed, SymbolID::N(production.left)) {
                    Some(next) => stack.push(next),
                    None => {
                        tracing::error!(
                            ?exposed,
                            production = %production.display(g),
                            "missing goto entry"
                        );
                        debug_assert!(
                            !automaton.is_conflict_free(),
                            "missing goto entry in a conflict-free automaton"
                        );
                        return Verdict::Reject;
                    }
                }
            }
            Action::Accept => return Verdict::Accept,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        first_follow::{FirstSets, FollowSets},
        grammar::SymbolID::*,
    };

    struct Fixture {
        grammar: Grammar,
        automaton: SlrAutomaton,
        conflicts: Vec<SlrConflict>,
    }

    impl Fixture {
        fn new(grammar: Grammar) -> Self {
            let first = FirstSets::compute(&grammar);
            let follow = FollowSets::compute(&grammar, &first, grammar.start_symbol);
            let mut automaton = build_automaton(&grammar);
            let conflicts = automaton.detect_conflicts_and_fill_reduce_actions(&grammar, &follow);
            eprintln!("{}", automaton.display(&grammar));
            for conflict in &conflicts {
                eprintln!("{}", conflict.display(&grammar));
            }
            Self {
                grammar,
                automaton,
                conflicts,
            }
        }

        fn run(&self, input: &str) -> Verdict {
            match self.grammar.tokenize(input) {
                Ok(tokens) => run(&self.grammar, &self.automaton, &tokens),
                Err(..) => Verdict::Reject,
            }
        }
    }

    fn left_recursive_expr() -> Grammar {
        // E -> E + T | T ; T -> id
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
        .unwrap()
    }

    #[test]
    fn left_recursive_expression_is_slr1() {
        let fixture = Fixture::new(left_recursive_expr());
        assert!(fixture.conflicts.is_empty());
        assert!(fixture.automaton.is_conflict_free());

        assert_eq!(fixture.run("id"), Verdict::Accept);
        assert_eq!(fixture.run("id+id+id"), Verdict::Accept);
        assert_eq!(fixture.run(""), Verdict::Reject);
        assert_eq!(fixture.run("id+"), Verdict::Reject);
        assert_eq!(fixture.run("+id"), Verdict::Reject);
        assert_eq!(fixture.run("id id"), Verdict::Reject);
    }

    #[test]
    fn accept_is_recorded_once() {
        let fixture = Fixture::new(left_recursive_expr());
        let accepts: Vec<_> = fixture
            .automaton
            .actions()
            .filter(|(_, action)| *action == Action::Accept)
            .collect();
        assert_eq!(accepts.len(), 1);
        let ((state, lookahead), _) = accepts[0];
        assert_eq!(lookahead, TerminalID::EOI);
        let e = fixture.grammar.find_nonterminal("E").unwrap();
        assert_eq!(fixture.automaton.goto(StateID::INITIAL, N(e)), Some(state));
    }

    #[test]
    fn states_are_numbered_densely() {
        let fixture = Fixture::new(left_recursive_expr());
        let (first, items) = fixture.automaton.states().next().unwrap();
        assert_eq!(first, StateID::INITIAL);
        assert!(items.contains(&LR0Item::start(crate::grammar::ProductionID::AUGMENTED)));
        for (i, (id, _)) in fixture.automaton.states().enumerate() {
            assert_eq!(id.index(), i);
        }
        assert_eq!(fixture.automaton.states().count(), fixture.automaton.state_count());
    }

    #[test]
    fn construction_is_deterministic() {
        let first = Fixture::new(left_recursive_expr());
        let second = Fixture::new(left_recursive_expr());
        assert_eq!(
            first.automaton.actions().collect::<Vec<_>>(),
            second.automaton.actions().collect::<Vec<_>>(),
        );
        assert_eq!(
            first.automaton.gotos().collect::<Vec<_>>(),
            second.automaton.gotos().collect::<Vec<_>>(),
        );
    }

    #[test]
    fn nullable_right_recursion() {
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
        let fixture = Fixture::new(grammar);
        assert!(fixture.conflicts.is_empty());
        assert_eq!(fixture.run(""), Verdict::Accept);
        assert_eq!(fixture.run("aaa"), Verdict::Accept);
    }

    #[test]
    fn shift_reduce_conflict() {
        // S -> L = R | R ; L -> * R | id ; R -> L
        let grammar = Grammar::define(|g| {
            let eq = g.terminal("=")?;
            let star = g.terminal("*")?;
            let ident = g.terminal("id")?;
            let s = g.nonterminal("S")?;
            let l = g.nonterminal("L")?;
            let r = g.nonterminal("R")?;
            g.production(s, [N(l), T(eq), N(r)])?;
            g.production(s, [N(r)])?;
            g.production(l, [T(star), N(r)])?;
            g.production(l, [T(ident)])?;
            g.production(r, [N(l)])?;
            Ok(())
        })
        .unwrap();
        let fixture = Fixture::new(grammar);
        let eq = fixture.grammar.find_terminal("=").unwrap();

        assert_eq!(fixture.conflicts.len(), 1);
        let conflict = &fixture.conflicts[0];
        assert_eq!(conflict.lookahead, eq);
        assert!(matches!(conflict.kind, ConflictKind::ShiftReduce { .. }));
        assert!(!fixture.automaton.is_conflict_free());

        // The first recorded action wins.
        assert!(matches!(
            fixture.automaton.action(conflict.state, eq),
            Some(Action::Shift(..))
        ));
    }

    #[test]
    fn reduce_reduce_conflict() {
        // S -> A | B ; A -> a ; B -> a
        let grammar = Grammar::define(|g| {
            let a = g.terminal("a")?;
            let s = g.nonterminal("S")?;
            let n_a = g.nonterminal("A")?;
            let n_b = g.nonterminal("B")?;
            g.production(s, [N(n_a)])?;
            g.production(s, [N(n_b)])?;
            g.production(n_a, [T(a)])?;
            g.production(n_b, [T(a)])?;
            Ok(())
        })
        .unwrap();
        let fixture = Fixture::new(grammar);

        assert_eq!(fixture.conflicts.len(), 1);
        let conflict = &fixture.conflicts[0];
        assert_eq!(conflict.lookahead, TerminalID::EOI);
        let ConflictKind::ReduceReduce { existing, incoming } = conflict.kind else {
            panic!("unexpected conflict: {:?}", conflict);
        };
        assert!(existing < incoming);
    }
}
