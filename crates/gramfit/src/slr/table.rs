//! SLR(1) action/goto tables and their conflicts.

use super::lr0::{self, Augmented, ItemSet, StateID};
use crate::{
    first_follow::FollowSets,
    grammar::{Grammar, ProductionID, SymbolID, TerminalID},
    types::Map,
    util::display_fn,
};
use std::fmt;

/// The action that the automaton in a state performs on a particular
/// lookahead symbol.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Action {
    /// Read a lookahead symbol and transition to the specified state.
    Shift(StateID),

    /// Reduce to the specified production.
    Reduce(ProductionID),

    /// The augmented production `S' -> S` is complete at the end of input.
    Accept,
}

impl Action {
    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| match self {
            Self::Shift(next) => write!(f, "shift({})", next),
            Self::Reduce(production) => {
                write!(f, "reduce({})", g.production(*production).display(g))
            }
            Self::Accept => f.write_str("accept"),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConflictKind {
    /// A reduction competes with an already recorded shift.
    ShiftReduce {
        shift: StateID,
        reduce: ProductionID,
    },
    /// Two reductions compete on the same lookahead.
    ReduceReduce {
        existing: ProductionID,
        incoming: ProductionID,
    },
    /// A reduction competes with the acceptance at the end of input.
    AcceptReduce { reduce: ProductionID },
}

/// A cell of the action table that more than one action wants to occupy.
///
/// The first recorded action stays in the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlrConflict {
    pub state: StateID,
    pub lookahead: TerminalID,
    pub kind: ConflictKind,
}

impl SlrConflict {
    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            let token = g.terminal_name(self.lookahead);
            match &self.kind {
                ConflictKind::ShiftReduce { shift, reduce } => write!(
                    f,
                    "shift/reduce conflict in state {} on `{}`: shift({}) vs reduce({})",
                    self.state,
                    token,
                    shift,
                    g.production(*reduce).display(g),
                ),
                ConflictKind::ReduceReduce { existing, incoming } => write!(
                    f,
                    "reduce/reduce conflict in state {} on `{}`: reduce({}) vs reduce({})",
                    self.state,
                    token,
                    g.production(*existing).display(g),
                    g.production(*incoming).display(g),
                ),
                ConflictKind::AcceptReduce { reduce } => write!(
                    f,
                    "accept/reduce conflict in state {} on `{}`: accept vs reduce({})",
                    self.state,
                    token,
                    g.production(*reduce).display(g),
                ),
            }
        })
    }
}

/// The LR(0) item sets of a grammar together with their GOTO and ACTION
/// tables.
#[derive(Debug)]
pub struct SlrAutomaton {
    states: Map<StateID, ItemSet>,
    gotos: Map<(StateID, SymbolID), StateID>,
    actions: Map<(StateID, TerminalID), Action>,
    conflict_free: bool,
}

impl SlrAutomaton {
    pub fn states(&self) -> impl Iterator<Item = (StateID, &ItemSet)> + '_ {
        self.states.iter().map(|(id, items)| (*id, items))
    }

    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    pub fn action(&self, state: StateID, lookahead: TerminalID) -> Option<Action> {
        self.actions.get(&(state, lookahead)).copied()
    }

    pub fn goto(&self, state: StateID, symbol: SymbolID) -> Option<StateID> {
        self.gotos.get(&(state, symbol)).copied()
    }

    pub fn actions(&self) -> impl Iterator<Item = ((StateID, TerminalID), Action)> + '_ {
        self.actions.iter().map(|(key, action)| (*key, *action))
    }

    pub fn gotos(&self) -> impl Iterator<Item = ((StateID, SymbolID), StateID)> + '_ {
        self.gotos.iter().map(|(key, next)| (*key, *next))
    }

    /// Whether the reduce actions have been filled without any conflict.
    pub fn is_conflict_free(&self) -> bool {
        self.conflict_free
    }

    /// Fill the reduce and accept actions from the complete items of each
    /// state, and report every cell that would receive a second action.
    ///
    /// States are visited in ID order, the items of a state in
    /// `(production, marker)` order and the lookaheads in ascending order.
    pub fn detect_conflicts_and_fill_reduce_actions(
        &mut self,
        g: &Grammar,
        follow: &FollowSets,
    ) -> Vec<SlrConflict> {
        let span = tracing::trace_span!("fill_reduce_actions");
        let _entered = span.enter();

        let aug = Augmented::new(g);
        let mut conflicts = vec![];
        for (&state, items) in &self.states {
            for item in items.iter().filter(|item| item.is_complete(&aug)) {
                if item.production == ProductionID::AUGMENTED {
                    let key = (state, TerminalID::EOI);
                    match self.actions.get(&key) {
                        None => {
                            self.actions.insert(key, Action::Accept);
                        }
                        Some(Action::Accept) => (),
                        Some(existing) => {
                            // Shifting the end marker never happens, so the
                            // occupant must be a reduction.
                            let Action::Reduce(reduce) = *existing else {
                                unreachable!("shift on the end of input");
                            };
                            conflicts.push(SlrConflict {
                                state,
                                lookahead: TerminalID::EOI,
                                kind: ConflictKind::AcceptReduce { reduce },
                            });
                        }
                    }
                    continue;
                }

                let left = g.production(item.production).left;
                for lookahead in follow.get(left).iter() {
                    let key = (state, lookahead);
                    let kind = match self.actions.get(&key) {
                        None => {
                            self.actions.insert(key, Action::Reduce(item.production));
                            continue;
                        }
                        Some(Action::Shift(shift)) => ConflictKind::ShiftReduce {
                            shift: *shift,
                            reduce: item.production,
                        },
                        Some(Action::Reduce(existing)) if *existing == item.production => {
                            continue;
                        }
                        Some(Action::Reduce(existing)) => ConflictKind::ReduceReduce {
                            existing: *existing,
                            incoming: item.production,
                        },
                        Some(Action::Accept) => ConflictKind::AcceptReduce {
                            reduce: item.production,
                        },
                    };
                    tracing::trace!(?state, ?lookahead, ?kind, "conflict");
                    conflicts.push(SlrConflict {
                        state,
                        lookahead,
                        kind,
                    });
                }
            }
        }

        self.conflict_free = conflicts.is_empty();
        tracing::debug!(conflicts = conflicts.len(), "filled reduce actions");
        conflicts
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            let aug = Augmented::new(g);
            for (i, (&id, items)) in self.states.iter().enumerate() {
                if i > 0 {
                    writeln!(f)?;
                }
                writeln!(f, "#### State {}", id)?;
                writeln!(f, "## items")?;
                for item in items.iter() {
                    writeln!(f, "- {}", item.display(&aug))?;
                }
                writeln!(f, "## actions")?;
                for ((_, token), action) in self.actions.iter().filter(|((s, _), _)| *s == id) {
                    writeln!(f, "- {} => {}", g.terminal_name(*token), action.display(g))?;
                }
                writeln!(f, "## gotos")?;
                for ((_, symbol), next) in self.gotos.iter().filter(|((s, _), _)| *s == id) {
                    if let SymbolID::N(n) = symbol {
                        writeln!(f, "- {} => goto({})", g.nonterminal_name(*n), next)?;
                    }
                }
            }
            Ok(())
        })
    }
}

/// Build the canonical LR(0) collection of the augmented grammar, its GOTO
/// table and the shift entries of its ACTION table.
///
/// Reduce and accept entries are left to
/// [`SlrAutomaton::detect_conflicts_and_fill_reduce_actions`].
pub fn build_automaton(g: &Grammar) -> SlrAutomaton {
    let span = tracing::trace_span!("build_automaton");
    let _entered = span.enter();

    let aug = Augmented::new(g);
    let collection = lr0::canonical_collection(&aug);

    let mut actions = Map::default();
    for (&(state, symbol), &next) in &collection.transitions {
        if let SymbolID::T(t) = symbol {
            actions.insert((state, t), Action::Shift(next));
        }
    }

    SlrAutomaton {
        states: collection.states,
        gotos: collection.transitions,
        actions,
        conflict_free: false,
    }
}
