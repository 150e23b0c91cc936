use std::collections::VecDeque;

use itertools::Itertools;
use tracing::{debug, trace};

use crate::{
    alphabet::Symbol,
    math::{Bijection, Map, OrderedSet},
    Show,
};

use super::{Automaton, Dfa, StateId, TransitionRelation};

/// A set of states of the original nondeterministic automaton, serving as the identity of
/// one state of the constructed deterministic automaton before renaming. Two classes are
/// equal iff their member sets are equal, independent of the order in which the members
/// were discovered.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateClass(OrderedSet<StateId>);

impl std::ops::Deref for StateClass {
    type Target = OrderedSet<StateId>;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromIterator<StateId> for StateClass {
    fn from_iter<T: IntoIterator<Item = StateId>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl From<OrderedSet<StateId>> for StateClass {
    fn from(states: OrderedSet<StateId>) -> Self {
        Self(states)
    }
}

impl std::fmt::Debug for StateClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.show())
    }
}

impl Show for StateClass {
    fn show(&self) -> String {
        format!("{{{}}}", self.0.iter().join(", "))
    }
}

/// The outcome of [`subset_construction`]: the constructed [`Dfa`] together with the
/// discovery-ordered list of [`StateClass`]es its states were built from. The state with
/// label `qi` corresponds to `classes()[i]`.
#[derive(Debug, Clone)]
pub struct SubsetConstruction {
    dfa: Dfa,
    classes: Vec<StateClass>,
}

impl SubsetConstruction {
    /// The constructed deterministic automaton.
    pub fn dfa(&self) -> &Dfa {
        &self.dfa
    }

    /// Discards the class bookkeeping and returns just the automaton.
    pub fn into_dfa(self) -> Dfa {
        self.dfa
    }

    /// The discovered classes, in discovery order. The first entry is the epsilon closure
    /// of the original initial state.
    pub fn classes(&self) -> &[StateClass] {
        &self.classes
    }

    /// The canonical label given to the `i`-th discovered class.
    pub fn label(i: usize) -> StateId {
        format!("q{i}")
    }

    /// Looks up the class that was renamed to `label`.
    pub fn class_of(&self, label: &str) -> Option<&StateClass> {
        let index: usize = label.strip_prefix('q')?.parse().ok()?;
        self.classes.get(index)
    }

    /// Both directions of the renaming, label to class and back.
    pub fn labeling(&self) -> Bijection<StateId, StateClass> {
        self.classes
            .iter()
            .enumerate()
            .map(|(i, class)| (Self::label(i), class.clone()))
            .collect()
    }
}

/// Converts a nondeterministic automaton into an equivalent deterministic one by the
/// subset construction.
///
/// Starting from the epsilon closure of the initial state, classes of original states are
/// expanded in breadth-first discovery order: for each class and each alphabet symbol the
/// union of all destinations is closed under epsilon transitions and becomes the successor
/// class. An empty move set records no transition at all, so a class may end up as a dead
/// end, which is fine. A class is accepting iff it contains at least one accepting state
/// of the input.
///
/// The classes are renamed to `q0, q1, ...` in discovery order; this order is part of the
/// observable contract, `q0` always names the closure of the original initial state.
pub fn subset_construction(nfa: &Automaton) -> SubsetConstruction {
    debug!("starting subset construction");

    let initial_class: StateClass = nfa
        .epsilon_closure([nfa.initial().clone()])
        .into();
    trace!("initial class is the closure {}", initial_class.show());

    let mut classes: Vec<StateClass> = vec![initial_class.clone()];
    let mut discovered: Map<StateClass, usize> = Map::default();
    discovered.insert(initial_class, 0);

    let mut queue: VecDeque<usize> = VecDeque::from([0]);
    let mut expanded = vec![false];
    let mut edges: Vec<(usize, Symbol, usize)> = Vec::new();

    while let Some(current) = queue.pop_front() {
        if std::mem::replace(&mut expanded[current], true) {
            continue;
        }
        let class = classes[current].clone();

        for symbol in nfa.alphabet().iter() {
            let move_set: OrderedSet<StateId> = class
                .iter()
                .flat_map(|state| nfa.destinations(state, symbol).into_iter().flatten())
                .cloned()
                .collect();
            if move_set.is_empty() {
                continue;
            }

            let successor: StateClass = nfa.epsilon_closure(move_set).into();
            let index = match discovered.get(&successor) {
                Some(&index) => index,
                None => {
                    let index = classes.len();
                    trace!(
                        "discovered class {} as {}",
                        successor.show(),
                        SubsetConstruction::label(index)
                    );
                    classes.push(successor.clone());
                    discovered.insert(successor, index);
                    expanded.push(false);
                    queue.push_back(index);
                    index
                }
            };
            edges.push((current, symbol, index));
        }
    }

    let mut transitions = TransitionRelation::default();
    for (source, symbol, target) in edges {
        transitions
            .entry((SubsetConstruction::label(source), symbol))
            .or_default()
            .insert(SubsetConstruction::label(target));
    }
    let accepting = classes
        .iter()
        .enumerate()
        .filter(|(_, class)| class.iter().any(|state| nfa.is_accepting(state)))
        .map(|(i, _)| SubsetConstruction::label(i));

    let dfa = Automaton::new(
        nfa.alphabet().clone(),
        (0..classes.len()).map(SubsetConstruction::label),
        transitions,
        SubsetConstruction::label(0),
        accepting,
    )
    .expect("renamed classes form a closed state set")
    .into_dfa()
    .expect("every class has at most one successor per symbol");

    debug!("subset construction produced {} states", dfa.size());
    SubsetConstruction { dfa, classes }
}

#[cfg(test)]
mod tests {
    use crate::prelude::*;

    #[test_log::test]
    fn subset_construction_discovers_three_classes() {
        let nfa = AutomatonBuilder::default()
            .with_transitions([
                ("0", 'a', vec!["0", "1"]),
                ("0", 'b', vec!["1"]),
                ("1", 'b', vec!["1"]),
                ("1", 'a', vec!["0"]),
            ])
            .with_accepting(["1"])
            .into_nfa("0")
            .unwrap();

        let construction = subset_construction(&nfa);
        assert_eq!(construction.classes().len(), 3);
        assert_eq!(construction.class_of("q0").unwrap().show(), "{0}");
        assert_eq!(construction.class_of("q1").unwrap().show(), "{0, 1}");
        assert_eq!(construction.class_of("q2").unwrap().show(), "{1}");

        let dfa = construction.dfa();
        assert!(dfa.is_deterministic());
        assert!(dfa.is_total());
        assert_eq!(dfa.initial(), "q0");
        // exactly the classes containing the accepting original state 1
        assert_eq!(dfa.accepting().show(), "{q1, q2}");
    }

    #[test_log::test]
    fn epsilon_reachable_acceptance_collapses_to_one_state() {
        let nfa = AutomatonBuilder::default()
            .with_alphabet_symbols(['a'])
            .with_transitions([("p", EPSILON, ["q"])])
            .with_accepting(["q"])
            .into_nfa("p")
            .unwrap();

        let construction = subset_construction(&nfa);
        assert_eq!(construction.classes().len(), 1);
        assert_eq!(construction.classes()[0].show(), "{p, q}");
        let dfa = construction.dfa();
        assert_eq!(dfa.size(), 1);
        assert!(dfa.is_accepting(dfa.initial()));
    }

    #[test_log::test]
    fn dead_end_classes_are_valid() {
        // q1 has no outgoing transitions at all
        let nfa = AutomatonBuilder::default()
            .with_alphabet_symbols(['a', 'b'])
            .with_transitions([("s", 'a', ["t"])])
            .with_accepting(["t"])
            .into_nfa("s")
            .unwrap();

        let construction = subset_construction(&nfa);
        let dfa = construction.dfa();
        assert_eq!(dfa.size(), 2);
        assert!(dfa.successor("q1", 'a').is_none());
        assert!(dfa.successor("q1", 'b').is_none());
        assert!(!dfa.is_total());
    }

    #[test_log::test]
    fn converted_automaton_preserves_the_language() {
        // accepts every word containing at least one b, guessed nondeterministically
        let nfa = AutomatonBuilder::default()
            .with_transitions([
                ("s", 'a', vec!["s"]),
                ("s", 'b', vec!["s", "f"]),
                ("f", 'a', vec!["f"]),
                ("f", 'b', vec!["f"]),
            ])
            .with_accepting(["f"])
            .into_nfa("s")
            .unwrap();
        let dfa = subset_construction(&nfa).into_dfa();

        // closure-based simulation of the original as the oracle
        let simulate = |word: &str| {
            let mut current = nfa.epsilon_closure([nfa.initial().clone()]);
            for symbol in word.chars() {
                let moved = current
                    .iter()
                    .flat_map(|state| nfa.destinations(state, symbol).into_iter().flatten())
                    .cloned()
                    .collect::<Vec<_>>();
                current = nfa.epsilon_closure(moved);
            }
            current.iter().any(|state| nfa.is_accepting(state))
        };

        for word in ["", "a", "b", "ab", "ba", "aa", "abab", "aaab", "bbbb"] {
            assert_eq!(
                simulate(word),
                dfa.accepts(word).accepted(),
                "disagreement on {word:?}"
            );
        }
    }
}
