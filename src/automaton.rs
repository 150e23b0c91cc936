use itertools::Itertools;
use thiserror::Error;
use tracing::trace;

use crate::{
    alphabet::{Alphabet, Symbol, EPSILON},
    math::{Map, OrderedSet},
    Show,
};

mod reachability;
mod subset;

pub use reachability::NameCollisionError;
pub use subset::{subset_construction, StateClass, SubsetConstruction};

/// States are identified by their name, which must be unique within one automaton.
pub type StateId = String;

/// Maps a state and a symbol to the set of destination states. For a nondeterministic
/// automaton the destination set may have any size and entries keyed by [`EPSILON`] are
/// permitted. A deterministic automaton has at most one destination per key and no
/// epsilon entries.
pub type TransitionRelation = Map<(StateId, Symbol), OrderedSet<StateId>>;

/// Error raised when an automaton description references a state outside its declared
/// state set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedAutomatonError {
    /// The designated initial state is not part of the state set.
    #[error("initial state `{0}` is not part of the state set")]
    UnknownInitialState(StateId),
    /// An accepting state is not part of the state set.
    #[error("accepting state `{0}` is not part of the state set")]
    UnknownAcceptingState(StateId),
    /// A transition starts or ends in a state that is not part of the state set.
    #[error("transition on `{symbol}` references state `{state}` outside the state set")]
    UnknownTransitionState {
        /// The guard of the offending transition.
        symbol: Symbol,
        /// The referenced state that does not exist.
        state: StateId,
    },
}

/// Error raised when an operation that requires a deterministic automaton is attempted
/// on a nondeterministic one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("the automaton is not deterministic")]
pub struct NotDeterministicError;

/// A finite automaton: a finite set of named states connected by transitions that are
/// guarded by symbols of a finite [`Alphabet`], together with one initial and a set of
/// accepting states.
///
/// The same representation covers nondeterministic and deterministic automata, the latter
/// being a structural restriction which [`Automaton::is_deterministic`] tests and which the
/// [`Dfa`] wrapper witnesses at the type level. Values of this type are immutable,
/// transformations like [`subset_construction`] or [`crate::minimization::minimize`]
/// produce new, independently valid automata.
///
/// The declaration order of the states is preserved. It determines the fixed state
/// indexing that the minimizer and its distinguishability table report.
#[derive(Debug, Clone, PartialEq)]
pub struct Automaton {
    alphabet: Alphabet,
    states: Vec<StateId>,
    transitions: TransitionRelation,
    initial: StateId,
    accepting: OrderedSet<StateId>,
}

impl Automaton {
    /// Constructs an automaton after checking referential integrity: the initial state,
    /// every accepting state and both endpoints of every transition must be members of
    /// `states`. Duplicate state names are collapsed, the first occurrence wins.
    pub fn new<S, A>(
        alphabet: Alphabet,
        states: S,
        transitions: TransitionRelation,
        initial: impl Into<StateId>,
        accepting: A,
    ) -> Result<Self, MalformedAutomatonError>
    where
        S: IntoIterator,
        S::Item: Into<StateId>,
        A: IntoIterator,
        A::Item: Into<StateId>,
    {
        let states: Vec<StateId> = states.into_iter().map(Into::into).unique().collect();
        let initial = initial.into();
        let accepting: OrderedSet<StateId> = accepting.into_iter().map(Into::into).collect();

        let known = |name: &StateId| states.iter().any(|q| q == name);
        if !known(&initial) {
            return Err(MalformedAutomatonError::UnknownInitialState(initial));
        }
        if let Some(stray) = accepting.iter().find(|&q| !known(q)) {
            return Err(MalformedAutomatonError::UnknownAcceptingState(stray.clone()));
        }
        for ((source, symbol), destinations) in &transitions {
            for state in std::iter::once(source).chain(destinations.iter()) {
                if !known(state) {
                    return Err(MalformedAutomatonError::UnknownTransitionState {
                        symbol: *symbol,
                        state: state.clone(),
                    });
                }
            }
        }

        Ok(Self {
            alphabet,
            states,
            transitions,
            initial,
            accepting,
        })
    }

    /// Returns the input alphabet. [`EPSILON`] is never a member, even if the automaton
    /// has epsilon transitions.
    pub fn alphabet(&self) -> &Alphabet {
        &self.alphabet
    }

    /// The states in declaration order.
    pub fn states(&self) -> &[StateId] {
        &self.states
    }

    /// The number of states.
    pub fn size(&self) -> usize {
        self.states.len()
    }

    /// The designated initial state.
    pub fn initial(&self) -> &StateId {
        &self.initial
    }

    /// The set of accepting states.
    pub fn accepting(&self) -> &OrderedSet<StateId> {
        &self.accepting
    }

    /// The full transition relation.
    pub fn transitions(&self) -> &TransitionRelation {
        &self.transitions
    }

    /// Returns true if a state with the given name exists.
    pub fn contains_state(&self, name: &str) -> bool {
        self.states.iter().any(|q| q == name)
    }

    /// Returns the position of the named state in the declaration order.
    pub fn state_index(&self, name: &str) -> Option<usize> {
        self.states.iter().position(|q| q == name)
    }

    /// Returns true if the named state is accepting.
    pub fn is_accepting(&self, name: &str) -> bool {
        self.accepting.iter().any(|q| q == name)
    }

    /// The destinations that `state` reaches on `symbol`, if any transition is defined.
    pub fn destinations(&self, state: &str, symbol: Symbol) -> Option<&OrderedSet<StateId>> {
        self.transitions.get(&(state.to_string(), symbol))
    }

    /// Decides whether the automaton is deterministic: at most one destination for every
    /// (state, symbol) pair and no nonempty epsilon entry. Returns false on the first
    /// violation.
    pub fn is_deterministic(&self) -> bool {
        for state in &self.states {
            if self.destinations(state, EPSILON).is_some_and(|d| !d.is_empty()) {
                return false;
            }
            for symbol in self.alphabet.iter() {
                if self.destinations(state, symbol).is_some_and(|d| d.len() > 1) {
                    return false;
                }
            }
        }
        true
    }

    /// Computes the set of states reachable from `seed` using epsilon transitions only.
    ///
    /// The result grows monotonically and is bounded by the state set, so the work stack
    /// always empties. The same seed yields the same closure regardless of the order in
    /// which the stack is processed; in particular the computation is idempotent.
    pub fn epsilon_closure<I: IntoIterator<Item = StateId>>(&self, seed: I) -> OrderedSet<StateId> {
        let mut closure: OrderedSet<StateId> = seed.into_iter().collect();
        let mut stack: Vec<StateId> = closure.iter().cloned().collect();

        while let Some(state) = stack.pop() {
            for destination in self.destinations(&state, EPSILON).into_iter().flatten() {
                if closure.insert(destination.clone()) {
                    stack.push(destination.clone());
                }
            }
        }
        trace!("epsilon closure is {}", closure.show());
        closure
    }

    /// Reinterprets the automaton as a [`Dfa`], failing if it is not deterministic.
    pub fn into_dfa(self) -> Result<Dfa, NotDeterministicError> {
        if self.is_deterministic() {
            Ok(Dfa(self))
        } else {
            Err(NotDeterministicError)
        }
    }
}

/// A deterministic finite automaton. Wraps an [`Automaton`] whose determinism has been
/// verified on construction: every (state, symbol) pair has at most one destination and
/// there are no epsilon transitions. Dereferences to the underlying [`Automaton`].
#[derive(Debug, Clone, PartialEq)]
pub struct Dfa(Automaton);

impl std::ops::Deref for Dfa {
    type Target = Automaton;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Dfa {
    /// The unique destination that `state` reaches on `symbol`, if a transition is defined.
    pub fn successor(&self, state: &str, symbol: Symbol) -> Option<&StateId> {
        self.0.destinations(state, symbol).and_then(|d| d.iter().next())
    }

    /// Gives up the determinism witness and returns the underlying [`Automaton`].
    pub fn into_automaton(self) -> Automaton {
        self.0
    }

    /// Returns a string representation of the transition table. The initial state is
    /// prefixed with `->`, accepting states are printed bold and suffixed with `*`,
    /// missing transitions show as `-`.
    pub fn transition_table(&self) -> String {
        use owo_colors::OwoColorize;

        let mut builder = tabled::builder::Builder::default();
        builder.push_record(
            std::iter::once("state".to_string()).chain(self.alphabet().iter().map(|s| s.show())),
        );
        for state in self.states() {
            let mut decorated = if self.is_accepting(state) {
                format!("{}*", state.bold())
            } else {
                state.to_string()
            };
            if state == self.initial() {
                decorated = format!("-> {decorated}");
            }
            let mut row = vec![decorated];
            for symbol in self.alphabet().iter() {
                match self.successor(state, symbol) {
                    Some(destination) => row.push(destination.to_string()),
                    None => row.push("-".to_string()),
                }
            }
            builder.push_record(row);
        }

        builder
            .build()
            .with(tabled::settings::Style::rounded())
            .to_string()
    }
}

/// Helper for assembling automata from transition lists, in the spirit of a fluent
/// builder. The state set and the alphabet are completed from the endpoints and guards
/// of the given transitions, additional states and symbols can be declared explicitly.
///
/// # Example
/// ```
/// use nerode::prelude::*;
///
/// let dfa = AutomatonBuilder::default()
///     .with_edges([("q0", 'a', "q1"), ("q0", 'b', "q0"), ("q1", 'a', "q1"), ("q1", 'b', "q1")])
///     .with_accepting(["q1"])
///     .into_dfa("q0")
///     .unwrap();
/// assert!(dfa.accepts("a").accepted());
/// ```
#[derive(Debug, Clone, Default)]
pub struct AutomatonBuilder {
    symbols: Vec<Symbol>,
    states: Vec<StateId>,
    edges: Vec<(StateId, Symbol, Vec<StateId>)>,
    accepting: Vec<StateId>,
}

impl AutomatonBuilder {
    /// Forces the given symbols to be part of the alphabet, in addition to the symbols
    /// appearing on at least one transition.
    pub fn with_alphabet_symbols<I: IntoIterator<Item = Symbol>>(mut self, symbols: I) -> Self {
        self.symbols.extend(symbols);
        self
    }

    /// Declares additional states, in addition to the states appearing in at least one
    /// transition. Useful for isolated states that no transition touches.
    pub fn with_states<I>(mut self, states: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<StateId>,
    {
        self.states.extend(states.into_iter().map(Into::into));
        self
    }

    /// Adds transitions with any number of destinations each, as required for
    /// nondeterministic automata. [`EPSILON`] is a valid guard here.
    pub fn with_transitions<S, D, I>(mut self, transitions: I) -> Self
    where
        S: Into<StateId>,
        D: IntoIterator,
        D::Item: Into<StateId>,
        I: IntoIterator<Item = (S, Symbol, D)>,
    {
        self.edges.extend(transitions.into_iter().map(|(source, symbol, destinations)| {
            (
                source.into(),
                symbol,
                destinations.into_iter().map(Into::into).collect(),
            )
        }));
        self
    }

    /// Adds transitions with a single destination each, the natural form for
    /// deterministic automata.
    pub fn with_edges<S, T, I>(self, edges: I) -> Self
    where
        S: Into<StateId>,
        T: Into<StateId>,
        I: IntoIterator<Item = (S, Symbol, T)>,
    {
        self.with_transitions(
            edges
                .into_iter()
                .map(|(source, symbol, target)| (source, symbol, [target])),
        )
    }

    /// Marks the given states as accepting.
    pub fn with_accepting<I>(mut self, accepting: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<StateId>,
    {
        self.accepting.extend(accepting.into_iter().map(Into::into));
        self
    }

    /// Builds a (possibly nondeterministic) automaton with the given initial state.
    pub fn into_nfa(self, initial: impl Into<StateId>) -> Result<Automaton, MalformedAutomatonError> {
        let alphabet: Alphabet = self
            .edges
            .iter()
            .map(|(_, symbol, _)| *symbol)
            .chain(self.symbols)
            .collect();

        let states: Vec<StateId> = self
            .states
            .into_iter()
            .chain(self.edges.iter().flat_map(|(source, _, destinations)| {
                std::iter::once(source.clone()).chain(destinations.iter().cloned())
            }))
            .unique()
            .collect();

        let mut transitions = TransitionRelation::default();
        for (source, symbol, destinations) in self.edges {
            transitions
                .entry((source, symbol))
                .or_default()
                .extend(destinations);
        }

        Automaton::new(alphabet, states, transitions, initial, self.accepting)
    }

    /// Builds a deterministic automaton with the given initial state.
    ///
    /// # Panics
    /// Panics if the added transitions are not deterministic. Use [`Self::into_nfa`]
    /// followed by [`Automaton::into_dfa`] when determinism is not known up front.
    pub fn into_dfa(self, initial: impl Into<StateId>) -> Result<Dfa, MalformedAutomatonError> {
        Ok(self
            .into_nfa(initial)?
            .into_dfa()
            .expect("the built automaton must be deterministic"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn epsilon_nfa() -> Automaton {
        // scenario: start state reaches the accepting state by epsilon only
        AutomatonBuilder::default()
            .with_alphabet_symbols(['a'])
            .with_transitions([("p", EPSILON, ["q"])])
            .with_accepting(["q"])
            .into_nfa("p")
            .unwrap()
    }

    #[test]
    fn construction_checks_referential_integrity() {
        let missing_initial = AutomatonBuilder::default()
            .with_edges([("q0", 'a', "q0")])
            .into_nfa("q7");
        assert_eq!(
            missing_initial.unwrap_err(),
            MalformedAutomatonError::UnknownInitialState("q7".to_string())
        );

        let missing_accepting = AutomatonBuilder::default()
            .with_edges([("q0", 'a', "q0")])
            .with_accepting(["nope"])
            .into_nfa("q0");
        assert_eq!(
            missing_accepting.unwrap_err(),
            MalformedAutomatonError::UnknownAcceptingState("nope".to_string())
        );

        let mut transitions = TransitionRelation::default();
        transitions.insert(
            ("q0".to_string(), 'a'),
            ["ghost".to_string()].into_iter().collect(),
        );
        let missing_destination = Automaton::new(
            ['a'].into_iter().collect(),
            ["q0"],
            transitions,
            "q0",
            Vec::<StateId>::new(),
        );
        assert_eq!(
            missing_destination.unwrap_err(),
            MalformedAutomatonError::UnknownTransitionState {
                symbol: 'a',
                state: "ghost".to_string()
            }
        );
    }

    #[test_log::test]
    fn determinism_predicate() {
        let deterministic = AutomatonBuilder::default()
            .with_edges([("q0", 'a', "q1"), ("q0", 'b', "q0"), ("q1", 'a', "q1")])
            .into_nfa("q0")
            .unwrap();
        assert!(deterministic.is_deterministic());
        assert!(deterministic.into_dfa().is_ok());

        let branching = AutomatonBuilder::default()
            .with_transitions([("q0", 'a', vec!["q0", "q1"])])
            .into_nfa("q0")
            .unwrap();
        assert!(!branching.is_deterministic());
        assert_eq!(branching.into_dfa().unwrap_err(), NotDeterministicError);

        assert!(!epsilon_nfa().is_deterministic());
    }

    #[test_log::test]
    fn epsilon_closure_follows_spontaneous_transitions() {
        let nfa = epsilon_nfa();
        let closure = nfa.epsilon_closure(["p".to_string()]);
        assert_eq!(closure.show(), "{p, q}");
    }

    #[test_log::test]
    fn epsilon_closure_is_idempotent() {
        let nfa = AutomatonBuilder::default()
            .with_alphabet_symbols(['a'])
            .with_transitions([
                ("1", EPSILON, vec!["2", "3"]),
                ("3", EPSILON, vec!["4"]),
                ("5", 'a', vec!["1"]),
            ])
            .into_nfa("1")
            .unwrap();

        let once = nfa.epsilon_closure(["1".to_string()]);
        let twice = nfa.epsilon_closure(once.iter().cloned());
        assert_eq!(once, twice);
        assert_eq!(once.show(), "{1, 2, 3, 4}");
    }

    #[test]
    fn builder_completes_states_and_alphabet() {
        let nfa = AutomatonBuilder::default()
            .with_states(["isolated"])
            .with_transitions([("q0", 'a', vec!["q1"]), ("q1", EPSILON, vec!["q0"])])
            .into_nfa("q0")
            .unwrap();

        assert_eq!(nfa.states(), ["isolated", "q0", "q1"]);
        // epsilon guards transitions but is not part of the declared alphabet
        assert_eq!(nfa.alphabet().iter().collect::<Vec<_>>(), vec!['a']);
        assert!(nfa.destinations("q1", EPSILON).is_some());
    }
}
