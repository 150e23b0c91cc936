use thiserror::Error;
use tracing::debug;

use crate::math::Set;

use super::{Automaton, Dfa, StateId};

/// The label tried first when synthesizing a sink state, see [`Dfa::totalize`].
const SINK_LABEL: &str = "sink";

/// Error raised when the label chosen for a synthesized sink state is already taken.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("sink state label `{0}` collides with an existing state")]
pub struct NameCollisionError(pub StateId);

impl Dfa {
    /// Returns true iff every (state, symbol) pair has a defined transition.
    pub fn is_total(&self) -> bool {
        self.states()
            .iter()
            .all(|state| self.alphabet().iter().all(|symbol| self.successor(state, symbol).is_some()))
    }

    /// Completes the transition function by adding a non-accepting sink state that absorbs
    /// every missing (state, symbol) pair, including all of its own symbols. The sink label
    /// is chosen deterministically: `sink` if unused, otherwise `sink1`, `sink2`, ...
    /// Returns a new automaton, with the sink appended after all existing states; if the
    /// transition function is already total, this is just a clone.
    pub fn totalize(&self) -> Dfa {
        if self.is_total() {
            return self.clone();
        }
        let label = self.fresh_sink_label();
        self.complete_with_sink(label)
    }

    /// Like [`Self::totalize`], but with a caller-chosen sink label. Fails with a
    /// [`NameCollisionError`] if the label is already in use, even when the automaton
    /// happens to be total already.
    pub fn totalize_as(&self, label: impl Into<StateId>) -> Result<Dfa, NameCollisionError> {
        let label = label.into();
        if self.contains_state(&label) {
            return Err(NameCollisionError(label));
        }
        if self.is_total() {
            return Ok(self.clone());
        }
        Ok(self.complete_with_sink(label))
    }

    fn fresh_sink_label(&self) -> StateId {
        if !self.contains_state(SINK_LABEL) {
            return SINK_LABEL.to_string();
        }
        (1..)
            .map(|i| format!("{SINK_LABEL}{i}"))
            .find(|candidate| !self.contains_state(candidate))
            .expect("some suffixed sink label must be unused")
    }

    fn complete_with_sink(&self, sink: StateId) -> Dfa {
        debug!("adding sink state `{sink}` to complete the transition function");

        let mut states: Vec<StateId> = self.states().to_vec();
        states.push(sink.clone());
        let mut transitions = self.transitions().clone();
        for state in &states {
            for symbol in self.alphabet().iter() {
                let destinations = transitions.entry((state.clone(), symbol)).or_default();
                if destinations.is_empty() {
                    destinations.insert(sink.clone());
                }
            }
        }

        Automaton::new(
            self.alphabet().clone(),
            states,
            transitions,
            self.initial().clone(),
            self.accepting().iter().cloned(),
        )
        .expect("completing the transition function keeps the automaton well-formed")
        .into_dfa()
        .expect("only previously undefined transitions were added")
    }

    /// The set of states reachable from the initial state by following defined
    /// transitions, computed by an iterative depth-first traversal.
    pub fn reachable_states(&self) -> Set<StateId> {
        let mut visited = Set::default();
        visited.insert(self.initial().clone());
        let mut stack = vec![self.initial().clone()];

        while let Some(state) = stack.pop() {
            for symbol in self.alphabet().iter() {
                if let Some(successor) = self.successor(&state, symbol) {
                    if visited.insert(successor.clone()) {
                        stack.push(successor.clone());
                    }
                }
            }
        }
        visited
    }

    /// Returns true iff every state is reachable from the initial state.
    pub fn all_reachable(&self) -> bool {
        let reachable = self.reachable_states();
        self.states().iter().all(|state| reachable.contains(state))
    }
}

#[cfg(test)]
mod tests {
    use crate::prelude::*;

    fn partial_dfa() -> Dfa {
        // transition (q0, b) is missing
        AutomatonBuilder::default()
            .with_alphabet_symbols(['a', 'b'])
            .with_edges([("q0", 'a', "q1"), ("q1", 'a', "q1"), ("q1", 'b', "q1")])
            .with_accepting(["q1"])
            .into_dfa("q0")
            .unwrap()
    }

    #[test_log::test]
    fn totalization_adds_an_absorbing_sink() {
        let dfa = partial_dfa();
        assert!(!dfa.is_total());

        let total = dfa.totalize();
        assert!(total.is_total());
        assert_eq!(total.size(), dfa.size() + 1);
        assert_eq!(total.states().last().map(String::as_str), Some("sink"));
        assert_eq!(total.successor("q0", 'b').unwrap(), "sink");
        assert_eq!(total.successor("sink", 'a').unwrap(), "sink");
        assert_eq!(total.successor("sink", 'b').unwrap(), "sink");
        assert!(!total.is_accepting("sink"));
        // the input automaton is untouched
        assert!(!dfa.is_total());
    }

    #[test]
    fn totalizing_a_total_automaton_is_a_noop() {
        let total = partial_dfa().totalize();
        assert_eq!(total.totalize(), total);
        assert_eq!(total.totalize_as("fresh").unwrap(), total);
    }

    #[test]
    fn sink_label_collisions() {
        let shadowed = AutomatonBuilder::default()
            .with_alphabet_symbols(['a'])
            .with_states(["sink"])
            .with_edges([("q0", 'a', "sink")])
            .into_dfa("q0")
            .unwrap();

        assert_eq!(
            shadowed.totalize_as("sink").unwrap_err(),
            NameCollisionError("sink".to_string())
        );
        // the automatic path deterministically picks the next free label
        let total = shadowed.totalize();
        assert!(total.contains_state("sink1"));
        assert_eq!(total.successor("sink", 'a').unwrap(), "sink1");
    }

    #[test_log::test]
    fn reachability_by_depth_first_traversal() {
        let dfa = AutomatonBuilder::default()
            .with_alphabet_symbols(['a', 'b'])
            .with_states(["island"])
            .with_edges([("q0", 'a', "q1"), ("q1", 'b', "q0"), ("island", 'a', "q0")])
            .into_dfa("q0")
            .unwrap();

        let reachable = dfa.reachable_states();
        assert!(reachable.contains("q0") && reachable.contains("q1"));
        assert!(!reachable.contains("island"));
        assert!(!dfa.all_reachable());

        assert!(partial_dfa().all_reachable());
    }
}
