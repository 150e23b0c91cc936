use tracing::trace;

use crate::{
    alphabet::Symbol,
    automaton::{Dfa, StateId},
};

/// Why a run over a deterministic automaton did not accept. The first two variants abort
/// the run at the offending symbol, the last one means the whole word was consumed but
/// the reached state is not accepting. These are ordinary outcomes of a run, not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    /// The input contained a symbol outside the declared alphabet.
    UnknownSymbol(Symbol),
    /// No transition is defined for the current state and this symbol.
    NoTransition(Symbol),
    /// The word was consumed but ended in a non-accepting state.
    NotAccepting,
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureReason::UnknownSymbol(symbol) => {
                write!(f, "symbol `{symbol}` is not part of the alphabet")
            }
            FailureReason::NoTransition(symbol) => {
                write!(f, "no transition is defined on `{symbol}`")
            }
            FailureReason::NotAccepting => write!(f, "the reached state is not accepting"),
        }
    }
}

/// The verdict of running a [`Dfa`] on a word, carrying the precise point at which the
/// run ended: the reached final state on acceptance, the state at which the run got
/// stuck (or merely stranded) otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcceptResult {
    /// The word was consumed completely and ended in an accepting state.
    Accepted {
        /// The accepting state the run ended in.
        state: StateId,
    },
    /// The word was not accepted.
    Rejected {
        /// The state at which the run stopped.
        state: StateId,
        /// What went wrong.
        reason: FailureReason,
    },
}

impl AcceptResult {
    /// Returns true iff the word was accepted.
    pub fn accepted(&self) -> bool {
        matches!(self, AcceptResult::Accepted { .. })
    }

    /// The state at which the run ended or stopped.
    pub fn state(&self) -> &StateId {
        match self {
            AcceptResult::Accepted { state } | AcceptResult::Rejected { state, .. } => state,
        }
    }

    /// The failure reason, if the word was rejected.
    pub fn reason(&self) -> Option<FailureReason> {
        match self {
            AcceptResult::Accepted { .. } => None,
            AcceptResult::Rejected { reason, .. } => Some(*reason),
        }
    }
}

impl Dfa {
    /// Runs the automaton on `word` and reports whether it is accepted. The empty word is
    /// valid input, it is accepted iff the initial state is accepting.
    pub fn accepts(&self, word: &str) -> AcceptResult {
        self.run(word.chars())
    }

    /// Like [`Self::accepts`], for any sequence of symbols.
    pub fn run<I: IntoIterator<Item = Symbol>>(&self, word: I) -> AcceptResult {
        let mut current = self.initial().clone();
        for symbol in word {
            if !self.alphabet().contains(symbol) {
                trace!("symbol `{symbol}` is not part of the alphabet, aborting in {current}");
                return AcceptResult::Rejected {
                    state: current,
                    reason: FailureReason::UnknownSymbol(symbol),
                };
            }
            match self.successor(&current, symbol) {
                Some(successor) => {
                    trace!("{current} --{symbol}--> {successor}");
                    current = successor.clone();
                }
                None => {
                    trace!("no transition from {current} on `{symbol}`, aborting");
                    return AcceptResult::Rejected {
                        state: current,
                        reason: FailureReason::NoTransition(symbol),
                    };
                }
            }
        }
        if self.is_accepting(&current) {
            AcceptResult::Accepted { state: current }
        } else {
            AcceptResult::Rejected {
                state: current,
                reason: FailureReason::NotAccepting,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::prelude::*;

    fn a_then_anything() -> Dfa {
        AutomatonBuilder::default()
            .with_edges([
                ("q0", 'a', "q1"),
                ("q1", 'a', "q1"),
                ("q0", 'b', "q0"),
                ("q1", 'b', "q1"),
            ])
            .with_accepting(["q1"])
            .into_dfa("q0")
            .unwrap()
    }

    #[test_log::test]
    fn accepts_words_reaching_the_accepting_state() {
        let dfa = a_then_anything();
        assert!(dfa.accepts("a").accepted());
        assert!(dfa.accepts("aab").accepted());
        assert!(!dfa.accepts("b").accepted());
        assert!(!dfa.accepts("").accepted());
    }

    #[test]
    fn empty_word_follows_the_initial_state() {
        let dfa = AutomatonBuilder::default()
            .with_edges([("s", 'a', "s")])
            .with_accepting(["s"])
            .into_dfa("s")
            .unwrap();
        let result = dfa.accepts("");
        assert!(result.accepted());
        assert_eq!(result.state(), "s");
    }

    #[test]
    fn rejection_carries_the_failure_point() {
        let dfa = a_then_anything();

        let unknown = dfa.accepts("ax");
        assert_eq!(unknown.reason(), Some(FailureReason::UnknownSymbol('x')));
        assert_eq!(unknown.state(), "q1");

        let stranded = dfa.accepts("ab");
        assert!(stranded.accepted());

        let not_accepting = dfa.accepts("bb");
        assert_eq!(not_accepting.reason(), Some(FailureReason::NotAccepting));
        assert_eq!(not_accepting.state(), "q0");
    }

    #[test]
    fn missing_transition_stops_the_run() {
        let dfa = AutomatonBuilder::default()
            .with_alphabet_symbols(['a', 'b'])
            .with_edges([("q0", 'a', "q1")])
            .with_accepting(["q1"])
            .into_dfa("q0")
            .unwrap();

        let stuck = dfa.accepts("ab");
        assert_eq!(stuck.reason(), Some(FailureReason::NoTransition('b')));
        assert_eq!(stuck.state(), "q1");
    }
}
