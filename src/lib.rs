//! Library for working with finite automata over finite symbol alphabets.
//!
//! The centerpiece is the [`automaton::Automaton`] model, a shared representation for
//! nondeterministic and deterministic automata. An automaton consists of a finite set of named
//! states, an [`alphabet::Alphabet`] of input symbols, a transition relation mapping a state and a
//! symbol to a set of destination states, a designated initial state and a set of accepting
//! states. Nondeterministic automata may additionally carry spontaneous transitions on the
//! reserved [`alphabet::EPSILON`] symbol, which is never part of the declared input alphabet.
//!
//! On top of the model, the crate implements the two classical constructions:
//! - [`automaton::subset_construction`] turns a nondeterministic automaton into an equivalent
//!   deterministic one. Every state of the result is a [`automaton::StateClass`], i.e. a set of
//!   original states, which gets a canonical label `q0, q1, ...` in the order in which it was
//!   first discovered.
//! - [`minimization::minimize`] computes the unique minimal deterministic automaton that is
//!   language-equivalent to a given one, using the table-filling characterization of the
//!   Myhill-Nerode relation. The computed [`minimization::DistinguishabilityTable`] is part of
//!   the result, so callers can render or inspect it.
//!
//! All transformations are pure, they consume references and produce fresh
//! [`automaton::Automaton`] values. Progress that an interactive frontend might want to display
//! (discovered classes, marked pairs, the steps of an acceptance run) is emitted as [`tracing`]
//! events instead of being printed, rendering is left entirely to the caller.
#![deny(rustdoc::broken_intra_doc_links)]

/// The prelude re-exports the public surface of the crate, so that
/// `use nerode::prelude::*;` is enough for most purposes.
pub mod prelude {
    pub use super::{
        acceptance::{AcceptResult, FailureReason},
        alphabet::{Alphabet, Symbol, EPSILON},
        automaton::{
            subset_construction, Automaton, AutomatonBuilder, Dfa, MalformedAutomatonError,
            NameCollisionError, NotDeterministicError, StateClass, StateId, SubsetConstruction,
            TransitionRelation,
        },
        math,
        minimization::{
            minimize, minimize_automaton, DistinguishabilityTable, MinimizationError, Minimized,
        },
        Show,
    };
}

/// Definitions of mathematical objects used throughout the crate.
pub mod math;

/// Symbols and alphabets.
pub mod alphabet;

/// The automaton model together with the subset construction and
/// totalization/reachability helpers.
pub mod automaton;

/// Running a deterministic automaton on input words.
pub mod acceptance;

/// Table-filling minimization of deterministic automata.
pub mod minimization;

/// Helper trait used to display states, symbols and collections thereof in
/// diagnostics. For a state this is just its name, for a set of states it is
/// `{p, q, ...}`.
pub trait Show {
    /// Returns a human readable representation of `self`.
    fn show(&self) -> String;
}

impl Show for char {
    fn show(&self) -> String {
        self.to_string()
    }
}

impl Show for String {
    fn show(&self) -> String {
        self.clone()
    }
}

impl Show for bool {
    fn show(&self) -> String {
        match self {
            true => "T",
            false => "F",
        }
        .to_string()
    }
}

impl<S: Show> Show for std::collections::BTreeSet<S> {
    fn show(&self) -> String {
        format!(
            "{{{}}}",
            itertools::Itertools::join(&mut self.iter().map(|x| x.show()), ", ")
        )
    }
}

impl<S: Show> Show for &S {
    fn show(&self) -> String {
        S::show(*self)
    }
}
