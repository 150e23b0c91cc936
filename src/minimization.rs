//! Minimization of deterministic finite automata by table filling.
//!
//! The algorithm marks unordered pairs of states as distinguishable: first every pair of
//! which exactly one member is accepting, then, iterated to a fixpoint, every pair that
//! some symbol takes into an already marked pair. Marking is monotone, a marked pair is
//! never unmarked, so the fixpoint is reached after finitely many passes. States that
//! remain unmarked against each other at the fixpoint accept the same residual language
//! and are merged, which by the Myhill-Nerode theorem yields the unique minimal
//! equivalent automaton.

use bit_set::BitSet;
use itertools::Itertools;
use thiserror::Error;
use tracing::{debug, trace};

use crate::{
    alphabet::Symbol,
    automaton::{Automaton, Dfa, NotDeterministicError, StateId, TransitionRelation},
    math::{Map, Partition},
};

/// Ways in which minimization can fail. A non-total transition function is not a failure,
/// it is repaired by totalization before the table is filled.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MinimizationError {
    /// Minimization is only defined for deterministic automata.
    #[error(transparent)]
    NotDeterministic(#[from] NotDeterministicError),
    /// Some states cannot be reached from the initial state. Minimization refuses to
    /// guess which language the unreachable part was meant to accept.
    #[error("states {} are not reachable from the initial state", .0.iter().join(", "))]
    UnreachableStates(Vec<StateId>),
}

/// The symmetric relation "provably distinguishable" over all unordered pairs of states,
/// in the fixed state indexing of the automaton it was computed for. Entries only ever go
/// from unmarked to marked within one run. For pairs marked during fixpoint propagation
/// the table remembers the witness symbol that first distinguished them.
#[derive(Debug, Clone)]
pub struct DistinguishabilityTable {
    states: Vec<StateId>,
    marked: BitSet,
    witnesses: Vec<Option<Symbol>>,
}

impl DistinguishabilityTable {
    fn new(states: Vec<StateId>) -> Self {
        let pairs = states.len() * states.len().saturating_sub(1) / 2;
        Self {
            states,
            marked: BitSet::with_capacity(pairs),
            witnesses: vec![None; pairs],
        }
    }

    /// Position of the unordered pair in the lower triangle of the table.
    fn position(&self, i: usize, j: usize) -> usize {
        debug_assert!(i != j, "the diagonal is not part of the relation");
        let (hi, lo) = if i > j { (i, j) } else { (j, i) };
        hi * (hi - 1) / 2 + lo
    }

    fn mark(&mut self, i: usize, j: usize, witness: Option<Symbol>) -> bool {
        let position = self.position(i, j);
        if self.marked.insert(position) {
            self.witnesses[position] = witness;
            true
        } else {
            false
        }
    }

    /// Returns true iff the pair of states at indices `i` and `j` is marked
    /// distinguishable. Symmetric in its arguments.
    pub fn is_marked(&self, i: usize, j: usize) -> bool {
        self.marked.contains(self.position(i, j))
    }

    /// The symbol that first distinguished the pair during fixpoint propagation. `None`
    /// for unmarked pairs and for pairs already separated by the initial
    /// accepting/non-accepting split.
    pub fn witness(&self, i: usize, j: usize) -> Option<Symbol> {
        self.witnesses[self.position(i, j)]
    }

    /// The states the table was computed over, in table index order.
    pub fn states(&self) -> &[StateId] {
        &self.states
    }

    /// Looks the two states up by name and reports whether they are distinguishable.
    /// `None` if either name is unknown; a state is never distinguishable from itself.
    pub fn distinguishable(&self, left: &str, right: &str) -> Option<bool> {
        let i = self.states.iter().position(|q| q == left)?;
        let j = self.states.iter().position(|q| q == right)?;
        Some(i != j && self.is_marked(i, j))
    }

    /// Reads the equivalence classes of the indistinguishability relation off the table.
    /// At the fixpoint the relation is transitive, so the class of a state is determined
    /// by the earliest state it is unmarked against.
    pub fn partition(&self) -> Partition<StateId> {
        let n = self.states.len();
        let mut classes: Vec<Vec<StateId>> = Vec::new();
        let mut class_of: Vec<usize> = Vec::with_capacity(n);
        for i in 0..n {
            match (0..i).find(|&j| !self.is_marked(i, j)) {
                Some(j) => {
                    let class = class_of[j];
                    classes[class].push(self.states[i].clone());
                    class_of.push(class);
                }
                None => {
                    class_of.push(classes.len());
                    classes.push(vec![self.states[i].clone()]);
                }
            }
        }
        Partition::new(classes)
    }
}

impl std::fmt::Display for DistinguishabilityTable {
    /// Renders the lower triangle of the table, `T` for marked (with the witness symbol
    /// where one was recorded) and `F` for unmarked pairs.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use owo_colors::OwoColorize;

        let mut builder = tabled::builder::Builder::default();
        builder.push_record(
            std::iter::once(String::new()).chain(self.states.iter().take(self.states.len().saturating_sub(1)).cloned()),
        );
        for i in 1..self.states.len() {
            let mut row = vec![self.states[i].clone()];
            for j in 0..i {
                if self.is_marked(i, j) {
                    match self.witness(i, j) {
                        Some(symbol) => row.push(format!("{} {symbol}", "T".bold())),
                        None => row.push(format!("{}", "T".bold())),
                    }
                } else {
                    row.push(format!("{}", "F".dimmed()));
                }
            }
            builder.push_record(row);
        }
        write!(
            f,
            "{}",
            builder
                .build()
                .with(tabled::settings::Style::ascii())
                .to_string()
        )
    }
}

/// The result of a successful minimization: the minimal automaton together with the
/// filled [`DistinguishabilityTable`] as a diagnostic byproduct. The table refers to the
/// automaton that was actually minimized, i.e. after totalization if one was necessary.
#[derive(Debug, Clone)]
pub struct Minimized {
    dfa: Dfa,
    table: DistinguishabilityTable,
}

impl Minimized {
    /// The minimal deterministic automaton.
    pub fn dfa(&self) -> &Dfa {
        &self.dfa
    }

    /// Discards the table and returns just the automaton.
    pub fn into_dfa(self) -> Dfa {
        self.dfa
    }

    /// The filled distinguishability table.
    pub fn table(&self) -> &DistinguishabilityTable {
        &self.table
    }

    /// The equivalence classes that were merged, one class per state of the minimal
    /// automaton. Useful for comparing minimization results up to renaming of states.
    pub fn partition(&self) -> Partition<StateId> {
        self.table.partition()
    }
}

/// Entry point for automata whose determinism is not established yet; fails with
/// [`MinimizationError::NotDeterministic`] instead of minimizing something the table
/// filling is not defined for.
pub fn minimize_automaton(automaton: &Automaton) -> Result<Minimized, MinimizationError> {
    let dfa = automaton.clone().into_dfa()?;
    minimize(&dfa)
}

/// Minimizes a deterministic automaton by table filling.
///
/// Preconditions are established in order: determinism is witnessed by the [`Dfa`] type,
/// a non-total transition function is repaired by [`Dfa::totalize`], and unreachable
/// states are a hard error since the table-filling argument only applies to reachable
/// automata.
///
/// When several states collapse into one equivalence class, the member with the lowest
/// index in the state ordering survives and absorbs the others.
pub fn minimize(dfa: &Dfa) -> Result<Minimized, MinimizationError> {
    let dfa = if dfa.is_total() {
        dfa.clone()
    } else {
        debug!("transition function is not total, totalizing before minimization");
        dfa.totalize()
    };

    let reachable = dfa.reachable_states();
    let unreachable: Vec<StateId> = dfa
        .states()
        .iter()
        .filter(|state| !reachable.contains(*state))
        .cloned()
        .collect();
    if !unreachable.is_empty() {
        return Err(MinimizationError::UnreachableStates(unreachable));
    }

    let table = fill_table(&dfa);
    let unification = unify(&table);
    Ok(Minimized {
        dfa: rewrite(&dfa, &unification),
        table,
    })
}

/// Runs initial marking and fixpoint propagation, returning the filled table.
fn fill_table(dfa: &Dfa) -> DistinguishabilityTable {
    let states = dfa.states().to_vec();
    let n = states.len();
    let index: Map<&StateId, usize> = states.iter().enumerate().map(|(i, q)| (q, i)).collect();
    let mut table = DistinguishabilityTable::new(states.clone());

    debug!("marking pairs split by acceptance");
    for i in 0..n {
        for j in 0..i {
            if dfa.is_accepting(&states[i]) != dfa.is_accepting(&states[j]) {
                table.mark(i, j, None);
                trace!("marked ({}, {})", states[i], states[j]);
            }
        }
    }

    debug!("propagating distinguishability to a fixpoint");
    let mut changed = true;
    while changed {
        changed = false;
        for i in 0..n {
            for j in 0..i {
                if table.is_marked(i, j) {
                    continue;
                }
                for symbol in dfa.alphabet().iter() {
                    // totality guarantees both successors exist
                    let (Some(a), Some(b)) = (
                        dfa.successor(&states[i], symbol),
                        dfa.successor(&states[j], symbol),
                    ) else {
                        continue;
                    };
                    let (a, b) = (index[a], index[b]);
                    if a != b && table.is_marked(a, b) {
                        table.mark(i, j, Some(symbol));
                        trace!("marked ({}, {}) via `{symbol}`", states[i], states[j]);
                        changed = true;
                        break;
                    }
                }
            }
        }
    }
    table
}

/// Maps every unified-away state to the state that absorbs it: scanning pairs with the
/// outer index increasing and the inner index increasing below it, an unmarked pair
/// records the later state as unified into the earlier one, later matches overwriting
/// earlier ones.
fn unify(table: &DistinguishabilityTable) -> Map<StateId, StateId> {
    let states = table.states();
    let mut unification = Map::default();
    for i in 0..states.len() {
        for j in 0..i {
            if !table.is_marked(i, j) {
                trace!("unifying {} into {}", states[i], states[j]);
                unification.insert(states[i].clone(), states[j].clone());
            }
        }
    }
    unification
}

/// Resolves the representative of `state` under the unification mapping. Chains can
/// occur when a class has three or more members, representatives always point to
/// strictly earlier states, so following them terminates.
fn representative<'a>(unification: &'a Map<StateId, StateId>, state: &'a StateId) -> &'a StateId {
    let mut current = state;
    while let Some(earlier) = unification.get(current) {
        current = earlier;
    }
    current
}

/// Builds the minimal automaton: surviving states keep their order, transitions and the
/// initial state are rewritten through the unification mapping, accepting states are
/// filtered to the survivors.
fn rewrite(dfa: &Dfa, unification: &Map<StateId, StateId>) -> Dfa {
    let states: Vec<StateId> = dfa
        .states()
        .iter()
        .filter(|state| !unification.contains_key(*state))
        .cloned()
        .collect();

    let mut transitions = TransitionRelation::default();
    for state in &states {
        for symbol in dfa.alphabet().iter() {
            if let Some(destination) = dfa.successor(state, symbol) {
                transitions
                    .entry((state.clone(), symbol))
                    .or_default()
                    .insert(representative(unification, destination).clone());
            }
        }
    }

    let initial = representative(unification, dfa.initial()).clone();
    let accepting: Vec<StateId> = dfa
        .accepting()
        .iter()
        .filter(|&state| states.contains(state))
        .cloned()
        .collect();

    Automaton::new(dfa.alphabet().clone(), states, transitions, initial, accepting)
        .expect("unification maps every state onto a surviving representative")
        .into_dfa()
        .expect("merging equivalent states preserves determinism")
}
