use itertools::Itertools;

use crate::Show;

/// A symbol is an atomic element of a finite input alphabet.
pub type Symbol = char;

/// The reserved epsilon symbol. A transition guarded by it is taken spontaneously, without
/// consuming input. It is never a member of a declared [`Alphabet`], constructing an alphabet
/// from an iterator silently drops it.
pub const EPSILON: Symbol = 'e';

/// A finite, ordered collection of input symbols.
///
/// The contained symbols are deduplicated and kept sorted, so two alphabets over the same
/// symbols compare equal regardless of how they were built. [`EPSILON`] can never be a member.
///
/// # Example
/// ```
/// use nerode::prelude::*;
///
/// let alphabet: Alphabet = ['b', 'a', 'e', 'a'].into_iter().collect();
/// assert_eq!(alphabet.size(), 2);
/// assert!(alphabet.contains('a'));
/// assert!(!alphabet.contains(EPSILON));
/// ```
#[derive(Clone, Hash, PartialEq, Eq, Debug, PartialOrd, Ord)]
pub struct Alphabet(Vec<Symbol>);

impl Alphabet {
    /// Creates an alphabet of the given size, consisting of the first `size` lowercase
    /// letters other than [`EPSILON`], i.e. 'a', 'b', 'c', 'd', 'f', ...
    pub fn of_size(size: usize) -> Self {
        assert!(size < 25, "Alphabet is too large");
        ('a'..='z').filter(|&c| c != EPSILON).take(size).collect()
    }

    /// Returns the number of symbols in the alphabet.
    pub fn size(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the alphabet contains no symbols.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns true if `sym` is a member of the alphabet.
    pub fn contains(&self, sym: Symbol) -> bool {
        self.0.binary_search(&sym).is_ok()
    }

    /// Iterates over the symbols in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = Symbol> + '_ {
        self.0.iter().copied()
    }
}

impl std::ops::Index<usize> for Alphabet {
    type Output = Symbol;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

impl FromIterator<Symbol> for Alphabet {
    fn from_iter<T: IntoIterator<Item = Symbol>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .filter(|&sym| sym != EPSILON)
                .unique()
                .sorted()
                .collect(),
        )
    }
}

impl Show for Alphabet {
    fn show(&self) -> String {
        format!("{{{}}}", self.iter().join(", "))
    }
}
