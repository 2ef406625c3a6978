//! Candidate selections over atom indices.
//!
//! The search engine addresses atoms by their position in the rule-set
//! universe, so a candidate is a set of small indices packed into `u64` words.

use std::hash::{Hash, Hasher};

const WORD: usize = u64::BITS as usize;

/// A set of atom indices.
///
/// Grows on insert. Equality and hashing only look at words up to the highest
/// set bit, so the allocated capacity never matters.
#[derive(Debug, Clone, Default)]
pub struct BitSet {
    words: Vec<u64>,
}

impl BitSet {
    /// An empty selection sized for a universe of `atoms` atoms.
    pub fn with_capacity(atoms: usize) -> Self {
        Self {
            words: vec![0; atoms.div_ceil(WORD)],
        }
    }

    pub fn len(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    #[inline]
    pub fn contains(&self, atom: usize) -> bool {
        self.words
            .get(atom / WORD)
            .is_some_and(|w| w >> (atom % WORD) & 1 == 1)
    }

    /// Selects `atom`. Returns false if it was already selected.
    pub fn insert(&mut self, atom: usize) -> bool {
        let word = atom / WORD;
        if word >= self.words.len() {
            self.words.resize(word + 1, 0);
        }
        let mask = 1u64 << (atom % WORD);
        let fresh = self.words[word] & mask == 0;
        self.words[word] |= mask;
        fresh
    }

    pub fn union_with(&mut self, other: &BitSet) {
        if other.words.len() > self.words.len() {
            self.words.resize(other.words.len(), 0);
        }
        for (w, o) in self.words.iter_mut().zip(&other.words) {
            *w |= o;
        }
    }

    /// Selected atoms in increasing index order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(i, &word)| {
            let mut rest = word;
            std::iter::from_fn(move || {
                if rest == 0 {
                    return None;
                }
                let bit = rest.trailing_zeros() as usize;
                rest &= rest - 1;
                Some(i * WORD + bit)
            })
        })
    }

    fn trimmed(&self) -> &[u64] {
        let end = self.words.iter().rposition(|&w| w != 0).map_or(0, |i| i + 1);
        &self.words[..end]
    }
}

impl PartialEq for BitSet {
    fn eq(&self, other: &Self) -> bool {
        self.trimmed() == other.trimmed()
    }
}

impl Eq for BitSet {}

impl Hash for BitSet {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.trimmed().hash(state);
    }
}

impl FromIterator<usize> for BitSet {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        let mut set = Self::default();
        for atom in iter {
            set.insert(atom);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashSet;

    #[test]
    fn test_select_atoms() {
        let mut sel = BitSet::with_capacity(10);
        assert!(sel.is_empty());
        assert!(sel.insert(4));
        assert!(!sel.insert(4));
        assert!(sel.contains(4));
        assert!(!sel.contains(5));
        assert!(!sel.contains(1000));
        assert_eq!(sel.len(), 1);
    }

    #[test]
    fn test_iter_across_words() {
        let sel: BitSet = [65, 3, 64, 10].into_iter().collect();
        assert_eq!(sel.iter().collect::<Vec<_>>(), vec![3, 10, 64, 65]);
        assert_eq!(sel.len(), 4);
    }

    #[test]
    fn test_capacity_does_not_affect_identity() {
        let a: BitSet = [1, 2].into_iter().collect();
        let mut b = BitSet::with_capacity(500);
        b.insert(2);
        b.insert(1);
        assert_eq!(a, b);

        let set: HashSet<BitSet> = [a, b].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_union() {
        let mut hint: BitSet = [0, 1].into_iter().collect();
        let extra: BitSet = [1, 70].into_iter().collect();
        hint.union_with(&extra);
        assert_eq!(hint.iter().collect::<Vec<_>>(), vec![0, 1, 70]);
    }
}
