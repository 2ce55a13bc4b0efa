//! Fixed-capacity bit vector used for variable sets in the dataflow analyses.
//!
//! # Example
//!
//! ```rust
//! use midend::utils::BitSet;
//!
//! let mut live = BitSet::new(10);
//! live.insert(2);
//! live.insert(7);
//! assert!(live.contains(7));
//! assert_eq!(live.iter().collect::<Vec<_>>(), vec![2, 7]);
//! ```

use std::fmt;

const WORD_BITS: usize = 64;

/// A set of small integers in `0..capacity`, 64 per word.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct BitSet {
    words: Vec<u64>,
    capacity: usize,
}

impl BitSet {
    /// Creates an empty set able to hold `0..capacity`.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        BitSet {
            words: vec![0; capacity.div_ceil(WORD_BITS)],
            capacity,
        }
    }

    /// Creates a set containing every element of `0..capacity`.
    #[must_use]
    pub fn full(capacity: usize) -> Self {
        let mut set = Self::new(capacity);
        set.words.fill(u64::MAX);
        set.trim_tail();
        set
    }

    fn trim_tail(&mut self) {
        let rem = self.capacity % WORD_BITS;
        if rem != 0 {
            if let Some(last) = self.words.last_mut() {
                *last &= (1u64 << rem) - 1;
            }
        }
    }

    /// Upper bound (exclusive) of storable elements.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns `true` if no element is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    /// Number of elements in the set.
    #[must_use]
    pub fn count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Adds `index`, returning `true` if it was not present.
    ///
    /// # Panics
    ///
    /// Panics if `index >= capacity`.
    pub fn insert(&mut self, index: usize) -> bool {
        assert!(index < self.capacity, "bit {index} out of range {}", self.capacity);
        let (word, mask) = (index / WORD_BITS, 1u64 << (index % WORD_BITS));
        let absent = self.words[word] & mask == 0;
        self.words[word] |= mask;
        absent
    }

    /// Removes `index`, returning `true` if it was present.
    ///
    /// # Panics
    ///
    /// Panics if `index >= capacity`.
    pub fn remove(&mut self, index: usize) -> bool {
        assert!(index < self.capacity, "bit {index} out of range {}", self.capacity);
        let (word, mask) = (index / WORD_BITS, 1u64 << (index % WORD_BITS));
        let present = self.words[word] & mask != 0;
        self.words[word] &= !mask;
        present
    }

    /// Returns `true` if `index` is in the set. Out-of-range indices are never contained.
    #[must_use]
    pub fn contains(&self, index: usize) -> bool {
        index < self.capacity && self.words[index / WORD_BITS] & (1u64 << (index % WORD_BITS)) != 0
    }

    /// Removes every element.
    pub fn clear(&mut self) {
        self.words.fill(0);
    }

    fn combine(&mut self, other: &Self, op: impl Fn(u64, u64) -> u64) -> bool {
        assert_eq!(self.capacity, other.capacity, "bit set capacities differ");
        let mut changed = false;
        for (a, &b) in self.words.iter_mut().zip(&other.words) {
            let merged = op(*a, b);
            changed |= merged != *a;
            *a = merged;
        }
        changed
    }

    /// `self |= other`; returns `true` if `self` changed.
    pub fn union_with(&mut self, other: &Self) -> bool {
        self.combine(other, |a, b| a | b)
    }

    /// `self &= other`; returns `true` if `self` changed.
    pub fn intersect_with(&mut self, other: &Self) -> bool {
        self.combine(other, |a, b| a & b)
    }

    /// `self -= other`; returns `true` if `self` changed.
    pub fn difference_with(&mut self, other: &Self) -> bool {
        self.combine(other, |a, b| a & !b)
    }

    /// Elements in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(w, &word)| {
            let mut bits = word;
            std::iter::from_fn(move || {
                if bits == 0 {
                    return None;
                }
                let bit = bits.trailing_zeros() as usize;
                bits &= bits - 1;
                Some(w * WORD_BITS + bit)
            })
        })
    }
}

impl fmt::Debug for BitSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_remove_contains() {
        let mut set = BitSet::new(130);
        assert!(set.insert(0));
        assert!(set.insert(129));
        assert!(!set.insert(129));
        assert!(set.contains(129));
        assert!(!set.contains(500));
        assert_eq!(set.count(), 2);
        assert!(set.remove(0));
        assert!(!set.remove(0));
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![129]);
    }

    #[test]
    fn test_full_respects_capacity() {
        let set = BitSet::full(70);
        assert_eq!(set.count(), 70);
        assert!(!set.contains(70));
    }

    #[test]
    fn test_set_operations_report_changes() {
        let mut a = BitSet::new(8);
        let mut b = BitSet::new(8);
        a.insert(1);
        b.insert(1);
        b.insert(5);

        assert!(a.union_with(&b));
        assert!(!a.union_with(&b));
        assert_eq!(a.iter().collect::<Vec<_>>(), vec![1, 5]);

        let mut only_one = BitSet::new(8);
        only_one.insert(1);
        assert!(a.difference_with(&only_one));
        assert_eq!(a.iter().collect::<Vec<_>>(), vec![5]);

        assert!(a.intersect_with(&only_one));
        assert!(a.is_empty());
    }

    #[test]
    fn test_debug_lists_members() {
        let mut set = BitSet::new(4);
        set.insert(3);
        set.insert(1);
        assert_eq!(format!("{set:?}"), "{1, 3}");
    }
}
