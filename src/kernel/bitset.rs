use std::fmt;

/// A growable set of small integers, one bit per member.
///
/// Trailing zero words are always trimmed, so two sets with the same members compare equal.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct BitSet {
    words: Vec<u64>,
}

impl BitSet {
    pub fn new() -> BitSet {
        BitSet { words: vec![] }
    }

    pub fn from_slice(items: &[usize]) -> BitSet {
        let mut answer = BitSet::new();
        for &i in items {
            answer.insert(i);
        }
        answer
    }

    fn trim(&mut self) {
        while let Some(&0) = self.words.last() {
            self.words.pop();
        }
    }

    /// Returns whether the item was newly inserted.
    pub fn insert(&mut self, i: usize) -> bool {
        let (word, bit) = (i / 64, i % 64);
        if word >= self.words.len() {
            self.words.resize(word + 1, 0);
        }
        let was_present = self.words[word] & (1u64 << bit) != 0;
        self.words[word] |= 1u64 << bit;
        !was_present
    }

    /// Returns whether the item was present.
    pub fn remove(&mut self, i: usize) -> bool {
        let (word, bit) = (i / 64, i % 64);
        if word >= self.words.len() {
            return false;
        }
        let was_present = self.words[word] & (1u64 << bit) != 0;
        self.words[word] &= !(1u64 << bit);
        self.trim();
        was_present
    }

    pub fn contains(&self, i: usize) -> bool {
        let (word, bit) = (i / 64, i % 64);
        word < self.words.len() && self.words[word] & (1u64 << bit) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn len(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn union(&self, other: &BitSet) -> BitSet {
        let n = self.words.len().max(other.words.len());
        let mut words = Vec::with_capacity(n);
        for i in 0..n {
            let a = self.words.get(i).copied().unwrap_or(0);
            let b = other.words.get(i).copied().unwrap_or(0);
            words.push(a | b);
        }
        BitSet { words }
    }

    pub fn difference(&self, other: &BitSet) -> BitSet {
        let mut words = self.words.clone();
        for (i, w) in words.iter_mut().enumerate() {
            *w &= !other.words.get(i).copied().unwrap_or(0);
        }
        let mut answer = BitSet { words };
        answer.trim();
        answer
    }

    pub fn intersects(&self, other: &BitSet) -> bool {
        self.words
            .iter()
            .zip(other.words.iter())
            .any(|(a, b)| a & b != 0)
    }

    /// Iterates over the members in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(i, &word)| {
            (0..64usize)
                .filter(move |&bit| word & (1u64 << bit) != 0)
                .map(move |bit| i * 64 + bit)
        })
    }
}

impl fmt::Debug for BitSet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}
