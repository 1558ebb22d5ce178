//! A dynamically-sized bitset over operator indices.

/// Set of operator indices, stored as 64-bit words.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct OpSet {
    bits: Vec<u64>,
}

impl OpSet {
    const BITS_PER_WORD: usize = 64;

    pub(crate) fn with_capacity(n: usize) -> Self {
        Self {
            bits: vec![0; n.div_ceil(Self::BITS_PER_WORD)],
        }
    }

    pub(crate) fn insert(&mut self, index: usize) {
        let word = index / Self::BITS_PER_WORD;
        if word >= self.bits.len() {
            self.bits.resize(word + 1, 0);
        }
        self.bits[word] |= 1u64 << (index % Self::BITS_PER_WORD);
    }

    pub(crate) fn contains(&self, index: usize) -> bool {
        let word = index / Self::BITS_PER_WORD;
        word < self.bits.len() && self.bits[word] & (1u64 << (index % Self::BITS_PER_WORD)) != 0
    }

    pub(crate) fn union_with(&mut self, other: &OpSet) {
        if other.bits.len() > self.bits.len() {
            self.bits.resize(other.bits.len(), 0);
        }
        for (a, b) in self.bits.iter_mut().zip(&other.bits) {
            *a |= *b;
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.bits.iter().map(|w| w.count_ones() as usize).sum()
    }
}
