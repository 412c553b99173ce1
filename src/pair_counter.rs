//! Counting of adjacent token pairs across a corpus.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::tokenizer::{Pair, TokenId};
use crate::topk::TopK;

/// Counts recorded for one adjacent pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PairStats {
    /// Number of corpus documents containing the pair at least once.
    pub documents: usize,
    /// Total occurrences of the pair across the corpus.
    pub total: usize,
}

/// Tallies adjacent `(left, right)` pairs over base-id documents, tracking
/// both total occurrences and document frequency.
#[derive(Debug, Clone, Default)]
pub struct PairCounter {
    counts: FxHashMap<Pair, PairStats>,
}

impl PairCounter {
    /// Creates an empty counter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a counter over every document of `corpus`.
    #[must_use]
    pub fn from_corpus(corpus: &[Vec<TokenId>]) -> Self {
        let mut counter = Self::new();
        for doc in corpus {
            counter.update(doc);
        }
        counter
    }

    /// Tallies the adjacent pairs of a single document.
    pub fn update(&mut self, doc: &[TokenId]) {
        if doc.len() < 2 {
            return;
        }
        for window in doc.windows(2) {
            let pair = (window[0], window[1]);
            self.counts.entry(pair).or_default().total += 1;
        }
        let unique: FxHashSet<Pair> = doc.windows(2).map(|w| (w[0], w[1])).collect();
        for pair in unique {
            self.counts.entry(pair).or_default().documents += 1;
        }
    }

    /// Returns the counts for `pair`; absent pairs report zero.
    #[must_use]
    pub fn lookup(&self, pair: Pair) -> PairStats {
        self.counts.get(&pair).copied().unwrap_or_default()
    }

    /// Number of distinct pairs seen so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    /// Whether no pair has been seen.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Returns up to `n` pairs with their totals, ordered by total
    /// descending; ties are broken by pair value descending so the result is
    /// independent of the table's iteration order.
    #[must_use]
    pub fn most_common(&self, n: usize) -> Vec<(Pair, usize)> {
        if n == 0 {
            return Vec::new();
        }
        if n >= self.counts.len() {
            let mut all: Vec<(Pair, usize)> = self
                .counts
                .iter()
                .map(|(&pair, stats)| (pair, stats.total))
                .collect();
            all.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| b.0.cmp(&a.0)));
            return all;
        }
        let mut top = TopK::new(n, |a: &(Pair, usize), b: &(Pair, usize)| {
            a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0))
        });
        for (&pair, stats) in &self.counts {
            top.push((pair, stats.total));
        }
        top.into_sorted_desc()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn totals_and_document_frequency() {
        let corpus = vec![vec![0, 1, 0, 1], vec![0, 1, 2], vec![2, 2]];
        let counter = PairCounter::from_corpus(&corpus);
        assert_eq!(
            counter.lookup((0, 1)),
            PairStats {
                documents: 2,
                total: 3
            }
        );
        assert_eq!(
            counter.lookup((1, 0)),
            PairStats {
                documents: 1,
                total: 1
            }
        );
        assert_eq!(counter.lookup((7, 7)), PairStats::default());
    }

    #[test]
    fn repeated_pair_counts_one_document() {
        let counter = PairCounter::from_corpus(&[vec![5, 5, 5, 5]]);
        let stats = counter.lookup((5, 5));
        assert_eq!(stats.total, 3);
        assert_eq!(stats.documents, 1);
    }

    #[test]
    fn most_common_orders_by_total_then_pair() {
        let corpus = vec![vec![0, 1, 0, 1, 2, 3, 2, 3]];
        let counter = PairCounter::from_corpus(&corpus);
        let common = counter.most_common(10);
        // (0,1) and (2,3) both occur twice; the larger pair sorts first.
        assert_eq!(common[0], ((2, 3), 2));
        assert_eq!(common[1], ((0, 1), 2));
        assert!(common[2..].iter().all(|&(_, total)| total == 1));
    }

    #[test]
    fn most_common_truncates_to_n() {
        let counter = PairCounter::from_corpus(&[vec![0, 1, 2, 3, 4, 5]]);
        assert_eq!(counter.most_common(2).len(), 2);
        assert!(counter.most_common(0).is_empty());
    }

    #[test]
    fn short_documents_are_ignored() {
        let mut counter = PairCounter::new();
        counter.update(&[9]);
        counter.update(&[]);
        assert!(counter.is_empty());
    }
}
