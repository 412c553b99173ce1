//! Universal byte-pair encoding: enumerates document segmentations through a
//! lookup trie and returns the top-N encodings by weight.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::config::FitOptions;
use crate::counter::Counter;
use crate::document::Document;
use crate::error::{Result, UbpeError};
use crate::metrics::{FitMetrics, LogSink, NoopSink, ProgressSink};
use crate::tokenizer::{Encoding, TokenId, TokenizerCore, TokenizerState};
use crate::topk::TopK;
use crate::trie::SssTree;

/// Tokenizer whose encoder explores alternative segmentations.
///
/// Training matches the classic variant except that merge-table entries are
/// fully expanded base-id sequences; encoding builds a segmentation DAG over
/// the lookup trie and keeps the `top_n` heaviest paths.
#[derive(Debug, Clone)]
pub struct Ubpe<D: Document> {
    core: TokenizerCore<D>,
    lookup: SssTree<TokenId, TokenId>,
}

/// One partial segmentation tail tracked by the DP.
#[derive(Debug, Clone)]
struct EncodingCandidate {
    weight: f64,
    ids: Vec<TokenId>,
    counts: Counter<TokenId>,
}

/// Higher weight outranks; on equal weight the shorter sequence wins.
fn candidate_order(a: &EncodingCandidate, b: &EncodingCandidate) -> Ordering {
    a.weight
        .total_cmp(&b.weight)
        .then_with(|| b.ids.len().cmp(&a.ids.len()))
}

impl<D: Document> Ubpe<D> {
    /// Creates an unfitted tokenizer with the identity alphabet
    /// `0..alphabet_size`.
    pub fn new(n_tokens: u32, alphabet_size: u32) -> Result<Self>
    where
        D::Symbol: TryFrom<u32>,
    {
        Ok(Self {
            core: TokenizerCore::new(n_tokens, alphabet_size)?,
            lookup: SssTree::new(),
        })
    }

    /// Creates an unfitted tokenizer over an explicit alphabet.
    pub fn with_alphabet(
        n_tokens: u32,
        alphabet_size: u32,
        alphabet: BTreeMap<D::Symbol, TokenId>,
    ) -> Result<Self> {
        Ok(Self {
            core: TokenizerCore::with_alphabet(n_tokens, alphabet_size, alphabet)?,
            lookup: SssTree::new(),
        })
    }

    /// Reconstructs a fitted tokenizer from persisted state, rebuilding the
    /// lookup trie.
    pub fn from_state(state: TokenizerState<D::Symbol>) -> Result<Self> {
        let core = TokenizerCore::from_state(state)?;
        let lookup = build_lookup(&core);
        Ok(Self { core, lookup })
    }

    /// Snapshot of the fitted state for persistence.
    #[must_use]
    pub fn state(&self) -> TokenizerState<D::Symbol> {
        self.core.to_state()
    }

    /// Whether `fit` (or state reconstruction) has completed.
    #[must_use]
    pub fn is_fitted(&self) -> bool {
        self.core.fitted
    }

    /// Target vocabulary size, alphabet included.
    #[must_use]
    pub fn n_tokens(&self) -> u32 {
        self.core.n_tokens
    }

    /// Number of base symbols.
    #[must_use]
    pub fn alphabet_size(&self) -> u32 {
        self.core.alphabet_size
    }

    /// Symbol to base-id mapping.
    #[must_use]
    pub fn alphabet(&self) -> &BTreeMap<D::Symbol, TokenId> {
        &self.core.alphabet
    }

    /// Base-id to symbol mapping.
    #[must_use]
    pub fn inverse_alphabet(&self) -> &BTreeMap<TokenId, D::Symbol> {
        &self.core.inverse_alphabet
    }

    /// Expansion sequence to learned-id mapping.
    #[must_use]
    pub fn forward_mapper(&self) -> &BTreeMap<Vec<TokenId>, TokenId> {
        &self.core.forward
    }

    /// Learned-id to base-id expansion mapping.
    #[must_use]
    pub fn backward_mapper(&self) -> &BTreeMap<TokenId, Vec<TokenId>> {
        &self.core.backward
    }

    /// Learned-id weights.
    #[must_use]
    pub fn token_weights(&self) -> &BTreeMap<TokenId, f64> {
        &self.core.weights
    }

    /// Learns the merge table from `corpus`, reporting progress through the
    /// `log` facade when [`FitOptions::show_progress`] is set.
    pub fn fit(&mut self, corpus: &[D], options: &FitOptions) -> Result<FitMetrics> {
        let mut log_sink = LogSink;
        let mut noop_sink = NoopSink;
        let sink: &mut dyn ProgressSink = if options.show_progress {
            &mut log_sink
        } else {
            &mut noop_sink
        };
        self.fit_with_sink(corpus, options, sink)
    }

    /// Learns the merge table from `corpus`, reporting progress to `sink`.
    pub fn fit_with_sink(
        &mut self,
        corpus: &[D],
        options: &FitOptions,
        sink: &mut dyn ProgressSink,
    ) -> Result<FitMetrics> {
        options.validate()?;
        if self.core.fitted {
            return Err(UbpeError::precondition(
                "tokenizer is already fitted; build a fresh instance to refit",
            ));
        }
        let mut working: Vec<Vec<TokenId>> = corpus
            .iter()
            .map(|doc| self.core.doc_to_ids(doc))
            .collect::<Result<_>>()?;

        let metrics = self.core.run_merge_rounds(&mut working, options, true, sink);
        if options.rearrange_tokens {
            self.core.rearrange_tokens_by_weight();
        }
        self.lookup = build_lookup(&self.core);
        self.core.fitted = true;
        Ok(metrics)
    }

    /// Encodes `doc`, returning up to `top_n` candidates ordered by weight
    /// descending; equal weights rank shorter sequences first.
    pub fn encode(&self, doc: &D, top_n: usize) -> Result<Vec<Encoding>> {
        if !self.core.fitted {
            return Err(UbpeError::NotFitted);
        }
        if top_n == 0 {
            return Err(UbpeError::precondition("top_n must be greater than zero"));
        }
        let ids = self.core.doc_to_ids(doc)?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let nodes = self.build_segmentation_dag(&ids);
        Ok(self.select_top_paths(&ids, &nodes, top_n))
    }

    /// Decodes a token sequence back into a document.
    pub fn decode(&self, tokens: &[TokenId]) -> Result<D> {
        self.core.decode(tokens)
    }

    /// Discovers every reachable segment start and the tokens leaving it.
    ///
    /// Each node maps a matched length to `(token, next_start)`.  Singleton
    /// alphabet keys guarantee at least one match at every reachable
    /// position.
    fn build_segmentation_dag(
        &self,
        ids: &[TokenId],
    ) -> BTreeMap<usize, BTreeMap<usize, (TokenId, usize)>> {
        let mut pending: Vec<(usize, Vec<(usize, TokenId)>)> = Vec::new();
        let mut start = 0;
        while start < ids.len() {
            let matches = self.lookup.lookup_prefix_lengths(ids, start);
            assert!(
                !matches.is_empty(),
                "lookup trie is missing a singleton alphabet key"
            );
            let longest = matches[matches.len() - 1].0;
            pending.push((start, matches));
            start += longest;
        }

        let mut nodes: BTreeMap<usize, BTreeMap<usize, (TokenId, usize)>> = BTreeMap::new();
        while let Some((start, matches)) = pending.pop() {
            if nodes.contains_key(&start) {
                continue;
            }
            let mut edges = BTreeMap::new();
            for &(length, token) in &matches {
                let next = start + length;
                edges.insert(length, (token, next));
                if next != ids.len() && !nodes.contains_key(&next) {
                    pending.push((next, self.lookup.lookup_prefix_lengths(ids, next)));
                }
            }
            nodes.insert(start, edges);
        }
        nodes
    }

    /// Back-to-front DP over the segmentation DAG keeping the `top_n` best
    /// tails per position.
    fn select_top_paths(
        &self,
        ids: &[TokenId],
        nodes: &BTreeMap<usize, BTreeMap<usize, (TokenId, usize)>>,
        top_n: usize,
    ) -> Vec<Encoding> {
        let end = ids.len();
        let mut tails: Vec<Vec<EncodingCandidate>> = vec![Vec::new(); end + 1];
        tails[end] = vec![EncodingCandidate {
            weight: 0.0,
            ids: Vec::new(),
            counts: Counter::new(),
        }];

        for position in (0..end).rev() {
            let Some(edges) = nodes.get(&position) else {
                // Position unreachable from the start of the document.
                continue;
            };
            let mut best = TopK::new(top_n, candidate_order);
            for &(token, next) in edges.values() {
                for tail in &tails[next] {
                    let mut extended_ids = Vec::with_capacity(1 + tail.ids.len());
                    extended_ids.push(token);
                    extended_ids.extend_from_slice(&tail.ids);
                    let mut counts = tail.counts.clone();
                    counts.increment(token);
                    // The functional is recomputed from the counts rather
                    // than updated incrementally.
                    let weight = self.core.weight_of_counts(&counts);
                    best.push(EncodingCandidate {
                        weight,
                        ids: extended_ids,
                        counts,
                    });
                }
            }
            tails[position] = best.into_sorted_desc();
        }

        tails[0]
            .drain(..)
            .map(|candidate| Encoding {
                ids: candidate.ids,
                weight: candidate.weight,
            })
            .collect()
    }
}

/// Builds the lookup trie from alphabet singletons and the forward mapper.
fn build_lookup<D: Document>(core: &TokenizerCore<D>) -> SssTree<TokenId, TokenId> {
    let mut lookup = SssTree::new();
    for &id in core.inverse_alphabet.keys() {
        lookup.insert(&[id], id);
    }
    for (expansion, &id) in &core.forward {
        lookup.insert(expansion, id);
    }
    lookup
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fit_options(n_candidates: u32) -> FitOptions {
        FitOptions::builder()
            .n_candidates(n_candidates)
            .show_progress(false)
            .build()
            .expect("valid options")
    }

    fn fitted_state(
        n_tokens: u32,
        alphabet_size: u32,
        backward: &[(TokenId, &[TokenId])],
        weights: &[(TokenId, f64)],
    ) -> TokenizerState<u8> {
        TokenizerState {
            n_tokens,
            alphabet_size,
            alphabet: (0..alphabet_size).map(|id| (id as u8, id)).collect(),
            inverse_alphabet: (0..alphabet_size).map(|id| (id, id as u8)).collect(),
            forward_mapper: backward
                .iter()
                .map(|&(id, seq)| (seq.to_vec(), id))
                .collect(),
            backward_mapper: backward
                .iter()
                .map(|&(id, seq)| (id, seq.to_vec()))
                .collect(),
            token_weights: weights.to_vec(),
        }
    }

    #[test]
    fn fit_stores_expanded_backward_sequences() {
        let corpus: Vec<Vec<u8>> = vec![vec![0, 1, 2, 0, 1, 2], vec![0, 1, 2]];
        let mut tokenizer = Ubpe::<Vec<u8>>::new(6, 4).expect("constructor");
        tokenizer.fit(&corpus, &fit_options(10)).expect("fit");
        // Every merge entry expands to base ids only.
        for expansion in tokenizer.backward_mapper().values() {
            assert!(expansion.iter().all(|&id| id < 4));
            assert!(expansion.len() >= 2);
        }
    }

    #[test]
    fn encode_ranks_segmentations_by_weight() {
        let state = fitted_state(
            4,
            2,
            &[(2, &[0, 1]), (3, &[0, 1, 0])],
            &[(2, 1.0), (3, 1.5)],
        );
        let tokenizer = Ubpe::<Vec<u8>>::from_state(state).expect("state restores");
        let candidates = tokenizer.encode(&vec![0u8, 1, 0], 2).expect("encode");
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].ids, vec![3]);
        assert!((candidates[0].weight - 1.5).abs() < 1e-12);
        assert_eq!(candidates[1].ids, vec![2, 0]);
        assert!((candidates[1].weight - 1.0).abs() < 1e-12);
    }

    #[test]
    fn equal_weights_prefer_shorter_sequences() {
        let state = fitted_state(
            6,
            2,
            &[(2, &[0, 1]), (3, &[0, 0]), (4, &[0, 0, 1])],
            &[(2, 1.0), (3, 0.5), (4, 0.5)],
        );
        let tokenizer = Ubpe::<Vec<u8>>::from_state(state).expect("state restores");
        let candidates = tokenizer.encode(&vec![0u8, 0, 1], 3).expect("encode");
        let ids: Vec<&[TokenId]> = candidates.iter().map(|c| c.ids.as_slice()).collect();
        assert_eq!(ids, vec![&[0, 2][..], &[4][..], &[3, 1][..]]);
        assert!((candidates[1].weight - candidates[2].weight).abs() < 1e-12);
        // Weight ordering is non-increasing throughout.
        assert!(candidates
            .windows(2)
            .all(|pair| pair[0].weight >= pair[1].weight));
    }

    #[test]
    fn every_candidate_decodes_to_the_document() {
        let corpus: Vec<Vec<u8>> = vec![
            vec![0, 1, 0, 1, 0, 1, 2],
            vec![0, 1, 2, 2, 0, 1],
            vec![2, 0, 1, 0],
        ];
        let mut tokenizer = Ubpe::<Vec<u8>>::new(8, 3).expect("constructor");
        tokenizer.fit(&corpus, &fit_options(10)).expect("fit");
        for doc in &corpus {
            for candidate in tokenizer.encode(doc, 3).expect("encode") {
                assert_eq!(&tokenizer.decode(&candidate.ids).expect("decode"), doc);
            }
        }
    }

    #[test]
    fn empty_document_encodes_to_nothing() {
        let corpus: Vec<Vec<u8>> = vec![vec![0, 1, 0, 1]];
        let mut tokenizer = Ubpe::<Vec<u8>>::new(3, 2).expect("constructor");
        tokenizer.fit(&corpus, &fit_options(5)).expect("fit");
        assert!(tokenizer.encode(&Vec::new(), 2).expect("encode").is_empty());
    }

    #[test]
    fn encode_validates_fit_and_beam_width() {
        let tokenizer = Ubpe::<Vec<u8>>::new(4, 2).expect("constructor");
        assert!(matches!(
            tokenizer.encode(&vec![0u8], 1),
            Err(UbpeError::NotFitted)
        ));

        let state = fitted_state(4, 2, &[(2, &[0, 1])], &[(2, 1.0)]);
        let fitted = Ubpe::<Vec<u8>>::from_state(state).expect("state restores");
        assert!(matches!(
            fitted.encode(&vec![0u8], 0),
            Err(UbpeError::Precondition(_))
        ));
    }

    #[test]
    fn beam_is_bounded_by_top_n() {
        let state = fitted_state(
            6,
            2,
            &[(2, &[0, 1]), (3, &[0, 0]), (4, &[0, 0, 1])],
            &[(2, 1.0), (3, 0.5), (4, 0.5)],
        );
        let tokenizer = Ubpe::<Vec<u8>>::from_state(state).expect("state restores");
        let candidates = tokenizer.encode(&vec![0u8, 0, 1], 1).expect("encode");
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].ids, vec![0, 2]);
    }
}
