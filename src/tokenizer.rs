//! Shared tokenizer state and the primitives both encoder variants build on:
//! alphabet maps, the merge table, token weights, batched pair substitution,
//! and weight-driven vocabulary rearrangement.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

use ahash::AHashSet;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::config::FitOptions;
use crate::counter::Counter;
use crate::document::Document;
use crate::error::{Result, UbpeError};
use crate::metrics::{FitMetrics, ProgressSink, RoundMetrics, StopReason};
use crate::pair_counter::PairCounter;

/// Token identifier used throughout the crate.
pub type TokenId = u32;
/// Adjacent token pair encoded as `(left, right)` identifiers.
pub type Pair = (TokenId, TokenId);

/// One encoding candidate: a token sequence and its weight.
#[derive(Debug, Clone, PartialEq)]
pub struct Encoding {
    /// Token ids covering the encoded document.
    pub ids: Vec<TokenId>,
    /// Weight of the sequence under the encoder's weight functional.
    pub weight: f64,
}

/// Persisted snapshot of a fitted tokenizer.
///
/// Maps are stored as entry lists so that sequence-keyed tables survive JSON
/// serialization.  Together with the two scalars this is the complete state
/// needed to reconstruct either tokenizer variant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenizerState<S> {
    /// Target vocabulary size, alphabet included.
    pub n_tokens: u32,
    /// Number of base symbols.
    pub alphabet_size: u32,
    /// Symbol to base-id mapping.
    pub alphabet: Vec<(S, TokenId)>,
    /// Base-id to symbol mapping.
    pub inverse_alphabet: Vec<(TokenId, S)>,
    /// Component sequence to learned-id mapping.
    pub forward_mapper: Vec<(Vec<TokenId>, TokenId)>,
    /// Learned-id to component sequence mapping.
    pub backward_mapper: Vec<(TokenId, Vec<TokenId>)>,
    /// Learned-id weights.
    pub token_weights: Vec<(TokenId, f64)>,
}

/// State shared by the classic and universal variants.
#[derive(Debug, Clone)]
pub(crate) struct TokenizerCore<D: Document> {
    pub(crate) n_tokens: u32,
    pub(crate) alphabet_size: u32,
    pub(crate) alphabet: BTreeMap<D::Symbol, TokenId>,
    pub(crate) inverse_alphabet: BTreeMap<TokenId, D::Symbol>,
    pub(crate) forward: BTreeMap<Vec<TokenId>, TokenId>,
    pub(crate) backward: BTreeMap<TokenId, Vec<TokenId>>,
    pub(crate) weights: BTreeMap<TokenId, f64>,
    pub(crate) fitted: bool,
}

impl<D: Document> TokenizerCore<D> {
    pub(crate) fn new(n_tokens: u32, alphabet_size: u32) -> Result<Self>
    where
        D::Symbol: TryFrom<u32>,
    {
        validate_sizes(n_tokens, alphabet_size)?;
        let mut alphabet = BTreeMap::new();
        let mut inverse_alphabet = BTreeMap::new();
        for id in 0..alphabet_size {
            let symbol = D::Symbol::try_from(id).map_err(|_| {
                UbpeError::precondition(format!(
                    "base id {id} is not representable as an alphabet symbol"
                ))
            })?;
            alphabet.insert(symbol.clone(), id);
            inverse_alphabet.insert(id, symbol);
        }
        if alphabet.len() != alphabet_size as usize {
            return Err(UbpeError::precondition(
                "identity alphabet produced duplicate symbols",
            ));
        }
        Ok(Self {
            n_tokens,
            alphabet_size,
            alphabet,
            inverse_alphabet,
            forward: BTreeMap::new(),
            backward: BTreeMap::new(),
            weights: BTreeMap::new(),
            fitted: false,
        })
    }

    pub(crate) fn with_alphabet(
        n_tokens: u32,
        alphabet_size: u32,
        alphabet: BTreeMap<D::Symbol, TokenId>,
    ) -> Result<Self> {
        validate_sizes(n_tokens, alphabet_size)?;
        if alphabet.len() != alphabet_size as usize {
            return Err(UbpeError::precondition(format!(
                "alphabet has {} entries but alphabet_size is {alphabet_size}",
                alphabet.len()
            )));
        }
        let mut inverse_alphabet = BTreeMap::new();
        for (symbol, &id) in &alphabet {
            if id >= alphabet_size {
                return Err(UbpeError::precondition(format!(
                    "alphabet id {id} is outside the base range 0..{alphabet_size}"
                )));
            }
            inverse_alphabet.insert(id, symbol.clone());
        }
        if inverse_alphabet.len() != alphabet.len() {
            return Err(UbpeError::precondition(
                "alphabet ids are not unique; the mapping must be a bijection",
            ));
        }
        Ok(Self {
            n_tokens,
            alphabet_size,
            alphabet,
            inverse_alphabet,
            forward: BTreeMap::new(),
            backward: BTreeMap::new(),
            weights: BTreeMap::new(),
            fitted: false,
        })
    }

    pub(crate) fn from_state(state: TokenizerState<D::Symbol>) -> Result<Self> {
        validate_sizes(state.n_tokens, state.alphabet_size)?;
        if state.alphabet.len() != state.alphabet_size as usize {
            return Err(UbpeError::precondition(format!(
                "state alphabet has {} entries but alphabet_size is {}",
                state.alphabet.len(),
                state.alphabet_size
            )));
        }
        if state.alphabet.len() != state.inverse_alphabet.len() {
            return Err(UbpeError::precondition(
                "alphabet and inverse alphabet must be the same size",
            ));
        }
        let alphabet: BTreeMap<D::Symbol, TokenId> = state.alphabet.into_iter().collect();
        let inverse_alphabet: BTreeMap<TokenId, D::Symbol> =
            state.inverse_alphabet.into_iter().collect();
        if alphabet.len() != inverse_alphabet.len() {
            return Err(UbpeError::precondition(
                "alphabet entries collapsed; symbols and ids must be unique",
            ));
        }
        Ok(Self {
            n_tokens: state.n_tokens,
            alphabet_size: state.alphabet_size,
            alphabet,
            inverse_alphabet,
            forward: state.forward_mapper.into_iter().collect(),
            backward: state.backward_mapper.into_iter().collect(),
            weights: state.token_weights.into_iter().collect(),
            fitted: true,
        })
    }

    pub(crate) fn to_state(&self) -> TokenizerState<D::Symbol> {
        TokenizerState {
            n_tokens: self.n_tokens,
            alphabet_size: self.alphabet_size,
            alphabet: self
                .alphabet
                .iter()
                .map(|(symbol, &id)| (symbol.clone(), id))
                .collect(),
            inverse_alphabet: self
                .inverse_alphabet
                .iter()
                .map(|(&id, symbol)| (id, symbol.clone()))
                .collect(),
            forward_mapper: self
                .forward
                .iter()
                .map(|(seq, &id)| (seq.clone(), id))
                .collect(),
            backward_mapper: self
                .backward
                .iter()
                .map(|(&id, seq)| (id, seq.clone()))
                .collect(),
            token_weights: self.weights.iter().map(|(&id, &w)| (id, w)).collect(),
        }
    }

    /// Translates a document into base ids through the alphabet.
    pub(crate) fn doc_to_ids(&self, doc: &D) -> Result<Vec<TokenId>> {
        let symbols = doc.symbols();
        let mut ids = Vec::with_capacity(symbols.len());
        for (position, symbol) in symbols.iter().enumerate() {
            match self.alphabet.get(symbol) {
                Some(&id) => ids.push(id),
                None => return Err(UbpeError::UnknownSymbol(position)),
            }
        }
        Ok(ids)
    }

    /// Translates base ids back into a document through the inverse alphabet.
    pub(crate) fn ids_to_doc(&self, ids: &[TokenId]) -> Result<D> {
        let mut symbols = Vec::with_capacity(ids.len());
        for &id in ids {
            match self.inverse_alphabet.get(&id) {
                Some(symbol) => symbols.push(symbol.clone()),
                None => return Err(UbpeError::UnknownToken(id)),
            }
        }
        Ok(D::from_symbols(symbols))
    }

    /// Expands every token through the merge table transitively and maps the
    /// resulting base ids back to symbols.
    pub(crate) fn decode(&self, tokens: &[TokenId]) -> Result<D> {
        if !self.fitted {
            return Err(UbpeError::NotFitted);
        }
        if tokens.is_empty() {
            return Ok(D::from_symbols(Vec::new()));
        }
        let mut stack: Vec<TokenId> = tokens.iter().rev().copied().collect();
        let mut base = Vec::with_capacity(tokens.len());
        while let Some(token) = stack.pop() {
            if let Some(components) = self.backward.get(&token) {
                stack.extend(components.iter().rev());
            } else if self.inverse_alphabet.contains_key(&token) {
                base.push(token);
            } else {
                return Err(UbpeError::UnknownToken(token));
            }
        }
        self.ids_to_doc(&base)
    }

    /// Fully expanded base-id sequence behind `id`; base ids expand to
    /// themselves.
    pub(crate) fn expansion_of(&self, id: TokenId) -> Vec<TokenId> {
        self.backward.get(&id).cloned().unwrap_or_else(|| vec![id])
    }

    /// Weight of an encoding under the weight functional: each distinct
    /// token contributes `(1 + ln count) * weight`; tokens without a learned
    /// weight contribute nothing.
    pub(crate) fn weight_of_counts(&self, counts: &Counter<TokenId>) -> f64 {
        counts
            .iter()
            .map(|(token, count)| match self.weights.get(token) {
                Some(weight) => (1.0 + (count as f64).ln()) * weight,
                None => 0.0,
            })
            .sum()
    }

    /// Weight of a finished token sequence.
    pub(crate) fn encoding_weight(&self, ids: &[TokenId]) -> f64 {
        let counts: Counter<TokenId> = ids.iter().copied().collect();
        self.weight_of_counts(&counts)
    }

    /// Runs merge rounds over `corpus` until the vocabulary target is
    /// reached or no candidate pairs remain.
    ///
    /// With `expanded_backward` the merge table stores fully expanded
    /// base-id sequences (universal variant); otherwise it stores the two
    /// component ids (classic variant).
    pub(crate) fn run_merge_rounds(
        &mut self,
        corpus: &mut [Vec<TokenId>],
        options: &FitOptions,
        expanded_backward: bool,
        sink: &mut dyn ProgressSink,
    ) -> FitMetrics {
        let target = self.n_tokens as usize;
        let learned_target = target - self.alphabet_size as usize;
        let mut max_token = self.alphabet_size - 1;
        let mut metrics = FitMetrics::new(learned_target.min(16_384));
        let fit_start = Instant::now();
        let mut round = 0usize;

        while (max_token as usize) + 1 < target {
            let round_start = Instant::now();
            let counter = PairCounter::from_corpus(corpus);
            let candidates = counter.most_common(options.n_candidates as usize);
            if candidates.is_empty() {
                metrics.stop_reason = StopReason::NoEligiblePairs;
                break;
            }

            let batch = select_merge_batch(&counter, &candidates);
            let mut substitutions: FxHashMap<TokenId, (TokenId, TokenId)> =
                FxHashMap::default();
            for &(pair, _) in &batch {
                max_token += 1;
                let documents_with_pair = counter.lookup(pair).documents;
                let weight =
                    ((1 + corpus.len()) as f64 / (1 + documents_with_pair) as f64).ln();
                self.weights.insert(max_token, weight);
                let components = if expanded_backward {
                    let mut seq = self.expansion_of(pair.0);
                    seq.extend(self.expansion_of(pair.1));
                    seq
                } else {
                    vec![pair.0, pair.1]
                };
                self.backward.insert(max_token, components.clone());
                self.forward.insert(components, max_token);
                substitutions.insert(pair.0, (pair.1, max_token));
            }

            for doc in corpus.iter_mut() {
                replace_token_pairs(doc, &substitutions);
            }

            round += 1;
            let stats = RoundMetrics {
                round,
                merges_added: batch.len(),
                best_frequency: candidates[0].1,
                distinct_pairs: counter.len(),
                vocab_size: (max_token as usize) + 1,
                elapsed_round: round_start.elapsed(),
                elapsed_total: fit_start.elapsed(),
            };
            sink.on_round(&stats);
            let learned = (max_token + 1 - self.alphabet_size) as usize;
            sink.on_progress(learned.min(learned_target), learned_target);
            metrics.rounds.push(stats);
        }

        metrics.total_duration = fit_start.elapsed();
        metrics
    }

    /// Reorders learned ids so that lower id means higher weight and prunes
    /// the vocabulary down to the target size.  Any token whose expansion
    /// references a pruned token is pruned with it.
    pub(crate) fn rearrange_tokens_by_weight(&mut self) {
        let mut buf: Vec<(TokenId, Vec<TokenId>)> = self
            .backward
            .iter()
            .map(|(&id, seq)| (id, seq.clone()))
            .collect();
        buf.sort_by(|a, b| self.weights[&a.0].total_cmp(&self.weights[&b.0]));

        let excess = (buf.len() + self.alphabet_size as usize)
            .saturating_sub(self.n_tokens as usize);

        let mut deleted: BTreeSet<TokenId> = BTreeSet::new();
        for i in 0..buf.len() {
            if deleted.contains(&buf[i].0) {
                continue;
            }
            if deleted.len() >= excess {
                break;
            }
            deleted.insert(buf[i].0);
            // Propagate to every token whose expansion references a deleted
            // one, until the set stabilises.
            loop {
                let mut changed = false;
                for (id, seq) in &buf[i + 1..] {
                    if deleted.contains(id) {
                        continue;
                    }
                    if seq.iter().any(|component| deleted.contains(component)) {
                        deleted.insert(*id);
                        changed = true;
                    }
                }
                if !changed {
                    break;
                }
            }
        }

        // Heaviest first; survivors get consecutive ids from the alphabet up.
        buf.reverse();
        let mut transformer: BTreeMap<TokenId, TokenId> =
            (0..self.alphabet_size).map(|id| (id, id)).collect();
        let mut next = self.alphabet_size;
        for (id, _) in &buf {
            if deleted.contains(id) {
                continue;
            }
            transformer.insert(*id, next);
            next += 1;
        }

        let mut backward = BTreeMap::new();
        let mut weights = BTreeMap::new();
        for (id, seq) in &buf {
            if deleted.contains(id) {
                continue;
            }
            let new_id = transformer[id];
            let components: Vec<TokenId> =
                seq.iter().map(|component| transformer[component]).collect();
            backward.insert(new_id, components);
            weights.insert(new_id, self.weights[id]);
        }
        self.backward = backward;
        self.weights = weights;
        self.forward = self
            .backward
            .iter()
            .map(|(&id, seq)| (seq.clone(), id))
            .collect();
    }
}

fn validate_sizes(n_tokens: u32, alphabet_size: u32) -> Result<()> {
    if alphabet_size == 0 {
        return Err(UbpeError::precondition("alphabet must not be empty"));
    }
    if n_tokens < alphabet_size {
        return Err(UbpeError::precondition(format!(
            "n_tokens ({n_tokens}) must be at least alphabet_size ({alphabet_size})"
        )));
    }
    Ok(())
}

/// Selects a non-overlapping batch of merges from the ordered candidate
/// list: components must be disjoint across the batch, and a candidate is
/// rejected when a border pair against an already accepted merge is at
/// least as frequent.
pub(crate) fn select_merge_batch(
    counter: &PairCounter,
    candidates: &[(Pair, usize)],
) -> Vec<(Pair, usize)> {
    let seed = candidates[0];
    let mut accepted = vec![seed];
    let mut used: AHashSet<TokenId> = AHashSet::new();
    used.insert(seed.0 .0);
    used.insert(seed.0 .1);

    for &(pair, frequency) in &candidates[1..] {
        if used.contains(&pair.0) || used.contains(&pair.1) {
            continue;
        }
        let safe = accepted.iter().all(|&(other, _)| {
            counter.lookup((pair.1, other.0)).total < frequency
                && counter.lookup((other.1, pair.0)).total < frequency
        });
        if safe {
            accepted.push((pair, frequency));
            used.insert(pair.0);
            used.insert(pair.1);
        }
    }
    accepted
}

/// Rewrites `vec` in place, replacing every adjacent pair matched by `sub`
/// (keyed by the pair's first id) with its merged id.
///
/// Two-pointer sweep: each input position is consumed exactly once, so
/// substitutions never overlap within one pass.
pub(crate) fn replace_token_pairs(
    vec: &mut Vec<TokenId>,
    sub: &FxHashMap<TokenId, (TokenId, TokenId)>,
) {
    let len = vec.len();
    let mut read = 0;
    let mut write = 0;
    while read + 1 < len {
        match sub.get(&vec[read]) {
            Some(&(second, merged)) if vec[read + 1] == second => {
                vec[write] = merged;
                write += 1;
                read += 2;
            }
            _ => {
                vec[write] = vec[read];
                write += 1;
                read += 1;
            }
        }
    }
    if read < len {
        vec[write] = vec[read];
        write += 1;
    }
    vec.truncate(write);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sub_map(entries: &[(TokenId, (TokenId, TokenId))]) -> FxHashMap<TokenId, (TokenId, TokenId)> {
        entries.iter().copied().collect()
    }

    #[test]
    fn replace_rewrites_matching_pairs() {
        let mut doc = vec![0, 1, 2, 0, 1, 0];
        replace_token_pairs(&mut doc, &sub_map(&[(0, (1, 9))]));
        assert_eq!(doc, vec![9, 2, 9, 0]);
    }

    #[test]
    fn replace_consumes_each_position_once() {
        // Runs of the same id collapse pairwise, never reusing an element.
        let mut doc = vec![0, 0, 0];
        replace_token_pairs(&mut doc, &sub_map(&[(0, (0, 9))]));
        assert_eq!(doc, vec![9, 0]);

        let mut doc = vec![0, 0, 0, 0];
        replace_token_pairs(&mut doc, &sub_map(&[(0, (0, 9))]));
        assert_eq!(doc, vec![9, 9]);
    }

    #[test]
    fn replace_applies_batch_without_interference() {
        let mut doc = vec![0, 1, 2, 3, 0, 1];
        replace_token_pairs(&mut doc, &sub_map(&[(0, (1, 8)), (2, (3, 9))]));
        assert_eq!(doc, vec![8, 9, 8]);
    }

    #[test]
    fn replace_keeps_short_documents() {
        let mut doc = vec![5];
        replace_token_pairs(&mut doc, &sub_map(&[(5, (5, 9))]));
        assert_eq!(doc, vec![5]);
        let mut empty: Vec<TokenId> = Vec::new();
        replace_token_pairs(&mut empty, &sub_map(&[]));
        assert!(empty.is_empty());
    }

    #[test]
    fn batch_selection_skips_overlapping_components() {
        let counter = PairCounter::from_corpus(&[vec![0, 1, 0, 1, 0, 1, 2, 0, 1]]);
        let candidates = counter.most_common(5);
        assert_eq!(candidates[0].0, (0, 1));
        let batch = select_merge_batch(&counter, &candidates);
        assert_eq!(batch, vec![((0, 1), 4)]);
    }

    #[test]
    fn batch_selection_rejects_frequent_border_pairs() {
        // (1,2) straddles (0,1)+(2,3) and is as frequent as (2,3).
        let corpus = vec![
            vec![0, 1, 2, 3],
            vec![0, 1, 2, 3],
            vec![0, 1, 2, 3],
            vec![0, 1],
        ];
        let counter = PairCounter::from_corpus(&corpus);
        let candidates = counter.most_common(5);
        let batch = select_merge_batch(&counter, &candidates);
        assert_eq!(batch, vec![((0, 1), 4)]);
    }

    #[test]
    fn batch_selection_accepts_weak_border_pairs() {
        // Here (1,2) is strictly rarer than both candidates.
        let corpus = vec![
            vec![0, 1, 2, 3],
            vec![0, 1, 2, 3],
            vec![0, 1],
            vec![2, 3],
        ];
        let counter = PairCounter::from_corpus(&corpus);
        let candidates = counter.most_common(5);
        // Equal totals, larger pair first.
        assert_eq!(candidates[0].0, (2, 3));
        let batch = select_merge_batch(&counter, &candidates);
        assert_eq!(batch, vec![((2, 3), 3), ((0, 1), 3)]);
    }

    fn bare_core(
        n_tokens: u32,
        alphabet_size: u32,
        backward: &[(TokenId, &[TokenId])],
        weights: &[(TokenId, f64)],
    ) -> TokenizerCore<Vec<u8>> {
        let mut core = TokenizerCore::<Vec<u8>>::new(n_tokens, alphabet_size)
            .expect("core construction");
        for &(id, seq) in backward {
            core.backward.insert(id, seq.to_vec());
            core.forward.insert(seq.to_vec(), id);
        }
        for &(id, weight) in weights {
            core.weights.insert(id, weight);
        }
        core
    }

    #[test]
    fn decode_expands_transitively() {
        let mut core = bare_core(
            8,
            4,
            &[(4, &[0, 1]), (5, &[4, 4])],
            &[(4, 1.0), (5, 2.0)],
        );
        core.fitted = true;
        assert_eq!(core.decode(&[5]).expect("decode"), vec![0, 1, 0, 1]);
        assert_eq!(core.decode(&[2, 4]).expect("decode"), vec![2, 0, 1]);
        assert!(matches!(
            core.decode(&[9]),
            Err(UbpeError::UnknownToken(9))
        ));
    }

    #[test]
    fn decode_requires_a_fitted_tokenizer() {
        let core = bare_core(8, 4, &[], &[]);
        assert!(matches!(core.decode(&[0]), Err(UbpeError::NotFitted)));
    }

    #[test]
    fn rearrange_prunes_lightest_tokens_and_relabels() {
        let mut core = bare_core(
            4,
            2,
            &[(2, &[0, 1]), (3, &[1, 0]), (4, &[0, 0])],
            &[(2, 0.9), (3, 0.5), (4, 0.7)],
        );
        core.rearrange_tokens_by_weight();
        // One over target: the lightest (old 3) goes; survivors relabel by
        // descending weight.
        assert_eq!(core.backward.len(), 2);
        assert_eq!(core.backward[&2], vec![0, 1]);
        assert_eq!(core.backward[&3], vec![0, 0]);
        assert_eq!(core.weights[&2], 0.9);
        assert_eq!(core.weights[&3], 0.7);
        assert_eq!(core.forward[&vec![0, 0]], 3);
    }

    #[test]
    fn rearrange_prunes_dependents_transitively() {
        // 3 references 2, 4 references 3: deleting 2 must take both.
        let mut core = bare_core(
            4,
            2,
            &[(2, &[0, 1]), (3, &[2, 0]), (4, &[3, 1])],
            &[(2, 0.1), (3, 0.5), (4, 0.4)],
        );
        core.rearrange_tokens_by_weight();
        assert!(core.backward.is_empty());
        assert!(core.weights.is_empty());
        assert!(core.forward.is_empty());
    }

    #[test]
    fn rearrange_prunes_excess_vocabulary_to_target() {
        let backward: Vec<(TokenId, Vec<TokenId>)> = (0..300)
            .map(|i| (4 + i, vec![i % 4, (i + 1) % 4]))
            .collect();
        let borrowed: Vec<(TokenId, &[TokenId])> = backward
            .iter()
            .map(|(id, seq)| (*id, seq.as_slice()))
            .collect();
        let weights: Vec<(TokenId, f64)> =
            (0..300).map(|i| (4 + i, f64::from(i) * 0.01)).collect();
        let mut core = bare_core(14, 4, &borrowed, &weights);
        core.rearrange_tokens_by_weight();
        // 290 lightest learned ids deleted, survivors relabelled 4..14 with
        // weight decreasing as the id grows.
        assert_eq!(core.backward.len(), 10);
        let ids: Vec<TokenId> = core.weights.keys().copied().collect();
        assert_eq!(ids, (4..14).collect::<Vec<_>>());
        let ws: Vec<f64> = core.weights.values().copied().collect();
        assert!(ws.windows(2).all(|w| w[0] > w[1]));
        assert!((core.weights[&4] - 2.99).abs() < 1e-9);
    }

    #[test]
    fn rearrange_without_excess_only_relabels() {
        let mut core = bare_core(
            16,
            2,
            &[(7, &[0, 1]), (9, &[1, 1])],
            &[(7, 0.2), (9, 0.8)],
        );
        core.rearrange_tokens_by_weight();
        assert_eq!(core.backward[&2], vec![1, 1]);
        assert_eq!(core.backward[&3], vec![0, 1]);
    }

    #[test]
    fn constructors_validate_sizes() {
        assert!(matches!(
            TokenizerCore::<Vec<u8>>::new(1, 4),
            Err(UbpeError::Precondition(_))
        ));
        assert!(matches!(
            TokenizerCore::<Vec<u8>>::new(4, 0),
            Err(UbpeError::Precondition(_))
        ));
        let alphabet: BTreeMap<u8, TokenId> = [(7u8, 0), (9u8, 1)].into_iter().collect();
        assert!(TokenizerCore::<Vec<u8>>::with_alphabet(4, 2, alphabet).is_ok());
        let bad: BTreeMap<u8, TokenId> = [(7u8, 0), (9u8, 5)].into_iter().collect();
        assert!(matches!(
            TokenizerCore::<Vec<u8>>::with_alphabet(4, 2, bad),
            Err(UbpeError::Precondition(_))
        ));
    }

    #[test]
    fn state_round_trip_preserves_maps() {
        let mut core = bare_core(8, 4, &[(4, &[0, 1])], &[(4, 0.25)]);
        core.fitted = true;
        let state = core.to_state();
        let back = TokenizerCore::<Vec<u8>>::from_state(state).expect("state restores");
        assert_eq!(back.backward, core.backward);
        assert_eq!(back.forward, core.forward);
        assert_eq!(back.weights, core.weights);
        assert!(back.fitted);
    }
}
