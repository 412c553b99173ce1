//! Classic byte-pair encoding over arbitrary alphabets: deterministic
//! left-to-right pair substitution driven by an ordered merge list.

use std::collections::BTreeMap;

use ahash::AHashSet;
use rustc_hash::FxHashMap;

use crate::config::FitOptions;
use crate::document::Document;
use crate::error::{Result, UbpeError};
use crate::metrics::{FitMetrics, LogSink, NoopSink, ProgressSink};
use crate::tokenizer::{
    replace_token_pairs, Encoding, Pair, TokenId, TokenizerCore, TokenizerState,
};

/// Greedy byte-pair tokenizer.
///
/// Merges are learned in batched rounds; encoding substitutes pairs
/// greedily in merge-priority order until a fixed point.  `encode` always
/// returns exactly one candidate.
#[derive(Debug, Clone)]
pub struct UbpeClassic<D: Document> {
    core: TokenizerCore<D>,
    /// Learned merge pairs ordered by id; index `i` belongs to id
    /// `alphabet_size + i`, so position encodes priority.
    pairs: Vec<Pair>,
}

impl<D: Document> UbpeClassic<D> {
    /// Creates an unfitted tokenizer with the identity alphabet
    /// `0..alphabet_size`.
    pub fn new(n_tokens: u32, alphabet_size: u32) -> Result<Self>
    where
        D::Symbol: TryFrom<u32>,
    {
        Ok(Self {
            core: TokenizerCore::new(n_tokens, alphabet_size)?,
            pairs: Vec::new(),
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
            pairs: Vec::new(),
        })
    }

    /// Reconstructs a fitted tokenizer from persisted state, rebuilding the
    /// ordered merge list.
    pub fn from_state(state: TokenizerState<D::Symbol>) -> Result<Self> {
        let core = TokenizerCore::from_state(state)?;
        let pairs = rebuild_pairs(&core)?;
        Ok(Self { core, pairs })
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

    /// Component sequence to learned-id mapping.
    #[must_use]
    pub fn forward_mapper(&self) -> &BTreeMap<Vec<TokenId>, TokenId> {
        &self.core.forward
    }

    /// Learned-id to component pair mapping.
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

        let metrics = self
            .core
            .run_merge_rounds(&mut working, options, false, sink);
        if options.rearrange_tokens {
            self.core.rearrange_tokens_by_weight();
        }
        self.pairs = rebuild_pairs(&self.core)?;
        self.core.fitted = true;
        Ok(metrics)
    }

    /// Encodes `doc` by greedy substitution.
    ///
    /// The classic variant produces a single deterministic segmentation, so
    /// the returned list always has exactly one entry regardless of `top_n`.
    pub fn encode(&self, doc: &D, _top_n: usize) -> Result<Vec<Encoding>> {
        if !self.core.fitted {
            return Err(UbpeError::NotFitted);
        }
        let mut ids = self.core.doc_to_ids(doc)?;

        loop {
            let present: AHashSet<Pair> = ids.windows(2).map(|w| (w[0], w[1])).collect();
            let Some(first) = self.pairs.iter().position(|pair| present.contains(pair))
            else {
                break;
            };

            // Batch the highest-priority pair with lower-priority ones until
            // a component conflict stops the extension.
            let mut substitutions: FxHashMap<TokenId, (TokenId, TokenId)> =
                FxHashMap::default();
            let mut used: AHashSet<TokenId> = AHashSet::new();
            for (offset, &(left, right)) in self.pairs[first..].iter().enumerate() {
                if !present.contains(&(left, right)) {
                    continue;
                }
                if used.contains(&left) || used.contains(&right) {
                    break;
                }
                let merged = self.core.alphabet_size + (first + offset) as TokenId;
                substitutions.insert(left, (right, merged));
                used.insert(left);
                used.insert(right);
            }
            replace_token_pairs(&mut ids, &substitutions);
        }

        let weight = self.core.encoding_weight(&ids);
        Ok(vec![Encoding { ids, weight }])
    }

    /// Decodes a token sequence back into a document.
    pub fn decode(&self, tokens: &[TokenId]) -> Result<D> {
        self.core.decode(tokens)
    }
}

/// Derives the priority-ordered pair list from the merge table.
fn rebuild_pairs<D: Document>(core: &TokenizerCore<D>) -> Result<Vec<Pair>> {
    let mut pairs = Vec::with_capacity(core.backward.len());
    for (index, (&id, components)) in core.backward.iter().enumerate() {
        let expected = core.alphabet_size + index as TokenId;
        if id != expected {
            return Err(UbpeError::precondition(format!(
                "learned ids must be consecutive from {}; found {id} at position {index}",
                core.alphabet_size
            )));
        }
        if components.len() != 2 {
            return Err(UbpeError::precondition(format!(
                "classic merge entries hold exactly two components; id {id} has {}",
                components.len()
            )));
        }
        pairs.push((components[0], components[1]));
    }
    Ok(pairs)
}
