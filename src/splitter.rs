//! Pre-segmentation of documents into independently tokenized parts.

use std::collections::{BTreeMap, BTreeSet};

use ahash::AHashSet;
use regex::Regex;

use crate::document::Document;
use crate::error::{Result, UbpeError};
use crate::tokenizer::TokenId;
use crate::trie::SssTree;

/// Which split stages run, applied in the fixed order known-words,
/// break-tokens, regex, stop-tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitMode {
    /// Longest-match segmentation on the known-word dictionary.
    pub known_words: bool,
    /// Splitting on break symbols.
    pub break_tokens: bool,
    /// Regex findall splitting; character documents only.
    pub regex: bool,
    /// Splitting on stop symbols.
    pub stop_tokens: bool,
}

impl SplitMode {
    /// No stage runs; the document becomes a single part.
    pub const NONE: SplitMode = SplitMode {
        known_words: false,
        break_tokens: false,
        regex: false,
        stop_tokens: false,
    };

    /// Every configured stage runs.
    pub const FULL: SplitMode = SplitMode {
        known_words: true,
        break_tokens: true,
        regex: true,
        stop_tokens: true,
    };
}

/// Known-word dictionary accepted by the pipeline.
///
/// Lists and sets receive ids starting right above the alphabet; an explicit
/// map keeps its ids, which must not dip into the alphabet range.
#[derive(Debug, Clone)]
pub enum KnownWords<D: Document + Ord> {
    /// Words in assignment order.
    List(Vec<D>),
    /// Words assigned ids in their set order.
    Set(BTreeSet<D>),
    /// Explicit word-to-id mapping.
    Map(BTreeMap<D, TokenId>),
}

/// Pipeline configuration; every field is optional.
#[derive(Debug, Clone)]
pub struct SplitConfig<D: Document + Ord> {
    /// Known words segmented by longest match.
    pub known_words: Option<KnownWords<D>>,
    /// Symbols the document is broken on.
    pub break_tokens: BTreeSet<D::Symbol>,
    /// Regex pattern for the regex stage; effective for `String` documents.
    pub regex_pattern: Option<String>,
    /// Symbols the document is stopped on.
    pub stop_tokens: BTreeSet<D::Symbol>,
}

impl<D: Document + Ord> Default for SplitConfig<D> {
    fn default() -> Self {
        Self {
            known_words: None,
            break_tokens: BTreeSet::new(),
            regex_pattern: None,
            stop_tokens: BTreeSet::new(),
        }
    }
}

/// Splits documents into base-id parts ahead of tokenization.
///
/// Known-word matches emit singleton parts carrying the word's id; all other
/// symbols map through the alphabet.
#[derive(Debug, Clone)]
pub struct SplitPipeline<D: Document + Ord> {
    alphabet: BTreeMap<D::Symbol, TokenId>,
    known_words: Option<BTreeMap<D, TokenId>>,
    known_word_trie: Option<SssTree<D::Symbol, TokenId>>,
    break_tokens: Option<AHashSet<D::Symbol>>,
    regex: Option<Regex>,
    stop_tokens: Option<AHashSet<D::Symbol>>,
}

impl<D: Document + Ord> SplitPipeline<D> {
    /// Builds a pipeline over `alphabet` with the given configuration.
    pub fn new(alphabet: BTreeMap<D::Symbol, TokenId>, config: SplitConfig<D>) -> Result<Self> {
        let alphabet_size = alphabet.len() as u32;

        let known_words = match config.known_words {
            None => None,
            Some(KnownWords::List(words)) => assign_word_ids(words, alphabet_size),
            Some(KnownWords::Set(words)) => {
                assign_word_ids(words.into_iter().collect(), alphabet_size)
            }
            Some(KnownWords::Map(words)) => {
                for &id in words.values() {
                    if id < alphabet_size {
                        return Err(UbpeError::InsertionConflict { id, alphabet_size });
                    }
                }
                if words.is_empty() {
                    None
                } else {
                    Some(words)
                }
            }
        };

        let known_word_trie = known_words.as_ref().map(|words| {
            let mut trie = SssTree::new();
            for (word, &id) in words {
                trie.insert(&word.symbols(), id);
            }
            trie
        });

        let symbols: AHashSet<D::Symbol> = alphabet.keys().cloned().collect();
        let break_tokens = retain_alphabet_symbols(config.break_tokens, &symbols);
        let stop_tokens = retain_alphabet_symbols(config.stop_tokens, &symbols);

        let regex = match config.regex_pattern.as_deref() {
            Some(pattern) if !pattern.is_empty() => Some(Regex::new(pattern).map_err(|err| {
                UbpeError::precondition(format!("invalid regex pattern: {err}"))
            })?),
            _ => None,
        };

        Ok(Self {
            alphabet,
            known_words,
            known_word_trie,
            break_tokens,
            regex,
            stop_tokens,
        })
    }

    /// The known-word dictionary, if one is configured.
    #[must_use]
    pub fn known_words(&self) -> Option<&BTreeMap<D, TokenId>> {
        self.known_words.as_ref()
    }

    /// Splits `doc` into base-id parts.
    ///
    /// With `leave_separators`, separator symbols and known-word matches are
    /// emitted as their own parts; otherwise they are dropped.
    pub fn split(
        &self,
        doc: &D,
        mode: SplitMode,
        leave_separators: bool,
    ) -> Result<Vec<Vec<TokenId>>> {
        let mut parts = Vec::new();
        if mode.known_words {
            if let Some(trie) = &self.known_word_trie {
                let symbols = doc.symbols();
                let mut part_begin = 0;
                let mut position = 0;
                while position < symbols.len() {
                    let matches = trie.lookup_prefix_lengths(&symbols, position);
                    let Some(&(length, id)) = matches.last() else {
                        position += 1;
                        continue;
                    };
                    if position > part_begin {
                        let segment = D::from_symbols(symbols[part_begin..position].to_vec());
                        self.split_rest_into(&segment, mode, leave_separators, &mut parts)?;
                    }
                    if leave_separators {
                        parts.push(vec![id]);
                    }
                    position += length;
                    part_begin = position;
                }
                if part_begin < symbols.len() {
                    let segment = D::from_symbols(symbols[part_begin..].to_vec());
                    self.split_rest_into(&segment, mode, leave_separators, &mut parts)?;
                }
                return Ok(parts);
            }
        }
        self.split_rest_into(doc, mode, leave_separators, &mut parts)?;
        Ok(parts)
    }

    fn split_rest_into(
        &self,
        part: &D,
        mode: SplitMode,
        leave_separators: bool,
        out: &mut Vec<Vec<TokenId>>,
    ) -> Result<()> {
        for piece in self.split_part(part, mode, leave_separators) {
            let symbols = piece.symbols();
            let mut ids = Vec::with_capacity(symbols.len());
            for (position, symbol) in symbols.iter().enumerate() {
                match self.alphabet.get(symbol) {
                    Some(&id) => ids.push(id),
                    None => return Err(UbpeError::UnknownSymbol(position)),
                }
            }
            out.push(ids);
        }
        Ok(())
    }

    fn split_part(&self, part: &D, mode: SplitMode, leave_separators: bool) -> Vec<D> {
        let mut parts = vec![part.clone()];

        if mode.break_tokens {
            if let Some(tokens) = &self.break_tokens {
                parts = parts
                    .iter()
                    .flat_map(|p| split_by_tokens(p, tokens, leave_separators))
                    .collect();
            }
        }
        if mode.regex {
            if let Some(regex) = &self.regex {
                parts = parts
                    .into_iter()
                    .flat_map(|p| p.regex_matches(regex).unwrap_or_else(|| vec![p]))
                    .collect();
            }
        }
        if mode.stop_tokens {
            if let Some(tokens) = &self.stop_tokens {
                parts = parts
                    .iter()
                    .flat_map(|p| split_by_tokens(p, tokens, leave_separators))
                    .collect();
            }
        }
        parts
    }
}

fn assign_word_ids<D: Document + Ord>(
    words: Vec<D>,
    alphabet_size: u32,
) -> Option<BTreeMap<D, TokenId>> {
    let mut map = BTreeMap::new();
    let mut next = alphabet_size;
    for word in words {
        if let std::collections::btree_map::Entry::Vacant(slot) = map.entry(word) {
            slot.insert(next);
            next += 1;
        }
    }
    if map.is_empty() {
        None
    } else {
        Some(map)
    }
}

fn retain_alphabet_symbols<S: Clone + Eq + std::hash::Hash>(
    tokens: BTreeSet<S>,
    alphabet: &AHashSet<S>,
) -> Option<AHashSet<S>> {
    let retained: AHashSet<S> = tokens
        .into_iter()
        .filter(|token| alphabet.contains(token))
        .collect();
    if retained.is_empty() {
        None
    } else {
        Some(retained)
    }
}

fn split_by_tokens<D: Document>(
    part: &D,
    tokens: &AHashSet<D::Symbol>,
    leave_separators: bool,
) -> Vec<D> {
    let symbols = part.symbols();
    let mut parts = Vec::new();
    let mut begin = 0;
    for (position, symbol) in symbols.iter().enumerate() {
        if !tokens.contains(symbol) {
            continue;
        }
        if position > begin {
            parts.push(D::from_symbols(symbols[begin..position].to_vec()));
        }
        if leave_separators {
            parts.push(D::from_symbols(vec![symbol.clone()]));
        }
        begin = position + 1;
    }
    if begin < symbols.len() {
        parts.push(D::from_symbols(symbols[begin..].to_vec()));
    }
    parts
}
