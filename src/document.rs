//! The boundary between external documents and internal base-id sequences.
//!
//! The tokenizers operate on `Vec<TokenId>` internally; anything that can
//! produce and absorb a sequence of symbols can be tokenized.  Implementations
//! are provided for `String` (symbol = `char`) and `Vec<T>`.

use std::fmt;
use std::hash::Hash;

use regex::Regex;

/// A sequence of symbols that can be tokenized.
///
/// `symbols`/`from_symbols` convert between the document and its symbol
/// sequence; everything past that boundary works on base ids.
pub trait Document: Clone {
    /// External symbol type mapped through the alphabet.
    type Symbol: Clone + Ord + Hash + fmt::Debug;

    /// Number of symbols in the document.
    fn len(&self) -> usize;

    /// Whether the document contains no symbols.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The document's symbols, in order.
    fn symbols(&self) -> Vec<Self::Symbol>;

    /// Builds a document from a symbol sequence.
    fn from_symbols(symbols: Vec<Self::Symbol>) -> Self;

    /// Splits the document into regex matches.
    ///
    /// Returns `None` for document types without a textual representation;
    /// the splitter then passes the part through unchanged.
    fn regex_matches(&self, pattern: &Regex) -> Option<Vec<Self>> {
        let _ = pattern;
        None
    }
}

impl Document for String {
    type Symbol = char;

    fn len(&self) -> usize {
        self.chars().count()
    }

    fn symbols(&self) -> Vec<char> {
        self.chars().collect()
    }

    fn from_symbols(symbols: Vec<char>) -> Self {
        symbols.into_iter().collect()
    }

    fn regex_matches(&self, pattern: &Regex) -> Option<Vec<Self>> {
        Some(
            pattern
                .find_iter(self)
                .map(|found| found.as_str().to_owned())
                .collect(),
        )
    }
}

impl<T: Clone + Ord + Hash + fmt::Debug> Document for Vec<T> {
    type Symbol = T;

    fn len(&self) -> usize {
        self.as_slice().len()
    }

    fn symbols(&self) -> Vec<T> {
        self.clone()
    }

    fn from_symbols(symbols: Vec<T>) -> Self {
        symbols
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_symbols_round_trip() {
        let doc = "héllo".to_owned();
        // Symbol count, not byte count.
        assert_eq!(Document::len(&doc), 5);
        let symbols = doc.symbols();
        assert_eq!(String::from_symbols(symbols), doc);
    }

    #[test]
    fn string_regex_matches_find_all() {
        let re = Regex::new(r"[a-z]+").expect("pattern compiles");
        let doc = "ab 12 cd".to_owned();
        let matches = doc.regex_matches(&re).expect("strings support regex");
        assert_eq!(matches, vec!["ab".to_owned(), "cd".to_owned()]);
    }

    #[test]
    fn byte_documents_do_not_support_regex() {
        let re = Regex::new(r".").expect("pattern compiles");
        let doc: Vec<u8> = vec![1, 2, 3];
        assert!(doc.regex_matches(&re).is_none());
    }
}
