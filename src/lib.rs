//! Universal byte-pair encoding library and CLI.
//!
//! The crate trains a merge vocabulary over sequences drawn from an
//! arbitrary alphabet and encodes documents with one of two encoders: the
//! classic greedy substitution, or the universal encoder that enumerates
//! segmentations through a lookup trie and returns the top-N by weight.
//!
//! ```
//! use ubpe::{FitOptions, Ubpe};
//!
//! # fn main() -> ubpe::Result<()> {
//! let corpus: Vec<Vec<u8>> = vec![b"abab".to_vec(), b"abac".to_vec()];
//! let mut tokenizer = Ubpe::<Vec<u8>>::new(300, 256)?;
//! let options = FitOptions::builder()
//!     .n_candidates(16)
//!     .show_progress(false)
//!     .build()?;
//! tokenizer.fit(&corpus, &options)?;
//! let best = &tokenizer.encode(&b"abab".to_vec(), 1)?[0];
//! assert_eq!(tokenizer.decode(&best.ids)?, b"abab".to_vec());
//! # Ok(())
//! # }
//! ```
//!
//! The CLI is enabled by default through the `cli` feature.  Users targeting
//! the library portion only can disable default features:
//! `ubpe = { version = "...", default-features = false }`.

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    clippy::all,
    rust_2018_idioms,
    future_incompatible,
    unused_lifetimes,
    unreachable_pub
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc,
    clippy::doc_markdown
)]

pub mod classic;
pub mod config;
pub mod corpus;
pub mod counter;
pub mod document;
pub mod error;
pub mod metrics;
pub mod pair_counter;
pub mod serialization;
pub mod splitter;
pub mod tokenizer;
pub mod topk;
pub mod trie;
pub mod universal;

pub use classic::UbpeClassic;
pub use config::{FitOptions, FitOptionsBuilder};
pub use document::Document;
pub use error::{Result, UbpeError};
pub use metrics::{FitMetrics, LogSink, NoopSink, ProgressSink, RoundMetrics, StopReason};
pub use splitter::{KnownWords, SplitConfig, SplitMode, SplitPipeline};
pub use tokenizer::{Encoding, Pair, TokenId, TokenizerState};
pub use universal::Ubpe;
