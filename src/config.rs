//! Options controlling a training run.

use serde::{Deserialize, Serialize};

use crate::error::{Result, UbpeError};

/// Configuration of a single `fit` call.
///
/// The target vocabulary size and alphabet size are tokenizer constructor
/// parameters; this struct only carries the knobs of one training run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FitOptions {
    /// Number of most-common pairs examined as merge candidates per round.
    pub n_candidates: u32,
    /// Reorders learned ids by descending weight and prunes the vocabulary
    /// down to the target size after the merge loop.
    pub rearrange_tokens: bool,
    /// Enables per-round reporting through the progress sink.
    pub show_progress: bool,
}

impl FitOptions {
    /// Returns a builder initialised with [`FitOptions::default`].
    #[must_use]
    pub fn builder() -> FitOptionsBuilder {
        FitOptionsBuilder::default()
    }

    /// Validates the invariants required for training.
    pub fn validate(&self) -> Result<()> {
        if self.n_candidates == 0 {
            return Err(UbpeError::precondition(
                "n_candidates must be greater than zero",
            ));
        }
        Ok(())
    }
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            n_candidates: 50,
            rearrange_tokens: true,
            show_progress: true,
        }
    }
}

/// Builder for [`FitOptions`].
#[derive(Debug, Default, Clone)]
pub struct FitOptionsBuilder {
    opts: FitOptions,
}

impl FitOptionsBuilder {
    /// Creates a builder with [`FitOptions::default`] settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the merge-candidate breadth per round.
    #[must_use]
    pub fn n_candidates(mut self, value: u32) -> Self {
        self.opts.n_candidates = value;
        self
    }

    /// Enables or disables post-fit weight rearrangement.
    #[must_use]
    pub fn rearrange_tokens(mut self, enabled: bool) -> Self {
        self.opts.rearrange_tokens = enabled;
        self
    }

    /// Enables or disables per-round progress reporting.
    #[must_use]
    pub fn show_progress(mut self, enabled: bool) -> Self {
        self.opts.show_progress = enabled;
        self
    }

    /// Finalises the builder, returning validated [`FitOptions`].
    pub fn build(self) -> Result<FitOptions> {
        self.opts.validate()?;
        Ok(self.opts)
    }
}
