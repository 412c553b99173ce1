//! Metrics describing the evolution of the training loop.

use std::time::Duration;

use log::info;
use serde::{Deserialize, Serialize};

/// Reason a training run terminated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum StopReason {
    /// The target vocabulary size was reached.
    TargetVocabReached,
    /// The pair counter produced no further merge candidates.
    NoEligiblePairs,
}

/// Metrics captured for each merge round.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoundMetrics {
    /// Sequential round number (1-indexed).
    pub round: usize,
    /// Number of non-overlapping merges accepted in the round.
    pub merges_added: usize,
    /// Frequency of the round's most common pair.
    pub best_frequency: usize,
    /// Count of distinct adjacent pairs observed in the round.
    pub distinct_pairs: usize,
    /// Vocabulary size after the round, alphabet included.
    pub vocab_size: usize,
    /// Execution time of the round.
    pub elapsed_round: Duration,
    /// Total time elapsed since the fit started.
    pub elapsed_total: Duration,
}

/// Aggregate metrics produced by a fit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FitMetrics {
    /// Per-round snapshots accrued during training.
    pub rounds: Vec<RoundMetrics>,
    /// Total duration of the fit.
    pub total_duration: Duration,
    /// Reason training terminated.
    pub stop_reason: StopReason,
}

impl FitMetrics {
    /// Creates an empty metrics container with pre-allocated capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            rounds: Vec::with_capacity(capacity),
            total_duration: Duration::ZERO,
            stop_reason: StopReason::TargetVocabReached,
        }
    }
}

/// Receiver for training progress events.
///
/// The training loop reports each completed round and the overall merge
/// progress; implementations may render, log, or ignore the events.
pub trait ProgressSink {
    /// Called once per completed merge round.
    fn on_round(&mut self, stats: &RoundMetrics) {
        let _ = stats;
    }

    /// Called after each round with learned-token progress toward the target.
    fn on_progress(&mut self, done: usize, total: usize) {
        let _ = (done, total);
    }
}

/// Sink that discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl ProgressSink for NoopSink {}

/// Sink that forwards round summaries to the `log` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl ProgressSink for LogSink {
    fn on_round(&mut self, stats: &RoundMetrics) {
        info!(
            "round {:>4} merges {:>5} best_freq {:>8} distinct_pairs {:>8} vocab {:>8}",
            stats.round,
            stats.merges_added,
            stats.best_frequency,
            stats.distinct_pairs,
            stats.vocab_size
        );
    }
}
