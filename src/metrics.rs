use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing answer-generation activity.
#[derive(Default)]
pub struct AnswerMetrics {
    questions_received: AtomicU64,
    answers_completed: AtomicU64,
    answers_failed: AtomicU64,
    fragments_streamed: AtomicU64,
}

impl AnswerMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a question entering the answer pipeline.
    pub fn record_question(&self) {
        self.questions_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one text fragment relayed to a consumer.
    pub fn record_fragment(&self) {
        self.fragments_streamed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a stream that ended with a `complete` event.
    pub fn record_completion(&self) {
        self.answers_completed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a stream that ended with an `error` event.
    pub fn record_failure(&self) {
        self.answers_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Reclassify a completed answer as failed because it could not be stored.
    pub fn record_persistence_failure(&self) {
        let _ = self
            .answers_completed
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |count| {
                count.checked_sub(1)
            });
        self.answers_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            questions_received: self.questions_received.load(Ordering::Relaxed),
            answers_completed: self.answers_completed.load(Ordering::Relaxed),
            answers_failed: self.answers_failed.load(Ordering::Relaxed),
            fragments_streamed: self.fragments_streamed.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of answer counters used for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Questions handed to the pipeline since startup.
    pub questions_received: u64,
    /// Streams that finished with a full answer.
    pub answers_completed: u64,
    /// Streams that finished with an error.
    pub answers_failed: u64,
    /// Text fragments relayed to consumers.
    pub fragments_streamed: u64,
}
