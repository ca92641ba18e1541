//! Compaction event types

use serde::{Deserialize, Serialize};

/// What happened to the continuation message of a successful compaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContinuationKind {
    /// Submission is scheduled after the configured delay
    Scheduled,
    /// Computed but the caller supplied no way to submit it
    NotSubmitted,
    /// The backend returned no continuation message
    Absent,
}

/// Events emitted while compacting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CompactionEvent {
    /// A compaction attempt started
    CompactionStart { manual: bool },

    /// The pre-compaction history was handed to the ancestor store
    AncestorsStored { count: usize },

    /// The host's message list was replaced with the compacted messages
    MessagesReplaced { count: usize },

    /// The continuation message was scheduled for submission
    ContinuationScheduled { delay_ms: u64 },

    /// The continuation message was handed to the host
    ContinuationSubmitted,

    /// A scheduled continuation was cancelled before it fired
    ContinuationCancelled,

    /// Compaction completed
    CompactionEnd { continuation: ContinuationKind },

    /// Compaction failed and the original history was restored
    CompactionFailed { error: String },
}

impl CompactionEvent {
    /// Check if this event ends a compaction attempt
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            CompactionEvent::CompactionEnd { .. } | CompactionEvent::CompactionFailed { .. }
        )
    }
}
