//! Compaction state: whether a compaction is running and how the last one failed.

/// Read-only snapshot of a session's compaction state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompactionState {
    /// Whether a compaction is currently running
    pub is_compacting: bool,
    /// Failure description from the most recent attempt, if it failed
    pub compaction_error: Option<String>,
}

impl CompactionState {
    /// Reset for a new attempt
    pub(crate) fn begin(&mut self) {
        self.is_compacting = true;
        self.compaction_error = None;
    }
}
