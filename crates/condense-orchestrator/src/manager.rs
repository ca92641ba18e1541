//! Compaction orchestration for one conversation session

use condense_types::{ManageAction, Message};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::{
    compaction::{self, CompactionConfig, ReentrancyPolicy},
    error::{Error, Result},
    events::{CompactionEvent, ContinuationKind},
    handle::ContinuationHandle,
    state::CompactionState,
    summarizer::Summarizer,
};

/// Replaces the host's message list
pub type SetMessages = Arc<dyn Fn(Vec<Message>) + Send + Sync>;
/// Stores the display-only pre-compaction history
pub type SetAncestorMessages = Arc<dyn Fn(Vec<Message>) + Send + Sync>;
/// Submits one message into the live conversation
pub type Append = Arc<dyn Fn(Message) + Send + Sync>;
/// Dismisses "context nearly full" alerts
pub type ClearAlerts = Arc<dyn Fn() + Send + Sync>;

/// What happened to the continuation message of a successful compaction
pub enum ContinuationStatus {
    /// Submission is pending; the handle can cancel it
    Scheduled(ContinuationHandle),
    /// Computed, but no `append` was supplied so nothing was submitted
    NotSubmitted(Message),
    /// The backend returned no continuation message
    Absent,
}

impl ContinuationStatus {
    /// Discriminant without the payload
    pub fn kind(&self) -> ContinuationKind {
        match self {
            ContinuationStatus::Scheduled(_) => ContinuationKind::Scheduled,
            ContinuationStatus::NotSubmitted(_) => ContinuationKind::NotSubmitted,
            ContinuationStatus::Absent => ContinuationKind::Absent,
        }
    }
}

/// Result of a compaction attempt that was allowed to run
pub enum CompactionOutcome {
    /// The host now holds the compacted messages
    Compacted { continuation: ContinuationStatus },
    /// The host holds its original messages plus an error marker
    Failed { error: String },
}

struct Inner {
    summarizer: Arc<dyn Summarizer>,
    config: CompactionConfig,
    state: Mutex<CompactionState>,
    pending: Arc<Mutex<HashMap<u64, CancellationToken>>>,
    next_continuation_id: AtomicU64,
    event_tx: broadcast::Sender<CompactionEvent>,
}

/// Clears `is_compacting` on every exit path, including unwinding.
struct CompactingGuard<'a> {
    state: &'a Mutex<CompactionState>,
}

impl Drop for CompactingGuard<'_> {
    fn drop(&mut self) {
        self.state.lock().is_compacting = false;
    }
}

/// The compaction orchestrator for one conversation session.
///
/// Cloning is cheap; all clones share state.
#[derive(Clone)]
pub struct ContextManager {
    inner: Arc<Inner>,
}

impl ContextManager {
    /// Create a new context manager
    pub fn new(summarizer: Arc<dyn Summarizer>, config: CompactionConfig) -> Self {
        let (event_tx, _) = broadcast::channel(config.event_capacity.max(1));
        Self {
            inner: Arc::new(Inner {
                summarizer,
                config,
                state: Mutex::new(CompactionState::default()),
                pending: Arc::new(Mutex::new(HashMap::new())),
                next_continuation_id: AtomicU64::new(0),
                event_tx,
            }),
        }
    }

    /// Subscribe to compaction events
    pub fn subscribe(&self) -> broadcast::Receiver<CompactionEvent> {
        self.inner.event_tx.subscribe()
    }

    /// Snapshot of the current state
    pub fn state(&self) -> CompactionState {
        self.inner.state.lock().clone()
    }

    /// Whether a compaction is running
    pub fn is_compacting(&self) -> bool {
        self.inner.state.lock().is_compacting
    }

    /// Failure description of the most recent attempt, if it failed
    pub fn compaction_error(&self) -> Option<String> {
        self.inner.state.lock().compaction_error.clone()
    }

    /// True iff any content block of `message` is a compaction boundary
    pub fn has_compaction_marker(&self, message: &Message) -> bool {
        compaction::has_compaction_marker(message)
    }

    /// Compact on the host's own initiative; the continuation is submitted through `append`.
    pub async fn handle_auto_compaction(
        &self,
        messages: Vec<Message>,
        set_messages: SetMessages,
        append: Append,
        set_ancestor_messages: Option<SetAncestorMessages>,
    ) -> Result<CompactionOutcome> {
        let guard = self.begin(false)?;
        Ok(self
            .perform_compaction(guard, messages, set_messages, Some(append), set_ancestor_messages)
            .await)
    }

    /// Compact at the user's request.
    ///
    /// `clear_alerts` runs once the request is accepted and before the backend
    /// is contacted, so `is_compacting` is already set when it is called. A
    /// request rejected as re-entrant never calls it. Without `append` the
    /// continuation is computed but not submitted.
    pub async fn handle_manual_compaction(
        &self,
        messages: Vec<Message>,
        set_messages: SetMessages,
        append: Option<Append>,
        clear_alerts: Option<ClearAlerts>,
        set_ancestor_messages: Option<SetAncestorMessages>,
    ) -> Result<CompactionOutcome> {
        let guard = self.begin(true)?;
        if let Some(clear) = clear_alerts {
            clear();
        }
        Ok(self
            .perform_compaction(guard, messages, set_messages, append, set_ancestor_messages)
            .await)
    }

    /// Cancel every continuation that has not been submitted yet.
    /// Returns how many were cancelled.
    pub fn cancel_pending_continuations(&self) -> usize {
        let tokens: Vec<CancellationToken> =
            self.inner.pending.lock().drain().map(|(_, t)| t).collect();
        for token in &tokens {
            token.cancel();
        }
        if !tokens.is_empty() {
            tracing::debug!("Cancelled {} pending continuation(s)", tokens.len());
        }
        tokens.len()
    }

    /// Number of continuations waiting to be submitted
    pub fn pending_continuations(&self) -> usize {
        self.inner.pending.lock().len()
    }

    // ---- Private helpers ----

    /// Enter the compacting state, resetting the previous error.
    fn begin(&self, manual: bool) -> Result<CompactingGuard<'_>> {
        {
            let mut state = self.inner.state.lock();
            if state.is_compacting && self.inner.config.reentrancy == ReentrancyPolicy::Reject {
                tracing::warn!("Compaction requested while another is running, rejecting");
                return Err(Error::AlreadyCompacting);
            }
            state.begin();
        }
        tracing::debug!("Compaction started (manual: {})", manual);
        let _ = self
            .inner
            .event_tx
            .send(CompactionEvent::CompactionStart { manual });
        Ok(CompactingGuard {
            state: &self.inner.state,
        })
    }

    async fn perform_compaction(
        &self,
        guard: CompactingGuard<'_>,
        messages: Vec<Message>,
        set_messages: SetMessages,
        append: Option<Append>,
        set_ancestor_messages: Option<SetAncestorMessages>,
    ) -> CompactionOutcome {
        match self
            .reconcile(&messages, &set_messages, append, set_ancestor_messages.as_ref())
            .await
        {
            Ok(continuation) => {
                drop(guard);
                let kind = continuation.kind();
                tracing::info!(
                    "Compacted {} messages (continuation: {:?})",
                    messages.len(),
                    kind
                );
                let _ = self
                    .inner
                    .event_tx
                    .send(CompactionEvent::CompactionEnd { continuation: kind });
                CompactionOutcome::Compacted { continuation }
            }
            Err(e) => {
                let error = compaction::failure_description(&e);
                tracing::warn!("Compaction failed: {}", error);
                self.inner.state.lock().compaction_error = Some(error.clone());

                let mut restored = messages;
                restored.push(compaction::compaction_error_marker());
                set_messages(restored);

                drop(guard);
                let _ = self.inner.event_tx.send(CompactionEvent::CompactionFailed {
                    error: error.clone(),
                });
                CompactionOutcome::Failed { error }
            }
        }
    }

    /// Summarize, install the compacted messages, and schedule the continuation.
    /// Nothing is handed to the host unless the whole response converts.
    async fn reconcile(
        &self,
        messages: &[Message],
        set_messages: &SetMessages,
        append: Option<Append>,
        set_ancestor_messages: Option<&SetAncestorMessages>,
    ) -> Result<ContinuationStatus> {
        let raw = self
            .inner
            .summarizer
            .manage_context(messages, ManageAction::Summarize)
            .await?;
        let compacted = compaction::classify_response(raw)?;

        if let Some(store) = set_ancestor_messages {
            let ancestors = compaction::ancestor_snapshot(messages);
            let count = ancestors.len();
            store(ancestors);
            let _ = self
                .inner
                .event_tx
                .send(CompactionEvent::AncestorsStored { count });
        }

        let continuation = compacted.continuation().cloned();
        let installed = compacted.into_messages();
        let count = installed.len();
        set_messages(installed);
        let _ = self
            .inner
            .event_tx
            .send(CompactionEvent::MessagesReplaced { count });

        Ok(match (continuation, append) {
            (None, _) => ContinuationStatus::Absent,
            (Some(message), None) => {
                tracing::debug!("No append callback, continuation not submitted");
                ContinuationStatus::NotSubmitted(message)
            }
            (Some(message), Some(append)) => {
                ContinuationStatus::Scheduled(self.schedule_continuation(message, append))
            }
        })
    }

    /// Submit the continuation once the replaced message list has settled.
    fn schedule_continuation(&self, message: Message, append: Append) -> ContinuationHandle {
        let delay = self.inner.config.continuation_delay;
        let id = self
            .inner
            .next_continuation_id
            .fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();
        self.inner.pending.lock().insert(id, token.clone());

        let pending = Arc::clone(&self.inner.pending);
        let event_tx = self.inner.event_tx.clone();
        let _ = self.inner.event_tx.send(CompactionEvent::ContinuationScheduled {
            delay_ms: u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
        });

        ContinuationHandle::spawn(message, append, delay, token, move |submitted| {
            pending.lock().remove(&id);
            let event = if submitted {
                CompactionEvent::ContinuationSubmitted
            } else {
                CompactionEvent::ContinuationCancelled
            };
            let _ = event_tx.send(event);
        })
    }
}
