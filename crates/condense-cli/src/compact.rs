//! Running a compaction against a stored session

use std::sync::Arc;

use condense_orchestrator::{
    Append, ClearAlerts, CompactionOutcome, ContextManager, ContinuationStatus,
    SetAncestorMessages, SetMessages,
};
use condense_types::Message;
use parking_lot::Mutex;

use crate::session::Session;

/// Result of compacting a session
#[derive(Debug)]
pub enum CompactReport {
    Compacted {
        /// The continuation message, if the backend returned one
        continuation: Option<Message>,
        /// Whether it was handed to the host for submission
        submitted: bool,
    },
    Failed {
        error: String,
    },
}

/// Compact `session` in place.
///
/// The live messages are replaced with whatever the orchestrator installs
/// (the compacted conversation, or the original plus an error marker), and
/// a fresh ancestor snapshot is appended to the session's ancestor history.
pub async fn compact_session(
    manager: &ContextManager,
    session: &mut Session,
    manual: bool,
) -> anyhow::Result<CompactReport> {
    let live = Arc::new(Mutex::new(session.messages.clone()));
    let ancestors: Arc<Mutex<Option<Vec<Message>>>> = Arc::new(Mutex::new(None));
    let submitted = Arc::new(Mutex::new(Vec::new()));

    let set_messages: SetMessages = {
        let live = Arc::clone(&live);
        Arc::new(move |messages: Vec<Message>| *live.lock() = messages)
    };
    let set_ancestors: SetAncestorMessages = {
        let ancestors = Arc::clone(&ancestors);
        Arc::new(move |messages: Vec<Message>| *ancestors.lock() = Some(messages))
    };

    let mut events = manager.subscribe();
    let logger = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            tracing::debug!("Compaction event: {:?}", event);
            if event.is_terminal() {
                break;
            }
        }
    });

    let messages = session.messages.clone();
    let outcome = if manual {
        let clear_alerts: ClearAlerts = Arc::new(|| tracing::debug!("Clearing context alerts"));
        manager
            .handle_manual_compaction(
                messages,
                set_messages,
                None,
                Some(clear_alerts),
                Some(set_ancestors),
            )
            .await
    } else {
        let append: Append = {
            let submitted = Arc::clone(&submitted);
            Arc::new(move |message: Message| submitted.lock().push(message))
        };
        manager
            .handle_auto_compaction(messages, set_messages, append, Some(set_ancestors))
            .await
    };
    let outcome = match outcome {
        Ok(outcome) => outcome,
        Err(e) => {
            logger.abort();
            return Err(e.into());
        }
    };
    let _ = logger.await;

    let report = match outcome {
        CompactionOutcome::Compacted { continuation } => match continuation {
            ContinuationStatus::Scheduled(handle) => {
                let fired = handle.wait().await;
                CompactReport::Compacted {
                    continuation: submitted.lock().pop(),
                    submitted: fired,
                }
            }
            ContinuationStatus::NotSubmitted(message) => CompactReport::Compacted {
                continuation: Some(message),
                submitted: false,
            },
            ContinuationStatus::Absent => CompactReport::Compacted {
                continuation: None,
                submitted: false,
            },
        },
        CompactionOutcome::Failed { error } => CompactReport::Failed { error },
    };

    session.messages = std::mem::take(&mut *live.lock());
    if let Some(snapshot) = ancestors.lock().take() {
        session.ancestors.extend(snapshot);
    }

    Ok(report)
}
