//! Reconciliation of a summarization response with the host's transcript
//!
//! The backend answers a summarize request with a marker, a summary and a
//! continuation. Each one gets its own display/send semantics here, and the
//! pre-compaction history is turned into a display-only ancestor snapshot.

use std::fmt::Display;
use std::time::Duration;

use condense_types::{ApiMessage, Message, MessageContent, Role, convert_api_message};

/// Text of the marker appended to the transcript when compaction fails
pub const COMPACTION_FAILED_TEXT: &str =
    "Compaction failed. Please try again or start a new session.";

/// Fallback failure description when an error has no message
pub const UNKNOWN_FAILURE_TEXT: &str = "Unknown error during compaction";

/// What to do when a compaction is requested while one is already running
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReentrancyPolicy {
    /// Refuse the second request with `Error::AlreadyCompacting`
    #[default]
    Reject,
    /// Let both run against the same host state
    Allow,
}

/// Configuration for context compaction
#[derive(Debug, Clone)]
pub struct CompactionConfig {
    /// Wait this long after replacing the messages before submitting the continuation
    pub continuation_delay: Duration,
    /// Behavior on overlapping compaction requests
    pub reentrancy: ReentrancyPolicy,
    /// Capacity of the event broadcast channel
    pub event_capacity: usize,
}

impl Default for CompactionConfig {
    fn default() -> Self {
        Self {
            continuation_delay: Duration::from_millis(100),
            reentrancy: ReentrancyPolicy::Reject,
            event_capacity: 256,
        }
    }
}

/// One message of a summarization response, tagged with its role in the compaction
#[derive(Debug, Clone, PartialEq)]
pub enum CompactionPart {
    /// Visible boundary, never replayed
    Marker(Message),
    /// Hidden condensed context for the model
    Summary(Message),
    /// Hidden prompt that resumes the conversation
    Continuation(Message),
    /// Anything past the continuation; keeps the converter defaults
    Extra(Message),
}

impl CompactionPart {
    /// `(display, send_to_llm)` for the message at `position` in a response
    pub fn visibility_for(position: usize) -> (bool, bool) {
        match position {
            0 => (true, false),
            1 | 2 => (false, true),
            _ => (true, true),
        }
    }

    fn at(position: usize, message: Message) -> Self {
        match position {
            0 => Self::Marker(message),
            1 => Self::Summary(message),
            2 => Self::Continuation(message),
            _ => Self::Extra(message),
        }
    }

    /// Take the message
    pub fn into_message(self) -> Message {
        match self {
            Self::Marker(m) | Self::Summary(m) | Self::Continuation(m) | Self::Extra(m) => m,
        }
    }
}

/// A classified summarization response, in backend order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompactedConversation {
    parts: Vec<CompactionPart>,
}

impl CompactedConversation {
    /// The continuation message, if present
    pub fn continuation(&self) -> Option<&Message> {
        self.parts.iter().find_map(|p| match p {
            CompactionPart::Continuation(m) => Some(m),
            _ => None,
        })
    }

    /// The messages to install, in order
    pub fn into_messages(self) -> Vec<Message> {
        self.parts.into_iter().map(CompactionPart::into_message).collect()
    }
}

/// Convert a summarization response, applying positional display/send flags.
///
/// Fails on the first message that does not convert.
pub fn classify_response(raw: Vec<ApiMessage>) -> condense_types::Result<CompactedConversation> {
    let parts = raw
        .into_iter()
        .enumerate()
        .map(|(position, message)| {
            let (display, send_to_llm) = CompactionPart::visibility_for(position);
            convert_api_message(message, display, send_to_llm)
                .map(|converted| CompactionPart::at(position, converted))
        })
        .collect::<condense_types::Result<Vec<_>>>()?;

    Ok(CompactedConversation { parts })
}

/// Copy of the pre-compaction history that stays visible but is never replayed.
pub fn ancestor_snapshot(messages: &[Message]) -> Vec<Message> {
    messages
        .iter()
        .cloned()
        .map(|m| m.with_visibility(true, false))
        .collect()
}

/// True iff any content block of `message` is a compaction boundary.
pub fn has_compaction_marker(message: &Message) -> bool {
    message.has_summarization_marker()
}

/// Marker appended to the untouched history when compaction fails
pub fn compaction_error_marker() -> Message {
    let millis = chrono::Utc::now().timestamp_millis();
    Message::new(
        Role::Assistant,
        vec![MessageContent::summarization_requested(COMPACTION_FAILED_TEXT)],
    )
    .with_id(format!("compaction-error-{}", millis))
    .with_visibility(true, false)
}

/// Human-readable description of a failed attempt
pub fn failure_description(error: &impl Display) -> String {
    let description = error.to_string();
    if description.trim().is_empty() {
        UNKNOWN_FAILURE_TEXT.to_string()
    } else {
        description
    }
}
