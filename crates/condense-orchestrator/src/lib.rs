//! condense-orchestrator: Conversation compaction orchestration
//!
//! This crate asks a summarization backend to condense a long conversation,
//! splices the condensed messages back into the host's transcript, keeps the
//! original history around for scroll-back, and resumes the dialogue.

pub mod compaction;
pub mod error;
pub mod events;
pub mod handle;
pub mod manager;
pub mod provider;
pub mod state;
pub mod summarizer;

pub use compaction::{
    CompactedConversation, CompactionConfig, CompactionPart, ReentrancyPolicy,
    has_compaction_marker,
};
pub use error::{Error, Result};
pub use events::{CompactionEvent, ContinuationKind};
pub use handle::ContinuationHandle;
pub use manager::{
    Append, ClearAlerts, CompactionOutcome, ContextManager, ContinuationStatus,
    SetAncestorMessages, SetMessages,
};
pub use state::CompactionState;
pub use summarizer::{BackendSummarizer, Summarizer};
