//! Summarization collaborator abstraction

use async_trait::async_trait;
use condense_types::{ApiMessage, BackendClient, ManageAction, Message, Result};

/// Condenses a conversation history.
///
/// A summarize request is expected to answer with a marker, a summary and a
/// continuation message, in that order.
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Ask for `action` to be applied to the full history
    async fn manage_context(
        &self,
        messages: &[Message],
        action: ManageAction,
    ) -> Result<Vec<ApiMessage>>;
}

/// Summarizer backed by the context-management HTTP endpoint
pub struct BackendSummarizer {
    client: BackendClient,
}

impl BackendSummarizer {
    /// Create a new backend summarizer
    pub fn new(client: BackendClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Summarizer for BackendSummarizer {
    async fn manage_context(
        &self,
        messages: &[Message],
        action: ManageAction,
    ) -> Result<Vec<ApiMessage>> {
        let response = self.client.manage_context(messages, action).await?;
        tracing::debug!(
            "Backend returned {} messages (token counts: {:?})",
            response.messages.len(),
            response.token_counts
        );
        Ok(response.messages)
    }
}
