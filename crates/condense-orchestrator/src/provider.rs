//! Session scope for the context manager.
//!
//! Hosts that cannot thread a [`ContextManager`] through every call can
//! install one for the duration of a future and look it up with [`current`].

use std::future::Future;

use crate::error::{Error, Result};
use crate::manager::ContextManager;

tokio::task_local! {
    static CONTEXT_MANAGER: ContextManager;
}

/// Run `f` with `manager` installed as the session's context manager.
pub async fn scope<F: Future>(manager: ContextManager, f: F) -> F::Output {
    CONTEXT_MANAGER.scope(manager, f).await
}

/// The context manager of the enclosing [`scope`].
///
/// Fails with [`Error::MissingProvider`] outside a scope.
pub fn current() -> Result<ContextManager> {
    CONTEXT_MANAGER
        .try_with(ContextManager::clone)
        .map_err(|_| Error::MissingProvider)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compaction::CompactionConfig;
    use crate::summarizer::Summarizer;
    use async_trait::async_trait;
    use condense_types::{ApiMessage, ManageAction, Message};
    use std::sync::Arc;

    struct EmptySummarizer;

    #[async_trait]
    impl Summarizer for EmptySummarizer {
        async fn manage_context(
            &self,
            _messages: &[Message],
            _action: ManageAction,
        ) -> condense_types::Result<Vec<ApiMessage>> {
            Ok(vec![])
        }
    }

    fn manager() -> ContextManager {
        ContextManager::new(Arc::new(EmptySummarizer), CompactionConfig::default())
    }

    #[test]
    fn test_current_outside_scope_fails() {
        let err = current().err().unwrap();
        assert!(matches!(err, Error::MissingProvider));
        assert!(err.to_string().contains("within a context provider"));
    }

    #[tokio::test]
    async fn test_current_inside_scope() {
        let found = scope(manager(), async { current().map(|m| m.is_compacting()) }).await;
        assert!(matches!(found, Ok(false)));
    }

    #[tokio::test]
    async fn test_scope_shares_state() {
        let manager = manager();
        let outside = manager.clone();
        let result = scope(manager, async {
            let inner = current().unwrap();
            inner
                .handle_manual_compaction(
                    vec![Message::user("hi")],
                    Arc::new(|_: Vec<Message>| {}),
                    None,
                    None,
                    None,
                )
                .await
        })
        .await;
        assert!(result.is_ok());
        assert!(!outside.is_compacting());
        assert!(outside.compaction_error().is_none());
    }
}
