//! A cancellable handle for a scheduled continuation submission.

use std::time::Duration;

use condense_types::Message;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::manager::Append;

/// Handle to a continuation message waiting to be submitted.
///
/// Dropping the handle does not cancel the submission.
pub struct ContinuationHandle {
    cancel: CancellationToken,
    task: JoinHandle<bool>,
}

impl ContinuationHandle {
    /// Submit `message` through `append` after `delay`, unless `cancel` fires first.
    /// `on_finish` runs once with whether the message was submitted.
    pub(crate) fn spawn(
        message: Message,
        append: Append,
        delay: Duration,
        cancel: CancellationToken,
        on_finish: impl FnOnce(bool) + Send + 'static,
    ) -> Self {
        let token = cancel.clone();
        let task = tokio::spawn(async move {
            let mut finish = FinishGuard {
                on_finish: Some(on_finish),
                submitted: false,
            };
            finish.submitted = tokio::select! {
                biased;
                _ = token.cancelled() => false,
                _ = tokio::time::sleep(delay) => {
                    append(message);
                    true
                }
            };
            finish.submitted
        });
        Self { cancel, task }
    }

    /// Cancel the submission if it has not fired yet.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Wait for the outcome. Returns `true` if the message was submitted.
    pub async fn wait(self) -> bool {
        self.task.await.unwrap_or(false)
    }
}

/// Runs `on_finish` when the submission task ends, even if `append` panics
/// or the task is aborted.
struct FinishGuard<F: FnOnce(bool)> {
    on_finish: Option<F>,
    submitted: bool,
}

impl<F: FnOnce(bool)> Drop for FinishGuard<F> {
    fn drop(&mut self) {
        if let Some(on_finish) = self.on_finish.take() {
            on_finish(self.submitted);
        }
    }
}
