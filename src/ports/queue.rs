use crate::domain::jobs::TranscodeTask;
use crate::error::QueueError;
use async_trait::async_trait;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait JobQueuePort: Send + Sync {
    /// Enqueue a task, waiting while the queue is at capacity.
    async fn enqueue_job(&self, task: TranscodeTask) -> Result<(), QueueError>;

    /// Dequeue the oldest task, waiting while the queue is empty.
    /// Returns `None` once the queue is closed and drained.
    async fn dequeue_job(&self) -> Result<Option<TranscodeTask>, QueueError>;
}
