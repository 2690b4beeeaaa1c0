//! In-memory bounded FIFO for transcode tasks. Nothing survives a restart.

use crate::domain::jobs::TranscodeTask;
use crate::error::QueueError;
use crate::ports::queue::JobQueuePort;
use async_channel::{Receiver, Sender};
use async_trait::async_trait;

/// Default number of pending tasks before producers start waiting.
pub const DEFAULT_QUEUE_CAPACITY: usize = 50;

/// Multi-producer, multi-consumer queue. Clones share the same channel.
#[derive(Clone, Debug)]
pub struct ChannelQueue {
    sender: Sender<TranscodeTask>,
    receiver: Receiver<TranscodeTask>,
}

impl ChannelQueue {
    pub fn bounded(capacity: usize) -> Self {
        let (sender, receiver) = async_channel::bounded(capacity.max(1));
        Self { sender, receiver }
    }

    /// Number of tasks waiting for a worker.
    pub fn len(&self) -> usize {
        self.sender.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sender.is_empty()
    }

    /// Stop accepting tasks. Workers drain what is left and then exit.
    pub fn close(&self) -> bool {
        self.sender.close()
    }
}

impl Default for ChannelQueue {
    fn default() -> Self {
        Self::bounded(DEFAULT_QUEUE_CAPACITY)
    }
}

#[async_trait]
impl JobQueuePort for ChannelQueue {
    async fn enqueue_job(&self, task: TranscodeTask) -> Result<(), QueueError> {
        self.sender.send(task).await.map_err(|_| QueueError::Closed)
    }

    async fn dequeue_job(&self) -> Result<Option<TranscodeTask>, QueueError> {
        match self.receiver.recv().await {
            Ok(task) => Ok(Some(task)),
            Err(_) => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::Duration;

    fn task(video_id: i64) -> TranscodeTask {
        TranscodeTask {
            asset_dir: PathBuf::from("/tmp/videos/fp"),
            video_id,
            source_path: PathBuf::from("/tmp/videos/fp/clip.mp4"),
            fingerprint: "fp".to_string(),
        }
    }

    #[tokio::test]
    async fn test_fifo_order() {
        let queue = ChannelQueue::bounded(3);
        for id in 1..=3 {
            queue.enqueue_job(task(id)).await.unwrap();
        }
        assert_eq!(queue.len(), 3);
        for id in 1..=3 {
            assert_eq!(queue.dequeue_job().await.unwrap().unwrap().video_id, id);
        }
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_enqueue_blocks_when_full() {
        let queue = ChannelQueue::bounded(1);
        queue.enqueue_job(task(1)).await.unwrap();

        let producer = queue.clone();
        let pending = tokio::spawn(async move { producer.enqueue_job(task(2)).await });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!pending.is_finished());
        assert_eq!(queue.len(), 1);

        assert_eq!(queue.dequeue_job().await.unwrap().unwrap().video_id, 1);
        tokio::time::timeout(Duration::from_secs(1), pending)
            .await
            .expect("producer should be released once a slot frees")
            .unwrap()
            .unwrap();
        assert_eq!(queue.dequeue_job().await.unwrap().unwrap().video_id, 2);
    }

    #[tokio::test]
    async fn test_closed_queue_drains_then_ends() {
        let queue = ChannelQueue::bounded(2);
        queue.enqueue_job(task(1)).await.unwrap();
        assert!(queue.close());

        assert!(matches!(
            queue.enqueue_job(task(2)).await,
            Err(QueueError::Closed)
        ));
        assert_eq!(queue.dequeue_job().await.unwrap().unwrap().video_id, 1);
        assert!(queue.dequeue_job().await.unwrap().is_none());
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let queue = ChannelQueue::bounded(0);
        assert_eq!(queue.sender.capacity(), Some(1));
    }
}
