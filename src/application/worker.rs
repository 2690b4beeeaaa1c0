use crate::application::transcoder::Transcoder;
use crate::ports::queue::JobQueuePort;
use std::sync::Arc;
use tokio::task::JoinHandle;

pub const DEFAULT_WORKER_COUNT: usize = 1;

/// Drains the transcode queue. Each worker runs on its own task, detached from
/// whichever request enqueued the work.
pub struct WorkerService<Q, T> {
    queue: Q,
    transcoder: T,
}

impl<Q, T> WorkerService<Q, T>
where
    Q: JobQueuePort + 'static,
    T: Transcoder + 'static,
{
    pub fn new(queue: Q, transcoder: T) -> Self {
        Self { queue, transcoder }
    }

    /// Runs until the queue is closed and drained.
    pub async fn run_worker_loop(&self, worker_id: usize) {
        tracing::info!(worker_id, "worker started");
        loop {
            match self.queue.dequeue_job().await {
                Ok(Some(task)) => {
                    tracing::info!(
                        worker_id,
                        video_id = task.video_id,
                        fingerprint = %task.fingerprint,
                        "processing task"
                    );
                    // Failure handling lives in the transcoder; the loop only reports.
                    if let Err(e) = self.transcoder.transcode(&task).await {
                        tracing::warn!(worker_id, video_id = task.video_id, error = %e, "task failed");
                    }
                }
                Ok(None) => {
                    tracing::info!(worker_id, "queue closed, worker stopping");
                    break;
                }
                Err(e) => {
                    tracing::error!(worker_id, error = %e, "queue error");
                    tokio::time::sleep(tokio::time::Duration::from_secs(1)).await;
                }
            }
        }
    }

    /// Spawns `count` workers (at least one) sharing this service.
    pub fn start(self: Arc<Self>, count: usize) -> Vec<JoinHandle<()>> {
        let count = count.max(1);
        let handles = (0..count)
            .map(|worker_id| {
                let worker = self.clone();
                tokio::spawn(async move { worker.run_worker_loop(worker_id).await })
            })
            .collect();
        tracing::info!(count, "started transcode workers");
        handles
    }
}
