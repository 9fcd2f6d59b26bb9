use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use log::{debug, error, info};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::Mutex;

pub type Job = BoxFuture<'static, ()>;

/// Fixed set of tasks draining a bounded job queue.
///
/// Must be created from within a Tokio runtime. Workers stop once every
/// `WorkerPool` handle has been dropped and the queue is drained. A job that
/// panics is logged and the worker moves on to the next one.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    sender: mpsc::Sender<Job>,
}

impl WorkerPool {
    pub fn new(workers: usize, queue_capacity: usize) -> Self {
        let workers = workers.max(1);
        let (sender, receiver) = mpsc::channel::<Job>(queue_capacity.max(1));
        let receiver = Arc::new(Mutex::new(receiver));

        for id in 0..workers {
            let receiver = Arc::clone(&receiver);
            tokio::spawn(async move {
                loop {
                    // Lock is released before the job runs so other workers can pick up work
                    let job = receiver.lock().await.recv().await;
                    match job {
                        Some(job) => {
                            if AssertUnwindSafe(job).catch_unwind().await.is_err() {
                                error!("Conversion worker {} recovered from a panicking job", id);
                            }
                        }
                        None => break,
                    }
                }
                debug!("Conversion worker {} stopped", id);
            });
        }

        info!(
            "Worker pool started with {} workers and a backlog of {}",
            workers,
            queue_capacity.max(1)
        );

        Self { sender }
    }

    /// Queue `job` without waiting. The job is handed back when the backlog is
    /// full or the pool has shut down.
    pub fn submit(&self, job: Job) -> Result<(), Job> {
        match self.sender.try_send(job) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(job)) | Err(TrySendError::Closed(job)) => Err(job),
        }
    }

    /// Number of jobs waiting for a worker.
    pub fn pending(&self) -> usize {
        self.sender.max_capacity() - self.sender.capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::{oneshot, Notify};

    #[tokio::test]
    async fn runs_submitted_jobs() {
        let pool = WorkerPool::new(2, 8);
        let (tx, rx) = oneshot::channel();

        pool.submit(
            async move {
                tx.send(7).unwrap();
            }
            .boxed(),
        )
        .ok()
        .unwrap();

        assert_eq!(rx.await.unwrap(), 7);
    }

    #[tokio::test]
    async fn hands_back_jobs_when_backlog_is_full() {
        let pool = WorkerPool::new(1, 1);
        let gate = Arc::new(Notify::new());
        let started = Arc::new(Notify::new());
        let ran = Arc::new(AtomicUsize::new(0));

        // Occupy the only worker
        let (g, s) = (Arc::clone(&gate), Arc::clone(&started));
        pool.submit(
            async move {
                s.notify_one();
                g.notified().await;
            }
            .boxed(),
        )
        .ok()
        .unwrap();
        started.notified().await;

        // Fill the backlog
        let counter = Arc::clone(&ran);
        pool.submit(
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
            .boxed(),
        )
        .ok()
        .unwrap();
        assert_eq!(pool.pending(), 1);

        let counter = Arc::clone(&ran);
        let rejected = pool
            .submit(
                async move {
                    counter.fetch_add(10, Ordering::SeqCst);
                }
                .boxed(),
            )
            .unwrap_err();

        rejected.await;
        assert_eq!(ran.load(Ordering::SeqCst), 10);

        gate.notify_one();
    }

    #[tokio::test]
    async fn worker_survives_a_panicking_job() {
        let pool = WorkerPool::new(1, 4);
        let (tx, rx) = oneshot::channel();

        pool.submit(async { panic!("job exploded"); }.boxed())
            .ok()
            .unwrap();
        pool.submit(
            async move {
                tx.send("still running").unwrap();
            }
            .boxed(),
        )
        .ok()
        .unwrap();

        let reply = tokio::time::timeout(std::time::Duration::from_secs(10), rx)
            .await
            .expect("worker stopped after a panic")
            .unwrap();
        assert_eq!(reply, "still running");
    }
}
