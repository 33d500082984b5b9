//! Bounded worker pool that runs submissions through a [`Sandbox`].
//!
//! Jobs enter through a bounded queue and are picked up by a fixed number of
//! workers. Every accepted job produces exactly one `CodeRanResult`, addressed
//! to the connection that submitted it.

use std::{panic::AssertUnwindSafe, sync::Arc, time::Duration};

use async_trait::async_trait;
use futures_util::FutureExt;
use tokio::{
    sync::{Mutex, mpsc},
    task::JoinHandle,
};

use crate::domain::{
    Event, EventBody, ExecutionError, ExecutionJob, ExecutionQueue, ExecutionResult,
    MessagePusher, Sandbox, SubmitError,
};

/// Extra time granted to a sandbox before the worker gives up on it.
const TIMEOUT_GRACE: Duration = Duration::from_secs(5);

/// Settings for [`SandboxExecutor`].
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Number of concurrent workers.
    pub workers: usize,
    /// Capacity of the job queue.
    pub queue_capacity: usize,
    /// Wall-clock limit for a single execution.
    pub timeout: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            workers: 32,
            queue_capacity: 256,
            timeout: Duration::from_secs(10),
        }
    }
}

type JobReceiver = Arc<Mutex<mpsc::Receiver<ExecutionJob>>>;

pub struct SandboxExecutor {
    /// `None` once the executor has been shut down.
    sender: Mutex<Option<mpsc::Sender<ExecutionJob>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl SandboxExecutor {
    /// Spawns the workers and returns the executor accepting jobs.
    pub fn start(
        sandbox: Arc<dyn Sandbox>,
        pusher: Arc<dyn MessagePusher>,
        config: ExecutorConfig,
    ) -> Self {
        let (sender, receiver) = mpsc::channel(config.queue_capacity.max(1));
        let receiver: JobReceiver = Arc::new(Mutex::new(receiver));

        let workers = (0..config.workers.max(1))
            .map(|index| {
                tokio::spawn(worker_loop(
                    index,
                    receiver.clone(),
                    sandbox.clone(),
                    pusher.clone(),
                    config.timeout,
                ))
            })
            .collect();

        tracing::info!(
            "Sandbox executor started ({} workers, queue capacity {})",
            config.workers.max(1),
            config.queue_capacity.max(1)
        );

        Self {
            sender: Mutex::new(Some(sender)),
            workers: Mutex::new(workers),
        }
    }

    /// Stops accepting jobs, lets queued jobs finish, and waits for the workers.
    pub async fn shutdown(&self) {
        self.sender.lock().await.take();

        let workers = std::mem::take(&mut *self.workers.lock().await);
        for worker in workers {
            if let Err(e) = worker.await {
                tracing::error!("Sandbox worker terminated abnormally: {}", e);
            }
        }

        tracing::info!("Sandbox executor stopped");
    }
}

#[async_trait]
impl ExecutionQueue for SandboxExecutor {
    async fn submit(&self, job: ExecutionJob) -> Result<(), SubmitError> {
        let sender = self.sender.lock().await;
        let Some(sender) = sender.as_ref() else {
            return Err(SubmitError::Closed);
        };

        sender.try_send(job).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SubmitError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => SubmitError::Closed,
        })
    }
}

async fn worker_loop(
    index: usize,
    receiver: JobReceiver,
    sandbox: Arc<dyn Sandbox>,
    pusher: Arc<dyn MessagePusher>,
    timeout: Duration,
) {
    loop {
        let job = receiver.lock().await.recv().await;
        let Some(job) = job else {
            break;
        };

        let result = AssertUnwindSafe(execute_job(sandbox.as_ref(), &job, timeout))
            .catch_unwind()
            .await
            .unwrap_or_else(|_| {
                tracing::error!("Sandbox worker {} panicked while running a job", index);
                ExecutionResult::failure(&ExecutionError::Internal(
                    "execution aborted".to_string(),
                ))
            });

        tracing::info!(
            "Execution finished for user {} (passed: {})",
            job.user_id,
            result.passed
        );

        let event = Event::new(
            job.user_id,
            EventBody::CodeRanResult {
                output: result.output,
                passed: result.passed,
            },
        );
        if let Err(e) = pusher
            .push_to_connection(job.user_id, job.connection_id, &event)
            .await
        {
            tracing::warn!("Failed to deliver result to user {}: {}", job.user_id, e);
        }
    }

    tracing::debug!("Sandbox worker {} exiting", index);
}

async fn execute_job(
    sandbox: &dyn Sandbox,
    job: &ExecutionJob,
    timeout: Duration,
) -> ExecutionResult {
    let image = match sandbox.resolve_image(&job.language) {
        Ok(image) => image,
        Err(e) => {
            tracing::warn!("Rejected submission from user {}: {}", job.user_id, e);
            return ExecutionResult::failure(&e);
        }
    };

    let run = sandbox.run(&image, &job.source, timeout);
    match tokio::time::timeout(timeout + TIMEOUT_GRACE, run).await {
        Ok(Ok(output)) => ExecutionResult::judge(output.output, &job.expected_output),
        Ok(Err(e)) => {
            tracing::warn!("Execution failed for user {}: {}", job.user_id, e);
            ExecutionResult::failure(&e)
        }
        Err(_) => {
            tracing::warn!("Sandbox did not honor the timeout for user {}", job.user_id);
            ExecutionResult::failure(&ExecutionError::Timeout(timeout))
        }
    }
}
