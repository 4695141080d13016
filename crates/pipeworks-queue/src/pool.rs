use std::sync::Arc;

use pipeworks_models::{Job, JobId, JobParams, JobStatus, WebhookRetryPolicy};
use tokio::sync::{mpsc, watch, Mutex as AsyncMutex};
use tracing::{info, warn};

use crate::error::{QueueError, QueueResult};
use crate::runner::{JobExecutionOutcome, JobRunner};
use crate::state::JobTable;
use crate::webhook::WebhookDispatcher;

/// Tunables for the in-process worker pool (§4.7): a fixed number of
/// worker tasks pulling from one bounded channel.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    pub max_workers: usize,
    pub queue_capacity: usize,
    pub webhook_retry_policy: WebhookRetryPolicy,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self { max_workers: 2, queue_capacity: 2, webhook_retry_policy: WebhookRetryPolicy::default() }
    }
}

/// The bounded worker pool (C7): a fixed number of tasks consuming job IDs
/// FIFO from one bounded `mpsc` channel, a shared job table behind one
/// mutex, and at-least-once webhook dispatch after the terminal status
/// write.
pub struct JobQueue {
    table: Arc<JobTable>,
    sender: mpsc::Sender<JobId>,
}

impl JobQueue {
    pub fn start(config: QueueConfig, runner: Arc<dyn JobRunner>) -> Self {
        let table = Arc::new(JobTable::new());
        let (sender, receiver) = mpsc::channel(config.queue_capacity);
        let receiver = Arc::new(AsyncMutex::new(receiver));
        let webhook = Arc::new(WebhookDispatcher::new(config.webhook_retry_policy.clone()));

        for worker_id in 0..config.max_workers {
            let table = table.clone();
            let receiver = receiver.clone();
            let runner = runner.clone();
            let webhook = webhook.clone();
            tokio::spawn(async move {
                worker_loop(worker_id, table, receiver, runner, webhook).await;
            });
        }

        Self { table, sender }
    }

    /// Enqueues a new job, returning `QueueFull` if the bounded channel has
    /// no room (§4.7), or `Conflict` if a non-terminal job already exists
    /// for the same `(episode_id, job_type)` (invariant 4) and the caller
    /// did not ask to force it.
    pub fn submit(&self, params: JobParams, webhook_url: Option<String>) -> QueueResult<Job> {
        let force = matches!(&params, JobParams::ProcessEpisode(p) if p.force_reprocess);
        let job = Job::new(params, webhook_url);

        if let Err(existing) = self.table.insert_if_not_conflicting(job.clone(), force) {
            return Err(QueueError::Conflict(format!("a non-terminal {:?} job already exists for episode {}", existing.job_type(), existing.episode_id())));
        }

        match self.sender.try_send(job.job_id) {
            Ok(()) => {
                crate::metrics::record_submitted(&format!("{:?}", job.job_type()));
                Ok(job)
            }
            Err(_) => {
                self.table.remove(job.job_id);
                Err(QueueError::QueueFull)
            }
        }
    }

    pub fn get(&self, job_id: JobId) -> Option<Job> {
        self.table.get(job_id)
    }

    pub fn list(&self) -> Vec<Job> {
        self.table.list()
    }

    pub fn subscribe(&self, job_id: JobId) -> Option<watch::Receiver<Job>> {
        self.table.subscribe(job_id)
    }

    /// Cancels a job per §4.7's split semantics: an immediate transition
    /// for queued jobs, a cooperative flag for running ones.
    pub fn cancel(&self, job_id: JobId) -> QueueResult<Job> {
        if let Some(job) = self.table.cancel_queued(job_id) {
            return Ok(job);
        }
        if self.table.request_cancel_running(job_id) {
            return self.table.get(job_id).ok_or_else(|| QueueError::NotFound(job_id.to_string()));
        }
        match self.table.get(job_id) {
            Some(job) if job.status.is_terminal() => Err(QueueError::AlreadyTerminal(job_id.to_string())),
            Some(job) => Ok(job),
            None => Err(QueueError::NotFound(job_id.to_string())),
        }
    }

    /// Exposes the shared job table so a `StuckDetector` can scan it
    /// without owning a separate reference to the queue itself.
    pub fn table(&self) -> Arc<JobTable> {
        self.table.clone()
    }

    pub fn stats(&self) -> QueueStats {
        let jobs = self.table.list();
        QueueStats {
            queued: jobs.iter().filter(|j| j.status == JobStatus::Queued).count(),
            running: jobs.iter().filter(|j| j.status == JobStatus::Running).count(),
            completed: jobs.iter().filter(|j| j.status == JobStatus::Completed).count(),
            failed: jobs.iter().filter(|j| j.status == JobStatus::Failed).count(),
            cancelled: jobs.iter().filter(|j| j.status == JobStatus::Cancelled).count(),
        }
    }
}

#[derive(Debug, Clone, Default, serde::Serialize, schemars::JsonSchema)]
pub struct QueueStats {
    pub queued: usize,
    pub running: usize,
    pub completed: usize,
    pub failed: usize,
    pub cancelled: usize,
}

async fn worker_loop(
    worker_id: usize,
    table: Arc<JobTable>,
    receiver: Arc<AsyncMutex<mpsc::Receiver<JobId>>>,
    runner: Arc<dyn JobRunner>,
    webhook: Arc<WebhookDispatcher>,
) {
    loop {
        let job_id = {
            let mut rx = receiver.lock().await;
            match rx.recv().await {
                Some(id) => id,
                None => return,
            }
        };

        let Some(job) = table.get(job_id) else { continue };
        if job.status.is_terminal() {
            continue;
        }

        let cancel = match table.cancellation_token(job_id) {
            Some(c) => c,
            None => continue,
        };
        if cancel.is_cancelled() {
            continue;
        }

        info!(worker_id, job_id = %job_id, "picked up job");
        let running = job.start();
        table.update(job_id, running.clone());

        let progress_table = table.clone();
        let progress = {
            let job_id = job_id;
            Arc::new(move |pct: u8, message: Option<String>| {
                if let Some(current) = progress_table.get(job_id) {
                    progress_table.update(job_id, current.with_progress(pct, None, message));
                }
            })
        };

        let outcome = runner.execute(&running.params, progress, cancel).await;
        let finished = match outcome {
            JobExecutionOutcome::Completed(result) => table.get(job_id).map(|j| j.complete(result)),
            JobExecutionOutcome::Failed(message) => table.get(job_id).map(|j| j.fail(message)),
            JobExecutionOutcome::Cancelled => table.get(job_id).map(|j| j.cancel()),
        };

        let Some(finished) = finished else { continue };
        crate::metrics::record_completed(&format!("{:?}", finished.job_type()), &format!("{:?}", finished.status));
        table.update(job_id, finished.clone());

        if let Some(url) = &finished.webhook_url {
            if crate::webhook::should_notify(finished.status) {
                webhook.dispatch(url, &finished).await;
            }
        }

        if finished.status == JobStatus::Failed {
            warn!(job_id = %job_id, error = ?finished.error, "job failed");
        }

        // yield briefly between jobs so the progress reporter drains
        tokio::task::yield_now().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pipeworks_models::{noop_progress, ProcessEpisodeParams, Stage};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingRunner {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl JobRunner for CountingRunner {
        async fn execute(&self, _params: &JobParams, _progress: pipeworks_models::ProgressCallback, _cancel: pipeworks_models::CancellationToken) -> JobExecutionOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            JobExecutionOutcome::Completed(pipeworks_models::JobResult::default())
        }
    }

    fn params() -> JobParams {
        JobParams::ProcessEpisode(ProcessEpisodeParams { episode_id: "ep1".into(), target_stage: Stage::Rendered, force_reprocess: false })
    }

    #[tokio::test]
    async fn submit_runs_job_to_completion() {
        let runner = Arc::new(CountingRunner { calls: AtomicUsize::new(0) });
        let queue = JobQueue::start(QueueConfig { max_workers: 1, queue_capacity: 4, ..Default::default() }, runner.clone());

        let job = queue.submit(params(), None).unwrap();

        for _ in 0..50 {
            if queue.get(job.job_id).unwrap().status.is_terminal() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }

        assert_eq!(queue.get(job.job_id).unwrap().status, JobStatus::Completed);
        assert_eq!(runner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn submit_returns_queue_full_past_capacity() {
        struct BlockingRunner;
        #[async_trait]
        impl JobRunner for BlockingRunner {
            async fn execute(&self, _params: &JobParams, _progress: pipeworks_models::ProgressCallback, _cancel: pipeworks_models::CancellationToken) -> JobExecutionOutcome {
                tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                JobExecutionOutcome::Completed(pipeworks_models::JobResult::default())
            }
        }

        let queue = JobQueue::start(QueueConfig { max_workers: 1, queue_capacity: 1, ..Default::default() }, Arc::new(BlockingRunner));
        let params_for = |episode_id: &str| JobParams::ProcessEpisode(ProcessEpisodeParams { episode_id: episode_id.into(), target_stage: Stage::Rendered, force_reprocess: false });

        let _first = queue.submit(params_for("ep1"), None).unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        let _second = queue.submit(params_for("ep2"), None).unwrap();
        let third = queue.submit(params_for("ep3"), None);
        assert!(matches!(third, Err(QueueError::QueueFull)));
    }

    #[tokio::test]
    async fn cancel_queued_job_never_runs() {
        let runner = Arc::new(CountingRunner { calls: AtomicUsize::new(0) });
        struct StallingRunner;
        #[async_trait]
        impl JobRunner for StallingRunner {
            async fn execute(&self, _params: &JobParams, _progress: pipeworks_models::ProgressCallback, _cancel: pipeworks_models::CancellationToken) -> JobExecutionOutcome {
                tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                JobExecutionOutcome::Completed(pipeworks_models::JobResult::default())
            }
        }
        let queue = JobQueue::start(QueueConfig { max_workers: 1, queue_capacity: 2, ..Default::default() }, Arc::new(StallingRunner));
        let blocker = queue.submit(params(), None).unwrap();
        let _ = blocker;
        let other_episode = JobParams::ProcessEpisode(ProcessEpisodeParams { episode_id: "ep2".into(), target_stage: Stage::Rendered, force_reprocess: false });
        let queued = queue.submit(other_episode, None).unwrap();

        let cancelled = queue.cancel(queued.job_id).unwrap();
        assert_eq!(cancelled.status, JobStatus::Cancelled);
        let _ = runner;
        let _ = noop_progress();
    }

    #[tokio::test]
    async fn submit_conflicts_with_non_terminal_job_on_same_episode() {
        let runner = Arc::new(CountingRunner { calls: AtomicUsize::new(0) });
        let queue = JobQueue::start(QueueConfig { max_workers: 1, queue_capacity: 4, ..Default::default() }, runner);

        let _first = queue.submit(params(), None).unwrap();
        let second = queue.submit(params(), None);
        assert!(matches!(second, Err(QueueError::Conflict(_))));
    }

    #[tokio::test]
    async fn submit_with_force_reprocess_cancels_existing_job() {
        let runner = Arc::new(CountingRunner { calls: AtomicUsize::new(0) });
        let queue = JobQueue::start(QueueConfig { max_workers: 1, queue_capacity: 4, ..Default::default() }, runner);

        let _first = queue.submit(params(), None).unwrap();
        let forced = JobParams::ProcessEpisode(ProcessEpisodeParams { episode_id: "ep1".into(), target_stage: Stage::Rendered, force_reprocess: true });
        let second = queue.submit(forced, None);
        assert!(second.is_ok());
    }
}
