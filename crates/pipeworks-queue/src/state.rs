use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Instant;

use pipeworks_models::{CancellationToken, Job, JobId};
use tokio::sync::watch;

const ETA_WINDOW: std::time::Duration = std::time::Duration::from_secs(30);

/// One row of the in-process job table: the job record itself, its
/// cancellation flag, a progress broadcast channel for subscribers, and the
/// rolling progress samples `eta_seconds` is computed from.
struct JobEntry {
    job: Job,
    cancel: CancellationToken,
    progress_tx: watch::Sender<Job>,
    samples: VecDeque<(Instant, u8)>,
}

/// The single-writer job table (§4.7): one `Mutex` guarding every in-memory
/// job record, mirroring the Registry's single-writer constraint on the
/// persistent side.
#[derive(Default)]
pub struct JobTable {
    jobs: Mutex<HashMap<JobId, JobEntry>>,
}

impl JobTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, job: Job) -> watch::Receiver<Job> {
        let (tx, rx) = watch::channel(job.clone());
        let mut jobs = self.jobs.lock().expect("job table mutex poisoned");
        jobs.insert(job.job_id, JobEntry { job, cancel: CancellationToken::new(), progress_tx: tx, samples: VecDeque::new() });
        rx
    }

    pub fn get(&self, job_id: JobId) -> Option<Job> {
        self.jobs.lock().expect("job table mutex poisoned").get(&job_id).map(|e| e.job.clone())
    }

    pub fn cancellation_token(&self, job_id: JobId) -> Option<CancellationToken> {
        self.jobs.lock().expect("job table mutex poisoned").get(&job_id).map(|e| e.cancel.clone())
    }

    pub fn list(&self) -> Vec<Job> {
        self.jobs.lock().expect("job table mutex poisoned").values().map(|e| e.job.clone()).collect()
    }

    /// Checks invariant 4 (at most one non-terminal job per
    /// `(episode_id, job_type)`) and inserts `job` under the same lock, so
    /// two concurrent submissions for the same episode can't both observe
    /// "no conflict" before either becomes visible to the other. When
    /// `force` is set and a conflicting job exists, it is cancelled in this
    /// same critical section instead of rejecting the new submission.
    pub fn insert_if_not_conflicting(&self, job: Job, force: bool) -> Result<(), Job> {
        let mut jobs = self.jobs.lock().expect("job table mutex poisoned");

        if let Some(entry) = jobs.values_mut().find(|e| !e.job.status.is_terminal() && e.job.job_type() == job.job_type() && e.job.episode_id() == job.episode_id()) {
            if !force {
                return Err(entry.job.clone());
            }
            entry.cancel.cancel();
            if entry.job.status == pipeworks_models::JobStatus::Queued {
                entry.job = entry.job.clone().cancel();
                let _ = entry.progress_tx.send(entry.job.clone());
            }
        }

        let (tx, _rx) = watch::channel(job.clone());
        jobs.insert(job.job_id, JobEntry { job, cancel: CancellationToken::new(), progress_tx: tx, samples: VecDeque::new() });
        Ok(())
    }

    pub fn subscribe(&self, job_id: JobId) -> Option<watch::Receiver<Job>> {
        self.jobs.lock().expect("job table mutex poisoned").get(&job_id).map(|e| e.progress_tx.subscribe())
    }

    /// Replaces the job record, recomputing ETA from the rolling sample
    /// window before publishing to subscribers.
    pub fn update(&self, job_id: JobId, mut job: Job) {
        let mut jobs = self.jobs.lock().expect("job table mutex poisoned");
        if let Some(entry) = jobs.get_mut(&job_id) {
            let now = Instant::now();
            entry.samples.push_back((now, job.progress));
            while entry.samples.front().is_some_and(|(t, _)| now.duration_since(*t) > ETA_WINDOW) {
                entry.samples.pop_front();
            }
            job.eta_seconds = eta_from_samples(&entry.samples);
            entry.job = job.clone();
            let _ = entry.progress_tx.send(job);
        }
    }

    pub fn remove(&self, job_id: JobId) -> Option<Job> {
        self.jobs.lock().expect("job table mutex poisoned").remove(&job_id).map(|e| e.job)
    }

    pub fn cancel_queued(&self, job_id: JobId) -> Option<Job> {
        let mut jobs = self.jobs.lock().expect("job table mutex poisoned");
        let entry = jobs.get_mut(&job_id)?;
        if entry.job.status != pipeworks_models::JobStatus::Queued {
            return None;
        }
        entry.cancel.cancel();
        entry.job = entry.job.clone().cancel();
        let _ = entry.progress_tx.send(entry.job.clone());
        Some(entry.job.clone())
    }

    pub fn request_cancel_running(&self, job_id: JobId) -> bool {
        let jobs = self.jobs.lock().expect("job table mutex poisoned");
        match jobs.get(&job_id) {
            Some(entry) if entry.job.status == pipeworks_models::JobStatus::Running => {
                entry.cancel.cancel();
                true
            }
            _ => false,
        }
    }
}

/// `(100 - progress) / avg_progress_per_sec_over_last_30s`, `None` until at
/// least two samples exist, clamped to non-negative.
fn eta_from_samples(samples: &VecDeque<(Instant, u8)>) -> Option<f64> {
    let (first_t, first_p) = *samples.front()?;
    let (last_t, last_p) = *samples.back()?;
    if first_t == last_t {
        return None;
    }
    let elapsed = last_t.duration_since(first_t).as_secs_f64();
    if elapsed <= 0.0 {
        return None;
    }
    let rate = (last_p as f64 - first_p as f64) / elapsed;
    if rate <= 0.0 {
        return None;
    }
    Some(((100.0 - last_p as f64) / rate).max(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipeworks_models::{JobParams, ProcessEpisodeParams, Stage};

    fn sample_job() -> Job {
        Job::new(JobParams::ProcessEpisode(ProcessEpisodeParams { episode_id: "ep1".into(), target_stage: Stage::Rendered, force_reprocess: false }), None)
    }

    #[test]
    fn eta_is_none_with_fewer_than_two_samples() {
        let table = JobTable::new();
        let job = sample_job();
        let job_id = job.job_id;
        table.insert(job.clone());
        table.update(job_id, job.start());
        assert!(table.get(job_id).unwrap().eta_seconds.is_none());
    }

    #[test]
    fn cancel_queued_transitions_immediately() {
        let table = JobTable::new();
        let job = sample_job();
        table.insert(job.clone());
        let cancelled = table.cancel_queued(job.job_id).unwrap();
        assert_eq!(cancelled.status, pipeworks_models::JobStatus::Cancelled);
    }

    #[test]
    fn cancel_queued_is_noop_for_running_jobs() {
        let table = JobTable::new();
        let job = sample_job();
        table.insert(job.clone());
        table.update(job.job_id, job.clone().start());
        assert!(table.cancel_queued(job.job_id).is_none());
    }
}
