use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use pipeworks_models::StageTimeouts;
use tokio::time::interval;
use tracing::{info, warn};

use crate::state::JobTable;

/// Periodic scan flagging jobs that have stopped reporting progress.
///
/// Unlike the recovery loop this is adapted from, a stuck job is never
/// auto-failed: the spec treats a stall as informational only, since the
/// currently-running collaborator may simply be slow rather than dead. The
/// flag surfaces through `GetJob`/`ListJobs` for an operator to act on.
pub struct StuckDetector {
    table: Arc<JobTable>,
    timeouts: StageTimeouts,
    scan_interval: Duration,
}

impl StuckDetector {
    pub fn new(table: Arc<JobTable>, timeouts: StageTimeouts, scan_interval: Duration) -> Self {
        Self { table, timeouts, scan_interval }
    }

    /// Runs the scan loop forever; spawn this as a background task.
    pub async fn run(&self) {
        info!(interval = ?self.scan_interval, "starting stuck job detector");
        let mut ticker = interval(self.scan_interval);
        loop {
            ticker.tick().await;
            let (flagged, cleared) = self.scan_once();
            if flagged > 0 || cleared > 0 {
                info!(flagged, cleared, "stuck job scan complete");
            }
        }
    }

    /// Runs exactly one scan pass, returning (newly_flagged, newly_cleared).
    pub fn scan_once(&self) -> (usize, usize) {
        let now = Utc::now();
        let mut flagged = 0;
        let mut cleared = 0;

        for job in self.table.list() {
            if job.status != pipeworks_models::JobStatus::Running {
                continue;
            }
            let timeout = job.current_stage.map(|s| self.timeouts.for_stage(s)).unwrap_or_else(|| self.timeouts.for_stage(pipeworks_models::Stage::Transcribed));
            let elapsed = now.signed_duration_since(job.last_progress_at).to_std().unwrap_or(Duration::ZERO);
            let is_stale = elapsed > timeout;

            if is_stale && !job.stuck {
                warn!(job_id = %job.job_id, elapsed_secs = elapsed.as_secs(), "flagging job as stuck");
                self.table.update(job.job_id, job.mark_stuck(true));
                flagged += 1;
            } else if !is_stale && job.stuck {
                self.table.update(job.job_id, job.mark_stuck(false));
                cleared += 1;
            }
        }

        (flagged, cleared)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipeworks_models::{Job, JobParams, ProcessEpisodeParams, Stage};

    fn running_job() -> Job {
        Job::new(JobParams::ProcessEpisode(ProcessEpisodeParams { episode_id: "ep1".into(), target_stage: Stage::Rendered, force_reprocess: false }), None).start()
    }

    #[test]
    fn flags_job_whose_progress_has_stalled_past_timeout() {
        let table = Arc::new(JobTable::new());
        let job = running_job().with_progress(10, Some(Stage::Transcribed), None);
        table.insert(job.clone());
        table.update(job.job_id, job.clone());

        let timeouts = StageTimeouts { transcription: Duration::from_secs(0), ..StageTimeouts::default() };
        let detector = StuckDetector::new(table.clone(), timeouts, Duration::from_secs(60));

        let (flagged, _) = detector.scan_once();
        assert_eq!(flagged, 1);
        assert!(table.get(job.job_id).unwrap().stuck);
    }

    #[test]
    fn does_not_flag_fresh_running_jobs() {
        let table = Arc::new(JobTable::new());
        let job = running_job().with_progress(10, Some(Stage::Transcribed), None);
        table.insert(job.clone());
        table.update(job.job_id, job.clone());

        let detector = StuckDetector::new(table.clone(), StageTimeouts::default(), Duration::from_secs(60));
        let (flagged, _) = detector.scan_once();
        assert_eq!(flagged, 0);
    }

    #[test]
    fn ignores_queued_and_terminal_jobs() {
        let table = Arc::new(JobTable::new());
        let job = Job::new(JobParams::ProcessEpisode(ProcessEpisodeParams { episode_id: "ep1".into(), target_stage: Stage::Rendered, force_reprocess: false }), None);
        table.insert(job.clone());

        let timeouts = StageTimeouts { transcription: Duration::from_secs(0), ..StageTimeouts::default() };
        let detector = StuckDetector::new(table.clone(), timeouts, Duration::from_secs(60));
        let (flagged, _) = detector.scan_once();
        assert_eq!(flagged, 0);
    }
}
