//! Queue-level metrics: job throughput and terminal outcomes by job type.

use metrics::counter;

pub mod names {
    pub const JOBS_SUBMITTED_TOTAL: &str = "pipeworks_jobs_submitted_total";
    pub const JOBS_COMPLETED_TOTAL: &str = "pipeworks_jobs_completed_total";
}

pub fn record_submitted(job_type: &str) {
    counter!(names::JOBS_SUBMITTED_TOTAL, "job_type" => job_type.to_string()).increment(1);
}

pub fn record_completed(job_type: &str, status: &str) {
    counter!(names::JOBS_COMPLETED_TOTAL, "job_type" => job_type.to_string(), "status" => status.to_string()).increment(1);
}
