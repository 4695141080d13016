use std::time::Duration;

use chrono::Utc;
use pipeworks_models::{Job, JobStatus, WebhookRetryPolicy};
use reqwest::Client;
use serde_json::json;
use tracing::{debug, warn};

/// At-least-once webhook delivery with the configured backoff schedule
/// (§4.7). Failures never change the job's own status; they are logged and
/// dropped after the final attempt.
pub struct WebhookDispatcher {
    client: Client,
    policy: WebhookRetryPolicy,
}

impl WebhookDispatcher {
    pub fn new(policy: WebhookRetryPolicy) -> Self {
        Self { client: Client::builder().timeout(Duration::from_secs(10)).build().expect("reqwest client"), policy }
    }

    pub async fn dispatch(&self, url: &str, job: &Job) {
        let mut body = self.build_body(job);
        if let Ok(serialized) = serde_json::to_vec(&body) {
            if serialized.len() > self.policy.max_body_bytes {
                body = json!({
                    "job_id": job.job_id.to_string(),
                    "job_type": job.job_type(),
                    "status": job.status,
                    "timestamp": Utc::now(),
                    "truncated": true,
                });
            }
        }

        for attempt in 0..self.policy.max_attempts {
            if attempt > 0 {
                if let Some(delay) = self.policy.backoff.get(attempt as usize - 1) {
                    tokio::time::sleep(*delay).await;
                }
            }
            match self.client.post(url).json(&body).send().await {
                Ok(response) if response.status().is_success() => {
                    debug!(job_id = %job.job_id, attempt, "webhook delivered");
                    return;
                }
                Ok(response) => {
                    warn!(job_id = %job.job_id, attempt, status = %response.status(), "webhook returned non-2xx");
                }
                Err(e) => {
                    warn!(job_id = %job.job_id, attempt, error = %e, "webhook request failed");
                }
            }
        }
    }

    fn build_body(&self, job: &Job) -> serde_json::Value {
        json!({
            "job_id": job.job_id.to_string(),
            "job_type": job.job_type(),
            "status": job.status,
            "result": job.result,
            "error": job.error,
            "timestamp": Utc::now(),
        })
    }
}

pub fn should_notify(status: JobStatus) -> bool {
    status.is_terminal()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipeworks_models::{JobParams, ProcessEpisodeParams, Stage};
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sample_job() -> Job {
        Job::new(JobParams::ProcessEpisode(ProcessEpisodeParams { episode_id: "ep1".into(), target_stage: Stage::Rendered, force_reprocess: false }), None)
            .start()
            .complete(pipeworks_models::JobResult::default())
    }

    #[tokio::test]
    async fn dispatch_succeeds_on_first_attempt() {
        let server = MockServer::start().await;
        Mock::given(method("POST")).respond_with(ResponseTemplate::new(200)).expect(1).mount(&server).await;

        let dispatcher = WebhookDispatcher::new(WebhookRetryPolicy { max_attempts: 3, backoff: vec![Duration::from_millis(1)], max_body_bytes: 1024 * 1024 });
        dispatcher.dispatch(&server.uri(), &sample_job()).await;
    }

    #[tokio::test]
    async fn dispatch_retries_on_failure_then_gives_up() {
        let server = MockServer::start().await;
        Mock::given(method("POST")).respond_with(ResponseTemplate::new(500)).mount(&server).await;

        let dispatcher = WebhookDispatcher::new(WebhookRetryPolicy { max_attempts: 2, backoff: vec![Duration::from_millis(1), Duration::from_millis(1)], max_body_bytes: 1024 * 1024 });
        dispatcher.dispatch(&server.uri(), &sample_job()).await;
    }
}
