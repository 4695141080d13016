use std::time::Duration;

use pipeworks_models::{MountAliases, PipeworksCoreConfig, StageTimeouts, StageWeights, WebhookRetryPolicy};

/// Transport-level server configuration, read the same way the core's
/// `PipeworksCoreConfig` is: explicit named fields, no reflective config
/// object.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
    pub request_timeout: Duration,
    pub max_body_bytes: usize,
    pub database_url: String,
    pub artifact_root: String,
    pub discovery_source_dir: String,
    pub core: PipeworksCoreConfig,
    pub collaborator_base_urls: CollaboratorUrls,
    pub environment: String,
}

/// Base URLs for the external collaborator sidecars. A missing URL for an
/// engine means the deterministic stub implementation is used instead,
/// which is only appropriate outside production.
#[derive(Debug, Clone, Default)]
pub struct CollaboratorUrls {
    pub stt: Option<String>,
    pub enrichment: Option<String>,
    pub segmentation: Option<String>,
    pub renderer: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            cors_origins: vec!["*".to_string()],
            request_timeout: Duration::from_secs(30),
            max_body_bytes: 10 * 1024 * 1024,
            database_url: "sqlite://pipeworks.db".to_string(),
            artifact_root: "./data".to_string(),
            discovery_source_dir: "./data/inbox".to_string(),
            core: PipeworksCoreConfig::default(),
            collaborator_base_urls: CollaboratorUrls::default(),
            environment: "development".to_string(),
        }
    }
}

impl ApiConfig {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            host: std::env::var("API_HOST").unwrap_or(default.host),
            port: std::env::var("API_PORT").ok().and_then(|s| s.parse().ok()).unwrap_or(default.port),
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|s| s.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or(default.cors_origins),
            request_timeout: Duration::from_secs(std::env::var("REQUEST_TIMEOUT_SECS").ok().and_then(|s| s.parse().ok()).unwrap_or(30)),
            max_body_bytes: std::env::var("MAX_BODY_BYTES").ok().and_then(|s| s.parse().ok()).unwrap_or(default.max_body_bytes),
            database_url: std::env::var("DATABASE_URL").unwrap_or(default.database_url),
            artifact_root: std::env::var("ARTIFACT_ROOT").unwrap_or(default.artifact_root),
            discovery_source_dir: std::env::var("DISCOVERY_SOURCE_DIR").unwrap_or(default.discovery_source_dir),
            core: PipeworksCoreConfig {
                max_workers: std::env::var("MAX_WORKERS").ok().and_then(|s| s.parse().ok()).unwrap_or(default.core.max_workers),
                queue_capacity: std::env::var("QUEUE_CAPACITY").ok().and_then(|s| s.parse().ok()).unwrap_or(default.core.queue_capacity),
                stage_weights: StageWeights::default(),
                stage_timeouts: StageTimeouts::default(),
                webhook_retry_policy: WebhookRetryPolicy::default(),
                db_kind: default.core.db_kind,
                mount_aliases: MountAliases::default(),
                project_root: std::env::var("PROJECT_ROOT").unwrap_or(default.core.project_root),
                stuck_scan_interval: Duration::from_secs(std::env::var("STUCK_SCAN_INTERVAL_SECS").ok().and_then(|s| s.parse().ok()).unwrap_or(60)),
            },
            collaborator_base_urls: CollaboratorUrls {
                stt: std::env::var("STT_BASE_URL").ok(),
                enrichment: std::env::var("ENRICHMENT_BASE_URL").ok(),
                segmentation: std::env::var("SEGMENTATION_BASE_URL").ok(),
                renderer: std::env::var("RENDERER_BASE_URL").ok(),
            },
            environment: std::env::var("ENVIRONMENT").unwrap_or(default.environment),
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }
}
