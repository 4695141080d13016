use std::sync::Arc;

/// A closure a collaborator calls to report incremental progress (0-100)
/// and an optional human-readable message. StageRunner rate-limits calls
/// at the writer side (§4.5); collaborators may call it as often as they
/// like.
pub type ProgressCallback = Arc<dyn Fn(u8, Option<String>) + Send + Sync>;

pub fn noop_progress() -> ProgressCallback {
    Arc::new(|_, _| {})
}
