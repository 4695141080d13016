/// The sum-type result of running one stage, in place of exceptions for
/// control flow (§9): the orchestrator switches on this rather than
/// catching errors.
#[derive(Debug)]
pub enum StageOutcome {
    Completed,
    Skipped,
    Failed(String),
    Cancelled,
}
