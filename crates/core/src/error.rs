use thiserror::Error;

pub type AdPilotResult<T> = Result<T, AdPilotError>;

/// Cycle-level control-flow failures — the ones that prevent `run_cycle`
/// from producing a `CycleReport` at all. Everything that happens *inside*
/// a cycle (a platform fetch failing, a record being malformed, a budget
/// write being rejected or pending) is a per-platform or per-arm outcome,
/// not a cycle failure, and is reported through `CycleReport`/`ApplyOutcome`
/// instead — the cycle is designed to finish and report even when some of
/// its parts failed.
#[derive(Error, Debug)]
pub enum AdPilotError {
    /// A second cycle was attempted for an account already running one.
    #[error("a cycle is already running for account {0}")]
    CycleBusy(String),
}
