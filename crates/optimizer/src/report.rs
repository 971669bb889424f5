use adpilot_core::types::{Allocation, Arm, Platform};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleStatus {
    /// Every arm was fetched, allocated, and applied without error.
    Success,
    /// At least one apply succeeded and at least one failed or is pending.
    Partial,
    /// Fetch succeeded but produced no arms to optimize.
    NoData,
    /// The cycle was cancelled before it could apply any changes.
    Cancelled,
}

#[derive(Debug, Clone)]
pub enum ApplyOutcome {
    Success,
    Pending(String),
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct ApplyResult {
    pub arm_id: String,
    pub platform: Platform,
    pub outcome: ApplyOutcome,
}

#[derive(Debug, Clone, Default)]
pub struct ApplySummary {
    pub succeeded: usize,
    pub pending: usize,
    pub failed: usize,
    pub results: Vec<ApplyResult>,
}

impl ApplySummary {
    pub fn record(&mut self, result: ApplyResult) {
        match &result.outcome {
            ApplyOutcome::Success => self.succeeded += 1,
            ApplyOutcome::Pending(_) => self.pending += 1,
            ApplyOutcome::Failed(_) => self.failed += 1,
        }
        self.results.push(result);
    }
}

#[derive(Debug, Clone)]
pub struct CycleReport {
    pub status: CycleStatus,
    pub arms_processed: usize,
    /// The arms this cycle fetched, kept around so callers can run the
    /// audit battery over the same data without a second fetch.
    pub arms: Vec<Arm>,
    pub allocations: Vec<Allocation>,
    pub applied: ApplySummary,
    pub timestamp: DateTime<Utc>,
}
