//! The external allocation oracle seam. Unused today, but the Allocator is
//! built so a learned or hosted policy can be swapped in without touching
//! callers — see the decision recorded for this in the design notes.

use adpilot_core::types::{Allocation, Arm, Goal};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OracleError {
    #[error("no allocation oracle is configured")]
    Unconfigured,
    #[error("oracle call failed: {0}")]
    Failed(String),
}

pub trait AllocatorOracle: Send + Sync {
    fn allocate(&self, arms: &[Arm], total_budget: f64, goal: Goal) -> Result<Vec<Allocation>, OracleError>;
}

/// The default oracle: always declines, so callers fall through to the
/// deterministic or bandit strategies configured locally.
pub struct NullOracle;

impl AllocatorOracle for NullOracle {
    fn allocate(&self, _arms: &[Arm], _total_budget: f64, _goal: Goal) -> Result<Vec<Allocation>, OracleError> {
        Err(OracleError::Unconfigured)
    }
}
