#![warn(clippy::unwrap_used)]

//! Platform adapters. Each one translates a heterogeneous ad-platform API
//! into the uniform `Arm`/`Allocation`/`PlatformSignal` shapes the rest of
//! the optimizer works with. Adapters never propagate a transport error
//! upward unhandled — callers get a typed `AdapterError` instead.

pub mod error;
pub mod normalize;
pub mod search;
pub mod social;

pub use error::AdapterError;
pub use search::SearchAdapter;
pub use social::SocialAdapter;

use adpilot_core::types::{Arm, PlatformSignal, TimeWindow};
use async_trait::async_trait;

/// What every platform adapter can do. Implementations own their own HTTP
/// client and credentials; the optimizer only ever talks through this
/// trait.
#[async_trait]
pub trait PlatformAdapter: Send + Sync {
    /// Pull normalized arms for the given account/time window/level.
    async fn fetch_insights(
        &self,
        account_id: &str,
        window: &TimeWindow,
        level: &str,
    ) -> Result<Vec<Arm>, AdapterError>;

    /// Push a new daily budget for one arm. Returns `Ok` with the platform's
    /// confirmation, or an `AdapterError::Pending` when the write could not
    /// be completed but should not count as a failure (e.g. missing a
    /// platform-specific id mapping).
    async fn update_budget(&self, arm_id: &str, new_daily_budget: f64) -> Result<(), AdapterError>;

    /// Upload a classified conversion signal.
    async fn upload_conversion(&self, signal: &PlatformSignal) -> Result<(), AdapterError>;
}
