#![warn(clippy::unwrap_used)]

//! Rule-based auditing: ROI/tracking health checks over arms, and business
//! event classification into platform conversion signals. Both are pure,
//! deterministic, and independent of the allocator.

pub mod roi;
pub mod signals;

pub use roi::{run_audit, AuditReport, PlatformTrackingConfig};
pub use signals::{generate_signals, SignalGenerationResult};
