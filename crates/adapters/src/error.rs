use thiserror::Error;

/// Adapter-local error taxonomy. The optimization loop maps these onto its
/// own per-arm/per-platform outcome accounting; nothing here propagates as
/// a panic or an unhandled exception.
#[derive(Error, Debug)]
pub enum AdapterError {
    #[error("http transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("platform returned an error response: {0}")]
    PlatformResponse(String),

    #[error("malformed payload: {0}")]
    Malformed(String),

    /// The write could not be completed, but not because anything failed —
    /// e.g. the search adapter has no budget_id mapping yet for this arm.
    #[error("operation pending: {0}")]
    Pending(String),
}
