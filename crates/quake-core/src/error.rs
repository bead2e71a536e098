use thiserror::Error;

/// Reasons a fetched feed document cannot become an overlay.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("feed document is not a readable feature collection")]
    Malformed(#[from] serde_json::Error),
    #[error("feed document contains no usable {kind} features")]
    Empty { kind: &'static str },
    #[error("feed request failed: {0}")]
    Unavailable(String),
}
