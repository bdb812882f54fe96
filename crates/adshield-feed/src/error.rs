/// Errors raised when reading an alert feed.
///
/// Row-level problems never surface here: a malformed row is logged and
/// skipped so one bad line cannot block a company's whole feed. Only
/// transport and feed-level failures are errors.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    /// HTTP transport failure from `reqwest`.
    #[error("feed: network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The feed endpoint answered with a non-success status.
    #[error("feed: fetch failed with status {status}")]
    Http { status: u16 },

    /// The response is not parseable as CSV at all (e.g. no header row).
    #[error("feed: malformed feed: {0}")]
    Malformed(String),
}

/// Convenience `Result` alias for feed operations.
pub type Result<T> = std::result::Result<T, FeedError>;
