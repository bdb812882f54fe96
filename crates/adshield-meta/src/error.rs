/// Errors from the Meta Graph read API.
///
/// # Examples
///
/// ```rust
/// use adshield_meta::error::MetaError;
///
/// let err = MetaError::Http { status: 400, body: "(#100) bad field".to_string() };
/// assert!(err.to_string().contains("400"));
/// assert!(!err.is_retryable());
/// ```
#[derive(Debug, thiserror::Error)]
pub enum MetaError {
    /// Non-2xx status from the Graph API, body included for diagnosis.
    #[error("meta: API HTTP error: status={status}, body={body}")]
    Http { status: u16, body: String },

    /// Underlying transport error from `reqwest`.
    #[error("meta: network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The response payload did not have the expected shape.
    #[error("meta: unexpected response: {0}")]
    UnexpectedResponse(String),
}

impl MetaError {
    /// Whether a retry may help: throttling, server errors, and transport
    /// failures. Client errors (4xx other than 429) never retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            MetaError::Http { status, .. } => *status == 429 || (500..600).contains(status),
            MetaError::Network(_) => true,
            MetaError::UnexpectedResponse(_) => false,
        }
    }
}

/// Convenience `Result` alias for Graph API operations.
pub type Result<T> = std::result::Result<T, MetaError>;
