/// Errors that can occur within the notification subsystem.
///
/// # Examples
///
/// ```rust
/// use adshield_notify::error::NotifyError;
///
/// let err = NotifyError::Api { status: 404, body: "no_service".to_string() };
/// assert!(err.to_string().contains("404"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// An HTTP transport error from `reqwest` (connect, timeout, TLS).
    #[error("notify: HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The webhook endpoint returned a non-success status.
    #[error("notify: webhook rejected message: status={status}, body={body}")]
    Api { status: u16, body: String },

    /// A recipient address could not be parsed.
    #[error("notify: invalid address '{0}'")]
    InvalidAddress(String),

    /// SMTP transport error when sending digest email.
    #[error("notify: SMTP error: {0}")]
    Smtp(String),
}

/// Convenience `Result` alias for notification operations.
pub type Result<T> = std::result::Result<T, NotifyError>;
