use thiserror::Error;

/// Error for outbound email operations.
///
/// Failures are recoverable: callers roll back whatever the email was meant
/// to announce and report the failure upstream.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EmailDeliveryError {
    #[error("Email rejected: {0}")]
    Rejected(String),

    #[error("Email transport unavailable: {0}")]
    Unavailable(String),
}
