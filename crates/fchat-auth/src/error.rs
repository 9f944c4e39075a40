//! Error types for the auth layer.

/// Errors that can occur while obtaining a ticket or calling the
/// account API.
///
/// `Clone` because a single in-flight refresh hands the same outcome to
/// every caller waiting on it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// The endpoint answered with an `error` field, e.g. bad password.
    #[error("request rejected: {0}")]
    Rejected(String),

    /// The endpoint answered, but not with anything we can use.
    #[error("unable to parse response: {0}")]
    Unparsable(String),

    /// The HTTP round trip itself failed.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// The background refresh task died before producing a result.
    #[error("ticket refresh aborted: {0}")]
    Aborted(String),
}
