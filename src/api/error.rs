use std::fmt;

/// Upstream fetch failures. Clone-able so results can travel through
/// shared in-flight futures; the handler layer owns the mapping to HTTP
/// statuses.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchError {
    /// Item ids are strictly positive.
    InvalidId(u32),
    /// Upstream answered with a non-2xx status.
    Status(u16),
    /// The per-request deadline elapsed.
    Timeout,
    /// The response body exceeded its byte cap.
    TooLarge,
    /// The body was not the JSON we expected.
    Decode(String),
    /// Connection-level failure.
    Transport(String),
    /// The request-scoped token was cancelled.
    Cancelled,
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::InvalidId(id) => write!(f, "invalid item id {id}"),
            FetchError::Status(code) => write!(f, "upstream returned status {code}"),
            FetchError::Timeout => write!(f, "upstream request timed out"),
            FetchError::TooLarge => write!(f, "upstream response exceeded the size cap"),
            FetchError::Decode(msg) => write!(f, "failed to decode upstream response: {msg}"),
            FetchError::Transport(msg) => write!(f, "upstream request failed: {msg}"),
            FetchError::Cancelled => write!(f, "request cancelled"),
        }
    }
}

impl std::error::Error for FetchError {}

impl FetchError {
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else if let Some(status) = err.status() {
            FetchError::Status(status.as_u16())
        } else {
            FetchError::Transport(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_short_and_human() {
        assert_eq!(
            FetchError::Status(503).to_string(),
            "upstream returned status 503"
        );
        assert_eq!(FetchError::Timeout.to_string(), "upstream request timed out");
    }
}
