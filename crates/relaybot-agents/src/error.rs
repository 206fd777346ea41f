/// Substrings that mark a backend failure as quota related.
pub const RATE_LIMIT_INDICATORS: [&str; 6] = [
    "rate limit",
    "quota",
    "limit exceeded",
    "too many requests",
    "429",
    "insufficient quota",
];

/// Case-insensitive check of `text` against [`RATE_LIMIT_INDICATORS`].
pub fn is_rate_limit_text(text: &str) -> bool {
    let lowered = text.to_lowercase();
    RATE_LIMIT_INDICATORS
        .iter()
        .any(|indicator| lowered.contains(indicator))
}

/// Failure of a single completion call or of a whole dispatch.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DispatchError {
    #[error("failed to encode request: {0}")]
    Encoding(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("API error: {message} (HTTP {status})")]
    Api { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("failed to decode response: {0}")]
    Decoding(String),

    #[error("empty response")]
    EmptyResponse,

    #[error("all {attempts} API keys are rate limited (last error: {last})")]
    Exhausted { attempts: usize, last: String },
}

impl DispatchError {
    /// Whether rotating to another key may help.
    ///
    /// Only what the backend itself reported counts: the status line of an
    /// HTTP error, or the message and status of a structured API error.
    /// Locally produced errors carry parser positions and URLs, so they
    /// never qualify.
    pub fn is_rate_limit(&self) -> bool {
        match self {
            Self::Http(status_line) => is_rate_limit_text(status_line),
            Self::Api { status, message } => *status == 429 || is_rate_limit_text(message),
            Self::Encoding(_)
            | Self::Network(_)
            | Self::Decoding(_)
            | Self::EmptyResponse
            | Self::Exhausted { .. } => false,
        }
    }

    /// Short explanation suitable for showing to the chat user.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Encoding(_) => "Could not prepare the request.",
            Self::Network(_) => "Looks like the connection to the AI service dropped.",
            Self::Api { .. } | Self::Http(_) | Self::Decoding(_) => {
                "The AI service returned an error."
            }
            Self::EmptyResponse => "The AI service returned an empty reply.",
            Self::Exhausted { .. } => "All API keys have hit their limits, try again later.",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indicators_match_case_insensitively() {
        assert!(is_rate_limit_text("Rate Limit exceeded: free-models-per-day"));
        assert!(is_rate_limit_text("INSUFFICIENT QUOTA"));
        assert!(is_rate_limit_text("Too Many Requests"));
        assert!(is_rate_limit_text("status 429"));
        assert!(!is_rate_limit_text("invalid api key"));
    }

    #[test]
    fn http_429_status_line_is_rate_limit() {
        let err = DispatchError::Http("429 Too Many Requests".into());
        assert!(err.is_rate_limit());
        let err = DispatchError::Http("500 Internal Server Error".into());
        assert!(!err.is_rate_limit());
    }

    #[test]
    fn api_error_classified_by_message_and_status() {
        let quota = DispatchError::Api {
            status: 402,
            message: "You exceeded your current quota".into(),
        };
        assert!(quota.is_rate_limit());

        let provider = DispatchError::Api {
            status: 429,
            message: "Provider returned error".into(),
        };
        assert!(provider.is_rate_limit());

        let auth = DispatchError::Api {
            status: 401,
            message: "No auth credentials found".into(),
        };
        assert!(!auth.is_rate_limit());
    }

    #[test]
    fn terminal_errors_are_never_rate_limit() {
        assert!(!DispatchError::EmptyResponse.is_rate_limit());
        assert!(!DispatchError::Encoding("quota".into()).is_rate_limit());
        let exhausted = DispatchError::Exhausted {
            attempts: 3,
            last: "429 Too Many Requests".into(),
        };
        assert!(!exhausted.is_rate_limit());
    }

    #[test]
    fn local_diagnostics_never_look_like_rate_limits() {
        let decoding =
            DispatchError::Decoding("expected value at line 1 column 429".into());
        assert!(!decoding.is_rate_limit());

        let network = DispatchError::Network(
            "error sending request for url (http://127.0.0.1:4290/v1/chat/completions)".into(),
        );
        assert!(!network.is_rate_limit());
    }

    #[test]
    fn timeouts_are_not_rate_limit() {
        let err = DispatchError::Network("request timed out after 60s".into());
        assert!(!err.is_rate_limit());
        assert!(!err.user_message().is_empty());
    }
}
