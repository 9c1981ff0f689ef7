//! Typed provider failures.
//!
//! Adapters classify every vendor failure into an [`ErrorKind`] so the router
//! can pattern-match instead of sniffing exception text: retry a sibling
//! provider for transient kinds, reject immediately for bad input.

use std::time::Duration;

/// Classification of a provider failure, by vendor-reported status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad or missing credential (401/403). Not retried against the same
    /// provider; siblings are still tried.
    Unauthorized,
    /// Vendor rate limit (429). Retryable; multi-key providers rotate first.
    RateLimited,
    /// Vendor outage or timeout (5xx/408, transport errors). Retryable.
    ServiceUnavailable,
    /// Caller error (400/404/422). Never retried anywhere.
    InvalidInput,
    /// Unclassifiable. Retried once, then surfaced.
    Unknown,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unauthorized => "unauthorized",
            Self::RateLimited => "rate_limited",
            Self::ServiceUnavailable => "service_unavailable",
            Self::InvalidInput => "invalid_input",
            Self::Unknown => "unknown",
        }
    }

    /// Whether the router may retry the same provider for this kind.
    pub fn retryable_same_provider(self) -> bool {
        matches!(self, Self::RateLimited | Self::ServiceUnavailable)
    }

    /// Whether the router may walk the fallback list after this kind.
    /// Everything except a caller error is worth a sibling attempt.
    pub fn routes_to_fallback(self) -> bool {
        self != Self::InvalidInput
    }
}

/// A classified provider failure.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{provider} {}: {message}", self.kind.as_str())]
pub struct ProviderError {
    provider: &'static str,
    kind: ErrorKind,
    message: String,
    retry_after: Option<Duration>,
}

impl ProviderError {
    pub fn new(provider: &'static str, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            provider,
            kind,
            message: message.into(),
            retry_after: None,
        }
    }

    pub fn unauthorized(provider: &'static str, message: impl Into<String>) -> Self {
        Self::new(provider, ErrorKind::Unauthorized, message)
    }

    pub fn rate_limited(
        provider: &'static str,
        message: impl Into<String>,
        retry_after: Option<Duration>,
    ) -> Self {
        Self {
            provider,
            kind: ErrorKind::RateLimited,
            message: message.into(),
            retry_after,
        }
    }

    pub fn unavailable(provider: &'static str, message: impl Into<String>) -> Self {
        Self::new(provider, ErrorKind::ServiceUnavailable, message)
    }

    pub fn invalid_input(provider: &'static str, message: impl Into<String>) -> Self {
        Self::new(provider, ErrorKind::InvalidInput, message)
    }

    /// Classify a non-success HTTP response by status code and body hints.
    pub fn from_status(provider: &'static str, status: u16, body: &str) -> Self {
        let message = super::sanitize_api_error(body);
        let kind = classify_status(status, &message);
        let retry_after = (kind == ErrorKind::RateLimited)
            .then(|| parse_retry_after(&message))
            .flatten();
        Self {
            provider,
            kind,
            message: format!("HTTP {status}: {message}"),
            retry_after,
        }
    }

    /// Classify a transport-level reqwest failure (DNS, TLS, timeout, ...).
    pub fn from_transport(provider: &'static str, err: &reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return Self::from_status(provider, status.as_u16(), &err.to_string());
        }
        let kind = if err.is_timeout() || err.is_connect() {
            ErrorKind::ServiceUnavailable
        } else {
            ErrorKind::Unknown
        };
        Self::new(provider, kind, super::sanitize_api_error(&err.to_string()))
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn provider(&self) -> &'static str {
        self.provider
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn retry_after(&self) -> Option<Duration> {
        self.retry_after
    }

    pub fn with_retry_after(mut self, retry_after: Duration) -> Self {
        self.retry_after = Some(retry_after);
        self
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;

fn classify_status(status: u16, message: &str) -> ErrorKind {
    match status {
        401 | 403 => ErrorKind::Unauthorized,
        429 => ErrorKind::RateLimited,
        408 => ErrorKind::ServiceUnavailable,
        400 | 404 | 413 | 422 => ErrorKind::InvalidInput,
        s if (500..600).contains(&s) => ErrorKind::ServiceUnavailable,
        // Some vendors return 200-range statuses we never see here, or odd
        // codes with an auth message in the body.
        _ if looks_like_auth_failure(message) => ErrorKind::Unauthorized,
        _ => ErrorKind::Unknown,
    }
}

/// Keyword detection for auth failures reported without a usable status.
fn looks_like_auth_failure(message: &str) -> bool {
    let lower = message.to_lowercase();
    [
        "invalid api key",
        "incorrect api key",
        "missing api key",
        "api key not set",
        "authentication failed",
        "unauthorized",
        "forbidden",
        "permission denied",
        "access denied",
        "invalid token",
    ]
    .iter()
    .any(|hint| lower.contains(hint))
}

/// Extract a Retry-After value (seconds, possibly fractional) embedded in an
/// error body, e.g. `Retry-After: 5` or `"retry_after": 2.5`.
pub fn parse_retry_after(message: &str) -> Option<Duration> {
    let lower = message.to_lowercase();
    for prefix in &["retry-after:", "retry_after:", "retry-after ", "retry_after "] {
        if let Some(pos) = lower.find(prefix) {
            let after = &message[pos + prefix.len()..];
            let num: String = after
                .trim_start_matches(|c: char| c == '"' || c.is_whitespace())
                .chars()
                .take_while(|c| c.is_ascii_digit() || *c == '.')
                .collect();
            if let Ok(secs) = num.parse::<f64>() {
                if secs.is_finite() && secs >= 0.0 {
                    return Some(Duration::from_secs_f64(secs));
                }
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classification() {
        assert_eq!(
            ProviderError::from_status("openai", 401, "bad key").kind(),
            ErrorKind::Unauthorized
        );
        assert_eq!(
            ProviderError::from_status("openai", 403, "forbidden").kind(),
            ErrorKind::Unauthorized
        );
        assert_eq!(
            ProviderError::from_status("groq", 429, "slow down").kind(),
            ErrorKind::RateLimited
        );
        assert_eq!(
            ProviderError::from_status("gemini", 500, "boom").kind(),
            ErrorKind::ServiceUnavailable
        );
        assert_eq!(
            ProviderError::from_status("gemini", 408, "timeout").kind(),
            ErrorKind::ServiceUnavailable
        );
        assert_eq!(
            ProviderError::from_status("anthropic", 400, "bad request").kind(),
            ErrorKind::InvalidInput
        );
    }

    #[test]
    fn auth_hints_without_status() {
        assert_eq!(
            ProviderError::from_status("hf", 418, "invalid api key provided").kind(),
            ErrorKind::Unauthorized
        );
        assert_eq!(
            ProviderError::from_status("hf", 418, "teapot").kind(),
            ErrorKind::Unknown
        );
    }

    #[test]
    fn retry_after_integer_and_float() {
        assert_eq!(
            parse_retry_after("429 Too Many Requests, Retry-After: 5"),
            Some(Duration::from_secs(5))
        );
        assert_eq!(
            parse_retry_after("rate limited. retry_after: 2.5 seconds"),
            Some(Duration::from_secs_f64(2.5))
        );
        assert_eq!(parse_retry_after("500 Internal Server Error"), None);
    }

    #[test]
    fn rate_limit_carries_retry_after_from_body() {
        let err = ProviderError::from_status("groq", 429, "Retry-After: 3");
        assert_eq!(err.retry_after(), Some(Duration::from_secs(3)));
    }

    #[test]
    fn fallback_routing_excludes_invalid_input() {
        assert!(ErrorKind::Unauthorized.routes_to_fallback());
        assert!(ErrorKind::RateLimited.routes_to_fallback());
        assert!(ErrorKind::ServiceUnavailable.routes_to_fallback());
        assert!(ErrorKind::Unknown.routes_to_fallback());
        assert!(!ErrorKind::InvalidInput.routes_to_fallback());
    }

    #[test]
    fn same_provider_retry_only_for_transient_kinds() {
        assert!(ErrorKind::RateLimited.retryable_same_provider());
        assert!(ErrorKind::ServiceUnavailable.retryable_same_provider());
        assert!(!ErrorKind::Unauthorized.retryable_same_provider());
        assert!(!ErrorKind::InvalidInput.retryable_same_provider());
    }

    #[test]
    fn display_includes_provider_and_kind() {
        let err = ProviderError::unavailable("gemini", "overloaded");
        let text = err.to_string();
        assert!(text.contains("gemini"));
        assert!(text.contains("service_unavailable"));
        assert!(text.contains("overloaded"));
    }
}
