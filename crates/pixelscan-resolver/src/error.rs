use thiserror::Error;

/// Input could not be turned into a scannable domain.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("empty target")]
    Empty,

    #[error("placeholder value: {0}")]
    Placeholder(String),

    #[error("looks like an email address: {0}")]
    Email(String),

    #[error("looks like a phone number: {0}")]
    Phone(String),

    #[error("invalid domain: {0}")]
    InvalidDomain(String),
}

/// One candidate address that did not answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedCandidate {
    pub url: String,
    pub reason: String,
}

/// Every candidate variant of a domain was tried and none was reachable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no reachable address for {domain} (tried {})", format_attempts(.attempts))]
pub struct ResolutionError {
    pub domain: String,
    pub attempts: Vec<FailedCandidate>,
}

impl ResolutionError {
    /// The candidate URLs in the order they were probed.
    #[must_use]
    pub fn attempted_urls(&self) -> Vec<&str> {
        self.attempts.iter().map(|a| a.url.as_str()).collect()
    }
}

fn format_attempts(attempts: &[FailedCandidate]) -> String {
    attempts
        .iter()
        .map(|a| format!("{}: {}", a.url, a.reason))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Low-level failure of a DNS lookup or HTTP probe.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeError {
    #[error("timed out")]
    Timeout,

    #[error("dns lookup failed: {0}")]
    Dns(String),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("tls failure: {0}")]
    Tls(String),

    #[error("too many redirects")]
    TooManyRedirects,

    #[error("request failed: {0}")]
    Other(String),
}

pub type ProbeResult<T> = std::result::Result<T, ProbeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_error_lists_every_attempt() {
        let err = ResolutionError {
            domain: "dead.example".to_string(),
            attempts: vec![
                FailedCandidate {
                    url: "https://www.dead.example".to_string(),
                    reason: "timed out".to_string(),
                },
                FailedCandidate {
                    url: "https://dead.example".to_string(),
                    reason: "status 404".to_string(),
                },
            ],
        };

        let msg = err.to_string();
        assert!(msg.starts_with("no reachable address for dead.example"));
        assert!(msg.contains("https://www.dead.example: timed out"));
        assert!(msg.contains("https://dead.example: status 404"));
        assert_eq!(
            err.attempted_urls(),
            vec!["https://www.dead.example", "https://dead.example"]
        );
    }

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::Email("ops@clinic.org".to_string());
        assert_eq!(err.to_string(), "looks like an email address: ops@clinic.org");
    }
}
