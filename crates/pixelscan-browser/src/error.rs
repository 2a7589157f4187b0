use pixelscan_core::ErrorKind;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, BrowserError>;

/// Page markers of an anti-bot interstitial.
const CHALLENGE_MARKERS: &[&str] = &[
    "cloudflare",
    "captcha",
    "checking your browser",
    "access denied",
    "just a moment",
    "too many requests",
];

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("chromium error: {0}")]
    ChromiumError(String),

    #[error("browser launch failed: {0}")]
    LaunchFailed(String),

    #[error("script evaluation failed: {0}")]
    EvaluationFailed(String),

    #[error("session already closed")]
    SessionClosed,

    #[error("session pool closed")]
    PoolClosed,

    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error(transparent)]
    Navigation(#[from] NavigationError),
}

/// Why a page could not be loaded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NavigationError {
    #[error("navigation timed out")]
    Timeout,

    #[error("dns lookup failed: {0}")]
    Dns(String),

    #[error("tls handshake failed: {0}")]
    Tls(String),

    #[error("connection failed: {0}")]
    Unreachable(String),

    #[error("http {status}")]
    Http4xx { status: u16 },

    #[error("http {status}")]
    Http5xx { status: u16 },

    #[error("blocked by bot protection (http {status})")]
    BotBlocked { status: u16 },
}

impl NavigationError {
    /// Whether another attempt could plausibly succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        !matches!(self, Self::Http4xx { .. })
    }

    /// Kind recorded in the scan output.
    #[must_use]
    pub fn error_kind(&self) -> ErrorKind {
        match self {
            Self::Timeout => ErrorKind::Timeout,
            Self::Dns(_) => ErrorKind::Dns,
            Self::Tls(_) => ErrorKind::Tls,
            Self::Unreachable(_) => ErrorKind::Unreachable,
            Self::Http4xx { .. } => ErrorKind::Http4xx,
            Self::Http5xx { .. } => ErrorKind::Http5xx,
            Self::BotBlocked { .. } => ErrorKind::BotBlocked,
        }
    }

    /// Classify a CDP navigation error by its `net::ERR_*` text.
    #[must_use]
    pub fn from_net_error(text: &str) -> Self {
        let upper = text.to_ascii_uppercase();
        if upper.contains("ERR_NAME_NOT_RESOLVED") || upper.contains("ERR_NAME_RESOLUTION_FAILED") {
            Self::Dns(text.to_string())
        } else if upper.contains("ERR_CERT_") || upper.contains("ERR_SSL_") {
            Self::Tls(text.to_string())
        } else if upper.contains("ERR_TIMED_OUT") || upper.contains("TIMEOUT") {
            Self::Timeout
        } else {
            Self::Unreachable(text.to_string())
        }
    }

    /// Classify the main document's status, given the rendered page.
    ///
    /// Returns `None` for statuses below 400.
    #[must_use]
    pub fn from_status(status: u16, content: &str) -> Option<Self> {
        if status < 400 {
            return None;
        }
        if matches!(status, 403 | 429 | 503) && has_challenge_marker(content) {
            return Some(Self::BotBlocked { status });
        }
        if status >= 500 {
            Some(Self::Http5xx { status })
        } else {
            Some(Self::Http4xx { status })
        }
    }
}

fn has_challenge_marker(content: &str) -> bool {
    let lowered = content.to_lowercase();
    CHALLENGE_MARKERS.iter().any(|m| lowered.contains(m))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BrowserError::LaunchFailed("no chrome binary".to_string());
        assert_eq!(err.to_string(), "browser launch failed: no chrome binary");
        let err: BrowserError = NavigationError::Http4xx { status: 404 }.into();
        assert_eq!(err.to_string(), "http 404");
    }

    #[test]
    fn test_net_error_classification() {
        assert_eq!(
            NavigationError::from_net_error("net::ERR_NAME_NOT_RESOLVED").error_kind(),
            ErrorKind::Dns
        );
        assert_eq!(
            NavigationError::from_net_error("net::ERR_CERT_AUTHORITY_INVALID").error_kind(),
            ErrorKind::Tls
        );
        assert_eq!(
            NavigationError::from_net_error("net::ERR_SSL_PROTOCOL_ERROR").error_kind(),
            ErrorKind::Tls
        );
        assert_eq!(
            NavigationError::from_net_error("net::ERR_TIMED_OUT"),
            NavigationError::Timeout
        );
        assert_eq!(
            NavigationError::from_net_error("net::ERR_CONNECTION_REFUSED").error_kind(),
            ErrorKind::Unreachable
        );
    }

    #[test]
    fn test_status_classification() {
        assert_eq!(NavigationError::from_status(200, ""), None);
        assert_eq!(NavigationError::from_status(301, ""), None);
        assert_eq!(
            NavigationError::from_status(404, "<h1>Not found</h1>"),
            Some(NavigationError::Http4xx { status: 404 })
        );
        assert_eq!(
            NavigationError::from_status(503, "<title>Just a moment...</title>"),
            Some(NavigationError::BotBlocked { status: 503 })
        );
        assert_eq!(
            NavigationError::from_status(503, "maintenance"),
            Some(NavigationError::Http5xx { status: 503 })
        );
        assert_eq!(
            NavigationError::from_status(403, "Attention Required! | Cloudflare"),
            Some(NavigationError::BotBlocked { status: 403 })
        );
    }

    #[test]
    fn test_transient_classification() {
        assert!(NavigationError::Timeout.is_transient());
        assert!(NavigationError::Tls("x".into()).is_transient());
        assert!(NavigationError::Http5xx { status: 502 }.is_transient());
        assert!(NavigationError::BotBlocked { status: 429 }.is_transient());
        assert!(!NavigationError::Http4xx { status: 410 }.is_transient());
    }
}
