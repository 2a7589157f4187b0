//! Cheap pre-flight check run before a browser session is spent on a target.

use crate::normalize::Domain;
use crate::probe::{ProbeMethod, Prober};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Response time above which a live site is flagged as slow.
pub const SLOW_RESPONSE: Duration = Duration::from_secs(5);

const BOT_PROTECTION_STATUSES: &[u16] = &[403, 429, 503];

const BOT_PROTECTION_MARKERS: &[&str] = &[
    "cloudflare",
    "captcha",
    "challenge",
    "rate limit",
    "too many requests",
    "access denied",
    "checking your browser",
];

/// Result of a health check.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HealthReport {
    pub dns_resolves: bool,
    /// Got any HTTP response at all
    pub http_alive: bool,
    pub status: Option<u16>,
    pub response_time: Duration,
    pub bot_protection: bool,
    pub final_url: Option<String>,
    pub error: Option<String>,
}

impl HealthReport {
    /// The target should not get a browser session.
    #[must_use]
    pub fn should_skip(&self) -> bool {
        !self.dns_resolves || (!self.http_alive && !self.bot_protection)
    }

    /// The target is alive but likely to need retries (protected or slow).
    #[must_use]
    pub fn should_retry(&self) -> bool {
        self.http_alive && (self.bot_protection || self.response_time > SLOW_RESPONSE)
    }

    /// DNS confirmed the host does not exist; retrying cannot help.
    #[must_use]
    pub fn is_permanent(&self) -> bool {
        !self.dns_resolves
    }
}

/// Runs DNS and HTTP pre-checks through a [`Prober`].
#[derive(Clone)]
pub struct HealthChecker {
    prober: Arc<dyn Prober>,
}

impl HealthChecker {
    #[must_use]
    pub fn new(prober: Arc<dyn Prober>) -> Self {
        Self { prober }
    }

    pub async fn check(&self, domain: &Domain) -> HealthReport {
        let host = domain.host();

        if let Err(e) = self.prober.lookup_host(host).await {
            warn!(domain = %domain, error = %e, "DNS check failed");
            return HealthReport {
                error: Some(e.to_string()),
                ..HealthReport::default()
            };
        }

        let path = domain.path().unwrap_or_default();
        let mut last_error = None;

        for scheme in ["https", "http"] {
            let url = format!("{scheme}://{host}{path}");
            match self.prober.probe(&url, ProbeMethod::Get).await {
                Ok(response) => {
                    let bot_protection = BOT_PROTECTION_STATUSES.contains(&response.status)
                        || response
                            .body_sample
                            .as_deref()
                            .is_some_and(|body| {
                                BOT_PROTECTION_MARKERS.iter().any(|m| body.contains(m))
                            });

                    let report = HealthReport {
                        dns_resolves: true,
                        http_alive: true,
                        status: Some(response.status),
                        response_time: response.elapsed,
                        bot_protection,
                        final_url: Some(response.final_url),
                        error: None,
                    };

                    if report.should_retry() {
                        info!(
                            domain = %domain,
                            bot_protection,
                            response_time = ?report.response_time,
                            "alive but expect retries"
                        );
                    }
                    return report;
                }
                Err(e) => last_error = Some(e.to_string()),
            }
        }

        warn!(domain = %domain, error = ?last_error, "HTTP check failed");
        HealthReport {
            dns_resolves: true,
            error: last_error,
            ..HealthReport::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skip_rules() {
        let dead_dns = HealthReport::default();
        assert!(dead_dns.should_skip());
        assert!(dead_dns.is_permanent());

        let no_http = HealthReport {
            dns_resolves: true,
            ..HealthReport::default()
        };
        assert!(no_http.should_skip());
        assert!(!no_http.is_permanent());

        let protected = HealthReport {
            dns_resolves: true,
            http_alive: true,
            status: Some(403),
            bot_protection: true,
            ..HealthReport::default()
        };
        assert!(!protected.should_skip());
        assert!(protected.should_retry());
    }

    #[test]
    fn test_slow_site_should_retry() {
        let slow = HealthReport {
            dns_resolves: true,
            http_alive: true,
            status: Some(200),
            response_time: Duration::from_secs(7),
            ..HealthReport::default()
        };
        assert!(!slow.should_skip());
        assert!(slow.should_retry());

        let fast = HealthReport {
            response_time: Duration::from_millis(300),
            ..slow
        };
        assert!(!fast.should_retry());
    }
}
