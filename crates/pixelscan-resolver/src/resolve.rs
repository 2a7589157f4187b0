//! Resolving a normalized domain to a reachable address.

use crate::error::{FailedCandidate, ResolutionError};
use crate::normalize::Domain;
use crate::probe::{ProbeMethod, Prober};
use std::sync::Arc;
use tracing::{debug, info};

/// Host prefixes commonly bolted onto healthcare portals.
const PORTAL_PREFIXES: &[&str] = &["my", "portal", "patient"];

/// A candidate that answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    /// Candidate that answered
    pub candidate: String,
    /// Address after redirects, used for navigation
    pub url: String,
    /// Candidates that failed before this one
    pub failed: Vec<FailedCandidate>,
}

/// Ordered candidate addresses for a domain.
///
/// `https` before `http`, `www.` before bare host. IP literals and
/// `localhost` get no `www.` variants.
#[must_use]
pub fn candidates(domain: &Domain) -> Vec<String> {
    let host = domain.host();
    let path = domain.path().unwrap_or_default();

    let hosts: Vec<String> = if domain.is_local_or_ip() || host.starts_with("www.") {
        vec![host.to_string()]
    } else {
        vec![format!("www.{host}"), host.to_string()]
    };

    ["https", "http"]
        .iter()
        .flat_map(|scheme| hosts.iter().map(move |h| format!("{scheme}://{h}{path}")))
        .collect()
}

/// Nearby domains worth suggesting when a domain cannot be reached.
#[must_use]
pub fn suggest_alternatives(domain: &Domain) -> Vec<String> {
    let host = domain.host();
    let mut suggestions = Vec::new();

    if let Some(stem) = host.strip_suffix(".com") {
        suggestions.push(format!("{stem}.org"));
    } else if let Some(stem) = host.strip_suffix(".org") {
        suggestions.push(format!("{stem}.com"));
    }

    for prefix in PORTAL_PREFIXES {
        if let Some(rest) = host.strip_prefix(&format!("{prefix}.")) {
            if rest.contains('.') {
                suggestions.push(rest.to_string());
            }
        }
    }

    suggestions.truncate(3);
    suggestions
}

/// Finds the first candidate address that answers a connectivity probe.
#[derive(Clone)]
pub struct Resolver {
    prober: Arc<dyn Prober>,
}

impl Resolver {
    #[must_use]
    pub fn new(prober: Arc<dyn Prober>) -> Self {
        Self { prober }
    }

    /// Probe candidates in order and return the first reachable one.
    ///
    /// # Errors
    /// Returns [`ResolutionError`] listing every candidate and why it failed
    /// when none answers.
    pub async fn resolve(&self, domain: &Domain) -> Result<Resolved, ResolutionError> {
        let mut failed = Vec::new();

        for candidate in candidates(domain) {
            match self.prober.probe(&candidate, ProbeMethod::Head).await {
                Ok(response) if is_reachable(response.status) => {
                    debug!(
                        domain = %domain,
                        candidate = %candidate,
                        status = response.status,
                        "candidate reachable"
                    );
                    return Ok(Resolved {
                        candidate,
                        url: response.final_url,
                        failed,
                    });
                }
                Ok(response) => failed.push(FailedCandidate {
                    url: candidate,
                    reason: format!("status {}", response.status),
                }),
                Err(e) => failed.push(FailedCandidate {
                    url: candidate,
                    reason: e.to_string(),
                }),
            }
        }

        let alternatives = suggest_alternatives(domain);
        if !alternatives.is_empty() {
            info!(domain = %domain, ?alternatives, "no reachable variant, possible alternatives");
        }

        Err(ResolutionError {
            domain: domain.to_string(),
            attempts: failed,
        })
    }
}

/// Any response below 400 counts, as do statuses that prove a live server
/// rejecting `HEAD` or non-browser clients.
fn is_reachable(status: u16) -> bool {
    status < 400 || matches!(status, 401 | 403 | 405 | 429)
}
