//! Single-domain scan pipeline.
//!
//! `PENDING → HEALTH_CHECK → RESOLVING → NAVIGATING → COLLECTING → DETECTING`
//! ending in `DONE` or `FAILED(kind)`. Every scan owns its evidence and its
//! browser session; the session is closed on every exit path.

use crate::result::{ScanMetadata, ScanResult};
use crate::retry::{sleep_or_cancel, RetryPolicy};
use crate::plan::ScanTarget;
use pixelscan_browser::{
    BrowserError, BrowserLauncher, BrowserSession, NavigationError, PageInfo, SessionGuard,
    SessionPool,
};
use pixelscan_core::{AppConfig, ErrorKind, ScanStatus};
use pixelscan_detectors::{Cookie, DetectorRegistry, Evidence};
use pixelscan_resolver::{Domain, HealthChecker, Prober, Resolver};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Settle window used for hosts the health check flagged as slow or guarded.
const GUARDED_SETTLE_FACTOR: u32 = 2;

/// Where a scan currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Pending,
    HealthCheck,
    Resolving,
    Navigating { attempt: u32 },
    Collecting,
    Detecting,
    Done,
    Failed(ErrorKind),
}

impl fmt::Display for ScanState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::HealthCheck => write!(f, "HEALTH_CHECK"),
            Self::Resolving => write!(f, "RESOLVING"),
            Self::Navigating { attempt } => write!(f, "NAVIGATING(attempt {})", attempt + 1),
            Self::Collecting => write!(f, "COLLECTING"),
            Self::Detecting => write!(f, "DETECTING"),
            Self::Done => write!(f, "DONE"),
            Self::Failed(kind) => write!(f, "FAILED({kind})"),
        }
    }
}

/// Timing and feature switches of the pipeline.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub health_check: bool,
    pub navigation_timeout: Duration,
    pub settle_window: Duration,
    pub retry: RetryPolicy,
    /// Directory for screenshots; `None` disables capture
    pub screenshot_dir: Option<PathBuf>,
}

impl PipelineSettings {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            health_check: config.scanning.health_check,
            navigation_timeout: config.scanning.navigation_timeout(),
            settle_window: config.scanning.settle_window(),
            retry: RetryPolicy::from_config(&config.retry),
            screenshot_dir: None,
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

/// A terminal failure of one scan.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ScanFailure {
    kind: ErrorKind,
    message: String,
}

impl ScanFailure {
    fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    fn cancelled() -> Self {
        Self::new(ErrorKind::Cancelled, "scan cancelled")
    }
}

/// Why one navigation attempt ended early.
#[derive(Debug)]
enum AttemptError {
    Navigation(NavigationError),
    Browser(BrowserError),
    Cancelled,
}

impl From<NavigationError> for AttemptError {
    fn from(e: NavigationError) -> Self {
        Self::Navigation(e)
    }
}

impl From<BrowserError> for AttemptError {
    fn from(e: BrowserError) -> Self {
        match e {
            BrowserError::Navigation(nav) => Self::Navigation(nav),
            other => Self::Browser(other),
        }
    }
}

/// Everything one successful attempt captured.
struct Collected {
    evidence: Evidence,
    page: PageInfo,
    page_load: Duration,
    screenshot: Option<String>,
}

/// Scans one domain end to end.
pub struct ScanPipeline {
    resolver: Resolver,
    health: HealthChecker,
    registry: Arc<DetectorRegistry>,
    pool: SessionPool,
    settings: PipelineSettings,
}

impl ScanPipeline {
    pub fn new(
        prober: Arc<dyn Prober>,
        pool: SessionPool,
        registry: Arc<DetectorRegistry>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            resolver: Resolver::new(Arc::clone(&prober)),
            health: HealthChecker::new(prober),
            registry,
            pool,
            settings,
        }
    }

    /// Build a pipeline from application config, with its own session pool.
    pub fn from_config(
        config: &AppConfig,
        prober: Arc<dyn Prober>,
        launcher: Arc<dyn BrowserLauncher>,
        registry: Arc<DetectorRegistry>,
    ) -> Self {
        let pool = SessionPool::new(
            launcher,
            config.browser.clone(),
            config.scanning.max_concurrent,
        );
        Self::new(prober, pool, registry, PipelineSettings::from_config(config))
    }

    #[must_use]
    pub fn with_screenshot_dir(mut self, dir: PathBuf) -> Self {
        self.settings.screenshot_dir = Some(dir);
        self
    }

    #[must_use]
    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Scan one target. Never fails: every outcome is a [`ScanResult`].
    pub async fn scan(&self, target: &ScanTarget, cancel: &CancellationToken) -> ScanResult {
        let mut result = ScanResult::started(target);
        let mut state = ScanState::Pending;
        debug!(domain = %target.domain, state = %state, "scan queued");

        match self.run(target, cancel, &mut state, &mut result).await {
            Ok(collected) => {
                transition(&mut state, ScanState::Detecting, &target.domain);
                self.detect(collected, &mut result);
                result.scan_status = ScanStatus::Success;
                transition(&mut state, ScanState::Done, &target.domain);
            }
            Err(failure) => {
                transition(&mut state, ScanState::Failed(failure.kind), &target.domain);
                result.scan_status = ScanStatus::Failed;
                result.error_kind = Some(failure.kind);
                result.error = Some(failure.message);
            }
        }

        result.finish();
        info!(
            domain = %target.domain,
            status = %result.scan_status,
            trackers = result.detections.len(),
            duration = result.duration_seconds,
            "scan finished"
        );
        result
    }

    async fn run(
        &self,
        target: &ScanTarget,
        cancel: &CancellationToken,
        state: &mut ScanState,
        result: &mut ScanResult,
    ) -> Result<Collected, ScanFailure> {
        let domain = &target.domain;
        if cancel.is_cancelled() {
            return Err(ScanFailure::cancelled());
        }

        let mut settle = self.settings.settle_window;
        if self.settings.health_check {
            transition(state, ScanState::HealthCheck, domain);
            let report = tokio::select! {
                report = self.health.check(domain) => report,
                () = cancel.cancelled() => return Err(ScanFailure::cancelled()),
            };
            if report.should_skip() {
                let reason = report
                    .error
                    .unwrap_or_else(|| "host did not respond".to_string());
                return Err(ScanFailure::new(ErrorKind::Unreachable, reason));
            }
            if report.should_retry() {
                settle = settle.saturating_mul(GUARDED_SETTLE_FACTOR);
            }
        }

        transition(state, ScanState::Resolving, domain);
        let resolved = tokio::select! {
            resolved = self.resolver.resolve(domain) => resolved,
            () = cancel.cancelled() => return Err(ScanFailure::cancelled()),
        };
        let resolved = match resolved {
            Ok(resolved) => resolved,
            Err(e) => {
                result.candidates = e.attempted_urls().into_iter().map(String::from).collect();
                return Err(ScanFailure::new(ErrorKind::NoReachableVariant, e.to_string()));
            }
        };
        result.candidates = resolved.failed.iter().map(|f| f.url.clone()).collect();
        result.candidates.push(resolved.candidate.clone());
        result.url_scanned = Some(resolved.url.clone());

        let mut attempt = 0_u32;
        loop {
            transition(state, ScanState::Navigating { attempt }, domain);
            result.attempts = attempt + 1;

            match self.attempt(domain, &resolved.url, settle, cancel, state).await {
                Ok(collected) => return Ok(collected),
                Err(AttemptError::Cancelled) => return Err(ScanFailure::cancelled()),
                Err(AttemptError::Browser(e)) => {
                    return Err(ScanFailure::new(ErrorKind::Browser, e.to_string()));
                }
                Err(AttemptError::Navigation(e)) => {
                    if !e.is_transient() || !self.settings.retry.allows_retry(attempt) {
                        return Err(ScanFailure::new(e.error_kind(), e.to_string()));
                    }

                    let delay = self.settings.retry.backoff_delay(attempt);
                    warn!(
                        "Scan failed for {} (attempt {}/{}): {}, retrying in {:?}...",
                        domain,
                        attempt + 1,
                        self.settings.retry.max_retries + 1,
                        e,
                        delay
                    );
                    result.metadata.errors.push(e.to_string());

                    if !sleep_or_cancel(delay, cancel).await {
                        return Err(ScanFailure::cancelled());
                    }
                    attempt += 1;
                }
            }
        }
    }

    /// One navigation attempt in a fresh session, closed before returning.
    async fn attempt(
        &self,
        domain: &Domain,
        url: &str,
        settle: Duration,
        cancel: &CancellationToken,
        state: &mut ScanState,
    ) -> Result<Collected, AttemptError> {
        let guard = tokio::select! {
            guard = self.pool.acquire() => guard?,
            () = cancel.cancelled() => return Err(AttemptError::Cancelled),
        };

        let outcome = self.collect(&guard, domain, url, settle, cancel, state).await;

        if let Err(e) = guard.close().await {
            warn!(url, error = %e, "failed to close browser session");
        }
        outcome
    }

    async fn collect(
        &self,
        guard: &SessionGuard,
        domain: &Domain,
        url: &str,
        settle: Duration,
        cancel: &CancellationToken,
        state: &mut ScanState,
    ) -> Result<Collected, AttemptError> {
        let session = guard.session()?;

        let requests: Arc<Mutex<Vec<String>>> = Arc::default();
        let sink = Arc::clone(&requests);
        session.on_network_request(Arc::new(move |request: &str| {
            if let Ok(mut seen) = sink.lock() {
                seen.push(request.to_string());
            }
        }));

        let started = Instant::now();
        let page = tokio::select! {
            page = session.navigate(url, self.settings.navigation_timeout) => page?,
            () = cancel.cancelled() => return Err(AttemptError::Cancelled),
        };
        let page_load = started.elapsed();

        transition(state, ScanState::Collecting, domain);
        if !sleep_or_cancel(settle, cancel).await {
            return Err(AttemptError::Cancelled);
        }

        let mut evidence = Evidence::new();
        evidence.network_requests = requests.lock().map(|r| r.clone()).unwrap_or_default();
        evidence.dom_content = session.content().await?;
        evidence.global_names = self.read_globals(session).await;
        evidence.cookies = session
            .cookies()
            .await?
            .into_iter()
            .map(|c| Cookie::new(c.name, c.value))
            .collect();

        let screenshot = match &self.settings.screenshot_dir {
            Some(dir) => save_screenshot(session, dir, domain).await,
            None => None,
        };

        Ok(Collected {
            evidence,
            page,
            page_load,
            screenshot,
        })
    }

    /// Names of known tracker globals defined on the page.
    async fn read_globals(&self, session: &dyn BrowserSession) -> Vec<String> {
        let names = self.registry.global_names();
        let script = match serde_json::to_string(&names) {
            Ok(list) => format!(
                "(() => {list}.filter(n => typeof window[n] !== 'undefined'))()"
            ),
            Err(e) => {
                warn!(error = %e, "cannot build globals probe");
                return Vec::new();
            }
        };

        match session.evaluate(&script).await {
            Ok(value) => serde_json::from_value(value).unwrap_or_default(),
            Err(e) => {
                debug!(error = %e, "globals probe failed");
                Vec::new()
            }
        }
    }

    fn detect(&self, collected: Collected, result: &mut ScanResult) {
        let report = self.registry.detect(&collected.evidence);

        result.metadata = ScanMetadata {
            page_load_seconds: Some(collected.page_load.as_secs_f64()),
            total_requests: collected.evidence.network_requests.len(),
            tracking_requests: report
                .detections
                .iter()
                .map(|d| d.evidence.network_requests.len())
                .sum(),
            errors: std::mem::take(&mut result.metadata.errors),
            screenshot: collected.screenshot,
        };
        result.url_scanned = Some(collected.page.final_url);
        result.unknown_trackers = report.unknown_trackers();
        result.detections = report.detections;
    }
}

fn transition(state: &mut ScanState, next: ScanState, domain: impl fmt::Display) {
    debug!(domain = %domain, from = %state, to = %next, "scan state");
    *state = next;
}

async fn save_screenshot(session: &dyn BrowserSession, dir: &Path, domain: &Domain) -> Option<String> {
    let bytes = match session.screenshot().await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(domain = %domain, error = %e, "screenshot failed");
            return None;
        }
    };

    let name: String = domain
        .as_str()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
        .collect();
    let path = dir.join(format!("{name}.png"));

    if let Err(e) = tokio::fs::create_dir_all(dir).await {
        warn!(dir = %dir.display(), error = %e, "cannot create screenshot directory");
        return None;
    }
    if let Err(e) = tokio::fs::write(&path, bytes).await {
        warn!(path = %path.display(), error = %e, "cannot write screenshot");
        return None;
    }
    Some(path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_display() {
        assert_eq!(ScanState::Navigating { attempt: 0 }.to_string(), "NAVIGATING(attempt 1)");
        assert_eq!(
            ScanState::Failed(ErrorKind::NoReachableVariant).to_string(),
            "FAILED(no_reachable_variant)"
        );
    }

    #[test]
    fn test_attempt_error_unwraps_navigation() {
        let err: AttemptError = BrowserError::Navigation(NavigationError::Timeout).into();
        assert!(matches!(err, AttemptError::Navigation(NavigationError::Timeout)));
        let err: AttemptError = BrowserError::SessionClosed.into();
        assert!(matches!(err, AttemptError::Browser(_)));
    }
}
