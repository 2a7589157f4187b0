#![allow(dead_code)]

use pixelscan_browser::{
    BrowserLauncher, BrowserSession, NavigationError, PageInfo, RequestCallback, Result,
    SessionConfig, SessionCookie, SessionPool,
};
use pixelscan_core::BrowserConfig;
use pixelscan_detectors::DetectorRegistry;
use pixelscan_resolver::{ProbeError, ProbeMethod, ProbeResponse, Prober};
use pixelscan_scanner::{PipelineSettings, RetryPolicy, ScanPipeline};
use std::collections::{HashMap, HashSet};
use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Host part of a URL with any `www.` prefix removed.
pub fn host_of(url: &str) -> String {
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    let host = rest.split(['/', '?', '#']).next().unwrap_or_default();
    host.strip_prefix("www.").unwrap_or(host).to_string()
}

/// Network where every host answers except the listed ones.
#[derive(Default)]
pub struct FakeNet {
    /// Hosts whose DNS lookup fails
    pub nxdomain: HashSet<String>,
    /// Hosts that resolve but refuse connections
    pub refusing: HashSet<String>,
}

impl FakeNet {
    pub fn nxdomain(mut self, host: &str) -> Self {
        self.nxdomain.insert(host.to_string());
        self
    }

    pub fn refusing(mut self, host: &str) -> Self {
        self.refusing.insert(host.to_string());
        self
    }
}

#[async_trait::async_trait]
impl Prober for FakeNet {
    async fn lookup_host(&self, host: &str) -> std::result::Result<Vec<IpAddr>, ProbeError> {
        if self.nxdomain.contains(&host_of(host)) {
            Err(ProbeError::Dns(format!("NXDOMAIN {host}")))
        } else {
            Ok(vec!["203.0.113.7".parse().expect("valid ip")])
        }
    }

    async fn probe(
        &self,
        url: &str,
        _method: ProbeMethod,
    ) -> std::result::Result<ProbeResponse, ProbeError> {
        let host = host_of(url);
        if self.nxdomain.contains(&host) {
            return Err(ProbeError::Dns(format!("NXDOMAIN {host}")));
        }
        if self.refusing.contains(&host) {
            return Err(ProbeError::Connect(format!("connection refused: {url}")));
        }
        Ok(ProbeResponse {
            status: 200,
            final_url: url.to_string(),
            body_sample: Some("<html></html>".to_string()),
            elapsed: Duration::from_millis(20),
        })
    }
}

/// How a scripted site behaves in the fake browser.
#[derive(Debug, Clone, Default)]
pub struct Site {
    pub html: String,
    pub requests: Vec<String>,
    pub cookies: Vec<(String, String)>,
    pub globals: Vec<String>,
    /// Failures returned by the first navigations, in order
    pub failures: Vec<NavigationError>,
    /// Navigation never finishes
    pub hang: bool,
    /// Time a navigation takes
    pub delay: Duration,
}

impl Site {
    pub fn clean() -> Self {
        Self {
            html: "<html><body><h1>Welcome</h1></body></html>".to_string(),
            ..Self::default()
        }
    }

    pub fn with_meta_pixel() -> Self {
        Self {
            html: "<html><head><script>fbq('init', '1234567890');</script></head></html>"
                .to_string(),
            requests: vec!["https://www.facebook.com/tr?id=1234567890&ev=PageView".to_string()],
            cookies: vec![("_fbp".to_string(), "fb.1.123".to_string())],
            globals: vec!["fbq".to_string()],
            ..Self::default()
        }
    }

    pub fn failing(mut self, failures: Vec<NavigationError>) -> Self {
        self.failures = failures;
        self
    }

    pub fn hanging() -> Self {
        Self {
            hang: true,
            ..Self::default()
        }
    }

    pub fn slow(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// Observer called with the host of every navigation.
pub type NavigateHook = Arc<dyn Fn(&str) + Send + Sync>;

#[derive(Default)]
pub struct Shared {
    sites: Mutex<HashMap<String, Site>>,
    navigations: Mutex<Vec<String>>,
    on_navigate: Mutex<Option<NavigateHook>>,
    pub launched: AtomicUsize,
    pub closed: AtomicUsize,
    pub live: AtomicUsize,
    pub max_live: AtomicUsize,
}

/// In-memory browser serving scripted sites.
#[derive(Clone, Default)]
pub struct FakeBrowser {
    pub shared: Arc<Shared>,
}

impl FakeBrowser {
    pub fn site(self, host: &str, site: Site) -> Self {
        self.shared
            .sites
            .lock()
            .expect("sites lock")
            .insert(host.to_string(), site);
        self
    }

    pub fn on_navigate(self, hook: NavigateHook) -> Self {
        *self.shared.on_navigate.lock().expect("hook lock") = Some(hook);
        self
    }

    /// Hosts navigated to, in order.
    pub fn navigations(&self) -> Vec<String> {
        self.shared.navigations.lock().expect("navigations lock").clone()
    }

    pub fn launched(&self) -> usize {
        self.shared.launched.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.shared.closed.load(Ordering::SeqCst)
    }

    pub fn live(&self) -> usize {
        self.shared.live.load(Ordering::SeqCst)
    }

    pub fn max_live(&self) -> usize {
        self.shared.max_live.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl BrowserLauncher for FakeBrowser {
    async fn launch(&self, _config: &SessionConfig) -> Result<Box<dyn BrowserSession>> {
        self.shared.launched.fetch_add(1, Ordering::SeqCst);
        let live = self.shared.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.shared.max_live.fetch_max(live, Ordering::SeqCst);

        Ok(Box::new(FakeSession {
            shared: Arc::clone(&self.shared),
            callbacks: Mutex::new(Vec::new()),
            page: Mutex::new(None),
            open: true,
        }))
    }
}

struct FakeSession {
    shared: Arc<Shared>,
    callbacks: Mutex<Vec<RequestCallback>>,
    page: Mutex<Option<Site>>,
    open: bool,
}

#[async_trait::async_trait]
impl BrowserSession for FakeSession {
    async fn navigate(
        &self,
        url: &str,
        _timeout: Duration,
    ) -> std::result::Result<PageInfo, NavigationError> {
        let host = host_of(url);
        self.shared
            .navigations
            .lock()
            .expect("navigations lock")
            .push(host.clone());
        let hook = self.shared.on_navigate.lock().expect("hook lock").clone();
        if let Some(hook) = hook {
            hook(&host);
        }

        let (site, failure) = {
            let mut sites = self.shared.sites.lock().expect("sites lock");
            let site = sites.entry(host.clone()).or_insert_with(Site::clean);
            let failure = (!site.failures.is_empty()).then(|| site.failures.remove(0));
            (site.clone(), failure)
        };

        if site.hang {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        if !site.delay.is_zero() {
            tokio::time::sleep(site.delay).await;
        }
        if let Some(err) = failure {
            return Err(err);
        }

        let callbacks = self.callbacks.lock().expect("callbacks lock").clone();
        for request in std::iter::once(url.to_string()).chain(site.requests.iter().cloned()) {
            for callback in &callbacks {
                callback(&request);
            }
        }
        *self.page.lock().expect("page lock") = Some(site);

        Ok(PageInfo {
            final_url: url.to_string(),
            status: Some(200),
        })
    }

    fn on_network_request(&self, callback: RequestCallback) {
        self.callbacks.lock().expect("callbacks lock").push(callback);
    }

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value> {
        let page = self.page.lock().expect("page lock").clone().unwrap_or_default();
        let present: Vec<String> = page
            .globals
            .into_iter()
            .filter(|g| script.contains(&format!("\"{g}\"")))
            .collect();
        Ok(serde_json::json!(present))
    }

    async fn cookies(&self) -> Result<Vec<SessionCookie>> {
        let page = self.page.lock().expect("page lock").clone().unwrap_or_default();
        Ok(page
            .cookies
            .into_iter()
            .map(|(name, value)| SessionCookie {
                name,
                value,
                domain: String::new(),
            })
            .collect())
    }

    async fn content(&self) -> Result<String> {
        let page = self.page.lock().expect("page lock").clone().unwrap_or_default();
        Ok(page.html)
    }

    async fn screenshot(&self) -> Result<Vec<u8>> {
        Ok(b"\x89PNG".to_vec())
    }

    async fn close(&mut self) -> Result<()> {
        if self.open {
            self.open = false;
            self.shared.closed.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

impl Drop for FakeSession {
    fn drop(&mut self) {
        self.shared.live.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Fast settings: no settle wait, millisecond backoff.
pub fn test_settings(health_check: bool) -> PipelineSettings {
    PipelineSettings {
        health_check,
        navigation_timeout: Duration::from_secs(5),
        settle_window: Duration::ZERO,
        retry: RetryPolicy {
            max_retries: 2,
            base: Duration::from_millis(5),
            cap: Duration::from_millis(20),
        },
        screenshot_dir: None,
    }
}

pub fn pipeline(
    net: FakeNet,
    browser: &FakeBrowser,
    max_sessions: usize,
    settings: PipelineSettings,
) -> ScanPipeline {
    let pool = SessionPool::new(
        Arc::new(browser.clone()),
        BrowserConfig::default(),
        max_sessions,
    );
    ScanPipeline::new(
        Arc::new(net),
        pool,
        Arc::new(DetectorRegistry::with_default_probes()),
        settings,
    )
}
