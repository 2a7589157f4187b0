use crate::error::{BrowserError, NavigationError, Result};
use crate::stealth::StealthConfig;
use pixelscan_core::BrowserConfig;
use std::sync::Arc;
use std::time::Duration;

const NO_SANDBOX: &str = "--no-sandbox";

/// Observer invoked with the URL of every request a page issues.
pub type RequestCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Settings for one browser session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub headless: bool,
    pub window_width: u32,
    pub window_height: u32,
    pub stealth: Option<StealthConfig>,
    pub extra_args: Vec<String>,
}

impl SessionConfig {
    /// Build session settings, drawing a fresh stealth identity when enabled.
    pub fn from_browser_config(config: &BrowserConfig) -> Self {
        Self {
            headless: config.headless,
            window_width: config.window_width,
            window_height: config.window_height,
            stealth: config.stealth.then(StealthConfig::randomized),
            extra_args: config.extra_args.clone(),
        }
    }

    /// Viewport, preferring the stealth identity's size.
    pub fn viewport(&self) -> (u32, u32) {
        self.stealth.as_ref().map_or(
            (self.window_width, self.window_height),
            |s| (s.viewport_width, s.viewport_height),
        )
    }

    /// Every extra Chromium flag for this session.
    ///
    /// `--no-sandbox` is left out; the launcher always sets it.
    pub fn launch_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(stealth) = &self.stealth {
            args.extend(stealth.args.iter().cloned());
            args.push(format!("--user-agent={}", stealth.user_agent));
        }
        for arg in &self.extra_args {
            if arg != NO_SANDBOX && !args.contains(arg) {
                args.push(arg.clone());
            }
        }
        args
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::from_browser_config(&BrowserConfig::default())
    }
}

/// Result of a successful navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageInfo {
    /// URL after redirects
    pub final_url: String,
    /// Main document status, when the browser reported one
    pub status: Option<u16>,
}

/// A cookie as seen by the browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCookie {
    pub name: String,
    pub value: String,
    pub domain: String,
}

/// Starts browser sessions.
#[async_trait::async_trait]
pub trait BrowserLauncher: Send + Sync {
    /// Start an isolated session.
    async fn launch(&self, config: &SessionConfig) -> Result<Box<dyn BrowserSession>>;
}

/// One isolated browser context rendering one page at a time.
#[async_trait::async_trait]
pub trait BrowserSession: Send + Sync {
    /// Navigate and wait for the load to finish or `timeout` to elapse.
    async fn navigate(
        &self,
        url: &str,
        timeout: Duration,
    ) -> std::result::Result<PageInfo, NavigationError>;

    /// Register an observer for outgoing requests; must precede `navigate`.
    fn on_network_request(&self, callback: RequestCallback);

    /// Evaluate a script in the page and return its JSON value.
    async fn evaluate(&self, script: &str) -> Result<serde_json::Value>;

    /// Cookies visible to the current page.
    async fn cookies(&self) -> Result<Vec<SessionCookie>>;

    /// Serialized DOM of the current page.
    async fn content(&self) -> Result<String>;

    /// Full-page PNG screenshot.
    async fn screenshot(&self) -> Result<Vec<u8>>;

    /// Release the browser. Calling it again is a no-op.
    async fn close(&mut self) -> Result<()>;
}

/// Helper to extract the host from a URL
pub fn extract_domain(url: &str) -> Result<String> {
    let url = url::Url::parse(url).map_err(|e| BrowserError::InvalidUrl(format!("{url}: {e}")))?;

    url.host_str()
        .ok_or_else(|| BrowserError::InvalidUrl("no host in url".to_string()))
        .map(ToString::to_string)
}
