use crate::error::{BrowserError, NavigationError, Result};
use crate::session::{
    BrowserLauncher, BrowserSession, PageInfo, RequestCallback, SessionConfig, SessionCookie,
};
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::emulation::SetTimezoneOverrideParams;
use chromiumoxide::cdp::browser_protocol::network::EventRequestWillBeSent;
use chromiumoxide::page::{Page, ScreenshotParams};
use futures_util::stream::StreamExt;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Launches one Chromium process per session.
#[derive(Debug, Clone, Default)]
pub struct ChromiumLauncher;

impl ChromiumLauncher {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl BrowserLauncher for ChromiumLauncher {
    async fn launch(&self, config: &SessionConfig) -> Result<Box<dyn BrowserSession>> {
        let session = ChromiumSession::launch(config).await?;
        Ok(Box::new(session))
    }
}

/// A live Chromium process with a single page.
pub struct ChromiumSession {
    browser: tokio::sync::Mutex<Option<Browser>>,
    page: Page,
    callbacks: Arc<Mutex<Vec<RequestCallback>>>,
    tasks: Vec<JoinHandle<()>>,
    // Profile directory; removed when the session drops
    _profile: TempDir,
}

impl ChromiumSession {
    /// Start Chromium with the given settings and open a blank page.
    pub async fn launch(config: &SessionConfig) -> Result<Self> {
        let profile = TempDir::new().map_err(|e| BrowserError::LaunchFailed(e.to_string()))?;
        let (width, height) = config.viewport();

        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .window_size(width, height)
            .user_data_dir(profile.path())
            .args(config.launch_args());
        if !config.headless {
            builder = builder.with_head();
        }
        let browser_config = builder.build().map_err(BrowserError::LaunchFailed)?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| BrowserError::LaunchFailed(e.to_string()))?;

        let mut tasks = Vec::new();
        tasks.push(tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("browser handler event error: {}", e);
                }
            }
        }));

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| BrowserError::ChromiumError(e.to_string()))?;

        if let Some(stealth) = &config.stealth {
            if let Err(e) = page
                .execute(SetTimezoneOverrideParams::new(stealth.timezone.clone()))
                .await
            {
                debug!("timezone override rejected: {}", e);
            }
        }

        let callbacks: Arc<Mutex<Vec<RequestCallback>>> = Arc::default();
        let mut requests = page
            .event_listener::<EventRequestWillBeSent>()
            .await
            .map_err(|e| BrowserError::ChromiumError(e.to_string()))?;
        let listeners = Arc::clone(&callbacks);
        tasks.push(tokio::spawn(async move {
            while let Some(event) = requests.next().await {
                let current = listeners.lock().map(|l| l.to_vec()).unwrap_or_default();
                for callback in &current {
                    callback(&event.request.url);
                }
            }
        }));

        debug!(width, height, headless = config.headless, "chromium session started");

        Ok(Self {
            browser: tokio::sync::Mutex::new(Some(browser)),
            page,
            callbacks,
            tasks,
            _profile: profile,
        })
    }

    /// Navigate and wait for the main document's response.
    async fn load(&self, url: &str) -> chromiumoxide::error::Result<Option<u16>> {
        self.page.goto(url).await?;
        let request = self.page.wait_for_navigation_response().await?;
        Ok(request
            .as_ref()
            .and_then(|r| r.response.as_ref())
            .and_then(|r| http_status(r.status)))
    }

    fn abort_tasks(&self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

#[async_trait::async_trait]
impl BrowserSession for ChromiumSession {
    async fn navigate(
        &self,
        url: &str,
        timeout: Duration,
    ) -> std::result::Result<PageInfo, NavigationError> {
        let status = match tokio::time::timeout(timeout, self.load(url)).await {
            Err(_) => return Err(NavigationError::Timeout),
            Ok(Err(e)) => return Err(NavigationError::from_net_error(&e.to_string())),
            Ok(Ok(status)) => status,
        };
        if let Some(code) = status {
            let content = self.page.content().await.unwrap_or_default();
            if let Some(err) = NavigationError::from_status(code, &content) {
                return Err(err);
            }
        }

        let final_url = self
            .page
            .url()
            .await
            .ok()
            .flatten()
            .unwrap_or_else(|| url.to_string());

        Ok(PageInfo { final_url, status })
    }

    fn on_network_request(&self, callback: RequestCallback) {
        match self.callbacks.lock() {
            Ok(mut callbacks) => callbacks.push(callback),
            Err(_) => warn!("request observer list poisoned; observer dropped"),
        }
    }

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value> {
        self.page
            .evaluate(script)
            .await
            .map_err(|e| BrowserError::EvaluationFailed(e.to_string()))?
            .into_value()
            .map_err(|e| BrowserError::EvaluationFailed(e.to_string()))
    }

    async fn cookies(&self) -> Result<Vec<SessionCookie>> {
        let cookies = self
            .page
            .get_cookies()
            .await
            .map_err(|e| BrowserError::ChromiumError(e.to_string()))?;

        Ok(cookies
            .into_iter()
            .map(|c| SessionCookie {
                name: c.name,
                value: c.value,
                domain: c.domain,
            })
            .collect())
    }

    async fn content(&self) -> Result<String> {
        self.page
            .content()
            .await
            .map_err(|e| BrowserError::ChromiumError(e.to_string()))
    }

    async fn screenshot(&self) -> Result<Vec<u8>> {
        self.page
            .screenshot(ScreenshotParams::builder().full_page(true).build())
            .await
            .map_err(|e| BrowserError::ChromiumError(e.to_string()))
    }

    async fn close(&mut self) -> Result<()> {
        let Some(mut browser) = self.browser.lock().await.take() else {
            return Ok(());
        };

        let closed = browser.close().await;
        if let Err(e) = browser.wait().await {
            debug!("waiting for chromium exit: {}", e);
        }
        self.abort_tasks();

        closed
            .map(|_| ())
            .map_err(|e| BrowserError::ChromiumError(e.to_string()))
    }
}

impl Drop for ChromiumSession {
    fn drop(&mut self) {
        // Dropping `Browser` kills the child process; the event loops must go too.
        self.abort_tasks();
    }
}

/// HTTP status of a CDP response. Documents served without one, such as
/// `data:` URLs, report 0.
fn http_status(raw: i64) -> Option<u16> {
    u16::try_from(raw).ok().filter(|code| (100..=599).contains(code))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status_range() {
        assert_eq!(http_status(200), Some(200));
        assert_eq!(http_status(404), Some(404));
        assert_eq!(http_status(0), None);
        assert_eq!(http_status(-1), None);
        assert_eq!(http_status(70_000), None);
    }
}
