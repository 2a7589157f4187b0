use pixelscan_browser::{
    BrowserLauncher, BrowserSession, NavigationError, PageInfo, RequestCallback, Result,
    SessionConfig, SessionCookie, SessionPool,
};
use pixelscan_core::BrowserConfig;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Default)]
struct Counters {
    live: AtomicUsize,
    closed: AtomicUsize,
}

struct CountingSession {
    counters: Arc<Counters>,
    open: bool,
}

#[async_trait::async_trait]
impl BrowserSession for CountingSession {
    async fn navigate(
        &self,
        url: &str,
        _timeout: Duration,
    ) -> std::result::Result<PageInfo, NavigationError> {
        Ok(PageInfo {
            final_url: url.to_string(),
            status: Some(200),
        })
    }

    fn on_network_request(&self, _callback: RequestCallback) {}

    async fn evaluate(&self, _script: &str) -> Result<serde_json::Value> {
        Ok(serde_json::Value::Null)
    }

    async fn cookies(&self) -> Result<Vec<SessionCookie>> {
        Ok(Vec::new())
    }

    async fn content(&self) -> Result<String> {
        Ok(String::new())
    }

    async fn screenshot(&self) -> Result<Vec<u8>> {
        Ok(Vec::new())
    }

    async fn close(&mut self) -> Result<()> {
        if self.open {
            self.open = false;
            self.counters.closed.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

impl Drop for CountingSession {
    fn drop(&mut self) {
        self.counters.live.fetch_sub(1, Ordering::SeqCst);
    }
}

struct CountingLauncher {
    counters: Arc<Counters>,
}

#[async_trait::async_trait]
impl BrowserLauncher for CountingLauncher {
    async fn launch(&self, _config: &SessionConfig) -> Result<Box<dyn BrowserSession>> {
        self.counters.live.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(CountingSession {
            counters: Arc::clone(&self.counters),
            open: true,
        }))
    }
}

fn pool(max: usize) -> (SessionPool, Arc<Counters>) {
    let counters = Arc::new(Counters::default());
    let launcher = Arc::new(CountingLauncher {
        counters: Arc::clone(&counters),
    });
    (SessionPool::new(launcher, BrowserConfig::default(), max), counters)
}

#[tokio::test]
async fn test_close_returns_slot() {
    let (pool, counters) = pool(2);

    let guard = pool.acquire().await.expect("acquire");
    assert_eq!(pool.available(), 1);
    assert_eq!(counters.live.load(Ordering::SeqCst), 1);

    let page = guard
        .session()
        .expect("open session")
        .navigate("https://example.com/", Duration::from_secs(1))
        .await
        .expect("navigate");
    assert_eq!(page.status, Some(200));

    guard.close().await.expect("close");
    assert_eq!(pool.available(), 2);
    assert_eq!(counters.live.load(Ordering::SeqCst), 0);
    assert_eq!(counters.closed.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_dropped_guard_releases_session_and_slot() {
    let (pool, counters) = pool(1);

    let guard = pool.acquire().await.expect("acquire");
    assert_eq!(pool.available(), 0);
    drop(guard);

    assert_eq!(pool.available(), 1);
    assert_eq!(counters.live.load(Ordering::SeqCst), 0);
    assert_eq!(counters.closed.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_acquire_waits_for_free_slot() {
    let (pool, _counters) = pool(1);
    let held = pool.acquire().await.expect("acquire");

    let waiting = tokio::time::timeout(Duration::from_millis(50), pool.acquire()).await;
    assert!(waiting.is_err(), "second acquire must wait");

    held.close().await.expect("close");
    let second = tokio::time::timeout(Duration::from_millis(50), pool.acquire())
        .await
        .expect("slot freed")
        .expect("acquire");
    second.close().await.expect("close");
}

#[tokio::test]
async fn test_zero_capacity_is_raised_to_one() {
    let (pool, _counters) = pool(0);
    assert_eq!(pool.max_sessions(), 1);
    pool.acquire().await.expect("acquire").close().await.expect("close");
}
