//! Bounded pool of browser sessions.

use crate::error::{BrowserError, Result};
use crate::session::{BrowserLauncher, BrowserSession, SessionConfig};
use pixelscan_core::BrowserConfig;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, warn};

/// Hands out at most `max_sessions` live sessions at a time.
#[derive(Clone)]
pub struct SessionPool {
    launcher: Arc<dyn BrowserLauncher>,
    config: BrowserConfig,
    semaphore: Arc<Semaphore>,
    max_sessions: usize,
}

impl SessionPool {
    pub fn new(launcher: Arc<dyn BrowserLauncher>, config: BrowserConfig, max_sessions: usize) -> Self {
        let max_sessions = max_sessions.max(1);
        Self {
            launcher,
            config,
            semaphore: Arc::new(Semaphore::new(max_sessions)),
            max_sessions,
        }
    }

    /// Wait for a free slot, then launch a session in it.
    pub async fn acquire(&self) -> Result<SessionGuard> {
        let permit = Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .map_err(|_| BrowserError::PoolClosed)?;

        let config = SessionConfig::from_browser_config(&self.config);
        let session = self.launcher.launch(&config).await?;
        debug!(available = self.available(), "browser session acquired");

        Ok(SessionGuard {
            session: Some(session),
            _permit: permit,
        })
    }

    /// Free slots right now.
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    pub fn max_sessions(&self) -> usize {
        self.max_sessions
    }
}

/// A live session holding one pool slot.
///
/// [`SessionGuard::close`] releases it cleanly. If the guard is dropped
/// instead (for example when a scan future is cancelled), the session is
/// dropped with it and the slot is still returned.
pub struct SessionGuard {
    session: Option<Box<dyn BrowserSession>>,
    _permit: OwnedSemaphorePermit,
}

impl SessionGuard {
    /// The underlying session.
    pub fn session(&self) -> Result<&dyn BrowserSession> {
        self.session.as_deref().ok_or(BrowserError::SessionClosed)
    }

    /// Close the session and give the slot back.
    pub async fn close(mut self) -> Result<()> {
        match self.session.take() {
            Some(mut session) => session.close().await,
            None => Ok(()),
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if self.session.is_some() {
            warn!("browser session dropped without close");
        }
    }
}
