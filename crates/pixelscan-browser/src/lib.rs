//! Browser sessions for rendering target pages.
//!
//! Scans talk to the browser only through [`BrowserLauncher`] and
//! [`BrowserSession`]; [`ChromiumLauncher`] is the production
//! implementation and tests substitute their own.

pub mod engine;
pub mod error;
pub mod pool;
pub mod session;
pub mod stealth;

pub use engine::{ChromiumLauncher, ChromiumSession};
pub use error::{BrowserError, NavigationError, Result};
pub use pool::{SessionGuard, SessionPool};
pub use session::{
    extract_domain, BrowserLauncher, BrowserSession, PageInfo, RequestCallback, SessionConfig,
    SessionCookie,
};
pub use stealth::StealthConfig;
