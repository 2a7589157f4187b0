//! Evidence captured from a single rendered page.

use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};

static SCRIPT: Lazy<Selector> = Lazy::new(|| Selector::parse("script").expect("valid selector"));
static NOSCRIPT: Lazy<Selector> =
    Lazy::new(|| Selector::parse("noscript").expect("valid selector"));
static SOURCED: Lazy<Selector> =
    Lazy::new(|| Selector::parse("img[src], iframe[src]").expect("valid selector"));

/// A cookie visible to the scanned page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cookie {
    /// Cookie name
    pub name: String,
    /// Cookie value
    pub value: String,
}

impl Cookie {
    /// Create a cookie from a name/value pair.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Everything observed during one scan.
///
/// Built fresh per scan and owned by that scan alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Evidence {
    /// URLs of every request the page issued, in observation order
    pub network_requests: Vec<String>,
    /// Final serialized DOM
    pub dom_content: String,
    /// Global variable names present on `window`
    pub global_names: Vec<String>,
    /// Cookies visible to the page
    pub cookies: Vec<Cookie>,
}

impl Evidence {
    /// Create an empty accumulator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an observed network request.
    pub fn record_request(&mut self, url: impl Into<String>) {
        self.network_requests.push(url.into());
    }

    /// Whether nothing at all was captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.network_requests.is_empty()
            && self.dom_content.trim().is_empty()
            && self.global_names.is_empty()
            && self.cookies.is_empty()
    }
}

/// The parts of a DOM that probes look at, extracted once per scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DomFragments {
    /// Inline `<script>` bodies
    pub inline_scripts: Vec<String>,
    /// `src` attributes of scripts, images and iframes
    pub sources: Vec<String>,
    /// `<noscript>` contents (usually fallback pixel images)
    pub noscript: Vec<String>,
}

impl DomFragments {
    /// Parse `html` and pull out scripts, sources and noscript blocks.
    #[must_use]
    pub fn extract(html: &str) -> Self {
        if html.trim().is_empty() {
            return Self::default();
        }

        let document = Html::parse_document(html);
        let mut fragments = Self::default();

        for script in document.select(&SCRIPT) {
            if let Some(src) = script.value().attr("src") {
                fragments.sources.push(src.to_string());
            }
            let body: String = script.text().collect();
            if !body.trim().is_empty() {
                fragments.inline_scripts.push(body);
            }
        }

        for element in document.select(&SOURCED) {
            if let Some(src) = element.value().attr("src") {
                fragments.sources.push(src.to_string());
            }
        }

        for noscript in document.select(&NOSCRIPT) {
            let inner = noscript.inner_html();
            if !inner.trim().is_empty() {
                fragments.noscript.push(inner);
            }
        }

        fragments
    }
}
