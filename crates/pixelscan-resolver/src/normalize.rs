//! Turning raw, copy-pasted site identifiers into canonical domains.
//!
//! Spreadsheets of target sites are messy: quoted cells, markdown links,
//! HTML anchors, trailing commas, `N/A` placeholders and the occasional
//! email address. [`normalize`] cleans all of that up and produces a
//! [`Domain`] whose string form is stable under re-normalization.

use crate::error::ValidationError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

static MARKDOWN_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[[^\]]*\]\(\s*([^)\s]+)\s*\)").expect("valid regex"));

static HTML_HREF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<a\b[^>]*\bhref\s*=\s*["']?([^"'\s>]+)"#).expect("valid regex")
});

static HTML_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("valid regex"));

static PHONE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\d\s\-()+]+$").expect("valid regex"));

const PLACEHOLDERS: &[&str] = &["none", "null", "undefined", "n/a", "na", "-", "0"];

const TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', '?'];

/// A normalized scan target: lowercase host plus an optional meaningful sub-path.
///
/// Equality is plain string equality on the normalized form, which makes it
/// case- and scheme-insensitive with respect to the raw inputs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Domain(String);

impl Domain {
    /// Normalize `raw` into a domain. Shorthand for [`normalize`].
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        normalize(raw)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Host part without any path.
    #[must_use]
    pub fn host(&self) -> &str {
        match self.0.find('/') {
            Some(idx) => &self.0[..idx],
            None => &self.0,
        }
    }

    /// Sub-path including the leading `/`, if one was preserved.
    #[must_use]
    pub fn path(&self) -> Option<&str> {
        self.0.find('/').map(|idx| &self.0[idx..])
    }

    /// Whether the host is an IP literal or `localhost`.
    #[must_use]
    pub fn is_local_or_ip(&self) -> bool {
        let host = self.host();
        host == "localhost" || is_ipv4_literal(host) || parse_ipv6(host).is_some()
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Clean a raw target string into a canonical [`Domain`].
///
/// Strips surrounding quotes, markdown and HTML link wrappers, trailing
/// punctuation, scheme, port, query, fragment and a leading `www.`. A
/// non-root path survives as part of the domain.
pub fn normalize(raw: &str) -> Result<Domain, ValidationError> {
    let cleaned = strip_artifacts(raw);
    let lowered = cleaned.to_lowercase();

    if lowered.is_empty() {
        return Err(ValidationError::Empty);
    }
    if PLACEHOLDERS.contains(&lowered.as_str()) {
        return Err(ValidationError::Placeholder(lowered));
    }
    if lowered.contains('@') {
        return Err(ValidationError::Email(lowered));
    }
    if PHONE.is_match(&lowered) {
        return Err(ValidationError::Phone(lowered));
    }

    // A "://" inside a path, query or fragment is not a scheme separator
    let without_scheme = match lowered.split_once("://") {
        Some((scheme, rest)) if is_scheme(scheme) => rest,
        _ => lowered.trim_start_matches("//"),
    };

    let (authority, rest) = match without_scheme.find(['/', '?', '#']) {
        Some(idx) => without_scheme.split_at(idx),
        None => (without_scheme, ""),
    };

    let host = strip_port(authority).trim_end_matches('.');
    let host = match host.strip_prefix("www.") {
        Some(stripped) if stripped.contains('.') => stripped,
        _ => host,
    };

    if !validate(host) {
        return Err(ValidationError::InvalidDomain(cleaned));
    }

    // IPv6 literals are kept bracketed so they can be dropped into a URL
    let host = match parse_ipv6(host) {
        Some(addr) => format!("[{addr}]"),
        None => host.to_string(),
    };

    let path = rest
        .split(['?', '#'])
        .next()
        .unwrap_or_default()
        .trim_end_matches(|c: char| c == '/' || TRAILING_PUNCTUATION.contains(&c));

    if path.is_empty() {
        Ok(Domain(host))
    } else {
        Ok(Domain(format!("{host}{path}")))
    }
}

/// Check whether a host (optionally followed by a path) is a plausible scan target.
///
/// Accepts DNS names with an alphabetic TLD, IPv4 and IPv6 literals, and
/// `localhost`.
#[must_use]
pub fn validate(domain: &str) -> bool {
    let host = domain.split('/').next().unwrap_or_default();
    if host.is_empty() {
        return false;
    }

    let host = host.to_ascii_lowercase();
    if host == "localhost" || parse_ipv6(&host).is_some() {
        return true;
    }

    let labels: Vec<&str> = host.split('.').collect();
    if labels.iter().all(|l| !l.is_empty() && l.bytes().all(|b| b.is_ascii_digit())) {
        // All-numeric hosts are only acceptable as dotted-quad IPv4.
        return is_ipv4_literal(&host);
    }

    if host.len() > 253 || labels.len() < 2 {
        return false;
    }

    let valid_labels = labels.iter().all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label
                .bytes()
                .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
    });

    let tld = labels.last().copied().unwrap_or_default();
    let valid_tld =
        tld.len() >= 2 && (tld.bytes().all(|b| b.is_ascii_lowercase()) || tld.starts_with("xn--"));

    valid_labels && valid_tld
}

fn strip_artifacts(raw: &str) -> String {
    let trimmed = raw.trim();

    let link_target = [&*MARKDOWN_LINK, &*HTML_HREF]
        .iter()
        .find_map(|re| re.captures(trimmed).and_then(|c| c.get(1)))
        .map(|m| m.as_str().to_string());

    let s = match link_target {
        Some(url) => url,
        None if trimmed.contains('<') => HTML_TAG.replace_all(trimmed, "").into_owned(),
        None => trimmed.to_string(),
    };

    s.trim_matches(|c: char| c.is_whitespace() || is_quote(c))
        .trim_end_matches(|c: char| {
            c.is_whitespace() || is_quote(c) || TRAILING_PUNCTUATION.contains(&c)
        })
        .to_string()
}

/// RFC 3986 scheme: a letter followed by letters, digits, `+`, `-` or `.`.
fn is_scheme(s: &str) -> bool {
    let mut chars = s.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

fn is_quote(c: char) -> bool {
    matches!(c, '"' | '\'' | '`' | '<' | '>')
}

fn strip_port(authority: &str) -> &str {
    if authority.starts_with('[') {
        // Bracketed IPv6, optionally followed by :port
        return match authority.find(']') {
            Some(end) => &authority[..=end],
            None => authority,
        };
    }

    if authority.matches(':').count() == 1 {
        authority.split(':').next().unwrap_or(authority)
    } else {
        authority
    }
}

fn is_ipv4_literal(host: &str) -> bool {
    host.split('.').count() == 4 && host.parse::<Ipv4Addr>().is_ok()
}

fn parse_ipv6(host: &str) -> Option<Ipv6Addr> {
    host.trim_start_matches('[')
        .trim_end_matches(']')
        .parse::<Ipv6Addr>()
        .ok()
}
