//! The probe contract and its data-driven implementation.
//!
//! A probe is a bundle of static pattern data for one tracker plus pure
//! predicates over evidence. Probes hold no per-scan state: every call to
//! [`Probe::evaluate`] accumulates into a fresh [`ProbeMatches`].

use crate::detection::{snippet, Detection, ProbeMatches};
use crate::evidence::{Cookie, DomFragments, Evidence};
use pixelscan_core::TrackerType;
use regex::Regex;

/// Static pattern data describing one tracker.
///
/// Tracking domains are lowercase substrings matched against lowercased
/// URLs. Script patterns are regex sources compiled case-insensitively. Id
/// patterns are compiled case-sensitively and must have one capture group.
#[derive(Debug)]
pub struct ProbeSpec {
    /// Tracker this spec describes
    pub tracker: TrackerType,
    /// URL fragments of tracker endpoints
    pub tracking_domains: &'static [&'static str],
    /// Regexes over script bodies and sources
    pub script_patterns: &'static [&'static str],
    /// Globals the tracker defines on `window`
    pub global_names: &'static [&'static str],
    /// Exact cookie names
    pub cookie_names: &'static [&'static str],
    /// Cookie name prefixes
    pub cookie_prefixes: &'static [&'static str],
    /// Id extraction from tracker URLs
    pub url_id_patterns: &'static [&'static str],
    /// Id extraction from script bodies
    pub script_id_patterns: &'static [&'static str],
}

/// Capability contract every tracker probe satisfies.
pub trait Probe: Send + Sync {
    /// Tracker this probe decides on.
    fn tracker_type(&self) -> TrackerType;

    /// URL fragments of the tracker's endpoints.
    fn tracking_domains(&self) -> &[&'static str];

    /// Cookie names the tracker sets.
    fn cookie_names(&self) -> &[&'static str];

    /// Globals the tracker defines.
    fn global_names(&self) -> &[&'static str];

    /// Whether a request URL belongs to the tracker.
    fn matches_network_request(&self, url: &str) -> bool;

    /// Ids embedded in a tracker request URL.
    fn request_ids(&self, url: &str) -> Vec<String>;

    /// Tracker scripts, sources or noscript pixels in the DOM.
    fn matches_dom_content(&self, dom: &DomFragments) -> Option<ProbeMatches>;

    /// Tracker globals among the observed names.
    fn matches_globals(&self, names: &[String]) -> Option<ProbeMatches>;

    /// Tracker cookies among the observed cookies.
    fn matches_cookies(&self, cookies: &[Cookie]) -> Option<ProbeMatches>;

    /// Turn accumulated matches into at most one detection.
    fn build_detection(&self, matches: ProbeMatches) -> Option<Detection> {
        matches.into_detection(self.tracker_type())
    }

    /// Offer all of one scan's evidence to this probe.
    ///
    /// Requests first, then DOM, globals and cookies once each.
    fn evaluate(&self, evidence: &Evidence, dom: &DomFragments) -> Option<Detection> {
        let mut matches = ProbeMatches::default();

        for url in &evidence.network_requests {
            if self.matches_network_request(url) {
                matches.evidence.network_requests.push(url.clone());
                matches.ids.extend(self.request_ids(url));
            }
        }

        let settled = [
            self.matches_dom_content(dom),
            self.matches_globals(&evidence.global_names),
            self.matches_cookies(&evidence.cookies),
        ];
        for found in settled.into_iter().flatten() {
            merge(&mut matches, found);
        }

        self.build_detection(matches)
    }
}

fn merge(into: &mut ProbeMatches, from: ProbeMatches) {
    let (dst, src) = (&mut into.evidence, from.evidence);
    dst.network_requests.extend(src.network_requests);
    dst.scripts.extend(src.scripts);
    dst.dom_elements.extend(src.dom_elements);
    dst.global_names.extend(src.global_names);
    dst.cookies.extend(src.cookies);
    into.ids.extend(from.ids);
}

/// A [`Probe`] driven entirely by a [`ProbeSpec`].
#[derive(Debug)]
pub struct PatternProbe {
    spec: &'static ProbeSpec,
    scripts: Vec<Regex>,
    url_ids: Vec<Regex>,
    script_ids: Vec<Regex>,
}

impl PatternProbe {
    /// Compile the patterns of `spec`.
    ///
    /// Specs are static data; an invalid pattern is a programming error.
    #[must_use]
    pub fn new(spec: &'static ProbeSpec) -> Self {
        let compile = |pattern: &str| Regex::new(pattern).expect("valid probe pattern");
        Self {
            spec,
            scripts: spec
                .script_patterns
                .iter()
                .map(|p| compile(format!("(?i){p}").as_str()))
                .collect(),
            url_ids: spec.url_id_patterns.iter().map(|p| compile(*p)).collect(),
            script_ids: spec
                .script_id_patterns
                .iter()
                .map(|p| compile(*p))
                .collect(),
        }
    }

    fn mentions_tracker_host(&self, text: &str) -> bool {
        let lowered = text.to_ascii_lowercase();
        self.spec
            .tracking_domains
            .iter()
            .any(|d| lowered.contains(d))
    }

    fn matches_script(&self, text: &str) -> bool {
        self.scripts.iter().any(|re| re.is_match(text))
    }
}

fn captures(patterns: &[Regex], text: &str) -> Vec<String> {
    patterns
        .iter()
        .flat_map(|re| re.captures_iter(text))
        .filter_map(|c| c.get(1).map(|m| m.as_str().to_string()))
        .collect()
}

impl Probe for PatternProbe {
    fn tracker_type(&self) -> TrackerType {
        self.spec.tracker
    }

    fn tracking_domains(&self) -> &[&'static str] {
        self.spec.tracking_domains
    }

    fn cookie_names(&self) -> &[&'static str] {
        self.spec.cookie_names
    }

    fn global_names(&self) -> &[&'static str] {
        self.spec.global_names
    }

    fn matches_network_request(&self, url: &str) -> bool {
        self.mentions_tracker_host(url)
    }

    fn request_ids(&self, url: &str) -> Vec<String> {
        captures(&self.url_ids, url)
    }

    fn matches_dom_content(&self, dom: &DomFragments) -> Option<ProbeMatches> {
        let mut matches = ProbeMatches::default();

        for script in &dom.inline_scripts {
            if self.matches_script(script) {
                matches.evidence.scripts.push(snippet(script));
                matches.ids.extend(captures(&self.script_ids, script));
            }
        }

        for fragment in dom.sources.iter().chain(&dom.noscript) {
            if self.mentions_tracker_host(fragment) || self.matches_script(fragment) {
                matches.evidence.dom_elements.push(snippet(fragment));
                matches.ids.extend(captures(&self.url_ids, fragment));
            }
        }

        (!matches.evidence.is_empty()).then_some(matches)
    }

    fn matches_globals(&self, names: &[String]) -> Option<ProbeMatches> {
        let mut matches = ProbeMatches::default();
        matches.evidence.global_names = names
            .iter()
            .filter(|n| self.spec.global_names.contains(&n.as_str()))
            .cloned()
            .collect();

        (!matches.evidence.is_empty()).then_some(matches)
    }

    fn matches_cookies(&self, cookies: &[Cookie]) -> Option<ProbeMatches> {
        let mut matches = ProbeMatches::default();
        matches.evidence.cookies = cookies
            .iter()
            .filter(|c| {
                self.spec.cookie_names.contains(&c.name.as_str())
                    || self
                        .spec
                        .cookie_prefixes
                        .iter()
                        .any(|p| c.name.starts_with(p))
            })
            .map(|c| c.name.clone())
            .collect();

        (!matches.evidence.is_empty()).then_some(matches)
    }
}
