//! Detection results produced by probes.

use crate::error::DetectionError;
use pixelscan_core::{RiskLevel, TrackerType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Maximum characters of a script body kept as evidence.
pub const SNIPPET_LIMIT: usize = 500;

/// The subset of captured evidence that matched one tracker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchedEvidence {
    /// Tracking requests issued by the page
    pub network_requests: Vec<String>,
    /// Inline script snippets (truncated)
    pub scripts: Vec<String>,
    /// Script/image sources and noscript pixels
    pub dom_elements: Vec<String>,
    /// Tracker globals present on `window`
    pub global_names: Vec<String>,
    /// Tracker cookie names
    pub cookies: Vec<String>,
}

impl MatchedEvidence {
    /// Whether no evidence matched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.network_requests.is_empty()
            && self.scripts.is_empty()
            && self.dom_elements.is_empty()
            && self.global_names.is_empty()
            && self.cookies.is_empty()
    }
}

/// A tracker found on a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Detection {
    /// Which tracker
    pub tracker_type: TrackerType,
    /// Fixed risk for the tracker type
    pub risk_level: RiskLevel,
    /// Whether the tracker raises HIPAA concerns
    pub hipaa_concern: bool,
    /// Pixel / property / partner id, when one could be extracted
    pub tracker_id: Option<String>,
    /// Matched evidence; never empty
    pub evidence: MatchedEvidence,
    /// Human-readable summary
    pub description: String,
}

/// Matches accumulated by one probe over one scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeMatches {
    /// Evidence that matched
    pub evidence: MatchedEvidence,
    /// Extracted ids, ordered for deterministic selection
    pub ids: BTreeSet<String>,
}

impl ProbeMatches {
    /// Turn the accumulated matches into a detection, or `None` if nothing matched.
    #[must_use]
    pub fn into_detection(self, tracker: TrackerType) -> Option<Detection> {
        if self.evidence.is_empty() {
            return None;
        }

        let description = describe(tracker, &self.evidence, &self.ids);
        Some(Detection {
            tracker_type: tracker,
            risk_level: tracker.risk_level(),
            hipaa_concern: tracker.hipaa_concern(),
            tracker_id: self.ids.into_iter().next(),
            evidence: self.evidence,
            description,
        })
    }
}

fn describe(tracker: TrackerType, evidence: &MatchedEvidence, ids: &BTreeSet<String>) -> String {
    let mut parts = Vec::new();
    if !evidence.network_requests.is_empty() {
        parts.push(format!("{} tracking requests", evidence.network_requests.len()));
    }
    if !evidence.scripts.is_empty() || !evidence.dom_elements.is_empty() {
        parts.push(format!(
            "{} tracking scripts",
            evidence.scripts.len() + evidence.dom_elements.len()
        ));
    }
    if !evidence.global_names.is_empty() {
        parts.push(format!("{} globals", evidence.global_names.len()));
    }
    if !evidence.cookies.is_empty() {
        parts.push(format!("{} tracking cookies", evidence.cookies.len()));
    }
    if !ids.is_empty() {
        let joined: Vec<&str> = ids.iter().map(String::as_str).collect();
        parts.push(format!("Pixel ID: {}", joined.join(", ")));
    }
    format!("{tracker} detected: {}", parts.join(", "))
}

/// Truncate a script body to [`SNIPPET_LIMIT`] characters.
#[must_use]
pub fn snippet(script: &str) -> String {
    script.trim().chars().take(SNIPPET_LIMIT).collect()
}

/// Outcome of running every registered probe over one scan's evidence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetectionReport {
    /// Trackers found, in registry order
    pub detections: Vec<Detection>,
    /// Probes that failed; their tracker's result is unknown
    pub failures: Vec<DetectionError>,
}

impl DetectionReport {
    /// Tracker types whose probe failed.
    #[must_use]
    pub fn unknown_trackers(&self) -> Vec<TrackerType> {
        self.failures.iter().map(|f| f.tracker).collect()
    }

    /// Detected tracker types, in registry order.
    #[must_use]
    pub fn tracker_types(&self) -> Vec<TrackerType> {
        self.detections.iter().map(|d| d.tracker_type).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_matches_yield_no_detection() {
        assert!(ProbeMatches::default()
            .into_detection(TrackerType::MetaPixel)
            .is_none());
    }

    #[test]
    fn test_detection_picks_smallest_id() {
        let mut matches = ProbeMatches::default();
        matches
            .evidence
            .network_requests
            .push("https://www.facebook.com/tr?id=222".to_string());
        matches.ids.insert("222".to_string());
        matches.ids.insert("111".to_string());

        let detection = matches
            .into_detection(TrackerType::MetaPixel)
            .expect("detection");
        assert_eq!(detection.tracker_id.as_deref(), Some("111"));
        assert_eq!(detection.risk_level, RiskLevel::High);
        assert_eq!(
            detection.description,
            "meta_pixel detected: 1 tracking requests, Pixel ID: 111, 222"
        );
    }

    #[test]
    fn test_snippet_truncates() {
        let long = "x".repeat(SNIPPET_LIMIT * 2);
        assert_eq!(snippet(&long).len(), SNIPPET_LIMIT);
    }
}
