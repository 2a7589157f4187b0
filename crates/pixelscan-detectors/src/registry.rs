//! Registry of tracker probes.

use crate::detection::DetectionReport;
use crate::error::DetectionError;
use crate::evidence::{DomFragments, Evidence};
use crate::probe::Probe;
use crate::probes;
use pixelscan_core::TrackerType;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::{debug, info, warn};

/// Ordered collection of probes, consulted once per scan.
///
/// The registry is immutable after construction and shared read-only
/// between concurrent scans.
pub struct DetectorRegistry {
    probes: Vec<Box<dyn Probe>>,
}

impl DetectorRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self { probes: Vec::new() }
    }

    /// Create a registry holding every built-in probe.
    #[must_use]
    pub fn with_default_probes() -> Self {
        let registry = Self {
            probes: probes::builtin(),
        };
        info!(count = registry.count(), "registered tracker probes");
        registry
    }

    /// Append a probe; it runs after those already registered.
    #[must_use]
    pub fn with_probe(mut self, probe: Box<dyn Probe>) -> Self {
        self.probes.push(probe);
        self
    }

    /// Number of registered probes.
    #[must_use]
    pub fn count(&self) -> usize {
        self.probes.len()
    }

    /// Registered tracker types, in registry order.
    #[must_use]
    pub fn tracker_types(&self) -> Vec<TrackerType> {
        self.probes.iter().map(|p| p.tracker_type()).collect()
    }

    /// Look up the probe for a tracker.
    #[must_use]
    pub fn get(&self, tracker: TrackerType) -> Option<&dyn Probe> {
        self.probes
            .iter()
            .find(|p| p.tracker_type() == tracker)
            .map(Box::as_ref)
    }

    /// Every global name any probe looks for, deduplicated, in registry order.
    #[must_use]
    pub fn global_names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = Vec::new();
        for name in self.probes.iter().flat_map(|p| p.global_names().iter()) {
            if !names.contains(name) {
                names.push(name);
            }
        }
        names
    }

    /// Run every probe over one scan's evidence.
    ///
    /// A probe that panics is recorded as a failure for its tracker and
    /// the remaining probes still run.
    pub fn detect(&self, evidence: &Evidence) -> DetectionReport {
        let dom = DomFragments::extract(&evidence.dom_content);
        let mut report = DetectionReport::default();

        for probe in &self.probes {
            let tracker = probe.tracker_type();
            match catch_unwind(AssertUnwindSafe(|| probe.evaluate(evidence, &dom))) {
                Ok(Some(detection)) => {
                    debug!(tracker = %tracker, id = ?detection.tracker_id, "tracker detected");
                    report.detections.push(detection);
                }
                Ok(None) => {}
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    warn!(tracker = %tracker, error = %message, "probe failed");
                    report.failures.push(DetectionError { tracker, message });
                }
            }
        }

        report
    }
}

impl Default for DetectorRegistry {
    fn default() -> Self {
        Self::with_default_probes()
    }
}

impl std::fmt::Debug for DetectorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DetectorRegistry")
            .field("trackers", &self.tracker_types())
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "probe panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry() {
        let registry = DetectorRegistry::with_default_probes();
        assert_eq!(registry.count(), 8);
        assert_eq!(registry.tracker_types(), TrackerType::ALL.to_vec());
        assert!(registry.get(TrackerType::SnapchatPixel).is_some());
    }

    #[test]
    fn test_global_names_are_unique() {
        let registry = DetectorRegistry::with_default_probes();
        let names = registry.global_names();
        assert!(names.contains(&"fbq"));
        assert!(names.contains(&"ttq"));
        let mut sorted = names.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), names.len());
    }

    #[test]
    fn test_empty_registry_detects_nothing() {
        let registry = DetectorRegistry::new();
        let evidence = Evidence {
            network_requests: vec!["https://www.facebook.com/tr?id=1".to_string()],
            ..Evidence::default()
        };
        assert_eq!(registry.detect(&evidence), DetectionReport::default());
    }

    #[test]
    fn test_panic_message_variants() {
        assert_eq!(panic_message(&"boom"), "boom");
        assert_eq!(panic_message(&"owned".to_string()), "owned");
        assert_eq!(panic_message(&42_u8), "probe panicked");
    }
}
