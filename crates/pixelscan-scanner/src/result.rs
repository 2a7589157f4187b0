//! Per-domain scan outcome, as written to the results stream.

use crate::plan::{RejectedTarget, ScanTarget};
use pixelscan_core::{ErrorKind, ScanStatus, Timestamp, TrackerType};
use pixelscan_detectors::Detection;
use serde::{Deserialize, Serialize};

/// Measurements taken while scanning a page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanMetadata {
    /// Seconds from navigation start to load
    pub page_load_seconds: Option<f64>,
    /// Requests observed during the scan
    pub total_requests: usize,
    /// Requests attributed to a detected tracker
    pub tracking_requests: usize,
    /// Errors of attempts that were retried
    pub errors: Vec<String>,
    /// Screenshot file, when captured
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<String>,
}

/// Terminal record for one target. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    pub input_url: String,
    /// Absent for rejected inputs
    pub normalized_domain: Option<String>,
    pub scan_status: ScanStatus,
    pub detections: Vec<Detection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub unknown_trackers: Vec<TrackerType>,
    /// Address the browser was pointed at
    #[serde(default)]
    pub url_scanned: Option<String>,
    /// Candidate addresses tried during resolution, in order
    #[serde(default)]
    pub candidates: Vec<String>,
    /// Navigation attempts used
    #[serde(default)]
    pub attempts: u32,
    #[serde(default)]
    pub metadata: ScanMetadata,
    pub started_at: Timestamp,
    pub completed_at: Timestamp,
    pub duration_seconds: f64,
}

impl ScanResult {
    /// A fresh record for `target`, to be completed by the pipeline.
    #[must_use]
    pub fn started(target: &ScanTarget) -> Self {
        let now = Timestamp::now();
        Self {
            correlation_id: target.correlation_id.clone(),
            input_url: target.input.clone(),
            normalized_domain: Some(target.domain.as_str().to_string()),
            scan_status: ScanStatus::Failed,
            detections: Vec::new(),
            error_kind: None,
            error: None,
            unknown_trackers: Vec::new(),
            url_scanned: None,
            candidates: Vec::new(),
            attempts: 0,
            metadata: ScanMetadata::default(),
            started_at: now,
            completed_at: now,
            duration_seconds: 0.0,
        }
    }

    /// Record for an input that failed normalization.
    #[must_use]
    pub fn rejected(target: &RejectedTarget) -> Self {
        let now = Timestamp::now();
        Self {
            correlation_id: target.correlation_id.clone(),
            input_url: target.input.clone(),
            normalized_domain: None,
            scan_status: ScanStatus::Rejected,
            detections: Vec::new(),
            error_kind: Some(ErrorKind::Validation),
            error: Some(target.error.to_string()),
            unknown_trackers: Vec::new(),
            url_scanned: None,
            candidates: Vec::new(),
            attempts: 0,
            metadata: ScanMetadata::default(),
            started_at: now,
            completed_at: now,
            duration_seconds: 0.0,
        }
    }

    /// Stamp completion time and duration.
    pub fn finish(&mut self) {
        self.completed_at = Timestamp::now();
        self.duration_seconds = self.completed_at.seconds_since(&self.started_at);
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.scan_status == ScanStatus::Success
    }

    /// Whether the scan was interrupted rather than finished.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.error_kind == Some(ErrorKind::Cancelled)
    }

    /// Key this record is tracked under: the domain, or the raw input if rejected.
    #[must_use]
    pub fn key(&self) -> &str {
        self.normalized_domain.as_deref().unwrap_or(&self.input_url)
    }
}
