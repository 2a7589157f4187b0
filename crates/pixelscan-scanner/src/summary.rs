//! Aggregate report written when a batch finishes.

use crate::error::{BatchError, Result};
use crate::result::ScanResult;
use pixelscan_core::{BatchId, ErrorKind, ScanStatus, Timestamp, TrackerType};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Terminal status of one domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainStatus {
    pub domain: String,
    pub status: ScanStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub batch_id: String,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub rejected: usize,
    /// Successful scans with at least one detection
    pub with_trackers: usize,
    pub tracker_totals: BTreeMap<TrackerType, usize>,
    pub failures_by_kind: BTreeMap<ErrorKind, usize>,
    pub domains: Vec<DomainStatus>,
    pub started_at: Timestamp,
    pub completed_at: Timestamp,
    pub duration_seconds: f64,
    /// Fraction of scanned (non-rejected) domains that succeeded
    pub success_rate: f64,
    pub domains_per_minute: f64,
}

impl BatchSummary {
    /// Summary file for a batch.
    #[must_use]
    pub fn path(dir: &Path, batch_id: &BatchId) -> PathBuf {
        dir.join(format!("{batch_id}.summary.json"))
    }

    /// Write the summary next to the batch's other files.
    pub fn write(&self, dir: &Path, batch_id: &BatchId) -> Result<PathBuf> {
        let path = Self::path(dir, batch_id);
        let temp_path = dir.join(format!("{batch_id}.summary.tmp"));
        let content = serde_json::to_string_pretty(self)?;

        let write = || -> std::io::Result<()> {
            let mut file = std::fs::File::create(&temp_path)?;
            file.write_all(content.as_bytes())?;
            file.sync_all()?;
            std::fs::rename(&temp_path, &path)
        };
        write().map_err(|source| BatchError::Output {
            path: path.clone(),
            source,
        })?;

        Ok(path)
    }
}

/// Folds scan results into a [`BatchSummary`].
///
/// Only the outcome of each result is kept, never its evidence. A later
/// record for the same domain replaces the earlier one; rejected rows are
/// each counted on their own, even when their inputs repeat.
#[derive(Debug, Clone)]
pub struct SummaryBuilder {
    batch_id: String,
    started_at: Timestamp,
    entries: Vec<Outcome>,
    /// Position of each scanned domain in `entries`
    by_domain: HashMap<String, usize>,
}

/// What the summary needs from one result.
#[derive(Debug, Clone)]
struct Outcome {
    status: DomainStatus,
    trackers: Vec<TrackerType>,
}

impl Outcome {
    fn of(result: &ScanResult) -> Self {
        Self {
            status: DomainStatus {
                domain: result.key().to_string(),
                status: result.scan_status,
                error_kind: result.error_kind,
            },
            trackers: result.detections.iter().map(|d| d.tracker_type).collect(),
        }
    }
}

impl SummaryBuilder {
    #[must_use]
    pub fn new(batch_id: &BatchId, started_at: Timestamp) -> Self {
        Self {
            batch_id: batch_id.to_string(),
            started_at,
            entries: Vec::new(),
            by_domain: HashMap::new(),
        }
    }

    pub fn record(&mut self, result: &ScanResult) {
        let outcome = Outcome::of(result);
        let Some(domain) = &result.normalized_domain else {
            self.entries.push(outcome);
            return;
        };

        match self.by_domain.get(domain) {
            Some(&idx) => self.entries[idx] = outcome,
            None => {
                self.by_domain.insert(domain.clone(), self.entries.len());
                self.entries.push(outcome);
            }
        }
    }

    /// Records folded so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn finish(&self, completed_at: Timestamp) -> BatchSummary {
        let mut summary = BatchSummary {
            batch_id: self.batch_id.clone(),
            total: 0,
            succeeded: 0,
            failed: 0,
            rejected: 0,
            with_trackers: 0,
            tracker_totals: BTreeMap::new(),
            failures_by_kind: BTreeMap::new(),
            domains: Vec::with_capacity(self.entries.len()),
            started_at: self.started_at,
            completed_at,
            duration_seconds: completed_at.seconds_since(&self.started_at),
            success_rate: 0.0,
            domains_per_minute: 0.0,
        };

        for outcome in &self.entries {
            let status = &outcome.status;
            summary.total += 1;
            match status.status {
                ScanStatus::Success => summary.succeeded += 1,
                ScanStatus::Failed => summary.failed += 1,
                ScanStatus::Rejected => summary.rejected += 1,
            }
            if status.status == ScanStatus::Success && !outcome.trackers.is_empty() {
                summary.with_trackers += 1;
            }
            for tracker in &outcome.trackers {
                *summary.tracker_totals.entry(*tracker).or_default() += 1;
            }
            if let Some(kind) = status.error_kind {
                *summary.failures_by_kind.entry(kind).or_default() += 1;
            }
            summary.domains.push(status.clone());
        }

        let scanned = summary.succeeded + summary.failed;
        if scanned > 0 {
            summary.success_rate = summary.succeeded as f64 / scanned as f64;
        }
        if summary.duration_seconds > 0.0 {
            summary.domains_per_minute = scanned as f64 * 60.0 / summary.duration_seconds;
        }

        summary
    }
}
