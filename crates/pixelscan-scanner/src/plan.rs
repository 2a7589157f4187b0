//! Normalization and deduplication of batch targets.

use crate::input::RawTarget;
use pixelscan_resolver::{normalize, Domain, ValidationError};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// A deduplicated target ready to scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanTarget {
    /// Input as first seen
    pub input: String,
    /// Correlation id of the first row naming this domain
    pub correlation_id: Option<String>,
    pub domain: Domain,
}

/// An input row that could not be normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedTarget {
    pub input: String,
    pub correlation_id: Option<String>,
    pub error: ValidationError,
}

/// Targets of one batch, deduplicated by normalized domain.
#[derive(Debug, Clone, Default)]
pub struct BatchPlan {
    targets: Vec<ScanTarget>,
    rejected: Vec<RejectedTarget>,
    ids: HashMap<String, Domain>,
    duplicates: usize,
}

impl BatchPlan {
    /// Normalize every row, keeping input order and the first row per domain.
    #[must_use]
    pub fn build(raw: Vec<RawTarget>) -> Self {
        let mut plan = Self::default();
        let mut seen = HashSet::new();

        for row in raw {
            let domain = match normalize(&row.input) {
                Ok(domain) => domain,
                Err(error) => {
                    debug!(input = %row.input, %error, "rejected target");
                    plan.rejected.push(RejectedTarget {
                        input: row.input,
                        correlation_id: row.correlation_id,
                        error,
                    });
                    continue;
                }
            };

            if let Some(id) = &row.correlation_id {
                plan.ids.entry(id.clone()).or_insert_with(|| domain.clone());
            }

            if seen.insert(domain.clone()) {
                plan.targets.push(ScanTarget {
                    input: row.input,
                    correlation_id: row.correlation_id,
                    domain,
                });
            } else {
                plan.duplicates += 1;
            }
        }

        plan
    }

    /// Unique targets in first-seen order.
    #[must_use]
    pub fn targets(&self) -> &[ScanTarget] {
        &self.targets
    }

    #[must_use]
    pub fn rejected(&self) -> &[RejectedTarget] {
        &self.rejected
    }

    /// Domain a correlation id was joined to.
    #[must_use]
    pub fn domain_for(&self, correlation_id: &str) -> Option<&Domain> {
        self.ids.get(correlation_id)
    }

    /// Rows dropped because their domain was already planned.
    #[must_use]
    pub fn duplicates(&self) -> usize {
        self.duplicates
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}
