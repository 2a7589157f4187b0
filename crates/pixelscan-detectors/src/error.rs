//! Error types for probe evaluation.

use pixelscan_core::TrackerType;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single probe failed while evaluating evidence.
///
/// The failure is confined to `tracker`; the rest of the registry still runs.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("probe {tracker} failed: {message}")]
pub struct DetectionError {
    /// Tracker whose probe failed
    pub tracker: TrackerType,
    /// Panic payload or error description
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DetectionError {
            tracker: TrackerType::PinterestTag,
            message: "index out of bounds".to_string(),
        };
        assert_eq!(err.to_string(), "probe pinterest_tag failed: index out of bounds");
    }
}
