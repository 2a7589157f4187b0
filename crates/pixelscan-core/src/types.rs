//! Shared types used across PixelScan.
//!
//! This module defines common newtypes and enums that provide type safety
//! and clear domain modeling.

use crate::error::PixelScanError;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// Newtype for batch identifiers with validation.
///
/// Batch IDs name files on disk, so they are restricted to ASCII
/// alphanumerics plus `.`, `_` and `-`, 1-64 characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BatchId(String);

impl BatchId {
    /// Create a new `BatchId` from a string.
    ///
    /// # Errors
    /// Returns error if the ID doesn't match the required format.
    pub fn new(id: impl Into<String>) -> Result<Self, PixelScanError> {
        let id = id.into();
        Self::validate(&id)?;
        Ok(Self(id))
    }

    /// Create a new random `BatchId` using UUID v4.
    #[must_use]
    pub fn generate() -> Self {
        Self(format!("batch-{}", uuid::Uuid::new_v4()))
    }

    /// Get the inner string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate(id: &str) -> Result<(), PixelScanError> {
        static BATCH_REGEX: OnceLock<Regex> = OnceLock::new();
        let regex = BATCH_REGEX
            .get_or_init(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]{0,63}$").expect("valid regex"));

        if regex.is_match(id) {
            Ok(())
        } else {
            Err(PixelScanError::Validation(format!(
                "invalid batch ID: must be 1-64 characters of [A-Za-z0-9._-], got '{id}'"
            )))
        }
    }
}

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Tracking platforms the scanner knows how to detect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackerType {
    /// Meta (Facebook) Pixel
    MetaPixel,
    /// Google Analytics (Universal and GA4)
    GoogleAnalytics,
    /// Google Ads conversion tracking
    GoogleAds,
    /// TikTok Pixel
    TiktokPixel,
    /// LinkedIn Insight Tag
    LinkedinInsight,
    /// Twitter / X conversion pixel
    TwitterPixel,
    /// Pinterest Tag
    PinterestTag,
    /// Snapchat Pixel
    SnapchatPixel,
}

impl TrackerType {
    /// Every tracker type, in registry order.
    pub const ALL: [TrackerType; 8] = [
        Self::MetaPixel,
        Self::GoogleAnalytics,
        Self::GoogleAds,
        Self::TiktokPixel,
        Self::LinkedinInsight,
        Self::TwitterPixel,
        Self::PinterestTag,
        Self::SnapchatPixel,
    ];

    /// Stable snake_case identifier, identical to the serialized form.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MetaPixel => "meta_pixel",
            Self::GoogleAnalytics => "google_analytics",
            Self::GoogleAds => "google_ads",
            Self::TiktokPixel => "tiktok_pixel",
            Self::LinkedinInsight => "linkedin_insight",
            Self::TwitterPixel => "twitter_pixel",
            Self::PinterestTag => "pinterest_tag",
            Self::SnapchatPixel => "snapchat_pixel",
        }
    }

    /// Get a human-readable display name for the tracker.
    #[must_use]
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::MetaPixel => "Meta Pixel",
            Self::GoogleAnalytics => "Google Analytics",
            Self::GoogleAds => "Google Ads",
            Self::TiktokPixel => "TikTok Pixel",
            Self::LinkedinInsight => "LinkedIn Insight Tag",
            Self::TwitterPixel => "Twitter Pixel",
            Self::PinterestTag => "Pinterest Tag",
            Self::SnapchatPixel => "Snapchat Pixel",
        }
    }

    /// Fixed risk level for this tracker type.
    ///
    /// Every supported platform shares visitor data with an advertising or
    /// analytics vendor, so all of them rate high.
    #[must_use]
    #[allow(clippy::unused_self)]
    pub fn risk_level(&self) -> RiskLevel {
        RiskLevel::High
    }

    /// Whether this tracker raises HIPAA concerns on healthcare sites.
    #[must_use]
    #[allow(clippy::unused_self)]
    pub fn hipaa_concern(&self) -> bool {
        true
    }
}

impl fmt::Display for TrackerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Compliance risk attached to a detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    /// Data flows to a third party that can link it to individuals
    High,
    /// Data flows to a third party with limited linkage
    Medium,
    /// Negligible exposure
    Low,
}

/// Terminal status of one target in a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanStatus {
    /// Page was scanned and detection ran
    Success,
    /// Scan ended with an error kind
    Failed,
    /// Input could not be normalized into a domain
    Rejected,
}

impl fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Rejected => "rejected",
        };
        write!(f, "{s}")
    }
}

/// Terminal error kind recorded for a failed or rejected target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Input was not a domain
    Validation,
    /// Health check found the host dead
    Unreachable,
    /// No candidate address answered
    NoReachableVariant,
    /// Navigation timed out
    Timeout,
    /// Browser could not resolve the host
    Dns,
    /// TLS handshake or certificate failure
    Tls,
    /// Server answered 4xx
    Http4xx,
    /// Server answered 5xx
    Http5xx,
    /// Bot protection challenged the browser
    BotBlocked,
    /// Browser failed to launch or crashed
    Browser,
    /// Batch deadline cancelled the scan
    Cancelled,
}

impl ErrorKind {
    /// Stable snake_case identifier, identical to the serialized form.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Unreachable => "unreachable",
            Self::NoReachableVariant => "no_reachable_variant",
            Self::Timeout => "timeout",
            Self::Dns => "dns",
            Self::Tls => "tls",
            Self::Http4xx => "http4xx",
            Self::Http5xx => "http5xx",
            Self::BotBlocked => "bot_blocked",
            Self::Browser => "browser",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Wrapper around `chrono::DateTime<Utc>` for consistent timestamp handling.
///
/// Provides serialization/deserialization and utility methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Create a timestamp representing the current moment.
    #[must_use]
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Get the inner `DateTime<Utc>`.
    #[must_use]
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Parse a timestamp from an RFC3339 string.
    pub fn from_rfc3339(s: &str) -> Result<Self, PixelScanError> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| Self(dt.with_timezone(&Utc)))
            .map_err(|e| PixelScanError::Validation(format!("invalid timestamp: {e}")))
    }

    /// Format as RFC3339 string.
    #[must_use]
    pub fn to_rfc3339(&self) -> String {
        self.0.to_rfc3339()
    }

    /// Seconds elapsed from `earlier` to `self`, never negative.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn seconds_since(&self, earlier: &Timestamp) -> f64 {
        let millis = (self.0 - earlier.0).num_milliseconds().max(0);
        millis as f64 / 1000.0
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::now()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }
}

impl From<Timestamp> for DateTime<Utc> {
    fn from(ts: Timestamp) -> Self {
        ts.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_id_valid() {
        for id in ["nightly", "2026-10-19", "portfolio_a.v2", "b"] {
            assert!(BatchId::new(id).is_ok(), "Failed for: {id}");
        }
    }

    #[test]
    fn test_batch_id_invalid() {
        let too_long = "a".repeat(65);
        let invalid_ids = vec![
            "",
            "../escape",
            "-leading",
            "has space",
            "slash/inside",
            too_long.as_str(),
        ];

        for id in invalid_ids {
            assert!(BatchId::new(id).is_err(), "Should fail for: {id}");
        }
    }

    #[test]
    fn test_batch_id_generate() {
        let id1 = BatchId::generate();
        let id2 = BatchId::generate();
        assert_ne!(id1, id2);
        assert!(BatchId::new(id1.as_str()).is_ok());
    }

    #[test]
    fn test_tracker_type_serialization() {
        for tracker in TrackerType::ALL {
            let json = serde_json::to_string(&tracker).expect("serialize tracker type");
            assert_eq!(json, format!("\"{}\"", tracker.as_str()));

            let back: TrackerType = serde_json::from_str(&json).expect("deserialize tracker type");
            assert_eq!(back, tracker);
        }
    }

    #[test]
    fn test_tracker_severity_is_fixed() {
        for tracker in TrackerType::ALL {
            assert_eq!(tracker.risk_level(), RiskLevel::High);
            assert!(tracker.hipaa_concern());
        }
    }

    #[test]
    fn test_error_kind_display_matches_serde() {
        let kind = ErrorKind::NoReachableVariant;
        let json = serde_json::to_string(&kind).expect("serialize error kind");
        assert_eq!(json, "\"no_reachable_variant\"");
        assert_eq!(kind.to_string(), "no_reachable_variant");
        assert_eq!(ErrorKind::BotBlocked.to_string(), "bot_blocked");
    }

    #[test]
    fn test_timestamp_rfc3339() {
        let ts = Timestamp::now();
        let s = ts.to_rfc3339();
        let parsed = Timestamp::from_rfc3339(&s).expect("parse RFC3339 timestamp");
        assert_eq!(ts.as_datetime().timestamp(), parsed.as_datetime().timestamp());
    }

    #[test]
    fn test_seconds_since() {
        let start = Timestamp::from_rfc3339("2026-01-01T00:00:00Z").expect("parse start");
        let end = Timestamp::from_rfc3339("2026-01-01T00:00:02.500Z").expect("parse end");
        assert!((end.seconds_since(&start) - 2.5).abs() < f64::EPSILON);
        assert!(start.seconds_since(&end).abs() < f64::EPSILON);
    }
}
