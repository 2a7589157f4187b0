//! Tracker detection for `PixelScan`.
//!
//! A [`DetectorRegistry`] holds one [`Probe`] per supported tracking
//! platform. Each scan's [`Evidence`] (network requests, final DOM,
//! window globals and cookies) is offered to every probe; each probe
//! yields at most one [`Detection`].

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod detection;
pub mod error;
pub mod evidence;
pub mod probe;
pub mod probes;
pub mod registry;

pub use detection::{Detection, DetectionReport, MatchedEvidence, ProbeMatches, SNIPPET_LIMIT};
pub use error::DetectionError;
pub use evidence::{Cookie, DomFragments, Evidence};
pub use probe::{PatternProbe, Probe, ProbeSpec};
pub use registry::DetectorRegistry;
