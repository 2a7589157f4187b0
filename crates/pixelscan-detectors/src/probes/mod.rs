//! Built-in probes, one per supported tracking platform.

pub mod google;
pub mod linkedin;
pub mod meta;
pub mod pinterest;
pub mod snapchat;
pub mod tiktok;
pub mod twitter;

use crate::probe::{PatternProbe, Probe, ProbeSpec};

/// Specs for every built-in probe, in registry order.
pub static BUILTIN_SPECS: [&ProbeSpec; 8] = [
    &meta::SPEC,
    &google::ANALYTICS,
    &google::ADS,
    &tiktok::SPEC,
    &linkedin::SPEC,
    &twitter::SPEC,
    &pinterest::SPEC,
    &snapchat::SPEC,
];

/// Instantiate the built-in probes.
#[must_use]
pub fn builtin() -> Vec<Box<dyn Probe>> {
    BUILTIN_SPECS
        .iter()
        .map(|spec| Box::new(PatternProbe::new(spec)) as Box<dyn Probe>)
        .collect()
}
