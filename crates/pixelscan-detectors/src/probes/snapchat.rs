//! Snapchat Pixel.

use crate::probe::ProbeSpec;
use pixelscan_core::TrackerType;

pub static SPEC: ProbeSpec = ProbeSpec {
    tracker: TrackerType::SnapchatPixel,
    tracking_domains: &[
        "sc-static.net/scevent",
        "tr.snapchat.com",
        "tr-shadow.snapchat.com",
    ],
    script_patterns: &[
        r#"\bsnaptr\s*\(\s*['"](?:init|track)['"]"#,
        r"sc-static\.net/scevent\.min\.js",
    ],
    global_names: &["snaptr"],
    cookie_names: &["_scid", "_scid_r", "_sctr", "sc_at"],
    cookie_prefixes: &[],
    url_id_patterns: &[r"[?&]pid=([a-f0-9-]{8,})"],
    script_id_patterns: &[r#"snaptr\s*\(\s*['"]init['"]\s*,\s*['"]([a-f0-9-]{8,})['"]"#],
};
