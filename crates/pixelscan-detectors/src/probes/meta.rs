//! Meta (Facebook) Pixel.

use crate::probe::ProbeSpec;
use pixelscan_core::TrackerType;

pub static SPEC: ProbeSpec = ProbeSpec {
    tracker: TrackerType::MetaPixel,
    tracking_domains: &[
        "facebook.com/tr",
        "connect.facebook.net",
        "facebook.com/signals",
    ],
    script_patterns: &[
        r#"\bfbq\s*\(\s*['"](?:init|track|trackcustom)['"]"#,
        r"connect\.facebook\.net/[^\s]*fbevents\.js",
        r"facebook\.com/tr\?",
        r"\b_fbq\s*=",
    ],
    global_names: &["fbq", "_fbq"],
    cookie_names: &["_fbp", "_fbc"],
    cookie_prefixes: &[],
    url_id_patterns: &[r"[?&]id=(\d+)"],
    script_id_patterns: &[r#"fbq\s*\(\s*['"]init['"]\s*,\s*['"](\d+)['"]"#],
};
