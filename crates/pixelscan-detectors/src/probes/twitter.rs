//! Twitter (X) conversion tracking.

use crate::probe::ProbeSpec;
use pixelscan_core::TrackerType;

pub static SPEC: ProbeSpec = ProbeSpec {
    tracker: TrackerType::TwitterPixel,
    tracking_domains: &[
        "static.ads-twitter.com",
        "ads-api.twitter.com",
        "analytics.twitter.com",
        "t.co/i/adsct",
    ],
    script_patterns: &[
        r#"\btwq\s*\(\s*['"](?:init|config|track|event)['"]"#,
        r"static\.ads-twitter\.com/uwt\.js",
    ],
    global_names: &["twq"],
    cookie_names: &["personalization_id", "muc_ads"],
    cookie_prefixes: &[],
    url_id_patterns: &[r"[?&]txn_id=([a-z0-9]+)"],
    script_id_patterns: &[r#"twq\s*\(\s*['"](?:init|config)['"]\s*,\s*['"]([a-z0-9]+)['"]"#],
};
