//! Pinterest Tag.

use crate::probe::ProbeSpec;
use pixelscan_core::TrackerType;

pub static SPEC: ProbeSpec = ProbeSpec {
    tracker: TrackerType::PinterestTag,
    tracking_domains: &["ct.pinterest.com", "s.pinimg.com/ct"],
    script_patterns: &[
        r#"\bpintrk\s*\(\s*['"](?:load|page|track)['"]"#,
        r"s\.pinimg\.com/ct/core\.js",
    ],
    global_names: &["pintrk"],
    cookie_names: &["_pinterest_ct_ua", "_pinterest_ct_rt", "_epik", "_derived_epik", "_pin_unauth"],
    cookie_prefixes: &[],
    url_id_patterns: &[r"[?&]tid=(\d+)"],
    script_id_patterns: &[r#"pintrk\s*\(\s*['"]load['"]\s*,\s*['"](\d+)['"]"#],
};
