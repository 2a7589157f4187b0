//! LinkedIn Insight Tag.

use crate::probe::ProbeSpec;
use pixelscan_core::TrackerType;

pub static SPEC: ProbeSpec = ProbeSpec {
    tracker: TrackerType::LinkedinInsight,
    tracking_domains: &[
        "px.ads.linkedin.com",
        "dc.ads.linkedin.com",
        "snap.licdn.com",
        "linkedin.com/px",
    ],
    script_patterns: &[
        r"\b_linkedin_partner_id\b",
        r"\b_linkedin_data_partner_ids\b",
        r"snap\.licdn\.com/li\.lms-analytics/insight\.min\.js",
        r"\blintrk\s*\(",
    ],
    global_names: &["_linkedin_data_partner_ids", "_linkedin_partner_id", "lintrk"],
    cookie_names: &["li_fat_id", "li_sugr", "lidc"],
    cookie_prefixes: &[],
    url_id_patterns: &[r"[?&]pid=(\d+)"],
    script_id_patterns: &[r#"_linkedin_partner_id\s*=\s*['"]?(\d+)"#],
};
