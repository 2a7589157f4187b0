//! TikTok Pixel.

use crate::probe::ProbeSpec;
use pixelscan_core::TrackerType;

pub static SPEC: ProbeSpec = ProbeSpec {
    tracker: TrackerType::TiktokPixel,
    tracking_domains: &["analytics.tiktok.com"],
    script_patterns: &[
        r"\bttq\.(?:load|page|track|identify)\s*\(",
        r"analytics\.tiktok\.com/i18n/pixel",
    ],
    global_names: &["ttq", "TiktokAnalyticsObject"],
    cookie_names: &["_ttp", "_tt_enable_cookie"],
    cookie_prefixes: &[],
    url_id_patterns: &[r"[?&](?:sdkid|pixel_code)=([A-Z0-9]+)"],
    script_id_patterns: &[r#"ttq\.load\s*\(\s*['"]([A-Z0-9]+)['"]"#],
};
