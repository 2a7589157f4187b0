//! Google Analytics and Google Ads.
//!
//! Both load through `googletagmanager.com/gtag/js`; the `id=` prefix
//! (`G-`/`UA-` versus `AW-`) decides which one a tag belongs to.

use crate::probe::ProbeSpec;
use pixelscan_core::TrackerType;

pub static ANALYTICS: ProbeSpec = ProbeSpec {
    tracker: TrackerType::GoogleAnalytics,
    tracking_domains: &[
        "google-analytics.com",
        "analytics.google.com",
        "googletagmanager.com/gtag/js?id=g-",
        "googletagmanager.com/gtag/js?id=ua-",
    ],
    script_patterns: &[
        r#"gtag\s*\(\s*['"]config['"]\s*,\s*['"](?:G|UA)-"#,
        r#"\bga\s*\(\s*['"]create['"]"#,
        r"google-analytics\.com/(?:analytics|ga)\.js",
        r"googletagmanager\.com/gtag/js\?id=(?:G|UA)-",
    ],
    global_names: &["ga", "gaGlobal", "GoogleAnalyticsObject"],
    cookie_names: &["_ga", "_gid", "_gat", "__utma", "__utmz"],
    cookie_prefixes: &["_ga_"],
    url_id_patterns: &[r"[?&](?:tid|id)=(G-[A-Z0-9]+|UA-\d+-\d+)"],
    script_id_patterns: &[r#"['"](G-[A-Z0-9]{4,}|UA-\d+-\d+)['"]"#],
};

pub static ADS: ProbeSpec = ProbeSpec {
    tracker: TrackerType::GoogleAds,
    tracking_domains: &[
        "googleadservices.com",
        "googleads.g.doubleclick.net",
        "google.com/pagead/",
        "googletagmanager.com/gtag/js?id=aw-",
    ],
    script_patterns: &[
        r#"gtag\s*\(\s*['"]config['"]\s*,\s*['"]AW-"#,
        r"\bgoogle_conversion_id\b",
        r"googleadservices\.com/pagead/conversion(?:_async)?\.js",
        r"googletagmanager\.com/gtag/js\?id=AW-",
    ],
    global_names: &["google_trackConversion", "google_conversion_id"],
    cookie_names: &["_gcl_aw", "_gcl_au", "_gcl_dc"],
    cookie_prefixes: &[],
    url_id_patterns: &[r"(AW-\d+)", r"/conversion/(\d+)"],
    script_id_patterns: &[r"(AW-\d+)", r"google_conversion_id\s*=\s*(\d+)"],
};
