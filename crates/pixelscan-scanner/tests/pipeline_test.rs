mod common;

use common::{pipeline, test_settings, FakeBrowser, FakeNet, Site};
use pixelscan_browser::NavigationError;
use pixelscan_core::{ErrorKind, ScanStatus, TrackerType};
use pixelscan_resolver::normalize;
use pixelscan_scanner::ScanTarget;
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

fn target(input: &str) -> ScanTarget {
    ScanTarget {
        input: input.to_string(),
        correlation_id: Some("row-1".to_string()),
        domain: normalize(input).expect("valid domain"),
    }
}

#[tokio::test]
async fn test_clean_site_succeeds_without_detections() {
    let browser = FakeBrowser::default().site("clean.example", Site::clean());
    let pipeline = pipeline(FakeNet::default(), &browser, 2, test_settings(true));

    let result = pipeline
        .scan(&target("https://Clean.example/"), &CancellationToken::new())
        .await;

    assert_eq!(result.scan_status, ScanStatus::Success);
    assert!(result.detections.is_empty());
    assert!(result.error_kind.is_none());
    assert_eq!(result.normalized_domain.as_deref(), Some("clean.example"));
    assert_eq!(result.correlation_id.as_deref(), Some("row-1"));
    assert_eq!(result.attempts, 1);
    assert!(result.metadata.page_load_seconds.is_some());
    assert_eq!(browser.launched(), 1);
    assert_eq!(browser.closed(), 1);
    assert_eq!(browser.live(), 0);
}

#[tokio::test]
async fn test_tracker_is_detected_from_collected_evidence() {
    let browser = FakeBrowser::default().site("clinic.example", Site::with_meta_pixel());
    let pipeline = pipeline(FakeNet::default(), &browser, 2, test_settings(true));

    let result = pipeline
        .scan(&target("clinic.example"), &CancellationToken::new())
        .await;

    assert_eq!(result.scan_status, ScanStatus::Success);
    assert_eq!(result.detections.len(), 1);
    let detection = &result.detections[0];
    assert_eq!(detection.tracker_type, TrackerType::MetaPixel);
    assert_eq!(detection.tracker_id.as_deref(), Some("1234567890"));
    assert!(!detection.evidence.network_requests.is_empty());
    assert_eq!(detection.evidence.global_names, vec!["fbq"]);
    assert_eq!(detection.evidence.cookies, vec!["_fbp"]);
    assert_eq!(result.metadata.tracking_requests, 1);
    assert_eq!(result.metadata.total_requests, 2);
    assert!(result.unknown_trackers.is_empty());
}

#[tokio::test]
async fn test_dead_dns_skips_browser_entirely() {
    let browser = FakeBrowser::default();
    let net = FakeNet::default().nxdomain("not-a-real-domain-xyz123.invalid");
    let pipeline = pipeline(net, &browser, 2, test_settings(true));

    let result = pipeline
        .scan(
            &target("not-a-real-domain-xyz123.invalid"),
            &CancellationToken::new(),
        )
        .await;

    assert_eq!(result.scan_status, ScanStatus::Failed);
    assert_eq!(result.error_kind, Some(ErrorKind::Unreachable));
    assert!(result.error.is_some());
    assert_eq!(browser.launched(), 0);
}

#[tokio::test]
async fn test_no_reachable_variant_lists_candidates() {
    let browser = FakeBrowser::default();
    let net = FakeNet::default().refusing("offline.example");
    let pipeline = pipeline(net, &browser, 2, test_settings(false));

    let result = pipeline
        .scan(&target("offline.example"), &CancellationToken::new())
        .await;

    assert_eq!(result.error_kind, Some(ErrorKind::NoReachableVariant));
    assert_eq!(
        result.candidates,
        vec![
            "https://www.offline.example",
            "https://offline.example",
            "http://www.offline.example",
            "http://offline.example",
        ]
    );
    assert_eq!(browser.launched(), 0);
}

#[tokio::test]
async fn test_transient_failures_are_retried_in_fresh_sessions() {
    let flaky = Site::clean().failing(vec![
        NavigationError::Timeout,
        NavigationError::Http5xx { status: 502 },
    ]);
    let browser = FakeBrowser::default().site("flaky.example", flaky);
    let pipeline = pipeline(FakeNet::default(), &browser, 2, test_settings(true));

    let result = pipeline
        .scan(&target("flaky.example"), &CancellationToken::new())
        .await;

    assert_eq!(result.scan_status, ScanStatus::Success);
    assert_eq!(result.attempts, 3);
    assert_eq!(result.metadata.errors.len(), 2);
    assert_eq!(browser.launched(), 3);
    assert_eq!(browser.closed(), 3);
    assert_eq!(browser.live(), 0);
}

#[tokio::test]
async fn test_client_error_is_not_retried() {
    let gone = Site::clean().failing(vec![NavigationError::Http4xx { status: 404 }]);
    let browser = FakeBrowser::default().site("gone.example", gone);
    let pipeline = pipeline(FakeNet::default(), &browser, 2, test_settings(true));

    let result = pipeline
        .scan(&target("gone.example"), &CancellationToken::new())
        .await;

    assert_eq!(result.scan_status, ScanStatus::Failed);
    assert_eq!(result.error_kind, Some(ErrorKind::Http4xx));
    assert_eq!(result.attempts, 1);
    assert_eq!(browser.launched(), 1);
}

#[tokio::test]
async fn test_retries_exhausted_reports_last_failure() {
    let blocked = Site::clean().failing(vec![
        NavigationError::BotBlocked { status: 403 };
        5
    ]);
    let browser = FakeBrowser::default().site("guarded.example", blocked);
    let pipeline = pipeline(FakeNet::default(), &browser, 2, test_settings(true));

    let result = pipeline
        .scan(&target("guarded.example"), &CancellationToken::new())
        .await;

    assert_eq!(result.error_kind, Some(ErrorKind::BotBlocked));
    // max_retries = 2 gives three attempts in total
    assert_eq!(result.attempts, 3);
    assert_eq!(browser.launched(), 3);
    assert_eq!(browser.live(), 0);
}

#[tokio::test]
async fn test_cancellation_closes_the_session() {
    let browser = FakeBrowser::default().site("stuck.example", Site::hanging());
    let pipeline = pipeline(FakeNet::default(), &browser, 2, test_settings(true));

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let result = pipeline.scan(&target("stuck.example"), &cancel).await;

    assert!(result.is_cancelled());
    assert_eq!(result.error_kind, Some(ErrorKind::Cancelled));
    assert_eq!(browser.launched(), 1);
    assert_eq!(browser.closed(), 1);
    assert_eq!(browser.live(), 0);
}

#[tokio::test]
async fn test_screenshot_is_saved_when_enabled() {
    let dir = TempDir::new().expect("tempdir");
    let mut settings = test_settings(true);
    settings.screenshot_dir = Some(dir.path().to_path_buf());
    let browser = FakeBrowser::default();
    let pipeline = pipeline(FakeNet::default(), &browser, 1, settings);

    let result = pipeline
        .scan(&target("shot.example"), &CancellationToken::new())
        .await;

    let path = result.metadata.screenshot.expect("screenshot path");
    assert!(std::path::Path::new(&path).exists());
}
