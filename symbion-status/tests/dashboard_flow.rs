//! End-to-end refresh and connection-test flows against the devkit mock server.

use symbion_devkit::{RegistryBuilder, TestHarness, UNREACHABLE_URL};
use symbion_status::config::encode_credential;
use symbion_status::render::DashboardSummary;
use symbion_status::time_source::local_now;
use symbion_status::{Dashboard, DashboardView, StatusConfig, TestOutcome, DEFAULT_THRESHOLD_SECS};

const T: i64 = 1_700_000_000;

fn config_for(harness: &TestHarness) -> StatusConfig {
    StatusConfig {
        registry_url: harness.registry_url(),
        time_probe_url: Some(harness.time_url()),
        request_timeout_secs: 5,
        ..StatusConfig::default()
    }
}

fn ready(view: DashboardView) -> symbion_status::RenderedDashboard {
    match view {
        DashboardView::Ready(rendered) => rendered,
        other => panic!("expected a rendered dashboard, got {other:?}"),
    }
}

#[tokio::test]
async fn fresh_heartbeat_renders_online() {
    let registry = RegistryBuilder::new().device("dev1", "10.0.0.5", T - 50);
    let harness = TestHarness::with_registry(&registry, T).await.unwrap();
    let dashboard = Dashboard::from_config(&config_for(&harness)).unwrap();

    let rendered = ready(dashboard.refresh().await);
    assert_eq!(rendered.summary, DashboardSummary { total: 1, online: 1, offline: 0 });
    assert_eq!(rendered.last_updated, T);

    let card = rendered.card("dev1").unwrap();
    assert!(card.online);
    assert_eq!(card.badge.label, "Online");
    assert_eq!(card.control_url, "http://10.0.0.5:8000");
    assert_eq!(harness.server.time_hits(), 1);
}

#[tokio::test]
async fn cards_follow_registry_order() {
    let registry = RegistryBuilder::new()
        .device("zeta", "10.0.0.3", T)
        .legacy_device("alpha", "10.0.0.1")
        .device("mid", "10.0.0.2", T - 500);
    let harness = TestHarness::with_registry(&registry, T).await.unwrap();
    let dashboard = Dashboard::from_config(&config_for(&harness)).unwrap();

    let rendered = ready(dashboard.refresh().await);
    let ids: Vec<&str> = rendered.cards.iter().map(|c| c.device_id.as_str()).collect();
    assert_eq!(ids, vec!["zeta", "alpha", "mid"]);
    assert_eq!(rendered.summary, DashboardSummary { total: 3, online: 1, offline: 2 });

    // second refresh over the same inputs yields the same view
    assert_eq!(ready(dashboard.refresh().await), rendered);
}

#[tokio::test]
async fn empty_registry_has_zero_counts() {
    let harness = TestHarness::with_registry(&RegistryBuilder::new(), T).await.unwrap();
    let dashboard = Dashboard::from_config(&config_for(&harness)).unwrap();

    let rendered = ready(dashboard.refresh().await);
    assert!(rendered.cards.is_empty());
    assert_eq!(rendered.summary, DashboardSummary::default());
}

#[tokio::test]
async fn http_404_shows_banner_and_drops_cards() {
    let registry = RegistryBuilder::new().device("dev1", "10.0.0.5", T - 50);
    let harness = TestHarness::with_registry(&registry, T).await.unwrap();
    let dashboard = Dashboard::from_config(&config_for(&harness)).unwrap();
    ready(dashboard.refresh().await);

    harness.server.set_status(404);
    let view = dashboard.refresh().await;
    match &view {
        DashboardView::Failed { message } => assert!(message.contains("404"), "{message}"),
        other => panic!("expected error banner, got {other:?}"),
    }
    assert!(view.rendered().is_none());
    assert!(dashboard.view().card("dev1").is_none());
}

#[tokio::test]
async fn missing_registry_section_is_reported() {
    let harness = TestHarness::start().await.unwrap();
    harness
        .server
        .set_document(&serde_json::json!({"files": {"notes.md": {"content": "hello"}}}));
    let dashboard = Dashboard::from_config(&config_for(&harness)).unwrap();

    match dashboard.refresh().await {
        DashboardView::Failed { message } => assert_eq!(message, "Error: No valid device data found"),
        other => panic!("expected error banner, got {other:?}"),
    }
}

#[tokio::test]
async fn legacy_entry_matches_zero_timestamp_entry() {
    let registry = RegistryBuilder::new()
        .legacy_device("cam", "192.168.1.5")
        .device("cam2", "192.168.1.5", 0);
    let harness = TestHarness::with_registry(&registry, T).await.unwrap();
    let dashboard = Dashboard::from_config(&config_for(&harness)).unwrap();

    let rendered = ready(dashboard.refresh().await);
    let legacy = rendered.card("cam").unwrap();
    let object = rendered.card("cam2").unwrap();
    assert!(!legacy.online);
    assert_eq!(legacy.online, object.online);
    assert_eq!(legacy.ip, object.ip);
    assert_eq!(legacy.control_url, "http://192.168.1.5:8000");
}

#[tokio::test]
async fn refresh_and_test_agree_at_the_threshold() {
    let registry = RegistryBuilder::new()
        .device("edge", "10.0.0.5", T - DEFAULT_THRESHOLD_SECS)
        .device("stale", "10.0.0.6", T - DEFAULT_THRESHOLD_SECS - 1);
    let harness = TestHarness::with_registry(&registry, T).await.unwrap();
    let dashboard = Dashboard::from_config(&config_for(&harness)).unwrap();

    let rendered = ready(dashboard.refresh().await);
    assert!(rendered.card("edge").unwrap().online);
    assert!(!rendered.card("stale").unwrap().online);

    assert_eq!(dashboard.test_device("edge").await.outcome, TestOutcome::Online);
    assert_eq!(dashboard.test_device("stale").await.outcome, TestOutcome::Offline);
}

#[tokio::test]
async fn test_updates_only_the_tested_card() {
    let registry = RegistryBuilder::new()
        .device("dev1", "10.0.0.5", T - 500)
        .device("dev2", "10.0.0.6", T - 500);
    let harness = TestHarness::with_registry(&registry, T).await.unwrap();
    let dashboard = Dashboard::from_config(&config_for(&harness)).unwrap();
    let before = ready(dashboard.refresh().await);

    // dev1 comes back, dev2 would too but is not re-tested
    harness.publish(
        &RegistryBuilder::new()
            .device("dev1", "10.0.0.5", T - 5)
            .device("dev2", "10.0.0.6", T - 5),
    );
    let report = dashboard.test_device("dev1").await;
    assert_eq!(report.outcome, TestOutcome::Online);
    assert_eq!(report.message, "Device dev1 online");

    let after = ready(dashboard.view());
    let dev1 = after.card("dev1").unwrap();
    assert!(dev1.online);
    assert_eq!(dev1.ip, before.card("dev1").unwrap().ip);
    assert!(dev1.test.enabled);
    assert_eq!(after.card("dev2"), before.card("dev2"));
    assert_eq!(after.summary, DashboardSummary { total: 2, online: 1, offline: 1 });
}

#[tokio::test]
async fn failed_test_keeps_last_known_status() {
    let registry = RegistryBuilder::new().device("dev1", "10.0.0.5", T - 50);
    let harness = TestHarness::with_registry(&registry, T).await.unwrap();
    let dashboard = Dashboard::from_config(&config_for(&harness)).unwrap();
    ready(dashboard.refresh().await);
    let before = dashboard.view();

    harness.server.set_status(503);
    let report = dashboard.test_device("dev1").await;
    assert_eq!(report.outcome, TestOutcome::Unknown);
    assert_eq!(report.message, "Device status unknown");
    assert_eq!(dashboard.view(), before);
}

#[tokio::test]
async fn test_with_network_unreachable_completes_unknown() {
    let cfg = StatusConfig {
        registry_url: format!("{UNREACHABLE_URL}gists/devices"),
        time_probe_url: Some(UNREACHABLE_URL.to_string()),
        request_timeout_secs: 5,
        ..StatusConfig::default()
    };
    let dashboard = Dashboard::from_config(&cfg).unwrap();
    let before = dashboard.view();

    let report = tokio::time::timeout(std::time::Duration::from_secs(10), dashboard.test_device("dev1"))
        .await
        .expect("test must not hang");
    assert_eq!(report.outcome, TestOutcome::Unknown);
    assert_eq!(dashboard.view(), before);
}

#[tokio::test]
async fn device_removed_from_registry_tests_offline() {
    let registry = RegistryBuilder::new().device("dev1", "10.0.0.5", T - 5);
    let harness = TestHarness::with_registry(&registry, T).await.unwrap();
    let dashboard = Dashboard::from_config(&config_for(&harness)).unwrap();
    ready(dashboard.refresh().await);

    harness.publish(&RegistryBuilder::new());
    assert_eq!(dashboard.test_device("dev1").await.outcome, TestOutcome::Offline);
    assert!(!dashboard.view().card("dev1").unwrap().online);
}

#[tokio::test]
async fn malformed_date_falls_back_to_local_clock() {
    let now = local_now();
    let registry = RegistryBuilder::new().device("dev1", "10.0.0.5", now);
    let harness = TestHarness::with_registry(&registry, T).await.unwrap();
    harness.server.set_date_header("not-a-date");
    let dashboard = Dashboard::from_config(&config_for(&harness)).unwrap();

    let rendered = ready(dashboard.refresh().await);
    assert!(rendered.card("dev1").unwrap().online);
    assert!(rendered.last_updated >= now);
}

#[tokio::test]
async fn disabled_probe_uses_local_clock() {
    let registry = RegistryBuilder::new().device("dev1", "10.0.0.5", T);
    let harness = TestHarness::with_registry(&registry, T).await.unwrap();
    let cfg = StatusConfig {
        time_probe_url: None,
        ..config_for(&harness)
    };
    let dashboard = Dashboard::from_config(&cfg).unwrap();

    let rendered = ready(dashboard.refresh().await);
    // heartbeat pinned in 2023 is stale against the real clock
    assert!(!rendered.card("dev1").unwrap().online);
    assert_eq!(harness.server.time_hits(), 0);
}

#[tokio::test]
async fn credential_is_decoded_and_sent() {
    let harness = TestHarness::with_registry(&RegistryBuilder::new(), T).await.unwrap();
    let cfg = StatusConfig {
        registry_token: Some(encode_credential("token ghp_example")),
        ..config_for(&harness)
    };
    let dashboard = Dashboard::from_config(&cfg).unwrap();

    ready(dashboard.refresh().await);
    assert_eq!(harness.server.last_authorization().as_deref(), Some("token ghp_example"));
}

#[tokio::test]
async fn invalid_record_fails_whole_refresh() {
    let registry = RegistryBuilder::new()
        .device("dev1", "10.0.0.5", T)
        .raw("broken", serde_json::json!({"timestamp": T}));
    let harness = TestHarness::with_registry(&registry, T).await.unwrap();
    let dashboard = Dashboard::from_config(&config_for(&harness)).unwrap();

    match dashboard.refresh().await {
        DashboardView::Failed { message } => assert!(message.contains("broken"), "{message}"),
        other => panic!("expected error banner, got {other:?}"),
    }
}

#[tokio::test]
async fn overlapping_refreshes_each_install_a_full_view() {
    let registry = RegistryBuilder::new()
        .device("dev1", "10.0.0.5", T - 5)
        .device("dev2", "10.0.0.6", T - 500);
    let harness = TestHarness::with_registry(&registry, T).await.unwrap();
    let dashboard = Dashboard::from_config(&config_for(&harness)).unwrap();

    let (first, second) = tokio::join!(dashboard.refresh(), dashboard.refresh());
    let first = ready(first);
    let second = ready(second);
    assert_eq!(first, second);
    assert_eq!(ready(dashboard.view()), second);
    assert_eq!(second.summary, DashboardSummary { total: 2, online: 1, offline: 1 });
    assert_eq!(harness.server.registry_hits(), 2);
    assert_eq!(harness.server.time_hits(), 2);
}
