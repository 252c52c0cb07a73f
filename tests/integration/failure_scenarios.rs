//! Failure isolation: broken devices, failing recipients, HTTP collectors

use std::time::Duration;

use assert_matches::assert_matches;
use netwatch::{
    clock::ManualClock,
    config::TargetConfig,
    error::RegistryError,
    metrics,
    registry::TargetEntry,
};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::helpers::{RecordingChannel, ScriptedCollector, TestHub, online_with_cpu, target_config};

fn http_target(id: &str, url: String) -> TargetConfig {
    serde_json::from_value(json!({
        "id": id,
        "display": format!("Device {id}"),
        "collector": { "kind": "http", "url": url, "timeout_secs": 1 },
        "recipients": ["6281111"],
    }))
    .unwrap()
}

#[tokio::test]
async fn test_dashboard_with_one_failing_device() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/a/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "metrics": { "cpu_load": 12, "memory_usage": "40" },
            "info": { "board_name": "CCR2004" }
        })))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/b/status"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/c/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "metrics": { "cpu_load": 5 }
        })))
        .mount(&mock_server)
        .await;

    let hub = TestHub::new();
    for id in ["a", "b", "c"] {
        let (config, collector) = http_target(id, format!("{}/{id}/status", mock_server.uri()))
            .resolve()
            .unwrap();
        hub.registry.register(config, collector).await.unwrap();
    }

    let dashboard = hub.registry.dashboard().await;

    assert_eq!(dashboard.targets.len(), 3);

    let a = dashboard.targets["a"].snapshot().unwrap();
    assert!(a.online);
    assert_eq!(a.metric(metrics::MEMORY_USAGE), 40.0);

    let b = dashboard.targets["b"].snapshot().unwrap();
    assert!(!b.online);
    assert!(b.error.as_deref().unwrap().contains("500"));

    assert!(dashboard.targets["c"].snapshot().unwrap().online);

    // only the failing device alerted
    let sent = hub.channel.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].text.contains("Device b"));
}

#[tokio::test]
async fn test_slow_device_counts_as_offline() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "metrics": {} }))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&mock_server)
        .await;

    let hub = TestHub::new();
    let (config, collector) = http_target("slow", format!("{}/status", mock_server.uri()))
        .resolve()
        .unwrap();
    hub.registry.register(config, collector).await.unwrap();

    let snapshot = hub.registry.check("slow").await.unwrap();

    assert!(!snapshot.online);
    assert!(snapshot.error.as_deref().unwrap().contains("timed out"));
}

#[tokio::test]
async fn test_malformed_status_body_counts_as_offline() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>login</html>"))
        .mount(&mock_server)
        .await;

    let hub = TestHub::new();
    let (config, collector) = http_target("weird", format!("{}/status", mock_server.uri()))
        .resolve()
        .unwrap();
    hub.registry.register(config, collector).await.unwrap();

    let snapshot = hub.registry.check("weird").await.unwrap();

    assert!(!snapshot.online);
    assert!(snapshot.error.as_deref().unwrap().contains("protocol error"));
}

#[tokio::test]
async fn test_dashboard_reports_stuck_monitor_as_error() {
    let hub = TestHub::new();
    hub.registry
        .register(
            target_config("ok", &[]),
            ScriptedCollector::new(vec![online_with_cpu("ok", 1.0)]),
        )
        .await
        .unwrap();
    hub.registry
        .register(
            target_config("stuck", &[]),
            ScriptedCollector::with_delay(vec![], Duration::from_secs(60)),
        )
        .await
        .unwrap();

    let dashboard = hub.registry.dashboard().await;

    assert!(!dashboard.targets["ok"].is_error());
    assert_matches!(
        &dashboard.targets["stuck"],
        TargetEntry::Error { display, error } if display == "Device stuck" && error.contains("timed out")
    );
}

#[tokio::test]
async fn test_failing_recipient_does_not_stop_broadcast() {
    let clock = ManualClock::default();
    let channel = RecordingChannel::failing_for(clock.clone(), vec!["6282222".to_string()]);
    let hub = TestHub::with_channel(clock, channel);
    hub.registry
        .register(
            target_config("router", &["6281111", "6282222", "6283333"]),
            ScriptedCollector::new(vec![online_with_cpu("router", 99.0)]),
        )
        .await
        .unwrap();

    hub.registry.check("router").await.unwrap();

    let recipients: Vec<_> = hub.channel.sent().into_iter().map(|m| m.recipient).collect();
    assert_eq!(recipients, vec!["6281111".to_string(), "6283333".to_string()]);
}

#[tokio::test]
async fn test_unknown_target_is_reported() {
    let hub = TestHub::new();

    assert_matches!(
        hub.registry.check("ghost").await,
        Err(RegistryError::UnknownTarget(id)) if id == "ghost"
    );
}
