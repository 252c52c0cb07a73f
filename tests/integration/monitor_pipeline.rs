//! End-to-end tests of the check pipeline
//!
//! poll → evaluate → cooldown → render → dispatch, through the registry.

use std::time::Duration;

use netwatch::{
    alerts::AlertKind,
    channel::ConnectionState,
    evaluator::Thresholds,
    metrics,
};
use pretty_assertions::assert_eq;

use crate::helpers::{ScriptedCollector, TestHub, online_with_cpu, target_config, unreachable};

#[tokio::test]
async fn test_high_cpu_alert_sent_once_within_cooldown() {
    let hub = TestHub::new();
    let collector = ScriptedCollector::new(vec![online_with_cpu("router", 85.0)]);
    hub.registry
        .register(target_config("router", &["6281111", "6282222"]), collector)
        .await
        .unwrap();

    let snapshot = hub.registry.check("router").await.unwrap();
    assert!(snapshot.online);

    let sent = hub.channel.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].recipient, "6281111");
    assert_eq!(sent[1].recipient, "6282222");
    assert!(sent[0].text.contains("Device router"));
    assert!(sent[0].text.contains("85"));
    assert!(sent[0].text.contains("80"));
    assert!((sent[1].at - sent[0].at).to_std().unwrap() >= Duration::from_millis(1000));

    hub.clock.advance(Duration::from_secs(10));
    hub.registry.check("router").await.unwrap();
    assert_eq!(hub.channel.sent().len(), 2);

    assert!(
        hub.registry
            .context()
            .cooldown
            .last_fired("router", &AlertKind::HighCpu)
            .is_some()
    );
}

#[tokio::test]
async fn test_threshold_alert_repeats_after_window() {
    let hub = TestHub::new();
    let collector = ScriptedCollector::new(vec![online_with_cpu("router", 95.0)]);
    hub.registry
        .register(target_config("router", &["6281111"]), collector)
        .await
        .unwrap();

    hub.registry.check("router").await.unwrap();
    hub.clock.advance(Duration::from_secs(1799));
    hub.registry.check("router").await.unwrap();
    assert_eq!(hub.channel.sent().len(), 1);

    hub.clock.advance(Duration::from_secs(1));
    hub.registry.check("router").await.unwrap();
    assert_eq!(hub.channel.sent().len(), 2);
}

#[tokio::test]
async fn test_down_then_recovered() {
    let hub = TestHub::new();
    let collector = ScriptedCollector::new(vec![
        unreachable("connection refused"),
        unreachable("connection refused"),
        online_with_cpu("olt", 10.0),
    ]);
    hub.registry
        .register(target_config("olt", &["6281111"]), collector)
        .await
        .unwrap();

    let down = hub.registry.check("olt").await.unwrap();
    assert!(!down.online);
    assert_eq!(hub.channel.sent().len(), 1);
    assert!(hub.channel.sent()[0].text.contains("OFFLINE"));
    assert!(hub.channel.sent()[0].text.contains("connection refused"));

    hub.clock.advance(Duration::from_secs(300));
    hub.registry.check("olt").await.unwrap();
    assert_eq!(hub.channel.sent().len(), 1);

    let up = hub.registry.check("olt").await.unwrap();
    assert!(up.online);
    let sent = hub.channel.sent();
    assert_eq!(sent.len(), 2);
    assert!(sent[1].text.contains("Back online"));
    assert!(sent[1].text.contains("CCR2004"));
}

#[tokio::test]
async fn test_first_snapshot_online_is_not_a_recovery() {
    let hub = TestHub::new();
    let collector = ScriptedCollector::new(vec![online_with_cpu("router", 10.0)]);
    hub.registry
        .register(target_config("router", &["6281111"]), collector)
        .await
        .unwrap();

    hub.registry.check("router").await.unwrap();

    assert!(hub.channel.sent().is_empty());
}

#[tokio::test]
async fn test_interface_down_and_custom_metric() {
    let hub = TestHub::new();
    let snapshot = online_with_cpu("switch", 10.0).map(|s| {
        s.with_metric(metrics::INTERFACES_TOTAL, 10.0)
            .with_metric(metrics::INTERFACES_RUNNING, 7.0)
            .with_metric(metrics::INTERFACES_DISABLED, 1.0)
            .with_metric("temperature", 72.0)
    });
    let collector = ScriptedCollector::new(vec![snapshot]);

    let mut config = target_config("switch", &["6281111"]);
    config.thresholds = Thresholds::default().with_limit("temperature", 70.0);
    config.thresholds.interface_down_alert = true;
    hub.registry.register(config, collector).await.unwrap();

    hub.registry.check("switch").await.unwrap();

    let sent = hub.channel.sent();
    assert_eq!(sent.len(), 2);
    // limits are evaluated before the interface check
    assert!(sent[0].text.contains("temperature is 72 (threshold: 70)"));
    assert!(sent[1].text.contains("2 interface(s) are down"));
}

#[tokio::test]
async fn test_no_recipients_still_records_status() {
    let hub = TestHub::new();
    let collector = ScriptedCollector::new(vec![online_with_cpu("router", 99.0)]);
    hub.registry
        .register(target_config("router", &[]), collector)
        .await
        .unwrap();

    hub.registry.check("router").await.unwrap();

    assert!(hub.channel.sent().is_empty());
    let last = hub.registry.last_status("router").await.unwrap().unwrap();
    assert_eq!(last.metric(metrics::CPU_LOAD), 99.0);
}

#[tokio::test]
async fn test_channel_not_ready_drops_alert_but_keeps_cooldown() {
    let hub = TestHub::new();
    hub.channel.set_state(ConnectionState::Authenticating);
    let collector = ScriptedCollector::new(vec![online_with_cpu("router", 90.0)]);
    hub.registry
        .register(target_config("router", &["6281111"]), collector)
        .await
        .unwrap();

    let snapshot = hub.registry.check("router").await.unwrap();
    assert!(snapshot.online);
    assert!(hub.channel.sent().is_empty());

    hub.channel.set_state(ConnectionState::Ready);
    hub.clock.advance(Duration::from_secs(60));
    hub.registry.check("router").await.unwrap();

    // the failed attempt already consumed the window
    assert!(hub.channel.sent().is_empty());
}
