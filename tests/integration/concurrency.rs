//! Concurrency tests: serialized ticks per target, shared cooldown state

use std::sync::Arc;
use std::time::{Duration, Instant};

use netwatch::actors::messages::MonitorState;

use crate::helpers::{ScriptedCollector, TestHub, online_with_cpu, target_config, wait_for};

#[tokio::test]
async fn test_concurrent_checks_never_overlap() {
    let hub = TestHub::new();
    let collector = ScriptedCollector::with_delay(
        vec![online_with_cpu("router", 10.0)],
        Duration::from_millis(10),
    );
    hub.registry
        .register(target_config("router", &[]), collector.clone())
        .await
        .unwrap();

    let mut tasks = vec![];
    for _ in 0..20 {
        let registry = hub.registry.clone();
        tasks.push(tokio::spawn(async move { registry.check("router").await }));
    }
    for task in tasks {
        assert!(task.await.unwrap().is_ok());
    }

    assert_eq!(collector.polls(), 20);
    assert!(!collector.overlapped());
}

#[tokio::test]
async fn test_fast_timer_with_slow_device_never_overlaps() {
    let hub = TestHub::new();
    let collector = ScriptedCollector::with_delay(
        vec![online_with_cpu("router", 10.0)],
        Duration::from_millis(30),
    );
    let mut config = target_config("router", &[]);
    config.interval = Duration::from_millis(5);
    hub.registry.register(config, collector.clone()).await.unwrap();

    hub.registry.start("router").await.unwrap();
    wait_for(|| collector.polls() >= 5).await;
    hub.registry.stop("router").await.unwrap();

    assert!(!collector.overlapped());
}

#[tokio::test]
async fn test_overrunning_poll_drops_late_tick() {
    let hub = TestHub::new();
    let collector = ScriptedCollector::with_delay(
        vec![online_with_cpu("router", 10.0)],
        Duration::from_millis(250),
    );
    let mut config = target_config("router", &[]);
    config.interval = Duration::from_millis(100);
    hub.registry.register(config, collector.clone()).await.unwrap();

    hub.registry.start("router").await.unwrap();
    wait_for(|| collector.spans().len() >= 3).await;
    hub.registry.stop("router").await.unwrap();

    let spans = collector.spans();
    let origin = spans[0].0;
    for pair in spans.windows(2) {
        let (_, previous_end) = pair[0];
        let (next_start, _) = pair[1];

        // the tick due at 100ms is dropped: nothing starts before the 300ms boundary
        assert!(next_start.saturating_duration_since(previous_end) >= Duration::from_millis(20));
        assert!(next_start.saturating_duration_since(origin) >= Duration::from_millis(290));
    }

    hub.registry.shutdown_all().await;
}

#[tokio::test]
async fn test_stop_while_polling_cancels_pending_tick() {
    let hub = TestHub::new();
    let collector = ScriptedCollector::with_delay(
        vec![online_with_cpu("router", 10.0)],
        Duration::from_millis(40),
    );
    let mut config = target_config("router", &[]);
    config.interval = Duration::from_millis(10);
    hub.registry.register(config, collector.clone()).await.unwrap();

    for _ in 0..10 {
        hub.registry.start("router").await.unwrap();
        wait_for(|| collector.in_flight()).await;

        let requested = Instant::now();
        hub.registry.stop("router").await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        let late = collector
            .spans()
            .iter()
            .filter(|(start, _)| *start >= requested)
            .count();
        assert_eq!(late, 0, "a poll started after stop was requested");
        assert_eq!(hub.registry.state("router").await.unwrap(), MonitorState::Stopped);
    }

    hub.registry.shutdown_all().await;
}

#[tokio::test]
async fn test_concurrent_start_all_starts_each_target_once() {
    let hub = TestHub::new();
    let mut collectors = vec![];
    for id in ["a", "b", "c", "d"] {
        let collector = ScriptedCollector::new(vec![online_with_cpu(id, 10.0)]);
        collectors.push(collector.clone());
        hub.registry
            .register(target_config(id, &[]), collector)
            .await
            .unwrap();
    }

    let (first, second) = tokio::join!(hub.registry.start_all(), hub.registry.start_all());
    assert_eq!(first + second, 4);

    for id in ["a", "b", "c", "d"] {
        assert_eq!(hub.registry.state(id).await.unwrap(), MonitorState::Running);
    }

    // each target ran exactly its immediate first check
    for collector in &collectors {
        wait_for(|| collector.polls() >= 1).await;
    }
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(collectors.iter().all(|c| c.polls() == 1));

    hub.registry.shutdown_all().await;
}

#[tokio::test]
async fn test_same_alert_on_many_targets_is_independent() {
    let hub = TestHub::new();
    let ids: Vec<String> = (0..5).map(|i| format!("dev-{i}")).collect();
    for id in &ids {
        hub.registry
            .register(
                target_config(id, &["6281111"]),
                ScriptedCollector::new(vec![online_with_cpu(id, 99.0)]),
            )
            .await
            .unwrap();
    }

    let registry = Arc::clone(&hub.registry);
    let checks = ids.iter().map(|id| {
        let registry = registry.clone();
        let id = id.clone();
        async move { registry.check(&id).await }
    });
    for result in futures::future::join_all(checks).await {
        assert!(result.is_ok());
    }

    // one HighCpu per target, none suppressed by another target's cooldown
    assert_eq!(hub.channel.sent().len(), 5);
}
