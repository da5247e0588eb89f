//! Channel lifecycle, debounce, retry and health behaviour of the
//! realtime manager, driven through the mock transport.

use fitsync_model::{parse_date, ResyncKey, SourceTable};
use fitsync_realtime::{
    ChangeEvent, ChannelStatus, CredentialRefresh, HealthPolicy, MockChangeTransport,
    RealtimeConfig, RealtimeError, RealtimeManager, RecordingTarget, RetryPolicy,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

fn start(
    config: RealtimeConfig,
    transport: MockChangeTransport,
) -> (RealtimeManager, Arc<MockChangeTransport>, Arc<RecordingTarget>) {
    let transport = Arc::new(transport);
    let target = Arc::new(RecordingTarget::new());
    let manager = RealtimeManager::start(config, transport.clone(), target.clone());
    (manager, transport, target)
}

fn meal_on(date: &str, id: &str) -> ChangeEvent {
    ChangeEvent::insert(json!({"id": id, "date": date}))
}

fn daily(date: &str) -> ResyncKey {
    ResyncKey::Daily(parse_date(date).unwrap())
}

/// A config whose health check never fires on its own.
fn quiet_config() -> RealtimeConfig {
    RealtimeConfig::new().with_health(HealthPolicy::new(Duration::from_secs(24 * 3600)))
}

#[tokio::test(start_paused = true)]
async fn subscribe_all_opens_one_channel_per_table() {
    let (manager, transport, _) = start(quiet_config(), MockChangeTransport::new());
    manager.subscribe_all().await.unwrap();

    let channels = manager.channels().await.unwrap();
    assert_eq!(channels.len(), SourceTable::REALTIME.len());
    assert!(channels.iter().all(|c| c.status == ChannelStatus::Subscribed));
    assert_eq!(transport.open_count(), SourceTable::REALTIME.len());
    assert!(transport.subscriptions_for(SourceTable::Profile).is_empty());

    let names: Vec<String> = transport.subscriptions().into_iter().map(|s| s.channel).collect();
    assert!(names.contains(&"fit-assistent-blood_pressure_logs".to_string()));
    assert!(names.contains(&"fit-assistent-recipes".to_string()));

    // Subscribing again replaces every channel.
    manager.subscribe_all().await.unwrap();
    assert_eq!(transport.open_count(), SourceTable::REALTIME.len());
    assert_eq!(transport.unsubscribed().len(), SourceTable::REALTIME.len());
}

#[tokio::test(start_paused = true)]
async fn burst_of_notifications_collapses_into_one_resync() {
    let (manager, transport, target) = start(quiet_config(), MockChangeTransport::new());
    manager.subscribe_all().await.unwrap();

    for n in 0..10 {
        assert!(transport.emit(SourceTable::Meals, meal_on("2024-03-01", &format!("m{n}"))));
        sleep(Duration::from_millis(100)).await;
    }
    // Last notification at 0.9 s, the window closes at 2.9 s.
    sleep(Duration::from_millis(1800)).await;
    assert!(target.is_empty());

    sleep(Duration::from_millis(200)).await;
    assert_eq!(target.keys(), vec![daily("2024-03-01")]);

    sleep(Duration::from_secs(10)).await;
    assert_eq!(target.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn notifications_from_different_tables_share_a_daily_key() {
    let (manager, transport, target) = start(quiet_config(), MockChangeTransport::new());
    manager.subscribe_all().await.unwrap();

    transport.emit(SourceTable::Meals, meal_on("2024-03-01", "m1"));
    transport.emit(
        SourceTable::WaterLogs,
        ChangeEvent::insert(json!({"id": "w1", "date": "2024-03-01"})),
    );
    transport.emit(
        SourceTable::BloodPressureLogs,
        ChangeEvent::insert(json!({"id": "b1", "measured_at": "2024-03-01T08:00:00+01:00"})),
    );
    transport.emit(SourceTable::Recipes, ChangeEvent::update(json!({"id": "r1"})));
    transport.emit(SourceTable::InventoryItems, ChangeEvent::delete(json!({"id": "i1"})));
    sleep(Duration::from_secs(3)).await;

    assert_eq!(target.count(&daily("2024-03-01")), 1);
    assert_eq!(target.count(&ResyncKey::Recipe("r1".into())), 1);
    assert_eq!(target.count(&ResyncKey::Inventory), 1);
    assert_eq!(target.len(), 3);
}

#[tokio::test(start_paused = true)]
async fn events_without_key_are_dropped() {
    let (manager, transport, target) = start(quiet_config(), MockChangeTransport::new());
    manager.subscribe_all().await.unwrap();

    transport.emit(SourceTable::Meals, ChangeEvent::insert(json!({"id": "m1"})));
    transport.emit(SourceTable::Recipes, ChangeEvent::insert(json!({"title": "Soup"})));
    sleep(Duration::from_secs(5)).await;

    assert!(target.is_empty());
}

#[tokio::test(start_paused = true)]
async fn unsubscribe_all_cancels_pending_resyncs() {
    let (manager, transport, target) = start(quiet_config(), MockChangeTransport::new());
    manager.subscribe_all().await.unwrap();

    transport.emit(SourceTable::Recipes, ChangeEvent::insert(json!({"id": "r1"})));
    sleep(Duration::from_millis(500)).await;
    manager.unsubscribe_all().await.unwrap();
    sleep(Duration::from_secs(5)).await;

    assert!(target.is_empty());
    assert_eq!(transport.open_count(), 0);
    assert!(manager.channels().await.unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn reconnect_keeps_pending_resyncs() {
    let (manager, transport, target) = start(quiet_config(), MockChangeTransport::new());
    manager.subscribe_all().await.unwrap();

    transport.emit(SourceTable::Recipes, ChangeEvent::insert(json!({"id": "r1"})));
    sleep(Duration::from_millis(500)).await;
    manager.reconnect_all().await.unwrap();
    sleep(Duration::from_secs(5)).await;

    assert_eq!(target.keys(), vec![ResyncKey::Recipe("r1".into())]);
    assert_eq!(transport.subscriptions_for(SourceTable::Recipes).len(), 2);
}

#[tokio::test(start_paused = true)]
async fn failing_channel_backs_off_exponentially_then_gives_up() {
    let config = quiet_config().with_retry(RetryPolicy::new(3).with_base_delay(Duration::from_secs(2)));
    let (manager, transport, _) = start(config, MockChangeTransport::manual());
    manager.subscribe_all().await.unwrap();

    for _ in 0..3 {
        assert!(transport.set_status(SourceTable::Meals, ChannelStatus::ChannelError));
        sleep(Duration::from_secs(20)).await;
    }
    // Fourth failure: the retry budget is spent.
    assert!(transport.set_status(SourceTable::Meals, ChannelStatus::TimedOut));
    sleep(Duration::from_secs(60)).await;

    let attempts = transport.subscriptions_for(SourceTable::Meals);
    assert_eq!(attempts.len(), 4);

    // Failures were reported at 0 s, 20 s and 40 s.
    let first = attempts[0].at;
    let delays: Vec<Duration> = attempts[1..]
        .iter()
        .enumerate()
        .map(|(step, attempt)| attempt.at - first - Duration::from_secs(20) * step as u32)
        .collect();
    assert_eq!(
        delays,
        vec![Duration::from_secs(2), Duration::from_secs(4), Duration::from_secs(8)]
    );
    assert!(delays.windows(2).all(|pair| pair[1] >= pair[0]));

    let meals = manager
        .channels()
        .await
        .unwrap()
        .into_iter()
        .find(|c| c.table == SourceTable::Meals)
        .unwrap();
    assert_eq!(meals.status, ChannelStatus::TimedOut);
    assert_eq!(meals.retry_count, 3);
    assert!(!meals.retry_pending);
}

#[tokio::test(start_paused = true)]
async fn successful_subscription_resets_retry_count() {
    let (manager, transport, _) = start(quiet_config(), MockChangeTransport::manual());
    manager.subscribe_all().await.unwrap();

    transport.set_status(SourceTable::Recipes, ChannelStatus::Closed);
    sleep(Duration::from_secs(3)).await;
    let recipes = |channels: Vec<fitsync_realtime::ChannelState>| {
        channels
            .into_iter()
            .find(|c| c.table == SourceTable::Recipes)
            .unwrap()
    };
    let state = recipes(manager.channels().await.unwrap());
    assert_eq!(state.status, ChannelStatus::Pending);
    assert_eq!(state.retry_count, 1);

    transport.set_status(SourceTable::Recipes, ChannelStatus::Subscribed);
    let state = recipes(manager.channels().await.unwrap());
    assert_eq!(state.status, ChannelStatus::Subscribed);
    assert_eq!(state.retry_count, 0);
}

#[tokio::test(start_paused = true)]
async fn status_from_replaced_subscription_is_ignored() {
    let (manager, transport, _) = start(quiet_config(), MockChangeTransport::manual());
    manager.subscribe_all().await.unwrap();

    let old_sink = transport.sink(SourceTable::Recipes).unwrap();
    transport.set_status(SourceTable::Recipes, ChannelStatus::ChannelError);
    sleep(Duration::from_secs(3)).await;
    assert_eq!(transport.subscriptions_for(SourceTable::Recipes).len(), 2);

    assert!(old_sink.status(ChannelStatus::ChannelError));
    let state = manager
        .channels()
        .await
        .unwrap()
        .into_iter()
        .find(|c| c.table == SourceTable::Recipes)
        .unwrap();
    assert_eq!(state.status, ChannelStatus::Pending);
    assert!(!state.retry_pending);
}

#[tokio::test(start_paused = true)]
async fn events_from_replaced_subscription_are_ignored() {
    let (manager, transport, target) = start(quiet_config(), MockChangeTransport::manual());
    manager.subscribe_all().await.unwrap();

    let old_sink = transport.sink(SourceTable::Recipes).unwrap();
    transport.set_status(SourceTable::Recipes, ChannelStatus::ChannelError);
    sleep(Duration::from_secs(3)).await;
    assert_eq!(transport.subscriptions_for(SourceTable::Recipes).len(), 2);

    assert!(old_sink.event(ChangeEvent::insert(json!({"id": "r1"}))));
    sleep(Duration::from_secs(5)).await;
    assert!(target.is_empty());
    let state = manager
        .channels()
        .await
        .unwrap()
        .into_iter()
        .find(|c| c.table == SourceTable::Recipes)
        .unwrap();
    assert_eq!(state.last_event_at, None);

    assert!(transport.emit(SourceTable::Recipes, ChangeEvent::insert(json!({"id": "r2"}))));
    sleep(Duration::from_secs(3)).await;
    assert_eq!(target.keys(), vec![ResyncKey::Recipe("r2".into())]);
}

#[tokio::test(start_paused = true)]
async fn rejected_subscribe_is_retried() {
    let transport = MockChangeTransport::new();
    transport.set_failing(SourceTable::Recipes, true);
    let (manager, transport, _) = start(quiet_config(), transport);
    manager.subscribe_all().await.unwrap();

    let state = manager
        .channels()
        .await
        .unwrap()
        .into_iter()
        .find(|c| c.table == SourceTable::Recipes)
        .unwrap();
    assert_eq!(state.status, ChannelStatus::ChannelError);
    assert!(state.retry_pending);

    transport.set_failing(SourceTable::Recipes, false);
    sleep(Duration::from_secs(3)).await;
    let state = manager
        .channels()
        .await
        .unwrap()
        .into_iter()
        .find(|c| c.table == SourceTable::Recipes)
        .unwrap();
    assert_eq!(state.status, ChannelStatus::Subscribed);
    assert_eq!(state.retry_count, 0);
}

#[tokio::test(start_paused = true)]
async fn health_check_rebuilds_flapping_channels() {
    let config = RealtimeConfig::new()
        .with_retry(RetryPolicy::no_retry())
        .with_health(HealthPolicy::new(Duration::from_secs(300)).with_stale_after(None));
    let (manager, transport, _) = start(config, MockChangeTransport::new());
    manager.subscribe_all().await.unwrap();

    transport.set_status(SourceTable::WeightLogs, ChannelStatus::ChannelError);
    sleep(Duration::from_secs(60)).await;
    assert_eq!(transport.subscriptions_for(SourceTable::WeightLogs).len(), 1);

    // The periodic probe at 5 minutes sees the dead channel.
    sleep(Duration::from_secs(250)).await;
    assert_eq!(transport.subscriptions_for(SourceTable::WeightLogs).len(), 2);
    assert_eq!(transport.subscriptions_for(SourceTable::Recipes).len(), 2);
    let channels = manager.channels().await.unwrap();
    assert!(channels
        .iter()
        .all(|c| c.status == ChannelStatus::Subscribed && c.retry_count == 0));

    // Everything is subscribed now, so the next probe leaves it alone.
    assert!(!manager.check_health().await.unwrap());
}

#[tokio::test(start_paused = true)]
async fn health_check_rebuilds_silent_channels() {
    let policy = HealthPolicy::new(Duration::from_secs(24 * 3600))
        .with_stale_after(Some(Duration::from_secs(600)));
    let config = RealtimeConfig::new()
        .with_tables([SourceTable::Meals])
        .with_health(policy);
    let (manager, transport, _) = start(config, MockChangeTransport::new());
    manager.subscribe_all().await.unwrap();

    // Regular traffic keeps the channel fresh.
    for n in 0..3 {
        sleep(Duration::from_secs(400)).await;
        transport.emit(SourceTable::Meals, meal_on("2024-03-01", &format!("m{n}")));
        assert!(!manager.check_health().await.unwrap());
    }

    sleep(Duration::from_secs(601)).await;
    assert!(manager.check_health().await.unwrap());
    assert_eq!(transport.subscriptions_for(SourceTable::Meals).len(), 2);
}

#[tokio::test(start_paused = true)]
async fn silence_is_tolerated_without_staleness_window() {
    let policy = HealthPolicy::new(Duration::from_secs(24 * 3600)).with_stale_after(None);
    let (manager, transport, _) =
        start(RealtimeConfig::new().with_health(policy), MockChangeTransport::new());
    manager.subscribe_all().await.unwrap();

    sleep(Duration::from_secs(6 * 3600)).await;
    assert!(!manager.check_health().await.unwrap());
    assert_eq!(transport.subscriptions_for(SourceTable::Meals).len(), 1);
}

#[tokio::test(start_paused = true)]
async fn credential_refresh_in_place_or_by_reconnect() {
    let (manager, transport, _) = start(quiet_config(), MockChangeTransport::new());
    manager.subscribe_all().await.unwrap();

    let outcome = manager.propagate_credential_refresh("token-1").await.unwrap();
    assert_eq!(outcome, CredentialRefresh::UpdatedInPlace);
    assert_eq!(transport.credentials(), vec!["token-1".to_string()]);
    assert_eq!(transport.subscriptions_for(SourceTable::Meals).len(), 1);

    transport.set_reject_credentials(true);
    let outcome = manager.propagate_credential_refresh("token-2").await.unwrap();
    assert_eq!(outcome, CredentialRefresh::Reconnected);
    assert_eq!(transport.subscriptions_for(SourceTable::Meals).len(), 2);
    assert_eq!(transport.open_count(), SourceTable::REALTIME.len());
}

#[tokio::test(start_paused = true)]
async fn shutdown_closes_channels_and_stops() {
    let (manager, transport, _) = start(quiet_config(), MockChangeTransport::new());
    manager.subscribe_all().await.unwrap();

    manager.shutdown().await.unwrap();
    assert_eq!(transport.open_count(), 0);
    assert_eq!(manager.channels().await, Err(RealtimeError::Stopped));
    assert!(!transport.emit(SourceTable::Meals, meal_on("2024-03-01", "m1")));
}
