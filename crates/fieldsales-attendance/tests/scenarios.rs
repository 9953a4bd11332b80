//! End-to-end attendance session behaviour against in-memory mocks
//!
//! Timer tests run on a paused clock so a 30 minute interval elapses
//! instantly.

use std::sync::Arc;
use std::time::Duration;

use fieldsales_attendance::{
    AttendanceConfig, AttendanceError, AttendanceEvent, AttendanceSession, PositionState,
    SessionContext, SyncOutcome, SyncTrigger,
};
use fieldsales_core::{
    AttendanceStatus, GeoPosition, GeofenceAnchor, LocationError, MockLocationProvider,
    MockProfileStore, Profile, geo,
};
use serde_json::{Value, json};
use tokio::sync::{broadcast, watch};

const INTERVAL: Duration = Duration::from_secs(30 * 60);
const EMAIL: &str = "agent@example.com";

struct Fixture {
    store: Arc<MockProfileStore>,
    provider: Arc<MockLocationProvider>,
    session: AttendanceSession,
}

async fn mount(initial: Value, blocked: bool, provider: MockLocationProvider) -> Fixture {
    let store = Arc::new(MockProfileStore::new());
    store.insert(Profile::new(7u64).with_email(EMAIL));
    let provider = Arc::new(provider);

    let session = AttendanceSession::mount(
        AttendanceConfig::default(),
        SessionContext::new(7u64, EMAIL).with_blocked(blocked),
        &initial,
        store.clone(),
        provider.clone(),
    )
    .await;

    Fixture {
        store,
        provider,
        session,
    }
}

async fn wait_for_position(rx: &mut watch::Receiver<PositionState>, expected: GeoPosition) {
    rx.wait_for(|state| state.position == Some(expected))
        .await
        .unwrap();
}

async fn next_push(events: &mut broadcast::Receiver<AttendanceEvent>) -> AttendanceEvent {
    loop {
        match events.recv().await.unwrap() {
            event @ (AttendanceEvent::LocationPushed { .. }
            | AttendanceEvent::LocationPushFailed { .. }) => return event,
            _ => continue,
        }
    }
}

fn near_branch() -> GeoPosition {
    GeofenceAnchor::default().position().destination(45.0, 120.0)
}

#[test]
fn test_agent_at_anchor_is_within() {
    let anchor = GeofenceAnchor::new(-6.175392, 106.827153).with_radius(500);
    let result = geo::evaluate(&GeoPosition::new(-6.175392, 106.827153), &anchor);
    assert_eq!(result.distance_meters, 0);
    assert!(result.is_within);
}

#[test]
fn test_agent_five_km_away_is_outside() {
    let anchor = GeofenceAnchor::default();
    let far = anchor.position().destination(180.0, 5000.0);
    let result = geo::evaluate(&far, &anchor);
    assert!(!result.is_within);
    assert!((4990..=5010).contains(&result.distance_meters));
}

#[tokio::test(start_paused = true)]
async fn test_going_online_pushes_once_immediately() {
    let fix = near_branch();
    let f = mount(json!("OFFLINE"), false, MockLocationProvider::with_fix(fix)).await;
    wait_for_position(&mut f.session.positions(), fix).await;
    let mut events = f.session.subscribe();

    let status = f.session.toggle(AttendanceStatus::Online).await.unwrap();
    assert_eq!(status, AttendanceStatus::Online);

    assert_eq!(
        next_push(&mut events).await,
        AttendanceEvent::LocationPushed {
            position: fix,
            trigger: SyncTrigger::Immediate
        }
    );
    tokio::time::sleep(INTERVAL - Duration::from_secs(1)).await;

    assert_eq!(f.store.online_writes(), vec![true]);
    assert_eq!(f.store.location_writes(), vec![fix]);
    assert!(f.session.is_sync_armed().await);
}

#[tokio::test(start_paused = true)]
async fn test_failed_status_write_changes_nothing() {
    let fix = near_branch();
    let f = mount(json!(false), false, MockLocationProvider::with_fix(fix)).await;
    wait_for_position(&mut f.session.positions(), fix).await;
    f.store.fail_status_writes(true);

    let err = f.session.toggle(AttendanceStatus::Online).await.unwrap_err();
    assert!(matches!(err, AttendanceError::StatusUpdate(_)));
    assert_eq!(f.session.status(), AttendanceStatus::Offline);
    assert!(!f.session.is_sync_armed().await);

    tokio::time::sleep(INTERVAL * 2).await;
    assert!(f.store.location_writes().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_tick_pushes_latest_of_several_positions() {
    let f = mount(json!("ONLINE"), false, MockLocationProvider::new()).await;
    assert!(f.session.is_sync_armed().await);

    let mut positions = f.session.positions();
    let readings = [
        near_branch(),
        near_branch().destination(90.0, 40.0),
        near_branch().destination(90.0, 80.0),
    ];
    for reading in readings {
        f.provider.emit(reading);
        wait_for_position(&mut positions, reading).await;
    }
    assert!(f.store.location_writes().is_empty());

    tokio::time::sleep(INTERVAL + Duration::from_secs(1)).await;
    assert_eq!(f.store.location_writes(), vec![readings[2]]);
}

#[tokio::test(start_paused = true)]
async fn test_blocked_agent_cannot_toggle() {
    let f = mount(json!("OFFLINE"), true, MockLocationProvider::with_fix(near_branch())).await;
    assert!(!f.session.snapshot().can_toggle);

    let err = f.session.toggle(AttendanceStatus::Online).await.unwrap_err();
    assert_eq!(err, AttendanceError::Blocked);
    assert_eq!(f.session.status(), AttendanceStatus::Offline);
    assert_eq!(f.store.write_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_tick_without_position_makes_no_call() {
    let f = mount(json!(true), false, MockLocationProvider::new()).await;

    tokio::time::sleep(INTERVAL * 2 + Duration::from_secs(1)).await;

    assert_eq!(f.store.write_count(), 0);
    let stats = f.session.sync_stats();
    assert_eq!(stats.ticks, 2);
    assert_eq!(stats.skipped, 2);
    // the one-shot fix timed out meanwhile
    assert_eq!(f.session.snapshot().location_label, "Location Error");
}

#[tokio::test(start_paused = true)]
async fn test_manual_sync() {
    let f = mount(json!("true"), false, MockLocationProvider::new()).await;
    assert_eq!(
        f.session.sync_now().await,
        Ok(SyncOutcome::WaitingForLocation)
    );
    assert_eq!(f.store.write_count(), 0);

    let fix = near_branch();
    f.provider.emit(fix);
    wait_for_position(&mut f.session.positions(), fix).await;

    assert_eq!(f.session.sync_now().await, Ok(SyncOutcome::Synced(fix)));
    assert_eq!(f.store.location_writes(), vec![fix]);
}

#[tokio::test(start_paused = true)]
async fn test_online_offline_cycles_arm_one_timer_each() {
    let f = mount(json!("OFFLINE"), false, MockLocationProvider::new()).await;

    for _ in 0..3 {
        f.session.toggle(AttendanceStatus::Online).await.unwrap();
        assert!(f.session.is_sync_armed().await);
        f.session.toggle(AttendanceStatus::Offline).await.unwrap();
        assert!(!f.session.is_sync_armed().await);
    }

    f.provider.emit(near_branch());
    tokio::time::sleep(INTERVAL * 2).await;
    assert!(f.store.location_writes().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_push_failure_does_not_flip_state() {
    let fix = near_branch();
    let f = mount(json!("ONLINE"), false, MockLocationProvider::with_fix(fix)).await;
    wait_for_position(&mut f.session.positions(), fix).await;
    f.store.fail_location_writes(true);

    tokio::time::sleep(INTERVAL * 3 + Duration::from_secs(1)).await;

    assert_eq!(f.store.location_writes().len(), 3);
    assert_eq!(f.session.sync_stats().failed, 3);
    assert_eq!(f.session.status(), AttendanceStatus::Online);
    assert!(f.session.is_sync_armed().await);
}

#[tokio::test(start_paused = true)]
async fn test_teardown_cancels_everything() {
    let f = mount(json!("ONLINE"), false, MockLocationProvider::with_fix(near_branch())).await;
    assert_eq!(f.provider.active_watches(), 1);

    f.session.teardown().await;
    f.session.teardown().await;

    assert!(!f.session.is_mounted());
    assert!(!f.session.is_sync_armed().await);
    assert_eq!(f.provider.active_watches(), 0);
    assert_eq!(
        f.session.toggle(AttendanceStatus::Offline).await,
        Err(AttendanceError::SessionClosed)
    );

    tokio::time::sleep(INTERVAL * 2).await;
    assert_eq!(f.store.write_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_teardown_during_pending_toggle_leaves_no_timer() {
    let fix = near_branch();
    let f = mount(json!("OFFLINE"), false, MockLocationProvider::with_fix(fix)).await;
    wait_for_position(&mut f.session.positions(), fix).await;
    f.store.set_latency(Some(Duration::from_secs(1)));

    let (toggled, ()) = tokio::join!(f.session.toggle(AttendanceStatus::Online), async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        f.session.teardown().await;
    });

    // the status write was already on the wire
    assert_eq!(toggled, Ok(AttendanceStatus::Online));
    assert_eq!(f.store.online_writes(), vec![true]);
    assert!(!f.session.is_mounted());
    assert!(!f.session.is_sync_armed().await);

    tokio::time::sleep(INTERVAL * 2).await;
    assert!(f.store.location_writes().is_empty());
    assert_eq!(f.session.sync_stats().ticks, 0);
}

#[tokio::test(start_paused = true)]
async fn test_snapshot_labels_follow_position() {
    let f = mount(json!("OFFLINE"), false, MockLocationProvider::new()).await;
    let snapshot = f.session.snapshot();
    assert_eq!(snapshot.location_label, "Locating...");
    assert!(!snapshot.in_range);

    let fix = near_branch();
    f.provider.emit(fix);
    wait_for_position(&mut f.session.positions(), fix).await;

    let snapshot = f.session.snapshot();
    assert_eq!(snapshot.location_label, "Distance: 120m from Branch");
    assert!(snapshot.in_range);
    assert!(!snapshot.can_sync);

    f.provider.emit_error(LocationError::PermissionDenied("User denied Geolocation".into()));
    f.session
        .positions()
        .wait_for(|state| state.error.is_some())
        .await
        .unwrap();
    let snapshot = f.session.snapshot();
    assert_eq!(snapshot.location_label, "Location Error");
    assert_eq!(snapshot.position, Some(fix));
}

#[tokio::test(start_paused = true)]
async fn test_geofence_monitor_tracks_positions() {
    let f = mount(json!("OFFLINE"), false, MockLocationProvider::new()).await;
    let mut geofence = f.session.geofence();
    assert!(geofence.borrow().is_none());

    let far = GeofenceAnchor::default().position().destination(0.0, 2000.0);
    f.provider.emit(far);
    let result = *geofence
        .wait_for(|result| result.is_some())
        .await
        .unwrap();
    assert!(!result.unwrap().is_within);
}

#[tokio::test(start_paused = true)]
async fn test_profile_refresh_updates_approval() {
    let f = mount(json!("OFFLINE"), false, MockLocationProvider::new()).await;
    f.store
        .insert(Profile::new(7u64).with_email(EMAIL).with_approved(json!(1)));

    let outcome = f.session.refresh_profile().await.unwrap();
    assert!(!outcome.terminates_session());
    assert!(f.session.context().is_approved());
}
