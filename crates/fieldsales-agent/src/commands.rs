//! Subcommand implementations

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use fieldsales_agent::{AgentConfig, ReplayLocationProvider};
use fieldsales_attendance::{
    AttendanceEvent, AttendanceSession, ProfileSyncOutcome, SessionContext, SyncOutcome,
};
use fieldsales_client::HttpProfileStore;
use fieldsales_core::{AttendanceStatus, GeoPosition, Profile, ProfileStore, geo};
use fieldsales_logging::{SessionContextGuard, SessionMode};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

/// How long to wait for the out-of-band push after going online
const PUSH_WAIT: Duration = Duration::from_secs(30);

pub fn distance(config: &AgentConfig, latitude: f64, longitude: f64) -> anyhow::Result<()> {
    let position = GeoPosition::try_new(latitude, longitude)?;
    let result = geo::evaluate(&position, &config.geofence);

    println!("Distance: {}m from Branch", result.distance_meters);
    if result.is_within {
        println!("You are within range to check in.");
    } else {
        println!(
            "You are too far from branch to check in (radius {}m).",
            config.geofence.radius_meters
        );
    }
    Ok(())
}

async fn connect(config: &AgentConfig) -> anyhow::Result<(Arc<HttpProfileStore>, Profile)> {
    let store = Arc::new(HttpProfileStore::new(config.api_config()?)?);
    let email = config.email()?;
    let profile = store
        .find_by_email(email)
        .await?
        .with_context(|| format!("No sales profile registered for {email}"))?;
    Ok((store, profile))
}

async fn mount(
    config: &AgentConfig,
    store: Arc<HttpProfileStore>,
    profile: &Profile,
) -> anyhow::Result<AttendanceSession> {
    let provider = ReplayLocationProvider::new(
        config.track()?,
        Duration::from_secs(config.location.step_secs),
    );
    let session = AttendanceSession::mount(
        config.attendance_config(),
        SessionContext::from_profile(profile),
        &profile.online_stat,
        store,
        Arc::new(provider),
    )
    .await;
    Ok(session)
}

/// Wait until the first reading or failure is known
async fn first_position(session: &AttendanceSession, timeout: Duration) -> Option<GeoPosition> {
    let mut positions = session.positions();
    let settled = tokio::time::timeout(timeout, positions.wait_for(|state| !state.loading)).await;
    match settled {
        Ok(Ok(state)) => state.position,
        _ => None,
    }
}

pub async fn run(
    config: &AgentConfig,
    online: bool,
    duration: Option<Duration>,
) -> anyhow::Result<()> {
    let (store, profile) = connect(config).await?;
    if profile.is_blocked() {
        bail!("Session Terminated: You have been blocked by admin.");
    }
    let _ctx = SessionContextGuard::new(&profile.write_id(), SessionMode::Live);

    let session = mount(config, store, &profile).await?;
    let mut events = session.subscribe();
    let mut geofence = session.geofence();

    if online && let Err(e) = session.toggle(AttendanceStatus::Online).await {
        warn!(error = %e, "Could not go online");
    }

    let mut refresh = tokio::time::interval(Duration::from_secs(
        config.sync.profile_refresh_secs.max(1),
    ));
    let deadline = async {
        match duration {
            Some(duration) => tokio::time::sleep(duration).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
            _ = &mut deadline => break,
            event = events.recv() => match event {
                Ok(event) => println!("{}", event.message()),
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "Event stream lagged"),
                Err(RecvError::Closed) => break,
            },
            changed = geofence.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = session.snapshot();
                println!("{} | {}", snapshot.status, snapshot.location_label);
            }
            _ = refresh.tick() => match session.refresh_profile().await {
                Ok(ProfileSyncOutcome::Blocked) => {
                    println!("Session Terminated: You have been blocked by admin.");
                    break;
                }
                Ok(ProfileSyncOutcome::SessionExpired) => {
                    println!("Session Expired or Permission Denied. Please login again.");
                    break;
                }
                Ok(ProfileSyncOutcome::ApprovalChanged { approved }) => {
                    println!("Approval status changed: {}", if approved { "approved" } else { "pending" });
                }
                Ok(_) => {}
                Err(e) => warn!(error = %e, "Profile refresh failed"),
            },
        }
    }

    session.teardown().await;
    let stats = session.sync_stats();
    println!(
        "Session ended: {} ticks, {} pushed, {} failed, {} skipped",
        stats.ticks, stats.pushed, stats.failed, stats.skipped
    );
    Ok(())
}

pub async fn toggle(config: &AgentConfig, requested: AttendanceStatus) -> anyhow::Result<()> {
    let (store, profile) = connect(config).await?;
    let session = mount(config, store, &profile).await?;
    let position = first_position(&session, config.location_options().timeout).await;
    let mut events = session.subscribe();

    let result = session.toggle(requested).await;
    if let Ok(AttendanceStatus::Online) = result
        && position.is_some()
    {
        let pushed = tokio::time::timeout(PUSH_WAIT, async {
            loop {
                match events.recv().await {
                    Ok(
                        event @ (AttendanceEvent::LocationPushed { .. }
                        | AttendanceEvent::LocationPushFailed { .. }),
                    ) => return Some(event),
                    Ok(_) | Err(RecvError::Lagged(_)) => continue,
                    Err(RecvError::Closed) => return None,
                }
            }
        })
        .await;
        if let Ok(Some(event)) = pushed {
            println!("{}", event.message());
        }
    }
    session.teardown().await;

    let status = result?;
    println!("{status}");
    Ok(())
}

pub async fn sync_now(config: &AgentConfig) -> anyhow::Result<()> {
    let (store, profile) = connect(config).await?;
    let session = mount(config, store, &profile).await?;
    first_position(&session, config.location_options().timeout).await;

    let result = session.sync_now().await;
    session.teardown().await;

    match result? {
        SyncOutcome::Synced(position) => println!("Position updated successfully! {position}"),
        SyncOutcome::WaitingForLocation => println!("Waiting for GPS location..."),
    }
    Ok(())
}

pub async fn profile(config: &AgentConfig) -> anyhow::Result<()> {
    let (store, profile) = connect(config).await?;

    println!("Profile:  {}", profile.write_id());
    if let Some(uid) = &profile.sales_uid {
        println!("Sales ID: {uid}");
    }
    println!("Status:   {}", profile.status());
    println!("Blocked:  {}", profile.is_blocked());
    println!("Approved: {}", profile.is_approved());
    match profile.location {
        Some(location) => {
            let result = geo::evaluate(&location, &config.geofence);
            println!("Location: {location} ({}m from Branch)", result.distance_meters);
        }
        None => println!("Location: Unknown Location"),
    }
    if let Some(photo) = store.photo_url(&profile) {
        println!("Photo:    {photo}");
    }
    println!("API:      {}", store.config().base_url);
    Ok(())
}
