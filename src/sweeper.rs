//! Periodic removal of registrations that were never verified.

use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::users::{RepoResult, UserRepository};

/// Delete unverified users created more than `max_age` ago. Returns how many went.
pub async fn sweep_once(
    users: &dyn UserRepository,
    max_age: time::Duration,
    now: OffsetDateTime,
) -> RepoResult<u64> {
    let removed = users.delete_unverified_created_before(now - max_age).await?;
    if removed > 0 {
        info!(removed, "removed stale unverified accounts");
    }
    Ok(removed)
}

const MIN_INTERVAL: Duration = Duration::from_secs(1);

/// Run [`sweep_once`] every `interval` (at least one second) until the runtime shuts down.
pub fn spawn_unverified_sweep(
    users: Arc<dyn UserRepository>,
    interval: Duration,
    max_age: time::Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval.max(MIN_INTERVAL));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(e) = sweep_once(users.as_ref(), max_age, OffsetDateTime::now_utc()).await {
                error!(error = %e, "unverified sweep failed");
            }
        }
    })
}
