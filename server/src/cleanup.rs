use std::{sync::Arc, time::Duration};

use tokio::time;
use tracing::{debug, info};

use crate::{logic::Sessions, rate_limit::RateLimiter};

pub async fn start_cleanup_task(
    sessions: Sessions,
    rate_limiter: Arc<RateLimiter>,
    interval_secs: u64,
    inactive_timeout_secs: u64,
) {
    let mut interval = time::interval(Duration::from_secs(interval_secs.max(1)));

    info!(
        "Started session cleanup task: checking every {}s, inactive timeout: {}s",
        interval_secs, inactive_timeout_secs
    );

    loop {
        interval.tick().await;
        cleanup_sessions(&sessions, inactive_timeout_secs);
        rate_limiter.prune();
    }
}

/// Drops sessions idle for longer than the timeout. Returns how many went.
pub fn cleanup_sessions(sessions: &Sessions, inactive_timeout_secs: u64) -> usize {
    let mut to_remove = Vec::new();

    for entry in sessions.iter() {
        // a locked session is in use right now
        if let Ok(session) = entry.value().try_lock()
            && session.should_cleanup(inactive_timeout_secs)
        {
            to_remove.push(entry.key().clone());
        }
    }

    let removed = to_remove.len();
    for id in to_remove {
        sessions.remove(&id);
        debug!("Cleaned up session: {}", id);
    }

    if removed > 0 {
        info!("Cleaned up {} inactive sessions", removed);
    }
    removed
}
