// src/services/sweeper.rs

use tokio::time::{Duration, interval};

use crate::state::AppState;

const SWEEP_EVERY: Duration = Duration::from_secs(60);

/// Periodically drops sessions idle for longer than the configured TTL.
pub async fn run(state: AppState) {
    let mut tick = interval(SWEEP_EVERY);
    loop {
        tick.tick().await;
        let evicted = sweep_idle_sessions(&state).await;
        if evicted > 0 {
            tracing::info!("Evicted {} idle session(s)", evicted);
        }
    }
}

/// One sweep: evicts idle sessions and closes their answer queues.
pub async fn sweep_idle_sessions(state: &AppState) -> usize {
    let ttl = i64::try_from(state.config.session_ttl_secs)
        .ok()
        .and_then(chrono::Duration::try_seconds)
        .unwrap_or(chrono::Duration::MAX);
    let evicted = state.sessions.evict_idle(ttl).await;
    for submission_id in &evicted {
        state.writer.close(submission_id);
    }
    evicted.len()
}
