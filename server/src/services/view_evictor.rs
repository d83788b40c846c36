use std::time::Duration;

use chrono::Utc;
use tracing::info;

use crate::config::{VIEW_EVICTION_INTERVAL_SECS, view_idle_ttl_secs};
use crate::state::AppState;

pub async fn run(state: AppState) {
    let mut interval = tokio::time::interval(Duration::from_secs(VIEW_EVICTION_INTERVAL_SECS));
    let ttl_secs = view_idle_ttl_secs();

    loop {
        interval.tick().await;

        let evicted = state.views.evict_idle(Utc::now(), ttl_secs);
        if evicted > 0 {
            info!(
                "evicted {evicted} idle ranking views ({} remaining)",
                state.views.len()
            );
        }
    }
}
