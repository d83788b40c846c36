use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chrono::Utc;
use futures::future::join_all;
use schoolwar_shared::{RegionCatalog, SchoolLevel, SchoolRecord};
use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::{CATALOG_RETRY_BACKOFF_SECS, catalog_refresh_interval};
use crate::state::{AppState, CatalogSnapshot};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CatalogPayload<'a> {
    level: SchoolLevel,
    available: bool,
    revision: u64,
    school_count: usize,
    #[serde(flatten)]
    catalog: &'a RegionCatalog,
}

pub async fn run(state: AppState) {
    let mut interval = tokio::time::interval(catalog_refresh_interval());

    loop {
        interval.tick().await;
        refresh_all(&state).await;
    }
}

pub async fn refresh_all(state: &AppState) {
    join_all(SchoolLevel::ALL.map(|level| refresh_level(state, level))).await;
}

/// Rebuild one level's catalog from the school listing. On failure the
/// previous catalog stays in place and is returned.
pub async fn refresh_level(state: &AppState, level: SchoolLevel) -> Option<CatalogSnapshot> {
    let gate = state.catalog_gate(level);
    let mut last_failure = gate.lock().await;
    load_level(state, level, &mut last_failure).await
}

/// Cached catalog for `level`, loading it on first use.
///
/// Concurrent callers share one listing fetch. After a failed load, callers
/// get `None` without touching upstream until the retry backoff has passed.
pub async fn ensure_level(state: &AppState, level: SchoolLevel) -> Option<CatalogSnapshot> {
    if let Some(snapshot) = state.catalog(level).await {
        return Some(snapshot);
    }

    let gate = state.catalog_gate(level);
    let mut last_failure = gate.lock().await;
    if let Some(snapshot) = state.catalog(level).await {
        return Some(snapshot);
    }
    if (*last_failure).is_some_and(|at| at.elapsed() < retry_backoff()) {
        debug!(level = %level, "region catalog load backing off");
        return None;
    }
    load_level(state, level, &mut last_failure).await
}

fn retry_backoff() -> Duration {
    Duration::from_secs(CATALOG_RETRY_BACKOFF_SECS)
}

async fn load_level(
    state: &AppState,
    level: SchoolLevel,
    last_failure: &mut Option<Instant>,
) -> Option<CatalogSnapshot> {
    match state.api.fetch_school_listing(level).await {
        Ok(schools) => {
            *last_failure = None;
            publish(state, level, schools).await
        }
        Err(e) => {
            *last_failure = Some(Instant::now());
            state.observability.record_catalog_refresh_failure();
            warn!(level = %level, error = %e, "failed to refresh region catalog; keeping previous");
            state.catalog(level).await
        }
    }
}

async fn publish(
    state: &AppState,
    level: SchoolLevel,
    schools: Vec<SchoolRecord>,
) -> Option<CatalogSnapshot> {
    let catalog = RegionCatalog::build(&schools);
    let etag = catalog_etag(level, &catalog, schools.len());
    let mut catalogs = state.catalogs.write().await;
    let revision = match catalogs.get(&level) {
        Some(prev) if prev.etag == etag => prev.revision,
        Some(prev) => prev.revision + 1,
        None => 1,
    };
    let payload = CatalogPayload {
        level,
        available: true,
        revision,
        school_count: schools.len(),
        catalog: &catalog,
    };
    let json = match serde_json::to_vec(&payload) {
        Ok(json) => json,
        Err(e) => {
            warn!(level = %level, error = %e, "failed to serialize region catalog");
            return catalogs.get(&level).cloned();
        }
    };

    info!(
        level = %level,
        revision,
        schools = schools.len(),
        provinces = catalog.region1_options().len(),
        "loaded region catalog"
    );
    let snapshot = CatalogSnapshot {
        revision,
        etag,
        loaded_at: Utc::now(),
        catalog: Arc::new(catalog),
        schools: Arc::new(schools),
        json: Arc::new(Bytes::from(json)),
    };
    catalogs.insert(level, snapshot.clone());
    Some(snapshot)
}

fn catalog_etag(level: SchoolLevel, catalog: &RegionCatalog, school_count: usize) -> String {
    format!(
        "\"regions-{}-{:08x}-{school_count}\"",
        level.as_str(),
        catalog.fingerprint()
    )
}
