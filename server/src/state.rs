use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use schoolwar_shared::{RegionCatalog, SchoolLevel, SchoolRecord};
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::warn;

use crate::config::{
    MAX_LIVE_VIEWS, ranking_api_base, static_dir, upstream_connect_timeout, upstream_http_timeout,
};
use crate::upstream::{FetchError, RankingApi};
use crate::views::ViewRegistry;

/// Region catalog for one level, with its pre-serialized API payload.
#[derive(Debug, Clone)]
pub struct CatalogSnapshot {
    /// Bumped only when the served catalog content changes.
    pub revision: u64,
    /// Content-derived entity tag, stable across restarts.
    pub etag: String,
    pub loaded_at: DateTime<Utc>,
    pub catalog: Arc<RegionCatalog>,
    /// Listing the catalog was built from; map markers are drawn from it.
    pub schools: Arc<Vec<SchoolRecord>>,
    pub json: Arc<Bytes>,
}

pub type CatalogMap = HashMap<SchoolLevel, CatalogSnapshot>;

/// Serializes listing loads for one level and remembers when the last one
/// failed.
pub type CatalogGate = Arc<Mutex<Option<Instant>>>;

#[derive(Clone)]
pub struct AppState {
    pub api: RankingApi,
    pub catalogs: Arc<RwLock<CatalogMap>>,
    pub catalog_gates: Arc<DashMap<SchoolLevel, CatalogGate>>,
    pub views: Arc<ViewRegistry>,
    pub static_dir: String,
    pub observability: Arc<ObservabilityCounters>,
}

#[derive(Debug, Default)]
pub struct ObservabilityCounters {
    ranking_fetches_total: AtomicU64,
    upstream_failures_total: AtomicU64,
    catalog_refresh_failures_total: AtomicU64,
    view_queries_total: AtomicU64,
    cancelled_view_fetches_total: AtomicU64,
    stale_view_results_total: AtomicU64,
    admin_requests_total: AtomicU64,
}

#[derive(Debug, Clone, Copy)]
pub struct ObservabilitySnapshot {
    pub ranking_fetches_total: u64,
    pub upstream_failures_total: u64,
    pub catalog_refresh_failures_total: u64,
    pub view_queries_total: u64,
    pub cancelled_view_fetches_total: u64,
    pub stale_view_results_total: u64,
    pub admin_requests_total: u64,
}

impl ObservabilityCounters {
    pub fn snapshot(&self) -> ObservabilitySnapshot {
        ObservabilitySnapshot {
            ranking_fetches_total: self.ranking_fetches_total.load(Ordering::Relaxed),
            upstream_failures_total: self.upstream_failures_total.load(Ordering::Relaxed),
            catalog_refresh_failures_total: self
                .catalog_refresh_failures_total
                .load(Ordering::Relaxed),
            view_queries_total: self.view_queries_total.load(Ordering::Relaxed),
            cancelled_view_fetches_total: self
                .cancelled_view_fetches_total
                .load(Ordering::Relaxed),
            stale_view_results_total: self.stale_view_results_total.load(Ordering::Relaxed),
            admin_requests_total: self.admin_requests_total.load(Ordering::Relaxed),
        }
    }

    pub fn record_ranking_fetch(&self) {
        self.ranking_fetches_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_upstream_failure(&self) {
        self.upstream_failures_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_catalog_refresh_failure(&self) {
        self.catalog_refresh_failures_total
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_view_query(&self) {
        self.view_queries_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cancelled_view_fetch(&self) {
        self.cancelled_view_fetches_total
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_stale_view_result(&self) {
        self.stale_view_results_total
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_admin_request(&self) {
        self.admin_requests_total.fetch_add(1, Ordering::Relaxed);
    }
}

impl AppState {
    pub fn from_env() -> Result<Self, FetchError> {
        let request_timeout = upstream_http_timeout();
        let connect_timeout = upstream_connect_timeout();
        let http_client = reqwest::Client::builder()
            .user_agent("schoolwar-server/0.1")
            .timeout(request_timeout)
            .connect_timeout(connect_timeout)
            .build()
            .or_else(|e| {
                warn!(
                    error = %e,
                    "failed to build configured HTTP client, retrying without custom user-agent"
                );
                reqwest::Client::builder()
                    .timeout(request_timeout)
                    .connect_timeout(connect_timeout)
                    .build()
            })?;
        Self::new(http_client, &ranking_api_base(), static_dir())
    }

    pub fn new(
        http_client: reqwest::Client,
        api_base: &str,
        static_dir: String,
    ) -> Result<Self, FetchError> {
        let observability = Arc::new(ObservabilityCounters::default());
        let api = RankingApi::new(http_client, api_base, Arc::clone(&observability))?;
        Ok(Self {
            api,
            catalogs: Arc::new(RwLock::new(HashMap::new())),
            catalog_gates: Arc::new(DashMap::new()),
            views: Arc::new(ViewRegistry::new(
                MAX_LIVE_VIEWS,
                Arc::clone(&observability),
            )),
            static_dir,
            observability,
        })
    }

    pub async fn catalog(&self, level: SchoolLevel) -> Option<CatalogSnapshot> {
        self.catalogs.read().await.get(&level).cloned()
    }

    pub fn catalog_gate(&self, level: SchoolLevel) -> CatalogGate {
        Arc::clone(self.catalog_gates.entry(level).or_default().value())
    }
}
