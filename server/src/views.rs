//! Live ranking views. Each view holds one query; replacing it cancels the
//! fetch in flight and only the newest generation may commit a result.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use schoolwar_shared::{EntityKind, RankedSchool, RankedStudent, RankingPage, RankingQuery};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::state::ObservabilityCounters;
use crate::upstream::RankingApi;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewQuery {
    pub kind: EntityKind,
    #[serde(flatten)]
    pub query: RankingQuery,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ViewResult {
    School(RankingPage<RankedSchool>),
    Student(RankingPage<RankedStudent>),
}

/// Fetch and present one ranking. Never fails; upstream trouble yields an
/// empty page.
pub async fn load_view(api: &RankingApi, view: &ViewQuery) -> ViewResult {
    let search = view.search.as_deref();
    match view.kind {
        EntityKind::School => ViewResult::School(RankingPage::present(
            api.fetch_ranking::<RankedSchool>(&view.query).await,
            search,
        )),
        EntityKind::Student => ViewResult::Student(RankingPage::present(
            api.fetch_ranking::<RankedStudent>(&view.query).await,
            search,
        )),
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewSnapshot {
    pub view_id: String,
    pub generation: u64,
    pub loading: bool,
    pub query: ViewQuery,
    pub heading: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_generation: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ViewResult>,
}

struct ViewSlot {
    generation: u64,
    query: ViewQuery,
    cancel: CancellationToken,
    committed: Option<(u64, ViewResult)>,
    touched_at: DateTime<Utc>,
}

impl ViewSlot {
    fn snapshot(&self, view_id: &str) -> ViewSnapshot {
        ViewSnapshot {
            view_id: view_id.to_string(),
            generation: self.generation,
            loading: self
                .committed
                .as_ref()
                .is_none_or(|(generation, _)| *generation != self.generation),
            heading: self.query.query.heading(),
            query: self.query.clone(),
            result_generation: self.committed.as_ref().map(|(generation, _)| *generation),
            result: self.committed.as_ref().map(|(_, result)| result.clone()),
        }
    }
}

pub struct ViewRegistry {
    views: DashMap<String, ViewSlot>,
    next_generation: AtomicU64,
    max_views: usize,
    observability: Arc<ObservabilityCounters>,
}

impl ViewRegistry {
    pub fn new(max_views: usize, observability: Arc<ObservabilityCounters>) -> Self {
        Self {
            views: DashMap::new(),
            next_generation: AtomicU64::new(0),
            max_views: max_views.max(1),
            observability,
        }
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    /// Install `query` as the view's current query. The previous fetch, if
    /// any, is cancelled; its generation can no longer commit.
    pub fn begin(&self, view_id: &str, query: ViewQuery) -> (u64, CancellationToken) {
        if !self.views.contains_key(view_id) {
            while self.views.len() >= self.max_views {
                if !self.evict_oldest() {
                    break;
                }
            }
        }

        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed) + 1;
        let cancel = CancellationToken::new();
        let now = Utc::now();
        match self.views.entry(view_id.to_string()) {
            Entry::Occupied(mut occupied) => {
                let slot = occupied.get_mut();
                slot.cancel.cancel();
                slot.generation = generation;
                slot.query = query;
                slot.cancel = cancel.clone();
                slot.touched_at = now;
            }
            Entry::Vacant(vacant) => {
                vacant.insert(ViewSlot {
                    generation,
                    query,
                    cancel: cancel.clone(),
                    committed: None,
                    touched_at: now,
                });
            }
        }
        (generation, cancel)
    }

    /// Store a finished result. Returns `false`, leaving the view untouched,
    /// when a newer query has been installed since `generation` began.
    pub fn commit(&self, view_id: &str, generation: u64, result: ViewResult) -> bool {
        let Some(mut slot) = self.views.get_mut(view_id) else {
            return false;
        };
        if slot.generation != generation {
            return false;
        }
        slot.committed = Some((generation, result));
        true
    }

    /// Replace the view's query and fetch it in the background.
    pub fn submit(self: &Arc<Self>, api: RankingApi, view_id: &str, query: ViewQuery) -> u64 {
        self.observability.record_view_query();
        let (generation, cancel) = self.begin(view_id, query.clone());
        let registry = Arc::clone(self);
        let view_id = view_id.to_string();

        tokio::spawn(async move {
            let result = tokio::select! {
                () = cancel.cancelled() => {
                    registry.observability.record_cancelled_view_fetch();
                    debug!(view = %view_id, generation, "view fetch superseded before completion");
                    return;
                }
                result = load_view(&api, &query) => result,
            };
            if !registry.commit(&view_id, generation, result) {
                registry.observability.record_stale_view_result();
                info!(view = %view_id, generation, "discarded stale view result");
            }
        });

        generation
    }

    pub fn snapshot(&self, view_id: &str) -> Option<ViewSnapshot> {
        let mut slot = self.views.get_mut(view_id)?;
        slot.touched_at = Utc::now();
        Some(slot.snapshot(view_id))
    }

    /// Drop views untouched for `ttl_secs`, cancelling their fetches.
    pub fn evict_idle(&self, now: DateTime<Utc>, ttl_secs: i64) -> usize {
        let before = self.views.len();
        self.views.retain(|_, slot| {
            let keep = now.signed_duration_since(slot.touched_at).num_seconds() < ttl_secs;
            if !keep {
                slot.cancel.cancel();
            }
            keep
        });
        before.saturating_sub(self.views.len())
    }

    fn evict_oldest(&self) -> bool {
        let oldest = self
            .views
            .iter()
            .min_by_key(|entry| entry.value().touched_at)
            .map(|entry| entry.key().clone());
        let Some(view_id) = oldest else {
            return false;
        };
        match self.views.remove(&view_id) {
            Some((_, slot)) => {
                slot.cancel.cancel();
                true
            }
            None => false,
        }
    }
}
