use std::sync::Arc;

use bytes::Bytes;
use futures::future::join_all;
use reqwest::{StatusCode, Url};
use schoolwar_shared::admin::{DashboardStats, LoginResponse, UpstreamLogin};
use schoolwar_shared::{
    EntityKind, Ranked, RankedSchool, RankedStudent, RankingQuery, SchoolLevel, SchoolRecord,
    assign_missing_ranks, decode_listing,
};
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::state::ObservabilityCounters;

const BODY_PREVIEW_CHARS: usize = 200;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("invalid upstream url: {0}")]
    InvalidUrl(String),

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("upstream status {status}; body preview: {preview}")]
    Status { status: StatusCode, preview: String },

    #[error("failed to decode payload: {source}; body preview: {preview}")]
    Decode {
        #[source]
        source: serde_json::Error,
        preview: String,
    },
}

impl FetchError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Client for the remote ranking API. Cheap to clone; clones share one
/// connection pool.
#[derive(Clone)]
pub struct RankingApi {
    client: reqwest::Client,
    base: Url,
    observability: Arc<ObservabilityCounters>,
}

impl RankingApi {
    pub fn new(
        client: reqwest::Client,
        base_url: &str,
        observability: Arc<ObservabilityCounters>,
    ) -> Result<Self, FetchError> {
        let base = Url::parse(base_url)
            .map_err(|e| FetchError::InvalidUrl(format!("{base_url}: {e}")))?;
        if base.cannot_be_a_base() {
            return Err(FetchError::InvalidUrl(base_url.to_string()));
        }
        Ok(Self {
            client,
            base,
            observability,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, FetchError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| FetchError::InvalidUrl(self.base.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub fn ranking_url(&self, kind: EntityKind, query: &RankingQuery) -> Result<Url, FetchError> {
        let mut url = self.endpoint(&[
            query.level.path_family(kind),
            "ranking",
            query.scope.as_str(),
        ])?;
        url.query_pairs_mut().extend_pairs(query.query_pairs());
        Ok(url)
    }

    pub fn top_contributors_url(
        &self,
        level: SchoolLevel,
        school_id: i64,
        limit: u32,
    ) -> Result<Url, FetchError> {
        let id = school_id.to_string();
        let mut url = self.endpoint(&[level.school_path(), &id, "top-contributors"])?;
        url.query_pairs_mut()
            .append_pair("limit", &limit.to_string());
        Ok(url)
    }

    async fn get_bytes(&self, url: Url) -> Result<Bytes, FetchError> {
        let resp = self.client.get(url).send().await?;
        successful_body(resp).await
    }

    async fn get_listing<T: DeserializeOwned>(&self, url: Url) -> Result<Vec<T>, FetchError> {
        let bytes = self.get_bytes(url).await?;
        decode_listing(&bytes).map_err(|source| FetchError::Decode {
            source,
            preview: body_preview(&bytes),
        })
    }

    pub async fn try_fetch_ranking<T>(&self, query: &RankingQuery) -> Result<Vec<T>, FetchError>
    where
        T: Ranked + DeserializeOwned,
    {
        let url = self.ranking_url(T::KIND, query)?;
        let mut items = self.get_listing::<T>(url).await?;
        assign_missing_ranks(&mut items);
        Ok(items)
    }

    /// Ranking for one family in server order. Any failure is logged and
    /// yields an empty ranking.
    pub async fn fetch_ranking<T>(&self, query: &RankingQuery) -> Vec<T>
    where
        T: Ranked + DeserializeOwned,
    {
        self.observability.record_ranking_fetch();
        match self.try_fetch_ranking(query).await {
            Ok(items) => items,
            Err(e) => {
                self.observability.record_upstream_failure();
                warn!(
                    family = query.level.path_family(T::KIND),
                    scope = %query.scope,
                    error = %e,
                    "ranking fetch failed; rendering empty ranking"
                );
                Vec::new()
            }
        }
    }

    /// National school rankings for every level, fetched concurrently. A
    /// failing level comes back empty without affecting the others.
    pub async fn fetch_national_overview(
        &self,
        limit: u32,
    ) -> Vec<(SchoolLevel, Vec<RankedSchool>)> {
        join_all(SchoolLevel::ALL.map(|level| async move {
            let query = RankingQuery::national(level, limit);
            (level, self.fetch_ranking::<RankedSchool>(&query).await)
        }))
        .await
    }

    /// Full listing for a level. Errors are returned so the caller can keep
    /// its previous catalog instead of building from nothing.
    pub async fn fetch_school_listing(
        &self,
        level: SchoolLevel,
    ) -> Result<Vec<SchoolRecord>, FetchError> {
        let url = self.endpoint(&[level.school_path()])?;
        self.get_listing(url).await
    }

    pub async fn fetch_top_contributors(
        &self,
        level: SchoolLevel,
        school_id: i64,
        limit: u32,
    ) -> Vec<RankedStudent> {
        self.observability.record_ranking_fetch();
        let result = match self.top_contributors_url(level, school_id, limit) {
            Ok(url) => self.get_listing::<RankedStudent>(url).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(mut students) => {
                assign_missing_ranks(&mut students);
                students
            }
            Err(e) => {
                self.observability.record_upstream_failure();
                warn!(
                    family = level.school_path(),
                    school_id,
                    error = %e,
                    "top contributors fetch failed; rendering empty list"
                );
                Vec::new()
            }
        }
    }

    pub async fn login(&self, credentials: &UpstreamLogin) -> Result<LoginResponse, FetchError> {
        let url = self.endpoint(&["auth", "login"])?;
        let resp = self.client.post(url).json(credentials).send().await?;
        let bytes = successful_body(resp).await?;
        decode_json(&bytes)
    }

    pub async fn admin_stats(&self, access_token: &str) -> Result<DashboardStats, FetchError> {
        let url = self.endpoint(&["admin", "stats"])?;
        let resp = self
            .client
            .get(url)
            .bearer_auth(access_token)
            .send()
            .await?;
        let bytes = successful_body(resp).await?;
        decode_json(&bytes)
    }
}

async fn successful_body(resp: reqwest::Response) -> Result<Bytes, FetchError> {
    let status = resp.status();
    let bytes = resp.bytes().await?;
    if !status.is_success() {
        return Err(FetchError::Status {
            status,
            preview: body_preview(&bytes),
        });
    }
    Ok(bytes)
}

fn decode_json<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, FetchError> {
    serde_json::from_slice(bytes).map_err(|source| FetchError::Decode {
        source,
        preview: body_preview(bytes),
    })
}

fn body_preview(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .chars()
        .take(BODY_PREVIEW_CHARS)
        .collect()
}
