use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use schoolwar_shared::{
    EntityKind, RankedSchool, RankedStudent, RankingPage, RankingQuery, RankingRow,
    RankingScope, SchoolLevel,
};
use serde::{Deserialize, Serialize};

use crate::config::{
    DASHBOARD_RANKING_LIMIT, DETAIL_RANKING_LIMIT, OVERVIEW_RANKING_LIMIT, TOP_CONTRIBUTORS_LIMIT,
};
use crate::services::catalog_loader;
use crate::state::AppState;
use crate::views::{ViewQuery, ViewResult, load_view};

#[derive(Debug, Default, Deserialize)]
pub struct RankingParams {
    #[serde(default)]
    pub level: SchoolLevel,
    #[serde(default)]
    pub scope: RankingScope,
    #[serde(default)]
    pub region1: Option<String>,
    #[serde(default)]
    pub region2: Option<String>,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub q: Option<String>,
}

impl RankingParams {
    fn into_query(self, default_limit: u32) -> (RankingQuery, Option<String>) {
        let query = RankingQuery {
            level: self.level,
            scope: self.scope,
            region1: self.region1,
            region2: self.region2,
            limit: self.limit.unwrap_or(default_limit),
        };
        (query, self.q)
    }
}

/// Preselect regions the way the pickers do when the scope needs a qualifier
/// that was not given. Without a catalog the query is left alone.
pub(crate) async fn fill_region_defaults(state: &AppState, query: &mut RankingQuery) {
    let blank = |value: &Option<String>| value.as_deref().is_none_or(|v| v.trim().is_empty());
    let missing = match query.scope {
        RankingScope::National => false,
        RankingScope::Regional => blank(&query.region1),
        RankingScope::Nearby => blank(&query.region2),
    };
    if !missing {
        return;
    }
    if let Some(snapshot) = catalog_loader::ensure_level(state, query.level).await
        && !snapshot.catalog.is_empty()
    {
        query.apply_catalog_defaults(&snapshot.catalog);
    }
}

fn parse_kind(segment: &str) -> Result<EntityKind, StatusCode> {
    match segment {
        "schools" => Ok(EntityKind::School),
        "students" => Ok(EntityKind::Student),
        _ => Err(StatusCode::NOT_FOUND),
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingResponse {
    pub query: ViewQuery,
    pub heading: String,
    pub result: ViewResult,
}

pub async fn get_rankings(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    Query(params): Query<RankingParams>,
) -> Result<Json<RankingResponse>, StatusCode> {
    let kind = parse_kind(&kind)?;
    let (mut query, search) = params.into_query(DETAIL_RANKING_LIMIT);
    fill_region_defaults(&state, &mut query).await;

    let view = ViewQuery {
        kind,
        query,
        search,
    };
    let result = load_view(&state.api, &view).await;
    Ok(Json(RankingResponse {
        heading: view.query.heading(),
        query: view,
        result,
    }))
}

#[derive(Debug, Default, Deserialize)]
pub struct LimitParams {
    #[serde(default)]
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelOverview {
    pub level: SchoolLevel,
    pub label: &'static str,
    pub page: RankingPage<RankedSchool>,
}

/// National top schools for every level; one level failing leaves the
/// others intact.
pub async fn get_overview(
    State(state): State<AppState>,
    Query(params): Query<LimitParams>,
) -> Json<Vec<LevelOverview>> {
    let limit = params.limit.unwrap_or(OVERVIEW_RANKING_LIMIT);
    let levels = state
        .api
        .fetch_national_overview(limit)
        .await
        .into_iter()
        .map(|(level, schools)| LevelOverview {
            level,
            label: level.label(),
            page: RankingPage::present(schools, None),
        })
        .collect();
    Json(levels)
}

#[derive(Debug, Default, Deserialize)]
pub struct ContributorParams {
    #[serde(default)]
    pub level: SchoolLevel,
    #[serde(default)]
    pub limit: Option<u32>,
}

pub async fn get_top_contributors(
    State(state): State<AppState>,
    Path(school_id): Path<i64>,
    Query(params): Query<ContributorParams>,
) -> Json<RankingPage<RankedStudent>> {
    let limit = params.limit.unwrap_or(TOP_CONTRIBUTORS_LIMIT).clamp(1, 100);
    let students = state
        .api
        .fetch_top_contributors(params.level, school_id, limit)
        .await;
    Json(RankingPage::present(students, None))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub query: RankingQuery,
    pub heading: String,
    pub schools: RankingPage<RankedSchool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_school: Option<RankingRow<RankedSchool>>,
    pub top_contributors: RankingPage<RankedStudent>,
}

/// School ranking with the first school selected and its top contributors.
pub async fn get_dashboard(
    State(state): State<AppState>,
    Query(params): Query<RankingParams>,
) -> Json<Dashboard> {
    let (mut query, search) = params.into_query(DASHBOARD_RANKING_LIMIT);
    fill_region_defaults(&state, &mut query).await;

    let schools = RankingPage::present(
        state.api.fetch_ranking::<RankedSchool>(&query).await,
        search.as_deref(),
    );
    let selected_school = schools.rows.first().cloned();
    let top_contributors = match &selected_school {
        Some(row) => RankingPage::present(
            state
                .api
                .fetch_top_contributors(query.level, row.entity.id, TOP_CONTRIBUTORS_LIMIT)
                .await,
            None,
        ),
        None => RankingPage::empty(),
    };

    Json(Dashboard {
        heading: query.heading(),
        query,
        schools,
        selected_school,
        top_contributors,
    })
}
