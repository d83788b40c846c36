use std::fmt::Write as _;
use std::sync::Arc;

use axum::Json;
use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use chrono::Utc;
use schoolwar_shared::launch::{Countdown, launch_at};
use schoolwar_shared::map::{MAP_HEIGHT, MAP_WIDTH, MapMarker, markers};
use schoolwar_shared::{RegionCatalog, SchoolLevel};
use serde::{Deserialize, Serialize};

use super::LevelParams;
use crate::services::catalog_loader;
use crate::state::{AppState, ObservabilitySnapshot};

const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";
const CATALOG_CACHE_CONTROL: &str = "public, max-age=300";

pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let catalogs: serde_json::Map<String, serde_json::Value> = state
        .catalogs
        .read()
        .await
        .iter()
        .map(|(level, snapshot)| {
            (
                level.as_str().to_string(),
                serde_json::json!({
                    "revision": snapshot.revision,
                    "loaded_at": snapshot.loaded_at.to_rfc3339(),
                }),
            )
        })
        .collect();
    let observability = state.observability.snapshot();
    Json(serde_json::json!({
        "status": "ok",
        "catalogs": catalogs,
        "live_views": state.views.len(),
        "observability": {
            "ranking_fetches_total": observability.ranking_fetches_total,
            "upstream_failures_total": observability.upstream_failures_total,
            "catalog_refresh_failures_total": observability.catalog_refresh_failures_total,
            "view_queries_total": observability.view_queries_total,
            "cancelled_view_fetches_total": observability.cancelled_view_fetches_total,
            "stale_view_results_total": observability.stale_view_results_total,
            "admin_requests_total": observability.admin_requests_total,
        }
    }))
}

pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    let catalog_levels = state.catalogs.read().await.len();
    let body = render_prometheus_metrics(
        catalog_levels,
        state.views.len(),
        state.observability.snapshot(),
    );

    (
        [
            (header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE),
            (header::CACHE_CONTROL, "no-store"),
        ],
        body,
    )
}

fn render_prometheus_metrics(
    catalog_levels: usize,
    live_views: usize,
    observability: ObservabilitySnapshot,
) -> String {
    let mut body = String::new();
    write_metric(
        &mut body,
        "schoolwar_catalog_levels_loaded",
        "gauge",
        "School levels with a loaded region catalog.",
        catalog_levels as u64,
    );
    write_metric(
        &mut body,
        "schoolwar_live_views",
        "gauge",
        "Ranking views currently held in memory.",
        live_views as u64,
    );
    write_metric(
        &mut body,
        "schoolwar_ranking_fetches_total",
        "counter",
        "Total ranking requests sent to the ranking API.",
        observability.ranking_fetches_total,
    );
    write_metric(
        &mut body,
        "schoolwar_upstream_failures_total",
        "counter",
        "Total ranking requests that failed and rendered empty.",
        observability.upstream_failures_total,
    );
    write_metric(
        &mut body,
        "schoolwar_catalog_refresh_failures_total",
        "counter",
        "Total failed region catalog refreshes.",
        observability.catalog_refresh_failures_total,
    );
    write_metric(
        &mut body,
        "schoolwar_view_queries_total",
        "counter",
        "Total queries submitted to live views.",
        observability.view_queries_total,
    );
    write_metric(
        &mut body,
        "schoolwar_cancelled_view_fetches_total",
        "counter",
        "Total view fetches cancelled by a newer query.",
        observability.cancelled_view_fetches_total,
    );
    write_metric(
        &mut body,
        "schoolwar_stale_view_results_total",
        "counter",
        "Total view results discarded because a newer query superseded them.",
        observability.stale_view_results_total,
    );
    write_metric(
        &mut body,
        "schoolwar_admin_requests_total",
        "counter",
        "Total admin login and statistics requests.",
        observability.admin_requests_total,
    );
    body
}

fn write_metric(body: &mut String, name: &str, kind: &str, help: &str, value: u64) {
    let _ = writeln!(body, "# HELP {name} {help}");
    let _ = writeln!(body, "# TYPE {name} {kind}");
    let _ = writeln!(body, "{name} {value}");
}

/// Serve the pre-serialized province/district catalog for a level.
pub async fn get_regions(
    State(state): State<AppState>,
    Query(params): Query<LevelParams>,
    headers: HeaderMap,
) -> Response {
    let Some(snapshot) = catalog_loader::ensure_level(&state, params.level).await else {
        return Json(EmptyCatalog {
            level: params.level,
            available: false,
            revision: 0,
            school_count: 0,
            catalog: RegionCatalog::default(),
        })
        .into_response();
    };

    if if_none_match_matches(&headers, &snapshot.etag) {
        return not_modified_response(CATALOG_CACHE_CONTROL, Some(snapshot.etag.as_str()));
    }
    json_bytes_response(
        (*snapshot.json).clone(),
        CATALOG_CACHE_CONTROL,
        Some(snapshot.etag.as_str()),
    )
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EmptyCatalog {
    level: SchoolLevel,
    available: bool,
    revision: u64,
    school_count: usize,
    #[serde(flatten)]
    catalog: RegionCatalog,
}

#[derive(Debug, Deserialize)]
pub struct RegionOptionsParams {
    #[serde(default)]
    pub level: SchoolLevel,
    #[serde(default)]
    pub region1: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionOptions {
    /// False when no catalog could be loaded; the pickers are disabled.
    pub available: bool,
    pub region1_options: Vec<String>,
    pub region1: Option<String>,
    pub region2_options: Vec<String>,
    /// District the picker selects after the province changes.
    pub region2: Option<String>,
}

/// Options for the cascading pickers. Choosing a province yields its
/// districts with the first one preselected; without a choice the first
/// province is selected.
pub async fn get_region_options(
    State(state): State<AppState>,
    Query(params): Query<RegionOptionsParams>,
) -> Json<RegionOptions> {
    let catalog = catalog_loader::ensure_level(&state, params.level)
        .await
        .map(|snapshot| snapshot.catalog)
        .unwrap_or_default();
    Json(region_options(&catalog, params.region1))
}

fn region_options(catalog: &RegionCatalog, region1: Option<String>) -> RegionOptions {
    let region1 = region1
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty())
        .or_else(|| catalog.region1_options().first().cloned());
    let region2_options = region1
        .as_deref()
        .map(|r| catalog.region2_options(r).to_vec())
        .unwrap_or_default();
    RegionOptions {
        available: !catalog.is_empty(),
        region1_options: catalog.region1_options().to_vec(),
        region2: region2_options.first().cloned(),
        region1,
        region2_options,
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchStatus {
    pub launch_at: String,
    pub launched: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub countdown: Option<Countdown>,
}

pub async fn get_launch() -> impl IntoResponse {
    let target = launch_at();
    let countdown = Countdown::until(target, Utc::now());
    (
        [(header::CACHE_CONTROL, "no-store")],
        Json(LaunchStatus {
            launch_at: target.to_rfc3339(),
            launched: countdown.is_none(),
            countdown,
        }),
    )
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchoolMap {
    pub level: SchoolLevel,
    pub width: f64,
    pub height: f64,
    pub markers: Vec<MapMarker>,
}

pub async fn get_map(
    State(state): State<AppState>,
    Query(params): Query<LevelParams>,
) -> Json<SchoolMap> {
    let schools = catalog_loader::ensure_level(&state, params.level)
        .await
        .map(|snapshot| snapshot.schools)
        .unwrap_or_else(|| Arc::new(Vec::new()));
    Json(SchoolMap {
        level: params.level,
        width: MAP_WIDTH,
        height: MAP_HEIGHT,
        markers: markers(&schools),
    })
}

fn json_bytes_response(body: Bytes, cache_control: &'static str, etag: Option<&str>) -> Response {
    let mut response = Response::new(Body::from(body));
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static(cache_control),
    );
    if let Some(etag) = etag
        && let Ok(etag_header) = HeaderValue::from_str(etag)
    {
        headers.insert(header::ETAG, etag_header);
    }
    response
}

fn not_modified_response(cache_control: &'static str, etag: Option<&str>) -> Response {
    let mut response = StatusCode::NOT_MODIFIED.into_response();
    let headers = response.headers_mut();
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static(cache_control),
    );
    if let Some(etag) = etag
        && let Ok(etag_header) = HeaderValue::from_str(etag)
    {
        headers.insert(header::ETAG, etag_header);
    }
    response
}

fn normalize_etag(candidate: &str) -> &str {
    candidate.strip_prefix("W/").unwrap_or(candidate).trim()
}

fn if_none_match_matches(headers: &HeaderMap, etag: &str) -> bool {
    let Some(value) = headers.get(header::IF_NONE_MATCH) else {
        return false;
    };
    let Ok(raw) = value.to_str() else {
        return false;
    };

    raw.split(',').any(|candidate| {
        let candidate = candidate.trim();
        candidate == "*" || normalize_etag(candidate) == normalize_etag(etag)
    })
}
