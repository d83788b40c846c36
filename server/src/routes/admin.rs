use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use schoolwar_shared::admin::{AdminDashboard, LoginRequest, LoginResponse, UpstreamLogin};
use tracing::warn;

use crate::state::AppState;

const LOGIN_FAILED: &str = "로그인에 실패했습니다. 이메일과 비밀번호를 확인해주세요.";
const LOGIN_REQUIRED: &str = "로그인이 필요합니다.";
const STATS_UNAVAILABLE: &str = "데이터를 불러오는데 실패했습니다.";

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}

/// Exchange admin credentials for an access token from the ranking API.
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, Response> {
    state.observability.record_admin_request();
    let credentials = UpstreamLogin::from(request);
    state.api.login(&credentials).await.map(Json).map_err(|e| {
        warn!(error = %e, "admin login failed");
        error_response(StatusCode::UNAUTHORIZED, LOGIN_FAILED)
    })
}

pub async fn stats(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<AdminDashboard>, Response> {
    state.observability.record_admin_request();
    let Some(token) = bearer_token(&headers) else {
        return Err(error_response(StatusCode::UNAUTHORIZED, LOGIN_REQUIRED));
    };

    match state.api.admin_stats(token).await {
        Ok(stats) => Ok(Json(AdminDashboard::from(stats))),
        Err(e) => {
            warn!(error = %e, "failed to load admin statistics");
            match e.status() {
                Some(StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) => {
                    Err(error_response(StatusCode::UNAUTHORIZED, LOGIN_REQUIRED))
                }
                _ => Err(error_response(StatusCode::BAD_GATEWAY, STATS_UNAVAILABLE)),
            }
        }
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

#[cfg(test)]
mod tests {
    use axum::Router;
    use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
    use axum::routing::{get, post};

    use super::bearer_token;
    use crate::routes::test_support::{shutdown, spawn_app_with_upstream};

    const STATS: &str = r#"{
        "totalUsers": 120, "totalSchools": 8, "totalQuestions": 450, "todayProgress": 37,
        "schoolStats": [{"schoolId": 2, "schoolName": "새솔중", "userCount": 6, "progressCount": 20}],
        "dailyProgress": [{"date": "2026-03-02", "count": 11}]
    }"#;

    fn upstream() -> Router {
        Router::new()
            .route(
                "/auth/login",
                post(|axum::Json(body): axum::Json<serde_json::Value>| async move {
                    if body["username"] == "admin@schoolwar.kr" && body["password"] == "secret" {
                        Ok(axum::Json(serde_json::json!({"accessToken": "tok-1"})))
                    } else {
                        Err(StatusCode::UNAUTHORIZED)
                    }
                }),
            )
            .route(
                "/admin/stats",
                get(|headers: HeaderMap| async move {
                    match headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()) {
                        Some("Bearer tok-1") => Ok(STATS),
                        Some("Bearer broken") => Err(StatusCode::INTERNAL_SERVER_ERROR),
                        _ => Err(StatusCode::UNAUTHORIZED),
                    }
                }),
            )
    }

    #[test]
    fn bearer_token_requires_scheme_and_value() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        assert_eq!(bearer_token(&headers), Some("abc"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("bearer  xyz "));
        assert_eq!(bearer_token(&headers), Some("xyz"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);
    }

    #[tokio::test]
    async fn login_maps_email_to_username_and_returns_token() {
        let (base_url, _state, handles) = spawn_app_with_upstream(upstream()).await;
        let client = reqwest::Client::new();

        let ok: serde_json::Value = client
            .post(format!("{base_url}/api/admin/login"))
            .json(&serde_json::json!({"email": "admin@schoolwar.kr", "password": "secret"}))
            .send()
            .await
            .expect("login request")
            .json()
            .await
            .expect("login json");
        assert_eq!(ok["accessToken"], "tok-1");

        let denied = client
            .post(format!("{base_url}/api/admin/login"))
            .json(&serde_json::json!({"email": "admin@schoolwar.kr", "password": "nope"}))
            .send()
            .await
            .expect("login request");
        assert_eq!(denied.status(), StatusCode::UNAUTHORIZED);
        let body: serde_json::Value = denied.json().await.expect("error json");
        assert_eq!(body["error"], super::LOGIN_FAILED);

        shutdown(handles).await;
    }

    #[tokio::test]
    async fn stats_require_a_token() {
        let (base_url, state, handles) = spawn_app_with_upstream(upstream()).await;
        let client = reqwest::Client::new();

        let resp = client
            .get(format!("{base_url}/api/admin/stats"))
            .send()
            .await
            .expect("stats request");
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let rejected = client
            .get(format!("{base_url}/api/admin/stats"))
            .bearer_auth("expired")
            .send()
            .await
            .expect("stats request");
        assert_eq!(rejected.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(state.observability.snapshot().admin_requests_total, 2);

        shutdown(handles).await;
    }

    #[tokio::test]
    async fn stats_render_dashboard_or_bad_gateway() {
        let (base_url, _state, handles) = spawn_app_with_upstream(upstream()).await;
        let client = reqwest::Client::new();

        let dashboard: serde_json::Value = client
            .get(format!("{base_url}/api/admin/stats"))
            .bearer_auth("tok-1")
            .send()
            .await
            .expect("stats request")
            .json()
            .await
            .expect("dashboard json");
        assert_eq!(dashboard["cards"][0]["title"], "전체 사용자");
        assert_eq!(dashboard["cards"][0]["value"], 120);
        assert_eq!(dashboard["schools"][0]["averageProgress"], 3.3);
        assert_eq!(dashboard["daily"][0]["axisLabel"], "3/2");

        let failed = client
            .get(format!("{base_url}/api/admin/stats"))
            .bearer_auth("broken")
            .send()
            .await
            .expect("stats request");
        assert_eq!(failed.status(), StatusCode::BAD_GATEWAY);

        shutdown(handles).await;
    }
}
