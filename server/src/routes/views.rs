use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::Serialize;

use super::rankings::fill_region_defaults;
use crate::state::AppState;
use crate::views::{ViewQuery, ViewSnapshot};

const MAX_VIEW_ID_LEN: usize = 64;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewAccepted {
    pub view_id: String,
    pub generation: u64,
    pub query: ViewQuery,
}

/// Replace a view's query. The fetch runs in the background; poll the view
/// to read the result.
pub async fn put_view(
    State(state): State<AppState>,
    Path(view_id): Path<String>,
    Json(mut view): Json<ViewQuery>,
) -> Result<(StatusCode, Json<ViewAccepted>), StatusCode> {
    let view_id = normalize_view_id(&view_id)?.to_string();
    fill_region_defaults(&state, &mut view.query).await;
    let generation = state
        .views
        .submit(state.api.clone(), &view_id, view.clone());
    Ok((
        StatusCode::ACCEPTED,
        Json(ViewAccepted {
            view_id,
            generation,
            query: view,
        }),
    ))
}

pub async fn get_view(
    State(state): State<AppState>,
    Path(view_id): Path<String>,
) -> Result<Json<ViewSnapshot>, StatusCode> {
    let view_id = normalize_view_id(&view_id)?;
    state
        .views
        .snapshot(view_id)
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

fn normalize_view_id(view_id: &str) -> Result<&str, StatusCode> {
    let trimmed = view_id.trim();
    if trimmed.is_empty() || trimmed.len() > MAX_VIEW_ID_LEN {
        return Err(StatusCode::BAD_REQUEST);
    }
    if !trimmed
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(StatusCode::BAD_REQUEST);
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::Router;
    use axum::http::StatusCode;
    use axum::routing::get;

    use super::normalize_view_id;
    use crate::routes::test_support::{shutdown, spawn_app_with_upstream};

    #[test]
    fn view_ids_are_restricted() {
        assert_eq!(normalize_view_id(" tab-1 "), Ok("tab-1"));
        assert_eq!(normalize_view_id(""), Err(StatusCode::BAD_REQUEST));
        assert_eq!(normalize_view_id("a/b"), Err(StatusCode::BAD_REQUEST));
        assert_eq!(
            normalize_view_id(&"x".repeat(65)),
            Err(StatusCode::BAD_REQUEST)
        );
    }

    #[tokio::test]
    async fn put_then_poll_returns_committed_page() {
        let upstream = Router::new().route(
            "/high-users/ranking/nearby",
            get(|| async { r#"[{"id": 5, "rank": 1, "nickname": "dragon", "totalScore": 60000}]"# }),
        );
        let (base_url, _state, handles) = spawn_app_with_upstream(upstream).await;
        let client = reqwest::Client::new();

        let accepted = client
            .put(format!("{base_url}/api/views/tab-1"))
            .json(&serde_json::json!({
                "kind": "student",
                "level": "high",
                "scope": "nearby",
                "region1": "서울",
                "region2": "강남구"
            }))
            .send()
            .await
            .expect("put view");
        assert_eq!(accepted.status(), StatusCode::ACCEPTED);
        let accepted: serde_json::Value = accepted.json().await.expect("accepted json");
        let generation = accepted["generation"].as_u64().expect("generation");

        let mut snapshot = serde_json::Value::Null;
        for _ in 0..50 {
            snapshot = client
                .get(format!("{base_url}/api/views/tab-1"))
                .send()
                .await
                .expect("get view")
                .json()
                .await
                .expect("view json");
            if snapshot["loading"] == false {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        assert_eq!(snapshot["loading"], false);
        assert_eq!(snapshot["resultGeneration"].as_u64(), Some(generation));
        assert_eq!(snapshot["heading"], "📌 강남구 순위");
        assert_eq!(snapshot["result"]["kind"], "student");
        assert_eq!(snapshot["result"]["rows"][0]["displayTier"]["code"], "DRAGON");

        shutdown(handles).await;
    }

    #[tokio::test]
    async fn unknown_view_is_not_found() {
        let (base_url, _state, handles) = spawn_app_with_upstream(Router::new()).await;

        let resp = reqwest::get(format!("{base_url}/api/views/missing"))
            .await
            .expect("get view");
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        shutdown(handles).await;
    }
}
