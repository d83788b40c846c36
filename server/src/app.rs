use std::path::Path;

use axum::{
    Router,
    extract::Request,
    http::{HeaderValue, header},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};

use crate::routes;
use crate::state::AppState;

pub(crate) fn build_app(state: AppState) -> Router {
    let index = Path::new(&state.static_dir).join("index.html");
    let static_assets = Router::new()
        .fallback_service(
            ServeDir::new(&state.static_dir)
                .precompressed_br()
                .precompressed_gzip()
                .fallback(ServeFile::new(index)),
        )
        .layer(middleware::from_fn(set_static_cache_control));

    let app = Router::new()
        .route("/api/health", get(routes::api::health))
        .route("/api/metrics", get(routes::api::metrics))
        .route("/api/launch", get(routes::api::get_launch))
        .route("/api/regions", get(routes::api::get_regions))
        .route("/api/regions/options", get(routes::api::get_region_options))
        .route("/api/map", get(routes::api::get_map))
        .route("/api/overview", get(routes::rankings::get_overview))
        .route("/api/dashboard", get(routes::rankings::get_dashboard))
        .route("/api/rankings/{kind}", get(routes::rankings::get_rankings))
        .route(
            "/api/schools/{id}/top-contributors",
            get(routes::rankings::get_top_contributors),
        )
        .route(
            "/api/views/{id}",
            get(routes::views::get_view).put(routes::views::put_view),
        )
        .route("/api/admin/login", post(routes::admin::login))
        .route("/api/admin/stats", get(routes::admin::stats));

    app.layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .fallback_service(static_assets)
        .with_state(state)
}

async fn set_static_cache_control(request: Request, next: Next) -> Response {
    let path = request.uri().path().to_owned();
    let mut response = next.run(request).await;

    if response.status().is_success()
        && let Some(cache_control) = cache_control_for_path(&path)
    {
        response.headers_mut().insert(
            header::CACHE_CONTROL,
            HeaderValue::from_static(cache_control),
        );
    }

    response
}

fn cache_control_for_path(path: &str) -> Option<&'static str> {
    if is_hashed_bundle_asset(path) {
        return Some("public, max-age=31536000, immutable");
    }

    if path.starts_with("/images/") || path.starts_with("/fonts/") || path.starts_with("/icons/") {
        return Some("public, max-age=86400");
    }

    None
}

fn is_hashed_bundle_asset(path: &str) -> bool {
    let Some(ext) = Path::new(path).extension().and_then(|ext| ext.to_str()) else {
        return false;
    };

    if !matches!(ext, "js" | "css") {
        return false;
    }

    let Some(filename) = Path::new(path).file_name().and_then(|name| name.to_str()) else {
        return false;
    };

    filename
        .split(['-', '_', '.'])
        .any(|segment| segment.len() >= 8 && segment.chars().all(|c| c.is_ascii_hexdigit()))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use axum::body::{Body, to_bytes};
    use axum::http::StatusCode;
    use tower::ServiceExt;

    use super::*;

    #[test]
    fn immutable_cache_for_hashed_bundle_assets() {
        assert_eq!(
            cache_control_for_path("/_next/static/chunks/main-3f9a1c2b7d4e5f60.js"),
            Some("public, max-age=31536000, immutable")
        );
        assert_eq!(
            cache_control_for_path("/assets/index-a93762ff.css"),
            Some("public, max-age=31536000, immutable")
        );
    }

    #[test]
    fn short_cache_for_unhashed_static_assets() {
        assert_eq!(
            cache_control_for_path("/images/korea-map.svg"),
            Some("public, max-age=86400")
        );
        assert_eq!(
            cache_control_for_path("/fonts/pretendard.woff2"),
            Some("public, max-age=86400")
        );
    }

    #[test]
    fn no_cache_header_override_for_html() {
        assert_eq!(cache_control_for_path("/"), None);
        assert_eq!(cache_control_for_path("/index.html"), None);
        assert_eq!(cache_control_for_path("/app.js"), None);
    }

    #[test]
    fn only_script_and_style_bundles_are_treated_as_hashed() {
        assert_eq!(cache_control_for_path("/assets/module-a93762ff.wasm"), None);
        assert_eq!(cache_control_for_path("/assets/data-a93762ff.json"), None);
    }

    #[tokio::test]
    async fn unknown_paths_fall_back_to_index_html() {
        let dir = std::env::temp_dir().join(format!("schoolwar-static-{}", std::process::id()));
        fs::create_dir_all(&dir).expect("create static dir");
        fs::write(dir.join("index.html"), "<h1>SchoolWar</h1>").expect("write index");

        let state = AppState::new(
            reqwest::Client::new(),
            "http://127.0.0.1:9",
            dir.to_string_lossy().into_owned(),
        )
        .expect("state");
        let request = axum::http::Request::builder()
            .uri("/dashboard")
            .body(Body::empty())
            .expect("build request");

        let resp = build_app(state)
            .oneshot(request)
            .await
            .expect("static response");
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(resp.headers().get(header::CACHE_CONTROL).is_none());
        let body = to_bytes(resp.into_body(), usize::MAX)
            .await
            .expect("read body");
        assert_eq!(&body[..], b"<h1>SchoolWar</h1>");

        let _ = fs::remove_dir_all(&dir);
    }
}
