use std::time::Duration;

pub const DEFAULT_RANKING_API_BASE: &str = "https://api.schoolwar.kr";
pub const DEFAULT_SERVER_PORT: u16 = 3000;
pub const DEFAULT_STATIC_DIR: &str = "web/dist";

pub const DEFAULT_UPSTREAM_HTTP_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_UPSTREAM_CONNECT_TIMEOUT_SECS: u64 = 3;
pub const DEFAULT_CATALOG_REFRESH_SECS: u64 = 3600; // hourly
pub const CATALOG_RETRY_BACKOFF_SECS: u64 = 30;
pub const DEFAULT_VIEW_IDLE_TTL_SECS: i64 = 600; // 10 minutes

pub const VIEW_EVICTION_INTERVAL_SECS: u64 = 60;
pub const MAX_LIVE_VIEWS: usize = 1024;

pub const DETAIL_RANKING_LIMIT: u32 = 1000;
pub const DASHBOARD_RANKING_LIMIT: u32 = 50;
pub const OVERVIEW_RANKING_LIMIT: u32 = 10;
pub const TOP_CONTRIBUTORS_LIMIT: u32 = 10;

pub fn ranking_api_base() -> String {
    std::env::var("RANKING_API_BASE")
        .ok()
        .map(|value| value.trim().trim_end_matches('/').to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| DEFAULT_RANKING_API_BASE.to_string())
}

pub fn server_port() -> u16 {
    std::env::var("SERVER_PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(DEFAULT_SERVER_PORT)
}

pub fn static_dir() -> String {
    std::env::var("STATIC_DIR")
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_STATIC_DIR.to_string())
}

pub fn upstream_http_timeout() -> Duration {
    std::env::var("UPSTREAM_HTTP_TIMEOUT_SECS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|value| *value > 0)
        .map(Duration::from_secs)
        .unwrap_or_else(|| Duration::from_secs(DEFAULT_UPSTREAM_HTTP_TIMEOUT_SECS))
}

pub fn upstream_connect_timeout() -> Duration {
    std::env::var("UPSTREAM_CONNECT_TIMEOUT_SECS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|value| *value > 0)
        .map(Duration::from_secs)
        .unwrap_or_else(|| Duration::from_secs(DEFAULT_UPSTREAM_CONNECT_TIMEOUT_SECS))
}

pub fn catalog_refresh_interval() -> Duration {
    std::env::var("CATALOG_REFRESH_SECS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|value| *value > 0)
        .map(Duration::from_secs)
        .unwrap_or_else(|| Duration::from_secs(DEFAULT_CATALOG_REFRESH_SECS))
}

pub fn view_idle_ttl_secs() -> i64 {
    std::env::var("VIEW_IDLE_TTL_SECS")
        .ok()
        .and_then(|value| value.parse::<i64>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(DEFAULT_VIEW_IDLE_TTL_SECS)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn api_base_trims_trailing_slash() {
        temp_env::with_var("RANKING_API_BASE", Some("http://localhost:3810/"), || {
            assert_eq!(ranking_api_base(), "http://localhost:3810");
        });
        temp_env::with_var("RANKING_API_BASE", Some("   "), || {
            assert_eq!(ranking_api_base(), DEFAULT_RANKING_API_BASE);
        });
    }

    #[test]
    fn invalid_numbers_fall_back_to_defaults() {
        temp_env::with_vars(
            [
                ("UPSTREAM_HTTP_TIMEOUT_SECS", Some("0")),
                ("UPSTREAM_CONNECT_TIMEOUT_SECS", Some("soon")),
                ("SERVER_PORT", Some("70000")),
                ("VIEW_IDLE_TTL_SECS", Some("-5")),
            ],
            || {
                assert_eq!(
                    upstream_http_timeout(),
                    Duration::from_secs(DEFAULT_UPSTREAM_HTTP_TIMEOUT_SECS)
                );
                assert_eq!(
                    upstream_connect_timeout(),
                    Duration::from_secs(DEFAULT_UPSTREAM_CONNECT_TIMEOUT_SECS)
                );
                assert_eq!(server_port(), DEFAULT_SERVER_PORT);
                assert_eq!(view_idle_ttl_secs(), DEFAULT_VIEW_IDLE_TTL_SECS);
            },
        );
    }

    #[test]
    fn valid_overrides_are_used() {
        temp_env::with_vars(
            [
                ("UPSTREAM_HTTP_TIMEOUT_SECS", Some("2")),
                ("CATALOG_REFRESH_SECS", Some("30")),
                ("SERVER_PORT", Some("8080")),
                ("STATIC_DIR", Some("public")),
            ],
            || {
                assert_eq!(upstream_http_timeout(), Duration::from_secs(2));
                assert_eq!(catalog_refresh_interval(), Duration::from_secs(30));
                assert_eq!(server_port(), 8080);
                assert_eq!(static_dir(), "public");
            },
        );
    }
}
