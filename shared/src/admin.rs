use chrono::{DateTime, Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchoolStats {
    pub school_id: i64,
    pub school_name: String,
    #[serde(default)]
    pub user_count: u64,
    #[serde(default)]
    pub progress_count: u64,
}

impl SchoolStats {
    /// Solved questions per user, one decimal; `0.0` for a school without users.
    pub fn average_progress(&self) -> f64 {
        if self.user_count == 0 {
            return 0.0;
        }
        let avg = self.progress_count as f64 / self.user_count as f64;
        (avg * 10.0).round() / 10.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyProgress {
    pub date: String,
    #[serde(default)]
    pub count: u64,
}

impl DailyProgress {
    fn parsed_date(&self) -> Option<NaiveDate> {
        let raw = self.date.trim();
        DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.date_naive())
            .ok()
            .or_else(|| NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok())
            .or_else(|| raw.get(..10).and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok()))
    }

    /// Short axis label, `M/D`. Falls back to the raw string.
    pub fn axis_label(&self) -> String {
        self.parsed_date()
            .map(|d| format!("{}/{}", d.month(), d.day()))
            .unwrap_or_else(|| self.date.clone())
    }

    /// Tooltip label, `YYYY-MM-DD`. Falls back to the raw string.
    pub fn full_label(&self) -> String {
        self.parsed_date()
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| self.date.clone())
    }
}

/// Payload of the ranking API's admin statistics endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    #[serde(default)]
    pub total_users: u64,
    #[serde(default)]
    pub total_schools: u64,
    #[serde(default)]
    pub total_questions: u64,
    #[serde(default)]
    pub today_progress: u64,
    #[serde(default)]
    pub school_stats: Vec<SchoolStats>,
    #[serde(default)]
    pub daily_progress: Vec<DailyProgress>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatCard {
    pub title: String,
    pub value: u64,
    pub icon: String,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchoolStatsRow {
    #[serde(flatten)]
    pub stats: SchoolStats,
    pub average_progress: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartPoint {
    pub date: String,
    pub axis_label: String,
    pub full_label: String,
    pub count: u64,
}

/// Admin dashboard as rendered: headline cards, per-school table, daily chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminDashboard {
    pub cards: Vec<StatCard>,
    pub schools: Vec<SchoolStatsRow>,
    pub daily: Vec<ChartPoint>,
}

impl From<DashboardStats> for AdminDashboard {
    fn from(stats: DashboardStats) -> Self {
        let card = |title: &str, value: u64, icon: &str, color: &str| StatCard {
            title: title.to_string(),
            value,
            icon: icon.to_string(),
            color: color.to_string(),
        };
        let cards = vec![
            card("전체 사용자", stats.total_users, "👥", "indigo"),
            card("등록 학교", stats.total_schools, "🏫", "green"),
            card("전체 문제", stats.total_questions, "📝", "blue"),
            card("오늘 풀이", stats.today_progress, "🎯", "purple"),
        ];
        let daily = stats
            .daily_progress
            .iter()
            .map(|point| ChartPoint {
                date: point.date.clone(),
                axis_label: point.axis_label(),
                full_label: point.full_label(),
                count: point.count,
            })
            .collect();
        let schools = stats
            .school_stats
            .into_iter()
            .map(|stats| SchoolStatsRow {
                average_progress: stats.average_progress(),
                stats,
            })
            .collect();
        Self {
            cards,
            schools,
            daily,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Body the ranking API's login endpoint expects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamLogin {
    pub username: String,
    pub password: String,
}

impl From<LoginRequest> for UpstreamLogin {
    fn from(request: LoginRequest) -> Self {
        Self {
            username: request.email,
            password: request.password,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
}

#[cfg(test)]
mod tests {
    use super::{AdminDashboard, DailyProgress, DashboardStats, SchoolStats};

    fn stats(user_count: u64, progress_count: u64) -> SchoolStats {
        SchoolStats {
            school_id: 1,
            school_name: "한빛초".to_string(),
            user_count,
            progress_count,
        }
    }

    #[test]
    fn average_is_rounded_to_one_decimal() {
        assert_eq!(stats(3, 10).average_progress(), 3.3);
        assert_eq!(stats(4, 10).average_progress(), 2.5);
        assert_eq!(stats(0, 10).average_progress(), 0.0);
    }

    #[test]
    fn chart_labels_accept_dates_and_timestamps() {
        let day = DailyProgress {
            date: "2026-03-05".to_string(),
            count: 4,
        };
        assert_eq!(day.axis_label(), "3/5");
        assert_eq!(day.full_label(), "2026-03-05");

        let stamped = DailyProgress {
            date: "2026-11-20T00:00:00.000Z".to_string(),
            count: 1,
        };
        assert_eq!(stamped.axis_label(), "11/20");

        let junk = DailyProgress {
            date: "yesterday".to_string(),
            count: 0,
        };
        assert_eq!(junk.axis_label(), "yesterday");
    }

    #[test]
    fn dashboard_builds_cards_rows_and_chart() {
        let stats: DashboardStats = serde_json::from_str(
            r#"{
                "totalUsers": 120, "totalSchools": 8, "totalQuestions": 450, "todayProgress": 37,
                "schoolStats": [{"schoolId": 2, "schoolName": "새솔중", "userCount": 6, "progressCount": 20}],
                "dailyProgress": [{"date": "2026-03-02", "count": 11}]
            }"#,
        )
        .expect("stats should parse");

        let dashboard = AdminDashboard::from(stats);
        let titles: Vec<&str> = dashboard.cards.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["전체 사용자", "등록 학교", "전체 문제", "오늘 풀이"]);
        assert_eq!(dashboard.cards[3].value, 37);
        assert_eq!(dashboard.schools[0].average_progress, 3.3);
        assert_eq!(dashboard.daily[0].axis_label, "3/2");

        let json = serde_json::to_value(&dashboard).expect("serialize dashboard");
        assert_eq!(json["schools"][0]["schoolName"], "새솔중");
        assert_eq!(json["schools"][0]["averageProgress"], 3.3);
    }
}
