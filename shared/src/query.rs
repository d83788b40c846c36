use serde::{Deserialize, Serialize};

use crate::level::{RankingScope, SchoolLevel};
use crate::region::RegionCatalog;

pub const MAX_RANKING_LIMIT: u32 = 1000;

/// The single reactive query object behind every ranking view. Any change to
/// it triggers exactly one refetch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingQuery {
    #[serde(default)]
    pub level: SchoolLevel,
    #[serde(default)]
    pub scope: RankingScope,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region2: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_limit() -> u32 {
    MAX_RANKING_LIMIT
}

impl RankingQuery {
    pub fn national(level: SchoolLevel, limit: u32) -> Self {
        Self {
            level,
            scope: RankingScope::National,
            region1: None,
            region2: None,
            limit,
        }
    }

    /// Limit clamped into `1..=MAX_RANKING_LIMIT`.
    pub fn effective_limit(&self) -> u32 {
        self.limit.clamp(1, MAX_RANKING_LIMIT)
    }

    /// Query-string pairs for the ranking API. `region1` is attached only for
    /// the regional scope and `region2` only for nearby; a missing or blank
    /// qualifier is left out entirely.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![("limit", self.effective_limit().to_string())];
        let qualifier = match self.scope {
            RankingScope::National => None,
            RankingScope::Regional => non_blank(&self.region1).map(|r| ("region1", r)),
            RankingScope::Nearby => non_blank(&self.region2).map(|r| ("region2", r)),
        };
        if let Some((key, value)) = qualifier {
            pairs.push((key, value.to_string()));
        }
        pairs
    }

    /// Section heading, e.g. `📍 서울 순위`.
    pub fn heading(&self) -> String {
        match self.scope {
            RankingScope::National => "🌍 전국 순위".to_string(),
            RankingScope::Regional => {
                format!("📍 {} 순위", non_blank(&self.region1).unwrap_or("지역"))
            }
            RankingScope::Nearby => {
                format!("📌 {} 순위", non_blank(&self.region2).unwrap_or("근처"))
            }
        }
    }

    /// Change the province and cascade: the district resets to the first
    /// district of the new province, or to none.
    pub fn select_region1(&mut self, catalog: &RegionCatalog, region1: Option<String>) {
        let region1 = region1.filter(|r| !r.trim().is_empty());
        self.region2 = region1
            .as_deref()
            .and_then(|r| catalog.region2_options(r).first().cloned());
        self.region1 = region1;
    }

    /// Fill in selections the way the region pickers would: the first
    /// province when none (or an unknown one) is chosen, then a district that
    /// belongs to it.
    pub fn apply_catalog_defaults(&mut self, catalog: &RegionCatalog) {
        let region1_valid = self
            .region1
            .as_deref()
            .is_some_and(|r| catalog.contains_region1(r));
        if !region1_valid {
            let first = catalog.region1_options().first().cloned();
            self.select_region1(catalog, first);
            return;
        }

        let districts = self
            .region1
            .as_deref()
            .map(|r| catalog.region2_options(r))
            .unwrap_or(&[]);
        let region2_valid = self
            .region2
            .as_deref()
            .is_some_and(|d| districts.iter().any(|candidate| candidate == d));
        if !region2_valid {
            self.region2 = districts.first().cloned();
        }
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::{MAX_RANKING_LIMIT, RankingQuery};
    use crate::level::{RankingScope, SchoolLevel};
    use crate::region::{RegionCatalog, SchoolRecord};

    fn catalog() -> RegionCatalog {
        let rows = [
            ("서울", "강남구"),
            ("서울", "종로구"),
            ("부산", "해운대구"),
            ("부산", "수영구"),
        ];
        let schools: Vec<SchoolRecord> = rows
            .iter()
            .enumerate()
            .map(|(idx, (r1, r2))| SchoolRecord {
                id: idx as i64,
                name: String::new(),
                region1: Some(r1.to_string()),
                region2: Some(r2.to_string()),
                latitude: None,
                longitude: None,
                total_score: 0.0,
                normalized_score: None,
            })
            .collect();
        RegionCatalog::build(&schools)
    }

    fn query(scope: RankingScope, region1: Option<&str>, region2: Option<&str>) -> RankingQuery {
        RankingQuery {
            level: SchoolLevel::Middle,
            scope,
            region1: region1.map(str::to_string),
            region2: region2.map(str::to_string),
            limit: 50,
        }
    }

    #[test]
    fn national_scope_carries_no_region() {
        let pairs = query(RankingScope::National, Some("서울"), Some("강남구")).query_pairs();
        assert_eq!(pairs, vec![("limit", "50".to_string())]);
    }

    #[test]
    fn regional_scope_carries_only_region1() {
        let pairs = query(RankingScope::Regional, Some("서울"), Some("강남구")).query_pairs();
        assert_eq!(
            pairs,
            vec![("limit", "50".to_string()), ("region1", "서울".to_string())]
        );
    }

    #[test]
    fn nearby_scope_carries_only_region2() {
        let pairs = query(RankingScope::Nearby, Some("서울"), Some("강남구")).query_pairs();
        assert_eq!(
            pairs,
            vec![("limit", "50".to_string()), ("region2", "강남구".to_string())]
        );
    }

    #[test]
    fn nearby_without_district_omits_region2() {
        for region2 in [None, Some(""), Some("   ")] {
            let pairs = query(RankingScope::Nearby, Some("서울"), region2).query_pairs();
            assert!(pairs.iter().all(|(key, _)| *key != "region2"));
            assert!(pairs.iter().all(|(key, _)| *key != "region1"));
        }
    }

    #[test]
    fn limit_is_clamped() {
        let mut q = query(RankingScope::National, None, None);
        q.limit = 0;
        assert_eq!(q.effective_limit(), 1);
        q.limit = 50_000;
        assert_eq!(q.effective_limit(), MAX_RANKING_LIMIT);
    }

    #[test]
    fn changing_province_resets_district() {
        let catalog = catalog();
        let mut q = query(RankingScope::Nearby, Some("서울"), Some("종로구"));

        q.select_region1(&catalog, Some("부산".to_string()));
        assert_eq!(q.region1.as_deref(), Some("부산"));
        assert_eq!(q.region2.as_deref(), Some("해운대구"));

        q.select_region1(&catalog, Some("제주".to_string()));
        assert_eq!(q.region1.as_deref(), Some("제주"));
        assert_eq!(q.region2, None);

        q.select_region1(&catalog, None);
        assert_eq!(q.region1, None);
        assert_eq!(q.region2, None);
    }

    #[test]
    fn catalog_defaults_pick_first_options_and_fix_mismatches() {
        let catalog = catalog();

        let mut empty = query(RankingScope::Nearby, None, None);
        empty.apply_catalog_defaults(&catalog);
        assert_eq!(empty.region1.as_deref(), Some("서울"));
        assert_eq!(empty.region2.as_deref(), Some("강남구"));

        let mut mismatched = query(RankingScope::Nearby, Some("부산"), Some("강남구"));
        mismatched.apply_catalog_defaults(&catalog);
        assert_eq!(mismatched.region1.as_deref(), Some("부산"));
        assert_eq!(mismatched.region2.as_deref(), Some("해운대구"));

        let mut kept = query(RankingScope::Nearby, Some("부산"), Some("수영구"));
        kept.apply_catalog_defaults(&catalog);
        assert_eq!(kept.region2.as_deref(), Some("수영구"));
    }

    #[test]
    fn catalog_defaults_on_empty_catalog_select_nothing() {
        let mut q = query(RankingScope::Regional, Some("서울"), Some("강남구"));
        q.apply_catalog_defaults(&RegionCatalog::default());
        assert_eq!(q.region1, None);
        assert_eq!(q.region2, None);
        assert_eq!(q.query_pairs(), vec![("limit", "50".to_string())]);
    }

    #[test]
    fn heading_names_the_selected_region() {
        assert_eq!(query(RankingScope::National, None, None).heading(), "🌍 전국 순위");
        assert_eq!(
            query(RankingScope::Regional, Some("부산"), None).heading(),
            "📍 부산 순위"
        );
        assert_eq!(
            query(RankingScope::Nearby, Some("부산"), Some("수영구")).heading(),
            "📌 수영구 순위"
        );
    }

    #[test]
    fn deserializes_with_defaults() {
        let q: RankingQuery = serde_json::from_str(r#"{"scope": "nearby"}"#).expect("parse");
        assert_eq!(q.level, SchoolLevel::Elementary);
        assert_eq!(q.scope, RankingScope::Nearby);
        assert_eq!(q.limit, MAX_RANKING_LIMIT);
    }
}
