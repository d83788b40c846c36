use serde::{Deserialize, Serialize};

use crate::ranking::Ranked;
use crate::tier::{DisplayTier, resolve_tier};

/// Medal for the podium, `"{rank}위"` for everyone else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankBadge {
    pub label: String,
    pub podium: bool,
}

impl RankBadge {
    pub fn for_rank(rank: u32) -> Self {
        let label = match rank {
            1 => "🥇".to_string(),
            2 => "🥈".to_string(),
            3 => "🥉".to_string(),
            n => format!("{n}위"),
        };
        Self {
            label,
            podium: (1..=3).contains(&rank),
        }
    }
}

/// A ranked entity together with what the list renders beside it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingRow<T> {
    #[serde(flatten)]
    pub entity: T,
    pub badge: RankBadge,
    pub display_tier: DisplayTier,
}

impl<T: Ranked> RankingRow<T> {
    pub fn present(entity: T) -> Self {
        let display_tier = resolve_tier(entity.tier_score(), T::KIND, entity.tier_snapshot());
        let badge = RankBadge::for_rank(entity.rank());
        Self {
            entity,
            badge,
            display_tier,
        }
    }
}

/// Rows after the optional name search, with the pre-search total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingPage<T> {
    pub total: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    pub rows: Vec<RankingRow<T>>,
}

impl<T: Ranked> RankingPage<T> {
    pub fn present(entities: Vec<T>, search: Option<&str>) -> Self {
        let total = entities.len();
        let search = search
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        let rows = filter_by_name(entities, search.as_deref().unwrap_or(""))
            .into_iter()
            .map(RankingRow::present)
            .collect();
        Self {
            total,
            search,
            rows,
        }
    }

    pub fn empty() -> Self {
        Self {
            total: 0,
            search: None,
            rows: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Case-insensitive substring match on the entity's display name. An empty
/// needle keeps everything.
pub fn filter_by_name<T: Ranked>(entities: Vec<T>, needle: &str) -> Vec<T> {
    let needle = needle.trim().to_lowercase();
    if needle.is_empty() {
        return entities;
    }
    entities
        .into_iter()
        .filter(|entity| entity.search_name().to_lowercase().contains(&needle))
        .collect()
}
