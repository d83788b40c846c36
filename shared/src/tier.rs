use serde::{Deserialize, Serialize};

use crate::level::EntityKind;
use crate::ranking::null_as_default;

/// Tier state as computed by the ranking server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TierSnapshot {
    pub current: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub current_korean: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub color: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub icon: String,
    #[serde(default)]
    pub next_tier: Option<String>,
    #[serde(default)]
    pub next_tier_korean: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub progress: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub remaining_score: f64,
}

/// One rung of a local fallback staircase.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TierStep {
    /// 1-based position within its table; higher is better.
    pub level: u8,
    pub code: &'static str,
    pub label: &'static str,
    pub icon: &'static str,
    pub color: &'static str,
    pub min_score: f64,
}

const NEUTRAL_COLOR: &str = "#1F2937";

/// Canonical school staircase, ascending. Applied to the normalized score.
pub const SCHOOL_TIERS: &[TierStep] = &[
    TierStep {
        level: 1,
        code: "BRONZE",
        label: "브론즈",
        icon: "🥉",
        color: "#B45309",
        min_score: 0.0,
    },
    TierStep {
        level: 2,
        code: "SILVER",
        label: "실버",
        icon: "🥈",
        color: "#6B7280",
        min_score: 5_000.0,
    },
    TierStep {
        level: 3,
        code: "GOLD",
        label: "골드",
        icon: "🥇",
        color: "#CA8A04",
        min_score: 20_000.0,
    },
    TierStep {
        level: 4,
        code: "PLATINUM",
        label: "플래티넘",
        icon: "🔷",
        color: "#4B5563",
        min_score: 50_000.0,
    },
    TierStep {
        level: 5,
        code: "DIAMOND",
        label: "다이아몬드",
        icon: "💎",
        color: "#0891B2",
        min_score: 100_000.0,
    },
    TierStep {
        level: 6,
        code: "MASTER",
        label: "마스터",
        icon: "👑",
        color: NEUTRAL_COLOR,
        min_score: 500_000.0,
    },
];

pub const STUDENT_TIERS: &[TierStep] = &[
    TierStep {
        level: 1,
        code: "CHICK",
        label: "병아리",
        icon: "🐣",
        color: NEUTRAL_COLOR,
        min_score: 0.0,
    },
    TierStep {
        level: 2,
        code: "RABBIT",
        label: "토끼",
        icon: "🐰",
        color: NEUTRAL_COLOR,
        min_score: 500.0,
    },
    TierStep {
        level: 3,
        code: "FOX",
        label: "여우",
        icon: "🦊",
        color: NEUTRAL_COLOR,
        min_score: 2_000.0,
    },
    TierStep {
        level: 4,
        code: "WOLF",
        label: "늑대",
        icon: "🐺",
        color: NEUTRAL_COLOR,
        min_score: 5_000.0,
    },
    TierStep {
        level: 5,
        code: "LION",
        label: "사자",
        icon: "🦁",
        color: NEUTRAL_COLOR,
        min_score: 15_000.0,
    },
    TierStep {
        level: 6,
        code: "DRAGON",
        label: "용",
        icon: "🐉",
        color: NEUTRAL_COLOR,
        min_score: 50_000.0,
    },
];

pub fn tier_table(kind: EntityKind) -> &'static [TierStep] {
    match kind {
        EntityKind::School => SCHOOL_TIERS,
        EntityKind::Student => STUDENT_TIERS,
    }
}

/// Local staircase lookup, highest threshold first. Scores below zero or NaN
/// land on the lowest rung.
pub fn fallback_tier(score: f64, kind: EntityKind) -> &'static TierStep {
    let table = tier_table(kind);
    table
        .iter()
        .rev()
        .find(|step| score >= step.min_score)
        .unwrap_or(&table[0])
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TierSource {
    Server,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TierProgress {
    pub next_code: String,
    pub next_label: String,
    /// Percentage toward the next tier, exactly as the server reported it.
    pub percent: f64,
    pub remaining_score: f64,
}

/// Everything needed to draw a tier badge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayTier {
    pub code: String,
    pub label: String,
    pub icon: String,
    pub color: String,
    pub source: TierSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<TierProgress>,
}

impl From<&TierStep> for DisplayTier {
    fn from(step: &TierStep) -> Self {
        Self {
            code: step.code.to_string(),
            label: step.label.to_string(),
            icon: step.icon.to_string(),
            color: step.color.to_string(),
            source: TierSource::Fallback,
            progress: None,
        }
    }
}

/// Resolve the tier to display for one ranked entity.
///
/// A server snapshot wins; individual fields it leaves blank are filled from
/// the local staircase. Progress is only exposed when the server names a
/// next tier.
pub fn resolve_tier(score: f64, kind: EntityKind, server: Option<&TierSnapshot>) -> DisplayTier {
    let local = fallback_tier(score, kind);
    let Some(server) = server else {
        return DisplayTier::from(local);
    };

    let progress = server.next_tier.as_ref().map(|next_code| TierProgress {
        next_code: next_code.clone(),
        next_label: server
            .next_tier_korean
            .clone()
            .unwrap_or_else(|| next_code.clone()),
        percent: server.progress,
        remaining_score: server.remaining_score,
    });

    DisplayTier {
        code: non_blank_or(&server.current, local.code),
        label: non_blank_or(&server.current_korean, local.label),
        icon: non_blank_or(&server.icon, local.icon),
        color: non_blank_or(&server.color, local.color),
        source: TierSource::Server,
        progress,
    }
}

fn non_blank_or(value: &str, fallback: &str) -> String {
    if value.trim().is_empty() {
        fallback.to_string()
    } else {
        value.to_string()
    }
}
