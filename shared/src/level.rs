use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// School level a ranking belongs to. Each level has its own school and
/// student path family on the ranking API.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum SchoolLevel {
    #[default]
    Elementary,
    Middle,
    High,
}

impl SchoolLevel {
    pub const ALL: [SchoolLevel; 3] = [Self::Elementary, Self::Middle, Self::High];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Elementary => "elementary",
            Self::Middle => "middle",
            Self::High => "high",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Elementary => "초등학교",
            Self::Middle => "중학교",
            Self::High => "고등학교",
        }
    }

    pub fn school_path(self) -> &'static str {
        match self {
            Self::Elementary => "schools",
            Self::Middle => "mid-schools",
            Self::High => "high-schools",
        }
    }

    pub fn student_path(self) -> &'static str {
        match self {
            Self::Elementary => "users",
            Self::Middle => "mid-users",
            Self::High => "high-users",
        }
    }

    /// Path family for one entity kind at this level.
    pub fn path_family(self, kind: EntityKind) -> &'static str {
        match kind {
            EntityKind::School => self.school_path(),
            EntityKind::Student => self.student_path(),
        }
    }
}

impl fmt::Display for SchoolLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant(pub String);

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown value: {}", self.0)
    }
}

impl std::error::Error for UnknownVariant {}

impl FromStr for SchoolLevel {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "elementary" => Ok(Self::Elementary),
            "middle" => Ok(Self::Middle),
            "high" => Ok(Self::High),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

/// Ranking breadth: everyone, one province, or one district.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RankingScope {
    #[default]
    National,
    Regional,
    Nearby,
}

impl RankingScope {
    pub const ALL: [RankingScope; 3] = [Self::National, Self::Regional, Self::Nearby];

    /// Path segment used by the ranking API.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::National => "national",
            Self::Regional => "regional",
            Self::Nearby => "nearby",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::National => "🌍 전국",
            Self::Regional => "📍 지역",
            Self::Nearby => "📌 근처",
        }
    }
}

impl fmt::Display for RankingScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RankingScope {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "national" => Ok(Self::National),
            "regional" => Ok(Self::Regional),
            "nearby" => Ok(Self::Nearby),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    School,
    Student,
}
