use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::level::EntityKind;
use crate::tier::TierSnapshot;

/// A school row from a school-ranking family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedSchool {
    pub id: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub rank: u32,
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub region1: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub region2: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub total_score: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub student_count: u32,
    #[serde(default = "default_multiplier", deserialize_with = "null_as_multiplier")]
    pub score_multiplier: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normalized_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<TierSnapshot>,
}

/// Treat an explicit JSON `null` the same as a missing field.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn default_multiplier() -> f64 {
    1.0
}

fn null_as_multiplier<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or_else(default_multiplier))
}

/// Non-owning reference to the school a student belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchoolRef {
    #[serde(default)]
    pub id: Option<i64>,
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub region1: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub region2: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedStudent {
    pub id: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub rank: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub nickname: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub total_score: f64,
    #[serde(default = "default_level", deserialize_with = "null_as_level")]
    pub level: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<TierSnapshot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub school: Option<SchoolRef>,
}

fn default_level() -> u32 {
    1
}

fn null_as_level<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    Ok(Option::<u32>::deserialize(deserializer)?.unwrap_or_else(default_level))
}

/// Common view over both ranked entity kinds.
pub trait Ranked {
    const KIND: EntityKind;

    fn id(&self) -> i64;
    fn rank(&self) -> u32;
    fn set_rank(&mut self, rank: u32);
    /// Score the local tier staircase is applied to.
    fn tier_score(&self) -> f64;
    fn tier_snapshot(&self) -> Option<&TierSnapshot>;
    /// Name matched by the search box.
    fn search_name(&self) -> &str;
}

impl RankedSchool {
    /// Score after multiplier and bonuses; the raw total when the server omits it.
    pub fn effective_score(&self) -> f64 {
        self.normalized_score.unwrap_or(self.total_score)
    }
}

impl Ranked for RankedSchool {
    const KIND: EntityKind = EntityKind::School;

    fn id(&self) -> i64 {
        self.id
    }

    fn rank(&self) -> u32 {
        self.rank
    }

    fn set_rank(&mut self, rank: u32) {
        self.rank = rank;
    }

    fn tier_score(&self) -> f64 {
        self.effective_score()
    }

    fn tier_snapshot(&self) -> Option<&TierSnapshot> {
        self.tier.as_ref()
    }

    fn search_name(&self) -> &str {
        &self.name
    }
}

impl Ranked for RankedStudent {
    const KIND: EntityKind = EntityKind::Student;

    fn id(&self) -> i64 {
        self.id
    }

    fn rank(&self) -> u32 {
        self.rank
    }

    fn set_rank(&mut self, rank: u32) {
        self.rank = rank;
    }

    fn tier_score(&self) -> f64 {
        self.total_score
    }

    fn tier_snapshot(&self) -> Option<&TierSnapshot> {
        self.tier.as_ref()
    }

    fn search_name(&self) -> &str {
        &self.nickname
    }
}

/// Decode either a bare JSON array or a `{"data": [...]}` envelope into the
/// items in the order the server sent them. `{"data": null}` means no rows.
///
/// Rows are decoded one at a time so a failure names the row and field.
pub fn decode_listing<T: DeserializeOwned>(bytes: &[u8]) -> Result<Vec<T>, serde_json::Error> {
    let rows = match serde_json::from_slice::<Value>(bytes)? {
        Value::Array(rows) => rows,
        Value::Object(mut body) => match body.remove("data") {
            Some(Value::Array(rows)) => rows,
            Some(Value::Null) => return Ok(Vec::new()),
            Some(other) => {
                return Err(serde_json::Error::custom(format!(
                    "expected `data` to be an array, found {}",
                    json_kind(&other)
                )));
            }
            None => return Err(serde_json::Error::missing_field("data")),
        },
        other => {
            return Err(serde_json::Error::custom(format!(
                "expected an array or a `data` envelope, found {}",
                json_kind(&other)
            )));
        }
    };

    rows.into_iter()
        .enumerate()
        .map(|(idx, row)| {
            serde_json::from_value(row)
                .map_err(|e| serde_json::Error::custom(format!("row {idx}: {e}")))
        })
        .collect()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Fill in ranks the server left out, using 1-based position. Order is kept.
pub fn assign_missing_ranks<T: Ranked>(items: &mut [T]) {
    for (idx, item) in items.iter_mut().enumerate() {
        if item.rank() == 0 {
            item.set_rank(u32::try_from(idx + 1).unwrap_or(u32::MAX));
        }
    }
}
