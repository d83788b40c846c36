use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::ranking::null_as_default;

/// One row of the full, unpaginated school listing for a level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchoolRecord {
    pub id: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default)]
    pub region1: Option<String>,
    #[serde(default)]
    pub region2: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub total_score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normalized_score: Option<f64>,
}

impl SchoolRecord {
    pub fn region1(&self) -> Option<&str> {
        non_empty(self.region1.as_deref())
    }

    pub fn region2(&self) -> Option<&str> {
        non_empty(self.region2.as_deref())
    }

    /// Same score basis as ranked school rows: normalized when the listing
    /// carries it, the raw total otherwise.
    pub fn effective_score(&self) -> f64 {
        self.normalized_score.unwrap_or(self.total_score)
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Province labels and the district labels found under each province.
///
/// Both lists keep first-seen order so selectors render deterministically.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegionCatalog {
    region1: Vec<String>,
    region2: HashMap<String, Vec<String>>,
}

impl RegionCatalog {
    pub fn build(schools: &[SchoolRecord]) -> Self {
        let mut region1 = Vec::new();
        let mut seen_region1 = HashSet::new();
        let mut region2: HashMap<String, Vec<String>> = HashMap::new();
        let mut seen_pairs = HashSet::new();

        for school in schools {
            let Some(province) = school.region1() else {
                continue;
            };
            if seen_region1.insert(province) {
                region1.push(province.to_string());
            }
            if let Some(district) = school.region2()
                && seen_pairs.insert((province, district))
            {
                region2
                    .entry(province.to_string())
                    .or_default()
                    .push(district.to_string());
            }
        }

        Self { region1, region2 }
    }

    pub fn region1_options(&self) -> &[String] {
        &self.region1
    }

    /// Districts under `region1`; empty when the province is unknown.
    pub fn region2_options(&self, region1: &str) -> &[String] {
        self.region2.get(region1).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains_region1(&self, region1: &str) -> bool {
        self.region1.iter().any(|r| r == region1)
    }

    pub fn is_empty(&self) -> bool {
        self.region1.is_empty()
    }

    /// Order-sensitive checksum of provinces and their districts. Equal
    /// catalogs give equal fingerprints in every process.
    pub fn fingerprint(&self) -> u32 {
        let mut hasher = crc32fast::Hasher::new();
        for province in &self.region1 {
            hasher.update(province.as_bytes());
            hasher.update(&[0]);
            for district in self.region2_options(province) {
                hasher.update(district.as_bytes());
                hasher.update(&[0]);
            }
            hasher.update(&[1]);
        }
        hasher.finalize()
    }
}

/// Distinct non-empty districts of the schools whose province is exactly
/// `region1`.
pub fn region2_options(region1: &str, schools: &[SchoolRecord]) -> Vec<String> {
    let mut seen = HashSet::new();
    schools
        .iter()
        .filter(|school| school.region1.as_deref() == Some(region1))
        .filter_map(SchoolRecord::region2)
        .filter(|district| seen.insert(*district))
        .map(str::to_string)
        .collect()
}
