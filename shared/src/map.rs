use serde::{Deserialize, Serialize};

use crate::level::EntityKind;
use crate::region::SchoolRecord;
use crate::tier::fallback_tier;

pub const MAP_WIDTH: f64 = 400.0;
pub const MAP_HEIGHT: f64 = 500.0;

const MIN_LAT: f64 = 33.0;
const MAX_LAT: f64 = 38.6;
const MIN_LNG: f64 = 124.5;
const MAX_LNG: f64 = 131.9;

/// Position on the Korea map box, in map units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapPoint {
    pub x: f64,
    pub y: f64,
}

/// Equirectangular projection of a coordinate onto the map box. North is up.
pub fn project(latitude: f64, longitude: f64) -> MapPoint {
    let x = (longitude - MIN_LNG) / (MAX_LNG - MIN_LNG) * MAP_WIDTH;
    let y = MAP_HEIGHT - (latitude - MIN_LAT) / (MAX_LAT - MIN_LAT) * MAP_HEIGHT;
    MapPoint { x, y }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapMarker {
    pub school_id: i64,
    pub name: String,
    /// Horizontal position as a percentage of the map width.
    pub left_percent: f64,
    /// Vertical position as a percentage of the map height.
    pub top_percent: f64,
    pub icon: String,
}

/// Markers for every school with coordinates. Schools without them are
/// skipped.
pub fn markers(schools: &[SchoolRecord]) -> Vec<MapMarker> {
    schools
        .iter()
        .filter_map(|school| {
            let (lat, lng) = (school.latitude?, school.longitude?);
            if !lat.is_finite() || !lng.is_finite() {
                return None;
            }
            let point = project(lat, lng);
            Some(MapMarker {
                school_id: school.id,
                name: school.name.clone(),
                left_percent: point.x / MAP_WIDTH * 100.0,
                top_percent: point.y / MAP_HEIGHT * 100.0,
                icon: fallback_tier(school.effective_score(), EntityKind::School)
                    .icon
                    .to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{MAP_HEIGHT, MAP_WIDTH, markers, project};
    use crate::region::SchoolRecord;

    fn assert_close(actual: f64, expected: f64) {
        let diff = (actual - expected).abs();
        assert!(
            diff < 1e-9,
            "expected {expected}, got {actual} (diff: {diff})"
        );
    }

    #[test]
    fn corners_of_the_bounding_box_map_to_corners_of_the_map() {
        let south_west = project(33.0, 124.5);
        assert_close(south_west.x, 0.0);
        assert_close(south_west.y, MAP_HEIGHT);

        let north_east = project(38.6, 131.9);
        assert_close(north_east.x, MAP_WIDTH);
        assert_close(north_east.y, 0.0);
    }

    #[test]
    fn markers_skip_schools_without_coordinates() {
        let schools = vec![
            SchoolRecord {
                id: 1,
                name: "서울초".to_string(),
                region1: Some("서울".to_string()),
                region2: None,
                latitude: Some(35.8),
                longitude: Some(128.2),
                total_score: 60_000.0,
                normalized_score: None,
            },
            SchoolRecord {
                id: 2,
                name: "미정초".to_string(),
                region1: None,
                region2: None,
                latitude: None,
                longitude: Some(127.0),
                total_score: 0.0,
                normalized_score: None,
            },
        ];
        let markers = markers(&schools);
        assert_eq!(markers.len(), 1);
        assert_close(markers[0].left_percent, 50.0);
        assert_close(markers[0].top_percent, 50.0);
        assert_eq!(markers[0].icon, "🔷");
    }

    #[test]
    fn marker_icons_use_the_normalized_score_when_present() {
        let school = SchoolRecord {
            id: 3,
            name: "바다초".to_string(),
            region1: Some("부산".to_string()),
            region2: None,
            latitude: Some(35.1),
            longitude: Some(129.0),
            total_score: 1_000.0,
            normalized_score: Some(120_000.0),
        };
        let raw_only = SchoolRecord {
            normalized_score: None,
            ..school.clone()
        };

        assert_eq!(markers(&[school])[0].icon, "💎");
        assert_eq!(markers(&[raw_only])[0].icon, "🥉");
    }
}
