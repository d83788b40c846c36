pub mod admin;
pub mod api;
pub mod rankings;
pub mod views;

use schoolwar_shared::SchoolLevel;
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub struct LevelParams {
    #[serde(default)]
    pub level: SchoolLevel,
}
