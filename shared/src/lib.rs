pub mod admin;
pub mod display;
pub mod launch;
pub mod level;
pub mod map;
pub mod query;
pub mod ranking;
pub mod region;
pub mod tier;

pub use display::{RankBadge, RankingPage, RankingRow};
pub use level::{EntityKind, RankingScope, SchoolLevel};
pub use query::RankingQuery;
pub use ranking::*;
pub use region::{RegionCatalog, SchoolRecord};
pub use tier::{DisplayTier, TierProgress, TierSnapshot, TierSource, resolve_tier};
