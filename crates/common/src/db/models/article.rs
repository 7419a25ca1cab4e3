//! Article entity
//!
//! The single content record of the site. Serialized with camelCase keys,
//! which is the shape the public and admin surfaces consume.

use chrono::{DateTime, FixedOffset, SubsecRound, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "articles")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub title: String,

    #[sea_orm(column_type = "Text")]
    pub summary: String,

    #[sea_orm(column_type = "Text")]
    pub content: String,

    /// Human-readable catalog label, e.g. "Rockefeller"
    #[sea_orm(indexed)]
    pub category: String,

    /// Machine key of the same catalog entry
    #[sea_orm(indexed)]
    pub theme_id: String,

    pub read_time: String,

    /// Publication date, sort key for listings (newest first)
    #[sea_orm(indexed)]
    pub date: DateTimeWithTimeZone,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,

    /// Incremented on every update, starts at 1
    pub version: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Current time at the precision every store can round-trip (microseconds)
pub fn now() -> DateTimeWithTimeZone {
    truncate(Utc::now().fixed_offset())
}

/// Normalize a timestamp to UTC at microsecond precision
pub fn truncate(ts: DateTime<FixedOffset>) -> DateTimeWithTimeZone {
    ts.with_timezone(&Utc).fixed_offset().trunc_subsecs(6)
}
