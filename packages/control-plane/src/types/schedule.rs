//! Persisted schedules: a cron spec plus the callback to fire for a vendor.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

/// Row of the `schedule` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct Schedule {
    pub id: i64,
    pub vendor_type: String,
    pub vendor_id: i64,
    /// `Hourly`, `Daily`, `Weekly`, `Custom` or `None`.
    pub cron_type: String,
    /// Six-field cron spec, seconds first.
    pub cron: String,
    pub callback_func_name: String,
    /// JSON text handed to the callback.
    pub callback_func_param: String,
    pub extra_attrs: String,
    pub creation_time: DateTime<Utc>,
    pub update_time: DateTime<Utc>,
}

#[derive(Debug, Clone, TypedBuilder)]
#[builder(field_defaults(setter(into)))]
pub struct CreateSchedule {
    pub vendor_type: String,
    #[builder(default)]
    pub vendor_id: i64,
    #[builder(default = "Custom".to_string())]
    pub cron_type: String,
    pub cron: String,
    pub callback_func_name: String,
    #[builder(default = serde_json::Value::Null)]
    pub callback_func_param: serde_json::Value,
    #[builder(default = serde_json::Value::Object(Default::default()))]
    pub extra_attrs: serde_json::Value,
}

/// Filter for listing schedules. Unset fields match everything.
#[derive(Debug, Clone, Default)]
pub struct ScheduleQuery {
    pub vendor_type: Option<String>,
    pub vendor_id: Option<i64>,
}

impl ScheduleQuery {
    pub fn matches(&self, schedule: &Schedule) -> bool {
        self.vendor_type
            .as_deref()
            .map_or(true, |v| v == schedule.vendor_type)
            && self.vendor_id.map_or(true, |id| id == schedule.vendor_id)
    }
}
