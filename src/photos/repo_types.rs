use serde::{Deserialize, Serialize};
use time::Date;

use crate::meal_type::MealType;

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

/// One logged meal photograph as persisted in the photo slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoRecord {
    /// Empty on records written before ids existed; `normalize` fills it.
    #[serde(default)]
    pub id: String,
    pub url: String,
    pub meal: MealType,
    #[serde(with = "iso_date")]
    pub date: Date,
    pub timestamp: i64, // unix millis
}
