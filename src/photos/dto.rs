use serde::{Deserialize, Serialize};

use super::repo_types::PhotoRecord;
use crate::meal_type::MealType;

/// Views a client re-renders after a deletion.
#[derive(Debug, Serialize)]
pub struct PhotoViews {
    pub meal: MealType,
    pub removed: bool,
    pub today: Vec<PhotoRecord>,
    pub recent: Vec<PhotoRecord>,
}

#[derive(Debug, Deserialize)]
pub struct MealQuery {
    #[serde(default)]
    pub meal: MealType,
}

#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    pub window_days: Option<i64>,
    pub limit: Option<usize>,
}
