use serde::{Deserialize, Serialize};

use crate::meal_type::MealType;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum MenuSelection {
    /// Day or meal not chosen yet.
    Prompt,
    /// Nothing on the menu for that day/meal.
    Empty { date: String, meal: MealType },
    Items {
        date: String,
        meal: MealType,
        items: Vec<String>,
    },
}

/// Blank values mean "not selected", as the pickers send them.
#[derive(Debug, Default, Deserialize)]
pub struct MenuQuery {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub meal: Option<String>,
}

impl MenuQuery {
    pub fn date(&self) -> Option<&str> {
        self.date.as_deref().map(str::trim).filter(|d| !d.is_empty())
    }

    pub fn meal(&self) -> Result<Option<MealType>, crate::meal_type::UnknownMealType> {
        match self.meal.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => raw.parse().map(Some),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MenuDays {
    pub days: Vec<String>,
}
