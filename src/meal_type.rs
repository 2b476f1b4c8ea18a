use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Meal tag shared by menu entries and photo records.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum MealType {
    #[default]
    #[serde(alias = "Lunch")]
    Lunch,
    #[serde(alias = "Dinner")]
    Dinner,
}

impl MealType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MealType::Lunch => "lunch",
            MealType::Dinner => "dinner",
        }
    }
}

impl fmt::Display for MealType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown meal type {0:?}, expected lunch or dinner")]
pub struct UnknownMealType(pub String);

impl FromStr for MealType {
    type Err = UnknownMealType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lunch" => Ok(MealType::Lunch),
            "dinner" => Ok(MealType::Dinner),
            _ => Err(UnknownMealType(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!(" Lunch ".parse::<MealType>().unwrap(), MealType::Lunch);
        assert_eq!("DINNER".parse::<MealType>().unwrap(), MealType::Dinner);
        assert!("breakfast".parse::<MealType>().is_err());
    }

    #[test]
    fn serializes_lowercase() {
        assert_eq!(serde_json::to_string(&MealType::Dinner).unwrap(), "\"dinner\"");
        let m: MealType = serde_json::from_str("\"Lunch\"").unwrap();
        assert_eq!(m, MealType::Lunch);
    }
}
