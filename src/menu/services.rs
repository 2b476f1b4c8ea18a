use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::async_trait;
use serde::Deserialize;
use time::macros::format_description;
use time::{Date, Weekday};
use tokio::sync::OnceCell;
use tracing::{debug, error, instrument};

use super::dto::MenuSelection;
use crate::clock::Clock;
use crate::meal_type::MealType;

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Today and the days before it, oldest first.
    Backward,
    /// Today and the days after it.
    Forward,
}

impl FromStr for Direction {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "backward" | "past" => Ok(Direction::Backward),
            "forward" | "future" => Ok(Direction::Forward),
            other => anyhow::bail!("unknown menu direction {:?}", other),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct WindowPolicy {
    pub days: usize,
    pub direction: Direction,
    pub skip_weekends: bool,
}

impl Default for WindowPolicy {
    fn default() -> Self {
        Self {
            days: 7,
            direction: Direction::Backward,
            skip_weekends: true,
        }
    }
}

fn is_weekend(day: Date) -> bool {
    matches!(day.weekday(), Weekday::Saturday | Weekday::Sunday)
}

/// "December 10, 2024", the key format the menu sheet uses.
pub fn day_label(day: Date) -> String {
    day.format(format_description!(
        "[month repr:long] [day padding:none], [year]"
    ))
    .unwrap_or_else(|_| day.to_string())
}

/// Calendar days anchored on `today`, in ascending order.
pub fn window_dates(today: Date, policy: &WindowPolicy) -> Vec<Date> {
    let mut days = Vec::with_capacity(policy.days);
    let mut cursor = Some(today);
    while days.len() < policy.days {
        let Some(day) = cursor else { break };
        if !(policy.skip_weekends && is_weekend(day)) {
            days.push(day);
        }
        cursor = match policy.direction {
            Direction::Backward => day.previous_day(),
            Direction::Forward => day.next_day(),
        };
    }
    if policy.direction == Direction::Backward {
        days.reverse();
    }
    days
}

pub fn weekday_window(today: Date, policy: &WindowPolicy) -> Vec<String> {
    window_dates(today, policy).into_iter().map(day_label).collect()
}

pub type MenuItems = HashMap<String, HashMap<String, Vec<String>>>;

#[derive(Deserialize)]
#[serde(untagged)]
enum RawMenu {
    Wrapped {
        #[serde(rename = "menuItems")]
        menu_items: MenuItems,
    },
    Bare(MenuItems),
}

/// Remote menu keyed by day label, then meal tag.
#[derive(Debug, Clone, Default)]
pub struct MenuDocument {
    items: MenuItems,
}

impl MenuDocument {
    pub fn from_json(raw: &str) -> anyhow::Result<Self> {
        let parsed: RawMenu = serde_json::from_str(raw).context("parse menu document")?;
        let items = match parsed {
            RawMenu::Wrapped { menu_items } => menu_items,
            RawMenu::Bare(items) => items,
        };
        Ok(Self { items })
    }

    pub fn items(&self, day: &str, meal: MealType) -> Option<&[String]> {
        self.items
            .get(day)
            .and_then(|meals| meals.get(meal.as_str()))
            .map(Vec::as_slice)
    }

    pub fn day_count(&self) -> usize {
        self.items.len()
    }
}

#[async_trait]
pub trait MenuSource: Send + Sync {
    async fn fetch(&self) -> anyhow::Result<MenuDocument>;
}

#[derive(Clone)]
pub struct HttpMenuSource {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpMenuSource {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("build menu client")?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl MenuSource for HttpMenuSource {
    #[instrument(skip(self), fields(endpoint = %self.endpoint))]
    async fn fetch(&self) -> anyhow::Result<MenuDocument> {
        let raw = self
            .client
            .get(&self.endpoint)
            .send()
            .await
            .context("menu request")?
            .error_for_status()
            .context("menu endpoint rejected request")?
            .text()
            .await
            .context("menu response body")?;
        MenuDocument::from_json(&raw)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MenuError {
    #[error("menu unavailable: {0:#}")]
    Fetch(#[source] anyhow::Error),
}

/// Day picker plus a menu document fetched once per process.
#[derive(Clone)]
pub struct MenuViewer {
    source: Arc<dyn MenuSource>,
    cache: Arc<OnceCell<MenuDocument>>,
    policy: WindowPolicy,
    clock: Arc<dyn Clock>,
}

impl MenuViewer {
    pub fn new(source: Arc<dyn MenuSource>, policy: WindowPolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            source,
            cache: Arc::new(OnceCell::new()),
            policy,
            clock,
        }
    }

    pub fn days(&self) -> Vec<String> {
        weekday_window(self.clock.today(), &self.policy)
    }

    /// A failed fetch is not cached; the next call retries.
    pub async fn document(&self) -> Result<&MenuDocument, MenuError> {
        self.cache
            .get_or_try_init(|| async {
                let doc = self.source.fetch().await.map_err(|e| {
                    error!(error = %e, "error fetching menu data");
                    MenuError::Fetch(e)
                })?;
                debug!(days = doc.day_count(), "menu document cached");
                Ok::<_, MenuError>(doc)
            })
            .await
    }

    pub async fn select(
        &self,
        day: Option<&str>,
        meal: Option<MealType>,
    ) -> Result<MenuSelection, MenuError> {
        let (Some(day), Some(meal)) = (day, meal) else {
            return Ok(MenuSelection::Prompt);
        };
        let doc = self.document().await?;
        Ok(match doc.items(day, meal) {
            Some(items) if !items.is_empty() => MenuSelection::Items {
                date: day.to_string(),
                meal,
                items: items.to_vec(),
            },
            _ => MenuSelection::Empty {
                date: day.to_string(),
                meal,
            },
        })
    }
}


#[cfg(test)]
mod menu_http_tests {
    use axum::{http::StatusCode, routing::get, Router};

    use super::*;
    use crate::app::spawn_local;

    async fn source_for(app: Router) -> HttpMenuSource {
        let addr = spawn_local(app).await;
        HttpMenuSource::new(format!("http://{}/exec", addr), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn fetch_reads_wrapped_document() {
        let app = Router::new().route(
            "/exec",
            get(|| async { r#"{"menuItems":{"December 10, 2024":{"dinner":["Stew","Bread"]}}}"# }),
        );
        let doc = source_for(app).await.fetch().await.unwrap();

        assert_eq!(doc.day_count(), 1);
        assert_eq!(
            doc.items("December 10, 2024", MealType::Dinner),
            Some(&["Stew".to_string(), "Bread".to_string()][..])
        );
    }

    #[tokio::test]
    async fn server_error_is_a_fetch_error() {
        let app = Router::new().route(
            "/exec",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "script failed") }),
        );
        assert!(source_for(app).await.fetch().await.is_err());
    }

    #[tokio::test]
    async fn non_json_body_is_a_fetch_error() {
        let app = Router::new().route("/exec", get(|| async { "<html>sign in</html>" }));
        assert!(source_for(app).await.fetch().await.is_err());
    }
}
