use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{instrument, warn};

use super::dto::{MenuDays, MenuQuery, MenuSelection};
use crate::state::AppState;

pub fn menu_routes() -> Router<AppState> {
    Router::new()
        .route("/menu", get(get_menu))
        .route("/menu/days", get(list_days))
}

#[instrument(skip(state))]
pub async fn list_days(State(state): State<AppState>) -> Json<MenuDays> {
    Json(MenuDays {
        days: state.menu.days(),
    })
}

#[instrument(skip(state))]
pub async fn get_menu(
    State(state): State<AppState>,
    Query(q): Query<MenuQuery>,
) -> Result<Json<MenuSelection>, (StatusCode, String)> {
    let meal = q.meal().map_err(|e| {
        warn!(error = %e, "bad meal in menu query");
        (StatusCode::BAD_REQUEST, e.to_string())
    })?;

    state
        .menu
        .select(q.date(), meal)
        .await
        .map(Json)
        .map_err(|_| {
            (
                StatusCode::BAD_GATEWAY,
                "Menu is unavailable right now. Please try again later.".into(),
            )
        })
}

#[cfg(test)]
mod handler_tests {
    use super::*;

    #[tokio::test]
    async fn blank_selection_prompts() {
        let state = AppState::fake();
        let q = MenuQuery {
            date: Some(" ".into()),
            meal: Some("".into()),
        };
        let Json(sel) = get_menu(State(state), Query(q)).await.unwrap();
        assert_eq!(sel, MenuSelection::Prompt);
    }

    #[tokio::test]
    async fn unknown_meal_is_bad_request() {
        let state = AppState::fake();
        let q = MenuQuery {
            date: Some("December 10, 2024".into()),
            meal: Some("brunch".into()),
        };
        let (status, _) = get_menu(State(state), Query(q)).await.unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn known_day_returns_items() {
        let state = AppState::fake();
        let q = MenuQuery {
            date: Some("December 10, 2024".into()),
            meal: Some("Lunch".into()),
        };
        let Json(sel) = get_menu(State(state), Query(q)).await.unwrap();
        assert!(matches!(sel, MenuSelection::Items { ref items, .. } if items == &["Chili"]));
    }

    #[test]
    fn selection_serializes_with_state_tag() {
        let json = serde_json::to_value(MenuSelection::Prompt).unwrap();
        assert_eq!(json, serde_json::json!({"state": "prompt"}));
    }
}
