use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use tracing::{instrument, warn};

use super::dto::{FeedbackOutcome, FeedbackRequest};
use super::services::FeedbackError;
use crate::state::AppState;

pub fn feedback_routes() -> Router<AppState> {
    Router::new().route("/feedback", post(submit_feedback))
}

#[instrument(skip(state, payload))]
pub async fn submit_feedback(
    State(state): State<AppState>,
    Json(payload): Json<FeedbackRequest>,
) -> Result<Json<FeedbackOutcome>, (StatusCode, Json<FeedbackOutcome>)> {
    match state.feedback.submit(payload).await {
        Ok(outcome) => Ok(Json(outcome)),
        Err(e @ FeedbackError::MissingFeedback) => {
            warn!("feedback missing");
            Err((StatusCode::BAD_REQUEST, Json(e.outcome())))
        }
        Err(e @ FeedbackError::Send(_)) => Err((StatusCode::BAD_GATEWAY, Json(e.outcome()))),
    }
}

#[cfg(test)]
mod handler_tests {
    use super::*;

    #[tokio::test]
    async fn submit_feedback_succeeds_against_fake_sink() {
        let state = AppState::fake();
        let Json(out) = submit_feedback(
            State(state),
            Json(FeedbackRequest {
                name: None,
                feedback: "credit where credit is due".into(),
            }),
        )
        .await
        .unwrap();
        assert_eq!(out, FeedbackOutcome::submitted());
    }

    #[tokio::test]
    async fn blank_feedback_is_bad_request() {
        let state = AppState::fake();
        let (status, Json(out)) = submit_feedback(
            State(state),
            Json(FeedbackRequest {
                name: Some("anon".into()),
                feedback: "".into(),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(!out.clear_fields);
    }
}
