use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{delete, get},
    Json, Router,
};
use tracing::{error, instrument, warn};

use super::dto::{MealQuery, PhotoViews, RecentQuery};
use super::repo_types::PhotoRecord;
use super::services::CaptureError;
use crate::images::services::UploadItem;
use crate::meal_type::MealType;
use crate::state::AppState;

const UPLOAD_FAILED: &str = "Upload failed. Please try again.";

pub fn photo_routes() -> Router<AppState> {
    Router::new()
        .route("/photos", get(list_today).post(capture_photo))
        .route("/photos/recent", get(list_recent))
        .route("/photos/:id", delete(delete_photo))
        .layer(DefaultBodyLimit::max(20 * 1024 * 1024)) // 20MB
}

#[instrument(skip(state))]
pub async fn list_today(
    State(state): State<AppState>,
    Query(q): Query<MealQuery>,
) -> Json<Vec<PhotoRecord>> {
    Json(state.photos.list_today(q.meal))
}

#[instrument(skip(state))]
pub async fn list_recent(
    State(state): State<AppState>,
    Query(q): Query<RecentQuery>,
) -> Json<Vec<PhotoRecord>> {
    Json(state.photos.list_recent(q.window_days, q.limit))
}

/// POST /photos (multipart)
/// Fields: `file` (image), `meal` (lunch|dinner, default lunch)
#[instrument(skip(state, mp))]
pub async fn capture_photo(
    State(state): State<AppState>,
    mut mp: Multipart,
) -> Result<(StatusCode, HeaderMap, Json<PhotoRecord>), (StatusCode, String)> {
    let mut file: Option<UploadItem> = None;
    let mut meal = MealType::default();

    while let Some(field) = mp.next_field().await.map_err(bad_request)? {
        let name = field.name().map(|s| s.to_string());
        match name.as_deref() {
            Some("file") => {
                let content_type = field
                    .content_type()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "application/octet-stream".into());
                let file_name = field.file_name().map(|s| s.to_string());
                let body = field.bytes().await.map_err(bad_request)?;
                file = Some(UploadItem {
                    body,
                    content_type,
                    file_name,
                });
            }
            Some("meal") => {
                let raw = field.text().await.map_err(bad_request)?;
                meal = raw.parse().map_err(bad_request)?;
            }
            _ => {}
        }
    }

    let Some(file) = file else {
        return Err((StatusCode::BAD_REQUEST, "file is required".into()));
    };

    let record = match state.photos.capture(file, meal).await {
        Ok(r) => r,
        Err(CaptureError::EmptyUpload) => {
            warn!("empty photo upload");
            return Err((StatusCode::BAD_REQUEST, "file is empty".into()));
        }
        Err(e @ CaptureError::Upload(_)) => {
            error!(error = %e, "capture failed");
            return Err((StatusCode::BAD_GATEWAY, UPLOAD_FAILED.into()));
        }
        Err(e @ CaptureError::Persist(_)) => {
            error!(error = %e, "capture failed");
            return Err((StatusCode::INTERNAL_SERVER_ERROR, UPLOAD_FAILED.into()));
        }
    };

    let mut headers = HeaderMap::new();
    if let Ok(location) = format!("/api/v1/photos/{}", record.id).parse() {
        headers.insert(axum::http::header::LOCATION, location);
    }

    Ok((StatusCode::CREATED, headers, Json(record)))
}

#[instrument(skip(state))]
pub async fn delete_photo(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(q): Query<MealQuery>,
) -> Result<Json<PhotoViews>, (StatusCode, String)> {
    state.photos.delete_by_id(&id, q.meal).map(Json).map_err(|e| {
        error!(error = %e, %id, "delete photo failed");
        internal(e)
    })
}

fn bad_request<E: std::fmt::Display>(e: E) -> (StatusCode, String) {
    (StatusCode::BAD_REQUEST, e.to_string())
}

fn internal<E: std::fmt::Display>(e: E) -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}
