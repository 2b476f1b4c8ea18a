use std::sync::Arc;

use time::{Date, Duration};
use tracing::{error, info, instrument};

use super::dto::PhotoViews;
use super::repo::{self, PhotoLog};
use super::repo_types::PhotoRecord;
use crate::clock::{unix_millis, Clock};
use crate::images::services::{ImageHost, UploadItem};
use crate::meal_type::MealType;

pub const DEFAULT_RECENT_WINDOW_DAYS: i64 = 2;
pub const DEFAULT_RECENT_LIMIT: usize = 3;

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("no image provided")]
    EmptyUpload,
    #[error("upload failed: {0:#}")]
    Upload(#[source] anyhow::Error),
    #[error("saving photo log failed: {0:#}")]
    Persist(#[source] anyhow::Error),
}

/// Capture, filtered views, deletion and purge over the photo log.
#[derive(Clone)]
pub struct PhotoManager {
    log: PhotoLog,
    host: Arc<dyn ImageHost>,
    clock: Arc<dyn Clock>,
    recent_window_days: i64,
    recent_limit: usize,
}

impl PhotoManager {
    pub fn new(log: PhotoLog, host: Arc<dyn ImageHost>, clock: Arc<dyn Clock>) -> Self {
        Self {
            log,
            host,
            clock,
            recent_window_days: DEFAULT_RECENT_WINDOW_DAYS,
            recent_limit: DEFAULT_RECENT_LIMIT,
        }
    }

    pub fn with_recent_window(mut self, window_days: i64, limit: usize) -> Self {
        self.recent_window_days = window_days;
        self.recent_limit = limit;
        self
    }

    pub fn log(&self) -> &PhotoLog {
        &self.log
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Uploads `item` and appends one record for it. Nothing is written when
    /// the upload fails.
    #[instrument(skip(self, item), fields(bytes = item.body.len()))]
    pub async fn capture(&self, item: UploadItem, meal: MealType) -> Result<PhotoRecord, CaptureError> {
        if item.body.is_empty() {
            return Err(CaptureError::EmptyUpload);
        }

        let url = self.host.upload(item).await.map_err(|e| {
            error!(error = %e, %meal, "photo upload failed");
            CaptureError::Upload(e)
        })?;

        let now = self.clock.now();
        let record = PhotoRecord {
            id: repo::generate_id(now),
            url,
            meal,
            date: now.date(),
            timestamp: unix_millis(now),
        };

        let mut records = self.log.load_all();
        records.push(record.clone());
        self.log.save_all(&records).map_err(|e| {
            error!(error = %e, "persisting captured photo failed");
            CaptureError::Persist(e)
        })?;

        info!(id = %record.id, %meal, date = %record.date, "photo captured");
        Ok(record)
    }

    /// Today's photos for `meal`, in upload order.
    pub fn list_today(&self, meal: MealType) -> Vec<PhotoRecord> {
        today_for(self.log.load_all(), self.clock.today(), meal)
    }

    pub fn list_recent(&self, window_days: Option<i64>, limit: Option<usize>) -> Vec<PhotoRecord> {
        recent(
            self.log.load_all(),
            self.clock.today(),
            window_days.unwrap_or(self.recent_window_days),
            limit.unwrap_or(self.recent_limit),
        )
    }

    /// Removes the record with `id` (a no-op when absent) and returns the
    /// refreshed views.
    #[instrument(skip(self))]
    pub fn delete_by_id(&self, id: &str, meal: MealType) -> anyhow::Result<PhotoViews> {
        let before = repo::normalize(self.log.load_all(), self.clock.now());
        let count = before.len();
        let after: Vec<PhotoRecord> = before.into_iter().filter(|r| r.id != id).collect();
        let removed = after.len() != count;
        // persisted either way so normalized ids stick
        self.log.save_all(&after)?;
        if removed {
            info!(id, "photo deleted");
        }

        let today = self.clock.today();
        Ok(PhotoViews {
            meal,
            removed,
            today: today_for(after.clone(), today, meal),
            recent: recent(after, today, self.recent_window_days, self.recent_limit),
        })
    }

    /// Drops the whole collection.
    pub fn purge(&self) -> anyhow::Result<()> {
        self.log.clear()?;
        info!("photo log purged");
        Ok(())
    }
}

pub fn today_for(records: Vec<PhotoRecord>, today: Date, meal: MealType) -> Vec<PhotoRecord> {
    records
        .into_iter()
        .filter(|r| r.date == today && r.meal == meal)
        .collect()
}

/// Records dated within `[today - window_days, today]`, newest first, at most
/// `limit`. Equal timestamps keep collection order.
pub fn recent(records: Vec<PhotoRecord>, today: Date, window_days: i64, limit: usize) -> Vec<PhotoRecord> {
    // window_days comes from the query string; Duration::days panics on overflow
    let span = window_days.clamp(0, (Date::MAX - Date::MIN).whole_days());
    let start = today
        .checked_sub(Duration::days(span))
        .unwrap_or(Date::MIN);
    let mut out: Vec<PhotoRecord> = records
        .into_iter()
        .filter(|r| r.date >= start && r.date <= today)
        .collect();
    out.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    out.truncate(limit);
    out
}
