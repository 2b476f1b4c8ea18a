use std::time::Duration;

use time::macros::time;
use time::OffsetDateTime;
use tokio::task::JoinHandle;
use tracing::{error, info};

use super::services::PhotoManager;

/// Cancels the pending purge when dropped.
#[derive(Debug)]
pub struct PurgeHandle {
    task: JoinHandle<()>,
}

impl PurgeHandle {
    pub fn cancel(self) {
        self.task.abort();
        info!("scheduled purge cancelled");
    }

    /// Resolves once the purge has run or been aborted.
    pub async fn wait(&mut self) {
        let _ = (&mut self.task).await;
    }
}

impl Drop for PurgeHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Time left until the next 23:59:59 in `now`'s offset.
pub fn delay_until_purge(now: OffsetDateTime) -> Duration {
    let tonight = now.replace_time(time!(23:59:59));
    let target = if now < tonight {
        tonight
    } else {
        tonight + time::Duration::days(1)
    };
    Duration::try_from(target - now).unwrap_or(Duration::ZERO)
}

/// Arms a one-shot purge of the whole photo log. `on_purge` runs after the
/// log has been cleared.
pub fn schedule_purge<F>(manager: &PhotoManager, on_purge: F) -> PurgeHandle
where
    F: FnOnce() + Send + 'static,
{
    let delay = delay_until_purge(manager.clock().now());
    let manager = manager.clone();
    info!(in_secs = delay.as_secs(), "photo purge scheduled");

    let task = tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        match manager.purge() {
            Ok(()) => on_purge(),
            Err(e) => error!(error = %e, "scheduled photo purge failed"),
        }
    });
    PurgeHandle { task }
}

/// Re-arms the one-shot purge every night until the handle goes away.
pub fn spawn_daily_purge(manager: PhotoManager) -> PurgeHandle {
    let task = tokio::spawn(async move {
        loop {
            let mut next = schedule_purge(&manager, || info!("photo views reset"));
            next.wait().await;
            // timer and wall clock can disagree by a few ms around the mark
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
    });
    PurgeHandle { task }
}

#[cfg(test)]
mod purge_tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::images::services::{ImageHost, UploadItem};
    use crate::meal_type::MealType;
    use crate::photos::repo::PhotoLog;
    use crate::photos::repo_types::PhotoRecord;
    use crate::storage::MemorySlots;
    use axum::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use time::macros::{date, datetime};

    struct NoHost;

    #[async_trait]
    impl ImageHost for NoHost {
        async fn upload(&self, _item: UploadItem) -> anyhow::Result<String> {
            anyhow::bail!("not used")
        }
    }

    fn seeded_manager(now: OffsetDateTime) -> PhotoManager {
        let log = PhotoLog::new(Arc::new(MemorySlots::new()), "mealImages");
        log.save_all(&[PhotoRecord {
            id: "a".into(),
            url: "https://x/a.jpg".into(),
            meal: MealType::Lunch,
            date: date!(2024 - 12 - 10),
            timestamp: 1,
        }])
        .unwrap();
        PhotoManager::new(log, Arc::new(NoHost), Arc::new(FixedClock::new(now)))
    }

    #[test]
    fn delay_targets_tonight() {
        let d = delay_until_purge(datetime!(2024-12-10 12:00 UTC));
        assert_eq!(d, Duration::from_secs(12 * 3600 - 1));

        let d = delay_until_purge(datetime!(2024-12-10 00:00 +02:00));
        assert_eq!(d, Duration::from_secs(24 * 3600 - 1));
    }

    #[test]
    fn delay_rolls_over_once_mark_has_passed() {
        let d = delay_until_purge(datetime!(2024-12-10 23:59:59 UTC));
        assert_eq!(d, Duration::from_secs(24 * 3600));

        let d = delay_until_purge(datetime!(2024-12-10 23:59:59.5 UTC));
        assert_eq!(d, Duration::from_millis(24 * 3600 * 1000 - 500));
    }

    #[tokio::test(start_paused = true)]
    async fn purge_fires_and_empties_views() {
        let mgr = seeded_manager(datetime!(2024-12-10 23:59:00 UTC));
        let notified = Arc::new(AtomicBool::new(false));
        let flag = notified.clone();

        let mut handle = schedule_purge(&mgr, move || flag.store(true, Ordering::SeqCst));
        assert!(!mgr.list_today(MealType::Lunch).is_empty());

        handle.wait().await;
        assert!(notified.load(Ordering::SeqCst));
        assert!(mgr.log().load_all().is_empty());
        assert!(mgr.list_today(MealType::Lunch).is_empty());
        assert!(mgr.list_recent(None, None).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_purge_keeps_records() {
        let mgr = seeded_manager(datetime!(2024-12-10 23:59:00 UTC));
        let notified = Arc::new(AtomicBool::new(false));
        let flag = notified.clone();

        let handle = schedule_purge(&mgr, move || flag.store(true, Ordering::SeqCst));
        handle.cancel();
        tokio::time::sleep(Duration::from_secs(120)).await;

        assert!(!notified.load(Ordering::SeqCst));
        assert_eq!(mgr.log().load_all().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_handle_cancels_purge() {
        let mgr = seeded_manager(datetime!(2024-12-10 23:59:00 UTC));
        drop(schedule_purge(&mgr, || {}));
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(mgr.log().load_all().len(), 1);
    }
}
