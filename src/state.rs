use std::sync::Arc;
use std::time::Duration;

use crate::clock::Clock;
use crate::config::AppConfig;
use crate::feedback::services::{FeedbackSubmitter, HttpFeedbackSink};
use crate::images::services::{CloudinaryHost, ImageHost};
use crate::menu::services::{HttpMenuSource, MenuViewer};
use crate::photos::repo::PhotoLog;
use crate::photos::services::PhotoManager;
use crate::storage::{FileSlots, SlotStore};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub photos: PhotoManager,
    pub menu: MenuViewer,
    pub feedback: FeedbackSubmitter,
}

impl AppState {
    pub fn init(config: AppConfig, clock: Arc<dyn Clock>) -> anyhow::Result<Self> {
        let config = Arc::new(config);
        let timeout = Duration::from_secs(config.http_timeout_secs);

        let slots = Arc::new(FileSlots::open(&config.storage_dir)?) as Arc<dyn SlotStore>;
        let host = Arc::new(CloudinaryHost::new(&config.image_host, timeout)?) as Arc<dyn ImageHost>;
        let photos = PhotoManager::new(
            PhotoLog::new(slots, config.photos.slot_key.clone()),
            host,
            clock.clone(),
        )
        .with_recent_window(config.photos.recent_window_days, config.photos.recent_limit);

        let menu = MenuViewer::new(
            Arc::new(HttpMenuSource::new(config.menu_endpoint.clone(), timeout)?),
            config.menu_window,
            clock,
        );

        let feedback = FeedbackSubmitter::new(Arc::new(HttpFeedbackSink::new(
            config.feedback_endpoint.clone(),
            timeout,
        )?));

        Ok(Self {
            config,
            photos,
            menu,
            feedback,
        })
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        use crate::images::services::UploadItem;
        use axum::async_trait;

        struct FakeHost;
        #[async_trait]
        impl ImageHost for FakeHost {
            async fn upload(&self, item: UploadItem) -> anyhow::Result<String> {
                Ok(format!("https://fake.local/{}", item.file_name()))
            }
        }

        Self::fake_with_host(Arc::new(FakeHost))
    }

    #[cfg(test)]
    pub fn fake_with_host(host: Arc<dyn ImageHost>) -> Self {
        use crate::clock::FixedClock;
        use crate::config::{ImageHostConfig, PhotoConfig};
        use crate::feedback::dto::FeedbackPayload;
        use crate::feedback::services::FeedbackSink;
        use crate::menu::services::{MenuDocument, MenuSource, WindowPolicy};
        use crate::storage::MemorySlots;
        use axum::async_trait;

        struct FakeMenu;
        #[async_trait]
        impl MenuSource for FakeMenu {
            async fn fetch(&self) -> anyhow::Result<MenuDocument> {
                MenuDocument::from_json(r#"{"December 10, 2024":{"lunch":["Chili"]}}"#)
            }
        }

        struct FakeSink;
        #[async_trait]
        impl FeedbackSink for FakeSink {
            async fn send(&self, _payload: &FeedbackPayload) -> anyhow::Result<()> {
                Ok(())
            }
        }

        let config = Arc::new(AppConfig {
            host: "127.0.0.1".into(),
            port: 0,
            storage_dir: "fake".into(),
            photos: PhotoConfig {
                slot_key: "mealImages".into(),
                recent_window_days: 2,
                recent_limit: 3,
            },
            image_host: ImageHostConfig {
                upload_url: "https://fake.local/upload".into(),
                upload_preset: "test".into(),
            },
            menu_endpoint: "https://fake.local/menu".into(),
            menu_window: WindowPolicy::default(),
            feedback_endpoint: "https://fake.local/feedback".into(),
            http_timeout_secs: 5,
        });

        let clock = Arc::new(FixedClock::new(time::macros::datetime!(2024-12-10 12:00 UTC)))
            as Arc<dyn Clock>;
        let photos = PhotoManager::new(
            PhotoLog::new(Arc::new(MemorySlots::new()), "mealImages"),
            host,
            clock.clone(),
        );
        let menu = MenuViewer::new(Arc::new(FakeMenu), config.menu_window, clock);
        let feedback = FeedbackSubmitter::new(Arc::new(FakeSink));

        Self {
            config,
            photos,
            menu,
            feedback,
        }
    }
}
