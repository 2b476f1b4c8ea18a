use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::Context;
use serde::Deserialize;

use crate::menu::services::{Direction, WindowPolicy};

const DEFAULT_IMAGE_UPLOAD_URL: &str = "https://api.cloudinary.com/v1_1/daopnlpn3/image/upload";
const DEFAULT_MENU_ENDPOINT: &str = "https://script.google.com/macros/s/AKfycbzjIP0Mw5UTjHAcdxBXKD53GoFz4kpCdZ2vwmsJ3NWF49EqVOd0JQRlRYkoW0Z4qBNmRg/exec";
const DEFAULT_FEEDBACK_ENDPOINT: &str = "https://script.google.com/macros/s/AKfycbwStnFHW5Pgew_DW9ZcWHgvpKPXv80GwwUJz_esp8LFLC0xmQCV4NSyIq4z3U74pK2WoQ/exec";

#[derive(Debug, Clone, Deserialize)]
pub struct ImageHostConfig {
    pub upload_url: String,
    pub upload_preset: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PhotoConfig {
    pub slot_key: String,
    pub recent_window_days: i64,
    pub recent_limit: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub storage_dir: PathBuf,
    pub photos: PhotoConfig,
    pub image_host: ImageHostConfig,
    pub menu_endpoint: String,
    pub menu_window: WindowPolicy,
    pub feedback_endpoint: String,
    pub http_timeout_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let direction = match std::env::var("MENU_DIRECTION") {
            Ok(v) => v.parse::<Direction>()?,
            Err(_) => Direction::Backward,
        };
        let defaults = WindowPolicy::default();

        Ok(Self {
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: parsed_or("APP_PORT", 8080),
            storage_dir: std::env::var("STORAGE_DIR")
                .unwrap_or_else(|_| ".warehaus".into())
                .into(),
            photos: PhotoConfig {
                slot_key: std::env::var("PHOTO_SLOT_KEY").unwrap_or_else(|_| "mealImages".into()),
                recent_window_days: parsed_or("RECENT_WINDOW_DAYS", 2),
                recent_limit: parsed_or("RECENT_LIMIT", 3),
            },
            image_host: ImageHostConfig {
                upload_url: std::env::var("IMAGE_UPLOAD_URL")
                    .unwrap_or_else(|_| DEFAULT_IMAGE_UPLOAD_URL.into()),
                upload_preset: std::env::var("IMAGE_UPLOAD_PRESET")
                    .unwrap_or_else(|_| "meal-uploads".into()),
            },
            menu_endpoint: std::env::var("MENU_ENDPOINT")
                .unwrap_or_else(|_| DEFAULT_MENU_ENDPOINT.into()),
            menu_window: WindowPolicy {
                days: parsed_or("MENU_DAYS", defaults.days),
                direction,
                skip_weekends: parsed_or("MENU_SKIP_WEEKENDS", defaults.skip_weekends),
            },
            feedback_endpoint: std::env::var("FEEDBACK_ENDPOINT")
                .unwrap_or_else(|_| DEFAULT_FEEDBACK_ENDPOINT.into()),
            http_timeout_secs: parsed_or("HTTP_TIMEOUT_SECS", 30),
        })
    }

    pub fn bind_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid bind address {}:{}", self.host, self.port))
    }
}

fn parsed_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}
