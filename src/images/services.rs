use std::time::Duration;

use anyhow::Context;
use axum::async_trait;
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::config::ImageHostConfig;

pub struct UploadItem {
    pub body: Bytes,
    pub content_type: String,
    pub file_name: Option<String>,
}

impl UploadItem {
    /// Name sent with the multipart part; falls back to one derived from the mime.
    pub fn file_name(&self) -> String {
        match &self.file_name {
            Some(name) if !name.trim().is_empty() => name.clone(),
            _ => format!("meal.{}", ext_from_mime(&self.content_type).unwrap_or("bin")),
        }
    }
}

/// External image host. Returns the publicly reachable URL of the upload.
#[async_trait]
pub trait ImageHost: Send + Sync {
    async fn upload(&self, item: UploadItem) -> anyhow::Result<String>;
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
}

/// Unsigned uploads against a Cloudinary-style endpoint.
#[derive(Clone)]
pub struct CloudinaryHost {
    client: reqwest::Client,
    upload_url: String,
    upload_preset: String,
}

impl CloudinaryHost {
    pub fn new(config: &ImageHostConfig, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("build image host client")?;
        Ok(Self {
            client,
            upload_url: config.upload_url.clone(),
            upload_preset: config.upload_preset.clone(),
        })
    }
}

#[async_trait]
impl ImageHost for CloudinaryHost {
    #[instrument(skip(self, item), fields(bytes = item.body.len()))]
    async fn upload(&self, item: UploadItem) -> anyhow::Result<String> {
        let file_name = item.file_name();
        let part = Part::bytes(item.body.to_vec())
            .file_name(file_name)
            .mime_str(&item.content_type)
            .with_context(|| format!("invalid content type {}", item.content_type))?;
        let form = Form::new()
            .part("file", part)
            .text("upload_preset", self.upload_preset.clone());

        let res: UploadResponse = self
            .client
            .post(&self.upload_url)
            .multipart(form)
            .send()
            .await
            .context("image upload request")?
            .error_for_status()
            .context("image upload rejected")?
            .json()
            .await
            .context("image upload response")?;

        debug!(url = %res.secure_url, "image uploaded");
        Ok(res.secure_url)
    }
}

pub(crate) fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/heic" => Some("heic"),
        _ => None,
    }
}
