use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::async_trait;
use tracing::{debug, error, info, instrument};

use super::dto::{FeedbackOutcome, FeedbackPayload, FeedbackRequest};

/// Remote form endpoint. Success only means the request went out.
#[async_trait]
pub trait FeedbackSink: Send + Sync {
    async fn send(&self, payload: &FeedbackPayload) -> anyhow::Result<()>;
}

#[derive(Clone)]
pub struct HttpFeedbackSink {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpFeedbackSink {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("build feedback client")?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl FeedbackSink for HttpFeedbackSink {
    async fn send(&self, payload: &FeedbackPayload) -> anyhow::Result<()> {
        // status and body are not part of the contract
        let res = self
            .client
            .post(&self.endpoint)
            .json(payload)
            .send()
            .await
            .context("feedback request")?;
        debug!(status = %res.status(), "feedback response received");
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FeedbackError {
    #[error("feedback is required")]
    MissingFeedback,
    #[error("feedback submission failed: {0:#}")]
    Send(#[source] anyhow::Error),
}

impl FeedbackError {
    /// Message shown next to the form.
    pub fn outcome(&self) -> FeedbackOutcome {
        match self {
            FeedbackError::MissingFeedback => FeedbackOutcome {
                message: self.to_string(),
                clear_fields: false,
            },
            FeedbackError::Send(_) => FeedbackOutcome::failed(),
        }
    }
}

#[derive(Clone)]
pub struct FeedbackSubmitter {
    sink: Arc<dyn FeedbackSink>,
}

impl FeedbackSubmitter {
    pub fn new(sink: Arc<dyn FeedbackSink>) -> Self {
        Self { sink }
    }

    #[instrument(skip(self, req))]
    pub async fn submit(&self, req: FeedbackRequest) -> Result<FeedbackOutcome, FeedbackError> {
        if req.feedback.trim().is_empty() {
            return Err(FeedbackError::MissingFeedback);
        }
        // forwarded as typed
        let payload = FeedbackPayload {
            name: req.name.unwrap_or_default(),
            feedback: req.feedback,
        };

        self.sink.send(&payload).await.map_err(|e| {
            error!(error = %e, "error submitting feedback");
            FeedbackError::Send(e)
        })?;

        info!(anonymous = payload.name.trim().is_empty(), "feedback submitted");
        Ok(FeedbackOutcome::submitted())
    }
}
