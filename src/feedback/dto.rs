use serde::{Deserialize, Serialize};

pub const SUBMITTED: &str = "Feedback submitted successfully!";
pub const SUBMIT_FAILED: &str = "Error submitting feedback. Please try again.";

#[derive(Debug, Clone, Deserialize)]
pub struct FeedbackRequest {
    #[serde(default)]
    pub name: Option<String>,
    pub feedback: String,
}

/// Wire body for the form endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedbackPayload {
    pub name: String,
    pub feedback: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedbackOutcome {
    pub message: String,
    /// The form should be reset.
    pub clear_fields: bool,
}

impl FeedbackOutcome {
    pub fn submitted() -> Self {
        Self {
            message: SUBMITTED.into(),
            clear_fields: true,
        }
    }

    pub fn failed() -> Self {
        Self {
            message: SUBMIT_FAILED.into(),
            clear_fields: false,
        }
    }
}
