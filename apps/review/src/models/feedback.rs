use serde::{Deserialize, Serialize};

use crate::errors::ReviewError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackCategory {
    #[default]
    General,
    Bug,
    Feature,
    Content,
    Process,
}

impl FeedbackCategory {
    pub const ALL: [FeedbackCategory; 5] = [
        FeedbackCategory::General,
        FeedbackCategory::Bug,
        FeedbackCategory::Feature,
        FeedbackCategory::Content,
        FeedbackCategory::Process,
    ];

    /// Human-readable label for the category picker.
    pub fn label(&self) -> &'static str {
        match self {
            FeedbackCategory::General => "General Feedback",
            FeedbackCategory::Bug => "Report a Bug",
            FeedbackCategory::Feature => "Feature Request",
            FeedbackCategory::Content => "Content Improvement",
            FeedbackCategory::Process => "Process Feedback",
        }
    }
}

/// A validated feedback submission. Serializes to the backend's `{type, content}` shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Feedback {
    #[serde(rename = "type")]
    pub category: FeedbackCategory,
    pub content: String,
}

impl Feedback {
    pub fn new(category: FeedbackCategory, text: impl Into<String>) -> Result<Self, ReviewError> {
        let content = text.into();
        if content.trim().is_empty() {
            return Err(ReviewError::Validation(
                "feedback text cannot be empty".to_string(),
            ));
        }
        Ok(Self { category, content })
    }
}
