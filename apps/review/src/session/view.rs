use serde::Serialize;

/// Top-level screen of the review session.
///
/// `Error`, `Empty` and `Success` are only left through an explicit reload
/// (and `Success` not at all).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ViewState {
    Loading,
    Error { message: String },
    Empty,
    Review,
    Saving,
    Success,
}

impl ViewState {
    pub fn name(&self) -> &'static str {
        match self {
            ViewState::Loading => "loading",
            ViewState::Error { .. } => "error",
            ViewState::Empty => "empty",
            ViewState::Review => "review",
            ViewState::Saving => "saving",
            ViewState::Success => "success",
        }
    }

    /// States with no automatic way out.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ViewState::Error { .. } | ViewState::Empty | ViewState::Success
        )
    }
}
