use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable key of a pending update, unique within a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectNumber(pub String);

impl fmt::Display for ProjectNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ProjectNumber {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ProjectNumber {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// The resolved employee key. Opaque to the client.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(pub String);

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Identity {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Confirmation gate for removing one pending update.
///
/// A confirmed removal has no variant here: the entry leaves the session
/// in the same transition that records the backend's acknowledgement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscardState {
    #[default]
    Active,
    ConfirmPending,
    Discarding,
}

impl DiscardState {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscardState::Active => "active",
            DiscardState::ConfirmPending => "confirm_pending",
            DiscardState::Discarding => "discarding",
        }
    }
}

fn unknown_project() -> String {
    "Unknown Project".to_string()
}

fn unknown_role() -> String {
    "Unknown Role".to_string()
}

/// One AI-drafted project description proposed for the employee's resume.
///
/// Only `content` is editable; the display metadata is fixed at load time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectUpdate {
    // Older backends send the key as `code`.
    #[serde(alias = "code")]
    project_number: ProjectNumber,
    #[serde(default = "unknown_project")]
    name: String,
    #[serde(default = "unknown_role")]
    role: String,
    #[serde(default)]
    total_hours: f64,
    #[serde(default)]
    content: String,
    #[serde(skip_deserializing, default)]
    discard_state: DiscardState,
    #[serde(skip_deserializing, default)]
    discard_error: Option<String>,
}

impl ProjectUpdate {
    pub fn new(
        project_number: impl Into<ProjectNumber>,
        name: impl Into<String>,
        role: impl Into<String>,
        total_hours: f64,
        content: impl Into<String>,
    ) -> Self {
        Self {
            project_number: project_number.into(),
            name: name.into(),
            role: role.into(),
            total_hours,
            content: content.into(),
            discard_state: DiscardState::Active,
            discard_error: None,
        }
    }

    pub fn project_number(&self) -> &ProjectNumber {
        &self.project_number
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn role(&self) -> &str {
        &self.role
    }

    pub fn total_hours(&self) -> f64 {
        self.total_hours
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn discard_state(&self) -> DiscardState {
        self.discard_state
    }

    /// Message from the last failed discard, if the user has not retried since.
    pub fn discard_error(&self) -> Option<&str> {
        self.discard_error.as_deref()
    }

    /// Blank descriptions are allowed through to the commit but worth a hint.
    pub fn has_blank_content(&self) -> bool {
        self.content.trim().is_empty()
    }

    /// Whether the card should offer discard/cancel/confirm controls.
    pub fn discard_controls_enabled(&self) -> bool {
        self.discard_state != DiscardState::Discarding
    }

    pub(crate) fn set_content(&mut self, text: String) {
        self.content = text;
    }

    pub(crate) fn set_discard_state(&mut self, state: DiscardState) {
        self.discard_state = state;
    }

    pub(crate) fn set_discard_error(&mut self, error: Option<String>) {
        self.discard_error = error;
    }
}
