//! Client-side review of AI-drafted resume project descriptions.
//!
//! A [`ReviewOrchestrator`] loads the employee's pending updates, tracks
//! local edits and the per-item discard gate, and commits the accepted set
//! in one call. [`FeedbackChannel`] runs beside it, independent of the
//! session's state.

pub mod app;
pub mod config;
pub mod errors;
pub mod feedback;
pub mod gateway;
pub mod models;
pub mod session;
pub mod telemetry;

pub use app::ReviewApp;
pub use errors::ReviewError;
pub use feedback::{FeedbackChannel, FeedbackStatus};
pub use gateway::{BackendGateway, CommitRequest, GatewayError, HttpGateway};
pub use models::feedback::{Feedback, FeedbackCategory};
pub use models::project::{DiscardState, Identity, ProjectNumber, ProjectUpdate};
pub use session::{DiscardOutcome, ReviewOrchestrator, SessionSnapshot, SessionStore, ViewState};
