//! The pending update review session.
//!
//! `store` holds the state and its synchronous transitions; `orchestrator`
//! drives those transitions from gateway calls.

pub mod orchestrator;
pub mod store;
pub mod view;

pub use orchestrator::ReviewOrchestrator;
pub use store::{DiscardOutcome, SessionSnapshot, SessionStore};
pub use view::ViewState;
