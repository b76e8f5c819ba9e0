use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use crate::config::Config;
use crate::feedback::FeedbackChannel;
use crate::gateway::{BackendGateway, HttpGateway};
use crate::session::ReviewOrchestrator;
use crate::telemetry;

/// Everything a review screen needs, sharing one gateway.
#[derive(Clone)]
pub struct ReviewApp {
    pub session: ReviewOrchestrator,
    pub feedback: FeedbackChannel,
}

impl ReviewApp {
    pub fn new(gateway: Arc<dyn BackendGateway>) -> Self {
        Self {
            session: ReviewOrchestrator::new(gateway.clone()),
            feedback: FeedbackChannel::new(gateway),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let gateway = HttpGateway::new(config)?;
        info!("Review gateway initialized (backend: {})", config.api_url);
        Ok(Self::new(Arc::new(gateway)))
    }

    /// Loads configuration, installs logging and builds the HTTP-backed app.
    pub fn from_env() -> Result<Self> {
        let config = Config::from_env()?;
        telemetry::init(&config);
        info!("Starting resume review client v{}", env!("CARGO_PKG_VERSION"));
        Self::from_config(&config)
    }
}
