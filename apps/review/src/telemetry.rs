use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;

/// Installs the structured logging subscriber for a front-end embedding this crate.
///
/// `RUST_LOG` in the environment wins over `config.rust_log`. Returns `false`
/// if a global subscriber was already installed.
pub fn init(config: &Config) -> bool {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .is_ok()
}
