//! Tracing subscriber setup

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// `RUST_LOG` wins; otherwise `bankim_content=<level>,info`
pub fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("bankim_content={},info", level).into())
}

/// Install the global subscriber. Calling it twice is harmless: the second
/// install fails and is ignored.
pub fn init_tracing(level: &str, json: bool) {
    let registry = tracing_subscriber::registry().with(env_filter(level));
    let _ = if json {
        registry.with(tracing_subscriber::fmt::layer().json()).try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    };
}
