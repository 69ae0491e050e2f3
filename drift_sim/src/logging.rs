// drift_sim/src/logging.rs

//! Process-wide `tracing` setup for binaries and rollout workers.
//!
//! | Variable | Effect |
//! |---|---|
//! | `RUST_LOG` | Log filter (default `"info"`). |
//! | `DRIFT_LOG_FORMAT=json` | Emit newline-delimited JSON logs. |

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Installs the global subscriber. Calling it again is harmless: only the first call
/// wins, which keeps test binaries and multi-env harnesses from panicking.
pub fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let use_json = std::env::var("DRIFT_LOG_FORMAT").as_deref() == Ok("json");

    let result = if use_json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().compact())
            .try_init()
    };

    if result.is_ok() {
        tracing::debug!(json = use_json, "logging initialized");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_init_does_not_panic() {
        init_logging();
        init_logging();
    }
}
