//! Tracing subscriber setup for `mcpm`.
//!
//! Logs go to stderr so stdout stays clean for command output such as JSON
//! exports and search listings. Without an explicit filter only this
//! workspace logs at `info`; hyper, reqwest and the rest stay at `warn`.

use anyhow::{anyhow, Result};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when neither `--log-level` nor `RUST_LOG` is set.
pub const DEFAULT_FILTER: &str = "warn,mcp_memory=info,mcp_memory_core=info";

/// Pick the filter directive: the CLI flag, then `RUST_LOG`, then
/// [`DEFAULT_FILTER`]. Blank values count as unset.
pub fn resolve_filter(flag: Option<&str>, env: Option<&str>) -> String {
    flag.or(env)
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .unwrap_or(DEFAULT_FILTER)
        .to_string()
}

/// Install the global subscriber.
///
/// `color` is the caller's final decision; `main` folds `--no-color` and
/// `NO_COLOR` into it. Fails if a subscriber is already installed or the
/// filter does not parse.
pub fn init_logging(log_level: Option<&str>, color: bool) -> Result<()> {
    let rust_log = std::env::var("RUST_LOG").ok();
    let filter = resolve_filter(log_level, rust_log.as_deref());
    let env_filter = EnvFilter::try_new(&filter)
        .map_err(|e| anyhow!("Invalid log filter '{}': {}", filter, e))?;

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_ansi(color),
        )
        .try_init()
        .map_err(|e| anyhow!("Failed to init logging: {}", e))
}
