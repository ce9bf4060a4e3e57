//! Tracing and logging support.
//!
//! The engine emits structured events through `tracing` (registrations,
//! rejected registrations, resolution failures, permission denials, handler
//! failures). Hosts that do not install their own subscriber can use the
//! helpers here.

#[cfg(feature = "tracing")]
pub use tracing::{self, debug, error, info, instrument, trace, warn};

#[cfg(feature = "tracing")]
use serde::{Deserialize, Serialize};
#[cfg(feature = "tracing")]
use tracing_subscriber::{
    layer::SubscriberExt, util::SubscriberInitExt, util::TryInitError, EnvFilter, Layer,
    Registry,
};

#[cfg(feature = "tracing")]
const DEFAULT_FILTER: &str = "info";

/// Tracing output format.
#[cfg(feature = "tracing")]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TracingFormat {
    /// Human-readable multi-line output.
    #[default]
    Pretty,

    /// Single-line output.
    Compact,

    /// One JSON object per event.
    Json,
}

/// Tracing configuration.
#[cfg(feature = "tracing")]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TracingConfig {
    /// Filter directive such as `"info,arbor=debug"`.
    ///
    /// If None, uses the RUST_LOG environment variable or defaults to "info".
    pub filter: Option<String>,

    pub format: TracingFormat,

    /// Include timestamps in output.
    pub timestamps: bool,

    /// Include target module names in output.
    pub target: bool,

    /// Include thread IDs in output (useful with the scheduled coordinator).
    pub thread_ids: bool,
}

#[cfg(feature = "tracing")]
impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            filter: None,
            format: TracingFormat::Pretty,
            timestamps: true,
            target: true,
            thread_ids: false,
        }
    }
}

#[cfg(feature = "tracing")]
impl TracingConfig {
    fn env_filter(&self) -> EnvFilter {
        let fallback = || EnvFilter::new(DEFAULT_FILTER);
        match &self.filter {
            Some(directive) => EnvFilter::try_new(directive).unwrap_or_else(|_| fallback()),
            None => EnvFilter::try_from_default_env().unwrap_or_else(|_| fallback()),
        }
    }

    fn fmt_layer(&self) -> Box<dyn Layer<Registry> + Send + Sync> {
        let layer = tracing_subscriber::fmt::layer()
            .with_target(self.target)
            .with_thread_ids(self.thread_ids);

        match (self.format, self.timestamps) {
            (TracingFormat::Pretty, true) => layer.pretty().boxed(),
            (TracingFormat::Pretty, false) => layer.pretty().without_time().boxed(),
            (TracingFormat::Compact, true) => layer.compact().boxed(),
            (TracingFormat::Compact, false) => layer.compact().without_time().boxed(),
            (TracingFormat::Json, true) => layer.json().boxed(),
            (TracingFormat::Json, false) => layer.json().without_time().boxed(),
        }
    }
}

/// Initialize a subscriber with default settings.
///
/// Uses RUST_LOG for level filtering, defaulting to "info". Does nothing if a
/// global subscriber is already installed.
///
/// # Example
///
/// ```rust
/// arbor::init_subscriber();
/// ```
///
/// # Environment Variables
///
/// - `RUST_LOG=debug` - Enable debug logs
/// - `RUST_LOG=myapp=info,arbor=debug` - Per-module filtering
#[cfg(feature = "tracing")]
pub fn init_subscriber() {
    init_subscriber_with_config(TracingConfig::default());
}

/// Initialize a subscriber with custom configuration.
///
/// Does nothing if a global subscriber is already installed.
///
/// # Example
///
/// ```rust
/// use arbor::{init_subscriber_with_config, TracingConfig, TracingFormat};
///
/// init_subscriber_with_config(TracingConfig {
///     format: TracingFormat::Json,
///     thread_ids: true,
///     ..Default::default()
/// });
/// ```
#[cfg(feature = "tracing")]
pub fn init_subscriber_with_config(config: TracingConfig) {
    let _ = try_init_subscriber(config);
}

/// Like [`init_subscriber_with_config`], but reports an already installed
/// subscriber.
#[cfg(feature = "tracing")]
pub fn try_init_subscriber(config: TracingConfig) -> Result<(), TryInitError> {
    tracing_subscriber::registry()
        .with(config.fmt_layer())
        .with(config.env_filter())
        .try_init()
}

#[cfg(not(feature = "tracing"))]
pub fn init_subscriber() {}

#[cfg(test)]
mod tests {
    #[cfg(feature = "tracing")]
    use super::*;

    #[test]
    #[cfg(feature = "tracing")]
    fn test_default_config() {
        let config = TracingConfig::default();
        assert_eq!(config.format, TracingFormat::Pretty);
        assert!(config.timestamps);
        assert!(config.target);
        assert!(!config.thread_ids);
    }

    #[test]
    #[cfg(feature = "tracing")]
    fn test_config_from_json() {
        let config: TracingConfig =
            serde_json::from_str(r#"{"format": "json", "filter": "arbor=debug"}"#).unwrap();
        assert_eq!(config.format, TracingFormat::Json);
        assert_eq!(config.filter.as_deref(), Some("arbor=debug"));
        assert!(config.timestamps);
    }

    #[test]
    #[cfg(feature = "tracing")]
    fn test_second_init_is_reported() {
        let _ = try_init_subscriber(TracingConfig::default());
        assert!(try_init_subscriber(TracingConfig::default()).is_err());
    }
}
