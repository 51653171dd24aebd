//! # Observability
//!
//! Installs the global `tracing` subscriber for binaries built on this crate.
//!
//! Library code never configures logging itself: clients emit events inside
//! the span they were given (see `with_span` on each client) and the host
//! application decides where those events go by calling [`init`] once.

use crate::config::vars;
use tracing::Level;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Crates whose events are captured at the configured level.
const TARGETS: &[&str] = &["foundry_kit", "foundry_kit_cli"];

/// Configuration for initializing the observability system.
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    /// The maximum log level to capture.
    pub level: Level,
    /// The target for the logs.
    pub target: LogTarget,
    /// Emit one JSON object per event instead of human-readable lines.
    pub json: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            target: LogTarget::default(),
            json: false,
        }
    }
}

impl ObservabilityConfig {
    /// `debug` when `verbose`, otherwise the level named by `LOG_LEVEL`
    /// (falling back to `info`).
    pub fn from_env(verbose: bool) -> Self {
        let level = if verbose {
            Level::DEBUG
        } else {
            std::env::var(vars::LOG_LEVEL)
                .ok()
                .and_then(|raw| raw.trim().parse::<Level>().ok())
                .unwrap_or(Level::INFO)
        };

        Self {
            level,
            ..Default::default()
        }
    }

    pub fn with_target(mut self, target: LogTarget) -> Self {
        self.target = target;
        self
    }

    pub fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    fn filter(&self) -> Result<EnvFilter, tracing_subscriber::filter::ParseError> {
        let mut filter = EnvFilter::from_default_env();
        for target in TARGETS {
            filter = filter.add_directive(format!("{target}={}", self.level).parse()?);
        }
        Ok(filter)
    }
}

/// Defines the output target for logs.
#[derive(Debug, Clone, Default)]
pub enum LogTarget {
    /// Log to stderr, keeping stdout free for command output.
    #[default]
    Stderr,
    /// Log to a file.
    File(String),
}

/// Initializes the global tracing subscriber.
///
/// Call once at the start of `main`. Fails if a global subscriber is already
/// installed or the log file cannot be created.
pub fn init(config: ObservabilityConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = config.filter()?;
    let subscriber = tracing_subscriber::registry().with(filter);

    match (config.target, config.json) {
        (LogTarget::Stderr, false) => {
            let layer = fmt::layer().with_writer(std::io::stderr);
            subscriber.with(layer).try_init()?;
        }
        (LogTarget::Stderr, true) => {
            let layer = fmt::layer().json().with_writer(std::io::stderr);
            subscriber.with(layer).try_init()?;
        }
        (LogTarget::File(path), json) => {
            let file = std::fs::File::create(path)?;
            if json {
                subscriber
                    .with(fmt::layer().json().with_ansi(false).with_writer(file))
                    .try_init()?;
            } else {
                subscriber
                    .with(fmt::layer().with_ansi(false).with_writer(file))
                    .try_init()?;
            }
        }
    };

    Ok(())
}
