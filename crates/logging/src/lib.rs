//! Balance Logging
//!
//! One-call `tracing` subscriber setup. `RUST_LOG` wins over the level
//! passed in when it is set.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log verbosity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// `-v` maps to debug, otherwise info.
    pub fn from_verbose(verbose: bool) -> Self {
        if verbose {
            Self::Debug
        } else {
            Self::Info
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }

    /// Filter directive: the chosen level for our crates, warnings for dependencies.
    pub fn directive(&self) -> String {
        format!(
            "warn,balance_core={0},balance_crypto={0},balance_keystore={0},balance_settings={0},balance_program={0},balance_rpc={0},balance_app={0},balance_cli={0}",
            self.as_str()
        )
    }
}

/// Install the global subscriber. Fails if one is already installed.
pub fn try_init(level: LogLevel) -> Result<(), tracing_subscriber::util::TryInitError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.directive()));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_writer(std::io::stderr),
        )
        .try_init()?;
    tracing::debug!(level = level.as_str(), "logging initialized");
    Ok(())
}
