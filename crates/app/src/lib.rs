//! Balance App
//!
//! Unified initialization for the balance manager: logging + keypair +
//! settings, plus the manager itself and the cluster backends it runs on.

pub mod config;
pub mod display;
pub mod local;
pub mod manager;

use std::path::{Path, PathBuf};

use balance_crypto::SigningKeypair;
use balance_logging::LogLevel;
use balance_settings::{Settings, SettingsError};
use thiserror::Error;
use tracing::{info, warn};

pub use config::ClientConfig;
pub use display::AccountReport;
pub use local::LocalCluster;
pub use manager::{BalanceManager, ManagerError};

/// Service name used for the settings directory.
pub const SERVICE: &str = "balance-manager";

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Settings error: {0}")]
    SettingsError(#[from] SettingsError),
    #[error("Keystore error: {0}")]
    KeystoreError(#[from] balance_keystore::KeystoreError),
}

/// Initialized application context
pub struct App {
    pub keypair: SigningKeypair,
    pub settings: Settings<ClientConfig>,
}

impl App {
    pub fn config(&self) -> &ClientConfig {
        &self.settings.config
    }
}

/// What to do when the keypair file does not exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingKeypair {
    #[default]
    Fail,
    /// Generate a keypair and save it to the path.
    Generate,
    /// Use a fresh in-memory keypair for this run only.
    Ephemeral,
}

/// Builder for constructing an App with configurable options.
pub struct AppBuilder {
    service: String,
    log_level: LogLevel,
    skip_logging: bool,
    skip_banner: bool,
    config_path: Option<PathBuf>,
    keypair_path: Option<PathBuf>,
    missing_keypair: MissingKeypair,
}

impl AppBuilder {
    pub fn new(service: &str) -> Self {
        Self {
            service: service.to_string(),
            log_level: LogLevel::Info,
            skip_logging: false,
            skip_banner: false,
            config_path: None,
            keypair_path: None,
            missing_keypair: MissingKeypair::Fail,
        }
    }

    pub fn log_level(mut self, level: LogLevel) -> Self {
        self.log_level = level;
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.log_level = LogLevel::from_verbose(verbose);
        self
    }

    pub fn skip_logging(mut self) -> Self {
        self.skip_logging = true;
        self
    }

    pub fn skip_banner(mut self) -> Self {
        self.skip_banner = true;
        self
    }

    pub fn config_path(mut self, path: &Path) -> Self {
        self.config_path = Some(path.to_path_buf());
        self
    }

    /// Use this keypair file instead of the one named in the settings.
    pub fn keypair_path(mut self, path: &Path) -> Self {
        self.keypair_path = Some(path.to_path_buf());
        self
    }

    pub fn on_missing_keypair(mut self, policy: MissingKeypair) -> Self {
        self.missing_keypair = policy;
        self
    }

    pub fn build(self) -> Result<App, AppError> {
        if !self.skip_logging {
            let _ = balance_logging::try_init(self.log_level);
        }

        let settings: Settings<ClientConfig> =
            Settings::load_or_default(&self.service, self.config_path.as_deref())?;

        let key_path = self
            .keypair_path
            .unwrap_or_else(|| settings.config.keypair_path());
        let keypair = match (key_path.exists(), self.missing_keypair) {
            (true, _) | (false, MissingKeypair::Fail) => balance_keystore::load_keypair(&key_path)?,
            (false, MissingKeypair::Generate) => balance_keystore::load_or_generate_keypair(&key_path)?,
            (false, MissingKeypair::Ephemeral) => {
                warn!(path = %key_path.display(), "keypair file missing, using an ephemeral keypair");
                SigningKeypair::generate()
            }
        };

        if !self.skip_banner {
            info!(
                service = %self.service,
                version = env!("CARGO_PKG_VERSION"),
                pubkey = %keypair.pubkey(),
                settings = %settings.path().display(),
                "starting"
            );
        }

        Ok(App { keypair, settings })
    }
}
