//! Configuration management.
//!
//! TOML-backed configuration with serde, sensible defaults, and validation
//! at load time. Sections:
//!
//! - `[bot]` — platform credential, the privileged give user, the `tell`
//!   allow-list, and the environment flag that controls whether slash
//!   commands are re-synced at startup (dev only).
//! - `[storage]` — path to the SQLite database.
//! - `[logging]` — log level.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;

/// Core bot settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Chat-platform credential. Must be set before `start`.
    #[serde(default)]
    pub token: String,
    /// The one user permitted to use the give command.
    #[serde(default)]
    pub give_user: i64,
    /// Users permitted to use the tell command.
    #[serde(default)]
    pub authorized_users: Vec<i64>,
    /// "dev" re-syncs slash-command registration at startup; anything else
    /// leaves the platform-side registration untouched.
    #[serde(default = "default_environment")]
    pub environment: String,
}

fn default_environment() -> String {
    "prod".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite database path. Parent directories are created on open.
    pub database: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Base log level: error, warn, info, debug, trace.
    pub level: String,
}

/// Top-level configuration, one section per concern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub bot: BotConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bot: BotConfig {
                token: String::new(),
                give_user: 0,
                authorized_users: Vec::new(),
                environment: default_environment(),
            },
            storage: StorageConfig {
                database: "data/inventory.db".to_string(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
        }
    }
}

impl Config {
    /// Load and parse the configuration file.
    pub async fn load(path: &str) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("cannot read config file {}: {}", path, e))?;
        let config: Config = toml::from_str(&raw)?;
        Ok(config)
    }

    /// Write a starter configuration file.
    pub async fn create_default(path: &str) -> Result<()> {
        let serialized = toml::to_string_pretty(&Config::default())?;
        fs::write(path, serialized).await?;
        Ok(())
    }

    /// Checks needed before actually running the bot. `init` and `status`
    /// don't require a credential; `start` does.
    pub fn validate_for_start(&self) -> Result<()> {
        if self.bot.token.is_empty() {
            return Err(anyhow!("bot.token is missing; set it in the config file"));
        }
        if self.bot.give_user == 0 {
            log::warn!("bot.give_user is unset; the give command will reject everyone");
        }
        Ok(())
    }

    /// True when slash-command registration should be re-synced at startup.
    pub fn sync_commands(&self) -> bool {
        self.bot.environment == "dev"
    }
}
