use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the chat service (bootstrap + message endpoints)
    pub api_base_url: String,

    /// Base URL of the upstream assistant API (used by `serve`)
    pub assistant_base_url: String,

    /// API key for the upstream assistant API
    pub assistant_api_key: Option<String>,

    /// Address the bootstrap endpoint binds to
    pub bind_addr: String,

    /// Parley home directory
    pub parley_home: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("~"));
        let parley_home = home.join(".parley");

        Config {
            api_base_url: "http://127.0.0.1:8700".to_string(),
            assistant_base_url: "https://api.openai.com/v1".to_string(),
            assistant_api_key: None,
            bind_addr: "127.0.0.1:8700".to_string(),
            parley_home,
        }
    }
}

impl Config {
    /// Load configuration from ~/.parley/config.toml, writing the
    /// defaults on first run.
    pub fn load() -> Result<Self> {
        let home = dirs::home_dir().context("Could not find home directory")?;
        let parley_home = home.join(".parley");
        let config_path = parley_home.join("config.toml");

        fs::create_dir_all(&parley_home).context("Failed to create .parley directory")?;

        if config_path.exists() {
            let content =
                fs::read_to_string(&config_path).context("Failed to read config file")?;
            let mut config: Config =
                toml::from_str(&content).context("Failed to parse config file")?;
            config.parley_home = parley_home;
            Ok(config)
        } else {
            let mut config = Config::default();
            config.parley_home = parley_home;
            config.save()?;
            Ok(config)
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let config_path = self.parley_home.join("config.toml");
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&config_path, content).context("Failed to write config file")?;
        Ok(())
    }

    /// URL of the thread bootstrap endpoint
    pub fn thread_url(&self) -> String {
        format!("{}/api/thread", self.api_base_url.trim_end_matches('/'))
    }

    /// URL of the message endpoint, scoped by thread identifier
    pub fn message_url(&self, thread_id: &str) -> String {
        format!(
            "{}/api/chat/{}",
            self.api_base_url.trim_end_matches('/'),
            thread_id
        )
    }

    /// Get API key from config or environment
    pub fn api_key(&self) -> Option<String> {
        self.assistant_api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
    }

    /// Directory holding locally cached payloads
    pub fn store_dir(&self) -> PathBuf {
        self.parley_home.join("store")
    }

    /// Diagnostics log written while the chat view owns the terminal
    pub fn log_path(&self) -> PathBuf {
        self.parley_home.join("parley.log")
    }
}
