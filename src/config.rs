use anyhow::{Context, Result};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Bot registered by default, matching the travel booking bot's alias setup.
pub const DEFAULT_BOT: &str = "BookTripMOBILEHUB";

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Bot used when none is named on the command line
    pub default_bot: String,

    /// Per-request timeout for the bot runtime, in seconds
    pub request_timeout_secs: u64,

    /// Registered bots, keyed by the identifier passed to `BotClient::send`
    pub bots: HashMap<String, BotConfig>,

    /// UI preferences
    pub ui: UiConfig,

    /// Tripbot home directory
    #[serde(skip)]
    pub tripbot_home: PathBuf,
}

/// Registration of a single bot with the runtime service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    pub name: String,
    pub alias: String,
    pub region: String,

    /// Overrides the regional runtime URL (for proxies and tests)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Environment variable holding a bearer token for the runtime
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token_env: Option<String>,

    /// Inline bearer token; never written back by `save_to`
    #[serde(default, skip_serializing)]
    pub access_token: Option<SecretString>,
}

/// UI configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub title: String,
    pub greeting: String,
    pub bot_display_name: String,
}

impl Default for UiConfig {
    fn default() -> Self {
        UiConfig {
            title: "Welcome to my travel bot!".to_string(),
            greeting: "Hello, how can I help you today?".to_string(),
            bot_display_name: "AWS Chatbot".to_string(),
        }
    }
}

impl Default for BotConfig {
    fn default() -> Self {
        BotConfig {
            name: DEFAULT_BOT.to_string(),
            alias: "$LATEST".to_string(),
            region: "us-east-1".to_string(),
            endpoint: None,
            access_token_env: Some("TRIPBOT_ACCESS_TOKEN".to_string()),
            access_token: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let mut bots = HashMap::new();
        bots.insert(DEFAULT_BOT.to_string(), BotConfig::default());

        Config {
            default_bot: DEFAULT_BOT.to_string(),
            request_timeout_secs: 15,
            bots,
            ui: UiConfig::default(),
            tripbot_home: Self::default_home(),
        }
    }
}

impl Config {
    /// Load configuration from `~/.tripbot/config.toml`, or `path` when given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let tripbot_home = Self::default_home();
        let config_path = match path {
            Some(path) => path.to_path_buf(),
            None => tripbot_home.join("config.toml"),
        };

        let mut config = Self::load_from(&config_path)?;
        config.tripbot_home = tripbot_home;

        tracing::debug!(
            path = %config_path.display(),
            bots = config.bots.len(),
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Parse a config file, falling back to defaults when it does not exist
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file {}", config_path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", config_path.display()))?;
        Ok(config)
    }

    /// Save configuration to `path`, creating parent directories
    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)
                .context("Failed to create config directory")?;
        }
        let content = toml::to_string_pretty(self)
            .context("Failed to serialize config")?;
        fs::write(config_path, content)
            .context("Failed to write config file")?;
        Ok(())
    }

    pub fn config_path(&self) -> PathBuf {
        self.tripbot_home.join("config.toml")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.tripbot_home.join("logs")
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    /// Look up a registered bot
    pub fn bot(&self, name: &str) -> Option<&BotConfig> {
        self.bots.get(name)
    }

    /// `TRIPBOT_HOME`, else `~/.tripbot`
    fn default_home() -> PathBuf {
        if let Ok(home) = std::env::var("TRIPBOT_HOME") {
            return PathBuf::from(home);
        }
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".tripbot")
    }
}

impl BotConfig {
    /// Base URL of the runtime serving this bot
    pub fn runtime_endpoint(&self) -> String {
        match &self.endpoint {
            Some(endpoint) => endpoint.trim_end_matches('/').to_string(),
            None => format!("https://runtime.lex.{}.amazonaws.com", self.region),
        }
    }

    /// Get the bearer token from config or environment
    pub fn access_token(&self) -> Option<SecretString> {
        if let Some(token) = &self.access_token {
            if !token.expose_secret().is_empty() {
                return Some(token.clone());
            }
        }
        self.access_token_env
            .as_deref()
            .and_then(|var| std::env::var(var).ok())
            .filter(|token| !token.is_empty())
            .map(SecretString::from)
    }
}
