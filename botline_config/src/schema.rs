use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment variable that overrides `relay.secret` from the config file.
pub const SECRET_ENV_VAR: &str = "BOTLINE_SECRET";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    pub relay: RelayConfig,
    #[serde(default)]
    pub console: ConsoleConfig,
}

/// Connection settings for the conversation-relay service.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RelayConfig {
    #[serde(default = "RelayConfig::default_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub secret: String,
    /// Bot identifier, used only by the filter-by-sender rendering option.
    #[serde(default)]
    pub bot_id: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            endpoint: Self::default_endpoint(),
            secret: String::new(),
            bot_id: String::new(),
        }
    }
}

impl RelayConfig {
    fn default_endpoint() -> String {
        "https://directline.botframework.com".to_string()
    }
}

/// Behavior of the interactive console loop.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ConsoleConfig {
    /// Sender label attached to every outbound message.
    #[serde(default = "ConsoleConfig::default_from_user")]
    pub from_user: String,
    /// Standalone input line that ends the session.
    #[serde(default = "ConsoleConfig::default_exit_phrase")]
    pub exit_phrase: String,
    /// Streaming transport: "callback" or "socket".
    #[serde(default = "ConsoleConfig::default_transport")]
    pub transport: String,
    /// Render inbound entries as `<id>\t<text>` without type filtering.
    #[serde(default)]
    pub debug_render: bool,
    /// Only render activities whose sender matches `relay.bot_id`.
    #[serde(default)]
    pub only_from_bot: bool,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            from_user: Self::default_from_user(),
            exit_phrase: Self::default_exit_phrase(),
            transport: Self::default_transport(),
            debug_render: false,
            only_from_bot: false,
        }
    }
}

impl ConsoleConfig {
    fn default_from_user() -> String {
        "botline console".to_string()
    }

    fn default_exit_phrase() -> String {
        "bye".to_string()
    }

    fn default_transport() -> String {
        "callback".to_string()
    }
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let config_dir = dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("Cannot find home directory"))?
            .join("botline");

        let config_path = config_dir.join("config.json");

        if !config_path.exists() {
            anyhow::bail!(
                "Config file not found at: {}. Please run 'botline init' to create config.",
                config_path.display()
            );
        }

        let content = std::fs::read_to_string(&config_path)?;
        let mut config: Self = serde_json::from_str(&content)?;

        if let Ok(secret) = std::env::var(SECRET_ENV_VAR) {
            if !secret.is_empty() {
                config.relay.secret = secret;
            }
        }

        Ok(config)
    }

    pub fn ensure_config_dir() -> anyhow::Result<PathBuf> {
        let config_dir = dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("Cannot find home directory"))?
            .join("botline");

        std::fs::create_dir_all(&config_dir)?;
        Ok(config_dir)
    }

    pub fn create_config() -> anyhow::Result<()> {
        let config_dir = Self::ensure_config_dir()?;
        let config_path = config_dir.join("config.json");

        if config_path.exists() {
            anyhow::bail!(
                "Config file already exists at: {}. Please edit it directly.",
                config_path.display()
            );
        }

        let config_template = r#"{
  "relay": {
    "endpoint": "https://directline.botframework.com",
    "secret": "your-relay-secret-here",
    "bot_id": ""
  },
  "console": {
    "from_user": "botline console",
    "exit_phrase": "bye",
    "transport": "callback",
    "debug_render": false,
    "only_from_bot": false
  }
}"#;

        std::fs::write(&config_path, config_template)?;

        println!("✅ Created config file at: {}", config_path.display());
        println!();
        println!("📝 Next steps:");
        println!("   1. Edit the config file and add your relay secret");
        println!("      (or export it as {SECRET_ENV_VAR})");
        println!("   2. Run 'botline chat' to start a conversation");
        println!();
        println!("🔧 Configuration options:");
        println!("   - console.transport: \"callback\" (managed) or \"socket\" (raw WebSocket)");
        println!("   - console.exit_phrase: input line that ends the session");
        println!("   - console.debug_render: print raw <id>\\t<text> lines instead");
        println!();
        Ok(())
    }
}
