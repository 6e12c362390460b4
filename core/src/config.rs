//! Configuration management

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

/// Bot configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server to connect to
    pub server: ServerConfig,
    /// Identity and channels
    pub bot: BotConfig,
    /// Per-module settings, keyed by module name
    pub modules: HashMap<String, Value>,
}

/// Connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server hostname
    pub host: String,
    /// Server port
    pub port: u16,
    /// CA certificate used to verify the server; enables TLS when set
    pub ca_file: Option<String>,
    /// Client certificate for mutual TLS
    pub cert_file: Option<String>,
    /// Private key belonging to `cert_file`
    pub key_file: Option<String>,
}

/// Identity of the bot on the network
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    /// Nickname
    pub nick: String,
    /// Real name shown in WHOIS
    pub name: String,
    /// Channels joined after the welcome reply, in this order
    pub channels: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "irc.libera.chat".to_string(),
            port: 6667,
            ca_file: None,
            cert_file: None,
            key_file: None,
        }
    }
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            nick: "marvin".to_string(),
            name: "Marvin the Paranoid Android".to_string(),
            channels: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// Whether the connection is made over TLS
    pub fn use_tls(&self) -> bool {
        self.ca_file.is_some()
    }
}

impl Config {
    /// Load configuration from file
    ///
    /// Files ending in `.json` are read as JSON, everything else as TOML.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config_path = path.as_ref();
        let content = std::fs::read_to_string(config_path)
            .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;

        let is_json = config_path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        let config = if is_json {
            serde_json::from_str(&content)
                .map_err(|e| Error::Config(format!("Failed to parse config file: {}", e)))?
        } else {
            toml::from_str(&content)
                .map_err(|e| Error::Config(format!("Failed to parse config file: {}", e)))?
        };

        Ok(config)
    }

    /// Save configuration to file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| Error::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.host.is_empty() {
            return Err(Error::Config("Server host cannot be empty".to_string()));
        }

        if self.server.port == 0 {
            return Err(Error::Config("Port cannot be 0".to_string()));
        }

        match (&self.server.cert_file, &self.server.key_file) {
            (Some(_), None) => {
                return Err(Error::Config("Client certificate given without a key file".to_string()));
            }
            (None, Some(_)) => {
                return Err(Error::Config("Client key given without a certificate file".to_string()));
            }
            (Some(_), Some(_)) if !self.server.use_tls() => {
                return Err(Error::Config("Client certificates require a CA file".to_string()));
            }
            _ => {}
        }

        if self.bot.nick.is_empty() || self.bot.nick.contains([' ', ',', '*', '?', '!', '@']) {
            return Err(Error::Config(format!("Invalid nickname {:?}", self.bot.nick)));
        }

        for channel in &self.bot.channels {
            if !channel.starts_with(['#', '&']) || channel.contains([' ', ',', '\x07']) {
                return Err(Error::Config(format!("Invalid channel name {:?}", channel)));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert!(!config.server.use_tls());
    }

    #[test]
    fn test_parse_toml_with_module_fragments() {
        let config: Config = toml::from_str(
            r##"
            [server]
            host = "irc.hackint.org"
            port = 6697
            ca_file = "/etc/ssl/hackint.pem"

            [bot]
            nick = "marvin"
            channels = ["#a", "#b"]

            [modules.url]
            exclude = ["example.org"]
            "##,
        )
        .unwrap();

        assert_eq!(config.server.port, 6697);
        assert!(config.server.use_tls());
        assert_eq!(config.bot.channels, vec!["#a", "#b"]);
        assert_eq!(config.bot.name, "Marvin the Paranoid Android");
        assert_eq!(config.modules["url"]["exclude"][0], "example.org");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.bot.channels = vec!["nochan".to_string()];
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.server.cert_file = Some("client.pem".to_string());
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.server.port = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.bot.nick = "with space".to_string();
        assert!(config.validate().is_err());
    }
}
