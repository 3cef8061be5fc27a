use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::services::alerts::ALERT_CHANNEL;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub blockchain: BlockchainSettings,
    pub store: StoreSettings,
    #[serde(default)]
    pub notifications: NotificationSettings,
    pub logging: LoggingSettings,
    pub routing_file: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockchainSettings {
    pub rpc_url: String,
    /// Relayer key used to sign `rebalance()` calls.
    pub relayer_private_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSettings {
    /// Falls back to an in-memory store when unset.
    pub redis_url: Option<String>,
    pub namespace: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationSettings {
    /// Webhook URL of the `seamless-alerts` channel.
    pub alert_webhook_url: Option<String>,
    /// Additional channels, alias to webhook URL.
    #[serde(default)]
    pub channels: HashMap<String, String>,
}

impl NotificationSettings {
    pub fn channel_urls(&self) -> HashMap<String, String> {
        let mut channels = self.channels.clone();
        if let Some(url) = &self.alert_webhook_url {
            channels.insert(ALERT_CHANNEL.to_string(), url.clone());
        }
        channels
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    pub level: String,
    pub json: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            server: ServerSettings::default(),
            blockchain: BlockchainSettings::default(),
            store: StoreSettings::default(),
            notifications: NotificationSettings::default(),
            logging: LoggingSettings::default(),
            routing_file: "config/routing.toml".to_string(),
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        ServerSettings {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for BlockchainSettings {
    fn default() -> Self {
        BlockchainSettings {
            rpc_url: "http://localhost:8545".to_string(),
            relayer_private_key: None,
        }
    }
}

impl Default for StoreSettings {
    fn default() -> Self {
        StoreSettings {
            redis_url: None,
            namespace: "keeper".to_string(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        LoggingSettings {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl Settings {
    /// Defaults, overridden by an optional `keeper.toml` and then by
    /// `KEEPER__SECTION__FIELD` environment variables.
    pub fn new() -> Result<Self, config::ConfigError> {
        Self::load(config::Environment::with_prefix("KEEPER").separator("__"))
    }

    pub fn load<S>(environment: S) -> Result<Self, config::ConfigError>
    where
        S: config::Source + Send + Sync + 'static,
    {
        let defaults = Settings::default();

        config::Config::builder()
            .set_default("server.host", defaults.server.host)?
            .set_default("server.port", defaults.server.port as i64)?
            .set_default("blockchain.rpc_url", defaults.blockchain.rpc_url)?
            .set_default("store.namespace", defaults.store.namespace)?
            .set_default("logging.level", defaults.logging.level)?
            .set_default("logging.json", defaults.logging.json)?
            .set_default("routing_file", defaults.routing_file)?
            .add_source(config::File::with_name("keeper").required(false))
            .add_source(environment)
            .build()?
            .try_deserialize()
    }
}
