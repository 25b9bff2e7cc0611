use std::fmt;

use serde::Deserialize;

/// Top-level configuration settings for the application.
///
/// Includes settings for the HTTP server, the message broker and logging.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Settings {
    pub server: ServerSettings,
    pub broker: BrokerSettings,
    pub log: LogSettings,
}

/// Configuration settings for the HTTP server.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Human readable line printed at startup.
    pub description: String,
    /// Largest request body `/pub/{topic}/` will read.
    pub max_body_bytes: usize,
}

/// Configuration settings for the in-memory broker.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct BrokerSettings {
    pub max_subscribers_per_topic: usize,
    pub message_ttl_secs: u64,
    pub max_messages_per_topic: usize,
    /// Directory of the sled store. Messages are not persisted when unset.
    pub persistence_path: Option<String>,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct LogSettings {
    pub level: String,
}

/// Partial configuration settings loaded from files or environment.
///
/// Missing values are filled in from `Settings::default()`.
#[derive(Debug, Default, Deserialize)]
pub struct PartialSettings {
    pub server: Option<PartialServerSettings>,
    pub broker: Option<PartialBrokerSettings>,
    pub log: Option<PartialLogSettings>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PartialServerSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub description: Option<String>,
    pub max_body_bytes: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PartialBrokerSettings {
    pub max_subscribers_per_topic: Option<usize>,
    pub message_ttl_secs: Option<u64>,
    pub max_messages_per_topic: Option<usize>,
    pub persistence_path: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PartialLogSettings {
    pub level: Option<String>,
}

impl Settings {
    /// The `host:port` pair the HTTP server binds to.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl PartialSettings {
    /// Overlays the values that were provided onto `defaults`.
    pub fn merge(self, defaults: Settings) -> Settings {
        let server = self.server.unwrap_or_default();
        let broker = self.broker.unwrap_or_default();
        let log = self.log.unwrap_or_default();

        Settings {
            server: ServerSettings {
                host: server.host.unwrap_or(defaults.server.host),
                port: server.port.unwrap_or(defaults.server.port),
                description: server.description.unwrap_or(defaults.server.description),
                max_body_bytes: server
                    .max_body_bytes
                    .unwrap_or(defaults.server.max_body_bytes),
            },
            broker: BrokerSettings {
                max_subscribers_per_topic: broker
                    .max_subscribers_per_topic
                    .unwrap_or(defaults.broker.max_subscribers_per_topic),
                message_ttl_secs: broker
                    .message_ttl_secs
                    .unwrap_or(defaults.broker.message_ttl_secs),
                max_messages_per_topic: broker
                    .max_messages_per_topic
                    .unwrap_or(defaults.broker.max_messages_per_topic),
                persistence_path: broker.persistence_path.or(defaults.broker.persistence_path),
            },
            log: LogSettings {
                level: log.level.unwrap_or(defaults.log.level),
            },
        }
    }
}

/// Provides default values for `Settings`.
impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                host: "127.0.0.1".to_string(),
                port: 8080,
                description: "senkyou pub/sub over http".to_string(),
                max_body_bytes: 2 * 1024 * 1024,
            },
            broker: BrokerSettings {
                max_subscribers_per_topic: 1000,
                message_ttl_secs: 3600,
                max_messages_per_topic: 1000,
                persistence_path: None,
            },
            log: LogSettings {
                level: "info".to_string(),
            },
        }
    }
}

impl fmt::Display for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.server.description)?;
        writeln!(f, "  listen address: {}", self.listen_addr())?;
        writeln!(f, "  max body bytes: {}", self.server.max_body_bytes)?;
        writeln!(
            f,
            "  max subscribers per topic: {}",
            self.broker.max_subscribers_per_topic
        )?;
        match &self.broker.persistence_path {
            Some(path) => write!(
                f,
                "  persistence: {path} (ttl {}s, keep {} per topic)",
                self.broker.message_ttl_secs, self.broker.max_messages_per_topic
            ),
            None => write!(f, "  persistence: disabled"),
        }
    }
}
