use crate::home_assistant_config::{Topics, DEFAULT_PREFIX};

use serde_derive::Deserialize;

#[derive(Clone, Debug, Default, Deserialize)]
pub struct MqttConfig {
    #[serde(default)]
    pub host: String,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub client_id: Option<String>,
    pub tls: Option<bool>,
    pub discovery_prefix: Option<String>,
    pub base_topic: Option<String>,
}

impl MqttConfig {
    pub fn is_valid(&self) -> bool {
        !self.host.is_empty()
    }

    pub fn uses_tls(&self) -> bool {
        self.tls.is_some_and(|tls| tls)
    }

    pub fn port_or_default(&self) -> u16 {
        self.port.unwrap_or(if self.uses_tls() { 8883 } else { 1883 })
    }

    pub fn topics(&self) -> Topics {
        Topics::new(
            self.discovery_prefix.as_deref().unwrap_or(DEFAULT_PREFIX),
            self.base_topic.as_deref().unwrap_or(DEFAULT_PREFIX),
        )
    }
}
