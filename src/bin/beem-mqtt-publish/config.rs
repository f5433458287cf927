use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{bail, Context};
use beem2mqtt::{beem_api, beem_api::Credentials, mqtt_config::MqttConfig};
use log::{info, warn};
use serde_derive::Deserialize;

use crate::supervisor::{self, BrokerInfo};

static CONFIG_FILE: &str = "config.toml";
static ADDON_OPTIONS_FILE: &str = "/data/options.json";
const REFRESH_INTERVAL_DEFAULT_MINUTES: u64 = 5;

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub beem_email: String,
    #[serde(default)]
    pub beem_password: String,
    pub api_base_url: Option<String>,
    pub start_delay_seconds: Option<u64>,
    pub debug: Option<bool>,
    pub refresh_interval: Option<u64>,
    pub mqtt: Option<MqttConfig>,
}

/// Options as written by the Home Assistant add-on runtime.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AddonOptions {
    beem_email: String,
    beem_password: String,
    start_delayseconds: u64,
    debug: bool,
    refresh_interval: u64,
    override_mqtt_server: String,
    override_mqtt_port: u16,
    override_mqtt_username: String,
    override_mqtt_password: String,
}

impl From<AddonOptions> for Config {
    // empty overrides and zero values mean "not set"
    fn from(options: AddonOptions) -> Self {
        let non_empty = |value: String| Some(value).filter(|value| !value.is_empty());
        let mqtt = MqttConfig {
            host: options.override_mqtt_server,
            port: Some(options.override_mqtt_port).filter(|port| *port != 0),
            username: non_empty(options.override_mqtt_username),
            password: non_empty(options.override_mqtt_password),
            ..Default::default()
        };
        let has_mqtt = mqtt.is_valid()
            || mqtt.port.is_some()
            || mqtt.username.is_some()
            || mqtt.password.is_some();

        Config {
            beem_email: options.beem_email,
            beem_password: options.beem_password,
            api_base_url: None,
            start_delay_seconds: Some(options.start_delayseconds),
            debug: Some(options.debug),
            refresh_interval: Some(options.refresh_interval).filter(|minutes| *minutes != 0),
            mqtt: has_mqtt.then_some(mqtt),
        }
    }
}

impl Config {
    /// Read the add-on options or `config.toml`, apply environment overrides and,
    /// inside a Home Assistant add-on, complete the broker settings from the Supervisor.
    pub fn load() -> anyhow::Result<Config> {
        let addon_options = Path::new(ADDON_OPTIONS_FILE);
        let mut config = if addon_options.exists() {
            info!("loading add-on options from {ADDON_OPTIONS_FILE}");
            let contents = fs::read_to_string(addon_options)
                .with_context(|| format!("Could not read {ADDON_OPTIONS_FILE}"))?;
            Config::from_addon_options(&contents)?
        } else if let Some(path) = config_path() {
            info!("loading configuration from {}", path.display());
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Could not read {}", path.display()))?;
            Config::from_toml(&contents)?
        } else {
            warn!("neither {ADDON_OPTIONS_FILE} nor {CONFIG_FILE} found, relying on environment variables");
            Config::default()
        };

        config.apply_env(|key| env::var(key).ok());

        if let Ok(supervisor_token) = env::var("SUPERVISOR_TOKEN") {
            match supervisor::discover_broker(&supervisor_token) {
                Ok(broker) => config.apply_broker(broker),
                Err(e) => warn!("error retrieving MQTT info from the supervisor: {e:#}"),
            }
        }

        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(contents: &str) -> anyhow::Result<Config> {
        toml::from_str(contents).context("toml config unparsable")
    }

    pub fn from_addon_options(contents: &str) -> anyhow::Result<Config> {
        let options: AddonOptions =
            serde_json::from_str(contents).context("add-on options unparsable")?;
        Ok(options.into())
    }

    /// Overwrite fields from environment variables, if set.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(email) = lookup("BEEM_EMAIL") {
            self.beem_email = email;
        }
        if let Some(password) = lookup("BEEM_PASSWORD") {
            self.beem_password = password;
        }
        // $MQTT_BROKER_HOST
        if let Some(host) = lookup("MQTT_BROKER_HOST") {
            self.mqtt.get_or_insert_with(MqttConfig::default).host = host;
        }
        // $MQTT_PORT (optional)
        if let Some(port) = lookup("MQTT_PORT") {
            match port.parse() {
                Ok(port) => self.mqtt.get_or_insert_with(MqttConfig::default).port = Some(port),
                Err(e) => warn!("ignoring MQTT_PORT={port}: {e}"),
            }
        }
        // $MQTT_USERNAME (optional)
        if let Some(username) = lookup("MQTT_USERNAME") {
            self.mqtt.get_or_insert_with(MqttConfig::default).username = Some(username);
        }
        // $MQTT_PASSWORD (optional)
        if let Some(password) = lookup("MQTT_PASSWORD") {
            self.mqtt.get_or_insert_with(MqttConfig::default).password = Some(password);
        }
    }

    /// Use the Supervisor's broker for every MQTT field not configured explicitly.
    pub fn apply_broker(&mut self, broker: BrokerInfo) {
        let configured = self.mqtt.take().unwrap_or_default();
        let non_empty = |value: Option<String>| value.filter(|value| !value.is_empty());

        self.mqtt = Some(MqttConfig {
            host: if configured.host.is_empty() {
                broker.host
            } else {
                configured.host
            },
            port: configured.port.or(Some(broker.port)),
            username: non_empty(configured.username).or(non_empty(broker.username)),
            password: non_empty(configured.password).or(non_empty(broker.password)),
            ..configured
        });
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.beem_email.is_empty() || self.beem_password.is_empty() {
            bail!("beem_email and beem_password must be configured");
        }
        if !self.mqtt.as_ref().is_some_and(|mqtt| mqtt.is_valid()) {
            bail!("no MQTT broker configured and none provided by the supervisor");
        }
        Ok(())
    }

    pub fn credentials(&self) -> Credentials {
        Credentials {
            email: self.beem_email.clone(),
            password: self.beem_password.clone(),
        }
    }

    pub fn api_base_url(&self) -> &str {
        self.api_base_url
            .as_deref()
            .unwrap_or(beem_api::DEFAULT_BASE_URL)
    }

    pub fn debug(&self) -> bool {
        self.debug.is_some_and(|debug| debug)
    }

    pub fn start_delay(&self) -> Duration {
        Duration::from_secs(self.start_delay_seconds.unwrap_or(0))
    }

    /// Minutes between two cycles, never less than one.
    pub fn refresh_interval(&self) -> Duration {
        let minutes = self
            .refresh_interval
            .unwrap_or(REFRESH_INTERVAL_DEFAULT_MINUTES)
            .max(1);
        Duration::from_secs(minutes * 60)
    }

    /// Human readable dump with credentials masked.
    pub fn redacted(&self) -> String {
        let mqtt = match &self.mqtt {
            Some(mqtt) => format!(
                "host={} port={} username={:?} password={} tls={}",
                mqtt.host,
                mqtt.port_or_default(),
                mqtt.username,
                if mqtt.password.is_some() { "xxxxxx" } else { "<none>" },
                mqtt.uses_tls()
            ),
            None => "<none>".to_string(),
        };
        format!(
            "beem_email={} beem_password=xxxxxx api_base_url={} start_delay={}s debug={} refresh_interval={}min mqtt=[{}]",
            mask_email(&self.beem_email),
            self.api_base_url(),
            self.start_delay().as_secs(),
            self.debug(),
            self.refresh_interval().as_secs() / 60,
            mqtt
        )
    }
}

fn mask_email(email: &str) -> String {
    email
        .chars()
        .map(|c| if c == '@' || c == '.' { c } else { 'x' })
        .collect()
}

// current working dir first, then next to the executable
fn config_path() -> Option<PathBuf> {
    let mut candidates = Vec::new();
    if let Ok(mut path) = env::current_dir() {
        path.push(CONFIG_FILE);
        candidates.push(path);
    }
    if let Ok(mut path) = env::current_exe() {
        path.pop();
        path.push(CONFIG_FILE);
        candidates.push(path);
    }
    candidates.into_iter().find(|path| path.exists())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const FULL: &str = r#"
        beem_email = "jane.doe@example.com"
        beem_password = "hunter2"
        start_delay_seconds = 10
        debug = true
        refresh_interval = 2

        [mqtt]
        host = "broker.local"
        port = 1884
        username = "beem"
        password = "mqtt-secret"
    "#;

    #[test]
    fn parses_full_config() {
        let config = Config::from_toml(FULL).unwrap();
        assert_eq!(config.beem_email, "jane.doe@example.com");
        assert!(config.debug());
        assert_eq!(config.start_delay(), Duration::from_secs(10));
        assert_eq!(config.refresh_interval(), Duration::from_secs(120));
        let mqtt = config.mqtt.as_ref().unwrap();
        assert_eq!(mqtt.host, "broker.local");
        assert_eq!(mqtt.port, Some(1884));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn applies_defaults() {
        let config = Config::from_toml("beem_email = \"a@b.c\"").unwrap();
        assert!(!config.debug());
        assert_eq!(config.start_delay(), Duration::ZERO);
        assert_eq!(config.refresh_interval(), Duration::from_secs(300));
        assert_eq!(config.api_base_url(), beem_api::DEFAULT_BASE_URL);
    }

    #[test]
    fn refresh_interval_is_at_least_a_minute() {
        let config = Config::from_toml("refresh_interval = 0").unwrap();
        assert_eq!(config.refresh_interval(), Duration::from_secs(60));
    }

    #[test]
    fn unparsable_config_is_an_error() {
        assert!(Config::from_toml("beem_email = ").is_err());
    }

    #[test]
    fn validation_requires_credentials_and_broker() {
        let mut config = Config::from_toml(FULL).unwrap();
        config.mqtt = None;
        assert!(config.validate().is_err());

        let mut config = Config::from_toml(FULL).unwrap();
        config.beem_password.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn environment_overrides_file() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("BEEM_EMAIL", "env@example.com"),
            ("MQTT_BROKER_HOST", "env-broker"),
            ("MQTT_PORT", "not-a-port"),
            ("MQTT_USERNAME", "env-user"),
        ]);
        let mut config = Config::from_toml(FULL).unwrap();
        config.apply_env(|key| env.get(key).map(|value| value.to_string()));

        assert_eq!(config.beem_email, "env@example.com");
        assert_eq!(config.beem_password, "hunter2");
        let mqtt = config.mqtt.unwrap();
        assert_eq!(mqtt.host, "env-broker");
        assert_eq!(mqtt.port, Some(1884));
        assert_eq!(mqtt.username.as_deref(), Some("env-user"));
    }

    #[test]
    fn explicit_mqtt_settings_override_the_supervisor() {
        let broker = BrokerInfo {
            host: "core-mosquitto".into(),
            port: 1883,
            username: Some("addons".into()),
            password: Some("addon-secret".into()),
            protocol: None,
        };

        let mut config = Config::from_toml("[mqtt]\nport = 1999\nusername = \"\"").unwrap();
        config.apply_broker(broker.clone());
        let mqtt = config.mqtt.unwrap();
        assert_eq!(mqtt.host, "core-mosquitto");
        assert_eq!(mqtt.port, Some(1999));
        assert_eq!(mqtt.username.as_deref(), Some("addons"));
        assert_eq!(mqtt.password.as_deref(), Some("addon-secret"));

        let mut config = Config::default();
        config.apply_broker(broker);
        assert_eq!(config.mqtt.unwrap().port, Some(1883));
    }

    const ADDON_OPTIONS: &str = r#"{
        "beem_email": "jane.doe@example.com",
        "beem_password": "hunter2",
        "start_delayseconds": 15,
        "debug": true,
        "refresh_interval": 10,
        "override_mqtt_server": "",
        "override_mqtt_port": 0,
        "override_mqtt_username": "",
        "override_mqtt_password": ""
    }"#;

    #[test]
    fn parses_addon_options() {
        let config = Config::from_addon_options(ADDON_OPTIONS).unwrap();
        assert_eq!(config.beem_email, "jane.doe@example.com");
        assert_eq!(config.beem_password, "hunter2");
        assert!(config.debug());
        assert_eq!(config.start_delay(), Duration::from_secs(15));
        assert_eq!(config.refresh_interval(), Duration::from_secs(600));
        assert!(config.mqtt.is_none());

        let mut config = config;
        config.apply_broker(BrokerInfo {
            host: "core-mosquitto".into(),
            port: 1883,
            username: Some("addons".into()),
            password: Some("addon-secret".into()),
            protocol: None,
        });
        assert!(config.validate().is_ok());
        assert_eq!(config.mqtt.unwrap().host, "core-mosquitto");
    }

    #[test]
    fn addon_overrides_take_precedence_over_the_supervisor() {
        let options = r#"{
            "beem_email": "a@b.c",
            "beem_password": "pw",
            "override_mqtt_server": "broker.lan",
            "override_mqtt_port": 1884,
            "override_mqtt_username": "beem",
            "override_mqtt_password": "mqtt-secret"
        }"#;
        let mut config = Config::from_addon_options(options).unwrap();
        assert_eq!(config.refresh_interval(), Duration::from_secs(300));
        config.apply_broker(BrokerInfo {
            host: "core-mosquitto".into(),
            port: 1883,
            username: Some("addons".into()),
            password: Some("addon-secret".into()),
            protocol: None,
        });

        let mqtt = config.mqtt.unwrap();
        assert_eq!(mqtt.host, "broker.lan");
        assert_eq!(mqtt.port, Some(1884));
        assert_eq!(mqtt.username.as_deref(), Some("beem"));
        assert_eq!(mqtt.password.as_deref(), Some("mqtt-secret"));
    }

    #[test]
    fn unparsable_addon_options_are_an_error() {
        assert!(Config::from_addon_options("{\"debug\": \"yes\"}").is_err());
    }

    #[test]
    fn redacted_dump_hides_secrets() {
        let dump = Config::from_toml(FULL).unwrap().redacted();
        assert!(dump.contains("beem_email=xxxx.xxx@xxxxxxx.xxx"));
        assert!(!dump.contains("hunter2"));
        assert!(!dump.contains("mqtt-secret"));
        assert!(!dump.contains("jane"));
    }
}
