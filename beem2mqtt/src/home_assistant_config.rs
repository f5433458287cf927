use crate::beem_api::BoxSummary;
use crate::telemetry::Metric;

use serde::Serialize;

static MANUFACTURER: &str = "Beem Energy";
static MODEL: &str = "Solar Panel";
static SW_VERSION: &str = "1.0";

pub const DEFAULT_PREFIX: &str = "homeassistant";

/// Stable Home Assistant identifier for a box.
pub fn device_id(record: &BoxSummary) -> String {
    format!("beem_energy_{}", record.serial_number.to_lowercase())
}

/// Topics under which a box publishes its sensors.
#[derive(Clone, Debug)]
pub struct Topics {
    discovery_prefix: String,
    base_topic: String,
}

impl Topics {
    pub fn new(discovery_prefix: &str, base_topic: &str) -> Self {
        Self {
            discovery_prefix: discovery_prefix.to_string(),
            base_topic: base_topic.to_string(),
        }
    }

    pub fn config_topic(&self, device_id: &str, metric: Metric) -> String {
        format!(
            "{}/sensor/{}/{}/config",
            self.discovery_prefix,
            device_id,
            metric.key()
        )
    }

    pub fn state_topic(&self, device_id: &str, metric: Metric) -> String {
        format!(
            "{}/sensor/{}/{}/state",
            self.base_topic,
            device_id,
            metric.key()
        )
    }
}

impl Default for Topics {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIX, DEFAULT_PREFIX)
    }
}

/// `DeviceConfig` is used to define the configuration for a Home Assistant device
/// in the MQTT discovery protocol and is used to group entities together.
///
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct DeviceConfig {
    identifiers: Vec<String>,
    name: String,
    manufacturer: String,
    model: String,
    sw_version: String, // Software version of the application that supplies the discovered MQTT item.
}

impl DeviceConfig {
    pub fn new(device_id: &str, name: &str) -> Self {
        Self {
            identifiers: Vec::from([device_id.to_string()]),
            name: name.to_string(),
            manufacturer: MANUFACTURER.to_string(),
            model: MODEL.to_string(),
            sw_version: SW_VERSION.to_string(),
        }
    }

    pub fn for_box(record: &BoxSummary) -> Self {
        Self::new(&device_id(record), &format!("Beem Energy {}", record.name))
    }

    pub fn device_id(&self) -> &str {
        &self.identifiers[0]
    }
}

/// `SensorConfig` is used to define the configuration for a Home Assistant sensor entity
/// in the MQTT discovery protocol.
///
/// More information about the MQTT discovery protocol can be found here:
/// https://www.home-assistant.io/docs/mqtt/discovery/
///
/// More information about the Home assistant sensor entities can be found here:
/// https://developers.home-assistant.io/docs/core/entity/sensor/
///
#[derive(Serialize, Debug, PartialEq)]
pub struct SensorConfig {
    name: String,          // The name of the sensor.
    pub unique_id: String, // A globally unique identifier for the sensor.
    device: DeviceConfig, // The device that the sensor belongs to, used to group entities together.
    pub state_topic: String, // The MQTT topic where sensor readings will be published.
    unit_of_measurement: String,
    device_class: String, // The type/class of the sensor, e.g. energy, power, duration, etc.
    state_class: String,  // The type/class of the state, e.g. measurement, total_increasing, etc.
    icon: String,
    // exclude optional if they are not provided
    #[serde(skip_serializing_if = "Option::is_none")]
    entity_category: Option<String>,
}

impl SensorConfig {
    pub fn new(topics: &Topics, device_config: &DeviceConfig, metric: Metric) -> Self {
        let device_id = device_config.device_id();
        SensorConfig {
            name: metric.name().to_string(),
            unique_id: format!("{}_{}", device_id, metric.key()),
            device: device_config.clone(),
            state_topic: topics.state_topic(device_id, metric),
            unit_of_measurement: metric.unit().to_string(),
            device_class: metric.device_class().to_string(),
            state_class: metric.state_class().to_string(),
            icon: metric.icon().to_string(),
            entity_category: metric.entity_category().map(str::to_string),
        }
    }

    pub fn to_payload(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
