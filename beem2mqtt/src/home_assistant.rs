use crate::beem_api::BoxSummary;
use crate::home_assistant_config::{DeviceConfig, SensorConfig, Topics};
use crate::metric_collector::MetricCollector;
use crate::mqtt_config::MqttConfig;
use crate::mqtt_wrapper::{MqttWrapper, QoS};
use crate::telemetry::{normalize, Metric, SensorValue};

use log::{debug, error, info};

pub struct HomeAssistant<MQTT: MqttWrapper> {
    client: MQTT,
    topics: Topics,
}

impl<MQTT: MqttWrapper> HomeAssistant<MQTT> {
    pub fn new(config: &MqttConfig) -> Self {
        let client = MQTT::new(config, "-ha");
        Self::with_client(client, config.topics())
    }

    pub fn with_client(client: MQTT, topics: Topics) -> Self {
        Self { client, topics }
    }

    pub fn client(&self) -> &MQTT {
        &self.client
    }

    fn publish_retained(&mut self, topic: &str, payload: String) -> anyhow::Result<()> {
        debug!("Publishing to {topic} with payload {payload}");
        self.client.publish(topic, QoS::AtMostOnce, true, payload)
    }

    fn publish_sensor(
        &mut self,
        device_config: &DeviceConfig,
        metric: Metric,
        value: &SensorValue,
    ) {
        // the config lets home assistant know the sensor exists before its state arrives
        let sensor_config = SensorConfig::new(&self.topics, device_config, metric);
        let config_topic = self
            .topics
            .config_topic(device_config.device_id(), metric);
        let config_payload = match sensor_config.to_payload() {
            Ok(payload) => payload,
            Err(e) => {
                error!("failed to serialize discovery config {}: {e}", sensor_config.unique_id);
                return;
            }
        };
        if let Err(e) = self.publish_retained(&config_topic, config_payload) {
            error!("failed to publish discovery config to {config_topic}: {e:?}");
            return;
        }

        let state = value.to_string();
        if let Err(e) = self.publish_retained(&sensor_config.state_topic, state.clone()) {
            error!(
                "failed to publish state to {}: {e:?}",
                sensor_config.state_topic
            );
            return;
        }
        debug!("published {} = {} {}", metric.name(), state, metric.unit());
    }

    fn publish_box(&mut self, record: &BoxSummary) {
        info!("beem processing box {} (id {})", record.name, record.box_id);

        let device_config = DeviceConfig::for_box(record);
        for (metric, value) in normalize(record) {
            self.publish_sensor(&device_config, metric, &value);
        }

        info!(
            "data summary: current power {} W, daily production {} Wh, monthly production {} Wh, last alive {}, signal strength {} dBm",
            record.watt_hour, record.total_day, record.total_month, record.last_alive, record.last_dbm
        );
    }
}

impl<MQTT: MqttWrapper> MetricCollector for HomeAssistant<MQTT> {
    fn publish(&mut self, boxes: &[BoxSummary]) -> usize {
        if !self.client.is_connected() {
            error!("MQTT client not connected. Cannot publish data.");
            return 0;
        }

        for record in boxes {
            self.publish_box(record);
        }
        boxes.len()
    }
}
