use beem2mqtt::{
    beem_api::BoxSummary,
    home_assistant::HomeAssistant,
    metric_collector::MetricCollector,
    mqtt_config::MqttConfig,
    mqtt_wrapper::{MqttWrapper, QoS},
};
use chrono::{Duration, Utc};

struct MqttTester {
    published_values: Vec<(String, Vec<u8>)>,
    retained: Vec<bool>,
}

impl MqttTester {
    pub fn len(&self) -> usize {
        self.published_values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn payload_for(&self, topic: &str) -> Option<String> {
        self.published_values
            .iter()
            .rev()
            .find(|(t, _)| t == topic)
            .map(|(_, payload)| String::from_utf8_lossy(payload).into_owned())
    }
}

impl MqttWrapper for MqttTester {
    fn publish<S, V>(&mut self, topic: S, _qos: QoS, retain: bool, payload: V) -> anyhow::Result<()>
    where
        S: Into<String>,
        V: Into<Vec<u8>>,
    {
        self.published_values.push((topic.into(), payload.into()));
        self.retained.push(retain);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        true
    }

    fn new(_config: &MqttConfig, _suffix: &str) -> Self {
        Self {
            published_values: Vec::new(),
            retained: Vec::new(),
        }
    }
}

fn test_config() -> MqttConfig {
    MqttConfig {
        host: "frob".to_owned(),
        port: Some(1234),
        client_id: Some("myclient".to_string()),
        ..Default::default()
    }
}

fn box_summary(serial_number: &str, name: &str) -> BoxSummary {
    let five_seconds_ago = (Utc::now() - Duration::seconds(5)).to_rfc3339();
    BoxSummary {
        box_id: 7,
        name: name.to_string(),
        serial_number: serial_number.to_string(),
        watt_hour: 450,
        total_day: 1200,
        total_month: 34000,
        last_dbm: -62,
        last_alive: five_seconds_ago.clone(),
        last_production: five_seconds_ago,
        ..Default::default()
    }
}

#[test]
fn one_box_publishes_retained_config_and_state_pairs() {
    let mut home_assistant = HomeAssistant::<MqttTester>::new(&test_config());
    assert!(home_assistant.client().is_empty());

    let published = home_assistant.publish(&[box_summary("ABC123", "Roof")]);
    assert_eq!(published, 1);

    let client = home_assistant.client();
    assert_eq!(client.len(), 12);
    assert!(client.retained.iter().all(|retain| *retain));
    for pair in client.published_values.chunks(2) {
        let (config_topic, state_topic) = (&pair[0].0, &pair[1].0);
        assert!(config_topic.ends_with("/config"), "{config_topic}");
        assert_eq!(
            config_topic.trim_end_matches("/config"),
            state_topic.trim_end_matches("/state")
        );
    }
    assert_eq!(
        client
            .payload_for("homeassistant/sensor/beem_energy_abc123/power/state")
            .as_deref(),
        Some("450")
    );
}

#[test]
fn every_box_gets_its_own_device() {
    let mut home_assistant = HomeAssistant::<MqttTester>::new(&test_config());
    let published =
        home_assistant.publish(&[box_summary("ABC123", "Roof"), box_summary("XyZ9", "Garage")]);
    assert_eq!(published, 2);

    let client = home_assistant.client();
    assert_eq!(client.len(), 24);

    let garage: serde_json::Value = serde_json::from_str(
        &client
            .payload_for("homeassistant/sensor/beem_energy_xyz9/power/config")
            .unwrap(),
    )
    .unwrap();
    assert_eq!(garage["device"]["name"], "Beem Energy Garage");
    assert_eq!(garage["device"]["identifiers"][0], "beem_energy_xyz9");
    assert_eq!(
        client
            .payload_for("homeassistant/sensor/beem_energy_abc123/energy_month/state")
            .as_deref(),
        Some("34000")
    );
}

#[test]
fn discovery_documents_are_stable_between_cycles() {
    let mut home_assistant = HomeAssistant::<MqttTester>::new(&test_config());
    let record = box_summary("ABC123", "Roof");
    home_assistant.publish(std::slice::from_ref(&record));
    home_assistant.publish(std::slice::from_ref(&record));

    let configs: Vec<&(String, Vec<u8>)> = home_assistant
        .client()
        .published_values
        .iter()
        .filter(|(topic, _)| topic.ends_with("/config"))
        .collect();
    assert_eq!(configs.len(), 12);
    let (first, second) = configs.split_at(6);
    assert_eq!(first, second);
}
