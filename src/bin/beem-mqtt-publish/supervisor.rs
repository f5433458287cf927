use anyhow::{bail, Context};
use log::debug;
use serde_derive::Deserialize;

static SUPERVISOR_MQTT_URL: &str = "http://supervisor/services/mqtt";

/// Broker parameters published by the Home Assistant Supervisor MQTT service.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct BrokerInfo {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub protocol: Option<String>,
}

#[derive(Deserialize)]
struct ServiceResponse {
    result: String,
    data: Option<BrokerInfo>,
}

/// Ask the Supervisor where the MQTT broker lives.
pub fn discover_broker(supervisor_token: &str) -> anyhow::Result<BrokerInfo> {
    let response = reqwest::blocking::Client::new()
        .get(SUPERVISOR_MQTT_URL)
        .bearer_auth(supervisor_token)
        .header(reqwest::header::CONTENT_TYPE, "application/json")
        .send()
        .context("failed to reach the supervisor")?;

    let status = response.status().as_u16();
    let body = response.text()?;
    let broker = parse_service_response(status, &body)?;
    debug!(
        "MQTT service: host {}, port {}, username {:?}",
        broker.host, broker.port, broker.username
    );
    Ok(broker)
}

pub fn parse_service_response(status: u16, body: &str) -> anyhow::Result<BrokerInfo> {
    if status != 200 {
        bail!("unexpected response {status}: {body}");
    }

    let response: ServiceResponse =
        serde_json::from_str(body).context("supervisor response unparsable")?;
    if response.result != "ok" {
        bail!("supervisor API returned result: {}", response.result);
    }
    response
        .data
        .context("supervisor response does not contain broker data")
}
