mod config;
mod logging;
mod rumqttc_wrapper;
mod supervisor;

use anyhow::Context;
use beem2mqtt::beem_api::BeemApi;
use beem2mqtt::bridge::Bridge;
use beem2mqtt::home_assistant::HomeAssistant;
use config::Config;
use rumqttc_wrapper::RumqttcWrapper;
use std::thread;
use std::time::Instant;

use log::{debug, error, info};

fn main() {
    logging::init_logger();
    info!("=============   Beem Energy MQTT publisher - starting   =============");
    info!("Running revision: {}", env!("GIT_HASH"));
    if std::env::args().len() > 1 {
        error!("Arguments passed. Tool is configured by config.toml in its path");
    }

    if let Err(e) = run() {
        error!("{e:#}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let config = Config::load()?;

    logging::set_debug(config.debug());
    debug!("debug mode is enabled");
    debug!("configuration: {}", config.redacted());

    let start_delay = config.start_delay();
    if !start_delay.is_zero() {
        info!("waiting {}s before starting", start_delay.as_secs());
        thread::sleep(start_delay);
    }

    let mqtt_config = config
        .mqtt
        .as_ref()
        .context("no MQTT broker configured")?;
    let mut home_assistant = HomeAssistant::<RumqttcWrapper>::new(mqtt_config);

    let api = BeemApi::new(config.api_base_url()).context("could not set up the HTTP client")?;
    let mut bridge = Bridge::new(api, config.credentials());

    let interval = config.refresh_interval();
    info!("using update interval of {} min", interval.as_secs() / 60);

    // first cycle runs right away, then one per interval
    loop {
        let started = Instant::now();
        match bridge.run_cycle(&mut home_assistant) {
            Ok(boxes) => debug!("cycle finished, {boxes} box(es) published"),
            Err(e) => error!("beem cycle failed: {e}"),
        }
        thread::sleep(interval.saturating_sub(started.elapsed()));
    }
}
