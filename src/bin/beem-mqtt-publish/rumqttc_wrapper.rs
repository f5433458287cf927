use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::time::Instant;
use std::{thread, time::Duration};

use beem2mqtt::{
    mqtt_config::MqttConfig,
    mqtt_wrapper::{self},
};
use log::{debug, error, info, warn};
use rumqttc::{
    tokio_rustls::{self, rustls::ClientConfig},
    Client, ConnectReturnCode, Connection, Event, MqttOptions, Outgoing, Packet, Transport,
};

static CLIENT_ID: &str = "beem-energy-client";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const PUBLISH_CONFIRM_TIMEOUT: Duration = Duration::from_secs(5);
const RECONNECT_DELAY: Duration = Duration::from_secs(1);

pub struct RumqttcWrapper {
    client: Client,
    connected: Arc<AtomicBool>,
    // one message per publish the event loop has written to the broker connection
    sent: Receiver<()>,
}

fn match_qos(qos: mqtt_wrapper::QoS) -> rumqttc::QoS {
    match qos {
        mqtt_wrapper::QoS::AtMostOnce => rumqttc::QoS::AtMostOnce,
        mqtt_wrapper::QoS::AtLeastOnce => rumqttc::QoS::AtLeastOnce,
        mqtt_wrapper::QoS::ExactlyOnce => rumqttc::QoS::ExactlyOnce,
    }
}

impl mqtt_wrapper::MqttWrapper for RumqttcWrapper {
    fn publish<S, V>(
        &mut self,
        topic: S,
        qos: mqtt_wrapper::QoS,
        retain: bool,
        payload: V,
    ) -> anyhow::Result<()>
    where
        S: Into<String>,
        V: Into<Vec<u8>>,
    {
        // drop confirmations of earlier publishes that arrived after their wait timed out
        while self.sent.try_recv().is_ok() {}

        self.client
            .try_publish(topic, match_qos(qos), retain, payload)?;

        match self.sent.recv_timeout(PUBLISH_CONFIRM_TIMEOUT) {
            Ok(()) => Ok(()),
            Err(RecvTimeoutError::Timeout) => {
                anyhow::bail!("publish not confirmed within {PUBLISH_CONFIRM_TIMEOUT:?}")
            }
            Err(RecvTimeoutError::Disconnected) => anyhow::bail!("MQTT event loop stopped"),
        }
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn new(config: &MqttConfig, suffix: &str) -> Self {
        let use_tls = config.uses_tls();
        let port = config.port_or_default();
        let client_id = config.client_id.as_deref().unwrap_or(CLIENT_ID).to_string() + suffix;

        let mut mqttoptions = MqttOptions::new(client_id, &config.host, port);
        mqttoptions.set_keep_alive(Duration::from_secs(5));
        if use_tls {
            // Use rustls-native-certs to load root certificates from the operating system.
            let mut roots = tokio_rustls::rustls::RootCertStore::empty();
            let native = rustls_native_certs::load_native_certs();
            for e in native.errors {
                warn!("could not load platform certificate: {e}");
            }
            for cert in native.certs {
                if let Err(e) = roots.add(cert) {
                    warn!("skipping invalid platform certificate: {e}");
                }
            }

            let client_config = ClientConfig::builder()
                .with_root_certificates(roots)
                .with_no_client_auth();

            mqttoptions.set_transport(Transport::tls_with_config(client_config.into()));
        }

        //parse the mqtt authentication options
        if let Some((username, password)) = match (&config.username, &config.password) {
            (None, None) => None,
            (None, Some(_)) => None,
            (Some(username), None) => Some((username.clone(), "".into())),
            (Some(username), Some(password)) => Some((username.clone(), password.clone())),
        } {
            mqttoptions.set_credentials(username, password);
        }

        let broker = format!("{}:{}", config.host, port);
        info!("Connecting to MQTT broker at {broker}");

        let (client, connection) = Client::new(mqttoptions, 512);
        let connected = Arc::new(AtomicBool::new(false));
        let (sent_tx, sent) = mpsc::channel();

        {
            let connected = connected.clone();
            thread::spawn(move || drive_event_loop(connection, connected, sent_tx, broker));
        }

        if !wait_for_connection(&connected, CONNECT_TIMEOUT) {
            error!("failed to connect to MQTT broker within {CONNECT_TIMEOUT:?}");
        }

        Self {
            client,
            connected,
            sent,
        }
    }
}

// keep polling the event loop to make sure outgoing messages get sent. rumqttc
// reconnects by itself on the next poll after an error; losing the connection
// is only reported here.
fn drive_event_loop(
    mut connection: Connection,
    connected: Arc<AtomicBool>,
    sent: Sender<()>,
    broker: String,
) {
    let mut failure_reported = false;
    for notification in connection.iter() {
        match notification {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                if ack.code == ConnectReturnCode::Success {
                    info!("Connected to MQTT broker at {broker}");
                    connected.store(true, Ordering::SeqCst);
                    failure_reported = false;
                } else {
                    error!("MQTT broker at {broker} refused the connection: {:?}", ack.code);
                }
            }
            Ok(Event::Outgoing(Outgoing::Publish(_))) => {
                // nobody waits when the wrapper has been dropped
                let _ = sent.send(());
            }
            Ok(event) => debug!("mqtt event: {event:?}"),
            Err(e) => {
                if connected.swap(false, Ordering::SeqCst) {
                    error!("connection to MQTT broker lost: {e}");
                } else if !failure_reported {
                    error!("failed to connect to MQTT broker: {e}");
                }
                failure_reported = true;
                thread::sleep(RECONNECT_DELAY);
            }
        }
    }
}

fn wait_for_connection(connected: &AtomicBool, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if connected.load(Ordering::SeqCst) {
            return true;
        }
        thread::sleep(Duration::from_millis(100));
    }
    connected.load(Ordering::SeqCst)
}
