use crate::beem_api::BoxSummary;

use chrono::{DateTime, Utc};
use log::warn;
use std::fmt;

/// Value published when a duration can not be computed.
pub const UNKNOWN_DURATION: i64 = -1;

/// The fixed set of sensors published for every box.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Metric {
    Power,
    EnergyDaily,
    EnergyMonth,
    SignalStrength,
    LastAlive,
    LastProduction,
}

impl Metric {
    pub const ALL: [Metric; 6] = [
        Metric::Power,
        Metric::EnergyDaily,
        Metric::EnergyMonth,
        Metric::SignalStrength,
        Metric::LastAlive,
        Metric::LastProduction,
    ];

    /// Topic segment and unique id suffix.
    pub fn key(self) -> &'static str {
        match self {
            Metric::Power => "power",
            Metric::EnergyDaily => "energy_daily",
            Metric::EnergyMonth => "energy_month",
            Metric::SignalStrength => "signal_strength",
            Metric::LastAlive => "last_alive",
            Metric::LastProduction => "last_production",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Metric::Power => "Current Power",
            Metric::EnergyDaily => "Daily Energy",
            Metric::EnergyMonth => "Monthly Energy",
            Metric::SignalStrength => "Signal Strength",
            Metric::LastAlive => "Last Alive",
            Metric::LastProduction => "Last Production",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            Metric::Power => "W",
            Metric::EnergyDaily | Metric::EnergyMonth => "Wh",
            Metric::SignalStrength => "dBm",
            Metric::LastAlive | Metric::LastProduction => "s",
        }
    }

    pub fn device_class(self) -> &'static str {
        match self {
            Metric::Power => "power",
            Metric::EnergyDaily | Metric::EnergyMonth => "energy",
            Metric::SignalStrength => "signal_strength",
            Metric::LastAlive | Metric::LastProduction => "duration",
        }
    }

    pub fn state_class(self) -> &'static str {
        match self {
            Metric::EnergyDaily | Metric::EnergyMonth => "total_increasing",
            _ => "measurement",
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            Metric::Power | Metric::EnergyDaily | Metric::EnergyMonth => "mdi:solar-power",
            Metric::SignalStrength => "mdi:wifi",
            Metric::LastAlive => "mdi:clock-outline",
            Metric::LastProduction => "mdi:solar-panel",
        }
    }

    pub fn entity_category(self) -> Option<&'static str> {
        match self {
            Metric::Power | Metric::EnergyDaily | Metric::EnergyMonth => None,
            _ => Some("diagnostic"),
        }
    }
}

/// A state value together with its wire representation.
#[derive(Clone, Debug, PartialEq)]
pub enum SensorValue {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for SensorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorValue::Integer(value) => write!(f, "{value}"),
            SensorValue::Float(value) => write!(f, "{value:.2}"),
            SensorValue::Text(value) => f.write_str(value),
        }
    }
}

/// Expand a box into its six metrics, measured against the current instant.
pub fn normalize(record: &BoxSummary) -> Vec<(Metric, SensorValue)> {
    normalize_at(record, Utc::now())
}

pub fn normalize_at(record: &BoxSummary, now: DateTime<Utc>) -> Vec<(Metric, SensorValue)> {
    Metric::ALL
        .into_iter()
        .map(|metric| {
            let value = match metric {
                Metric::Power => record.watt_hour,
                Metric::EnergyDaily => record.total_day,
                Metric::EnergyMonth => record.total_month,
                Metric::SignalStrength => record.last_dbm,
                Metric::LastAlive => seconds_since(&record.last_alive, now),
                Metric::LastProduction => seconds_since(&record.last_production, now),
            };
            (metric, SensorValue::Integer(value))
        })
        .collect()
}

/// Whole seconds elapsed between an RFC 3339 timestamp and `now`.
///
/// Returns [`UNKNOWN_DURATION`] when the timestamp can not be parsed.
pub fn seconds_since(timestamp: &str, now: DateTime<Utc>) -> i64 {
    match DateTime::parse_from_rfc3339(timestamp) {
        Ok(then) => (now - then.with_timezone(&Utc)).num_seconds(),
        Err(e) => {
            warn!("failed to parse timestamp {timestamp:?}: {e}");
            UNKNOWN_DURATION
        }
    }
}
