// externally visible interfaces
pub mod beem_api;
pub mod bridge;
pub mod error;
pub mod home_assistant;
pub mod home_assistant_config;
pub mod metric_collector;
pub mod mqtt_config;
pub mod mqtt_wrapper;
pub mod session;
pub mod telemetry;
pub mod token;
