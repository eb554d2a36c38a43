use crate::models::Channel;
use serde::{Deserialize, Serialize};

/// Share of a station's readings flagged per channel, in percent (0..=100)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AnomalyPercentages {
    #[serde(rename = "temperatura")]
    pub temperature: f64,
    #[serde(rename = "umidade")]
    pub humidity: f64,
    #[serde(rename = "pressao")]
    pub pressure: f64,
}

impl AnomalyPercentages {
    pub fn get(&self, channel: Channel) -> f64 {
        match channel {
            Channel::Temperature => self.temperature,
            Channel::Humidity => self.humidity,
            Channel::Pressure => self.pressure,
        }
    }

    pub fn set(&mut self, channel: Channel, percentage: f64) {
        match channel {
            Channel::Temperature => self.temperature = percentage,
            Channel::Humidity => self.humidity = percentage,
            Channel::Pressure => self.pressure = percentage,
        }
    }
}

/// Outcome of analysing one station. Written once by the owning worker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StationMetrics {
    #[serde(rename = "percentual_anomalias")]
    pub anomaly_percentage: AnomalyPercentages,

    #[serde(rename = "periodos_concorrentes")]
    pub concurrent_anomaly_periods: u64,
}
