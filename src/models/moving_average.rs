use crate::utils::constants::TIMESTAMP_FORMAT;
use chrono::DateTime;
use serde::{Serialize, Serializer};

/// Smoothed reading emitted by the rolling-window stage
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MovingAverageRecord {
    #[serde(rename = "timestamp", serialize_with = "serialize_epoch_millis")]
    pub epoch_millis: i64,

    /// Input position of the observation that produced this record
    #[serde(skip)]
    pub sequence: usize,

    #[serde(rename = "id_estacao")]
    pub station_id: String,

    #[serde(rename = "regiao")]
    pub region: String,

    #[serde(rename = "temperatura")]
    pub moving_avg_temperature: f64,

    #[serde(rename = "umidade")]
    pub moving_avg_humidity: f64,

    #[serde(rename = "pressao")]
    pub moving_avg_pressure: f64,
}

/// Render epoch milliseconds back into the input timestamp layout (UTC)
pub fn format_epoch_millis(epoch_millis: i64) -> Option<String> {
    DateTime::from_timestamp_millis(epoch_millis)
        .map(|dt| dt.naive_utc().format(TIMESTAMP_FORMAT).to_string())
}

fn serialize_epoch_millis<S>(epoch_millis: &i64, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match format_epoch_millis(*epoch_millis) {
        Some(formatted) => serializer.serialize_str(&formatted),
        None => serializer.serialize_i64(*epoch_millis),
    }
}
