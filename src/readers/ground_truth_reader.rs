use crate::error::{ProcessingError, Result};
use crate::models::Channel;
use crate::readers::observation_reader::parse_timestamp;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct RawInjectedAnomaly {
    timestamp: String,
    #[serde(rename = "id_estacao", alias = "station_id")]
    station_id: String,
    #[serde(rename = "sensor_anomalo", alias = "sensor")]
    sensor: String,
}

/// A reading known to carry an anomaly on one channel
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InjectedAnomaly {
    pub epoch_millis: i64,
    pub station_id: String,
    pub channel: Channel,
}

/// Reads the list of anomalies injected by the data generator
pub struct GroundTruthReader;

impl GroundTruthReader {
    pub fn new() -> Self {
        Self
    }

    pub fn read_anomalies(&self, path: &Path) -> Result<HashSet<InjectedAnomaly>> {
        let file = File::open(path)?;
        self.read_from(file)
    }

    pub fn read_from<R: Read>(&self, source: R) -> Result<HashSet<InjectedAnomaly>> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(source);

        let mut anomalies = HashSet::new();
        for (index, row) in reader.deserialize::<RawInjectedAnomaly>().enumerate() {
            let line = index as u64 + 2;
            let raw = row?;

            let channel = Channel::parse(&raw.sensor).ok_or_else(|| ProcessingError::Ingestion {
                line,
                message: format!("unknown sensor '{}'", raw.sensor),
            })?;
            let epoch_millis = parse_timestamp(&raw.timestamp).map_err(|e| ProcessingError::Ingestion {
                line,
                message: format!("invalid timestamp '{}': {}", raw.timestamp, e),
            })?;

            anomalies.insert(InjectedAnomaly {
                epoch_millis,
                station_id: raw.station_id,
                channel,
            });
        }

        Ok(anomalies)
    }
}

impl Default for GroundTruthReader {
    fn default() -> Self {
        Self::new()
    }
}
