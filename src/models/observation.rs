use serde::{Deserialize, Serialize};
use std::fmt;

/// Sensor channels carried by every station reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Channel {
    #[serde(rename = "temperatura")]
    Temperature,
    #[serde(rename = "umidade")]
    Humidity,
    #[serde(rename = "pressao")]
    Pressure,
}

impl Channel {
    pub const ALL: [Channel; 3] = [Channel::Temperature, Channel::Humidity, Channel::Pressure];

    /// Name used in input headers and output documents
    pub fn label(&self) -> &'static str {
        match self {
            Channel::Temperature => "temperatura",
            Channel::Humidity => "umidade",
            Channel::Pressure => "pressao",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "temperatura" | "temperature" => Some(Channel::Temperature),
            "umidade" | "humidity" => Some(Channel::Humidity),
            "pressao" | "pressure" => Some(Channel::Pressure),
            _ => None,
        }
    }

    pub fn value(&self, observation: &Observation) -> f64 {
        match self {
            Channel::Temperature => observation.temperature,
            Channel::Humidity => observation.humidity,
            Channel::Pressure => observation.pressure,
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Per-channel anomaly markers. Also used as a channel set when
/// merging the anomalous channels of one time bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnomalyFlags {
    pub temperature: bool,
    pub humidity: bool,
    pub pressure: bool,
}

impl AnomalyFlags {
    pub fn get(&self, channel: Channel) -> bool {
        match channel {
            Channel::Temperature => self.temperature,
            Channel::Humidity => self.humidity,
            Channel::Pressure => self.pressure,
        }
    }

    pub fn set(&mut self, channel: Channel, anomalous: bool) {
        match channel {
            Channel::Temperature => self.temperature = anomalous,
            Channel::Humidity => self.humidity = anomalous,
            Channel::Pressure => self.pressure = anomalous,
        }
    }

    pub fn any(&self) -> bool {
        self.temperature || self.humidity || self.pressure
    }

    /// Number of distinct anomalous channels
    pub fn count(&self) -> usize {
        Channel::ALL.iter().filter(|c| self.get(**c)).count()
    }

    pub fn union(&self, other: &AnomalyFlags) -> AnomalyFlags {
        AnomalyFlags {
            temperature: self.temperature || other.temperature,
            humidity: self.humidity || other.humidity,
            pressure: self.pressure || other.pressure,
        }
    }

    pub fn channels(&self) -> impl Iterator<Item = Channel> + '_ {
        Channel::ALL.into_iter().filter(|c| self.get(*c))
    }
}

/// One time-stamped station reading.
///
/// Everything except `anomaly_flags` is fixed at ingestion; the flags are
/// written once by the worker that owns the station.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Position in the ingested input, used to break timestamp ties
    pub sequence: usize,
    pub epoch_millis: i64,
    pub station_id: String,
    pub region: String,
    pub temperature: f64,
    pub humidity: f64,
    pub pressure: f64,
    #[serde(default)]
    pub anomaly_flags: AnomalyFlags,
}

impl Observation {
    pub fn new(
        sequence: usize,
        epoch_millis: i64,
        station_id: impl Into<String>,
        region: impl Into<String>,
        temperature: f64,
        humidity: f64,
        pressure: f64,
    ) -> Self {
        Self {
            sequence,
            epoch_millis,
            station_id: station_id.into(),
            region: region.into(),
            temperature,
            humidity,
            pressure,
            anomaly_flags: AnomalyFlags::default(),
        }
    }

    pub fn is_anomalous(&self) -> bool {
        self.anomaly_flags.any()
    }

    /// Index of the fixed-width time bucket this reading falls into
    pub fn time_bucket(&self, bucket_width_ms: i64) -> i64 {
        self.epoch_millis.div_euclid(bucket_width_ms)
    }
}
