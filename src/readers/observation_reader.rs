use crate::error::{ProcessingError, Result};
use crate::models::Observation;
use crate::utils::constants::{DEFAULT_BUFFER_SIZE, TIMESTAMP_FORMAT};
use chrono::NaiveDateTime;
use memmap2::Mmap;
use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Row layout of the station readings file
#[derive(Debug, Deserialize)]
struct RawObservation {
    timestamp: String,
    #[serde(rename = "id_estacao", alias = "station_id")]
    station_id: String,
    #[serde(rename = "regiao", alias = "region")]
    region: String,
    #[serde(rename = "temperatura", alias = "temperature")]
    temperature: f64,
    #[serde(rename = "umidade", alias = "humidity")]
    humidity: f64,
    #[serde(rename = "pressao", alias = "pressure")]
    pressure: f64,
}

/// Parse `YYYY-MM-DD HH:MM:SS` (UTC) into epoch milliseconds
pub fn parse_timestamp(value: &str) -> Result<i64> {
    let parsed = NaiveDateTime::parse_from_str(value.trim(), TIMESTAMP_FORMAT)?;
    Ok(parsed.and_utc().timestamp_millis())
}

pub struct ObservationReader {
    use_mmap: bool,
}

impl ObservationReader {
    pub fn new() -> Self {
        Self { use_mmap: false }
    }

    pub fn with_mmap(use_mmap: bool) -> Self {
        Self { use_mmap }
    }

    /// Read every observation in the file. Any malformed row aborts the read.
    pub fn read_observations(&self, path: &Path) -> Result<Vec<Observation>> {
        let observations = if self.use_mmap {
            let file = File::open(path)?;
            let mmap = unsafe { Mmap::map(&file)? };
            self.read_from(&mmap[..])?
        } else {
            let file = File::open(path)?;
            self.read_from(file)?
        };

        debug!(
            path = %path.display(),
            count = observations.len(),
            "read observations"
        );
        Ok(observations)
    }

    /// Read observations from any CSV source with a header row
    pub fn read_from<R: Read>(&self, source: R) -> Result<Vec<Observation>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .buffer_capacity(DEFAULT_BUFFER_SIZE)
            .from_reader(source);

        let mut observations = Vec::new();

        for (sequence, row) in reader.deserialize::<RawObservation>().enumerate() {
            // header occupies line 1
            let line = sequence as u64 + 2;
            let raw = row.map_err(|e| ProcessingError::Ingestion {
                line: e.position().map_or(line, |p| p.line()),
                message: e.to_string(),
            })?;

            observations.push(Self::convert(raw, sequence, line)?);
        }

        Ok(observations)
    }

    fn convert(raw: RawObservation, sequence: usize, line: u64) -> Result<Observation> {
        let epoch_millis = parse_timestamp(&raw.timestamp).map_err(|e| ProcessingError::Ingestion {
            line,
            message: format!("invalid timestamp '{}': {}", raw.timestamp, e),
        })?;

        if raw.station_id.is_empty() {
            return Err(ProcessingError::Ingestion {
                line,
                message: "empty station identifier".to_string(),
            });
        }

        for (name, value) in [
            ("temperatura", raw.temperature),
            ("umidade", raw.humidity),
            ("pressao", raw.pressure),
        ] {
            if !value.is_finite() {
                return Err(ProcessingError::Ingestion {
                    line,
                    message: format!("non-finite {} value: {}", name, value),
                });
            }
        }

        Ok(Observation::new(
            sequence,
            epoch_millis,
            raw.station_id,
            raw.region,
            raw.temperature,
            raw.humidity,
            raw.pressure,
        ))
    }
}

impl Default for ObservationReader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const HEADER: &str = "timestamp,id_estacao,regiao,temperatura,umidade,pressao";

    #[test]
    fn test_parse_timestamp() {
        assert_eq!(parse_timestamp("1970-01-01 00:10:00").unwrap(), 600_000);
        assert_eq!(parse_timestamp("2025-07-01 00:00:00").unwrap(), 1_751_328_000_000);
        assert!(parse_timestamp("2025-07-01T00:00:00").is_err());
        assert!(parse_timestamp("01/07/2025 00:00").is_err());
    }

    #[test]
    fn test_read_observations_file() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, "{}", HEADER)?;
        writeln!(file, "2025-07-01 00:00:00,STA-001,Sudeste,25.1,60.2,1012.3")?;
        writeln!(file, "2025-07-01 00:01:00,STA-002,Sul,18.0,70.5,1009.9")?;

        for reader in [ObservationReader::new(), ObservationReader::with_mmap(true)] {
            let observations = reader.read_observations(file.path())?;

            assert_eq!(observations.len(), 2);
            assert_eq!(observations[0].sequence, 0);
            assert_eq!(observations[0].station_id, "STA-001");
            assert_eq!(observations[0].region, "Sudeste");
            assert_eq!(observations[0].temperature, 25.1);
            assert_eq!(observations[1].epoch_millis, 1_751_328_060_000);
            assert_eq!(observations[1].pressure, 1009.9);
            assert!(!observations[1].is_anomalous());
        }

        Ok(())
    }

    #[test]
    fn test_english_headers_and_extra_columns_accepted() -> Result<()> {
        let data = "timestamp,station_id,region,temperature,humidity,pressure,note\n\
                    2025-07-01 00:00:00,A,Norte,30.0,80.0,1005.0,ok\n";

        let observations = ObservationReader::new().read_from(data.as_bytes())?;

        assert_eq!(observations.len(), 1);
        assert_eq!(observations[0].station_id, "A");
        assert_eq!(observations[0].humidity, 80.0);
        Ok(())
    }

    #[test]
    fn test_malformed_number_reports_line() {
        let data = format!(
            "{}\n2025-07-01 00:00:00,A,Sul,1.0,2.0,3.0\n2025-07-01 00:01:00,A,Sul,abc,2.0,3.0\n",
            HEADER
        );

        match ObservationReader::new().read_from(data.as_bytes()) {
            Err(ProcessingError::Ingestion { line, .. }) => assert_eq!(line, 3),
            other => panic!("expected ingestion error, got {:?}", other),
        }
    }

    #[test]
    fn test_bad_timestamp_rejected() {
        let data = format!("{}\n2025-13-01 00:00:00,A,Sul,1.0,2.0,3.0\n", HEADER);

        match ObservationReader::new().read_from(data.as_bytes()) {
            Err(ProcessingError::Ingestion { line, message }) => {
                assert_eq!(line, 2);
                assert!(message.contains("invalid timestamp"));
            }
            other => panic!("expected ingestion error, got {:?}", other),
        }
    }

    #[test]
    fn test_non_finite_value_rejected() {
        let data = format!("{}\n2025-07-01 00:00:00,A,Sul,NaN,2.0,3.0\n", HEADER);
        assert!(ObservationReader::new().read_from(data.as_bytes()).is_err());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = ObservationReader::new().read_observations(Path::new("does/not/exist.csv"));
        assert!(matches!(result, Err(ProcessingError::Io(_))));
    }

    #[test]
    fn test_empty_file_yields_no_observations() -> Result<()> {
        let observations = ObservationReader::new().read_from(format!("{}\n", HEADER).as_bytes())?;
        assert!(observations.is_empty());
        Ok(())
    }
}
