use crate::error::{ProcessingError, Result};
use crate::models::{AnomalyReport, MovingAverageRecord};
use crate::utils::constants::DEFAULT_BUFFER_SIZE;
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

fn create_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(File::create(path)?)
}

/// Writes the per-station report document
pub struct ReportWriter {
    indent: usize,
}

impl ReportWriter {
    pub fn new() -> Self {
        Self { indent: 4 }
    }

    pub fn write_report(&self, report: &AnomalyReport, path: &Path) -> Result<()> {
        let mut writer = BufWriter::new(create_file(path)?);
        self.write_to(report, &mut writer)?;
        writer.flush()?;
        Ok(())
    }

    pub fn write_to<W: Write>(&self, report: &AnomalyReport, writer: &mut W) -> Result<()> {
        let indent = vec![b' '; self.indent];
        let formatter = PrettyFormatter::with_indent(&indent);
        let mut serializer = Serializer::with_formatter(&mut *writer, formatter);
        report.serialize(&mut serializer)?;
        writeln!(writer)?;
        Ok(())
    }

    pub fn read_report(&self, path: &Path) -> Result<AnomalyReport> {
        let file = File::open(path)?;
        Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
    }

    pub fn get_file_info(&self, path: &Path) -> Result<ReportFileInfo> {
        let metadata = fs::metadata(path)?;
        let report = self.read_report(path)?;

        Ok(ReportFileInfo {
            path: path.to_path_buf(),
            file_size: metadata.len(),
            stations: report.station_results.len(),
        })
    }
}

impl Default for ReportWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
pub struct ReportFileInfo {
    pub path: PathBuf,
    pub file_size: u64,
    pub stations: usize,
}

impl ReportFileInfo {
    pub fn summary(&self) -> String {
        format!(
            "File: {}\nSize: {:.2} KB\nStations: {}",
            self.path.display(),
            self.file_size as f64 / 1024.0,
            self.stations
        )
    }
}

/// Streams moving-average records as JSON Lines
pub struct MovingAverageWriter<W: Write> {
    writer: W,
    written: usize,
}

impl MovingAverageWriter<BufWriter<File>> {
    pub fn create(path: &Path) -> Result<Self> {
        let file = create_file(path)?;
        Ok(Self::new(BufWriter::with_capacity(DEFAULT_BUFFER_SIZE, file)))
    }
}

impl<W: Write> MovingAverageWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, written: 0 }
    }

    pub fn write_record(&mut self, record: &MovingAverageRecord) -> Result<()> {
        serde_json::to_writer(&mut self.writer, record)?;
        self.writer.write_all(b"\n")?;
        self.written += 1;
        Ok(())
    }

    /// Drain a record stream into the output, returning how many were written
    pub fn write_all<I>(&mut self, records: I) -> Result<usize>
    where
        I: IntoIterator<Item = MovingAverageRecord>,
    {
        let before = self.written;
        for record in records {
            self.write_record(&record)?;
        }
        Ok(self.written - before)
    }

    pub fn finish(mut self) -> Result<W> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}

/// Parse a JSON Lines moving-average file back into raw values
pub fn read_json_lines(path: &Path) -> Result<Vec<serde_json::Value>> {
    let content = fs::read_to_string(path)?;
    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .enumerate()
        .map(|(index, line)| {
            serde_json::from_str(line).map_err(|e| ProcessingError::Ingestion {
                line: index as u64 + 1,
                message: e.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AnomalyPercentages, StationMetrics};
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn sample_report() -> AnomalyReport {
        let mut results = BTreeMap::new();
        results.insert(
            "STA-001".to_string(),
            StationMetrics {
                anomaly_percentage: AnomalyPercentages {
                    temperature: 10.0,
                    humidity: 0.0,
                    pressure: 0.0,
                },
                concurrent_anomaly_periods: 1,
            },
        );
        AnomalyReport::new(12.5, results)
    }

    #[test]
    fn test_write_and_read_report() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("nested").join("report.json");

        let writer = ReportWriter::new();
        writer.write_report(&sample_report(), &path)?;

        let content = fs::read_to_string(&path)?;
        assert!(content.contains("\n    \"resultados_por_estacao\""));

        let info = writer.get_file_info(&path)?;
        assert_eq!(info.stations, 1);
        assert!(info.file_size > 0);
        assert_eq!(writer.read_report(&path)?, sample_report());
        Ok(())
    }

    #[test]
    fn test_moving_average_lines() -> Result<()> {
        let record = MovingAverageRecord {
            epoch_millis: 0,
            sequence: 0,
            station_id: "A".to_string(),
            region: "Sul".to_string(),
            moving_avg_temperature: 1.0,
            moving_avg_humidity: 2.0,
            moving_avg_pressure: 3.0,
        };

        let mut writer = MovingAverageWriter::new(Vec::new());
        let count = writer.write_all(vec![record.clone(), record])?;
        let bytes = writer.finish()?;
        let text = String::from_utf8(bytes).unwrap();

        assert_eq!(count, 2);
        assert_eq!(text.lines().count(), 2);
        assert!(text.starts_with(r#"{"timestamp":"1970-01-01 00:00:00","id_estacao":"A""#));
        Ok(())
    }
}
