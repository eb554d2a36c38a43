use crate::error::{ProcessingError, Result};
use crate::models::StationMetrics;
use std::collections::BTreeMap;
use tracing::warn;

/// Collects finished station metrics. Owned by the single collector
/// draining the results channel, so no lock is involved.
#[derive(Debug, Default)]
pub struct ResultAggregator {
    results: BTreeMap<String, StationMetrics>,
    skipped: Vec<String>,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one station's metrics; a second entry for the same station is rejected
    pub fn insert(&mut self, station_id: String, metrics: StationMetrics) -> Result<()> {
        if self.results.contains_key(&station_id) {
            return Err(ProcessingError::DuplicateStation { station_id });
        }
        self.results.insert(station_id, metrics);
        Ok(())
    }

    pub fn record_skipped(&mut self, station_id: String) {
        warn!(station_id = %station_id, "skipping station with no observations");
        self.skipped.push(station_id);
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn skipped(&self) -> &[String] {
        &self.skipped
    }

    /// Close the aggregation, checking every dispatched station was accounted for
    pub fn finish(self, expected: usize) -> Result<BTreeMap<String, StationMetrics>> {
        let received = self.results.len() + self.skipped.len();
        if received != expected {
            return Err(ProcessingError::IncompleteResults { expected, received });
        }
        Ok(self.results)
    }
}
