use crate::error::{ProcessingError, Result};
use crate::models::{MovingAverageRecord, Observation};
use crate::utils::constants::DEFAULT_WINDOW_SIZE;
use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap, VecDeque};
use tracing::debug;

/// Fixed-capacity FIFO of recent values with a running sum
#[derive(Debug, Clone)]
pub struct RollingWindow {
    capacity: usize,
    values: VecDeque<f64>,
    sum: f64,
}

impl RollingWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            values: VecDeque::with_capacity(capacity + 1),
            sum: 0.0,
        }
    }

    /// Push a value, evicting the oldest once over capacity, and return the
    /// average over the current occupancy.
    pub fn push(&mut self, value: f64) -> f64 {
        self.values.push_back(value);
        self.sum += value;
        if self.values.len() > self.capacity {
            if let Some(evicted) = self.values.pop_front() {
                self.sum -= evicted;
            }
        }
        self.average()
    }

    pub fn average(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        self.sum / self.values.len() as f64
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// The three channel windows of one region
#[derive(Debug, Clone)]
pub struct RegionWindows {
    temperature: RollingWindow,
    humidity: RollingWindow,
    pressure: RollingWindow,
}

impl RegionWindows {
    pub fn new(capacity: usize) -> Self {
        Self {
            temperature: RollingWindow::new(capacity),
            humidity: RollingWindow::new(capacity),
            pressure: RollingWindow::new(capacity),
        }
    }

    pub fn push(&mut self, observation: &Observation) -> MovingAverageRecord {
        MovingAverageRecord {
            epoch_millis: observation.epoch_millis,
            sequence: observation.sequence,
            station_id: observation.station_id.clone(),
            region: observation.region.clone(),
            moving_avg_temperature: self.temperature.push(observation.temperature),
            moving_avg_humidity: self.humidity.push(observation.humidity),
            moving_avg_pressure: self.pressure.push(observation.pressure),
        }
    }
}

/// Indices of non-anomalous observations in timestamp order, ties in input order
fn clean_order(observations: &[Observation]) -> Vec<usize> {
    let mut order: Vec<usize> = observations
        .iter()
        .enumerate()
        .filter(|(_, o)| !o.is_anomalous())
        .map(|(index, _)| index)
        .collect();
    order.sort_unstable_by_key(|&index| {
        let o = &observations[index];
        (o.epoch_millis, o.sequence)
    });
    order
}

/// Lazily replays clean observations through per-region windows.
/// Consumed once; records come out in timestamp order.
pub struct MovingAverages<'a> {
    observations: &'a [Observation],
    order: std::vec::IntoIter<usize>,
    windows: HashMap<&'a str, RegionWindows>,
    window_size: usize,
}

impl MovingAverages<'_> {
    pub fn regions(&self) -> usize {
        self.windows.len()
    }
}

impl Iterator for MovingAverages<'_> {
    type Item = MovingAverageRecord;

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.order.next()?;
        let observations = self.observations;
        let observation = &observations[index];
        let window_size = self.window_size;
        let windows = self
            .windows
            .entry(observation.region.as_str())
            .or_insert_with(|| RegionWindows::new(window_size));
        Some(windows.push(observation))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.order.size_hint()
    }
}

/// Second pipeline stage: bounded moving averages per region over the
/// readings that passed anomaly screening.
pub struct RollingWindowAggregator {
    window_size: usize,
}

impl RollingWindowAggregator {
    pub fn new(window_size: usize) -> Self {
        Self {
            window_size: window_size.max(1),
        }
    }

    /// Single pass over all regions
    pub fn moving_averages<'a>(&self, observations: &'a [Observation]) -> MovingAverages<'a> {
        let order = clean_order(observations);
        debug!(retained = order.len(), total = observations.len(), "replaying clean observations");

        MovingAverages {
            observations,
            order: order.into_iter(),
            windows: HashMap::new(),
            window_size: self.window_size,
        }
    }

    /// One task per region on a rayon pool, merged back into the same order
    /// the single pass produces.
    pub fn aggregate_parallel(&self, observations: &[Observation], workers: usize) -> Result<Vec<MovingAverageRecord>> {
        let mut by_region: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
        for index in clean_order(observations) {
            by_region
                .entry(observations[index].region.as_str())
                .or_default()
                .push(index);
        }
        debug!(regions = by_region.len(), workers, "replaying regions in parallel");

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers.max(1))
            .build()
            .map_err(|e| ProcessingError::Config(e.to_string()))?;

        let window_size = self.window_size;
        let per_region: Vec<Vec<MovingAverageRecord>> = pool.install(|| {
            by_region
                .par_iter()
                .map(|(_, indices)| {
                    let mut windows = RegionWindows::new(window_size);
                    indices
                        .iter()
                        .map(|&index| windows.push(&observations[index]))
                        .collect()
                })
                .collect()
        });

        let mut records: Vec<MovingAverageRecord> = per_region.into_iter().flatten().collect();
        records.sort_unstable_by_key(|r| (r.epoch_millis, r.sequence));
        Ok(records)
    }
}

impl Default for RollingWindowAggregator {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_SIZE)
    }
}
