use crate::error::{ProcessingError, Result};
use crate::models::Observation;
use crate::processors::worker_pool::StationTask;
use std::collections::HashMap;

/// Observation indices grouped by station, in order of first appearance.
/// Index lists are disjoint across stations and keep ingestion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StationPartition {
    station_ids: Vec<String>,
    indices: Vec<Vec<usize>>,
    total: usize,
}

impl StationPartition {
    pub fn len(&self) -> usize {
        self.station_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.station_ids.is_empty()
    }

    pub fn station_ids(&self) -> &[String] {
        &self.station_ids
    }

    pub fn indices_for(&self, station_id: &str) -> Option<&[usize]> {
        self.station_ids
            .iter()
            .position(|id| id == station_id)
            .map(|slot| self.indices[slot].as_slice())
    }

    /// Hand out one task per station, each holding exclusive borrows of
    /// that station's observations.
    pub fn tasks<'a>(&'a self, observations: &'a mut [Observation]) -> Result<Vec<StationTask<'a>>> {
        if observations.len() != self.total {
            return Err(ProcessingError::InvalidFormat(format!(
                "partition covers {} observations but {} were supplied",
                self.total,
                observations.len()
            )));
        }

        let mut owner: Vec<Option<usize>> = vec![None; observations.len()];
        for (slot, indices) in self.indices.iter().enumerate() {
            for &index in indices {
                match owner.get_mut(index) {
                    Some(entry) if entry.is_none() => *entry = Some(slot),
                    _ => {
                        return Err(ProcessingError::InvalidFormat(format!(
                            "observation index {} is out of range or assigned twice",
                            index
                        )))
                    }
                }
            }
        }

        let mut buckets: Vec<Vec<&'a mut Observation>> = self
            .indices
            .iter()
            .map(|indices| Vec::with_capacity(indices.len()))
            .collect();

        for (observation, slot) in observations.iter_mut().zip(owner) {
            if let Some(slot) = slot {
                buckets[slot].push(observation);
            }
        }

        Ok(self
            .station_ids
            .iter()
            .zip(buckets)
            .map(|(station_id, observations)| StationTask {
                station_id,
                observations,
            })
            .collect())
    }
}

pub struct Partitioner;

impl Partitioner {
    pub fn new() -> Self {
        Self
    }

    /// Group observation indices by station identifier
    pub fn partition(&self, observations: &[Observation]) -> StationPartition {
        let mut slots: HashMap<&str, usize> = HashMap::new();
        let mut partition = StationPartition {
            total: observations.len(),
            ..StationPartition::default()
        };

        for (index, observation) in observations.iter().enumerate() {
            let slot = *slots.entry(observation.station_id.as_str()).or_insert_with(|| {
                partition.station_ids.push(observation.station_id.clone());
                partition.indices.push(Vec::new());
                partition.station_ids.len() - 1
            });
            partition.indices[slot].push(index);
        }

        partition
    }
}

impl Default for Partitioner {
    fn default() -> Self {
        Self::new()
    }
}
