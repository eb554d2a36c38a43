use crate::config::PipelineConfig;
use crate::error::Result;
use crate::models::{MovingAverageRecord, Observation, StationMetrics};
use crate::processors::rolling_window::MovingAverages;
use crate::processors::{Partitioner, RollingWindowAggregator, StationAnalyzer, WorkerPool};
use crate::utils::progress::ProgressReporter;
use std::collections::BTreeMap;
use tracing::info;
use validator::Validate;

/// Moving-average records from either flavour of the rolling stage
pub enum MovingAverageStream<'a> {
    Sequential(MovingAverages<'a>),
    Parallel(std::vec::IntoIter<MovingAverageRecord>),
}

impl Iterator for MovingAverageStream<'_> {
    type Item = MovingAverageRecord;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            MovingAverageStream::Sequential(stream) => stream.next(),
            MovingAverageStream::Parallel(records) => records.next(),
        }
    }
}

/// Materialised outcome of both stages
#[derive(Debug)]
pub struct PipelineOutput {
    pub station_results: BTreeMap<String, StationMetrics>,
    pub moving_averages: Vec<MovingAverageRecord>,
    pub observations: Vec<Observation>,
}

/// Two-stage batch run: concurrent per-station analysis, then the rolling
/// aggregation over whatever stage one left unflagged.
pub struct AnomalyPipeline {
    config: PipelineConfig,
    analyzer: StationAnalyzer,
}

impl AnomalyPipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        let analyzer = StationAnalyzer::new()
            .with_sigma_threshold(config.sigma_threshold)
            .with_bucket_width_ms(config.bucket_width_ms);
        Ok(Self { config, analyzer })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Stage one. Sets every observation's anomaly flags and returns once
    /// all workers have exited.
    pub fn analyze_stations(
        &self,
        observations: &mut [Observation],
        progress: Option<&ProgressReporter>,
    ) -> Result<BTreeMap<String, StationMetrics>> {
        let partition = Partitioner::new().partition(observations);
        info!(
            observations = observations.len(),
            stations = partition.len(),
            "partitioned observations by station"
        );

        let tasks = partition.tasks(observations)?;
        let results = WorkerPool::new(self.config.workers).run(tasks, &self.analyzer, progress)?;

        let flagged = observations.iter().filter(|o| o.is_anomalous()).count();
        info!(stations = results.len(), flagged, "station analysis complete");
        Ok(results)
    }

    /// Stage two. Must run after `analyze_stations` on the same observations.
    pub fn moving_averages<'a>(&self, observations: &'a [Observation]) -> Result<MovingAverageStream<'a>> {
        let aggregator = RollingWindowAggregator::new(self.config.window_size);
        if self.config.parallel_regions {
            let records = aggregator.aggregate_parallel(observations, self.config.workers)?;
            Ok(MovingAverageStream::Parallel(records.into_iter()))
        } else {
            Ok(MovingAverageStream::Sequential(aggregator.moving_averages(observations)))
        }
    }

    /// Run both stages and keep everything in memory
    pub fn run(&self, mut observations: Vec<Observation>) -> Result<PipelineOutput> {
        let station_results = self.analyze_stations(&mut observations, None)?;
        let moving_averages = self.moving_averages(&observations)?.collect();

        Ok(PipelineOutput {
            station_results,
            moving_averages,
            observations,
        })
    }
}
