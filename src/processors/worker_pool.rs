use crate::error::{ProcessingError, Result};
use crate::models::{Observation, StationMetrics};
use crate::processors::{ResultAggregator, StationAnalyzer};
use crate::utils::progress::ProgressReporter;
use crossbeam::channel;
use std::collections::BTreeMap;
use std::thread::{self, ScopedJoinHandle};
use tracing::{debug, info, warn};

/// One unit of stage-one work: a station and exclusive access to its readings
#[derive(Debug)]
pub struct StationTask<'a> {
    pub station_id: &'a str,
    pub observations: Vec<&'a mut Observation>,
}

enum WorkerMessage {
    Completed(String, StationMetrics),
    Skipped(String),
}

/// Fixed pool of station workers fed by a task channel.
///
/// Workers pull tasks until the channel is drained and report on a separate
/// results channel; the calling thread is the only consumer of results.
/// Station order is unspecified, results do not depend on it.
pub struct WorkerPool {
    workers: usize,
}

impl WorkerPool {
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }

    /// Run every task to completion and return the merged metrics.
    /// Returns only after all workers have exited.
    pub fn run<'a>(
        &self,
        tasks: Vec<StationTask<'a>>,
        analyzer: &StationAnalyzer,
        progress: Option<&ProgressReporter>,
    ) -> Result<BTreeMap<String, StationMetrics>> {
        let expected = tasks.len();
        info!(stations = expected, workers = self.workers, "dispatching station tasks");

        let (task_tx, task_rx) = channel::unbounded::<StationTask<'a>>();
        for task in tasks {
            task_tx
                .send(task)
                .map_err(|_| ProcessingError::Config("task channel closed before dispatch".to_string()))?;
        }
        drop(task_tx);

        let (result_tx, result_rx) = channel::unbounded::<WorkerMessage>();
        let mut aggregator = ResultAggregator::new();

        thread::scope(|scope| -> Result<()> {
            let mut handles = Vec::with_capacity(self.workers);

            for worker_id in 0..self.workers {
                let task_rx = task_rx.clone();
                let result_tx = result_tx.clone();

                let handle = thread::Builder::new()
                    .name(format!("station-worker-{}", worker_id))
                    .spawn_scoped(scope, move || {
                        let mut processed = 0usize;
                        for mut task in task_rx.iter() {
                            let station_id = task.station_id.to_string();
                            let message = match analyzer.analyze(&mut task.observations) {
                                Some(metrics) => {
                                    debug!(
                                        worker_id,
                                        station_id = %station_id,
                                        observations = task.observations.len(),
                                        concurrent_periods = metrics.concurrent_anomaly_periods,
                                        "station analysed"
                                    );
                                    WorkerMessage::Completed(station_id, metrics)
                                }
                                None => WorkerMessage::Skipped(station_id),
                            };
                            processed += 1;
                            if result_tx.send(message).is_err() {
                                break;
                            }
                        }
                        debug!(worker_id, processed, "worker drained task queue");
                    })?;
                handles.push(handle);
            }
            drop(result_tx);

            // Keep draining after a failed insert so every worker can finish
            let mut collect_error = None;
            for message in result_rx.iter() {
                match message {
                    WorkerMessage::Completed(station_id, metrics) => {
                        if let Err(e) = aggregator.insert(station_id, metrics) {
                            collect_error.get_or_insert(e);
                        }
                    }
                    WorkerMessage::Skipped(station_id) => aggregator.record_skipped(station_id),
                }
                if let Some(p) = progress {
                    p.increment(1);
                }
            }

            join_all(handles)?;
            collect_error.map_or(Ok(()), Err)
        })?;

        aggregator.finish(expected)
    }
}

/// Joins every handle, then reports whether any worker panicked
fn join_all<T>(handles: Vec<ScopedJoinHandle<'_, T>>) -> Result<()> {
    let panicked = handles
        .into_iter()
        .map(ScopedJoinHandle::join)
        .filter(|joined| joined.is_err())
        .count();

    if panicked > 0 {
        warn!(panicked, "station workers panicked");
        return Err(ProcessingError::WorkerPanicked);
    }
    Ok(())
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new(num_cpus::get())
    }
}
