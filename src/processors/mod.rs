pub mod partitioner;
pub mod pipeline;
pub mod result_aggregator;
pub mod rolling_window;
pub mod station_analyzer;
pub mod worker_pool;

pub use partitioner::{Partitioner, StationPartition};
pub use pipeline::{AnomalyPipeline, MovingAverageStream, PipelineOutput};
pub use result_aggregator::ResultAggregator;
pub use rolling_window::{MovingAverages, RegionWindows, RollingWindow, RollingWindowAggregator};
pub use station_analyzer::{ChannelStatistics, StationAnalyzer};
pub use worker_pool::{StationTask, WorkerPool};
