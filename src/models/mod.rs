pub mod metrics;
pub mod moving_average;
pub mod observation;
pub mod report;

pub use metrics::{AnomalyPercentages, StationMetrics};
pub use moving_average::{format_epoch_millis, MovingAverageRecord};
pub use observation::{AnomalyFlags, Channel, Observation};
pub use report::{AccuracyReport, AnomalyReport};
