pub mod ground_truth_reader;
pub mod observation_reader;

pub use ground_truth_reader::{GroundTruthReader, InjectedAnomaly};
pub use observation_reader::{parse_timestamp, ObservationReader};
