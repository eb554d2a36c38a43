pub mod ground_truth;
pub mod result_comparator;

pub use ground_truth::score_detections;
pub use result_comparator::{Difference, ResultComparator};
