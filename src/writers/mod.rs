pub mod json_writer;

pub use json_writer::{read_json_lines, MovingAverageWriter, ReportFileInfo, ReportWriter};
