use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProcessingError>;

#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Date parsing error: {0}")]
    DateParse(#[from] chrono::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Configuration source error: {0}")]
    ConfigLoad(#[from] config::ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Malformed input at line {line}: {message}")]
    Ingestion { line: u64, message: String },

    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    #[error("Station {station_id} reported more than once")]
    DuplicateStation { station_id: String },

    #[error("Incomplete results: expected {expected} stations, received {received}")]
    IncompleteResults { expected: usize, received: usize },

    #[error("Station worker panicked")]
    WorkerPanicked,

    #[error("Result documents differ in {0} place(s)")]
    ResultsDiffer(usize),

    #[error("Async task error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}
