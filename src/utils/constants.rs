/// Input timestamp layout
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Statistical defaults
pub const DEFAULT_SIGMA_THRESHOLD: f64 = 3.0;
pub const DEFAULT_BUCKET_WIDTH_MS: i64 = 10 * 60 * 1000;

/// Rolling window defaults
pub const DEFAULT_WINDOW_SIZE: usize = 10;
pub const DEFAULT_MOVING_AVERAGE_FILE: &str = "media_movel_regiao.jsonl";

/// Environment prefix for configuration overrides
pub const CONFIG_ENV_PREFIX: &str = "STATION_ANOMALY";

/// Result comparison tolerances
pub const COMPARE_REL_TOLERANCE: f64 = 1e-9;
pub const COMPARE_ABS_TOLERANCE: f64 = 1e-9;

/// Keys ignored when comparing result documents
pub const EXECUTION_TIME_KEY: &str = "tempo_execucao_ms";

/// Processing defaults
pub const DEFAULT_BUFFER_SIZE: usize = 8192 * 16; // 128KB
