use crate::error::Result;
use crate::utils::constants::{
    CONFIG_ENV_PREFIX, DEFAULT_BUCKET_WIDTH_MS, DEFAULT_MOVING_AVERAGE_FILE,
    DEFAULT_SIGMA_THRESHOLD, DEFAULT_WINDOW_SIZE,
};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use validator::Validate;

/// Tunables for one pipeline run.
///
/// Sources are layered: built-in defaults, an optional TOML file, then
/// `STATION_ANOMALY_*` environment variables. Command-line values are
/// applied on top by the caller, which validates the result.
#[derive(Debug, Clone, PartialEq, Deserialize, Validate)]
pub struct PipelineConfig {
    #[validate(range(min = 1))]
    pub workers: usize,

    #[validate(range(min = 1))]
    pub window_size: usize,

    #[validate(range(min = 1))]
    pub bucket_width_ms: i64,

    #[validate(range(min = 0.0))]
    pub sigma_threshold: f64,

    pub parallel_regions: bool,

    pub moving_average_output: PathBuf,
}

impl PipelineConfig {
    pub fn new(workers: usize) -> Self {
        Self {
            workers,
            ..Self::default()
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_window_size(mut self, window_size: usize) -> Self {
        self.window_size = window_size;
        self
    }

    pub fn with_parallel_regions(mut self, parallel_regions: bool) -> Self {
        self.parallel_regions = parallel_regions;
        self
    }

    pub fn with_moving_average_output(mut self, path: impl Into<PathBuf>) -> Self {
        self.moving_average_output = path.into();
        self
    }

    /// Load defaults, an optional file and `STATION_ANOMALY_*` variables.
    /// Not validated here: callers apply command-line overrides first.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        Self::load_with_environment(file, Self::environment())
    }

    /// Same layering as [`PipelineConfig::load`] with an explicit environment source
    pub fn load_with_environment(file: Option<&Path>, environment: Environment) -> Result<Self> {
        let defaults = Self::default();

        let mut builder = Config::builder()
            .set_default("workers", defaults.workers as u64)?
            .set_default("window_size", defaults.window_size as u64)?
            .set_default("bucket_width_ms", defaults.bucket_width_ms)?
            .set_default("sigma_threshold", defaults.sigma_threshold)?
            .set_default("parallel_regions", defaults.parallel_regions)?
            .set_default(
                "moving_average_output",
                defaults.moving_average_output.to_string_lossy().into_owned(),
            )?;

        if let Some(path) = file {
            builder = builder.add_source(File::from(path).required(true));
        }

        Ok(builder.add_source(environment).build()?.try_deserialize()?)
    }

    pub fn environment() -> Environment {
        Environment::with_prefix(CONFIG_ENV_PREFIX).try_parsing(true)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: num_cpus::get(),
            window_size: DEFAULT_WINDOW_SIZE,
            bucket_width_ms: DEFAULT_BUCKET_WIDTH_MS,
            sigma_threshold: DEFAULT_SIGMA_THRESHOLD,
            parallel_regions: false,
            moving_average_output: PathBuf::from(DEFAULT_MOVING_AVERAGE_FILE),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    fn environment(vars: &[(&str, &str)]) -> Environment {
        let source: config::Map<String, String> = vars
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        PipelineConfig::environment().source(Some(source))
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = PipelineConfig::new(4);
        assert!(config.validate().is_ok());
        assert_eq!(config.window_size, 10);
        assert_eq!(config.bucket_width_ms, 600_000);
        assert_eq!(config.sigma_threshold, 3.0);
    }

    #[test]
    fn test_zero_workers_rejected() {
        let config = PipelineConfig::new(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_toml_file() -> Result<()> {
        let mut file = Builder::new().suffix(".toml").tempfile()?;
        writeln!(file, "workers = 3")?;
        writeln!(file, "window_size = 5")?;
        writeln!(file, "parallel_regions = true")?;

        let config = PipelineConfig::load(Some(file.path()))?;

        assert_eq!(config.workers, 3);
        assert_eq!(config.window_size, 5);
        assert!(config.parallel_regions);
        assert_eq!(config.bucket_width_ms, 600_000);
        Ok(())
    }

    #[test]
    fn test_invalid_file_value_fails_validation() -> Result<()> {
        let mut file = Builder::new().suffix(".toml").tempfile()?;
        writeln!(file, "window_size = 0")?;

        let config = PipelineConfig::load(Some(file.path()))?;
        assert_eq!(config.window_size, 0);
        assert!(config.validate().is_err());
        Ok(())
    }

    #[test]
    fn test_environment_overrides_file() -> Result<()> {
        let mut file = Builder::new().suffix(".toml").tempfile()?;
        writeln!(file, "workers = 3")?;
        writeln!(file, "window_size = 5")?;

        let config = PipelineConfig::load_with_environment(
            Some(file.path()),
            environment(&[("STATION_ANOMALY_WORKERS", "6"), ("STATION_ANOMALY_SIGMA_THRESHOLD", "2.5")]),
        )?;

        assert_eq!(config.workers, 6);
        assert_eq!(config.window_size, 5);
        assert_eq!(config.sigma_threshold, 2.5);
        Ok(())
    }

    #[test]
    fn test_stale_zero_workers_replaced_by_override() -> Result<()> {
        let mut file = Builder::new().suffix(".toml").tempfile()?;
        writeln!(file, "workers = 0")?;

        let from_file = PipelineConfig::load_with_environment(Some(file.path()), environment(&[]))?;
        assert_eq!(from_file.workers, 0);
        assert!(from_file.clone().with_workers(4).validate().is_ok());

        let from_env = PipelineConfig::load_with_environment(None, environment(&[("STATION_ANOMALY_WORKERS", "0")]))?;
        assert_eq!(from_env.workers, 0);
        assert!(from_env.with_workers(4).validate().is_ok());
        Ok(())
    }
}
