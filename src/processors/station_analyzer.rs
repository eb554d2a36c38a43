use crate::models::{AnomalyFlags, AnomalyPercentages, Channel, Observation, StationMetrics};
use crate::utils::constants::{DEFAULT_BUCKET_WIDTH_MS, DEFAULT_SIGMA_THRESHOLD};
use std::collections::BTreeMap;

/// Population mean and standard deviation of one channel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelStatistics {
    pub mean: f64,
    pub std_dev: f64,
}

impl ChannelStatistics {
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }

        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let squared: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();

        Some(Self {
            mean,
            std_dev: (squared / n).sqrt(),
        })
    }

    /// A zero deviation never flags anything.
    pub fn is_anomaly(&self, value: f64, sigma_threshold: f64) -> bool {
        if self.std_dev == 0.0 {
            return false;
        }
        let band = sigma_threshold * self.std_dev;
        value < self.mean - band || value > self.mean + band
    }
}

/// Flags out-of-band readings for one station and measures how often
/// several channels misbehave inside the same time bucket.
#[derive(Debug, Clone)]
pub struct StationAnalyzer {
    sigma_threshold: f64,
    bucket_width_ms: i64,
}

impl StationAnalyzer {
    pub fn new() -> Self {
        Self {
            sigma_threshold: DEFAULT_SIGMA_THRESHOLD,
            bucket_width_ms: DEFAULT_BUCKET_WIDTH_MS,
        }
    }

    pub fn with_sigma_threshold(mut self, sigma_threshold: f64) -> Self {
        self.sigma_threshold = sigma_threshold;
        self
    }

    pub fn with_bucket_width_ms(mut self, bucket_width_ms: i64) -> Self {
        self.bucket_width_ms = bucket_width_ms.max(1);
        self
    }

    pub fn statistics(&self, observations: &[&mut Observation], channel: Channel) -> Option<ChannelStatistics> {
        let values: Vec<f64> = observations.iter().map(|o| channel.value(o)).collect();
        ChannelStatistics::from_values(&values)
    }

    /// Analyse one station's observations, writing each reading's anomaly
    /// flags in place. Returns `None` for an empty station.
    pub fn analyze(&self, observations: &mut [&mut Observation]) -> Option<StationMetrics> {
        if observations.is_empty() {
            return None;
        }

        let mut stats = [ChannelStatistics { mean: 0.0, std_dev: 0.0 }; 3];
        for (slot, channel) in Channel::ALL.into_iter().enumerate() {
            stats[slot] = self.statistics(observations, channel)?;
        }

        let mut counts = [0usize; 3];
        let mut buckets: BTreeMap<i64, AnomalyFlags> = BTreeMap::new();

        for observation in observations.iter_mut() {
            let mut flags = AnomalyFlags::default();
            for (slot, channel) in Channel::ALL.into_iter().enumerate() {
                let anomalous = stats[slot].is_anomaly(channel.value(observation), self.sigma_threshold);
                if anomalous {
                    counts[slot] += 1;
                }
                flags.set(channel, anomalous);
            }
            observation.anomaly_flags = flags;

            if flags.any() {
                let bucket = buckets
                    .entry(observation.time_bucket(self.bucket_width_ms))
                    .or_default();
                *bucket = bucket.union(&flags);
            }
        }

        let n = observations.len() as f64;
        let mut anomaly_percentage = AnomalyPercentages::default();
        for (slot, channel) in Channel::ALL.into_iter().enumerate() {
            anomaly_percentage.set(channel, (counts[slot] as f64 / n) * 100.0);
        }

        let concurrent_anomaly_periods = buckets.values().filter(|set| set.count() >= 2).count() as u64;

        Some(StationMetrics {
            anomaly_percentage,
            concurrent_anomaly_periods,
        })
    }

    /// Convenience wrapper for an owned, single-station slice
    pub fn analyze_slice(&self, observations: &mut [Observation]) -> Option<StationMetrics> {
        let mut borrowed: Vec<&mut Observation> = observations.iter_mut().collect();
        self.analyze(&mut borrowed)
    }
}

impl Default for StationAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const MINUTE_MS: i64 = 60_000;
    const HOUR_MS: i64 = 60 * MINUTE_MS;

    fn readings(station: &str, count: usize, spacing_ms: i64) -> Vec<Observation> {
        (0..count)
            .map(|i| Observation::new(i, i as i64 * spacing_ms, station, "Sul", 20.0, 50.0, 1000.0))
            .collect()
    }

    #[test]
    fn test_population_statistics() {
        let stats = ChannelStatistics::from_values(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert_eq!(stats.mean, 5.0);
        assert_eq!(stats.std_dev, 2.0);
        assert_eq!(ChannelStatistics::from_values(&[]), None);
    }

    #[test]
    fn test_zero_deviation_never_flags() {
        let stats = ChannelStatistics { mean: 10.0, std_dev: 0.0 };
        assert!(!stats.is_anomaly(1e9, 3.0));
        assert!(!stats.is_anomaly(-1e9, 3.0));
    }

    #[test]
    fn test_band_edges_are_exclusive() {
        let stats = ChannelStatistics { mean: 0.0, std_dev: 1.0 };
        assert!(!stats.is_anomaly(3.0, 3.0));
        assert!(!stats.is_anomaly(-3.0, 3.0));
        assert!(stats.is_anomaly(3.0001, 3.0));
        assert!(stats.is_anomaly(-3.0001, 3.0));
    }

    #[test]
    fn test_identical_readings_have_no_anomalies() {
        let mut observations = readings("A", 5, MINUTE_MS);
        let metrics = StationAnalyzer::new().analyze_slice(&mut observations).unwrap();

        assert_eq!(metrics, StationMetrics::default());
        assert!(observations.iter().all(|o| !o.is_anomalous()));
    }

    #[test]
    fn test_single_channel_outliers_percentage() {
        // Two opposite spikes among twenty readings, in different buckets.
        // Twenty readings leave room above the 3 sigma edge that ten cannot.
        let mut observations = readings("B", 20, HOUR_MS);
        observations[4].temperature = 60.0;
        observations[15].temperature = -20.0;

        let metrics = StationAnalyzer::new().analyze_slice(&mut observations).unwrap();

        assert_eq!(metrics.anomaly_percentage.temperature, 10.0);
        assert_eq!(metrics.anomaly_percentage.humidity, 0.0);
        assert_eq!(metrics.anomaly_percentage.pressure, 0.0);
        assert_eq!(metrics.concurrent_anomaly_periods, 0);
        assert!(observations[4].anomaly_flags.temperature);
        assert!(observations[15].anomaly_flags.temperature);
        assert_eq!(observations.iter().filter(|o| o.is_anomalous()).count(), 2);
    }

    #[test]
    fn test_lone_outlier_among_ten_sits_on_band_edge() {
        // With n readings the largest possible z-score is sqrt(n - 1), so at
        // n = 10 a single outlier lands exactly on 3 sigma and is not flagged.
        let mut observations = readings("B10", 10, HOUR_MS);
        observations[4].temperature = 30.0;

        let analyzer = StationAnalyzer::new();
        let values: Vec<f64> = observations.iter().map(|o| o.temperature).collect();
        let stats = ChannelStatistics::from_values(&values).unwrap();
        assert_eq!(stats.mean, 21.0);
        assert_eq!(stats.std_dev, 3.0);

        let metrics = analyzer.analyze_slice(&mut observations).unwrap();
        assert_eq!(metrics.anomaly_percentage.temperature, 0.0);
        assert!(!observations[4].anomaly_flags.temperature);
    }

    #[test]
    fn test_two_channels_same_reading_count_one_period() {
        let mut observations = readings("C", 30, HOUR_MS);
        observations[5].temperature = 45.0;
        observations[5].humidity = 99.0;

        let metrics = StationAnalyzer::new().analyze_slice(&mut observations).unwrap();

        assert_eq!(metrics.concurrent_anomaly_periods, 1);
        assert_eq!(
            observations[5].anomaly_flags,
            AnomalyFlags {
                temperature: true,
                humidity: true,
                pressure: false
            }
        );
    }

    #[test]
    fn test_two_channels_across_readings_in_one_bucket() {
        let mut observations = readings("D", 30, MINUTE_MS * 20);
        // minutes 0 and 5 of the same bucket after shifting onto a bucket boundary
        observations[6].epoch_millis = 6 * HOUR_MS;
        observations[7].epoch_millis = 6 * HOUR_MS + 5 * MINUTE_MS;
        observations[6].pressure = 1040.0;
        observations[7].humidity = 5.0;

        let metrics = StationAnalyzer::new().analyze_slice(&mut observations).unwrap();

        assert_eq!(metrics.concurrent_anomaly_periods, 1);
        assert!(observations[6].anomaly_flags.pressure);
        assert!(observations[7].anomaly_flags.humidity);
    }

    #[test]
    fn test_two_channels_in_separate_buckets_not_concurrent() {
        let mut observations = readings("E", 30, HOUR_MS);
        observations[3].pressure = 1040.0;
        observations[20].humidity = 5.0;

        let metrics = StationAnalyzer::new().analyze_slice(&mut observations).unwrap();

        assert_eq!(metrics.concurrent_anomaly_periods, 0);
        assert!(metrics.anomaly_percentage.pressure > 0.0);
        assert!(metrics.anomaly_percentage.humidity > 0.0);
    }

    #[test]
    fn test_flags_match_three_sigma_rule() {
        let mut observations: Vec<Observation> = (0..50)
            .map(|i| {
                let wobble = ((i * 7919) % 13) as f64 * 0.37;
                Observation::new(i, i as i64 * MINUTE_MS, "F", "Norte", 20.0 + wobble, 55.0 - wobble, 1010.0 + wobble * 0.5)
            })
            .collect();
        observations[10].temperature = 80.0;
        observations[33].pressure = 900.0;

        let analyzer = StationAnalyzer::new();
        let metrics = analyzer.analyze_slice(&mut observations).unwrap();

        for channel in Channel::ALL {
            let values: Vec<f64> = observations.iter().map(|o| channel.value(o)).collect();
            let stats = ChannelStatistics::from_values(&values).unwrap();
            let mut flagged = 0;
            for observation in &observations {
                let value = channel.value(observation);
                let expected = stats.std_dev != 0.0
                    && (value < stats.mean - 3.0 * stats.std_dev || value > stats.mean + 3.0 * stats.std_dev);
                assert_eq!(observation.anomaly_flags.get(channel), expected);
                if expected {
                    flagged += 1;
                }
            }

            let percentage = metrics.anomaly_percentage.get(channel);
            assert_eq!(percentage, (flagged as f64 / 50.0) * 100.0);
            assert!((0.0..=100.0).contains(&percentage));
        }
        assert!(observations[10].anomaly_flags.temperature);
        assert!(observations[33].anomaly_flags.pressure);
    }

    #[test]
    fn test_empty_station_is_skipped() {
        let mut observations: Vec<Observation> = Vec::new();
        assert_eq!(StationAnalyzer::new().analyze_slice(&mut observations), None);
    }
}
