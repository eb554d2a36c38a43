use crate::models::StationMetrics;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Detection accuracy against a list of known injected anomalies
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccuracyReport {
    #[serde(rename = "verdadeiros_positivos")]
    pub true_positives: usize,
    #[serde(rename = "falsos_positivos")]
    pub false_positives: usize,
    #[serde(rename = "falsos_negativos")]
    pub false_negatives: usize,
}

impl AccuracyReport {
    pub fn precision(&self) -> Option<f64> {
        let flagged = self.true_positives + self.false_positives;
        (flagged > 0).then(|| self.true_positives as f64 / flagged as f64)
    }

    pub fn recall(&self) -> Option<f64> {
        let expected = self.true_positives + self.false_negatives;
        (expected > 0).then(|| self.true_positives as f64 / expected as f64)
    }
}

/// Final per-station document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyReport {
    #[serde(rename = "tempo_execucao_ms")]
    pub execution_time_ms: f64,

    #[serde(rename = "resultados_por_estacao")]
    pub station_results: BTreeMap<String, StationMetrics>,

    #[serde(rename = "corretude", default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<AccuracyReport>,
}

impl AnomalyReport {
    pub fn new(execution_time_ms: f64, station_results: BTreeMap<String, StationMetrics>) -> Self {
        Self {
            execution_time_ms,
            station_results,
            accuracy: None,
        }
    }

    pub fn with_accuracy(mut self, accuracy: AccuracyReport) -> Self {
        self.accuracy = Some(accuracy);
        self
    }

    pub fn summary(&self) -> String {
        let stations_with_concurrency = self
            .station_results
            .values()
            .filter(|m| m.concurrent_anomaly_periods > 0)
            .count();
        let total_periods: u64 = self
            .station_results
            .values()
            .map(|m| m.concurrent_anomaly_periods)
            .sum();

        let mut summary = format!(
            "=== Station Anomaly Report ===\n\
            Stations: {}\n\
            Stations with concurrent anomalies: {}\n\
            Concurrent anomaly periods: {}\n\
            Execution time: {:.2} ms\n",
            self.station_results.len(),
            stations_with_concurrency,
            total_periods,
            self.execution_time_ms
        );

        if let Some(accuracy) = &self.accuracy {
            summary.push_str(&format!(
                "Ground truth: {} true positives, {} false positives, {} false negatives\n",
                accuracy.true_positives, accuracy.false_positives, accuracy.false_negatives
            ));
            summary.push_str(&format!(
                "Precision: {}, Recall: {}\n",
                format_ratio(accuracy.precision()),
                format_ratio(accuracy.recall())
            ));
        }

        summary
    }
}

fn format_ratio(ratio: Option<f64>) -> String {
    ratio.map_or_else(|| "n/a".to_string(), |r| format!("{:.1}%", r * 100.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accuracy_omitted_when_absent() {
        let report = AnomalyReport::new(1.5, BTreeMap::new());
        let value = serde_json::to_value(&report).unwrap();

        assert!(value.get("corretude").is_none());
        assert_eq!(value["tempo_execucao_ms"], 1.5);
        assert!(value["resultados_por_estacao"].as_object().unwrap().is_empty());
    }

    #[test]
    fn test_precision_and_recall() {
        let accuracy = AccuracyReport {
            true_positives: 3,
            false_positives: 1,
            false_negatives: 2,
        };
        assert_eq!(accuracy.precision(), Some(0.75));
        assert_eq!(accuracy.recall(), Some(0.6));
        assert_eq!(AccuracyReport::default().precision(), None);
    }

    #[test]
    fn test_summary_shows_precision_and_recall() {
        let report = AnomalyReport::new(2.0, BTreeMap::new()).with_accuracy(AccuracyReport {
            true_positives: 3,
            false_positives: 1,
            false_negatives: 2,
        });

        let summary = report.summary();
        assert!(summary.contains("3 true positives, 1 false positives, 2 false negatives"));
        assert!(summary.contains("Precision: 75.0%, Recall: 60.0%"));

        let empty = AnomalyReport::new(2.0, BTreeMap::new()).with_accuracy(AccuracyReport::default());
        assert!(empty.summary().contains("Precision: n/a, Recall: n/a"));
    }
}
