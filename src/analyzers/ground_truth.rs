use crate::models::{AccuracyReport, Observation};
use crate::readers::InjectedAnomaly;
use std::collections::HashSet;

/// Score per-observation flags against a set of known injected anomalies.
/// Matching is exact on (timestamp, station, channel).
pub fn score_detections(observations: &[Observation], truth: &HashSet<InjectedAnomaly>) -> AccuracyReport {
    let detected: HashSet<InjectedAnomaly> = observations
        .iter()
        .flat_map(|observation| {
            observation
                .anomaly_flags
                .channels()
                .map(move |channel| InjectedAnomaly {
                    epoch_millis: observation.epoch_millis,
                    station_id: observation.station_id.clone(),
                    channel,
                })
        })
        .collect();

    let true_positives = detected.intersection(truth).count();

    AccuracyReport {
        true_positives,
        false_positives: detected.len() - true_positives,
        false_negatives: truth.len() - true_positives,
    }
}
