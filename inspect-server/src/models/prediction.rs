//! Prediction and simulation summary models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::row::{DataRow, FeatureMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PredictionLabel {
    Pass,
    Fail,
    Error,
}

impl PredictionLabel {
    /// Case-insensitive parse of the predictor's label. Anything that is
    /// not pass/fail is treated as a failed prediction.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pass" => PredictionLabel::Pass,
            "fail" => PredictionLabel::Fail,
            _ => PredictionLabel::Error,
        }
    }
}

/// Normalized result of one inference call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PredictionResult {
    #[serde(rename = "prediction")]
    pub label: PredictionLabel,
    /// Percentage in `[0, 100]`
    pub confidence: f64,
}

impl PredictionResult {
    pub fn new(label: PredictionLabel, confidence: f64) -> Self {
        let confidence = if confidence.is_finite() {
            confidence.clamp(0.0, 100.0)
        } else {
            0.0
        };
        Self { label, confidence }
    }

    /// Placeholder substituted when the predictor could not answer.
    pub fn sentinel() -> Self {
        Self { label: PredictionLabel::Error, confidence: 0.0 }
    }

    pub fn is_error(&self) -> bool {
        self.label == PredictionLabel::Error
    }
}

/// One streamed prediction, pushed to the dashboard and then forgotten.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionLogEntry {
    /// Wall-clock time of emission
    pub timestamp: DateTime<Utc>,
    pub sample_id: String,
    /// Synthetic timestamp of the source row
    pub row_timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub prediction: PredictionResult,
    pub sensor_data: FeatureMap,
}

impl PredictionLogEntry {
    pub fn new(row: DataRow, prediction: PredictionResult) -> Self {
        Self {
            timestamp: Utc::now(),
            sample_id: row.id,
            row_timestamp: row.timestamp,
            prediction,
            sensor_data: row.features,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationSummary {
    pub message: String,
    pub total_processed: u64,
    pub pass_count: u64,
    pub fail_count: u64,
    pub error_count: u64,
    pub average_confidence: f64,
}

/// Running fold over emitted predictions.
#[derive(Debug, Clone, Default)]
pub struct SimulationStats {
    total: u64,
    pass: u64,
    fail: u64,
    error: u64,
    confidence_sum: f64,
}

impl SimulationStats {
    pub fn record(&mut self, prediction: &PredictionResult) {
        match prediction.label {
            PredictionLabel::Pass => self.pass += 1,
            PredictionLabel::Fail => self.fail += 1,
            PredictionLabel::Error => self.error += 1,
        }
        self.total += 1;
        self.confidence_sum += prediction.confidence;
    }

    pub fn processed(&self) -> u64 {
        self.total
    }

    pub fn summary(&self) -> SimulationSummary {
        let average = if self.total > 0 {
            round2(self.confidence_sum / self.total as f64)
        } else {
            0.0
        };

        SimulationSummary {
            message: format!("Simulation finished. Processed {} records.", self.total),
            total_processed: self.total,
            pass_count: self.pass,
            fail_count: self.fail,
            error_count: self.error,
            average_confidence: average,
        }
    }
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_parse() {
        assert_eq!(PredictionLabel::parse("Pass"), PredictionLabel::Pass);
        assert_eq!(PredictionLabel::parse(" FAIL"), PredictionLabel::Fail);
        assert_eq!(PredictionLabel::parse("unknown"), PredictionLabel::Error);
    }

    #[test]
    fn test_confidence_is_clamped() {
        assert_eq!(PredictionResult::new(PredictionLabel::Pass, 140.0).confidence, 100.0);
        assert_eq!(PredictionResult::new(PredictionLabel::Fail, -3.0).confidence, 0.0);
        assert_eq!(PredictionResult::new(PredictionLabel::Pass, f64::NAN).confidence, 0.0);
    }

    #[test]
    fn test_stats_fold() {
        let mut stats = SimulationStats::default();
        stats.record(&PredictionResult::new(PredictionLabel::Pass, 90.0));
        stats.record(&PredictionResult::new(PredictionLabel::Fail, 80.5));
        stats.record(&PredictionResult::sentinel());

        let summary = stats.summary();
        assert_eq!(summary.total_processed, 3);
        assert_eq!(summary.pass_count + summary.fail_count + summary.error_count, 3);
        // (90 + 80.5 + 0) / 3 = 56.8333...
        assert_eq!(summary.average_confidence, 56.83);
        assert_eq!(summary.message, "Simulation finished. Processed 3 records.");
    }

    #[test]
    fn test_empty_summary() {
        let summary = SimulationStats::default().summary();
        assert_eq!(summary.total_processed, 0);
        assert_eq!(summary.average_confidence, 0.0);
    }

    #[test]
    fn test_log_entry_wire_shape() {
        let row = DataRow {
            id: "7".into(),
            timestamp: Utc::now(),
            label: None,
            features: FeatureMap::new(),
        };
        let entry = PredictionLogEntry::new(row, PredictionResult::new(PredictionLabel::Pass, 97.5));
        let json = serde_json::to_value(&entry).unwrap();

        assert_eq!(json["sampleId"], "7");
        assert_eq!(json["prediction"], "Pass");
        assert_eq!(json["confidence"], 97.5);
        assert!(json["sensorData"].is_object());
    }
}
