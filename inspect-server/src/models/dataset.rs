//! Dataset DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::window::TimeWindow;

/// Summary returned after a dataset upload
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadSummary {
    pub message: String,
    pub file_name: String,
    pub total_records: usize,
    pub column_count: usize,
    pub date_range_start: DateTime<Utc>,
    pub date_range_end: DateTime<Utc>,
    pub pass_rate: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    #[serde(flatten)]
    pub summary: UploadSummary,
    /// Whether the raw file also reached the predictor backend
    pub predictor_synced: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateRangesRequest {
    pub training_period: TimeWindow,
    pub testing_period: TimeWindow,
    pub simulation_period: TimeWindow,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RecordCounts {
    pub training: usize,
    pub testing: usize,
    pub simulation: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WindowKind {
    Training,
    Testing,
    Simulation,
    Other,
}

/// One bar of the monthly histogram
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyCount {
    /// e.g. `Jan 2021`
    pub month: String,
    pub count: usize,
    #[serde(rename = "type")]
    pub kind: WindowKind,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeValidation {
    pub is_valid: bool,
    pub message: String,
    pub record_counts: RecordCounts,
    pub monthly_counts: Vec<MonthlyCount>,
}

impl RangeValidation {
    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            message: message.into(),
            record_counts: RecordCounts::default(),
            monthly_counts: Vec::new(),
        }
    }
}
