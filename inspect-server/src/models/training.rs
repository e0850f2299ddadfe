//! Training and single-prediction DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::prediction::PredictionLabel;
use super::row::FeatureMap;
use super::window::flexible_datetime;

/// Forwarded to the predictor's `train-model`; dates go out as RFC 3339.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainModelRequest {
    #[serde(deserialize_with = "flexible_datetime")]
    pub train_start: DateTime<Utc>,
    #[serde(deserialize_with = "flexible_datetime")]
    pub train_end: DateTime<Utc>,
    #[serde(deserialize_with = "flexible_datetime")]
    pub test_start: DateTime<Utc>,
    #[serde(deserialize_with = "flexible_datetime")]
    pub test_end: DateTime<Utc>,
}

/// A single row submitted for an immediate prediction.
#[derive(Debug, Deserialize, Validate)]
pub struct PredictSingleRequest {
    #[serde(rename = "Sample_ID", default)]
    #[validate(length(min = 1, message = "Sample_ID is required for prediction."))]
    pub sample_id: String,

    #[serde(flatten)]
    pub features: FeatureMap,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictSingleResponse {
    pub sample_id: String,
    pub prediction: PredictionLabel,
    pub confidence: f64,
}
