//! Model handlers - thin proxies to the predictor backend

use axum::{extract::State, Json};
use validator::Validate;

use crate::models::{FeatureValue, PredictSingleRequest, PredictSingleResponse, TrainModelRequest};
use crate::{AppError, AppResult, AppState};

/// Train a model on the training / testing windows
pub async fn train(
    State(state): State<AppState>,
    Json(req): Json<TrainModelRequest>,
) -> AppResult<Json<serde_json::Value>> {
    if req.train_start > req.train_end || req.test_start > req.test_end {
        return Err(AppError::ValidationError(
            "Start date cannot be after end date for a period.".to_string(),
        ));
    }

    tracing::info!(
        "Training requested: train {} .. {}, test {} .. {}",
        req.train_start, req.train_end, req.test_start, req.test_end
    );
    let metrics = state.predictor.train(&req).await?;
    Ok(Json(metrics))
}

pub async fn feature_importance(State(state): State<AppState>) -> AppResult<Json<serde_json::Value>> {
    let importance = state.predictor.feature_importance().await?;
    Ok(Json(importance))
}

/// Predict one row immediately, outside of any simulation
pub async fn predict_single(
    State(state): State<AppState>,
    Json(req): Json<PredictSingleRequest>,
) -> AppResult<Json<PredictSingleResponse>> {
    req.validate()?;

    let PredictSingleRequest { sample_id, mut features } = req;
    features.insert("Sample_ID".to_string(), FeatureValue::Text(sample_id.clone()));

    let result = state.predictor.try_predict(&features).await?;
    if result.is_error() {
        return Err(AppError::ExternalServiceError(format!(
            "unrecognized prediction for sample {}",
            sample_id
        )));
    }

    Ok(Json(PredictSingleResponse {
        sample_id,
        prediction: result.label,
        confidence: result.confidence,
    }))
}
